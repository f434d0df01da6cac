use clap::Parser;
use productboard_mcp_runtime::{ACCESS_TOKEN_ENV, DEFAULT_API_URL, McpRuntimeConfig};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "productboard-mcp",
    version,
    about = "MCP stdio server exposing the Productboard API as read-only tools"
)]
struct Cli {
    /// Base URL of the Productboard API.
    #[arg(long, env = "PRODUCTBOARD_API_URL", default_value = DEFAULT_API_URL)]
    api_url: String,

    /// Productboard access token. Falls back to the environment.
    #[arg(long, env = ACCESS_TOKEN_ENV, hide_env_values = true)]
    token: Option<String>,
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();

    // stdout carries the protocol; all diagnostics go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    // A missing token is a startup failure, not a per-call one.
    let has_token = cli
        .token
        .as_deref()
        .map(str::trim)
        .is_some_and(|token| !token.is_empty());
    if !has_token {
        tracing::error!("Please set the {ACCESS_TOKEN_ENV} environment variable");
        std::process::exit(1);
    }

    let code = productboard_mcp_runtime::run(McpRuntimeConfig {
        api_url: cli.api_url,
        token: cli.token,
    })
    .await;
    std::process::exit(code);
}
