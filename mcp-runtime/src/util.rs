use crate::ToolError;

pub const ACCESS_TOKEN_ENV: &str = "PRODUCTBOARD_ACCESS_TOKEN";

pub fn client() -> reqwest::Client {
    reqwest::Client::new()
}

/// Resolve the Productboard access token: explicit override first,
/// otherwise the process environment. There is no on-disk credential
/// store; the token is the one required piece of configuration.
pub fn resolve_token(explicit: Option<&str>) -> Result<String, ToolError> {
    if let Some(token) = explicit {
        if !token.trim().is_empty() {
            return Ok(token.to_string());
        }
    }
    match std::env::var(ACCESS_TOKEN_ENV) {
        Ok(token) if !token.trim().is_empty() => Ok(token),
        _ => Err(ToolError::new(
            "auth_missing",
            format!("No Productboard access token. Set {ACCESS_TOKEN_ENV} or pass --token."),
        )),
    }
}
