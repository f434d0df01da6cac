use std::future::Future;

use serde::Deserialize;
use serde_json::{Map, Value, json};
use tokio::io::{
    self, AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader,
};
use url::Url;

mod postprocess;
mod sanitize;
mod util;

use postprocess::{NOTE_RULES, process_collection};
use sanitize::strip_tags;
use util::{client, resolve_token};

pub use util::ACCESS_TOKEN_ENV;

const MCP_PROTOCOL_VERSION: &str = "2024-11-05";
const MCP_SERVER_NAME: &str = "productboard-mcp";
pub const DEFAULT_API_URL: &str = "https://api.productboard.com";
const PRODUCTBOARD_API_VERSION: &str = "1";

/// Fixed page size of the upstream list endpoints; `page` arguments are
/// translated into `pageOffset` multiples of this.
const LIST_PAGE_SIZE: u64 = 100;
/// Largest page size the upstream accepts, used by the search
/// aggregator to minimize round trips during a full-collection fetch.
const SEARCH_PAGE_LIMIT: usize = 1000;

#[derive(Clone, Debug)]
pub struct McpRuntimeConfig {
    pub api_url: String,
    pub token: Option<String>,
}

pub struct McpServer {
    config: McpRuntimeConfig,
    http: reqwest::Client,
}

pub async fn run(config: McpRuntimeConfig) -> i32 {
    let server = McpServer::new(config);
    match server.serve_stdio().await {
        Ok(()) => 0,
        Err(err) => {
            tracing::error!("MCP server error: {err}");
            1
        }
    }
}

impl McpServer {
    pub fn new(config: McpRuntimeConfig) -> Self {
        Self {
            config,
            http: client(),
        }
    }

    pub async fn serve_stdio(&self) -> Result<(), String> {
        tracing::info!(
            server = MCP_SERVER_NAME,
            version = env!("CARGO_PKG_VERSION"),
            api_url = %self.config.api_url,
            "serving MCP over stdio"
        );

        let stdin = io::stdin();
        let mut reader = BufReader::new(stdin);
        let mut stdout = io::stdout();

        loop {
            let incoming = read_framed_json(&mut reader)
                .await
                .map_err(|e| format!("Failed to read MCP message: {e}"))?;
            let Some(incoming) = incoming else {
                break;
            };

            let responses = self.handle_incoming_message(incoming).await;
            for response in &responses {
                write_framed_json(&mut stdout, response)
                    .await
                    .map_err(|e| format!("Failed to write MCP response: {e}"))?;
            }
        }

        Ok(())
    }

    async fn handle_incoming_message(&self, incoming: Value) -> Vec<Value> {
        let mut responses = Vec::new();

        if let Some(batch) = incoming.as_array() {
            if batch.is_empty() {
                responses.push(error_response(
                    Value::Null,
                    RpcError::invalid_request("Batch request must not be empty"),
                ));
                return responses;
            }
            for item in batch {
                if let Some(response) = self.handle_single_message(item.clone()).await {
                    responses.push(response);
                }
            }
            return responses;
        }

        if let Some(response) = self.handle_single_message(incoming).await {
            responses.push(response);
        }
        responses
    }

    async fn handle_single_message(&self, incoming: Value) -> Option<Value> {
        let Some(obj) = incoming.as_object() else {
            return Some(error_response(
                Value::Null,
                RpcError::invalid_request("Request must be a JSON object"),
            ));
        };

        if obj.get("jsonrpc").and_then(Value::as_str) != Some("2.0") {
            let id = obj.get("id").cloned().unwrap_or(Value::Null);
            return Some(error_response(
                id,
                RpcError::invalid_request("jsonrpc must be '2.0'"),
            ));
        }

        let Some(method) = obj.get("method").and_then(Value::as_str) else {
            // Most likely a client response; this server issues no
            // outbound requests.
            return None;
        };

        let params = obj.get("params").cloned().unwrap_or(Value::Null);
        if let Some(id) = obj.get("id").cloned() {
            let result = self.handle_request(method, params).await;
            Some(match result {
                Ok(payload) => success_response(id, payload),
                Err(err) => error_response(id, err),
            })
        } else {
            // Notifications carry no response; unknown ones are ignored.
            None
        }
    }

    async fn handle_request(&self, method: &str, params: Value) -> Result<Value, RpcError> {
        match method {
            "initialize" => Ok(self.initialize_payload()),
            "ping" => Ok(json!({})),
            "tools/list" => Ok(tools_list_payload()),
            "tools/call" => self.handle_tools_call(params).await,
            "prompts/list" => Ok(json!({ "prompts": [] })),
            "resources/list" => Ok(json!({ "resources": [] })),
            _ => Err(RpcError::method_not_found(method)),
        }
    }

    fn initialize_payload(&self) -> Value {
        json!({
            "protocolVersion": MCP_PROTOCOL_VERSION,
            "capabilities": {
                "tools": {
                    "listChanged": false
                }
            },
            "serverInfo": {
                "name": MCP_SERVER_NAME,
                "version": env!("CARGO_PKG_VERSION")
            },
            "instructions": "Read-only tool surface over the Productboard API. List tools are paginated in pages of 100. Note contents are reduced to compact plain text before being returned. search_features fetches the whole feature collection and must not be called multiple times in parallel."
        })
    }

    async fn handle_tools_call(&self, params: Value) -> Result<Value, RpcError> {
        let params = params
            .as_object()
            .ok_or_else(|| RpcError::invalid_params("tools/call params must be an object"))?;

        let name = params
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| RpcError::invalid_params("tools/call requires string field 'name'"))?;

        let args = match params.get("arguments") {
            Some(Value::Object(map)) => map.clone(),
            Some(Value::Null) | None => Map::new(),
            Some(_) => {
                return Err(RpcError::invalid_params(
                    "tools/call 'arguments' must be an object",
                ));
            }
        };

        tracing::info!(tool = name, "received tools/call");
        Ok(match self.execute_tool(name, &args).await {
            Ok(payload) => tool_call_envelope(&payload),
            Err(err) => {
                // Handler errors stay inside a success envelope; the
                // protocol layer never rejects a request for them.
                tracing::warn!(tool = name, code = %err.code, "tool call failed: {}", err.message);
                tool_call_envelope(&err.to_value())
            }
        })
    }

    async fn execute_tool(
        &self,
        tool_name: &str,
        args: &Map<String, Value>,
    ) -> Result<Value, ToolError> {
        match tool_name {
            "get_products" => self.tool_get_products(parse_args(args)?).await,
            "get_product_detail" => self.tool_get_product_detail(parse_args(args)?).await,
            "get_components" => self.tool_get_components(parse_args(args)?).await,
            "get_component_detail" => self.tool_get_component_detail(parse_args(args)?).await,
            "get_features" => self.tool_get_features(parse_args(args)?).await,
            "get_feature_detail" => self.tool_get_feature_detail(parse_args(args)?).await,
            "search_features" => self.tool_search_features(parse_args(args)?).await,
            "get_feature_statuses" => self.tool_get_feature_statuses(parse_args(args)?).await,
            "get_notes" => self.tool_get_notes(parse_args(args)?).await,
            "get_note_detail" => self.tool_get_note_detail(parse_args(args)?).await,
            "get_companies" => self.tool_get_companies(parse_args(args)?).await,
            "get_company_detail" => self.tool_get_company_detail(parse_args(args)?).await,
            _ => Err(ToolError::new(
                "unknown_tool",
                format!("Unknown tool '{tool_name}'"),
            )),
        }
    }

    async fn tool_get_products(&self, request: PagedRequest) -> Result<Value, ToolError> {
        self.fetch("/products", &page_offset_query(request.page))
            .await
    }

    async fn tool_get_product_detail(
        &self,
        request: ProductDetailRequest,
    ) -> Result<Value, ToolError> {
        self.fetch(&format!("/products/{}", request.product_id), &[])
            .await
    }

    async fn tool_get_components(&self, request: PagedRequest) -> Result<Value, ToolError> {
        self.fetch("/components", &page_offset_query(request.page))
            .await
    }

    async fn tool_get_component_detail(
        &self,
        request: ComponentDetailRequest,
    ) -> Result<Value, ToolError> {
        self.fetch(&format!("/components/{}", request.component_id), &[])
            .await
    }

    async fn tool_get_features(&self, request: PagedRequest) -> Result<Value, ToolError> {
        self.fetch("/features", &page_offset_query(request.page))
            .await
    }

    async fn tool_get_feature_detail(
        &self,
        request: FeatureDetailRequest,
    ) -> Result<Value, ToolError> {
        self.fetch(&format!("/features/{}", request.feature_id), &[])
            .await
    }

    async fn tool_get_feature_statuses(&self, request: PagedRequest) -> Result<Value, ToolError> {
        self.fetch("/feature-statuses", &page_offset_query(request.page))
            .await
    }

    async fn tool_get_notes(&self, request: GetNotesRequest) -> Result<Value, ToolError> {
        if request.last.is_some()
            && (request.created_from.is_some() || request.created_to.is_some())
        {
            return Err(ToolError::new(
                "validation_failed",
                "'last' cannot be combined with 'createdFrom' or 'createdTo'",
            )
            .with_field("last"));
        }
        if request.any_tag.is_some() && request.all_tags.is_some() {
            return Err(ToolError::new(
                "validation_failed",
                "'anyTag' cannot be combined with 'allTags'",
            )
            .with_field("anyTag"));
        }

        let response = self.fetch("/notes", &note_query_pairs(&request)).await?;
        Ok(process_collection(response, &NOTE_RULES))
    }

    async fn tool_get_note_detail(&self, request: NoteDetailRequest) -> Result<Value, ToolError> {
        self.fetch(&format!("/notes/{}", request.note_id), &[]).await
    }

    async fn tool_get_companies(&self, request: PagedRequest) -> Result<Value, ToolError> {
        self.fetch("/companies", &page_offset_query(request.page))
            .await
    }

    async fn tool_get_company_detail(
        &self,
        request: CompanyDetailRequest,
    ) -> Result<Value, ToolError> {
        self.fetch(&format!("/companies/{}", request.company_id), &[])
            .await
    }

    async fn tool_search_features(
        &self,
        request: SearchFeaturesRequest,
    ) -> Result<Value, ToolError> {
        let terms: Vec<String> = request
            .search_queries
            .iter()
            .map(|term| term.trim().to_lowercase())
            .filter(|term| !term.is_empty())
            .collect();
        if terms.is_empty() {
            return Err(ToolError::new(
                "validation_failed",
                "'searchQueries' must contain at least one non-empty term",
            )
            .with_field("searchQueries"));
        }

        let features =
            collect_feature_pages(move |path| self.fetch_path(path), SEARCH_PAGE_LIMIT).await?;
        let matches: Vec<Value> = features
            .iter()
            .filter(|feature| feature_matches(feature, &terms, request.search_descriptions))
            .cloned()
            .collect();
        let matched_count = matches.len();

        Ok(json!({
            "data": matches,
            "allFeaturesCount": features.len(),
            "featuresMatchedCount": matched_count,
            "searchQueries": request.search_queries,
            "searchedDescriptions": request.search_descriptions
        }))
    }

    async fn fetch_path(&self, path: String) -> Result<Value, ToolError> {
        self.fetch(&path, &[]).await
    }

    /// GET a Productboard endpoint and decode the body. `path` may
    /// already carry a query string (pagination links); `query` pairs
    /// are appended on top.
    async fn fetch(&self, path: &str, query: &[(String, String)]) -> Result<Value, ToolError> {
        let mut url = Url::parse(&format!(
            "{}{}",
            self.config.api_url.trim_end_matches('/'),
            path
        ))
        .map_err(|e| ToolError::new("invalid_url", format!("Invalid API URL/path: {e}")))?;
        if !query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in query {
                pairs.append_pair(key, value);
            }
        }

        let token = resolve_token(self.config.token.as_deref())?;
        let response = self
            .http
            .get(url)
            .header("Authorization", format!("Bearer {token}"))
            .header("X-Version", PRODUCTBOARD_API_VERSION)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| {
                ToolError::new(
                    "connection_error",
                    format!(
                        "Failed to reach Productboard API at {}: {e}",
                        self.config.api_url
                    ),
                )
            })?;

        let status = response.status().as_u16();
        let bytes = response.bytes().await.map_err(|e| {
            ToolError::new(
                "response_error",
                format!("Failed to read API response body: {e}"),
            )
        })?;
        let body = parse_response_body(&bytes);

        if !(200..=299).contains(&status) {
            return Err(ToolError::new(
                "upstream_error",
                format!("Productboard API returned HTTP {status} for {path}"),
            )
            .with_details(json!({ "status": status, "body": body })));
        }
        Ok(body)
    }
}

/// Fetch every page of the feature collection, following `links.next`
/// only while the just-fetched page was full-sized; a short page means
/// end-of-data even when a next link is still present. Pages are
/// fetched strictly one at a time and a failed fetch aborts the whole
/// aggregation.
async fn collect_feature_pages<F, Fut>(
    mut fetch_page: F,
    page_limit: usize,
) -> Result<Vec<Value>, ToolError>
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = Result<Value, ToolError>>,
{
    let mut features = Vec::new();
    let mut next_path = format!("/features?pageLimit={page_limit}");

    loop {
        let response = fetch_page(next_path).await?;
        let page_len = match response.get("data").and_then(Value::as_array) {
            Some(page) => {
                features.extend(page.iter().cloned());
                page.len()
            }
            None => 0,
        };

        let next_link = response.pointer("/links/next").and_then(Value::as_str);
        match next_link {
            Some(link) if page_len == page_limit => {
                next_path = relative_path_from_link(link)?;
            }
            _ => break,
        }
    }

    Ok(features)
}

/// Pagination links come back absolute; the fetcher owns the base URL,
/// so reduce them to path plus query.
fn relative_path_from_link(link: &str) -> Result<String, ToolError> {
    let parsed = Url::parse(link).map_err(|e| {
        ToolError::new(
            "upstream_error",
            format!("Invalid pagination link '{link}': {e}"),
        )
        .with_field("links.next")
    })?;
    let mut path = parsed.path().to_string();
    if let Some(query) = parsed.query() {
        path.push('?');
        path.push_str(query);
    }
    Ok(path)
}

fn feature_matches(feature: &Value, terms: &[String], search_descriptions: bool) -> bool {
    let name_match = feature
        .get("name")
        .and_then(Value::as_str)
        .map(|name| {
            let name = name.to_lowercase();
            terms.iter().any(|term| name.contains(term))
        })
        .unwrap_or(false);
    if name_match {
        return true;
    }
    if !search_descriptions {
        return false;
    }
    feature
        .get("description")
        .and_then(Value::as_str)
        .map(|description| {
            // Bare tag removal is enough for substring matching; the
            // full sanitizer pipeline is for display, not search.
            let text = strip_tags(description).to_lowercase();
            terms.iter().any(|term| text.contains(term))
        })
        .unwrap_or(false)
}

fn page_offset_query(page: Option<u64>) -> Vec<(String, String)> {
    match page {
        Some(page) if page > 1 => vec![(
            "pageOffset".to_string(),
            page.saturating_sub(1)
                .saturating_mul(LIST_PAGE_SIZE)
                .to_string(),
        )],
        _ => Vec::new(),
    }
}

fn note_query_pairs(request: &GetNotesRequest) -> Vec<(String, String)> {
    let mut query: Vec<(String, String)> = Vec::new();
    let string_params = [
        ("last", &request.last),
        ("createdFrom", &request.created_from),
        ("createdTo", &request.created_to),
        ("updatedFrom", &request.updated_from),
        ("updatedTo", &request.updated_to),
        ("term", &request.term),
        ("featureId", &request.feature_id),
        ("companyId", &request.company_id),
        ("ownerEmail", &request.owner_email),
        ("source", &request.source),
        ("anyTag", &request.any_tag),
        ("allTags", &request.all_tags),
        ("pageCursor", &request.page_cursor),
    ];
    for (key, value) in string_params {
        if let Some(value) = value {
            query.push((key.to_string(), value.clone()));
        }
    }
    if let Some(limit) = request.page_limit {
        query.push(("pageLimit".to_string(), limit.to_string()));
    }
    query
}

fn parse_args<T: serde::de::DeserializeOwned>(args: &Map<String, Value>) -> Result<T, ToolError> {
    serde_json::from_value(Value::Object(args.clone())).map_err(|e| {
        ToolError::new("validation_failed", format!("Invalid tool arguments: {e}"))
            .with_field("arguments")
    })
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PagedRequest {
    page: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProductDetailRequest {
    product_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ComponentDetailRequest {
    component_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FeatureDetailRequest {
    feature_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NoteDetailRequest {
    note_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CompanyDetailRequest {
    company_id: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct GetNotesRequest {
    last: Option<String>,
    created_from: Option<String>,
    created_to: Option<String>,
    updated_from: Option<String>,
    updated_to: Option<String>,
    term: Option<String>,
    feature_id: Option<String>,
    company_id: Option<String>,
    owner_email: Option<String>,
    source: Option<String>,
    any_tag: Option<String>,
    all_tags: Option<String>,
    page_limit: Option<u64>,
    page_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchFeaturesRequest {
    search_queries: Vec<String>,
    #[serde(default)]
    search_descriptions: bool,
}

#[derive(Debug)]
struct RpcError {
    code: i64,
    message: String,
}

impl RpcError {
    fn invalid_request(message: impl Into<String>) -> Self {
        Self {
            code: -32600,
            message: message.into(),
        }
    }

    fn method_not_found(method: &str) -> Self {
        Self {
            code: -32601,
            message: format!("Method not found: {method}"),
        }
    }

    fn invalid_params(message: impl Into<String>) -> Self {
        Self {
            code: -32602,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ToolError {
    code: String,
    message: String,
    field: Option<String>,
    details: Option<Value>,
}

impl ToolError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            field: None,
            details: None,
        }
    }

    fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    fn to_value(&self) -> Value {
        let mut payload = json!({
            "error": self.message,
            "code": self.code
        });
        if let Some(field) = &self.field {
            payload["field"] = Value::String(field.clone());
        }
        if let Some(details) = &self.details {
            payload["details"] = details.clone();
        }
        payload
    }
}

#[derive(Debug)]
struct ToolDefinition {
    name: &'static str,
    description: &'static str,
    input_schema: Value,
}

fn tools_list_payload() -> Value {
    let tools: Vec<Value> = tool_definitions()
        .into_iter()
        .map(|tool| {
            json!({
                "name": tool.name,
                "description": tool.description,
                "inputSchema": tool.input_schema,
            })
        })
        .collect();
    json!({ "tools": tools })
}

fn paged_input_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "page": {
                "type": "number",
                "default": 1
            }
        }
    })
}

fn detail_input_schema(field: &str, description: &str) -> Value {
    json!({
        "type": "object",
        "properties": {
            field: {
                "type": "string",
                "description": description
            }
        },
        "required": [field]
    })
}

fn tool_definitions() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition {
            name: "get_products",
            description: "Returns detail of all products. This API is paginated and the page limit is always 100",
            input_schema: paged_input_schema(),
        },
        ToolDefinition {
            name: "get_product_detail",
            description: "Returns detailed information about a specific product",
            input_schema: detail_input_schema("productId", "ID of the product to retrieve"),
        },
        ToolDefinition {
            name: "get_components",
            description: "Returns a list of all components. This API is paginated and the page limit is always 100",
            input_schema: paged_input_schema(),
        },
        ToolDefinition {
            name: "get_component_detail",
            description: "Returns detailed information about a specific component",
            input_schema: detail_input_schema("componentId", "ID of the component to retrieve"),
        },
        ToolDefinition {
            name: "get_features",
            description: "Returns a list of all features. This API is paginated and the page limit is always 100",
            input_schema: paged_input_schema(),
        },
        ToolDefinition {
            name: "get_feature_detail",
            description: "Returns detailed information about a specific feature",
            input_schema: detail_input_schema("featureId", "ID of the feature to retrieve"),
        },
        ToolDefinition {
            name: "search_features",
            description: "Searches through all features by name and optionally by description. Fetches all pages automatically. This tool should not be called multiple times in parallel.",
            input_schema: json!({
                "type": "object",
                "required": ["searchQueries"],
                "properties": {
                    "searchQueries": {
                        "type": "array",
                        "items": { "type": "string" },
                        "minItems": 1,
                        "description": "Search terms to look for in feature names and descriptions; a feature matches if it contains any of them"
                    },
                    "searchDescriptions": {
                        "type": "boolean",
                        "default": false,
                        "description": "Whether to search in feature descriptions in addition to names"
                    }
                }
            }),
        },
        ToolDefinition {
            name: "get_feature_statuses",
            description: "Returns a list of all feature statuses. This API is paginated and the page limit is always 100",
            input_schema: paged_input_schema(),
        },
        ToolDefinition {
            name: "get_notes",
            description: "Returns a list of all notes. Note contents are reduced to compact plain text.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "last": {
                        "type": "string",
                        "description": "Return only notes created since given span of months (m), days (d), or hours (h). E.g. 6m | 10d | 24h | 1h. Cannot be combined with createdFrom, createdTo, dateFrom, or dateTo"
                    },
                    "createdFrom": {
                        "type": "string",
                        "format": "date",
                        "description": "Return only notes created since given date. Cannot be combined with last"
                    },
                    "createdTo": {
                        "type": "string",
                        "format": "date",
                        "description": "Return only notes created before or equal to the given date. Cannot be combined with last"
                    },
                    "updatedFrom": {
                        "type": "string",
                        "format": "date",
                        "description": "Return only notes updated since given date"
                    },
                    "updatedTo": {
                        "type": "string",
                        "format": "date",
                        "description": "Return only notes updated before or equal to the given date"
                    },
                    "term": {
                        "type": "string",
                        "description": "Return only notes by fulltext search"
                    },
                    "featureId": {
                        "type": "string",
                        "description": "Return only notes for specific feature ID or its descendants"
                    },
                    "companyId": {
                        "type": "string",
                        "description": "Return only notes for specific company ID"
                    },
                    "ownerEmail": {
                        "type": "string",
                        "description": "Return only notes owned by a specific owner email"
                    },
                    "source": {
                        "type": "string",
                        "description": "Return only notes from a specific source origin. This is the unique string identifying the external system from which the data came"
                    },
                    "anyTag": {
                        "type": "string",
                        "description": "Return only notes that have been assigned any of the tags in the array. Cannot be combined with allTags"
                    },
                    "allTags": {
                        "type": "string",
                        "description": "Return only notes that have been assigned all of the tags in the array. Cannot be combined with anyTag"
                    },
                    "pageLimit": {
                        "type": "number",
                        "description": "Page limit",
                        "default": 200,
                        "maximum": 2000
                    },
                    "pageCursor": {
                        "type": "string",
                        "description": "Page cursor to get next page of results"
                    }
                }
            }),
        },
        ToolDefinition {
            name: "get_note_detail",
            description: "Returns detailed information about a specific note",
            input_schema: detail_input_schema("noteId", "ID of the note to retrieve"),
        },
        ToolDefinition {
            name: "get_companies",
            description: "Returns a list of all companies. This API is paginated and the page limit is always 100",
            input_schema: paged_input_schema(),
        },
        ToolDefinition {
            name: "get_company_detail",
            description: "Returns detailed information about a specific company",
            input_schema: detail_input_schema("companyId", "ID of the company to retrieve"),
        },
    ]
}

fn tool_call_envelope(payload: &Value) -> Value {
    let text = serde_json::to_string(payload).unwrap_or_else(|_| "{}".to_string());
    json!({
        "content": [{
            "type": "text",
            "text": text
        }]
    })
}

fn parse_response_body(bytes: &[u8]) -> Value {
    if bytes.is_empty() {
        return Value::Null;
    }
    serde_json::from_slice(bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(bytes).to_string()))
}

fn success_response(id: Value, result: Value) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "result": result
    })
}

fn error_response(id: Value, error: RpcError) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "error": {
            "code": error.code,
            "message": error.message
        }
    })
}

async fn read_framed_json<R>(reader: &mut R) -> Result<Option<Value>, std::io::Error>
where
    R: AsyncBufRead + Unpin,
{
    let mut content_length: Option<usize> = None;

    loop {
        let mut line = String::new();
        let bytes_read = reader.read_line(&mut line).await?;
        if bytes_read == 0 {
            if content_length.is_none() {
                return Ok(None);
            }
            return Err(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "Unexpected EOF while reading MCP headers",
            ));
        }

        if line == "\r\n" {
            break;
        }

        let line = line.trim_end_matches(['\r', '\n']);
        if line.to_ascii_lowercase().starts_with("content-length:") {
            let raw_len = line
                .split_once(':')
                .map(|(_, right)| right.trim())
                .unwrap_or_default();
            let parsed = raw_len.parse::<usize>().map_err(|_| {
                std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    "Invalid Content-Length header",
                )
            })?;
            content_length = Some(parsed);
        }
    }

    let content_length = content_length.ok_or_else(|| {
        std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            "Missing Content-Length header",
        )
    })?;
    let mut payload = vec![0_u8; content_length];
    reader.read_exact(&mut payload).await?;

    let json: Value = serde_json::from_slice(&payload).map_err(|e| {
        std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("Invalid JSON payload: {e}"),
        )
    })?;
    Ok(Some(json))
}

async fn write_framed_json<W>(writer: &mut W, value: &Value) -> Result<(), std::io::Error>
where
    W: AsyncWrite + Unpin,
{
    let body = serde_json::to_vec(value).map_err(|e| {
        std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("Failed to serialize JSON: {e}"),
        )
    })?;
    let header = format!(
        "Content-Length: {}\r\nContent-Type: application/json\r\n\r\n",
        body.len()
    );
    writer.write_all(header.as_bytes()).await?;
    writer.write_all(&body).await?;
    writer.flush().await?;
    Ok(())
}
