use std::sync::Arc;

use anyhow::Result;
use rmcp::{
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::{CallToolResult, ServerCapabilities, ServerInfo},
    tool, tool_router, ErrorData as McpError, ServerHandler,
};
use serde::Serialize;
use serde_json::{json, Value};
use tokio::{
    io::{AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader},
    task,
};
use tracing::{debug, error, info};

use crate::{
    application::{dtos::AskRequest, MarsService},
    domain::DomainError,
};

/// MCP tool surface over [`MarsService`].
#[derive(Clone)]
pub struct MarsMcpServer {
    service: Arc<MarsService>,
    tool_router: ToolRouter<Self>,
}

impl MarsMcpServer {
    pub fn new(service: Arc<MarsService>) -> Self {
        Self {
            service,
            tool_router: Self::tool_router(),
        }
    }

    /// Runs a blocking service call off the async runtime and wraps its output.
    async fn call<T, F>(&self, op: F) -> Result<CallToolResult, McpError>
    where
        T: Serialize + Send + 'static,
        F: FnOnce(&MarsService) -> Result<T, DomainError> + Send + 'static,
    {
        let service = Arc::clone(&self.service);
        let output = task::spawn_blocking(move || op(&service))
            .await
            .map_err(|err| internal_error(err.to_string()))?
            .map_err(map_domain_error)?;

        let value = serde_json::to_value(output).map_err(|err| internal_error(err.to_string()))?;
        Ok(CallToolResult::structured(value))
    }
}

#[tool_router]
impl MarsMcpServer {
    #[tool(
        name = "ingest_images",
        description = "Fetch the Mars imagery catalog, describe new images and store them for retrieval."
    )]
    async fn ingest_images(&self) -> Result<CallToolResult, McpError> {
        self.call(|service| service.ingest()).await
    }

    #[tool(
        name = "ask_question",
        description = "Answer a question using the stored Mars image descriptions."
    )]
    async fn ask_question(
        &self,
        Parameters(payload): Parameters<AskRequest>,
    ) -> Result<CallToolResult, McpError> {
        self.call(move |service| service.ask(payload)).await
    }

    #[tool(
        name = "analyze_catalog",
        description = "Fetch the raw catalog document and return a model-written summary of it."
    )]
    async fn analyze_catalog(&self) -> Result<CallToolResult, McpError> {
        self.call(|service| service.analyze()).await
    }
}

impl ServerHandler for MarsMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: rmcp::model::ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: rmcp::model::Implementation {
                name: "marsrag-mcp".into(),
                title: Some("Mars imagery retrieval".into()),
                version: env!("CARGO_PKG_VERSION").into(),
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Call ingest_images to pull new rover images into the index, then \
                 ask_question to query their descriptions. analyze_catalog summarises \
                 the raw catalog response."
                    .into(),
            ),
        }
    }
}

fn map_domain_error(err: DomainError) -> McpError {
    match err {
        DomainError::Validation(msg) => {
            McpError::invalid_params("invalid request", Some(json!({ "detail": msg })))
        }
        other => McpError::internal_error(
            "operation failed",
            Some(json!({ "detail": other.to_string() })),
        ),
    }
}

fn internal_error(message: impl Into<String>) -> McpError {
    McpError::internal_error(
        "internal MCP server error",
        Some(json!({ "detail": message.into() })),
    )
}

/// Line-delimited JSON-RPC over stdin/stdout for process-spawning MCP clients.
pub async fn run_mcp_stdio_server(service: Arc<MarsService>) -> Result<()> {
    info!(target: "marsrag::mcp", "starting MCP stdio server");

    let server = MarsMcpServer::new(service);
    let mut reader = BufReader::new(tokio::io::stdin());
    let mut stdout = tokio::io::stdout();
    let mut line = String::new();

    loop {
        line.clear();
        match reader.read_line(&mut line).await {
            Ok(0) => {
                info!(target: "marsrag::mcp", "client closed stdio connection");
                break;
            }
            Ok(_) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                debug!(target: "marsrag::mcp", request = %trimmed, "received");

                let response = match serde_json::from_str::<Value>(trimmed) {
                    Ok(request) => handle_jsonrpc_request(&server, request).await,
                    Err(err) => {
                        error!(target: "marsrag::mcp", error = %err, "unparsable JSON-RPC request");
                        Some(error_response(None, -32700, format!("Parse error: {err}")))
                    }
                };

                if let Some(response) = response {
                    if let Err(err) = write_line(&mut stdout, &response).await {
                        error!(target: "marsrag::mcp", error = %err, "failed to write response");
                        break;
                    }
                }
            }
            Err(err) => {
                error!(target: "marsrag::mcp", error = %err, "failed to read from stdin");
                break;
            }
        }
    }

    info!(target: "marsrag::mcp", "MCP stdio server terminated");
    Ok(())
}

async fn write_line<W: AsyncWrite + Unpin>(out: &mut W, value: &Value) -> std::io::Result<()> {
    let mut bytes = serde_json::to_vec(value)?;
    bytes.push(b'\n');
    out.write_all(&bytes).await?;
    out.flush().await
}

fn error_response(id: Option<Value>, code: i32, message: impl Into<String>) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "error": { "code": code, "message": message.into() }
    })
}

/// Dispatches one request. Notifications (no `id`) get no response.
async fn handle_jsonrpc_request(server: &MarsMcpServer, request: Value) -> Option<Value> {
    let id = request.get("id").cloned();
    let method = request.get("method").and_then(Value::as_str).unwrap_or("");

    if id.is_none() {
        debug!(target: "marsrag::mcp", method, "notification ignored");
        return None;
    }

    let response = match method {
        "initialize" => {
            let info = server.get_info();
            json!({
                "jsonrpc": "2.0",
                "id": id,
                "result": {
                    "protocolVersion": info.protocol_version,
                    "capabilities": info.capabilities,
                    "serverInfo": info.server_info,
                    "instructions": info.instructions
                }
            })
        }
        "ping" => json!({ "jsonrpc": "2.0", "id": id, "result": {} }),
        "tools/list" => json!({
            "jsonrpc": "2.0",
            "id": id,
            "result": { "tools": server.tool_router.list_all() }
        }),
        "tools/call" => match request.get("params") {
            Some(params) => {
                let tool_name = params.get("name").and_then(Value::as_str).unwrap_or("");
                let arguments = params.get("arguments").cloned().unwrap_or(json!({}));

                match call_tool(server, tool_name, arguments).await {
                    Ok(result) => json!({ "jsonrpc": "2.0", "id": id, "result": result }),
                    Err(err) => json!({
                        "jsonrpc": "2.0",
                        "id": id,
                        "error": { "code": err.code, "message": err.message, "data": err.data }
                    }),
                }
            }
            None => error_response(id, -32602, "Invalid params"),
        },
        _ => error_response(id, -32601, format!("Method not found: {method}")),
    };

    Some(response)
}

async fn call_tool(
    server: &MarsMcpServer,
    tool_name: &str,
    arguments: Value,
) -> Result<CallToolResult, McpError> {
    match tool_name {
        "ingest_images" => server.ingest_images().await,
        "analyze_catalog" => server.analyze_catalog().await,
        "ask_question" => {
            let payload = serde_json::from_value::<AskRequest>(arguments).map_err(|err| {
                McpError::invalid_params(
                    "invalid ask_question arguments",
                    Some(json!({ "detail": err.to_string() })),
                )
            })?;
            server.ask_question(Parameters(payload)).await
        }
        _ => Err(McpError::invalid_params(
            format!("Unknown tool: {tool_name}"),
            None,
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::services::testing::{
        memory_index, FakeCatalog, FakeCompletion, FakeImages, FakeVision,
    };
    use crate::application::{services::NO_DATA_MESSAGE, ServiceComponents};
    use crate::settings::AppConfig;

    fn server() -> MarsMcpServer {
        let service = MarsService::new(
            ServiceComponents {
                catalog: Arc::new(FakeCatalog::with_urls(&["https://img.example/a.jpg"])),
                images: Arc::new(FakeImages::default()),
                vision: Arc::new(FakeVision::default()),
                completion: Arc::new(FakeCompletion::replying("ok")),
                index: memory_index(),
            },
            &AppConfig::default(),
        );
        MarsMcpServer::new(Arc::new(service))
    }

    #[tokio::test]
    async fn lists_the_three_tools() {
        let response = handle_jsonrpc_request(
            &server(),
            json!({ "jsonrpc": "2.0", "id": 1, "method": "tools/list" }),
        )
        .await
        .unwrap();

        let mut names: Vec<_> = response["result"]["tools"]
            .as_array()
            .unwrap()
            .iter()
            .map(|tool| tool["name"].as_str().unwrap().to_string())
            .collect();
        names.sort();
        assert_eq!(names, ["analyze_catalog", "ask_question", "ingest_images"]);
    }

    #[tokio::test]
    async fn ask_on_empty_index_returns_sentinel() {
        let response = handle_jsonrpc_request(
            &server(),
            json!({
                "jsonrpc": "2.0",
                "id": 7,
                "method": "tools/call",
                "params": { "name": "ask_question", "arguments": { "question": "dunes?" } }
            }),
        )
        .await
        .unwrap();

        assert_eq!(response["id"], 7);
        assert_eq!(
            response["result"]["structuredContent"]["answer"],
            NO_DATA_MESSAGE
        );
    }

    #[tokio::test]
    async fn blank_question_maps_to_invalid_params() {
        let response = handle_jsonrpc_request(
            &server(),
            json!({
                "jsonrpc": "2.0",
                "id": 2,
                "method": "tools/call",
                "params": { "name": "ask_question", "arguments": { "question": " " } }
            }),
        )
        .await
        .unwrap();

        assert_eq!(response["error"]["code"], -32602);
    }

    #[tokio::test]
    async fn notifications_and_unknown_methods() {
        let server = server();
        assert!(handle_jsonrpc_request(
            &server,
            json!({ "jsonrpc": "2.0", "method": "notifications/initialized" })
        )
        .await
        .is_none());

        let response = handle_jsonrpc_request(
            &server,
            json!({ "jsonrpc": "2.0", "id": 3, "method": "resources/list" }),
        )
        .await
        .unwrap();
        assert_eq!(response["error"]["code"], -32601);
    }
}
