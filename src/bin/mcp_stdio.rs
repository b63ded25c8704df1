/// MCP server over stdin/stdout for clients that spawn a process.
///
/// ```json
/// {
///   "mcpServers": {
///     "marsrag": { "command": "/path/to/mcp-stdio", "args": [] }
///   }
/// }
/// ```
///
/// Environment: `MARSRAG_LOG`, `MARSRAG_DATA_DIR`, `OPENAI_API_KEY`.
#[tokio::main]
async fn main() {
    if let Err(err) = marsrag_lib::run_mcp_stdio().await {
        eprintln!("[marsrag::mcp-stdio] runtime failed: {err:?}");
        std::process::exit(1);
    }
}
