// Interfaces exposed by optional adapters (MCP stdio server, HTTP service).
//
// Each submodule is feature-gated by the capability it implements.
#[cfg(feature = "http-service")]
pub mod http;
#[cfg(feature = "mcp-server")]
pub mod mcp;
