// MCP client side: JSON-RPC wire types and the tool gateway built on them
pub mod gateway;
pub mod protocol;
