pub mod mcp_client;
pub mod openai_client;
