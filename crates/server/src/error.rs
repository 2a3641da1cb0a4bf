//! Request-level errors for the lexcache MCP server.
//!
//! Engine failures convert through `lexcache_core::Error`; these cover the
//! checks the adapter makes before calling the engine and the encoding of
//! its replies.

use rmcp::model::{ErrorCode, ErrorData as McpError};

/// Request-level errors for the lexcache MCP server.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    /// Invalid input parameters (e.g., an empty query).
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// Tool output could not be encoded.
    #[error("SERIALIZATION_ERROR: {0}")]
    OutputFailed(String),
}

impl From<ToolError> for McpError {
    fn from(err: ToolError) -> Self {
        let (code, message) = match &err {
            ToolError::InvalidInput(msg) => (-32602, msg.clone()),
            ToolError::OutputFailed(msg) => (-32603, msg.clone()),
        };

        McpError { code: ErrorCode(code), message: message.into(), data: None }
    }
}
