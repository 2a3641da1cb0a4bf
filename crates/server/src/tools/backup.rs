//! export_offline_data and import_offline_data tool implementations.

use super::json_result;
use crate::error::ToolError;
use lexcache_core::{ImportOutcome, OfflineEngine};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Output from the export_offline_data tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ExportOutput {
    /// Path of the snapshot file written.
    pub path: String,
}

/// Parameters for the import_offline_data tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ImportParams {
    /// Path of a snapshot file written by export_offline_data.
    pub path: String,
}

/// Output from the import_offline_data tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ImportOutput {
    pub success: bool,
    #[serde(flatten)]
    pub outcome: ImportOutcome,
}

/// Implementation of the export_offline_data tool.
pub async fn export_impl(engine: &OfflineEngine) -> Result<CallToolResult, McpError> {
    let path = engine.export_offline_data().await?;
    json_result(&ExportOutput { path: path.display().to_string() })
}

/// Implementation of the import_offline_data tool.
pub async fn import_impl(engine: &OfflineEngine, params: ImportParams) -> Result<CallToolResult, McpError> {
    if params.path.trim().is_empty() {
        return Err(ToolError::InvalidInput("path cannot be empty".into()).into());
    }

    let outcome = engine.import_offline_data(&PathBuf::from(params.path)).await?;
    json_result(&ImportOutput { success: true, outcome })
}
