//! offline_deploy tool implementation.
//!
//! Installs this deployment's generation and activates it straight away.

use bivouac_client::{Network, OfflineService};
use bivouac_core::{CacheStorage, Error};
use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the offline_deploy tool. There are none; the generation and
/// manifest come from configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct OfflineDeployParams {}

/// Output from the offline_deploy tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct OfflineDeployOutput {
    pub generation: String,

    /// Number of precached resources.
    pub entries: usize,

    /// Generations removed during activation.
    pub deleted: Vec<String>,

    /// Open clients that switched to the new generation.
    pub claimed: usize,
}

/// Implementation of the offline_deploy tool.
pub async fn deploy_impl<N, S>(
    service: &OfflineService<N, S>, _params: OfflineDeployParams,
) -> Result<CallToolResult, McpError>
where
    N: Network + 'static,
    S: CacheStorage + 'static,
{
    let report = service.deploy().await?;

    let output = OfflineDeployOutput {
        generation: report.install.generation,
        entries: report.install.entries,
        deleted: report.activation.deleted,
        claimed: report.activation.claimed,
    };

    let json = serde_json::to_string_pretty(&output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize output: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}
