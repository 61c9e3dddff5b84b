//! offline_status tool implementation.

use bivouac_client::{Network, OfflineService};
use bivouac_core::{CacheStorage, Error, Generation};
use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the offline_status tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct OfflineStatusParams {
    /// Also list the URLs cached in the active generation.
    #[serde(default)]
    pub include_keys: bool,
}

/// One stored generation.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct GenerationInfo {
    pub name: String,
    pub version: String,
    pub state: String,
    pub created_at: String,
    pub activated_at: Option<String>,
}

impl From<Generation> for GenerationInfo {
    fn from(generation: Generation) -> Self {
        Self {
            name: generation.name,
            version: generation.version,
            state: generation.state.to_string(),
            created_at: generation.created_at,
            activated_at: generation.activated_at,
        }
    }
}

/// Output from the offline_status tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct OfflineStatusOutput {
    /// Generation this deployment installs.
    pub generation: String,

    /// Its lifecycle state.
    pub state: String,

    /// Generation currently serving requests.
    pub active: Option<String>,

    /// Every generation present in storage.
    pub generations: Vec<GenerationInfo>,

    /// Number of attached clients.
    pub clients: usize,

    pub scope: String,
    pub pending_stores: usize,
    pub failed_stores: usize,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub keys: Option<Vec<String>>,
}

/// Implementation of the offline_status tool.
pub async fn status_impl<N, S>(
    service: &OfflineService<N, S>, params: OfflineStatusParams,
) -> Result<CallToolResult, McpError>
where
    N: Network + 'static,
    S: CacheStorage + 'static,
{
    let status = service.status().await?;
    let keys = if params.include_keys { Some(service.cached_urls().await?) } else { None };

    let output = OfflineStatusOutput {
        generation: status.generation,
        state: status.state.to_string(),
        active: status.active,
        generations: status.generations.into_iter().map(GenerationInfo::from).collect(),
        clients: service.clients().len().await,
        scope: service.scope().url().to_string(),
        pending_stores: status.pending_stores,
        failed_stores: status.failed_stores,
        keys,
    };

    let json = serde_json::to_string_pretty(&output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize output: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::testing::{deployed, output_text, undeployed};

    #[tokio::test]
    async fn test_status_after_deploy() {
        let (svc, _net) = deployed().await;

        let result = status_impl(&svc, OfflineStatusParams { include_keys: true }).await.unwrap();
        let output: OfflineStatusOutput = serde_json::from_str(&output_text(&result)).unwrap();

        assert_eq!(output.generation, "site-v1");
        assert_eq!(output.state, "active");
        assert_eq!(output.active.as_deref(), Some("site-v1"));
        assert_eq!(output.scope, "https://example.com/");
        assert_eq!(output.generations.len(), 1);
        assert_eq!(output.generations[0].version, "v1");
        assert!(output.generations[0].activated_at.is_some());
        assert_eq!(output.keys.map(|k| k.len()), Some(3));
    }

    #[tokio::test]
    async fn test_status_before_deploy() {
        let (svc, _net) = undeployed().await;

        let result = status_impl(&svc, OfflineStatusParams::default()).await.unwrap();
        let output: OfflineStatusOutput = serde_json::from_str(&output_text(&result)).unwrap();

        assert_eq!(output.state, "absent");
        assert!(output.active.is_none());
        assert!(output.generations.is_empty());
        assert!(output.keys.is_none());
    }
}
