//! MCP tool implementations.
//!
//! This module contains all tools exposed by the bivouac server.

pub mod deploy;
pub mod fetch;
pub mod status;

pub use deploy::{OfflineDeployParams, deploy_impl};
pub use fetch::{OfflineFetchParams, fetch_impl};
pub use status::{OfflineStatusParams, status_impl};

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Arc;

    use bivouac_client::{Clients, OfflineService, ServiceSettings, StubNetwork};
    use bivouac_core::{CacheDb, GenerationName, PrecacheManifest, Router, Scope};
    use rmcp::model::CallToolResult;

    pub type TestService = OfflineService<StubNetwork, CacheDb>;

    pub async fn undeployed() -> (TestService, Arc<StubNetwork>) {
        let net = StubNetwork::new();
        net.respond("https://example.com/styles.css", 200, "body{}");
        net.respond("https://example.com/script.js", 200, "console.log(1)");
        net.respond("https://example.com/offline.html", 200, "<h1>offline</h1>");
        let net = Arc::new(net);

        let settings = ServiceSettings {
            scope: Scope::new("https://example.com/").unwrap(),
            manifest: PrecacheManifest::new(["styles.css", "script.js", "offline.html"]).unwrap(),
            generation: GenerationName::new("site", "v1").unwrap(),
            offline_page: "offline.html".to_string(),
            router: Router::default(),
            clients: Arc::new(Clients::new()),
        };
        let db = Arc::new(CacheDb::open_in_memory().await.unwrap());
        (OfflineService::new(settings, net.clone(), db).unwrap(), net)
    }

    pub async fn deployed() -> (TestService, Arc<StubNetwork>) {
        let (svc, net) = undeployed().await;
        svc.deploy().await.unwrap();
        (svc, net)
    }

    /// Text of the first content block.
    pub fn output_text(result: &CallToolResult) -> String {
        let content_val = serde_json::to_value(&result.content[0]).unwrap();
        content_val
            .get("text")
            .and_then(|v| v.as_str())
            .expect("Expected text field in content")
            .to_string()
    }
}
