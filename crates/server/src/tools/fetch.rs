//! offline_fetch tool implementation.
//!
//! Sends a request through the offline cache service and reports how it was
//! answered.

use bivouac_client::{FetchOutcome, Network, OfflineService, resolve};
use bivouac_core::{CacheStorage, Error, Request, Response};
use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the offline_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct OfflineFetchParams {
    /// Absolute URL, or a path relative to the service scope.
    pub url: String,

    /// Treat the request as a top-level page navigation.
    #[serde(default)]
    pub navigate: bool,

    /// Accept header to send.
    pub accept: Option<String>,

    /// HTTP method (default: GET).
    pub method: Option<String>,

    /// Page making the request. The first request from a page attaches it as
    /// a client of the cache.
    pub client_id: Option<String>,
}

/// Output from the offline_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct OfflineFetchOutput {
    pub url: String,
    pub status: u16,

    /// "network" or "cache".
    pub source: String,

    /// Why the service left the request alone, if it did.
    pub passthrough: Option<String>,

    /// Generation controlling the requesting client.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub controller: Option<String>,

    pub content_type: Option<String>,
    pub body_bytes: usize,

    /// Body decoded as UTF-8 (lossy).
    pub body: String,
}

impl OfflineFetchOutput {
    fn new(response: &Response, passthrough: Option<&str>) -> Self {
        Self {
            url: response.url.to_string(),
            status: response.status,
            source: response.source.as_str().to_string(),
            passthrough: passthrough.map(str::to_string),
            controller: None,
            content_type: response.content_type().map(str::to_string),
            body_bytes: response.body.len(),
            body: String::from_utf8_lossy(&response.body).into_owned(),
        }
    }
}

pub fn build_request<N, S>(service: &OfflineService<N, S>, params: &OfflineFetchParams) -> Result<Request, Error>
where
    N: Network + 'static,
    S: CacheStorage + 'static,
{
    let url = resolve(service.scope(), &params.url)?;
    let mut request = if params.navigate { Request::navigate(url) } else { Request::get(url) };
    if let Some(accept) = &params.accept {
        request = request.with_header("Accept", accept.as_str());
    }
    if let Some(method) = &params.method {
        if method.trim().is_empty() {
            return Err(Error::InvalidInput("method must not be empty".to_string()));
        }
        request = request.with_method(method.trim());
    }
    Ok(request)
}

/// Implementation of the offline_fetch tool.
pub async fn fetch_impl<N, S>(
    service: &OfflineService<N, S>, params: OfflineFetchParams,
) -> Result<CallToolResult, McpError>
where
    N: Network + 'static,
    S: CacheStorage + 'static,
{
    let request = build_request(service, &params)?;
    let controller = match params.client_id.as_deref().map(str::trim) {
        Some("") => return Err(Error::InvalidInput("client_id must not be empty".to_string()).into()),
        Some(id) => service.attach_client(id).await?,
        None => None,
    };

    let mut output = match service.handle_fetch(&request).await? {
        FetchOutcome::Respond(response) => OfflineFetchOutput::new(&response, None),
        FetchOutcome::Passthrough(reason) => {
            let response = service.network().fetch(&request).await?;
            OfflineFetchOutput::new(&response, Some(reason.as_str()))
        }
    };
    output.controller = controller;

    let json = serde_json::to_string_pretty(&output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize output: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::deploy::{OfflineDeployOutput, OfflineDeployParams, deploy_impl};
    use crate::tools::testing::{deployed, output_text, undeployed};

    fn params(url: &str) -> OfflineFetchParams {
        OfflineFetchParams { url: url.to_string(), navigate: false, accept: None, method: None, client_id: None }
    }

    #[tokio::test]
    async fn test_fetch_cached_asset() {
        let (svc, _net) = deployed().await;

        let result = fetch_impl(&svc, params("styles.css")).await.unwrap();
        let output: OfflineFetchOutput = serde_json::from_str(&output_text(&result)).unwrap();

        assert_eq!(output.source, "cache");
        assert_eq!(output.status, 200);
        assert_eq!(output.body, "body{}");
        assert!(output.passthrough.is_none());
    }

    #[tokio::test]
    async fn test_fetch_offline_navigation_gets_offline_page() {
        let (svc, net) = deployed().await;
        net.set_offline(true);

        let mut p = params("blog/post");
        p.navigate = true;
        let result = fetch_impl(&svc, p).await.unwrap();
        let output: OfflineFetchOutput = serde_json::from_str(&output_text(&result)).unwrap();

        assert_eq!(output.source, "cache");
        assert_eq!(output.body, "<h1>offline</h1>");
    }

    #[tokio::test]
    async fn test_fetch_post_is_passthrough() {
        let (svc, net) = deployed().await;
        net.respond("https://example.com/contact", 200, "sent");

        let mut p = params("contact");
        p.method = Some("post".to_string());
        let result = fetch_impl(&svc, p).await.unwrap();
        let output: OfflineFetchOutput = serde_json::from_str(&output_text(&result)).unwrap();

        assert_eq!(output.passthrough.as_deref(), Some("not-get"));
        assert_eq!(output.source, "network");
    }

    #[tokio::test]
    async fn test_fetch_attaches_client_claimed_by_deploy() {
        let (svc, _net) = undeployed().await;
        let mut p = params("styles.css");
        p.client_id = Some("tab-1".to_string());

        let result = fetch_impl(&svc, p.clone()).await.unwrap();
        let output: OfflineFetchOutput = serde_json::from_str(&output_text(&result)).unwrap();
        assert_eq!(output.passthrough.as_deref(), Some("not-controlled"));
        assert!(output.controller.is_none());

        let result = deploy_impl(&svc, OfflineDeployParams::default()).await.unwrap();
        let deployed: OfflineDeployOutput = serde_json::from_str(&output_text(&result)).unwrap();
        assert_eq!(deployed.claimed, 1);

        let result = fetch_impl(&svc, p).await.unwrap();
        let output: OfflineFetchOutput = serde_json::from_str(&output_text(&result)).unwrap();
        assert_eq!(output.controller.as_deref(), Some("site-v1"));
        assert_eq!(output.source, "cache");
    }

    #[tokio::test]
    async fn test_navigation_with_extra_accept_stays_network_first() {
        let (svc, net) = deployed().await;
        net.set_offline(true);

        let mut p = params("blog/post");
        p.navigate = true;
        p.accept = Some("application/json".to_string());
        let result = fetch_impl(&svc, p).await.unwrap();
        let output: OfflineFetchOutput = serde_json::from_str(&output_text(&result)).unwrap();
        assert_eq!(output.body, "<h1>offline</h1>");
    }

    #[tokio::test]
    async fn test_fetch_rejects_non_http_url() {
        let (svc, _net) = deployed().await;
        let result = fetch_impl(&svc, params("ftp://example.com/file")).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_build_request_sets_accept() {
        let (svc, _net) = deployed().await;
        let mut p = params("https://example.com/page");
        p.accept = Some("text/html".to_string());

        let request = build_request(&svc, &p).unwrap();

        assert!(request.accepts_html());
        assert!(request.is_get());
    }
}
