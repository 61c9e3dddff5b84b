//! Install and activate.

use std::sync::atomic::Ordering;

use bivouac_core::{CacheMode, CacheStorage, Error, GenerationState, Request, Response};
use futures_util::future::try_join_all;
use url::Url;

use super::OfflineService;
use crate::fetch::Network;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallReport {
    pub generation: String,
    pub entries: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivationReport {
    pub generation: String,
    /// Generations deleted during cutover.
    pub deleted: Vec<String>,
    /// Clients that switched to this generation.
    pub claimed: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployReport {
    pub install: InstallReport,
    pub activation: ActivationReport,
}

impl<N, S> OfflineService<N, S>
where
    N: Network + 'static,
    S: CacheStorage + 'static,
{
    /// Precache the manifest into this deployment's generation.
    ///
    /// Every resource is fetched with cache-bypass semantics and must come
    /// back with a success status. Nothing is written unless all of them do,
    /// so on failure the previously active generation keeps serving.
    pub async fn install(&self) -> Result<InstallReport, Error> {
        if self.installing.swap(true, Ordering::SeqCst) {
            return Err(Error::InvalidTransition {
                from: GenerationState::Installing.to_string(),
                to: GenerationState::Installing.to_string(),
            });
        }

        let result = self.precache().await;
        self.installing.store(false, Ordering::SeqCst);

        match result {
            Ok(entries) => {
                tracing::info!(generation = %self.generation, entries, "installed cache generation");
                Ok(InstallReport { generation: self.generation.to_string(), entries })
            }
            Err(err) => {
                tracing::warn!(generation = %self.generation, error = %err, "install failed; previous generation stays in control");
                Err(err)
            }
        }
    }

    async fn precache(&self) -> Result<usize, Error> {
        let persisted = self
            .store
            .generation_state(self.generation.as_str())
            .await?
            .unwrap_or(GenerationState::Absent);
        persisted.transition(GenerationState::Installing)?;

        let urls = self.manifest.resolve(&self.scope)?;
        let entries = try_join_all(urls.into_iter().map(|url| self.precache_one(url))).await?;

        self.store.install(&self.generation, entries).await
    }

    async fn precache_one(&self, url: Url) -> Result<(Request, Response), Error> {
        let request = Request::get(url).with_cache_mode(CacheMode::Reload);
        let response = self
            .network
            .fetch(&request)
            .await
            .map_err(|e| Error::InstallFailed { url: request.url.to_string(), reason: e.to_string() })?;

        if !response.is_success() {
            return Err(Error::InstallFailed {
                url: request.url.to_string(),
                reason: format!("status {}", response.status),
            });
        }

        Ok((request, response))
    }

    /// Make this deployment's generation the only one and take control of
    /// every open client.
    pub async fn activate(&self) -> Result<ActivationReport, Error> {
        let deleted = self.store.activate(self.generation.as_str()).await?;
        let claimed = self.clients.claim(self.generation.as_str()).await;

        tracing::info!(
            generation = %self.generation,
            deleted = ?deleted,
            claimed,
            "activated cache generation"
        );

        Ok(ActivationReport { generation: self.generation.to_string(), deleted, claimed })
    }

    /// Install and activate straight away.
    pub async fn deploy(&self) -> Result<DeployReport, Error> {
        let install = self.install().await?;
        let activation = self.activate().await?;
        Ok(DeployReport { install, activation })
    }
}
