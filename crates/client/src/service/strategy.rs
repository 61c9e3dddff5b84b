//! Network-first and cache-first strategies, and background stores.

use std::sync::Arc;
use std::sync::atomic::Ordering;

use bivouac_core::{CacheStorage, Error, Request, Response};

use super::OfflineService;
use crate::fetch::Network;

impl<N, S> OfflineService<N, S>
where
    N: Network + 'static,
    S: CacheStorage + 'static,
{
    /// Network, then the cached copy, then the offline page.
    ///
    /// Network errors never reach the caller. A non-success status is
    /// returned as-is and not cached.
    pub(super) async fn network_first(&self, generation: &str, request: &Request) -> Result<Response, Error> {
        let err = match self.network.fetch(request).await {
            Ok(response) => {
                if response.is_success() {
                    self.store_in_background(generation, request, &response);
                }
                return Ok(response);
            }
            Err(err) => err,
        };

        if let Some(cached) = self.store.match_request(generation, request).await? {
            tracing::debug!(url = %request.url, error = %err, "network failed, serving cached copy");
            return Ok(cached);
        }

        let offline = Request::get(self.offline_url.clone());
        match self.store.match_request(generation, &offline).await? {
            Some(page) => {
                tracing::debug!(url = %request.url, error = %err, "network failed, serving offline page");
                Ok(page)
            }
            None => Err(Error::CacheMiss(format!(
                "{} unreachable and offline page {} missing from {generation}",
                request.url, self.offline_url
            ))),
        }
    }

    /// Cached copy if present, otherwise network (storing a successful
    /// response). A network error with nothing cached is returned to the
    /// caller.
    pub(super) async fn cache_first(&self, generation: &str, request: &Request) -> Result<Response, Error> {
        if let Some(cached) = self.store.match_request(generation, request).await? {
            tracing::debug!(url = %request.url, "cache hit");
            return Ok(cached);
        }

        tracing::debug!(url = %request.url, "cache miss");
        let response = self.network.fetch(request).await?;
        if response.is_success() {
            self.store_in_background(generation, request, &response);
        }
        Ok(response)
    }

    /// Store a copy without holding up the response.
    ///
    /// Failures (quota, a generation deleted by a concurrent activation) are
    /// logged and counted, never returned.
    fn store_in_background(&self, generation: &str, request: &Request, response: &Response) {
        let store = Arc::clone(&self.store);
        let failed = Arc::clone(&self.failed_stores);
        let generation = generation.to_string();
        let request = request.clone();
        let response = response.clone();

        let mut pending = self.pending();
        while pending.try_join_next().is_some() {}
        pending.spawn(async move {
            match store.put(&generation, &request, &response).await {
                Ok(()) => {
                    tracing::debug!(url = %request.url, generation, "stored response");
                    true
                }
                Err(err) => {
                    failed.fetch_add(1, Ordering::SeqCst);
                    tracing::warn!(url = %request.url, generation, error = %err, "failed to store response");
                    false
                }
            }
        });
    }

    /// Wait for every background store started so far. Returns how many of
    /// them failed.
    pub async fn flush(&self) -> usize {
        let mut pending = std::mem::take(&mut *self.pending());
        let mut failed = 0;
        while let Some(result) = pending.join_next().await {
            match result {
                Ok(true) => {}
                Ok(false) => failed += 1,
                Err(err) => {
                    failed += 1;
                    self.failed_stores.fetch_add(1, Ordering::SeqCst);
                    tracing::warn!(error = %err, "background store task did not complete");
                }
            }
        }
        failed
    }

    /// Background stores that failed since the service started.
    pub fn failed_stores(&self) -> usize {
        self.failed_stores.load(Ordering::SeqCst)
    }
}
