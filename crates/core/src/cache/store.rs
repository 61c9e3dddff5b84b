//! Storage abstraction used by the offline service.
//!
//! Every operation is individually atomic and scoped to one key or one
//! generation; install and activate are the only multi-row writes and each
//! is a single transaction in the SQLite backend.

use super::connection::CacheDb;
use crate::generation::{Generation, GenerationName, GenerationState};
use crate::{Error, Request, Response};

#[async_trait::async_trait]
pub trait CacheStorage: Send + Sync {
    /// Persist a fully fetched generation, all-or-nothing.
    async fn install(&self, generation: &GenerationName, entries: Vec<(Request, Response)>) -> Result<usize, Error>;

    /// Delete every other generation and mark `name` active. Returns the
    /// deleted names.
    async fn activate(&self, name: &str) -> Result<Vec<String>, Error>;

    /// Every stored generation with its state and timestamps.
    async fn list_generations(&self) -> Result<Vec<Generation>, Error>;

    async fn generation_state(&self, name: &str) -> Result<Option<GenerationState>, Error>;

    async fn active_generation(&self) -> Result<Option<String>, Error>;

    async fn match_request(&self, generation: &str, request: &Request) -> Result<Option<Response>, Error>;

    async fn put(&self, generation: &str, request: &Request, response: &Response) -> Result<(), Error>;

    async fn keys(&self, generation: &str) -> Result<Vec<String>, Error>;
}

#[async_trait::async_trait]
impl CacheStorage for CacheDb {
    async fn install(&self, generation: &GenerationName, entries: Vec<(Request, Response)>) -> Result<usize, Error> {
        self.install_generation(generation, entries).await
    }

    async fn activate(&self, name: &str) -> Result<Vec<String>, Error> {
        self.activate_generation(name).await
    }

    async fn list_generations(&self) -> Result<Vec<Generation>, Error> {
        CacheDb::list_generations(self).await
    }

    async fn generation_state(&self, name: &str) -> Result<Option<GenerationState>, Error> {
        CacheDb::generation_state(self, name).await
    }

    async fn active_generation(&self) -> Result<Option<String>, Error> {
        CacheDb::active_generation(self).await
    }

    async fn match_request(&self, generation: &str, request: &Request) -> Result<Option<Response>, Error> {
        self.match_entry(generation, request).await
    }

    async fn put(&self, generation: &str, request: &Request, response: &Response) -> Result<(), Error> {
        self.put_entry(generation, request, response).await
    }

    async fn keys(&self, generation: &str) -> Result<Vec<String>, Error> {
        self.entry_urls(generation).await
    }
}
