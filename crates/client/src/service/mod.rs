//! The offline cache service.
//!
//! ### Lifecycle
//! - `install`: precache every manifest resource with cache-bypass semantics;
//!   all-or-nothing.
//! - `activate`: delete every other generation, claim open clients.
//! - `deploy`: install then activate immediately (no waiting for old
//!   clients to close).
//!
//! ### Fetch interception
//! Requests are routed through a declarative [`Router`]. Anything that is not
//! a same-origin GET, or arrives while no generation is active, is passed
//! through untouched. Stores that follow a successful fetch run in the
//! background; see [`OfflineService::flush`].

pub mod clients;
mod lifecycle;
mod strategy;

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use bivouac_core::{
    AppConfig, CacheDb, CacheStorage, Error, Generation, GenerationName, GenerationState, PassthroughReason, PrecacheManifest,
    Request, Response, RouteDecision, Router, Scope, Strategy,
};
use tokio::task::JoinSet;
use url::Url;

use crate::fetch::{FetchClient, FetchConfig, Network};

pub use clients::Clients;
pub use lifecycle::{ActivationReport, DeployReport, InstallReport};

/// What the service decided to do with an intercepted request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Not handled; default network behaviour applies.
    Passthrough(PassthroughReason),
    Respond(Response),
}

impl FetchOutcome {
    pub fn response(&self) -> Option<&Response> {
        match self {
            FetchOutcome::Respond(response) => Some(response),
            FetchOutcome::Passthrough(_) => None,
        }
    }
}

/// Deploy-time inputs of the service.
#[derive(Debug, Clone)]
pub struct ServiceSettings {
    pub scope: Scope,
    pub manifest: PrecacheManifest,
    pub generation: GenerationName,
    pub offline_page: String,
    pub router: Router,
    /// Open clients, shared with services for other versions.
    pub clients: Arc<Clients>,
}

impl ServiceSettings {
    pub fn from_config(config: &AppConfig) -> Result<Self, Error> {
        Ok(Self {
            scope: config.scope()?,
            manifest: config.precache_manifest()?,
            generation: config.generation_name()?,
            offline_page: config.offline_page.clone(),
            router: Router::default(),
            clients: Arc::new(Clients::new()),
        })
    }
}

/// Snapshot of the service for status reporting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceStatus {
    pub generation: String,
    pub state: GenerationState,
    pub active: Option<String>,
    pub generations: Vec<Generation>,
    pub pending_stores: usize,
    pub failed_stores: usize,
}

pub struct OfflineService<N, S> {
    scope: Scope,
    manifest: PrecacheManifest,
    generation: GenerationName,
    offline_url: Url,
    router: Router,
    network: Arc<N>,
    store: Arc<S>,
    clients: Arc<Clients>,
    installing: AtomicBool,
    pending: Mutex<JoinSet<bool>>,
    failed_stores: Arc<AtomicUsize>,
}

/// The production wiring: reqwest on the network side, SQLite for storage.
pub type SiteService = OfflineService<FetchClient, CacheDb>;

impl OfflineService<FetchClient, CacheDb> {
    /// Open the cache database and build the network client from `config`.
    pub async fn open(config: &AppConfig) -> Result<Self, Error> {
        let store = CacheDb::open(&config.db_path).await?;
        let network = FetchClient::new(FetchConfig::from(config))?;
        Self::new(ServiceSettings::from_config(config)?, Arc::new(network), Arc::new(store))
    }
}

impl<N, S> OfflineService<N, S>
where
    N: Network + 'static,
    S: CacheStorage + 'static,
{
    pub fn new(settings: ServiceSettings, network: Arc<N>, store: Arc<S>) -> Result<Self, Error> {
        if !settings.manifest.contains(&settings.offline_page) {
            return Err(Error::InvalidInput(format!(
                "offline page {:?} is not in the precache manifest",
                settings.offline_page
            )));
        }
        let offline_url = settings.scope.resolve(&settings.offline_page)?;

        Ok(Self {
            scope: settings.scope,
            manifest: settings.manifest,
            generation: settings.generation,
            offline_url,
            router: settings.router,
            network,
            store,
            clients: settings.clients,
            installing: AtomicBool::new(false),
            pending: Mutex::new(JoinSet::new()),
            failed_stores: Arc::new(AtomicUsize::new(0)),
        })
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    pub fn generation(&self) -> &GenerationName {
        &self.generation
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    pub fn clients(&self) -> &Clients {
        &self.clients
    }

    /// Handle to the client registry, for the service of the next version.
    pub fn shared_clients(&self) -> Arc<Clients> {
        Arc::clone(&self.clients)
    }

    /// Track the page `id`. A new page is controlled by the generation active
    /// when it opens (if any); a known page keeps its controller. Returns the
    /// controller.
    pub async fn attach_client(&self, id: &str) -> Result<Option<String>, Error> {
        let active = self.store.active_generation().await?;
        let controller = self.clients.attach_if_absent(id, active).await;
        tracing::debug!(client = id, controller = ?controller, "client attached");
        Ok(controller)
    }

    pub fn network(&self) -> &N {
        &self.network
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Lifecycle state of this deployment's generation.
    pub async fn state(&self) -> Result<GenerationState, Error> {
        if self.installing.load(Ordering::SeqCst) {
            return Ok(GenerationState::Installing);
        }
        Ok(self
            .store
            .generation_state(self.generation.as_str())
            .await?
            .unwrap_or(GenerationState::Absent))
    }

    pub async fn status(&self) -> Result<ServiceStatus, Error> {
        Ok(ServiceStatus {
            generation: self.generation.to_string(),
            state: self.state().await?,
            active: self.store.active_generation().await?,
            generations: self.store.list_generations().await?,
            pending_stores: self.pending().len(),
            failed_stores: self.failed_stores.load(Ordering::SeqCst),
        })
    }

    /// URLs cached in the active generation.
    pub async fn cached_urls(&self) -> Result<Vec<String>, Error> {
        match self.store.active_generation().await? {
            Some(generation) => self.store.keys(&generation).await,
            None => Ok(Vec::new()),
        }
    }

    /// Decide how to answer an intercepted request and produce the response
    /// when the service handles it.
    pub async fn handle_fetch(&self, request: &Request) -> Result<FetchOutcome, Error> {
        let strategy = match self.router.route(&self.scope, request) {
            RouteDecision::Passthrough(reason) => {
                tracing::debug!(url = %request.url, method = %request.method, reason = reason.as_str(), "passthrough");
                return Ok(FetchOutcome::Passthrough(reason));
            }
            RouteDecision::Handle { route, strategy } => {
                tracing::debug!(url = %request.url, route, strategy = strategy.as_str(), "routed");
                strategy
            }
        };

        let Some(generation) = self.store.active_generation().await? else {
            return Ok(FetchOutcome::Passthrough(PassthroughReason::NotControlled));
        };

        let response = match strategy {
            Strategy::NetworkFirst => self.network_first(&generation, request).await?,
            Strategy::CacheFirst => self.cache_first(&generation, request).await?,
        };

        Ok(FetchOutcome::Respond(response))
    }

    /// Like [`handle_fetch`](Self::handle_fetch), but performs the default
    /// network fetch for passthrough requests.
    pub async fn fetch(&self, request: &Request) -> Result<Response, Error> {
        match self.handle_fetch(request).await? {
            FetchOutcome::Respond(response) => Ok(response),
            FetchOutcome::Passthrough(_) => self.network.fetch(request).await,
        }
    }

    fn pending(&self) -> MutexGuard<'_, JoinSet<bool>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}


#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;
    use crate::fetch::StubNetwork;

    #[tokio::test]
    async fn test_new_rejects_offline_page_outside_manifest() {
        let mut settings = settings("v1");
        settings.offline_page = "missing.html".into();
        let db = Arc::new(CacheDb::open_in_memory().await.unwrap());
        let result = OfflineService::new(settings, Arc::new(StubNetwork::new()), db);
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_not_controlled_before_activation() {
        let net = site_network();
        let db = Arc::new(CacheDb::open_in_memory().await.unwrap());
        let svc = service("v1", net, db).await;

        let outcome = svc.handle_fetch(&Request::get(url("styles.css"))).await.unwrap();

        assert_eq!(outcome, FetchOutcome::Passthrough(PassthroughReason::NotControlled));
        assert_eq!(svc.state().await.unwrap(), GenerationState::Absent);
    }

    #[tokio::test]
    async fn test_cross_origin_untouched() {
        let (svc, net, db) = deployed("v1").await;
        let calls_before = net.call_count();
        let entries_before = db.entry_count("site-v1").await.unwrap();

        let req = Request::get(Url::parse("https://cdn.example.net/lib.js").unwrap());
        let outcome = svc.handle_fetch(&req).await.unwrap();
        svc.flush().await;

        assert_eq!(outcome, FetchOutcome::Passthrough(PassthroughReason::CrossOrigin));
        assert_eq!(net.call_count(), calls_before);
        assert_eq!(db.entry_count("site-v1").await.unwrap(), entries_before);
    }

    #[tokio::test]
    async fn test_non_get_untouched() {
        let (svc, net, db) = deployed("v1").await;
        let calls_before = net.call_count();
        let entries_before = db.entry_count("site-v1").await.unwrap();

        let req = Request::get(url("contact")).with_method("POST");
        let outcome = svc.handle_fetch(&req).await.unwrap();
        svc.flush().await;

        assert_eq!(outcome, FetchOutcome::Passthrough(PassthroughReason::NotGet));
        assert_eq!(net.call_count(), calls_before);
        assert_eq!(db.entry_count("site-v1").await.unwrap(), entries_before);
    }

    #[tokio::test]
    async fn test_fetch_performs_passthrough() {
        let (svc, net, _db) = deployed("v1").await;
        net.respond("https://cdn.example.net/lib.js", 200, "lib");

        let req = Request::get(Url::parse("https://cdn.example.net/lib.js").unwrap());
        let response = svc.fetch(&req).await.unwrap();

        assert_eq!(response.body, b"lib".to_vec());
        assert_eq!(net.calls_for("https://cdn.example.net/lib.js"), 1);
    }

    #[tokio::test]
    async fn test_attach_client_takes_active_controller() {
        let net = site_network();
        let db = Arc::new(CacheDb::open_in_memory().await.unwrap());
        let svc = service("v1", net, db).await;

        assert_eq!(svc.attach_client("early").await.unwrap(), None);
        svc.deploy().await.unwrap();
        assert_eq!(svc.attach_client("late").await.unwrap().as_deref(), Some("site-v1"));
        assert_eq!(svc.clients().controller("early").await.as_deref(), Some("site-v1"));
    }

    #[tokio::test]
    async fn test_status_reports_active_generation() {
        let (svc, _net, _db) = deployed("v1").await;
        let status = svc.status().await.unwrap();

        assert_eq!(status.generation, "site-v1");
        assert_eq!(status.state, GenerationState::Active);
        assert_eq!(status.active.as_deref(), Some("site-v1"));
        assert_eq!(status.generations.len(), 1);
        assert_eq!(status.generations[0].name, "site-v1");
        assert_eq!(status.generations[0].state, GenerationState::Active);
        assert!(status.generations[0].activated_at.is_some());
        assert_eq!(status.failed_stores, 0);
        assert_eq!(svc.cached_urls().await.unwrap().len(), MANIFEST.len());
    }
}
