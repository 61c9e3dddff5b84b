//! Client side of bivouac.
//!
//! This crate provides the network boundary and the offline cache service
//! (install, activate, fetch interception) shared by the server and CLI.

pub mod fetch;
pub mod service;

pub use fetch::{FetchClient, FetchConfig, Network, StubNetwork, UrlError, resolve};

pub use service::{
    ActivationReport, Clients, DeployReport, FetchOutcome, InstallReport, OfflineService, ServiceSettings,
    ServiceStatus, SiteService,
};
