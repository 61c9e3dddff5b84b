//! Core types and storage for the bivouac offline cache.
//!
//! This crate provides:
//! - Request/response snapshots and the registration scope
//! - The precache manifest and generation lifecycle state machine
//! - The declarative request → strategy routing table
//! - SQLite-backed generation storage
//! - Configuration and the unified error type

pub mod cache;
pub mod config;
pub mod error;
pub mod generation;
pub mod manifest;
pub mod request;
pub mod routing;
pub mod scope;

pub use cache::{CacheDb, CacheStorage};
pub use config::{AppConfig, ConfigError};
pub use error::Error;
pub use generation::{Generation, GenerationName, GenerationState};
pub use manifest::PrecacheManifest;
pub use request::{CacheMode, Request, RequestMode, Response, ResponseSource};
pub use routing::{PassthroughReason, RequestPredicate, Route, RouteDecision, Router, Strategy};
pub use scope::Scope;
