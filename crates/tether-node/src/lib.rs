//! # tether-node
//! Storage, rescoring, and service composition for the Tether engine.
//!
//! This crate provides:
//! - [`config::EngineConfig`]: engine configuration
//! - [`logging::init_logging`]: tracing subscriber setup
//! - [`storage::RocksStore`]: RocksDB-backed document store
//! - [`locks::KeyedLocks`]: per-pair and per-prospect write locks
//! - [`scorer::Rescorer`]: the rescoring pass
//! - [`reconcile::IncidentReconciler`]: incident reconciliation after interval changes
//! - [`service::ScoringService`]: the service object handlers call into

pub mod config;
pub mod locks;
pub mod logging;
pub mod reconcile;
pub mod scorer;
pub mod service;
pub mod storage;

pub use config::EngineConfig;
pub use service::ScoringService;
pub use storage::RocksStore;
