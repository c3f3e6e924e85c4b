//! # tether-core
//! Foundation types, scoring math, and persistence traits for the Tether
//! relationship-health engine.

pub mod alloc;
pub mod commit_level;
pub mod constants;
pub mod entry;
pub mod error;
pub mod impact;
pub mod incident;
pub mod interpolation;
pub mod interval;
pub mod repo;
pub mod rollup;
pub mod rule_type;
pub mod store;
pub mod taxonomy;
pub mod traits;
pub mod types;
