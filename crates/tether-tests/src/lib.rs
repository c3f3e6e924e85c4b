//! Cross-crate test suite for Tether.
//!
//! Integration tests live under `tests/`: the worked scoring scenarios,
//! property tests over the numeric and overlap rules, and end-to-end flows
//! through [`tether_node::ScoringService`].

pub mod helpers;
