//! Shared test helpers for scenario and end-to-end tests.

use std::sync::Arc;

use chrono::NaiveDate;

use tether_core::constants::COMMUNICATION_CATEGORY;
use tether_core::store::MemoryStore;
use tether_core::taxonomy::{BehaviorNode, StaticTaxonomy};
use tether_node::{EngineConfig, ScoringService};

/// Date in 2024.
pub fn d(month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, month, day).expect("valid test date")
}

fn category(code: &str, text: &str) -> BehaviorNode {
    BehaviorNode {
        code: code.to_string(),
        parent_code: None,
        opposite_code: None,
        is_category: true,
        positive: false,
        static_app_impact: 0.0,
        text: text.to_string(),
    }
}

fn behavior(code: &str, parent: &str, opposite: Option<&str>, impact: f64) -> BehaviorNode {
    BehaviorNode {
        code: code.to_string(),
        parent_code: Some(parent.to_string()),
        opposite_code: opposite.map(str::to_string),
        is_category: false,
        positive: impact > 0.0,
        static_app_impact: impact,
        text: code.replace('_', " ").to_lowercase(),
    }
}

/// Small taxonomy with two categories, a paired positive/negative behavior,
/// a communication behavior and a subcategory.
///
/// | code | impact | opposite |
/// |---|---|---|
/// | `REMEMBERS_DATES` | 0.6 | `FORGETS_DATES` |
/// | `FORGETS_DATES` | -0.6 | `REMEMBERS_DATES` |
/// | `BRINGS_FLOWERS` (under `GIFTS`) | 0.6 | none |
/// | `TEXTS_BACK` (communication) | 0.4 | `IGNORES_TEXTS` |
/// | `IGNORES_TEXTS` (communication) | -0.8 | `TEXTS_BACK` |
pub fn sample_taxonomy() -> StaticTaxonomy {
    StaticTaxonomy::new(vec![
        category("CARE", "Care"),
        category(COMMUNICATION_CATEGORY, "Communication"),
        BehaviorNode {
            is_category: true,
            ..behavior("GIFTS", "CARE", None, 0.0)
        },
        behavior("REMEMBERS_DATES", "CARE", Some("FORGETS_DATES"), 0.6),
        behavior("FORGETS_DATES", "CARE", Some("REMEMBERS_DATES"), -0.6),
        behavior("BRINGS_FLOWERS", "GIFTS", None, 0.6),
        behavior("TEXTS_BACK", COMMUNICATION_CATEGORY, Some("IGNORES_TEXTS"), 0.4),
        behavior("IGNORES_TEXTS", COMMUNICATION_CATEGORY, Some("TEXTS_BACK"), -0.8),
    ])
    .expect("sample taxonomy is valid")
}

/// Service over an in-memory store.
pub fn memory_service(config: EngineConfig) -> ScoringService {
    ScoringService::new(config, Arc::new(MemoryStore::new()), Arc::new(sample_taxonomy()))
        .expect("service builds")
}

/// Default-configured service over an in-memory store.
pub fn default_service() -> ScoringService {
    memory_service(EngineConfig::default())
}
