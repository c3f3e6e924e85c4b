//! Behavior taxonomy provider.
//!
//! The taxonomy is static reference data: a tree of categories and behavior
//! codes, each behavior carrying a polarity and an app-assigned impact. It is
//! loaded once at startup by an external loader and read-only afterwards.
//! [`StaticTaxonomy`] is the in-memory provider the loader hands its nodes to.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::TaxonomyError;

/// Parent links followed before a lookup gives up (guards against cycles).
const MAX_TAXONOMY_DEPTH: usize = 32;

/// One node of the behavior tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BehaviorNode {
    pub code: String,
    pub parent_code: Option<String>,
    /// Code of the behavior with the opposite polarity, if the taxonomy pairs one.
    pub opposite_code: Option<String>,
    pub is_category: bool,
    pub positive: bool,
    /// App-assigned impact in `[-1, 1]`; sign agrees with `positive`.
    pub static_app_impact: f64,
    pub text: String,
}

/// Flattened description of a behavior, including its top-level category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BehaviorInfo {
    pub code: String,
    pub parent_code: Option<String>,
    pub cat_code: String,
    pub text: String,
    pub pos: bool,
    pub impact: f64,
    pub cat_name: String,
}

/// Read-only access to behavior metadata.
pub trait BehaviorTaxonomy: Send + Sync {
    /// Look up a node by code. Returns `None` for unknown codes.
    fn node(&self, code: &str) -> Option<&BehaviorNode>;

    /// All behavior (non-category) nodes with negative polarity.
    fn negative_codes(&self) -> Vec<String>;

    /// Top-level category code and direct parent code for a behavior.
    ///
    /// Default implementation walks `parent_code` links up to the root.
    fn category_and_parent(&self, code: &str) -> Option<(String, String)> {
        let node = self.node(code)?;
        let parent = node.parent_code.clone().unwrap_or_else(|| node.code.clone());
        let mut top = node;
        let mut hops = 0;
        while let Some(parent_code) = top.parent_code.as_deref() {
            hops += 1;
            if hops > MAX_TAXONOMY_DEPTH {
                return None;
            }
            top = self.node(parent_code)?;
        }
        Some((top.code.clone(), parent))
    }

    /// Flattened behavior description.
    fn behavior_info(&self, code: &str) -> Option<BehaviorInfo> {
        let node = self.node(code)?;
        let (cat_code, _) = self.category_and_parent(code)?;
        let cat_name = self
            .node(&cat_code)
            .map(|cat| cat.text.clone())
            .unwrap_or_default();
        Some(BehaviorInfo {
            code: node.code.clone(),
            parent_code: node.parent_code.clone(),
            cat_code,
            text: node.text.clone(),
            pos: node.positive,
            impact: node.static_app_impact,
            cat_name,
        })
    }
}

/// Taxonomy held entirely in memory.
#[derive(Debug, Clone, Default)]
pub struct StaticTaxonomy {
    nodes: HashMap<String, BehaviorNode>,
}

impl StaticTaxonomy {
    /// Build a taxonomy, rejecting duplicate codes, dangling parents, and
    /// impacts that break `|impact| <= 1` or disagree with polarity.
    pub fn new(nodes: Vec<BehaviorNode>) -> Result<Self, TaxonomyError> {
        let mut map = HashMap::with_capacity(nodes.len());
        for node in nodes {
            if !node.is_category {
                let impact = node.static_app_impact;
                if !(-1.0..=1.0).contains(&impact) {
                    return Err(TaxonomyError::ImpactOutOfRange {
                        code: node.code,
                        impact: impact.to_string(),
                    });
                }
                if impact != 0.0 && (impact > 0.0) != node.positive {
                    return Err(TaxonomyError::PolarityMismatch(node.code));
                }
            }
            if map.contains_key(&node.code) {
                return Err(TaxonomyError::DuplicateCode(node.code));
            }
            map.insert(node.code.clone(), node);
        }
        for node in map.values() {
            if let Some(parent) = &node.parent_code {
                if !map.contains_key(parent) {
                    return Err(TaxonomyError::UnknownParent {
                        code: node.code.clone(),
                        parent: parent.clone(),
                    });
                }
            }
        }
        Ok(Self { nodes: map })
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl BehaviorTaxonomy for StaticTaxonomy {
    fn node(&self, code: &str) -> Option<&BehaviorNode> {
        self.nodes.get(code)
    }

    fn negative_codes(&self) -> Vec<String> {
        let mut codes: Vec<String> = self
            .nodes
            .values()
            .filter(|n| !n.is_category && !n.positive)
            .map(|n| n.code.clone())
            .collect();
        codes.sort();
        codes
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn category(code: &str, text: &str) -> BehaviorNode {
        BehaviorNode {
            code: code.to_string(),
            parent_code: None,
            opposite_code: None,
            is_category: true,
            positive: true,
            static_app_impact: 0.0,
            text: text.to_string(),
        }
    }

    pub(crate) fn behavior(code: &str, parent: &str, opposite: Option<&str>, impact: f64) -> BehaviorNode {
        BehaviorNode {
            code: code.to_string(),
            parent_code: Some(parent.to_string()),
            opposite_code: opposite.map(str::to_string),
            is_category: false,
            positive: impact > 0.0,
            static_app_impact: impact,
            text: code.to_lowercase(),
        }
    }

    pub(crate) fn sample() -> StaticTaxonomy {
        StaticTaxonomy::new(vec![
            category("COMM", "Communication"),
            category("CARE", "Care"),
            category("CARE_SMALL", "Small gestures"),
            behavior("TEXTS_BACK", "COMM", Some("IGNORES_TEXTS"), 0.4),
            behavior("IGNORES_TEXTS", "COMM", Some("TEXTS_BACK"), -0.5),
            behavior("FLOWERS", "CARE_SMALL", None, 0.6),
            behavior("FORGETS_DATES", "CARE_SMALL", None, -0.8),
        ])
        .unwrap()
    }

    #[test]
    fn lookup_known_and_unknown() {
        let t = sample();
        assert_eq!(t.len(), 7);
        assert!(t.node("FLOWERS").is_some());
        assert!(t.node("NOPE").is_none());
    }

    #[test]
    fn category_and_parent_walks_to_root() {
        let t = sample();
        let (cat, parent) = t.category_and_parent("FLOWERS").unwrap();
        assert_eq!(cat, "CARE");
        assert_eq!(parent, "CARE_SMALL");
    }

    #[test]
    fn behavior_info_carries_category_name() {
        let t = sample();
        let info = t.behavior_info("IGNORES_TEXTS").unwrap();
        assert_eq!(info.cat_code, "COMM");
        assert_eq!(info.cat_name, "Communication");
        assert!(!info.pos);
        assert_eq!(info.impact, -0.5);
    }

    #[test]
    fn negative_codes_are_sorted_behaviors_only() {
        let t = sample();
        assert_eq!(t.negative_codes(), vec!["FORGETS_DATES", "IGNORES_TEXTS"]);
    }

    #[test]
    fn rejects_polarity_mismatch() {
        let mut bad = behavior("BAD", "COMM", None, -0.2);
        bad.positive = true;
        let err = StaticTaxonomy::new(vec![category("COMM", "c"), bad]).unwrap_err();
        assert_eq!(err, TaxonomyError::PolarityMismatch("BAD".into()));
    }

    #[test]
    fn rejects_impact_out_of_range() {
        let err = StaticTaxonomy::new(vec![category("COMM", "c"), behavior("BIG", "COMM", None, 1.5)])
            .unwrap_err();
        assert!(matches!(err, TaxonomyError::ImpactOutOfRange { .. }));
    }

    #[test]
    fn rejects_dangling_parent() {
        let err = StaticTaxonomy::new(vec![behavior("ORPHAN", "MISSING", None, 0.1)]).unwrap_err();
        assert!(matches!(err, TaxonomyError::UnknownParent { .. }));
    }

    #[test]
    fn rejects_duplicate_code() {
        let err = StaticTaxonomy::new(vec![category("COMM", "c"), category("COMM", "c")]).unwrap_err();
        assert_eq!(err, TaxonomyError::DuplicateCode("COMM".into()));
    }
}
