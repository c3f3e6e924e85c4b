//! Per-behavior impact weights.

use serde::{Deserialize, Serialize};

use crate::constants::{HYBRID_APP_SHARE, HYBRID_COMMUNITY_SHARE, NEAR_ZERO_IMPACT};

/// Community, app and hybrid weights for one behavior code.
///
/// `hybrid = 0.7·community + 0.3·app`. Every field is within `[-1, 1]` and
/// carries the polarity of the behavior.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ImpactWeight {
    pub community: f64,
    pub app: f64,
    pub hybrid: f64,
}

impl ImpactWeight {
    /// Build from community and app weights, clamping both and deriving the hybrid.
    ///
    /// # Examples
    ///
    /// ```
    /// use tether_core::impact::ImpactWeight;
    ///
    /// let w = ImpactWeight::new(-0.5, -0.8);
    /// assert!((w.hybrid - (-0.59)).abs() < 1e-12);
    /// ```
    pub fn new(community: f64, app: f64) -> Self {
        let community = community.clamp(-1.0, 1.0);
        let app = app.clamp(-1.0, 1.0);
        Self {
            community,
            app,
            hybrid: hybrid(community, app),
        }
    }

    /// Static default: both sides equal the taxonomy impact.
    pub fn from_static(impact: f64) -> Self {
        Self::new(impact, impact)
    }

    /// Fallback for unknown codes.
    pub fn near_zero() -> Self {
        Self {
            community: NEAR_ZERO_IMPACT,
            app: NEAR_ZERO_IMPACT,
            hybrid: NEAR_ZERO_IMPACT,
        }
    }
}

pub fn hybrid(community: f64, app: f64) -> f64 {
    HYBRID_COMMUNITY_SHARE * community + HYBRID_APP_SHARE * app
}
