//! Ripple engine implementing the [`RippleCalculator`] trait.
//!
//! Magnification is not decayed over the ripple horizon: inside it a past
//! event contributes its full weight, outside it nothing.

use tether_core::constants::{DEFAULT_REPEAT_WINDOWS, ECHO_DISTANCE_WINDOWS};
use tether_core::rule_type::{RippleKind, ScoreRuleType};
use tether_core::traits::RippleCalculator;

/// The production ripple calculator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RippleEngine {
    repeat_windows: u32,
}

impl RippleEngine {
    /// Engine with a custom horizon for repeating (value-assessment) ripples.
    pub fn new(repeat_windows: u32) -> Self {
        Self { repeat_windows }
    }

    pub fn repeat_windows(&self) -> u32 {
        self.repeat_windows
    }
}

impl Default for RippleEngine {
    fn default() -> Self {
        Self::new(DEFAULT_REPEAT_WINDOWS)
    }
}

impl RippleCalculator for RippleEngine {
    fn ripple_windows(&self, rule_type: ScoreRuleType) -> u32 {
        match rule_type.ripple_kind() {
            RippleKind::None => 0,
            RippleKind::Echo => ECHO_DISTANCE_WINDOWS,
            RippleKind::Repeating => self.repeat_windows,
        }
    }

    fn adjust_weight(&self, rule_type: ScoreRuleType, magnification: f64, periods: u32) -> f64 {
        let windows = self.ripple_windows(rule_type);
        // The origin day is scored by the entry itself.
        if periods == 0 || periods > windows {
            return 0.0;
        }
        magnification
    }
}
