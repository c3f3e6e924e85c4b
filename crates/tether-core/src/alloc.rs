//! Allocation weighting for scoring windows that mix event types.
//!
//! Each rule type belongs to one [`AllocType`] bit. When several event types
//! land in the same window their bits are OR-ed into a group bit sum, and
//! [`alloc_lookup`] resolves that sum into the fraction of the window score
//! each present type contributes.

use serde::{Deserialize, Serialize};

/// Allocation category bit flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AllocType {
    Feeling = 1,
    Behavior = 2,
    Assess = 4,
    CommitChange = 8,
    Breakup = 16,
    Incident = 32,
}

impl AllocType {
    pub const ALL: [AllocType; 6] = [
        AllocType::Feeling,
        AllocType::Behavior,
        AllocType::Assess,
        AllocType::CommitChange,
        AllocType::Breakup,
        AllocType::Incident,
    ];

    pub fn bit(self) -> u8 {
        self as u8
    }

    pub fn is_set(self, bit_sum: u8) -> bool {
        bit_sum & self.bit() != 0
    }
}

/// Mask covering every defined allocation bit.
pub const ALLOC_MASK: u8 = 0b11_1111;

/// Fractional weight per allocation category. Sums to `1.0`, or `0.0` for an
/// empty window.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Alloc {
    pub feeling: f64,
    pub behavior: f64,
    pub assess: f64,
    pub commit_change: f64,
    pub breakup: f64,
    pub incident: f64,
}

impl Alloc {
    const fn row(feeling: f64, behavior: f64, assess: f64, commit_change: f64) -> Self {
        Self {
            feeling,
            behavior,
            assess,
            commit_change,
            breakup: 0.0,
            incident: 0.0,
        }
    }

    /// Breakup and incident on the same day.
    pub const fn worst_day_ever() -> Self {
        Self {
            feeling: 0.0,
            behavior: 0.0,
            assess: 0.0,
            commit_change: 0.0,
            breakup: 0.25,
            incident: 0.75,
        }
    }

    pub const fn all_incident() -> Self {
        Self {
            feeling: 0.0,
            behavior: 0.0,
            assess: 0.0,
            commit_change: 0.0,
            breakup: 0.0,
            incident: 1.0,
        }
    }

    pub const fn all_breakup() -> Self {
        Self {
            feeling: 0.0,
            behavior: 0.0,
            assess: 0.0,
            commit_change: 0.0,
            breakup: 1.0,
            incident: 0.0,
        }
    }

    /// Fraction allotted to one category.
    pub fn share(&self, alloc_type: AllocType) -> f64 {
        match alloc_type {
            AllocType::Feeling => self.feeling,
            AllocType::Behavior => self.behavior,
            AllocType::Assess => self.assess,
            AllocType::CommitChange => self.commit_change,
            AllocType::Breakup => self.breakup,
            AllocType::Incident => self.incident,
        }
    }

    pub fn total(&self) -> f64 {
        self.feeling + self.behavior + self.assess + self.commit_change + self.breakup + self.incident
    }
}

/// Blending table for windows without breakup or incident, indexed by bit sum.
const ALLOC_TABLE: [Alloc; 16] = [
    Alloc::row(0.0, 0.0, 0.0, 0.0),
    Alloc::row(1.0, 0.0, 0.0, 0.0),
    Alloc::row(0.0, 1.0, 0.0, 0.0),
    Alloc::row(0.3, 0.7, 0.0, 0.0),
    Alloc::row(0.0, 0.0, 1.0, 0.0),
    Alloc::row(0.3, 0.0, 0.7, 0.0),
    Alloc::row(0.0, 0.5, 0.5, 0.0),
    Alloc::row(0.2, 0.4, 0.4, 0.0),
    Alloc::row(0.0, 0.0, 0.0, 1.0),
    Alloc::row(0.2, 0.0, 0.0, 0.8),
    Alloc::row(0.0, 0.3, 0.0, 0.7),
    Alloc::row(0.1, 0.3, 0.0, 0.6),
    Alloc::row(0.0, 0.0, 0.3, 0.7),
    Alloc::row(0.1, 0.0, 0.3, 0.6),
    Alloc::row(0.0, 0.2, 0.3, 0.5),
    Alloc::row(0.1, 0.2, 0.25, 0.45),
];

/// Resolve a group bit sum into an allocation.
///
/// Breakup and incident dominate everything else in the window: both
/// together split 25/75, either alone takes the full window.
///
/// # Examples
///
/// ```
/// use tether_core::alloc::{alloc_lookup, Alloc};
///
/// assert_eq!(alloc_lookup(48), Alloc::worst_day_ever());
/// assert_eq!(alloc_lookup(3).behavior, 0.7);
/// ```
pub fn alloc_lookup(bit_sum: u8) -> Alloc {
    let bits = bit_sum & ALLOC_MASK;
    let breakup = AllocType::Breakup.is_set(bits);
    let incident = AllocType::Incident.is_set(bits);
    match (breakup, incident) {
        (true, true) => Alloc::worst_day_ever(),
        (_, true) => Alloc::all_incident(),
        (true, false) => Alloc::all_breakup(),
        (false, false) => ALLOC_TABLE[bits as usize],
    }
}
