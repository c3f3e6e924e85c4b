//! # tether-decay
//! Ripple and echo engine.
//!
//! Severe or recurring events keep contributing to a relationship's score
//! after the day they happened:
//! - **Echo**: breakups, incidents and commitment changes echo a fixed four
//!   windows forward.
//! - **Repeating**: value-assessment answers persist for the configured repeat
//!   horizon, or until the same behavior is assessed again.
//!
//! [`RippleEngine`] implements the ripple contract; [`RippleEffect`] is the
//! persisted record of one event's ripple.

pub mod engine;
pub mod ripple;

pub use engine::RippleEngine;
pub use ripple::{RippleEffect, RippleLedger};
