//! Scoring constants. All impact weights and scores live in `[-1.0, 1.0]`.

/// Share of the community weight in a hybrid impact weight.
pub const HYBRID_COMMUNITY_SHARE: f64 = 0.7;

/// Share of the app-assigned weight in a hybrid impact weight.
pub const HYBRID_APP_SHARE: f64 = 0.3;

/// Above this `|midScore|` a 3-slot slider switches from proportional notches
/// to headroom notches.
pub const SLIDER_3_NOTCH_THRESHOLD: f64 = 0.7510;

/// Above this `|midScore|` a 4-slot slider switches from proportional notches
/// to headroom notches.
pub const SLIDER_4_NOTCH_THRESHOLD: f64 = 0.7279;

/// Headroom scale applied to 4-slot sliders (three steps instead of two).
pub const FOUR_SLOT_HEADROOM_SCALE: f64 = 2.0 / 3.0;

/// Impact magnitude used when a behavior code cannot be resolved.
pub const NEAR_ZERO_IMPACT: f64 = 0.001;

/// Scale applied to a value-assessment weight per concern vote (1–4).
pub const CONCERN_SCALE: [f64; 4] = [0.25, 0.5, 0.75, 1.0];

/// Fraction of the concern-scaled weight granted as a reward when a user
/// reports that a prospect never does a negative behavior.
pub const NEVER_REWARD_FACTOR: f64 = 0.5;

/// Minimum weight of an incident before the overlap ratio is applied.
pub const INCIDENT_MIN_WEIGHT: f64 = -0.7;

/// Number of windows an echo-type event reaches forward.
pub const ECHO_DISTANCE_WINDOWS: u32 = 4;

/// Default number of windows a repeating (value-assessment) ripple persists.
pub const DEFAULT_REPEAT_WINDOWS: u32 = 14;

/// Default number of write shards per behavior code.
pub const DEFAULT_SHARD_COUNT: u32 = 20;

/// Minimum seconds between two consensus refreshes.
pub const CONSENSUS_REFRESH_SECS: i64 = 3600;

/// Votes required before community consensus overrides the static default.
pub const DEFAULT_MIN_VOTES: u64 = 10;

/// Scored entries retained per (user, prospect) after a rescore pass.
pub const DEFAULT_RETAIN_SCORED_ENTRIES: usize = 100;

/// Width of one smoothing window in days.
pub const SMOOTH_WINDOW_DAYS: u32 = 7;

/// Weight of the previous smoothed window when carrying a series forward.
pub const SMOOTH_PRIOR_WEIGHT: f64 = 0.35;

/// Inclusive range of behavior and feeling slider positions.
pub const SLIDER_3_RANGE: std::ops::RangeInclusive<u8> = 1..=3;

/// Inclusive range of value-assessment votes.
pub const SLIDER_4_RANGE: std::ops::RangeInclusive<u8> = 1..=4;

/// Top-level taxonomy category whose behaviors score as communication.
pub const COMMUNICATION_CATEGORY: &str = "COMM";
