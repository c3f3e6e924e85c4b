//! Day and month score rollups, and smoothing into plot points.
//!
//! A rescore pass resolves each touched day into one [`RawDayScore`] by
//! blending its items through the allocation table. Day scores are stored in
//! per-month buckets keyed `yymm01`, and updating a day replaces its record.
//! Clients read [`SmoothedPlotPoint`]s: window means carried forward with
//! exponential smoothing.

use std::collections::BTreeMap;

use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::alloc::{AllocType, alloc_lookup};
use crate::types::ScorePair;

/// One (user, prospect, day) score record.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawDayScore {
    pub date: NaiveDate,
    pub app_user_score: f64,
    pub community_hybrid_score: f64,
    /// OR of the allocation bits present that day.
    pub items_bit_code: u8,
}

impl RawDayScore {
    pub fn scores(&self) -> ScorePair {
        ScorePair::new(self.app_user_score, self.community_hybrid_score)
    }
}

/// Bucket key for the month containing `date`, `yymm01`.
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use tether_core::rollup::month_key;
///
/// let date = NaiveDate::from_ymd_opt(2024, 7, 19).unwrap();
/// assert_eq!(month_key(date), "240701");
/// ```
pub fn month_key(date: NaiveDate) -> String {
    format!("{:02}{:02}01", date.year().rem_euclid(100), date.month())
}

/// All day scores for one (user, prospect, month).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyRawScores {
    pub month_key: String,
    /// Sorted by date, at most one record per date.
    days: Vec<RawDayScore>,
}

impl MonthlyRawScores {
    pub fn new(month_key: impl Into<String>) -> Self {
        Self {
            month_key: month_key.into(),
            days: Vec::new(),
        }
    }

    pub fn days(&self) -> &[RawDayScore] {
        &self.days
    }

    /// Insert or replace the record for `day.date`.
    pub fn upsert_day(&mut self, day: RawDayScore) {
        match self.days.binary_search_by(|d| d.date.cmp(&day.date)) {
            Ok(index) => self.days[index] = day,
            Err(index) => self.days.insert(index, day),
        }
    }

    /// Drop the record for `date`. Returns whether one existed.
    pub fn remove_day(&mut self, date: NaiveDate) -> bool {
        match self.days.binary_search_by(|d| d.date.cmp(&date)) {
            Ok(index) => {
                self.days.remove(index);
                true
            }
            Err(_) => false,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    pub fn day(&self, date: NaiveDate) -> Option<&RawDayScore> {
        self.days
            .binary_search_by(|d| d.date.cmp(&date))
            .ok()
            .map(|index| &self.days[index])
    }
}

/// Items landing in one scoring window, resolved through the allocation table.
#[derive(Debug, Clone, Default)]
pub struct DayBucket {
    items: BTreeMap<u8, Vec<ScorePair>>,
}

impl DayBucket {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, alloc_type: AllocType, score: ScorePair) {
        self.items.entry(alloc_type.bit()).or_default().push(score);
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn bit_sum(&self) -> u8 {
        self.items.keys().fold(0, |acc, bit| acc | bit)
    }

    /// Blend the bucket: per-category means weighted by the window allocation.
    pub fn resolve(&self, date: NaiveDate) -> RawDayScore {
        let bits = self.bit_sum();
        let alloc = alloc_lookup(bits);
        let mut total = ScorePair::default();
        for alloc_type in AllocType::ALL {
            let Some(scores) = self.items.get(&alloc_type.bit()) else {
                continue;
            };
            let share = alloc.share(alloc_type);
            if share == 0.0 || scores.is_empty() {
                continue;
            }
            let n = scores.len() as f64;
            let app = scores.iter().map(|s| s.app).sum::<f64>() / n;
            let community = scores.iter().map(|s| s.community).sum::<f64>() / n;
            total.app += app * share;
            total.community += community * share;
        }
        let total = total.clamped();
        RawDayScore {
            date,
            app_user_score: total.app,
            community_hybrid_score: total.community,
            items_bit_code: bits,
        }
    }
}

/// Client-facing point of a smoothed score series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SmoothedPlotPoint {
    pub center_date: NaiveDate,
    pub user_score: f64,
    pub community_score: f64,
}

/// Smooth day scores into plot points.
///
/// Days are grouped into `window_days`-wide windows aligned on the first day;
/// empty windows are skipped. Each window mean is blended with the previous
/// point: `prior · prior_weight + mean · (1 - prior_weight)`.
pub fn smooth_series(days: &[RawDayScore], window_days: u32, prior_weight: f64) -> Vec<SmoothedPlotPoint> {
    let window_days = i64::from(window_days.max(1));
    let prior_weight = prior_weight.clamp(0.0, 1.0);
    let mut sorted: Vec<&RawDayScore> = days.iter().collect();
    sorted.sort_by_key(|d| d.date);
    let Some(first) = sorted.first().map(|d| d.date) else {
        return Vec::new();
    };

    let mut windows: BTreeMap<i64, Vec<ScorePair>> = BTreeMap::new();
    for day in sorted {
        let index = (day.date - first).num_days() / window_days;
        windows.entry(index).or_default().push(day.scores());
    }

    let mut points = Vec::with_capacity(windows.len());
    let mut prior: Option<ScorePair> = None;
    for (index, scores) in windows {
        let n = scores.len() as f64;
        let mean = ScorePair::new(
            scores.iter().map(|s| s.app).sum::<f64>() / n,
            scores.iter().map(|s| s.community).sum::<f64>() / n,
        );
        let smoothed = match prior {
            Some(p) => ScorePair::new(
                p.app * prior_weight + mean.app * (1.0 - prior_weight),
                p.community * prior_weight + mean.community * (1.0 - prior_weight),
            ),
            None => mean,
        }
        .clamped();
        prior = Some(smoothed);
        points.push(SmoothedPlotPoint {
            center_date: first + Duration::days(index * window_days + window_days / 2),
            user_score: smoothed.app,
            community_score: smoothed.community,
        });
    }
    points
}
