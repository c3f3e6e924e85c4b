//! Commitment intervals and date-range overlap.
//!
//! An [`IntervalHistory`] is the per-(user, prospect) sequence of commitment
//! phases, newest first. Exactly one interval is open, and it sits at index
//! 0. The history only changes by closing the open interval and pushing a new
//! open one in front of it.
//!
//! Overlap works at date granularity. Two ranges that touch on a single
//! boundary day do not overlap: with date-only data a same-day hand-off
//! cannot be ordered, so it is treated as a clean transition.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::commit_level::CommitLevel;
use crate::error::IntervalError;

/// Stand-in end date for an open interval.
pub const OPEN_END_SENTINEL: NaiveDate = NaiveDate::MAX;

/// One contiguous phase at a single commitment level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Interval {
    pub start_date: NaiveDate,
    /// `None` while the phase is ongoing.
    pub end_date: Option<NaiveDate>,
    pub commit_level: CommitLevel,
}

impl Interval {
    pub fn open(start_date: NaiveDate, commit_level: CommitLevel) -> Self {
        Self {
            start_date,
            end_date: None,
            commit_level,
        }
    }

    pub fn closed(start_date: NaiveDate, end_date: NaiveDate, commit_level: CommitLevel) -> Self {
        Self {
            start_date,
            end_date: Some(end_date),
            commit_level,
        }
    }

    pub fn is_open(&self) -> bool {
        self.end_date.is_none()
    }

    /// End date with the open sentinel substituted for an ongoing phase.
    pub fn end_or_sentinel(&self) -> NaiveDate {
        self.end_date.unwrap_or(OPEN_END_SENTINEL)
    }

    /// End date usable in overlap math: `today` for an open interval.
    pub fn comparable_end_date(&self, today: NaiveDate) -> NaiveDate {
        match self.end_date {
            Some(end) if end != OPEN_END_SENTINEL => end,
            _ => today,
        }
    }

    /// Overlap with another interval, open ends resolved against `today`.
    pub fn overlap_with(&self, other: &Interval, today: NaiveDate) -> Option<(NaiveDate, NaiveDate)> {
        overlap(
            self.start_date,
            self.comparable_end_date(today),
            other.start_date,
            other.comparable_end_date(today),
        )
    }
}

/// Intersection of `[s1, e1]` and `[s2, e2]`.
///
/// Returns `None` when the ranges are disjoint or only share a boundary day;
/// otherwise `(max(starts), min(ends))`. A range whose start is after its end
/// is empty, which is how an interval starting after `today` resolves.
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use tether_core::interval::overlap;
///
/// let d = |day| NaiveDate::from_ymd_opt(2024, 3, day).unwrap();
/// assert_eq!(overlap(d(1), d(10), d(5), d(20)), Some((d(5), d(10))));
/// assert_eq!(overlap(d(1), d(10), d(10), d(20)), None);
/// ```
pub fn overlap(
    s1: NaiveDate,
    e1: NaiveDate,
    s2: NaiveDate,
    e2: NaiveDate,
) -> Option<(NaiveDate, NaiveDate)> {
    if s1 > e1 || s2 > e2 {
        return None;
    }
    let start = s1.max(s2);
    let end = e1.min(e2);
    if start >= end {
        return None;
    }
    Some((start, end))
}

/// Days spanned by the intersection, `0` when there is none.
pub fn overlap_days(s1: NaiveDate, e1: NaiveDate, s2: NaiveDate, e2: NaiveDate) -> i64 {
    overlap(s1, e1, s2, e2)
        .map(|(start, end)| (end - start).num_days().abs())
        .unwrap_or(0)
}

/// Newest-first sequence of commitment intervals for one (user, prospect).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntervalHistory {
    intervals: Vec<Interval>,
}

impl IntervalHistory {
    /// Start a history with a single open interval.
    pub fn begin(commit_level: CommitLevel, start_date: NaiveDate) -> Self {
        Self {
            intervals: vec![Interval::open(start_date, commit_level)],
        }
    }

    /// Rebuild from stored intervals, enforcing the sequence invariant.
    pub fn from_intervals(intervals: Vec<Interval>) -> Result<Self, IntervalError> {
        let history = Self { intervals };
        history.validate()?;
        Ok(history)
    }

    /// Exactly one open interval, at index 0.
    pub fn validate(&self) -> Result<(), IntervalError> {
        let first = self.intervals.first().ok_or(IntervalError::Empty)?;
        if !first.is_open() {
            return Err(IntervalError::NoOpenInterval);
        }
        if let Some(index) = self.intervals.iter().skip(1).position(Interval::is_open) {
            return Err(IntervalError::OpenIntervalNotNewest(index + 1));
        }
        Ok(())
    }

    pub fn intervals(&self) -> &[Interval] {
        &self.intervals
    }

    pub fn current(&self) -> &Interval {
        &self.intervals[0]
    }

    /// Close the open interval on `date` and open a new one at `level`.
    ///
    /// Returns `(prior, next)` as they now stand in the history.
    pub fn change_commit_level(
        &mut self,
        level: CommitLevel,
        date: NaiveDate,
    ) -> Result<(Interval, Interval), IntervalError> {
        let current = *self.current();
        if current.commit_level == level {
            return Err(IntervalError::SameLevel(level.ordinal()));
        }
        if date < current.start_date {
            return Err(IntervalError::ChangeBeforeStart {
                date: date.to_string(),
                start: current.start_date.to_string(),
            });
        }
        let prior = Interval::closed(current.start_date, date, current.commit_level);
        let next = Interval::open(date, level);
        self.intervals[0] = prior;
        self.intervals.insert(0, next);
        Ok((prior, next))
    }

    /// Start of the oldest interval.
    pub fn relationship_start(&self) -> NaiveDate {
        self.intervals
            .iter()
            .map(|iv| iv.start_date)
            .min()
            .unwrap_or_else(|| self.current().start_date)
    }

    /// Days from the first interval's start to `today`, or to the breakup
    /// date once the relationship has ended.
    pub fn relationship_length_days(&self, today: NaiveDate) -> i64 {
        let current = self.current();
        let end = if current.commit_level == CommitLevel::BrokenUp {
            current.start_date.min(today)
        } else {
            current.comparable_end_date(today)
        };
        (end - self.relationship_start()).num_days().max(0)
    }

    /// Intervals at an exclusive commitment level.
    pub fn exclusive_intervals(&self) -> impl Iterator<Item = &Interval> {
        self.intervals.iter().filter(|iv| iv.commit_level.is_exclusive())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn d(month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, month, day).unwrap()
    }

    #[test]
    fn overlapping_ranges() {
        assert_eq!(overlap(d(1, 1), d(1, 20), d(1, 10), d(2, 1)), Some((d(1, 10), d(1, 20))));
        assert_eq!(overlap_days(d(1, 1), d(1, 20), d(1, 10), d(2, 1)), 10);
    }

    #[test]
    fn contained_range() {
        assert_eq!(overlap(d(1, 1), d(3, 1), d(1, 10), d(1, 12)), Some((d(1, 10), d(1, 12))));
    }

    #[test]
    fn disjoint_ranges() {
        assert_eq!(overlap(d(1, 1), d(1, 5), d(2, 1), d(2, 5)), None);
        assert_eq!(overlap_days(d(1, 1), d(1, 5), d(2, 1), d(2, 5)), 0);
    }

    #[test]
    fn same_day_boundary_is_not_overlap() {
        assert_eq!(overlap(d(1, 1), d(1, 5), d(1, 5), d(1, 9)), None);
        assert_eq!(overlap(d(1, 5), d(1, 9), d(1, 1), d(1, 5)), None);
    }

    #[test]
    fn comparable_end_substitutes_today() {
        let iv = Interval::open(d(1, 1), CommitLevel::Dating);
        assert_eq!(iv.end_or_sentinel(), OPEN_END_SENTINEL);
        assert_eq!(iv.comparable_end_date(d(4, 1)), d(4, 1));
        let closed = Interval::closed(d(1, 1), d(2, 1), CommitLevel::Dating);
        assert_eq!(closed.comparable_end_date(d(4, 1)), d(2, 1));
    }

    #[test]
    fn open_intervals_overlap_up_to_today() {
        let a = Interval::open(d(1, 1), CommitLevel::ExclusiveMa);
        let b = Interval::open(d(2, 1), CommitLevel::Casual);
        assert_eq!(a.overlap_with(&b, d(3, 1)), Some((d(2, 1), d(3, 1))));
    }

    #[test]
    fn change_commit_level_closes_and_prepends() {
        let mut h = IntervalHistory::begin(CommitLevel::Casual, d(1, 1));
        let (prior, next) = h.change_commit_level(CommitLevel::ExclusiveMa, d(2, 1)).unwrap();
        assert_eq!(prior, Interval::closed(d(1, 1), d(2, 1), CommitLevel::Casual));
        assert_eq!(next, Interval::open(d(2, 1), CommitLevel::ExclusiveMa));
        assert_eq!(h.intervals().len(), 2);
        assert_eq!(h.current(), &next);
        h.validate().unwrap();
    }

    #[test]
    fn change_to_same_level_rejected() {
        let mut h = IntervalHistory::begin(CommitLevel::Dating, d(1, 1));
        assert_eq!(
            h.change_commit_level(CommitLevel::Dating, d(2, 1)),
            Err(IntervalError::SameLevel(2))
        );
    }

    #[test]
    fn change_before_start_rejected() {
        let mut h = IntervalHistory::begin(CommitLevel::Dating, d(3, 1));
        assert!(matches!(
            h.change_commit_level(CommitLevel::Casual, d(2, 1)),
            Err(IntervalError::ChangeBeforeStart { .. })
        ));
    }

    #[test]
    fn validate_rejects_bad_sequences() {
        assert_eq!(IntervalHistory::from_intervals(vec![]), Err(IntervalError::Empty));
        let closed_first = vec![Interval::closed(d(1, 1), d(2, 1), CommitLevel::Dating)];
        assert_eq!(
            IntervalHistory::from_intervals(closed_first),
            Err(IntervalError::NoOpenInterval)
        );
        let two_open = vec![
            Interval::open(d(2, 1), CommitLevel::Dating),
            Interval::open(d(1, 1), CommitLevel::Casual),
        ];
        assert_eq!(
            IntervalHistory::from_intervals(two_open),
            Err(IntervalError::OpenIntervalNotNewest(1))
        );
    }

    #[test]
    fn relationship_length_spans_history() {
        let mut h = IntervalHistory::begin(CommitLevel::Casual, d(1, 1));
        h.change_commit_level(CommitLevel::Dating, d(1, 11)).unwrap();
        assert_eq!(h.relationship_start(), d(1, 1));
        assert_eq!(h.relationship_length_days(d(1, 31)), 30);
    }

    #[test]
    fn relationship_length_stops_at_breakup() {
        let mut h = IntervalHistory::begin(CommitLevel::Dating, d(1, 1));
        h.change_commit_level(CommitLevel::BrokenUp, d(1, 21)).unwrap();
        assert_eq!(h.relationship_length_days(d(1, 31)), 20);
        assert_eq!(h.relationship_length_days(d(6, 1)), 20);
        assert_eq!(h.exclusive_intervals().count(), 0);
    }

    #[test]
    fn relationship_length_resumes_after_getting_back_together() {
        let mut h = IntervalHistory::begin(CommitLevel::Dating, d(1, 1));
        h.change_commit_level(CommitLevel::BrokenUp, d(1, 21)).unwrap();
        h.change_commit_level(CommitLevel::Casual, d(2, 1)).unwrap();
        assert_eq!(h.relationship_length_days(d(2, 11)), 41);
    }

    #[test]
    fn reversed_range_is_empty() {
        // an open interval starting after today resolves to [start, today]
        assert_eq!(overlap(d(2, 15), d(2, 1), d(1, 1), d(3, 1)), None);
        assert_eq!(overlap(d(1, 1), d(3, 1), d(2, 15), d(2, 1)), None);
        assert_eq!(overlap_days(d(2, 15), d(2, 1), d(3, 1), d(2, 1)), 0);
    }

    #[test]
    fn future_open_intervals_do_not_overlap() {
        let a = Interval::open(d(2, 15), CommitLevel::ExclusiveMa);
        let b = Interval::open(d(3, 1), CommitLevel::Casual);
        assert_eq!(a.overlap_with(&b, d(2, 1)), None);
        // one side started, the other not yet
        let c = Interval::open(d(1, 1), CommitLevel::Casual);
        assert_eq!(a.overlap_with(&c, d(2, 1)), None);
    }

    fn date_strategy() -> impl Strategy<Value = NaiveDate> {
        (0i64..400).prop_map(|offset| d(1, 1) + chrono::Duration::days(offset))
    }

    proptest! {
        #[test]
        fn overlap_is_symmetric(a in date_strategy(), b in date_strategy(), c in date_strategy(), e in date_strategy()) {
            prop_assert_eq!(overlap(a, b, c, e), overlap(c, e, a, b));
        }

        #[test]
        fn overlap_lies_inside_both_ranges(a in date_strategy(), b in date_strategy(), c in date_strategy(), e in date_strategy()) {
            if let Some((start, end)) = overlap(a, b, c, e) {
                prop_assert!(a <= start && end <= b);
                prop_assert!(c <= start && end <= e);
            }
        }

        #[test]
        fn overlap_has_positive_width(a in date_strategy(), b in date_strategy(), c in date_strategy(), e in date_strategy()) {
            if let Some((start, end)) = overlap(a, b, c, e) {
                prop_assert!(start < end);
                prop_assert!(overlap_days(a, b, c, e) > 0);
            } else {
                prop_assert_eq!(overlap_days(a, b, c, e), 0);
            }
        }
    }
}
