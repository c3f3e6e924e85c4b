//! Property tests over interpolation bounds, overlap, allocation, commitment
//! transitions and vote shards.

use std::sync::Arc;

use chrono::{Duration, NaiveDate};
use proptest::prelude::*;

use tether_consensus::shard::FixedShardSelector;
use tether_consensus::{ShardedVoteRollup, VoteUpdate};
use tether_core::alloc::{Alloc, alloc_lookup};
use tether_core::commit_level::{CommitLevel, get_commit_level_impact, transitions};
use tether_core::interpolation::{ScoreArgs, SliderKind, bounded_notch};
use tether_core::interval::{Interval, overlap, overlap_days};
use tether_core::repo::ScoreRepository;
use tether_core::rule_type::{ScoreRuleType, rule_type_from_phase_change};
use tether_core::store::MemoryStore;
use tether_core::types::{Sex, VoteType};

fn date(offset: i64) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + Duration::days(offset)
}

fn sex() -> impl Strategy<Value = Sex> {
    prop_oneof![Just(Sex::Female), Just(Sex::Male), Just(Sex::Unspecified)]
}

fn vote_type() -> impl Strategy<Value = VoteType> {
    prop_oneof![
        Just(VoteType::Feeling),
        Just(VoteType::Concern),
        Just(VoteType::Frequency)
    ]
}

proptest! {
    #[test]
    fn slider_scores_stay_in_bounds(weight in -1.0f64..=1.0, pos in 1u8..=3) {
        let args = ScoreArgs::Behavior { slider_pos: pos };
        let score = args.resolve(weight);
        prop_assert!((-1.0..=1.0).contains(&score));
    }

    #[test]
    fn value_assessment_scores_stay_in_bounds(
        weight in -1.0f64..=1.0,
        concern in 1u8..=4,
        freq in 1u8..=4,
    ) {
        let args = ScoreArgs::ValueAssessment { concern_vote: concern, freq_vote: freq };
        let score = args.resolve(weight);
        prop_assert!((-1.0..=1.0).contains(&score));
    }

    #[test]
    fn strong_mid_scores_reach_but_never_pass_the_boundary(mid in 0.7510f64..=1.0) {
        let three = bounded_notch(mid, SliderKind::Three);
        prop_assert!(mid + 2.0 * three <= 1.0 + 1e-9);
        let neg = bounded_notch(-mid, SliderKind::Three);
        prop_assert!(-mid + 2.0 * neg >= -1.0 - 1e-9);
    }

    #[test]
    fn strong_four_slot_mid_scores_stay_inside(mid in 0.7279f64..=1.0) {
        let four = bounded_notch(mid, SliderKind::Four);
        prop_assert!(mid + 3.0 * four <= 1.0 + 1e-9);
    }

    #[test]
    fn overlap_is_symmetric(a in 0i64..400, b in 0i64..400, c in 0i64..400, e in 0i64..400) {
        let (s1, e1, s2, e2) = (date(a), date(b), date(c), date(e));
        prop_assert_eq!(overlap(s1, e1, s2, e2), overlap(s2, e2, s1, e1));
        prop_assert_eq!(overlap_days(s1, e1, s2, e2), overlap_days(s2, e2, s1, e1));
    }

    #[test]
    fn disjoint_or_touching_ranges_do_not_overlap(start in 0i64..300, len in 0i64..30, gap in 0i64..30) {
        let first_end = start + len;
        let second_start = first_end + gap;
        let result = overlap(date(start), date(first_end), date(second_start), date(second_start + 5));
        prop_assert_eq!(result, None);
    }

    #[test]
    fn intervals_starting_after_today_never_overlap(
        today in 0i64..200,
        ahead in 1i64..60,
        other_start in 0i64..300,
        other_len in 0i64..90,
    ) {
        let future = Interval::open(date(today + ahead), CommitLevel::ExclusiveMa);
        let other = Interval::closed(date(other_start), date(other_start + other_len), CommitLevel::Dating);
        prop_assert_eq!(future.overlap_with(&other, date(today)), None);
        prop_assert_eq!(other.overlap_with(&future, date(today)), None);
    }

    #[test]
    fn incident_and_breakup_bits_dominate(low in 0u8..16) {
        prop_assert_eq!(alloc_lookup(48 | low), Alloc::worst_day_ever());
        prop_assert_eq!(alloc_lookup(32 | low), Alloc::all_incident());
        prop_assert_eq!(alloc_lookup(16 | low), Alloc::all_breakup());
    }

    #[test]
    fn shard_invariant_holds_after_any_updates(
        votes in prop::collection::vec((sex(), vote_type(), 1u8..=4, 0u32..20), 1..60)
    ) {
        let repo = ScoreRepository::new(Arc::new(MemoryStore::new()));
        let mut expected = [0u64; 3];
        for (sex, vote_type, slot, shard) in &votes {
            let rollup = ShardedVoteRollup::with_selector(
                repo.clone(),
                20,
                Box::new(FixedShardSelector(*shard)),
            ).unwrap();
            let stored = rollup.update_stats("CODE", *sex, &[VoteUpdate::new(*vote_type, *slot)]).unwrap();
            prop_assert!(stored.check_invariant().is_ok());
            expected[vote_type.index()] += 1;
        }

        let rollup = ShardedVoteRollup::new(repo, 20).unwrap();
        let totals = rollup.totals(&["CODE".to_string()]).unwrap();
        let merged = &totals["CODE"];
        for vote_type in VoteType::ALL {
            let counter = merged.get(vote_type);
            prop_assert!(counter.is_consistent());
            prop_assert_eq!(counter.count, expected[vote_type.index()]);
        }
    }
}

#[test]
fn low_bit_sums_match_the_table() {
    let rows: [(u8, [f64; 4]); 15] = [
        (1, [1.0, 0.0, 0.0, 0.0]),
        (2, [0.0, 1.0, 0.0, 0.0]),
        (3, [0.3, 0.7, 0.0, 0.0]),
        (4, [0.0, 0.0, 1.0, 0.0]),
        (5, [0.3, 0.0, 0.7, 0.0]),
        (6, [0.0, 0.5, 0.5, 0.0]),
        (7, [0.2, 0.4, 0.4, 0.0]),
        (8, [0.0, 0.0, 0.0, 1.0]),
        (9, [0.2, 0.0, 0.0, 0.8]),
        (10, [0.0, 0.3, 0.0, 0.7]),
        (11, [0.1, 0.3, 0.0, 0.6]),
        (12, [0.0, 0.0, 0.3, 0.7]),
        (13, [0.1, 0.0, 0.3, 0.6]),
        (14, [0.0, 0.2, 0.3, 0.5]),
        (15, [0.1, 0.2, 0.25, 0.45]),
    ];
    for (bits, [feeling, behavior, assess, commit_change]) in rows {
        let alloc = alloc_lookup(bits);
        assert_eq!(alloc.feeling, feeling, "bits {bits}");
        assert_eq!(alloc.behavior, behavior, "bits {bits}");
        assert_eq!(alloc.assess, assess, "bits {bits}");
        assert_eq!(alloc.commit_change, commit_change, "bits {bits}");
        assert_eq!(alloc.breakup + alloc.incident, 0.0);
    }
}

#[test]
fn phase_change_rule_type_agrees_with_transition_sign() {
    let mut checked = 0;
    for (from, to, score) in transitions() {
        let prior = CommitLevel::from_ordinal(from).unwrap();
        let current = CommitLevel::from_ordinal(to).unwrap();
        let rule_type = rule_type_from_phase_change(current, prior).unwrap();
        assert_eq!(get_commit_level_impact(from, to), score);
        match rule_type {
            ScoreRuleType::ProspectStatusIncrease => assert!(score > 0.0, "{from}-{to}"),
            ScoreRuleType::ProspectStatusDecrease | ScoreRuleType::Breakup => {
                assert!(score < 0.0, "{from}-{to}")
            }
            other => panic!("unexpected rule type {other:?}"),
        }
        checked += 1;
    }
    assert_eq!(checked, 20);
}
