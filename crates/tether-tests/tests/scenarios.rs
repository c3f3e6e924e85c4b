//! Worked scoring scenarios, checked at the formula level and through a full
//! service pass.

use tether_core::alloc::{Alloc, alloc_lookup};
use tether_core::commit_level::CommitLevel;
use tether_core::incident::Incident;
use tether_core::interpolation::{ScoreArgs, SliderKind, bounded_notch, incident_notch, incident_score};
use tether_core::interval::Interval;
use tether_core::rollup::month_key;
use tether_core::types::PairKey;
use tether_node::EngineConfig;
use tether_tests::helpers::{d, default_service, memory_service};

const EPS: f64 = 1e-9;

// --- Scenario A: strongest positive behavior ---

#[test]
fn scenario_a_formula() {
    let notch = bounded_notch(0.6, SliderKind::Three);
    assert!((notch - 0.2).abs() < EPS);
    let score = ScoreArgs::Behavior { slider_pos: 3 }.score(0.6, notch);
    assert!((score - 1.0).abs() < EPS);
    assert!(score <= 1.0);
}

#[test]
fn scenario_a_through_service() {
    let svc = default_service();
    let pair = PairKey::new("alice", "sam");
    // no opposite, so the static impact is used on both sides
    let behavior = svc.behavior_entry("BRINGS_FLOWERS", 3, d(5, 4)).unwrap();
    svc.record_behavior(&pair, &behavior).unwrap();
    svc.rescore(&pair, d(5, 4)).unwrap();

    let month = svc.repo().month(&pair, &month_key(d(5, 4))).unwrap().unwrap();
    let day = month.day(d(5, 4)).unwrap();
    assert!((day.app_user_score - 1.0).abs() < EPS);
    assert!((day.community_hybrid_score - 1.0).abs() < EPS);
    assert!(day.app_user_score <= 1.0);
}

// --- Scenario B: "never" answer passes its minimum weight through ---

#[test]
fn scenario_b_formula() {
    let args = ScoreArgs::ValueAssessment { concern_vote: 3, freq_vote: 1 };
    let notch = bounded_notch(-0.6, SliderKind::Four);
    assert_eq!(args.score(-0.6, notch), -0.6);
}

#[test]
fn scenario_b_reward_weight_through_resolver() {
    // concern 3 scales -0.8 to -0.6; "never" rewards half of it
    let args = ScoreArgs::ValueAssessment { concern_vote: 3, freq_vote: 1 };
    let (min_weight, _) = args.min_and_notch(-0.8);
    assert!((min_weight - 0.3).abs() < EPS);
    assert!((args.resolve(-0.8) - 0.3).abs() < EPS);
}

// --- Scenario C: incident ratio ---

#[test]
fn scenario_c_formula() {
    let notch = incident_notch(-0.7);
    assert!((notch + 0.3).abs() < EPS);
    let score = incident_score(-0.7, notch, 10, 30);
    assert!((score + 0.8).abs() < EPS);
}

#[test]
fn scenario_c_through_service() {
    let svc = default_service();
    let alice = PairKey::new("alice", "sam");
    let bea = PairKey::new("bea", "sam");
    svc.begin_relationship(&alice, CommitLevel::ExclusiveMa, d(1, 1), d(1, 1))
        .unwrap();
    svc.begin_relationship(&bea, CommitLevel::Dating, d(1, 21), d(1, 21))
        .unwrap();
    // nothing overlaps yet on bea's first day
    assert!(svc.repo().incidents(&alice).unwrap().is_empty());

    // on 1/31 alice's relationship is 30 days old, 10 of them shared with bea
    let summary = svc.reconcile_incidents("sam", d(1, 31)).unwrap();
    assert_eq!(summary.created, 1);
    let entries = svc.repo().entries(&alice).unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(
        entries[0].args,
        ScoreArgs::Incident { overlap_days: 10, relationship_days: 30 }
    );

    svc.rescore(&alice, d(1, 31)).unwrap();
    let month = svc.repo().month(&alice, &month_key(d(1, 21))).unwrap().unwrap();
    let day = month.day(d(1, 21)).unwrap();
    assert!((day.app_user_score + 0.8).abs() < EPS);
    assert!((day.community_hybrid_score + 0.8).abs() < EPS);
    assert_eq!(day.items_bit_code, 32);
}

#[test]
fn scenario_c_incident_entry() {
    let mine = Interval::open(d(3, 1), CommitLevel::ExclusiveAssumed);
    let theirs = Interval::closed(d(3, 11), d(3, 21), CommitLevel::Casual);
    let incident = Incident::detect("alice", mine, "bea", theirs, "sam", d(3, 31)).unwrap();
    assert_eq!(incident.overlap_days, 10);
    let entry = tether_core::entry::EntryAdapter::from_incident(&incident, 30);
    assert!((entry.args.resolve(-0.7) + 0.8).abs() < EPS);
}

// --- Scenario D: feeling and behavior share a day ---

#[test]
fn scenario_d_formula() {
    let alloc = alloc_lookup(3);
    assert_eq!(
        alloc,
        Alloc {
            feeling: 0.3,
            behavior: 0.7,
            assess: 0.0,
            commit_change: 0.0,
            breakup: 0.0,
            incident: 0.0,
        }
    );
}

#[test]
fn scenario_d_through_service() {
    let svc = memory_service(EngineConfig::default());
    let pair = PairKey::new("alice", "sam");
    let behavior = svc.behavior_entry("BRINGS_FLOWERS", 3, d(6, 1)).unwrap();
    svc.record_behavior(&pair, &behavior).unwrap();
    svc.record_feeling(
        &pair,
        &tether_core::entry::FeelingEntry {
            code: "FORGETS_DATES".into(),
            positive: false,
            feeling_strength: 1,
            occur_date: d(6, 1),
        },
    )
    .unwrap();
    svc.rescore(&pair, d(6, 1)).unwrap();

    let month = svc.repo().month(&pair, &month_key(d(6, 1))).unwrap().unwrap();
    let day = month.day(d(6, 1)).unwrap();
    assert_eq!(day.items_bit_code, 3);
    // 0.3 · (-0.6) + 0.7 · 1.0
    assert!((day.app_user_score - 0.52).abs() < EPS);
}
