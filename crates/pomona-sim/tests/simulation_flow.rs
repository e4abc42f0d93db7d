//! End-to-end simulation path tests: input resolution, the validation and
//! refinement loop, region grade adjustment, and the evolution coupling.

use std::path::PathBuf;
use std::sync::Arc;

use pomona_common::storage::{JsonFileStore, JsonlFileLog};
use pomona_common::{
    FeatureFlags, OrchardGrade, PriceSource, RegionGrade, Severity, SimulationRequest,
};
use pomona_evolve::{EvolutionEngine, EvolutionSignals};
use pomona_sim::{
    PriceCache, ProfitSimulator, RegionGradeSource, RunAnalytics, SimulationValidator,
};

struct TestStack {
    simulator: ProfitSimulator,
    evolution: Arc<EvolutionEngine>,
    price_cache: Arc<PriceCache>,
    flags: Arc<FeatureFlags>,
}

fn temp_dir() -> PathBuf {
    std::env::temp_dir().join(format!("pomona-simflow-{}", uuid::Uuid::new_v4()))
}

fn stack() -> TestStack {
    let dir = temp_dir();
    let store = Arc::new(JsonFileStore::new(&dir).unwrap());
    let flags = Arc::new(FeatureFlags::load(store.clone()));
    let evolution = Arc::new(EvolutionEngine::load(
        store.clone(),
        Arc::new(JsonlFileLog::new(dir.join("evolution_events.jsonl")).unwrap()),
        flags.clone(),
    ));
    let price_cache = Arc::new(PriceCache::new());
    let analytics = Arc::new(RunAnalytics::load(Arc::new(
        JsonlFileLog::new(dir.join("runs.jsonl")).unwrap(),
    )));
    let validator = Arc::new(SimulationValidator::new(Arc::new(
        JsonlFileLog::new(dir.join("validator_outcomes.jsonl")).unwrap(),
    )));
    let simulator = ProfitSimulator::new(
        flags.clone(),
        evolution.clone(),
        price_cache.clone(),
        analytics,
        validator,
    );
    TestStack {
        simulator,
        evolution,
        price_cache,
        flags,
    }
}

/// A grade source pinned to one grade, for exercising the adjustment table.
struct FixedGrade(OrchardGrade);

impl RegionGradeSource for FixedGrade {
    fn region_grade(&self, region_id: &str) -> Option<RegionGrade> {
        Some(RegionGrade {
            region_id: region_id.to_string(),
            region_name: region_id.to_string(),
            grade: self.0,
            total_score: 0.0,
            factors: Vec::new(),
        })
    }
}

#[test]
fn fuji_default_run_end_to_end() {
    let stack = stack();
    let req = SimulationRequest::new("fuji", 1000.0);
    let result = stack.simulator.run(&req);

    assert!((result.area_m2 - 3305.8).abs() < 0.1);
    assert!(result.total_trees > 0);

    assert_eq!(result.grade_distribution.len(), 4);
    let ratio_sum: f64 = result.grade_distribution.iter().map(|g| g.ratio).sum();
    assert!((ratio_sum - 1.0).abs() < 0.01);

    assert_eq!(result.yearly_projections.len(), 10);
    assert_eq!(result.yearly_projections[0].yield_ratio, 0.0);
    assert_eq!(result.yearly_projections[8].yield_ratio, 1.0);

    assert!(result.break_even_year >= 1 && result.break_even_year <= 10);
    assert_eq!(
        result.annual_revenue - result.annual_cost,
        result.annual_profit
    );
    assert_eq!(result.price_source, PriceSource::ScenarioDefault);
    assert!(!result.refined);
    assert!(result
        .validation_notes
        .iter()
        .all(|n| n.severity != Severity::Caution));
}

#[test]
fn unknown_variety_falls_back_to_fuji_scenario() {
    let stack = stack();
    let result = stack
        .simulator
        .run(&SimulationRequest::new("mystery-apple", 1000.0));
    // price comes from the fuji scenario, yield from the designer's
    // default-variety spacing tables
    assert_eq!(result.price_per_kg, 5500.0);
    assert!(
        result.yield_per_10a >= 1500.0 && result.yield_per_10a <= 3000.0,
        "yield {}",
        result.yield_per_10a
    );
}

#[test]
fn explicit_price_wins_and_is_reported() {
    let stack = stack();
    stack.price_cache.update(&[6200.0]);
    let result = stack
        .simulator
        .run(&SimulationRequest::new("fuji", 1000.0).with_price(7000.0));
    assert_eq!(result.price_source, PriceSource::UserInput);
    assert_eq!(result.price_per_kg, 7000.0);
}

#[test]
fn cached_auction_price_beats_scenario_default() {
    let stack = stack();
    stack.price_cache.update(&[6200.0]);
    let result = stack.simulator.run(&SimulationRequest::new("fuji", 1000.0));
    assert_eq!(result.price_source, PriceSource::KamisLive);
    assert_eq!(result.price_per_kg, 6200.0);
}

#[test]
fn region_grade_s_beats_c() {
    let s_simulator = stack()
        .simulator
        .with_grader(Arc::new(FixedGrade(OrchardGrade::S)));
    let c_simulator = stack()
        .simulator
        .with_grader(Arc::new(FixedGrade(OrchardGrade::C)));

    let req = SimulationRequest::new("fuji", 1000.0).with_region("yeongju");
    let s_result = s_simulator.simulate(&req);
    let c_result = c_simulator.simulate(&req);

    assert!(s_result.yield_per_10a > c_result.yield_per_10a);
    assert_eq!(s_result.region_adjustment.as_ref().unwrap().yield_factor, 1.10);
    assert_eq!(c_result.region_adjustment.as_ref().unwrap().yield_factor, 0.75);

    // premium share rises under S and falls under C, mix still sums to 1
    let premium = |r: &pomona_common::SimulationResult| r.grade_distribution[0].ratio;
    assert!(premium(&s_result) > premium(&c_result));
    for r in [&s_result, &c_result] {
        let sum: f64 = r.grade_distribution.iter().map(|g| g.ratio).sum();
        assert!((sum - 1.0).abs() < 0.01);
    }
}

#[test]
fn grade_adjustment_respects_feature_flag() {
    let stack_enabled = stack();
    let simulator = stack_enabled
        .simulator
        .with_grader(Arc::new(FixedGrade(OrchardGrade::S)));
    stack_enabled.flags.set("simulation_grade_adjustment", false);

    let req = SimulationRequest::new("fuji", 1000.0).with_region("yeongju");
    let result = simulator.simulate(&req);
    assert!(result.region_adjustment.is_none());
}

#[test]
fn out_of_range_yield_is_refined_exactly_once() {
    let stack = stack();
    let req = SimulationRequest::new("fuji", 1000.0).with_yield(5000.0);
    let result = stack.simulator.run(&req);

    assert!(result.refined);
    // one pass: ROI shrink (x0.90) then clamp to the 4000 ceiling; a second
    // pass would have shrunk it further
    assert!(
        (result.yield_per_10a - 4000.0).abs() < 1e-9,
        "yield {}",
        result.yield_per_10a
    );
}

#[test]
fn refinement_disabled_by_flag() {
    let stack = stack();
    stack.flags.set("simulation_self_refine", false);
    let req = SimulationRequest::new("fuji", 1000.0).with_yield(5000.0);
    let result = stack.simulator.run(&req);

    assert!(!result.refined);
    assert_eq!(result.yield_per_10a, 5000.0);
    // the findings are still attached for the caller
    assert!(result
        .validation_notes
        .iter()
        .any(|n| n.severity == Severity::Caution));
}

#[test]
fn scenario_comparison_ordering_holds() {
    let stack = stack();
    let cmp = stack.simulator.compare_scenarios("fuji", 1000.0, 10);
    assert_eq!(cmp.scenarios.len(), 3);
    let optimistic = &cmp.scenarios[0];
    let neutral = &cmp.scenarios[1];
    let pessimistic = &cmp.scenarios[2];
    assert_eq!(optimistic.scenario, "optimistic");
    assert!(optimistic.annual_profit >= neutral.annual_profit);
    assert!(neutral.annual_profit >= pessimistic.annual_profit);
    assert!(!cmp.recommendation.is_empty());
}

#[test]
fn evolution_modifiers_flow_into_simulation() {
    let stack = stack();
    let baseline = stack
        .simulator
        .simulate(&SimulationRequest::new("fuji", 1000.0));

    // drive the engine to shrink the fuji yield modifier
    let mut breakdown = std::collections::BTreeMap::new();
    breakdown.insert(
        "fuji".to_string(),
        pomona_common::VarietyFeedback {
            helpful: 1,
            inaccurate: 5,
            needs_detail: 0,
            total: 6,
        },
    );
    let signals = EvolutionSignals {
        feedback: Some(pomona_common::FeedbackStats {
            total: 6,
            helpful_rate: 1.0 / 6.0,
            recent_issues: vec![],
            variety_breakdown: breakdown,
        }),
        outcomes: vec![],
        alerts: vec![],
    };
    let report = stack.evolution.evolve(&signals);
    assert!(report.evolved);

    let adjusted = stack
        .simulator
        .simulate(&SimulationRequest::new("fuji", 1000.0));
    assert!(adjusted.yield_per_10a < baseline.yield_per_10a);

    // rollback restores the original behavior
    stack.evolution.rollback();
    let restored = stack
        .simulator
        .simulate(&SimulationRequest::new("fuji", 1000.0));
    assert_eq!(restored.yield_per_10a, baseline.yield_per_10a);
}

#[test]
fn identity_and_bounds_hold_across_inputs() {
    let stack = stack();
    for variety in ["fuji", "hongro", "gamhong", "arisoo", "ruby-s"] {
        for area in [120.0, 500.0, 1000.0, 4000.0] {
            for years in [1u32, 5, 10, 15] {
                let req = SimulationRequest::new(variety, area).with_projection_years(years);
                let result = stack.simulator.simulate(&req);

                assert_eq!(
                    result.annual_revenue - result.annual_cost,
                    result.annual_profit
                );
                assert_eq!(result.yearly_projections.len(), years as usize);
                assert!(result.break_even_year >= 1 && result.break_even_year <= years);
                assert!(result.total_trees >= 1);

                // projection rows keep the identity and the maturity
                // ordering too
                let mut prev = -1.0;
                for p in &result.yearly_projections {
                    assert_eq!(p.revenue - p.cost, p.profit);
                    assert!(p.yield_ratio >= prev);
                    prev = p.yield_ratio;
                }
            }
        }
    }
}

#[test]
fn ssot_yield_matches_designer_within_tolerance() {
    let stack = stack();
    for variety in ["fuji", "hongro", "gamhong", "arisoo"] {
        let designer_value = pomona_agro::yield_per_10a(variety, None, None, None);
        let result = stack
            .simulator
            .simulate(&SimulationRequest::new(variety, 1000.0));
        let delta = (result.yield_per_10a - designer_value).abs() / designer_value;
        assert!(delta <= 0.15, "{}: delta {:.3}", variety, delta);
    }
}

#[test]
fn analytics_context_attaches_after_history_builds() {
    let stack = stack();
    let req = SimulationRequest::new("fuji", 1000.0);
    let first = stack.simulator.run(&req);
    assert!(first.analytics_context.is_none());

    stack.simulator.run(&req);
    let third = stack.simulator.run(&req);
    let ctx = third.analytics_context.expect("history exists now");
    assert!(ctx.total_runs >= 2);
    assert!(ctx.variety_runs >= 2);
}
