//! Profit simulation
//!
//! Revenue, itemized costs, yearly projections, break-even, and ROI from
//! variety, area, and optional live inputs. Input resolution follows a
//! fixed priority chain:
//!
//! - yield: explicit request value, then the designer's yield-per-area
//!   source of truth, then the scenario default
//! - price: explicit request value, then the live auction cache, then the
//!   scenario default (the chosen source is reported in the result)
//!
//! The evolution engine's correction multipliers are folded into yield,
//! cost, and the farm-gate ratio — the channel through which the
//! self-refinement loop's learned corrections act on future runs.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tracing::{debug, instrument};

use pomona_agro::grading::OrchardGrader;
use pomona_agro::{resolve_spacing, rootstock, yield_per_10a as ssot_yield_per_10a};
use pomona_common::{
    CostLine, FeatureFlags, GradeShare, OrchardGrade, PriceSource, RegionAdjustment,
    RegionGrade, RunRecord, ScenarioComparison, ScenarioOutcome, SimulationRequest,
    SimulationResult, YearlyProjection, FARM_GATE_RATIO, PYEONG_TO_M2,
};
use pomona_evolve::EvolutionEngine;

use crate::analytics::RunAnalytics;
use crate::price::PriceCache;
use crate::scenario::{
    maturity_ratio, scenario_for, COMPARE_SCENARIOS, COST_FLOOR_RATIO, COST_ITEMS,
};
use crate::validator::SimulationValidator;

/// Region grade supplier seam. The concrete grader never fails, but a
/// remote implementation may; `None` always means "no adjustment" and is
/// never propagated as an error.
pub trait RegionGradeSource: Send + Sync {
    fn region_grade(&self, region_id: &str) -> Option<RegionGrade>;
}

impl RegionGradeSource for OrchardGrader {
    fn region_grade(&self, region_id: &str) -> Option<RegionGrade> {
        Some(self.grade_region(region_id))
    }
}

/// Yield multiplier and premium-ratio shift for a site grade
fn grade_adjustment(grade: OrchardGrade) -> (f64, f64) {
    match grade {
        OrchardGrade::S => (1.10, 0.05),
        OrchardGrade::A => (1.0, 0.0),
        OrchardGrade::B => (0.90, -0.05),
        OrchardGrade::C => (0.75, -0.10),
    }
}

/// Shift the premium share (mirrored on substandard), clamp both to their
/// plausible bands, and renormalize the mix to sum to 1.0.
fn apply_grade_shift(grades: &mut [GradeShare], shift: f64) {
    use pomona_common::AppleGrade;

    for share in grades.iter_mut() {
        match share.grade {
            AppleGrade::Premium => {
                share.ratio = (share.ratio + shift).clamp(0.02, 0.40);
            }
            AppleGrade::Substandard => {
                share.ratio = (share.ratio - shift).clamp(0.05, 0.40);
            }
            _ => {}
        }
    }
    let sum: f64 = grades.iter().map(|g| g.ratio).sum();
    if sum > 0.0 {
        for share in grades.iter_mut() {
            share.ratio /= sum;
        }
    }
}

/// The profit simulator service
pub struct ProfitSimulator {
    flags: Arc<FeatureFlags>,
    evolution: Arc<EvolutionEngine>,
    price_cache: Arc<PriceCache>,
    analytics: Arc<RunAnalytics>,
    validator: Arc<SimulationValidator>,
    grader: Option<Arc<dyn RegionGradeSource>>,
}

impl ProfitSimulator {
    pub fn new(
        flags: Arc<FeatureFlags>,
        evolution: Arc<EvolutionEngine>,
        price_cache: Arc<PriceCache>,
        analytics: Arc<RunAnalytics>,
        validator: Arc<SimulationValidator>,
    ) -> Self {
        Self {
            flags,
            evolution,
            price_cache,
            analytics,
            validator,
            grader: None,
        }
    }

    /// Attach a region grade source for grade-based adjustment.
    pub fn with_grader(mut self, grader: Arc<dyn RegionGradeSource>) -> Self {
        self.grader = Some(grader);
        self
    }

    /// One raw simulation pass: no validation, no refinement, no history
    /// recording. [`run`](Self::run) is the full request path.
    #[instrument(skip(self), fields(variety = %req.variety))]
    pub fn simulate(&self, req: &SimulationRequest) -> SimulationResult {
        let scenario = scenario_for(&req.variety);

        // ---- input resolution ----

        let base_yield = req
            .yield_per_10a
            .unwrap_or_else(|| ssot_yield_per_10a(&req.variety, None, None, req.rootstock.as_deref()));

        let (price_per_kg, price_source) = match req.price_per_kg {
            Some(p) => (p, PriceSource::UserInput),
            None => match self.price_cache.apple_price() {
                Some(p) => (p, PriceSource::KamisLive),
                None => (scenario.price_per_kg, PriceSource::ScenarioDefault),
            },
        };

        let mut grades = scenario.grade_shares();

        // optional region-grade adjustment; any failure to obtain a grade
        // means "no adjustment"
        let mut grade_yield_factor = 1.0;
        let mut region_adjustment = None;
        if self.flags.is_enabled("simulation_grade_adjustment") {
            if let (Some(region), Some(grader)) = (req.region.as_deref(), self.grader.as_deref()) {
                if let Some(region_grade) = grader.region_grade(region) {
                    let (yield_factor, premium_shift) = grade_adjustment(region_grade.grade);
                    apply_grade_shift(&mut grades, premium_shift);
                    grade_yield_factor = yield_factor;
                    region_adjustment = Some(RegionAdjustment {
                        region_id: region.to_string(),
                        grade: region_grade.grade,
                        yield_factor,
                        premium_shift,
                    });
                } else {
                    debug!(region, "no region grade available, simulating unadjusted");
                }
            }
        }

        // ---- evolution modifiers ----

        let variety_modifier = self
            .evolution
            .modifier(&format!("yield_modifier_{}", req.variety), 1.0);
        let global_modifier = self.evolution.modifier("yield_modifier_global", 1.0);
        let farm_gate = self.evolution.modifier("farm_gate_ratio", FARM_GATE_RATIO);
        let cost_modifier = self.evolution.modifier("cost_modifier_global", 1.0);

        let yield_per_10a = base_yield * grade_yield_factor * variety_modifier * global_modifier;

        // ---- revenue ----

        let area_m2 = req.area_pyeong * PYEONG_TO_M2;
        let area_10a = area_m2 / 1000.0;
        let total_yield_kg = yield_per_10a * area_10a;
        let grade_factor: f64 = grades.iter().map(|g| g.ratio * g.price_multiplier).sum();
        let weighted_price = grade_factor * price_per_kg * farm_gate;
        let annual_revenue = (total_yield_kg * weighted_price).floor() as i64;

        // ---- costs ----

        let cost_breakdown: Vec<CostLine> = COST_ITEMS
            .iter()
            .map(|&(category, name, amount_per_10a)| CostLine {
                category,
                name: name.to_string(),
                amount: (amount_per_10a as f64 * area_10a * cost_modifier).floor() as i64,
            })
            .collect();
        let annual_cost: i64 = cost_breakdown.iter().map(|c| c.amount).sum();
        let annual_profit = annual_revenue - annual_cost;
        let income_ratio = if annual_revenue > 0 {
            annual_profit as f64 / annual_revenue as f64
        } else {
            0.0
        };

        // ---- trees and initial investment ----

        let spacing = resolve_spacing(&req.variety, None, None, req.rootstock.as_deref());
        let total_trees = req.total_trees.unwrap_or_else(|| {
            ((area_m2 * 0.85 / (spacing.row_m * spacing.tree_m)).floor() as u32).max(1)
        });

        let stock = req
            .rootstock
            .as_deref()
            .and_then(rootstock)
            .unwrap_or_else(pomona_agro::designer::default_rootstock);
        let initial_investment = total_trees as i64 * stock.seedling_cost
            + (area_10a * stock.infra_cost_per_10a as f64).floor() as i64;

        // ---- yearly projection ----

        let mut yearly_projections = Vec::with_capacity(req.projection_years as usize);
        let mut cumulative_profit = -initial_investment;
        let mut break_even_year = req.projection_years;
        let mut break_even_found = false;

        for year in 1..=req.projection_years {
            let ratio = maturity_ratio(year);
            let year_yield = total_yield_kg * ratio;
            let year_revenue = (year_yield * weighted_price).floor() as i64;
            // unproductive years still carry most of the cost base
            let cost_ratio = COST_FLOOR_RATIO + (1.0 - COST_FLOOR_RATIO) * ratio.min(1.0);
            let year_cost = (annual_cost as f64 * cost_ratio).floor() as i64;
            let year_profit = year_revenue - year_cost;
            cumulative_profit += year_profit;

            yearly_projections.push(YearlyProjection {
                year,
                yield_ratio: ratio,
                yield_kg: year_yield,
                revenue: year_revenue,
                cost: year_cost,
                profit: year_profit,
            });

            if cumulative_profit >= 0 && !break_even_found {
                break_even_year = year;
                break_even_found = true;
            }
        }

        let roi_10year = if initial_investment > 0 {
            cumulative_profit as f64 / initial_investment as f64
        } else {
            0.0
        };

        SimulationResult {
            variety: req.variety.clone(),
            area_pyeong: req.area_pyeong,
            area_m2,
            area_10a,
            total_trees,
            yield_per_10a,
            price_per_kg,
            price_source,
            grade_distribution: grades,
            annual_revenue,
            annual_cost,
            annual_profit,
            income_ratio,
            cost_breakdown,
            yearly_projections,
            break_even_year,
            roi_10year,
            initial_investment,
            region_adjustment,
            validation_notes: Vec::new(),
            refined: false,
            analytics_context: None,
        }
    }

    /// The full request path: simulate, validate, apply at most one
    /// refinement pass, enrich with analytics context, and record the run.
    #[instrument(skip(self), fields(variety = %req.variety))]
    pub fn run(&self, req: &SimulationRequest) -> SimulationResult {
        let started = Instant::now();
        let mut result = self.simulate(req);

        let notes = self.validator.validate(&result);
        let mut refined = false;
        if self.flags.is_enabled("simulation_self_refine") {
            if let Some(refined_req) = self.validator.suggest_refinement(req, &result, &notes) {
                let mut rerun = self.simulate(&refined_req);
                rerun.refined = true;
                // the refined result is validated again but never re-refined
                rerun.validation_notes = self.validator.validate(&rerun);
                result = rerun;
                refined = true;
            }
        }
        if !refined {
            result.validation_notes = notes.clone();
        }
        self.validator.record_outcome(&notes, refined);

        if self.flags.is_enabled("simulation_analytics_context") {
            match self.analytics.context_for(&result) {
                Ok(ctx) => result.analytics_context = Some(ctx),
                Err(skipped) => debug!(%skipped, "analytics context not attached"),
            }
        }

        self.analytics.record_run(RunRecord {
            timestamp: Utc::now().timestamp_millis(),
            variety: result.variety.clone(),
            area_pyeong: result.area_pyeong,
            total_trees: result.total_trees,
            projection_years: req.projection_years,
            annual_profit: result.annual_profit,
            roi_10year: result.roi_10year,
            break_even_year: result.break_even_year,
            duration_ms: started.elapsed().as_secs_f64() * 1000.0,
        });

        result
    }

    /// Run the optimistic / neutral / pessimistic comparison and synthesize
    /// a recommendation.
    #[instrument(skip(self))]
    pub fn compare_scenarios(
        &self,
        variety: &str,
        area_pyeong: f64,
        projection_years: u32,
    ) -> ScenarioComparison {
        let scenario = scenario_for(variety);
        let base_yield = scenario.yield_per_10a;
        let base_price = scenario.price_per_kg;

        let scenarios: Vec<ScenarioOutcome> = COMPARE_SCENARIOS
            .iter()
            .map(|&(name, yield_mult, price_mult)| {
                let req = SimulationRequest::new(variety, area_pyeong)
                    .with_yield(base_yield * yield_mult)
                    .with_price(base_price * price_mult)
                    .with_projection_years(projection_years);
                let result = self.simulate(&req);
                let total_profit: i64 =
                    result.yearly_projections.iter().map(|p| p.profit).sum();
                ScenarioOutcome {
                    scenario: name.to_string(),
                    yield_per_10a: result.yield_per_10a,
                    price_per_kg: result.price_per_kg,
                    annual_revenue: result.annual_revenue,
                    annual_cost: result.annual_cost,
                    annual_profit: result.annual_profit,
                    income_ratio: result.income_ratio,
                    break_even_year: result.break_even_year,
                    roi_10year: result.roi_10year,
                    total_profit,
                }
            })
            .collect();

        let recommendation = build_recommendation(variety, &scenarios[1], &scenarios[2]);

        ScenarioComparison {
            variety: variety.to_string(),
            area_pyeong,
            scenarios,
            recommendation,
        }
    }
}

fn build_recommendation(
    variety: &str,
    neutral: &ScenarioOutcome,
    pessimistic: &ScenarioOutcome,
) -> String {
    let mut parts = Vec::new();

    if pessimistic.annual_profit > 0 {
        parts.push(format!(
            "{} stays profitable even in the pessimistic scenario; a stable choice.",
            variety
        ));
    } else if neutral.annual_profit > 0 {
        parts.push(format!(
            "{} is profitable in the neutral scenario but could run a loss if the market drops.",
            variety
        ));
    } else {
        parts.push(format!(
            "{} runs a loss even in the neutral scenario; careful review recommended.",
            variety
        ));
    }

    if neutral.break_even_year <= 5 {
        parts.push(format!(
            "Break-even in about {} years is on the fast side.",
            neutral.break_even_year
        ));
    } else if neutral.break_even_year <= 8 {
        parts.push(format!(
            "Expect roughly {} years to break even.",
            neutral.break_even_year
        ));
    } else {
        parts.push(format!(
            "Break-even may take {} years or more; plan for the long term.",
            neutral.break_even_year
        ));
    }

    parts.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pomona_common::AppleGrade;

    #[test]
    fn test_grade_adjustment_table() {
        assert_eq!(grade_adjustment(OrchardGrade::S), (1.10, 0.05));
        assert_eq!(grade_adjustment(OrchardGrade::A), (1.0, 0.0));
        assert_eq!(grade_adjustment(OrchardGrade::B), (0.90, -0.05));
        assert_eq!(grade_adjustment(OrchardGrade::C), (0.75, -0.10));
    }

    #[test]
    fn test_grade_shift_renormalizes() {
        let mut grades = scenario_for("fuji").grade_shares();
        apply_grade_shift(&mut grades, 0.05);
        let sum: f64 = grades.iter().map(|g| g.ratio).sum();
        assert!((sum - 1.0).abs() < 1e-9);

        let premium = grades
            .iter()
            .find(|g| g.grade == AppleGrade::Premium)
            .unwrap();
        let substandard = grades
            .iter()
            .find(|g| g.grade == AppleGrade::Substandard)
            .unwrap();
        assert!(premium.ratio > 0.15);
        assert!(substandard.ratio < 0.15);
    }

    #[test]
    fn test_grade_shift_clamps_extremes() {
        let mut grades = scenario_for("fuji").grade_shares();
        // an absurd shift cannot push shares past their clamps (before
        // renormalization)
        apply_grade_shift(&mut grades, 5.0);
        let sum: f64 = grades.iter().map(|g| g.ratio).sum();
        assert!((sum - 1.0).abs() < 1e-9);
        for g in &grades {
            assert!(g.ratio > 0.0 && g.ratio < 1.0);
        }
    }

    #[test]
    fn test_maturity_cost_floor() {
        // at zero yield the cost ratio is exactly the floor
        let ratio = COST_FLOOR_RATIO + (1.0 - COST_FLOOR_RATIO) * 0.0;
        assert!((ratio - 0.70).abs() < 1e-12);
        let full = COST_FLOOR_RATIO + (1.0 - COST_FLOOR_RATIO) * 1.0;
        assert!((full - 1.0).abs() < 1e-12);
    }
}
