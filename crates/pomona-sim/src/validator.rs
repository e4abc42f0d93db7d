//! Bi-directional plausibility validation and self-refinement
//!
//! Checks a simulation result against a configurable table of acceptable
//! ranges, in both directions: too optimistic (inflated income ratio or
//! ROI, impossibly early break-even) and too pessimistic (starved income
//! ratio, hopeless ROI, distant break-even). Findings are structured notes,
//! never errors; only `caution` notes are eligible to drive the single
//! automatic refinement pass.
//!
//! A slow-moving learner tracks the refinement rate over a sliding window
//! and relaxes the range table when nearly every run is being refined —
//! that means the table is too strict, not that every run is wrong.

use std::sync::Arc;

use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use tracing::{info, warn};

use pomona_common::storage::{append_record, AppendLog};
use pomona_common::{
    Severity, SimulationRequest, SimulationResult, ValidationNote, ValidatorOutcome,
};

/// Acceptable-range table for plausibility checks
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationConfig {
    pub income_ratio: (f64, f64),
    pub roi_10year: (f64, f64),
    pub break_even_year_min: u32,
    pub break_even_year_max: u32,
    pub yield_per_10a_range: (f64, f64),
    pub price_per_kg_range: (f64, f64),
    /// ROI below this is suspected under-estimation
    pub pessimistic_roi_threshold: f64,
    /// Yield multiplier applied when under-estimation is corrected
    pub yield_boost_factor: f64,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            income_ratio: (0.20, 0.90),
            roi_10year: (-0.5, 6.0),
            break_even_year_min: 3,
            break_even_year_max: 15,
            yield_per_10a_range: (1000.0, 4000.0),
            price_per_kg_range: (2000.0, 15_000.0),
            pessimistic_roi_threshold: -0.3,
            yield_boost_factor: 1.10,
        }
    }
}

/// Sliding-window refinement-rate tracker.
///
/// Stable rates raise the adjustment scale (the feedback is trustworthy),
/// volatile rates lower it. The scale multiplies the range-relaxation step.
struct RefinementLearner {
    window: usize,
    samples: Vec<f64>,
    scale: f64,
}

impl RefinementLearner {
    fn new(window: usize) -> Self {
        Self {
            window,
            samples: Vec::new(),
            scale: 1.0,
        }
    }

    fn record(&mut self, refined: bool) {
        self.samples.push(if refined { 1.0 } else { 0.0 });
        let cap = self.window * 3;
        if self.samples.len() > cap {
            let excess = self.samples.len() - cap;
            self.samples.drain(..excess);
        }
    }

    fn maybe_tune(&mut self) {
        if self.samples.len() < self.window {
            return;
        }
        let half = self.window / 2;
        let recent = &self.samples[self.samples.len() - half..];
        let older = &self.samples[self.samples.len() - self.window..self.samples.len() - half];

        let recent_rate = recent.iter().sum::<f64>() / recent.len() as f64;
        let older_rate = if older.is_empty() {
            recent_rate
        } else {
            older.iter().sum::<f64>() / older.len() as f64
        };
        let change = (recent_rate - older_rate).abs();

        if change < 0.1 {
            self.scale = (self.scale + 0.1).min(1.5);
        } else if change > 0.3 {
            self.scale = (self.scale - 0.1).max(0.5);
        }
    }

    fn window_rate(&self) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        let take = self.window.min(self.samples.len());
        let tail = &self.samples[self.samples.len() - take..];
        tail.iter().sum::<f64>() / tail.len() as f64
    }

    fn sample_count(&self) -> usize {
        self.samples.len()
    }
}

/// Plausibility validator with outcome tracking
pub struct SimulationValidator {
    outcome_log: Arc<dyn AppendLog>,
    config: RwLock<ValidationConfig>,
    learner: Mutex<RefinementLearner>,
}

impl SimulationValidator {
    pub fn new(outcome_log: Arc<dyn AppendLog>) -> Self {
        Self::with_config(outcome_log, ValidationConfig::default())
    }

    pub fn with_config(outcome_log: Arc<dyn AppendLog>, config: ValidationConfig) -> Self {
        Self {
            outcome_log,
            config: RwLock::new(config),
            learner: Mutex::new(RefinementLearner::new(15)),
        }
    }

    /// Current range table (the learner may have relaxed it)
    pub fn config(&self) -> ValidationConfig {
        self.config.read().clone()
    }

    /// Validate a result in both directions.
    pub fn validate(&self, result: &SimulationResult) -> Vec<ValidationNote> {
        let cfg = self.config.read().clone();
        let mut notes = Vec::new();

        // structural checks

        let grade_sum: f64 = result.grade_distribution.iter().map(|g| g.ratio).sum();
        if (grade_sum - 1.0).abs() > 0.01 {
            notes.push(ValidationNote::new(
                Severity::Warning,
                "grade_distribution",
                format!("grade ratios sum to {:.2}, expected 1.0", grade_sum),
            ));
        }

        let expected_profit = result.annual_revenue - result.annual_cost;
        if expected_profit != result.annual_profit {
            notes.push(ValidationNote::new(
                Severity::Warning,
                "annual_profit",
                "annual revenue minus cost does not equal annual profit",
            ));
        }

        let mut prev_ratio = -1.0;
        for proj in &result.yearly_projections {
            if proj.yield_ratio < prev_ratio - 0.01 {
                notes.push(ValidationNote::new(
                    Severity::Info,
                    "yearly_projections",
                    format!(
                        "year {} yield ratio {:.0}% dropped below the prior year",
                        proj.year,
                        proj.yield_ratio * 100.0
                    ),
                ));
                break;
            }
            prev_ratio = proj.yield_ratio;
        }

        // over-optimistic direction

        let (income_lo, income_hi) = cfg.income_ratio;
        if result.income_ratio > income_hi {
            notes.push(ValidationNote::new(
                Severity::Caution,
                "income_ratio",
                format!(
                    "income ratio {:.1}% above ceiling {:.0}%; costs may be under-estimated",
                    result.income_ratio * 100.0,
                    income_hi * 100.0
                ),
            ));
        }

        let (_, roi_hi) = cfg.roi_10year;
        if result.roi_10year > roi_hi {
            notes.push(ValidationNote::new(
                Severity::Caution,
                "roi_10year",
                format!(
                    "10-year ROI {:.1} above ceiling {:.1}; projection looks optimistic",
                    result.roi_10year, roi_hi
                ),
            ));
        }

        if result.break_even_year < cfg.break_even_year_min {
            notes.push(ValidationNote::new(
                Severity::Caution,
                "break_even_year",
                format!(
                    "break-even in year {} is inside the unproductive sapling years ({})",
                    result.break_even_year, cfg.break_even_year_min
                ),
            ));
        }

        let (yield_lo, yield_hi) = cfg.yield_per_10a_range;
        if result.yield_per_10a < yield_lo || result.yield_per_10a > yield_hi {
            notes.push(ValidationNote::new(
                Severity::Caution,
                "yield_per_10a",
                format!(
                    "yield {:.0} kg/10a outside plausible range {:.0}-{:.0}",
                    result.yield_per_10a, yield_lo, yield_hi
                ),
            ));
        }

        let (price_lo, price_hi) = cfg.price_per_kg_range;
        if result.price_per_kg < price_lo || result.price_per_kg > price_hi {
            notes.push(ValidationNote::new(
                Severity::Caution,
                "price_per_kg",
                format!(
                    "price {:.0} KRW/kg outside plausible range {:.0}-{:.0}",
                    result.price_per_kg, price_lo, price_hi
                ),
            ));
        }

        // under-pessimistic direction

        if result.income_ratio < income_lo && result.annual_revenue > 0 {
            notes.push(ValidationNote::new(
                Severity::Caution,
                "income_ratio",
                format!(
                    "income ratio {:.1}% below floor {:.0}%; costs may be over-estimated",
                    result.income_ratio * 100.0,
                    income_lo * 100.0
                ),
            ));
        }

        if result.roi_10year < cfg.pessimistic_roi_threshold {
            notes.push(ValidationNote::new(
                Severity::Warning,
                "roi_10year",
                format!(
                    "10-year ROI {:.1} below {:.1}; projection looks under-estimated",
                    result.roi_10year, cfg.pessimistic_roi_threshold
                ),
            ));
        }

        if result.break_even_year > cfg.break_even_year_max {
            notes.push(ValidationNote::new(
                Severity::Warning,
                "break_even_year",
                format!(
                    "break-even in year {} beyond {} years; projection looks pessimistic",
                    result.break_even_year, cfg.break_even_year_max
                ),
            ));
        }

        notes
    }

    /// Propose a corrected request from the caution notes, or `None` when
    /// nothing warrants a re-run. Corrections are conservative: inflated
    /// results shrink, starved results get a bounded boost, out-of-range
    /// inputs clamp to the nearest bound.
    pub fn suggest_refinement(
        &self,
        req: &SimulationRequest,
        result: &SimulationResult,
        notes: &[ValidationNote],
    ) -> Option<SimulationRequest> {
        let caution_fields: Vec<&str> = notes
            .iter()
            .filter(|n| n.severity == Severity::Caution)
            .map(|n| n.field.as_str())
            .collect();
        if caution_fields.is_empty() {
            return None;
        }

        let cfg = self.config.read().clone();
        let mut adjusted = req.clone();
        let mut adjusted_any = false;
        let current_yield = req.yield_per_10a.unwrap_or(result.yield_per_10a);

        if caution_fields.contains(&"roi_10year") && result.roi_10year > cfg.roi_10year.1 {
            adjusted.yield_per_10a = Some(current_yield * 0.90);
            adjusted_any = true;
        }

        if caution_fields.contains(&"income_ratio") {
            if result.income_ratio > cfg.income_ratio.1 {
                adjusted.yield_per_10a = Some(current_yield * 0.90);
                adjusted_any = true;
            } else if result.income_ratio < cfg.income_ratio.0 {
                adjusted.yield_per_10a = Some(current_yield * cfg.yield_boost_factor);
                adjusted_any = true;
                info!(
                    boost = cfg.yield_boost_factor,
                    "under-estimation correction: yield boosted"
                );
            }
        }

        if caution_fields.contains(&"price_per_kg") {
            let (lo, hi) = cfg.price_per_kg_range;
            let current = req.price_per_kg.unwrap_or(result.price_per_kg);
            adjusted.price_per_kg = Some(current.clamp(lo, hi));
            adjusted_any = true;
        }

        if caution_fields.contains(&"yield_per_10a") {
            let (lo, hi) = cfg.yield_per_10a_range;
            let base = adjusted.yield_per_10a.unwrap_or(current_yield);
            adjusted.yield_per_10a = Some(base.clamp(lo, hi));
            adjusted_any = true;
        }

        adjusted_any.then_some(adjusted)
    }

    /// Log a validation pass to the durable outcome log and feed the
    /// range-table learner.
    pub fn record_outcome(&self, notes: &[ValidationNote], refined: bool) {
        let outcome = ValidatorOutcome {
            timestamp: Utc::now().timestamp_millis(),
            note_count: notes.len(),
            refined,
            severities: notes.iter().map(|n| n.severity).collect(),
            fields: notes.iter().map(|n| n.field.clone()).collect(),
        };
        if let Err(e) = append_record(self.outcome_log.as_ref(), &outcome) {
            warn!(error = %e, "failed to append validator outcome, continuing");
        }

        let mut learner = self.learner.lock();
        learner.record(refined);
        learner.maybe_tune();

        // a persistently near-total refinement rate means the table, not
        // the simulator, is the problem: relax the income band
        if learner.sample_count() >= 20 && learner.window_rate() > 0.8 {
            let step = 0.05 * learner.scale;
            let mut cfg = self.config.write();
            cfg.income_ratio = (cfg.income_ratio.0 - step, cfg.income_ratio.1 + step);
            info!(
                rate = learner.window_rate(),
                lo = cfg.income_ratio.0,
                hi = cfg.income_ratio.1,
                "refinement rate persistently high, income band relaxed"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pomona_common::storage::JsonlFileLog;
    use pomona_common::{AppleGrade, GradeShare, PriceSource};

    fn validator() -> SimulationValidator {
        let path = std::env::temp_dir().join(format!(
            "pomona-validator-{}/outcomes.jsonl",
            uuid::Uuid::new_v4()
        ));
        SimulationValidator::new(Arc::new(JsonlFileLog::new(path).unwrap()))
    }

    fn plausible_result() -> SimulationResult {
        SimulationResult {
            variety: "fuji".to_string(),
            area_pyeong: 1000.0,
            area_m2: 3305.8,
            area_10a: 3.3058,
            total_trees: 160,
            yield_per_10a: 2000.0,
            price_per_kg: 5500.0,
            price_source: PriceSource::ScenarioDefault,
            grade_distribution: vec![
                GradeShare { grade: AppleGrade::Premium, ratio: 0.15, price_multiplier: 1.0 },
                GradeShare { grade: AppleGrade::Excellent, ratio: 0.35, price_multiplier: 0.8 },
                GradeShare { grade: AppleGrade::Standard, ratio: 0.35, price_multiplier: 0.55 },
                GradeShare { grade: AppleGrade::Substandard, ratio: 0.15, price_multiplier: 0.25 },
            ],
            annual_revenue: 19_000_000,
            annual_cost: 10_000_000,
            annual_profit: 9_000_000,
            income_ratio: 0.47,
            cost_breakdown: Vec::new(),
            yearly_projections: Vec::new(),
            break_even_year: 9,
            roi_10year: 1.5,
            initial_investment: 6_000_000,
            region_adjustment: None,
            validation_notes: Vec::new(),
            refined: false,
            analytics_context: None,
        }
    }

    #[test]
    fn test_plausible_result_passes_clean() {
        let v = validator();
        assert!(v.validate(&plausible_result()).is_empty());
    }

    #[test]
    fn test_over_optimistic_roi_flagged_and_refined() {
        let v = validator();
        let mut result = plausible_result();
        result.roi_10year = 8.5;
        let notes = v.validate(&result);
        assert!(notes
            .iter()
            .any(|n| n.field == "roi_10year" && n.severity == Severity::Caution));

        let req = SimulationRequest::new("fuji", 1000.0);
        let refined = v.suggest_refinement(&req, &result, &notes).unwrap();
        assert!((refined.yield_per_10a.unwrap() - 1800.0).abs() < 1e-9);
    }

    #[test]
    fn test_price_out_of_range_clamped() {
        let v = validator();
        let mut result = plausible_result();
        result.price_per_kg = 20_000.0;
        let notes = v.validate(&result);
        assert!(notes.iter().any(|n| n.field == "price_per_kg"));

        let req = SimulationRequest::new("fuji", 1000.0).with_price(20_000.0);
        let refined = v.suggest_refinement(&req, &result, &notes).unwrap();
        assert_eq!(refined.price_per_kg, Some(15_000.0));
    }

    #[test]
    fn test_under_pessimistic_income_boosted() {
        let v = validator();
        let mut result = plausible_result();
        result.income_ratio = 0.05;
        let notes = v.validate(&result);
        let req = SimulationRequest::new("fuji", 1000.0);
        let refined = v.suggest_refinement(&req, &result, &notes).unwrap();
        assert!((refined.yield_per_10a.unwrap() - 2200.0).abs() < 1e-9);
    }

    #[test]
    fn test_identity_violation_is_warning_not_caution() {
        let v = validator();
        let mut result = plausible_result();
        result.annual_profit += 1;
        let notes = v.validate(&result);
        assert!(notes
            .iter()
            .any(|n| n.field == "annual_profit" && n.severity == Severity::Warning));
        // warnings alone never trigger refinement
        let req = SimulationRequest::new("fuji", 1000.0);
        assert!(v.suggest_refinement(&req, &result, &notes).is_none());
    }

    #[test]
    fn test_break_even_bounds_both_directions() {
        let v = validator();
        let mut early = plausible_result();
        early.break_even_year = 2;
        assert!(v
            .validate(&early)
            .iter()
            .any(|n| n.field == "break_even_year" && n.severity == Severity::Caution));

        let mut late = plausible_result();
        late.break_even_year = 18;
        assert!(v
            .validate(&late)
            .iter()
            .any(|n| n.field == "break_even_year" && n.severity == Severity::Warning));
    }

    #[test]
    fn test_outcomes_logged() {
        let path = std::env::temp_dir().join(format!(
            "pomona-validator-{}/outcomes.jsonl",
            uuid::Uuid::new_v4()
        ));
        let log = Arc::new(JsonlFileLog::new(&path).unwrap());
        let v = SimulationValidator::new(log.clone());
        v.record_outcome(&[], false);
        v.record_outcome(
            &[ValidationNote::new(Severity::Caution, "roi_10year", "x")],
            true,
        );
        let records = log.read_all();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1]["refined"], true);
    }

    #[test]
    fn test_persistent_refinement_relaxes_ranges() {
        let v = validator();
        let before = v.config().income_ratio;
        for _ in 0..25 {
            v.record_outcome(
                &[ValidationNote::new(Severity::Caution, "income_ratio", "x")],
                true,
            );
        }
        let after = v.config().income_ratio;
        assert!(after.0 < before.0);
        assert!(after.1 > before.1);
    }
}
