//! Cross-component event and outcome records
//!
//! These records are produced by one component and consumed by another
//! (validator outcomes and feedback stats feed the evolution engine; run
//! records feed analytics), so their shapes live here rather than with
//! either owner.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::simulation::Severity;

/// One simulation run, appended to the run-history log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    /// Unix milliseconds
    pub timestamp: i64,
    pub variety: String,
    pub area_pyeong: f64,
    pub total_trees: u32,
    pub projection_years: u32,
    pub annual_profit: i64,
    pub roi_10year: f64,
    pub break_even_year: u32,
    pub duration_ms: f64,
}

/// One validation pass, appended to the validator outcome log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidatorOutcome {
    /// Unix milliseconds
    pub timestamp: i64,
    pub note_count: usize,
    /// Whether the refinement pass re-ran the simulation
    pub refined: bool,
    pub severities: Vec<Severity>,
    /// Fields the notes referred to
    pub fields: Vec<String>,
}

/// User rating of a simulation result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackRating {
    Helpful,
    Inaccurate,
    NeedsDetail,
}

/// One submitted feedback entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackEntry {
    pub variety: String,
    pub area_pyeong: f64,
    pub rating: FeedbackRating,
    #[serde(default)]
    pub comment: String,
    /// Unix milliseconds
    pub timestamp: i64,
}

/// Per-variety feedback tally
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VarietyFeedback {
    pub helpful: u64,
    pub inaccurate: u64,
    pub needs_detail: u64,
    pub total: u64,
}

impl VarietyFeedback {
    /// Fraction of this variety's feedback rated inaccurate
    pub fn inaccuracy_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.inaccurate as f64 / self.total as f64
        }
    }
}

/// Aggregated feedback statistics, the evolution engine's feedback signal
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeedbackStats {
    pub total: u64,
    pub helpful_rate: f64,
    /// Comments from recent non-helpful entries
    pub recent_issues: Vec<String>,
    pub variety_breakdown: BTreeMap<String, VarietyFeedback>,
}

/// Anomaly alert category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyCategory {
    Price,
    Weather,
}

/// Anomaly alert severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalySeverity {
    Warning,
    Critical,
}

/// One detected anomaly, kept in a bounded ring and appended to a durable log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyAlert {
    /// Unix milliseconds
    pub timestamp: i64,
    pub category: AnomalyCategory,
    pub severity: AnomalySeverity,
    pub message: String,
    /// Category-specific payload (price change pct, temperature, ...)
    pub data: serde_json::Value,
}

impl AnomalyAlert {
    /// Day-over-day price change carried by a price alert, if present
    pub fn price_change_pct(&self) -> Option<f64> {
        self.data.get("change_pct").and_then(|v| v.as_f64())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inaccuracy_rate() {
        let vf = VarietyFeedback {
            helpful: 2,
            inaccurate: 3,
            needs_detail: 0,
            total: 5,
        };
        assert!((vf.inaccuracy_rate() - 0.6).abs() < 1e-9);
        assert_eq!(VarietyFeedback::default().inaccuracy_rate(), 0.0);
    }

    #[test]
    fn test_rating_wire_format() {
        let s = serde_json::to_string(&FeedbackRating::NeedsDetail).unwrap();
        assert_eq!(s, "\"needs_detail\"");
    }
}
