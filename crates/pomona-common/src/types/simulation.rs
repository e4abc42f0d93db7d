//! Profit simulation request/response types
//!
//! `SimulationRequest` carries the caller's inputs; every optional field is
//! resolved through a fixed priority chain inside the simulator (explicit
//! value, then live/derived source, then scenario default). `SimulationResult`
//! is ephemeral: computed per request, never persisted as an entity, though
//! selected outputs are appended to the run-history log for analytics.

use serde::{Deserialize, Serialize};

/// Auction grade of harvested fruit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppleGrade {
    Premium,
    Excellent,
    Standard,
    Substandard,
}

/// Cost line-item category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CostCategory {
    Materials,
    Labor,
    Fixed,
}

/// Where the resolved price-per-kg came from, reported for observability
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceSource {
    /// Caller supplied an explicit price
    UserInput,
    /// Live cached auction quote
    KamisLive,
    /// Hardcoded per-variety scenario default
    ScenarioDefault,
}

/// Simulation input parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationRequest {
    /// Variety id (unknown ids fall back to the fuji scenario)
    pub variety: String,
    /// Orchard area in pyeong (1 pyeong = 3.3058 m²); must be positive
    pub area_pyeong: f64,
    /// Explicit tree count override
    #[serde(default)]
    pub total_trees: Option<u32>,
    /// Explicit yield override (kg per 10a)
    #[serde(default)]
    pub yield_per_10a: Option<f64>,
    /// Explicit auction price override (KRW per kg)
    #[serde(default)]
    pub price_per_kg: Option<f64>,
    /// Rootstock id (M9, M26, MM106, seedling)
    #[serde(default)]
    pub rootstock: Option<String>,
    /// Region id for grade-based adjustment
    #[serde(default)]
    pub region: Option<String>,
    /// Projection horizon in years
    #[serde(default = "default_projection_years")]
    pub projection_years: u32,
}

fn default_projection_years() -> u32 {
    10
}

impl SimulationRequest {
    pub fn new(variety: impl Into<String>, area_pyeong: f64) -> Self {
        Self {
            variety: variety.into(),
            area_pyeong,
            total_trees: None,
            yield_per_10a: None,
            price_per_kg: None,
            rootstock: None,
            region: None,
            projection_years: default_projection_years(),
        }
    }

    pub fn with_yield(mut self, yield_per_10a: f64) -> Self {
        self.yield_per_10a = Some(yield_per_10a);
        self
    }

    pub fn with_price(mut self, price_per_kg: f64) -> Self {
        self.price_per_kg = Some(price_per_kg);
        self
    }

    pub fn with_rootstock(mut self, rootstock: impl Into<String>) -> Self {
        self.rootstock = Some(rootstock.into());
        self
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn with_projection_years(mut self, years: u32) -> Self {
        self.projection_years = years;
        self
    }
}

/// Share of the harvest expected at one auction grade
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradeShare {
    pub grade: AppleGrade,
    /// Fraction of total yield; the four shares sum to 1.0
    pub ratio: f64,
    /// Price relative to the premium grade
    pub price_multiplier: f64,
}

/// One itemized cost line, scaled to the simulated area
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostLine {
    pub category: CostCategory,
    pub name: String,
    /// Annual amount in KRW
    pub amount: i64,
}

/// One projected year of the orchard's life
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearlyProjection {
    /// Year number, 1-based
    pub year: u32,
    /// Fraction of mature yield reached this year
    pub yield_ratio: f64,
    /// Harvest for the year (kg)
    pub yield_kg: f64,
    /// Revenue in KRW
    pub revenue: i64,
    /// Cost in KRW
    pub cost: i64,
    /// Profit in KRW (revenue - cost, exact)
    pub profit: i64,
}

/// Severity of a validation finding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
    /// The only severity eligible to trigger automatic refinement
    Caution,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Caution => "caution",
        };
        write!(f, "{}", s)
    }
}

/// Structured plausibility finding attached to a simulation result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationNote {
    pub severity: Severity,
    /// Result field the finding refers to
    pub field: String,
    pub message: String,
}

impl ValidationNote {
    pub fn new(severity: Severity, field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity,
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Region-grade adjustment applied to a simulation, if any
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionAdjustment {
    pub region_id: String,
    pub grade: super::grading::OrchardGrade,
    /// Multiplier applied to yield_per_10a
    pub yield_factor: f64,
    /// Shift applied to the premium-grade ratio (mirrored on substandard)
    pub premium_shift: f64,
}

/// Comparison context injected from accumulated run history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsContext {
    /// Total recorded runs across all varieties
    pub total_runs: u64,
    /// Recorded runs for this variety
    pub variety_runs: u64,
    /// Mean 10-year ROI over recent runs
    pub avg_roi_recent: f64,
    /// This run's ROI minus the recent average
    pub roi_vs_average: f64,
}

/// Full profit simulation output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationResult {
    pub variety: String,
    pub area_pyeong: f64,
    pub area_m2: f64,
    pub area_10a: f64,
    pub total_trees: u32,
    /// Resolved yield (kg per 10a) after all adjustments
    pub yield_per_10a: f64,
    /// Resolved auction price (KRW per kg)
    pub price_per_kg: f64,
    pub price_source: PriceSource,
    pub grade_distribution: Vec<GradeShare>,
    pub annual_revenue: i64,
    pub annual_cost: i64,
    pub annual_profit: i64,
    /// annual_profit / annual_revenue (0 when revenue is not positive)
    pub income_ratio: f64,
    pub cost_breakdown: Vec<CostLine>,
    pub yearly_projections: Vec<YearlyProjection>,
    /// First year cumulative profit turns non-negative; the projection
    /// horizon if never reached within it
    pub break_even_year: u32,
    pub roi_10year: f64,
    /// Seedlings plus per-area infrastructure, in KRW
    pub initial_investment: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region_adjustment: Option<RegionAdjustment>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub validation_notes: Vec<ValidationNote>,
    /// Whether the self-refinement pass re-ran the simulation
    #[serde(default)]
    pub refined: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analytics_context: Option<AnalyticsContext>,
}

/// One leg of a multi-scenario comparison
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioOutcome {
    /// "optimistic" | "neutral" | "pessimistic"
    pub scenario: String,
    pub yield_per_10a: f64,
    pub price_per_kg: f64,
    pub annual_revenue: i64,
    pub annual_cost: i64,
    pub annual_profit: i64,
    pub income_ratio: f64,
    pub break_even_year: u32,
    pub roi_10year: f64,
    /// Sum of projected yearly profits over the horizon
    pub total_profit: i64,
}

/// Three-scenario comparison with a synthesized recommendation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioComparison {
    pub variety: String,
    pub area_pyeong: f64,
    pub scenarios: Vec<ScenarioOutcome>,
    pub recommendation: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_builder() {
        let req = SimulationRequest::new("fuji", 1000.0)
            .with_price(7000.0)
            .with_region("yeongju");
        assert_eq!(req.projection_years, 10);
        assert_eq!(req.price_per_kg, Some(7000.0));
        assert!(req.yield_per_10a.is_none());
    }

    #[test]
    fn test_price_source_wire_format() {
        let s = serde_json::to_string(&PriceSource::KamisLive).unwrap();
        assert_eq!(s, "\"kamis_live\"");
        let s = serde_json::to_string(&PriceSource::UserInput).unwrap();
        assert_eq!(s, "\"user_input\"");
    }

    #[test]
    fn test_request_defaults_from_json() {
        let req: SimulationRequest =
            serde_json::from_str(r#"{"variety":"fuji","area_pyeong":500}"#).unwrap();
        assert_eq!(req.projection_years, 10);
        assert!(req.region.is_none());
    }
}
