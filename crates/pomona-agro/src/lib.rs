//! # Pomona Agro
//!
//! Agronomic computation for the Pomona platform: climate normals and
//! synthetic daily series, growing-degree-day phenology, climate-based site
//! grading, orchard layout design, and the seasonal forecast engine.
//!
//! ## Data Flow
//!
//! ```text
//! ClimateService ──> phenology (GDD, bloom, stress aggregates)
//!       │                   │
//!       ├──> OrchardGrader  └──> ForecastEngine
//!       │        (S/A/B/C)          (monthly scores, risks, regression)
//!       │
//! designer::yield_per_10a  — the yield-per-area source of truth,
//!                            shared with the profit simulator
//! ```
//!
//! Every entry point honors the fallback contract: cache misses fall back
//! to deterministic synthesis, unknown regions to the zero-offset normals,
//! and a missing regression model to an absent prediction. Nothing here
//! fails a request because a live feed is unavailable.

pub mod climate;
pub mod designer;
pub mod forecast;
pub mod grading;
pub mod phenology;

pub use climate::{region_name, ClimateService, ClimateSource, REGIONS};
pub use designer::{
    design, equipment, resolve_spacing, rootstock, variety_spacing, variety_yield,
    yield_per_10a, DesignRequest, DesignResponse, Equipment, Rootstock, Spacing, TreePosition,
};
pub use forecast::{
    AnnualForecast, BloomPrediction, ForecastEngine, GddProgress, MonthlyScore, OutlookLabel,
    OverallRisk, RiskLevel, TrainReport, TrainingSample, VarietyRisk, YieldModel,
    YieldPrediction, MIN_TRAINING_SAMPLES,
};
pub use grading::OrchardGrader;
pub use phenology::{
    accumulated_gdd, august_night_temp, count_bloom_frost_days, count_frost_days,
    count_heat_stress_days, daily_gdd, extract_features, predict_bloom_date,
    predict_harvest_date, summer_rain_total, ClimateFeatures, BLOOM_FROST_WINDOW_DAYS,
    FEATURE_NAMES, FROST_THRESHOLD_C, HEAT_STRESS_MONTHS, HEAT_STRESS_THRESHOLD_C,
    SUMMER_MONTHS,
};
