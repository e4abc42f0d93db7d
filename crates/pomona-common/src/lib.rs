//! # Pomona Common
//!
//! Shared types, errors, and storage contracts for the Pomona orchard
//! platform.
//!
//! ## Core Types
//!
//! - [`DailyClimateRecord`] / [`ClimateNormal`]: normalized climate inputs
//! - [`PhenologyProfile`]: per-variety growth-stage reference data
//! - [`RegionGrade`] / [`GradeFactor`]: climate-based site grading
//! - [`SimulationRequest`] / [`SimulationResult`]: profit simulation I/O
//! - [`ValidatorOutcome`] / [`FeedbackStats`] / [`AnomalyAlert`]: signals
//!   consumed by the evolution engine
//!
//! ## Storage
//!
//! - [`storage::DocumentStore`]: read / atomically replace one document
//! - [`storage::AppendLog`]: append-only record log
//!
//! Both are narrow contracts; the provided implementations are plain files,
//! but any embedded store satisfying the contract can be substituted.

pub mod error;
pub mod flags;
pub mod storage;
pub mod types;

// Re-export commonly used types at crate root
pub use error::{PomonaError, Result, TrainingError};
pub use flags::{FeatureFlags, FlagEntry};
pub use types::{
    climate::{ClimateNormal, DailyClimateRecord},
    grading::{GradeFactor, OrchardGrade, RegionGrade},
    phenology::{phenology_profile, PhenologyProfile, PHENOLOGY_VARIETIES},
    records::{
        AnomalyAlert, AnomalyCategory, AnomalySeverity, FeedbackEntry, FeedbackRating,
        FeedbackStats, RunRecord, ValidatorOutcome, VarietyFeedback,
    },
    simulation::{
        AnalyticsContext, AppleGrade, CostCategory, CostLine, GradeShare, PriceSource,
        RegionAdjustment, ScenarioComparison, ScenarioOutcome, Severity, SimulationRequest,
        SimulationResult, ValidationNote, YearlyProjection,
    },
};

/// Pomona version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Square meters per pyeong
pub const PYEONG_TO_M2: f64 = 3.3058;

/// Base temperature for apple degree-day accumulation (°C)
pub const APPLE_BASE_TEMP_C: f64 = 5.0;

/// Fraction of the auction price retained by the grower after fees,
/// transport, and sorting
pub const FARM_GATE_RATIO: f64 = 0.82;

/// Default projection horizon in years
pub const DEFAULT_PROJECTION_YEARS: u32 = 10;
