//! # Pomona Sim
//!
//! The economic core of the platform: the profit simulator and the
//! self-correcting loop wrapped around it.
//!
//! ## Request Path
//!
//! ```text
//! SimulationRequest
//!   │  resolve yield (user > designer SSOT > scenario)
//!   │  resolve price (user > auction cache > scenario)
//!   │  region grade adjustment (flag-gated, best effort)
//!   │  evolution modifiers (yield / cost / farm gate)
//!   ▼
//! simulate ──> validate ──caution?──> refine once ──> re-validate
//!   │                                                   │
//!   └──────────────── record run + outcome ◄────────────┘
//! ```
//!
//! Validator outcomes and user feedback accumulate durably and are later
//! consumed by the evolution engine, closing the loop.

pub mod analytics;
pub mod feedback;
pub mod price;
pub mod scenario;
pub mod simulator;
pub mod validator;

pub use analytics::{
    AnalyticsSnapshot, EnrichmentSkipped, RunAnalytics, RunTrends, DEFAULT_MAX_RECORDS,
};
pub use feedback::FeedbackCollector;
pub use price::{PriceCache, PriceCacheStatus};
pub use scenario::{maturity_ratio, scenario_for, VarietyScenario, COST_ITEMS};
pub use simulator::{ProfitSimulator, RegionGradeSource};
pub use validator::{SimulationValidator, ValidationConfig};
