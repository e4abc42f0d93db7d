//! # Pomona Evolve
//!
//! The self-tuning side of the platform: an evolution engine that adjusts
//! the profit simulator's correction multipliers from accumulated feedback,
//! validator outcomes, and anomaly alerts, with full rollback; and the
//! rule-based anomaly detector that supplies one of those signals.
//!
//! ## Control Loop
//!
//! ```text
//! simulator runs ──> validator outcomes ─┐
//! user feedback ─────────────────────────┼──> EvolutionEngine.evolve()
//! anomaly alerts ────────────────────────┘         │
//!        ▲                                         │ modifier map
//!        └──── price/weather observations          ▼
//!                                    simulator reads modifiers
//! ```
//!
//! The engine is the map's only writer; `evolve`/`rollback` serialize under
//! its write lock while simulator reads are cheap snapshot reads.

pub mod anomaly;
pub mod engine;

pub use anomaly::{AnomalyDetector, AnomalyStats};
pub use engine::{
    Adjustment, EvolutionEngine, EvolutionReport, EvolutionSignals, EvolutionState,
    EvolutionStatus, ModifierSnapshot, RollbackReport,
};
