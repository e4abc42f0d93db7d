//! Feedback-driven parameter evolution
//!
//! Consumes accumulated feedback stats, validator outcomes, and anomaly
//! alerts, diagnoses system-wide bias, and adjusts the correction
//! multipliers the profit simulator applies on future runs. State is
//! persisted after every cycle and survives restarts; every cycle keeps a
//! rollback snapshot.
//!
//! Writer discipline: `evolve` and `rollback` run inside the engine's write
//! lock and are the only writers of the modifier map. Simulator reads are
//! snapshot reads under the read lock.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use pomona_common::storage::{append_record, read_doc, replace_doc, AppendLog, DocumentStore};
use pomona_common::{
    AnomalyAlert, AnomalyCategory, AnomalySeverity, FeatureFlags, FeedbackStats,
    ValidatorOutcome,
};

const STATE_DOC_KEY: &str = "evolution_state";

/// History snapshots retained for rollback
const MAX_HISTORY: usize = 20;

/// Feedback inaccuracy rate above which the system is considered biased
const FEEDBACK_ACTION_THRESHOLD: f64 = 0.3;

/// Validator refinement rate above which the system is considered biased
const REFINEMENT_ACTION_THRESHOLD: f64 = 0.4;

/// Modifier snapshot kept for rollback
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModifierSnapshot {
    pub generation: u64,
    pub modifiers: BTreeMap<String, f64>,
    /// Unix milliseconds
    pub timestamp: i64,
}

/// Persisted evolution state
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvolutionState {
    pub generation: u64,
    pub modifiers: BTreeMap<String, f64>,
    #[serde(default)]
    pub history: Vec<ModifierSnapshot>,
    #[serde(default)]
    pub total_evolutions: u64,
    /// Unix milliseconds of the last evolve/rollback
    #[serde(default)]
    pub last_evolved: Option<i64>,
}

/// Signals gathered by the caller for one evolution cycle
#[derive(Debug, Clone, Default)]
pub struct EvolutionSignals {
    pub feedback: Option<FeedbackStats>,
    /// Recent validator outcomes (typically the last 50)
    pub outcomes: Vec<ValidatorOutcome>,
    /// Recent anomaly alerts (typically the last 50)
    pub alerts: Vec<AnomalyAlert>,
}

/// One applied parameter adjustment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Adjustment {
    pub parameter: String,
    pub previous: f64,
    pub new: f64,
    pub reason: String,
}

/// Outcome of one evolution cycle
#[derive(Debug, Clone, Serialize)]
pub struct EvolutionReport {
    pub evolved: bool,
    pub generation: u64,
    pub reason: String,
    pub adjustments: Vec<Adjustment>,
}

/// Outcome of a rollback request
#[derive(Debug, Clone, Serialize)]
pub struct RollbackReport {
    pub rolled_back: bool,
    pub generation: u64,
    pub reason: String,
}

/// Engine status for the admin surface
#[derive(Debug, Clone, Serialize)]
pub struct EvolutionStatus {
    pub generation: u64,
    pub modifiers: BTreeMap<String, f64>,
    pub total_evolutions: u64,
    pub last_evolved: Option<i64>,
    pub can_rollback: bool,
}

/// Self-tuning parameter engine
pub struct EvolutionEngine {
    store: Arc<dyn DocumentStore>,
    event_log: Arc<dyn AppendLog>,
    flags: Arc<FeatureFlags>,
    state: RwLock<EvolutionState>,
}

impl EvolutionEngine {
    /// Load persisted state, tolerating a missing or corrupt snapshot
    /// (fresh start at generation 0).
    pub fn load(
        store: Arc<dyn DocumentStore>,
        event_log: Arc<dyn AppendLog>,
        flags: Arc<FeatureFlags>,
    ) -> Self {
        let state: EvolutionState =
            read_doc(store.as_ref(), STATE_DOC_KEY).unwrap_or_default();
        info!(
            generation = state.generation,
            modifiers = state.modifiers.len(),
            "evolution engine loaded"
        );
        Self {
            store,
            event_log,
            flags,
            state: RwLock::new(state),
        }
    }

    /// Read one correction multiplier (lock-free snapshot semantics for the
    /// simulator's hot path).
    pub fn modifier(&self, key: &str, default: f64) -> f64 {
        self.state.read().modifiers.get(key).copied().unwrap_or(default)
    }

    /// Clone of the full modifier map
    pub fn modifiers(&self) -> BTreeMap<String, f64> {
        self.state.read().modifiers.clone()
    }

    pub fn status(&self) -> EvolutionStatus {
        let state = self.state.read();
        EvolutionStatus {
            generation: state.generation,
            modifiers: state.modifiers.clone(),
            total_evolutions: state.total_evolutions,
            last_evolved: state.last_evolved,
            can_rollback: !state.history.is_empty(),
        }
    }

    /// Run one evolution cycle over the gathered signals.
    #[instrument(skip(self, signals))]
    pub fn evolve(&self, signals: &EvolutionSignals) -> EvolutionReport {
        let mut state = self.state.write();

        let diagnosis = diagnose(signals);
        if !diagnosis.actionable {
            return EvolutionReport {
                evolved: false,
                generation: state.generation,
                reason: diagnosis.reason,
                adjustments: Vec::new(),
            };
        }

        let mut adjustments = compute_adjustments(&state.modifiers, &diagnosis);
        if self.flags.is_enabled("evolution_anomaly_consumption") {
            adjustments.extend(consume_anomalies(&state.modifiers, &signals.alerts));
        }

        // snapshot the pre-adjustment map for rollback
        let snapshot = ModifierSnapshot {
            generation: state.generation,
            modifiers: state.modifiers.clone(),
            timestamp: Utc::now().timestamp_millis(),
        };
        state.history.push(snapshot);
        if state.history.len() > MAX_HISTORY {
            let excess = state.history.len() - MAX_HISTORY;
            state.history.drain(..excess);
        }

        for adj in &adjustments {
            state.modifiers.insert(adj.parameter.clone(), adj.new);
        }
        state.generation += 1;
        state.total_evolutions += 1;
        state.last_evolved = Some(Utc::now().timestamp_millis());

        self.persist(&state);
        let report = EvolutionReport {
            evolved: true,
            generation: state.generation,
            reason: diagnosis.reason,
            adjustments,
        };
        if let Err(e) = append_record(self.event_log.as_ref(), &report) {
            warn!(error = %e, "failed to append evolution event, continuing");
        }
        info!(
            generation = report.generation,
            adjustments = report.adjustments.len(),
            "evolution cycle applied"
        );
        report
    }

    /// Restore the most recent snapshot. A no-op when no history exists.
    #[instrument(skip(self))]
    pub fn rollback(&self) -> RollbackReport {
        let mut state = self.state.write();
        let Some(snapshot) = state.history.pop() else {
            return RollbackReport {
                rolled_back: false,
                generation: state.generation,
                reason: "nothing to roll back".to_string(),
            };
        };
        state.modifiers = snapshot.modifiers;
        state.generation = state.generation.saturating_sub(1);
        state.last_evolved = Some(Utc::now().timestamp_millis());
        self.persist(&state);
        info!(generation = state.generation, "evolution rolled back");
        RollbackReport {
            rolled_back: true,
            generation: state.generation,
            reason: "restored previous modifier snapshot".to_string(),
        }
    }

    fn persist(&self, state: &EvolutionState) {
        if let Err(e) = replace_doc(self.store.as_ref(), STATE_DOC_KEY, state) {
            warn!(error = %e, "failed to persist evolution state, in-memory state stands");
        }
    }
}

struct Diagnosis {
    actionable: bool,
    reason: String,
    /// variety -> inaccuracy rate, for varieties with enough feedback
    variety_issues: BTreeMap<String, f64>,
    /// field name -> occurrences across recent outcomes
    field_frequency: BTreeMap<String, u64>,
}

fn diagnose(signals: &EvolutionSignals) -> Diagnosis {
    let feedback_total = signals.feedback.as_ref().map(|f| f.total).unwrap_or(0);
    let has_feedback = feedback_total > 0;
    let has_outcomes = !signals.outcomes.is_empty();

    if !has_feedback && !has_outcomes {
        return Diagnosis {
            actionable: false,
            reason: "insufficient data: no feedback or validation history".to_string(),
            variety_issues: BTreeMap::new(),
            field_frequency: BTreeMap::new(),
        };
    }

    let inaccuracy_rate = signals
        .feedback
        .as_ref()
        .filter(|f| f.total > 0)
        .map(|f| 1.0 - f.helpful_rate)
        .unwrap_or(0.0);

    let mut variety_issues = BTreeMap::new();
    if let Some(feedback) = &signals.feedback {
        for (variety, tally) in &feedback.variety_breakdown {
            if tally.total >= 3 {
                variety_issues.insert(variety.clone(), tally.inaccuracy_rate());
            }
        }
    }

    let refined = signals.outcomes.iter().filter(|o| o.refined).count();
    let adjustment_rate = if signals.outcomes.is_empty() {
        0.0
    } else {
        refined as f64 / signals.outcomes.len() as f64
    };

    let mut field_frequency: BTreeMap<String, u64> = BTreeMap::new();
    for outcome in &signals.outcomes {
        for field in &outcome.fields {
            *field_frequency.entry(field.clone()).or_insert(0) += 1;
        }
    }

    let actionable = inaccuracy_rate > FEEDBACK_ACTION_THRESHOLD
        || adjustment_rate > REFINEMENT_ACTION_THRESHOLD;
    let reason = if actionable {
        format!(
            "bias detected: inaccuracy rate {:.0}%, refinement rate {:.0}%",
            inaccuracy_rate * 100.0,
            adjustment_rate * 100.0
        )
    } else {
        "current parameters within tolerance".to_string()
    };

    Diagnosis {
        actionable,
        reason,
        variety_issues,
        field_frequency,
    }
}

fn compute_adjustments(
    current: &BTreeMap<String, f64>,
    diagnosis: &Diagnosis,
) -> Vec<Adjustment> {
    let mut adjustments = Vec::new();

    // per-variety yield multipliers shrink with that variety's inaccuracy
    for (variety, inaccuracy) in &diagnosis.variety_issues {
        if *inaccuracy > FEEDBACK_ACTION_THRESHOLD {
            let key = format!("yield_modifier_{}", variety);
            let prev = current.get(&key).copied().unwrap_or(1.0);
            let new = (prev * (1.0 - inaccuracy * 0.1)).clamp(0.7, 1.3);
            adjustments.push(Adjustment {
                parameter: key,
                previous: prev,
                new,
                reason: format!("{} rated inaccurate {:.0}% of the time", variety, inaccuracy * 100.0),
            });
        }
    }

    // chronically triggered validator fields nudge the global multipliers
    let income_hits = diagnosis.field_frequency.get("income_ratio").copied().unwrap_or(0);
    if income_hits > 10 {
        let prev = current.get("cost_modifier_global").copied().unwrap_or(1.0);
        let new = (prev * 1.03).min(1.5);
        adjustments.push(Adjustment {
            parameter: "cost_modifier_global".to_string(),
            previous: prev,
            new,
            reason: format!("income ratio warnings {} times in window", income_hits),
        });
    }

    let yield_hits = diagnosis
        .field_frequency
        .get("yield_per_10a")
        .copied()
        .unwrap_or(0);
    if yield_hits > 10 {
        let prev = current.get("yield_modifier_global").copied().unwrap_or(1.0);
        let new = (prev * 0.97).max(0.7);
        adjustments.push(Adjustment {
            parameter: "yield_modifier_global".to_string(),
            previous: prev,
            new,
            reason: format!("yield range warnings {} times in window", yield_hits),
        });
    }

    adjustments
}

fn consume_anomalies(
    current: &BTreeMap<String, f64>,
    alerts: &[AnomalyAlert],
) -> Vec<Adjustment> {
    let mut adjustments = Vec::new();
    if alerts.is_empty() {
        return adjustments;
    }

    let price_alerts: Vec<&AnomalyAlert> = alerts
        .iter()
        .filter(|a| a.category == AnomalyCategory::Price)
        .collect();
    if !price_alerts.is_empty() {
        let drops = price_alerts
            .iter()
            .filter(|a| a.price_change_pct().unwrap_or(0.0) < 0.0)
            .count();
        if (drops as f64) > price_alerts.len() as f64 * 0.6 {
            let prev = current.get("farm_gate_ratio").copied().unwrap_or(0.82);
            let new = (prev - 0.02).max(0.70);
            adjustments.push(Adjustment {
                parameter: "farm_gate_ratio".to_string(),
                previous: prev,
                new,
                reason: format!("price drop alerts {}/{}", drops, price_alerts.len()),
            });
        }
    }

    let severe_weather = alerts
        .iter()
        .filter(|a| {
            a.category == AnomalyCategory::Weather && a.severity == AnomalySeverity::Critical
        })
        .count();
    if severe_weather >= 2 {
        let prev = current.get("yield_modifier_global").copied().unwrap_or(1.0);
        let new = (prev * 0.97).max(0.7);
        adjustments.push(Adjustment {
            parameter: "yield_modifier_global".to_string(),
            previous: prev,
            new,
            reason: format!("{} critical weather alerts, conservative yield", severe_weather),
        });
    }

    adjustments
}
