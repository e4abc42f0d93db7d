//! Feature flag service
//!
//! Flags gate optional behaviors (self-refinement, grade adjustment,
//! anomaly consumption). Defaults are compiled in; overrides live in a
//! single document read at construction and rewritten on toggle, so a flag
//! survives restarts without a redeploy. The service is constructed once at
//! process start and injected wherever a gate is needed.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::storage::{read_doc, replace_doc, DocumentStore};

const FLAGS_DOC_KEY: &str = "flags";

/// One feature flag definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlagEntry {
    pub enabled: bool,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub since: String,
}

fn defaults() -> BTreeMap<String, FlagEntry> {
    let mut flags = BTreeMap::new();
    let mut add = |name: &str, enabled: bool, description: &str, since: &str| {
        flags.insert(
            name.to_string(),
            FlagEntry {
                enabled,
                description: description.to_string(),
                since: since.to_string(),
            },
        );
    };

    add(
        "simulation_self_refine",
        true,
        "Automatic validation + single refinement pass on simulation results",
        "0.1.0",
    );
    add(
        "simulation_grade_adjustment",
        true,
        "Region grade based yield and grade-ratio adjustment",
        "0.1.0",
    );
    add(
        "simulation_feedback",
        true,
        "User feedback collection on simulation results",
        "0.1.0",
    );
    add(
        "simulation_analytics_context",
        true,
        "Comparison context from accumulated run history",
        "0.1.0",
    );
    add(
        "multi_scenario_compare",
        true,
        "Optimistic/neutral/pessimistic scenario comparison",
        "0.1.0",
    );
    add(
        "anomaly_detection",
        true,
        "Price and weather anomaly alerts",
        "0.1.0",
    );
    add(
        "evolution_anomaly_consumption",
        true,
        "Evolution engine consumes anomaly alerts for parameter adjustment",
        "0.1.0",
    );
    flags
}

/// Runtime feature flag manager backed by a document store
pub struct FeatureFlags {
    store: Arc<dyn DocumentStore>,
    flags: RwLock<BTreeMap<String, FlagEntry>>,
}

impl FeatureFlags {
    /// Build from defaults merged with any persisted overrides.
    pub fn load(store: Arc<dyn DocumentStore>) -> Self {
        let mut flags = defaults();
        if let Some(overrides) = read_doc::<BTreeMap<String, FlagEntry>>(store.as_ref(), FLAGS_DOC_KEY)
        {
            for (name, entry) in overrides {
                flags.insert(name, entry);
            }
        }
        Self {
            store,
            flags: RwLock::new(flags),
        }
    }

    /// Whether a flag is enabled. Unknown flags are disabled.
    pub fn is_enabled(&self, flag: &str) -> bool {
        self.flags
            .read()
            .get(flag)
            .map(|f| f.enabled)
            .unwrap_or(false)
    }

    /// Toggle a flag at runtime and persist the full set.
    pub fn set(&self, flag: &str, enabled: bool) {
        let snapshot = {
            let mut flags = self.flags.write();
            flags
                .entry(flag.to_string())
                .and_modify(|f| f.enabled = enabled)
                .or_insert_with(|| FlagEntry {
                    enabled,
                    description: String::new(),
                    since: "custom".to_string(),
                });
            flags.clone()
        };
        if let Err(e) = replace_doc(self.store.as_ref(), FLAGS_DOC_KEY, &snapshot) {
            warn!(flag, error = %e, "failed to persist flag overrides, in-memory value stands");
        }
        info!(flag, enabled, "feature flag changed");
    }

    /// Flag name to enabled map
    pub fn summary(&self) -> BTreeMap<String, bool> {
        self.flags
            .read()
            .iter()
            .map(|(k, v)| (k.clone(), v.enabled))
            .collect()
    }

    /// Full flag table
    pub fn all(&self) -> BTreeMap<String, FlagEntry> {
        self.flags.read().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::JsonFileStore;

    fn store() -> Arc<dyn DocumentStore> {
        let dir = std::env::temp_dir().join(format!("pomona-flags-{}", uuid::Uuid::new_v4()));
        Arc::new(JsonFileStore::new(dir).unwrap())
    }

    #[test]
    fn test_defaults_enabled() {
        let flags = FeatureFlags::load(store());
        assert!(flags.is_enabled("simulation_self_refine"));
        assert!(flags.is_enabled("simulation_grade_adjustment"));
        assert!(!flags.is_enabled("no_such_flag"));
    }

    #[test]
    fn test_toggle_persists() {
        let store = store();
        let flags = FeatureFlags::load(store.clone());
        flags.set("simulation_self_refine", false);

        let reloaded = FeatureFlags::load(store);
        assert!(!reloaded.is_enabled("simulation_self_refine"));
        // untouched flags keep their defaults
        assert!(reloaded.is_enabled("anomaly_detection"));
    }
}
