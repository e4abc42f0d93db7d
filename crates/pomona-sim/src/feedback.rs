//! Simulation feedback collection
//!
//! User ratings of simulation results, persisted as a single document.
//! The aggregated stats are one of the evolution engine's bias signals.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use parking_lot::Mutex;
use tracing::warn;

use pomona_common::storage::{read_doc, replace_doc, DocumentStore};
use pomona_common::{FeedbackEntry, FeedbackRating, FeedbackStats, VarietyFeedback};

const FEEDBACK_DOC_KEY: &str = "simulation_feedback";

/// Feedback collector backed by a document store
pub struct FeedbackCollector {
    store: Arc<dyn DocumentStore>,
    // serializes read-modify-write cycles on the backing document
    write_lock: Mutex<()>,
}

impl FeedbackCollector {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            write_lock: Mutex::new(()),
        }
    }

    fn load(&self) -> Vec<FeedbackEntry> {
        read_doc(self.store.as_ref(), FEEDBACK_DOC_KEY).unwrap_or_default()
    }

    /// Record one rating. Persistence failure is logged and swallowed; the
    /// entry is still returned to the caller.
    pub fn submit(
        &self,
        variety: &str,
        area_pyeong: f64,
        rating: FeedbackRating,
        comment: &str,
    ) -> FeedbackEntry {
        let entry = FeedbackEntry {
            variety: variety.to_string(),
            area_pyeong,
            rating,
            comment: comment.to_string(),
            timestamp: Utc::now().timestamp_millis(),
        };

        let _guard = self.write_lock.lock();
        let mut entries = self.load();
        entries.push(entry.clone());
        if let Err(e) = replace_doc(self.store.as_ref(), FEEDBACK_DOC_KEY, &entries) {
            warn!(error = %e, "failed to persist feedback, continuing");
        }
        entry
    }

    /// Aggregate statistics over all collected feedback.
    pub fn stats(&self) -> FeedbackStats {
        let entries = self.load();
        if entries.is_empty() {
            return FeedbackStats::default();
        }

        let total = entries.len() as u64;
        let helpful = entries
            .iter()
            .filter(|e| e.rating == FeedbackRating::Helpful)
            .count() as u64;

        let mut variety_breakdown: BTreeMap<String, VarietyFeedback> = BTreeMap::new();
        for entry in &entries {
            let tally = variety_breakdown.entry(entry.variety.clone()).or_default();
            match entry.rating {
                FeedbackRating::Helpful => tally.helpful += 1,
                FeedbackRating::Inaccurate => tally.inaccurate += 1,
                FeedbackRating::NeedsDetail => tally.needs_detail += 1,
            }
            tally.total += 1;
        }

        let recent_issues: Vec<String> = entries
            .iter()
            .rev()
            .take(10)
            .filter(|e| e.rating != FeedbackRating::Helpful && !e.comment.is_empty())
            .map(|e| e.comment.clone())
            .collect();

        FeedbackStats {
            total,
            helpful_rate: helpful as f64 / total as f64,
            recent_issues,
            variety_breakdown,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pomona_common::storage::JsonFileStore;

    fn collector() -> FeedbackCollector {
        let dir = std::env::temp_dir().join(format!("pomona-feedback-{}", uuid::Uuid::new_v4()));
        FeedbackCollector::new(Arc::new(JsonFileStore::new(dir).unwrap()))
    }

    #[test]
    fn test_empty_stats() {
        let stats = collector().stats();
        assert_eq!(stats.total, 0);
        assert_eq!(stats.helpful_rate, 0.0);
    }

    #[test]
    fn test_submit_and_aggregate() {
        let collector = collector();
        collector.submit("fuji", 1000.0, FeedbackRating::Helpful, "");
        collector.submit("fuji", 500.0, FeedbackRating::Inaccurate, "yield too high");
        collector.submit("hongro", 800.0, FeedbackRating::Helpful, "");

        let stats = collector.stats();
        assert_eq!(stats.total, 3);
        assert!((stats.helpful_rate - 2.0 / 3.0).abs() < 1e-9);
        assert_eq!(stats.recent_issues, vec!["yield too high".to_string()]);

        let fuji = &stats.variety_breakdown["fuji"];
        assert_eq!(fuji.total, 2);
        assert_eq!(fuji.inaccurate, 1);
        assert!((fuji.inaccuracy_rate() - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_feedback_survives_reload() {
        let dir = std::env::temp_dir().join(format!("pomona-feedback-{}", uuid::Uuid::new_v4()));
        let store: Arc<dyn DocumentStore> = Arc::new(JsonFileStore::new(&dir).unwrap());
        FeedbackCollector::new(store.clone()).submit(
            "gamhong",
            300.0,
            FeedbackRating::NeedsDetail,
            "want cost detail",
        );
        let stats = FeedbackCollector::new(store).stats();
        assert_eq!(stats.total, 1);
        assert_eq!(stats.variety_breakdown["gamhong"].needs_detail, 1);
    }
}
