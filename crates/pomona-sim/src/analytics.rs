//! Simulation run analytics
//!
//! An in-memory ring buffer of recent runs backed by an unbounded durable
//! log. The log is replayed at startup so restarts keep continuity; each
//! instance's ring is independent, the log is the merge point.

use std::collections::BTreeMap;
use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use tracing::{info, warn};

use pomona_common::storage::{append_record, read_last_records, AppendLog};
use pomona_common::{AnalyticsContext, RunRecord, SimulationResult};

/// Default ring-buffer capacity
pub const DEFAULT_MAX_RECORDS: usize = 500;

/// ROI delta treated as a trend rather than noise
const ROI_TREND_THRESHOLD: f64 = 0.1;

/// A best-effort enrichment that did not apply, with its named reason.
/// This is an expected outcome, not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrichmentSkipped {
    pub reason: &'static str,
}

impl std::fmt::Display for EnrichmentSkipped {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "enrichment skipped: {}", self.reason)
    }
}

#[derive(Default)]
struct AnalyticsState {
    records: VecDeque<RunRecord>,
    total_runs: u64,
    variety_counts: BTreeMap<String, u64>,
}

/// Aggregate snapshot of recorded runs
#[derive(Debug, Clone, Serialize)]
pub struct AnalyticsSnapshot {
    pub total_runs: u64,
    pub recent_runs: usize,
    pub variety_counts: BTreeMap<String, u64>,
    pub avg_area: f64,
    pub avg_roi: f64,
    pub avg_break_even: f64,
    pub avg_duration_ms: f64,
    pub most_popular_variety: String,
    pub largest_area: f64,
}

/// Trend summary over the recent window
#[derive(Debug, Clone, Serialize)]
pub struct RunTrends {
    pub status: String,
    pub total: u64,
    pub window: usize,
    pub avg_roi_recent: f64,
    pub avg_area_recent: f64,
    pub variety_distribution: BTreeMap<String, u64>,
    /// "up" | "down" | "stable" | "no_baseline"
    pub roi_trend: String,
    pub roi_change: f64,
    pub recommendations: Vec<String>,
}

/// Run-history analytics service
pub struct RunAnalytics {
    log: Arc<dyn AppendLog>,
    state: Mutex<AnalyticsState>,
    max_records: usize,
}

impl RunAnalytics {
    /// Replay the durable log into the ring buffer and start recording.
    pub fn load(log: Arc<dyn AppendLog>) -> Self {
        Self::with_capacity(log, DEFAULT_MAX_RECORDS)
    }

    pub fn with_capacity(log: Arc<dyn AppendLog>, max_records: usize) -> Self {
        let mut state = AnalyticsState::default();
        let replayed: Vec<RunRecord> = read_last_records(log.as_ref(), max_records);
        for record in replayed {
            *state
                .variety_counts
                .entry(record.variety.clone())
                .or_insert(0) += 1;
            state.records.push_back(record);
            state.total_runs += 1;
        }
        if state.total_runs > 0 {
            info!(restored = state.total_runs, "run history restored");
        }
        Self {
            log,
            state: Mutex::new(state),
            max_records,
        }
    }

    /// Record one run in memory and on the durable log. A failed append is
    /// logged and swallowed; the in-memory record stands.
    pub fn record_run(&self, record: RunRecord) {
        if let Err(e) = append_record(self.log.as_ref(), &record) {
            warn!(error = %e, "failed to persist run record, continuing");
        }
        let mut state = self.state.lock();
        *state
            .variety_counts
            .entry(record.variety.clone())
            .or_insert(0) += 1;
        state.records.push_back(record);
        while state.records.len() > self.max_records {
            state.records.pop_front();
        }
        state.total_runs += 1;
    }

    /// Comparison context for a fresh result. Skips (with a named reason)
    /// when history is too thin to compare against.
    pub fn context_for(
        &self,
        result: &SimulationResult,
    ) -> Result<AnalyticsContext, EnrichmentSkipped> {
        let state = self.state.lock();
        if state.records.is_empty() {
            return Err(EnrichmentSkipped {
                reason: "no run history",
            });
        }
        let recent: Vec<&RunRecord> = state.records.iter().rev().take(50).collect();
        if recent.len() < 2 {
            return Err(EnrichmentSkipped {
                reason: "insufficient history for comparison",
            });
        }
        let avg_roi = recent.iter().map(|r| r.roi_10year).sum::<f64>() / recent.len() as f64;
        let variety_runs = state
            .variety_counts
            .get(&result.variety)
            .copied()
            .unwrap_or(0);

        Ok(AnalyticsContext {
            total_runs: state.total_runs,
            variety_runs,
            avg_roi_recent: avg_roi,
            roi_vs_average: result.roi_10year - avg_roi,
        })
    }

    pub fn snapshot(&self) -> AnalyticsSnapshot {
        let state = self.state.lock();
        let n = state.records.len();
        if n == 0 {
            return AnalyticsSnapshot {
                total_runs: 0,
                recent_runs: 0,
                variety_counts: BTreeMap::new(),
                avg_area: 0.0,
                avg_roi: 0.0,
                avg_break_even: 0.0,
                avg_duration_ms: 0.0,
                most_popular_variety: String::new(),
                largest_area: 0.0,
            };
        }
        let nf = n as f64;
        let most_popular = state
            .variety_counts
            .iter()
            .max_by_key(|(_, count)| **count)
            .map(|(v, _)| v.clone())
            .unwrap_or_default();

        AnalyticsSnapshot {
            total_runs: state.total_runs,
            recent_runs: n,
            variety_counts: state.variety_counts.clone(),
            avg_area: state.records.iter().map(|r| r.area_pyeong).sum::<f64>() / nf,
            avg_roi: state.records.iter().map(|r| r.roi_10year).sum::<f64>() / nf,
            avg_break_even: state
                .records
                .iter()
                .map(|r| r.break_even_year as f64)
                .sum::<f64>()
                / nf,
            avg_duration_ms: state.records.iter().map(|r| r.duration_ms).sum::<f64>() / nf,
            most_popular_variety: most_popular,
            largest_area: state
                .records
                .iter()
                .map(|r| r.area_pyeong)
                .fold(0.0, f64::max),
        }
    }

    /// ROI/area trends over the last `window` runs vs the runs before them.
    pub fn trends(&self, window: usize) -> RunTrends {
        let state = self.state.lock();
        let records: Vec<&RunRecord> = state.records.iter().collect();
        if records.len() < 2 {
            return RunTrends {
                status: "insufficient_data".to_string(),
                total: state.total_runs,
                window: records.len(),
                avg_roi_recent: 0.0,
                avg_area_recent: 0.0,
                variety_distribution: state.variety_counts.clone(),
                roi_trend: "no_baseline".to_string(),
                roi_change: 0.0,
                recommendations: Vec::new(),
            };
        }

        let take = window.min(records.len());
        let (older, recent) = records.split_at(records.len() - take);
        let avg_roi_recent =
            recent.iter().map(|r| r.roi_10year).sum::<f64>() / recent.len() as f64;
        let avg_area_recent =
            recent.iter().map(|r| r.area_pyeong).sum::<f64>() / recent.len() as f64;

        let (roi_trend, roi_change) = if older.is_empty() {
            ("no_baseline".to_string(), 0.0)
        } else {
            let avg_roi_older =
                older.iter().map(|r| r.roi_10year).sum::<f64>() / older.len() as f64;
            let change = avg_roi_recent - avg_roi_older;
            let trend = if change > ROI_TREND_THRESHOLD {
                "up"
            } else if change < -ROI_TREND_THRESHOLD {
                "down"
            } else {
                "stable"
            };
            (trend.to_string(), change)
        };

        let mut recommendations = Vec::new();
        let total_counted: u64 = state.variety_counts.values().sum();
        if let Some((top, count)) = state
            .variety_counts
            .iter()
            .max_by_key(|(_, count)| **count)
        {
            let pct = *count as f64 / total_counted.max(1) as f64 * 100.0;
            if pct > 70.0 {
                recommendations.push(format!(
                    "variety concentration: {} accounts for {:.0}% of runs; try comparing alternatives",
                    top, pct
                ));
            }
        }

        RunTrends {
            status: "ok".to_string(),
            total: state.total_runs,
            window: take,
            avg_roi_recent,
            avg_area_recent,
            variety_distribution: state.variety_counts.clone(),
            roi_trend,
            roi_change,
            recommendations,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pomona_common::storage::JsonlFileLog;

    fn log_path() -> std::path::PathBuf {
        std::env::temp_dir().join(format!(
            "pomona-analytics-{}/runs.jsonl",
            uuid::Uuid::new_v4()
        ))
    }

    fn record(variety: &str, roi: f64) -> RunRecord {
        RunRecord {
            timestamp: 0,
            variety: variety.to_string(),
            area_pyeong: 1000.0,
            total_trees: 160,
            projection_years: 10,
            annual_profit: 9_000_000,
            roi_10year: roi,
            break_even_year: 9,
            duration_ms: 0.4,
        }
    }

    #[test]
    fn test_snapshot_aggregates() {
        let analytics = RunAnalytics::load(Arc::new(JsonlFileLog::new(log_path()).unwrap()));
        analytics.record_run(record("fuji", 1.5));
        analytics.record_run(record("fuji", 2.5));
        analytics.record_run(record("hongro", 1.0));

        let snap = analytics.snapshot();
        assert_eq!(snap.total_runs, 3);
        assert_eq!(snap.most_popular_variety, "fuji");
        assert!((snap.avg_roi - 5.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_ring_buffer_bounded_but_total_grows() {
        let analytics =
            RunAnalytics::with_capacity(Arc::new(JsonlFileLog::new(log_path()).unwrap()), 5);
        for i in 0..12 {
            analytics.record_run(record("fuji", i as f64));
        }
        let snap = analytics.snapshot();
        assert_eq!(snap.recent_runs, 5);
        assert_eq!(snap.total_runs, 12);
    }

    #[test]
    fn test_replay_restores_history() {
        let path = log_path();
        {
            let analytics =
                RunAnalytics::load(Arc::new(JsonlFileLog::new(&path).unwrap()));
            analytics.record_run(record("gamhong", 2.0));
            analytics.record_run(record("gamhong", 2.2));
        }
        let reloaded = RunAnalytics::load(Arc::new(JsonlFileLog::new(&path).unwrap()));
        let snap = reloaded.snapshot();
        assert_eq!(snap.recent_runs, 2);
        assert_eq!(snap.most_popular_variety, "gamhong");
    }

    #[test]
    fn test_context_requires_history() {
        let analytics = RunAnalytics::load(Arc::new(JsonlFileLog::new(log_path()).unwrap()));
        let result = sample_result();
        let skipped = analytics.context_for(&result).unwrap_err();
        assert_eq!(skipped.reason, "no run history");

        analytics.record_run(record("fuji", 1.0));
        analytics.record_run(record("fuji", 2.0));
        let ctx = analytics.context_for(&result).unwrap();
        assert_eq!(ctx.variety_runs, 2);
        assert!((ctx.avg_roi_recent - 1.5).abs() < 1e-9);
    }

    #[test]
    fn test_trends_direction() {
        let analytics = RunAnalytics::load(Arc::new(JsonlFileLog::new(log_path()).unwrap()));
        for _ in 0..5 {
            analytics.record_run(record("fuji", 1.0));
        }
        for _ in 0..5 {
            analytics.record_run(record("fuji", 2.0));
        }
        let trends = analytics.trends(5);
        assert_eq!(trends.status, "ok");
        assert_eq!(trends.roi_trend, "up");
        assert!(trends.roi_change > 0.9);
        // heavy concentration on one variety is flagged
        assert!(!trends.recommendations.is_empty());
    }

    fn sample_result() -> SimulationResult {
        SimulationResult {
            variety: "fuji".to_string(),
            area_pyeong: 1000.0,
            area_m2: 3305.8,
            area_10a: 3.3058,
            total_trees: 160,
            yield_per_10a: 1942.9,
            price_per_kg: 5500.0,
            price_source: pomona_common::PriceSource::ScenarioDefault,
            grade_distribution: Vec::new(),
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
}
