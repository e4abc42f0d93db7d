//! Service wiring
//!
//! Every service is constructed exactly once here and shared through
//! `AppState` — process-wide single instances without hidden globals.

use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use pomona_agro::{ClimateService, ForecastEngine, OrchardGrader};
use pomona_common::storage::{AppendLog, DocumentStore, JsonFileStore, JsonlFileLog};
use pomona_common::FeatureFlags;
use pomona_evolve::{AnomalyDetector, EvolutionEngine};
use pomona_sim::{
    FeedbackCollector, PriceCache, ProfitSimulator, RunAnalytics, SimulationValidator,
};
use pomona_trend::TrendDetector;

use crate::config::ApiConfig;

/// Shared application state: one instance of each service per process
#[derive(Clone)]
pub struct AppState {
    pub flags: Arc<FeatureFlags>,
    pub climate: Arc<ClimateService>,
    pub grader: Arc<OrchardGrader>,
    pub forecast: Arc<ForecastEngine>,
    pub simulator: Arc<ProfitSimulator>,
    pub feedback: Arc<FeedbackCollector>,
    pub analytics: Arc<RunAnalytics>,
    pub evolution: Arc<EvolutionEngine>,
    pub anomaly: Arc<AnomalyDetector>,
    pub trend: Arc<TrendDetector>,
    pub price_cache: Arc<PriceCache>,
    /// Read by the evolve endpoint when gathering signals
    pub validator_outcomes: Arc<dyn AppendLog>,
}

impl AppState {
    /// Build the full service graph from configuration.
    pub fn build(config: &ApiConfig) -> Result<Self> {
        let documents: Arc<dyn DocumentStore> =
            Arc::new(JsonFileStore::new(config.data_dir.join("documents"))?);
        let climate_cache: Arc<dyn DocumentStore> =
            Arc::new(JsonFileStore::new(config.data_dir.join("climate_cache"))?);
        let model_store: Arc<dyn DocumentStore> =
            Arc::new(JsonFileStore::new(config.data_dir.join("models"))?);

        let evolution_events: Arc<dyn AppendLog> = Arc::new(JsonlFileLog::new(
            config.data_dir.join("evolution_events.jsonl"),
        )?);
        let validator_outcomes: Arc<dyn AppendLog> = Arc::new(JsonlFileLog::new(
            config.data_dir.join("validator_outcomes.jsonl"),
        )?);
        let run_log: Arc<dyn AppendLog> =
            Arc::new(JsonlFileLog::new(config.data_dir.join("simulation_runs.jsonl"))?);
        let anomaly_log: Arc<dyn AppendLog> =
            Arc::new(JsonlFileLog::new(config.data_dir.join("anomalies.jsonl"))?);

        let flags = Arc::new(FeatureFlags::load(documents.clone()));
        let climate = Arc::new(ClimateService::new(climate_cache));
        let grader = Arc::new(OrchardGrader::new(climate.clone()));
        let forecast = Arc::new(ForecastEngine::new(climate.clone(), model_store));

        let evolution = Arc::new(EvolutionEngine::load(
            documents.clone(),
            evolution_events,
            flags.clone(),
        ));
        let price_cache = Arc::new(PriceCache::new());
        let analytics = Arc::new(RunAnalytics::load(run_log));
        let validator = Arc::new(SimulationValidator::new(validator_outcomes.clone()));
        let simulator = Arc::new(
            ProfitSimulator::new(
                flags.clone(),
                evolution.clone(),
                price_cache.clone(),
                analytics.clone(),
                validator,
            )
            .with_grader(grader.clone()),
        );
        let feedback = Arc::new(FeedbackCollector::new(documents));
        let anomaly = Arc::new(AnomalyDetector::new(anomaly_log));
        let trend = Arc::new(TrendDetector::new());

        info!(data_dir = %config.data_dir.display(), "service graph constructed");

        Ok(Self {
            flags,
            climate,
            grader,
            forecast,
            simulator,
            feedback,
            analytics,
            evolution,
            anomaly,
            trend,
            price_cache,
            validator_outcomes,
        })
    }
}
