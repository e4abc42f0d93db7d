//! HTTP routes and handlers
//!
//! Thin layer only: deserialize, validate the boundary constraints the core
//! assumes (positive area, sane horizon), call the synchronous core, wrap
//! the response. All domain behavior lives in the service crates.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use chrono::{Datelike, Utc};
use serde::Deserialize;
use serde_json::json;

use pomona_agro::{DesignRequest, TrainingSample};
use pomona_common::storage::read_last_records;
use pomona_common::{FeedbackRating, SimulationRequest};
use pomona_evolve::EvolutionSignals;

use crate::state::AppState;

/// Largest accepted projection horizon
const MAX_PROJECTION_YEARS: u32 = 30;

/// Signals window handed to the evolution engine
const SIGNAL_WINDOW: usize = 50;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        // climate
        .route("/api/climate/normals/:region", get(climate_normals))
        .route("/api/climate/daily/:region", get(climate_daily))
        // grading
        .route("/api/grading", get(grade_all))
        .route("/api/grading/:region", get(grade_region))
        // orchard design
        .route("/api/orchard/design", post(design_orchard))
        // simulation
        .route("/api/simulation/run", post(run_simulation))
        .route("/api/simulation/compare", post(compare_scenarios))
        .route("/api/simulation/feedback", post(submit_feedback))
        .route("/api/simulation/feedback/stats", get(feedback_stats))
        .route("/api/simulation/analytics", get(analytics_snapshot))
        .route("/api/simulation/trends", get(analytics_trends))
        // forecast
        .route("/api/forecast/annual/:region", get(annual_forecast))
        .route("/api/forecast/gdd/:region", get(gdd_progress))
        .route("/api/forecast/risks/:region", get(variety_risks))
        .route("/api/forecast/bloom/:region", get(bloom_predictions))
        .route("/api/forecast/train/:region", post(train_model))
        // evolution administration
        .route("/api/evolution/status", get(evolution_status))
        .route("/api/evolution/evolve", post(run_evolution))
        .route("/api/evolution/rollback", post(rollback_evolution))
        // anomaly intake and alerts
        .route("/api/anomaly/price", post(check_price_anomaly))
        .route("/api/anomaly/weather", post(check_weather_anomaly))
        .route("/api/anomaly/alerts", get(anomaly_alerts))
        // market trend
        .route("/api/trend/report", get(trend_report))
        .route("/api/trend/:variety", get(variety_trend))
        // price cache intake
        .route("/api/price/quotes", post(push_price_quotes))
        .route("/api/price/status", get(price_status))
        // flags administration
        .route("/api/flags", get(list_flags))
        .route("/api/flags/:flag", post(toggle_flag))
        .with_state(state)
}

fn bad_request(message: impl Into<String>) -> Response {
    (
        StatusCode::UNPROCESSABLE_ENTITY,
        Json(json!({ "error": message.into() })),
    )
        .into_response()
}

fn flag_disabled(flag: &str) -> Response {
    (
        StatusCode::FORBIDDEN,
        Json(json!({ "error": format!("feature '{}' is disabled", flag) })),
    )
        .into_response()
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok", "version": pomona_common::VERSION }))
}

// ---- climate ----

async fn climate_normals(
    State(state): State<AppState>,
    Path(region): Path<String>,
) -> impl IntoResponse {
    Json(state.climate.normals(&region))
}

async fn climate_daily(
    State(state): State<AppState>,
    Path(region): Path<String>,
    Query(query): Query<YearQuery>,
) -> impl IntoResponse {
    let (series, source) = state
        .climate
        .daily_series_with_source(&region, resolve_year(query.year));
    Json(json!({ "source": source, "series": series }))
}

// ---- grading ----

async fn grade_all(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.grader.grade_all())
}

async fn grade_region(
    State(state): State<AppState>,
    Path(region): Path<String>,
) -> impl IntoResponse {
    Json(state.grader.grade_region(&region))
}

// ---- orchard design ----

async fn design_orchard(
    State(_state): State<AppState>,
    Json(req): Json<DesignRequest>,
) -> Response {
    if req.area_pyeong <= 0.0 {
        return bad_request("area_pyeong must be positive");
    }
    Json(pomona_agro::design(&req)).into_response()
}

// ---- simulation ----

fn validate_simulation_request(req: &SimulationRequest) -> Option<Response> {
    if req.area_pyeong <= 0.0 {
        return Some(bad_request("area_pyeong must be positive"));
    }
    if req.projection_years == 0 || req.projection_years > MAX_PROJECTION_YEARS {
        return Some(bad_request(format!(
            "projection_years must be between 1 and {}",
            MAX_PROJECTION_YEARS
        )));
    }
    None
}

async fn run_simulation(
    State(state): State<AppState>,
    Json(req): Json<SimulationRequest>,
) -> Response {
    if let Some(rejection) = validate_simulation_request(&req) {
        return rejection;
    }
    Json(state.simulator.run(&req)).into_response()
}

#[derive(Deserialize)]
struct CompareRequest {
    variety: String,
    area_pyeong: f64,
    #[serde(default = "default_projection_years")]
    projection_years: u32,
}

fn default_projection_years() -> u32 {
    10
}

async fn compare_scenarios(
    State(state): State<AppState>,
    Json(req): Json<CompareRequest>,
) -> Response {
    if !state.flags.is_enabled("multi_scenario_compare") {
        return flag_disabled("multi_scenario_compare");
    }
    if req.area_pyeong <= 0.0 {
        return bad_request("area_pyeong must be positive");
    }
    if req.projection_years == 0 || req.projection_years > MAX_PROJECTION_YEARS {
        return bad_request("projection_years out of range");
    }
    Json(
        state
            .simulator
            .compare_scenarios(&req.variety, req.area_pyeong, req.projection_years),
    )
    .into_response()
}

#[derive(Deserialize)]
struct FeedbackRequest {
    variety: String,
    area_pyeong: f64,
    rating: FeedbackRating,
    #[serde(default)]
    comment: String,
}

async fn submit_feedback(
    State(state): State<AppState>,
    Json(req): Json<FeedbackRequest>,
) -> Response {
    if !state.flags.is_enabled("simulation_feedback") {
        return flag_disabled("simulation_feedback");
    }
    let entry = state
        .feedback
        .submit(&req.variety, req.area_pyeong, req.rating, &req.comment);
    Json(entry).into_response()
}

async fn feedback_stats(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.feedback.stats())
}

async fn analytics_snapshot(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.analytics.snapshot())
}

#[derive(Deserialize)]
struct TrendsQuery {
    #[serde(default = "default_trend_window")]
    window: usize,
}

fn default_trend_window() -> usize {
    50
}

async fn analytics_trends(
    State(state): State<AppState>,
    Query(query): Query<TrendsQuery>,
) -> impl IntoResponse {
    Json(state.analytics.trends(query.window))
}

// ---- forecast ----

#[derive(Deserialize)]
struct YearQuery {
    year: Option<i32>,
}

fn resolve_year(year: Option<i32>) -> i32 {
    year.unwrap_or_else(|| Utc::now().year())
}

async fn annual_forecast(
    State(state): State<AppState>,
    Path(region): Path<String>,
    Query(query): Query<YearQuery>,
) -> impl IntoResponse {
    Json(state.forecast.annual_forecast(&region, resolve_year(query.year)))
}

async fn gdd_progress(
    State(state): State<AppState>,
    Path(region): Path<String>,
    Query(query): Query<YearQuery>,
) -> impl IntoResponse {
    Json(state.forecast.gdd_progress(&region, resolve_year(query.year)))
}

async fn variety_risks(
    State(state): State<AppState>,
    Path(region): Path<String>,
    Query(query): Query<YearQuery>,
) -> impl IntoResponse {
    let series = state
        .climate
        .daily_series(&region, resolve_year(query.year));
    Json(pomona_agro::ForecastEngine::variety_risks(&series))
}

async fn bloom_predictions(
    State(state): State<AppState>,
    Path(region): Path<String>,
    Query(query): Query<YearQuery>,
) -> impl IntoResponse {
    let series = state
        .climate
        .daily_series(&region, resolve_year(query.year));
    Json(pomona_agro::ForecastEngine::bloom_predictions(&series))
}

#[derive(Deserialize)]
struct TrainRequest {
    samples: Vec<TrainingSample>,
}

async fn train_model(
    State(state): State<AppState>,
    Path(region): Path<String>,
    Json(req): Json<TrainRequest>,
) -> Response {
    match state.forecast.train_model(&region, &req.samples) {
        Ok(report) => Json(report).into_response(),
        Err(e) => bad_request(e.to_string()),
    }
}

// ---- evolution administration ----

async fn evolution_status(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.evolution.status())
}

async fn run_evolution(State(state): State<AppState>) -> impl IntoResponse {
    let signals = EvolutionSignals {
        feedback: Some(state.feedback.stats()),
        outcomes: read_last_records(state.validator_outcomes.as_ref(), SIGNAL_WINDOW),
        alerts: state.anomaly.alerts(SIGNAL_WINDOW, None),
    };
    Json(state.evolution.evolve(&signals))
}

async fn rollback_evolution(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.evolution.rollback())
}

// ---- anomaly intake ----

#[derive(Deserialize)]
struct PriceObservation {
    variety: String,
    price: f64,
    #[serde(default)]
    date: String,
}

async fn check_price_anomaly(
    State(state): State<AppState>,
    Json(obs): Json<PriceObservation>,
) -> Response {
    if !state.flags.is_enabled("anomaly_detection") {
        return flag_disabled("anomaly_detection");
    }
    Json(state.anomaly.check_price(&obs.variety, obs.price, &obs.date)).into_response()
}

#[derive(Deserialize)]
struct WeatherObservation {
    temp_c: f64,
    #[serde(default)]
    rain_mm: f64,
    #[serde(default)]
    wind_ms: f64,
    #[serde(default)]
    region: String,
}

async fn check_weather_anomaly(
    State(state): State<AppState>,
    Json(obs): Json<WeatherObservation>,
) -> Response {
    if !state.flags.is_enabled("anomaly_detection") {
        return flag_disabled("anomaly_detection");
    }
    Json(
        state
            .anomaly
            .check_weather(obs.temp_c, obs.rain_mm, obs.wind_ms, &obs.region),
    )
    .into_response()
}

#[derive(Deserialize)]
struct AlertsQuery {
    #[serde(default = "default_alert_limit")]
    limit: usize,
}

fn default_alert_limit() -> usize {
    20
}

async fn anomaly_alerts(
    State(state): State<AppState>,
    Query(query): Query<AlertsQuery>,
) -> impl IntoResponse {
    Json(json!({
        "alerts": state.anomaly.alerts(query.limit, None),
        "stats": state.anomaly.stats(),
    }))
}

// ---- market trend ----

async fn trend_report(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.trend.report())
}

async fn variety_trend(
    State(state): State<AppState>,
    Path(variety): Path<String>,
) -> Response {
    match state.trend.variety_trend(&variety) {
        Some(trend) => Json(trend).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": format!("variety '{}' is not catalogued", variety) })),
        )
            .into_response(),
    }
}

// ---- price cache intake ----

#[derive(Deserialize)]
struct PriceQuotes {
    quotes: Vec<f64>,
}

async fn push_price_quotes(
    State(state): State<AppState>,
    Json(req): Json<PriceQuotes>,
) -> impl IntoResponse {
    let accepted = state.price_cache.update(&req.quotes);
    Json(json!({ "accepted": accepted, "status": state.price_cache.status() }))
}

async fn price_status(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.price_cache.status())
}

// ---- flags administration ----

async fn list_flags(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.flags.all())
}

#[derive(Deserialize)]
struct FlagToggle {
    enabled: bool,
}

async fn toggle_flag(
    State(state): State<AppState>,
    Path(flag): Path<String>,
    Json(req): Json<FlagToggle>,
) -> impl IntoResponse {
    state.flags.set(&flag, req.enabled);
    Json(state.flags.summary())
}
