//! Seasonal outlook and risk forecasting
//!
//! Three layers, each degrading gracefully into the next:
//!
//! 1. Rule scores — four 0-25 sub-scores per calendar month (GDD deviation,
//!    frost risk, precipitation balance, extreme temperatures) rolled into a
//!    weighted annual outlook.
//! 2. Phenology — bloom/harvest predictions and a per-variety risk matrix
//!    from the degree-day engine.
//! 3. Regression — an optional least-squares yield model over the climate
//!    features. A missing model is a named degradation (`yield_prediction`
//!    absent), never a failed request.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use pomona_common::storage::{read_doc, replace_doc, DocumentStore};
use pomona_common::{
    phenology_profile, ClimateNormal, DailyClimateRecord, Result, TrainingError,
    APPLE_BASE_TEMP_C, PHENOLOGY_VARIETIES,
};

use crate::climate::{ClimateService, ClimateSource};
use crate::phenology::{
    accumulated_gdd, count_bloom_frost_days, count_frost_days, count_heat_stress_days,
    daily_gdd, extract_features, predict_bloom_date, predict_harvest_date, summer_rain_total,
    ClimateFeatures, BLOOM_FROST_WINDOW_DAYS, FEATURE_NAMES, FROST_THRESHOLD_C,
    HEAT_STRESS_MONTHS, HEAT_STRESS_THRESHOLD_C, SUMMER_MONTHS,
};

/// Minimum (features, yield) pairs required to train the regression model
pub const MIN_TRAINING_SAMPLES: usize = 5;

/// Growth-stage weight for each calendar month in the annual score.
/// April (bloom) counts double; the summer and harvest months count 1.5.
fn month_weight(month: u32) -> f64 {
    match month {
        4 => 2.0,
        6 | 7 | 9 => 1.5,
        8 => 1.2,
        5 | 10 => 1.0,
        3 => 0.8,
        11 => 0.7,
        1 | 2 => 0.6,
        _ => 0.5,
    }
}

/// GDD-deviation sub-score (0-25): small deviation from the climatological
/// normal scores high.
fn score_gdd_deviation(monthly_gdd: f64, normal_gdd: f64) -> f64 {
    if normal_gdd == 0.0 {
        return 20.0;
    }
    let deviation = ((monthly_gdd - normal_gdd) / normal_gdd).abs();
    if deviation < 0.05 {
        25.0
    } else if deviation < 0.15 {
        20.0
    } else if deviation < 0.30 {
        15.0
    } else if deviation < 0.50 {
        10.0
    } else {
        5.0
    }
}

/// Frost-risk sub-score (0-25). April frost lands in the bloom window, so
/// its count is doubled before bucketing.
fn score_frost_risk(frost_days: usize, month: u32) -> f64 {
    let multiplier = if month == 4 { 2.0 } else { 1.0 };
    let effective = frost_days as f64 * multiplier;
    if effective == 0.0 {
        25.0
    } else if effective <= 2.0 {
        20.0
    } else if effective <= 5.0 {
        15.0
    } else if effective <= 10.0 {
        8.0
    } else {
        3.0
    }
}

/// Precipitation-balance sub-score (0-25): excess invites disease, deficit
/// is drought.
fn score_precip_balance(rainfall_mm: f64, normal_rainfall_mm: f64) -> f64 {
    if normal_rainfall_mm == 0.0 {
        return if rainfall_mm < 10.0 { 20.0 } else { 15.0 };
    }
    let ratio = rainfall_mm / normal_rainfall_mm;
    if (0.7..=1.3).contains(&ratio) {
        25.0
    } else if (0.5..=1.5).contains(&ratio) {
        20.0
    } else if (0.3..=2.0).contains(&ratio) {
        12.0
    } else {
        5.0
    }
}

/// Extreme-temperature sub-score (0-25), penalized for summer heat, winter
/// cold snaps, and April late frost.
fn score_extreme_temp(avg_min: f64, avg_max: f64, month: u32) -> f64 {
    let mut score = 25.0;

    if (month == 7 || month == 8) && avg_max > 33.0 {
        score -= ((avg_max - 33.0) * 3.0).min(20.0);
    }
    if (month == 1 || month == 2) && avg_min < -15.0 {
        score -= ((avg_min + 15.0).abs() * 2.0).min(15.0);
    }
    if month == 4 && avg_min < 0.0 {
        score -= (avg_min.abs() * 5.0).min(15.0);
    }

    score.max(0.0)
}

fn month_label(total: f64) -> &'static str {
    if total >= 80.0 {
        "good"
    } else if total >= 60.0 {
        "fair"
    } else if total >= 40.0 {
        "watch"
    } else {
        "risk"
    }
}

/// Annual outlook bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutlookLabel {
    Bountiful,
    Average,
    Poor,
    Failed,
}

impl OutlookLabel {
    fn from_score(score: f64) -> Self {
        if score >= 80.0 {
            OutlookLabel::Bountiful
        } else if score >= 60.0 {
            OutlookLabel::Average
        } else if score >= 40.0 {
            OutlookLabel::Poor
        } else {
            OutlookLabel::Failed
        }
    }
}

/// One month's rule-engine score (the four sub-scores sum to `score`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyScore {
    pub month: u32,
    /// 0-100
    pub score: f64,
    pub label: String,
    /// Month GDD deviation from normal, percent
    pub gdd_deviation_pct: f64,
    pub gdd_score: f64,
    pub frost_score: f64,
    pub precip_score: f64,
    pub extreme_temp_score: f64,
}

/// Bloom and harvest prediction for one variety
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BloomPrediction {
    pub variety: String,
    /// Absent when the series never accumulates the bloom threshold
    pub bloom_date: Option<NaiveDate>,
    pub harvest_date: Option<NaiveDate>,
    pub gdd_at_bloom: Option<f64>,
    pub days_to_harvest: i64,
}

/// Risk band for one hazard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Moderate,
    High,
}

fn risk_level(value: f64, thresholds: (f64, f64)) -> RiskLevel {
    if value <= thresholds.0 {
        RiskLevel::Low
    } else if value <= thresholds.1 {
        RiskLevel::Moderate
    } else {
        RiskLevel::High
    }
}

/// Overall variety standing for the season
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverallRisk {
    Safe,
    Caution,
    Warning,
}

/// Hazard matrix for one variety
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VarietyRisk {
    pub variety: String,
    pub frost_risk: RiskLevel,
    pub heat_risk: RiskLevel,
    pub rain_risk: RiskLevel,
    pub disease_risk: RiskLevel,
    pub overall: OverallRisk,
    /// 0-100 confidence that the season is manageable for this variety
    pub overall_score: f64,
}

/// Regression-model yield prediction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YieldPrediction {
    pub region_id: String,
    pub year: i32,
    pub predicted_yield_kg_per_10a: f64,
    pub confidence: f64,
    pub model: String,
    pub features_used: Vec<String>,
}

/// Full annual forecast
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnnualForecast {
    pub region_id: String,
    pub year: i32,
    pub overall_score: f64,
    pub overall_label: OutlookLabel,
    pub recommendation: String,
    pub monthly_scores: Vec<MonthlyScore>,
    pub bloom_predictions: Vec<BloomPrediction>,
    pub variety_risks: Vec<VarietyRisk>,
    /// Absent when no trained model exists for the region
    #[serde(skip_serializing_if = "Option::is_none")]
    pub yield_prediction: Option<YieldPrediction>,
    pub data_source: ClimateSource,
}

/// One point of GDD accumulation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GddPoint {
    pub date: NaiveDate,
    pub accumulated: f64,
    pub normal: f64,
}

/// Accumulated GDD progress vs the climatological normal
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GddProgress {
    pub region_id: String,
    pub year: i32,
    pub base_temp: f64,
    pub current_gdd: f64,
    pub normal_gdd: f64,
    pub deviation_pct: f64,
    pub daily_progress: Vec<GddPoint>,
}

/// Persisted linear yield model (intercept first, then one weight per
/// feature in [`FEATURE_NAMES`] order)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YieldModel {
    pub region_id: String,
    pub weights: Vec<f64>,
    pub samples: usize,
    /// Unix milliseconds
    pub trained_at: i64,
}

impl YieldModel {
    fn predict(&self, features: &ClimateFeatures) -> f64 {
        let x = features.to_vector();
        let mut y = self.weights[0];
        for (w, xi) in self.weights[1..].iter().zip(x.iter()) {
            y += w * xi;
        }
        y
    }
}

/// One historical training pair
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TrainingSample {
    pub features: ClimateFeatures,
    pub yield_kg_per_10a: f64,
}

/// Training report returned to the caller
#[derive(Debug, Clone, Serialize)]
pub struct TrainReport {
    pub region_id: String,
    pub samples: usize,
    pub weights: Vec<f64>,
}

/// Forecast engine over the climate service and the model store
pub struct ForecastEngine {
    climate: Arc<ClimateService>,
    models: Arc<dyn DocumentStore>,
}

impl ForecastEngine {
    pub fn new(climate: Arc<ClimateService>, models: Arc<dyn DocumentStore>) -> Self {
        Self { climate, models }
    }

    /// Rule-engine scores for all 12 months.
    pub fn monthly_scores(
        series: &[DailyClimateRecord],
        normals: &[ClimateNormal],
    ) -> Vec<MonthlyScore> {
        let mut results = Vec::with_capacity(12);
        for month in 1..=12u32 {
            let days: Vec<&DailyClimateRecord> =
                series.iter().filter(|d| d.month() == month).collect();
            let normal = normals.iter().find(|n| n.month == month);
            let (n_min, n_max, n_rain) = match normal {
                Some(n) => (n.min_temp_c, n.max_temp_c, n.rainfall_mm),
                None => (0.0, 10.0, 50.0),
            };

            let month_gdd: f64 = days
                .iter()
                .map(|d| daily_gdd(d.min_temp_c, d.max_temp_c, APPLE_BASE_TEMP_C))
                .sum();
            let day_count = if days.is_empty() { 30 } else { days.len() };
            let normal_gdd = daily_gdd(n_min, n_max, APPLE_BASE_TEMP_C) * day_count as f64;

            let frost = days.iter().filter(|d| d.min_temp_c <= 0.0).count();
            let rain: f64 = days.iter().map(|d| d.rainfall_mm).sum();
            let avg_min = if days.is_empty() {
                n_min
            } else {
                days.iter().map(|d| d.min_temp_c).sum::<f64>() / days.len() as f64
            };
            let avg_max = if days.is_empty() {
                n_max
            } else {
                days.iter().map(|d| d.max_temp_c).sum::<f64>() / days.len() as f64
            };

            let gdd_score = score_gdd_deviation(month_gdd, normal_gdd);
            let frost_score = score_frost_risk(frost, month);
            let precip_score = score_precip_balance(rain, n_rain);
            let extreme_temp_score = score_extreme_temp(avg_min, avg_max, month);
            let total = gdd_score + frost_score + precip_score + extreme_temp_score;

            let gdd_deviation_pct = if normal_gdd > 0.0 {
                (month_gdd - normal_gdd) / normal_gdd * 100.0
            } else {
                0.0
            };

            results.push(MonthlyScore {
                month,
                score: total,
                label: month_label(total).to_string(),
                gdd_deviation_pct,
                gdd_score,
                frost_score,
                precip_score,
                extreme_temp_score,
            });
        }
        results
    }

    /// Growth-stage weighted annual score and its outlook bucket.
    pub fn annual_score(monthly: &[MonthlyScore]) -> (f64, OutlookLabel) {
        let mut weighted_sum = 0.0;
        let mut total_weight = 0.0;
        for ms in monthly {
            let w = month_weight(ms.month);
            weighted_sum += ms.score * w;
            total_weight += w;
        }
        let score = if total_weight > 0.0 {
            weighted_sum / total_weight
        } else {
            50.0
        };
        (score, OutlookLabel::from_score(score))
    }

    /// Bloom and harvest predictions across the phenology catalogue.
    pub fn bloom_predictions(series: &[DailyClimateRecord]) -> Vec<BloomPrediction> {
        PHENOLOGY_VARIETIES
            .iter()
            .map(|&variety| {
                let profile = phenology_profile(variety);
                let bloom = predict_bloom_date(series, profile);
                let harvest = predict_harvest_date(bloom, profile);
                let gdd_at_bloom = bloom.map(|b| {
                    let up_to: Vec<DailyClimateRecord> = series
                        .iter()
                        .filter(|d| d.date <= b)
                        .cloned()
                        .collect();
                    accumulated_gdd(&up_to).last().copied().unwrap_or(0.0)
                });
                BloomPrediction {
                    variety: variety.to_string(),
                    bloom_date: bloom,
                    harvest_date: harvest,
                    gdd_at_bloom,
                    days_to_harvest: profile.days_bloom_to_harvest,
                }
            })
            .collect()
    }

    /// Per-variety hazard matrix for the season.
    pub fn variety_risks(series: &[DailyClimateRecord]) -> Vec<VarietyRisk> {
        let frost_total = count_frost_days(series, FROST_THRESHOLD_C);
        let heat_total =
            count_heat_stress_days(series, HEAT_STRESS_THRESHOLD_C, &HEAT_STRESS_MONTHS);
        let summer_rain = summer_rain_total(series, &SUMMER_MONTHS);

        PHENOLOGY_VARIETIES
            .iter()
            .map(|&variety| {
                let profile = phenology_profile(variety);
                let bloom = predict_bloom_date(series, profile);
                let bloom_frost = count_bloom_frost_days(
                    series,
                    bloom,
                    BLOOM_FROST_WINDOW_DAYS,
                    FROST_THRESHOLD_C,
                );

                // bloom-window frost is double-weighted; season frost only
                // partially matters once trees are dormant-hardy
                let effective_frost = bloom_frost as f64 * profile.frost_sensitivity * 2.0
                    + frost_total as f64 * 0.3;
                let effective_heat = heat_total as f64 * (1.0 - profile.heat_tolerance);
                let effective_rain = summer_rain;
                let disease_load = effective_rain * 0.8 + effective_heat * 2.0;

                let frost_risk = risk_level(effective_frost, (3.0, 8.0));
                let heat_risk = risk_level(effective_heat, (5.0, 15.0));
                let rain_risk = risk_level(effective_rain, (500.0, 900.0));
                let disease_risk = risk_level(disease_load, (350.0, 700.0));

                let levels = [frost_risk, heat_risk, rain_risk, disease_risk];
                let highs = levels.iter().filter(|l| **l == RiskLevel::High).count() as f64;
                let moderates = levels
                    .iter()
                    .filter(|l| **l == RiskLevel::Moderate)
                    .count() as f64;

                let (overall, overall_score) = if highs >= 2.0 {
                    (
                        OverallRisk::Warning,
                        (100.0 - highs * 25.0 - moderates * 10.0).max(0.0),
                    )
                } else if highs >= 1.0 || moderates >= 2.0 {
                    (
                        OverallRisk::Caution,
                        (100.0 - highs * 20.0 - moderates * 8.0).max(20.0),
                    )
                } else {
                    (OverallRisk::Safe, (100.0 - moderates * 5.0).max(60.0))
                };

                VarietyRisk {
                    variety: variety.to_string(),
                    frost_risk,
                    heat_risk,
                    rain_risk,
                    disease_risk,
                    overall,
                    overall_score,
                }
            })
            .collect()
    }

    /// Full annual forecast for a region-year.
    #[instrument(skip(self))]
    pub fn annual_forecast(&self, region_id: &str, year: i32) -> AnnualForecast {
        let (series, data_source) = self.climate.daily_series_with_source(region_id, year);
        let normals = self.climate.normals(region_id);

        let monthly_scores = Self::monthly_scores(&series, &normals);
        let (overall_score, overall_label) = Self::annual_score(&monthly_scores);

        let bloom_predictions = Self::bloom_predictions(&series);
        let variety_risks = Self::variety_risks(&series);
        let yield_prediction = self.predict_yield(region_id, year, &series);
        let recommendation =
            build_recommendation(overall_score, overall_label, &variety_risks);

        AnnualForecast {
            region_id: region_id.to_string(),
            year,
            overall_score,
            overall_label,
            recommendation,
            monthly_scores,
            bloom_predictions,
            variety_risks,
            yield_prediction,
            data_source,
        }
    }

    /// Accumulated GDD vs the normal accumulation, day by day.
    #[instrument(skip(self))]
    pub fn gdd_progress(&self, region_id: &str, year: i32) -> GddProgress {
        let series = self.climate.daily_series(region_id, year);
        let normals = self.climate.normals(region_id);

        let actual = accumulated_gdd(&series);
        let mut normal_total = 0.0;
        let daily_progress: Vec<GddPoint> = series
            .iter()
            .zip(actual.iter())
            .map(|(d, acc)| {
                let n = normals.iter().find(|n| n.month == d.month());
                if let Some(n) = n {
                    normal_total += daily_gdd(n.min_temp_c, n.max_temp_c, APPLE_BASE_TEMP_C);
                }
                GddPoint {
                    date: d.date,
                    accumulated: *acc,
                    normal: normal_total,
                }
            })
            .collect();

        let current_gdd = actual.last().copied().unwrap_or(0.0);
        let normal_gdd = daily_progress.last().map(|p| p.normal).unwrap_or(0.0);
        let deviation_pct = if normal_gdd > 0.0 {
            (current_gdd - normal_gdd) / normal_gdd * 100.0
        } else {
            0.0
        };

        GddProgress {
            region_id: region_id.to_string(),
            year,
            base_temp: APPLE_BASE_TEMP_C,
            current_gdd,
            normal_gdd,
            deviation_pct,
            daily_progress,
        }
    }

    /// Train and persist the region's yield model. Requires at least
    /// [`MIN_TRAINING_SAMPLES`] historical pairs; fewer is a declared error.
    #[instrument(skip(self, samples))]
    pub fn train_model(&self, region_id: &str, samples: &[TrainingSample]) -> Result<TrainReport> {
        if samples.len() < MIN_TRAINING_SAMPLES {
            return Err(TrainingError::InsufficientData {
                samples: samples.len(),
                required: MIN_TRAINING_SAMPLES,
            }
            .into());
        }

        let rows: Vec<[f64; 7]> = samples.iter().map(|s| s.features.to_vector()).collect();
        let targets: Vec<f64> = samples.iter().map(|s| s.yield_kg_per_10a).collect();
        let weights = fit_least_squares(&rows, &targets)?;

        let model = YieldModel {
            region_id: region_id.to_string(),
            weights: weights.clone(),
            samples: samples.len(),
            trained_at: Utc::now().timestamp_millis(),
        };
        let key = model_key(region_id);
        if let Err(e) = replace_doc(self.models.as_ref(), &key, &model) {
            // keep serving the in-memory result; the next train can retry
            tracing::warn!(region_id, error = %e, "failed to persist yield model");
        }
        info!(region_id, samples = samples.len(), "yield model trained");

        Ok(TrainReport {
            region_id: region_id.to_string(),
            samples: samples.len(),
            weights,
        })
    }

    /// Predict yield from the region's trained model, if one exists.
    pub fn predict_yield(
        &self,
        region_id: &str,
        year: i32,
        series: &[DailyClimateRecord],
    ) -> Option<YieldPrediction> {
        let model: YieldModel = match read_doc(self.models.as_ref(), &model_key(region_id)) {
            Some(m) => m,
            None => {
                debug!(region_id, "no trained yield model, forecast proceeds without it");
                return None;
            }
        };
        if model.weights.len() != FEATURE_NAMES.len() + 1 {
            debug!(region_id, "stored model has unexpected shape, ignoring");
            return None;
        }
        let features = extract_features(series, phenology_profile("fuji"));
        Some(YieldPrediction {
            region_id: region_id.to_string(),
            year,
            predicted_yield_kg_per_10a: model.predict(&features),
            confidence: 0.7,
            model: "linear_regression".to_string(),
            features_used: FEATURE_NAMES.iter().map(|s| s.to_string()).collect(),
        })
    }
}

fn model_key(region_id: &str) -> String {
    format!("yield_model_{}", region_id)
}

/// Ordinary least squares with an intercept, solved by normal equations.
/// A small ridge term keeps the system well conditioned when features are
/// collinear across few samples.
fn fit_least_squares(rows: &[[f64; 7]], targets: &[f64]) -> Result<Vec<f64>> {
    const DIM: usize = 8; // intercept + 7 features
    const RIDGE: f64 = 1e-6;

    let mut xtx = [[0.0f64; DIM]; DIM];
    let mut xty = [0.0f64; DIM];

    for (row, &y) in rows.iter().zip(targets.iter()) {
        let mut x = [0.0f64; DIM];
        x[0] = 1.0;
        x[1..].copy_from_slice(row);
        for i in 0..DIM {
            xty[i] += x[i] * y;
            for j in 0..DIM {
                xtx[i][j] += x[i] * x[j];
            }
        }
    }
    for (i, row) in xtx.iter_mut().enumerate().skip(1) {
        row[i] += RIDGE;
    }

    // Gaussian elimination with partial pivoting
    let mut a = xtx;
    let mut b = xty;
    for col in 0..DIM {
        let mut pivot = col;
        for r in (col + 1)..DIM {
            if a[r][col].abs() > a[pivot][col].abs() {
                pivot = r;
            }
        }
        if a[pivot][col].abs() < 1e-12 {
            return Err(TrainingError::DegenerateFeatures(format!(
                "singular normal matrix at column {}",
                col
            ))
            .into());
        }
        a.swap(col, pivot);
        b.swap(col, pivot);

        for r in (col + 1)..DIM {
            let factor = a[r][col] / a[col][col];
            for c in col..DIM {
                a[r][c] -= factor * a[col][c];
            }
            b[r] -= factor * b[col];
        }
    }
    let mut weights = vec![0.0f64; DIM];
    for row in (0..DIM).rev() {
        let mut sum = b[row];
        for c in (row + 1)..DIM {
            sum -= a[row][c] * weights[c];
        }
        weights[row] = sum / a[row][row];
    }
    Ok(weights)
}

fn build_recommendation(
    score: f64,
    label: OutlookLabel,
    risks: &[VarietyRisk],
) -> String {
    let safe: Vec<&str> = risks
        .iter()
        .filter(|r| r.overall == OverallRisk::Safe)
        .map(|r| r.variety.as_str())
        .collect();
    let warn: Vec<&str> = risks
        .iter()
        .filter(|r| r.overall == OverallRisk::Warning)
        .map(|r| r.variety.as_str())
        .collect();

    let mut msg = match label {
        OutlookLabel::Bountiful => format!(
            "Season outlook is bountiful ({:.0}/100). Climate conditions are broadly favorable.",
            score
        ),
        OutlookLabel::Average => format!(
            "Season outlook is average ({:.0}/100). Some periods will need attention.",
            score
        ),
        OutlookLabel::Poor => format!(
            "Season outlook is poor ({:.0}/100). Active management is advised.",
            score
        ),
        OutlookLabel::Failed => format!(
            "Season outlook is very poor ({:.0}/100). Prepare mitigation for major losses.",
            score
        ),
    };
    if !safe.is_empty() {
        msg.push_str(&format!(" Low-risk varieties: {}.", safe.join(", ")));
    }
    if !warn.is_empty() {
        msg.push_str(&format!(
            " High-risk varieties: {} — focused management recommended.",
            warn.join(", ")
        ));
    }
    msg
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use pomona_common::storage::JsonFileStore;

    fn engine() -> ForecastEngine {
        let dir = std::env::temp_dir().join(format!("pomona-forecast-{}", uuid::Uuid::new_v4()));
        let store = Arc::new(JsonFileStore::new(dir).unwrap());
        let climate = Arc::new(ClimateService::new(store.clone()));
        ForecastEngine::new(climate, store)
    }

    #[test]
    fn test_gdd_deviation_buckets() {
        assert_eq!(score_gdd_deviation(100.0, 100.0), 25.0);
        assert_eq!(score_gdd_deviation(110.0, 100.0), 20.0);
        assert_eq!(score_gdd_deviation(125.0, 100.0), 15.0);
        assert_eq!(score_gdd_deviation(60.0, 100.0), 10.0);
        assert_eq!(score_gdd_deviation(10.0, 100.0), 5.0);
        assert_eq!(score_gdd_deviation(50.0, 0.0), 20.0);
    }

    #[test]
    fn test_april_frost_double_weighted() {
        // 3 frost days: normally bucket "<=5" (15), in April effective 6 -> 8
        assert_eq!(score_frost_risk(3, 5), 15.0);
        assert_eq!(score_frost_risk(3, 4), 8.0);
        assert_eq!(score_frost_risk(0, 4), 25.0);
    }

    #[test]
    fn test_extreme_temp_penalties() {
        assert_eq!(score_extreme_temp(22.0, 30.0, 7), 25.0);
        // 36 °C in August: 9-point penalty
        assert_relative_eq!(score_extreme_temp(24.0, 36.0, 8), 16.0);
        // January cold snap
        assert_relative_eq!(score_extreme_temp(-18.0, -5.0, 1), 19.0);
        // April late frost: -2 °C -> 10-point penalty
        assert_relative_eq!(score_extreme_temp(-2.0, 12.0, 4), 15.0);
        // penalties floor at zero
        assert_eq!(score_extreme_temp(-30.0, 50.0, 7), 5.0);
    }

    #[test]
    fn test_monthly_scores_cover_year() {
        let eng = engine();
        let normals = eng.climate.normals("yeongju");
        let series = ClimateService::expand_normals_to_daily(&normals);
        let monthly = ForecastEngine::monthly_scores(&series, &normals);
        assert_eq!(monthly.len(), 12);
        for ms in &monthly {
            assert!((0.0..=100.0).contains(&ms.score));
            let parts =
                ms.gdd_score + ms.frost_score + ms.precip_score + ms.extreme_temp_score;
            assert_relative_eq!(ms.score, parts, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_annual_forecast_complete() {
        let forecast = engine().annual_forecast("yeongju", 2023);
        assert_eq!(forecast.monthly_scores.len(), 12);
        assert_eq!(forecast.bloom_predictions.len(), PHENOLOGY_VARIETIES.len());
        assert_eq!(forecast.variety_risks.len(), PHENOLOGY_VARIETIES.len());
        assert!(forecast.yield_prediction.is_none());
        assert_eq!(forecast.data_source, ClimateSource::Synthetic);
        assert!((0.0..=100.0).contains(&forecast.overall_score));
        assert!(!forecast.recommendation.is_empty());
    }

    #[test]
    fn test_gdd_progress_monotone() {
        let progress = engine().gdd_progress("andong", 2023);
        assert_eq!(progress.daily_progress.len(), 365);
        assert!(progress
            .daily_progress
            .windows(2)
            .all(|w| w[1].accumulated >= w[0].accumulated));
        assert!(progress.current_gdd > 0.0);
    }

    #[test]
    fn test_train_requires_five_samples() {
        let eng = engine();
        let sample = TrainingSample {
            features: ClimateFeatures {
                total_gdd: 3200.0,
                frost_days: 100.0,
                bloom_frost_days: 1.0,
                heat_stress_days: 5.0,
                summer_rain_mm: 600.0,
                aug_night_temp: 20.0,
                bloom_date_doy: 110.0,
            },
            yield_kg_per_10a: 2400.0,
        };
        let err = eng.train_model("yeongju", &vec![sample; 4]).unwrap_err();
        assert!(err.to_string().contains("Insufficient"));
    }

    #[test]
    fn test_train_then_predict() {
        let eng = engine();
        // yield responds linearly to GDD in this synthetic history
        let samples: Vec<TrainingSample> = (0..8)
            .map(|i| {
                let gdd = 2800.0 + i as f64 * 100.0;
                TrainingSample {
                    features: ClimateFeatures {
                        total_gdd: gdd,
                        frost_days: 100.0 + i as f64,
                        bloom_frost_days: 1.0,
                        heat_stress_days: 5.0,
                        summer_rain_mm: 600.0,
                        aug_night_temp: 20.0,
                        bloom_date_doy: 110.0,
                    },
                    yield_kg_per_10a: 2000.0 + (gdd - 2800.0),
                }
            })
            .collect();
        let report = eng.train_model("yeongju", &samples).unwrap();
        assert_eq!(report.samples, 8);
        assert_eq!(report.weights.len(), 8);

        let forecast = eng.annual_forecast("yeongju", 2023);
        let pred = forecast.yield_prediction.expect("model was trained");
        assert_eq!(pred.model, "linear_regression");
        assert!(pred.predicted_yield_kg_per_10a.is_finite());
    }

    #[test]
    fn test_variety_risks_bands() {
        let eng = engine();
        let series = eng.climate.daily_series("yeongju", 2023);
        let risks = ForecastEngine::variety_risks(&series);
        for r in &risks {
            assert!((0.0..=100.0).contains(&r.overall_score));
        }
    }
}
