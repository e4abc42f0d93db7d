//! Rule-based price and weather anomaly detection
//!
//! Detected anomalies feed two consumers: the alert surface, and the
//! evolution engine, which reads recent alerts as one of its adjustment
//! signals. Alerts live in a bounded in-memory ring and are appended to a
//! durable log.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use chrono::Utc;
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::json;
use tracing::warn;

use pomona_common::storage::{append_record, AppendLog};
use pomona_common::{AnomalyAlert, AnomalyCategory, AnomalySeverity};

/// Day-over-day price change considered anomalous (percent)
pub const PRICE_CHANGE_PCT: f64 = 20.0;
/// Frost-damage temperature threshold (°C)
pub const TEMP_LOW_C: f64 = -5.0;
/// Heat-damage temperature threshold (°C)
pub const TEMP_HIGH_C: f64 = 38.0;
/// Downpour threshold (mm per hour)
pub const RAIN_HOURLY_MM: f64 = 30.0;
/// Gale threshold (m/s)
pub const WIND_SPEED_MS: f64 = 14.0;

/// Alerts retained in memory
const MAX_ALERTS: usize = 200;

#[derive(Default)]
struct DetectorState {
    alerts: VecDeque<AnomalyAlert>,
    /// variety -> last observed price
    last_prices: HashMap<String, f64>,
}

/// Aggregate alert statistics
#[derive(Debug, Clone, Serialize)]
pub struct AnomalyStats {
    pub total_alerts: usize,
    pub price_alerts: usize,
    pub weather_alerts: usize,
    pub critical_alerts: usize,
}

/// Rule-based anomaly detector
pub struct AnomalyDetector {
    log: Arc<dyn AppendLog>,
    state: Mutex<DetectorState>,
}

impl AnomalyDetector {
    pub fn new(log: Arc<dyn AppendLog>) -> Self {
        Self {
            log,
            state: Mutex::new(DetectorState::default()),
        }
    }

    /// Check a price observation against the previous one for the same
    /// variety. Returns any alerts raised.
    pub fn check_price(&self, variety: &str, price: f64, date: &str) -> Vec<AnomalyAlert> {
        let prev = {
            let mut state = self.state.lock();
            let prev = state.last_prices.get(variety).copied();
            state.last_prices.insert(variety.to_string(), price);
            prev
        };

        let mut alerts = Vec::new();
        if let Some(prev) = prev.filter(|p| *p > 0.0) {
            let change_pct = (price - prev) / prev * 100.0;
            if change_pct.abs() >= PRICE_CHANGE_PCT {
                let direction = if change_pct > 0.0 { "surge" } else { "drop" };
                let severity = if change_pct.abs() < 40.0 {
                    AnomalySeverity::Warning
                } else {
                    AnomalySeverity::Critical
                };
                alerts.push(self.raise(
                    AnomalyCategory::Price,
                    severity,
                    format!(
                        "{} price {}: {:.0} -> {:.0} KRW/kg ({:+.1}%)",
                        variety, direction, prev, price, change_pct
                    ),
                    json!({
                        "variety": variety,
                        "prev": prev,
                        "current": price,
                        "change_pct": change_pct,
                        "date": date,
                    }),
                ));
            }
        }
        alerts
    }

    /// Check one weather observation. Returns any alerts raised.
    pub fn check_weather(
        &self,
        temp_c: f64,
        rain_mm: f64,
        wind_ms: f64,
        region: &str,
    ) -> Vec<AnomalyAlert> {
        let mut alerts = Vec::new();

        if temp_c <= TEMP_LOW_C {
            alerts.push(self.raise(
                AnomalyCategory::Weather,
                AnomalySeverity::Critical,
                format!("frost damage risk: {} at {:.1} °C", region, temp_c),
                json!({"type": "frost", "temp_c": temp_c, "region": region}),
            ));
        } else if temp_c >= TEMP_HIGH_C {
            alerts.push(self.raise(
                AnomalyCategory::Weather,
                AnomalySeverity::Warning,
                format!("heat damage watch: {} at {:.1} °C", region, temp_c),
                json!({"type": "heat", "temp_c": temp_c, "region": region}),
            ));
        }

        if rain_mm >= RAIN_HOURLY_MM {
            let severity = if rain_mm >= 50.0 {
                AnomalySeverity::Critical
            } else {
                AnomalySeverity::Warning
            };
            alerts.push(self.raise(
                AnomalyCategory::Weather,
                severity,
                format!("downpour: {} at {:.0} mm/h", region, rain_mm),
                json!({"type": "heavy_rain", "rain_mm": rain_mm, "region": region}),
            ));
        }

        if wind_ms >= WIND_SPEED_MS {
            let severity = if wind_ms >= 20.0 {
                AnomalySeverity::Critical
            } else {
                AnomalySeverity::Warning
            };
            alerts.push(self.raise(
                AnomalyCategory::Weather,
                severity,
                format!("gale watch: {} at {:.0} m/s", region, wind_ms),
                json!({"type": "strong_wind", "wind_ms": wind_ms, "region": region}),
            ));
        }

        alerts
    }

    /// Most recent alerts, optionally filtered by category.
    pub fn alerts(&self, limit: usize, category: Option<AnomalyCategory>) -> Vec<AnomalyAlert> {
        let state = self.state.lock();
        let filtered: Vec<AnomalyAlert> = state
            .alerts
            .iter()
            .filter(|a| category.map(|c| a.category == c).unwrap_or(true))
            .cloned()
            .collect();
        let skip = filtered.len().saturating_sub(limit);
        filtered.into_iter().skip(skip).collect()
    }

    pub fn stats(&self) -> AnomalyStats {
        let state = self.state.lock();
        AnomalyStats {
            total_alerts: state.alerts.len(),
            price_alerts: state
                .alerts
                .iter()
                .filter(|a| a.category == AnomalyCategory::Price)
                .count(),
            weather_alerts: state
                .alerts
                .iter()
                .filter(|a| a.category == AnomalyCategory::Weather)
                .count(),
            critical_alerts: state
                .alerts
                .iter()
                .filter(|a| a.severity == AnomalySeverity::Critical)
                .count(),
        }
    }

    fn raise(
        &self,
        category: AnomalyCategory,
        severity: AnomalySeverity,
        message: String,
        data: serde_json::Value,
    ) -> AnomalyAlert {
        let alert = AnomalyAlert {
            timestamp: Utc::now().timestamp_millis(),
            category,
            severity,
            message,
            data,
        };

        {
            let mut state = self.state.lock();
            state.alerts.push_back(alert.clone());
            while state.alerts.len() > MAX_ALERTS {
                state.alerts.pop_front();
            }
        }
        if let Err(e) = append_record(self.log.as_ref(), &alert) {
            warn!(error = %e, "failed to append anomaly alert, continuing");
        }

        match alert.severity {
            AnomalySeverity::Critical => {
                tracing::error!(category = ?alert.category, "{}", alert.message)
            }
            AnomalySeverity::Warning => {
                tracing::warn!(category = ?alert.category, "{}", alert.message)
            }
        }
        alert
    }
}
