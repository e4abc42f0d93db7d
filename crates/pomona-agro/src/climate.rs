//! Climate normals and daily series supply
//!
//! Serves a 12-month climate-normal table per producing region (base table
//! plus an additive regional temperature offset) and a daily observation
//! series. The daily series comes from the collaborator-populated cache when
//! present; otherwise a deterministic synthetic year is generated from the
//! normals. The fallback contract is hard: every caller always receives a
//! valid 365-day series, and nothing here can fail a request.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use chrono::NaiveDate;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal, Uniform};
use serde::{Deserialize, Serialize};
use tracing::debug;

use pomona_common::storage::{read_doc, DocumentStore};
use pomona_common::{ClimateNormal, DailyClimateRecord};

/// The ten producing regions served by the platform, in catalogue order
pub const REGIONS: [&str; 10] = [
    "yeongju",
    "andong",
    "yeongcheon",
    "cheongsong",
    "mungyeong",
    "chungju",
    "jecheon",
    "geochang",
    "jangsu",
    "yesan",
];

/// Display name for a region id (falls back to the id itself)
pub fn region_name(region_id: &str) -> &str {
    match region_id {
        "yeongju" => "Yeongju",
        "andong" => "Andong",
        "yeongcheon" => "Yeongcheon",
        "cheongsong" => "Cheongsong",
        "mungyeong" => "Mungyeong",
        "chungju" => "Chungju",
        "jecheon" => "Jecheon",
        "geochang" => "Geochang",
        "jangsu" => "Jangsu",
        "yesan" => "Yesan",
        other => other,
    }
}

/// Observation-station id for a region, used to key the series cache
fn station_id(region_id: &str) -> Option<u32> {
    let id = match region_id {
        "yeongju" => 271,
        "andong" => 136,
        "yeongcheon" => 281,
        "cheongsong" => 277,
        "mungyeong" => 273,
        "chungju" => 131,
        "jecheon" => 221,
        "geochang" => 284,
        "jangsu" => 247,
        "yesan" => 232,
        _ => return None,
    };
    Some(id)
}

/// Regional temperature offset relative to the reference region (°C).
/// Unknown regions get 0.0; never an error.
fn region_offset(region_id: &str) -> f64 {
    match region_id {
        "yeongju" => 0.0,
        "andong" => 0.3,
        "yeongcheon" => 1.0,
        "cheongsong" => -0.5,
        "mungyeong" => 0.5,
        "chungju" => 0.8,
        "jecheon" => -0.3,
        "geochang" => 0.2,
        "jangsu" => -0.8,
        "yesan" => 1.2,
        _ => 0.0,
    }
}

// Reference-region monthly normals: (month, min °C, max °C, rainfall mm)
const BASE_NORMALS: [(u32, f64, f64, f64); 12] = [
    (1, -8.5, 2.5, 20.0),
    (2, -6.0, 5.5, 25.0),
    (3, -0.5, 12.0, 40.0),
    (4, 5.0, 19.5, 60.0),
    (5, 11.0, 25.0, 80.0),
    (6, 16.5, 28.5, 150.0),
    (7, 21.0, 30.5, 280.0),
    (8, 21.0, 31.0, 250.0),
    (9, 14.5, 26.5, 130.0),
    (10, 7.0, 20.5, 40.0),
    (11, 0.5, 12.0, 35.0),
    (12, -6.0, 4.0, 25.0),
];

// Non-leap month lengths; a synthetic or expanded year is always 365 days,
// the leap day is omitted.
const MONTH_DAYS: [u32; 12] = [31, 28, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31];

/// Where a daily series came from, reported for observability
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClimateSource {
    /// Collaborator-populated observation cache
    Cached,
    /// Deterministic synthesis from climate normals
    Synthetic,
}

/// Climate data supplier for the platform
pub struct ClimateService {
    cache: Arc<dyn DocumentStore>,
}

impl ClimateService {
    pub fn new(cache: Arc<dyn DocumentStore>) -> Self {
        Self { cache }
    }

    /// 12-entry monthly normals table for a region
    pub fn normals(&self, region_id: &str) -> Vec<ClimateNormal> {
        let offset = region_offset(region_id);
        BASE_NORMALS
            .iter()
            .map(|&(month, min, max, rain)| ClimateNormal {
                month,
                min_temp_c: min + offset,
                max_temp_c: max + offset,
                rainfall_mm: rain,
            })
            .collect()
    }

    /// Daily series for a region-year: cached observations when available,
    /// synthetic otherwise. Always a valid full-year series.
    pub fn daily_series(&self, region_id: &str, year: i32) -> Vec<DailyClimateRecord> {
        self.daily_series_with_source(region_id, year).0
    }

    /// Like [`daily_series`](Self::daily_series) but reports the source.
    pub fn daily_series_with_source(
        &self,
        region_id: &str,
        year: i32,
    ) -> (Vec<DailyClimateRecord>, ClimateSource) {
        if let Some(stn) = station_id(region_id) {
            let key = format!("asos_{}_{}", stn, year);
            if let Some(series) = read_doc::<Vec<DailyClimateRecord>>(self.cache.as_ref(), &key) {
                // partial years (mid-season cache writes) are not trusted
                if series.len() > 300 {
                    return (series, ClimateSource::Cached);
                }
                debug!(region_id, year, len = series.len(), "cached series too short, synthesizing");
            }
        }
        (self.synthetic_daily(region_id, year), ClimateSource::Synthetic)
    }

    /// Deterministic synthetic year from the region's normals.
    ///
    /// Temperatures are the month's normal plus Gaussian noise; rainfall is
    /// a Bernoulli draw with magnitude scaled to the monthly normal. The RNG
    /// is seeded from (region, year) so repeated calls and tests reproduce
    /// the same series.
    pub fn synthetic_daily(&self, region_id: &str, year: i32) -> Vec<DailyClimateRecord> {
        let normals = self.normals(region_id);
        let mut rng = StdRng::seed_from_u64(series_seed(region_id, year));
        let min_noise = Normal::new(0.0, 2.0).expect("valid stddev");
        let max_noise = Normal::new(0.0, 2.5).expect("valid stddev");

        let mut series = Vec::with_capacity(365);
        for normal in &normals {
            let days = MONTH_DAYS[(normal.month - 1) as usize];
            let rain_prob = (normal.rainfall_mm / (days as f64 * 15.0)).min(0.7);
            for day in 1..=days {
                let Some(date) = NaiveDate::from_ymd_opt(year, normal.month, day) else {
                    continue;
                };
                let min_temp = normal.min_temp_c + min_noise.sample(&mut rng);
                let mut max_temp = normal.max_temp_c + max_noise.sample(&mut rng);
                if max_temp <= min_temp {
                    max_temp = min_temp + 3.0;
                }

                let rainfall = if rng.gen::<f64>() < rain_prob {
                    let cap = (normal.rainfall_mm / 5.0).max(1.5);
                    Uniform::new(1.0, cap).sample(&mut rng)
                } else {
                    0.0
                };

                series.push(DailyClimateRecord::new(date, min_temp, max_temp, rainfall));
            }
        }
        series
    }

    /// Expand monthly normals into a pseudo-daily year: each day of a month
    /// carries the month's normal temperatures, with the monthly rainfall
    /// divided evenly across its days. Used by the grader so the phenology
    /// functions can run on normals.
    pub fn expand_normals_to_daily(normals: &[ClimateNormal]) -> Vec<DailyClimateRecord> {
        // reference year for date arithmetic only; non-leap
        let year = 2023;
        let mut series = Vec::with_capacity(365);
        for normal in normals {
            let days = MONTH_DAYS[(normal.month - 1) as usize];
            let daily_rain = normal.rainfall_mm / days as f64;
            for day in 1..=days {
                let Some(date) = NaiveDate::from_ymd_opt(year, normal.month, day) else {
                    continue;
                };
                series.push(DailyClimateRecord::new(
                    date,
                    normal.min_temp_c,
                    normal.max_temp_c,
                    daily_rain,
                ));
            }
        }
        series
    }
}

fn series_seed(region_id: &str, year: i32) -> u64 {
    let mut hasher = DefaultHasher::new();
    region_id.hash(&mut hasher);
    year.hash(&mut hasher);
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pomona_common::storage::JsonFileStore;

    fn service() -> ClimateService {
        let dir = std::env::temp_dir().join(format!("pomona-climate-{}", uuid::Uuid::new_v4()));
        ClimateService::new(Arc::new(JsonFileStore::new(dir).unwrap()))
    }

    #[test]
    fn test_normals_shape() {
        let svc = service();
        let normals = svc.normals("yeongju");
        assert_eq!(normals.len(), 12);
        let months: Vec<u32> = normals.iter().map(|n| n.month).collect();
        assert_eq!(months, (1..=12).collect::<Vec<u32>>());
    }

    #[test]
    fn test_region_offset_applied() {
        let svc = service();
        let base = svc.normals("yeongju");
        let warmer = svc.normals("yesan");
        for (b, w) in base.iter().zip(&warmer) {
            assert!((w.min_temp_c - b.min_temp_c - 1.2).abs() < 1e-9);
            assert_eq!(w.rainfall_mm, b.rainfall_mm);
        }
        // unknown region: zero offset, no failure
        let unknown = svc.normals("atlantis");
        assert_eq!(unknown[0].min_temp_c, base[0].min_temp_c);
    }

    #[test]
    fn test_synthetic_series_full_year() {
        let svc = service();
        let series = svc.synthetic_daily("andong", 2023);
        assert_eq!(series.len(), 365);
        assert_eq!(series[0].date, NaiveDate::from_ymd_opt(2023, 1, 1).unwrap());
        assert_eq!(
            series.last().unwrap().date,
            NaiveDate::from_ymd_opt(2023, 12, 31).unwrap()
        );
        for d in &series {
            assert!(d.max_temp_c > d.min_temp_c);
            assert!(d.rainfall_mm >= 0.0);
        }
    }

    #[test]
    fn test_synthetic_series_deterministic() {
        let svc = service();
        let a = svc.synthetic_daily("andong", 2023);
        let b = svc.synthetic_daily("andong", 2023);
        assert_eq!(a, b);
        // a different year produces a different draw
        let c = svc.synthetic_daily("andong", 2024);
        assert_ne!(a[..10], c[..10]);
    }

    #[test]
    fn test_daily_series_falls_back_to_synthetic() {
        let svc = service();
        let (series, source) = svc.daily_series_with_source("yeongju", 2023);
        assert_eq!(source, ClimateSource::Synthetic);
        assert_eq!(series.len(), 365);
    }

    #[test]
    fn test_daily_series_prefers_cache() {
        let dir = std::env::temp_dir().join(format!("pomona-climate-{}", uuid::Uuid::new_v4()));
        let store = Arc::new(JsonFileStore::new(dir).unwrap());
        let svc = ClimateService::new(store.clone());

        let cached = svc.synthetic_daily("yeongju", 2022);
        pomona_common::storage::replace_doc(store.as_ref(), "asos_271_2022", &cached).unwrap();

        let (series, source) = svc.daily_series_with_source("yeongju", 2022);
        assert_eq!(source, ClimateSource::Cached);
        assert_eq!(series, cached);
    }

    #[test]
    fn test_expand_normals_to_daily() {
        let svc = service();
        let normals = svc.normals("yeongju");
        let series = ClimateService::expand_normals_to_daily(&normals);
        assert_eq!(series.len(), 365);
        // January rainfall splits evenly
        let jan: Vec<&DailyClimateRecord> = series.iter().filter(|d| d.month() == 1).collect();
        assert_eq!(jan.len(), 31);
        let jan_total: f64 = jan.iter().map(|d| d.rainfall_mm).sum();
        assert!((jan_total - 20.0).abs() < 1e-6);
    }
}
