//! Growing-degree-day phenology calculations
//!
//! Pure, stateless functions over a daily climate series. Nothing here
//! performs I/O or fails: missing preconditions (heat never accumulating to
//! a bloom threshold, no August observations) surface as `None`, which is a
//! normal branch for downstream consumers.

use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use pomona_common::{DailyClimateRecord, PhenologyProfile, APPLE_BASE_TEMP_C};

/// Frost threshold used when none is given (°C)
pub const FROST_THRESHOLD_C: f64 = 0.0;

/// Daily max temperature above which a summer day counts as heat stress (°C)
pub const HEAT_STRESS_THRESHOLD_C: f64 = 33.0;

/// Months checked for heat stress
pub const HEAT_STRESS_MONTHS: [u32; 2] = [7, 8];

/// Months summed for the summer rain total
pub const SUMMER_MONTHS: [u32; 3] = [6, 7, 8];

/// Half-width of the bloom frost window (days either side of bloom)
pub const BLOOM_FROST_WINDOW_DAYS: i64 = 14;

/// Daily GDD contribution: max(0, (min+max)/2 - base)
pub fn daily_gdd(min_temp_c: f64, max_temp_c: f64, base_temp_c: f64) -> f64 {
    ((min_temp_c + max_temp_c) / 2.0 - base_temp_c).max(0.0)
}

/// Running GDD sum, one output per input day, same order
pub fn accumulated_gdd(series: &[DailyClimateRecord]) -> Vec<f64> {
    let mut total = 0.0;
    series
        .iter()
        .map(|d| {
            total += daily_gdd(d.min_temp_c, d.max_temp_c, APPLE_BASE_TEMP_C);
            total
        })
        .collect()
}

/// First date at which accumulated GDD reaches the variety's bloom
/// threshold. `None` means the series never accumulates enough heat.
pub fn predict_bloom_date(
    series: &[DailyClimateRecord],
    profile: &PhenologyProfile,
) -> Option<NaiveDate> {
    let mut total = 0.0;
    for d in series {
        total += daily_gdd(d.min_temp_c, d.max_temp_c, APPLE_BASE_TEMP_C);
        if total >= profile.bloom_gdd {
            return Some(d.date);
        }
    }
    None
}

/// Bloom date plus the variety's fixed bloom-to-harvest offset
pub fn predict_harvest_date(
    bloom_date: Option<NaiveDate>,
    profile: &PhenologyProfile,
) -> Option<NaiveDate> {
    bloom_date.map(|d| d + Duration::days(profile.days_bloom_to_harvest))
}

/// Days with minimum temperature at or below `threshold`
pub fn count_frost_days(series: &[DailyClimateRecord], threshold: f64) -> usize {
    series.iter().filter(|d| d.min_temp_c <= threshold).count()
}

/// Frost days within ±`window_days` of bloom. Frost during bloom is the
/// biologically critical window, so callers typically weight this count
/// separately from the season total. Returns 0 when bloom was never reached.
pub fn count_bloom_frost_days(
    series: &[DailyClimateRecord],
    bloom_date: Option<NaiveDate>,
    window_days: i64,
    threshold: f64,
) -> usize {
    let Some(bloom) = bloom_date else {
        return 0;
    };
    let start = bloom - Duration::days(window_days);
    let end = bloom + Duration::days(window_days);
    series
        .iter()
        .filter(|d| d.date >= start && d.date <= end && d.min_temp_c <= threshold)
        .count()
}

/// Days in the given months with maximum temperature above `threshold`
pub fn count_heat_stress_days(
    series: &[DailyClimateRecord],
    threshold: f64,
    months: &[u32],
) -> usize {
    series
        .iter()
        .filter(|d| months.contains(&d.month()) && d.max_temp_c > threshold)
        .count()
}

/// Total rainfall over the given months
pub fn summer_rain_total(series: &[DailyClimateRecord], months: &[u32]) -> f64 {
    series
        .iter()
        .filter(|d| months.contains(&d.month()))
        .map(|d| d.rainfall_mm)
        .sum()
}

/// Mean August minimum temperature — night temperature drives fruit
/// coloring. `None` when the series has no August data.
pub fn august_night_temp(series: &[DailyClimateRecord]) -> Option<f64> {
    let temps: Vec<f64> = series
        .iter()
        .filter(|d| d.month() == 8)
        .map(|d| d.min_temp_c)
        .collect();
    if temps.is_empty() {
        None
    } else {
        Some(temps.iter().sum::<f64>() / temps.len() as f64)
    }
}

/// Fixed-shape climate feature record for regression use
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClimateFeatures {
    pub total_gdd: f64,
    pub frost_days: f64,
    pub bloom_frost_days: f64,
    pub heat_stress_days: f64,
    pub summer_rain_mm: f64,
    pub aug_night_temp: f64,
    pub bloom_date_doy: f64,
}

/// Feature names, in the order produced by [`ClimateFeatures::to_vector`]
pub const FEATURE_NAMES: [&str; 7] = [
    "total_gdd",
    "frost_days",
    "bloom_frost_days",
    "heat_stress_days",
    "summer_rain_mm",
    "aug_night_temp",
    "bloom_date_doy",
];

impl ClimateFeatures {
    pub fn to_vector(&self) -> [f64; 7] {
        [
            self.total_gdd,
            self.frost_days,
            self.bloom_frost_days,
            self.heat_stress_days,
            self.summer_rain_mm,
            self.aug_night_temp,
            self.bloom_date_doy,
        ]
    }
}

/// Bundle the phenology aggregates into a feature record.
///
/// Absent values take fixed neutral defaults (20 °C August nights, day 110
/// bloom) so the feature vector always has the same shape.
pub fn extract_features(
    series: &[DailyClimateRecord],
    profile: &PhenologyProfile,
) -> ClimateFeatures {
    let bloom = predict_bloom_date(series, profile);
    let gdd = accumulated_gdd(series);

    ClimateFeatures {
        total_gdd: gdd.last().copied().unwrap_or(0.0),
        frost_days: count_frost_days(series, FROST_THRESHOLD_C) as f64,
        bloom_frost_days: count_bloom_frost_days(
            series,
            bloom,
            BLOOM_FROST_WINDOW_DAYS,
            FROST_THRESHOLD_C,
        ) as f64,
        heat_stress_days: count_heat_stress_days(
            series,
            HEAT_STRESS_THRESHOLD_C,
            &HEAT_STRESS_MONTHS,
        ) as f64,
        summer_rain_mm: summer_rain_total(series, &SUMMER_MONTHS),
        aug_night_temp: august_night_temp(series).unwrap_or(20.0),
        bloom_date_doy: bloom.map(|d| d.ordinal() as f64).unwrap_or(110.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use pomona_common::phenology_profile;
    use proptest::prelude::*;

    fn day(year: i32, month: u32, d: u32, min: f64, max: f64, rain: f64) -> DailyClimateRecord {
        DailyClimateRecord::new(
            NaiveDate::from_ymd_opt(year, month, d).unwrap(),
            min,
            max,
            rain,
        )
    }

    fn warm_series(days: u32) -> Vec<DailyClimateRecord> {
        // constant 10 GDD/day starting March 1
        let start = NaiveDate::from_ymd_opt(2023, 3, 1).unwrap();
        (0..days)
            .map(|i| {
                DailyClimateRecord::new(start + Duration::days(i as i64), 10.0, 20.0, 0.0)
            })
            .collect()
    }

    #[test]
    fn test_daily_gdd_zero_below_base() {
        assert_eq!(daily_gdd(-5.0, 10.0, 5.0), 0.0);
        assert_eq!(daily_gdd(0.0, 10.0, 5.0), 0.0);
        assert_relative_eq!(daily_gdd(10.0, 20.0, 5.0), 10.0);
    }

    #[test]
    fn test_accumulated_gdd_running_sum() {
        let series = warm_series(3);
        let acc = accumulated_gdd(&series);
        assert_eq!(acc, vec![10.0, 20.0, 30.0]);
    }

    #[test]
    fn test_bloom_date_at_threshold() {
        // fuji bloom at 350 GDD, 10/day -> day 35
        let series = warm_series(60);
        let bloom = predict_bloom_date(&series, phenology_profile("fuji")).unwrap();
        assert_eq!(bloom, NaiveDate::from_ymd_opt(2023, 4, 4).unwrap());
    }

    #[test]
    fn test_bloom_absent_when_heat_insufficient() {
        let series = warm_series(10);
        assert!(predict_bloom_date(&series, phenology_profile("fuji")).is_none());
        assert!(predict_harvest_date(None, phenology_profile("fuji")).is_none());
    }

    #[test]
    fn test_harvest_offset() {
        let bloom = NaiveDate::from_ymd_opt(2023, 4, 20).unwrap();
        let harvest = predict_harvest_date(Some(bloom), phenology_profile("gala")).unwrap();
        assert_eq!(harvest, bloom + Duration::days(120));
    }

    #[test]
    fn test_bloom_frost_window() {
        let mut series = warm_series(60);
        // a frost day 10 days after bloom (day 35 -> index 44)
        series[44].min_temp_c = -2.0;
        // and one far outside the window
        series[5].min_temp_c = -2.0;
        let bloom = predict_bloom_date(&series, phenology_profile("fuji"));
        let in_window = count_bloom_frost_days(&series, bloom, 14, 0.0);
        assert_eq!(in_window, 1);
        assert_eq!(count_bloom_frost_days(&series, None, 14, 0.0), 0);
    }

    #[test]
    fn test_heat_and_rain_aggregates() {
        let series = vec![
            day(2023, 7, 1, 24.0, 35.0, 10.0),
            day(2023, 7, 2, 23.0, 31.0, 0.0),
            day(2023, 8, 1, 24.0, 34.0, 20.0),
            day(2023, 9, 1, 18.0, 34.0, 5.0), // out of heat months
        ];
        assert_eq!(
            count_heat_stress_days(&series, HEAT_STRESS_THRESHOLD_C, &HEAT_STRESS_MONTHS),
            2
        );
        assert_relative_eq!(summer_rain_total(&series, &SUMMER_MONTHS), 30.0);
    }

    #[test]
    fn test_august_night_temp_absent_without_august() {
        let series = vec![day(2023, 7, 1, 20.0, 30.0, 0.0)];
        assert!(august_night_temp(&series).is_none());

        let series = vec![
            day(2023, 8, 1, 20.0, 30.0, 0.0),
            day(2023, 8, 2, 22.0, 31.0, 0.0),
        ];
        assert_relative_eq!(august_night_temp(&series).unwrap(), 21.0);
    }

    #[test]
    fn test_feature_defaults_on_empty_series() {
        let f = extract_features(&[], phenology_profile("fuji"));
        assert_eq!(f.total_gdd, 0.0);
        assert_eq!(f.aug_night_temp, 20.0);
        assert_eq!(f.bloom_date_doy, 110.0);
    }

    proptest! {
        #[test]
        fn prop_daily_gdd_non_negative(min in -40.0f64..20.0, max in -20.0f64..45.0) {
            prop_assert!(daily_gdd(min, max, APPLE_BASE_TEMP_C) >= 0.0);
        }

        #[test]
        fn prop_accumulated_gdd_non_decreasing(temps in proptest::collection::vec((-20.0f64..20.0, 0.0f64..25.0), 1..120)) {
            let start = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap();
            let series: Vec<DailyClimateRecord> = temps
                .iter()
                .enumerate()
                .map(|(i, (min, spread))| {
                    DailyClimateRecord::new(
                        start + Duration::days(i as i64),
                        *min,
                        *min + *spread,
                        0.0,
                    )
                })
                .collect();
            let acc = accumulated_gdd(&series);
            prop_assert!(acc.windows(2).all(|w| w[1] >= w[0]));
        }
    }
}
