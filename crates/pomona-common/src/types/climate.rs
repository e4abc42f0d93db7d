//! Climate observation records
//!
//! The platform consumes normalized daily weather series from the climate
//! collaborator (live, cached, or synthetic) and monthly climate normals.
//! Both shapes are fixed; "optional key with fallback" access patterns from
//! upstream APIs are resolved before these records are built.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// One day of observed (or synthesized) weather for a region
///
/// Immutable once produced. A full-year series covers exactly Jan 1 to
/// Dec 31 in order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyClimateRecord {
    /// Calendar date of the observation
    pub date: NaiveDate,
    /// Daily minimum temperature (°C)
    pub min_temp_c: f64,
    /// Daily maximum temperature (°C)
    pub max_temp_c: f64,
    /// Daily precipitation (mm)
    pub rainfall_mm: f64,
}

impl DailyClimateRecord {
    pub fn new(date: NaiveDate, min_temp_c: f64, max_temp_c: f64, rainfall_mm: f64) -> Self {
        Self {
            date,
            min_temp_c,
            max_temp_c,
            rainfall_mm,
        }
    }

    /// Daily mean temperature, the driver for degree-day accumulation
    pub fn mean_temp_c(&self) -> f64 {
        (self.min_temp_c + self.max_temp_c) / 2.0
    }

    /// Calendar month (1-12)
    pub fn month(&self) -> u32 {
        self.date.month()
    }
}

/// Monthly climate normal for a region
///
/// Exactly 12 entries per region, months 1-12 each present once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClimateNormal {
    /// Month (1-12)
    pub month: u32,
    /// Mean daily minimum temperature for the month (°C)
    pub min_temp_c: f64,
    /// Mean daily maximum temperature for the month (°C)
    pub max_temp_c: f64,
    /// Total monthly precipitation (mm)
    pub rainfall_mm: f64,
}

impl ClimateNormal {
    /// Mean temperature of the month
    pub fn mean_temp_c(&self) -> f64 {
        (self.min_temp_c + self.max_temp_c) / 2.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean_temp() {
        let rec = DailyClimateRecord::new(
            NaiveDate::from_ymd_opt(2023, 4, 15).unwrap(),
            5.0,
            19.0,
            0.0,
        );
        assert_eq!(rec.mean_temp_c(), 12.0);
        assert_eq!(rec.month(), 4);
    }
}
