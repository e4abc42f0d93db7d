//! Climate-based orchard site grading
//!
//! Five weighted factors, each scored on a Gaussian curve centered on the
//! published optimum for apple cultivation:
//!
//! | factor                | optimum | weight |
//! |-----------------------|---------|--------|
//! | mean annual temp      | 11.5 °C | 0.25   |
//! | accumulated GDD       | 3200    | 0.25   |
//! | frost-free days       | ≥190 d  | 0.20   |
//! | annual rainfall       | 1050 mm | 0.15   |
//! | August night temp     | 19 °C   | 0.15   |
//!
//! Grades are recomputed from the current normals on every call; there is
//! no error path (an unknown region grades with the zero-offset normals).

use std::sync::Arc;

use tracing::instrument;

use pomona_common::{GradeFactor, OrchardGrade, RegionGrade};

use crate::climate::{region_name, ClimateService, REGIONS};
use crate::phenology::{
    accumulated_gdd, august_night_temp, count_frost_days, FROST_THRESHOLD_C,
};

/// Continuous 0-100 score from a Gaussian curve: 100 at `optimal`, ~60 one
/// sigma away.
fn gaussian_score(value: f64, optimal: f64, sigma: f64) -> f64 {
    100.0 * (-0.5 * ((value - optimal) / sigma).powi(2)).exp()
}

fn score_mean_temp(mean_temp_c: f64) -> f64 {
    gaussian_score(mean_temp_c, 11.5, 1.5)
}

fn score_gdd(total_gdd: f64) -> f64 {
    gaussian_score(total_gdd, 3200.0, 300.0)
}

/// Frost-free day score. 190+ days is ample growing season; the slow
/// penalty above 190 reflects chilling-requirement concerns in very warm
/// sites, the steep penalty below reflects a season too short to mature
/// fruit.
fn score_frost_free_days(frost_days: usize) -> f64 {
    let frost_free = 365 - frost_days as i64;
    if frost_free >= 190 {
        let excess = (frost_free - 190) as f64;
        (100.0 - excess * 0.3).max(60.0)
    } else {
        let deficit = (190 - frost_free) as f64;
        (100.0 - deficit * 2.0).max(10.0)
    }
}

fn score_annual_rainfall(rainfall_mm: f64) -> f64 {
    gaussian_score(rainfall_mm, 1050.0, 250.0)
}

/// August night temperature drives coloring; absent data scores neutral.
fn score_aug_night_temp(temp_c: Option<f64>) -> f64 {
    match temp_c {
        Some(t) => gaussian_score(t, 19.0, 2.0),
        None => 50.0,
    }
}

/// Five-factor site grading service
pub struct OrchardGrader {
    climate: Arc<ClimateService>,
}

impl OrchardGrader {
    pub fn new(climate: Arc<ClimateService>) -> Self {
        Self { climate }
    }

    /// Grade a single region from its climate normals.
    #[instrument(skip(self))]
    pub fn grade_region(&self, region_id: &str) -> RegionGrade {
        let normals = self.climate.normals(region_id);
        let daily = ClimateService::expand_normals_to_daily(&normals);

        let mean_temp =
            normals.iter().map(|n| n.mean_temp_c()).sum::<f64>() / normals.len() as f64;
        let mean_temp_score = score_mean_temp(mean_temp);

        let gdd = accumulated_gdd(&daily);
        let total_gdd = gdd.last().copied().unwrap_or(0.0);
        let gdd_score = score_gdd(total_gdd);

        let frost_days = count_frost_days(&daily, FROST_THRESHOLD_C);
        let frost_free = 365 - frost_days as i64;
        let frost_score = score_frost_free_days(frost_days);

        let annual_rain: f64 = normals.iter().map(|n| n.rainfall_mm).sum();
        let rain_score = score_annual_rainfall(annual_rain);

        let aug_night = august_night_temp(&daily);
        let aug_score = score_aug_night_temp(aug_night);

        let factors = vec![
            GradeFactor {
                name: "mean_annual_temp".to_string(),
                raw_value: mean_temp,
                score: mean_temp_score,
                weight: 0.25,
                description: format!("{:.1} °C (optimal 11-13 °C)", mean_temp),
            },
            GradeFactor {
                name: "total_gdd".to_string(),
                raw_value: total_gdd,
                score: gdd_score,
                weight: 0.25,
                description: format!("{:.0} GDD (optimal 3000-3500)", total_gdd),
            },
            GradeFactor {
                name: "frost_free_days".to_string(),
                raw_value: frost_free as f64,
                score: frost_score,
                weight: 0.20,
                description: format!("{} days ({} frost days)", frost_free, frost_days),
            },
            GradeFactor {
                name: "annual_rainfall".to_string(),
                raw_value: annual_rain,
                score: rain_score,
                weight: 0.15,
                description: format!("{:.0} mm (optimal 800-1300 mm)", annual_rain),
            },
            GradeFactor {
                name: "august_night_temp".to_string(),
                raw_value: aug_night.unwrap_or(0.0),
                score: aug_score,
                weight: 0.15,
                description: match aug_night {
                    Some(t) => format!("{:.1} °C (optimal 18-20 °C)", t),
                    None => "no August data (neutral score)".to_string(),
                },
            },
        ];

        let total_score: f64 = factors.iter().map(|f| f.score * f.weight).sum();

        RegionGrade {
            region_id: region_id.to_string(),
            region_name: region_name(region_id).to_string(),
            grade: OrchardGrade::from_score(total_score),
            total_score,
            factors,
        }
    }

    /// Grade every catalogued producing region.
    pub fn grade_all(&self) -> Vec<RegionGrade> {
        REGIONS.iter().map(|r| self.grade_region(r)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use pomona_common::storage::JsonFileStore;

    fn grader() -> OrchardGrader {
        let dir = std::env::temp_dir().join(format!("pomona-grader-{}", uuid::Uuid::new_v4()));
        let climate = Arc::new(ClimateService::new(Arc::new(
            JsonFileStore::new(dir).unwrap(),
        )));
        OrchardGrader::new(climate)
    }

    #[test]
    fn test_gaussian_score_shape() {
        assert_relative_eq!(gaussian_score(11.5, 11.5, 1.5), 100.0);
        let one_sigma = gaussian_score(13.0, 11.5, 1.5);
        assert!((60.0..62.0).contains(&one_sigma));
    }

    #[test]
    fn test_frost_free_piecewise() {
        // 244 frost-free days: 100 - 54*0.3
        assert_relative_eq!(score_frost_free_days(121), 83.8, epsilon = 1e-9);
        // long warm season floors at 60
        assert_relative_eq!(score_frost_free_days(0), 60.0);
        // short season: 180 free days -> 100 - 10*2
        assert_relative_eq!(score_frost_free_days(185), 80.0);
        // very short floors at 10
        assert_relative_eq!(score_frost_free_days(300), 10.0);
    }

    #[test]
    fn test_missing_august_scores_neutral() {
        assert_eq!(score_aug_night_temp(None), 50.0);
        assert_relative_eq!(score_aug_night_temp(Some(19.0)), 100.0);
    }

    #[test]
    fn test_grade_region_invariants() {
        let grade = grader().grade_region("yeongju");
        assert_eq!(grade.factors.len(), 5);

        let weight_sum: f64 = grade.factors.iter().map(|f| f.weight).sum();
        assert!((weight_sum - 1.0).abs() < 1e-6);

        let weighted: f64 = grade.factors.iter().map(|f| f.score * f.weight).sum();
        assert_relative_eq!(grade.total_score, weighted, epsilon = 1e-9);
        assert!((0.0..=100.0).contains(&grade.total_score));
    }

    #[test]
    fn test_reference_region_grades_well() {
        // the reference producing region should sit comfortably in the
        // A band with the compiled-in normals
        let grade = grader().grade_region("yeongju");
        assert!(grade.total_score > 75.0, "score {}", grade.total_score);
        assert!(matches!(
            grade.grade,
            OrchardGrade::S | OrchardGrade::A
        ));
    }

    #[test]
    fn test_grade_all_covers_catalogue() {
        let grades = grader().grade_all();
        assert_eq!(grades.len(), REGIONS.len());
    }

    #[test]
    fn test_unknown_region_does_not_fail() {
        let grade = grader().grade_region("atlantis");
        assert_eq!(grade.factors.len(), 5);
        assert_eq!(grade.region_name, "atlantis");
    }
}
