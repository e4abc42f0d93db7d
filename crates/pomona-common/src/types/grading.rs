//! Orchard site grading types
//!
//! A region is scored on five weighted climate factors and bucketed into
//! S/A/B/C suitability grades. Grades are recomputed from current climate
//! normals on every call and never persisted.

use serde::{Deserialize, Serialize};

/// Site suitability grade, from climate factors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrchardGrade {
    /// Prime site (score 90-100)
    S,
    /// Suitable (75-89)
    A,
    /// Average (60-74)
    B,
    /// Marginal (below 60)
    C,
}

impl OrchardGrade {
    /// Bucket a weighted total score into a grade
    pub fn from_score(score: f64) -> Self {
        if score >= 90.0 {
            OrchardGrade::S
        } else if score >= 75.0 {
            OrchardGrade::A
        } else if score >= 60.0 {
            OrchardGrade::B
        } else {
            OrchardGrade::C
        }
    }
}

impl std::fmt::Display for OrchardGrade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            OrchardGrade::S => "S",
            OrchardGrade::A => "A",
            OrchardGrade::B => "B",
            OrchardGrade::C => "C",
        };
        write!(f, "{}", s)
    }
}

/// One scored climate factor in a region evaluation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradeFactor {
    /// Factor name (e.g. "mean_annual_temp")
    pub name: String,
    /// Raw measured value the score was derived from
    pub raw_value: f64,
    /// Factor score, 0-100
    pub score: f64,
    /// Weight in the total, 0-1; the five weights sum to 1.0
    pub weight: f64,
    /// Human-readable context (value plus the optimal band)
    pub description: String,
}

/// Full grading result for a region
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionGrade {
    pub region_id: String,
    pub region_name: String,
    pub grade: OrchardGrade,
    /// Weighted sum of factor scores, 0-100
    pub total_score: f64,
    /// Exactly five factors
    pub factors: Vec<GradeFactor>,
}
