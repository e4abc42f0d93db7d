//! Per-variety phenology reference data
//!
//! Growth-stage thresholds in growing-degree-day (GDD) units, plus stress
//! sensitivities. Values follow the published apple cultivation references
//! used across the platform; base temperature for apple is 5.0 °C.

use serde::{Deserialize, Serialize};

/// Static phenology profile for an apple variety
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhenologyProfile {
    /// Accumulated GDD at which bloom begins
    pub bloom_gdd: f64,
    /// Accumulated GDD at full bloom
    pub full_bloom_gdd: f64,
    /// Days from bloom to harvest maturity
    pub days_bloom_to_harvest: i64,
    /// Frost sensitivity, 0 (tolerant) to 1 (highly sensitive)
    pub frost_sensitivity: f64,
    /// Heat tolerance, 0 (intolerant) to 1 (tolerant)
    pub heat_tolerance: f64,
}

/// Varieties with a phenology profile, in catalogue order
pub const PHENOLOGY_VARIETIES: [&str; 6] =
    ["fuji", "hongro", "gala", "yanggwang", "arisoo", "gamhong"];

static FUJI: PhenologyProfile = PhenologyProfile {
    bloom_gdd: 350.0,
    full_bloom_gdd: 420.0,
    days_bloom_to_harvest: 170,
    frost_sensitivity: 0.8,
    heat_tolerance: 0.5,
};

static HONGRO: PhenologyProfile = PhenologyProfile {
    bloom_gdd: 320.0,
    full_bloom_gdd: 390.0,
    days_bloom_to_harvest: 130,
    frost_sensitivity: 0.7,
    heat_tolerance: 0.6,
};

static GALA: PhenologyProfile = PhenologyProfile {
    bloom_gdd: 300.0,
    full_bloom_gdd: 370.0,
    days_bloom_to_harvest: 120,
    frost_sensitivity: 0.6,
    heat_tolerance: 0.7,
};

static YANGGWANG: PhenologyProfile = PhenologyProfile {
    bloom_gdd: 330.0,
    full_bloom_gdd: 400.0,
    days_bloom_to_harvest: 140,
    frost_sensitivity: 0.75,
    heat_tolerance: 0.55,
};

static ARISOO: PhenologyProfile = PhenologyProfile {
    bloom_gdd: 310.0,
    full_bloom_gdd: 380.0,
    days_bloom_to_harvest: 135,
    frost_sensitivity: 0.5,
    heat_tolerance: 0.8,
};

static GAMHONG: PhenologyProfile = PhenologyProfile {
    bloom_gdd: 340.0,
    full_bloom_gdd: 410.0,
    days_bloom_to_harvest: 150,
    frost_sensitivity: 0.65,
    heat_tolerance: 0.65,
};

/// Look up the phenology profile for a variety.
///
/// Unknown varieties fall back to fuji, the dominant cultivar. This is a
/// normal branch, not an error.
pub fn phenology_profile(variety: &str) -> &'static PhenologyProfile {
    match variety {
        "fuji" => &FUJI,
        "hongro" => &HONGRO,
        "gala" => &GALA,
        "yanggwang" => &YANGGWANG,
        "arisoo" => &ARISOO,
        "gamhong" => &GAMHONG,
        _ => &FUJI,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_variety() {
        let p = phenology_profile("hongro");
        assert_eq!(p.bloom_gdd, 320.0);
        assert_eq!(p.days_bloom_to_harvest, 130);
    }

    #[test]
    fn test_unknown_variety_falls_back_to_fuji() {
        assert_eq!(phenology_profile("granny-smith"), &FUJI);
    }

    #[test]
    fn test_sensitivities_in_unit_range() {
        for v in PHENOLOGY_VARIETIES {
            let p = phenology_profile(v);
            assert!((0.0..=1.0).contains(&p.frost_sensitivity));
            assert!((0.0..=1.0).contains(&p.heat_tolerance));
        }
    }
}
