//! Simulation reference data
//!
//! Variety revenue scenarios (national-median yield, auction price, and
//! grade mix), the itemized per-10a cost table, and the orchard maturity
//! curve. Prices are auction prices in KRW; the farm-gate ratio is applied
//! at revenue time.
//!
//! The cost table is the 19-item list: the 16 conventional items plus the
//! three commonly omitted ones (pruning-waste disposal, machinery repair,
//! certification/administrative costs).

use pomona_common::{AppleGrade, CostCategory, GradeShare};

/// Per-variety revenue scenario
#[derive(Debug, Clone)]
pub struct VarietyScenario {
    pub id: &'static str,
    /// National-median mature yield (kg per 10a)
    pub yield_per_10a: f64,
    /// Auction price (KRW per kg, premium-grade basis)
    pub price_per_kg: f64,
    /// (grade, ratio, price multiplier); ratios sum to 1.0
    grades: [(AppleGrade, f64, f64); 4],
}

impl VarietyScenario {
    /// The scenario's grade mix as result-shaped shares
    pub fn grade_shares(&self) -> Vec<GradeShare> {
        self.grades
            .iter()
            .map(|&(grade, ratio, price_multiplier)| GradeShare {
                grade,
                ratio,
                price_multiplier,
            })
            .collect()
    }
}

const FUJI: VarietyScenario = VarietyScenario {
    id: "fuji",
    yield_per_10a: 2500.0,
    price_per_kg: 5500.0,
    grades: [
        (AppleGrade::Premium, 0.15, 1.0),
        (AppleGrade::Excellent, 0.35, 0.8),
        (AppleGrade::Standard, 0.35, 0.55),
        (AppleGrade::Substandard, 0.15, 0.25),
    ],
};

const HONGRO: VarietyScenario = VarietyScenario {
    id: "hongro",
    yield_per_10a: 2200.0,
    price_per_kg: 6000.0,
    grades: [
        (AppleGrade::Premium, 0.12, 1.0),
        (AppleGrade::Excellent, 0.33, 0.8),
        (AppleGrade::Standard, 0.35, 0.55),
        (AppleGrade::Substandard, 0.20, 0.25),
    ],
};

const GAMHONG: VarietyScenario = VarietyScenario {
    id: "gamhong",
    yield_per_10a: 1800.0,
    price_per_kg: 8000.0,
    grades: [
        (AppleGrade::Premium, 0.10, 1.0),
        (AppleGrade::Excellent, 0.30, 0.8),
        (AppleGrade::Standard, 0.35, 0.55),
        (AppleGrade::Substandard, 0.25, 0.25),
    ],
};

const ARISOO: VarietyScenario = VarietyScenario {
    id: "arisoo",
    yield_per_10a: 2300.0,
    price_per_kg: 5000.0,
    grades: [
        (AppleGrade::Premium, 0.15, 1.0),
        (AppleGrade::Excellent, 0.35, 0.8),
        (AppleGrade::Standard, 0.35, 0.55),
        (AppleGrade::Substandard, 0.15, 0.25),
    ],
};

const SHINANO_GOLD: VarietyScenario = VarietyScenario {
    id: "shinano-gold",
    yield_per_10a: 2000.0,
    price_per_kg: 6500.0,
    grades: [
        (AppleGrade::Premium, 0.12, 1.0),
        (AppleGrade::Excellent, 0.33, 0.8),
        (AppleGrade::Standard, 0.35, 0.55),
        (AppleGrade::Substandard, 0.20, 0.25),
    ],
};

const RUBY_S: VarietyScenario = VarietyScenario {
    id: "ruby-s",
    yield_per_10a: 2000.0,
    price_per_kg: 7000.0,
    grades: [
        (AppleGrade::Premium, 0.10, 1.0),
        (AppleGrade::Excellent, 0.30, 0.8),
        (AppleGrade::Standard, 0.35, 0.55),
        (AppleGrade::Substandard, 0.25, 0.25),
    ],
};

/// Scenario lookup; unknown varieties fall back to fuji.
pub fn scenario_for(variety: &str) -> &'static VarietyScenario {
    match variety {
        "fuji" => &FUJI,
        "hongro" => &HONGRO,
        "gamhong" => &GAMHONG,
        "arisoo" => &ARISOO,
        "shinano-gold" => &SHINANO_GOLD,
        "ruby-s" => &RUBY_S,
        _ => &FUJI,
    }
}

/// Annual cost items per 10a: (category, name, KRW)
pub const COST_ITEMS: [(CostCategory, &str, i64); 19] = [
    (CostCategory::Materials, "Fertilizer (base + top dressing)", 150_000),
    (CostCategory::Materials, "Compost", 200_000),
    (CostCategory::Materials, "Pesticide (fungicide + insecticide)", 350_000),
    (CostCategory::Materials, "Fruit bagging", 80_000),
    (CostCategory::Materials, "Reflective film and mulch", 60_000),
    (CostCategory::Materials, "Packaging and boxes", 120_000),
    (CostCategory::Labor, "Pruning", 200_000),
    (CostCategory::Labor, "Fruit thinning", 300_000),
    (CostCategory::Labor, "Spraying", 150_000),
    (CostCategory::Labor, "Harvest", 250_000),
    (CostCategory::Labor, "Other field work (irrigation, weeding)", 200_000),
    (CostCategory::Fixed, "Land lease", 300_000),
    (CostCategory::Fixed, "Machinery depreciation", 200_000),
    (CostCategory::Fixed, "Trellis and facilities", 100_000),
    (CostCategory::Fixed, "Fuel and electricity", 120_000),
    (CostCategory::Fixed, "Crop disaster insurance", 80_000),
    // costs routinely missing from naive estimates
    (CostCategory::Materials, "Pruning waste disposal", 40_000),
    (CostCategory::Fixed, "Machinery repair and servicing", 100_000),
    (CostCategory::Fixed, "Certification and administrative fees", 50_000),
];

/// Fraction of mature yield reached in a given orchard year.
/// Young trees produce nothing for two years, then ramp to full
/// production in year nine.
pub fn maturity_ratio(year: u32) -> f64 {
    match year {
        0 | 1 | 2 => 0.0,
        3 => 0.10,
        4 => 0.30,
        5 => 0.50,
        6 => 0.70,
        7 => 0.85,
        8 => 0.95,
        _ => 1.0,
    }
}

/// Cost never drops below this share of the mature-year cost: land,
/// spraying, and upkeep continue through the unproductive years.
pub const COST_FLOOR_RATIO: f64 = 0.70;

/// Multi-scenario comparison legs: (name, yield multiplier, price multiplier)
pub const COMPARE_SCENARIOS: [(&str, f64, f64); 3] = [
    ("optimistic", 1.15, 1.20),
    ("neutral", 1.00, 1.00),
    ("pessimistic", 0.80, 0.75),
];
