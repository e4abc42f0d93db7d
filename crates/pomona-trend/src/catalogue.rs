//! Variety catalogue and news-signal reference data
//!
//! Baseline trend figures per variety (market share, price and area trend,
//! nursery demand index) and the news-mention table. In production the
//! trend and news figures are refreshed by the external data collaborators;
//! these baselines are the documented fallback.

/// Baseline market metadata for one variety
#[derive(Debug, Clone)]
pub struct VarietyMeta {
    pub id: &'static str,
    pub name: &'static str,
    /// Share of national planted area, percent
    pub share_pct: f64,
    /// Three-month price trend, fractional
    pub price_trend: f64,
    /// Year-over-year planted-area trend, fractional
    pub area_trend: f64,
    /// Nursery demand index, 0-1
    pub seedling_demand: f64,
}

/// News-mention signal for one variety
#[derive(Debug, Clone)]
pub struct NewsSignal {
    pub mentions: u32,
    /// 0 (negative) to 1 (positive)
    pub sentiment: f64,
    pub note: &'static str,
}

/// The analyzed variety catalogue
pub const VARIETIES: [VarietyMeta; 15] = [
    VarietyMeta { id: "fuji", name: "Fuji", share_pct: 58.2, price_trend: -0.02, area_trend: -0.015, seedling_demand: 0.6 },
    VarietyMeta { id: "hongro", name: "Hongro", share_pct: 9.1, price_trend: 0.01, area_trend: 0.005, seedling_demand: 0.7 },
    VarietyMeta { id: "gamhong", name: "Gamhong", share_pct: 4.7, price_trend: 0.08, area_trend: 0.06, seedling_demand: 0.85 },
    VarietyMeta { id: "shinano-gold", name: "Shinano Gold", share_pct: 3.2, price_trend: 0.12, area_trend: 0.10, seedling_demand: 0.92 },
    VarietyMeta { id: "arisoo", name: "Arisoo", share_pct: 1.8, price_trend: 0.15, area_trend: 0.12, seedling_demand: 0.90 },
    VarietyMeta { id: "yanggwang", name: "Yanggwang", share_pct: 2.8, price_trend: -0.05, area_trend: -0.04, seedling_demand: 0.3 },
    VarietyMeta { id: "tsugaru", name: "Tsugaru", share_pct: 6.3, price_trend: -0.03, area_trend: -0.03, seedling_demand: 0.4 },
    VarietyMeta { id: "gala", name: "Gala", share_pct: 1.5, price_trend: 0.03, area_trend: 0.02, seedling_demand: 0.65 },
    VarietyMeta { id: "fuji-miyama", name: "Fuji Miyama", share_pct: 2.4, price_trend: 0.06, area_trend: 0.05, seedling_demand: 0.78 },
    VarietyMeta { id: "ruby-s", name: "Ruby S", share_pct: 0.4, price_trend: 0.18, area_trend: 0.15, seedling_demand: 0.95 },
    VarietyMeta { id: "summer-king", name: "Summer King", share_pct: 0.8, price_trend: 0.10, area_trend: 0.08, seedling_demand: 0.82 },
    VarietyMeta { id: "envy", name: "Envy", share_pct: 0.2, price_trend: 0.20, area_trend: 0.12, seedling_demand: 0.88 },
    VarietyMeta { id: "honeycrisp", name: "Honeycrisp", share_pct: 0.1, price_trend: 0.22, area_trend: 0.10, seedling_demand: 0.90 },
    VarietyMeta { id: "piknic", name: "Piknic", share_pct: 0.3, price_trend: 0.09, area_trend: 0.07, seedling_demand: 0.75 },
    VarietyMeta { id: "cosmic-crisp", name: "Cosmic Crisp", share_pct: 0.0, price_trend: 0.25, area_trend: 0.08, seedling_demand: 0.85 },
];

/// News-mention signal for a variety; sparse coverage gets a neutral
/// low-mention default.
pub fn news_signal(variety_id: &str) -> NewsSignal {
    match variety_id {
        "ruby-s" => NewsSignal { mentions: 45, sentiment: 0.85, note: "Premium segment growing fast, high-income farms converting" },
        "shinano-gold" => NewsSignal { mentions: 38, sentiment: 0.80, note: "Export demand strong, yellow-apple market expanding" },
        "arisoo" => NewsSignal { mentions: 32, sentiment: 0.78, note: "Domestic cultivar with subsidy support and no royalty" },
        "gamhong" => NewsSignal { mentions: 28, sentiment: 0.75, note: "Premium prices firm, steady gift-market demand" },
        "envy" => NewsSignal { mentions: 22, sentiment: 0.82, note: "Club variety, import-substitution attempts growing" },
        "honeycrisp" => NewsSignal { mentions: 20, sentiment: 0.80, note: "North American premium trend spreading" },
        "summer-king" => NewsSignal { mentions: 18, sentiment: 0.72, note: "Early-season market reshuffling, replacing Tsugaru" },
        "cosmic-crisp" => NewsSignal { mentions: 15, sentiment: 0.78, note: "Next-generation variety, trial plantings underway" },
        "fuji" => NewsSignal { mentions: 55, sentiment: 0.35, note: "Planted area shrinking on aging farms and labor costs" },
        "tsugaru" => NewsSignal { mentions: 12, sentiment: 0.30, note: "Losing early-season share to Gala and Summer King" },
        "yanggwang" => NewsSignal { mentions: 8, sentiment: 0.25, note: "Seen as a Fuji also-ran, differentiation failed" },
        _ => NewsSignal { mentions: 5, sentiment: 0.50, note: "" },
    }
}
