//! # Pomona Trend
//!
//! Market-momentum ranking for apple varieties. Four independent 0-25
//! signals (auction price change, cultivated-area change, news mentions
//! weighted by sentiment, nursery seedling demand) combine into a 0-100
//! composite and a HOT / RISING / WATCH / STABLE / DECLINING grade.
//!
//! Purely a read-time computation over the variety catalogue: nothing is
//! persisted and no state is shared with the simulation loop. Market noise
//! is drawn from a seeded RNG so a report is reproducible for a given seed
//! (the default seed changes daily).

pub mod catalogue;

use chrono::Utc;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use catalogue::{news_signal, VarietyMeta, VARIETIES};

/// Relative strength of one signal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalStrength {
    Weak,
    Moderate,
    Strong,
}

/// One scored market signal
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendSignal {
    /// Data source ("kamis", "kosis", "news", "seedling")
    pub source: &'static str,
    pub signal_type: &'static str,
    pub variety: String,
    /// Source-native value (percent change, demand index, ...)
    pub value: f64,
    pub description: String,
    pub strength: SignalStrength,
    /// Contribution to the composite, 0-25
    pub score: f64,
}

/// Momentum grade from the composite score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TrendGrade {
    Hot,
    Rising,
    Watch,
    Stable,
    Declining,
}

impl TrendGrade {
    fn from_score(score: f64) -> Self {
        if score >= 80.0 {
            TrendGrade::Hot
        } else if score >= 60.0 {
            TrendGrade::Rising
        } else if score >= 40.0 {
            TrendGrade::Watch
        } else if score >= 20.0 {
            TrendGrade::Stable
        } else {
            TrendGrade::Declining
        }
    }
}

/// One ranked variety with its signals
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VarietyTrend {
    pub variety_id: String,
    pub variety: String,
    pub composite_score: f64,
    /// 1-based rank, best first
    pub rank: u32,
    pub grade: TrendGrade,
    pub signals: Vec<TrendSignal>,
    pub summary: String,
    pub actionable_insight: String,
}

/// Full momentum report, best-ranked first
#[derive(Debug, Clone, Serialize)]
pub struct TrendReport {
    /// Unix milliseconds
    pub generated_at: i64,
    pub data_freshness: String,
    pub total_varieties_analyzed: usize,
    pub varieties: Vec<VarietyTrend>,
    pub market_summary: String,
}

impl TrendReport {
    pub fn with_grade(&self, grade: TrendGrade) -> Vec<&VarietyTrend> {
        self.varieties.iter().filter(|v| v.grade == grade).collect()
    }
}

/// Stateless trend detector
pub struct TrendDetector;

impl TrendDetector {
    pub fn new() -> Self {
        Self
    }

    /// Report with the default daily seed.
    #[instrument(skip(self))]
    pub fn report(&self) -> TrendReport {
        // one seed per calendar day keeps intraday reads stable
        let day = Utc::now().timestamp() / 86_400;
        self.report_with_seed(day as u64)
    }

    /// Report with an explicit noise seed (reproducible).
    pub fn report_with_seed(&self, seed: u64) -> TrendReport {
        let mut rng = StdRng::seed_from_u64(seed);

        let mut varieties: Vec<VarietyTrend> = VARIETIES
            .iter()
            .map(|meta| score_variety(meta, &mut rng))
            .collect();

        varieties.sort_by(|a, b| {
            b.composite_score
                .partial_cmp(&a.composite_score)
                .expect("scores are finite")
        });
        for (i, v) in varieties.iter_mut().enumerate() {
            v.rank = i as u32 + 1;
        }

        let market_summary = build_market_summary(&varieties);

        TrendReport {
            generated_at: Utc::now().timestamp_millis(),
            data_freshness: "auction 3h / area monthly / news daily / nursery weekly".to_string(),
            total_varieties_analyzed: varieties.len(),
            varieties,
            market_summary,
        }
    }

    /// Trend detail for one variety, if catalogued.
    pub fn variety_trend(&self, variety_id: &str) -> Option<VarietyTrend> {
        let report = self.report();
        report
            .varieties
            .into_iter()
            .find(|v| v.variety_id == variety_id)
    }
}

impl Default for TrendDetector {
    fn default() -> Self {
        Self::new()
    }
}

fn score_variety(meta: &VarietyMeta, rng: &mut StdRng) -> VarietyTrend {
    let price = price_signal(meta, rng);
    let area = area_signal(meta, rng);
    let news = news_score_signal(meta);
    let seedling = seedling_signal(meta, rng);

    let composite = (price.score + area.score + news.score + seedling.score).clamp(0.0, 100.0);
    let grade = TrendGrade::from_score(composite);
    let signals = vec![price, area, news, seedling];

    let summary = build_summary(meta, grade, &signals);
    let actionable_insight = build_insight(meta, grade);

    VarietyTrend {
        variety_id: meta.id.to_string(),
        variety: meta.name.to_string(),
        composite_score: composite,
        rank: 0,
        grade,
        signals,
        summary,
        actionable_insight,
    }
}

/// Auction price momentum: -10% maps to 0, +20% to 25.
fn price_signal(meta: &VarietyMeta, rng: &mut StdRng) -> TrendSignal {
    let noise = rng.gen_range(-0.02..0.02);
    let actual = meta.price_trend + noise;
    let score = ((actual + 0.10) / 0.30 * 25.0).clamp(0.0, 25.0);

    let (strength, description) = if actual >= 0.15 {
        (
            SignalStrength::Strong,
            format!("price {:+.1}% surge over three months", actual * 100.0),
        )
    } else if actual >= 0.05 {
        (
            SignalStrength::Moderate,
            format!("price {:+.1}% upward trend", actual * 100.0),
        )
    } else if actual >= -0.03 {
        (
            SignalStrength::Weak,
            format!("price {:+.1}% flat", actual * 100.0),
        )
    } else {
        (
            SignalStrength::Weak,
            format!("price {:+.1}% declining", actual * 100.0),
        )
    };

    TrendSignal {
        source: "kamis",
        signal_type: "price_change",
        variety: meta.name.to_string(),
        value: actual * 100.0,
        description,
        strength,
        score,
    }
}

/// Cultivated-area momentum: -5% maps to 0, +15% to 25.
fn area_signal(meta: &VarietyMeta, rng: &mut StdRng) -> TrendSignal {
    let noise = rng.gen_range(-0.01..0.01);
    let actual = meta.area_trend + noise;
    let score = ((actual + 0.05) / 0.20 * 25.0).clamp(0.0, 25.0);

    let (strength, description) = if actual >= 0.10 {
        (
            SignalStrength::Strong,
            format!("planted area {:+.1}% expansion year over year", actual * 100.0),
        )
    } else if actual >= 0.03 {
        (
            SignalStrength::Moderate,
            format!("planted area {:+.1}% growth", actual * 100.0),
        )
    } else if actual >= -0.02 {
        (
            SignalStrength::Weak,
            format!("planted area {:+.1}% holding", actual * 100.0),
        )
    } else {
        (
            SignalStrength::Weak,
            format!("planted area {:+.1}% shrinking", actual * 100.0),
        )
    };

    TrendSignal {
        source: "kosis",
        signal_type: "area_change",
        variety: meta.name.to_string(),
        value: actual * 100.0,
        description,
        strength,
        score,
    }
}

/// Mention frequency weighted by sentiment: 50+ monthly mentions at full
/// positive sentiment maps to 25.
fn news_score_signal(meta: &VarietyMeta) -> TrendSignal {
    let news = news_signal(meta.id);
    let raw = (news.mentions.min(50) as f64 / 50.0) * news.sentiment;
    let score = raw * 25.0;

    let (strength, description) = if score >= 18.0 {
        (
            SignalStrength::Strong,
            format!(
                "high press attention ({} mentions/month, {:.0}% positive)",
                news.mentions,
                news.sentiment * 100.0
            ),
        )
    } else if score >= 10.0 {
        (
            SignalStrength::Moderate,
            format!("growing industry interest ({} mentions/month)", news.mentions),
        )
    } else {
        (
            SignalStrength::Weak,
            format!("little coverage ({} mentions/month)", news.mentions),
        )
    };

    TrendSignal {
        source: "news",
        signal_type: "mention_frequency",
        variety: meta.name.to_string(),
        value: score,
        description,
        strength,
        score,
    }
}

/// Nursery demand index, 0 (no demand) to 1 (oversubscribed), maps to 0-25.
fn seedling_signal(meta: &VarietyMeta, rng: &mut StdRng) -> TrendSignal {
    let noise = rng.gen_range(-0.05..0.05);
    let actual = (meta.seedling_demand + noise).clamp(0.0, 1.0);
    let score = actual * 25.0;

    let (strength, description) = if actual >= 0.85 {
        (
            SignalStrength::Strong,
            format!("seedling demand surging (index {:.2}), frequent sell-outs", actual),
        )
    } else if actual >= 0.65 {
        (
            SignalStrength::Moderate,
            format!("seedling demand rising (index {:.2})", actual),
        )
    } else if actual >= 0.40 {
        (
            SignalStrength::Weak,
            format!("seedling demand steady (index {:.2})", actual),
        )
    } else {
        (
            SignalStrength::Weak,
            format!("seedling demand weak (index {:.2})", actual),
        )
    };

    TrendSignal {
        source: "seedling",
        signal_type: "seedling_demand",
        variety: meta.name.to_string(),
        value: actual,
        description,
        strength,
        score,
    }
}

fn build_summary(meta: &VarietyMeta, grade: TrendGrade, signals: &[TrendSignal]) -> String {
    let strong: Vec<&'static str> = signals
        .iter()
        .filter(|s| s.strength == SignalStrength::Strong)
        .map(|s| s.source)
        .collect();
    match grade {
        TrendGrade::Hot => format!(
            "{} — price, area, and nursery demand rising together; peak market attention",
            meta.name
        ),
        TrendGrade::Rising => {
            let sources = if strong.is_empty() {
                "multiple signals".to_string()
            } else {
                strong[..strong.len().min(2)].join(", ")
            };
            format!("{} — upward trend driven by {}; worth tracking", meta.name, sources)
        }
        TrendGrade::Watch => format!("{} — some positive signals, observation stage", meta.name),
        TrendGrade::Stable => format!("{} — holding steady", meta.name),
        TrendGrade::Declining => format!(
            "{} — most indicators falling, transition review warranted",
            meta.name
        ),
    }
}

fn build_insight(meta: &VarietyMeta, grade: TrendGrade) -> String {
    let note = news_signal(meta.id).note;
    match grade {
        TrendGrade::Hot => {
            if note.is_empty() {
                "Consider new planting or conversion now.".to_string()
            } else {
                format!("Immediate review recommended. {}", note)
            }
        }
        TrendGrade::Rising => {
            if note.is_empty() {
                "Small trial planting, expand on results.".to_string()
            } else {
                format!("Consider trial planting. {}", note)
            }
        }
        TrendGrade::Watch => {
            if note.is_empty() {
                "Re-evaluate in six months.".to_string()
            } else {
                format!("Track developments. {}", note)
            }
        }
        TrendGrade::Declining => {
            if note.is_empty() {
                "Plan conversion to another variety.".to_string()
            } else {
                format!("Consider scaling down or converting. {}", note)
            }
        }
        TrendGrade::Stable => "Maintain current strategy.".to_string(),
    }
}

fn build_market_summary(ranked: &[VarietyTrend]) -> String {
    let hot: Vec<&str> = ranked
        .iter()
        .filter(|v| matches!(v.grade, TrendGrade::Hot | TrendGrade::Rising))
        .take(3)
        .map(|v| v.variety.as_str())
        .collect();
    let declining: Vec<&str> = ranked
        .iter()
        .filter(|v| v.grade == TrendGrade::Declining)
        .take(2)
        .map(|v| v.variety.as_str())
        .collect();

    format!(
        "{} lead the market on momentum while {} trend down. Premium varieties keep \
         gaining demand as the traditional mainstay loses share, a structural shift \
         rather than a seasonal swing.",
        if hot.is_empty() {
            "No varieties".to_string()
        } else {
            hot.join(", ")
        },
        if declining.is_empty() {
            "none".to_string()
        } else {
            declining.join(", ")
        }
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_is_deterministic_for_seed() {
        let detector = TrendDetector::new();
        let a = detector.report_with_seed(42);
        let b = detector.report_with_seed(42);
        let scores_a: Vec<f64> = a.varieties.iter().map(|v| v.composite_score).collect();
        let scores_b: Vec<f64> = b.varieties.iter().map(|v| v.composite_score).collect();
        assert_eq!(scores_a, scores_b);
    }

    #[test]
    fn test_ranks_are_contiguous_and_sorted() {
        let report = TrendDetector::new().report_with_seed(7);
        assert_eq!(report.varieties.len(), VARIETIES.len());
        for (i, v) in report.varieties.iter().enumerate() {
            assert_eq!(v.rank, i as u32 + 1);
            assert!((0.0..=100.0).contains(&v.composite_score));
            assert_eq!(v.signals.len(), 4);
        }
        assert!(report
            .varieties
            .windows(2)
            .all(|w| w[0].composite_score >= w[1].composite_score));
    }

    #[test]
    fn test_momentum_ordering_matches_catalogue() {
        // the strongest catalogue entry should rank above the weakest
        let report = TrendDetector::new().report_with_seed(3);
        let rank_of = |id: &str| {
            report
                .varieties
                .iter()
                .find(|v| v.variety_id == id)
                .unwrap()
                .rank
        };
        assert!(rank_of("ruby-s") < rank_of("yanggwang"));
        assert!(rank_of("arisoo") < rank_of("tsugaru"));
    }

    #[test]
    fn test_grade_buckets() {
        assert_eq!(TrendGrade::from_score(85.0), TrendGrade::Hot);
        assert_eq!(TrendGrade::from_score(65.0), TrendGrade::Rising);
        assert_eq!(TrendGrade::from_score(45.0), TrendGrade::Watch);
        assert_eq!(TrendGrade::from_score(25.0), TrendGrade::Stable);
        assert_eq!(TrendGrade::from_score(10.0), TrendGrade::Declining);
    }

    #[test]
    fn test_variety_lookup() {
        let detector = TrendDetector::new();
        assert!(detector.variety_trend("fuji").is_some());
        assert!(detector.variety_trend("granny-smith").is_none());
    }

    #[test]
    fn test_market_summary_names_leaders() {
        let report = TrendDetector::new().report_with_seed(11);
        assert!(!report.market_summary.is_empty());
        assert!(report.total_varieties_analyzed >= 10);
    }
}
