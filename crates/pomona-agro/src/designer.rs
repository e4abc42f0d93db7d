//! Orchard layout design and the yield-per-area source of truth
//!
//! Planting layout (rows, spacing, tree count, coordinates) from area,
//! variety, rootstock, and equipment constraints. [`yield_per_10a`] is the
//! single place yield-per-area is ever derived from spacing; the profit
//! simulator calls the same function so the two can never disagree.

use serde::{Deserialize, Serialize};

use pomona_common::PYEONG_TO_M2;

/// Fraction of gross area actually planted (paths and margins excluded)
pub const PLANTABLE_FRACTION: f64 = 0.85;

/// Row and in-row tree spacing (meters)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Spacing {
    pub row_m: f64,
    pub tree_m: f64,
}

impl Spacing {
    pub const fn new(row_m: f64, tree_m: f64) -> Self {
        Self { row_m, tree_m }
    }
}

/// Per-variety yield characteristics
#[derive(Debug, Clone, Copy)]
pub struct VarietyYield {
    /// Mature-tree yield (kg per tree per year)
    pub yield_per_tree_kg: f64,
    /// Years until first meaningful fruiting
    pub years_to_fruit: u32,
}

/// Default spacing for a variety when neither an override nor a rootstock
/// recommendation applies
pub fn variety_spacing(variety: &str) -> Spacing {
    match variety {
        "gamhong" | "fuji" | "shinano-gold" => Spacing::new(5.0, 3.5),
        "ruby-s" => Spacing::new(4.5, 3.0),
        _ => Spacing::new(5.0, 3.0),
    }
}

/// Yield characteristics for a variety (unknown ids get the catalogue
/// default)
pub fn variety_yield(variety: &str) -> VarietyYield {
    match variety {
        "tsugaru" => VarietyYield { yield_per_tree_kg: 35.0, years_to_fruit: 3 },
        "hongro" => VarietyYield { yield_per_tree_kg: 30.0, years_to_fruit: 3 },
        "gamhong" => VarietyYield { yield_per_tree_kg: 25.0, years_to_fruit: 4 },
        "fuji" => VarietyYield { yield_per_tree_kg: 40.0, years_to_fruit: 4 },
        "arisoo" => VarietyYield { yield_per_tree_kg: 35.0, years_to_fruit: 3 },
        "shinano-gold" => VarietyYield { yield_per_tree_kg: 30.0, years_to_fruit: 4 },
        "ruby-s" => VarietyYield { yield_per_tree_kg: 30.0, years_to_fruit: 3 },
        _ => VarietyYield { yield_per_tree_kg: 30.0, years_to_fruit: 4 },
    }
}

/// Rootstock reference data: recommended spacing band and establishment
/// costs. Denser rootstocks carry higher per-tree and per-area costs
/// (trellis, irrigation) but plant far more trees per area.
#[derive(Debug, Clone)]
pub struct Rootstock {
    pub id: &'static str,
    pub name: &'static str,
    pub row_spacing_m: f64,
    pub tree_spacing_m: f64,
    /// Grafted seedling unit cost (KRW)
    pub seedling_cost: i64,
    /// Support/irrigation infrastructure cost per 10a (KRW)
    pub infra_cost_per_10a: i64,
}

const M9: Rootstock = Rootstock {
    id: "M9",
    name: "M9 (T337)",
    row_spacing_m: 3.75,
    tree_spacing_m: 1.75,
    seedling_cost: 18_000,
    infra_cost_per_10a: 1_500_000,
};

const M26: Rootstock = Rootstock {
    id: "M26",
    name: "M26",
    row_spacing_m: 4.75,
    tree_spacing_m: 3.0,
    seedling_cost: 15_000,
    infra_cost_per_10a: 1_200_000,
};

const MM106: Rootstock = Rootstock {
    id: "MM106",
    name: "MM106",
    row_spacing_m: 5.5,
    tree_spacing_m: 3.5,
    seedling_cost: 13_000,
    infra_cost_per_10a: 1_000_000,
};

const SEEDLING: Rootstock = Rootstock {
    id: "seedling",
    name: "Seedling (ungrafted)",
    row_spacing_m: 7.0,
    tree_spacing_m: 5.0,
    seedling_cost: 10_000,
    infra_cost_per_10a: 700_000,
};

/// Look up a rootstock by id
pub fn rootstock(id: &str) -> Option<&'static Rootstock> {
    match id {
        "M9" => Some(&M9),
        "M26" => Some(&M26),
        "MM106" => Some(&MM106),
        "seedling" => Some(&SEEDLING),
        _ => None,
    }
}

/// Rootstock assumed for investment costing when none is specified
pub fn default_rootstock() -> &'static Rootstock {
    &M26
}

/// Machinery profile constraining row width
#[derive(Debug, Clone)]
pub struct Equipment {
    pub id: &'static str,
    pub name: &'static str,
    /// Minimum row-pass width including side clearance (m)
    pub min_pass_width_m: f64,
}

/// Look up an equipment profile by id
pub fn equipment(id: &str) -> Option<&'static Equipment> {
    const SS: Equipment = Equipment {
        id: "ss",
        name: "Speed sprayer",
        min_pass_width_m: 3.0,
    };
    const TRACTOR_SMALL: Equipment = Equipment {
        id: "tractor-small",
        name: "Small tractor (25-35 hp)",
        min_pass_width_m: 2.5,
    };
    const TRACTOR_MID: Equipment = Equipment {
        id: "tractor-mid",
        name: "Mid tractor (50-70 hp)",
        min_pass_width_m: 3.2,
    };
    const CULTIVATOR: Equipment = Equipment {
        id: "cultivator",
        name: "Cultivator",
        min_pass_width_m: 2.0,
    };
    match id {
        "ss" => Some(&SS),
        "tractor-small" => Some(&TRACTOR_SMALL),
        "tractor-mid" => Some(&TRACTOR_MID),
        "cultivator" => Some(&CULTIVATOR),
        _ => None,
    }
}

/// Resolve spacing by priority: explicit override, then rootstock
/// recommendation, then variety default.
pub fn resolve_spacing(
    variety: &str,
    row_override: Option<f64>,
    tree_override: Option<f64>,
    rootstock_id: Option<&str>,
) -> Spacing {
    let stock = rootstock_id.and_then(rootstock);
    let default = variety_spacing(variety);
    Spacing {
        row_m: row_override
            .or(stock.map(|r| r.row_spacing_m))
            .unwrap_or(default.row_m),
        tree_m: tree_override
            .or(stock.map(|r| r.tree_spacing_m))
            .unwrap_or(default.tree_m),
    }
}

/// Yield per 10a (kg) for a variety at the resolved spacing.
///
/// This is the single source of truth for yield-per-area:
/// `yield_per_tree × (1000 × plantable) / (row × tree)`.
pub fn yield_per_10a(
    variety: &str,
    row_override: Option<f64>,
    tree_override: Option<f64>,
    rootstock_id: Option<&str>,
) -> f64 {
    let spacing = resolve_spacing(variety, row_override, tree_override, rootstock_id);
    let trees_per_10a = (1000.0 * PLANTABLE_FRACTION) / (spacing.row_m * spacing.tree_m);
    variety_yield(variety).yield_per_tree_kg * trees_per_10a
}

/// Layout design request
#[derive(Debug, Clone, Deserialize)]
pub struct DesignRequest {
    pub variety: String,
    pub area_pyeong: f64,
    #[serde(default)]
    pub spacing_row_m: Option<f64>,
    #[serde(default)]
    pub spacing_tree_m: Option<f64>,
    #[serde(default)]
    pub rootstock: Option<String>,
    #[serde(default)]
    pub equipment: Option<String>,
    /// Perimeter setback from boundaries (m)
    #[serde(default)]
    pub setback_m: Option<f64>,
}

/// One tree position on the planting grid (meters from the plot origin)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreePosition {
    pub row: u32,
    pub col: u32,
    pub x: f64,
    pub y: f64,
}

/// Computed orchard layout
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DesignResponse {
    pub variety: String,
    pub area_pyeong: f64,
    pub area_m2: f64,
    pub spacing: Spacing,
    pub rows: u32,
    pub trees_per_row: u32,
    pub total_trees: u32,
    pub tree_positions: Vec<TreePosition>,
    /// Trees per 10a
    pub planting_density: f64,
    /// Mature-orchard estimate from the laid-out tree count (kg)
    pub estimated_yield_kg: f64,
    /// Yield per 10a at the resolved spacing (kg)
    pub yield_per_10a: f64,
    pub years_to_full_production: u32,
}

/// Compute a planting layout.
///
/// A 2:1 rectangle over the plantable area, rows across the short side.
/// The equipment constraint dominates the spacing preference: a row
/// narrower than the machine's pass width is widened to fit it.
pub fn design(req: &DesignRequest) -> DesignResponse {
    let area_m2 = req.area_pyeong * PYEONG_TO_M2;
    let mut effective_area = area_m2 * PLANTABLE_FRACTION;

    // perimeter setback: shrink a modeled square plot on every side
    let setback = req.setback_m.unwrap_or(0.0).max(0.0);
    if setback > 0.0 {
        let side = effective_area.sqrt();
        let inner = (side - 2.0 * setback).max(1.0);
        effective_area = inner * inner;
    }

    let mut spacing = resolve_spacing(
        &req.variety,
        req.spacing_row_m,
        req.spacing_tree_m,
        req.rootstock.as_deref(),
    );
    if let Some(machine) = req.equipment.as_deref().and_then(equipment) {
        if spacing.row_m < machine.min_pass_width_m {
            spacing.row_m = machine.min_pass_width_m;
        }
    }

    let width = (effective_area * 2.0).sqrt();
    let height = effective_area / width;

    let rows = ((height / spacing.row_m).floor() as u32).max(1);
    let trees_per_row = ((width / spacing.tree_m).floor() as u32).max(1);
    let total_trees = rows * trees_per_row;

    let mut tree_positions = Vec::with_capacity(total_trees as usize);
    for r in 0..rows {
        for c in 0..trees_per_row {
            tree_positions.push(TreePosition {
                row: r,
                col: c,
                x: setback + c as f64 * spacing.tree_m + spacing.tree_m / 2.0,
                y: setback + r as f64 * spacing.row_m + spacing.row_m / 2.0,
            });
        }
    }

    let info = variety_yield(&req.variety);
    let area_10a = area_m2 / 1000.0;
    let planting_density = if area_10a > 0.0 {
        total_trees as f64 / area_10a
    } else {
        0.0
    };

    DesignResponse {
        variety: req.variety.clone(),
        area_pyeong: req.area_pyeong,
        area_m2,
        spacing,
        rows,
        trees_per_row,
        total_trees,
        tree_positions,
        planting_density,
        estimated_yield_kg: total_trees as f64 * info.yield_per_tree_kg,
        yield_per_10a: yield_per_10a(
            &req.variety,
            Some(spacing.row_m),
            Some(spacing.tree_m),
            None,
        ),
        years_to_full_production: info.years_to_fruit + 3,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn base_request(variety: &str, area_pyeong: f64) -> DesignRequest {
        DesignRequest {
            variety: variety.to_string(),
            area_pyeong,
            spacing_row_m: None,
            spacing_tree_m: None,
            rootstock: None,
            equipment: None,
            setback_m: None,
        }
    }

    #[test]
    fn test_yield_per_10a_fuji_default() {
        // 40 kg/tree at 5.0 x 3.5 m: 40 * 850 / 17.5
        assert_relative_eq!(
            yield_per_10a("fuji", None, None, None),
            1942.857142857143,
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_rootstock_density_ordering() {
        for variety in ["fuji", "hongro", "gamhong", "arisoo", "ruby-s"] {
            let dense = yield_per_10a(variety, None, None, Some("M9"));
            let sparse = yield_per_10a(variety, None, None, Some("seedling"));
            assert!(dense > sparse, "{}: {} <= {}", variety, dense, sparse);
        }
    }

    #[test]
    fn test_spacing_priority_chain() {
        // explicit override beats rootstock
        let s = resolve_spacing("fuji", Some(6.0), None, Some("M9"));
        assert_eq!(s.row_m, 6.0);
        assert_eq!(s.tree_m, 1.75); // rootstock fills the other axis
        // rootstock beats variety default
        let s = resolve_spacing("fuji", None, None, Some("M9"));
        assert_eq!(s.row_m, 3.75);
        // no override, no rootstock: variety default
        let s = resolve_spacing("fuji", None, None, None);
        assert_eq!(s.row_m, 5.0);
        assert_eq!(s.tree_m, 3.5);
    }

    #[test]
    fn test_design_basic_layout() {
        let res = design(&base_request("fuji", 1000.0));
        assert_relative_eq!(res.area_m2, 3305.8, epsilon = 0.1);
        assert!(res.total_trees > 0);
        assert_eq!(res.total_trees, res.rows * res.trees_per_row);
        assert_eq!(res.tree_positions.len(), res.total_trees as usize);
        assert_eq!(res.years_to_full_production, 7);
        assert!(res.planting_density > 0.0);
    }

    #[test]
    fn test_equipment_widens_rows() {
        let mut req = base_request("fuji", 1000.0);
        req.rootstock = Some("M9".to_string()); // rec row 3.75 m
        let unconstrained = design(&req);
        assert_eq!(unconstrained.spacing.row_m, 3.75);

        req.equipment = Some("tractor-mid".to_string()); // needs 3.2 m — fits
        let fits = design(&req);
        assert_eq!(fits.spacing.row_m, 3.75);

        req.spacing_row_m = Some(2.8);
        let widened = design(&req);
        assert_eq!(widened.spacing.row_m, 3.2);
    }

    #[test]
    fn test_setback_reduces_trees() {
        let open = design(&base_request("fuji", 1000.0));
        let mut req = base_request("fuji", 1000.0);
        req.setback_m = Some(3.0);
        let set_back = design(&req);
        assert!(set_back.total_trees < open.total_trees);
        // coordinates shifted inward
        assert!(set_back.tree_positions[0].x > open.tree_positions[0].x);
    }

    #[test]
    fn test_tiny_plot_floors_at_one_tree() {
        let res = design(&base_request("fuji", 1.0));
        assert!(res.rows >= 1);
        assert!(res.trees_per_row >= 1);
        assert!(res.total_trees >= 1);
    }

    #[test]
    fn test_unknown_variety_uses_default_tables() {
        let y = yield_per_10a("mystery-apple", None, None, None);
        // default 30 kg/tree at 5.0 x 3.0 m
        assert_relative_eq!(y, 30.0 * 850.0 / 15.0, epsilon = 1e-9);
    }
}
