//! # Grid Generator
//!
//! Lays out a rectangular array of drill holes over the section, inset from
//! the boundary by one grid step, and tags each hole with its structural zone.
//! A handful of interior holes near the floor centre are then reassigned to
//! the relief and cut zones that open the round.
//!
//! ## Example
//!
//! ```rust
//! use blast_core::grid::{generate_grid, GridPolicy, StructuralZone};
//!
//! let holes = generate_grid(5.2, 6.1, 0.60, 0.80, &GridPolicy::default());
//! assert_eq!(holes.len(), 84);
//! let relief = holes.iter().filter(|h| h.zone == StructuralZone::Relief).count();
//! assert_eq!(relief, 3);
//! ```

use serde::{Deserialize, Serialize};

/// Structural zone of a hole before role classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StructuralZone {
    /// Outermost row or column
    Perimeter,
    /// Second row or column in from the edge
    Subperimeter,
    /// Everything else
    Interior,
    /// Interior holes reassigned to open the initial void
    Relief,
    /// Interior holes reassigned to widen the void
    Cut,
}

/// A drill position in section-local metres (y = 0 is the floor).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Hole {
    pub x: f64,
    pub y: f64,
    pub zone: StructuralZone,
}

/// Rounding applied to `width/spacing` and `height/burden` when sizing the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CountRounding {
    /// Nearest integer, halves away from zero
    #[default]
    Round,
    /// Next integer up
    Ceil,
}

impl CountRounding {
    fn apply(&self, value: f64) -> f64 {
        match self {
            CountRounding::Round => value.round(),
            CountRounding::Ceil => value.ceil(),
        }
    }
}

/// Sizing policy for the hole grid.
///
/// The defaults reproduce the reference layout: 84 holes for a
/// 5.2 m x 6.1 m section at 0.60 m burden and 0.80 m spacing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridPolicy {
    /// Rounding used for the column and row counts
    pub rounding: CountRounding,
    /// Lower bound on the column count
    pub min_columns: usize,
    /// Lower bound on the row count
    pub min_rows: usize,
    /// Rows added on top of `height / burden`
    pub extra_rows: usize,
    /// Interior holes turned into relief holes
    pub relief_count: usize,
    /// Interior holes turned into cut holes, after the relief holes
    pub cut_count: usize,
    /// Largest grid that will be laid out
    pub max_holes: usize,
}

impl Default for GridPolicy {
    fn default() -> Self {
        GridPolicy {
            rounding: CountRounding::Round,
            min_columns: 5,
            min_rows: 5,
            extra_rows: 2,
            relief_count: 3,
            cut_count: 8,
            max_holes: 2000,
        }
    }
}

impl GridPolicy {
    /// Column and row counts for a section and pattern.
    ///
    /// Returns `None` when the counts are not finite or the grid would hold
    /// more than `max_holes` holes.
    pub fn dimensions(&self, width: f64, height: f64, burden: f64, spacing: f64) -> Option<(usize, usize)> {
        let limit = self.max_holes as f64;
        let columns = self.rounding.apply(width / spacing).max(0.0);
        let rows = self.rounding.apply(height / burden).max(0.0);
        if !(columns.is_finite() && rows.is_finite()) || columns > limit || rows > limit {
            return None;
        }

        let columns = (columns as usize).max(self.min_columns);
        let rows = (rows as usize).checked_add(self.extra_rows)?.max(self.min_rows);
        match columns.checked_mul(rows) {
            Some(total) if total <= self.max_holes => Some((columns, rows)),
            _ => None,
        }
    }
}

fn is_usable(value: f64) -> bool {
    value.is_finite() && value > 0.0
}

/// Generate the zoned hole grid.
///
/// Any non-positive or non-finite input, or a pattern too dense for
/// `policy.max_holes`, yields an empty grid. Holes are emitted row by row
/// starting at the floor, left to right within a row.
pub fn generate_grid(width: f64, height: f64, burden: f64, spacing: f64, policy: &GridPolicy) -> Vec<Hole> {
    if !(is_usable(width) && is_usable(height) && is_usable(burden) && is_usable(spacing)) {
        return Vec::new();
    }

    let Some((columns, rows)) = policy.dimensions(width, height, burden, spacing) else {
        tracing::debug!(burden, spacing, max_holes = policy.max_holes, "pattern too dense for grid");
        return Vec::new();
    };
    let step_x = width / (columns + 1) as f64;
    let step_y = height / (rows + 1) as f64;

    let mut holes = Vec::with_capacity(columns * rows);
    for j in 1..=rows {
        let y = j as f64 * step_y;
        for i in 1..=columns {
            let x = i as f64 * step_x;
            let zone = if i == 1 || i == columns || j == 1 || j == rows {
                StructuralZone::Perimeter
            } else if i == 2 || i + 1 == columns || j == 2 || j + 1 == rows {
                StructuralZone::Subperimeter
            } else {
                StructuralZone::Interior
            };
            holes.push(Hole { x, y, zone });
        }
    }

    assign_relief_and_cut(&mut holes, width, height, policy);

    tracing::debug!(
        columns,
        rows,
        holes = holes.len(),
        "generated drill grid"
    );
    holes
}

/// Reassign the interior holes closest to the floor centre.
fn assign_relief_and_cut(holes: &mut [Hole], width: f64, height: f64, policy: &GridPolicy) {
    let center_x = width / 2.0;
    let score = |h: &Hole| (h.x - center_x).abs() + (height - h.y);

    let mut interior: Vec<usize> = holes
        .iter()
        .enumerate()
        .filter(|(_, h)| h.zone == StructuralZone::Interior)
        .map(|(idx, _)| idx)
        .collect();
    interior.sort_by(|&a, &b| score(&holes[a]).total_cmp(&score(&holes[b])));

    let relief = policy.relief_count.min(interior.len());
    let cut = policy.cut_count.min(interior.len() - relief);

    for &idx in &interior[..relief] {
        holes[idx].zone = StructuralZone::Relief;
    }
    for &idx in &interior[relief..relief + cut] {
        holes[idx].zone = StructuralZone::Cut;
    }
}

/// Number of holes in the given zone
pub fn count_zone(holes: &[Hole], zone: StructuralZone) -> usize {
    holes.iter().filter(|h| h.zone == zone).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_scenario() {
        let policy = GridPolicy::default();
        assert_eq!(policy.dimensions(5.2, 6.1, 0.60, 0.80), Some((7, 12)));

        let holes = generate_grid(5.2, 6.1, 0.60, 0.80, &policy);
        assert_eq!(holes.len(), 84);
        assert_eq!(count_zone(&holes, StructuralZone::Relief), 3);
        assert_eq!(count_zone(&holes, StructuralZone::Cut), 8);

        let remaining = holes
            .iter()
            .filter(|h| !matches!(h.zone, StructuralZone::Relief | StructuralZone::Cut))
            .count();
        assert_eq!(remaining, 73);

        // 7 x 12 grid: 3 x 8 interior block, 11 of which are reassigned
        assert_eq!(count_zone(&holes, StructuralZone::Interior), 24 - 11);
        assert_eq!(count_zone(&holes, StructuralZone::Perimeter), 2 * 7 + 2 * 10);
    }

    #[test]
    fn test_grid_is_inset_from_boundary() {
        let holes = generate_grid(5.2, 6.1, 0.60, 0.80, &GridPolicy::default());
        let step_x = 5.2 / 8.0;
        let step_y = 6.1 / 13.0;
        for h in &holes {
            assert!(h.x >= step_x - 1e-9 && h.x <= 5.2 - step_x + 1e-9);
            assert!(h.y >= step_y - 1e-9 && h.y <= 6.1 - step_y + 1e-9);
        }
    }

    #[test]
    fn test_relief_holes_sit_low_and_central() {
        let holes = generate_grid(5.2, 6.1, 0.60, 0.80, &GridPolicy::default());
        let max_relief_score = holes
            .iter()
            .filter(|h| h.zone == StructuralZone::Relief)
            .map(|h| (h.x - 2.6).abs() + (6.1 - h.y))
            .fold(f64::MIN, f64::max);
        let min_interior_score = holes
            .iter()
            .filter(|h| h.zone == StructuralZone::Interior)
            .map(|h| (h.x - 2.6).abs() + (6.1 - h.y))
            .fold(f64::MAX, f64::min);
        assert!(max_relief_score <= min_interior_score);
    }

    #[test]
    fn test_minimum_grid_for_tiny_section() {
        let holes = generate_grid(1.0, 1.0, 2.0, 2.0, &GridPolicy::default());
        // round(0.5) = 1 column -> min 5; round(0.5) + 2 = 3 rows -> min 5
        assert_eq!(holes.len(), 25);
        // 5 x 5 leaves a single interior hole, which becomes relief
        assert_eq!(count_zone(&holes, StructuralZone::Relief), 1);
        assert_eq!(count_zone(&holes, StructuralZone::Cut), 0);
        assert_eq!(count_zone(&holes, StructuralZone::Interior), 0);
    }

    #[test]
    fn test_invalid_inputs_yield_empty_grid() {
        let policy = GridPolicy::default();
        assert!(generate_grid(0.0, 6.1, 0.6, 0.8, &policy).is_empty());
        assert!(generate_grid(5.2, -1.0, 0.6, 0.8, &policy).is_empty());
        assert!(generate_grid(5.2, 6.1, 0.0, 0.8, &policy).is_empty());
        assert!(generate_grid(5.2, 6.1, 0.6, f64::NAN, &policy).is_empty());
    }

    #[test]
    fn test_ceil_policy_changes_counts() {
        let policy = GridPolicy {
            rounding: CountRounding::Ceil,
            extra_rows: 0,
            ..GridPolicy::default()
        };
        // ceil(6.5) = 7 columns, ceil(10.17) = 11 rows
        assert_eq!(policy.dimensions(5.2, 6.1, 0.60, 0.80), Some((7, 11)));
    }

    #[test]
    fn test_zero_minimums_allow_empty_grid() {
        let policy = GridPolicy {
            min_columns: 0,
            min_rows: 0,
            extra_rows: 0,
            ..GridPolicy::default()
        };
        assert!(generate_grid(1.0, 1.0, 5.0, 5.0, &policy).is_empty());
    }

    #[test]
    fn test_microscopic_burden_does_not_overflow() {
        let policy = GridPolicy::default();
        assert_eq!(policy.dimensions(5.2, 6.1, 1e-300, 0.8), None);
        assert!(generate_grid(5.2, 6.1, 1e-300, 0.8, &policy).is_empty());

        let huge_extra = GridPolicy {
            extra_rows: usize::MAX,
            max_holes: usize::MAX,
            ..GridPolicy::default()
        };
        assert_eq!(huge_extra.dimensions(5.2, 6.1, 0.6, 0.8), None);
    }

    #[test]
    fn test_hole_limit() {
        let policy = GridPolicy::default();
        // 5200 x 12 columns/rows would be far past the limit
        assert_eq!(policy.dimensions(5.2, 6.1, 0.6, 0.001), None);
        assert!(generate_grid(5.2, 6.1, 0.000001, 0.8, &policy).is_empty());

        let tight = GridPolicy {
            max_holes: 84,
            ..GridPolicy::default()
        };
        assert_eq!(tight.dimensions(5.2, 6.1, 0.60, 0.80), Some((7, 12)));
        let tighter = GridPolicy {
            max_holes: 83,
            ..GridPolicy::default()
        };
        assert_eq!(tighter.dimensions(5.2, 6.1, 0.60, 0.80), None);
    }

    #[test]
    fn test_each_hole_has_one_zone() {
        let holes = generate_grid(4.0, 4.5, 0.7, 0.9, &GridPolicy::default());
        let total: usize = [
            StructuralZone::Perimeter,
            StructuralZone::Subperimeter,
            StructuralZone::Interior,
            StructuralZone::Relief,
            StructuralZone::Cut,
        ]
        .iter()
        .map(|&z| count_zone(&holes, z))
        .sum();
        assert_eq!(total, holes.len());
    }
}
