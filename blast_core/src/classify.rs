//! # Role Classifier
//!
//! Maps zoned holes onto the eight blast roles. Relief and cut holes map
//! directly to reamers and floor holes; the rest are handed out greedily to
//! the quota roles in the configured order, each role taking the holes that
//! score lowest under its own scoring rule. Whatever is left becomes bulk.
//!
//! The processing order is an allocation priority: when two roles compete for
//! the same holes, the earlier role wins them.
//!
//! ## Example
//!
//! ```rust
//! use blast_core::classify::{classify, count_roles, default_role_quotas, BlastRole};
//! use blast_core::grid::{generate_grid, GridPolicy};
//!
//! let holes = generate_grid(5.2, 6.1, 0.60, 0.80, &GridPolicy::default());
//! let classified = classify(&holes, 5.2, 6.1, &default_role_quotas());
//! let counts = count_roles(&classified);
//! assert_eq!(counts[&BlastRole::Reamer], 3);
//! assert_eq!(counts.values().sum::<usize>(), 84);
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::grid::{Hole, StructuralZone};

/// Lateral weight used by the central (wall/back) scores
const CENTRAL_LATERAL_WEIGHT: f64 = 0.2;

/// Lateral weight used by the cut-column score
const COLUMN_LATERAL_WEIGHT: f64 = 2.0;

/// Functional role of a hole within the round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BlastRole {
    /// Reamer holes, fired first to open the void
    Reamer,
    /// Floor (lifter) holes
    Floor,
    /// Back (crown) holes
    Back,
    /// Wall (rib) holes
    Wall,
    /// Central cut column
    CutColumn,
    /// Auxiliary wall holes
    AuxWall,
    /// Auxiliary back holes
    AuxBack,
    /// Remaining production holes
    Bulk,
}

impl BlastRole {
    /// All roles in canonical order
    pub const ALL: [BlastRole; 8] = [
        BlastRole::Reamer,
        BlastRole::Floor,
        BlastRole::Back,
        BlastRole::Wall,
        BlastRole::CutColumn,
        BlastRole::AuxWall,
        BlastRole::AuxBack,
        BlastRole::Bulk,
    ];

    /// Short code used in files and on the command line
    pub fn code(&self) -> &'static str {
        match self {
            BlastRole::Reamer => "reamer",
            BlastRole::Floor => "floor",
            BlastRole::Back => "back",
            BlastRole::Wall => "wall",
            BlastRole::CutColumn => "cut-column",
            BlastRole::AuxWall => "aux-wall",
            BlastRole::AuxBack => "aux-back",
            BlastRole::Bulk => "bulk",
        }
    }

    /// Human-readable name
    pub fn display_name(&self) -> &'static str {
        match self {
            BlastRole::Reamer => "Reamer",
            BlastRole::Floor => "Floor",
            BlastRole::Back => "Back",
            BlastRole::Wall => "Wall",
            BlastRole::CutColumn => "Cut column",
            BlastRole::AuxWall => "Aux. wall",
            BlastRole::AuxBack => "Aux. back",
            BlastRole::Bulk => "Bulk",
        }
    }

    /// Roles that are fixed by structural zone rather than by quota
    pub fn is_zone_bound(&self) -> bool {
        matches!(self, BlastRole::Reamer | BlastRole::Floor | BlastRole::Bulk)
    }

    /// Parse from common string representations
    pub fn from_str_flexible(s: &str) -> Option<Self> {
        let normalized = s.trim().to_lowercase().replace([' ', '_', '.'], "-");
        let normalized = normalized.replace("--", "-");
        BlastRole::ALL.into_iter().find(|r| r.code() == normalized)
    }
}

impl std::fmt::Display for BlastRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Scoring rule used to rank pool holes for a quota role. Lower is better.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RoleScore {
    /// `y + 0.2 |x - cx|`
    LowCentral,
    /// `y + (width/2 - |x - cx|)`
    LowLateral,
    /// `2 |x - cx| + |y - height/2|`
    CentralColumn,
    /// `(height - y) + 0.2 |x - cx|`
    HighCentral,
    /// `(height - y) + (width/2 - |x - cx|)`
    HighLateral,
}

impl RoleScore {
    pub fn score(&self, hole: &Hole, width: f64, height: f64) -> f64 {
        let center_x = width / 2.0;
        let lateral = (hole.x - center_x).abs();
        match self {
            RoleScore::LowCentral => hole.y + CENTRAL_LATERAL_WEIGHT * lateral,
            RoleScore::LowLateral => hole.y + (width / 2.0 - lateral),
            RoleScore::CentralColumn => COLUMN_LATERAL_WEIGHT * lateral + (hole.y - height / 2.0).abs(),
            RoleScore::HighCentral => (height - hole.y) + CENTRAL_LATERAL_WEIGHT * lateral,
            RoleScore::HighLateral => (height - hole.y) + (width / 2.0 - lateral),
        }
    }
}

/// Target hole count and scoring rule for one quota role.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RoleQuota {
    pub role: BlastRole,
    pub quota: usize,
    pub score: RoleScore,
}

impl RoleQuota {
    pub fn new(role: BlastRole, quota: usize, score: RoleScore) -> Self {
        RoleQuota { role, quota, score }
    }
}

/// Reference quota list, in allocation order.
pub fn default_role_quotas() -> Vec<RoleQuota> {
    vec![
        RoleQuota::new(BlastRole::Wall, 12, RoleScore::LowCentral),
        RoleQuota::new(BlastRole::AuxWall, 10, RoleScore::LowLateral),
        RoleQuota::new(BlastRole::CutColumn, 14, RoleScore::CentralColumn),
        RoleQuota::new(BlastRole::Back, 10, RoleScore::HighCentral),
        RoleQuota::new(BlastRole::AuxBack, 7, RoleScore::HighLateral),
    ]
}

/// A hole with its assigned blast role.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedHole {
    pub x: f64,
    pub y: f64,
    pub zone: StructuralZone,
    pub role: BlastRole,
}

/// Per-role hole counts; every role is present, zero included.
pub type RoleCounts = BTreeMap<BlastRole, usize>;

/// Assign exactly one role to every hole.
///
/// The output has the same length and order as `holes`. The pool of
/// unassigned holes is re-sorted in place for each quota role, so ties keep
/// the order left by the previous role's sort.
pub fn classify(holes: &[Hole], width: f64, height: f64, quotas: &[RoleQuota]) -> Vec<ClassifiedHole> {
    let mut roles: Vec<Option<BlastRole>> = holes
        .iter()
        .map(|h| match h.zone {
            StructuralZone::Relief => Some(BlastRole::Reamer),
            StructuralZone::Cut => Some(BlastRole::Floor),
            _ => None,
        })
        .collect();

    let mut pool: Vec<usize> = (0..holes.len()).filter(|&idx| roles[idx].is_none()).collect();

    for quota in quotas {
        if quota.quota == 0 || pool.is_empty() {
            continue;
        }
        pool.sort_by(|&a, &b| {
            quota
                .score
                .score(&holes[a], width, height)
                .total_cmp(&quota.score.score(&holes[b], width, height))
        });
        let take = quota.quota.min(pool.len());
        for idx in pool.drain(..take) {
            roles[idx] = Some(quota.role);
        }
        tracing::trace!(role = %quota.role, taken = take, left = pool.len(), "quota role assigned");
    }

    let classified: Vec<ClassifiedHole> = holes
        .iter()
        .zip(roles)
        .map(|(h, role)| ClassifiedHole {
            x: h.x,
            y: h.y,
            zone: h.zone,
            role: role.unwrap_or(BlastRole::Bulk),
        })
        .collect();

    tracing::debug!(holes = classified.len(), bulk = pool.len(), "classified holes");
    classified
}

/// Count holes per role.
pub fn count_roles(holes: &[ClassifiedHole]) -> RoleCounts {
    let mut counts: RoleCounts = BlastRole::ALL.iter().map(|&r| (r, 0)).collect();
    for hole in holes {
        *counts.entry(hole.role).or_insert(0) += 1;
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{generate_grid, GridPolicy};

    fn reference_round() -> Vec<ClassifiedHole> {
        let holes = generate_grid(5.2, 6.1, 0.60, 0.80, &GridPolicy::default());
        classify(&holes, 5.2, 6.1, &default_role_quotas())
    }

    #[test]
    fn test_partition_is_complete() {
        let classified = reference_round();
        let counts = count_roles(&classified);
        assert_eq!(counts.len(), 8);
        assert_eq!(counts.values().sum::<usize>(), classified.len());
        assert_eq!(classified.len(), 84);
    }

    #[test]
    fn test_reference_counts() {
        let counts = count_roles(&reference_round());
        assert_eq!(counts[&BlastRole::Reamer], 3);
        assert_eq!(counts[&BlastRole::Floor], 8);
        assert_eq!(counts[&BlastRole::Wall], 12);
        assert_eq!(counts[&BlastRole::AuxWall], 10);
        assert_eq!(counts[&BlastRole::CutColumn], 14);
        assert_eq!(counts[&BlastRole::Back], 10);
        assert_eq!(counts[&BlastRole::AuxBack], 7);
        // 73 pool holes - 53 quota holes
        assert_eq!(counts[&BlastRole::Bulk], 20);
    }

    #[test]
    fn test_zone_roles_are_fixed() {
        for hole in reference_round() {
            match hole.zone {
                StructuralZone::Relief => assert_eq!(hole.role, BlastRole::Reamer),
                StructuralZone::Cut => assert_eq!(hole.role, BlastRole::Floor),
                _ => assert!(!matches!(hole.role, BlastRole::Reamer | BlastRole::Floor)),
            }
        }
    }

    #[test]
    fn test_output_preserves_input_order() {
        let holes = generate_grid(5.2, 6.1, 0.60, 0.80, &GridPolicy::default());
        let classified = classify(&holes, 5.2, 6.1, &default_role_quotas());
        for (h, c) in holes.iter().zip(&classified) {
            assert_eq!((h.x, h.y, h.zone), (c.x, c.y, c.zone));
        }
    }

    #[test]
    fn test_quota_exhaustion_on_small_grid() {
        // 5 x 5 grid: 1 relief hole, 24 pool holes for 53 quota slots
        let holes = generate_grid(1.0, 1.0, 2.0, 2.0, &GridPolicy::default());
        assert_eq!(holes.len(), 25);
        let counts = count_roles(&classify(&holes, 1.0, 1.0, &default_role_quotas()));

        assert_eq!(counts[&BlastRole::Reamer], 1);
        assert_eq!(counts[&BlastRole::Wall], 12);
        assert_eq!(counts[&BlastRole::AuxWall], 10);
        assert_eq!(counts[&BlastRole::CutColumn], 2);
        assert_eq!(counts[&BlastRole::Back], 0);
        assert_eq!(counts[&BlastRole::AuxBack], 0);
        assert_eq!(counts[&BlastRole::Bulk], 0);
        assert_eq!(counts.values().sum::<usize>(), 25);
    }

    #[test]
    fn test_quotas_are_respected() {
        let quotas = default_role_quotas();
        let counts = count_roles(&reference_round());
        for q in &quotas {
            assert!(counts[&q.role] <= q.quota, "{} over quota", q.role);
        }
    }

    #[test]
    fn test_wall_holes_are_lowest() {
        let classified = reference_round();
        let max_wall_y = classified
            .iter()
            .filter(|h| h.role == BlastRole::Wall)
            .map(|h| h.y)
            .fold(f64::MIN, f64::max);
        let min_back_y = classified
            .iter()
            .filter(|h| h.role == BlastRole::Back)
            .map(|h| h.y)
            .fold(f64::MAX, f64::min);
        assert!(max_wall_y < min_back_y);
    }

    #[test]
    fn test_order_changes_partition() {
        let holes = generate_grid(5.2, 6.1, 0.60, 0.80, &GridPolicy::default());
        let mut reversed = default_role_quotas();
        reversed.reverse();
        let a = classify(&holes, 5.2, 6.1, &default_role_quotas());
        let b = classify(&holes, 5.2, 6.1, &reversed);
        assert_ne!(a, b);
        assert_eq!(count_roles(&a), count_roles(&b));
    }

    #[test]
    fn test_empty_input() {
        assert!(classify(&[], 5.0, 5.0, &default_role_quotas()).is_empty());
        assert_eq!(count_roles(&[]).values().sum::<usize>(), 0);
    }

    #[test]
    fn test_role_codes() {
        assert_eq!(serde_json::to_string(&BlastRole::CutColumn).unwrap(), "\"cut-column\"");
        assert_eq!(BlastRole::from_str_flexible("Aux Wall"), Some(BlastRole::AuxWall));
        assert_eq!(BlastRole::from_str_flexible("cut_column"), Some(BlastRole::CutColumn));
        assert_eq!(BlastRole::from_str_flexible("stope"), None);
    }
}
