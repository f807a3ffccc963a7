//! # Explosive Calculator
//!
//! Turns a classified round into explosive quantities. Two distribution modes
//! share one result type:
//!
//! - **By role**: each role loads a fixed number of emulsion and booster
//!   cartridges plus kilograms of ANFO per hole, taken from the
//!   [`LoadingScheme`].
//! - **By participation**: a target powder factor sets the total
//!   energy-equivalent mass, which is split across explosive types by
//!   relative weights.
//!
//! In both modes real kilograms are converted to energy-equivalent kilograms
//! with the type's equivalence factor, and the loading factor is total
//! equivalent kilograms per cubic metre of bulked rock.
//!
//! ## Example
//!
//! ```rust
//! use blast_core::classify::{BlastRole, RoleCounts};
//! use blast_core::explosives::{distribute, DistributionMode, ExplosiveCatalog, LoadingScheme};
//!
//! let mut counts = RoleCounts::new();
//! counts.insert(BlastRole::Floor, 8);
//!
//! let totals = distribute(
//!     &counts,
//!     40.0,
//!     &LoadingScheme::default(),
//!     &ExplosiveCatalog::default(),
//!     &DistributionMode::ByRole,
//! )
//! .unwrap();
//! assert_eq!(totals.emulsion.cartridges, Some(136.0));
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::classify::{BlastRole, RoleCounts};
use crate::errors::{DesignError, DesignResult};

/// Explosive products used in a round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExplosiveKind {
    /// Cartridged emulsion (column charge)
    Emulsion,
    /// Cartridged booster / perimeter product
    Booster,
    /// Bulk ANFO, dosed directly in kg
    Anfo,
}

impl ExplosiveKind {
    pub const ALL: [ExplosiveKind; 3] = [ExplosiveKind::Emulsion, ExplosiveKind::Booster, ExplosiveKind::Anfo];

    pub fn display_name(&self) -> &'static str {
        match self {
            ExplosiveKind::Emulsion => "Emulsion",
            ExplosiveKind::Booster => "Booster",
            ExplosiveKind::Anfo => "ANFO",
        }
    }
}

/// Physical properties of one explosive product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExplosiveSpec {
    /// Product name shown in reports
    pub name: String,
    /// Mass of one cartridge (kg); `None` for bulk products
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cartridge_mass_kg: Option<f64>,
    /// Energy-equivalent kg per real kg
    pub equivalence: f64,
}

impl ExplosiveSpec {
    pub fn cartridged(name: impl Into<String>, cartridge_mass_kg: f64, equivalence: f64) -> Self {
        ExplosiveSpec {
            name: name.into(),
            cartridge_mass_kg: Some(cartridge_mass_kg),
            equivalence,
        }
    }

    pub fn bulk(name: impl Into<String>, equivalence: f64) -> Self {
        ExplosiveSpec {
            name: name.into(),
            cartridge_mass_kg: None,
            equivalence,
        }
    }
}

/// The three products available to a round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExplosiveCatalog {
    pub emulsion: ExplosiveSpec,
    pub booster: ExplosiveSpec,
    pub anfo: ExplosiveSpec,
}

impl Default for ExplosiveCatalog {
    fn default() -> Self {
        ExplosiveCatalog {
            emulsion: ExplosiveSpec::cartridged("Emultex", 0.1866, 1.01),
            booster: ExplosiveSpec::cartridged("Famecorte E-20", 0.139, 1.3514),
            anfo: ExplosiveSpec::bulk("ANFO", 1.0),
        }
    }
}

impl ExplosiveCatalog {
    pub fn spec(&self, kind: ExplosiveKind) -> &ExplosiveSpec {
        match kind {
            ExplosiveKind::Emulsion => &self.emulsion,
            ExplosiveKind::Booster => &self.booster,
            ExplosiveKind::Anfo => &self.anfo,
        }
    }
}

/// Charge loaded into each hole of one role.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RoleCharge {
    /// Emulsion cartridges per hole
    pub emulsion_cartridges: f64,
    /// Booster cartridges per hole
    pub booster_cartridges: f64,
    /// ANFO per hole (kg)
    pub anfo_kg: f64,
}

impl RoleCharge {
    pub fn new(emulsion_cartridges: f64, booster_cartridges: f64, anfo_kg: f64) -> Self {
        RoleCharge {
            emulsion_cartridges,
            booster_cartridges,
            anfo_kg,
        }
    }
}

/// Editable per-role loading scheme.
///
/// Roles missing from the map load nothing.
///
/// ## JSON Example
///
/// ```json
/// {
///   "charges": {
///     "floor": { "emulsion_cartridges": 17.0, "booster_cartridges": 0.0, "anfo_kg": 0.0 },
///     "back":  { "emulsion_cartridges": 1.0,  "booster_cartridges": 1.0, "anfo_kg": 6.0 }
///   }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadingScheme {
    pub charges: BTreeMap<BlastRole, RoleCharge>,
}

impl Default for LoadingScheme {
    fn default() -> Self {
        let charges = [
            (BlastRole::Reamer, RoleCharge::new(0.0, 0.0, 0.0)),
            (BlastRole::Floor, RoleCharge::new(17.0, 0.0, 0.0)),
            (BlastRole::Back, RoleCharge::new(1.0, 1.0, 6.0)),
            (BlastRole::Wall, RoleCharge::new(1.0, 1.0, 5.0)),
            (BlastRole::CutColumn, RoleCharge::new(0.8, 0.0, 3.5)),
            (BlastRole::AuxWall, RoleCharge::new(1.0, 0.0, 4.06)),
            (BlastRole::AuxBack, RoleCharge::new(0.0, 1.0, 4.06)),
            (BlastRole::Bulk, RoleCharge::new(0.0, 1.0, 4.06)),
        ]
        .into_iter()
        .collect();
        LoadingScheme { charges }
    }
}

impl LoadingScheme {
    /// Charge for a role (zero if the role is not in the scheme)
    pub fn charge(&self, role: BlastRole) -> RoleCharge {
        self.charges.get(&role).copied().unwrap_or_default()
    }

    /// Replace the charge for one role.
    ///
    /// Negative quantities are rejected.
    pub fn set_charge(&mut self, role: BlastRole, charge: RoleCharge) -> DesignResult<()> {
        check_charge(role, &charge)?;
        self.charges.insert(role, charge);
        Ok(())
    }

    /// Check every stored charge, e.g. after loading a hand-edited file.
    pub fn validate(&self) -> DesignResult<()> {
        self.charges
            .iter()
            .try_for_each(|(role, charge)| check_charge(*role, charge))
    }
}

fn check_charge(role: BlastRole, charge: &RoleCharge) -> DesignResult<()> {
    for (field, value) in [
        ("emulsion_cartridges", charge.emulsion_cartridges),
        ("booster_cartridges", charge.booster_cartridges),
        ("anfo_kg", charge.anfo_kg),
    ] {
        if !value.is_finite() || value < 0.0 {
            return Err(DesignError::invalid_config(
                format!("{}.{}", role, field),
                format!("must be a non-negative number, got {}", value),
            ));
        }
    }
    Ok(())
}

/// Relative participation of each product in the by-participation mode.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ParticipationWeights {
    pub emulsion: f64,
    pub booster: f64,
    pub anfo: f64,
}

impl ParticipationWeights {
    fn weight(&self, kind: ExplosiveKind) -> f64 {
        match kind {
            ExplosiveKind::Emulsion => self.emulsion,
            ExplosiveKind::Booster => self.booster,
            ExplosiveKind::Anfo => self.anfo,
        }
    }
}

/// How the explosive mass of a round is determined.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "kebab-case")]
pub enum DistributionMode {
    /// Per-role loading scheme
    #[default]
    ByRole,
    /// Target powder factor split by participation weights
    ByParticipation {
        weights: ParticipationWeights,
        /// Target energy-equivalent kg per m³ of bulked rock
        density_kg_eq_per_m3: f64,
    },
}

/// Quantity of one product in a round.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ExplosiveAmount {
    /// Cartridge count; `None` for bulk products
    pub cartridges: Option<f64>,
    /// Real mass (kg)
    pub real_kg: f64,
    /// Energy-equivalent mass (kg eq)
    pub equivalent_kg: f64,
}

/// Explosive totals for one round.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExplosiveTotals {
    pub emulsion: ExplosiveAmount,
    pub booster: ExplosiveAmount,
    pub anfo: ExplosiveAmount,
    /// Sum of equivalent masses (kg eq)
    pub total_equivalent_kg: f64,
    /// Total equivalent kg per m³ of bulked rock
    pub loading_factor: f64,
}

impl ExplosiveTotals {
    pub fn amount(&self, kind: ExplosiveKind) -> &ExplosiveAmount {
        match kind {
            ExplosiveKind::Emulsion => &self.emulsion,
            ExplosiveKind::Booster => &self.booster,
            ExplosiveKind::Anfo => &self.anfo,
        }
    }

    /// Total real mass across all products (kg)
    pub fn total_real_kg(&self) -> f64 {
        self.emulsion.real_kg + self.booster.real_kg + self.anfo.real_kg
    }
}

/// Amount from a real mass
fn from_real_kg(spec: &ExplosiveSpec, real_kg: f64) -> ExplosiveAmount {
    ExplosiveAmount {
        cartridges: spec.cartridge_mass_kg.map(|mass| real_kg / mass),
        real_kg,
        equivalent_kg: real_kg * spec.equivalence,
    }
}

/// Amount from an equivalent mass
fn from_equivalent_kg(spec: &ExplosiveSpec, equivalent_kg: f64) -> ExplosiveAmount {
    let real_kg = equivalent_kg / spec.equivalence;
    ExplosiveAmount {
        cartridges: spec.cartridge_mass_kg.map(|mass| real_kg / mass),
        real_kg,
        equivalent_kg,
    }
}

/// Compute explosive totals for a round.
///
/// # Arguments
///
/// * `counts` - Holes per role
/// * `volume_m3` - Bulked rock volume
/// * `scheme` - Per-role charges (read by the by-role mode only)
/// * `catalog` - Cartridge masses and equivalence factors
/// * `mode` - Distribution mode
///
/// # Returns
///
/// * `Err(DesignError::NoExplosiveDistribution)` when there are no holes,
///   the participation weights are negative or sum to zero, the target
///   density is not positive, or the round ends up with no charge at all.
pub fn distribute(
    counts: &RoleCounts,
    volume_m3: f64,
    scheme: &LoadingScheme,
    catalog: &ExplosiveCatalog,
    mode: &DistributionMode,
) -> DesignResult<ExplosiveTotals> {
    let hole_count: usize = counts.values().sum();
    if hole_count == 0 {
        return Err(DesignError::no_distribution("round has no holes"));
    }
    if !volume_m3.is_finite() || volume_m3 <= 0.0 {
        return Err(DesignError::no_distribution(format!(
            "rock volume must be positive, got {}",
            volume_m3
        )));
    }

    let (emulsion, booster, anfo) = match mode {
        DistributionMode::ByRole => by_role(counts, scheme, catalog),
        DistributionMode::ByParticipation {
            weights,
            density_kg_eq_per_m3,
        } => by_participation(weights, *density_kg_eq_per_m3, volume_m3, catalog)?,
    };

    let total_equivalent_kg = emulsion.equivalent_kg + booster.equivalent_kg + anfo.equivalent_kg;
    if total_equivalent_kg <= 0.0 {
        return Err(DesignError::no_distribution(
            "loading scheme assigns no explosive to any hole in this round",
        ));
    }

    Ok(ExplosiveTotals {
        emulsion,
        booster,
        anfo,
        total_equivalent_kg,
        loading_factor: total_equivalent_kg / volume_m3,
    })
}

fn by_role(
    counts: &RoleCounts,
    scheme: &LoadingScheme,
    catalog: &ExplosiveCatalog,
) -> (ExplosiveAmount, ExplosiveAmount, ExplosiveAmount) {
    let mut emulsion_cartridges = 0.0;
    let mut booster_cartridges = 0.0;
    let mut anfo_kg = 0.0;

    for (&role, &count) in counts {
        let n = count as f64;
        let charge = scheme.charge(role);
        emulsion_cartridges += n * charge.emulsion_cartridges;
        booster_cartridges += n * charge.booster_cartridges;
        anfo_kg += n * charge.anfo_kg;
    }

    let cartridge_amount = |spec: &ExplosiveSpec, cartridges: f64| {
        let real_kg = cartridges * spec.cartridge_mass_kg.unwrap_or(0.0);
        ExplosiveAmount {
            cartridges: Some(cartridges),
            real_kg,
            equivalent_kg: real_kg * spec.equivalence,
        }
    };

    (
        cartridge_amount(&catalog.emulsion, emulsion_cartridges),
        cartridge_amount(&catalog.booster, booster_cartridges),
        from_real_kg(&catalog.anfo, anfo_kg),
    )
}

fn by_participation(
    weights: &ParticipationWeights,
    density_kg_eq_per_m3: f64,
    volume_m3: f64,
    catalog: &ExplosiveCatalog,
) -> DesignResult<(ExplosiveAmount, ExplosiveAmount, ExplosiveAmount)> {
    if ExplosiveKind::ALL.iter().any(|&k| {
        let w = weights.weight(k);
        !w.is_finite() || w < 0.0
    }) {
        return Err(DesignError::no_distribution("participation weights must be non-negative"));
    }
    let weight_sum: f64 = ExplosiveKind::ALL.iter().map(|&k| weights.weight(k)).sum();
    if weight_sum <= 0.0 {
        return Err(DesignError::no_distribution("participation weights sum to zero"));
    }
    if !density_kg_eq_per_m3.is_finite() || density_kg_eq_per_m3 <= 0.0 {
        return Err(DesignError::no_distribution(format!(
            "target density must be positive, got {}",
            density_kg_eq_per_m3
        )));
    }

    let total_eq = density_kg_eq_per_m3 * volume_m3;
    let share = |kind: ExplosiveKind| total_eq * weights.weight(kind) / weight_sum;

    Ok((
        from_equivalent_kg(&catalog.emulsion, share(ExplosiveKind::Emulsion)),
        from_equivalent_kg(&catalog.booster, share(ExplosiveKind::Booster)),
        from_equivalent_kg(&catalog.anfo, share(ExplosiveKind::Anfo)),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference_counts() -> RoleCounts {
        [
            (BlastRole::Reamer, 3),
            (BlastRole::Floor, 8),
            (BlastRole::Back, 10),
            (BlastRole::Wall, 12),
            (BlastRole::CutColumn, 14),
            (BlastRole::AuxWall, 10),
            (BlastRole::AuxBack, 7),
            (BlastRole::Bulk, 20),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_by_role_totals() {
        let totals = distribute(
            &reference_counts(),
            100.0,
            &LoadingScheme::default(),
            &ExplosiveCatalog::default(),
            &DistributionMode::ByRole,
        )
        .unwrap();

        // emulsion: 8*17 + 10*1 + 12*1 + 14*0.8 + 10*1 = 179.2
        let emulsion_cart = totals.emulsion.cartridges.unwrap();
        assert!((emulsion_cart - 179.2).abs() < 1e-9);
        assert!((totals.emulsion.real_kg - 179.2 * 0.1866).abs() < 1e-9);

        // booster: 10 + 12 + 7 + 20 = 49
        assert!((totals.booster.cartridges.unwrap() - 49.0).abs() < 1e-9);
        assert!((totals.booster.equivalent_kg - 49.0 * 0.139 * 1.3514).abs() < 1e-9);

        // anfo: 10*6 + 12*5 + 14*3.5 + 10*4.06 + 7*4.06 + 20*4.06
        let anfo = 60.0 + 60.0 + 49.0 + 37.0 * 4.06;
        assert!((totals.anfo.real_kg - anfo).abs() < 1e-9);
        assert!(totals.anfo.cartridges.is_none());

        let real: f64 = ExplosiveKind::ALL.iter().map(|&k| totals.amount(k).real_kg).sum();
        assert!((real - totals.total_real_kg()).abs() < 1e-9);
        assert_eq!(totals.amount(ExplosiveKind::Anfo), &totals.anfo);
    }

    #[test]
    fn test_loading_factor_consistency() {
        let volume = 87.3;
        let totals = distribute(
            &reference_counts(),
            volume,
            &LoadingScheme::default(),
            &ExplosiveCatalog::default(),
            &DistributionMode::ByRole,
        )
        .unwrap();
        let sum = totals.emulsion.equivalent_kg + totals.booster.equivalent_kg + totals.anfo.equivalent_kg;
        assert!((totals.total_equivalent_kg - sum).abs() < 1e-9);
        assert!((totals.loading_factor - totals.total_equivalent_kg / volume).abs() < 1e-9);
    }

    #[test]
    fn test_missing_role_loads_nothing() {
        let mut scheme = LoadingScheme::default();
        scheme.charges.remove(&BlastRole::Floor);
        assert_eq!(scheme.charge(BlastRole::Floor), RoleCharge::default());

        let mut counts = RoleCounts::new();
        counts.insert(BlastRole::Floor, 8);
        counts.insert(BlastRole::Back, 1);
        let totals = distribute(
            &counts,
            10.0,
            &scheme,
            &ExplosiveCatalog::default(),
            &DistributionMode::ByRole,
        )
        .unwrap();
        assert!((totals.emulsion.cartridges.unwrap() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_by_participation_split() {
        let mode = DistributionMode::ByParticipation {
            weights: ParticipationWeights {
                emulsion: 1.0,
                booster: 1.0,
                anfo: 2.0,
            },
            density_kg_eq_per_m3: 1.2,
        };
        let catalog = ExplosiveCatalog::default();
        let totals = distribute(&reference_counts(), 50.0, &LoadingScheme::default(), &catalog, &mode).unwrap();

        assert!((totals.total_equivalent_kg - 60.0).abs() < 1e-9);
        assert!((totals.loading_factor - 1.2).abs() < 1e-9);
        assert!((totals.anfo.equivalent_kg - 30.0).abs() < 1e-9);
        assert!((totals.booster.real_kg - 15.0 / 1.3514).abs() < 1e-9);
        let cartridges = totals.emulsion.cartridges.unwrap();
        assert!((cartridges - 15.0 / 1.01 / 0.1866).abs() < 1e-9);
    }

    #[test]
    fn test_zero_weights_fail() {
        let mode = DistributionMode::ByParticipation {
            weights: ParticipationWeights::default(),
            density_kg_eq_per_m3: 1.2,
        };
        let err = distribute(
            &reference_counts(),
            50.0,
            &LoadingScheme::default(),
            &ExplosiveCatalog::default(),
            &mode,
        )
        .unwrap_err();
        assert_eq!(err.error_code(), "NO_EXPLOSIVE_DISTRIBUTION");
    }

    #[test]
    fn test_negative_weight_fails() {
        let mode = DistributionMode::ByParticipation {
            weights: ParticipationWeights {
                emulsion: 2.0,
                booster: -1.0,
                anfo: 0.0,
            },
            density_kg_eq_per_m3: 1.2,
        };
        assert!(distribute(
            &reference_counts(),
            50.0,
            &LoadingScheme::default(),
            &ExplosiveCatalog::default(),
            &mode
        )
        .is_err());
    }

    #[test]
    fn test_no_holes_fail() {
        let err = distribute(
            &RoleCounts::new(),
            50.0,
            &LoadingScheme::default(),
            &ExplosiveCatalog::default(),
            &DistributionMode::ByRole,
        )
        .unwrap_err();
        assert_eq!(err.error_code(), "NO_EXPLOSIVE_DISTRIBUTION");
    }

    #[test]
    fn test_empty_scheme_fails() {
        let scheme = LoadingScheme {
            charges: BTreeMap::new(),
        };
        assert!(distribute(
            &reference_counts(),
            50.0,
            &scheme,
            &ExplosiveCatalog::default(),
            &DistributionMode::ByRole
        )
        .is_err());
    }

    #[test]
    fn test_set_charge_rejects_negative() {
        let mut scheme = LoadingScheme::default();
        assert!(scheme.set_charge(BlastRole::Bulk, RoleCharge::new(0.0, -1.0, 4.0)).is_err());
        scheme.set_charge(BlastRole::Bulk, RoleCharge::new(0.5, 1.0, 4.5)).unwrap();
        assert_eq!(scheme.charge(BlastRole::Bulk).anfo_kg, 4.5);
    }

    #[test]
    fn test_scheme_validate() {
        assert!(LoadingScheme::default().validate().is_ok());

        let mut scheme = LoadingScheme::default();
        scheme.charges.insert(BlastRole::Wall, RoleCharge::new(1.0, f64::NAN, 5.0));
        assert_eq!(scheme.validate().unwrap_err().error_code(), "INVALID_CONFIG");

        scheme.charges.insert(BlastRole::Wall, RoleCharge::new(1.0, 1.0, -5.0));
        assert!(scheme.validate().is_err());
    }

    #[test]
    fn test_scheme_serialization() {
        let scheme = LoadingScheme::default();
        let json = serde_json::to_string_pretty(&scheme).unwrap();
        assert!(json.contains("\"cut-column\""));
        let roundtrip: LoadingScheme = serde_json::from_str(&json).unwrap();
        assert_eq!(roundtrip, scheme);
    }

    #[test]
    fn test_mode_serialization() {
        let mode: DistributionMode = serde_json::from_str(
            r#"{"mode":"by-participation","weights":{"emulsion":1.0,"anfo":3.0},"density_kg_eq_per_m3":1.1}"#,
        )
        .unwrap();
        match mode {
            DistributionMode::ByParticipation { weights, .. } => {
                assert_eq!(weights.booster, 0.0);
                assert_eq!(weights.anfo, 3.0);
            }
            DistributionMode::ByRole => panic!("expected by-participation"),
        }
    }
}
