//! # Design Configuration
//!
//! Every tunable constant and policy of the design engine lives in
//! [`DesignConfig`]: section profile, bulking factor, burden derivation, rock
//! factors, grid sizing, classifier quota order, explosive catalog,
//! distribution mode, firing plan and powder-factor target.
//!
//! The defaults are the reference values. Config files are TOML and may list
//! only the fields they change.
//!
//! ## TOML Example
//!
//! ```toml
//! section_profile = "rectangle"
//! bulking_factor = 1.2
//!
//! [burden_derivation]
//! kind = "diameter-coefficient"
//! coefficient = 13.5
//! spacing_ratio = 1.15
//!
//! [grid]
//! rounding = "ceil"
//! extra_rows = 0
//! ```

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::classify::{default_role_quotas, RoleQuota};
use crate::errors::{DesignError, DesignResult};
use crate::explosives::{DistributionMode, ExplosiveCatalog, ExplosiveKind};
use crate::geometry::{BurdenDerivation, RockClass, RockFactors, SectionProfile};
use crate::grid::GridPolicy;
use crate::round::LoadingFactorTarget;
use crate::sequence::FiringPlan;

/// Swell of broken rock relative to in-situ rock
pub const DEFAULT_BULKING_FACTOR: f64 = 1.18;

static REFERENCE: Lazy<DesignConfig> = Lazy::new(DesignConfig::default);

/// Complete engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DesignConfig {
    /// Shape used for the section area
    pub section_profile: SectionProfile,
    /// Volumetric swell applied to the in-situ volume
    pub bulking_factor: f64,
    /// Base burden/spacing for the simple and rock-adjusted models
    pub burden_derivation: BurdenDerivation,
    /// Burden/spacing factor per rock class
    pub rock_factors: RockFactors,
    /// Grid sizing policy
    pub grid: GridPolicy,
    /// Quota roles in allocation order
    pub role_quotas: Vec<RoleQuota>,
    /// Explosive products
    pub explosives: ExplosiveCatalog,
    /// How explosive mass is determined
    pub distribution: DistributionMode,
    /// Firing order and delays
    pub firing: FiringPlan,
    /// Powder-factor target used to assess rounds
    pub loading_factor_target: LoadingFactorTarget,
}

impl Default for DesignConfig {
    fn default() -> Self {
        DesignConfig {
            section_profile: SectionProfile::Horseshoe,
            bulking_factor: DEFAULT_BULKING_FACTOR,
            burden_derivation: BurdenDerivation::default(),
            rock_factors: RockFactors::default(),
            grid: GridPolicy::default(),
            role_quotas: default_role_quotas(),
            explosives: ExplosiveCatalog::default(),
            distribution: DistributionMode::ByRole,
            firing: FiringPlan::default(),
            loading_factor_target: LoadingFactorTarget::default(),
        }
    }
}

fn require_positive(field: &str, value: f64) -> DesignResult<()> {
    if !value.is_finite() || value <= 0.0 {
        return Err(DesignError::invalid_config(
            field,
            format!("must be a positive number, got {}", value),
        ));
    }
    Ok(())
}

impl DesignConfig {
    /// Shared reference configuration
    pub fn reference() -> &'static DesignConfig {
        &REFERENCE
    }

    /// Parse a TOML document; missing fields take reference values.
    pub fn from_toml_str(s: &str) -> DesignResult<Self> {
        let config: DesignConfig = toml::from_str(s).map_err(|e| DesignError::SerializationError {
            reason: format!("Invalid design config: {}", e),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Render as a TOML document
    pub fn to_toml_string(&self) -> DesignResult<String> {
        toml::to_string_pretty(self).map_err(|e| DesignError::SerializationError {
            reason: e.to_string(),
        })
    }

    /// Check every constant and ordered list for consistency.
    pub fn validate(&self) -> DesignResult<()> {
        require_positive("bulking_factor", self.bulking_factor)?;

        match self.burden_derivation {
            BurdenDerivation::FixedBase { burden_m, spacing_m } => {
                require_positive("burden_derivation.burden_m", burden_m)?;
                require_positive("burden_derivation.spacing_m", spacing_m)?;
            }
            BurdenDerivation::DiameterCoefficient {
                coefficient,
                spacing_ratio,
            } => {
                require_positive("burden_derivation.coefficient", coefficient)?;
                require_positive("burden_derivation.spacing_ratio", spacing_ratio)?;
            }
        }

        for rock in RockClass::ALL {
            require_positive(&format!("rock_factors.{}", rock), self.rock_factors.factor(rock))?;
        }

        if self.grid.max_holes == 0 {
            return Err(DesignError::invalid_config("grid.max_holes", "must be at least 1"));
        }

        for (idx, quota) in self.role_quotas.iter().enumerate() {
            if quota.role.is_zone_bound() {
                return Err(DesignError::invalid_config(
                    "role_quotas",
                    format!("role '{}' is assigned by zone and cannot take a quota", quota.role),
                ));
            }
            if self.role_quotas[..idx].iter().any(|q| q.role == quota.role) {
                return Err(DesignError::invalid_config(
                    "role_quotas",
                    format!("role '{}' is listed more than once", quota.role),
                ));
            }
        }

        for kind in ExplosiveKind::ALL {
            let spec = self.explosives.spec(kind);
            require_positive(&format!("explosives.{}.equivalence", spec.name), spec.equivalence)?;
            match (kind, spec.cartridge_mass_kg) {
                (ExplosiveKind::Anfo, None) => {}
                (_, Some(mass)) => {
                    require_positive(&format!("explosives.{}.cartridge_mass_kg", spec.name), mass)?;
                }
                (_, None) => {
                    return Err(DesignError::invalid_config(
                        format!("explosives.{}.cartridge_mass_kg", spec.name),
                        "cartridged products need a cartridge mass",
                    ));
                }
            }
        }

        self.firing.validate()?;

        require_positive(
            "loading_factor_target.target_kg_eq_per_m3",
            self.loading_factor_target.target_kg_eq_per_m3,
        )?;
        if !self.loading_factor_target.tolerance.is_finite() || self.loading_factor_target.tolerance < 0.0 {
            return Err(DesignError::invalid_config(
                "loading_factor_target.tolerance",
                "must be zero or positive",
            ));
        }

        Ok(())
    }
}
