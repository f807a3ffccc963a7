//! # Round Design
//!
//! [`compute_round`] chains the whole engine: geometry, burden/spacing, grid,
//! classification, explosives and firing sequence. Every check runs before
//! the [`Round`] is assembled, so a caller gets either a complete round or a
//! [`DesignError`].
//!
//! ## Example
//!
//! ```rust
//! use blast_core::config::DesignConfig;
//! use blast_core::explosives::LoadingScheme;
//! use blast_core::geometry::{BurdenModel, RockClass, Section};
//! use blast_core::round::{compute_round, RoundInput, RoundMetadata};
//!
//! let input = RoundInput {
//!     section: Section::new(5.2, 6.1, 3.5),
//!     burden_model: BurdenModel::Simple,
//!     rock_class: RockClass::Hard,
//!     diameter_mm: 45.0,
//!     burden_m: None,
//!     spacing_m: None,
//!     metadata: RoundMetadata::new("CT-2031", "North Decline"),
//! };
//!
//! let round = compute_round(&input, &LoadingScheme::default(), DesignConfig::reference()).unwrap();
//! assert_eq!(round.hole_count(), 84);
//! assert_eq!(round.sequence.len(), 84);
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::classify::{classify, count_roles, ClassifiedHole, RoleCounts};
use crate::config::DesignConfig;
use crate::errors::{DesignError, DesignResult};
use crate::explosives::{distribute, ExplosiveTotals, LoadingScheme};
use crate::geometry::{burden_spacing, volume, BurdenModel, BurdenSpacing, RockClass, Section};
use crate::grid::generate_grid;
use crate::sequence::{sequence, SequencedHole};

/// Free-text identification of a round.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RoundMetadata {
    /// Contract identifier
    pub contract: String,
    /// Mine / site identifier
    pub site: String,
    /// Operator notes
    pub notes: String,
}

impl RoundMetadata {
    pub fn new(contract: impl Into<String>, site: impl Into<String>) -> Self {
        RoundMetadata {
            contract: contract.into(),
            site: site.into(),
            notes: String::new(),
        }
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = notes.into();
        self
    }
}

/// Operator input for one round.
///
/// ## JSON Example
///
/// ```json
/// {
///   "section": { "width_m": 5.2, "height_m": 6.1, "length_m": 3.5 },
///   "burden_model": "manual",
///   "rock_class": "medium",
///   "diameter_mm": 45.0,
///   "burden_m": 0.6,
///   "spacing_m": 0.8,
///   "metadata": { "contract": "CT-2031", "site": "North Decline", "notes": "" }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundInput {
    pub section: Section,
    pub burden_model: BurdenModel,
    pub rock_class: RockClass,
    /// Drill-hole diameter (mm)
    pub diameter_mm: f64,
    /// Burden for the manual model (m); ignored otherwise
    #[serde(default)]
    pub burden_m: Option<f64>,
    /// Spacing for the manual model (m); ignored otherwise
    #[serde(default)]
    pub spacing_m: Option<f64>,
    #[serde(default)]
    pub metadata: RoundMetadata,
}

impl RoundInput {
    /// Burden/spacing used for the round, derived or taken from the input.
    pub fn resolve_burden_spacing(&self, config: &DesignConfig) -> DesignResult<BurdenSpacing> {
        let derived = burden_spacing(
            self.diameter_mm,
            self.burden_model,
            self.rock_class,
            &config.burden_derivation,
            &config.rock_factors,
        )?;

        if let Some(bs) = derived {
            if self.burden_m.is_some() || self.spacing_m.is_some() {
                tracing::warn!(
                    model = %self.burden_model,
                    "burden/spacing overrides ignored for non-manual model"
                );
            }
            return Ok(bs);
        }

        let burden_m = manual_value("burden_m", self.burden_m)?;
        let spacing_m = manual_value("spacing_m", self.spacing_m)?;
        Ok(BurdenSpacing { burden_m, spacing_m })
    }
}

fn manual_value(field: &str, value: Option<f64>) -> DesignResult<f64> {
    match value {
        None => Err(DesignError::invalid_burden_spacing(
            field,
            "missing",
            "Manual model requires burden and spacing",
        )),
        Some(v) if !v.is_finite() || v <= 0.0 => Err(DesignError::invalid_burden_spacing(
            field,
            v.to_string(),
            "Manual burden and spacing must be positive",
        )),
        Some(v) => Ok(v),
    }
}

/// Target powder factor and tolerance band.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadingFactorTarget {
    /// Target kg eq per m³
    pub target_kg_eq_per_m3: f64,
    /// Half-width of the "near target" band (kg eq per m³)
    pub tolerance: f64,
}

impl Default for LoadingFactorTarget {
    fn default() -> Self {
        LoadingFactorTarget {
            target_kg_eq_per_m3: 1.2,
            tolerance: 0.15,
        }
    }
}

/// Where a round's powder factor sits against the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LoadingFactorStatus {
    NearTarget,
    AboveTarget,
    BelowTarget,
}

impl LoadingFactorStatus {
    pub fn description(&self) -> &'static str {
        match self {
            LoadingFactorStatus::NearTarget => "Powder factor close to target",
            LoadingFactorStatus::AboveTarget => "Powder factor above target (heavy charge)",
            LoadingFactorStatus::BelowTarget => "Powder factor below target (light charge)",
        }
    }
}

/// Powder factor compared with the configured target.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LoadingFactorAssessment {
    pub target_kg_eq_per_m3: f64,
    /// `loading_factor - target`
    pub delta: f64,
    pub status: LoadingFactorStatus,
}

impl LoadingFactorTarget {
    pub fn assess(&self, loading_factor: f64) -> LoadingFactorAssessment {
        let delta = loading_factor - self.target_kg_eq_per_m3;
        let status = if delta.abs() < self.tolerance {
            LoadingFactorStatus::NearTarget
        } else if delta > 0.0 {
            LoadingFactorStatus::AboveTarget
        } else {
            LoadingFactorStatus::BelowTarget
        };
        LoadingFactorAssessment {
            target_kg_eq_per_m3: self.target_kg_eq_per_m3,
            delta,
            status,
        }
    }
}

/// A fully designed round, as stored in the round log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Round {
    pub id: Uuid,
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
    pub metadata: RoundMetadata,

    pub section: Section,
    pub burden_model: BurdenModel,
    pub rock_class: RockClass,
    pub diameter_mm: f64,
    /// Burden actually used (m)
    pub burden_m: f64,
    /// Spacing actually used (m)
    pub spacing_m: f64,

    /// Section area (m²)
    pub area_m2: f64,
    /// Bulked rock volume (m³)
    pub volume_m3: f64,

    pub holes: Vec<ClassifiedHole>,
    pub role_counts: RoleCounts,
    pub totals: ExplosiveTotals,
    pub sequence: Vec<SequencedHole>,
    pub assessment: LoadingFactorAssessment,
}

impl Round {
    pub fn hole_count(&self) -> usize {
        self.holes.len()
    }

    pub fn loading_factor(&self) -> f64 {
        self.totals.loading_factor
    }

    /// Operator input that reproduces this round
    pub fn input(&self) -> RoundInput {
        let manual = self.burden_model == BurdenModel::Manual;
        RoundInput {
            section: self.section,
            burden_model: self.burden_model,
            rock_class: self.rock_class,
            diameter_mm: self.diameter_mm,
            burden_m: manual.then_some(self.burden_m),
            spacing_m: manual.then_some(self.spacing_m),
            metadata: self.metadata.clone(),
        }
    }
}

/// Design a complete round.
///
/// Checks run in order: configuration, geometry, burden/spacing, grid,
/// explosive distribution. The scheme and config are read once; nothing is
/// re-read mid-computation.
///
/// # Returns
///
/// * `Ok(Round)` - Complete round with a fresh id and timestamps
/// * `Err(DesignError::InvalidGeometry)` - Non-positive width, height or advance
/// * `Err(DesignError::InvalidBurdenSpacing)` - Manual model without usable values,
///   or a pattern too dense for the grid hole limit
/// * `Err(DesignError::EmptyGrid)` - No holes fit the section
/// * `Err(DesignError::NoExplosiveDistribution)` - No explosive can be assigned
pub fn compute_round(input: &RoundInput, scheme: &LoadingScheme, config: &DesignConfig) -> DesignResult<Round> {
    config.validate()?;
    input.section.validate()?;
    let bs = input.resolve_burden_spacing(config)?;

    let Section {
        width_m,
        height_m,
        length_m,
    } = input.section;

    if config
        .grid
        .dimensions(width_m, height_m, bs.burden_m, bs.spacing_m)
        .is_none()
    {
        return Err(DesignError::invalid_burden_spacing(
            "burden_m/spacing_m",
            format!("{} / {}", bs.burden_m, bs.spacing_m),
            format!("pattern needs more than {} holes for this section", config.grid.max_holes),
        ));
    }

    let grid = generate_grid(width_m, height_m, bs.burden_m, bs.spacing_m, &config.grid);
    if grid.is_empty() {
        return Err(DesignError::empty_grid(format!(
            "no holes fit a {:.2} x {:.2} m section at burden {:.2} m / spacing {:.2} m",
            width_m, height_m, bs.burden_m, bs.spacing_m
        )));
    }

    let holes = classify(&grid, width_m, height_m, &config.role_quotas);
    let role_counts = count_roles(&holes);

    let area_m2 = config.section_profile.area(width_m, height_m);
    let volume_m3 = volume(area_m2, length_m, config.bulking_factor);
    let totals = distribute(&role_counts, volume_m3, scheme, &config.explosives, &config.distribution)?;

    let sequence = sequence(&holes, width_m, &config.firing)?;
    let assessment = config.loading_factor_target.assess(totals.loading_factor);

    let now = Utc::now();
    let round = Round {
        id: Uuid::new_v4(),
        created: now,
        modified: now,
        metadata: input.metadata.clone(),
        section: input.section,
        burden_model: input.burden_model,
        rock_class: input.rock_class,
        diameter_mm: input.diameter_mm,
        burden_m: bs.burden_m,
        spacing_m: bs.spacing_m,
        area_m2,
        volume_m3,
        holes,
        role_counts,
        totals,
        sequence,
        assessment,
    };

    tracing::info!(
        id = %round.id,
        holes = round.hole_count(),
        loading_factor = round.totals.loading_factor,
        "round designed"
    );
    Ok(round)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::BlastRole;
    use crate::explosives::{DistributionMode, ParticipationWeights};

    fn manual_input(burden: Option<f64>, spacing: Option<f64>) -> RoundInput {
        RoundInput {
            section: Section::new(5.2, 6.1, 3.5),
            burden_model: BurdenModel::Manual,
            rock_class: RockClass::Medium,
            diameter_mm: 45.0,
            burden_m: burden,
            spacing_m: spacing,
            metadata: RoundMetadata::new("CT-100", "Mina Norte").with_notes("test round"),
        }
    }

    #[test]
    fn test_reference_round() {
        let round = compute_round(
            &manual_input(Some(0.60), Some(0.80)),
            &LoadingScheme::default(),
            &DesignConfig::default(),
        )
        .unwrap();

        assert_eq!(round.hole_count(), 84);
        assert_eq!(round.role_counts[&BlastRole::Reamer], 3);
        assert_eq!(round.role_counts[&BlastRole::Floor], 8);
        assert_eq!(round.role_counts.values().sum::<usize>(), 84);
        assert_eq!(round.sequence.len(), 84);
        assert_eq!(round.metadata.site, "Mina Norte");

        let expected_area = crate::geometry::section_area(5.2, 6.1);
        assert!((round.area_m2 - expected_area).abs() < 1e-9);
        assert!((round.volume_m3 - expected_area * 1.18 * 3.5).abs() < 1e-9);
        assert!((round.loading_factor() - round.totals.total_equivalent_kg / round.volume_m3).abs() < 1e-9);
    }

    #[test]
    fn test_manual_zero_burden_fails_before_grid() {
        let err = compute_round(
            &manual_input(Some(0.0), Some(0.8)),
            &LoadingScheme::default(),
            &DesignConfig::default(),
        )
        .unwrap_err();
        assert_eq!(err.error_code(), "INVALID_BURDEN_SPACING");
    }

    #[test]
    fn test_manual_missing_spacing_fails() {
        let err = compute_round(
            &manual_input(Some(0.6), None),
            &LoadingScheme::default(),
            &DesignConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, DesignError::InvalidBurdenSpacing { ref field, .. } if field == "spacing_m"));
    }

    #[test]
    fn test_invalid_geometry() {
        let mut input = manual_input(Some(0.6), Some(0.8));
        input.section.length_m = 0.0;
        let err = compute_round(&input, &LoadingScheme::default(), &DesignConfig::default()).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_GEOMETRY");
    }

    #[test]
    fn test_zero_weights_fail() {
        let config = DesignConfig {
            distribution: DistributionMode::ByParticipation {
                weights: ParticipationWeights::default(),
                density_kg_eq_per_m3: 1.2,
            },
            ..DesignConfig::default()
        };
        let err = compute_round(&manual_input(Some(0.6), Some(0.8)), &LoadingScheme::default(), &config)
            .unwrap_err();
        assert_eq!(err.error_code(), "NO_EXPLOSIVE_DISTRIBUTION");
    }

    #[test]
    fn test_empty_grid() {
        let mut config = DesignConfig::default();
        config.grid.min_columns = 0;
        config.grid.min_rows = 0;
        config.grid.extra_rows = 0;
        let input = RoundInput {
            section: Section::new(1.0, 1.0, 2.0),
            burden_m: Some(5.0),
            spacing_m: Some(5.0),
            ..manual_input(None, None)
        };
        let err = compute_round(&input, &LoadingScheme::default(), &config).unwrap_err();
        assert_eq!(err.error_code(), "EMPTY_GRID");
    }

    #[test]
    fn test_microscopic_manual_burden_is_rejected() {
        let err = compute_round(&manual_input(Some(1e-300), Some(0.8)), &LoadingScheme::default(), &DesignConfig::default())
            .unwrap_err();
        assert_eq!(err.error_code(), "INVALID_BURDEN_SPACING");

        let err = compute_round(&manual_input(Some(0.000001), Some(0.8)), &LoadingScheme::default(), &DesignConfig::default())
            .unwrap_err();
        assert_eq!(err.error_code(), "INVALID_BURDEN_SPACING");
    }

    #[test]
    fn test_hole_limit_from_config() {
        let mut config = DesignConfig::default();
        config.grid.max_holes = 50;
        let err = compute_round(&manual_input(Some(0.6), Some(0.8)), &LoadingScheme::default(), &config).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_BURDEN_SPACING");

        config.grid.max_holes = 84;
        let round = compute_round(&manual_input(Some(0.6), Some(0.8)), &LoadingScheme::default(), &config).unwrap();
        assert_eq!(round.hole_count(), 84);
    }

    #[test]
    fn test_oversized_inter_hole_delay_is_rejected() {
        let mut config = DesignConfig::default();
        config.firing.inter_hole_delay_ms = 100_000_000;
        let err = compute_round(&manual_input(Some(0.6), Some(0.8)), &LoadingScheme::default(), &config).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_CONFIG");
    }

    #[test]
    fn test_derived_model_ignores_overrides() {
        let input = RoundInput {
            burden_model: BurdenModel::RockAdjusted,
            rock_class: RockClass::Soft,
            ..manual_input(Some(2.0), Some(2.0))
        };
        let round = compute_round(&input, &LoadingScheme::default(), &DesignConfig::default()).unwrap();
        assert!((round.burden_m - 0.66).abs() < 1e-9);
        assert!((round.spacing_m - 0.88).abs() < 1e-9);
        assert!(round.input().burden_m.is_none());
    }

    #[test]
    fn test_rectangle_profile_volume() {
        let config = DesignConfig {
            section_profile: crate::geometry::SectionProfile::Rectangle,
            ..DesignConfig::default()
        };
        let round = compute_round(&manual_input(Some(0.6), Some(0.8)), &LoadingScheme::default(), &config).unwrap();
        assert!((round.area_m2 - 5.2 * 6.1).abs() < 1e-9);
    }

    #[test]
    fn test_assessment() {
        let target = LoadingFactorTarget::default();
        assert_eq!(target.assess(1.25).status, LoadingFactorStatus::NearTarget);
        assert_eq!(target.assess(1.5).status, LoadingFactorStatus::AboveTarget);
        assert_eq!(target.assess(0.9).status, LoadingFactorStatus::BelowTarget);
        assert!((target.assess(1.5).delta - 0.3).abs() < 1e-9);
    }

    #[test]
    fn test_round_input_roundtrip() {
        let round = compute_round(
            &manual_input(Some(0.6), Some(0.8)),
            &LoadingScheme::default(),
            &DesignConfig::default(),
        )
        .unwrap();
        let input = round.input();
        assert_eq!(input.burden_m, Some(0.6));
        assert_eq!(input.metadata.notes, "test round");

        let again = compute_round(&input, &LoadingScheme::default(), &DesignConfig::default()).unwrap();
        assert_eq!(again.holes, round.holes);
        assert_ne!(again.id, round.id);
    }

    #[test]
    fn test_round_serialization() {
        let round = compute_round(
            &manual_input(Some(0.6), Some(0.8)),
            &LoadingScheme::default(),
            &DesignConfig::default(),
        )
        .unwrap();
        let json = serde_json::to_string_pretty(&round).unwrap();
        assert!(json.contains("\"role_counts\""));
        assert!(json.contains("\"delay_ms\""));
        let parsed: Round = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.id, round.id);
        assert_eq!(parsed.hole_count(), 84);
    }
}
