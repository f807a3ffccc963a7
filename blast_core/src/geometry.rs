//! # Geometry Calculator
//!
//! Cross-section area, bulked rock volume and burden/spacing derivation.
//!
//! Tunnels are modelled either as a plain rectangle or as a horseshoe: a
//! rectangle of height `height - width/2` (clamped at 0) topped by a
//! semicircular arch of radius `width/2`.
//!
//! ## Example
//!
//! ```rust
//! use blast_core::geometry::{section_area, volume};
//!
//! let area = section_area(5.2, 6.1);
//! let bulked = volume(area, 3.5, 1.18);
//! assert!(bulked > area);
//! ```

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use crate::errors::{DesignError, DesignResult};

/// Tunnel cross-section: width, height and round advance, all in metres.
///
/// ## JSON Example
///
/// ```json
/// { "width_m": 5.2, "height_m": 6.1, "length_m": 3.5 }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Section {
    /// Section width (m)
    pub width_m: f64,
    /// Section height from floor to crown (m)
    pub height_m: f64,
    /// Advance / round length (m)
    pub length_m: f64,
}

impl Section {
    pub fn new(width_m: f64, height_m: f64, length_m: f64) -> Self {
        Section {
            width_m,
            height_m,
            length_m,
        }
    }

    /// Validate that every dimension is finite and positive.
    pub fn validate(&self) -> DesignResult<()> {
        for (field, value, what) in [
            ("width_m", self.width_m, "Width"),
            ("height_m", self.height_m, "Height"),
            ("length_m", self.length_m, "Advance"),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(DesignError::invalid_geometry(
                    field,
                    value.to_string(),
                    format!("{} must be a positive number", what),
                ));
            }
        }
        Ok(())
    }
}

/// Horseshoe section area (m²).
///
/// `width * max(height - width/2, 0) + π (width/2)² / 2`. Degenerates to a
/// pure semicircle when `height <= width/2`.
pub fn section_area(width: f64, height: f64) -> f64 {
    let radius = width / 2.0;
    let wall_height = (height - radius).max(0.0);
    width * wall_height + PI * radius * radius / 2.0
}

/// Bulked volume of broken rock (m³).
pub fn volume(area: f64, length: f64, bulking_factor: f64) -> f64 {
    area * bulking_factor * length
}

/// Shape used for the section area.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SectionProfile {
    /// Full rectangle `width * height`
    Rectangle,
    /// Rectangle plus semicircular crown
    #[default]
    Horseshoe,
}

impl SectionProfile {
    /// Area of this profile for the given width and height (m²)
    pub fn area(&self, width: f64, height: f64) -> f64 {
        match self {
            SectionProfile::Rectangle => width * height,
            SectionProfile::Horseshoe => section_area(width, height),
        }
    }
}

/// Rock quality classes, from hardest to softest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RockClass {
    VeryHard,
    #[default]
    Hard,
    Medium,
    Soft,
}

impl RockClass {
    /// All rock classes, hardest first
    pub const ALL: [RockClass; 4] = [
        RockClass::VeryHard,
        RockClass::Hard,
        RockClass::Medium,
        RockClass::Soft,
    ];

    /// Short code used on the command line and in files
    pub fn code(&self) -> &'static str {
        match self {
            RockClass::VeryHard => "very-hard",
            RockClass::Hard => "hard",
            RockClass::Medium => "medium",
            RockClass::Soft => "soft",
        }
    }

    /// Parse from common string representations
    pub fn from_str_flexible(s: &str) -> DesignResult<Self> {
        match s.trim().to_lowercase().replace([' ', '_'], "-").as_str() {
            "very-hard" | "veryhard" | "muy-dura" => Ok(RockClass::VeryHard),
            "hard" | "dura" => Ok(RockClass::Hard),
            "medium" | "media" => Ok(RockClass::Medium),
            "soft" | "blanda" => Ok(RockClass::Soft),
            _ => Err(DesignError::invalid_config(
                "rock_class",
                format!(
                    "unknown rock class '{}', expected one of: {}",
                    s,
                    RockClass::ALL.map(|r| r.code()).join(", ")
                ),
            )),
        }
    }
}

impl std::fmt::Display for RockClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Burden/spacing multipliers per rock class.
///
/// Harder rock gets a factor below 1 to densify the pattern, softer rock
/// above 1 to open it up.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RockFactors {
    pub very_hard: f64,
    pub hard: f64,
    pub medium: f64,
    pub soft: f64,
}

impl Default for RockFactors {
    fn default() -> Self {
        RockFactors {
            very_hard: 0.95,
            hard: 1.0,
            medium: 1.05,
            soft: 1.1,
        }
    }
}

impl RockFactors {
    /// Factor for the given rock class
    pub fn factor(&self, rock: RockClass) -> f64 {
        match rock {
            RockClass::VeryHard => self.very_hard,
            RockClass::Hard => self.hard,
            RockClass::Medium => self.medium,
            RockClass::Soft => self.soft,
        }
    }
}

/// How burden and spacing are chosen for a round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BurdenModel {
    /// Operator supplies burden and spacing
    Manual,
    /// Configured derivation, no rock adjustment
    Simple,
    /// Configured derivation scaled by the rock factor
    #[default]
    RockAdjusted,
}

impl BurdenModel {
    pub const ALL: [BurdenModel; 3] = [BurdenModel::Manual, BurdenModel::Simple, BurdenModel::RockAdjusted];

    pub fn code(&self) -> &'static str {
        match self {
            BurdenModel::Manual => "manual",
            BurdenModel::Simple => "simple",
            BurdenModel::RockAdjusted => "rock-adjusted",
        }
    }

    /// Parse from common string representations
    pub fn from_str_flexible(s: &str) -> DesignResult<Self> {
        match s.trim().to_lowercase().replace([' ', '_'], "-").as_str() {
            "manual" => Ok(BurdenModel::Manual),
            "simple" | "simplificado" => Ok(BurdenModel::Simple),
            "rock-adjusted" | "rock" | "roca" => Ok(BurdenModel::RockAdjusted),
            _ => Err(DesignError::invalid_config(
                "burden_model",
                format!(
                    "unknown burden model '{}', expected one of: {}",
                    s,
                    BurdenModel::ALL.map(|m| m.code()).join(", ")
                ),
            )),
        }
    }
}

impl std::fmt::Display for BurdenModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Base burden/spacing before any rock adjustment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum BurdenDerivation {
    /// Fixed base values regardless of hole diameter
    FixedBase { burden_m: f64, spacing_m: f64 },
    /// `burden = coefficient * diameter`, `spacing = spacing_ratio * burden`
    DiameterCoefficient { coefficient: f64, spacing_ratio: f64 },
}

impl Default for BurdenDerivation {
    fn default() -> Self {
        BurdenDerivation::FixedBase {
            burden_m: 0.60,
            spacing_m: 0.80,
        }
    }
}

/// Burden and spacing pair (m)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BurdenSpacing {
    pub burden_m: f64,
    pub spacing_m: f64,
}

/// Recommended burden/spacing for a hole diameter, model and rock class.
///
/// Returns `Ok(None)` for [`BurdenModel::Manual`]; the caller supplies the
/// values. The diameter (mm) is only read by the diameter-coefficient
/// derivation, which fails on a non-positive diameter.
///
/// # Example
///
/// ```rust
/// use blast_core::geometry::{burden_spacing, BurdenDerivation, BurdenModel, RockClass, RockFactors};
///
/// let bs = burden_spacing(
///     45.0,
///     BurdenModel::RockAdjusted,
///     RockClass::Soft,
///     &BurdenDerivation::default(),
///     &RockFactors::default(),
/// )
/// .unwrap()
/// .unwrap();
/// assert!((bs.burden_m - 0.66).abs() < 1e-9);
/// ```
pub fn burden_spacing(
    diameter_mm: f64,
    model: BurdenModel,
    rock: RockClass,
    derivation: &BurdenDerivation,
    rock_factors: &RockFactors,
) -> DesignResult<Option<BurdenSpacing>> {
    let factor = match model {
        BurdenModel::Manual => return Ok(None),
        BurdenModel::Simple => 1.0,
        BurdenModel::RockAdjusted => rock_factors.factor(rock),
    };

    let (burden_m, spacing_m) = match *derivation {
        BurdenDerivation::FixedBase { burden_m, spacing_m } => (burden_m, spacing_m),
        BurdenDerivation::DiameterCoefficient {
            coefficient,
            spacing_ratio,
        } => {
            if !diameter_mm.is_finite() || diameter_mm <= 0.0 {
                return Err(DesignError::invalid_burden_spacing(
                    "diameter_mm",
                    diameter_mm.to_string(),
                    "Hole diameter must be positive to derive burden",
                ));
            }
            let burden = coefficient * diameter_mm / 1000.0;
            (burden, burden * spacing_ratio)
        }
    };

    Ok(Some(BurdenSpacing {
        burden_m: burden_m * factor,
        spacing_m: spacing_m * factor,
    }))
}
