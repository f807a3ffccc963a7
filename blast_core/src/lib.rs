//! # blast_core - Drill-and-Blast Round Design Engine
//!
//! `blast_core` is the computational heart of Tronadura. Given a tunnel face
//! (width, height, advance), a drilling diameter, a burden model and a rock
//! class, it lays out the drill holes, gives every hole a blasting role,
//! sizes the explosive charge and orders the firing sequence. All inputs and
//! outputs are JSON-serializable.
//!
//! ## Design Philosophy
//!
//! - **Stateless**: [`compute_round`] is a pure function of its input, the
//!   loading scheme and the config
//! - **JSON-First**: All types implement Serialize/Deserialize
//! - **Rich Errors**: Structured error types, not just strings
//! - **Configurable**: Every constant lives in [`DesignConfig`]
//!
//! ## Quick Start
//!
//! ```rust
//! use blast_core::{compute_round, DesignConfig, LoadingScheme, RoundInput};
//! use blast_core::geometry::{BurdenModel, RockClass, Section};
//! use blast_core::round::RoundMetadata;
//!
//! let input = RoundInput {
//!     section: Section::new(5.2, 6.1, 3.5),
//!     burden_model: BurdenModel::Manual,
//!     rock_class: RockClass::Hard,
//!     diameter_mm: 45.0,
//!     burden_m: Some(0.6),
//!     spacing_m: Some(0.8),
//!     metadata: RoundMetadata::new("CT-2031", "North Decline"),
//! };
//!
//! let round = compute_round(&input, &LoadingScheme::default(), DesignConfig::reference()).unwrap();
//! println!("{} holes, {:.2} kg-eq/m³", round.hole_count(), round.loading_factor());
//! ```
//!
//! ## Modules
//!
//! - [`geometry`] - Section area, volume and burden/spacing models
//! - [`grid`] - Drill-hole grid and structural zones
//! - [`classify`] - Blasting role assignment
//! - [`explosives`] - Explosive catalog, loading scheme and distribution
//! - [`sequence`] - Firing order and delays
//! - [`round`] - Round assembly and powder-factor assessment
//! - [`round_log`] - Saved-round container
//! - [`config`] - Engine configuration
//! - [`errors`] - Structured error types
//! - [`file_io`] - File operations with atomic saves and locking

pub mod classify;
pub mod config;
pub mod errors;
pub mod explosives;
pub mod file_io;
pub mod geometry;
pub mod grid;
pub mod round;
pub mod round_log;
pub mod sequence;

// Re-export commonly used types at crate root for convenience
pub use config::DesignConfig;
pub use errors::{DesignError, DesignResult};
pub use explosives::LoadingScheme;
pub use file_io::{load_config, load_round_log, load_scheme, save_round_log, save_scheme, FileLock};
pub use round::{compute_round, Round, RoundInput};
pub use round_log::RoundLog;
