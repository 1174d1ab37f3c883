#![forbid(unsafe_code)]

//! Core calculation engine for cable voltage-drop sizing.
//!
//! This crate provides:
//! - Domain types (cable families, conductors, requests, results)
//! - Conductor catalog with temperature compensation
//! - Forward voltage-drop calculation and reverse core-count solving
//! - Configuration, logging and named presets

pub mod types;
pub mod error;
pub mod catalog;
pub mod compensation;
pub mod config;
pub mod logging;
pub mod presets;
pub mod engine;

// Re-export commonly used types
pub use error::{Error, Result};
pub use types::*;
pub use catalog::{build_default_catalog, default_catalog, Catalog, ConductorLookup};
pub use compensation::compensate;
pub use config::Config;
pub use presets::{Preset, PresetOutcome, PresetStore};
pub use engine::{compute_voltage_drop, solve_core_count};
