//! Core domain types for cable voltage-drop sizing.
//!
//! This module defines the fundamental types used throughout the system:
//! - Cable families and conductor specifications
//! - Forward (voltage drop) and reverse (core count) requests
//! - Calculation results, including the infeasible reverse outcome
//! - The rounding policy applied by the core-count solver

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::compensation::REFERENCE_TEMP_C;
use crate::Error;

// ============================================================================
// Conductor Types
// ============================================================================

/// Family of cable a conductor belongs to
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum CableFamily {
    Alarm,
    Network,
}

impl CableFamily {
    pub const ALL: [CableFamily; 2] = [CableFamily::Alarm, CableFamily::Network];

    pub fn as_str(&self) -> &'static str {
        match self {
            CableFamily::Alarm => "alarm",
            CableFamily::Network => "network",
        }
    }
}

impl fmt::Display for CableFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CableFamily {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "alarm" => Ok(CableFamily::Alarm),
            "network" => Ok(CableFamily::Network),
            other => Err(Error::InvalidInput {
                field: "family",
                value: other.to_string(),
                reason: "expected 'alarm' or 'network'",
            }),
        }
    }
}

/// A physical conductor and its DC resistance at the reference temperature
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ConductorSpec {
    pub family: CableFamily,
    pub gauge_id: String,
    /// Resistance of one meter of one conductor at 20 °C, in ohms
    #[serde(alias = "resistance_per_meter_ohms")]
    pub resistance_per_meter_ref_ohms: f64,
}

impl ConductorSpec {
    pub fn new(family: CableFamily, gauge_id: impl Into<String>, resistance: f64) -> Self {
        Self {
            family,
            gauge_id: gauge_id.into(),
            resistance_per_meter_ref_ohms: resistance,
        }
    }
}

// ============================================================================
// Requests
// ============================================================================

/// Input to the forward (voltage drop) calculation
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct DropRequest {
    pub length_m: f64,
    pub current_a: f64,
    pub family: CableFamily,
    pub gauge_id: String,
    pub num_cores: u32,
    pub temp_c: f64,
}

impl DropRequest {
    /// A single-core request at the reference temperature
    pub fn new(
        length_m: f64,
        current_a: f64,
        family: CableFamily,
        gauge_id: impl Into<String>,
    ) -> Self {
        Self {
            length_m,
            current_a,
            family,
            gauge_id: gauge_id.into(),
            num_cores: 1,
            temp_c: REFERENCE_TEMP_C,
        }
    }

    pub fn with_cores(mut self, num_cores: u32) -> Self {
        self.num_cores = num_cores;
        self
    }

    pub fn at_temperature(mut self, temp_c: f64) -> Self {
        self.temp_c = temp_c;
        self
    }
}

/// Default allowed drop for the core-count solver, in percent of source voltage
pub const DEFAULT_MAX_DROP_PERCENT: f64 = 10.0;

/// Input to the reverse (core count) solve
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct CoreRequest {
    pub length_m: f64,
    pub source_voltage_v: f64,
    pub required_current_a: f64,
    pub family: CableFamily,
    pub gauge_id: String,
    pub max_drop_percent: f64,
    pub temp_c: f64,
}

impl CoreRequest {
    /// A request allowing a 10% drop at the reference temperature
    pub fn new(
        length_m: f64,
        source_voltage_v: f64,
        required_current_a: f64,
        family: CableFamily,
        gauge_id: impl Into<String>,
    ) -> Self {
        Self {
            length_m,
            source_voltage_v,
            required_current_a,
            family,
            gauge_id: gauge_id.into(),
            max_drop_percent: DEFAULT_MAX_DROP_PERCENT,
            temp_c: REFERENCE_TEMP_C,
        }
    }

    pub fn with_max_drop_percent(mut self, max_drop_percent: f64) -> Self {
        self.max_drop_percent = max_drop_percent;
        self
    }

    pub fn at_temperature(mut self, temp_c: f64) -> Self {
        self.temp_c = temp_c;
        self
    }
}

// ============================================================================
// Results
// ============================================================================

/// Result of the forward calculation
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct VoltageDrop {
    pub voltage_drop_v: f64,
    /// Per-meter, per-conductor resistance after temperature compensation
    pub resistance_per_meter_ohms: f64,
    /// Round-trip resistance of the run with all parallel cores
    pub total_resistance_ohms: f64,
}

impl VoltageDrop {
    /// Drop as a percentage of the source voltage.
    ///
    /// A zero source voltage reports 0% rather than dividing by zero.
    pub fn percent_of(&self, source_voltage_v: f64) -> f64 {
        if source_voltage_v == 0.0 {
            return 0.0;
        }
        self.voltage_drop_v / source_voltage_v * 100.0
    }
}

/// Result of the reverse solve
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CoreSolution {
    /// The run needs this many parallel cores (always at least 1)
    Feasible { cores: u32 },
    /// No number of cores of this conductor meets the drop limit
    Infeasible,
}

impl CoreSolution {
    pub fn cores(&self) -> Option<u32> {
        match self {
            CoreSolution::Feasible { cores } => Some(*cores),
            CoreSolution::Infeasible => None,
        }
    }

    pub fn is_feasible(&self) -> bool {
        matches!(self, CoreSolution::Feasible { .. })
    }

    /// Wiring advice for an installer
    pub fn recommendation(&self, gauge_id: &str) -> String {
        match self {
            CoreSolution::Feasible { cores: 1 } => format!("Use 1 core of {}", gauge_id),
            CoreSolution::Feasible { cores } => {
                format!("Use {} parallel cores of {}", cores, gauge_id)
            }
            CoreSolution::Infeasible => {
                "Impossible to meet requirements with this cable.".to_string()
            }
        }
    }
}

impl fmt::Display for CoreSolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoreSolution::Feasible { cores } => write!(f, "{}", cores),
            CoreSolution::Infeasible => f.write_str("Infeasible"),
        }
    }
}

/// How the solver turns a fractional core count into a whole one
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RoundingPolicy {
    /// Round to the nearest core, ties to even. Can leave the run up to half
    /// a core short of the drop limit.
    #[default]
    Nearest,
    /// Round up, so the drop limit is always met.
    Ceiling,
}

impl RoundingPolicy {
    pub fn apply(&self, cores_needed: f64) -> f64 {
        match self {
            RoundingPolicy::Nearest => cores_needed.round_ties_even(),
            RoundingPolicy::Ceiling => cores_needed.ceil(),
        }
    }
}

impl FromStr for RoundingPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "nearest" => Ok(RoundingPolicy::Nearest),
            "ceiling" | "ceil" => Ok(RoundingPolicy::Ceiling),
            other => Err(Error::InvalidInput {
                field: "rounding",
                value: other.to_string(),
                reason: "expected 'nearest' or 'ceiling'",
            }),
        }
    }
}
