//! Temperature compensation for copper conductor resistance.
//!
//! Resistance is scaled linearly from the 20 °C reference:
//! `R(t) = R_ref * (1 + ALPHA_COPPER * (t - 20))`.
//!
//! The model is not clamped. It is only meaningful above
//! [`ZERO_RESISTANCE_TEMP_C`], where the linear term would drive resistance
//! to zero; below that point the result goes negative.

/// Temperature at which catalog resistances are tabulated, in °C
pub const REFERENCE_TEMP_C: f64 = 20.0;

/// Temperature coefficient of copper at 20 °C, per °C
pub const ALPHA_COPPER: f64 = 0.00393;

/// Temperature where the linear model predicts zero resistance (~ -234.45 °C)
pub const ZERO_RESISTANCE_TEMP_C: f64 = REFERENCE_TEMP_C - 1.0 / ALPHA_COPPER;

/// Adjust a reference resistance to the operating temperature
pub fn compensate(resistance_ref: f64, temp_c: f64) -> f64 {
    resistance_ref * (1.0 + ALPHA_COPPER * (temp_c - REFERENCE_TEMP_C))
}
