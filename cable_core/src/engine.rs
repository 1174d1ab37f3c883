//! Voltage-drop engine for DC cable runs.
//!
//! Two independent operations share one resistance pipeline:
//! - [`compute_voltage_drop`]: forward mode, how much voltage a run loses
//! - [`solve_core_count`]: reverse mode, how many parallel cores keep the
//!   loss under a percentage of the source voltage
//!
//! Both resolve the conductor through a [`ConductorLookup`], compensate it for
//! temperature, and model the run as an outbound plus a return conductor.
//! Neither holds state, so both are safe to call from any number of threads.

use crate::catalog::ConductorLookup;
use crate::compensation::compensate;
use crate::{
    CableFamily, CoreRequest, CoreSolution, DropRequest, Error, Result, RoundingPolicy,
    VoltageDrop,
};

/// Outbound plus return conductor
const ROUND_TRIP_FACTOR: f64 = 2.0;

/// Compute the voltage lost along a cable run
///
/// `num_cores` identical conductors wired in parallel along the same path
/// divide the round-trip resistance evenly.
///
/// # Errors
///
/// - [`Error::NotFound`] if the catalog has no such conductor
/// - [`Error::InvalidInput`] for negative length or current, zero cores, or a
///   non-finite temperature
pub fn compute_voltage_drop<C>(catalog: &C, request: &DropRequest) -> Result<VoltageDrop>
where
    C: ConductorLookup + ?Sized,
{
    require_non_negative("length_m", request.length_m)?;
    require_non_negative("current_a", request.current_a)?;
    if request.num_cores == 0 {
        return Err(Error::invalid_input(
            "num_cores",
            f64::from(request.num_cores),
            "at least one core is required",
        ));
    }

    let resistance_per_meter =
        resistance_at(catalog, request.family, &request.gauge_id, request.temp_c)?;

    let total_resistance = resistance_per_meter * request.length_m * ROUND_TRIP_FACTOR
        / f64::from(request.num_cores);
    let voltage_drop_v = request.current_a * total_resistance;

    tracing::debug!(
        "Forward: {} '{}' {} m x{} cores @ {} A, {} C -> {:.6} ohm, {:.6} V",
        request.family,
        request.gauge_id,
        request.length_m,
        request.num_cores,
        request.current_a,
        request.temp_c,
        total_resistance,
        voltage_drop_v
    );

    Ok(VoltageDrop {
        voltage_drop_v,
        resistance_per_meter_ohms: resistance_per_meter,
        total_resistance_ohms: total_resistance,
    })
}

/// Find the number of parallel cores needed to keep the drop within limits
///
/// The allowed drop is `max_drop_percent` of `source_voltage_v`. The
/// fractional core count is turned into a whole one with `rounding`; the
/// result is never below one core.
///
/// An unreachable limit (zero percent or zero volts with current flowing) is
/// reported as [`CoreSolution::Infeasible`], not as an error.
///
/// # Errors
///
/// - [`Error::NotFound`] if the catalog has no such conductor
/// - [`Error::InvalidInput`] for negative length, voltage or current, a
///   percentage outside 0-100, or a non-finite temperature
pub fn solve_core_count<C>(
    catalog: &C,
    request: &CoreRequest,
    rounding: RoundingPolicy,
) -> Result<CoreSolution>
where
    C: ConductorLookup + ?Sized,
{
    require_non_negative("length_m", request.length_m)?;
    require_non_negative("source_voltage_v", request.source_voltage_v)?;
    require_non_negative("required_current_a", request.required_current_a)?;
    if !(0.0..=100.0).contains(&request.max_drop_percent) {
        return Err(Error::invalid_input(
            "max_drop_percent",
            request.max_drop_percent,
            "must be between 0 and 100",
        ));
    }

    let resistance_per_meter =
        resistance_at(catalog, request.family, &request.gauge_id, request.temp_c)?;

    let max_allowed_drop_v = request.source_voltage_v * (request.max_drop_percent / 100.0);

    // No current, no drop: a single core always suffices
    if request.required_current_a == 0.0 {
        return Ok(if max_allowed_drop_v >= 0.0 {
            CoreSolution::Feasible { cores: 1 }
        } else {
            CoreSolution::Infeasible
        });
    }

    let max_allowed_resistance = max_allowed_drop_v / request.required_current_a;
    if max_allowed_resistance <= 0.0 {
        tracing::debug!(
            "Reverse: {} V at {}% leaves no resistance budget for {} A",
            request.source_voltage_v,
            request.max_drop_percent,
            request.required_current_a
        );
        return Ok(CoreSolution::Infeasible);
    }

    let single_path_resistance = resistance_per_meter * request.length_m * ROUND_TRIP_FACTOR;
    let cores_needed = single_path_resistance / max_allowed_resistance;

    // Float-to-int casts saturate, so absurd runs cap at u32::MAX
    let cores = rounding.apply(cores_needed).max(1.0) as u32;

    tracing::debug!(
        "Reverse: {} '{}' {} m needs {:.4} cores ({:?}) -> {}",
        request.family,
        request.gauge_id,
        request.length_m,
        cores_needed,
        rounding,
        cores
    );

    Ok(CoreSolution::Feasible { cores })
}

/// Per-meter resistance of a conductor at the operating temperature
fn resistance_at<C>(catalog: &C, family: CableFamily, gauge_id: &str, temp_c: f64) -> Result<f64>
where
    C: ConductorLookup + ?Sized,
{
    if !temp_c.is_finite() {
        return Err(Error::invalid_input(
            "temp_c",
            temp_c,
            "temperature must be a finite number",
        ));
    }

    let resistance_ref = catalog.lookup(family, gauge_id)?;
    let resistance = compensate(resistance_ref, temp_c);

    if resistance <= 0.0 {
        tracing::warn!(
            "{} C is below the copper model's valid range; {} '{}' resolves to {} ohm/m",
            temp_c,
            family,
            gauge_id,
            resistance
        );
    }

    Ok(resistance)
}

fn require_non_negative(field: &'static str, value: f64) -> Result<()> {
    if value.is_nan() || value.is_infinite() {
        return Err(Error::invalid_input(field, value, "must be a finite number"));
    }
    if value < 0.0 {
        return Err(Error::invalid_input(field, value, "must not be negative"));
    }
    Ok(())
}
