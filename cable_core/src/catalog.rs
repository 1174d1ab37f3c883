//! Conductor catalog: per-meter DC resistance by cable family and gauge.
//!
//! The built-in table covers common alarm and network cable. Extra
//! conductors can be registered while a catalog is being built (for example
//! from the user's config file); once handed to the calculators it is only
//! ever read.

use crate::{CableFamily, ConductorSpec, Error, Result};
use once_cell::sync::Lazy;
use std::collections::BTreeMap;

/// Anything that can resolve a conductor's reference resistance.
///
/// The calculators take this trait rather than a concrete [`Catalog`] so
/// callers can substitute their own tables.
pub trait ConductorLookup {
    /// Resistance of one meter of one conductor at 20 °C, in ohms
    fn lookup(&self, family: CableFamily, gauge_id: &str) -> Result<f64>;
}

/// Cached default catalog - built once and reused across all operations
static DEFAULT_CATALOG: Lazy<Catalog> = Lazy::new(build_default_catalog);

/// Get a reference to the cached default catalog
pub fn default_catalog() -> &'static Catalog {
    &DEFAULT_CATALOG
}

/// Built-in conductor table (ohms per meter per conductor at 20 °C)
const BUILT_IN: [(CableFamily, &str, f64); 5] = [
    (CableFamily::Alarm, "18 AWG", 0.0209),
    (CableFamily::Alarm, "22 AWG", 0.0333),
    (CableFamily::Alarm, "24 AWG", 0.0529),
    // Network figures are per-meter DC loop values for a pair
    (CableFamily::Network, "Cat5e", 0.0938),
    (CableFamily::Network, "Cat6", 0.0700),
];

/// Builds the default catalog with the built-in conductors
pub fn build_default_catalog() -> Catalog {
    let mut conductors: BTreeMap<CableFamily, BTreeMap<String, ConductorSpec>> = BTreeMap::new();
    for (family, gauge_id, resistance) in BUILT_IN {
        conductors
            .entry(family)
            .or_default()
            .insert(gauge_id.to_string(), ConductorSpec::new(family, gauge_id, resistance));
    }
    Catalog { conductors }
}

/// An immutable-once-built table of conductors
#[derive(Clone, Debug, Default)]
pub struct Catalog {
    conductors: BTreeMap<CableFamily, BTreeMap<String, ConductorSpec>>,
}

impl Catalog {
    /// An empty catalog, for building synthetic tables
    pub fn empty() -> Self {
        Self::default()
    }

    /// The default catalog plus additional conductors
    pub fn with_extra<I>(extra: I) -> Result<Self>
    where
        I: IntoIterator<Item = ConductorSpec>,
    {
        let mut catalog = build_default_catalog();
        for spec in extra {
            catalog.register(spec)?;
        }
        Ok(catalog)
    }

    /// Add a conductor.
    ///
    /// Each (family, gauge) pair may appear once, with a positive finite
    /// resistance.
    pub fn register(&mut self, spec: ConductorSpec) -> Result<()> {
        if spec.gauge_id.trim().is_empty() {
            return Err(Error::CatalogValidation(format!(
                "{} conductor has an empty gauge id",
                spec.family
            )));
        }
        let resistance = spec.resistance_per_meter_ref_ohms;
        if !resistance.is_finite() || resistance <= 0.0 {
            return Err(Error::CatalogValidation(format!(
                "{} '{}' has non-positive resistance {}",
                spec.family, spec.gauge_id, resistance
            )));
        }

        let family = self.conductors.entry(spec.family).or_default();
        if family.contains_key(&spec.gauge_id) {
            return Err(Error::CatalogValidation(format!(
                "{} '{}' is already in the catalog",
                spec.family, spec.gauge_id
            )));
        }

        tracing::debug!(
            "Registered conductor {} '{}' at {} ohm/m",
            spec.family,
            spec.gauge_id,
            resistance
        );
        family.insert(spec.gauge_id.clone(), spec);
        Ok(())
    }

    /// Full spec for a conductor
    pub fn get(&self, family: CableFamily, gauge_id: &str) -> Option<&ConductorSpec> {
        self.conductors.get(&family)?.get(gauge_id)
    }

    /// Gauge ids available in a family, sorted
    pub fn gauges(&self, family: CableFamily) -> Vec<&str> {
        self.conductors
            .get(&family)
            .map(|gauges| gauges.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// All conductors, ordered by family then gauge
    pub fn specs(&self) -> impl Iterator<Item = &ConductorSpec> {
        self.conductors.values().flat_map(|gauges| gauges.values())
    }

    pub fn len(&self) -> usize {
        self.conductors.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Validate the catalog for consistency and completeness
    ///
    /// Returns a list of validation errors, or empty Vec if valid.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        for (family, gauges) in &self.conductors {
            if gauges.is_empty() {
                errors.push(format!("Family '{}' has no conductors", family));
            }
            for (gauge_id, spec) in gauges {
                if &spec.family != family {
                    errors.push(format!(
                        "Conductor '{}' filed under '{}' but tagged '{}'",
                        gauge_id, family, spec.family
                    ));
                }
                if gauge_id != &spec.gauge_id {
                    errors.push(format!(
                        "Conductor key '{}' doesn't match gauge_id '{}'",
                        gauge_id, spec.gauge_id
                    ));
                }
                let resistance = spec.resistance_per_meter_ref_ohms;
                if !resistance.is_finite() || resistance <= 0.0 {
                    errors.push(format!(
                        "Conductor {} '{}' has non-positive resistance {}",
                        family, gauge_id, resistance
                    ));
                }
            }
        }

        for family in CableFamily::ALL {
            if !self.conductors.contains_key(&family) {
                errors.push(format!("Catalog has no {} conductors", family));
            }
        }

        errors
    }
}

impl ConductorLookup for Catalog {
    fn lookup(&self, family: CableFamily, gauge_id: &str) -> Result<f64> {
        self.get(family, gauge_id)
            .map(|spec| spec.resistance_per_meter_ref_ohms)
            .ok_or_else(|| Error::NotFound {
                family,
                gauge_id: gauge_id.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_loads() {
        let catalog = build_default_catalog();
        assert_eq!(catalog.len(), 5);
        assert_eq!(catalog.gauges(CableFamily::Alarm).len(), 3);
        assert_eq!(catalog.gauges(CableFamily::Network).len(), 2);
    }

    #[test]
    fn test_lookup_returns_tabulated_values() {
        let catalog = default_catalog();
        for (family, gauge_id, expected) in BUILT_IN {
            assert_eq!(catalog.lookup(family, gauge_id).unwrap(), expected);
        }
    }

    #[test]
    fn test_lookup_unknown_pair_is_not_found() {
        let catalog = default_catalog();

        // Right gauge, wrong family
        let err = catalog.lookup(CableFamily::Network, "18 AWG").unwrap_err();
        assert!(matches!(
            err,
            Error::NotFound { family: CableFamily::Network, ref gauge_id } if gauge_id == "18 AWG"
        ));

        assert!(catalog.lookup(CableFamily::Alarm, "12 AWG").is_err());
        assert!(catalog.lookup(CableFamily::Network, "cat5e").is_err());
    }

    #[test]
    fn test_gauges_are_sorted() {
        let catalog = build_default_catalog();
        assert_eq!(
            catalog.gauges(CableFamily::Alarm),
            vec!["18 AWG", "22 AWG", "24 AWG"]
        );
        assert_eq!(catalog.gauges(CableFamily::Network), vec!["Cat5e", "Cat6"]);
    }

    #[test]
    fn test_with_extra_registers_conductors() {
        let catalog =
            Catalog::with_extra([ConductorSpec::new(CableFamily::Alarm, "16 AWG", 0.0132)])
                .unwrap();
        assert_eq!(catalog.len(), 6);
        assert_eq!(catalog.lookup(CableFamily::Alarm, "16 AWG").unwrap(), 0.0132);
    }

    #[test]
    fn test_register_rejects_duplicate_pair() {
        let result =
            Catalog::with_extra([ConductorSpec::new(CableFamily::Network, "Cat6", 0.05)]);
        assert!(matches!(result, Err(Error::CatalogValidation(_))));
    }

    #[test]
    fn test_register_rejects_bad_resistance() {
        let mut catalog = Catalog::empty();
        for bad in [0.0, -0.01, f64::NAN, f64::INFINITY] {
            let result = catalog.register(ConductorSpec::new(CableFamily::Alarm, "X", bad));
            assert!(result.is_err(), "resistance {} should be rejected", bad);
        }
        assert!(catalog.is_empty());
    }

    #[test]
    fn test_default_catalog_validates() {
        let errors = default_catalog().validate();
        assert!(
            errors.is_empty(),
            "Default catalog has validation errors: {:?}",
            errors
        );
    }

    #[test]
    fn test_empty_catalog_reports_missing_families() {
        let errors = Catalog::empty().validate();
        assert_eq!(errors.len(), 2);
    }
}
