//! Named input presets with file locking.
//!
//! A preset file is a JSON object mapping preset names to a flat record of
//! calculation inputs plus a `forward_mode` flag. Files written by the older
//! desktop tool (`cable_type`, `conductor_spec`, `length`, `voltage`,
//! `current`, `temp`) load through field aliases. That tool stores every
//! number as the text of its input field (`"length": "50"`), so numeric
//! fields accept either form.

use crate::catalog::ConductorLookup;
use crate::engine::{compute_voltage_drop, solve_core_count};
use crate::{
    CableFamily, CoreRequest, CoreSolution, DropRequest, Error, Result, RoundingPolicy,
    VoltageDrop,
};
use fs2::FileExt;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tempfile::NamedTempFile;

/// Saved calculation inputs
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Preset {
    #[serde(alias = "cable_type")]
    pub family: CableFamily,

    #[serde(alias = "conductor_spec")]
    pub gauge_id: String,

    #[serde(alias = "length", deserialize_with = "number_or_text")]
    pub length_m: f64,

    /// Optional for forward presets; the desktop tool saves a blank field
    #[serde(alias = "voltage", default, deserialize_with = "number_or_blank")]
    pub source_voltage_v: f64,

    #[serde(alias = "current", deserialize_with = "number_or_text")]
    pub current_a: f64,

    #[serde(default = "default_num_cores", deserialize_with = "number_or_text")]
    pub num_cores: u32,

    #[serde(
        alias = "temp",
        default = "default_temp_c",
        deserialize_with = "number_or_text"
    )]
    pub temp_c: f64,

    #[serde(
        default = "default_max_drop_percent",
        deserialize_with = "number_or_text"
    )]
    pub max_drop_percent: f64,

    /// Forward (voltage drop) when true, reverse (core count) when false
    #[serde(default = "default_forward_mode")]
    pub forward_mode: bool,
}

fn default_num_cores() -> u32 {
    1
}

fn default_temp_c() -> f64 {
    crate::compensation::REFERENCE_TEMP_C
}

fn default_max_drop_percent() -> f64 {
    crate::DEFAULT_MAX_DROP_PERCENT
}

fn default_forward_mode() -> bool {
    true
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrText<T> {
    Number(T),
    Text(String),
}

/// Accept `50`, `50.0` or `"50"`
fn number_or_text<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + FromStr,
    T::Err: fmt::Display,
{
    match NumberOrText::<T>::deserialize(deserializer)? {
        NumberOrText::Number(value) => Ok(value),
        NumberOrText::Text(text) => text.trim().parse().map_err(|e| {
            serde::de::Error::custom(format!("expected a number, got {:?}: {}", text, e))
        }),
    }
}

/// Like [`number_or_text`], with an empty string read as zero
fn number_or_blank<'de, D>(deserializer: D) -> std::result::Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    match NumberOrText::<f64>::deserialize(deserializer)? {
        NumberOrText::Text(text) if text.trim().is_empty() => Ok(0.0),
        NumberOrText::Number(value) => Ok(value),
        NumberOrText::Text(text) => text.trim().parse().map_err(|e| {
            serde::de::Error::custom(format!("expected a number, got {:?}: {}", text, e))
        }),
    }
}

/// What running a preset produced
#[derive(Clone, Debug, Serialize, PartialEq)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum PresetOutcome {
    Forward {
        drop: VoltageDrop,
        voltage_drop_percent: f64,
    },
    Reverse {
        solution: CoreSolution,
        recommendation: String,
    },
}

impl Preset {
    pub fn drop_request(&self) -> DropRequest {
        DropRequest::new(self.length_m, self.current_a, self.family, self.gauge_id.clone())
            .with_cores(self.num_cores)
            .at_temperature(self.temp_c)
    }

    pub fn core_request(&self) -> CoreRequest {
        CoreRequest::new(
            self.length_m,
            self.source_voltage_v,
            self.current_a,
            self.family,
            self.gauge_id.clone(),
        )
        .with_max_drop_percent(self.max_drop_percent)
        .at_temperature(self.temp_c)
    }

    /// Check the inputs the way running the preset would, without keeping
    /// the result. An infeasible reverse preset is still valid.
    pub fn validate<C>(&self, catalog: &C) -> Result<()>
    where
        C: ConductorLookup + ?Sized,
    {
        self.evaluate(catalog, RoundingPolicy::default()).map(|_| ())
    }

    /// Run whichever calculation the preset was saved for
    pub fn evaluate<C>(&self, catalog: &C, rounding: RoundingPolicy) -> Result<PresetOutcome>
    where
        C: ConductorLookup + ?Sized,
    {
        if self.forward_mode {
            let drop = compute_voltage_drop(catalog, &self.drop_request())?;
            Ok(PresetOutcome::Forward {
                voltage_drop_percent: drop.percent_of(self.source_voltage_v),
                drop,
            })
        } else {
            let solution = solve_core_count(catalog, &self.core_request(), rounding)?;
            Ok(PresetOutcome::Reverse {
                recommendation: solution.recommendation(&self.gauge_id),
                solution,
            })
        }
    }
}

/// All presets in one file, keyed by name
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq)]
#[serde(transparent)]
pub struct PresetStore {
    presets: BTreeMap<String, Preset>,
}

impl PresetStore {
    /// Load presets from a file with shared locking
    ///
    /// Returns an empty store if the file doesn't exist.
    /// If the file is corrupted, logs a warning and returns an empty store.
    pub fn load(path: &Path) -> Result<Self> {
        let Some(contents) = read_shared(path)? else {
            tracing::info!("No preset file found at {:?}", path);
            return Ok(Self::default());
        };

        match serde_json::from_str::<PresetStore>(&contents) {
            Ok(store) => {
                tracing::debug!("Loaded {} presets from {:?}", store.len(), path);
                Ok(store)
            }
            Err(e) => {
                tracing::warn!(
                    "Invalid preset file {:?}: {}. It might be corrupted; starting empty.",
                    path,
                    e
                );
                Ok(Self::default())
            }
        }
    }

    /// Save presets with exclusive locking
    ///
    /// Writes to a temp file in the same directory, syncs it, then renames
    /// it over the original.
    pub fn save(&self, path: &Path) -> Result<()> {
        let parent = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(parent)?;

        let temp = NamedTempFile::new_in(parent)?;
        temp.as_file().lock_exclusive()?;

        {
            let mut writer = std::io::BufWriter::new(temp.as_file());
            let contents = serde_json::to_string_pretty(self)?;
            writer.write_all(contents.as_bytes())?;
            writer.write_all(b"\n")?;
            writer.flush()?;
        }

        temp.as_file().sync_all()?;
        temp.as_file().unlock()?;

        temp.persist(path).map_err(|e| Error::Io(e.error))?;

        tracing::debug!("Saved {} presets to {:?}", self.len(), path);
        Ok(())
    }

    /// Load presets, modify them, and save them back
    ///
    /// An exclusive lock on a `.lock` file next to `path` is held for the
    /// whole read-modify-write, so concurrent updates queue instead of
    /// overwriting each other. A file that doesn't parse is renamed to
    /// `<name>.corrupt` before the new store is written, never overwritten.
    pub fn update<F>(path: &Path, f: F) -> Result<Self>
    where
        F: FnOnce(&mut PresetStore) -> Result<()>,
    {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let lock = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(sibling(path, "lock"))?;
        lock.lock_exclusive()?;

        let mut store = match read_shared(path)? {
            None => Self::default(),
            Some(contents) => match serde_json::from_str::<PresetStore>(&contents) {
                Ok(store) => store,
                Err(e) => {
                    let backup = sibling(path, "corrupt");
                    std::fs::rename(path, &backup)?;
                    tracing::warn!(
                        "Invalid preset file {:?}: {}. Moved it to {:?}; starting empty.",
                        path,
                        e,
                        backup
                    );
                    Self::default()
                }
            },
        };

        f(&mut store)?;
        store.save(path)?;

        lock.unlock()?;
        Ok(store)
    }

    /// Add or replace a preset
    pub fn insert(&mut self, name: &str, preset: Preset) -> Result<Option<Preset>> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::Preset("preset name must not be empty".into()));
        }
        Ok(self.presets.insert(name.to_string(), preset))
    }

    pub fn get(&self, name: &str) -> Result<&Preset> {
        self.presets
            .get(name)
            .ok_or_else(|| Error::Preset(format!("Preset '{}' not found", name)))
    }

    pub fn remove(&mut self, name: &str) -> Result<Preset> {
        self.presets
            .remove(name)
            .ok_or_else(|| Error::Preset(format!("Preset '{}' not found", name)))
    }

    /// Preset names in sorted order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.presets.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.presets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.presets.is_empty()
    }
}

/// Read the whole file under a shared lock, or `None` if it doesn't exist
fn read_shared(path: &Path) -> Result<Option<String>> {
    if !path.exists() {
        return Ok(None);
    }

    let file = File::open(path)?;
    file.lock_shared()?;

    let mut contents = String::new();
    let read = std::io::BufReader::new(&file).read_to_string(&mut contents);
    file.unlock()?;
    read?;

    Ok(Some(contents))
}

/// `presets.json` -> `presets.json.<suffix>`
fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".");
    name.push(suffix);
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::build_default_catalog;
    use approx::assert_relative_eq;

    fn forward_preset() -> Preset {
        Preset {
            family: CableFamily::Alarm,
            gauge_id: "18 AWG".into(),
            length_m: 50.0,
            source_voltage_v: 12.0,
            current_a: 0.5,
            num_cores: 1,
            temp_c: 20.0,
            max_drop_percent: 10.0,
            forward_mode: true,
        }
    }

    fn reverse_preset() -> Preset {
        Preset {
            family: CableFamily::Network,
            gauge_id: "Cat5e".into(),
            length_m: 100.0,
            source_voltage_v: 12.0,
            current_a: 1.0,
            forward_mode: false,
            ..forward_preset()
        }
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("presets.json");

        let mut store = PresetStore::default();
        store.insert("panel", forward_preset()).unwrap();
        store.insert("camera run", reverse_preset()).unwrap();
        store.save(&path).unwrap();

        let loaded = PresetStore::load(&path).unwrap();
        assert_eq!(loaded, store);
        assert_eq!(loaded.names().collect::<Vec<_>>(), vec!["camera run", "panel"]);
    }

    #[test]
    fn test_load_nonexistent_returns_empty() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = PresetStore::load(&temp_dir.path().join("missing.json")).unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn test_corrupted_file_returns_empty() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("presets.json");
        std::fs::write(&path, "{ invalid json }").unwrap();

        let store = PresetStore::load(&path).unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn test_legacy_field_names_load() {
        let json = r#"{
            "office": {
                "cable_type": "network",
                "conductor_spec": "Cat6",
                "length": 40.0,
                "voltage": 24.0,
                "current": 0.8,
                "num_cores": 2,
                "temp": 30.0,
                "forward_mode": false
            }
        }"#;
        let store: PresetStore = serde_json::from_str(json).unwrap();
        let preset = store.get("office").unwrap();

        assert_eq!(preset.family, CableFamily::Network);
        assert_eq!(preset.gauge_id, "Cat6");
        assert_eq!(preset.source_voltage_v, 24.0);
        assert_eq!(preset.temp_c, 30.0);
        assert_eq!(preset.max_drop_percent, 10.0);
        assert!(!preset.forward_mode);
    }

    #[test]
    fn test_desktop_tool_file_loads() {
        // Written by the desktop tool: every number is the text of its field
        let json = r#"{
    "office": {
        "cable_type": "alarm",
        "conductor_spec": "18 AWG",
        "length": "50",
        "voltage": "12",
        "current": "0.5",
        "num_cores": "1",
        "temp": "20",
        "forward_mode": true
    },
    "lobby": {
        "cable_type": "network",
        "conductor_spec": "Cat6",
        "length": "90",
        "voltage": "",
        "current": "1",
        "num_cores": "2",
        "temp": "-5",
        "forward_mode": true
    }
}"#;
        let store: PresetStore = serde_json::from_str(json).unwrap();
        assert_eq!(store.len(), 2);

        let office = store.get("office").unwrap();
        assert_eq!(office, &forward_preset());

        let lobby = store.get("lobby").unwrap();
        assert_eq!(lobby.source_voltage_v, 0.0);
        assert_eq!(lobby.num_cores, 2);
        assert_eq!(lobby.temp_c, -5.0);
    }

    #[test]
    fn test_non_numeric_text_is_rejected() {
        let json = r#"{"x": {"family": "alarm", "gauge_id": "18 AWG",
            "length_m": "fifty", "current_a": 1}}"#;
        let err = serde_json::from_str::<PresetStore>(json).unwrap_err();
        assert!(err.to_string().contains("fifty"));
    }

    #[test]
    fn test_update_keeps_desktop_tool_presets() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("presets.json");
        std::fs::write(
            &path,
            r#"{"office": {"cable_type": "alarm", "conductor_spec": "18 AWG",
                "length": "50", "voltage": "12", "current": "0.5",
                "num_cores": "1", "temp": "20", "forward_mode": true}}"#,
        )
        .unwrap();

        PresetStore::update(&path, |store| store.insert("new", reverse_preset()).map(|_| ()))
            .unwrap();

        let loaded = PresetStore::load(&path).unwrap();
        assert_eq!(loaded.names().collect::<Vec<_>>(), vec!["new", "office"]);
    }

    #[test]
    fn test_update_moves_corrupted_file_aside() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("presets.json");
        std::fs::write(&path, "{ invalid json }").unwrap();

        PresetStore::update(&path, |store| store.insert("a", forward_preset()).map(|_| ()))
            .unwrap();

        let backup = temp_dir.path().join("presets.json.corrupt");
        assert_eq!(std::fs::read_to_string(backup).unwrap(), "{ invalid json }");
        assert_eq!(PresetStore::load(&path).unwrap().len(), 1);
    }

    #[test]
    fn test_concurrent_updates_keep_every_preset() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("presets.json");

        std::thread::scope(|s| {
            for i in 0..8 {
                let path = &path;
                s.spawn(move || {
                    PresetStore::update(path, |store| {
                        store.insert(&format!("run-{}", i), forward_preset())?;
                        Ok(())
                    })
                    .unwrap();
                });
            }
        });

        assert_eq!(PresetStore::load(&path).unwrap().len(), 8);
    }

    #[test]
    fn test_validate_rejects_what_run_would_reject() {
        let catalog = build_default_catalog();
        assert!(forward_preset().validate(&catalog).is_ok());

        let negative = Preset {
            current_a: -1.0,
            ..forward_preset()
        };
        assert!(matches!(
            negative.validate(&catalog),
            Err(Error::InvalidInput { field: "current_a", .. })
        ));

        let zero_cores = Preset {
            num_cores: 0,
            ..forward_preset()
        };
        assert!(zero_cores.validate(&catalog).is_err());

        let over_limit = Preset {
            max_drop_percent: 150.0,
            ..reverse_preset()
        };
        assert!(over_limit.validate(&catalog).is_err());

        let unknown = Preset {
            gauge_id: "Cat7".into(),
            ..forward_preset()
        };
        assert!(matches!(unknown.validate(&catalog), Err(Error::NotFound { .. })));

        // Infeasible is an answer, not an error
        let no_source = Preset {
            source_voltage_v: 0.0,
            ..reverse_preset()
        };
        assert!(no_source.validate(&catalog).is_ok());
    }

    #[test]
    fn test_update_and_remove() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("presets.json");

        PresetStore::update(&path, |store| {
            store.insert("a", forward_preset())?;
            store.insert("b", reverse_preset())?;
            Ok(())
        })
        .unwrap();

        PresetStore::update(&path, |store| store.remove("a").map(|_| ())).unwrap();

        let loaded = PresetStore::load(&path).unwrap();
        assert_eq!(loaded.names().collect::<Vec<_>>(), vec!["b"]);
        assert!(matches!(loaded.get("a"), Err(Error::Preset(_))));
    }

    #[test]
    fn test_empty_name_rejected() {
        let mut store = PresetStore::default();
        assert!(store.insert("  ", forward_preset()).is_err());
    }

    #[test]
    fn test_evaluate_dispatches_on_mode() {
        let catalog = build_default_catalog();

        match forward_preset().evaluate(&catalog, RoundingPolicy::Nearest).unwrap() {
            PresetOutcome::Forward {
                drop,
                voltage_drop_percent,
            } => {
                assert_relative_eq!(drop.voltage_drop_v, 1.045, epsilon = 1e-12);
                assert_relative_eq!(voltage_drop_percent, 1.045 / 12.0 * 100.0, epsilon = 1e-9);
            }
            other => panic!("expected forward outcome, got {:?}", other),
        }

        match reverse_preset().evaluate(&catalog, RoundingPolicy::Nearest).unwrap() {
            PresetOutcome::Reverse {
                solution,
                recommendation,
            } => {
                assert_eq!(solution, CoreSolution::Feasible { cores: 16 });
                assert_eq!(recommendation, "Use 16 parallel cores of Cat5e");
            }
            other => panic!("expected reverse outcome, got {:?}", other),
        }
    }

    #[test]
    fn test_atomic_save_leaves_no_temp_files() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("presets.json");
        PresetStore::default().save(&path).unwrap();

        let extras: Vec<_> = std::fs::read_dir(temp_dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name() != "presets.json")
            .collect();
        assert!(extras.is_empty(), "found extras: {:?}", extras);
    }
}
