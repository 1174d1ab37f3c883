use cable_core::*;
use clap::{Args, Parser, Subcommand};
use serde_json::json;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "cablecalc")]
#[command(about = "Cable voltage drop and core count calculator", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Use this config file instead of the default location
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the preset file
    #[arg(long, global = true)]
    presets: Option<PathBuf>,

    /// Log engine decisions to stderr
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Voltage drop along a run (forward calculation)
    Drop {
        #[command(flatten)]
        cable: CableArgs,

        /// Load current in amperes
        #[arg(long)]
        current: f64,

        /// Parallel cores carrying the current
        #[arg(long)]
        cores: Option<u32>,

        /// Source voltage, to report the drop as a percentage
        #[arg(long)]
        voltage: Option<f64>,

        #[arg(long)]
        json: bool,
    },

    /// Parallel cores needed to stay under a drop limit (reverse calculation)
    Cores {
        #[command(flatten)]
        cable: CableArgs,

        /// Source voltage in volts
        #[arg(long)]
        voltage: f64,

        /// Current the load requires, in amperes
        #[arg(long)]
        current: f64,

        /// Allowed drop as a percentage of the source voltage
        #[arg(long)]
        max_drop: Option<f64>,

        /// Rounding of fractional core counts (nearest, ceiling)
        #[arg(long)]
        rounding: Option<RoundingPolicy>,

        #[arg(long)]
        json: bool,
    },

    /// List known conductors
    Catalog {
        /// Only this family (alarm, network)
        #[arg(long)]
        family: Option<CableFamily>,

        #[arg(long)]
        json: bool,
    },

    /// Manage saved inputs
    Preset {
        #[command(subcommand)]
        action: PresetAction,
    },
}

#[derive(Args)]
struct CableArgs {
    /// Cable family (alarm, network)
    #[arg(long)]
    family: CableFamily,

    /// Conductor spec, e.g. "18 AWG" or "Cat5e"
    #[arg(long)]
    gauge: String,

    /// Run length in meters
    #[arg(long)]
    length: f64,

    /// Operating temperature in °C
    #[arg(long, allow_hyphen_values = true)]
    temp: Option<f64>,
}

#[derive(Subcommand)]
enum PresetAction {
    /// Save inputs under a name (replaces an existing preset)
    Save {
        name: String,

        #[command(flatten)]
        cable: CableArgs,

        #[arg(long)]
        current: f64,

        #[arg(long)]
        voltage: Option<f64>,

        #[arg(long)]
        cores: Option<u32>,

        #[arg(long)]
        max_drop: Option<f64>,

        /// Store as a core-count calculation instead of a voltage drop
        #[arg(long)]
        reverse: bool,
    },

    /// List preset names
    List,

    /// Print a preset's inputs
    Show { name: String },

    /// Run the calculation a preset was saved for
    Run {
        name: String,

        #[arg(long)]
        rounding: Option<RoundingPolicy>,

        #[arg(long)]
        json: bool,
    },

    /// Delete a preset
    Delete { name: String },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.verbose {
        cable_core::logging::init_with_level("debug");
    } else {
        cable_core::logging::init();
    }

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    let presets_path = cli
        .presets
        .clone()
        .unwrap_or_else(|| config.data.presets_path.clone());

    match cli.command {
        Commands::Drop {
            cable,
            current,
            cores,
            voltage,
            json,
        } => {
            let catalog = load_catalog(&config)?;
            let request = DropRequest::new(cable.length, current, cable.family, cable.gauge)
                .with_cores(cores.unwrap_or(config.defaults.num_cores))
                .at_temperature(cable.temp.unwrap_or(config.defaults.temp_c));
            cmd_drop(&catalog, &request, voltage, json)
        }
        Commands::Cores {
            cable,
            voltage,
            current,
            max_drop,
            rounding,
            json,
        } => {
            let catalog = load_catalog(&config)?;
            let request =
                CoreRequest::new(cable.length, voltage, current, cable.family, cable.gauge)
                    .with_max_drop_percent(max_drop.unwrap_or(config.defaults.max_drop_percent))
                    .at_temperature(cable.temp.unwrap_or(config.defaults.temp_c));
            cmd_cores(
                &catalog,
                &request,
                rounding.unwrap_or(config.solver.rounding),
                json,
            )
        }
        Commands::Catalog { family, json } => {
            let catalog = load_catalog(&config)?;
            cmd_catalog(&catalog, family, json)
        }
        Commands::Preset { action } => cmd_preset(action, &presets_path, &config),
    }
}

/// Build the catalog from config and refuse to run on an inconsistent one
fn load_catalog(config: &Config) -> Result<Catalog> {
    let catalog = config.catalog()?;
    let errors = catalog.validate();
    if !errors.is_empty() {
        eprintln!("Catalog validation errors:");
        for error in errors {
            eprintln!("  - {}", error);
        }
        return Err(Error::CatalogValidation("Invalid catalog".into()));
    }
    Ok(catalog)
}

fn cmd_drop(
    catalog: &Catalog,
    request: &DropRequest,
    voltage: Option<f64>,
    json: bool,
) -> Result<()> {
    let drop = compute_voltage_drop(catalog, request)?;
    let percent = voltage.map(|v| drop.percent_of(v));

    if json {
        let report = json!({
            "request": request,
            "result": drop,
            "voltage_drop_percent": percent,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    display_drop(request, &drop, percent);
    Ok(())
}

fn cmd_cores(
    catalog: &Catalog,
    request: &CoreRequest,
    rounding: RoundingPolicy,
    json: bool,
) -> Result<()> {
    let solution = solve_core_count(catalog, request, rounding)?;
    let recommendation = solution.recommendation(&request.gauge_id);

    if json {
        let report = json!({
            "request": request,
            "rounding": rounding,
            "result": solution,
            "recommendation": recommendation,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    display_cores(&request.gauge_id, &solution);
    Ok(())
}

fn cmd_catalog(catalog: &Catalog, family: Option<CableFamily>, json: bool) -> Result<()> {
    let specs: Vec<&ConductorSpec> = catalog
        .specs()
        .filter(|spec| family.map_or(true, |f| spec.family == f))
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&specs)?);
        return Ok(());
    }

    println!("{:<10} {:<10} {:>10}", "FAMILY", "GAUGE", "OHM/M@20C");
    for spec in specs {
        println!(
            "{:<10} {:<10} {:>10.4}",
            spec.family, spec.gauge_id, spec.resistance_per_meter_ref_ohms
        );
    }
    Ok(())
}

fn cmd_preset(action: PresetAction, presets_path: &Path, config: &Config) -> Result<()> {
    match action {
        PresetAction::Save {
            name,
            cable,
            current,
            voltage,
            cores,
            max_drop,
            reverse,
        } => {
            let source_voltage_v = match (voltage, reverse) {
                (Some(v), _) => v,
                (None, false) => 0.0,
                (None, true) => {
                    return Err(Error::InvalidInput {
                        field: "voltage",
                        value: "(missing)".into(),
                        reason: "a reverse preset needs --voltage",
                    })
                }
            };
            let preset = Preset {
                family: cable.family,
                gauge_id: cable.gauge,
                length_m: cable.length,
                source_voltage_v,
                current_a: current,
                num_cores: cores.unwrap_or(config.defaults.num_cores),
                temp_c: cable.temp.unwrap_or(config.defaults.temp_c),
                max_drop_percent: max_drop.unwrap_or(config.defaults.max_drop_percent),
                forward_mode: !reverse,
            };
            preset.validate(&load_catalog(config)?)?;
            PresetStore::update(presets_path, |store| {
                store.insert(&name, preset).map(|_| ())
            })?;
            println!("✓ Preset '{}' saved", name.trim());
        }

        PresetAction::List => {
            let store = PresetStore::load(presets_path)?;
            if store.is_empty() {
                println!("No presets found.");
            }
            for name in store.names() {
                println!("{}", name);
            }
        }

        PresetAction::Show { name } => {
            let store = PresetStore::load(presets_path)?;
            let preset = store.get(&name)?;
            println!("{}", serde_json::to_string_pretty(preset)?);
        }

        PresetAction::Run {
            name,
            rounding,
            json,
        } => {
            let store = PresetStore::load(presets_path)?;
            let preset = store.get(&name)?;
            let catalog = load_catalog(config)?;
            let outcome = preset.evaluate(&catalog, rounding.unwrap_or(config.solver.rounding))?;

            if json {
                let report = json!({ "preset": name, "inputs": preset, "outcome": outcome });
                println!("{}", serde_json::to_string_pretty(&report)?);
                return Ok(());
            }

            match outcome {
                PresetOutcome::Forward {
                    drop,
                    voltage_drop_percent,
                } => display_drop(&preset.drop_request(), &drop, Some(voltage_drop_percent)),
                PresetOutcome::Reverse { solution, .. } => {
                    display_cores(&preset.gauge_id, &solution)
                }
            }
        }

        PresetAction::Delete { name } => {
            PresetStore::update(presets_path, |store| store.remove(&name).map(|_| ()))?;
            println!("✓ Preset '{}' deleted", name);
        }
    }

    Ok(())
}

fn display_drop(request: &DropRequest, drop: &VoltageDrop, percent: Option<f64>) {
    println!(
        "{} {} x{} over {} m at {} A, {} °C",
        request.family,
        request.gauge_id,
        request.num_cores,
        request.length_m,
        request.current_a,
        request.temp_c
    );
    println!("  Loop resistance: {:.4} ohm", drop.total_resistance_ohms);
    println!("  Voltage drop:    {:.4} V", drop.voltage_drop_v);
    if let Some(percent) = percent {
        println!("  Drop percent:    {:.2} %", percent);
    }
}

fn display_cores(gauge_id: &str, solution: &CoreSolution) {
    println!("  Cores required:  {}", solution);
    println!("  → {}", solution.recommendation(gauge_id));
}
