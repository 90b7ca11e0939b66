//! # DKA Calculator CLI
//!
//! Runs the DKA calculation on patient inputs given as JSON.
//!
//! ## Usage
//!
//! ```bash
//! dka_cli [INPUT.json] [--settings SETTINGS.json] [--json] [--raw]
//! dka_cli --init-settings SETTINGS.json
//! ```
//!
//! Without INPUT the patient inputs are read from stdin. Log output goes to
//! stderr and is controlled by `RUST_LOG` (default `warn`).

use std::io;
use std::path::PathBuf;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use dka_core::calculations::DerivedValue;
use dka_core::file_io::{load_patient_inputs, load_settings, read_patient_inputs, save_settings};
use dka_core::{calculate, CalcResult, DkaResult, ProtocolSettings, WeightSource};

#[derive(Parser, Debug)]
#[command(name = "dka_cli")]
#[command(about = "Paediatric DKA fluid and insulin calculator", long_about = None)]
struct Cli {
    /// Patient inputs as JSON (default: stdin)
    input: Option<PathBuf>,
    /// Protocol settings file (default: canonical protocol)
    #[arg(long, value_name = "PATH")]
    settings: Option<PathBuf>,
    /// Write the canonical protocol settings to PATH and exit
    #[arg(long, value_name = "PATH", conflicts_with_all = ["input", "settings"])]
    init_settings: Option<PathBuf>,
    /// Print only the JSON result
    #[arg(long = "json")]
    json_only: bool,
    /// Print unrounded values
    #[arg(long)]
    raw: bool,
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn main() {
    init_logging();

    let cli = Cli::parse();

    if let Err(e) = run(&cli) {
        eprintln!("Error: {}", e);
        if let Ok(json) = serde_json::to_string_pretty(&e) {
            eprintln!("{}", json);
        }
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> CalcResult<()> {
    if let Some(path) = &cli.init_settings {
        save_settings(&ProtocolSettings::default(), path)?;
        info!(path = %path.display(), "settings written");
        println!("Wrote canonical protocol settings to {}", path.display());
        return Ok(());
    }

    let settings = match &cli.settings {
        Some(path) => load_settings(path)?,
        None => ProtocolSettings::default(),
    };

    let inputs = match &cli.input {
        Some(path) => load_patient_inputs(path)?,
        None => read_patient_inputs(io::stdin().lock())?,
    };

    let result = calculate(&inputs, &settings)?;
    let shown = if cli.raw { result } else { result.presented() };

    let json = serde_json::to_string_pretty(&shown)?;
    if cli.json_only {
        println!("{}", json);
        return Ok(());
    }

    print_summary(&shown);
    println!();
    println!("JSON Output:");
    println!("{}", json);
    Ok(())
}

fn print_summary(result: &DkaResult) {
    let patient = &result.patient;
    println!("═══════════════════════════════════════");
    println!("  DKA FLUID AND INSULIN CALCULATION");
    println!("═══════════════════════════════════════");
    println!();
    println!("Patient:");
    println!("  Age:      {} years", patient.age_years);
    match &patient.weight_source {
        WeightSource::Measured => println!("  Weight:   {} kg (measured)", patient.weight_kg),
        WeightSource::Estimated { estimator } => {
            println!("  Weight:   {} kg (estimated, {})", patient.weight_kg, estimator)
        }
    }
    println!("  Severity: {} (from {:?})", patient.severity.label(), patient.severity_source);
    println!("  Shocked:  {}", if patient.shocked { "yes" } else { "no" });
    println!();
    println!(
        "Protocol: {:?} deficit, bolus subtracted for {:?} patients",
        patient.settings.deficit_policy, patient.settings.bolus_subtraction
    );
    println!();

    if let Some(weight) = &result.estimated_weight {
        print_value("Estimated weight", "kg", weight);
    }
    print_value("Deficit percentage", "%", &result.deficit_percentage);
    print_value("Deficit volume", "mL", &result.deficit_volume);
    print_value("Bolus volume", "mL", &result.bolus_volume);
    print_value("Deficit less bolus", "mL", &result.deficit_volume_less_bolus);
    print_value("Deficit rate", "mL/hour", &result.deficit_rate);
    print_value("Maintenance volume", "mL", &result.daily_maintenance_volume);
    print_value("Maintenance rate", "mL/hour", &result.maintenance_rate);
    print_value("Starting fluid rate", "mL/hour", &result.starting_fluid_rate);
    print_value("48 hour total", "mL", &result.forty_eight_hour_total);
    print_value("Insulin rate", "Units/hour", &result.insulin_infusion_rate);

    println!("═══════════════════════════════════════");
    println!("  Calculation {}", result.label.calculation_id);
    println!("═══════════════════════════════════════");
}

fn print_value(name: &str, unit: &str, value: &DerivedValue) {
    println!("{}: {} {}", name, value.output, unit);
    println!("    Working: {}", value.working);
    println!("    Formula: {}", value.formula);
    if let Some(limit) = &value.limit {
        println!("    Limit:   {}", limit);
    }
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;

    fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
        Cli::try_parse_from(std::iter::once("dka_cli").chain(args.iter().copied()))
    }

    #[test]
    fn test_parse_defaults() {
        let cli = parse(&[]).unwrap();
        assert!(cli.input.is_none());
        assert!(cli.settings.is_none());
        assert!(!cli.json_only);
        assert!(!cli.raw);
    }

    #[test]
    fn test_parse_all_options() {
        let cli = parse(&["patient.json", "--settings", "protocol.json", "--json", "--raw"])
            .unwrap();
        assert_eq!(cli.input, Some(PathBuf::from("patient.json")));
        assert_eq!(cli.settings, Some(PathBuf::from("protocol.json")));
        assert!(cli.json_only);
        assert!(cli.raw);
    }

    #[test]
    fn test_parse_init_settings() {
        let cli = parse(&["--init-settings", "protocol.json"]).unwrap();
        assert_eq!(cli.init_settings, Some(PathBuf::from("protocol.json")));
        assert!(parse(&["patient.json", "--init-settings", "protocol.json"]).is_err());
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse(&["--settings"]).is_err());
        assert_eq!(parse(&["--verbose"]).unwrap_err().kind(), ErrorKind::UnknownArgument);
        assert!(parse(&["a.json", "b.json"]).is_err());
        assert_eq!(parse(&["--help"]).unwrap_err().kind(), ErrorKind::DisplayHelp);
    }

    #[test]
    fn test_cli_definition() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
