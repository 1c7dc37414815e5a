//! Pedal Link - command line front end
//!
//! Lists ports, queries firmware, and moves a pedal's configuration to and
//! from a JSON project snapshot.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pedal_link::bridge::{ports, PedalBridge};
use pedal_link::category::{Category, CategorySet};
use pedal_link::config::AppConfig;
use pedal_link::export::{ExportOptions, ExportReport, Exporter};
use pedal_link::import::{ImportOptions, ImportReport, Importer};
use pedal_link::partials;
use pedal_link::protocol::FirmwareDomain;
use pedal_link::store::{MemoryStore, ProjectRepository, StatePatch};

/// Pedal Link - import and export MIDI pedal configuration over SysEx
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.yaml")]
    config: String,

    /// Log level (error, warn, info, debug, trace)
    #[arg(short, long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Emit logs as JSON lines
    #[arg(long, env = "LOG_JSON")]
    json_logs: bool,

    /// MIDI output port name, overriding the configured one
    #[arg(short, long, env = "PEDAL_PORT")]
    port: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List available MIDI ports
    Ports,

    /// Query the pedal's firmware versions
    Version,

    /// Read the pedal's configuration into a project snapshot
    Import {
        /// Project snapshot file
        #[arg(long, default_value = "project.json")]
        project: PathBuf,

        /// Keep every populated slot, including untouched defaults
        #[arg(long)]
        all: bool,

        /// Restrict to these categories (songs, macros, setlists, global, display, jacks)
        #[arg(long, value_delimiter = ',')]
        only: Vec<Category>,
    },

    /// Write a project snapshot to the pedal
    Export {
        #[arg(long, default_value = "project.json")]
        project: PathBuf,

        #[arg(long, value_delimiter = ',')]
        only: Vec<Category>,

        /// Clear macro slots that hold no macro in the project
        #[arg(long)]
        clear_missing: bool,
    },

    /// Rewrite macros in a snapshot against its partial catalog
    Partials {
        #[command(subcommand)]
        action: PartialsAction,
    },
}

#[derive(Subcommand, Debug)]
enum PartialsAction {
    /// Replace runs of raw steps with partial references
    Compress {
        #[arg(long, default_value = "project.json")]
        project: PathBuf,
    },
    /// Replace partial references with their raw steps
    Expand {
        #[arg(long, default_value = "project.json")]
        project: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let args = Args::parse();

    init_logging(&args.log_level, args.json_logs)?;

    let mut config = AppConfig::load_or_default(&args.config)
        .await
        .with_context(|| format!("Failed to load configuration from {}", args.config))?;
    if let Some(port) = args.port.clone() {
        config.device.port = Some(port);
    }

    match args.command {
        Command::Ports => list_ports_formatted()?,
        Command::Version => show_versions(&config).await?,
        Command::Import { project, all, only } => {
            let mut options = ImportOptions {
                policy: config.import.clone(),
                categories: CategorySet::only(only),
            };
            if all {
                options = options.import_all();
            }
            run_import(&config, &project, options).await?;
        }
        Command::Export {
            project,
            only,
            clear_missing,
        } => {
            let options = ExportOptions {
                categories: CategorySet::only(only),
                clear_missing_macros: clear_missing,
            };
            run_export(&config, &project, options).await?;
        }
        Command::Partials { action } => match action {
            PartialsAction::Compress { project } => rewrite_macros(&project, false).await?,
            PartialsAction::Expand { project } => rewrite_macros(&project, true).await?,
        },
    }

    Ok(())
}

fn connect(config: &AppConfig) -> Result<PedalBridge> {
    let bridge = PedalBridge::new(config.bridge.clone());
    let port = bridge
        .connect(&config.device.port_preferences())
        .context("Failed to connect to the pedal")?;
    info!("Using MIDI port: {}", port);
    Ok(bridge)
}

async fn show_versions(config: &AppConfig) -> Result<()> {
    let bridge = connect(config)?;
    let reported = bridge
        .query_firmware_version()
        .await
        .context("Firmware version query failed")?;

    // Firmware announcements trail the JSON reply
    tokio::time::sleep(Duration::from_millis(300)).await;

    println!("\n{}", "=== Pedal Firmware ===".bold().cyan());
    println!("  Reported: {}", reported.green());
    for (label, domain) in [("Micro", FirmwareDomain::Micro), ("DSP", FirmwareDomain::Dsp)] {
        match bridge.firmware_version(domain) {
            Some(version) => println!("  {:<9} {}", format!("{}:", label), version.number().green()),
            None => println!("  {:<9} {}", format!("{}:", label), "not announced".dimmed()),
        }
    }
    Ok(())
}

async fn run_import(config: &AppConfig, project: &Path, options: ImportOptions) -> Result<()> {
    let store = MemoryStore::load_or_empty(project).await?;
    let bridge = connect(config)?;

    let report = Importer::new(&bridge, &store, options)
        .run()
        .await
        .context("Import aborted")?;

    store.save_snapshot(project).await?;
    print_import_report(&report, project);
    Ok(())
}

async fn run_export(config: &AppConfig, project: &Path, options: ExportOptions) -> Result<()> {
    let store = MemoryStore::load_snapshot(project).await?;
    let bridge = connect(config)?;

    let report = Exporter::new(&bridge, &store, options)
        .run()
        .await
        .context("Export aborted")?;

    print_export_report(&report, project);
    Ok(())
}

async fn rewrite_macros(project: &Path, expand: bool) -> Result<()> {
    let store = MemoryStore::load_snapshot(project).await?;
    let state = store.get_state();
    let mut dangling = Vec::new();

    let macros = state
        .macros
        .into_iter()
        .map(|mut record| {
            record.steps = if expand {
                let (steps, missing) = partials::expand_reporting(&record.steps, &state.partials);
                dangling.extend(missing.into_iter().map(|id| format!("{}: {}", record.name, id)));
                steps
            } else {
                partials::compress(&record.steps, &state.partials)
            };
            record
        })
        .collect::<Vec<_>>();
    let count = macros.len();

    store.set_state(StatePatch {
        macros: Some(macros),
        ..Default::default()
    });
    store.save_snapshot(project).await?;

    let verb = if expand { "Expanded" } else { "Compressed" };
    println!("{} {} macros in {}", verb, count.to_string().green(), project.display());
    for entry in dangling {
        println!("  {} dropped unknown partial {}", "!".yellow(), entry);
    }
    Ok(())
}

fn list_ports_formatted() -> Result<()> {
    let (inputs, outputs) = ports::discover_all_ports().context("Failed to enumerate MIDI ports")?;

    println!("\n{}", "=== Available MIDI Ports ===".bold().cyan());
    for (title, list) in [("Input Ports:", inputs), ("Output Ports:", outputs)] {
        println!("\n{}", title.bold());
        if list.is_empty() {
            println!("  {}", "No ports found".dimmed());
            continue;
        }
        for port in list {
            let marker = if port.is_virtual {
                "[VIRTUAL]".yellow()
            } else {
                "[PHYSICAL]".green()
            };
            println!("  {} {}", marker, port.name);
        }
    }
    Ok(())
}

fn print_import_report(report: &ImportReport, project: &Path) {
    println!("\n{}", "=== Import Complete ===".bold().cyan());
    if let Some(version) = &report.firmware_version {
        println!("  Firmware:  {}", version.bright_white());
    }
    println!("  Songs:     {}", report.songs.to_string().green());
    println!("  Macros:    {}", report.macros.to_string().green());
    println!("  Setlists:  {}", report.setlists.to_string().green());
    println!("  Settings:  {}", report.settings.to_string().green());
    println!("  Jacks:     {}", report.jacks.to_string().green());
    println!("  Defaults skipped: {}", report.defaults_skipped.to_string().dimmed());
    print_warnings(&report.warnings);
    println!("\nSaved to {}", project.display());
}

fn print_export_report(report: &ExportReport, project: &Path) {
    println!("\n{}", "=== Export Complete ===".bold().cyan());
    println!("  Source:    {}", project.display());
    println!("  Songs:     {}", report.songs.to_string().green());
    println!("  Macros:    {}", report.macros.to_string().green());
    if report.cleared_macros > 0 {
        println!("  Cleared:   {}", report.cleared_macros.to_string().green());
    }
    println!("  Setlists:  {}", report.setlists.to_string().green());
    println!("  Settings:  {}", report.settings.to_string().green());
    println!("  Jacks:     {}", report.jacks.to_string().green());
    println!("  Writes:    {}", report.writes.to_string().dimmed());
    print_warnings(&report.warnings);
}

fn print_warnings(warnings: &[String]) {
    if warnings.is_empty() {
        return;
    }
    println!("\n{} ({})", "Warnings".bold().yellow(), warnings.len());
    for warning in warnings {
        println!("  {} {}", "!".yellow(), warning);
    }
}

fn init_logging(level: &str, json: bool) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .try_init()
            .context("Failed to initialise logging")?;
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_thread_names(false)
                    .with_writer(std::io::stderr),
            )
            .try_init()
            .context("Failed to initialise logging")?;
    }

    Ok(())
}
