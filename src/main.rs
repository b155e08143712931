//! Trailing Dose CLI
//!
//! Publishes the 4-hour trailing dose of a dose-rate input.

use anyhow::{bail, Context};
use chrono::Utc;
use clap::{ArgAction, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use trailing_dose::{
    Config, DoseSnapshot, Engine, LineSource, PublishedValue, SampleSource, SnapshotBuilder, VERSION,
};

#[derive(Parser)]
#[command(name = "trailing-dose")]
#[command(version = VERSION)]
#[command(about = "Sliding-window 4h dose accumulator", long_about = None)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    /// Configuration file (defaults to the user config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Integrate a live dose-rate input and publish the trailing dose
    Run {
        /// Name of the dose-rate input PV
        input_pv: String,

        /// Name of the trailing-dose output PV
        output_pv: String,

        /// Read samples from a file instead of stdin
        #[arg(long)]
        file: Option<PathBuf>,

        /// Skip writing the end-of-run snapshot
        #[arg(long)]
        no_export: bool,
    },

    /// Integrate a recorded sample file and print the resulting snapshot
    Integrate {
        /// File with one `timestamp value` sample per line
        file: PathBuf,

        /// Name used for the output PV in the snapshot
        #[arg(long, default_value = "DOSE4H")]
        output_pv: String,
    },

    /// Show configuration
    Config {
        /// Write the effective configuration to the config file
        #[arg(long)]
        save: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Run {
            input_pv,
            output_pv,
            file,
            no_export,
        } => cmd_run(&config, &input_pv, &output_pv, file.as_deref(), no_export),
        Commands::Integrate { file, output_pv } => cmd_integrate(&config, &file, &output_pv),
        Commands::Config { save } => cmd_config(&config, cli.config.as_deref(), save),
    }
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let config = match path {
        Some(path) => Config::load_from(path)
            .with_context(|| format!("loading configuration from {}", path.display()))?,
        None => Config::load().context("loading configuration")?,
    };
    Ok(config)
}

fn cmd_run(
    config: &Config,
    input_pv: &str,
    output_pv: &str,
    file: Option<&Path>,
    no_export: bool,
) -> anyhow::Result<()> {
    if input_pv == output_pv {
        bail!("input and output PV must differ");
    }

    let builder = SnapshotBuilder::new();
    tracing::info!(
        version = VERSION,
        instance = builder.instance_id(),
        window_secs = config.window_duration.as_secs(),
        "starting trailing-dose"
    );

    let engine = Engine::start(output_pv, config).context("starting integration worker")?;

    // Log every flushed update, the way a monitoring client would see it
    let updates = engine.value().subscribe();
    let metadata = engine.value().metadata().clone();
    let logger = thread::Builder::new()
        .name("update-log".to_string())
        .spawn(move || {
            for update in updates {
                if update.alarm.is_alarm() {
                    tracing::warn!(
                        pv = %update.name,
                        seq = update.sequence,
                        status = ?update.alarm.status,
                        "{}",
                        metadata.format_value(update.value)
                    );
                } else {
                    tracing::info!(
                        pv = %update.name,
                        seq = update.sequence,
                        "{}",
                        metadata.format_value(update.value)
                    );
                }
            }
        })
        .context("starting update logger")?;

    let mut source = match file {
        Some(path) => LineSource::from_path(path)?,
        None => LineSource::stdin(),
    };
    engine.attach(&mut source, input_pv)?;

    let running = Arc::new(AtomicBool::new(true));
    ctrlc_handler(running.clone())?;

    let mut ticks = 0u64;
    while running.load(Ordering::SeqCst) && source.is_running() {
        thread::sleep(Duration::from_millis(100));
        ticks += 1;
        if ticks % 50 == 0 {
            tracing::debug!(queue_depth = engine.producer().len(), "ingestion queue");
        }
    }

    if running.load(Ordering::SeqCst) {
        source.wait();
    } else {
        tracing::info!("interrupted, stopping");
        source.stop();
    }
    if source.rejected_lines() > 0 {
        tracing::warn!(rejected = source.rejected_lines(), "malformed input lines skipped");
    }

    if !engine.producer().is_empty() {
        tracing::info!(pending = engine.producer().len(), "draining queued samples");
    }

    let value = engine.value().clone();
    let stats = engine.stats().clone();
    let accumulator = engine
        .shutdown()
        .context("integration worker panicked")?;

    log_final_value(&value);
    let snapshot = builder.build(&value, accumulator.window(), Some(stats.stats()));

    // Last handle on the value; its subscriber channel closes and the logger
    // finishes the updates it already received
    drop(value);
    if logger.join().is_err() {
        tracing::warn!("update logger panicked");
    }

    println!("{}", serde_json::to_string_pretty(&snapshot)?);
    eprintln!();
    eprintln!("{}", stats.summary());

    if !no_export {
        match export_snapshot(config, &snapshot) {
            Ok(path) => tracing::info!("snapshot written to {}", path.display()),
            Err(e) => tracing::warn!("could not write snapshot: {e:#}"),
        }
    }
    Ok(())
}

fn cmd_integrate(config: &Config, file: &Path, output_pv: &str) -> anyhow::Result<()> {
    let engine = Engine::start(output_pv, config).context("starting integration worker")?;
    let mut source = LineSource::from_path(file)?;
    engine.attach(&mut source, &file.display().to_string())?;
    source.wait();

    let value = engine.value().clone();
    let stats = engine.stats().clone();
    let accumulator = engine
        .shutdown()
        .context("integration worker panicked")?;

    log_final_value(&value);
    let snapshot = SnapshotBuilder::new().build(&value, accumulator.window(), Some(stats.stats()));
    println!("{}", serde_json::to_string_pretty(&snapshot)?);
    Ok(())
}

fn log_final_value(value: &PublishedValue) {
    let alarm = value.alarm();
    if alarm.is_alarm() {
        tracing::warn!(pv = %value.name(), status = ?alarm.status, "final {}", value.formatted());
    } else {
        tracing::info!(pv = %value.name(), "final {}", value.formatted());
    }
}

fn cmd_config(config: &Config, path: Option<&Path>, save: bool) -> anyhow::Result<()> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(Config::config_path);
    if save {
        config
            .save_to(&path)
            .with_context(|| format!("saving configuration to {}", path.display()))?;
        println!("Configuration saved to {path:?}");
        return Ok(());
    }
    println!("Configuration");
    println!("=============");
    println!();
    println!("Config file: {path:?}");
    println!();
    println!("{}", serde_json::to_string_pretty(config)?);
    Ok(())
}

fn export_snapshot(config: &Config, snapshot: &DoseSnapshot) -> anyhow::Result<PathBuf> {
    std::fs::create_dir_all(&config.export_path)
        .with_context(|| format!("creating {}", config.export_path.display()))?;
    let path = config.export_path.join(format!(
        "{}_{}.json",
        snapshot.pv.replace(':', "_"),
        Utc::now().format("%Y%m%d_%H%M%S")
    ));
    std::fs::write(&path, serde_json::to_string_pretty(snapshot)?)?;
    Ok(path)
}

/// Set up Ctrl+C handler.
fn ctrlc_handler(running: Arc<AtomicBool>) -> anyhow::Result<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .context("setting Ctrl+C handler")
}
