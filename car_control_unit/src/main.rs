//! # CrazyCar Control Unit
//!
//! Command-line front end of the control core.
//!
//! - `verify` rebuilds the native control law and checks its symbol
//!   manifest; exits non-zero when the artifact cannot be trusted.
//! - `replay FILE` runs the paced control cycle over a JSON-lines frame
//!   file against the simulated actuator and prints one JSON record per tick.
//! - `check-config` validates the configuration and prints the effective
//!   values.

use std::error::Error;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::process;

use car_common::config::{ConfigError, LogLevel, SharedConfig};
use car_common::control::config::ControlConfig;
use car_control_unit::actuation::SimActuator;
use car_control_unit::bridge::ControllerBridge;
use car_control_unit::config::resolve_config;
use car_control_unit::cycle::{CycleError, CycleRunner};
use car_control_unit::sensor::ReplaySource;
use car_control_unit::verify::BuildVerifier;
use clap::{Parser, Subcommand};
use std::sync::atomic::Ordering;
use tracing::{error, info, info_span, warn};
use tracing_subscriber::EnvFilter;

/// CrazyCar Control Unit: dual-variant vehicle control loop
#[derive(Parser, Debug)]
#[command(name = "car_control_unit")]
#[command(version)]
#[command(about = "Native/interpreted control law bridge, verifier and replay harness")]
struct Args {
    /// Path to the TOML configuration (default: config/car.toml if present).
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Enable verbose logging (DEBUG level).
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output logs in JSON format.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Rebuild the native control law and verify its symbol manifest.
    Verify {
        /// Verify the existing artifact without rebuilding.
        #[arg(long)]
        no_build: bool,
    },

    /// Run the control cycle over a JSON-lines sensor recording.
    Replay {
        /// Frame file (one JSON object per line).
        file: PathBuf,

        /// Rebuild and verify the native artifact before starting.
        #[arg(long)]
        rebuild: bool,

        /// Use the interpreted control law only.
        #[arg(long, conflicts_with = "rebuild")]
        interpreted: bool,

        /// Ignore the configured period and run as fast as possible.
        #[arg(long)]
        no_pace: bool,

        /// Stop after this many ticks.
        #[arg(long)]
        max_ticks: Option<u64>,
    },

    /// Validate the configuration and print the effective values.
    CheckConfig,
}

fn main() {
    let args = Args::parse();
    let config = resolve_config(args.config.as_deref());
    let level = match &config {
        Ok(config) => config.shared.log_level,
        Err(_) => LogLevel::Info,
    };
    setup_tracing(&args, level);

    let _service = info_span!("service", name = %service_name(&config)).entered();
    info!("CrazyCar Control Unit v{} starting...", env!("CARGO_PKG_VERSION"));

    let result = config
        .map_err(|e| Box::new(e) as Box<dyn Error>)
        .and_then(|config| run(&args, config));
    if let Err(e) = result {
        error!("FATAL: {e}");
        process::exit(1);
    }
}

fn run(args: &Args, mut config: ControlConfig) -> Result<(), Box<dyn Error>> {
    match args.command {
        Command::Verify { no_build } => {
            let verifier = BuildVerifier::new(&config.verifier);
            let result = if no_build {
                verifier.verify_artifact()
            } else {
                verifier.rebuild_and_verify()
            };
            println!("{}", serde_json::to_string_pretty(&result)?);
            match result.failure {
                None => {
                    info!("Native artifact OK: {}", result.artifact.display());
                    Ok(())
                }
                Some(failure) => Err(failure.into()),
            }
        }

        Command::Replay {
            ref file,
            rebuild,
            interpreted,
            no_pace,
            max_ticks,
        } => {
            if interpreted {
                config.bridge.prefer_native = false;
            }
            if max_ticks.is_some() {
                config.cycle.max_ticks = max_ticks;
            }

            let verification = if interpreted {
                None
            } else {
                let verifier = BuildVerifier::new(&config.verifier);
                Some(if rebuild {
                    verifier.rebuild_and_verify()
                } else {
                    verifier.verify_artifact()
                })
            };
            let bridge = ControllerBridge::start(&config, verification.as_ref())?;
            info!(variant = %bridge.selected(), "Replaying {}", file.display());

            let source = ReplaySource::open(file)?;
            let actuator = SimActuator::new(config.actuation.clone());
            let mut runner = CycleRunner::new(bridge, source, actuator, &config.cycle);
            if no_pace {
                runner = runner.unpaced();
            }

            let running = runner.running_flag();
            ctrlc::set_handler(move || {
                info!("Received shutdown signal");
                running.store(false, Ordering::SeqCst);
            })?;

            let stdout = io::stdout();
            let mut out = BufWriter::new(stdout.lock());
            let summary = runner.run(|record| {
                serde_json::to_writer(&mut out, record)
                    .map_err(|e| CycleError::Output(e.to_string()))?;
                writeln!(out).map_err(|e| CycleError::Output(e.to_string()))
            })?;
            out.flush()?;

            if summary.bridge.fallbacks > 0 {
                warn!(
                    fallbacks = summary.bridge.fallbacks,
                    "Native variant failed during replay"
                );
            }
            Ok(())
        }

        Command::CheckConfig => {
            print!("{}", toml::to_string_pretty(&config)?);
            info!("Configuration OK");
            Ok(())
        }
    }
}

/// Service name every log line is tagged with.
fn service_name(config: &Result<ControlConfig, ConfigError>) -> String {
    match config {
        Ok(config) => config.shared.service_name.clone(),
        Err(_) => SharedConfig::default().service_name,
    }
}

/// Setup tracing subscriber based on CLI arguments.
///
/// Logs go to stderr so replay output on stdout stays machine-readable.
/// `RUST_LOG` overrides the configured level.
fn setup_tracing(args: &Args, configured: LogLevel) {
    let level = if args.verbose {
        LogLevel::Debug
    } else {
        configured
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_directive()));

    if args.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(io::stderr)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(io::stderr)
            .compact()
            .init();
    }
}
