//! Accelbench - accelerator performance validation
//!
//! Entry point for the command line validator. Runs the full validation
//! suite against the simulated accelerator and prints the report.

use accelbench::{
    AppConfig, Clock, ConfigUpdate, DeviceSession, LcgSource, SimulatedTransport, SystemClock,
    ValidationHarness, ValidationPlan, ValidationReport,
};
use anyhow::{Context, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

struct Options {
    json: bool,
    quick: bool,
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("accelbench=info".parse()?)
                .add_directive("accelbench_core=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    let Some(options) = parse_args()? else {
        return Ok(());
    };

    let config = AppConfig::load();
    let plan = if options.quick {
        ValidationPlan::quick()
    } else {
        config.plan
    };

    // Set up Ctrl+C handler
    let stop = Arc::new(AtomicBool::new(false));
    let s = stop.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        s.store(true, Ordering::SeqCst);
    }) {
        warn!("Failed to install Ctrl+C handler: {}", e);
    }

    let harness = ValidationHarness::new(plan, config.targets)
        .context("Invalid validation plan in config")?
        .with_stop_flag(stop);

    let clock: Arc<dyn Clock> = Arc::new(SystemClock::new());
    let transport =
        SimulatedTransport::new(clock.clone()).with_source(LcgSource::new(config.seed));
    let mut session = DeviceSession::new(transport, clock)
        .with_source(LcgSource::new(config.seed.wrapping_add(1)))
        .with_window_capacity(config.window_capacity());

    if !options.json {
        println!("Accelbench v{} (built {})", accelbench::VERSION, accelbench::BUILD_DATE);
        println!();
    }

    session.connect().context("Failed to connect to device")?;
    if let (Some(device), false) = (session.device_info(), options.json) {
        println!("Device: {} ({})", device.name, device.link);
        println!(
            "  {} cores, {} MB/s link",
            device.max_cores, device.max_data_rate
        );
        println!();
    }

    let outcome = run(&harness, &mut session, &config);
    session.disconnect();
    let report = outcome?;

    if options.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}", report);
    }

    if !report.passed() {
        std::process::exit(1);
    }
    Ok(())
}

fn run(
    harness: &ValidationHarness,
    session: &mut DeviceSession<SimulatedTransport>,
    config: &AppConfig,
) -> Result<ValidationReport> {
    session
        .update_config(ConfigUpdate::from_config(&config.device))
        .context("Device rejected configured settings")?;
    info!(
        active_cores = config.device.active_cores,
        data_rate = config.device.data_rate,
        "Device configured"
    );

    let report = harness
        .full_validation(session)
        .context("Validation aborted")?;

    let baseline_us = config.targets.cpu_baseline.as_secs_f64() * 1e6;
    match session.statistics(baseline_us) {
        Ok(stats) => info!(
            samples = stats.sample_count,
            avg_us = stats.avg_latency_us,
            p99_us = stats.p99_latency_us,
            max_jitter_us = stats.max_jitter_us,
            speedup = stats.speedup,
            "Window statistics"
        ),
        Err(e) => warn!("No window statistics: {}", e),
    }
    Ok(report)
}

/// Parse flags; `None` means the invocation was fully handled (help/version)
fn parse_args() -> Result<Option<Options>> {
    let mut options = Options {
        json: false,
        quick: false,
    };

    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--json" | "-j" => options.json = true,
            "--quick" | "-q" => options.quick = true,
            "--version" | "-v" => {
                println!("accelbench {}", accelbench::VERSION);
                return Ok(None);
            }
            "--help" | "-h" => {
                print_help();
                return Ok(None);
            }
            other => {
                print_help();
                anyhow::bail!("Unknown argument: {}", other);
            }
        }
    }
    Ok(Some(options))
}

fn print_help() {
    println!("Usage: accelbench [OPTIONS]");
    println!();
    println!("Options:");
    println!("  -j, --json     Print the validation report as JSON");
    println!("  -q, --quick    Short run (200 iterations, 3s jitter and throughput)");
    println!("  -v, --version  Show version");
    println!("  -h, --help     Show this help");
    println!();
    println!("Settings are read from {}", AppConfig::path().display());
}
