use clap::Parser;
use colored::*;
use eyre::{Context, Result, eyre};
use log::info;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

mod cli;

use batwatch::alert::CycleObserver;
use batwatch::clock::{Clock, SystemClock};
use batwatch::config::Config;
use batwatch::monitor::{AnyStop, CycleRunner, InterruptFlag, Monitor, RunMode, StopSignal};
use cli::Cli;
use cli::commands::Commands;

fn setup_logging(verbose: bool, level: &str) -> Result<()> {
    let env = env_logger::Env::default().default_filter_or(level);
    let mut builder = env_logger::Builder::from_env(env);

    if verbose {
        builder.target(env_logger::Target::Stderr).init();
        info!("Logging initialized, writing to stderr");
        return Ok(());
    }

    // Create log directory
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("batwatch")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    let log_file = log_dir.join("batwatch.log");

    let target = Box::new(
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)
            .context("Failed to open log file")?,
    );

    builder.target(env_logger::Target::Pipe(target)).init();

    info!("Logging initialized, writing to: {}", log_file.display());
    Ok(())
}

async fn run_application(cli: &Cli, config: &Config) -> Result<()> {
    info!("Starting application");

    if cli.is_verbose() {
        println!("{}", "Verbose mode enabled".yellow());
    }

    match cli.command.clone().unwrap_or(Commands::Watch { json: false }) {
        Commands::Watch { json } => run_monitor(config, RunMode::Continuous, json).await,
        Commands::Once { json } => run_monitor(config, RunMode::Once, json).await,
        Commands::Sites => {
            print_sites(config);
            Ok(())
        }
    }
}

async fn run_monitor(config: &Config, mode: RunMode, json: bool) -> Result<()> {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let stop_file = config.stop_file();
    if mode == RunMode::Continuous && stop_file.is_set() {
        println!(
            "{} {} exists; remove it to start monitoring",
            "Stop file".yellow(),
            stop_file.path().display()
        );
    }
    let interrupt = InterruptFlag::new();
    interrupt.install_ctrl_c();
    let stop: Arc<dyn StopSignal> = Arc::new(AnyStop::new().with(Arc::new(stop_file)).with(Arc::new(interrupt)));

    let observer: Arc<dyn CycleObserver> = Arc::new(config.reporter().with_json(json));
    let runner = CycleRunner::new(clock.clone(), config.checker(clock.clone()));

    let mut monitor = Monitor::new(
        clock,
        Arc::new(config.session()),
        runner,
        config.alerter(),
        observer,
        stop.clone(),
        config.sites.clone(),
        config.monitor_config(mode),
    )
    .context("Failed to build monitor")?;

    if mode == RunMode::Continuous && !json {
        println!(
            "{} {} sites every {}s; stop with {}",
            "Monitoring".cyan(),
            config.sites.len(),
            config.settings.interval_sec,
            stop.describe()
        );
    }

    let last = monitor.run().await;
    let stats = monitor.stats();
    info!(
        "Monitor finished: {} cycles, {} failed, {} alerts",
        stats.cycles_completed, stats.cycles_failed, stats.alerts_raised
    );

    match (mode, last) {
        (RunMode::Once, None) => Err(eyre!("No cycle completed")),
        (RunMode::Continuous, _) => {
            if !json {
                println!("{}", "Monitoring stopped".cyan());
            }
            Ok(())
        }
        _ => Ok(()),
    }
}

fn print_sites(config: &Config) {
    println!("{} ({})", "Sites".green(), config.sites.len());
    for (i, site) in config.sites.iter().enumerate() {
        println!("  {:>2}. {}", i + 1, site);
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Load configuration
    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    let level = config.log_level.clone().unwrap_or_else(|| "info".to_string());
    setup_logging(cli.is_verbose(), &level).context("Failed to setup logging")?;

    info!("Starting with config from: {:?}", config.source);

    config.validate().context("Invalid configuration")?;

    // Run the main application logic
    run_application(&cli, &config).await.context("Application failed")?;

    Ok(())
}
