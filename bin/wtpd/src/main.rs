//! ---
//! wtp_section: "05-daemon"
//! wtp_subsection: "binary"
//! wtp_type: "source"
//! wtp_scope: "code"
//! wtp_description: "Binary entrypoint for the WTP-Sim daemon."
//! wtp_version: "v0.0.0-prealpha"
//! wtp_owner: "tbd"
//! ---
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::signal;
use tracing::{info, warn};
use wtp_common::config::AppConfig;
use wtp_common::logging::init_tracing;
use wtp_core::{EventKind, PlantEvent, PlantRuntime, SimulationEngine};
use wtp_metrics::{new_registry, spawn_http_server, DaemonMetrics, EngineMetrics};

const DEFAULT_CONFIG: &str = "configs/wtp.toml";

#[derive(Debug, Parser)]
#[command(
    author,
    version = concat!("WTP-Sim ", env!("CARGO_PKG_VERSION")),
    about = "Water treatment plant training simulator daemon",
    long_about = None
)]
struct Cli {
    #[arg(long, value_name = "FILE", help = "Path to configuration file")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    #[command(about = "Run the plant simulation until interrupted")]
    Run {
        #[arg(long, help = "Simulated seconds per wall-clock second")]
        speed: Option<f64>,
        #[arg(long, value_name = "ID", help = "Scenario to start immediately")]
        scenario: Option<String>,
        #[arg(long, help = "Start with the simulation paused")]
        paused: bool,
        #[arg(
            long,
            value_name = "SECS",
            help = "Stop after this many wall-clock seconds instead of waiting for ctrl-c"
        )]
        exit_after: Option<u64>,
    },
    #[command(about = "List built-in and configured training scenarios")]
    Scenarios,
}

fn load_config(explicit: Option<&Path>) -> Result<(AppConfig, Option<PathBuf>)> {
    let env_override = std::env::var(AppConfig::ENV_CONFIG_PATH)
        .map(|value| !value.trim().is_empty())
        .unwrap_or(false);
    let default = PathBuf::from(DEFAULT_CONFIG);
    match explicit {
        Some(path) => {
            let loaded = AppConfig::load_with_source(&[path])?;
            Ok((loaded.config, Some(loaded.source)))
        }
        None if env_override || default.exists() => {
            let loaded = AppConfig::load_with_source(&[default])?;
            Ok((loaded.config, Some(loaded.source)))
        }
        None => Ok((AppConfig::default(), None)),
    }
}

fn build_engine(config: &AppConfig, metrics: Option<EngineMetrics>) -> SimulationEngine {
    let mut engine = SimulationEngine::new(config);
    if let Some(metrics) = metrics {
        engine = engine.with_metrics(metrics);
    }
    for path in &config.simulation.scenario_files {
        match engine.load_scenario_file(path) {
            Ok(id) => info!(scenario = %id, path = %path.display(), "scenario file loaded"),
            Err(err) => warn!(path = %path.display(), error = %err, "failed to load scenario file"),
        }
    }
    engine
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let load_started = Instant::now();
    let (mut config, source) = load_config(cli.config.as_deref())?;
    let load_duration = load_started.elapsed();

    let metrics_registry = new_registry();
    let daemon_metrics = DaemonMetrics::new(metrics_registry.clone())?;
    daemon_metrics.observe_config_load(load_duration.as_secs_f64());
    daemon_metrics.inc_start();
    daemon_metrics.set_build_info(
        env!("CARGO_PKG_VERSION"),
        if cfg!(debug_assertions) { "debug" } else { "release" },
    );

    init_tracing("wtpd", &config.logging)?;
    match &source {
        Some(path) => info!(config_path = %path.display(), "configuration loaded"),
        None => info!("no configuration file found; using defaults"),
    }

    match cli.command.unwrap_or(Commands::Run {
        speed: None,
        scenario: None,
        paused: false,
        exit_after: None,
    }) {
        Commands::Run {
            speed,
            scenario,
            paused,
            exit_after,
        } => {
            if let Some(speed) = speed {
                config.simulation.speed = speed;
            }
            if scenario.is_some() {
                config.simulation.autostart_scenario = scenario;
            }
            if paused {
                config.simulation.start_running = false;
            }
            config
                .validate()
                .context("command line overrides produced an invalid configuration")?;
            let engine_metrics = EngineMetrics::new(metrics_registry.clone())?;
            run_daemon(config, metrics_registry, engine_metrics, exit_after).await?
        }
        Commands::Scenarios => {
            let engine = build_engine(&config, None);
            for scenario in engine.scenarios() {
                println!(
                    "{:<28} {:<13} {:>6.0}s  {}",
                    scenario.id, scenario.difficulty, scenario.duration_s, scenario.name
                );
            }
        }
    }

    Ok(())
}

async fn run_daemon(
    config: AppConfig,
    registry: wtp_metrics::SharedRegistry,
    engine_metrics: EngineMetrics,
    exit_after: Option<u64>,
) -> Result<()> {
    let metrics_server = if config.metrics.enabled {
        let server = spawn_http_server(registry, config.metrics.listen)?;
        info!(address = %server.addr(), "metrics exporter enabled");
        Some(server)
    } else {
        info!("metrics exporter disabled by configuration");
        None
    };

    let mut engine = build_engine(&config, Some(engine_metrics));
    engine.on(EventKind::AlarmNew, |event| {
        if let PlantEvent::AlarmNew(alarm) = event {
            warn!(alarm_id = %alarm.id, priority = %alarm.priority, value = alarm.value, setpoint = alarm.setpoint, "{}", alarm.description);
        }
    });
    engine.on(EventKind::AlarmCleared, |event| {
        if let PlantEvent::AlarmCleared(alarm) = event {
            info!(alarm_id = %alarm.id, value = alarm.value, "alarm returned to normal");
        }
    });
    engine.on(EventKind::SimulationEvent, |event| {
        if let PlantEvent::Simulation(sim) = event {
            info!(scenario = %sim.scenario_id, kind = ?sim.kind, elapsed = sim.elapsed, "{}", sim.message);
        }
    });
    if let Some(id) = &config.simulation.autostart_scenario {
        engine
            .start_scenario_by_id(id)
            .with_context(|| format!("failed to start scenario {}", id))?;
    }

    let handle = PlantRuntime::new(engine, config.simulation.tick_interval).spawn();
    info!(
        speed = config.simulation.speed,
        tick_ms = config.simulation.tick_interval.as_millis() as u64,
        "daemon running; waiting for termination signal"
    );

    match exit_after {
        Some(secs) => {
            tokio::select! {
                _ = tokio::time::sleep(Duration::from_secs(secs)) => info!(secs, "run duration reached"),
                result = signal::ctrl_c() => {
                    result?;
                    info!("ctrl-c received; shutting down");
                }
            }
        }
        None => {
            signal::ctrl_c().await?;
            info!("ctrl-c received; shutting down");
        }
    }

    let state = handle.state();
    let ticks = handle.shutdown().await?;
    info!(
        ticks,
        simulated_s = state.elapsed,
        active_alarms = state.active_alarms().count(),
        "simulation stopped"
    );

    if let Some(server) = metrics_server {
        server.shutdown().await?;
    }
    Ok(())
}
