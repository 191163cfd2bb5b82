//! ---
//! wtp_section: "00-shared-runtime"
//! wtp_subsection: "module"
//! wtp_type: "source"
//! wtp_scope: "code"
//! wtp_description: "Metrics collection and export utilities."
//! wtp_version: "v0.0.0-prealpha"
//! wtp_owner: "tbd"
//! ---
use std::net::{SocketAddr, TcpListener as StdTcpListener};
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::http::{header, HeaderValue, StatusCode};
use axum::routing::get;
use axum::{response::IntoResponse, Router};
use prometheus::{
    Gauge, GaugeVec, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGaugeVec, Opts,
    Registry, TextEncoder,
};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// Shared registry type used across services.
pub type SharedRegistry = Arc<Registry>;

/// Produce a new shared registry.
pub fn new_registry() -> SharedRegistry {
    Arc::new(Registry::new())
}

/// Spawn an HTTP server that exposes the registry at `/metrics`.
pub fn spawn_http_server(registry: SharedRegistry, addr: SocketAddr) -> Result<MetricsServer> {
    let app = Router::new().route(
        "/metrics",
        get({
            let registry = registry.clone();
            move || metrics_handler(registry.clone())
        }),
    );

    let std_listener = StdTcpListener::bind(addr)
        .with_context(|| format!("failed to bind metrics listener {}", addr))?;
    std_listener
        .set_nonblocking(true)
        .with_context(|| "failed to configure metrics listener as non-blocking")?;
    let bound = std_listener
        .local_addr()
        .with_context(|| "failed to read metrics listener address")?;
    let listener = TcpListener::from_std(std_listener)
        .with_context(|| "failed to convert std listener into tokio listener")?;

    info!(address = %bound, "metrics server starting");

    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let service = app.into_make_service();
    let handle: JoinHandle<Result<()>> = tokio::spawn(async move {
        axum::serve(listener, service)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.await;
            })
            .await
            .context("metrics server encountered an error")?;
        Ok(())
    });

    Ok(MetricsServer {
        addr: bound,
        shutdown: Some(shutdown_tx),
        task: handle,
    })
}

async fn metrics_handler(registry: SharedRegistry) -> impl IntoResponse {
    let families = registry.gather();
    let encoder = TextEncoder::new();
    match encoder.encode_to_string(&families) {
        Ok(body) => (
            StatusCode::OK,
            [(
                header::CONTENT_TYPE,
                HeaderValue::from_static(prometheus::TEXT_FORMAT),
            )],
            body,
        ),
        Err(err) => {
            error!(error = %err, "failed to encode metrics");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [(header::CONTENT_TYPE, HeaderValue::from_static("text/plain"))],
                String::from("metrics encoding error"),
            )
        }
    }
}

/// Handle to the running HTTP exporter.
#[derive(Debug)]
pub struct MetricsServer {
    addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<Result<()>>,
}

impl MetricsServer {
    /// Address actually bound, useful when listening on port 0.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Signal shutdown and await task completion.
    pub async fn shutdown(mut self) -> Result<()> {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        match self.task.await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(err)) => Err(err),
            Err(join_err) => Err(anyhow::Error::new(join_err)),
        }
    }
}

/// Metrics recorded by the daemon process itself.
#[derive(Clone)]
pub struct DaemonMetrics {
    registry: SharedRegistry,
    starts_total: IntCounter,
    config_load_seconds: Histogram,
    build_info: GaugeVec,
}

impl DaemonMetrics {
    pub fn new(registry: SharedRegistry) -> Result<Self> {
        let starts_total = IntCounter::with_opts(Opts::new(
            "wtpd_starts_total",
            "Total number of times the simulator daemon has initialised",
        ))?;
        registry.register(Box::new(starts_total.clone()))?;

        let buckets = prometheus::exponential_buckets(0.001, 2.0, 16)
            .context("failed to construct histogram buckets")?;
        let config_load_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "wtpd_config_load_seconds",
                "Time spent loading and validating configuration",
            )
            .buckets(buckets),
        )?;
        registry.register(Box::new(config_load_seconds.clone()))?;

        let build_info = GaugeVec::new(
            Opts::new("wtpd_build_info", "Build metadata for the running daemon binary"),
            &["version", "profile"],
        )?;
        registry.register(Box::new(build_info.clone()))?;

        Ok(Self {
            registry,
            starts_total,
            config_load_seconds,
            build_info,
        })
    }

    pub fn registry(&self) -> SharedRegistry {
        self.registry.clone()
    }

    pub fn inc_start(&self) {
        self.starts_total.inc();
    }

    pub fn observe_config_load(&self, seconds: f64) {
        self.config_load_seconds.observe(seconds);
    }

    pub fn set_build_info(&self, version: &str, profile: &str) {
        self.build_info
            .with_label_values(&[version, profile])
            .set(1.0);
    }
}

/// Metrics describing the simulation engine loop and the plant it drives.
#[derive(Clone, Debug)]
pub struct EngineMetrics {
    registry: SharedRegistry,
    ticks_total: IntCounter,
    tick_seconds: Histogram,
    simulated_seconds: Gauge,
    active_alarms: IntGaugeVec,
    alarm_transitions: IntCounterVec,
    scenario_steps: IntCounterVec,
    commands: IntCounterVec,
}

impl EngineMetrics {
    pub fn new(registry: SharedRegistry) -> Result<Self> {
        let ticks_total = IntCounter::with_opts(Opts::new(
            "wtp_engine_ticks_total",
            "Engine ticks that advanced the plant model",
        ))?;
        registry.register(Box::new(ticks_total.clone()))?;

        let buckets = prometheus::exponential_buckets(0.000_01, 2.0, 16)
            .context("failed to construct tick histogram buckets")?;
        let tick_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "wtp_engine_tick_duration_seconds",
                "Wall-clock time spent computing one engine tick",
            )
            .buckets(buckets),
        )?;
        registry.register(Box::new(tick_seconds.clone()))?;

        let simulated_seconds = Gauge::with_opts(Opts::new(
            "wtp_engine_simulated_seconds",
            "Simulated seconds elapsed since the last reset",
        ))?;
        registry.register(Box::new(simulated_seconds.clone()))?;

        let active_alarms = IntGaugeVec::new(
            Opts::new("wtp_active_alarms", "Currently active alarms by priority"),
            &["priority"],
        )?;
        registry.register(Box::new(active_alarms.clone()))?;

        let alarm_transitions = IntCounterVec::new(
            Opts::new(
                "wtp_alarm_transitions_total",
                "Alarm raise and clear transitions by priority",
            ),
            &["transition", "priority"],
        )?;
        registry.register(Box::new(alarm_transitions.clone()))?;

        let scenario_steps = IntCounterVec::new(
            Opts::new(
                "wtp_scenario_steps_total",
                "Scenario steps fired by scenario and action",
            ),
            &["scenario", "action"],
        )?;
        registry.register(Box::new(scenario_steps.clone()))?;

        let commands = IntCounterVec::new(
            Opts::new(
                "wtp_commands_total",
                "Operator commands by kind and outcome",
            ),
            &["kind", "outcome"],
        )?;
        registry.register(Box::new(commands.clone()))?;

        Ok(Self {
            registry,
            ticks_total,
            tick_seconds,
            simulated_seconds,
            active_alarms,
            alarm_transitions,
            scenario_steps,
            commands,
        })
    }

    pub fn registry(&self) -> SharedRegistry {
        self.registry.clone()
    }

    pub fn observe_tick(&self, seconds: f64, simulated_elapsed: f64) {
        self.ticks_total.inc();
        self.tick_seconds.observe(seconds);
        self.simulated_seconds.set(simulated_elapsed);
    }

    pub fn set_active_alarms(&self, priority: &str, count: usize) {
        self.active_alarms
            .with_label_values(&[priority])
            .set(count as i64);
    }

    pub fn record_alarm_transition(&self, transition: &str, priority: &str) {
        self.alarm_transitions
            .with_label_values(&[transition, priority])
            .inc();
    }

    pub fn record_scenario_step(&self, scenario: &str, action: &str) {
        self.scenario_steps
            .with_label_values(&[scenario, action])
            .inc();
    }

    pub fn record_command(&self, kind: &str, outcome: &str) {
        self.commands.with_label_values(&[kind, outcome]).inc();
    }
}

pub use prometheus;

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    #[test]
    fn engine_metrics_register_once_per_registry() {
        let registry = new_registry();
        let metrics = EngineMetrics::new(registry.clone()).unwrap();
        metrics.observe_tick(0.0002, 0.5);
        metrics.record_command("pump", "applied");
        assert!(EngineMetrics::new(registry.clone()).is_err());

        let names: Vec<String> = registry
            .gather()
            .iter()
            .map(|family| family.get_name().to_owned())
            .collect();
        assert!(names.contains(&"wtp_engine_ticks_total".to_owned()));
        assert!(names.contains(&"wtp_commands_total".to_owned()));
    }

    #[tokio::test]
    async fn http_endpoint_serves_text_format() {
        let registry = new_registry();
        let metrics = EngineMetrics::new(registry.clone()).unwrap();
        metrics.observe_tick(0.001, 1.0);
        let server = spawn_http_server(registry, "127.0.0.1:0".parse().unwrap()).unwrap();

        let mut stream = tokio::net::TcpStream::connect(server.addr()).await.unwrap();
        stream
            .write_all(b"GET /metrics HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
            .await
            .unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).await.unwrap();
        assert!(response.starts_with("HTTP/1.1 200"));
        assert!(response.contains("wtp_engine_ticks_total 1"));

        server.shutdown().await.unwrap();
    }
}
