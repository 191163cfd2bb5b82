//! ---
//! wtp_section: "04-orchestration"
//! wtp_subsection: "module"
//! wtp_type: "source"
//! wtp_scope: "code"
//! wtp_description: "Tokio host driving the engine on a fixed wall-clock period."
//! wtp_version: "v0.0.0-prealpha"
//! wtp_owner: "tbd"
//! ---
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use wtp_process::ProcessState;
use wtp_rt::RateLimiter;

use crate::commands::CommandError;
use crate::engine::SimulationEngine;

pub type SharedEngine = Arc<Mutex<SimulationEngine>>;

/// Hosts one [`SimulationEngine`] and ticks it from a tokio task.
///
/// Ticks and commands take the same lock, so a command never lands in the
/// middle of a tick and is visible to the next one.
#[derive(Debug)]
pub struct PlantRuntime {
    engine: SharedEngine,
    period: Duration,
}

impl PlantRuntime {
    pub fn new(engine: SimulationEngine, period: Duration) -> Self {
        Self {
            engine: Arc::new(Mutex::new(engine)),
            period,
        }
    }

    pub fn engine(&self) -> SharedEngine {
        Arc::clone(&self.engine)
    }

    /// Start the tick task. Must be called inside a tokio runtime.
    pub fn spawn(self) -> PlantHandle {
        let (shutdown_tx, mut shutdown_rx) = broadcast::channel(16);
        let engine = Arc::clone(&self.engine);
        let period = self.period;
        let task = tokio::spawn(async move {
            let mut limiter = RateLimiter::new(period);
            let mut ticks: u64 = 0;
            loop {
                tokio::select! {
                    _ = shutdown_rx.recv() => {
                        debug!(ticks, "plant runtime shutdown signal received");
                        break;
                    }
                    timing = limiter.tick() => {
                        if timing.overran(period) {
                            warn!(
                                jitter_us = timing.jitter_us,
                                period_ms = period.as_millis() as u64,
                                "tick overran its period"
                            );
                        }
                        engine.lock().tick();
                        ticks += 1;
                    }
                }
            }
            ticks
        });
        info!(period_ms = self.period.as_millis() as u64, "plant runtime started");
        PlantHandle {
            engine: self.engine,
            shutdown: shutdown_tx,
            task,
        }
    }
}

/// Control surface for a running [`PlantRuntime`].
#[derive(Debug)]
pub struct PlantHandle {
    engine: SharedEngine,
    shutdown: broadcast::Sender<()>,
    task: JoinHandle<u64>,
}

impl PlantHandle {
    pub fn engine(&self) -> SharedEngine {
        Arc::clone(&self.engine)
    }

    /// Run `f` with exclusive access to the engine, between ticks.
    pub fn with_engine<R>(&self, f: impl FnOnce(&mut SimulationEngine) -> R) -> R {
        let mut engine = self.engine.lock();
        f(&mut engine)
    }

    pub fn apply_control(&self, kind: &str, payload: &Value) -> Result<(), CommandError> {
        self.engine.lock().apply_control(kind, payload)
    }

    /// Snapshot of the current plant state.
    pub fn state(&self) -> ProcessState {
        self.engine.lock().state().clone()
    }

    /// Stop the tick task and return how many ticks it ran.
    pub async fn shutdown(self) -> Result<u64> {
        let _ = self.shutdown.send(());
        let ticks = self
            .task
            .await
            .context("plant runtime task join error")?;
        info!(ticks, "plant runtime shutdown complete");
        Ok(ticks)
    }
}
