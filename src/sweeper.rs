//! Background session sweeper.
//!
//! Spawns a thread that calls `TriageEngine::sweep_sessions` every
//! interval. The engine itself never schedules sweeps; embedders that want
//! eager expiry start one of these next to it.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::triage::TriageEngine;

/// Sleep granularity for shutdown responsiveness.
const SLEEP_GRANULARITY: Duration = Duration::from_millis(250);

/// Shortest accepted interval; zero would spin.
const MIN_INTERVAL: Duration = Duration::from_millis(10);

/// Handle for the sweeper thread. Stops and joins on `Drop`.
pub struct SessionSweeper {
    shutdown: Arc<AtomicBool>,
    sweeps: Arc<AtomicU64>,
    handle: Option<std::thread::JoinHandle<()>>,
}

impl SessionSweeper {
    pub fn start(engine: Arc<TriageEngine>, interval: Duration) -> Self {
        let interval = interval.max(MIN_INTERVAL);
        let shutdown = Arc::new(AtomicBool::new(false));
        let sweeps = Arc::new(AtomicU64::new(0));
        let flag = shutdown.clone();
        let counter = sweeps.clone();

        let handle = std::thread::spawn(move || {
            tracing::info!(interval_secs = interval.as_secs_f64(), "Session sweeper started");
            sweep_loop(&engine, interval, &flag, &counter);
            tracing::info!("Session sweeper stopped");
        });

        Self {
            shutdown,
            sweeps,
            handle: Some(handle),
        }
    }

    /// Request shutdown. A sweep in progress completes first.
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Relaxed);
    }

    /// Completed sweeps so far.
    pub fn sweeps(&self) -> u64 {
        self.sweeps.load(Ordering::Relaxed)
    }
}

impl Drop for SessionSweeper {
    fn drop(&mut self) {
        self.shutdown();
        if let Some(h) = self.handle.take() {
            let _ = h.join();
        }
    }
}

fn sweep_loop(engine: &TriageEngine, interval: Duration, shutdown: &AtomicBool, sweeps: &AtomicU64) {
    let tick = interval.min(SLEEP_GRANULARITY);
    while !shutdown.load(Ordering::Relaxed) {
        let mut waited = Duration::ZERO;
        while waited < interval {
            if shutdown.load(Ordering::Relaxed) {
                return;
            }
            std::thread::sleep(tick);
            waited += tick;
        }

        match engine.sweep_sessions() {
            Ok(report) => {
                sweeps.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(removed = report.removed, remaining = report.remaining, "Sweep complete");
            }
            Err(e) => tracing::error!(error = %e, "Session sweep failed"),
        }
    }
}
