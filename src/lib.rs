pub mod classifier;
pub mod config;
pub mod disposition;
pub mod driver;
pub mod envelope;
pub mod extraction;
pub mod knowledge;
pub mod questions;
pub mod red_flags;
pub mod session_store;
pub mod sweeper;
pub mod triage;

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::EnvFilter;

pub use triage::{TriageEngine, TriageError};

/// Install the global `tracing` subscriber. Honours `RUST_LOG`, otherwise
/// falls back to `config::default_log_filter()`. Logs go to stderr so
/// stdout stays free for responses. Safe to call more than once.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .with_writer(std::io::stderr)
        .try_init();
}

/// Binary entry point: load everything, start the sweeper, serve stdin.
pub fn run() -> ExitCode {
    init_tracing();
    tracing::info!("{} triage starting v{}", config::APP_NAME, config::APP_VERSION);

    let triage_config = config::TriageConfig::from_env();
    let sweep_interval = Duration::from_secs(triage_config.sweep_interval_secs);
    let engine = match TriageEngine::load(
        triage_config,
        &config::knowledge_dir(),
        &config::model_path(),
    ) {
        Ok(engine) => Arc::new(engine),
        Err(e) => {
            tracing::error!(error = %e, "Failed to load knowledge base");
            return ExitCode::FAILURE;
        }
    };

    let _sweeper = sweeper::SessionSweeper::start(engine.clone(), sweep_interval);

    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    match driver::serve(&engine, stdin.lock(), stdout.lock()) {
        Ok(handled) => {
            tracing::info!(handled, "Input closed, shutting down");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "I/O failure");
            ExitCode::FAILURE
        }
    }
}
