use std::path::PathBuf;

use serde::Serialize;

/// Application-level constants
pub const APP_NAME: &str = "MediCore";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default session time-to-live: 1 hour of inactivity.
pub const DEFAULT_SESSION_TTL_SECS: u64 = 60 * 60;

/// Default number of ranked candidates returned by a prediction.
pub const DEFAULT_TOP_K: usize = 3;

/// Default number of follow-up questions offered per turn.
pub const DEFAULT_MAX_QUESTIONS: usize = 3;

/// Candidates below this confidence are dropped from every ranking.
pub const MIN_CONFIDENCE: f64 = 0.01;

/// Default interval between eager session sweeps.
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 5 * 60;

/// File name of the classifier artifact inside the knowledge directory.
pub const MODEL_FILE_NAME: &str = "medicore_model.json";

/// Default `tracing` filter when `RUST_LOG` is not set.
pub fn default_log_filter() -> &'static str {
    "medicore_triage=info,warn"
}

/// Get the application data directory.
/// ~/MediCore/ on all platforms. Falls back to the working directory
/// when no home directory can be determined (containers, CI).
pub fn app_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
}

/// Directory holding synonyms, red flags, medicine rules and the model.
/// Overridable with `MEDICORE_KNOWLEDGE_DIR`.
pub fn knowledge_dir() -> PathBuf {
    std::env::var_os("MEDICORE_KNOWLEDGE_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|| app_data_dir().join("knowledge"))
}

/// Path of the classifier artifact. Overridable with `MEDICORE_MODEL_PATH`.
pub fn model_path() -> PathBuf {
    std::env::var_os("MEDICORE_MODEL_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|| knowledge_dir().join(MODEL_FILE_NAME))
}

// ═══════════════════════════════════════════════════════════
// TriageConfig
// ═══════════════════════════════════════════════════════════

/// Tunables for the triage engine, fixed at startup.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TriageConfig {
    /// Sliding inactivity window after which a session is gone.
    pub session_ttl_secs: u64,
    /// Maximum number of ranked candidates per prediction.
    pub top_k: usize,
    /// Maximum number of follow-up questions per turn.
    pub max_questions: usize,
    /// Confidence floor for reported candidates.
    pub min_confidence: f64,
    /// How often the background sweeper runs (when one is started).
    pub sweep_interval_secs: u64,
}

impl Default for TriageConfig {
    fn default() -> Self {
        Self {
            session_ttl_secs: DEFAULT_SESSION_TTL_SECS,
            top_k: DEFAULT_TOP_K,
            max_questions: DEFAULT_MAX_QUESTIONS,
            min_confidence: MIN_CONFIDENCE,
            sweep_interval_secs: DEFAULT_SWEEP_INTERVAL_SECS,
        }
    }
}

impl TriageConfig {
    /// Build a config from defaults overridden by `MEDICORE_*` environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as `from_env` with an injectable variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(v) = parse_var(&lookup, "MEDICORE_SESSION_TTL_SECS") {
            config.session_ttl_secs = v;
        }
        if let Some(v) = parse_var(&lookup, "MEDICORE_TOP_K") {
            config.top_k = v;
        }
        if let Some(v) = parse_var(&lookup, "MEDICORE_MAX_QUESTIONS") {
            config.max_questions = v;
        }
        if let Some(v) = parse_var(&lookup, "MEDICORE_SWEEP_INTERVAL_SECS") {
            config.sweep_interval_secs = v;
        }
        if let Some(v) = parse_var::<f64>(&lookup, "MEDICORE_MIN_CONFIDENCE") {
            if (0.0..=1.0).contains(&v) {
                config.min_confidence = v;
            } else {
                tracing::warn!(value = v, "Ignoring confidence floor outside [0, 1]");
            }
        }
        config
    }
}

fn parse_var<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Option<T> {
    let raw = lookup(key)?;
    match raw.trim().parse::<T>() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!(key, value = %raw, "Ignoring invalid configuration value");
            None
        }
    }
}
