use serde::Deserialize;
use std::env;

/// Engine tuning knobs. Defaults match the studio product rules; any
/// field can be overridden from config files or `FITBOOK__` env vars.
#[derive(Debug, Deserialize, Clone)]
pub struct EngineConfig {
    /// Hours a cash reservation stays open before lapsing
    #[serde(default = "default_reservation_window_hours")]
    pub reservation_window_hours: i64,
    /// Ledger poll cadence while reserved packages exist
    #[serde(default = "default_ledger_poll_interval_secs")]
    pub ledger_poll_interval_secs: u64,
    /// Timeout on each authoritative request
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Attempts per read-model refresh before leaving it stale
    #[serde(default = "default_refresh_max_retries")]
    pub refresh_max_retries: u32,
    /// Base backoff between refresh attempts, doubled per retry
    #[serde(default = "default_refresh_backoff_ms")]
    pub refresh_backoff_ms: u64,
    /// Pause before the single retry of a transient mutation failure
    #[serde(default = "default_mutation_retry_backoff_ms")]
    pub mutation_retry_backoff_ms: u64,
}

fn default_reservation_window_hours() -> i64 { 48 }
fn default_ledger_poll_interval_secs() -> u64 { 10 }
fn default_request_timeout_secs() -> u64 { 10 }
fn default_refresh_max_retries() -> u32 { 3 }
fn default_refresh_backoff_ms() -> u64 { 250 }
fn default_mutation_retry_backoff_ms() -> u64 { 500 }

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            reservation_window_hours: default_reservation_window_hours(),
            ledger_poll_interval_secs: default_ledger_poll_interval_secs(),
            request_timeout_secs: default_request_timeout_secs(),
            refresh_max_retries: default_refresh_max_retries(),
            refresh_backoff_ms: default_refresh_backoff_ms(),
            mutation_retry_backoff_ms: default_mutation_retry_backoff_ms(),
        }
    }
}

impl EngineConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(config::Environment::with_prefix("FITBOOK").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
