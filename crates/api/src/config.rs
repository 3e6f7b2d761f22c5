use std::env;
use std::path::PathBuf;
use std::time::Duration;

use triage_storage::DEFAULT_FEEDBACK_FILE;

pub const DEFAULT_BIND: &str = "0.0.0.0:8080";
pub const DEFAULT_MAX_BULK: usize = 100;

/// Runtime settings for the HTTP boundary.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub bind: String,
    /// When set, every non-public route requires a matching `x-api-key`.
    pub api_key: Option<String>,
    /// SQLite feedback store; takes precedence over `feedback_file`.
    pub database_url: Option<String>,
    /// JSON-lines feedback log. With neither store configured feedback is kept in memory.
    pub feedback_file: Option<PathBuf>,
    pub rules_path: Option<PathBuf>,
    pub max_bulk: usize,
    pub rate_limit_window: Duration,
    pub rate_limit_max: usize,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND.to_string(),
            api_key: None,
            database_url: None,
            feedback_file: None,
            rules_path: None,
            max_bulk: DEFAULT_MAX_BULK,
            rate_limit_window: Duration::from_secs(60),
            rate_limit_max: 600,
        }
    }
}

impl ApiConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            bind: env::var("TRIAGE_BIND").unwrap_or(defaults.bind),
            api_key: non_empty_var("TRIAGE_API_KEY"),
            database_url: non_empty_var("TRIAGE_DATABASE_URL"),
            feedback_file: Some(
                non_empty_var("FEEDBACK_FILE")
                    .unwrap_or_else(|| DEFAULT_FEEDBACK_FILE.to_string())
                    .into(),
            ),
            rules_path: non_empty_var("TRIAGE_RULES").map(PathBuf::from),
            max_bulk: parsed_var("TRIAGE_MAX_BULK").unwrap_or(defaults.max_bulk),
            rate_limit_window: parsed_var("TRIAGE_RATE_LIMIT_WINDOW_SECONDS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.rate_limit_window),
            rate_limit_max: parsed_var("TRIAGE_RATE_LIMIT_MAX").unwrap_or(defaults.rate_limit_max),
        }
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parsed_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    non_empty_var(name).and_then(|value| value.parse::<T>().ok())
}
