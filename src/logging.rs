use std::str::FromStr;

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

pub const LOG_LEVEL_ENV: &str = "LOG_LEVEL";
pub const DEFAULT_LOG_LEVEL: &str = "info";

// Transport crates are chatty at debug level.
const QUIET_DIRECTIVES: &str = "hyper=warn,hyper_util=warn,h2=warn,tonic=warn,reqwest=warn";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogSettings {
    pub level: Level,
    pub format: LogFormat,
}

impl LogSettings {
    /// `info` selects structured JSON output; any other level selects
    /// human-readable output, at debug when the level does not parse.
    pub fn from_level(level: &str) -> Self {
        if level.eq_ignore_ascii_case(DEFAULT_LOG_LEVEL) {
            return Self {
                level: Level::INFO,
                format: LogFormat::Json,
            };
        }
        Self {
            level: Level::from_str(level).unwrap_or(Level::DEBUG),
            format: LogFormat::Pretty,
        }
    }

    pub fn from_env() -> Self {
        let level = std::env::var(LOG_LEVEL_ENV).unwrap_or_else(|_| DEFAULT_LOG_LEVEL.to_string());
        Self::from_level(&level)
    }

    fn filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{},{QUIET_DIRECTIVES}",
                self.level.as_str().to_lowercase()
            ))
        })
    }

    /// Installs the global subscriber. Returns false when one is already set,
    /// which is expected when several tests share a process.
    pub fn init(&self) -> bool {
        let registry = tracing_subscriber::registry().with(self.filter());
        match self.format {
            LogFormat::Json => registry.with(fmt::layer().json()).try_init().is_ok(),
            LogFormat::Pretty => registry
                .with(fmt::layer().with_target(true).with_test_writer())
                .try_init()
                .is_ok(),
        }
    }
}

pub fn init_from_env() -> bool {
    LogSettings::from_env().init()
}
