use std::path::PathBuf;

use crate::logging::{DEFAULT_LOG_LEVEL, LOG_LEVEL_ENV};

pub const COLLECTOR_BINARY_ENV: &str = "COLLECTOR_BINARY";
pub const AGENT_BINARY_ENV: &str = "AGENT_BINARY";

const DEFAULT_COLLECTOR_BINARY: &str = "builds/collector/jaeger-otel-collector";
const DEFAULT_AGENT_BINARY: &str = "builds/agent/jaeger-otel-agent";

/// Environment-driven knobs for the sanity suites.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub log_level: String,
    pub collector_binary: PathBuf,
    pub agent_binary: PathBuf,
}

impl Settings {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Relative default binary paths resolve against the crate root.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let binary = |key: &str, default: &str| {
            lookup(key).map(PathBuf::from).unwrap_or_else(|| {
                PathBuf::from(env!("CARGO_MANIFEST_DIR")).join(default)
            })
        };

        Self {
            log_level: lookup(LOG_LEVEL_ENV).unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string()),
            collector_binary: binary(COLLECTOR_BINARY_ENV, DEFAULT_COLLECTOR_BINARY),
            agent_binary: binary(AGENT_BINARY_ENV, DEFAULT_AGENT_BINARY),
        }
    }

    pub fn is_debug(&self) -> bool {
        self.log_level.eq_ignore_ascii_case("debug")
    }
}
