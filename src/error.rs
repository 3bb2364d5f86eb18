use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("{0}")]
    Other(String),

    #[error("invalid tracegen configuration: {0}")]
    InvalidConfig(String),

    #[error("collector config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to allocate port: {0}")]
    PortAllocation(std::io::Error),

    #[error("failed to start {}: {source}", executable.display())]
    ProcessStart {
        executable: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("metrics request failed: {0}")]
    MetricsRequest(#[from] reqwest::Error),

    #[error("metrics endpoint {endpoint} returned {status}")]
    MetricsStatus {
        endpoint: String,
        status: reqwest::StatusCode,
    },

    #[error("failed to parse metrics exposition: {0}")]
    MetricsParse(String),

    #[error("metric '{0}' not found")]
    MetricNotFound(String),

    #[error("metric '{name}' is not a {expected}")]
    MetricType { name: String, expected: &'static str },

    #[error("failed to build span exporter: {0}")]
    ExporterBuild(String),

    #[error("failed to flush spans: {0}")]
    Flush(String),

    #[error("failed to shut down tracer provider: {0}")]
    Shutdown(String),

    #[error("timed out after {timeout:?} waiting for {what}")]
    Timeout { what: String, timeout: Duration },

    #[error("worker task failed: {0}")]
    Worker(#[from] tokio::task::JoinError),

    #[error("suite '{suite}' failed: {}", failed.join(", "))]
    SuiteFailed { suite: String, failed: Vec<String> },
}

pub type Result<T> = std::result::Result<T, Error>;
