use std::time::Duration;

use clap::Args;

use crate::error::{Error, Result};

/// Trace generation scenario.
///
/// Doubles as the flag set of the `tracegen` binary.
#[derive(Debug, Clone, Args)]
pub struct Config {
    /// Number of concurrent workers
    #[arg(long, default_value_t = 1)]
    pub workers: usize,

    /// Traces per worker (ignored when --duration is set)
    #[arg(long, default_value_t = 1)]
    pub traces: usize,

    /// Round-trip the parent context through a text-map carrier
    #[arg(long)]
    pub marshal: bool,

    /// Mark spans with a sampling priority
    #[arg(long)]
    pub debug: bool,

    /// Mark spans as firehose
    #[arg(long)]
    pub firehose: bool,

    /// Pause between traces
    #[arg(long, value_parser = humantime::parse_duration, default_value = "0s")]
    pub pause: Duration,

    /// Run for this long instead of a fixed trace count
    #[arg(long, value_parser = humantime::parse_duration, default_value = "0s")]
    pub duration: Duration,

    /// Service name reported on every span
    #[arg(long, default_value = "tracegen")]
    pub service: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            workers: 1,
            traces: 1,
            marshal: false,
            debug: false,
            firehose: false,
            pause: Duration::ZERO,
            duration: Duration::ZERO,
            service: "tracegen".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    Traces(usize),
    Duration(Duration),
}

impl Config {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    #[must_use]
    pub fn traces(mut self, traces: usize) -> Self {
        self.traces = traces;
        self
    }

    #[must_use]
    pub fn duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    #[must_use]
    pub fn pause(mut self, pause: Duration) -> Self {
        self.pause = pause;
        self
    }

    #[must_use]
    pub fn marshal(mut self, marshal: bool) -> Self {
        self.marshal = marshal;
        self
    }

    #[must_use]
    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    #[must_use]
    pub fn firehose(mut self, firehose: bool) -> Self {
        self.firehose = firehose;
        self
    }

    /// A non-zero duration wins over the trace count.
    pub fn mode(&self) -> Result<RunMode> {
        if !self.duration.is_zero() {
            Ok(RunMode::Duration(self.duration))
        } else if self.traces == 0 {
            Err(Error::InvalidConfig(
                "either `traces` or `duration` must be greater than 0".to_string(),
            ))
        } else {
            Ok(RunMode::Traces(self.traces))
        }
    }
}
