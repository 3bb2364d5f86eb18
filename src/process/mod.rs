pub mod config;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use tempfile::NamedTempFile;
use tokio::process::{Child, Command};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};

pub use config::{CollectorConfig, CollectorConfigBuilder};

const TEMP_FILE_PREFIX: &str = "jaeger-otel-test-";
const DEFAULT_METRICS_HOST: &str = "localhost";

pub fn find_free_port() -> Result<u16> {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").map_err(Error::PortAllocation)?;
    Ok(listener.local_addr()?.port())
}

pub fn create_temp_file() -> Result<NamedTempFile> {
    Ok(tempfile::Builder::new()
        .prefix(TEMP_FILE_PREFIX)
        .tempfile()?)
}

pub struct CollectorProcessBuilder {
    executable: PathBuf,
    config_path: PathBuf,
    metrics_host: String,
    metrics_port: Option<u16>,
    args: Vec<String>,
    env_vars: HashMap<String, String>,
}

impl CollectorProcessBuilder {
    pub fn new(executable: impl AsRef<Path>, config_path: impl AsRef<Path>) -> Self {
        Self {
            executable: executable.as_ref().to_path_buf(),
            config_path: config_path.as_ref().to_path_buf(),
            metrics_host: DEFAULT_METRICS_HOST.to_string(),
            metrics_port: None,
            args: Vec::new(),
            env_vars: HashMap::new(),
        }
    }

    #[must_use]
    pub fn metrics_host(mut self, host: impl Into<String>) -> Self {
        self.metrics_host = host.into();
        self
    }

    /// Distinct ports keep several collectors from colliding on one host.
    #[must_use]
    pub fn metrics_port(mut self, port: u16) -> Self {
        self.metrics_port = Some(port);
        self
    }

    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    #[must_use]
    pub fn env_var(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env_vars.insert(key.into(), value.into());
        self
    }

    pub async fn start(self) -> Result<CollectorProcess> {
        let metrics_port = match self.metrics_port {
            Some(port) => port,
            None => find_free_port()?,
        };
        let metrics_addr = format!("{}:{}", self.metrics_host, metrics_port);

        let log = create_temp_file()?;
        let stderr = log.reopen()?;
        debug!(log = %log.path().display(), "capturing collector stderr");

        let child = Command::new(&self.executable)
            .arg("--config")
            .arg(&self.config_path)
            .arg("--metrics-addr")
            .arg(&metrics_addr)
            .args(&self.args)
            .envs(&self.env_vars)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::from(stderr))
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| Error::ProcessStart {
                executable: self.executable.clone(),
                source,
            })?;

        info!(
            pid = child.id(),
            executable = %self.executable.display(),
            metrics_addr = %metrics_addr,
            "started process"
        );

        Ok(CollectorProcess {
            pid: child.id(),
            child,
            metrics_host: self.metrics_host,
            metrics_port,
            log: Some(log),
        })
    }
}

/// A collector running in the background.
///
/// The process is killed when the handle is dropped. Its stderr log is only
/// removed by [`CollectorProcess::stop`], which a test calls once it has
/// passed; a handle dropped any other way (an early `?` return, a panic)
/// keeps the log on disk and reports where it is.
pub struct CollectorProcess {
    child: Child,
    pid: Option<u32>,
    metrics_host: String,
    metrics_port: u16,
    log: Option<NamedTempFile>,
}

impl CollectorProcess {
    pub fn builder(
        executable: impl AsRef<Path>,
        config_path: impl AsRef<Path>,
    ) -> CollectorProcessBuilder {
        CollectorProcessBuilder::new(executable, config_path)
    }

    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    pub fn metrics_port(&self) -> u16 {
        self.metrics_port
    }

    pub fn metrics_endpoint(&self) -> String {
        format!("http://{}:{}/metrics", self.metrics_host, self.metrics_port)
    }

    pub fn log_path(&self) -> Option<&Path> {
        self.log.as_ref().map(NamedTempFile::path)
    }

    pub async fn read_log(&self) -> Result<String> {
        match self.log_path() {
            Some(path) => Ok(tokio::fs::read_to_string(path).await?),
            None => Ok(String::new()),
        }
    }

    pub fn is_running(&mut self) -> Result<bool> {
        Ok(self.child.try_wait()?.is_none())
    }

    /// Kills the process and removes its log.
    pub async fn stop(mut self) -> Result<()> {
        if self.child.try_wait()?.is_none() {
            self.child.start_kill()?;
        }
        let status = self.child.wait().await?;
        info!(pid = self.pid, %status, "stopped process");

        if let Some(log) = self.log.take() {
            log.close()?;
        }
        Ok(())
    }
}

impl Drop for CollectorProcess {
    fn drop(&mut self) {
        if let Some(log) = self.log.take() {
            match log.keep() {
                Ok((_, path)) => warn!(log = %path.display(), "keeping collector log"),
                Err(e) => warn!(error = %e, "failed to keep collector log"),
            }
        }
    }
}
