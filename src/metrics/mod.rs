pub mod family;

use std::time::Duration;

use reqwest::Client;
use tokio::time::{Instant, sleep};
use tracing::{debug, instrument};

use crate::error::{Error, Result};

pub use family::{
    Bucket, MetricFamily, MetricSample, MetricValue, MetricsSnapshot, Quantile, parse_exposition,
};

pub const RECEIVER_ACCEPTED_SPANS: &str = "otelcol_receiver_accepted_spans";
pub const EXPORTER_SENT_SPANS: &str = "otelcol_exporter_sent_spans";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);
const POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Reads a Prometheus text endpoint such as the collector's `/metrics`.
#[derive(Debug, Clone)]
pub struct MetricsScraper {
    client: Client,
    endpoint: String,
}

impl MetricsScraper {
    pub fn new(endpoint: impl Into<String>) -> Result<Self> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub async fn fetch_text(&self) -> Result<String> {
        let response = self.client.get(&self.endpoint).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::MetricsStatus {
                endpoint: self.endpoint.clone(),
                status,
            });
        }
        Ok(response.text().await?)
    }

    pub async fn fetch(&self) -> Result<MetricsSnapshot> {
        let text = self.fetch_text().await?;
        let snapshot = parse_exposition(&text)?;
        debug!(endpoint = %self.endpoint, families = snapshot.len(), "scraped metrics");
        Ok(snapshot)
    }

    pub async fn metric(&self, name: &str) -> Result<MetricFamily> {
        self.fetch().await?.metric(name).cloned()
    }

    pub async fn counter(&self, name: &str) -> Result<f64> {
        self.fetch().await?.counter(name)
    }

    pub async fn counter_sum(&self, name: &str) -> Result<f64> {
        self.fetch().await?.counter_sum(name)
    }

    #[instrument(skip(self), fields(endpoint = %self.endpoint))]
    pub async fn wait_until_ready(&self, timeout: Duration) -> Result<()> {
        let deadline = Instant::now() + timeout;
        loop {
            match self.fetch_text().await {
                Ok(_) => return Ok(()),
                Err(e) if Instant::now() >= deadline => {
                    debug!(error = %e, "metrics endpoint never came up");
                    return Err(Error::Timeout {
                        what: format!("metrics endpoint {}", self.endpoint),
                        timeout,
                    });
                }
                Err(e) => debug!(error = %e, "metrics endpoint not ready"),
            }
            sleep(POLL_INTERVAL).await;
        }
    }

    /// Polls until the counter, summed across its series, reaches `expected`.
    /// Returns the last observed value, which may exceed `expected`.
    #[instrument(skip(self), fields(endpoint = %self.endpoint))]
    pub async fn wait_for_counter(
        &self,
        name: &str,
        expected: f64,
        timeout: Duration,
    ) -> Result<f64> {
        let deadline = Instant::now() + timeout;
        loop {
            match self.counter_sum(name).await {
                Ok(value) if value >= expected => return Ok(value),
                Ok(value) => debug!(value, "counter below expectation"),
                Err(Error::MetricNotFound(_)) => debug!("counter not exposed yet"),
                Err(e) => return Err(e),
            }
            if Instant::now() >= deadline {
                return Err(Error::Timeout {
                    what: format!("{name} >= {expected}"),
                    timeout,
                });
            }
            sleep(POLL_INTERVAL).await;
        }
    }
}
