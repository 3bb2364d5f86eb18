use std::time::Duration;

use clap::ValueEnum;
use opentelemetry::trace::TracerProvider;
use opentelemetry_otlp::{SpanExporter, WithExportConfig};
use opentelemetry_sdk::Resource;
use opentelemetry_sdk::trace::{Sampler, SdkTracerProvider, Tracer};
use tracing::debug;

use crate::error::{Error, Result};

pub const TRACES_ENDPOINT_ENV: &str = "OTEL_EXPORTER_OTLP_TRACES_ENDPOINT";
pub const ENDPOINT_ENV: &str = "OTEL_EXPORTER_OTLP_ENDPOINT";
pub const PROTOCOL_ENV: &str = "OTEL_EXPORTER_OTLP_PROTOCOL";

const DEFAULT_EXPORT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ExportProtocol {
    #[value(name = "http/protobuf")]
    HttpBinary,
    #[value(name = "grpc")]
    Grpc,
}

impl ExportProtocol {
    fn default_endpoint(self) -> &'static str {
        match self {
            Self::HttpBinary => "http://localhost:4318/v1/traces",
            Self::Grpc => "http://localhost:4317",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExporterConfig {
    pub endpoint: String,
    pub protocol: ExportProtocol,
    pub timeout: Duration,
}

impl ExporterConfig {
    /// `endpoint` is the full traces URL, e.g. `http://localhost:4318/v1/traces`.
    pub fn http(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            protocol: ExportProtocol::HttpBinary,
            timeout: DEFAULT_EXPORT_TIMEOUT,
        }
    }

    pub fn grpc(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            protocol: ExportProtocol::Grpc,
            timeout: DEFAULT_EXPORT_TIMEOUT,
        }
    }

    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self::from_lookup_with_protocol(lookup, None)
    }

    /// Like [`ExporterConfig::from_lookup`], but `protocol` overrides
    /// `OTEL_EXPORTER_OTLP_PROTOCOL`. The endpoint, when not set explicitly,
    /// follows the chosen protocol.
    pub fn from_lookup_with_protocol(
        lookup: impl Fn(&str) -> Option<String>,
        protocol: Option<ExportProtocol>,
    ) -> Self {
        let protocol = protocol.unwrap_or_else(|| match lookup(PROTOCOL_ENV).as_deref() {
            Some("grpc") => ExportProtocol::Grpc,
            _ => ExportProtocol::HttpBinary,
        });

        let endpoint = lookup(TRACES_ENDPOINT_ENV)
            .or_else(|| {
                lookup(ENDPOINT_ENV).map(|base| match protocol {
                    ExportProtocol::HttpBinary => {
                        format!("{}/v1/traces", base.trim_end_matches('/'))
                    }
                    ExportProtocol::Grpc => base,
                })
            })
            .unwrap_or_else(|| protocol.default_endpoint().to_string());

        Self {
            endpoint,
            protocol,
            timeout: DEFAULT_EXPORT_TIMEOUT,
        }
    }

    fn build_exporter(&self) -> Result<SpanExporter> {
        let exporter = match self.protocol {
            ExportProtocol::HttpBinary => SpanExporter::builder()
                .with_http()
                .with_endpoint(&self.endpoint)
                .with_timeout(self.timeout)
                .build(),
            ExportProtocol::Grpc => SpanExporter::builder()
                .with_tonic()
                .with_endpoint(&self.endpoint)
                .with_timeout(self.timeout)
                .build(),
        };

        exporter.map_err(|e| Error::ExporterBuild(e.to_string()))
    }
}

impl Default for ExporterConfig {
    fn default() -> Self {
        Self::http(ExportProtocol::HttpBinary.default_endpoint())
    }
}

/// Tracer provider that samples every span and batches them to an OTLP endpoint.
pub struct TraceClient {
    provider: SdkTracerProvider,
}

impl TraceClient {
    pub fn new(endpoint: &str, service_name: &str) -> Result<Self> {
        Self::with_exporter_config(&ExporterConfig::http(endpoint), service_name)
    }

    pub fn from_env(service_name: &str) -> Result<Self> {
        Self::with_exporter_config(&ExporterConfig::from_env(), service_name)
    }

    pub fn with_exporter_config(config: &ExporterConfig, service_name: &str) -> Result<Self> {
        let exporter = config.build_exporter()?;
        let resource = Resource::builder()
            .with_service_name(service_name.to_string())
            .build();

        debug!(
            endpoint = %config.endpoint,
            protocol = ?config.protocol,
            service = service_name,
            "built trace client"
        );

        Ok(Self::from_provider(
            SdkTracerProvider::builder()
                .with_resource(resource)
                .with_sampler(Sampler::AlwaysOn)
                .with_batch_exporter(exporter)
                .build(),
        ))
    }

    pub fn from_provider(provider: SdkTracerProvider) -> Self {
        Self { provider }
    }

    pub fn tracer(&self, name: &'static str) -> Tracer {
        self.provider.tracer(name)
    }

    #[must_use = "flush result should be handled"]
    pub fn flush(&self) -> Result<()> {
        self.provider
            .force_flush()
            .map_err(|e| Error::Flush(e.to_string()))
    }

    pub fn shutdown(self) -> Result<()> {
        self.provider
            .shutdown()
            .map_err(|e| Error::Shutdown(e.to_string()))
    }
}
