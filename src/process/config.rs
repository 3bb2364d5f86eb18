use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};
use tempfile::NamedTempFile;

use super::create_temp_file;
use crate::error::{Error, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectorConfig {
    #[serde(default)]
    pub receivers: Value,
    #[serde(default)]
    pub processors: Value,
    #[serde(default)]
    pub exporters: Value,
    #[serde(default)]
    pub extensions: Value,
    pub service: Value,
}

impl CollectorConfig {
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_yaml_str(&content)
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(|e| Error::Config(e.to_string()))
    }

    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(|e| Error::Config(e.to_string()))
    }

    pub fn builder() -> CollectorConfigBuilder {
        CollectorConfigBuilder::new()
    }

    /// The returned file is deleted when dropped, so keep it alive for as long
    /// as the collector runs.
    pub fn write_temp_file(&self) -> Result<NamedTempFile> {
        let mut file = create_temp_file()?;
        file.write_all(self.to_yaml()?.as_bytes())?;
        file.flush()?;
        Ok(file)
    }

    pub fn pipeline_exporters(&self, pipeline: &str) -> Vec<String> {
        self.service
            .get("pipelines")
            .and_then(|p| p.get(pipeline))
            .and_then(|p| p.get("exporters"))
            .and_then(Value::as_sequence)
            .map(|seq| {
                seq.iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct OtlpExporterConfig {
    endpoint: String,
    tls: TlsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct TlsConfig {
    insecure: bool,
}

fn key(s: &str) -> Value {
    Value::String(s.to_string())
}

fn endpoint_mapping(endpoint: &str) -> Value {
    let mut mapping = Mapping::new();
    mapping.insert(key("endpoint"), key(endpoint));
    Value::Mapping(mapping)
}

#[derive(Debug, Default)]
pub struct CollectorConfigBuilder {
    otlp_grpc_endpoint: Option<String>,
    otlp_http_endpoint: Option<String>,
    batch_processor: bool,
    debug_exporter: bool,
    otlp_exporters: Vec<(String, String)>,
}

impl CollectorConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_otlp_grpc_receiver(mut self, endpoint: impl Into<String>) -> Self {
        self.otlp_grpc_endpoint = Some(endpoint.into());
        self
    }

    pub fn with_otlp_http_receiver(mut self, endpoint: impl Into<String>) -> Self {
        self.otlp_http_endpoint = Some(endpoint.into());
        self
    }

    pub fn with_batch_processor(mut self) -> Self {
        self.batch_processor = true;
        self
    }

    pub fn with_debug_exporter(mut self) -> Self {
        self.debug_exporter = true;
        self
    }

    /// Forwards traces to another collector, the way an agent does.
    pub fn with_otlp_exporter(mut self, name: &str, endpoint: impl Into<String>) -> Self {
        self.otlp_exporters
            .push((format!("otlp/{name}"), endpoint.into()));
        self
    }

    pub fn build(self) -> Result<CollectorConfig> {
        let mut receivers = Mapping::new();
        let mut processors = Mapping::new();
        let mut exporters = Mapping::new();

        if self.otlp_grpc_endpoint.is_none() && self.otlp_http_endpoint.is_none() {
            return Err(Error::Config("at least one OTLP receiver is required".to_string()));
        }

        let mut protocols = Mapping::new();
        if let Some(endpoint) = &self.otlp_grpc_endpoint {
            protocols.insert(key("grpc"), endpoint_mapping(endpoint));
        }
        if let Some(endpoint) = &self.otlp_http_endpoint {
            protocols.insert(key("http"), endpoint_mapping(endpoint));
        }
        let mut otlp = Mapping::new();
        otlp.insert(key("protocols"), Value::Mapping(protocols));
        receivers.insert(key("otlp"), Value::Mapping(otlp));

        if self.batch_processor {
            processors.insert(key("batch"), Value::Mapping(Mapping::new()));
        }

        if self.debug_exporter {
            let mut debug = Mapping::new();
            debug.insert(key("verbosity"), key("basic"));
            exporters.insert(key("debug"), Value::Mapping(debug));
        }

        for (name, endpoint) in &self.otlp_exporters {
            let config = serde_yaml::to_value(OtlpExporterConfig {
                endpoint: endpoint.clone(),
                tls: TlsConfig { insecure: true },
            })
            .map_err(|e| Error::Config(e.to_string()))?;
            exporters.insert(key(name), config);
        }

        if exporters.is_empty() {
            return Err(Error::Config("at least one exporter is required".to_string()));
        }

        let processor_list: Vec<Value> = processors.keys().cloned().collect();
        let exporter_list: Vec<Value> = exporters.keys().cloned().collect();

        let mut traces = Mapping::new();
        traces.insert(key("receivers"), Value::Sequence(vec![key("otlp")]));
        traces.insert(key("processors"), Value::Sequence(processor_list));
        traces.insert(key("exporters"), Value::Sequence(exporter_list));

        let mut pipelines = Mapping::new();
        pipelines.insert(key("traces"), Value::Mapping(traces));
        let mut service = Mapping::new();
        service.insert(key("pipelines"), Value::Mapping(pipelines));

        Ok(CollectorConfig {
            receivers: Value::Mapping(receivers),
            processors: Value::Mapping(processors),
            exporters: Value::Mapping(exporters),
            extensions: Value::Mapping(Mapping::new()),
            service: Value::Mapping(service),
        })
    }
}
