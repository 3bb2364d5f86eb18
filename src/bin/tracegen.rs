use clap::Parser;
use tracing::{error, info};

use jaeger_otelcol_e2e::Result;
use jaeger_otelcol_e2e::logging::{LogFormat, LogSettings};
use jaeger_otelcol_e2e::tracegen::{self, Config, ExportProtocol, ExporterConfig, TraceClient};

/// Emit synthetic two-span traces to an OTLP endpoint.
#[derive(Parser, Debug)]
#[command(name = "tracegen", version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    config: Config,

    /// OTLP traces endpoint (defaults to the OTEL_EXPORTER_OTLP_* environment)
    #[arg(long)]
    endpoint: Option<String>,

    /// OTLP transport
    #[arg(long, value_enum)]
    protocol: Option<ExportProtocol>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Output logs as JSON
    #[arg(long)]
    log_json: bool,
}

impl Cli {
    fn exporter_config(&self) -> ExporterConfig {
        self.exporter_config_with(|key| std::env::var(key).ok())
    }

    fn exporter_config_with(&self, lookup: impl Fn(&str) -> Option<String>) -> ExporterConfig {
        let mut exporter = ExporterConfig::from_lookup_with_protocol(lookup, self.protocol);
        if let Some(endpoint) = &self.endpoint {
            exporter.endpoint = endpoint.clone();
        }
        exporter
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut log_settings = LogSettings::from_level(&cli.log_level);
    log_settings.format = if cli.log_json {
        LogFormat::Json
    } else {
        LogFormat::Pretty
    };
    log_settings.init();

    let exporter = cli.exporter_config();
    info!(
        endpoint = %exporter.endpoint,
        workers = cli.config.workers,
        traces = cli.config.traces,
        duration = ?cli.config.duration,
        service = %cli.config.service,
        "starting tracegen"
    );

    let client = TraceClient::with_exporter_config(&exporter, &cli.config.service)?;
    let tracer = client.tracer(tracegen::TRACER_NAME);

    let result = tracegen::run(&cli.config, &tracer).await;
    let shutdown = client.shutdown();

    let stats = match result {
        Ok(stats) => stats,
        Err(e) => {
            error!(error = %e, "trace generation failed");
            return Err(e);
        }
    };
    shutdown?;

    info!(
        traces = stats.traces,
        spans = stats.spans,
        traces_per_second = stats.traces_per_second(),
        "done"
    );
    Ok(())
}
