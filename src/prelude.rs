pub use crate::error::{Error, Result};
pub use crate::logging::LogSettings;
pub use crate::metrics::{
    EXPORTER_SENT_SPANS, MetricFamily, MetricsScraper, MetricsSnapshot, RECEIVER_ACCEPTED_SPANS,
};
pub use crate::process::{
    CollectorConfig, CollectorProcess, CollectorProcessBuilder, create_temp_file, find_free_port,
};
pub use crate::settings::Settings;
pub use crate::suite::{Suite, SuiteReport, SuiteTest, run_suite};
pub use crate::tracegen::{
    Config as TracegenConfig, ExporterConfig, RunStats, SPANS_PER_TRACE, TraceClient,
    create_traces, create_traces_with, unique_service_name,
};
