pub mod client;
pub mod config;
mod worker;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use opentelemetry_sdk::trace::Tracer;
use tokio::task::JoinSet;
use tracing::{Instrument, info, info_span, warn};
use uuid::Uuid;

use crate::error::Result;

pub use client::{ExportProtocol, ExporterConfig, TraceClient};
pub use config::{Config, RunMode};
pub use worker::{CHILD_SPAN_NAME, ROOT_SPAN_NAME, SPANS_PER_TRACE};

pub const TRACER_NAME: &str = "tracegen";

/// How long to wait after flushing so the collector's own counters catch up.
pub const FLUSH_GRACE: Duration = Duration::from_millis(1500);

#[derive(Debug, Default, Clone)]
pub struct RunStats {
    pub traces: usize,
    pub spans: usize,
    pub elapsed: Duration,
    pub per_worker: Vec<usize>,
}

impl RunStats {
    pub fn traces_per_second(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.traces as f64 / secs
        } else {
            0.0
        }
    }
}

pub fn unique_service_name(prefix: &str) -> String {
    format!("{prefix}-{}", Uuid::new_v4().simple())
}

/// Fans out `config.workers` identical workers and waits for all of them.
pub async fn run(config: &Config, tracer: &Tracer) -> Result<RunStats> {
    let mode = config.mode()?;
    let limit = match mode {
        RunMode::Traces(traces) => Some(traces),
        RunMode::Duration(_) => None,
    };

    if config.workers == 0 {
        warn!("no workers configured, nothing to generate");
    }

    let running = Arc::new(AtomicBool::new(true));
    let start = Instant::now();
    let mut workers = JoinSet::new();

    for id in 0..config.workers {
        let worker = worker::Worker {
            id,
            limit,
            marshal: config.marshal,
            debug: config.debug,
            firehose: config.firehose,
            pause: config.pause,
            running: Arc::clone(&running),
            tracer: tracer.clone(),
        };
        workers.spawn(
            async move { (id, worker.simulate_traces().await) }
                .instrument(info_span!("worker", id)),
        );
    }

    if let RunMode::Duration(duration) = mode {
        tokio::time::sleep(duration).await;
        running.store(false, Ordering::Release);
    }

    let mut per_worker = vec![0; config.workers];
    while let Some(joined) = workers.join_next().await {
        let (id, traces) = joined?;
        per_worker[id] = traces;
    }

    let traces = per_worker.iter().sum();
    let stats = RunStats {
        traces,
        spans: traces * SPANS_PER_TRACE,
        elapsed: start.elapsed(),
        per_worker,
    };
    info!(
        traces = stats.traces,
        spans = stats.spans,
        elapsed = ?stats.elapsed,
        "trace generation finished"
    );
    Ok(stats)
}

/// Generates traces against the endpoint described by the `OTEL_EXPORTER_OTLP_*`
/// environment.
pub async fn create_traces(
    workers: usize,
    traces: usize,
    duration: Duration,
    service_name: &str,
) -> Result<RunStats> {
    let config = Config::new(service_name)
        .workers(workers)
        .traces(traces)
        .duration(duration);
    create_traces_with(&ExporterConfig::from_env(), &config).await
}

pub async fn create_traces_with(exporter: &ExporterConfig, config: &Config) -> Result<RunStats> {
    let client = TraceClient::with_exporter_config(exporter, &config.service)?;
    let tracer = client.tracer(TRACER_NAME);
    info!(service = %config.service, "initialized tracer");

    let stats = run(config, &tracer).await;
    let shutdown = client.shutdown();
    let stats = stats?;
    shutdown?;

    info!(grace = ?FLUSH_GRACE, "waiting for metrics to flush");
    tokio::time::sleep(FLUSH_GRACE).await;
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use opentelemetry::trace::{SpanKind, TracerProvider};
    use opentelemetry_sdk::trace::{InMemorySpanExporter, SdkTracerProvider, SpanData};

    use super::*;
    use crate::error::Error;

    fn in_memory() -> (SdkTracerProvider, InMemorySpanExporter) {
        let exporter = InMemorySpanExporter::default();
        let provider = SdkTracerProvider::builder()
            .with_simple_exporter(exporter.clone())
            .build();
        (provider, exporter)
    }

    fn has_attribute(span: &SpanData, key: &str) -> bool {
        span.attributes.iter().any(|kv| kv.key.as_str() == key)
    }

    #[tokio::test]
    async fn fixed_count_emits_two_spans_per_trace() {
        let (provider, exporter) = in_memory();
        let tracer = provider.tracer("test");

        let config = Config::new("svc").workers(3).traces(4);
        let stats = run(&config, &tracer).await.unwrap();

        assert_eq!(stats.traces, 12);
        assert_eq!(stats.spans, 24);
        assert_eq!(stats.per_worker, vec![4, 4, 4]);

        let spans = exporter.get_finished_spans().unwrap();
        assert_eq!(spans.len(), 24);

        let roots: Vec<_> = spans.iter().filter(|s| s.name == ROOT_SPAN_NAME).collect();
        let children: Vec<_> = spans.iter().filter(|s| s.name == CHILD_SPAN_NAME).collect();
        assert_eq!(roots.len(), 12);
        assert_eq!(children.len(), 12);

        for child in &children {
            assert_eq!(child.span_kind, SpanKind::Server);
            let parent = roots
                .iter()
                .find(|r| r.span_context.span_id() == child.parent_span_id)
                .expect("child span without root parent");
            assert_eq!(
                parent.span_context.trace_id(),
                child.span_context.trace_id()
            );
        }
    }

    #[tokio::test]
    async fn marshalled_context_keeps_parent_link() {
        let (provider, exporter) = in_memory();
        let tracer = provider.tracer("test");

        let config = Config::new("svc").traces(2).marshal(true);
        run(&config, &tracer).await.unwrap();

        let spans = exporter.get_finished_spans().unwrap();
        let root = spans.iter().find(|s| s.name == ROOT_SPAN_NAME).unwrap();
        let linked = spans
            .iter()
            .filter(|s| s.name == CHILD_SPAN_NAME)
            .any(|c| c.parent_span_id == root.span_context.span_id());
        assert!(linked, "no child span points at the root span");
    }

    #[tokio::test]
    async fn debug_and_firehose_tag_spans() {
        let (provider, exporter) = in_memory();
        let tracer = provider.tracer("test");

        let config = Config::new("svc").debug(true).firehose(true);
        run(&config, &tracer).await.unwrap();

        let spans = exporter.get_finished_spans().unwrap();
        assert_eq!(spans.len(), SPANS_PER_TRACE);
        for span in &spans {
            assert!(has_attribute(span, "sampling.priority"));
            assert!(has_attribute(span, "jaeger.firehose"));
            assert!(has_attribute(span, "peer.service"));
        }
    }

    #[tokio::test]
    async fn plain_spans_carry_no_debug_tags() {
        let (provider, exporter) = in_memory();
        let tracer = provider.tracer("test");

        run(&Config::new("svc"), &tracer).await.unwrap();

        let spans = exporter.get_finished_spans().unwrap();
        assert!(spans.iter().all(|s| !has_attribute(s, "sampling.priority")));
        assert!(spans.iter().all(|s| has_attribute(s, "peer.ipv4")));
    }

    #[tokio::test]
    async fn duration_mode_stops_all_workers() {
        let (provider, exporter) = in_memory();
        let tracer = provider.tracer("test");

        let config = Config::new("svc")
            .workers(2)
            .traces(1)
            .duration(Duration::from_millis(50))
            .pause(Duration::from_millis(1));
        let stats = run(&config, &tracer).await.unwrap();

        assert!(stats.elapsed >= Duration::from_millis(50));
        assert_eq!(stats.per_worker.len(), 2);
        assert!(stats.per_worker.iter().all(|&n| n >= 1));
        // the trace count is ignored once a duration is set
        assert!(stats.traces > 1);
        assert_eq!(
            exporter.get_finished_spans().unwrap().len(),
            stats.traces * SPANS_PER_TRACE
        );
    }

    #[tokio::test]
    async fn invalid_config_spawns_nothing() {
        let (provider, exporter) = in_memory();
        let tracer = provider.tracer("test");

        let err = run(&Config::new("svc").traces(0), &tracer)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));
        assert!(exporter.get_finished_spans().unwrap().is_empty());
    }

    #[tokio::test]
    async fn zero_workers_is_a_no_op() {
        let (provider, _exporter) = in_memory();
        let tracer = provider.tracer("test");

        let stats = run(&Config::new("svc").workers(0).traces(5), &tracer)
            .await
            .unwrap();
        assert_eq!(stats.traces, 0);
        assert!(stats.per_worker.is_empty());
    }

    #[test]
    fn unique_service_names_differ() {
        let a = unique_service_name("collector-sanity-test");
        let b = unique_service_name("collector-sanity-test");
        assert!(a.starts_with("collector-sanity-test-"));
        assert_ne!(a, b);
    }
}
