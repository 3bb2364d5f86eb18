use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, SystemTime};

use opentelemetry::propagation::TextMapPropagator;
use opentelemetry::trace::{Span, SpanKind, TraceContextExt, Tracer as _};
use opentelemetry::{Context, KeyValue};
use opentelemetry_sdk::propagation::TraceContextPropagator;
use opentelemetry_sdk::trace::Tracer;
use tracing::{debug, info, warn};

pub const ROOT_SPAN_NAME: &str = "lets-go";
pub const CHILD_SPAN_NAME: &str = "okey-dokey";
pub const SPANS_PER_TRACE: usize = 2;

// 1.2.3.4
const FAKE_IP: i64 = (1 << 24) | (2 << 16) | (3 << 8) | 4;
const FAKE_SPAN_DURATION: Duration = Duration::from_micros(123);
const DEBUG_SAMPLING_PRIORITY: i64 = 100;

pub(crate) struct Worker {
    pub id: usize,
    pub limit: Option<usize>,
    pub marshal: bool,
    pub debug: bool,
    pub firehose: bool,
    pub pause: Duration,
    pub running: Arc<AtomicBool>,
    pub tracer: Tracer,
}

impl Worker {
    pub async fn simulate_traces(self) -> usize {
        let propagator = TraceContextPropagator::new();
        let mut generated = 0;

        while self.running.load(Ordering::Acquire) {
            self.emit_trace(&propagator);
            generated += 1;

            if self.limit.is_some_and(|limit| generated >= limit) {
                break;
            }

            // Duration-bounded runs must yield or the stop timer never fires
            // on a single-threaded runtime.
            if self.pause.is_zero() {
                tokio::task::yield_now().await;
            } else {
                tokio::time::sleep(self.pause).await;
            }
        }

        info!(worker = self.id, traces = generated, "worker finished");
        generated
    }

    fn emit_trace(&self, propagator: &TraceContextPropagator) {
        let start = SystemTime::now();
        let end = start + FAKE_SPAN_DURATION;

        let root = self
            .tracer
            .span_builder(ROOT_SPAN_NAME)
            .with_kind(SpanKind::Client)
            .with_start_time(start)
            .with_attributes(self.span_attributes("tracegen-server"))
            .start(&self.tracer);
        let root_cx = Context::new().with_span(root);

        let parent_cx = if self.marshal {
            self.round_trip(propagator, &root_cx)
        } else {
            root_cx.clone()
        };

        let mut child = self
            .tracer
            .span_builder(CHILD_SPAN_NAME)
            .with_kind(SpanKind::Server)
            .with_start_time(start)
            .with_attributes(self.span_attributes("tracegen-client"))
            .start_with_context(&self.tracer, &parent_cx);

        child.end_with_timestamp(end);
        root_cx.span().end_with_timestamp(end);
    }

    fn round_trip(&self, propagator: &TraceContextPropagator, cx: &Context) -> Context {
        let mut carrier: HashMap<String, String> = HashMap::new();
        propagator.inject_context(cx, &mut carrier);
        debug!(worker = self.id, ?carrier, "marshalled span context");

        let extracted = propagator.extract(&carrier);
        if extracted.span().span_context().is_valid() {
            extracted
        } else {
            warn!(worker = self.id, "cannot extract span context from carrier");
            cx.clone()
        }
    }

    fn span_attributes(&self, peer_service: &'static str) -> Vec<KeyValue> {
        let mut attributes = vec![
            KeyValue::new("peer.ipv4", FAKE_IP),
            KeyValue::new("peer.service", peer_service),
        ];
        if self.debug {
            attributes.push(KeyValue::new("sampling.priority", DEBUG_SAMPLING_PRIORITY));
        }
        if self.firehose {
            attributes.push(KeyValue::new("jaeger.firehose", true));
        }
        attributes
    }
}
