mod common;

use std::time::Duration;

use async_trait::async_trait;
use jaeger_otelcol_e2e::prelude::*;
use tracing::info;

const TRACE_COUNT: usize = 5;
const AGENT_METRICS_PORT: u16 = 8888;
const AGENT_OTLP_ENDPOINT: &str = "http://localhost:4318/v1/traces";
const METRICS_TIMEOUT: Duration = Duration::from_secs(15);

struct AgentSanitySuite {
    settings: Settings,
}

#[async_trait]
impl Suite for AgentSanitySuite {
    fn name(&self) -> &str {
        "AgentSanitySuite"
    }

    async fn setup_suite(&mut self) -> Result<()> {
        LogSettings::from_level(&self.settings.log_level).init();
        Ok(())
    }

    async fn teardown_suite(&mut self) -> Result<()> {
        info!("in teardown suite");
        Ok(())
    }

    async fn before_test(&mut self, test_name: &str) -> Result<()> {
        info!(test = test_name, "in before test");
        Ok(())
    }

    async fn after_test(&mut self, test_name: &str) -> Result<()> {
        info!(test = test_name, "in after test");
        Ok(())
    }
}

async fn agent_sanity(suite: &mut AgentSanitySuite) -> Result<()> {
    let agent = CollectorProcess::builder(
        &suite.settings.agent_binary,
        common::config_path("agent.yaml"),
    )
    .metrics_port(AGENT_METRICS_PORT)
    .start()
    .await?;

    let scraper = MetricsScraper::new(agent.metrics_endpoint())?;
    scraper.wait_until_ready(METRICS_TIMEOUT).await?;

    let expected_spans = SPANS_PER_TRACE * TRACE_COUNT;
    let tracegen = TracegenConfig::new(unique_service_name("agent-sanity-test"))
        .workers(1)
        .traces(TRACE_COUNT);
    create_traces_with(&ExporterConfig::http(AGENT_OTLP_ENDPOINT), &tracegen).await?;

    if suite.settings.is_debug() {
        print!("{}", agent.read_log().await?);
    }

    let received = scraper
        .wait_for_counter(RECEIVER_ACCEPTED_SPANS, expected_spans as f64, METRICS_TIMEOUT)
        .await?;
    let sent = scraper
        .wait_for_counter(EXPORTER_SENT_SPANS, expected_spans as f64, METRICS_TIMEOUT)
        .await?;
    assert_eq!(expected_spans.to_string(), received.to_string());
    assert_eq!(expected_spans.to_string(), sent.to_string());

    agent.stop().await
}

#[tokio::test(flavor = "multi_thread")]
#[ignore = "needs a built agent; set AGENT_BINARY"]
async fn test_agent_sanity_suite() {
    let suite = AgentSanitySuite {
        settings: Settings::from_env(),
    };
    let tests = vec![SuiteTest::new("agent_sanity", |s| Box::pin(agent_sanity(s)))];

    run_suite(suite, tests)
        .await
        .expect("suite lifecycle failed")
        .into_result()
        .expect("agent sanity failed");
}
