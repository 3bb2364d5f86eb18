use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use tracing::{debug, error, info};

use crate::error::{Error, Result};

/// Lifecycle hooks around a group of end-to-end tests.
#[async_trait]
pub trait Suite: Send {
    fn name(&self) -> &str;

    async fn setup_suite(&mut self) -> Result<()> {
        debug!(suite = self.name(), "in setup suite");
        Ok(())
    }

    async fn teardown_suite(&mut self) -> Result<()> {
        debug!(suite = self.name(), "in teardown suite");
        Ok(())
    }

    async fn before_test(&mut self, test_name: &str) -> Result<()> {
        debug!(suite = self.name(), test = test_name, "in before test");
        Ok(())
    }

    async fn after_test(&mut self, test_name: &str) -> Result<()> {
        debug!(suite = self.name(), test = test_name, "in after test");
        Ok(())
    }
}

type TestBody<S> = Box<dyn for<'a> FnOnce(&'a mut S) -> BoxFuture<'a, Result<()>> + Send>;

pub struct SuiteTest<S> {
    name: String,
    body: TestBody<S>,
}

impl<S> SuiteTest<S> {
    pub fn new<F>(name: impl Into<String>, body: F) -> Self
    where
        F: for<'a> FnOnce(&'a mut S) -> BoxFuture<'a, Result<()>> + Send + 'static,
    {
        Self {
            name: name.into(),
            body: Box::new(body),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TestOutcome {
    Passed,
    Failed(String),
}

#[derive(Debug, Clone)]
pub struct TestResult {
    pub name: String,
    pub outcome: TestOutcome,
    pub duration: Duration,
}

impl TestResult {
    pub fn passed(&self) -> bool {
        self.outcome == TestOutcome::Passed
    }
}

#[derive(Debug, Clone)]
pub struct SuiteReport {
    pub suite: String,
    pub results: Vec<TestResult>,
}

impl SuiteReport {
    pub fn is_success(&self) -> bool {
        self.results.iter().all(TestResult::passed)
    }

    pub fn failed(&self) -> impl Iterator<Item = &TestResult> {
        self.results.iter().filter(|r| !r.passed())
    }

    pub fn into_result(self) -> Result<Self> {
        if self.is_success() {
            return Ok(self);
        }
        let failed = self
            .failed()
            .map(|r| match &r.outcome {
                TestOutcome::Failed(reason) => format!("{} ({reason})", r.name),
                TestOutcome::Passed => r.name.clone(),
            })
            .collect();
        Err(Error::SuiteFailed {
            suite: self.suite,
            failed,
        })
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("panicked: {s}")
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("panicked: {s}")
    } else {
        "panicked".to_string()
    }
}

/// Runs every test between the before/after hooks, inside one
/// setup/teardown pair.
///
/// A failing or panicking test does not stop the suite, and the after hook
/// and teardown run regardless. Setup and teardown errors are returned as
/// errors; test failures are recorded in the report.
pub async fn run_suite<S: Suite>(mut suite: S, tests: Vec<SuiteTest<S>>) -> Result<SuiteReport> {
    let suite_name = suite.name().to_string();
    info!(suite = %suite_name, tests = tests.len(), "running suite");

    if let Err(e) = suite.setup_suite().await {
        error!(suite = %suite_name, error = %e, "setup suite failed");
        if let Err(teardown) = suite.teardown_suite().await {
            error!(suite = %suite_name, error = %teardown, "teardown suite failed");
        }
        return Err(e);
    }

    let mut results = Vec::with_capacity(tests.len());
    for SuiteTest { name, body } in tests {
        let start = Instant::now();

        let mut outcome = match suite.before_test(&name).await {
            Err(e) => TestOutcome::Failed(format!("before test: {e}")),
            Ok(()) => match AssertUnwindSafe(body(&mut suite)).catch_unwind().await {
                Ok(Ok(())) => TestOutcome::Passed,
                Ok(Err(e)) => TestOutcome::Failed(e.to_string()),
                Err(payload) => TestOutcome::Failed(panic_message(payload)),
            },
        };

        if let Err(e) = suite.after_test(&name).await
            && outcome == TestOutcome::Passed
        {
            outcome = TestOutcome::Failed(format!("after test: {e}"));
        }

        let duration = start.elapsed();
        match &outcome {
            TestOutcome::Passed => info!(suite = %suite_name, test = %name, ?duration, "test passed"),
            TestOutcome::Failed(reason) => {
                error!(suite = %suite_name, test = %name, ?duration, %reason, "test failed")
            }
        }
        results.push(TestResult {
            name,
            outcome,
            duration,
        });
    }

    suite.teardown_suite().await?;

    Ok(SuiteReport {
        suite: suite_name,
        results,
    })
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;

    struct Recording {
        events: Arc<Mutex<Vec<String>>>,
        fail_setup: bool,
    }

    impl Recording {
        fn new(events: &Arc<Mutex<Vec<String>>>) -> Self {
            Self {
                events: Arc::clone(events),
                fail_setup: false,
            }
        }

        fn record(&self, event: impl Into<String>) {
            self.events.lock().unwrap().push(event.into());
        }
    }

    #[async_trait]
    impl Suite for Recording {
        fn name(&self) -> &str {
            "recording"
        }

        async fn setup_suite(&mut self) -> Result<()> {
            self.record("setup");
            if self.fail_setup {
                return Err(Error::Other("no collector".to_string()));
            }
            Ok(())
        }

        async fn teardown_suite(&mut self) -> Result<()> {
            self.record("teardown");
            Ok(())
        }

        async fn before_test(&mut self, test_name: &str) -> Result<()> {
            self.record(format!("before {test_name}"));
            Ok(())
        }

        async fn after_test(&mut self, test_name: &str) -> Result<()> {
            self.record(format!("after {test_name}"));
            Ok(())
        }
    }

    fn events(events: &Arc<Mutex<Vec<String>>>) -> Vec<String> {
        events.lock().unwrap().clone()
    }

    async fn first(s: &mut Recording) -> Result<()> {
        s.record("body first");
        Ok(())
    }

    async fn second(s: &mut Recording) -> Result<()> {
        s.record("body second");
        Ok(())
    }

    async fn errors(_: &mut Recording) -> Result<()> {
        Err(Error::Other("counter mismatch".to_string()))
    }

    async fn panics(_: &mut Recording) -> Result<()> {
        panic!("expected 10 spans")
    }

    async fn passes(_: &mut Recording) -> Result<()> {
        Ok(())
    }

    #[tokio::test]
    async fn hooks_wrap_every_test_in_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let tests = vec![
            SuiteTest::new("first", |s| Box::pin(first(s))),
            SuiteTest::new("second", |s| Box::pin(second(s))),
        ];

        let report = run_suite(Recording::new(&log), tests).await.unwrap();

        assert!(report.is_success());
        assert_eq!(
            events(&log),
            vec![
                "setup",
                "before first",
                "body first",
                "after first",
                "before second",
                "body second",
                "after second",
                "teardown",
            ]
        );
    }

    #[tokio::test]
    async fn failures_and_panics_are_recorded_and_hooks_still_run() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let tests = vec![
            SuiteTest::new("errors", |s| Box::pin(errors(s))),
            SuiteTest::new("panics", |s| Box::pin(panics(s))),
            SuiteTest::new("passes", |s| Box::pin(passes(s))),
        ];

        let report = run_suite(Recording::new(&log), tests).await.unwrap();

        assert!(!report.is_success());
        assert_eq!(report.failed().count(), 2);
        assert_eq!(
            report.results[0].outcome,
            TestOutcome::Failed("counter mismatch".to_string())
        );
        assert_eq!(
            report.results[1].outcome,
            TestOutcome::Failed("panicked: expected 10 spans".to_string())
        );
        assert!(report.results[2].passed());

        let events = events(&log);
        assert!(events.contains(&"after errors".to_string()));
        assert!(events.contains(&"after panics".to_string()));
        assert_eq!(events.last().map(String::as_str), Some("teardown"));

        match report.into_result() {
            Err(Error::SuiteFailed { suite, failed }) => {
                assert_eq!(suite, "recording");
                assert_eq!(failed.len(), 2);
                assert!(failed[0].starts_with("errors"));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[tokio::test]
    async fn failed_setup_skips_tests_but_tears_down() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut suite = Recording::new(&log);
        suite.fail_setup = true;
        let tests = vec![SuiteTest::new("never", |s| Box::pin(first(s)))];

        let err = run_suite(suite, tests).await.unwrap_err();

        assert!(matches!(err, Error::Other(_)));
        assert_eq!(events(&log), vec!["setup", "teardown"]);
    }
}
