#![allow(dead_code)]

use std::path::{Path, PathBuf};

use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub fn config_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("common")
        .join("configs")
        .join(name)
}

pub const COLLECTOR_METRICS: &str = r#"# HELP otelcol_receiver_accepted_spans Number of spans successfully pushed into the pipeline.
# TYPE otelcol_receiver_accepted_spans counter
otelcol_receiver_accepted_spans{receiver="otlp",transport="http"} 10
# HELP otelcol_exporter_sent_spans Number of spans successfully sent to destination.
# TYPE otelcol_exporter_sent_spans counter
otelcol_exporter_sent_spans{exporter="debug"} 10
"#;

/// Serves `body` on `GET /metrics` with the given status.
pub async fn metrics_server(status: u16, body: &str) -> MockServer {
    let server = MockServer::start().await;
    mount_metrics(&server, status, body).await;
    server
}

pub async fn mount_metrics(server: &MockServer, status: u16, body: &str) {
    Mock::given(method("GET"))
        .and(path("/metrics"))
        .respond_with(
            ResponseTemplate::new(status)
                .insert_header("content-type", "text/plain; version=0.0.4")
                .set_body_string(body),
        )
        .mount(server)
        .await;
}

pub fn metrics_endpoint(server: &MockServer) -> String {
    format!("{}/metrics", server.uri())
}

/// Shell script standing in for a collector: echoes its arguments to stderr
/// and then idles until killed.
#[cfg(unix)]
pub fn fake_collector(dir: &Path) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join("fake-otelcol");
    std::fs::write(
        &path,
        "#!/bin/sh\necho \"fake collector args: $*\" >&2\nexec sleep 30\n",
    )
    .expect("failed to write fake collector");
    let mut permissions = std::fs::metadata(&path)
        .expect("failed to stat fake collector")
        .permissions();
    permissions.set_mode(0o755);
    std::fs::set_permissions(&path, permissions).expect("failed to chmod fake collector");
    path
}
