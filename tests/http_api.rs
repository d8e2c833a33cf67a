//! End-to-end HTTP tests against a real server and a fake llama-cli script.
#![cfg(unix)]

use medparswell::api::types::{ErrorResponse, HealthResponse, InferResponse, SummarizeResponse};
use medparswell::api::{serve, AppState};
use medparswell::config::{EnabledEndpoints, RunnerConfig};
use medparswell::inference::{LlamaRunner, DRY_RUN_OUTPUT};
use serde_json::json;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;
use tokio::net::TcpListener;

fn write_script(dir: &Path, body: &str) -> PathBuf {
    let path = dir.join("llama-cli");
    std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

struct TestServer {
    base: String,
    client: reqwest::Client,
    _dir: TempDir,
}

impl TestServer {
    /// Start a server whose binary runs `body`; `tweak` adjusts the config first
    async fn start(
        body: &str,
        endpoints: EnabledEndpoints,
        tweak: impl FnOnce(&mut RunnerConfig, &Path),
    ) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let model = dir.path().join("model.gguf");
        std::fs::write(&model, b"GGUF").unwrap();
        let mut config = RunnerConfig::new(write_script(dir.path(), body), model);
        tweak(&mut config, dir.path());

        let dry_run = config.dry_run;
        let state = Arc::new(AppState::new(
            Arc::new(LlamaRunner::new(config)),
            endpoints,
            dry_run,
        ));

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(serve(listener, state, std::future::pending()));

        Self {
            base: format!("http://{}", addr),
            client: reqwest::Client::new(),
            _dir: dir,
        }
    }

    async fn with_script(body: &str) -> Self {
        Self::start(body, EnabledEndpoints::all(), |_, _| {}).await
    }

    async fn post(&self, path: &str, body: serde_json::Value) -> reqwest::Response {
        self.client
            .post(format!("{}{}", self.base, path))
            .json(&body)
            .send()
            .await
            .unwrap()
    }

    async fn get(&self, path: &str) -> reqwest::Response {
        self.client
            .get(format!("{}{}", self.base, path))
            .send()
            .await
            .unwrap()
    }
}

#[tokio::test]
async fn test_root_and_ping() {
    let server = TestServer::with_script("echo unused").await;

    let resp = server.get("/").await;
    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body, json!({"status": "ok", "message": "medparswell API is running."}));

    let body: serde_json::Value = server.get("/ping").await.json().await.unwrap();
    assert_eq!(body["message"], "medparswell is alive");
}

#[tokio::test]
async fn test_health_reports_endpoints() {
    let server = TestServer::with_script("echo unused").await;

    let health: HealthResponse = server.get("/health").await.json().await.unwrap();
    assert_eq!(health.status, "ok");
    assert_eq!(
        health.endpoints,
        vec!["ik_llama.text_summarization", "ik_llama.inference"]
    );
    assert!(!health.dry_run);
}

#[tokio::test]
async fn test_summarize_success() {
    let server = TestServer::with_script("echo '  Paris is the capital of France.  '").await;

    let resp = server
        .post("/summarize", json!({"content": "What is the capital of France?"}))
        .await;
    assert_eq!(resp.status(), 200);
    let body: SummarizeResponse = resp.json().await.unwrap();
    assert_eq!(body.summary, "Paris is the capital of France.");
    assert!(body.success);
}

#[tokio::test]
async fn test_summarize_language_reaches_prompt() {
    // print only the last argument, which is the prompt
    let server = TestServer::with_script("for a in \"$@\"; do last=\"$a\"; done\necho \"$last\"").await;

    let body: SummarizeResponse = server
        .post("/summarize", json!({"content": "Explain entanglement.", "language": "es"}))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(body.summary, "Explain entanglement.\n\nRespond in language: es.");
}

#[tokio::test]
async fn test_blank_content_is_unprocessable() {
    let server = TestServer::with_script("echo unused").await;

    let resp = server.post("/summarize", json!({"content": "   "})).await;
    assert_eq!(resp.status(), 422);
    let err: ErrorResponse = resp.json().await.unwrap();
    assert_eq!(err.detail, "Prompt must not be empty");
}

#[tokio::test]
async fn test_bad_parameters_are_unprocessable() {
    let server = TestServer::with_script("echo unused").await;

    let resp = server
        .post("/summarize", json!({"content": "hi", "parameters": {"top_p": 3.0}}))
        .await;
    assert_eq!(resp.status(), 422);

    let resp = server
        .post("/summarize", json!({"content": "hi", "parameters": {"rope_freq": 1.0}}))
        .await;
    assert_eq!(resp.status(), 422);
}

#[tokio::test]
async fn test_missing_binary_is_unavailable() {
    let server = TestServer::start("echo unused", EnabledEndpoints::all(), |config, dir| {
        config.cli_path = dir.join("not-installed");
    })
    .await;

    let resp = server.post("/summarize", json!({"content": "hi"})).await;
    assert_eq!(resp.status(), 503);
    let err: ErrorResponse = resp.json().await.unwrap();
    assert!(err.detail.contains("not-installed"));
    assert!(err.hint.is_some());
}

#[tokio::test]
async fn test_execution_failure_is_bad_gateway() {
    let server = TestServer::with_script("echo 'error: model is corrupt' >&2\nexit 2").await;

    let resp = server.post("/summarize", json!({"content": "hi"})).await;
    assert_eq!(resp.status(), 502);
    let err: ErrorResponse = resp.json().await.unwrap();
    assert_eq!(err.code, Some(2));
    assert!(err.detail.contains("error: model is corrupt"));
}

#[tokio::test]
async fn test_signal_death_omits_exit_code() {
    let server = TestServer::with_script("kill -9 $$").await;

    let resp = server.post("/summarize", json!({"content": "hi"})).await;
    assert_eq!(resp.status(), 502);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert!(body.get("code").is_none(), "unexpected code in {}", body);
    assert!(body["detail"].as_str().unwrap().contains("terminated by signal"));
}

#[tokio::test]
async fn test_timeout_is_gateway_timeout() {
    let server = TestServer::start("exec sleep 30", EnabledEndpoints::all(), |config, _| {
        config.timeout_secs = 1;
    })
    .await;

    let resp = server.post("/summarize", json!({"content": "hi"})).await;
    assert_eq!(resp.status(), 504);
}

#[tokio::test]
async fn test_disabled_endpoint_is_not_found() {
    let server = TestServer::start("echo unused", EnabledEndpoints::default(), |_, _| {}).await;

    let resp = server.post("/infer", json!({"prompt": "hi"})).await;
    assert_eq!(resp.status(), 404);

    let health: HealthResponse = server.get("/health").await.json().await.unwrap();
    assert_eq!(health.endpoints, vec!["ik_llama.text_summarization"]);
}

#[tokio::test]
async fn test_infer_dry_run() {
    let server = TestServer::start("exit 1", EnabledEndpoints::all(), |config, dir| {
        // dry run must not even look for the binary
        config.cli_path = dir.join("not-installed");
    })
    .await;

    let resp = server
        .post("/infer", json!({"prompt": "What is the capital of France?", "dry_run": true}))
        .await;
    assert_eq!(resp.status(), 200);
    let body: InferResponse = resp.json().await.unwrap();
    assert_eq!(body.output, DRY_RUN_OUTPUT);
    assert_eq!(body.tokens_generated, 5);
    assert_eq!(body.execution_time_ms, 0);
}
