use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use chrono::{DateTime, Utc};
use std::sync::Arc;

use super::types::*;
use crate::config::env_names::runner::{LLAMA_CLI_PATH, LLAMA_MODEL_PATH};
use crate::config::EnabledEndpoints;
use crate::inference::{InferenceRequest, InvokeError, Invoker};

/// Shared server state.
pub struct AppState {
    pub invoker: Arc<dyn Invoker>,
    pub endpoints: EnabledEndpoints,
    /// Global dry-run flag, reported by `/health`
    pub dry_run: bool,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(invoker: Arc<dyn Invoker>, endpoints: EnabledEndpoints, dry_run: bool) -> Self {
        Self {
            invoker,
            endpoints,
            dry_run,
            started_at: Utc::now(),
        }
    }
}

pub type SharedState = Arc<AppState>;

/// Error response carrying its HTTP status
#[derive(Debug)]
pub struct ApiFailure(pub StatusCode, pub ErrorResponse);

impl ApiFailure {
    pub fn status(&self) -> StatusCode {
        self.0
    }
}

impl From<InvokeError> for ApiFailure {
    fn from(err: InvokeError) -> Self {
        let detail = err.to_string();
        match err {
            InvokeError::EmptyPrompt | InvokeError::InvalidParameters(_) => {
                ApiFailure(StatusCode::UNPROCESSABLE_ENTITY, ErrorResponse::new(detail))
            }
            InvokeError::MissingBinary(_) => ApiFailure(
                StatusCode::SERVICE_UNAVAILABLE,
                ErrorResponse::new(detail)
                    .with_hint(format!("Check {} points at the llama-cli binary", LLAMA_CLI_PATH)),
            ),
            InvokeError::MissingModel(_) => ApiFailure(
                StatusCode::SERVICE_UNAVAILABLE,
                ErrorResponse::new(detail)
                    .with_hint(format!("Check {} points at a GGUF model file", LLAMA_MODEL_PATH)),
            ),
            InvokeError::ExecutionFailed { exit_code, .. } => ApiFailure(
                StatusCode::BAD_GATEWAY,
                ErrorResponse::new(detail).with_code(exit_code),
            ),
            InvokeError::Timeout(_) => ApiFailure(
                StatusCode::GATEWAY_TIMEOUT,
                ErrorResponse::new(detail)
                    .with_hint("Lower parameters.predict_tokens or raise LLAMA_TIMEOUT_SECS"),
            ),
            InvokeError::Process(_) => {
                ApiFailure(StatusCode::INTERNAL_SERVER_ERROR, ErrorResponse::new(detail))
            }
        }
    }
}

impl From<JsonRejection> for ApiFailure {
    fn from(rejection: JsonRejection) -> Self {
        ApiFailure(rejection.status(), ErrorResponse::new(rejection.body_text()))
    }
}

impl IntoResponse for ApiFailure {
    fn into_response(self) -> Response {
        (self.0, Json(self.1)).into_response()
    }
}

// ============================================================================
// Health Check
// ============================================================================

pub async fn root() -> Json<StatusResponse> {
    Json(StatusResponse::ok("medparswell API is running."))
}

pub async fn ping() -> Json<StatusResponse> {
    Json(StatusResponse::ok("medparswell is alive"))
}

pub async fn health(State(state): State<SharedState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        endpoints: state.endpoints.ids().into_iter().map(String::from).collect(),
        dry_run: state.dry_run,
        started_at: state.started_at,
    })
}

// ============================================================================
// Summarization
// ============================================================================

pub async fn summarize(
    State(state): State<SharedState>,
    body: Result<Json<SummarizeRequest>, JsonRejection>,
) -> Result<Json<SummarizeResponse>, ApiFailure> {
    let Json(req) = body?;
    let request = InferenceRequest::new(&req.content)?
        .with_language(req.language)?
        .with_params(req.parameters)?
        .with_dry_run(req.dry_run);

    let result = state.invoker.invoke(&request).await?;

    Ok(Json(SummarizeResponse {
        summary: result.text,
        success: result.success,
        duration_ms: result.duration_ms,
    }))
}

// ============================================================================
// Raw inference
// ============================================================================

pub async fn infer(
    State(state): State<SharedState>,
    body: Result<Json<InferRequest>, JsonRejection>,
) -> Result<Json<InferResponse>, ApiFailure> {
    let Json(req) = body?;
    let request = InferenceRequest::new(&req.prompt)?
        .with_params(req.parameters)?
        .with_dry_run(req.dry_run);

    let result = state.invoker.invoke(&request).await?;

    Ok(Json(InferResponse {
        tokens_generated: result.text.split_whitespace().count(),
        output: result.text,
        execution_time_ms: result.duration_ms,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Endpoint;
    use crate::inference::{InferenceParams, InferenceResult};
    use async_trait::async_trait;
    use std::path::PathBuf;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Records every prompt it sees and answers with a fixed result
    struct EchoInvoker {
        seen: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Invoker for EchoInvoker {
        async fn invoke(
            &self,
            request: &InferenceRequest,
        ) -> Result<InferenceResult, InvokeError> {
            self.seen.lock().unwrap().push(request.rendered_prompt());
            Ok(InferenceResult {
                text: "Paris is the capital".to_string(),
                success: true,
                duration_ms: 42,
            })
        }
    }

    fn state() -> (Arc<EchoInvoker>, SharedState) {
        let invoker = Arc::new(EchoInvoker {
            seen: Mutex::new(Vec::new()),
        });
        let state = Arc::new(AppState::new(
            invoker.clone(),
            EnabledEndpoints::all(),
            false,
        ));
        (invoker, state)
    }

    fn status_of(err: InvokeError) -> StatusCode {
        ApiFailure::from(err).status()
    }

    #[test]
    fn test_error_status_mapping() {
        assert_eq!(status_of(InvokeError::EmptyPrompt), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(
            status_of(InvokeError::InvalidParameters("top_p".into())),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            status_of(InvokeError::MissingBinary(PathBuf::from("/x"))),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            status_of(InvokeError::MissingModel(PathBuf::from("/m.gguf"))),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            status_of(InvokeError::ExecutionFailed {
                stderr: "boom".into(),
                exit_code: Some(1)
            }),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            status_of(InvokeError::Timeout(Duration::from_secs(180))),
            StatusCode::GATEWAY_TIMEOUT
        );
        assert_eq!(
            status_of(InvokeError::Process(std::io::Error::other("spawn"))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_execution_failure_body() {
        let failure = ApiFailure::from(InvokeError::ExecutionFailed {
            stderr: "error: out of memory".into(),
            exit_code: Some(137),
        });
        assert_eq!(failure.1.code, Some(137));
        assert!(failure.1.detail.contains("error: out of memory"));
    }

    #[tokio::test]
    async fn test_summarize_passes_language_instruction() {
        let (invoker, state) = state();
        let req = SummarizeRequest {
            content: "  Long article text.  ".to_string(),
            language: Some("es".to_string()),
            dry_run: false,
            parameters: InferenceParams::default(),
        };

        let Json(resp) = summarize(State(state), Ok(Json(req))).await.unwrap();
        assert_eq!(resp.summary, "Paris is the capital");
        assert_eq!(resp.duration_ms, 42);
        assert_eq!(
            invoker.seen.lock().unwrap().as_slice(),
            ["Long article text.\n\nRespond in language: es."]
        );
    }

    #[tokio::test]
    async fn test_summarize_rejects_blank_content() {
        let (invoker, state) = state();
        let req = SummarizeRequest {
            content: " \n ".to_string(),
            language: None,
            dry_run: false,
            parameters: InferenceParams::default(),
        };

        let err = summarize(State(state), Ok(Json(req))).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert!(invoker.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_infer_counts_tokens() {
        let (_invoker, state) = state();
        let req = InferRequest {
            prompt: "What is the capital of France?".to_string(),
            dry_run: false,
            parameters: InferenceParams::default(),
        };

        let Json(resp) = infer(State(state), Ok(Json(req))).await.unwrap();
        assert_eq!(resp.tokens_generated, 4);
        assert_eq!(resp.execution_time_ms, 42);
    }

    #[tokio::test]
    async fn test_health_lists_endpoints() {
        let (_invoker, state) = state();
        let Json(resp) = health(State(state)).await;
        assert_eq!(resp.status, "ok");
        assert_eq!(
            resp.endpoints,
            vec![
                Endpoint::TextSummarization.to_string(),
                Endpoint::Inference.to_string()
            ]
        );
        assert!(!resp.dry_run);
    }
}
