use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::inference::InferenceParams;

// ============================================================================
// Status
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: String,
    pub message: String,
}

impl StatusResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            status: "ok".to_string(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub endpoints: Vec<String>,
    pub dry_run: bool,
    pub started_at: DateTime<Utc>,
}

// ============================================================================
// Summarization
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct SummarizeRequest {
    pub content: String,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub dry_run: bool,
    #[serde(default)]
    pub parameters: InferenceParams,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SummarizeResponse {
    pub summary: String,
    pub success: bool,
    pub duration_ms: u64,
}

// ============================================================================
// Raw inference
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct InferRequest {
    pub prompt: String,
    #[serde(default)]
    pub dry_run: bool,
    #[serde(default)]
    pub parameters: InferenceParams,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct InferResponse {
    pub output: String,
    /// Whitespace-separated word count of the output, not a tokenizer count
    pub tokens_generated: usize,
    pub execution_time_ms: u64,
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl ErrorResponse {
    pub fn new(detail: impl Into<String>) -> Self {
        Self {
            detail: detail.into(),
            code: None,
            hint: None,
        }
    }

    pub fn with_code(mut self, code: Option<i32>) -> Self {
        self.code = code;
        self
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}
