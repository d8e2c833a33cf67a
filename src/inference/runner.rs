//! Process invoker
//!
//! Runs the llama-cli binary once per request and turns the outcome into an
//! [`InferenceResult`] or an [`InvokeError`].
//!
//! # Lifecycle
//!
//! `Validating → Executing → {Succeeded | Failed | TimedOut}`. Prompt and
//! parameter validation happen when the [`InferenceRequest`] is built, so a
//! request that exists is already valid. Dependency checks run right before
//! the spawn. Every call ends with exactly one result or one error.
//!
//! The child is driven through `tokio::process`, so a slow model never blocks
//! a runtime worker thread. On timeout the child's process group is killed and
//! the child reaped before the error is returned.

use std::ffi::OsString;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::Instrument;
use uuid::Uuid;
use validator::Validate;

use crate::config::RunnerConfig;
use crate::inference::args::{build_args, display_command};
use crate::inference::model::check_dependencies;
use crate::inference::params::InferenceParams;
use crate::inference::prompts::{validate_language, with_language_instruction};
use crate::truncate_str;

/// Output returned for every dry-run invocation
pub const DRY_RUN_OUTPUT: &str = "[DRY RUN] Llama output placeholder.";

/// Errors that can end an invocation
#[derive(Debug, Error)]
pub enum InvokeError {
    #[error("Prompt must not be empty")]
    EmptyPrompt,

    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("Llama binary not found: {}", .0.display())]
    MissingBinary(PathBuf),

    #[error("Model file not found: {}", .0.display())]
    MissingModel(PathBuf),

    #[error("Llama execution failed ({}):\n{stderr}", describe_exit(.exit_code))]
    ExecutionFailed {
        stderr: String,
        exit_code: Option<i32>,
    },

    #[error("Llama execution timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("Failed to run llama process: {0}")]
    Process(#[from] std::io::Error),
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {}", code),
        None => "terminated by signal".to_string(),
    }
}

impl InvokeError {
    /// True for errors raised before anything was executed because the input was bad
    pub fn is_input_error(&self) -> bool {
        matches!(self, InvokeError::EmptyPrompt | InvokeError::InvalidParameters(_))
    }
}

/// A validated prompt plus its per-request options
#[derive(Debug, Clone)]
pub struct InferenceRequest {
    prompt: String,
    language: Option<String>,
    params: InferenceParams,
    dry_run: bool,
}

impl InferenceRequest {
    /// Create a request. The prompt is trimmed and must not end up empty.
    pub fn new(prompt: impl AsRef<str>) -> Result<Self, InvokeError> {
        let prompt = prompt.as_ref().trim();
        if prompt.is_empty() {
            return Err(InvokeError::EmptyPrompt);
        }
        Ok(Self {
            prompt: prompt.to_string(),
            language: None,
            params: InferenceParams::default(),
            dry_run: false,
        })
    }

    pub fn with_language(mut self, language: Option<String>) -> Result<Self, InvokeError> {
        self.language = language.as_deref().map(validate_language).transpose()?;
        Ok(self)
    }

    pub fn with_params(mut self, params: InferenceParams) -> Result<Self, InvokeError> {
        params
            .validate()
            .map_err(|e| InvokeError::InvalidParameters(e.to_string()))?;
        self.params = params;
        Ok(self)
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn language(&self) -> Option<&str> {
        self.language.as_deref()
    }

    pub fn params(&self) -> &InferenceParams {
        &self.params
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Prompt text as passed to the binary
    pub fn rendered_prompt(&self) -> String {
        with_language_instruction(&self.prompt, self.language())
    }
}

/// Outcome of a successful invocation
#[derive(Debug, Clone, PartialEq)]
pub struct InferenceResult {
    /// Trimmed standard output of the binary
    pub text: String,
    pub success: bool,
    /// Wall-clock time of the process call
    pub duration_ms: u64,
}

impl InferenceResult {
    fn dry_run() -> Self {
        Self {
            text: DRY_RUN_OUTPUT.to_string(),
            success: true,
            duration_ms: 0,
        }
    }
}

/// Anything that can turn a request into model output
#[async_trait]
pub trait Invoker: Send + Sync {
    async fn invoke(&self, request: &InferenceRequest) -> Result<InferenceResult, InvokeError>;
}

/// Invoker backed by the llama-cli binary
pub struct LlamaRunner {
    config: RunnerConfig,
    /// Present when `max_concurrent` is configured
    limiter: Option<Semaphore>,
}

impl LlamaRunner {
    pub fn new(config: RunnerConfig) -> Self {
        let limiter = config.max_concurrent.map(Semaphore::new);
        Self { config, limiter }
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Run one invocation for the request
    pub async fn run(&self, request: &InferenceRequest) -> Result<InferenceResult, InvokeError> {
        let span = tracing::info_span!("invocation", id = %Uuid::new_v4());
        self.run_inner(request).instrument(span).await
    }

    async fn run_inner(&self, request: &InferenceRequest) -> Result<InferenceResult, InvokeError> {
        let args = build_args(&self.config, request);

        if request.is_dry_run() || self.config.dry_run {
            tracing::info!(
                command = %display_command(&self.config.cli_path, &args),
                "[DRY RUN] Skipping llama execution"
            );
            return Ok(InferenceResult::dry_run());
        }

        check_dependencies(&self.config)?;

        let _permit = match &self.limiter {
            Some(limiter) => Some(limiter.acquire().await.map_err(|_| {
                InvokeError::Process(std::io::Error::other("invocation limiter closed"))
            })?),
            None => None,
        };

        tracing::info!(
            prompt = %truncate_str(request.prompt(), 80),
            language = request.language().unwrap_or("-"),
            "Executing llama-cli"
        );
        tracing::debug!(command = %display_command(&self.config.cli_path, &args), "Command");

        match self.execute(&args).await {
            Ok(result) => {
                tracing::info!(duration_ms = result.duration_ms, "Llama execution succeeded");
                tracing::debug!(stdout = %result.text, "Llama output");
                Ok(result)
            }
            Err(e) => {
                match &e {
                    InvokeError::ExecutionFailed { stderr, exit_code } => tracing::error!(
                        exit_code = ?exit_code,
                        stderr = %truncate_str(stderr, 2048),
                        "Llama CLI failed"
                    ),
                    other => tracing::error!("{}", other),
                }
                Err(e)
            }
        }
    }

    /// Spawn the binary, collect both pipes, and enforce the timeout.
    ///
    /// The timeout bounds the process exit, not pipe EOF. On unix the binary
    /// leads its own process group and the whole group is killed once the
    /// binary exits or times out, so wrapper scripts leave nothing behind.
    async fn execute(&self, args: &[OsString]) -> Result<InferenceResult, InvokeError> {
        let timeout = self.config.timeout();
        let started = Instant::now();

        let mut command = Command::new(&self.config.cli_path);
        command
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        #[cfg(unix)]
        command.process_group(0);

        let mut child = command.spawn()?;
        let mut group = ProcessGroup::new(child.id());

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| std::io::Error::other("child stdout was not captured"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| std::io::Error::other("child stderr was not captured"))?;
        let stdout = tokio::spawn(read_pipe(stdout));
        let stderr = tokio::spawn(read_pipe(stderr));

        let status = match tokio::time::timeout(timeout, child.wait()).await {
            Ok(status) => {
                // anything the binary left running would hold the pipes open
                group.kill();
                status?
            }
            Err(_) => {
                tracing::warn!(timeout_secs = timeout.as_secs(), "Llama execution timed out, killing process group");
                group.kill();
                // kill() also waits, so the child is reaped before we return
                if let Err(e) = child.kill().await {
                    tracing::warn!("Failed to kill timed out llama process: {}", e);
                }
                stdout.abort();
                stderr.abort();
                return Err(InvokeError::Timeout(timeout));
            }
        };

        let duration_ms = started.elapsed().as_millis() as u64;
        let out = drain(stdout, "stdout").await;
        let err = drain(stderr, "stderr").await;

        if status.success() {
            Ok(InferenceResult {
                text: String::from_utf8_lossy(&out).trim().to_string(),
                success: true,
                duration_ms,
            })
        } else {
            Err(InvokeError::ExecutionFailed {
                stderr: String::from_utf8_lossy(&err).trim().to_string(),
                exit_code: status.code(),
            })
        }
    }
}

/// Upper bound on reading what is left in a pipe after the binary exited
const PIPE_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

async fn read_pipe<R: AsyncRead + Unpin>(mut pipe: R) -> std::io::Result<Vec<u8>> {
    let mut buf = Vec::new();
    pipe.read_to_end(&mut buf).await?;
    Ok(buf)
}

async fn drain(reader: JoinHandle<std::io::Result<Vec<u8>>>, name: &str) -> Vec<u8> {
    match tokio::time::timeout(PIPE_DRAIN_TIMEOUT, reader).await {
        Ok(Ok(Ok(buf))) => buf,
        Ok(Ok(Err(e))) => {
            tracing::warn!("Failed to read llama {}: {}", name, e);
            Vec::new()
        }
        Ok(Err(e)) => {
            tracing::warn!("llama {} reader stopped: {}", name, e);
            Vec::new()
        }
        Err(_) => {
            tracing::warn!("llama {} still open after exit, output dropped", name);
            Vec::new()
        }
    }
}

/// Process group led by the spawned binary.
///
/// Killed at most once, and on drop when the invocation future is cancelled.
struct ProcessGroup {
    pgid: Option<u32>,
}

impl ProcessGroup {
    fn new(pgid: Option<u32>) -> Self {
        Self { pgid }
    }

    fn kill(&mut self) {
        if let Some(pgid) = self.pgid.take() {
            kill_process_group(pgid);
        }
    }
}

impl Drop for ProcessGroup {
    fn drop(&mut self) {
        self.kill();
    }
}

#[cfg(unix)]
fn kill_process_group(pgid: u32) {
    // SAFETY: killpg only sends a signal and touches no memory
    let rc = unsafe { libc::killpg(pgid as libc::pid_t, libc::SIGKILL) };
    if rc != 0 {
        let err = std::io::Error::last_os_error();
        // ESRCH: every member already exited
        if err.raw_os_error() != Some(libc::ESRCH) {
            tracing::warn!(pgid, "Failed to kill llama process group: {}", err);
        }
    }
}

#[cfg(not(unix))]
fn kill_process_group(_pgid: u32) {}

#[async_trait]
impl Invoker for LlamaRunner {
    async fn invoke(&self, request: &InferenceRequest) -> Result<InferenceResult, InvokeError> {
        self.run(request).await
    }
}
