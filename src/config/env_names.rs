//! Environment variable names read by the service.

/// Prefix shared by every runner and server variable.
pub const LLAMA_PREFIX: &str = "LLAMA_";

/// Runner variables (`RunnerConfig`)
pub mod runner {
    /// Path to the llama-cli binary (required)
    pub const LLAMA_CLI_PATH: &str = "LLAMA_CLI_PATH";
    /// Path to the GGUF model file (required)
    pub const LLAMA_MODEL_PATH: &str = "LLAMA_MODEL_PATH";
    pub const LLAMA_CONTEXT_SIZE: &str = "LLAMA_CONTEXT_SIZE";
    pub const LLAMA_GPU_LAYERS: &str = "LLAMA_GPU_LAYERS";
    pub const LLAMA_MAIN_GPU: &str = "LLAMA_MAIN_GPU";
    /// One of `distribute`, `isolate`, `numactl`, `none`
    pub const LLAMA_NUMA: &str = "LLAMA_NUMA";
    pub const LLAMA_VERBOSE: &str = "LLAMA_VERBOSE";
    pub const LLAMA_NO_DISPLAY_PROMPT: &str = "LLAMA_NO_DISPLAY_PROMPT";
    pub const LLAMA_TIMEOUT_SECS: &str = "LLAMA_TIMEOUT_SECS";
    /// Skip process execution for every request
    pub const LLAMA_DRY_RUN: &str = "LLAMA_DRY_RUN";
    /// Upper bound on concurrently running llama processes (unset = unbounded)
    pub const LLAMA_MAX_CONCURRENT: &str = "LLAMA_MAX_CONCURRENT";
}

/// HTTP server variables (`ServerSettings`)
pub mod server {
    pub const LLAMA_HOST: &str = "LLAMA_HOST";
    pub const LLAMA_PORT: &str = "LLAMA_PORT";
}

/// Comma-separated endpoint identifiers, e.g. `ik_llama.text_summarization`
pub const ENABLED_ENDPOINTS: &str = "ENABLED_ENDPOINTS";

/// Log filter directive for the tracing subscriber (e.g. `debug`, `medparswell=trace`)
pub const APP_LOG_LEVEL: &str = "APP_LOG_LEVEL";
