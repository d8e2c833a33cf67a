//! llama-cli invocation
//!
//! This module turns a prompt plus optional parameters into one run of the
//! llama-cli binary and returns its cleaned output.

pub mod args;
pub mod model;
pub mod params;
pub mod prompts;
pub mod runner;

// Re-export main types for convenience
pub use model::{check_dependencies, inspect_model, validate_gguf, GgufMetadata, ModelError};
pub use params::{InferenceParams, NumaMode};
pub use runner::{
    InferenceRequest, InferenceResult, InvokeError, Invoker, LlamaRunner, DRY_RUN_OUTPUT,
};
