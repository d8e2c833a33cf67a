//! Per-request inference parameters
//!
//! Every field is optional. Runtime flags fall back to [`RunnerConfig`]
//! defaults; sampling flags are only passed to the binary when set.
//!
//! [`RunnerConfig`]: crate::config::RunnerConfig

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display};
use validator::Validate;

/// NUMA placement mode for `--numa`
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum NumaMode {
    /// Spread execution evenly over all nodes
    Distribute,
    /// Only spawn threads on CPUs of the node execution started on
    #[default]
    Isolate,
    /// Use the CPU map provided by numactl
    Numactl,
    /// Do not pass `--numa` at all
    None,
}

impl NumaMode {
    /// Value for `--numa`, or `None` when the flag is omitted
    pub fn flag_value(&self) -> Option<&str> {
        match self {
            NumaMode::None => None,
            mode => Some(mode.as_ref()),
        }
    }
}

/// Optional runtime and sampling overrides for a single invocation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct InferenceParams {
    /// Context size in tokens (`--ctx-size`)
    #[validate(range(min = 1))]
    pub ctx_size: Option<u32>,
    /// Layers offloaded to the GPU (`--gpu-layers`)
    pub gpu_layers: Option<u32>,
    /// Index of the primary GPU (`--main-gpu`)
    pub main_gpu: Option<u32>,
    pub numa: Option<NumaMode>,
    pub verbose: Option<bool>,
    /// Suppress the echoed prompt in stdout (`--no-display-prompt`)
    pub no_display_prompt: Option<bool>,

    /// Tokens to predict (`--n-predict`), -1 runs until end of text
    #[validate(range(min = -1))]
    pub predict_tokens: Option<i32>,
    /// RNG seed (`--seed`), -1 picks a random seed
    pub seed: Option<i64>,
    #[validate(range(min = 1))]
    pub threads: Option<u32>,
    #[validate(range(min = 1))]
    pub threads_batch: Option<u32>,

    /// Sampling temperature (`--temp`)
    #[validate(range(min = 0.0))]
    pub temperature: Option<f32>,
    pub top_k: Option<u32>,
    #[validate(range(min = 0.0, max = 1.0))]
    pub top_p: Option<f32>,
    #[validate(range(min = 0.0, max = 1.0))]
    pub min_p: Option<f32>,
    /// Tokens considered for repetition penalties, -1 uses the context size
    #[validate(range(min = -1))]
    pub repeat_last_n: Option<i32>,
    #[validate(range(min = 0.0))]
    pub repeat_penalty: Option<f32>,
    #[validate(range(min = 0.0))]
    pub presence_penalty: Option<f32>,
    #[validate(range(min = 0.0))]
    pub frequency_penalty: Option<f32>,
    /// 0 = disabled, 1 = Mirostat, 2 = Mirostat 2.0
    #[validate(range(max = 2))]
    pub mirostat: Option<u8>,
    #[validate(range(min = 0.0))]
    pub mirostat_lr: Option<f32>,
    #[validate(range(min = 0.0))]
    pub mirostat_ent: Option<f32>,
}
