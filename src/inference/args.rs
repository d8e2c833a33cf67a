//! Command-line rendering
//!
//! Arguments are produced as a discrete list and handed straight to the
//! process spawner. No shell is involved, so prompt text is never parsed.

use crate::config::RunnerConfig;
use crate::inference::runner::InferenceRequest;
use std::ffi::OsString;
use std::fmt::Display;
use std::path::Path;

/// Render the ordered llama-cli arguments for a request.
///
/// Runtime flags come first (request value or config default), then the
/// sampling flags that were set, then the boolean switches. `--prompt` and the
/// prompt text are always the final two elements.
pub fn build_args(config: &RunnerConfig, request: &InferenceRequest) -> Vec<OsString> {
    let params = request.params();
    let mut args: Vec<OsString> = Vec::with_capacity(32);

    args.push("-m".into());
    args.push(config.model_path.clone().into_os_string());
    push_flag(&mut args, "--ctx-size", params.ctx_size.unwrap_or(config.context_size));
    push_flag(&mut args, "--gpu-layers", params.gpu_layers.unwrap_or(config.gpu_layers));
    push_flag(&mut args, "--main-gpu", params.main_gpu.unwrap_or(config.main_gpu));
    if let Some(numa) = params.numa.unwrap_or(config.numa).flag_value() {
        push_flag(&mut args, "--numa", numa);
    }

    push_opt(&mut args, "--n-predict", params.predict_tokens);
    push_opt(&mut args, "--seed", params.seed);
    push_opt(&mut args, "--threads", params.threads);
    push_opt(&mut args, "--threads-batch", params.threads_batch);
    push_opt(&mut args, "--temp", params.temperature);
    push_opt(&mut args, "--top-k", params.top_k);
    push_opt(&mut args, "--top-p", params.top_p);
    push_opt(&mut args, "--min-p", params.min_p);
    push_opt(&mut args, "--repeat-last-n", params.repeat_last_n);
    push_opt(&mut args, "--repeat-penalty", params.repeat_penalty);
    push_opt(&mut args, "--presence-penalty", params.presence_penalty);
    push_opt(&mut args, "--frequency-penalty", params.frequency_penalty);
    push_opt(&mut args, "--mirostat", params.mirostat);
    push_opt(&mut args, "--mirostat-lr", params.mirostat_lr);
    push_opt(&mut args, "--mirostat-ent", params.mirostat_ent);

    if params.no_display_prompt.unwrap_or(config.no_display_prompt) {
        args.push("--no-display-prompt".into());
    }
    if params.verbose.unwrap_or(config.verbose) {
        args.push("--verbose".into());
    }

    args.push("--prompt".into());
    args.push(request.rendered_prompt().into());
    args
}

fn push_flag(args: &mut Vec<OsString>, flag: &str, value: impl Display) {
    args.push(flag.into());
    args.push(value.to_string().into());
}

fn push_opt<T: Display>(args: &mut Vec<OsString>, flag: &str, value: Option<T>) {
    if let Some(value) = value {
        push_flag(args, flag, value);
    }
}

/// Human-readable command line for logs only. Never executed.
pub fn display_command(binary: &Path, args: &[OsString]) -> String {
    let mut rendered = binary.display().to_string();
    for arg in args {
        rendered.push(' ');
        rendered.push_str(&format!("{:?}", arg));
    }
    rendered
}
