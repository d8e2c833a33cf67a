//! Binary and model file checks
//!
//! Existence checks run before every invocation. The GGUF header check is only
//! used at startup to warn about a model file llama-cli will likely refuse.

use crate::config::RunnerConfig;
use crate::inference::runner::InvokeError;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;
use thiserror::Error;

/// GGUF magic bytes (little-endian: "GGUF")
pub const GGUF_MAGIC: u32 = 0x46554747;

/// Errors from reading a model file header
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("Failed to open file: {0}")]
    FileOpen(#[from] std::io::Error),

    #[error("Invalid GGUF file: magic bytes mismatch (expected 0x{:08X}, got 0x{:08X})", GGUF_MAGIC, .0)]
    InvalidMagic(u32),

    #[error("Unsupported GGUF version: {0}")]
    UnsupportedVersion(u32),

    #[error("File too small to be valid GGUF")]
    FileTooSmall,
}

/// Header fields of a GGUF file
#[derive(Debug, Clone)]
pub struct GgufMetadata {
    pub version: u32,
    pub tensor_count: u64,
    pub metadata_kv_count: u64,
}

/// Fail with the matching error when the binary or the model file is absent.
///
/// Both must be regular files; a directory at either path counts as missing.
pub fn check_dependencies(config: &RunnerConfig) -> Result<(), InvokeError> {
    if !config.cli_path.is_file() {
        return Err(InvokeError::MissingBinary(config.cli_path.clone()));
    }
    if !config.model_path.is_file() {
        return Err(InvokeError::MissingModel(config.model_path.clone()));
    }
    Ok(())
}

/// Read and check the GGUF header of a model file.
pub fn validate_gguf<P: AsRef<Path>>(path: P) -> Result<GgufMetadata, ModelError> {
    let mut file = File::open(path)?;

    // magic(4) + version(4) + tensor_count(8) + metadata_kv_count(8)
    let file_size = file.seek(SeekFrom::End(0))?;
    if file_size < 24 {
        return Err(ModelError::FileTooSmall);
    }
    file.seek(SeekFrom::Start(0))?;

    let magic = read_u32(&mut file)?;
    if magic != GGUF_MAGIC {
        return Err(ModelError::InvalidMagic(magic));
    }

    let version = read_u32(&mut file)?;
    if !(2..=3).contains(&version) {
        return Err(ModelError::UnsupportedVersion(version));
    }

    let tensor_count = read_u64(&mut file)?;
    let metadata_kv_count = read_u64(&mut file)?;

    Ok(GgufMetadata {
        version,
        tensor_count,
        metadata_kv_count,
    })
}

fn read_u32(file: &mut File) -> std::io::Result<u32> {
    let mut bytes = [0u8; 4];
    file.read_exact(&mut bytes)?;
    Ok(u32::from_le_bytes(bytes))
}

fn read_u64(file: &mut File) -> std::io::Result<u64> {
    let mut bytes = [0u8; 8];
    file.read_exact(&mut bytes)?;
    Ok(u64::from_le_bytes(bytes))
}

/// Log what is known about the configured files. Never fails.
pub fn inspect_model(config: &RunnerConfig) {
    if let Err(e) = check_dependencies(config) {
        tracing::warn!("{} (requests will fail until it exists)", e);
        return;
    }

    match validate_gguf(&config.model_path) {
        Ok(meta) => tracing::info!(
            version = meta.version,
            tensors = meta.tensor_count,
            metadata_kv = meta.metadata_kv_count,
            "Model header looks valid"
        ),
        Err(e) => tracing::warn!(
            "Model file {} does not look like GGUF: {}",
            config.model_path.display(),
            e
        ),
    }
}
