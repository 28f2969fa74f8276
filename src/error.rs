//! Unified error type hierarchy for the arm_tiny builder.
//!
//! Provides structured error handling with ConfigError, PatchError,
//! ToolchainError, ArtifactError, ImageError, and the top-level BuildError.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Configuration file parsing and validation errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    #[error("Invalid TOML in config: {0}")]
    InvalidToml(#[from] toml::de::Error),

    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),

    #[error("IO error during config operations: {0}")]
    IoError(#[from] io::Error),
}

/// Linker script patching errors.
#[derive(Error, Debug)]
pub enum PatchError {
    #[error("Linker script not found: {}", .0.display())]
    ScriptNotFound(PathBuf),

    #[error("Address literal '{literal}' not present in {}", .file.display())]
    AddressNotFound { literal: String, file: PathBuf },

    #[error("Patch not started: call begin() before patching")]
    NotStarted,

    #[error("IO error while patching {}: {source}", .file.display())]
    Io {
        file: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// External toolchain invocation errors.
#[derive(Error, Debug)]
pub enum ToolchainError {
    #[error("Failed to spawn '{command}': {source}")]
    SpawnFailed {
        command: String,
        #[source]
        source: io::Error,
    },

    #[error("Clean step failed with exit code {0:?}")]
    CleanFailed(Option<i32>),

    #[error("Build step failed with exit code {0:?}")]
    BuildFailed(Option<i32>),

    #[error("Failed to capture build output: {0}")]
    OutputCapture(String),
}

/// Build artifact handling errors.
#[derive(Error, Debug)]
pub enum ArtifactError {
    #[error("Expected build artifact missing: {}", .0.display())]
    Missing(PathBuf),

    #[error("Build artifact is empty: {}", .0.display())]
    Empty(PathBuf),

    #[error("Failed to copy {} to {}: {source}", .from.display(), .to.display())]
    CopyFailed {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Disk image update and inspection errors.
#[derive(Error, Debug)]
pub enum ImageError {
    #[error("Disk update script not found: {}", .0.display())]
    ScriptNotFound(PathBuf),

    #[error("Failed to spawn disk updater '{command}': {source}")]
    SpawnFailed {
        command: String,
        #[source]
        source: io::Error,
    },

    #[error("Disk update failed with exit code {0:?}")]
    UpdateFailed(Option<i32>),

    #[error("Disk image not found: {}", .0.display())]
    ImageMissing(PathBuf),

    #[error("IO error while inspecting {}: {source}", .file.display())]
    Io {
        file: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Top-level error for a pipeline run.
///
/// Distinguishes which stage of the pipeline failed so callers can report
/// a patch failure differently from a toolchain or copy failure.
#[derive(Error, Debug)]
pub enum BuildError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Patch(#[from] PatchError),

    #[error(transparent)]
    Toolchain(#[from] ToolchainError),

    #[error(transparent)]
    Artifact(#[from] ArtifactError),

    #[error(transparent)]
    Image(#[from] ImageError),

    #[error("Invalid phase transition: {0}")]
    Phase(String),

    #[error("Failed to write build report to {}: {reason}", .file.display())]
    Report { file: PathBuf, reason: String },
}

/// Result type used by all fallible pipeline operations.
pub type Result<T> = std::result::Result<T, BuildError>;
