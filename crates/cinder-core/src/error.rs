//! Error types for cinder-core.

use std::path::PathBuf;

use thiserror::Error;

use crate::build::Stage;

/// Result type for cinder-core operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in cinder-core.
///
/// Per-unit failures (manifest, build stages, asset emission) are reported
/// and isolated by their callers; only configuration errors abort a cycle.
#[derive(Debug, Error)]
pub enum Error {
    /// A candidate unit directory has no `Cargo.toml`.
    #[error("no Cargo.toml found in {}", .0.display())]
    ManifestNotFound(PathBuf),

    /// A manifest exists but could not be used.
    #[error("invalid manifest {}: {message}", path.display())]
    Manifest { path: PathBuf, message: String },

    /// Two manifests declare the same unit name.
    #[error("duplicate unit name '{name}': {} conflicts with {}", duplicate.display(), first.display())]
    DuplicateUnit {
        name: String,
        first: PathBuf,
        duplicate: PathBuf,
    },

    /// Invalid configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// An external tool could not be started.
    #[error("failed to spawn {program} for unit {unit} ({stage}): {message}")]
    Spawn {
        unit: String,
        stage: Stage,
        program: String,
        message: String,
    },

    /// An external tool exited with a non-zero status.
    #[error("{stage} failed for unit {unit}{}", code.map(|c| format!(" (exit code {c})")).unwrap_or_default())]
    ProcessFailed {
        unit: String,
        stage: Stage,
        code: Option<i32>,
    },

    /// An external tool ran past the configured timeout and was killed.
    #[error("{stage} timed out for unit {unit} after {secs}s")]
    Timeout { unit: String, stage: Stage, secs: u64 },

    /// Copying a unit's assets failed.
    #[error("asset emission failed for unit {unit}: {message}")]
    AssetEmit { unit: String, message: String },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
