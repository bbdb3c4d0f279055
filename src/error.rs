//! Error types for the yard engine.
//!
//! Only malformed input is an error. An impossible placement, a degenerate
//! clamp or an unclassifiable storage unit are reported as values.

use std::path::PathBuf;

/// Storage geometry that cannot be turned into a usable boundary.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GeometryError {
    #[error("storage {storage_id}: geometry is empty")]
    Empty { storage_id: String },

    #[error("storage {storage_id}: unsupported geometry type `{kind}`")]
    UnsupportedType { storage_id: String, kind: String },

    #[error("storage {storage_id}: malformed geometry: {reason}")]
    Malformed { storage_id: String, reason: String },

    #[error("storage {storage_id}: coordinate `{value}` is not a finite number")]
    BadCoordinate { storage_id: String, value: String },

    #[error("storage {storage_id}: {kind} needs at least {needed} distinct points, got {got}")]
    TooFewPoints {
        storage_id: String,
        kind: &'static str,
        needed: usize,
        got: usize,
    },

    #[error("storage {storage_id}: {kind} has zero {measure}")]
    Degenerate {
        storage_id: String,
        kind: &'static str,
        measure: &'static str,
    },

    #[error("storage {storage_id}: a {expected} cannot use a {found} geometry")]
    KindMismatch {
        storage_id: String,
        expected: &'static str,
        found: &'static str,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid engine config JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid engine config: {0}")]
    Invalid(String),
}

#[derive(Debug, thiserror::Error)]
pub enum BatchError {
    #[error(transparent)]
    Geometry(#[from] GeometryError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("invalid batch JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unknown storage unit `{0}`")]
    UnknownStorage(String),

    #[error("storage unit `{id}` has kind `{kind}`, which cannot be laid out")]
    UnsupportedStorageKind { id: String, kind: String },
}
