//! Error types for registry, project, compilation, and dispatch operations.
//!
//! Every variant is recoverable and carries the ids and values a caller
//! needs to render an actionable message.

use std::fmt;

use sunstone_waveform::{WaveformError, WaveformKind};
use thiserror::Error;

use crate::types::SourceKind;

/// A source whose kind (waveform or source) the target backend rejects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Offender<K> {
    pub source_id: String,
    pub kind: K,
}

impl<K: fmt::Display> fmt::Display for Offender<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.source_id, self.kind)
    }
}

/// A source pointing at a waveform id that does not exist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DanglingReference {
    pub source_id: String,
    pub waveform_id: String,
}

impl fmt::Display for DanglingReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.source_id, self.waveform_id)
    }
}

fn join<T: fmt::Display>(items: &[T]) -> String {
    items
        .iter()
        .map(|item| item.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Backend '{name}' is already registered")]
    DuplicateBackend { name: String },

    #[error("Invalid backend name '{name}': {reason}")]
    InvalidBackendName { name: String, reason: String },

    #[error("Unknown backend '{name}'. Registered backends: [{}]", .available.join(", "))]
    UnknownBackend { name: String, available: Vec<String> },

    #[error("Invalid waveform parameters: {0}")]
    InvalidWaveformParameters(#[from] WaveformError),

    #[error("Unknown waveform '{waveform_id}'")]
    UnknownWaveform { waveform_id: String },

    #[error("Waveform id '{waveform_id}' already exists")]
    DuplicateWaveform { waveform_id: String },

    #[error("Unknown source '{source_id}'")]
    UnknownSource { source_id: String },

    #[error("Source id '{source_id}' already exists")]
    DuplicateSource { source_id: String },

    #[error("Sources without a bound waveform: [{}]", .source_ids.join(", "))]
    UnboundSource { source_ids: Vec<String> },

    #[error("Dangling waveform references: {}", join(.references))]
    DanglingWaveformReference { references: Vec<DanglingReference> },

    #[error("Waveform '{waveform_id}' is still referenced by sources [{}]", .source_ids.join(", "))]
    WaveformInUse {
        waveform_id: String,
        source_ids: Vec<String>,
    },

    #[error("Backend '{backend}' does not support the waveform kinds of: {}", join(.offenders))]
    UnsupportedWaveformKind {
        backend: String,
        offenders: Vec<Offender<WaveformKind>>,
    },

    #[error("Backend '{backend}' does not support the source kinds of: {}", join(.offenders))]
    UnsupportedSourceKind {
        backend: String,
        offenders: Vec<Offender<SourceKind>>,
    },

    #[error("Backend '{backend}' limit '{limit}' exceeded: allowed {allowed}, got {actual}")]
    CapabilityLimitExceeded {
        backend: String,
        limit: String,
        allowed: String,
        actual: String,
    },

    #[error("Backend '{backend}' option '{option}': {reason}")]
    InvalidBackendOption {
        backend: String,
        option: String,
        reason: String,
    },

    #[error("Invalid simulation setting '{field}': {reason}")]
    InvalidSettings { field: String, reason: String },

    #[error("Backend '{backend}' failed: {message}")]
    BackendExecution {
        backend: String,
        message: String,
        diagnostics: Option<String>,
    },

    #[error("Spec preview error: {0}")]
    Preview(#[from] serde_json::Error),
}

pub type CoreResult<T> = Result<T, CoreError>;
