//! Simulation backend abstraction.
//!
//! The [`Backend`] trait is the seam between the editor-side pipeline and
//! whatever actually executes a simulation (an in-process analyser, an
//! external FDTD engine, a remote cluster). Backends receive an already
//! validated [`SimulationSpec`] and report either a [`RunOutput`] or a
//! [`BackendFailure`] carrying the engine's own diagnostics.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::capability::CapabilityDescriptor;
use crate::types::SimulationSpec;

/// Failure reported by a backend while executing a spec.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct BackendFailure {
    pub message: String,
    /// Raw engine output (stderr, log tail). Passed through unmodified.
    pub diagnostics: Option<String>,
}

impl BackendFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            diagnostics: None,
        }
    }

    pub fn with_diagnostics(mut self, diagnostics: impl Into<String>) -> Self {
        self.diagnostics = Some(diagnostics.into());
        self
    }
}

/// Time-domain samples of one source's drive signal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trace {
    pub source_id: String,
    pub waveform_id: String,
    pub times: Vec<f64>,
    pub values: Vec<f64>,
}

/// One-sided power spectrum of a trace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Spectrum {
    pub source_id: String,
    pub frequencies_hz: Vec<f64>,
    pub power: Vec<f64>,
}

/// A named file produced by a run (script, log, field dump).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artifact {
    pub name: String,
    pub contents: String,
}

/// Everything a backend hands back after a successful run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunOutput {
    #[serde(default)]
    pub traces: Vec<Trace>,
    #[serde(default)]
    pub spectra: Vec<Spectrum>,
    #[serde(default)]
    pub artifacts: Vec<Artifact>,
    /// Free-form messages for the user.
    #[serde(default)]
    pub notes: Vec<String>,
}

/// A simulation engine that can execute compiled specs.
///
/// Implementations must be shareable across threads: the registry hands
/// out `Arc<dyn Backend>` handles and the dispatcher runs them on worker
/// threads.
pub trait Backend: Send + Sync {
    /// Capabilities advertised at registration time.
    fn descriptor(&self) -> CapabilityDescriptor;

    /// Execute a spec that has already been validated against
    /// [`descriptor`](Backend::descriptor).
    fn run(&self, spec: &SimulationSpec) -> Result<RunOutput, BackendFailure>;

    /// Render the spec in the backend's native input language, if it has one.
    fn translate(&self, _spec: &SimulationSpec) -> Option<String> {
        None
    }
}
