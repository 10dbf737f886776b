//! # Sunstone Core
//!
//! The pipeline between the waveform editor and the simulation engines.
//! Backends advertise what they can run through a
//! [`CapabilityDescriptor`](capability::CapabilityDescriptor) and are kept in
//! a [`BackendRegistry`](registry::BackendRegistry). Project state is
//! compiled against a chosen backend into an immutable
//! [`SimulationSpec`](types::SimulationSpec), which the
//! [`Dispatcher`](dispatch::Dispatcher) hands to that backend.
//!
//! ## Architecture
//!
//! All engines implement the [`backend::Backend`] trait. Validation happens
//! once, in [`compiler::SpecCompiler`], and is repeated by the dispatcher for
//! specs that did not come from the compiler (for example, parsed preview
//! text).
//!
//! ## Modules
//!
//! - [`types`]: sources, settings, and the compiled spec.
//! - [`capability`]: backend capability descriptors and option schemas.
//! - [`backend`]: the backend trait and run outputs.
//! - [`registry`]: the backend catalog.
//! - [`project`]: waveform/source ownership and binding.
//! - [`compiler`]: resolution and validation.
//! - [`preview`]: human-readable spec text.
//! - [`dispatch`]: execution with timeouts.
//! - [`error`]: the crate error type.

pub mod backend;
pub mod capability;
pub mod compiler;
pub mod dispatch;
pub mod error;
pub mod preview;
pub mod project;
pub mod registry;
pub mod types;

pub use backend::{Artifact, Backend, BackendFailure, RunOutput, Spectrum, Trace};
pub use capability::{CapabilityDescriptor, Limits, OptionSpec};
pub use compiler::SpecCompiler;
pub use dispatch::{Dispatcher, RunHandle};
pub use error::{CoreError, CoreResult};
pub use project::{Project, WaveformCatalog};
pub use registry::{BackendEntry, BackendRegistry, BackendSummary};
pub use types::{
    Dimension, FieldComponent, OptionValue, ResolvedSource, SimulationMode, SimulationSettings, SimulationSpec,
    Source, SourceKind,
};
