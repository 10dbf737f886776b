//! # Sunstone Compute
//!
//! Built-in simulation backends for Sunstone. Each backend implements
//! [`Backend`](sunstone_core::backend::Backend) and can be registered in a
//! [`BackendRegistry`](sunstone_core::registry::BackendRegistry) alongside
//! third-party engines.
//!
//! ## Available backends
//!
//! | Backend | Feature flag | Waveform kinds | Execution |
//! |---------|-------------|----------------|-----------|
//! | `synthesis` | `synthesis` (default) | gaussian, continuous-wave | In-process (Rayon) |
//! | `meep` | `meep` (default) | all | External Python interpreter |

use std::path::PathBuf;
use std::sync::Arc;

use sunstone_core::error::CoreResult;
use sunstone_core::registry::BackendRegistry;

#[cfg(feature = "meep")]
pub mod meep;

#[cfg(feature = "synthesis")]
pub mod synthesis;

#[cfg(feature = "meep")]
pub use meep::MeepBackend;

#[cfg(feature = "synthesis")]
pub use synthesis::SynthesisBackend;

/// Register every backend compiled into this crate.
///
/// `python` overrides the interpreter used by the Meep backend.
pub fn register_builtin(registry: &BackendRegistry, python: Option<PathBuf>) -> CoreResult<()> {
    #[cfg(feature = "synthesis")]
    registry.register_backend(Arc::new(SynthesisBackend::new()))?;

    #[cfg(feature = "meep")]
    {
        let backend = match python {
            Some(path) => MeepBackend::with_python(path),
            None => MeepBackend::new(),
        };
        registry.register_backend(Arc::new(backend))?;
    }
    #[cfg(not(feature = "meep"))]
    let _ = python;

    Ok(())
}

/// A fresh registry holding the built-in backends.
pub fn builtin_registry(python: Option<PathBuf>) -> CoreResult<Arc<BackendRegistry>> {
    let registry = BackendRegistry::new();
    register_builtin(&registry, python)?;
    Ok(Arc::new(registry))
}
