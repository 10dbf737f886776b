//! Hand-off of validated specs to backends.
//!
//! The backend runs on a worker thread and reports back over a channel, so
//! the caller can bound how long it waits. A run that times out is
//! abandoned: its thread is detached and its eventual result is dropped.

use std::sync::{mpsc, Arc};
use std::thread;
use std::time::{Duration, Instant};

use log::{info, warn};
use serde::Serialize;
use uuid::Uuid;

use crate::backend::RunOutput;
use crate::compiler::validate_against;
use crate::error::{CoreError, CoreResult};
use crate::registry::BackendRegistry;
use crate::types::SimulationSpec;

/// Result of a completed dispatch.
#[derive(Debug, Clone, Serialize)]
pub struct RunHandle {
    pub run_id: Uuid,
    pub backend: String,
    pub output: RunOutput,
    #[serde(with = "duration_secs")]
    pub elapsed: Duration,
}

mod duration_secs {
    use serde::Serializer;
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_f64(d.as_secs_f64())
    }
}

/// Sends specs to the backend they were compiled for.
pub struct Dispatcher {
    registry: Arc<BackendRegistry>,
    timeout: Option<Duration>,
}

impl Dispatcher {
    /// A dispatcher that waits indefinitely for each run.
    pub fn new(registry: Arc<BackendRegistry>) -> Self {
        Self {
            registry,
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn registry(&self) -> &BackendRegistry {
        &self.registry
    }

    /// The backend-native rendering of `spec`, if the backend offers one.
    pub fn translate(&self, spec: &SimulationSpec) -> CoreResult<Option<String>> {
        let entry = self.registry.get(spec.backend())?;
        Ok(entry.handle.translate(spec))
    }

    /// Run `spec` on its backend.
    ///
    /// The spec is re-validated first, since it may have been parsed from
    /// preview text rather than produced by the compiler. Backend failures
    /// and timeouts surface as [`CoreError::BackendExecution`].
    pub fn dispatch(&self, spec: &SimulationSpec) -> CoreResult<RunHandle> {
        let entry = self.registry.get(spec.backend())?;
        validate_against(&entry.descriptor, spec.settings(), spec.sources())?;

        let run_id = Uuid::new_v4();
        info!(
            "Dispatching run {} to backend '{}' ({} source(s))",
            run_id,
            entry.name,
            spec.sources().len()
        );

        let (tx, rx) = mpsc::channel();
        let handle = Arc::clone(&entry.handle);
        let job = spec.clone();
        let start = Instant::now();
        thread::Builder::new()
            .name(format!("sunstone-run-{}", &run_id.simple().to_string()[..8]))
            .spawn(move || {
                // The receiver is gone once the caller has timed out.
                let _ = tx.send(handle.run(&job));
            })
            .map_err(|e| CoreError::BackendExecution {
                backend: entry.name.clone(),
                message: format!("failed to start worker thread: {e}"),
                diagnostics: None,
            })?;

        let outcome = match self.timeout {
            Some(timeout) => rx.recv_timeout(timeout).map_err(|e| match e {
                mpsc::RecvTimeoutError::Timeout => {
                    warn!("Run {} on '{}' timed out after {:?}", run_id, entry.name, timeout);
                    format!("timed out after {:.3} s", timeout.as_secs_f64())
                }
                mpsc::RecvTimeoutError::Disconnected => "backend worker panicked".to_string(),
            }),
            None => rx.recv().map_err(|_| "backend worker panicked".to_string()),
        };

        let result = match outcome {
            Ok(result) => result,
            Err(message) => {
                return Err(CoreError::BackendExecution {
                    backend: entry.name,
                    message,
                    diagnostics: None,
                })
            }
        };

        match result {
            Ok(output) => {
                let elapsed = start.elapsed();
                info!("Run {} on '{}' finished in {:?}", run_id, entry.name, elapsed);
                Ok(RunHandle {
                    run_id,
                    backend: entry.name,
                    output,
                    elapsed,
                })
            }
            Err(failure) => {
                warn!("Run {} on '{}' failed: {}", run_id, entry.name, failure.message);
                Err(CoreError::BackendExecution {
                    backend: entry.name,
                    message: failure.message,
                    diagnostics: failure.diagnostics,
                })
            }
        }
    }
}
