//! In-process waveform synthesis backend using Rayon for per-source parallelism.
//!
//! This backend does not solve Maxwell's equations. It samples the drive
//! signal of every source and computes its power spectrum, which is what
//! the editor needs to preview excitations before committing to a full
//! field simulation.

use num_complex::Complex64;
use rayon::prelude::*;
use std::f64::consts::PI;

use sunstone_core::backend::{Backend, BackendFailure, RunOutput, Spectrum, Trace};
use sunstone_core::capability::{CapabilityDescriptor, Limits, OptionSpec};
use sunstone_core::types::{Dimension, ResolvedSource, SimulationMode, SimulationSpec};
use sunstone_waveform::{synthesize, WaveformKind};

/// Registry key of the synthesis backend.
pub const NAME: &str = "synthesis";

/// Samples taken per source when the `samples` option is absent.
pub const DEFAULT_SAMPLES: usize = 1024;

const MIN_SAMPLES: f64 = 16.0;
const MAX_SAMPLES: f64 = 16384.0;
const MAX_SOURCES: usize = 64;

/// Samples and analyses bound waveforms without running a field solver.
pub struct SynthesisBackend {
    num_threads: usize,
}

impl SynthesisBackend {
    /// Create a synthesis backend using all available threads.
    pub fn new() -> Self {
        Self {
            num_threads: rayon::current_num_threads(),
        }
    }
}

impl Default for SynthesisBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// One-sided power spectrum of uniformly sampled data by direct DFT.
///
/// Bin $k$ sits at $f_k = k / (N \Delta t)$ and holds
/// $|\Delta t \sum_n x_n e^{-2\pi i k n / N}|^2$, for $k = 0 \ldots N/2$.
/// Returns empty vectors for fewer than two samples.
pub fn power_spectrum(times: &[f64], values: &[f64]) -> (Vec<f64>, Vec<f64>) {
    let n = values.len().min(times.len());
    if n < 2 {
        return (Vec::new(), Vec::new());
    }
    let dt = times[1] - times[0];
    let span = n as f64 * dt;

    (0..=n / 2)
        .map(|k| {
            let omega = -2.0 * PI * k as f64 / n as f64;
            let sum: Complex64 = values[..n]
                .iter()
                .enumerate()
                .map(|(j, &x)| Complex64::from_polar(x, omega * j as f64))
                .sum();
            (k as f64 / span, (sum * dt).norm_sqr())
        })
        .unzip()
}

fn sample_count(spec: &SimulationSpec) -> usize {
    spec.settings()
        .number_option("samples")
        .map(|n| n.round() as usize)
        .unwrap_or(DEFAULT_SAMPLES)
}

fn trace_for(source: &ResolvedSource, n: usize, run_time: f64) -> Result<Trace, BackendFailure> {
    let waveform = synthesize(&source.waveform).map_err(|e| BackendFailure::new(e.to_string()))?;
    let support = waveform.support();
    let window_end = if support.is_bounded() { None } else { Some(run_time) };
    if let Some(end) = window_end {
        if end <= support.start {
            return Err(BackendFailure::new(format!(
                "source '{}' switches on at {:e} s, after the run ends at {:e} s",
                source.id, support.start, end
            )));
        }
    }

    let (times, values) = waveform
        .sample(n, window_end)
        .map_err(|e| BackendFailure::new(e.to_string()))?
        .into_iter()
        .unzip();
    Ok(Trace {
        source_id: source.id.clone(),
        waveform_id: source.waveform.id().to_string(),
        times,
        values,
    })
}

impl Backend for SynthesisBackend {
    fn descriptor(&self) -> CapabilityDescriptor {
        CapabilityDescriptor::new(NAME, "Waveform synthesis")
            .with_waveform_kinds([WaveformKind::Gaussian, WaveformKind::ContinuousWave])
            .with_dimensions(Dimension::ALL)
            .with_modes([SimulationMode::Fdtd, SimulationMode::FrequencyDomain])
            .with_limits(Limits {
                max_sources: Some(MAX_SOURCES),
                max_grid_cells: None,
            })
            .with_option(
                "samples",
                OptionSpec::number(
                    "Samples per source",
                    Some(MIN_SAMPLES),
                    Some(MAX_SAMPLES),
                    Some(DEFAULT_SAMPLES as f64),
                ),
            )
    }

    fn run(&self, spec: &SimulationSpec) -> Result<RunOutput, BackendFailure> {
        let n = sample_count(spec);
        let run_time = spec.settings().run_time;
        log::debug!("Synthesizing {} source(s) at {} samples each", spec.sources().len(), n);

        let analysed: Vec<(Trace, Spectrum)> = spec
            .sources()
            .par_iter()
            .map(|source| -> Result<(Trace, Spectrum), BackendFailure> {
                let trace = trace_for(source, n, run_time)?;
                let (frequencies_hz, power) = power_spectrum(&trace.times, &trace.values);
                let spectrum = Spectrum {
                    source_id: source.id.clone(),
                    frequencies_hz,
                    power,
                };
                Ok((trace, spectrum))
            })
            .collect::<Result<_, _>>()?;

        let (traces, spectra): (Vec<_>, Vec<_>) = analysed.into_iter().unzip();
        let mut output = RunOutput {
            spectra,
            ..Default::default()
        };
        match spec.mode() {
            SimulationMode::Fdtd => output.traces = traces,
            SimulationMode::FrequencyDomain => {
                output.notes.push("frequency-domain mode: time traces omitted".to_string());
            }
        }
        output.notes.push(format!(
            "synthesized {} source(s), {} samples each, on {} thread(s)",
            spec.sources().len(),
            n,
            self.num_threads
        ));
        Ok(output)
    }
}
