//! Waveform synthesis: from a declarative spec to an evaluable signal.
//!
//! [`synthesize`] is pure. It validates the parameter set for the spec's
//! kind, then returns a [`SynthesizedWaveform`] holding a closed-form
//! [`WaveformShape`] together with its temporal support and a bandwidth
//! estimate. Identical specs always yield `==` results, which is what lets
//! callers cache synthesis output keyed by waveform id.
//!
//! # Conventions
//!
//! Times are in seconds, frequencies in hertz. Every formula below is shared
//! by the preview path and by every backend; none of the constants are user
//! tunable.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use crate::spec::{WaveformError, WaveformKind, WaveformSpec};
use crate::spline::CubicSpline;

/// Number of standard deviations either side of `t0` that bound a Gaussian.
///
/// Beyond $6\sigma$ the envelope is below $1.6 \times 10^{-8}$ of its peak.
pub const GAUSSIAN_TRUNCATION: f64 = 6.0;

/// Time interval outside which a waveform is identically zero.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Support {
    pub start: f64,
    /// `None` for signals that never switch off (continuous wave).
    pub end: Option<f64>,
}

impl Support {
    pub fn bounded(start: f64, end: f64) -> Self {
        Self { start, end: Some(end) }
    }

    pub fn unbounded(start: f64) -> Self {
        Self { start, end: None }
    }

    pub fn is_bounded(&self) -> bool {
        self.end.is_some()
    }

    pub fn duration(&self) -> Option<f64> {
        self.end.map(|end| end - self.start)
    }

    pub fn contains(&self, t: f64) -> bool {
        t >= self.start && self.end.map_or(true, |end| t <= end)
    }
}

/// Rough spectral occupancy of a waveform.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bandwidth {
    pub center_hz: f64,
    pub width_hz: f64,
}

/// Closed-form description of a validated waveform.
#[derive(Debug, Clone, PartialEq)]
pub enum WaveformShape {
    Gaussian {
        t0: f64,
        sigma: f64,
        f0: f64,
        amplitude: f64,
    },
    ContinuousWave {
        frequency: f64,
        amplitude: f64,
        phase: f64,
        start_time: f64,
    },
    Toneburst {
        frequency: f64,
        cycles: f64,
        amplitude: f64,
        t0: f64,
    },
    Chirp {
        f0: f64,
        f1: f64,
        duration: f64,
        amplitude: f64,
        t0: f64,
    },
    Custom {
        spline: CubicSpline,
        amplitude: f64,
    },
}

impl WaveformShape {
    pub fn kind(&self) -> WaveformKind {
        match self {
            WaveformShape::Gaussian { .. } => WaveformKind::Gaussian,
            WaveformShape::ContinuousWave { .. } => WaveformKind::ContinuousWave,
            WaveformShape::Toneburst { .. } => WaveformKind::Toneburst,
            WaveformShape::Chirp { .. } => WaveformKind::Chirp,
            WaveformShape::Custom { .. } => WaveformKind::Custom,
        }
    }

    /// Signal value at time `t`.
    pub fn evaluate(&self, t: f64) -> f64 {
        match *self {
            WaveformShape::Gaussian { t0, sigma, f0, amplitude } => {
                let dt = t - t0;
                if dt.abs() > GAUSSIAN_TRUNCATION * sigma {
                    return 0.0;
                }
                let envelope = amplitude * (-(dt * dt) / (2.0 * sigma * sigma)).exp();
                if f0 > 0.0 {
                    envelope * (2.0 * PI * f0 * dt).cos()
                } else {
                    envelope
                }
            }
            WaveformShape::ContinuousWave { frequency, amplitude, phase, start_time } => {
                if t < start_time {
                    return 0.0;
                }
                amplitude * (2.0 * PI * frequency * (t - start_time) + phase).sin()
            }
            WaveformShape::Toneburst { frequency, cycles, amplitude, t0 } => {
                let duration = cycles / frequency;
                let tau = t - t0;
                if !(0.0..=duration).contains(&tau) {
                    return 0.0;
                }
                // Hann window: sin²(πx) on x ∈ [0, 1]
                let window = (PI * tau / duration).sin().powi(2);
                amplitude * window * (2.0 * PI * frequency * tau).sin()
            }
            WaveformShape::Chirp { f0, f1, duration, amplitude, t0 } => {
                let tau = t - t0;
                if !(0.0..=duration).contains(&tau) {
                    return 0.0;
                }
                let phase = 2.0 * PI * (f0 * tau + (f1 - f0) * tau * tau / (2.0 * duration));
                amplitude * phase.sin()
            }
            WaveformShape::Custom { ref spline, amplitude } => amplitude * spline.evaluate(t),
        }
    }
}

/// The result of synthesizing a [`WaveformSpec`].
#[derive(Debug, Clone, PartialEq)]
pub struct SynthesizedWaveform {
    waveform_id: String,
    shape: WaveformShape,
    support: Support,
    bandwidth: Bandwidth,
}

impl SynthesizedWaveform {
    /// Id of the spec this was synthesized from.
    pub fn waveform_id(&self) -> &str {
        &self.waveform_id
    }

    pub fn shape(&self) -> &WaveformShape {
        &self.shape
    }

    pub fn kind(&self) -> WaveformKind {
        self.shape.kind()
    }

    pub fn support(&self) -> Support {
        self.support
    }

    pub fn bandwidth(&self) -> Bandwidth {
        self.bandwidth
    }

    pub fn evaluate(&self, t: f64) -> f64 {
        self.shape.evaluate(t)
    }

    /// Sample `n` evenly spaced points across the support.
    ///
    /// `window_end` closes an unbounded support and is otherwise ignored.
    /// Returns [`WaveformError::UnboundedSupport`] when neither the support
    /// nor the caller provide an end.
    pub fn sample(&self, n: usize, window_end: Option<f64>) -> Result<Vec<(f64, f64)>, WaveformError> {
        let start = self.support.start;
        let end = self
            .support
            .end
            .or(window_end)
            .ok_or_else(|| WaveformError::UnboundedSupport {
                waveform_id: self.waveform_id.clone(),
            })?;

        if n == 0 {
            return Ok(Vec::new());
        }
        let step = (end - start) / (n.max(2) - 1) as f64;
        Ok((0..n)
            .map(|i| {
                let t = start + step * i as f64;
                (t, self.evaluate(t))
            })
            .collect())
    }
}

/// Validate a waveform spec and compile it into an evaluable signal.
pub fn synthesize(spec: &WaveformSpec) -> Result<SynthesizedWaveform, WaveformError> {
    spec.check_parameter_names()?;
    let id = spec.id();

    let (shape, support, bandwidth) = match spec.kind {
        WaveformKind::Gaussian => {
            let t0 = spec.param("t0")?;
            let sigma = positive(spec, "sigma")?;
            let f0 = non_negative(spec, "f0")?;
            let amplitude = spec.param("amplitude")?;
            let half = GAUSSIAN_TRUNCATION * sigma;
            (
                WaveformShape::Gaussian { t0, sigma, f0, amplitude },
                Support::bounded(t0 - half, t0 + half),
                Bandwidth { center_hz: f0, width_hz: 1.0 / (2.0 * PI * sigma) },
            )
        }
        WaveformKind::ContinuousWave => {
            let frequency = positive(spec, "frequency")?;
            let amplitude = spec.param("amplitude")?;
            let phase = spec.param("phase")?;
            let start_time = spec.param("start_time")?;
            (
                WaveformShape::ContinuousWave { frequency, amplitude, phase, start_time },
                Support::unbounded(start_time),
                Bandwidth { center_hz: frequency, width_hz: 0.0 },
            )
        }
        WaveformKind::Toneburst => {
            let frequency = positive(spec, "frequency")?;
            let cycles = positive(spec, "cycles")?;
            let amplitude = spec.param("amplitude")?;
            let t0 = spec.param("t0")?;
            (
                WaveformShape::Toneburst { frequency, cycles, amplitude, t0 },
                Support::bounded(t0, t0 + cycles / frequency),
                Bandwidth { center_hz: frequency, width_hz: frequency / cycles },
            )
        }
        WaveformKind::Chirp => {
            let f0 = non_negative(spec, "f0")?;
            let f1 = non_negative(spec, "f1")?;
            if f0 == 0.0 && f1 == 0.0 {
                return Err(WaveformError::invalid(id, "f1", "at least one of f0 and f1 must be positive"));
            }
            let duration = positive(spec, "duration")?;
            let amplitude = spec.param("amplitude")?;
            let t0 = spec.param("t0")?;
            (
                WaveformShape::Chirp { f0, f1, duration, amplitude, t0 },
                Support::bounded(t0, t0 + duration),
                Bandwidth { center_hz: 0.5 * (f0 + f1), width_hz: (f1 - f0).abs() },
            )
        }
        WaveformKind::Custom => {
            if let Some(bad) = spec.samples.iter().position(|s| !s[0].is_finite() || !s[1].is_finite()) {
                return Err(WaveformError::invalid(id, "samples", format!("sample {bad} is not finite")));
            }
            let spline = CubicSpline::from_samples(&spec.samples).ok_or_else(|| {
                WaveformError::invalid(
                    id,
                    "samples",
                    "need at least 2 samples with strictly increasing times",
                )
            })?;
            let amplitude = spec.param("amplitude")?;
            let (start, end) = spline.range();
            let nyquist = 1.0 / (2.0 * spline.min_spacing());
            (
                WaveformShape::Custom { spline, amplitude },
                Support::bounded(start, end),
                Bandwidth { center_hz: 0.0, width_hz: nyquist },
            )
        }
    };

    log::debug!("Synthesized {} waveform '{}' over {:?}", spec.kind, id, support);

    Ok(SynthesizedWaveform {
        waveform_id: id.to_string(),
        shape,
        support,
        bandwidth,
    })
}

fn positive(spec: &WaveformSpec, name: &str) -> Result<f64, WaveformError> {
    let value = spec.param(name)?;
    if value <= 0.0 {
        return Err(WaveformError::invalid(spec.id(), name, format!("expected > 0, got {value}")));
    }
    Ok(value)
}

fn non_negative(spec: &WaveformSpec, name: &str) -> Result<f64, WaveformError> {
    let value = spec.param(name)?;
    if value < 0.0 {
        return Err(WaveformError::invalid(spec.id(), name, format!("expected >= 0, got {value}")));
    }
    Ok(value)
}
