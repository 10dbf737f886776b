//! Declarative waveform specifications.
//!
//! A [`WaveformSpec`] is what the user edits: a stable id, a free-form label,
//! a [`WaveformKind`], and a flat map of named numeric parameters. It says
//! nothing about how the signal is evaluated; that is the job of
//! [`synthesize`](crate::synth::synthesize).

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while validating or synthesizing a waveform.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum WaveformError {
    #[error("Waveform '{waveform_id}': invalid parameter '{parameter}': {reason}")]
    InvalidParameters {
        waveform_id: String,
        parameter: String,
        reason: String,
    },

    #[error("Waveform '{waveform_id}' never switches off; a sampling window end is required")]
    UnboundedSupport { waveform_id: String },
}

impl WaveformError {
    pub(crate) fn invalid(
        waveform_id: &str,
        parameter: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        WaveformError::InvalidParameters {
            waveform_id: waveform_id.to_string(),
            parameter: parameter.into(),
            reason: reason.into(),
        }
    }

    /// Id of the waveform that failed validation.
    pub fn waveform_id(&self) -> &str {
        match self {
            WaveformError::InvalidParameters { waveform_id, .. }
            | WaveformError::UnboundedSupport { waveform_id } => waveform_id,
        }
    }
}

/// The closed set of waveform families understood by every backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WaveformKind {
    /// Gaussian envelope, optionally modulated by a cosine carrier.
    Gaussian,
    /// Sinusoid switched on at a start time and never switched off.
    #[serde(alias = "cw")]
    ContinuousWave,
    /// Hann-windowed sinusoid lasting a whole number of cycles.
    Toneburst,
    /// Linear frequency sweep over a finite duration.
    Chirp,
    /// User-supplied samples, interpolated with a natural cubic spline.
    Custom,
}

impl WaveformKind {
    pub const ALL: [WaveformKind; 5] = [
        WaveformKind::Gaussian,
        WaveformKind::ContinuousWave,
        WaveformKind::Toneburst,
        WaveformKind::Chirp,
        WaveformKind::Custom,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            WaveformKind::Gaussian => "gaussian",
            WaveformKind::ContinuousWave => "continuous-wave",
            WaveformKind::Toneburst => "toneburst",
            WaveformKind::Chirp => "chirp",
            WaveformKind::Custom => "custom",
        }
    }

    /// Parameters that must be present for this kind.
    pub fn required_parameters(&self) -> &'static [&'static str] {
        match self {
            WaveformKind::Gaussian => &["t0", "sigma", "f0", "amplitude"],
            WaveformKind::ContinuousWave => &["frequency", "amplitude"],
            WaveformKind::Toneburst => &["frequency", "cycles", "amplitude"],
            WaveformKind::Chirp => &["f0", "f1", "duration", "amplitude"],
            WaveformKind::Custom => &[],
        }
    }

    /// Parameters that may be omitted, with the value used when they are.
    pub fn optional_parameters(&self) -> &'static [(&'static str, f64)] {
        match self {
            WaveformKind::Gaussian => &[],
            WaveformKind::ContinuousWave => &[("phase", 0.0), ("start_time", 0.0)],
            WaveformKind::Toneburst => &[("t0", 0.0)],
            WaveformKind::Chirp => &[("t0", 0.0)],
            WaveformKind::Custom => &[("amplitude", 1.0)],
        }
    }

    /// Starting parameter set for a freshly created waveform of this kind.
    ///
    /// Mirrors the presets offered by the waveform editor. Every kind except
    /// `Custom` synthesizes from its preset as is; a custom waveform still
    /// needs at least two samples.
    pub fn preset_parameters(&self) -> BTreeMap<String, f64> {
        let pairs: &[(&str, f64)] = match self {
            WaveformKind::Gaussian => &[("t0", 0.0), ("sigma", 1e-14), ("f0", 1e14), ("amplitude", 1.0)],
            WaveformKind::ContinuousWave => &[("frequency", 1e14), ("amplitude", 1.0)],
            WaveformKind::Toneburst => &[("frequency", 1e14), ("cycles", 5.0), ("amplitude", 1.0)],
            WaveformKind::Chirp => &[("f0", 1e14), ("f1", 2e14), ("duration", 1e-13), ("amplitude", 1.0)],
            WaveformKind::Custom => &[],
        };
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }
}

impl fmt::Display for WaveformKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single user-declared waveform.
///
/// The `id` is the identity key and never changes once assigned. `label` is
/// purely cosmetic and may collide across waveforms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaveformSpec {
    id: String,
    pub label: String,
    pub kind: WaveformKind,
    #[serde(default)]
    pub parameters: BTreeMap<String, f64>,
    /// `(t, value)` pairs; only meaningful for [`WaveformKind::Custom`].
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub samples: Vec<[f64; 2]>,
}

impl WaveformSpec {
    /// Create a waveform with a caller-chosen id.
    pub fn new(
        id: impl Into<String>,
        label: impl Into<String>,
        kind: WaveformKind,
        parameters: BTreeMap<String, f64>,
    ) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            kind,
            parameters,
            samples: Vec::new(),
        }
    }

    /// Create a custom waveform from explicit samples.
    pub fn custom(id: impl Into<String>, label: impl Into<String>, samples: Vec<[f64; 2]>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            kind: WaveformKind::Custom,
            parameters: BTreeMap::new(),
            samples,
        }
    }

    /// Builder-style parameter setter.
    pub fn with_parameter(mut self, name: impl Into<String>, value: f64) -> Self {
        self.parameters.insert(name.into(), value);
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Copy of this spec with replaced parameters, keeping the same id.
    pub fn revised(&self, parameters: BTreeMap<String, f64>) -> Self {
        Self {
            parameters,
            ..self.clone()
        }
    }

    /// Check that the parameter set is complete and free of unknown names.
    ///
    /// Numeric domain checks (sign, finiteness) happen during synthesis.
    pub fn check_parameter_names(&self) -> Result<(), WaveformError> {
        let required = self.kind.required_parameters();
        let optional = self.kind.optional_parameters();

        for name in required {
            if !self.parameters.contains_key(*name) {
                return Err(WaveformError::invalid(&self.id, *name, "missing required parameter"));
            }
        }
        for name in self.parameters.keys() {
            let known = required.contains(&name.as_str())
                || optional.iter().any(|(opt, _)| *opt == name.as_str());
            if !known {
                return Err(WaveformError::invalid(
                    &self.id,
                    name.as_str(),
                    format!("not a parameter of a {} waveform", self.kind),
                ));
            }
        }
        if self.kind != WaveformKind::Custom && !self.samples.is_empty() {
            return Err(WaveformError::invalid(
                &self.id,
                "samples",
                format!("samples are only accepted by custom waveforms, not {}", self.kind),
            ));
        }
        Ok(())
    }

    /// Look up a parameter, falling back to the kind's documented default.
    pub(crate) fn param(&self, name: &str) -> Result<f64, WaveformError> {
        let value = match self.parameters.get(name) {
            Some(v) => *v,
            None => self
                .kind
                .optional_parameters()
                .iter()
                .find(|(opt, _)| *opt == name)
                .map(|(_, default)| *default)
                .ok_or_else(|| WaveformError::invalid(&self.id, name, "missing required parameter"))?,
        };
        if !value.is_finite() {
            return Err(WaveformError::invalid(
                &self.id,
                name,
                format!("expected a finite number, got {value}"),
            ));
        }
        Ok(value)
    }
}
