//! Capability descriptors published by simulation backends.
//!
//! A [`CapabilityDescriptor`] states what a backend accepts: waveform and
//! source kinds, dimensionality, analysis modes, resource limits, and a
//! schema of backend-specific options. The compiler checks every
//! simulation request against the descriptor of its target backend before
//! anything is dispatched.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use sunstone_waveform::WaveformKind;

use crate::types::{Dimension, OptionValue, SimulationMode, SourceKind};

/// Resource ceilings; `None` means unlimited.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Limits {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_sources: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_grid_cells: Option<u64>,
}

/// Schema entry for one backend-specific option.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum OptionSpec {
    Number {
        label: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        min: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        default: Option<f64>,
    },
    Enum {
        label: String,
        values: Vec<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        default: Option<String>,
    },
}

impl OptionSpec {
    pub fn number(label: impl Into<String>, min: Option<f64>, max: Option<f64>, default: Option<f64>) -> Self {
        OptionSpec::Number {
            label: label.into(),
            min,
            max,
            default,
        }
    }

    pub fn choice(label: impl Into<String>, values: &[&str], default: Option<&str>) -> Self {
        OptionSpec::Enum {
            label: label.into(),
            values: values.iter().map(|v| v.to_string()).collect(),
            default: default.map(str::to_string),
        }
    }

    /// Check a supplied value against this schema entry.
    ///
    /// Returns a human-readable reason on failure.
    pub fn check(&self, value: &OptionValue) -> Result<(), String> {
        match (self, value) {
            (OptionSpec::Number { min, max, .. }, OptionValue::Number(n)) => {
                if !n.is_finite() {
                    return Err(format!("expected a finite number, got {n}"));
                }
                if let Some(lo) = min {
                    if n < lo {
                        return Err(format!("expected >= {lo}, got {n}"));
                    }
                }
                if let Some(hi) = max {
                    if n > hi {
                        return Err(format!("expected <= {hi}, got {n}"));
                    }
                }
                Ok(())
            }
            (OptionSpec::Enum { values, .. }, OptionValue::Text(s)) => {
                if values.iter().any(|v| v == s) {
                    Ok(())
                } else {
                    Err(format!("expected one of [{}], got \"{s}\"", values.join(", ")))
                }
            }
            (OptionSpec::Number { .. }, other) => Err(format!("expected a number, got {other}")),
            (OptionSpec::Enum { .. }, other) => Err(format!("expected a string, got {other}")),
        }
    }
}

/// Structured statement of what a backend supports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapabilityDescriptor {
    /// Unique backend key.
    pub name: String,
    /// Display name.
    pub label: String,
    pub modes: BTreeSet<SimulationMode>,
    pub supported_waveform_kinds: BTreeSet<WaveformKind>,
    pub supported_source_kinds: BTreeSet<SourceKind>,
    pub dimensionality: BTreeSet<Dimension>,
    #[serde(default)]
    pub limits: Limits,
    #[serde(default)]
    pub options: BTreeMap<String, OptionSpec>,
}

impl CapabilityDescriptor {
    /// A descriptor accepting no waveform kinds, every source kind and
    /// dimensionality, FDTD mode only, and no limits.
    pub fn new(name: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            label: label.into(),
            modes: BTreeSet::from([SimulationMode::Fdtd]),
            supported_waveform_kinds: BTreeSet::new(),
            supported_source_kinds: SourceKind::ALL.into_iter().collect(),
            dimensionality: Dimension::ALL.into_iter().collect(),
            limits: Limits::default(),
            options: BTreeMap::new(),
        }
    }

    pub fn with_waveform_kinds(mut self, kinds: impl IntoIterator<Item = WaveformKind>) -> Self {
        self.supported_waveform_kinds = kinds.into_iter().collect();
        self
    }

    pub fn with_source_kinds(mut self, kinds: impl IntoIterator<Item = SourceKind>) -> Self {
        self.supported_source_kinds = kinds.into_iter().collect();
        self
    }

    pub fn with_dimensions(mut self, dims: impl IntoIterator<Item = Dimension>) -> Self {
        self.dimensionality = dims.into_iter().collect();
        self
    }

    pub fn with_modes(mut self, modes: impl IntoIterator<Item = SimulationMode>) -> Self {
        self.modes = modes.into_iter().collect();
        self
    }

    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_option(mut self, name: impl Into<String>, spec: OptionSpec) -> Self {
        self.options.insert(name.into(), spec);
        self
    }

    pub fn supports_waveform(&self, kind: WaveformKind) -> bool {
        self.supported_waveform_kinds.contains(&kind)
    }

    pub fn supports_source(&self, kind: SourceKind) -> bool {
        self.supported_source_kinds.contains(&kind)
    }
}
