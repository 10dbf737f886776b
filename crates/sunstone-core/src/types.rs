//! Core types shared across the Sunstone pipeline.
//!
//! This module defines the user-facing sources, the global simulation
//! settings, and the compiled [`SimulationSpec`] handed to backends.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use sunstone_waveform::WaveformSpec;

/// How a source couples into the simulation domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceKind {
    /// Point (or finite-volume) current source.
    Point,
    /// Plane wave injected across a source plane.
    PlaneWave,
    /// Waveguide eigenmode launched across a source plane.
    Eigenmode,
}

impl SourceKind {
    pub const ALL: [SourceKind; 3] = [SourceKind::Point, SourceKind::PlaneWave, SourceKind::Eigenmode];

    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Point => "point",
            SourceKind::PlaneWave => "plane-wave",
            SourceKind::Eigenmode => "eigenmode",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Field component a source drives (its polarisation).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldComponent {
    Ex,
    Ey,
    Ez,
    Hx,
    Hy,
    Hz,
}

impl fmt::Display for FieldComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FieldComponent::Ex => "Ex",
            FieldComponent::Ey => "Ey",
            FieldComponent::Ez => "Ez",
            FieldComponent::Hx => "Hx",
            FieldComponent::Hy => "Hy",
            FieldComponent::Hz => "Hz",
        };
        f.write_str(name)
    }
}

/// Spatial dimensionality of a simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Dimension {
    #[serde(rename = "1d")]
    OneD,
    #[serde(rename = "2d")]
    TwoD,
    #[serde(rename = "3d")]
    ThreeD,
}

impl Dimension {
    pub const ALL: [Dimension; 3] = [Dimension::OneD, Dimension::TwoD, Dimension::ThreeD];

    /// Number of active spatial axes.
    pub fn axes(&self) -> usize {
        match self {
            Dimension::OneD => 1,
            Dimension::TwoD => 2,
            Dimension::ThreeD => 3,
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}d", self.axes())
    }
}

/// Analysis mode requested of the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SimulationMode {
    Fdtd,
    FrequencyDomain,
}

impl fmt::Display for SimulationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimulationMode::Fdtd => f.write_str("fdtd"),
            SimulationMode::FrequencyDomain => f.write_str("frequency-domain"),
        }
    }
}

/// Value of a backend-specific option.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OptionValue {
    Number(f64),
    Text(String),
}

impl fmt::Display for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionValue::Number(n) => write!(f, "{n}"),
            OptionValue::Text(s) => write!(f, "\"{s}\""),
        }
    }
}

/// A placed emitter in the simulation domain.
///
/// The waveform is referenced by id only; the project owns the waveform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Source {
    pub id: String,
    #[serde(default = "default_source_kind")]
    pub kind: SourceKind,
    #[serde(default = "default_component")]
    pub component: FieldComponent,
    /// Centre of the source (simulation length units).
    #[serde(default)]
    pub position: [f64; 3],
    /// Extent of the source; zero for a point source.
    #[serde(default)]
    pub size: [f64; 3],
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub waveform_id: Option<String>,
}

fn default_source_kind() -> SourceKind {
    SourceKind::Point
}

fn default_component() -> FieldComponent {
    FieldComponent::Ez
}

impl Source {
    /// An unbound, `Ez`-polarised point source.
    pub fn point(id: impl Into<String>, position: [f64; 3]) -> Self {
        Self {
            id: id.into(),
            kind: SourceKind::Point,
            component: FieldComponent::Ez,
            position,
            size: [0.0; 3],
            waveform_id: None,
        }
    }

    pub fn with_kind(mut self, kind: SourceKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_component(mut self, component: FieldComponent) -> Self {
        self.component = component;
        self
    }

    pub fn with_size(mut self, size: [f64; 3]) -> Self {
        self.size = size;
        self
    }

    pub fn with_waveform(mut self, waveform_id: impl Into<String>) -> Self {
        self.waveform_id = Some(waveform_id.into());
        self
    }
}

/// Global settings applying to the whole simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationSettings {
    #[serde(default = "default_mode")]
    pub mode: SimulationMode,
    pub dimension: Dimension,
    /// Domain size along x, y, z. Inactive axes are ignored.
    pub cell_size: [f64; 3],
    /// Grid cells per unit length.
    pub resolution: f64,
    /// Simulated time span (seconds).
    pub run_time: f64,
    /// Backend-specific tunables, validated against the backend's option schema.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub options: BTreeMap<String, OptionValue>,
}

fn default_mode() -> SimulationMode {
    SimulationMode::Fdtd
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            mode: SimulationMode::Fdtd,
            dimension: Dimension::TwoD,
            cell_size: [1.0, 1.0, 0.0],
            resolution: 20.0,
            run_time: 2e-12,
            options: BTreeMap::new(),
        }
    }
}

impl SimulationSettings {
    /// Total number of grid cells over the active axes.
    ///
    /// Each active axis contributes $\lceil L \cdot r \rceil$ cells, at least one.
    /// Saturates at `u64::MAX` so an oversized grid never wraps below a limit.
    pub fn grid_cells(&self) -> u64 {
        self.cell_size
            .iter()
            .take(self.dimension.axes())
            // `as` saturates for out-of-range floats.
            .map(|len| ((len * self.resolution).ceil() as u64).max(1))
            .try_fold(1u64, |acc, cells| acc.checked_mul(cells))
            .unwrap_or(u64::MAX)
    }

    pub fn with_option(mut self, name: impl Into<String>, value: OptionValue) -> Self {
        self.options.insert(name.into(), value);
        self
    }

    /// Numeric option lookup.
    pub fn number_option(&self, name: &str) -> Option<f64> {
        match self.options.get(name)? {
            OptionValue::Number(n) => Some(*n),
            OptionValue::Text(_) => None,
        }
    }

    /// Text option lookup.
    pub fn text_option(&self, name: &str) -> Option<&str> {
        match self.options.get(name)? {
            OptionValue::Text(s) => Some(s),
            OptionValue::Number(_) => None,
        }
    }
}

/// A source with its waveform reference resolved to the full waveform spec.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedSource {
    pub id: String,
    pub kind: SourceKind,
    pub component: FieldComponent,
    pub position: [f64; 3],
    pub size: [f64; 3],
    pub waveform: WaveformSpec,
}

impl ResolvedSource {
    pub(crate) fn new(source: &Source, waveform: &WaveformSpec) -> Self {
        Self {
            id: source.id.clone(),
            kind: source.kind,
            component: source.component,
            position: source.position,
            size: source.size,
            waveform: waveform.clone(),
        }
    }

    /// The unresolved source this was built from.
    pub fn source(&self) -> Source {
        Source {
            id: self.id.clone(),
            kind: self.kind,
            component: self.component,
            position: self.position,
            size: self.size,
            waveform_id: Some(self.waveform.id().to_string()),
        }
    }
}

/// The fully resolved document submitted to a backend.
///
/// Built by [`SpecCompiler`](crate::compiler::SpecCompiler); immutable once
/// constructed. Source order is the order given to the compiler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationSpec {
    backend: String,
    settings: SimulationSettings,
    sources: Vec<ResolvedSource>,
}

impl SimulationSpec {
    pub(crate) fn new(backend: String, settings: SimulationSettings, sources: Vec<ResolvedSource>) -> Self {
        Self {
            backend,
            settings,
            sources,
        }
    }

    /// Name of the backend this spec was validated against.
    pub fn backend(&self) -> &str {
        &self.backend
    }

    pub fn mode(&self) -> SimulationMode {
        self.settings.mode
    }

    pub fn settings(&self) -> &SimulationSettings {
        &self.settings
    }

    pub fn sources(&self) -> &[ResolvedSource] {
        &self.sources
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_cells_ignores_inactive_axes() {
        let settings = SimulationSettings {
            dimension: Dimension::TwoD,
            cell_size: [2.0, 1.5, 100.0],
            resolution: 10.0,
            ..Default::default()
        };
        assert_eq!(settings.grid_cells(), 20 * 15);
    }

    #[test]
    fn test_grid_cells_at_least_one_per_axis() {
        let settings = SimulationSettings {
            dimension: Dimension::ThreeD,
            cell_size: [1.0, 1.0, 0.0],
            resolution: 4.0,
            ..Default::default()
        };
        assert_eq!(settings.grid_cells(), 16);
    }

    #[test]
    fn test_grid_cells_saturates_instead_of_wrapping() {
        let huge = SimulationSettings {
            dimension: Dimension::ThreeD,
            cell_size: [1e7; 3],
            resolution: 1e3,
            ..Default::default()
        };
        assert_eq!(huge.grid_cells(), u64::MAX);

        // 2^32 * 2^32 wraps to zero in plain u64 arithmetic.
        let wrapping = SimulationSettings {
            dimension: Dimension::TwoD,
            cell_size: [4_294_967_296.0, 4_294_967_296.0, 0.0],
            resolution: 1.0,
            ..Default::default()
        };
        assert_eq!(wrapping.grid_cells(), u64::MAX);
    }
}
