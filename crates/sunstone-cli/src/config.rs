//! TOML deserialisation for Sunstone project files.
//!
//! ```toml
//! [simulation]
//! backend = "synthesis"
//! dimension = "2d"
//! cell_size = [4.0, 4.0, 0.0]
//! resolution = 20
//! run_time = 2e-12
//!
//! [[waveform]]
//! id = "wf-pulse"
//! label = "probe pulse"
//! kind = "gaussian"
//! parameters = { t0 = 0.0, sigma = 1e-14, f0 = 1.9e14, amplitude = 1.0 }
//!
//! [[source]]
//! id = "src-1"
//! position = [0.0, 0.0, 0.0]
//! waveform = "wf-pulse"
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Deserialize;
use sunstone_core::types::{
    Dimension, FieldComponent, OptionValue, SimulationMode, SimulationSettings, SourceKind,
};
use sunstone_waveform::WaveformKind;

/// Top-level project configuration.
#[derive(Debug, Deserialize)]
pub struct ProjectConfig {
    pub simulation: SimulationConfig,
    #[serde(default, rename = "waveform")]
    pub waveforms: Vec<WaveformConfig>,
    #[serde(default, rename = "source")]
    pub sources: Vec<SourceConfig>,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Global simulation settings and backend selection.
#[derive(Debug, Deserialize)]
pub struct SimulationConfig {
    /// Registry key of the backend to compile for (default: "synthesis").
    #[serde(default = "default_backend")]
    pub backend: String,
    #[serde(default = "default_mode")]
    pub mode: SimulationMode,
    #[serde(default = "default_dimension")]
    pub dimension: Dimension,
    #[serde(default = "default_cell_size")]
    pub cell_size: [f64; 3],
    /// Grid cells per unit length.
    #[serde(default = "default_resolution")]
    pub resolution: f64,
    /// Simulated time span in seconds.
    #[serde(default = "default_run_time")]
    pub run_time: f64,
    /// Interpreter for backends that run Python (Meep).
    #[serde(default)]
    pub python: Option<PathBuf>,
    /// Backend-specific options.
    #[serde(default)]
    pub options: BTreeMap<String, OptionValue>,
}

fn default_backend() -> String {
    "synthesis".into()
}
fn default_mode() -> SimulationMode {
    SimulationMode::Fdtd
}
fn default_dimension() -> Dimension {
    Dimension::TwoD
}
fn default_cell_size() -> [f64; 3] {
    [1.0, 1.0, 0.0]
}
fn default_resolution() -> f64 {
    20.0
}
fn default_run_time() -> f64 {
    2e-12
}

impl SimulationConfig {
    pub fn settings(&self) -> SimulationSettings {
        SimulationSettings {
            mode: self.mode,
            dimension: self.dimension,
            cell_size: self.cell_size,
            resolution: self.resolution,
            run_time: self.run_time,
            options: self.options.clone(),
        }
    }
}

/// A waveform declaration.
#[derive(Debug, Deserialize)]
pub struct WaveformConfig {
    /// Stable id; generated when omitted.
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
    pub kind: WaveformKind,
    /// Parameters; the kind's preset values fill anything left out when
    /// `preset = true`.
    #[serde(default)]
    pub parameters: BTreeMap<String, f64>,
    #[serde(default)]
    pub preset: bool,
    /// `[t, value]` pairs for custom waveforms.
    #[serde(default)]
    pub samples: Vec<[f64; 2]>,
}

impl WaveformConfig {
    /// Parameters after merging in presets, if requested.
    pub fn resolved_parameters(&self) -> BTreeMap<String, f64> {
        if !self.preset {
            return self.parameters.clone();
        }
        let mut merged = self.kind.preset_parameters();
        merged.extend(self.parameters.iter().map(|(k, v)| (k.clone(), *v)));
        merged
    }
}

/// A source placement.
#[derive(Debug, Deserialize)]
pub struct SourceConfig {
    pub id: String,
    #[serde(default = "default_source_kind")]
    pub kind: SourceKind,
    #[serde(default = "default_component")]
    pub component: FieldComponent,
    #[serde(default)]
    pub position: [f64; 3],
    #[serde(default)]
    pub size: [f64; 3],
    /// Id of the bound waveform.
    #[serde(default)]
    pub waveform: Option<String>,
}

fn default_source_kind() -> SourceKind {
    SourceKind::Point
}
fn default_component() -> FieldComponent {
    FieldComponent::Ez
}

/// Output configuration.
#[derive(Debug, Deserialize)]
pub struct OutputConfig {
    /// Output directory (default: "./output").
    #[serde(default = "default_output_dir")]
    pub directory: String,
    /// Whether to save time traces as CSV (default: true).
    #[serde(default = "default_true")]
    pub save_traces: bool,
    /// Whether to save power spectra as CSV (default: true).
    #[serde(default = "default_true")]
    pub save_spectra: bool,
    /// Whether to also save the full run record as JSON (default: false).
    #[serde(default)]
    pub save_json: bool,
    /// Whether to write backend artifacts (scripts, logs) (default: true).
    #[serde(default = "default_true")]
    pub save_artifacts: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: default_output_dir(),
            save_traces: true,
            save_spectra: true,
            save_json: false,
            save_artifacts: true,
        }
    }
}

fn default_output_dir() -> String {
    "./output".into()
}
fn default_true() -> bool {
    true
}

/// Load and parse a TOML project file.
pub fn load_config(path: &Path) -> anyhow::Result<ProjectConfig> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    parse_config(&content).with_context(|| format!("parsing {}", path.display()))
}

pub fn parse_config(content: &str) -> anyhow::Result<ProjectConfig> {
    Ok(toml::from_str(content)?)
}
