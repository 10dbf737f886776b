//! Meep FDTD backend.
//!
//! Specs are translated into a self-contained Meep Python script which is
//! run in an external interpreter inside a scratch directory. The script
//! probes the driven field component at every source centre and writes the
//! samples to `fields.csv`, which is read back as traces.
//!
//! Meep works in normalised units: lengths in multiples of a unit length
//! $a$ (the `length_unit` option, metres), frequencies in $c/a$ and times
//! in $a/c$. Positions, cell sizes and resolution are taken to already be in
//! units of $a$.
//!
//! Gaussian pulses and continuous waves are driven through a `CustomSource`
//! evaluating the same closed form as the synthesizer, so the solver sees
//! the same phase as the preview. Meep's own `GaussianSource` and
//! `ContinuousSource` use a complex `exp(-iωt)` convention and are avoided.
//! Every other waveform is tabulated from the synthesized signal.
//!
//! User text (ids and labels) only reaches the script as escaped string
//! literals inside comments; probes are keyed by source index.

use std::fmt::{self, Write as _};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use log::{debug, info};
use sunstone_core::backend::{Artifact, Backend, BackendFailure, RunOutput, Trace};
use sunstone_core::capability::{CapabilityDescriptor, OptionSpec};
use sunstone_core::types::{Dimension, ResolvedSource, SimulationSpec, SourceKind};
use sunstone_waveform::{synthesize, WaveformKind, WaveformShape, GAUSSIAN_TRUNCATION};

/// Registry key of the Meep backend.
pub const NAME: &str = "meep";

/// Speed of light in vacuum (m/s).
const C0: f64 = 299_792_458.0;

const DEFAULT_LENGTH_UNIT: f64 = 1e-6;
const DEFAULT_PML: f64 = 1.0;
const DEFAULT_COURANT: f64 = 0.5;
const TABLE_SAMPLES: usize = 512;
const PROBE_STEPS: f64 = 1000.0;

const SCRIPT_NAME: &str = "simulation.py";
const FIELDS_NAME: &str = "fields.csv";

/// Runs specs through Meep in an external Python interpreter.
pub struct MeepBackend {
    python: PathBuf,
}

impl MeepBackend {
    /// Use `python3` from `PATH`.
    pub fn new() -> Self {
        Self {
            python: PathBuf::from("python3"),
        }
    }

    /// Use a specific interpreter, typically one from an environment with
    /// Meep installed.
    pub fn with_python(python: impl Into<PathBuf>) -> Self {
        Self { python: python.into() }
    }

    pub fn python(&self) -> &Path {
        &self.python
    }
}

impl Default for MeepBackend {
    fn default() -> Self {
        Self::new()
    }
}

struct Units {
    /// Metres per Meep length unit.
    length: f64,
}

impl Units {
    fn time(&self, seconds: f64) -> f64 {
        seconds * C0 / self.length
    }

    fn seconds(&self, meep_time: f64) -> f64 {
        meep_time * self.length / C0
    }

    fn frequency(&self, hz: f64) -> f64 {
        hz * self.length / C0
    }
}

fn units(spec: &SimulationSpec) -> Units {
    Units {
        length: spec
            .settings()
            .number_option("length_unit")
            .unwrap_or(DEFAULT_LENGTH_UNIT),
    }
}

fn python_list(values: impl IntoIterator<Item = f64>) -> String {
    let items: Vec<String> = values.into_iter().map(|v| format!("{v:e}")).collect();
    format!("[{}]", items.join(", "))
}

/// Quote arbitrary text as a Python string literal.
///
/// JSON string escapes are a subset of Python's, and every control
/// character is escaped, so the result can never end a line early.
fn python_str(text: &str) -> Result<String, BackendFailure> {
    serde_json::to_string(text).map_err(|e| BackendFailure::new(format!("failed to quote {text:?}: {e}")))
}

fn vector3(v: [f64; 3], dimension: Dimension) -> String {
    let z = if dimension == Dimension::ThreeD { v[2] } else { 0.0 };
    format!("mp.Vector3({:e}, {:e}, {:e})", v[0], v[1], z)
}

/// Python identifier suffix for a source index.
fn ident(index: usize) -> String {
    format!("src{index}")
}

/// Closed-form Gaussian drive, `cos` carrier referenced to the peak.
fn gaussian_drive(units: &Units, t0: f64, sigma: f64, f0: f64) -> String {
    let start = t0 - GAUSSIAN_TRUNCATION * sigma;
    let end = t0 + GAUSSIAN_TRUNCATION * sigma;
    let (t0, sigma, f0) = (units.time(t0), units.time(sigma), units.frequency(f0));
    format!(
        "mp.CustomSource(src_func=lambda t: np.exp(-((t - {t0:e}) ** 2) / (2 * {sigma:e} ** 2)) * np.cos(2 * np.pi * {f0:e} * (t - {t0:e})), start_time={:e}, end_time={:e}, center_frequency={f0:e})",
        units.time(start),
        units.time(end)
    )
}

/// Closed-form continuous wave, `sin` referenced to the switch-on time.
fn cw_drive(units: &Units, frequency: f64, phase: f64, start_time: f64) -> String {
    let (f, ts) = (units.frequency(frequency), units.time(start_time));
    format!(
        "mp.CustomSource(src_func=lambda t: np.sin(2 * np.pi * {f:e} * (t - {ts:e}) + {phase:e}), start_time={ts:e}, center_frequency={f:e})"
    )
}

fn write_source(
    out: &mut String,
    index: usize,
    source: &ResolvedSource,
    spec: &SimulationSpec,
    units: &Units,
) -> Result<(), BackendFailure> {
    let waveform = synthesize(&source.waveform).map_err(|e| BackendFailure::new(e.to_string()))?;
    let settings = spec.settings();
    let name = ident(index);

    fmt_err(writeln!(
        out,
        "# source {} <- waveform {} {}",
        python_str(&source.id)?,
        python_str(source.waveform.id())?,
        python_str(&source.waveform.label)?
    ))?;

    let (time_expr, amplitude) = match *waveform.shape() {
        WaveformShape::Gaussian {
            t0,
            sigma,
            f0,
            amplitude,
        } => (gaussian_drive(units, t0, sigma, f0), amplitude),
        WaveformShape::ContinuousWave {
            frequency,
            amplitude,
            phase,
            start_time,
        } => (cw_drive(units, frequency, phase, start_time), amplitude),
        _ => {
            let samples = waveform
                .sample(TABLE_SAMPLES, Some(settings.run_time))
                .map_err(|e| BackendFailure::new(e.to_string()))?;
            let end_time = samples.last().map(|(t, _)| *t).unwrap_or(0.0);
            fmt_err(writeln!(
                out,
                "T_{name} = {}",
                python_list(samples.iter().map(|(t, _)| units.time(*t)))
            ))?;
            fmt_err(writeln!(out, "V_{name} = {}", python_list(samples.iter().map(|(_, v)| *v))))?;
            (
                format!(
                    "mp.CustomSource(src_func=lambda t, T=T_{name}, V=V_{name}: np.interp(t, T, V, left=0.0, right=0.0), end_time={:e})",
                    units.time(end_time)
                ),
                1.0,
            )
        }
    };

    let center = vector3(source.position, settings.dimension);
    let size = vector3(source.size, settings.dimension);
    let line = match source.kind {
        SourceKind::Eigenmode => writeln!(
            out,
            "sources.append(mp.EigenModeSource(src={time_expr}, center={center}, size={size}, eig_band=1, amplitude={amplitude:e}))"
        ),
        SourceKind::Point | SourceKind::PlaneWave => writeln!(
            out,
            "sources.append(mp.Source(src={time_expr}, component=mp.{}, center={center}, size={size}, amplitude={amplitude:e}))",
            source.component
        ),
    };
    fmt_err(line)?;
    fmt_err(writeln!(out, "probes.append(({index}, {center}, mp.{}))", source.component))
}

fn fmt_err(result: fmt::Result) -> Result<(), BackendFailure> {
    result.map_err(|e| BackendFailure::new(format!("failed to render Meep script: {e}")))
}

/// Render a spec as a Meep Python script.
pub fn render_script(spec: &SimulationSpec) -> Result<String, BackendFailure> {
    let settings = spec.settings();
    let units = units(spec);
    let pml = settings.number_option("pml_thickness").unwrap_or(DEFAULT_PML);
    let courant = settings.number_option("courant").unwrap_or(DEFAULT_COURANT);
    let run_time = units.time(settings.run_time);

    let mut out = String::new();
    fmt_err(writeln!(out, "import csv\n\nimport meep as mp\nimport numpy as np\n"))?;
    fmt_err(writeln!(out, "# length unit a = {:e} m", units.length))?;
    fmt_err(writeln!(out, "cell = {}", vector3(settings.cell_size, settings.dimension)))?;
    fmt_err(writeln!(out, "resolution = {:e}", settings.resolution))?;
    if pml > 0.0 {
        fmt_err(writeln!(out, "pml_layers = [mp.PML(thickness={pml:e})]"))?;
    } else {
        fmt_err(writeln!(out, "pml_layers = []"))?;
    }
    fmt_err(writeln!(out, "sources = []\nprobes = []\n"))?;

    for (index, source) in spec.sources().iter().enumerate() {
        write_source(&mut out, index, source, spec, &units)?;
    }

    fmt_err(writeln!(
        out,
        "\nsim = mp.Simulation(\n    cell_size=cell,\n    resolution=resolution,\n    boundary_layers=pml_layers,\n    sources=sources,\n    Courant={courant:e},\n)\n"
    ))?;
    fmt_err(writeln!(
        out,
        "rows = []\n\n\ndef record(sim):\n    t = sim.meep_time()\n    for index, pos, comp in probes:\n        rows.append((index, t, sim.get_field_point(comp, pos).real))\n\n"
    ))?;
    fmt_err(writeln!(
        out,
        "sim.run(mp.at_every({:e}, record), until={run_time:e})\n",
        run_time / PROBE_STEPS
    ))?;
    fmt_err(writeln!(
        out,
        "with open({FIELDS_NAME:?}, \"w\", newline=\"\") as f:\n    writer = csv.writer(f)\n    writer.writerow([\"source_index\", \"t\", \"value\"])\n    writer.writerows(rows)"
    ))?;
    Ok(out)
}

/// Parse the probe CSV written by the script into per-source traces.
///
/// Rows are `source_index,t,value`. Times are converted from Meep units
/// back to seconds. Sources with no samples get no trace.
fn parse_fields(csv: &str, spec: &SimulationSpec, units: &Units) -> Result<Vec<Trace>, BackendFailure> {
    let mut traces: Vec<Trace> = spec
        .sources()
        .iter()
        .map(|s| Trace {
            source_id: s.id.clone(),
            waveform_id: s.waveform.id().to_string(),
            times: Vec::new(),
            values: Vec::new(),
        })
        .collect();

    for (lineno, line) in csv.lines().enumerate().skip(1) {
        if line.trim().is_empty() {
            continue;
        }
        let bad = || BackendFailure::new(format!("{FIELDS_NAME} line {}: malformed row", lineno + 1)).with_diagnostics(line.to_string());
        let mut parts = line.split(',').map(str::trim);
        let index: usize = parts.next().and_then(|v| v.parse().ok()).ok_or_else(bad)?;
        let t: f64 = parts.next().and_then(|v| v.parse().ok()).ok_or_else(bad)?;
        let value: f64 = parts.next().and_then(|v| v.parse().ok()).ok_or_else(bad)?;
        let trace = traces.get_mut(index).ok_or_else(bad)?;
        trace.times.push(units.seconds(t));
        trace.values.push(value);
    }

    traces.retain(|tr| !tr.times.is_empty());
    Ok(traces)
}

impl Backend for MeepBackend {
    fn descriptor(&self) -> CapabilityDescriptor {
        CapabilityDescriptor::new(NAME, "Meep FDTD")
            .with_waveform_kinds(WaveformKind::ALL)
            .with_dimensions([Dimension::TwoD, Dimension::ThreeD])
            .with_option(
                "pml_thickness",
                OptionSpec::number("PML thickness (a)", Some(0.0), Some(10.0), Some(DEFAULT_PML)),
            )
            .with_option(
                "length_unit",
                OptionSpec::number("Length unit a (m)", Some(1e-9), Some(1.0), Some(DEFAULT_LENGTH_UNIT)),
            )
            .with_option(
                "courant",
                OptionSpec::number("Courant factor", Some(0.01), Some(0.5), Some(DEFAULT_COURANT)),
            )
    }

    fn translate(&self, spec: &SimulationSpec) -> Option<String> {
        render_script(spec).ok()
    }

    fn run(&self, spec: &SimulationSpec) -> Result<RunOutput, BackendFailure> {
        let script = render_script(spec)?;
        let dir = tempfile::Builder::new()
            .prefix("sunstone-meep-")
            .tempdir()
            .map_err(|e| BackendFailure::new(format!("failed to create run directory: {e}")))?;
        let script_path = dir.path().join(SCRIPT_NAME);
        fs::write(&script_path, &script)
            .map_err(|e| BackendFailure::new(format!("failed to write {}: {e}", script_path.display())))?;

        info!("Running Meep with {} in {}", self.python.display(), dir.path().display());
        let output = Command::new(&self.python)
            .arg(SCRIPT_NAME)
            .current_dir(dir.path())
            .output()
            .map_err(|e| {
                BackendFailure::new(format!(
                    "could not start Python interpreter '{}': {e}",
                    self.python.display()
                ))
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        if !output.status.success() {
            return Err(BackendFailure::new(format!("Meep exited with {}", output.status)).with_diagnostics(stderr));
        }

        let mut result = RunOutput::default();
        match fs::read_to_string(dir.path().join(FIELDS_NAME)) {
            Ok(csv) => {
                result.traces = parse_fields(&csv, spec, &units(spec))?;
                result.artifacts.push(Artifact {
                    name: FIELDS_NAME.to_string(),
                    contents: csv,
                });
            }
            Err(e) => {
                debug!("No {} produced: {}", FIELDS_NAME, e);
                result.notes.push(format!("Meep run produced no {FIELDS_NAME}"));
            }
        }
        result.artifacts.push(Artifact {
            name: SCRIPT_NAME.to_string(),
            contents: script,
        });
        if !stdout.is_empty() {
            result.artifacts.push(Artifact {
                name: "meep.log".to_string(),
                contents: stdout,
            });
        }
        Ok(result)
    }
}
