//! Job runner: ties together project construction, compilation, dispatch,
//! and result output.

use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use log::info;

use sunstone_core::backend::{Artifact, Spectrum, Trace};
use sunstone_core::dispatch::RunHandle;
use sunstone_core::project::{new_waveform_id, Project};
use sunstone_core::registry::BackendRegistry;
use sunstone_core::types::{SimulationSpec, Source};
use sunstone_core::SpecCompiler;
use sunstone_waveform::WaveformSpec;

use crate::config::ProjectConfig;

/// Build the in-memory project described by a config file.
///
/// Waveforms are added before sources so that every binding can be checked.
pub fn build_project(config: &ProjectConfig) -> Result<Project> {
    let mut project = Project::new();

    for (index, wf) in config.waveforms.iter().enumerate() {
        let label = wf.label.clone().unwrap_or_else(|| format!("{} {}", wf.kind, index + 1));
        let id = wf.id.clone().unwrap_or_else(new_waveform_id);
        let mut spec = WaveformSpec::new(id.clone(), label, wf.kind, wf.resolved_parameters());
        spec.samples = wf.samples.clone();
        project
            .insert_waveform(spec)
            .with_context(|| format!("waveform #{} ('{}')", index + 1, id))?;
    }

    for src in &config.sources {
        let mut source = Source::point(src.id.clone(), src.position)
            .with_kind(src.kind)
            .with_component(src.component)
            .with_size(src.size);
        source.waveform_id = src.waveform.clone();
        project
            .add_source(source)
            .with_context(|| format!("source '{}'", src.id))?;
    }

    Ok(project)
}

/// Build the project and compile it for the configured backend.
pub fn compile_job(registry: &BackendRegistry, config: &ProjectConfig) -> Result<(Project, SimulationSpec)> {
    let project = build_project(config)?;
    let spec = SpecCompiler::new(registry)
        .compile_project(&project, &config.simulation.backend, config.simulation.settings())
        .with_context(|| format!("compiling for backend '{}'", config.simulation.backend))?;
    info!(
        "Compiled {} source(s) for '{}'",
        spec.sources().len(),
        spec.backend()
    );
    Ok((project, spec))
}

/// Sample project waveforms for export.
///
/// Unbounded waveforms are sampled up to `run_time`.
pub fn sample_waveforms(
    project: &Project,
    only: Option<&str>,
    samples: usize,
    run_time: f64,
) -> Result<Vec<Trace>> {
    let selected: Vec<&WaveformSpec> = match only {
        Some(id) => vec![project
            .waveform(id)
            .with_context(|| format!("no waveform with id '{id}'"))?],
        None => project.waveforms().iter().collect(),
    };

    selected
        .into_iter()
        .map(|spec| -> Result<Trace> {
            let synthesized = project.synthesize(spec.id())?;
            let (times, values) = synthesized
                .sample(samples, Some(run_time))
                .with_context(|| format!("sampling waveform '{}'", spec.id()))?
                .into_iter()
                .unzip();
            Ok(Trace {
                source_id: String::new(),
                waveform_id: spec.id().to_string(),
                times,
                values,
            })
        })
        .collect()
}

fn create(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("creating {}", parent.display()))?;
    }
    File::create(path).with_context(|| format!("creating {}", path.display()))
}

/// Write time traces in long format: one row per sample.
pub fn write_traces_csv(traces: &[Trace], path: &Path) -> Result<()> {
    let mut file = create(path)?;
    writeln!(file, "# Sunstone time traces")?;
    writeln!(file, "# Version: {}", env!("CARGO_PKG_VERSION"))?;
    writeln!(file, "#")?;
    writeln!(file, "source_id,waveform_id,t_s,value")?;
    for trace in traces {
        for (t, v) in trace.times.iter().zip(&trace.values) {
            writeln!(file, "{},{},{:.9e},{:.9e}", trace.source_id, trace.waveform_id, t, v)?;
        }
    }
    println!("Traces written to: {}", path.display());
    Ok(())
}

/// Write power spectra in long format: one row per frequency bin.
pub fn write_spectra_csv(spectra: &[Spectrum], path: &Path) -> Result<()> {
    let mut file = create(path)?;
    writeln!(file, "# Sunstone power spectra")?;
    writeln!(file, "# Version: {}", env!("CARGO_PKG_VERSION"))?;
    writeln!(file, "#")?;
    writeln!(file, "source_id,frequency_hz,power")?;
    for spectrum in spectra {
        for (f, p) in spectrum.frequencies_hz.iter().zip(&spectrum.power) {
            writeln!(file, "{},{:.9e},{:.9e}", spectrum.source_id, f, p)?;
        }
    }
    println!("Spectra written to: {}", path.display());
    Ok(())
}

/// Write the full run record as JSON.
pub fn write_run_json(handle: &RunHandle, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(handle).context("serialising run record")?;
    let mut file = create(path)?;
    file.write_all(json.as_bytes())?;
    println!("Run record written to: {}", path.display());
    Ok(())
}

/// Write each artifact to `dir` under its own name.
pub fn write_artifacts(artifacts: &[Artifact], dir: &Path) -> Result<()> {
    for artifact in artifacts {
        let name = Path::new(&artifact.name)
            .file_name()
            .with_context(|| format!("artifact name '{}' is not a file name", artifact.name))?;
        let path = dir.join(name);
        let mut file = create(&path)?;
        file.write_all(artifact.contents.as_bytes())?;
        println!("Artifact written to: {}", path.display());
    }
    Ok(())
}

/// Write every enabled output of a finished run.
pub fn write_outputs(handle: &RunHandle, config: &ProjectConfig, dir: &Path) -> Result<()> {
    let output = &handle.output;
    if config.output.save_traces && !output.traces.is_empty() {
        write_traces_csv(&output.traces, &dir.join("traces.csv"))?;
    }
    if config.output.save_spectra && !output.spectra.is_empty() {
        write_spectra_csv(&output.spectra, &dir.join("spectra.csv"))?;
    }
    if config.output.save_json {
        write_run_json(handle, &dir.join("run.json"))?;
    }
    if config.output.save_artifacts {
        write_artifacts(&output.artifacts, dir)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_config;
    use std::sync::Arc;
    use sunstone_compute::builtin_registry;
    use sunstone_core::Dispatcher;

    const JOB: &str = r#"
        [simulation]
        backend = "synthesis"
        run_time = 1e-12
        options = { samples = 64 }

        [[waveform]]
        id = "wf-pulse"
        label = "pulse"
        kind = "gaussian"
        parameters = { t0 = 0.0, sigma = 1e-14, f0 = 1e14, amplitude = 1.0 }

        [[waveform]]
        kind = "cw"
        preset = true

        [[source]]
        id = "src-1"
        waveform = "wf-pulse"

        [output]
        save_json = true
    "#;

    #[test]
    fn test_build_project_binds_sources() {
        let config = parse_config(JOB).unwrap();
        let project = build_project(&config).unwrap();
        assert_eq!(project.waveforms().len(), 2);
        assert!(project.waveforms()[1].id().starts_with("wf-"));
        assert_eq!(project.source("src-1").unwrap().waveform_id.as_deref(), Some("wf-pulse"));
    }

    #[test]
    fn test_unknown_waveform_reference_fails() {
        let config = parse_config(
            "[simulation]\n[[source]]\nid = \"src-1\"\nwaveform = \"nonexistent\"\n",
        )
        .unwrap();
        let err = build_project(&config).unwrap_err();
        assert!(format!("{err:#}").contains("nonexistent"));
    }

    #[test]
    fn test_custom_samples_survive_generated_id() {
        let config = parse_config(
            "[simulation]\n[[waveform]]\nkind = \"custom\"\nsamples = [[0.0, 0.0], [1.0, 1.0]]\n",
        )
        .unwrap();
        let project = build_project(&config).unwrap();
        assert_eq!(project.waveforms()[0].samples.len(), 2);
    }

    #[test]
    fn test_run_writes_outputs() {
        let config = parse_config(JOB).unwrap();
        let registry = builtin_registry(None).unwrap();
        let (_, spec) = compile_job(&registry, &config).unwrap();
        let handle = Dispatcher::new(Arc::clone(&registry)).dispatch(&spec).unwrap();

        let dir = tempfile::tempdir().unwrap();
        write_outputs(&handle, &config, dir.path()).unwrap();

        let traces = fs::read_to_string(dir.path().join("traces.csv")).unwrap();
        let rows = traces.lines().filter(|l| l.starts_with("src-1,wf-pulse,")).count();
        assert_eq!(rows, 64);
        assert!(dir.path().join("spectra.csv").exists());

        let json: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(dir.path().join("run.json")).unwrap()).unwrap();
        assert_eq!(json["backend"], "synthesis");
    }

    #[test]
    fn test_sample_waveforms_closes_unbounded_support() {
        let config = parse_config(JOB).unwrap();
        let project = build_project(&config).unwrap();
        let traces = sample_waveforms(&project, None, 32, 1e-12).unwrap();
        assert_eq!(traces.len(), 2);
        assert!(traces.iter().all(|t| t.times.len() == 32));
        assert!(sample_waveforms(&project, Some("wf-missing"), 32, 1e-12).is_err());
    }

    #[test]
    fn test_demo_projects_compile() {
        let registry = builtin_registry(None).unwrap();
        for demo in [
            include_str!("../../../demos/gaussian_pulse.toml"),
            include_str!("../../../demos/meep_mixed.toml"),
        ] {
            let config = parse_config(demo).unwrap();
            let (_, spec) = compile_job(&registry, &config).unwrap();
            assert_eq!(spec.backend(), config.simulation.backend);
        }
    }
}
