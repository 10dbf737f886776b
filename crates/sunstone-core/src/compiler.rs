//! Compilation of project state into a backend-validated [`SimulationSpec`].
//!
//! Compilation is pure: it reads the catalog, the sources and the registry
//! snapshot, and either returns a spec or the first failing check. Checks
//! that can implicate several sources (dangling references, unsupported
//! kinds) report every offender at once rather than stopping at the first.
//!
//! | Order | Check | Error |
//! |-------|-------|-------|
//! | 1 | backend is registered | `UnknownBackend` |
//! | 2 | every waveform id resolves | `DanglingWaveformReference` |
//! | 3 | every source is bound | `UnboundSource` |
//! | 4 | waveform kinds supported | `UnsupportedWaveformKind` |
//! | 5 | source kinds supported | `UnsupportedSourceKind` |
//! | 6 | settings are physical | `InvalidSettings` |
//! | 7 | mode, dimensionality, limits | `CapabilityLimitExceeded` |
//! | 8 | backend options match schema | `InvalidBackendOption` |
//! | 9 | waveform parameters valid | `InvalidWaveformParameters` |

use log::debug;
use sunstone_waveform::synthesize;

use crate::capability::CapabilityDescriptor;
use crate::error::{CoreError, CoreResult, DanglingReference, Offender};
use crate::project::{Project, WaveformCatalog};
use crate::registry::BackendRegistry;
use crate::types::{ResolvedSource, SimulationSettings, SimulationSpec, Source};

/// Builds [`SimulationSpec`]s against the backends of a registry.
pub struct SpecCompiler<'r> {
    registry: &'r BackendRegistry,
}

impl<'r> SpecCompiler<'r> {
    pub fn new(registry: &'r BackendRegistry) -> Self {
        Self { registry }
    }

    /// Resolve `sources` through `catalog` and validate the result against
    /// the descriptor of `backend`.
    ///
    /// Source order in the returned spec matches `sources`.
    pub fn compile<C>(
        &self,
        catalog: &C,
        sources: &[Source],
        backend: &str,
        settings: SimulationSettings,
    ) -> CoreResult<SimulationSpec>
    where
        C: WaveformCatalog + ?Sized,
    {
        let entry = self.registry.get(backend)?;
        let resolved = resolve_sources(catalog, sources)?;
        validate_against(&entry.descriptor, &settings, &resolved)?;

        debug!(
            "Compiled {} source(s) for backend '{}'",
            resolved.len(),
            entry.name
        );
        Ok(SimulationSpec::new(entry.name, settings, resolved))
    }

    /// Compile every source of a project.
    pub fn compile_project(
        &self,
        project: &Project,
        backend: &str,
        settings: SimulationSettings,
    ) -> CoreResult<SimulationSpec> {
        self.compile(project, project.sources(), backend, settings)
    }
}

fn resolve_sources<C>(catalog: &C, sources: &[Source]) -> CoreResult<Vec<ResolvedSource>>
where
    C: WaveformCatalog + ?Sized,
{
    let mut dangling = Vec::new();
    let mut unbound = Vec::new();
    let mut resolved = Vec::with_capacity(sources.len());

    for source in sources {
        match &source.waveform_id {
            Some(waveform_id) => match catalog.waveform(waveform_id) {
                Some(waveform) => resolved.push(ResolvedSource::new(source, waveform)),
                None => dangling.push(DanglingReference {
                    source_id: source.id.clone(),
                    waveform_id: waveform_id.clone(),
                }),
            },
            None => unbound.push(source.id.clone()),
        }
    }

    if !dangling.is_empty() {
        return Err(CoreError::DanglingWaveformReference { references: dangling });
    }
    if !unbound.is_empty() {
        return Err(CoreError::UnboundSource { source_ids: unbound });
    }
    Ok(resolved)
}

/// Check resolved sources and settings against a backend descriptor.
///
/// Shared by the compiler and the dispatcher; the latter re-checks specs
/// that were parsed back from preview text.
pub fn validate_against(
    descriptor: &CapabilityDescriptor,
    settings: &SimulationSettings,
    sources: &[ResolvedSource],
) -> CoreResult<()> {
    let backend = &descriptor.name;

    let offenders: Vec<_> = sources
        .iter()
        .filter(|s| !descriptor.supports_waveform(s.waveform.kind))
        .map(|s| Offender {
            source_id: s.id.clone(),
            kind: s.waveform.kind,
        })
        .collect();
    if !offenders.is_empty() {
        return Err(CoreError::UnsupportedWaveformKind {
            backend: backend.clone(),
            offenders,
        });
    }

    let offenders: Vec<_> = sources
        .iter()
        .filter(|s| !descriptor.supports_source(s.kind))
        .map(|s| Offender {
            source_id: s.id.clone(),
            kind: s.kind,
        })
        .collect();
    if !offenders.is_empty() {
        return Err(CoreError::UnsupportedSourceKind {
            backend: backend.clone(),
            offenders,
        });
    }

    check_settings(settings)?;
    check_limits(descriptor, settings, sources.len())?;
    check_options(descriptor, settings)?;

    for source in sources {
        synthesize(&source.waveform)?;
    }
    Ok(())
}

fn check_settings(settings: &SimulationSettings) -> CoreResult<()> {
    let invalid = |field: &str, reason: String| CoreError::InvalidSettings {
        field: field.to_string(),
        reason,
    };

    if !(settings.resolution.is_finite() && settings.resolution > 0.0) {
        return Err(invalid("resolution", format!("expected > 0, got {}", settings.resolution)));
    }
    if !(settings.run_time.is_finite() && settings.run_time > 0.0) {
        return Err(invalid("run_time", format!("expected > 0, got {}", settings.run_time)));
    }
    let axes = settings.dimension.axes();
    for (axis, len) in settings.cell_size.iter().enumerate().take(axes) {
        if !(len.is_finite() && *len > 0.0) {
            return Err(invalid(
                "cell_size",
                format!("axis {axis} of a {} domain must be > 0, got {len}", settings.dimension),
            ));
        }
    }
    Ok(())
}

fn check_limits(descriptor: &CapabilityDescriptor, settings: &SimulationSettings, n_sources: usize) -> CoreResult<()> {
    let exceeded = |limit: &str, allowed: String, actual: String| CoreError::CapabilityLimitExceeded {
        backend: descriptor.name.clone(),
        limit: limit.to_string(),
        allowed,
        actual,
    };
    let list = |items: Vec<String>| format!("[{}]", items.join(", "));

    if !descriptor.modes.contains(&settings.mode) {
        return Err(exceeded(
            "modes",
            list(descriptor.modes.iter().map(|m| m.to_string()).collect()),
            settings.mode.to_string(),
        ));
    }
    if !descriptor.dimensionality.contains(&settings.dimension) {
        return Err(exceeded(
            "dimensionality",
            list(descriptor.dimensionality.iter().map(|d| d.to_string()).collect()),
            settings.dimension.to_string(),
        ));
    }
    if let Some(max) = descriptor.limits.max_sources {
        if n_sources > max {
            return Err(exceeded("max_sources", max.to_string(), n_sources.to_string()));
        }
    }
    if let Some(max) = descriptor.limits.max_grid_cells {
        let cells = settings.grid_cells();
        if cells > max {
            return Err(exceeded("max_grid_cells", max.to_string(), cells.to_string()));
        }
    }
    Ok(())
}

fn check_options(descriptor: &CapabilityDescriptor, settings: &SimulationSettings) -> CoreResult<()> {
    for (name, value) in &settings.options {
        let reason = match descriptor.options.get(name) {
            Some(spec) => match spec.check(value) {
                Ok(()) => continue,
                Err(reason) => reason,
            },
            None => {
                let known: Vec<_> = descriptor.options.keys().map(String::as_str).collect();
                format!("unknown option; accepted options are [{}]", known.join(", "))
            }
        };
        return Err(CoreError::InvalidBackendOption {
            backend: descriptor.name.clone(),
            option: name.clone(),
            reason,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{Backend, BackendFailure, RunOutput};
    use crate::capability::{Limits, OptionSpec};
    use crate::types::{Dimension, OptionValue, SimulationMode, SourceKind};
    use std::sync::Arc;
    use sunstone_waveform::{WaveformKind, WaveformSpec};

    struct Fixed(CapabilityDescriptor);

    impl Backend for Fixed {
        fn descriptor(&self) -> CapabilityDescriptor {
            self.0.clone()
        }

        fn run(&self, _spec: &SimulationSpec) -> Result<RunOutput, BackendFailure> {
            Ok(RunOutput::default())
        }
    }

    fn registry_with(descriptor: CapabilityDescriptor) -> BackendRegistry {
        let registry = BackendRegistry::new();
        registry.register_backend(Arc::new(Fixed(descriptor))).unwrap();
        registry
    }

    fn waveform(id: &str, kind: WaveformKind) -> WaveformSpec {
        WaveformSpec::new(id, id, kind, kind.preset_parameters())
    }

    #[test]
    fn test_reports_every_dangling_reference() {
        let registry = registry_with(
            CapabilityDescriptor::new("synthesis", "Synthesis").with_waveform_kinds(WaveformKind::ALL),
        );
        let catalog = vec![waveform("wf-a", WaveformKind::Gaussian)];
        let sources = vec![
            Source::point("src-1", [0.0; 3]).with_waveform("wf-a"),
            Source::point("src-2", [0.0; 3]).with_waveform("wf-x"),
            Source::point("src-3", [0.0; 3]).with_waveform("wf-y"),
        ];
        let err = SpecCompiler::new(&registry)
            .compile(&catalog, &sources, "synthesis", SimulationSettings::default())
            .unwrap_err();
        match err {
            CoreError::DanglingWaveformReference { references } => {
                let ids: Vec<_> = references.iter().map(|r| r.source_id.as_str()).collect();
                assert_eq!(ids, vec!["src-2", "src-3"]);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_unbound_source_rejected() {
        let registry = registry_with(
            CapabilityDescriptor::new("synthesis", "Synthesis").with_waveform_kinds(WaveformKind::ALL),
        );
        let catalog = vec![waveform("wf-a", WaveformKind::Gaussian)];
        let sources = vec![
            Source::point("src-1", [0.0; 3]),
            Source::point("src-2", [0.0; 3]).with_waveform("wf-a"),
            Source::point("src-3", [0.0; 3]),
        ];
        let err = SpecCompiler::new(&registry)
            .compile(&catalog, &sources, "synthesis", SimulationSettings::default())
            .unwrap_err();
        match err {
            CoreError::UnboundSource { source_ids } => assert_eq!(source_ids, vec!["src-1", "src-3"]),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_unsupported_source_kind() {
        let registry = registry_with(
            CapabilityDescriptor::new("synthesis", "Synthesis")
                .with_waveform_kinds(WaveformKind::ALL)
                .with_source_kinds([SourceKind::Point]),
        );
        let catalog = vec![waveform("wf-a", WaveformKind::Gaussian)];
        let sources = vec![
            Source::point("src-1", [0.0; 3]).with_waveform("wf-a"),
            Source::point("src-2", [0.0; 3])
                .with_kind(SourceKind::PlaneWave)
                .with_waveform("wf-a"),
        ];
        let err = SpecCompiler::new(&registry)
            .compile(&catalog, &sources, "synthesis", SimulationSettings::default())
            .unwrap_err();
        match err {
            CoreError::UnsupportedSourceKind { offenders, .. } => {
                assert_eq!(offenders.len(), 1);
                assert_eq!(offenders[0].source_id, "src-2");
                assert_eq!(offenders[0].kind, SourceKind::PlaneWave);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_limits_report_allowed_and_actual() {
        let registry = registry_with(
            CapabilityDescriptor::new("small", "Small")
                .with_waveform_kinds(WaveformKind::ALL)
                .with_limits(Limits {
                    max_sources: Some(8),
                    max_grid_cells: Some(100),
                }),
        );
        let catalog = vec![waveform("wf-a", WaveformKind::Gaussian)];
        let sources = vec![Source::point("src-1", [0.0; 3]).with_waveform("wf-a")];
        let settings = SimulationSettings {
            dimension: Dimension::TwoD,
            cell_size: [2.0, 1.0, 0.0],
            resolution: 10.0,
            ..Default::default()
        };
        let err = SpecCompiler::new(&registry)
            .compile(&catalog, &sources, "small", settings)
            .unwrap_err();
        match err {
            CoreError::CapabilityLimitExceeded {
                limit, allowed, actual, ..
            } => {
                assert_eq!(limit, "max_grid_cells");
                assert_eq!(allowed, "100");
                assert_eq!(actual, "200");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_oversized_grid_exceeds_limit_without_overflow() {
        let registry = registry_with(
            CapabilityDescriptor::new("capped", "Capped")
                .with_waveform_kinds(WaveformKind::ALL)
                .with_limits(Limits {
                    max_sources: None,
                    max_grid_cells: Some(1_000_000),
                }),
        );
        let catalog = vec![waveform("wf-a", WaveformKind::Gaussian)];
        let sources = vec![Source::point("src-1", [0.0; 3]).with_waveform("wf-a")];
        let oversized = [
            (Dimension::ThreeD, [1e7, 1e7, 1e7], 1e3),
            (Dimension::TwoD, [4_294_967_296.0, 4_294_967_296.0, 0.0], 1.0),
        ];

        for (dimension, cell_size, resolution) in oversized {
            let settings = SimulationSettings {
                dimension,
                cell_size,
                resolution,
                ..Default::default()
            };
            let err = SpecCompiler::new(&registry)
                .compile(&catalog, &sources, "capped", settings)
                .unwrap_err();
            match err {
                CoreError::CapabilityLimitExceeded { limit, actual, .. } => {
                    assert_eq!(limit, "max_grid_cells");
                    assert_eq!(actual, u64::MAX.to_string());
                }
                other => panic!("unexpected {other:?}"),
            }
        }
    }

    #[test]
    fn test_mode_and_dimension_checked() {
        let registry = registry_with(
            CapabilityDescriptor::new("flat", "Flat")
                .with_waveform_kinds(WaveformKind::ALL)
                .with_dimensions([Dimension::OneD, Dimension::TwoD]),
        );
        let catalog = vec![waveform("wf-a", WaveformKind::Gaussian)];
        let sources = vec![Source::point("src-1", [0.0; 3]).with_waveform("wf-a")];
        let compiler = SpecCompiler::new(&registry);

        let three_d = SimulationSettings {
            dimension: Dimension::ThreeD,
            cell_size: [1.0, 1.0, 1.0],
            ..Default::default()
        };
        let err = compiler.compile(&catalog, &sources, "flat", three_d).unwrap_err();
        assert!(matches!(err, CoreError::CapabilityLimitExceeded { ref limit, .. } if limit == "dimensionality"));

        let freq = SimulationSettings {
            mode: SimulationMode::FrequencyDomain,
            ..Default::default()
        };
        let err = compiler.compile(&catalog, &sources, "flat", freq).unwrap_err();
        assert!(matches!(err, CoreError::CapabilityLimitExceeded { ref limit, .. } if limit == "modes"));
    }

    #[test]
    fn test_options_checked_against_schema() {
        let registry = registry_with(
            CapabilityDescriptor::new("meep", "Meep")
                .with_waveform_kinds(WaveformKind::ALL)
                .with_option("pml_thickness", OptionSpec::number("PML", Some(0.0), Some(10.0), None)),
        );
        let catalog = vec![waveform("wf-a", WaveformKind::Gaussian)];
        let sources = vec![Source::point("src-1", [0.0; 3]).with_waveform("wf-a")];
        let compiler = SpecCompiler::new(&registry);

        let ok = SimulationSettings::default().with_option("pml_thickness", OptionValue::Number(1.0));
        assert!(compiler.compile(&catalog, &sources, "meep", ok).is_ok());

        let unknown = SimulationSettings::default().with_option("courant", OptionValue::Number(0.5));
        let err = compiler.compile(&catalog, &sources, "meep", unknown).unwrap_err();
        assert!(matches!(err, CoreError::InvalidBackendOption { ref option, .. } if option == "courant"));
    }

    #[test]
    fn test_non_positive_resolution_rejected() {
        let registry = registry_with(
            CapabilityDescriptor::new("synthesis", "Synthesis").with_waveform_kinds(WaveformKind::ALL),
        );
        let catalog = vec![waveform("wf-a", WaveformKind::Gaussian)];
        let sources = vec![Source::point("src-1", [0.0; 3]).with_waveform("wf-a")];
        let settings = SimulationSettings {
            resolution: 0.0,
            ..Default::default()
        };
        let err = SpecCompiler::new(&registry)
            .compile(&catalog, &sources, "synthesis", settings)
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidSettings { ref field, .. } if field == "resolution"));
    }

    #[test]
    fn test_empty_source_list_compiles() {
        let registry = registry_with(CapabilityDescriptor::new("synthesis", "Synthesis"));
        let catalog: Vec<WaveformSpec> = Vec::new();
        let spec = SpecCompiler::new(&registry)
            .compile(&catalog, &[], "Synthesis", SimulationSettings::default())
            .unwrap();
        assert_eq!(spec.backend(), "synthesis");
        assert!(spec.sources().is_empty());
    }
}
