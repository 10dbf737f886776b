//! Editor-side project state: waveforms and the sources bound to them.
//!
//! Sources hold waveform ids, never the waveforms themselves. The
//! [`Project`] owns both collections and keeps the id references consistent:
//! binding checks that the waveform exists, and deleting a waveform that is
//! still referenced is rejected unless the caller explicitly asks to detach.

use std::collections::BTreeMap;

use log::debug;
use sunstone_waveform::{synthesize, SynthesizedWaveform, WaveformKind, WaveformSpec};
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};
use crate::types::Source;

/// Lookup of waveforms by id.
///
/// The compiler resolves source bindings through this trait, so anything
/// that can answer "which waveform has this id" can feed it.
pub trait WaveformCatalog {
    fn waveform(&self, id: &str) -> Option<&WaveformSpec>;
}

impl WaveformCatalog for [WaveformSpec] {
    fn waveform(&self, id: &str) -> Option<&WaveformSpec> {
        self.iter().find(|w| w.id() == id)
    }
}

impl WaveformCatalog for Vec<WaveformSpec> {
    fn waveform(&self, id: &str) -> Option<&WaveformSpec> {
        self.as_slice().waveform(id)
    }
}

impl WaveformCatalog for BTreeMap<String, WaveformSpec> {
    fn waveform(&self, id: &str) -> Option<&WaveformSpec> {
        self.get(id)
    }
}

/// Generate a fresh waveform id: `wf-` followed by 8 hex characters.
pub fn new_waveform_id() -> String {
    let uuid = Uuid::new_v4().simple().to_string();
    format!("wf-{}", &uuid[..8])
}

/// Waveforms and sources edited together, in insertion order.
#[derive(Debug, Clone, Default)]
pub struct Project {
    waveforms: Vec<WaveformSpec>,
    sources: Vec<Source>,
}

impl Project {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn waveforms(&self) -> &[WaveformSpec] {
        &self.waveforms
    }

    pub fn sources(&self) -> &[Source] {
        &self.sources
    }

    pub fn waveform(&self, id: &str) -> Option<&WaveformSpec> {
        self.waveforms.iter().find(|w| w.id() == id)
    }

    pub fn source(&self, id: &str) -> Option<&Source> {
        self.sources.iter().find(|s| s.id == id)
    }

    fn source_mut(&mut self, id: &str) -> CoreResult<&mut Source> {
        self.sources
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| CoreError::UnknownSource {
                source_id: id.to_string(),
            })
    }

    fn waveform_index(&self, id: &str) -> CoreResult<usize> {
        self.waveforms
            .iter()
            .position(|w| w.id() == id)
            .ok_or_else(|| CoreError::UnknownWaveform {
                waveform_id: id.to_string(),
            })
    }

    /// Create a waveform with a generated id and return that id.
    ///
    /// Parameter names are checked up front; numeric domain errors surface
    /// when the waveform is synthesized or compiled.
    pub fn add_waveform(
        &mut self,
        label: impl Into<String>,
        kind: WaveformKind,
        parameters: BTreeMap<String, f64>,
    ) -> CoreResult<String> {
        let mut id = new_waveform_id();
        while self.waveform(&id).is_some() {
            id = new_waveform_id();
        }
        let spec = WaveformSpec::new(id.clone(), label, kind, parameters);
        spec.check_parameter_names()?;
        self.waveforms.push(spec);
        debug!("Added {} waveform '{}'", kind, id);
        Ok(id)
    }

    /// Insert a waveform whose id was chosen by the caller.
    pub fn insert_waveform(&mut self, spec: WaveformSpec) -> CoreResult<()> {
        if self.waveform(spec.id()).is_some() {
            return Err(CoreError::DuplicateWaveform {
                waveform_id: spec.id().to_string(),
            });
        }
        spec.check_parameter_names()?;
        self.waveforms.push(spec);
        Ok(())
    }

    /// Replace a waveform's parameters. The id, label and kind are kept.
    pub fn update_waveform(&mut self, id: &str, parameters: BTreeMap<String, f64>) -> CoreResult<()> {
        let index = self.waveform_index(id)?;
        let revised = self.waveforms[index].revised(parameters);
        revised.check_parameter_names()?;
        self.waveforms[index] = revised;
        Ok(())
    }

    pub fn relabel_waveform(&mut self, id: &str, label: impl Into<String>) -> CoreResult<()> {
        let index = self.waveform_index(id)?;
        self.waveforms[index].label = label.into();
        Ok(())
    }

    /// Ids of the sources currently bound to `waveform_id`.
    pub fn referencing_sources(&self, waveform_id: &str) -> Vec<String> {
        self.sources
            .iter()
            .filter(|s| s.waveform_id.as_deref() == Some(waveform_id))
            .map(|s| s.id.clone())
            .collect()
    }

    /// Delete a waveform that no source refers to.
    ///
    /// Fails with [`CoreError::WaveformInUse`] otherwise, listing the
    /// referencing sources; the project is unchanged in that case.
    pub fn remove_waveform(&mut self, id: &str) -> CoreResult<WaveformSpec> {
        let index = self.waveform_index(id)?;
        let users = self.referencing_sources(id);
        if !users.is_empty() {
            return Err(CoreError::WaveformInUse {
                waveform_id: id.to_string(),
                source_ids: users,
            });
        }
        Ok(self.waveforms.remove(index))
    }

    /// Delete a waveform and unbind every source that referenced it.
    ///
    /// Returns the removed waveform and the ids of the detached sources.
    pub fn remove_waveform_detaching(&mut self, id: &str) -> CoreResult<(WaveformSpec, Vec<String>)> {
        let index = self.waveform_index(id)?;
        let mut detached = Vec::new();
        for source in self.sources.iter_mut() {
            if source.waveform_id.as_deref() == Some(id) {
                source.waveform_id = None;
                detached.push(source.id.clone());
            }
        }
        if !detached.is_empty() {
            debug!("Detached sources {:?} from waveform '{}'", detached, id);
        }
        Ok((self.waveforms.remove(index), detached))
    }

    /// Add a source. Any waveform it references must already exist.
    pub fn add_source(&mut self, source: Source) -> CoreResult<()> {
        if self.source(&source.id).is_some() {
            return Err(CoreError::DuplicateSource {
                source_id: source.id,
            });
        }
        if let Some(waveform_id) = &source.waveform_id {
            self.waveform_index(waveform_id)?;
        }
        self.sources.push(source);
        Ok(())
    }

    /// Point a source at a waveform, replacing any previous binding.
    pub fn bind(&mut self, source_id: &str, waveform_id: &str) -> CoreResult<()> {
        self.waveform_index(waveform_id)?;
        let source = self.source_mut(source_id)?;
        source.waveform_id = Some(waveform_id.to_string());
        debug!("Bound source '{}' to waveform '{}'", source_id, waveform_id);
        Ok(())
    }

    /// Clear a source's binding, returning the previous waveform id.
    pub fn unbind(&mut self, source_id: &str) -> CoreResult<Option<String>> {
        let source = self.source_mut(source_id)?;
        Ok(source.waveform_id.take())
    }

    /// Synthesize a waveform for preview.
    pub fn synthesize(&self, id: &str) -> CoreResult<SynthesizedWaveform> {
        let index = self.waveform_index(id)?;
        Ok(synthesize(&self.waveforms[index])?)
    }
}

impl WaveformCatalog for Project {
    fn waveform(&self, id: &str) -> Option<&WaveformSpec> {
        Project::waveform(self, id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gaussian(project: &mut Project) -> String {
        project
            .add_waveform("pulse", WaveformKind::Gaussian, WaveformKind::Gaussian.preset_parameters())
            .unwrap()
    }

    #[test]
    fn test_generated_ids_have_prefix() {
        let id = new_waveform_id();
        assert!(id.starts_with("wf-"));
        assert_eq!(id.len(), 11);
        assert!(id[3..].chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_bind_unknown_waveform_rejected() {
        let mut project = Project::new();
        project.add_source(Source::point("src-1", [0.0; 3])).unwrap();
        let err = project.bind("src-1", "wf-missing").unwrap_err();
        assert!(matches!(err, CoreError::UnknownWaveform { .. }));
        assert!(project.source("src-1").unwrap().waveform_id.is_none());
    }

    #[test]
    fn test_bind_unknown_source_rejected() {
        let mut project = Project::new();
        let wf = gaussian(&mut project);
        let err = project.bind("src-9", &wf).unwrap_err();
        assert!(matches!(err, CoreError::UnknownSource { ref source_id } if source_id == "src-9"));
    }

    #[test]
    fn test_remove_in_use_waveform_rejected() {
        let mut project = Project::new();
        let wf = gaussian(&mut project);
        project.add_source(Source::point("src-1", [0.0; 3]).with_waveform(wf.clone())).unwrap();

        let err = project.remove_waveform(&wf).unwrap_err();
        match err {
            CoreError::WaveformInUse { source_ids, .. } => assert_eq!(source_ids, vec!["src-1"]),
            other => panic!("unexpected {other:?}"),
        }
        assert!(project.waveform(&wf).is_some());
    }

    #[test]
    fn test_remove_detaching_unbinds_sources() {
        let mut project = Project::new();
        let wf = gaussian(&mut project);
        project.add_source(Source::point("src-1", [0.0; 3]).with_waveform(wf.clone())).unwrap();
        project.add_source(Source::point("src-2", [0.0; 3])).unwrap();

        let (removed, detached) = project.remove_waveform_detaching(&wf).unwrap();
        assert_eq!(removed.id(), wf);
        assert_eq!(detached, vec!["src-1"]);
        assert!(project.source("src-1").unwrap().waveform_id.is_none());
        assert!(project.waveforms().is_empty());
    }

    #[test]
    fn test_update_keeps_id_and_label() {
        let mut project = Project::new();
        let wf = gaussian(&mut project);
        let mut params = WaveformKind::Gaussian.preset_parameters();
        params.insert("sigma".into(), 5e-15);
        project.update_waveform(&wf, params).unwrap();

        let spec = project.waveform(&wf).unwrap();
        assert_eq!(spec.label, "pulse");
        assert_eq!(spec.parameters["sigma"], 5e-15);
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let mut project = Project::new();
        let spec = WaveformSpec::new("wf-fixed", "a", WaveformKind::ContinuousWave, WaveformKind::ContinuousWave.preset_parameters());
        project.insert_waveform(spec.clone()).unwrap();
        assert!(matches!(project.insert_waveform(spec), Err(CoreError::DuplicateWaveform { .. })));

        project.add_source(Source::point("src-1", [0.0; 3])).unwrap();
        assert!(matches!(
            project.add_source(Source::point("src-1", [1.0; 3])),
            Err(CoreError::DuplicateSource { .. })
        ));
    }

    #[test]
    fn test_synthesize_reports_invalid_parameters() {
        let mut project = Project::new();
        let mut params = WaveformKind::Gaussian.preset_parameters();
        params.insert("sigma".into(), -1.0);
        let wf = project.add_waveform("bad", WaveformKind::Gaussian, params).unwrap();
        assert!(matches!(project.synthesize(&wf), Err(CoreError::InvalidWaveformParameters(_))));
    }
}
