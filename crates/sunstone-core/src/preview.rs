//! Human-readable preview text for compiled specs.
//!
//! The preview is pretty-printed JSON. Every resolved source embeds its
//! waveform verbatim, id and label included, so the text can be inspected
//! before dispatch and parsed back into an identical [`SimulationSpec`].

use crate::error::CoreResult;
use crate::types::SimulationSpec;

/// Render a spec as preview text.
pub fn to_preview_text(spec: &SimulationSpec) -> CoreResult<String> {
    Ok(serde_json::to_string_pretty(spec)?)
}

/// Parse preview text back into a spec.
///
/// The result has not been validated against any backend; the dispatcher
/// re-checks it before running.
pub fn from_preview_text(text: &str) -> CoreResult<SimulationSpec> {
    Ok(serde_json::from_str(text)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;
    use crate::types::{ResolvedSource, SimulationSettings, Source};
    use sunstone_waveform::{WaveformKind, WaveformSpec};

    fn spec() -> SimulationSpec {
        let waveform = WaveformSpec::new("wf-1a2b3c4d", "probe pulse", WaveformKind::Gaussian, Default::default())
            .with_parameter("t0", 3.0e-14)
            .with_parameter("sigma", 1.0 / 3.0 * 1e-14)
            .with_parameter("f0", 193.414e12)
            .with_parameter("amplitude", 0.1);
        let source = Source::point("src-1", [0.1, -0.2, 0.0]).with_waveform("wf-1a2b3c4d");
        SimulationSpec::new(
            "synthesis".into(),
            SimulationSettings::default(),
            vec![ResolvedSource::new(&source, &waveform)],
        )
    }

    #[test]
    fn test_preview_embeds_waveform_identity() {
        let text = to_preview_text(&spec()).unwrap();
        assert!(text.contains("\"wf-1a2b3c4d\""));
        assert!(text.contains("\"probe pulse\""));
        assert!(text.contains("\"gaussian\""));
    }

    #[test]
    fn test_preview_parses_back_exactly() {
        let original = spec();
        let parsed = from_preview_text(&to_preview_text(&original).unwrap()).unwrap();
        assert_eq!(parsed, original);
    }

    #[test]
    fn test_malformed_preview_rejected() {
        let err = from_preview_text("{\"backend\": \"synthesis\"").unwrap_err();
        assert!(matches!(err, CoreError::Preview(_)));
    }
}
