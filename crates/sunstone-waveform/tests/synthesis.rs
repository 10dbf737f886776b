//! Integration tests for waveform synthesis.
//!
//! - Per-kind formulas (Gaussian envelope and carrier, toneburst window,
//!   chirp phase, custom spline)
//! - Parameter domain validation
//! - Idempotence of repeated synthesis

use std::f64::consts::PI;

use approx::assert_relative_eq;

use sunstone_waveform::{synthesize, Support, WaveformError, WaveformKind, WaveformSpec};

fn gaussian(label: &str, t0: f64, sigma: f64, f0: f64, amplitude: f64) -> WaveformSpec {
    WaveformSpec::new("wf-gauss", label, WaveformKind::Gaussian, Default::default())
        .with_parameter("t0", t0)
        .with_parameter("sigma", sigma)
        .with_parameter("f0", f0)
        .with_parameter("amplitude", amplitude)
}

fn invalid_parameter(err: WaveformError) -> String {
    match err {
        WaveformError::InvalidParameters { parameter, .. } => parameter,
        other => panic!("expected InvalidParameters, got {other:?}"),
    }
}

// ─────────────────────────────────────────────────────────────
// Gaussian
// ─────────────────────────────────────────────────────────────

#[test]
fn test_gaussian_bare_envelope_when_f0_is_zero() {
    let wf = synthesize(&gaussian("g", 0.0, 1e-9, 0.0, 2.0)).unwrap();
    assert_relative_eq!(wf.evaluate(0.0), 2.0);
    // One sigma out: A·exp(-1/2)
    assert_relative_eq!(wf.evaluate(1e-9), 2.0 * (-0.5_f64).exp(), epsilon = 1e-12);
    assert_relative_eq!(wf.evaluate(-1e-9), wf.evaluate(1e-9), epsilon = 1e-15);
}

#[test]
fn test_gaussian_with_carrier() {
    let (t0, sigma, f0) = (5e-15, 2e-15, 3e14);
    let wf = synthesize(&gaussian("g", t0, sigma, f0, 1.0)).unwrap();
    let t = 6e-15;
    let expected = (-(t - t0) * (t - t0) / (2.0 * sigma * sigma)).exp() * (2.0 * PI * f0 * (t - t0)).cos();
    assert_relative_eq!(wf.evaluate(t), expected, epsilon = 1e-12);
    assert_relative_eq!(wf.bandwidth().center_hz, f0);
    assert_relative_eq!(wf.bandwidth().width_hz, 1.0 / (2.0 * PI * sigma));
}

#[test]
fn test_gaussian_support_is_six_sigma() {
    let wf = synthesize(&gaussian("g", 1.0, 0.5, 0.0, 1.0)).unwrap();
    assert_eq!(wf.support(), Support::bounded(-2.0, 4.0));
}

#[test]
fn test_negative_sigma_rejected() {
    let err = synthesize(&gaussian("g", 0.0, -1.0, 0.0, 1.0)).unwrap_err();
    assert_eq!(err.waveform_id(), "wf-gauss");
    assert_eq!(invalid_parameter(err), "sigma");
}

#[test]
fn test_negative_carrier_rejected() {
    let err = synthesize(&gaussian("g", 0.0, 1.0, -1.0, 1.0)).unwrap_err();
    assert_eq!(invalid_parameter(err), "f0");
}

#[test]
fn test_missing_parameter_rejected() {
    let mut spec = gaussian("g", 0.0, 1.0, 0.0, 1.0);
    spec.parameters.remove("amplitude");
    assert_eq!(invalid_parameter(synthesize(&spec).unwrap_err()), "amplitude");
}

#[test]
fn test_non_finite_parameter_rejected() {
    let spec = gaussian("g", f64::NAN, 1.0, 0.0, 1.0);
    assert_eq!(invalid_parameter(synthesize(&spec).unwrap_err()), "t0");
}

// ─────────────────────────────────────────────────────────────
// Continuous wave
// ─────────────────────────────────────────────────────────────

#[test]
fn test_cw_zero_frequency_rejected() {
    let spec = WaveformSpec::new("wf-cw", "cw", WaveformKind::ContinuousWave, Default::default())
        .with_parameter("frequency", 0.0)
        .with_parameter("amplitude", 1.0);
    assert_eq!(invalid_parameter(synthesize(&spec).unwrap_err()), "frequency");
}

#[test]
fn test_cw_switches_on_at_start_time() {
    let spec = WaveformSpec::new("wf-cw", "cw", WaveformKind::ContinuousWave, Default::default())
        .with_parameter("frequency", 1.0)
        .with_parameter("amplitude", 3.0)
        .with_parameter("start_time", 2.0);
    let wf = synthesize(&spec).unwrap();
    assert_eq!(wf.evaluate(1.9), 0.0);
    assert_relative_eq!(wf.evaluate(2.25), 3.0, epsilon = 1e-12);
    assert!(!wf.support().is_bounded());
}

// ─────────────────────────────────────────────────────────────
// Toneburst and chirp
// ─────────────────────────────────────────────────────────────

#[test]
fn test_toneburst_window_closes_at_both_ends() {
    let spec = WaveformSpec::new("wf-tb", "tb", WaveformKind::Toneburst, Default::default())
        .with_parameter("frequency", 1.0)
        .with_parameter("cycles", 4.0)
        .with_parameter("amplitude", 1.0);
    let wf = synthesize(&spec).unwrap();
    assert_eq!(wf.support(), Support::bounded(0.0, 4.0));
    assert_relative_eq!(wf.evaluate(0.0), 0.0, epsilon = 1e-12);
    assert_relative_eq!(wf.evaluate(4.0), 0.0, epsilon = 1e-12);
    // Peak of the window coincides with a carrier maximum at t = 2.25
    assert!(wf.evaluate(2.25) > 0.9);
}

#[test]
fn test_chirp_instantaneous_frequency_sweeps() {
    let spec = WaveformSpec::new("wf-ch", "ch", WaveformKind::Chirp, Default::default())
        .with_parameter("f0", 1.0)
        .with_parameter("f1", 3.0)
        .with_parameter("duration", 2.0)
        .with_parameter("amplitude", 1.0);
    let wf = synthesize(&spec).unwrap();
    // phase(τ) = 2π(τ + τ²/2): at τ = 0.5 → 2π·0.625
    assert_relative_eq!(wf.evaluate(0.5), (2.0 * PI * 0.625).sin(), epsilon = 1e-12);
    assert_relative_eq!(wf.bandwidth().center_hz, 2.0);
    assert_relative_eq!(wf.bandwidth().width_hz, 2.0);
    assert_eq!(wf.evaluate(2.5), 0.0);
}

// ─────────────────────────────────────────────────────────────
// Custom
// ─────────────────────────────────────────────────────────────

#[test]
fn test_custom_interpolates_samples() {
    let spec = WaveformSpec::custom("wf-c", "ramp", vec![[0.0, 0.0], [1.0, 1.0], [2.0, 0.0]])
        .with_parameter("amplitude", 2.0);
    let wf = synthesize(&spec).unwrap();
    assert_relative_eq!(wf.evaluate(1.0), 2.0, epsilon = 1e-12);
    assert_eq!(wf.support(), Support::bounded(0.0, 2.0));
    assert_relative_eq!(wf.bandwidth().width_hz, 0.5);
}

#[test]
fn test_custom_requires_increasing_samples() {
    let spec = WaveformSpec::custom("wf-c", "bad", vec![[1.0, 0.0], [0.0, 1.0]]);
    assert_eq!(invalid_parameter(synthesize(&spec).unwrap_err()), "samples");
}

#[test]
fn test_presets_synthesize_except_custom() {
    for kind in WaveformKind::ALL {
        let result = synthesize(&WaveformSpec::new("wf-p", "p", kind, kind.preset_parameters()));
        if kind == WaveformKind::Custom {
            assert_eq!(invalid_parameter(result.unwrap_err()), "samples");
        } else {
            assert!(result.is_ok(), "{kind} preset does not synthesize");
        }
    }
}

#[test]
fn test_samples_rejected_on_analytic_kinds() {
    let mut spec = gaussian("g", 0.0, 1.0, 0.0, 1.0);
    spec.samples = vec![[0.0, 1.0], [1.0, 0.0]];
    assert_eq!(invalid_parameter(synthesize(&spec).unwrap_err()), "samples");
}

// ─────────────────────────────────────────────────────────────
// Idempotence
// ─────────────────────────────────────────────────────────────

#[test]
fn test_synthesis_is_idempotent_for_every_preset() {
    for kind in WaveformKind::ALL {
        let spec = if kind == WaveformKind::Custom {
            WaveformSpec::custom("wf-x", "x", vec![[0.0, 0.0], [1e-15, 1.0], [3e-15, -0.5]])
        } else {
            WaveformSpec::new("wf-x", "x", kind, kind.preset_parameters())
        };
        let a = synthesize(&spec).unwrap();
        let b = synthesize(&spec).unwrap();
        assert_eq!(a, b, "{kind} synthesis not idempotent");
        let window = Some(1e-13);
        assert_eq!(a.sample(64, window).unwrap(), b.sample(64, window).unwrap());
    }
}

#[test]
fn test_revision_keeps_id_but_changes_signal() {
    let spec = gaussian("g", 0.0, 1.0, 0.0, 1.0);
    let mut params = spec.parameters.clone();
    params.insert("amplitude".into(), 5.0);
    let revised = spec.revised(params);

    let before = synthesize(&spec).unwrap();
    let after = synthesize(&revised).unwrap();
    assert_eq!(before.waveform_id(), after.waveform_id());
    assert_ne!(before, after);
    assert_relative_eq!(after.evaluate(0.0), 5.0);
}
