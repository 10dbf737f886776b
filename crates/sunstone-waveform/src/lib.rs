//! # Sunstone Waveform
//!
//! Time-domain excitation signals for Sunstone simulation sources. A
//! waveform is declared as a [`WaveformSpec`](spec::WaveformSpec) (kind,
//! named parameters, label) and compiled by
//! [`synthesize`](synth::synthesize) into a closed-form signal that previews
//! and backends evaluate identically.
//!
//! ## Waveform kinds
//!
//! | Kind | Parameters | Support |
//! |------|------------|---------|
//! | `gaussian` | `t0`, `sigma`, `f0`, `amplitude` | $t_0 \pm 6\sigma$ |
//! | `continuous-wave` | `frequency`, `amplitude`, `phase`?, `start_time`? | unbounded |
//! | `toneburst` | `frequency`, `cycles`, `amplitude`, `t0`? | `cycles / frequency` |
//! | `chirp` | `f0`, `f1`, `duration`, `amplitude`, `t0`? | `duration` |
//! | `custom` | `samples`, `amplitude`? | sample range |
//!
//! Custom samples are interpolated with natural cubic splines
//! ([`spline::CubicSpline`]).

pub mod spec;
pub mod spline;
pub mod synth;

pub use spec::{WaveformError, WaveformKind, WaveformSpec};
pub use synth::{synthesize, Bandwidth, Support, SynthesizedWaveform, WaveformShape, GAUSSIAN_TRUNCATION};
