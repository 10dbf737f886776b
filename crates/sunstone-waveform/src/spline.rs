//! Natural cubic spline through user-supplied waveform samples.
//!
//! Custom waveforms arrive as a sparse list of `(t, value)` points. The
//! spline gives a smooth excitation between them so that a backend stepping
//! on a finer time grid than the samples sees no staircase artefacts.

/// A natural cubic spline interpolator for real-valued data.
///
/// Given $n$ knots $(t_i, y_i)$, constructs piecewise cubic polynomials
/// with continuous first and second derivatives and zero curvature at both
/// ends.
#[derive(Debug, Clone, PartialEq)]
pub struct CubicSpline {
    /// Strictly increasing knot positions.
    xs: Vec<f64>,
    /// Values at the knots.
    ys: Vec<f64>,
    /// Second derivatives at each knot (computed during construction).
    y2s: Vec<f64>,
}

impl CubicSpline {
    /// Build a spline from `[t, value]` pairs.
    ///
    /// Returns `None` if fewer than two points are given or the knot
    /// positions are not strictly increasing.
    pub fn from_samples(samples: &[[f64; 2]]) -> Option<Self> {
        if samples.len() < 2 {
            return None;
        }
        if samples.windows(2).any(|w| w[1][0] <= w[0][0]) {
            return None;
        }
        let xs = samples.iter().map(|s| s[0]).collect();
        let ys = samples.iter().map(|s| s[1]).collect();
        Some(Self::solve(xs, ys))
    }

    fn solve(xs: Vec<f64>, ys: Vec<f64>) -> Self {
        let n = xs.len();
        let mut y2s = vec![0.0; n];
        let mut u = vec![0.0; n - 1];

        // Forward sweep (tridiagonal system for natural spline)
        for i in 1..n - 1 {
            let sig = (xs[i] - xs[i - 1]) / (xs[i + 1] - xs[i - 1]);
            let p = sig * y2s[i - 1] + 2.0;
            y2s[i] = (sig - 1.0) / p;
            u[i] = (ys[i + 1] - ys[i]) / (xs[i + 1] - xs[i])
                - (ys[i] - ys[i - 1]) / (xs[i] - xs[i - 1]);
            u[i] = (6.0 * u[i] / (xs[i + 1] - xs[i - 1]) - sig * u[i - 1]) / p;
        }

        for k in (0..n - 2).rev() {
            y2s[k + 1] = y2s[k + 1] * y2s[k + 2] + u[k + 1];
        }

        Self { xs, ys, y2s }
    }

    /// First and last knot positions.
    pub fn range(&self) -> (f64, f64) {
        (self.xs[0], self.xs[self.xs.len() - 1])
    }

    /// Smallest spacing between consecutive knots.
    pub fn min_spacing(&self) -> f64 {
        self.xs
            .windows(2)
            .map(|w| w[1] - w[0])
            .fold(f64::INFINITY, f64::min)
    }

    /// Evaluate the spline; zero outside the knot range.
    pub fn evaluate(&self, x: f64) -> f64 {
        let (start, end) = self.range();
        if x < start || x > end {
            return 0.0;
        }

        let n = self.xs.len();
        let mut lo = 0;
        let mut hi = n - 1;
        while hi - lo > 1 {
            let mid = (lo + hi) / 2;
            if self.xs[mid] > x {
                hi = mid;
            } else {
                lo = mid;
            }
        }

        let h = self.xs[hi] - self.xs[lo];
        let a = (self.xs[hi] - x) / h;
        let b = (x - self.xs[lo]) / h;

        a * self.ys[lo]
            + b * self.ys[hi]
            + ((a * a * a - a) * self.y2s[lo] + (b * b * b - b) * self.y2s[hi]) * h * h / 6.0
    }
}
