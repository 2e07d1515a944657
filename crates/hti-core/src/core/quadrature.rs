use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum QuadratureError {
    #[error("Integration inputs must have equal lengths (x: {x}, y: {y}, yerr: {yerr})")]
    LengthMismatch { x: usize, y: usize, yerr: usize },
    #[error("Integration requires at least 2 points, got {0}")]
    TooFewPoints(usize),
}

/// Numeric integration rule for the coupling-work integrand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scheme {
    Trapezoidal,
    Simpson,
}

/// Cumulative integral of a sampled integrand, with one entry per covered
/// prefix of the abscissa.
///
/// All four columns have equal length and start at the first abscissa with
/// value/error zero. The trapezoidal rule covers every point; the Simpson-like
/// rule consumes points in pairs of intervals, so an even-length input leaves
/// the final interval uncovered and the last entry stops one point short.
#[derive(Debug, Clone, PartialEq)]
pub struct CumulativeIntegral {
    pub x: Vec<f64>,
    pub value: Vec<f64>,
    pub sys_err: Vec<f64>,
    pub stat_err: Vec<f64>,
}

impl CumulativeIntegral {
    pub fn last_x(&self) -> f64 {
        self.x[self.x.len() - 1]
    }

    pub fn last_value(&self) -> f64 {
        self.value[self.value.len() - 1]
    }

    pub fn last_sys_err(&self) -> f64 {
        self.sys_err[self.sys_err.len() - 1]
    }

    pub fn last_stat_err(&self) -> f64 {
        self.stat_err[self.stat_err.len() - 1]
    }
}

/// Integrates `y(x)` with pointwise standard errors `yerr` over a non-uniform
/// grid, returning the cumulative integral together with an estimated
/// discretization (systematic) error and the L2-propagated statistical error
/// at every covered prefix.
pub fn integrate_range(
    x: &[f64],
    y: &[f64],
    yerr: &[f64],
    scheme: Scheme,
) -> Result<CumulativeIntegral, QuadratureError> {
    if x.len() != y.len() || x.len() != yerr.len() {
        return Err(QuadratureError::LengthMismatch {
            x: x.len(),
            y: y.len(),
            yerr: yerr.len(),
        });
    }
    if x.len() < 2 {
        return Err(QuadratureError::TooFewPoints(x.len()));
    }
    match scheme {
        Scheme::Trapezoidal => Ok(integrate_trapezoidal(x, y, yerr)),
        Scheme::Simpson => Ok(integrate_simpson(x, y, yerr)),
    }
}

fn integrate_trapezoidal(x: &[f64], y: &[f64], yerr: &[f64]) -> CumulativeIntegral {
    let n = x.len();
    let mut result = CumulativeIntegral {
        x: vec![x[0]],
        value: vec![0.0],
        sys_err: vec![0.0],
        stat_err: vec![0.0],
    };
    let mut value = 0.0;
    let mut sys_err = 0.0;
    let mut stat_var = 0.0;
    for i in 0..n - 1 {
        let h = x[i + 1] - x[i];
        let segment = 0.5 * h * (y[i] + y[i + 1]);
        value += segment;
        sys_err += trapezoid_interval_sys_err(x, y, i, segment);
        stat_var += 0.25 * h * h * (yerr[i] * yerr[i] + yerr[i + 1] * yerr[i + 1]);
        result.x.push(x[i + 1]);
        result.value.push(value);
        result.sys_err.push(sys_err);
        result.stat_err.push(stat_var.sqrt());
    }
    result
}

/// Discretization error of one trapezoid segment, estimated as its deviation
/// from the local three-point quadratic. Vanishes for linear data and is zero
/// when no third point exists.
fn trapezoid_interval_sys_err(x: &[f64], y: &[f64], i: usize, segment: f64) -> f64 {
    let n = x.len();
    if n < 3 {
        return 0.0;
    }
    let t0 = i.saturating_sub(1).min(n - 3);
    let quad = quadratic_segment(
        [x[t0], x[t0 + 1], x[t0 + 2]],
        [y[t0], y[t0 + 1], y[t0 + 2]],
        x[i],
        x[i + 1],
    );
    (quad - segment).abs()
}

fn integrate_simpson(x: &[f64], y: &[f64], yerr: &[f64]) -> CumulativeIntegral {
    let n = x.len();
    let mut result = CumulativeIntegral {
        x: vec![x[0]],
        value: vec![0.0],
        sys_err: vec![0.0],
        stat_err: vec![0.0],
    };
    let mut value = 0.0;
    let mut sys_err = 0.0;
    let mut stat_var = 0.0;
    let mut i = 0;
    while i + 2 < n {
        let h0 = x[i + 1] - x[i];
        let h1 = x[i + 2] - x[i + 1];
        let span = h0 + h1;
        let c0 = span / 6.0 * (2.0 - h1 / h0);
        let c1 = span * span * span / (6.0 * h0 * h1);
        let c2 = span / 6.0 * (2.0 - h0 / h1);
        let segment = c0 * y[i] + c1 * y[i + 1] + c2 * y[i + 2];
        let trapezoid = 0.5 * h0 * (y[i] + y[i + 1]) + 0.5 * h1 * (y[i + 1] + y[i + 2]);
        value += segment;
        // Embedded-rule estimate: the Simpson-trapezoid difference over the
        // same pair of intervals bounds the Simpson residual up to the usual
        // 1/15 Richardson factor.
        sys_err += (segment - trapezoid).abs() / 15.0;
        stat_var += c0 * c0 * yerr[i] * yerr[i]
            + c1 * c1 * yerr[i + 1] * yerr[i + 1]
            + c2 * c2 * yerr[i + 2] * yerr[i + 2];
        result.x.push(x[i + 2]);
        result.value.push(value);
        result.sys_err.push(sys_err);
        result.stat_err.push(stat_var.sqrt());
        i += 2;
    }
    result
}

/// Integral over [a, b] of the quadratic interpolating the three given points.
fn quadratic_segment(x: [f64; 3], y: [f64; 3], a: f64, b: f64) -> f64 {
    let mut total = 0.0;
    for k in 0..3 {
        let (xa, xb) = match k {
            0 => (x[1], x[2]),
            1 => (x[0], x[2]),
            _ => (x[0], x[1]),
        };
        let denom = (x[k] - xa) * (x[k] - xb);
        let anti =
            |t: f64| t * t * t / 3.0 - 0.5 * (xa + xb) * t * t + xa * xb * t;
        total += y[k] * (anti(b) - anti(a)) / denom;
    }
    total
}

/// Number of equal sub-intervals needed so one interval's trapezoid
/// discretization error falls under `error_budget`.
///
/// The local error is bounded from the endpoint spread, and subdividing into
/// `n` equal pieces shrinks it by 1/n^2.
pub fn trapezoid_intervals_needed(
    x0: f64,
    x1: f64,
    y0: f64,
    y1: f64,
    error_budget: f64,
) -> usize {
    let local_err = 0.5 * (x1 - x0).abs() * (y1 - y0).abs();
    if error_budget <= 0.0 || local_err <= error_budget {
        return 1;
    }
    ((local_err / error_budget).sqrt().ceil() as usize).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOLERANCE: f64 = 1e-12;

    fn f64_approx_equal(a: f64, b: f64) -> bool {
        (a - b).abs() < TOLERANCE
    }

    #[test]
    fn trapezoidal_reproduces_linear_integrand_exactly() {
        let x = vec![0.1, 0.3, 0.5, 0.7, 0.9];
        let y: Vec<f64> = x.iter().map(|&v| 2.0 * v + 1.0).collect();
        let yerr = vec![0.0; 5];
        let result = integrate_range(&x, &y, &yerr, Scheme::Trapezoidal).unwrap();
        // Analytic: x^2 + x over [0.1, 0.9] = 1.6.
        assert!(f64_approx_equal(result.last_value(), 1.6));
        assert!(f64_approx_equal(result.last_sys_err(), 0.0));
    }

    #[test]
    fn trapezoidal_constant_integrand_over_partial_range_is_exact() {
        let x = vec![0.2, 0.4, 0.6, 0.8];
        let y = vec![1.0; 4];
        let yerr = vec![0.0; 4];
        let result = integrate_range(&x, &y, &yerr, Scheme::Trapezoidal).unwrap();
        assert!(f64_approx_equal(result.last_value(), 0.6));
        assert!(f64_approx_equal(result.last_sys_err(), 0.0));
        assert!(f64_approx_equal(result.last_stat_err(), 0.0));
    }

    #[test]
    fn trapezoidal_covers_every_grid_point() {
        let x = vec![0.1, 0.2, 0.5, 0.9];
        let y = vec![1.0; 4];
        let yerr = vec![0.0; 4];
        let result = integrate_range(&x, &y, &yerr, Scheme::Trapezoidal).unwrap();
        assert_eq!(result.x, x);
        assert!(f64_approx_equal(result.value[1], 0.1));
        assert!(f64_approx_equal(result.value[2], 0.4));
    }

    #[test]
    fn simpson_reproduces_quadratic_on_non_uniform_grid() {
        let x = vec![0.1, 0.3, 0.4, 0.7, 0.9];
        let y: Vec<f64> = x.iter().map(|&v| v * v).collect();
        let yerr = vec![0.0; 5];
        let result = integrate_range(&x, &y, &yerr, Scheme::Simpson).unwrap();
        let analytic = (0.9_f64.powi(3) - 0.1_f64.powi(3)) / 3.0;
        assert!(f64_approx_equal(result.last_value(), analytic));
        assert!(f64_approx_equal(result.last_x(), 0.9));
    }

    #[test]
    fn simpson_on_even_length_grid_stops_one_point_short() {
        let x = vec![0.2, 0.4, 0.6, 0.8];
        let y = vec![1.0; 4];
        let yerr = vec![0.0; 4];
        let result = integrate_range(&x, &y, &yerr, Scheme::Simpson).unwrap();
        assert!(f64_approx_equal(result.last_x(), 0.6));
        assert!(f64_approx_equal(result.last_value(), 0.4));
    }

    #[test]
    fn simpson_on_two_points_yields_only_the_baseline_entry() {
        let x = vec![0.2, 0.8];
        let y = vec![1.0, 1.0];
        let yerr = vec![0.0, 0.0];
        let result = integrate_range(&x, &y, &yerr, Scheme::Simpson).unwrap();
        assert_eq!(result.x, vec![0.2]);
        assert!(f64_approx_equal(result.last_value(), 0.0));
    }

    #[test]
    fn trapezoidal_statistical_error_propagates_rule_weights() {
        let x = vec![0.0, 1.0];
        let y = vec![0.0, 0.0];
        let yerr = vec![0.3, 0.4];
        let result = integrate_range(&x, &y, &yerr, Scheme::Trapezoidal).unwrap();
        assert!(f64_approx_equal(result.last_stat_err(), 0.25));
    }

    #[test]
    fn curvature_produces_nonzero_trapezoid_sys_err() {
        let x = vec![0.1, 0.3, 0.5, 0.7, 0.9];
        let y: Vec<f64> = x.iter().map(|&v| v * v).collect();
        let yerr = vec![0.0; 5];
        let result = integrate_range(&x, &y, &yerr, Scheme::Trapezoidal).unwrap();
        assert!(result.last_sys_err() > 0.0);
    }

    #[test]
    fn mismatched_lengths_are_rejected() {
        let result = integrate_range(&[0.1, 0.2], &[1.0], &[0.0, 0.0], Scheme::Trapezoidal);
        assert_eq!(
            result,
            Err(QuadratureError::LengthMismatch { x: 2, y: 1, yerr: 2 })
        );
    }

    #[test]
    fn single_point_is_rejected() {
        let result = integrate_range(&[0.5], &[1.0], &[0.0], Scheme::Simpson);
        assert_eq!(result, Err(QuadratureError::TooFewPoints(1)));
    }

    #[test]
    fn flat_interval_needs_no_subdivision() {
        assert_eq!(trapezoid_intervals_needed(0.2, 0.4, 1.0, 1.0, 1e-6), 1);
    }

    #[test]
    fn steep_interval_subdivision_follows_inverse_square_scaling() {
        // local_err = 0.5 * 0.2 * 4.0 = 0.4; budget 0.01 -> sqrt(40) -> 7.
        assert_eq!(trapezoid_intervals_needed(0.2, 0.4, 0.0, 4.0, 0.01), 7);
    }

    #[test]
    fn non_positive_budget_disables_refinement() {
        assert_eq!(trapezoid_intervals_needed(0.2, 0.4, 0.0, 4.0, 0.0), 1);
    }
}
