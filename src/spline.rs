//! Natural cubic spline evaluation for a single partition.
//!
//! Control points are spaced evenly over the partition interval. The spline
//! is "natural": the second derivative is zero at both partition ends.

/// Evaluate the natural cubic spline through `values` over `[lo, hi]` at `x`.
///
/// `values` are the control-point ordinates at the evenly spaced knots
/// `lo + i * (hi - lo) / (n - 1)`. With one control point the curve is
/// constant, with two it is linear. `x` is clamped to the interval, so
/// querying exactly at a partition edge is safe.
pub(crate) fn eval_natural_spline(values: &[f64], lo: f64, hi: f64, x: f64) -> f64 {
    let n = values.len();
    if n == 1 || hi <= lo {
        return values[0];
    }
    let h = (hi - lo) / (n - 1) as f64;
    let x = x.clamp(lo, hi);

    let mut seg = ((x - lo) / h) as usize;
    if seg >= n - 1 {
        seg = n - 2;
    }
    let t = (x - (lo + seg as f64 * h)) / h;

    if n == 2 {
        return values[0] * (1.0 - t) + values[1] * t;
    }

    let m = second_derivatives(values, h);
    let a = 1.0 - t;
    values[seg] * a
        + values[seg + 1] * t
        + h * h / 6.0 * ((a * a * a - a) * m[seg] + (t * t * t - t) * m[seg + 1])
}

/// Second derivatives at the knots for a natural spline with uniform
/// spacing `h`, solved with the Thomas algorithm.
fn second_derivatives(values: &[f64], h: f64) -> Vec<f64> {
    let n = values.len();
    let mut m = vec![0.0; n];
    if n < 3 {
        return m;
    }
    // Tridiagonal system 1*m[i-1] + 4*m[i] + 1*m[i+1] = rhs[i] for the
    // interior knots, with m[0] = m[n-1] = 0.
    let interior = n - 2;
    let mut diag = vec![4.0; interior];
    let mut rhs: Vec<f64> = (1..n - 1)
        .map(|i| 6.0 * (values[i - 1] - 2.0 * values[i] + values[i + 1]) / (h * h))
        .collect();

    for i in 1..interior {
        let w = 1.0 / diag[i - 1];
        diag[i] -= w;
        rhs[i] -= w * rhs[i - 1];
    }
    m[interior] = rhs[interior - 1] / diag[interior - 1];
    for i in (1..interior).rev() {
        m[i] = (rhs[i - 1] - m[i + 1]) / diag[i - 1];
    }
    m
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use pretty_assertions::assert_eq;

    #[test]
    fn single_point_is_constant() {
        assert_eq!(eval_natural_spline(&[2.5], 0.0, 1.0, 0.7), 2.5);
    }

    #[test]
    fn two_points_interpolate_linearly() {
        assert_abs_diff_eq!(
            eval_natural_spline(&[1.0, 3.0], 0.0, 1.0, 0.25),
            1.5,
            epsilon = 1e-12
        );
    }

    #[test]
    fn interpolates_knots() {
        let values = [0.0, 1.0, -2.0, 0.5];
        for (i, &v) in values.iter().enumerate() {
            let x = i as f64 / 3.0;
            assert_abs_diff_eq!(
                eval_natural_spline(&values, 0.0, 1.0, x),
                v,
                epsilon = 1e-10
            );
        }
    }

    #[test]
    fn reproduces_a_line_exactly() {
        // A line has zero second derivative everywhere, so the natural
        // spline through collinear control points is that line.
        let values: Vec<f64> = (0..5).map(|i| 2.0 * i as f64 - 1.0).collect();
        for &x in &[0.0, 0.13, 0.4, 0.77, 1.0] {
            assert_abs_diff_eq!(
                eval_natural_spline(&values, 0.0, 1.0, x),
                8.0 * x - 1.0,
                epsilon = 1e-10
            );
        }
    }

    #[test]
    fn natural_end_conditions() {
        // Central second difference near the ends should vanish.
        let values = [0.0, 2.0, -1.0, 3.0, 0.5];
        let eps = 1e-4;
        let f = |x: f64| eval_natural_spline(&values, 0.0, 1.0, x);
        let d2_start = (f(2.0 * eps) - 2.0 * f(eps) + f(0.0)) / (eps * eps);
        let d2_end = (f(1.0) - 2.0 * f(1.0 - eps) + f(1.0 - 2.0 * eps)) / (eps * eps);
        assert!(d2_start.abs() < 1.0, "S'' at start: {d2_start}");
        assert!(d2_end.abs() < 1.0, "S'' at end: {d2_end}");
    }

    #[test]
    fn clamps_outside_queries() {
        let values = [1.0, 2.0, 3.0];
        assert_eq!(eval_natural_spline(&values, 0.0, 1.0, -0.5), 1.0);
        assert_eq!(eval_natural_spline(&values, 0.0, 1.0, 1.5), 3.0);
    }
}
