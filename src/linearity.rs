//! # Linearity classification of short tracks
//!
//! A track is **non-linear** when a degree-2 polynomial fitted independently to its
//! `x(t)` and `y(t)` coordinates leaves a summed residual above a threshold. The
//! residual is the full least-squares residual sum of squares (not R²).
//!
//! Degenerate systems (fewer than four samples, or rank-deficient design matrix) have
//! no residual: it is taken as `0`, i.e. a perfect fit, and the track is linear.
use nalgebra::{DMatrix, DVector};
use ndarray::{ArrayView2, Axis};

/// Polynomial degree of the fit.
const POLY_DEGREE: usize = 2;

/// Residual sum of squares of a degree-2 least-squares fit of `values` over
/// `t = 0..values.len()`.
///
/// Return
/// ----------
/// * The residual sum of squares, or `0.0` when the system is not over-determined.
pub fn poly_fit_residual(values: &[f64]) -> f64 {
    let k = values.len();
    let n_coef = POLY_DEGREE + 1;
    if k <= n_coef {
        return 0.0;
    }

    // Vandermonde matrix, highest power first
    let a = DMatrix::from_fn(k, n_coef, |i, j| (i as f64).powi((POLY_DEGREE - j) as i32));
    let b = DVector::from_column_slice(values);

    let svd = a.clone().svd(true, true);
    if svd.rank(1e-12) < n_coef {
        return 0.0;
    }
    match svd.solve(&b, 1e-12) {
        Ok(coef) => (a * coef - b).norm_squared(),
        Err(_) => 0.0,
    }
}

/// Flag a track as linear (`0.0`) or non-linear (`1.0`).
///
/// Arguments
/// -----------------
/// * `traj` – `[2, n]` coordinates (row 0 = x, row 1 = y), `n >= traj_len`.
/// * `traj_len` – Number of trailing columns used for the fit.
/// * `threshold` – Minimum summed residual for a non-linear track.
///
/// Return
/// ----------
/// * `1.0` if `res_x + res_y >= threshold`, `0.0` otherwise.
pub fn poly_fit(traj: ArrayView2<'_, f64>, traj_len: usize, threshold: f64) -> f64 {
    let n = traj.len_of(Axis(1));
    let start = n.saturating_sub(traj_len);

    let residual: f64 = traj
        .axis_iter(Axis(0))
        .take(2)
        .map(|coord| {
            let tail: Vec<f64> = coord.iter().skip(start).copied().collect();
            poly_fit_residual(&tail)
        })
        .sum();

    if residual >= threshold {
        1.0
    } else {
        0.0
    }
}

#[cfg(test)]
mod linearity_test {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::Array2;

    #[test]
    fn test_constant_velocity_is_linear() {
        let traj = Array2::from_shape_fn((2, 16), |(c, t)| {
            if c == 0 {
                0.4 * t as f64 + 1.0
            } else {
                -0.25 * t as f64 + 3.0
            }
        });
        assert_eq!(poly_fit(traj.view(), 8, 0.002), 0.0);
    }

    #[test]
    fn test_exact_parabola_has_zero_residual() {
        let values: Vec<f64> = (0..8).map(|t| 0.5 * (t * t) as f64 - t as f64 + 2.0).collect();
        assert_relative_eq!(poly_fit_residual(&values), 0.0, epsilon = 1e-18);
    }

    #[test]
    fn test_zigzag_is_non_linear() {
        let traj = Array2::from_shape_fn((2, 8), |(c, t)| {
            let zig = if t % 2 == 0 { 0.0 } else { 1.0 };
            if c == 0 {
                t as f64 + zig
            } else {
                zig
            }
        });
        assert_eq!(poly_fit(traj.view(), 8, 0.002), 1.0);
    }

    #[test]
    fn test_residual_value() {
        // best quadratic through (0,0),(1,1),(2,0),(3,1) leaves residual 0.8
        let res = poly_fit_residual(&[0.0, 1.0, 0.0, 1.0]);
        assert_relative_eq!(res, 0.8, epsilon = 1e-10);
    }

    #[test]
    fn test_short_track_is_degenerate() {
        assert_eq!(poly_fit_residual(&[0.0, 5.0, -3.0]), 0.0);
        assert_eq!(poly_fit_residual(&[1.0]), 0.0);
        let traj = Array2::from_shape_vec((2, 3), vec![0.0, 9.0, 0.0, 1.0, -4.0, 7.0]).unwrap();
        assert_eq!(poly_fit(traj.view(), 3, 0.002), 0.0);
    }

    #[test]
    fn test_uses_trailing_columns_only() {
        // wild first half, straight second half
        let traj = Array2::from_shape_fn((2, 16), |(c, t)| {
            if t < 8 {
                if t % 2 == 0 { 5.0 } else { -5.0 }
            } else {
                (c + 1) as f64 * t as f64
            }
        });
        assert_eq!(poly_fit(traj.view(), 8, 0.002), 0.0);
        assert_eq!(poly_fit(traj.view(), 16, 0.002), 1.0);
    }
}
