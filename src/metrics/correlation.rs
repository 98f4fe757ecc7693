//! Temporal correlation coefficient between a predicted and a ground-truth track.
use ndarray::ArrayView1;

/// Pearson correlation of two sequences of equal length.
///
/// The sample covariance uses the `1 / (T - 1)` normalization. The result is clamped
/// to `[-1, 1]` and a zero-variance sequence (or `T < 2`) yields `0.0` instead of NaN.
pub fn pearson(a: ArrayView1<'_, f64>, b: ArrayView1<'_, f64>) -> f64 {
    let n = a.len();
    if n < 2 || b.len() != n {
        return 0.0;
    }
    let factor = 1.0 / (n as f64 - 1.0);
    let mean_a = a.sum() / n as f64;
    let mean_b = b.sum() / n as f64;

    let (mut cov, mut var_a, mut var_b) = (0.0, 0.0, 0.0);
    for (&x, &y) in a.iter().zip(b.iter()) {
        let (dx, dy) = (x - mean_a, y - mean_b);
        cov += dx * dy;
        var_a += dx * dx;
        var_b += dy * dy;
    }
    let corr = (factor * cov) / (factor * var_a).sqrt() / (factor * var_b).sqrt();
    if corr.is_nan() {
        0.0
    } else {
        corr.clamp(-1.0, 1.0)
    }
}

#[cfg(test)]
mod correlation_test {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::arr1;

    #[test]
    fn test_perfect_correlations() {
        let a = arr1(&[1.0, 2.0, 3.0, 5.0]);
        let b = arr1(&[2.0, 4.0, 6.0, 10.0]);
        assert_relative_eq!(pearson(a.view(), b.view()), 1.0, epsilon = 1e-12);
        let c = arr1(&[-1.0, -2.0, -3.0, -5.0]);
        assert_relative_eq!(pearson(a.view(), c.view()), -1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_zero_variance_is_zero() {
        let a = arr1(&[1.0, 1.0, 1.0]);
        let b = arr1(&[0.0, 1.0, 2.0]);
        assert_eq!(pearson(a.view(), b.view()), 0.0);
        assert_eq!(pearson(a.view(), a.view()), 0.0);
    }

    #[test]
    fn test_single_step_is_zero() {
        let a = arr1(&[1.0]);
        assert_eq!(pearson(a.view(), a.view()), 0.0);
    }

    #[test]
    fn test_known_value() {
        let a = arr1(&[1.0, 2.0, 3.0]);
        let b = arr1(&[1.0, 3.0, 2.0]);
        assert_relative_eq!(pearson(a.view(), b.view()), 0.5, epsilon = 1e-12);
    }
}
