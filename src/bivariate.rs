//! # Bivariate Gaussian decoding of model outputs
//!
//! The prediction model emits, for every future step and agent, the five parameters
//! of a bivariate normal distribution over the relative displacement:
//!
//! | channel | meaning          | transform |
//! |---------|------------------|-----------|
//! | 0, 1    | mean `(μx, μy)`  | identity  |
//! | 2       | `σx`             | `exp`     |
//! | 3       | `σy`             | `exp`     |
//! | 4       | correlation `ρ`  | `tanh`    |
//!
//! The covariance is `[[σx², ρσxσy], [ρσxσy, σy²]]`. Sampling uses its lower
//! Cholesky factor in closed form:
//!
//! ```text
//! L = [[σx,        0             ],
//!      [ρσy,  σy·sqrt(1 - ρ²)    ]]
//! ```
//!
//! so a latent draw `z` maps to `μ + L z`. Because `|ρ| < 1` after `tanh`, the factor
//! always exists; at `|ρ| = 1` in floating point the second diagonal term is zero.
//!
//! ## See also
//! ------------
//! * [`crate::sampler::LatentSampler`] – Source of the latent draws.
//! * [`crate::graph::relative_to_absolute`] – Turns sampled displacements into positions.
use nalgebra::{Matrix2, Vector2};
use ndarray::{s, Array2, Array3, Array4, ArrayView2, ArrayView3, Axis};

use crate::{
    graph::relative_to_absolute,
    pedgraph_errors::{ensure_shape, PedGraphError},
};

/// Channels of one model output node.
pub const OUTPUT_CHANNELS: usize = 5;

/// Per-step, per-agent bivariate normal distributions over displacements.
#[derive(Debug, Clone, PartialEq)]
pub struct BivariateGaussian {
    /// `[T, A, 2]`
    mu: Array3<f64>,
    /// `[T, A]`
    sx: Array2<f64>,
    /// `[T, A]`
    sy: Array2<f64>,
    /// `[T, A]`
    corr: Array2<f64>,
}

impl BivariateGaussian {
    /// Decode a `[T, A, 5]` network output.
    ///
    /// Return
    /// ----------
    /// * `Err(PedGraphError::ShapeMismatch)` if the last axis is not 5.
    pub fn from_network_output(v: ArrayView3<'_, f64>) -> Result<Self, PedGraphError> {
        let (t_len, n_agents, _) = v.dim();
        ensure_shape("network output", &[t_len, n_agents, OUTPUT_CHANNELS], v.shape())?;

        Ok(BivariateGaussian {
            mu: v.slice(s![.., .., 0..2]).to_owned(),
            sx: v.index_axis(Axis(2), 2).mapv(f64::exp),
            sy: v.index_axis(Axis(2), 3).mapv(f64::exp),
            corr: v.index_axis(Axis(2), 4).mapv(f64::tanh),
        })
    }

    /// `(T, A)`
    pub fn dim(&self) -> (usize, usize) {
        self.sx.dim()
    }

    pub fn mean(&self) -> ArrayView3<'_, f64> {
        self.mu.view()
    }

    pub fn std_x(&self) -> ArrayView2<'_, f64> {
        self.sx.view()
    }

    pub fn std_y(&self) -> ArrayView2<'_, f64> {
        self.sy.view()
    }

    pub fn correlation(&self) -> ArrayView2<'_, f64> {
        self.corr.view()
    }

    /// Covariance matrix of step `t`, agent `a`.
    pub fn covariance(&self, t: usize, a: usize) -> Matrix2<f64> {
        let (sx, sy, rho) = (self.sx[[t, a]], self.sy[[t, a]], self.corr[[t, a]]);
        Matrix2::new(sx * sx, rho * sx * sy, rho * sx * sy, sy * sy)
    }

    /// All covariance matrices, `[T, A, 2, 2]`.
    pub fn covariances(&self) -> Array4<f64> {
        let (t_len, n_agents) = self.dim();
        Array4::from_shape_fn((t_len, n_agents, 2, 2), |(t, a, i, j)| {
            self.covariance(t, a)[(i, j)]
        })
    }

    /// Lower Cholesky factor of [`covariance`](Self::covariance).
    pub fn cholesky(&self, t: usize, a: usize) -> Matrix2<f64> {
        let (sx, sy, rho) = (self.sx[[t, a]], self.sy[[t, a]], self.corr[[t, a]]);
        let tail = (1.0 - rho * rho).max(0.0).sqrt();
        Matrix2::new(sx, 0.0, rho * sy, sy * tail)
    }

    /// Draw displacement samples.
    ///
    /// Arguments
    /// -----------------
    /// * `noise` – Latent draws `[A, S, 2]`; the draw of an agent is shared by all steps.
    ///
    /// Return
    /// ----------
    /// * Sampled displacements `[S, T, A, 2]`.
    pub fn sample_relative(&self, noise: ArrayView3<'_, f64>) -> Result<Array4<f64>, PedGraphError> {
        let (t_len, n_agents) = self.dim();
        let n_samples = noise.len_of(Axis(1));
        ensure_shape("latent noise", &[n_agents, n_samples, 2], noise.shape())?;

        let mut out = Array4::zeros((n_samples, t_len, n_agents, 2));
        for t in 0..t_len {
            for a in 0..n_agents {
                let l = self.cholesky(t, a);
                let mu = Vector2::new(self.mu[[t, a, 0]], self.mu[[t, a, 1]]);
                for k in 0..n_samples {
                    let z = Vector2::new(noise[[a, k, 0]], noise[[a, k, 1]]);
                    let x = mu + l * z;
                    out[[k, t, a, 0]] = x[0];
                    out[[k, t, a, 1]] = x[1];
                }
            }
        }
        Ok(out)
    }

    /// Draw absolute trajectories starting from the last observed positions.
    ///
    /// Arguments
    /// -----------------
    /// * `noise` – Latent draws `[A, S, 2]`.
    /// * `last_obs` – Last observed position of every agent, `[A, 2]`.
    ///
    /// Return
    /// ----------
    /// * Sampled positions `[S, T, A, 2]`, ready for
    ///   [`compute_batch_metric`](crate::metrics::compute_batch_metric).
    pub fn sample_absolute(
        &self,
        noise: ArrayView3<'_, f64>,
        last_obs: ArrayView2<'_, f64>,
    ) -> Result<Array4<f64>, PedGraphError> {
        let mut samples = self.sample_relative(noise)?;
        for mut sample in samples.outer_iter_mut() {
            let abs = relative_to_absolute(sample.view(), last_obs)?;
            sample.assign(&abs);
        }
        Ok(samples)
    }
}
