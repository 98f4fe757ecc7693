//! # Batch metrics of stochastic trajectory predictions
//!
//! Scores `S` predicted futures per agent against the ground truth of one window.
//!
//! ## Metrics
//! -----------------
//! * **ADE** – Per agent, minimum over samples of the time-averaged Euclidean error.
//! * **FDE** – Per agent, minimum over samples of the final-step error. This selection
//!   is independent from the ADE one.
//! * **TCC** – Pearson correlation between the FDE-best sample and the ground truth,
//!   per coordinate axis, averaged over `x` and `y`.
//! * **COL** – Percentage of samples in which the agent comes within
//!   [`COLLISION_THRESHOLD`](crate::constants::COLLISION_THRESHOLD) of another agent,
//!   checked on a linearly densified prediction (see [`collision`]).
//!
//! ## Layout
//! -----------------
//! * `pred`: `[S, T, A, 2]`
//! * `gt`: `[T, A, 2]`
//!
//! Every metric vector has length `A`.
//!
//! ## Example
//! -----------------
//! ```rust
//! use ndarray::{Array3, Axis};
//! use pedgraph::metrics::compute_batch_metric;
//!
//! let gt = Array3::from_shape_fn((8, 2, 2), |(t, a, c)| (t + 10 * a + c) as f64);
//! let pred = gt.clone().insert_axis(Axis(0));
//! let m = compute_batch_metric(pred.view(), gt.view()).unwrap();
//! assert_eq!(m.ade, vec![0.0, 0.0]);
//! println!("{}", m.mean());
//! ```
pub mod collision;
pub mod correlation;

use std::fmt;

use itertools::Itertools;
use ndarray::{s, Array3, ArrayView3, ArrayView4, Axis};
use ordered_float::OrderedFloat;
use rayon::prelude::*;

use crate::pedgraph_errors::{ensure_shape, PedGraphError};

use self::{collision::colliding_agents, correlation::pearson};

/// Per-agent metric vectors of one window.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchMetrics {
    pub ade: Vec<f64>,
    pub fde: Vec<f64>,
    /// Collision rate in percent, `[0, 100]`.
    pub col: Vec<f64>,
    pub tcc: Vec<f64>,
}

/// Agent-averaged metrics.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricSummary {
    pub ade: f64,
    pub fde: f64,
    pub col: f64,
    pub tcc: f64,
}

impl BatchMetrics {
    #[inline]
    pub fn num_agents(&self) -> usize {
        self.ade.len()
    }

    /// Average every metric over the agents.
    pub fn mean(&self) -> MetricSummary {
        let avg = |v: &[f64]| {
            if v.is_empty() {
                0.0
            } else {
                v.iter().sum::<f64>() / v.len() as f64
            }
        };
        MetricSummary {
            ade: avg(&self.ade),
            fde: avg(&self.fde),
            col: avg(&self.col),
            tcc: avg(&self.tcc),
        }
    }
}

impl fmt::Display for MetricSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if f.alternate() {
            writeln!(f, "Batch metrics")?;
            writeln!(f, "-------------")?;
            writeln!(f, "ADE : {:.4}", self.ade)?;
            writeln!(f, "FDE : {:.4}", self.fde)?;
            writeln!(f, "COL : {:.2} %", self.col)?;
            write!(f, "TCC : {:.4}", self.tcc)
        } else {
            write!(
                f,
                "ADE={:.4}, FDE={:.4}, COL={:.2}, TCC={:.4}",
                self.ade, self.fde, self.col, self.tcc
            )
        }
    }
}

/// Validate `pred` `[S, T, A, 2]` against `gt` `[T, A, 2]`.
fn check_shapes(pred: &ArrayView4<'_, f64>, gt: &ArrayView3<'_, f64>) -> Result<(), PedGraphError> {
    let (n_samples, t_len, n_agents, _) = pred.dim();
    let non_empty = [n_samples.max(1), t_len.max(1), n_agents.max(1), 2];
    ensure_shape("prediction", &non_empty, pred.shape())?;
    ensure_shape("ground truth", &non_empty[1..], gt.shape())
}

/// Score a batch of sampled predictions against the ground truth.
///
/// Arguments
/// -----------------
/// * `pred` – Sampled absolute positions `[S, T, A, 2]`.
/// * `gt` – Ground-truth absolute positions `[T, A, 2]`.
///
/// Return
/// ----------
/// * The per-agent [`BatchMetrics`].
/// * `Err(PedGraphError::ShapeMismatch)` if an axis is empty, the last axis is not
///   2, or `gt` does not match `pred` on `T` and `A`.
///
/// See also
/// ------------
/// * [`collision::colliding_agents`] – Collision test of one sample.
/// * [`correlation::pearson`] – Correlation used by TCC.
pub fn compute_batch_metric(
    pred: ArrayView4<'_, f64>,
    gt: ArrayView3<'_, f64>,
) -> Result<BatchMetrics, PedGraphError> {
    check_shapes(&pred, &gt)?;
    let (n_samples, t_len, n_agents, _) = pred.dim();

    // errors[s, t, a] = ||pred[s, t, a] - gt[t, a]||
    let mut errors = Array3::<f64>::zeros((n_samples, t_len, n_agents));
    for (mut err_s, pred_s) in errors.outer_iter_mut().zip(pred.outer_iter()) {
        let diff = &pred_s - &gt;
        err_s.assign(&diff.map_axis(Axis(2), |d| d.dot(&d).sqrt()));
    }

    let mut ade = Vec::with_capacity(n_agents);
    let mut fde = Vec::with_capacity(n_agents);
    let mut tcc = Vec::with_capacity(n_agents);
    for a in 0..n_agents {
        let per_sample = errors.slice(s![.., .., a]);
        let ade_a = per_sample
            .outer_iter()
            .map(|e| e.sum() / t_len as f64)
            .fold(f64::INFINITY, f64::min);
        ade.push(ade_a);

        let finals = per_sample.column(t_len - 1);
        let best = finals
            .iter()
            .position_min_by_key(|&&e| OrderedFloat(e))
            .unwrap_or(0);
        fde.push(finals[best]);

        let best_track = pred.slice(s![best, .., a, ..]);
        let gt_track = gt.slice(s![.., a, ..]);
        let tcc_a = (0..2)
            .map(|c| pearson(best_track.column(c), gt_track.column(c)))
            .sum::<f64>()
            / 2.0;
        tcc.push(tcc_a);
    }

    let per_sample_collisions: Vec<Vec<bool>> = (0..n_samples)
        .into_par_iter()
        .map(|k| colliding_agents(pred.index_axis(Axis(0), k)))
        .collect();
    let col = (0..n_agents)
        .map(|a| {
            let hits = per_sample_collisions.iter().filter(|c| c[a]).count();
            hits as f64 / n_samples as f64 * 100.0
        })
        .collect();

    Ok(BatchMetrics { ade, fde, col, tcc })
}
