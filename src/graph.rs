//! # Graph node tensors
//!
//! Converts a window's per-agent tracks into the per-timestep node features consumed
//! by the prediction model.
//!
//! ## Layout
//! -----------------
//! * Input tracks are `[agent, coord(2), time]` (see [`crate::windowing::Window`]).
//! * Output graphs are `[time, agent, feature]`, one node per agent per time step.
//! * The node feature is the **relative displacement** `(dx, dy)` of the agent at that
//!   step, not its absolute position.
//! * With positional encoding, a leading channel holds the 1-indexed time step,
//!   giving `[t + 1, dx, dy]`.
//!
//! No normalization is applied.
//!
//! ## See also
//! ------------
//! * [`seq_to_graph`] – Track → graph conversion.
//! * [`loc_pos`] – Positional encoding.
//! * [`relative_to_absolute`] – Inverse of the relative encoding.
use ndarray::{s, Array2, Array3, ArrayView1, ArrayView2, ArrayView3, Axis};

use crate::pedgraph_errors::{ensure_shape, PedGraphError};

/// Inverse Euclidean distance between two 2-D points.
///
/// Return
/// ----------
/// * `1 / ||p1 - p2||`, or `0.0` when both points coincide.
pub fn inverse_distance(p1: ArrayView1<'_, f64>, p2: ArrayView1<'_, f64>) -> f64 {
    let norm = ((p1[0] - p2[0]).powi(2) + (p1[1] - p2[1]).powi(2)).sqrt();
    if norm == 0.0 {
        0.0
    } else {
        1.0 / norm
    }
}

/// Prepend the 1-indexed time step as an extra leading feature channel.
///
/// Arguments
/// -----------------
/// * `v` – `[time, agent, feature]` node tensor.
///
/// Return
/// ----------
/// * `[time, agent, feature + 1]` where channel 0 equals `t + 1` for every agent.
pub fn loc_pos(v: ArrayView3<'_, f64>) -> Array3<f64> {
    let (t_len, n_agents, n_feat) = v.dim();
    let mut out = Array3::zeros((t_len, n_agents, n_feat + 1));
    for (t, mut step) in out.axis_iter_mut(Axis(0)).enumerate() {
        step.column_mut(0).fill((t + 1) as f64);
        step.slice_mut(s![.., 1..]).assign(&v.index_axis(Axis(0), t));
    }
    out
}

/// Build the node tensor of one window.
///
/// Arguments
/// -----------------
/// * `seq` – Absolute positions `[agent, 2, time]`.
/// * `seq_rel` – Relative displacements `[agent, 2, time]`.
/// * `pos_enc` – Prepend the time-step channel when `true`.
///
/// Return
/// ----------
/// * `[time, agent, 2]` (or `[time, agent, 3]` with `pos_enc`), with
///   `V[t, h, :] = seq_rel[h, :, t]`.
/// * `Err(PedGraphError::ShapeMismatch)` if `seq` and `seq_rel` disagree or the
///   coordinate axis is not 2.
pub fn seq_to_graph(
    seq: ArrayView3<'_, f64>,
    seq_rel: ArrayView3<'_, f64>,
    pos_enc: bool,
) -> Result<Array3<f64>, PedGraphError> {
    let (n_agents, _, seq_len) = seq.dim();
    ensure_shape("absolute track", &[n_agents, 2, seq_len], seq.shape())?;
    ensure_shape("relative track", seq.shape(), seq_rel.shape())?;

    let mut v = Array3::zeros((seq_len, n_agents, 2));
    for step in 0..seq_len {
        let step_rel = seq_rel.index_axis(Axis(2), step);
        for h in 0..n_agents {
            v.slice_mut(s![step, h, ..]).assign(&step_rel.row(h));
        }
    }

    if pos_enc {
        v = loc_pos(v.view());
    }
    Ok(v)
}

/// Recover absolute positions from per-step displacements.
///
/// Arguments
/// -----------------
/// * `rel` – Displacements `[time, agent, 2]`.
/// * `init` – Position of every agent before the first displacement, `[agent, 2]`.
///
/// Return
/// ----------
/// * `[time, agent, 2]` with `abs[t] = init + sum(rel[0..=t])`.
pub fn relative_to_absolute(
    rel: ArrayView3<'_, f64>,
    init: ArrayView2<'_, f64>,
) -> Result<Array3<f64>, PedGraphError> {
    let (t_len, n_agents, _) = rel.dim();
    ensure_shape("relative nodes", &[t_len, n_agents, 2], rel.shape())?;
    ensure_shape("initial positions", &[n_agents, 2], init.shape())?;

    let mut out = Array3::zeros((t_len, n_agents, 2));
    let mut current: Array2<f64> = init.to_owned();
    for t in 0..t_len {
        current += &rel.index_axis(Axis(0), t);
        out.index_axis_mut(Axis(0), t).assign(&current);
    }
    Ok(out)
}
