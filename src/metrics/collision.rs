//! Densified pairwise collision test between predicted agents.
use ndarray::{Array3, ArrayView3, Axis};

use crate::constants::{COLLISION_HORIZON, COLLISION_THRESHOLD, NUM_INTERP, SELF_DISTANCE_OFFSET};

/// Linearly densify one sample `[T, A, 2]` into `[1 + NUM_INTERP * (T - 1), A, 2]`.
///
/// Dense positions are rebuilt as the running sum of the first point followed by
/// `NUM_INTERP` copies of each quarter displacement, so accumulated rounding follows
/// the sum and not the original points.
pub fn densify(sample: ArrayView3<'_, f64>) -> Array3<f64> {
    let (t_len, n_agents, n_coords) = sample.dim();
    if t_len == 0 {
        return Array3::zeros((0, n_agents, n_coords));
    }
    let dense_len = 1 + NUM_INTERP * (t_len - 1);
    let mut dense = Array3::zeros((dense_len, n_agents, n_coords));
    dense.index_axis_mut(Axis(0), 0).assign(&sample.index_axis(Axis(0), 0));

    let mut step = 1;
    for t in 1..t_len {
        let delta = (&sample.index_axis(Axis(0), t) - &sample.index_axis(Axis(0), t - 1))
            / NUM_INTERP as f64;
        for _ in 0..NUM_INTERP {
            let next = &dense.index_axis(Axis(0), step - 1) + &delta;
            dense.index_axis_mut(Axis(0), step).assign(&next);
            step += 1;
        }
    }
    dense
}

/// Agents of one sample that come closer than the collision threshold to any other
/// agent, within the first `COLLISION_HORIZON` dense steps.
///
/// Arguments
/// -----------------
/// * `sample` – Predicted positions `[T, A, 2]`.
///
/// Return
/// ----------
/// * One flag per agent.
pub fn colliding_agents(sample: ArrayView3<'_, f64>) -> Vec<bool> {
    let dense = densify(sample);
    let n_agents = dense.len_of(Axis(1));
    let horizon = dense.len_of(Axis(0)).min(COLLISION_HORIZON);

    let mut collides = vec![false; n_agents];
    if horizon == 0 {
        return collides;
    }
    for i in 0..n_agents {
        for j in i..n_agents {
            let offset = if i == j { SELF_DISTANCE_OFFSET } else { 0.0 };
            let min_dist = (0..horizon)
                .map(|t| {
                    let dx = dense[[t, i, 0]] - dense[[t, j, 0]];
                    let dy = dense[[t, i, 1]] - dense[[t, j, 1]];
                    (dx * dx + dy * dy).sqrt() + offset
                })
                .fold(f64::INFINITY, f64::min);
            if min_dist < COLLISION_THRESHOLD {
                collides[i] = true;
                collides[j] = true;
            }
        }
    }
    collides
}

#[cfg(test)]
mod collision_test {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::Array3;

    #[test]
    fn test_densify_midpoints() {
        // one agent moving 4 m along x per step
        let sample = Array3::from_shape_fn((3, 1, 2), |(t, _, c)| if c == 0 { 4.0 * t as f64 } else { 0.0 });
        let dense = densify(sample.view());
        assert_eq!(dense.shape(), &[9, 1, 2]);
        for k in 0..9 {
            assert_relative_eq!(dense[[k, 0, 0]], k as f64, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_crossing_between_samples_detected() {
        // agents swap sides between two steps: they meet only on a dense sub-step
        let mut sample = Array3::zeros((2, 3, 2));
        sample[[0, 0, 0]] = -1.0;
        sample[[1, 0, 0]] = 1.0;
        sample[[0, 1, 0]] = 1.0;
        sample[[1, 1, 0]] = -1.0;
        sample[[0, 2, 1]] = 10.0;
        sample[[1, 2, 1]] = 10.0;
        assert_eq!(colliding_agents(sample.view()), vec![true, true, false]);
    }

    #[test]
    fn test_single_agent_never_collides() {
        let sample = Array3::zeros((8, 1, 2));
        assert_eq!(colliding_agents(sample.view()), vec![false]);
    }

    #[test]
    fn test_collision_after_horizon_ignored() {
        // 8 steps -> 29 dense steps; agents meet only at the last step
        let sample = Array3::from_shape_fn((8, 2, 2), |(t, a, c)| {
            if c == 1 {
                0.0
            } else if a == 0 {
                t as f64
            } else {
                14.0 - t as f64
            }
        });
        assert_eq!(colliding_agents(sample.view()), vec![false, false]);
    }
}
