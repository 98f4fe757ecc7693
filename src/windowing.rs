//! # Sequence windowing of frame logs
//!
//! Slides a window of `seq_len = obs_len + pred_len` consecutive **distinct frames**
//! over one [`FrameTable`] and extracts, for every window, the agents present on the
//! whole span.
//!
//! ## Algorithm
//! -----------------
//! 1. Sorted distinct frame ids; records are grouped by frame, keeping the original
//!    order inside each frame.
//! 2. `num_windows = ceil((num_frames - seq_len + 1) / skip)`.
//! 3. Window starts run over `0, skip, …, num_windows * skip` **inclusive**. The last
//!    start always yields an incomplete span and therefore no window; it is still
//!    examined, and counts towards [`WindowingOutput::max_agents_in_frame`].
//! 4. Inside a span, agents are visited by ascending id. An agent is kept only if it
//!    satisfies the span-completeness predicate (see [`spans_window`]); otherwise it is
//!    dropped whole. Nothing is interpolated or partially masked.
//! 5. Kept agents get absolute coordinates (rounded to
//!    [`COORD_DECIMALS`](crate::constants::COORD_DECIMALS)), relative displacements,
//!    mask ones and a linearity flag computed on the prediction horizon.
//! 6. The window is retained only if strictly more than `min_agents` agents were kept.
//!
//! ## Tensor layout
//! -----------------
//! * `absolute`, `relative`: `[agent, 2, seq_len]` (coordinate rows `x`, `y`).
//! * `loss_mask`: `[agent, seq_len]`, all ones for retained agents.
//! * `non_linear`: `[agent]`, `0.0` or `1.0`.
//!
//! ## See also
//! ------------
//! * [`crate::linearity::poly_fit`] – Linearity flag.
//! * [`crate::dataset::TrajectoryDataset`] – Concatenates the windows of many files.
use std::collections::BTreeMap;

use ahash::RandomState;
use ndarray::{s, Array1, Array2, Array3};
use ordered_float::OrderedFloat;
use smallvec::SmallVec;
use tracing::debug;

use crate::{
    constants::{AgentId, FrameId, COORD_DECIMALS},
    dataset::params::DatasetParams,
    frame_log::{round_decimals, FrameTable},
    linearity::poly_fit,
};

pub(crate) type FastHashMap<K, V> = std::collections::HashMap<K, V, RandomState>;

/// One retained window: the agents spanning `seq_len` consecutive frames.
#[derive(Debug, Clone, PartialEq)]
pub struct Window {
    /// Absolute positions `[agent, 2, seq_len]`.
    pub absolute: Array3<f64>,
    /// Per-step displacements `[agent, 2, seq_len]`, first column zero.
    pub relative: Array3<f64>,
    /// Validity mask `[agent, seq_len]`.
    pub loss_mask: Array2<f64>,
    /// Linearity flag of each agent's prediction horizon.
    pub non_linear: Array1<f64>,
    /// Agent ids, ascending, aligned with the first tensor axis.
    pub agent_ids: Vec<AgentId>,
    /// First frame id of the span.
    pub start_frame: FrameId,
}

impl Window {
    #[inline]
    pub fn num_agents(&self) -> usize {
        self.agent_ids.len()
    }
}

/// Windows extracted from one frame log.
#[derive(Debug, Clone, Default)]
pub struct WindowingOutput {
    pub windows: Vec<Window>,
    /// Largest number of distinct agents seen in any examined span, retained or not.
    pub max_agents_in_frame: usize,
}

/// Span-completeness predicate.
///
/// `offsets` are the span offsets of an agent's records, in span order. The agent
/// spans the window iff they are exactly `0, 1, …, seq_len - 1`: one record in every
/// frame of the span and nothing else. A hole compensated by a duplicated record in
/// another frame is rejected.
pub fn spans_window<I>(offsets: I, seq_len: usize) -> bool
where
    I: IntoIterator<Item = usize>,
{
    let mut expected = 0;
    for off in offsets {
        if off != expected {
            return false;
        }
        expected += 1;
    }
    expected == seq_len
}

/// Number of window starts before the inclusive upper bound (may be negative).
fn num_windows(num_frames: usize, seq_len: usize, skip: usize) -> i64 {
    ((num_frames as f64 - seq_len as f64 + 1.0) / skip as f64).ceil() as i64
}

/// Cut one frame log into windows.
///
/// Arguments
/// -----------------
/// * `table` – Raw records of one source file.
/// * `params` – Horizons, stride, linearity threshold and agent floor.
///
/// Return
/// ----------
/// * The retained windows, in increasing start-frame order, and the maximum number
///   of agents met in a span.
pub fn extract_windows(table: &FrameTable, params: &DatasetParams) -> WindowingOutput {
    let seq_len = params.seq_len();
    let skip = params.skip;

    let frames = table.frame_ids();
    let frame_pos: FastHashMap<OrderedFloat<FrameId>, usize> = frames
        .iter()
        .enumerate()
        .map(|(i, &f)| (OrderedFloat(f), i))
        .collect();

    let mut frame_groups: Vec<SmallVec<[usize; 16]>> = vec![SmallVec::new(); frames.len()];
    let records = table.records();
    for (row, record) in records.outer_iter().enumerate() {
        if let Some(&pos) = frame_pos.get(&OrderedFloat(record[0])) {
            frame_groups[pos].push(row);
        }
    }

    let mut output = WindowingOutput::default();
    let upper = num_windows(frames.len(), seq_len, skip) * skip as i64;
    if upper < 0 {
        debug!(frames = frames.len(), seq_len, "frame log shorter than one window");
        return output;
    }

    for idx in (0..=upper as usize).step_by(skip) {
        let span_end = (idx + seq_len).min(frames.len());
        let span = frame_groups.get(idx..span_end).unwrap_or(&[]);

        // agent id -> (offset in span, row), in span order
        let mut agents: BTreeMap<OrderedFloat<AgentId>, SmallVec<[(usize, usize); 16]>> =
            BTreeMap::new();
        for (offset, group) in span.iter().enumerate() {
            for &row in group {
                agents
                    .entry(OrderedFloat(records[[row, 1]]))
                    .or_default()
                    .push((offset, row));
            }
        }
        output.max_agents_in_frame = output.max_agents_in_frame.max(agents.len());

        let mut kept: Vec<(AgentId, Array2<f64>)> = Vec::with_capacity(agents.len());
        for (agent_id, track) in &agents {
            if !spans_window(track.iter().map(|&(off, _)| off), seq_len) {
                continue;
            }
            let coords = Array2::from_shape_fn((2, seq_len), |(c, t)| {
                round_decimals(records[[track[t].1, 2 + c]], COORD_DECIMALS)
            });
            kept.push((agent_id.into_inner(), coords));
        }

        if kept.len() <= params.min_agents {
            continue;
        }

        let n_agents = kept.len();
        let mut window = Window {
            absolute: Array3::zeros((n_agents, 2, seq_len)),
            relative: Array3::zeros((n_agents, 2, seq_len)),
            loss_mask: Array2::zeros((n_agents, seq_len)),
            non_linear: Array1::zeros(n_agents),
            agent_ids: Vec::with_capacity(n_agents),
            start_frame: frames[idx],
        };

        for (i, (agent_id, coords)) in kept.into_iter().enumerate() {
            let mut rel = Array2::<f64>::zeros((2, seq_len));
            let diff = &coords.slice(s![.., 1..]) - &coords.slice(s![.., ..seq_len - 1]);
            rel.slice_mut(s![.., 1..]).assign(&diff);

            window.non_linear[i] = poly_fit(coords.view(), params.pred_len, params.threshold);
            window.absolute.slice_mut(s![i, .., ..]).assign(&coords);
            window.relative.slice_mut(s![i, .., ..]).assign(&rel);
            window.loss_mask.row_mut(i).fill(1.0);
            window.agent_ids.push(agent_id);
        }

        output.windows.push(window);
    }

    debug!(
        frames = frames.len(),
        windows = output.windows.len(),
        max_agents = output.max_agents_in_frame,
        "windowed frame log"
    );
    output
}

#[cfg(test)]
mod windowing_test {
    use super::*;
    use approx::assert_relative_eq;

    fn params(obs_len: usize, pred_len: usize, skip: usize, min_agents: usize) -> DatasetParams {
        DatasetParams::builder()
            .obs_len(obs_len)
            .pred_len(pred_len)
            .skip(skip)
            .min_agents(min_agents)
            .build()
            .unwrap()
    }

    /// `n_agents` walking in straight lines over `n_frames` frames spaced by 10.
    fn straight_walkers(n_agents: usize, n_frames: usize) -> FrameTable {
        let mut rows = Vec::new();
        for f in 0..n_frames {
            for a in 0..n_agents {
                rows.push([
                    (f * 10) as f64,
                    (a + 1) as f64,
                    0.5 * f as f64 + a as f64,
                    0.25 * f as f64 - a as f64,
                ]);
            }
        }
        FrameTable::from_rows(&rows)
    }

    #[test]
    fn test_single_full_window() {
        let out = extract_windows(&straight_walkers(3, 16), &params(8, 8, 1, 1));
        assert_eq!(out.windows.len(), 1);
        let w = &out.windows[0];
        assert_eq!(w.num_agents(), 3);
        assert_eq!(w.absolute.shape(), &[3, 2, 16]);
        assert!(w.loss_mask.iter().all(|&m| m == 1.0));
        assert_eq!(w.agent_ids, vec![1.0, 2.0, 3.0]);
        assert_eq!(w.non_linear.to_vec(), vec![0.0, 0.0, 0.0]);
        assert_eq!(w.start_frame, 0.0);
        assert_eq!(out.max_agents_in_frame, 3);
    }

    #[test]
    fn test_window_count_with_stride() {
        // 20 frames, seq_len 8, skip 3: starts 0,3,...,12 are full
        let out = extract_windows(&straight_walkers(2, 20), &params(4, 4, 3, 1));
        let starts: Vec<f64> = out.windows.iter().map(|w| w.start_frame).collect();
        assert_eq!(starts, vec![0.0, 30.0, 60.0, 90.0, 120.0]);
    }

    #[test]
    fn test_too_few_frames() {
        let out = extract_windows(&straight_walkers(3, 10), &params(8, 8, 1, 1));
        assert!(out.windows.is_empty());
    }

    #[test]
    fn test_relative_first_column_zero_and_round_trip() {
        let out = extract_windows(&straight_walkers(2, 12), &params(4, 4, 2, 1));
        for w in &out.windows {
            for a in 0..w.num_agents() {
                for c in 0..2 {
                    assert_eq!(w.relative[[a, c, 0]], 0.0);
                    let mut acc = w.absolute[[a, c, 0]];
                    for t in 1..8 {
                        acc += w.relative[[a, c, t]];
                        assert_relative_eq!(acc, w.absolute[[a, c, t]], epsilon = 1e-9);
                    }
                }
            }
        }
    }

    #[test]
    fn test_min_agents_boundary() {
        // exactly min_agents spanning agents: dropped
        let out = extract_windows(&straight_walkers(2, 16), &params(8, 8, 1, 2));
        assert!(out.windows.is_empty());
        // min_agents + 1: kept
        let out = extract_windows(&straight_walkers(3, 16), &params(8, 8, 1, 2));
        assert_eq!(out.windows.len(), 1);
    }

    #[test]
    fn test_partial_agents_dropped_whole() {
        let mut rows = Vec::new();
        for f in 0..16 {
            for a in 1..=3 {
                rows.push([f as f64, a as f64, f as f64, a as f64]);
            }
            // agent 4 leaves early, agent 5 has a hole at frame 7
            if f < 12 {
                rows.push([f as f64, 4.0, 0.0, 0.0]);
            }
            if f != 7 {
                rows.push([f as f64, 5.0, 1.0, 1.0]);
            }
        }
        let out = extract_windows(&FrameTable::from_rows(&rows), &params(8, 8, 1, 1));
        assert_eq!(out.windows.len(), 1);
        assert_eq!(out.windows[0].agent_ids, vec![1.0, 2.0, 3.0]);
        assert_eq!(out.max_agents_in_frame, 5);
    }

    #[test]
    fn test_hole_masked_by_duplicate_dropped() {
        let mut rows = Vec::new();
        for f in 0..16 {
            for a in 1..=2 {
                rows.push([f as f64, a as f64, f as f64, a as f64]);
            }
            // agent 3 has no record at frame 5 and two at frame 3
            if f != 5 {
                rows.push([f as f64, 3.0, 100.0 + f as f64, 0.0]);
            }
            if f == 3 {
                rows.push([f as f64, 3.0, 500.0, 0.0]);
            }
        }
        let out = extract_windows(&FrameTable::from_rows(&rows), &params(8, 8, 1, 1));
        assert_eq!(out.windows.len(), 1);
        assert_eq!(out.windows[0].agent_ids, vec![1.0, 2.0]);
        assert_eq!(out.max_agents_in_frame, 3);
    }

    #[test]
    fn test_spans_window_offsets() {
        assert!(spans_window(0..4, 4));
        assert!(!spans_window([0, 1, 1, 3], 4));
        assert!(!spans_window([0, 1, 2], 4));
        assert!(!spans_window([1, 2, 3, 4], 4));
        assert!(!spans_window(0..5, 4));
    }

    #[test]
    fn test_stride_beyond_last_frame() {
        // 17 frames, seq_len 16, skip 20: starts 0 and 20, the second past the end
        let out = extract_windows(&straight_walkers(3, 17), &params(8, 8, 20, 1));
        assert_eq!(out.windows.len(), 1);
        assert_eq!(out.windows[0].start_frame, 0.0);
        assert_eq!(out.max_agents_in_frame, 3);
    }

    #[test]
    fn test_coordinates_rounded() {
        let rows: Vec<[f64; 4]> = (0..4)
            .flat_map(|f| {
                [
                    [f as f64, 1.0, 1.234_567, 0.0],
                    [f as f64, 2.0, 0.0, 9.876_54],
                ]
            })
            .collect();
        let out = extract_windows(&FrameTable::from_rows(&rows), &params(2, 2, 1, 1));
        let w = &out.windows[0];
        assert_eq!(w.absolute[[0, 0, 0]], 1.2346);
        assert_eq!(w.absolute[[1, 1, 3]], 9.8765);
    }

    #[test]
    fn test_num_windows_values() {
        assert_eq!(num_windows(16, 16, 1), 1);
        assert_eq!(num_windows(10, 16, 1), -5);
        assert_eq!(num_windows(14, 16, 3), 0);
        assert_eq!(num_windows(20, 8, 3), 5);
    }

    #[test]
    fn test_deterministic() {
        let table = straight_walkers(4, 30);
        let p = params(8, 8, 2, 1);
        let a = extract_windows(&table, &p);
        let b = extract_windows(&table, &p);
        assert_eq!(a.windows, b.windows);
    }
}
