//! # Trajectory dataset
//!
//! Builds an indexed collection of windows from one or many frame logs and
//! precomputes the graph tensors of every window.
//!
//! ## Overview
//! -----------------
//! 1. Each source file is read ([`read_frame_log`]) and windowed
//!    ([`extract_windows`]) independently, in parallel. Files are processed in name
//!    order so that window indices are reproducible.
//! 2. All windows are concatenated along the agent axis. `seq_start_end[i]` gives
//!    the `[start, end)` agent range of window `i` in the concatenated tensors.
//! 3. Graph tensors are built per window: `v_obs` with positional encoding
//!    (`[obs_len, agents, 3]`) and `v_pred` without (`[pred_len, agents, 2]`).
//!
//! A file that cannot be read or parsed does not abort the build: it is logged with
//! `tracing::warn!` and listed in [`TrajectoryDataset::skipped_files`].
//!
//! ## Example
//! -----------------
//! ```rust,no_run
//! use camino::Utf8Path;
//! use pedgraph::dataset::{params::DatasetParams, TrajectoryDataset};
//!
//! let ds = TrajectoryDataset::from_dir(Utf8Path::new("datasets/eth/train"), DatasetParams::default())?;
//! for bundle in ds.iter() {
//!     assert_eq!(bundle.v_obs.shape()[1], bundle.num_agents());
//! }
//! # Ok::<(), pedgraph::pedgraph_errors::PedGraphError>(())
//! ```
pub mod params;

use camino::{Utf8Path, Utf8PathBuf};
use ndarray::{s, Array1, Array2, Array3, ArrayView1, ArrayView2, ArrayView3, Axis};
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::{
    constants::SeqRange,
    frame_log::{read_frame_log, FrameTable},
    graph::seq_to_graph,
    pedgraph_errors::PedGraphError,
    windowing::{extract_windows, Window, WindowingOutput},
};

use self::params::DatasetParams;

#[cfg(feature = "progress")]
use crate::progress_bar::{graph_progress, WindowRate};

/// Read-only views on the tensors of one window.
///
/// Trajectory tensors are `[agent, 2, time]`, graph tensors `[time, agent, feature]`.
#[derive(Debug, Clone)]
pub struct WindowBundle<'a> {
    pub obs_traj: ArrayView3<'a, f64>,
    pub pred_traj: ArrayView3<'a, f64>,
    pub obs_traj_rel: ArrayView3<'a, f64>,
    pub pred_traj_rel: ArrayView3<'a, f64>,
    pub non_linear: ArrayView1<'a, f64>,
    pub loss_mask: ArrayView2<'a, f64>,
    pub v_obs: ArrayView3<'a, f64>,
    pub v_pred: ArrayView3<'a, f64>,
}

impl WindowBundle<'_> {
    #[inline]
    pub fn num_agents(&self) -> usize {
        self.obs_traj.len_of(Axis(0))
    }
}

/// Windows of one or many frame logs, with their graph tensors.
///
/// See also
/// ------------
/// * [`TrajectoryDataset::get`] – Random access to one window.
/// * [`crate::metrics::compute_batch_metric`] – Evaluation of predictions on a window.
#[derive(Debug, Clone)]
pub struct TrajectoryDataset {
    params: DatasetParams,
    /// `[total_agents, 2, seq_len]`
    absolute: Array3<f64>,
    /// `[total_agents, 2, seq_len]`
    relative: Array3<f64>,
    /// `[total_agents, seq_len]`
    loss_mask: Array2<f64>,
    /// `[total_agents]`
    non_linear: Array1<f64>,
    seq_start_end: Vec<SeqRange>,
    v_obs: Vec<Array3<f64>>,
    v_pred: Vec<Array3<f64>>,
    max_agents_in_frame: usize,
    skipped_files: Vec<Utf8PathBuf>,
}

impl TrajectoryDataset {
    /// Build the dataset from every regular file of `dir`.
    ///
    /// Arguments
    /// -----------------
    /// * `dir` – Directory holding the frame logs. Sub-directories are ignored.
    /// * `params` – Windowing parameters; validated before anything is read.
    ///
    /// Return
    /// ----------
    /// * `Err(PedGraphError::Io)` if the directory cannot be listed.
    /// * `Err(PedGraphError::NonUtf8Path)` if an entry name is not UTF-8.
    pub fn from_dir(dir: &Utf8Path, params: DatasetParams) -> Result<Self, PedGraphError> {
        params.validate()?;

        let mut files = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            if !path.is_file() {
                continue;
            }
            let path = Utf8PathBuf::from_path_buf(path)
                .map_err(|p| PedGraphError::NonUtf8Path(p.display().to_string()))?;
            files.push(path);
        }
        files.sort();
        debug!(dir = %dir, files = files.len(), "listed frame logs");

        Self::from_files(&files, params)
    }

    /// Build the dataset from an explicit list of files, kept in the given order.
    pub fn from_files(files: &[Utf8PathBuf], params: DatasetParams) -> Result<Self, PedGraphError> {
        params.validate()?;

        let per_file: Vec<Result<WindowingOutput, PedGraphError>> = files
            .par_iter()
            .map(|path| {
                let table = read_frame_log(path, params.delimiter.clone())?;
                Ok(extract_windows(&table, &params))
            })
            .collect();

        let mut outputs = Vec::with_capacity(per_file.len());
        let mut skipped_files = Vec::new();
        for (path, res) in files.iter().zip(per_file) {
            match res {
                Ok(out) => {
                    debug!(file = %path, windows = out.windows.len(), "windowed file");
                    outputs.push(out);
                }
                Err(err) => {
                    warn!(file = %path, error = %err, "skipping frame log");
                    skipped_files.push(path.clone());
                }
            }
        }

        let mut ds = Self::assemble(outputs, params)?;
        ds.skipped_files = skipped_files;
        Ok(ds)
    }

    /// Build the dataset from frame tables already in memory.
    pub fn from_tables(tables: Vec<FrameTable>, params: DatasetParams) -> Result<Self, PedGraphError> {
        params.validate()?;
        let outputs: Vec<WindowingOutput> = tables
            .par_iter()
            .map(|table| extract_windows(table, &params))
            .collect();
        Self::assemble(outputs, params)
    }

    fn assemble(outputs: Vec<WindowingOutput>, params: DatasetParams) -> Result<Self, PedGraphError> {
        let seq_len = params.seq_len();
        let max_agents_in_frame = outputs
            .iter()
            .map(|o| o.max_agents_in_frame)
            .max()
            .unwrap_or(0);
        let windows: Vec<Window> = outputs.into_iter().flat_map(|o| o.windows).collect();

        let mut seq_start_end = Vec::with_capacity(windows.len());
        let mut cursor = 0usize;
        for w in &windows {
            seq_start_end.push((cursor, cursor + w.num_agents()));
            cursor += w.num_agents();
        }
        let total_agents = cursor;

        let mut absolute = Array3::zeros((total_agents, 2, seq_len));
        let mut relative = Array3::zeros((total_agents, 2, seq_len));
        let mut loss_mask = Array2::zeros((total_agents, seq_len));
        let mut non_linear = Array1::zeros(total_agents);
        for (w, &(start, end)) in windows.iter().zip(&seq_start_end) {
            absolute.slice_mut(s![start..end, .., ..]).assign(&w.absolute);
            relative.slice_mut(s![start..end, .., ..]).assign(&w.relative);
            loss_mask.slice_mut(s![start..end, ..]).assign(&w.loss_mask);
            non_linear.slice_mut(s![start..end]).assign(&w.non_linear);
        }

        let mut ds = TrajectoryDataset {
            params,
            absolute,
            relative,
            loss_mask,
            non_linear,
            seq_start_end,
            v_obs: Vec::new(),
            v_pred: Vec::new(),
            max_agents_in_frame,
            skipped_files: Vec::new(),
        };
        ds.build_graphs()?;

        info!(
            windows = ds.len(),
            agents = ds.total_agents(),
            max_agents_in_frame = ds.max_agents_in_frame,
            "trajectory dataset ready"
        );
        Ok(ds)
    }

    /// Graphs of window `index`: `(v_obs, v_pred)`.
    fn window_graphs(&self, index: usize) -> Result<(Array3<f64>, Array3<f64>), PedGraphError> {
        let (start, end) = self.seq_start_end[index];
        let obs_len = self.params.obs_len;
        let abs = self.absolute.slice(s![start..end, .., ..]);
        let rel = self.relative.slice(s![start..end, .., ..]);

        let v_obs = seq_to_graph(
            abs.slice(s![.., .., ..obs_len]),
            rel.slice(s![.., .., ..obs_len]),
            true,
        )?;
        let v_pred = seq_to_graph(
            abs.slice(s![.., .., obs_len..]),
            rel.slice(s![.., .., obs_len..]),
            false,
        )?;
        Ok((v_obs, v_pred))
    }

    #[cfg(not(feature = "progress"))]
    fn build_graphs(&mut self) -> Result<(), PedGraphError> {
        let graphs = (0..self.len())
            .into_par_iter()
            .map(|i| self.window_graphs(i))
            .collect::<Result<Vec<_>, _>>()?;
        let (v_obs, v_pred): (Vec<_>, Vec<_>) = graphs.into_iter().unzip();
        self.v_obs = v_obs;
        self.v_pred = v_pred;
        Ok(())
    }

    #[cfg(feature = "progress")]
    fn build_graphs(&mut self) -> Result<(), PedGraphError> {
        use std::sync::Mutex;

        let pb = graph_progress(self.len());
        let rate = Mutex::new(WindowRate::new(self.len(), 0.2));

        let graphs = (0..self.len())
            .into_par_iter()
            .map(|i| {
                let res = self.window_graphs(i);
                if let Ok(mut rate) = rate.lock() {
                    rate.window_done();
                    pb.set_message(rate.message());
                }
                pb.inc(1);
                res
            })
            .collect::<Result<Vec<_>, _>>();

        pb.finish_and_clear();
        let (v_obs, v_pred): (Vec<_>, Vec<_>) = graphs?.into_iter().unzip();
        self.v_obs = v_obs;
        self.v_pred = v_pred;
        Ok(())
    }

    /// Number of windows.
    #[inline]
    pub fn len(&self) -> usize {
        self.seq_start_end.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.seq_start_end.is_empty()
    }

    /// Views on window `index`.
    ///
    /// Return
    /// ----------
    /// * `Err(PedGraphError::IndexOutOfRange)` if `index >= len()`.
    pub fn get(&self, index: usize) -> Result<WindowBundle<'_>, PedGraphError> {
        if index >= self.len() {
            return Err(PedGraphError::IndexOutOfRange {
                index,
                len: self.len(),
            });
        }
        Ok(self.bundle(index))
    }

    fn bundle(&self, index: usize) -> WindowBundle<'_> {
        let (start, end) = self.seq_start_end[index];
        let obs_len = self.params.obs_len;
        WindowBundle {
            obs_traj: self.absolute.slice(s![start..end, .., ..obs_len]),
            pred_traj: self.absolute.slice(s![start..end, .., obs_len..]),
            obs_traj_rel: self.relative.slice(s![start..end, .., ..obs_len]),
            pred_traj_rel: self.relative.slice(s![start..end, .., obs_len..]),
            non_linear: self.non_linear.slice(s![start..end]),
            loss_mask: self.loss_mask.slice(s![start..end, ..]),
            v_obs: self.v_obs[index].view(),
            v_pred: self.v_pred[index].view(),
        }
    }

    /// Iterate over all windows in index order.
    pub fn iter(&self) -> impl Iterator<Item = WindowBundle<'_>> + '_ {
        (0..self.len()).map(move |i| self.bundle(i))
    }

    pub fn seq_start_end(&self) -> &[SeqRange] {
        &self.seq_start_end
    }

    pub fn params(&self) -> &DatasetParams {
        &self.params
    }

    /// Largest number of agents met in any examined span, over all files.
    pub fn max_agents_in_frame(&self) -> usize {
        self.max_agents_in_frame
    }

    /// Number of agent tracks over all windows.
    pub fn total_agents(&self) -> usize {
        self.absolute.len_of(Axis(0))
    }

    /// Files that could not be read or parsed.
    pub fn skipped_files(&self) -> &[Utf8PathBuf] {
        &self.skipped_files
    }
}

impl<'a> IntoIterator for &'a TrajectoryDataset {
    type Item = WindowBundle<'a>;
    type IntoIter = Box<dyn Iterator<Item = WindowBundle<'a>> + 'a>;

    fn into_iter(self) -> Self::IntoIter {
        Box::new(self.iter())
    }
}
