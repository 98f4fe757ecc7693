//! Pedestrian trajectory windowing, graph tensors and stochastic prediction metrics.
//!
//! * [`frame_log`] – Whitespace separated `frame agent x y` logs.
//! * [`windowing`] – Fixed-length windows of fully observed agents.
//! * [`dataset`] – Multi-file dataset with per-window graph tensors.
//! * [`metrics`] – ADE / FDE / TCC / COL of sampled predictions.
//! * [`bivariate`], [`sampler`] – Decoding and sampling of model outputs.
pub mod bivariate;
pub mod constants;
pub mod dataset;
pub mod frame_log;
pub mod graph;
pub mod linearity;
pub mod metrics;
pub mod pedgraph_errors;
#[cfg(feature = "progress")]
pub mod progress_bar;
pub mod sampler;
pub mod windowing;

pub use dataset::{params::DatasetParams, TrajectoryDataset, WindowBundle};
pub use metrics::{compute_batch_metric, BatchMetrics};
pub use pedgraph_errors::PedGraphError;
