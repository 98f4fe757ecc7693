//! Throughput reporting for the graph build of [`TrajectoryDataset`](crate::dataset::TrajectoryDataset).
//!
//! * [`WindowRate`] – Counts finished windows and keeps a smoothed windows/second
//!   rate, used to estimate the remaining build time.
//! * [`fmt_eta`] – Compact remaining-time formatter (`"<1s"`, `"42s"`, `"3m07s"`).
//! * [`graph_progress`] – Styled [`ProgressBar`] used while building graph tensors.
//!
//! This module is enabled only with the `progress` feature.
use std::time::{Duration, Instant};

use indicatif::{ProgressBar, ProgressStyle};

/// Smoothed windows/second rate of a graph build.
///
/// The rate is an exponential moving average of instantaneous rates,
/// `rate ← α·(1/dt) + (1–α)·rate`, seeded by the first measurement.
#[derive(Debug)]
pub struct WindowRate {
    last: Instant,
    alpha: f64,
    rate: Option<f64>,
    done: usize,
    total: usize,
}

impl WindowRate {
    pub fn new(total: usize, alpha: f64) -> Self {
        Self {
            last: Instant::now(),
            alpha,
            rate: None,
            done: 0,
            total,
        }
    }

    /// Record one finished window.
    pub fn window_done(&mut self) {
        let now = Instant::now();
        let dt = now.duration_since(self.last);
        self.last = now;
        self.record(dt);
    }

    fn record(&mut self, dt: Duration) {
        self.done += 1;
        let secs = dt.as_secs_f64();
        if secs <= 0.0 {
            return;
        }
        let instant = 1.0 / secs;
        self.rate = Some(match self.rate {
            None => instant,
            Some(r) => self.alpha * instant + (1.0 - self.alpha) * r,
        });
    }

    /// Smoothed windows per second, `0.0` before the first measurement.
    pub fn per_sec(&self) -> f64 {
        self.rate.unwrap_or(0.0)
    }

    /// Estimated time to build the remaining windows.
    pub fn eta(&self) -> Option<Duration> {
        let rate = self.rate.filter(|r| *r > 0.0)?;
        let remaining = self.total.saturating_sub(self.done) as f64;
        Some(Duration::from_secs_f64(remaining / rate))
    }

    pub fn message(&self) -> String {
        let eta = self.eta().map_or_else(|| "?".to_string(), fmt_eta);
        format!("{:.0} windows/s, eta {eta}", self.per_sec())
    }
}

/// Format a remaining time at second resolution.
pub fn fmt_eta(d: Duration) -> String {
    let secs = d.as_secs();
    match secs {
        0 => "<1s".to_string(),
        1..=59 => format!("{secs}s"),
        _ => format!("{}m{:02}s", secs / 60, secs % 60),
    }
}

/// Progress bar over `total` windows.
pub fn graph_progress(total: usize) -> ProgressBar {
    let pb = ProgressBar::new((total as u64).max(1));
    if let Ok(style) = ProgressStyle::with_template(
        "Building graphs {bar:40.cyan/blue} {pos}/{len} ({percent:>3}%) | {msg}",
    ) {
        pb.set_style(style);
    }
    pb.enable_steady_tick(Duration::from_millis(200));
    pb
}
