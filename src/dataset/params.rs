//! # Dataset construction parameters
//!
//! [`DatasetParams`] gathers every knob of the dataset builder: observation and
//! prediction horizons, window stride, linearity threshold, agent floor and the
//! frame log delimiter. Use [`DatasetParams::builder`] for validated construction;
//! defaults are `8 / 8 / 1 / 0.002 / 1 / tab`.
//!
//! ```rust
//! use pedgraph::dataset::params::DatasetParams;
//!
//! let params = DatasetParams::builder()
//!     .obs_len(8)
//!     .pred_len(12)
//!     .skip(1)
//!     .build()
//!     .unwrap();
//! assert_eq!(params.seq_len(), 20);
//! println!("{params:#}");
//! ```
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{
    constants::{MIN_AGENTS, NONLINEAR_THRESHOLD, OBS_LEN, PRED_LEN, SKIP},
    frame_log::Delimiter,
    pedgraph_errors::PedGraphError,
};

/// Parameters of the windowing and dataset build.
///
/// Fields
/// -----------------
/// * `obs_len` – Observed time steps per window.
/// * `pred_len` – Predicted time steps per window; the linearity flag is computed on
///   these trailing steps.
/// * `skip` – Frame stride between two window starts.
/// * `threshold` – Minimum summed polynomial residual of a non-linear track.
/// * `min_agents` – A window is kept only if strictly more agents span it.
/// * `delimiter` – Field separator of the frame logs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetParams {
    pub obs_len: usize,
    pub pred_len: usize,
    pub skip: usize,
    pub threshold: f64,
    pub min_agents: usize,
    pub delimiter: Delimiter,
}

impl DatasetParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builder() -> DatasetParamsBuilder {
        DatasetParamsBuilder::new()
    }

    /// Window length in frames, `obs_len + pred_len`.
    #[inline]
    pub fn seq_len(&self) -> usize {
        self.obs_len + self.pred_len
    }
}

impl Default for DatasetParams {
    fn default() -> Self {
        DatasetParams {
            obs_len: OBS_LEN,
            pred_len: PRED_LEN,
            skip: SKIP,
            threshold: NONLINEAR_THRESHOLD,
            min_agents: MIN_AGENTS,
            delimiter: Delimiter::Tab,
        }
    }
}

/// Builder for [`DatasetParams`], with validation.
#[derive(Debug, Clone, Default)]
pub struct DatasetParamsBuilder {
    params: DatasetParams,
}

impl DatasetParamsBuilder {
    pub fn new() -> Self {
        Self {
            params: DatasetParams::default(),
        }
    }

    pub fn obs_len(mut self, v: usize) -> Self {
        self.params.obs_len = v;
        self
    }
    pub fn pred_len(mut self, v: usize) -> Self {
        self.params.pred_len = v;
        self
    }
    pub fn skip(mut self, v: usize) -> Self {
        self.params.skip = v;
        self
    }
    pub fn threshold(mut self, v: f64) -> Self {
        self.params.threshold = v;
        self
    }
    pub fn min_agents(mut self, v: usize) -> Self {
        self.params.min_agents = v;
        self
    }
    pub fn delimiter(mut self, v: Delimiter) -> Self {
        self.params.delimiter = v;
        self
    }

    /// Finalize the builder.
    ///
    /// Validation rules
    /// -----------------
    /// * `obs_len >= 1`, `pred_len >= 1` – both horizons are non-empty.
    /// * `skip >= 1` – the window start must advance.
    /// * `threshold >= 0.0` and not NaN.
    ///
    /// Return
    /// ----------
    /// * `Err(PedGraphError::InvalidDatasetParameter)` on the first violated rule.
    pub fn build(self) -> Result<DatasetParams, PedGraphError> {
        self.params.validate()?;
        Ok(self.params)
    }
}

impl DatasetParams {
    /// Check the invariants enforced by [`DatasetParamsBuilder::build`].
    ///
    /// Useful for parameters obtained through `serde`.
    pub fn validate(&self) -> Result<(), PedGraphError> {
        if self.obs_len == 0 {
            return Err(PedGraphError::InvalidDatasetParameter(
                "obs_len must be >= 1".into(),
            ));
        }
        if self.pred_len == 0 {
            return Err(PedGraphError::InvalidDatasetParameter(
                "pred_len must be >= 1".into(),
            ));
        }
        if self.skip == 0 {
            return Err(PedGraphError::InvalidDatasetParameter(
                "skip must be >= 1".into(),
            ));
        }
        if !(self.threshold >= 0.0) {
            return Err(PedGraphError::InvalidDatasetParameter(
                "threshold must be non-negative".into(),
            ));
        }
        Ok(())
    }
}

impl fmt::Display for DatasetParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if f.alternate() {
            writeln!(f, "Dataset Parameters")?;
            writeln!(f, "------------------")?;
            writeln!(f, "  obs_len    = {:<8} # observed steps", self.obs_len)?;
            writeln!(f, "  pred_len   = {:<8} # predicted steps", self.pred_len)?;
            writeln!(f, "  skip       = {:<8} # frame stride", self.skip)?;
            writeln!(f, "  threshold  = {:<8} # non-linear residual", self.threshold)?;
            writeln!(f, "  min_agents = {:<8} # agent floor (exclusive)", self.min_agents)?;
            write!(f, "  delimiter  = {:?}", self.delimiter)
        } else {
            write!(
                f,
                "obs_len={}, pred_len={}, skip={}, threshold={}, min_agents={}, delimiter={:?}",
                self.obs_len,
                self.pred_len,
                self.skip,
                self.threshold,
                self.min_agents,
                self.delimiter
            )
        }
    }
}

#[cfg(test)]
mod params_test {
    use super::*;

    #[test]
    fn test_defaults() {
        let p = DatasetParams::default();
        assert_eq!(p.seq_len(), 16);
        assert_eq!(p.threshold, 0.002);
        assert_eq!(p.min_agents, 1);
        assert_eq!(p.delimiter, Delimiter::Tab);
        assert_eq!(DatasetParams::builder().build().unwrap(), p);
    }

    #[test]
    fn test_validation() {
        assert_eq!(
            DatasetParams::builder().skip(0).build(),
            Err(PedGraphError::InvalidDatasetParameter("skip must be >= 1".into()))
        );
        assert!(DatasetParams::builder().obs_len(0).build().is_err());
        assert!(DatasetParams::builder().pred_len(0).build().is_err());
        assert!(DatasetParams::builder().threshold(f64::NAN).build().is_err());
        assert!(DatasetParams::builder().threshold(-1.0).build().is_err());
        assert!(DatasetParams::builder().min_agents(0).build().is_ok());
    }

    #[test]
    fn test_display() {
        let p = DatasetParams::default();
        assert_eq!(
            format!("{p}"),
            "obs_len=8, pred_len=8, skip=1, threshold=0.002, min_agents=1, delimiter=Tab"
        );
        assert!(format!("{p:#}").starts_with("Dataset Parameters"));
    }
}
