use camino::Utf8PathBuf;
use thiserror::Error;

use crate::frame_log::ParseFrameError;

#[derive(Error, Debug)]
pub enum PedGraphError {
    #[error("Unable to perform file operation: {0}")]
    Io(#[from] std::io::Error),

    #[error("Error while parsing frame log {path}: {source}")]
    FrameLogParse {
        path: Utf8PathBuf,
        #[source]
        source: ParseFrameError,
    },

    #[error("Invalid delimiter specifier: {0:?} (expected \"tab\", \"space\" or a non-empty separator)")]
    InvalidDelimiter(String),

    #[error("Invalid dataset parameter: {0}")]
    InvalidDatasetParameter(String),

    #[error("Shape mismatch for {what}: expected {expected:?}, found {found:?}")]
    ShapeMismatch {
        what: &'static str,
        expected: Vec<usize>,
        found: Vec<usize>,
    },

    #[error("Window index {index} out of range (dataset holds {len} windows)")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Invalid sampler parameter: {0}")]
    InvalidSamplerParameter(String),

    #[error("Path is not valid UTF-8: {0}")]
    NonUtf8Path(String),
}

impl PartialEq for PedGraphError {
    fn eq(&self, other: &Self) -> bool {
        use PedGraphError::*;
        match (self, other) {
            // io::Error is not comparable: same variant is enough
            (Io(_), Io(_)) => true,
            (
                FrameLogParse {
                    path: pa,
                    source: sa,
                },
                FrameLogParse {
                    path: pb,
                    source: sb,
                },
            ) => pa == pb && sa == sb,
            (InvalidDelimiter(a), InvalidDelimiter(b)) => a == b,
            (InvalidDatasetParameter(a), InvalidDatasetParameter(b)) => a == b,
            (
                ShapeMismatch {
                    what: wa,
                    expected: ea,
                    found: fa,
                },
                ShapeMismatch {
                    what: wb,
                    expected: eb,
                    found: fb,
                },
            ) => wa == wb && ea == eb && fa == fb,
            (
                IndexOutOfRange { index: ia, len: la },
                IndexOutOfRange { index: ib, len: lb },
            ) => ia == ib && la == lb,
            (InvalidSamplerParameter(a), InvalidSamplerParameter(b)) => a == b,
            (NonUtf8Path(a), NonUtf8Path(b)) => a == b,
            _ => false,
        }
    }
}

/// Check that `found` equals `expected`, producing a [`PedGraphError::ShapeMismatch`] otherwise.
pub(crate) fn ensure_shape(
    what: &'static str,
    expected: &[usize],
    found: &[usize],
) -> Result<(), PedGraphError> {
    if expected == found {
        Ok(())
    } else {
        Err(PedGraphError::ShapeMismatch {
            what,
            expected: expected.to_vec(),
            found: found.to_vec(),
        })
    }
}
