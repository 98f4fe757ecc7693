//! # Frame logs: raw pedestrian position records
//!
//! A frame log is a plain-text file with one record per line,
//! `frame_id agent_id x y`, separated by a configurable delimiter. Every field is
//! parsed as `f64`. This module exposes the in-memory [`FrameTable`] and the
//! [`Delimiter`] specifier; the parsing itself lives in [`reader`].
//!
//! ## Delimiters
//! -----------------
//! [`Delimiter`] implements [`FromStr`]:
//! * `"tab"` → `\t`
//! * `"space"` → `' '`
//! * any other **single-byte** string → that byte (e.g. `","`, `"\t"`).
//! * a longer string → split on that exact string (e.g. `", "`, `"::"`).
//!
//! Only the empty string is rejected, with [`PedGraphError::InvalidDelimiter`].
//!
//! ## Example
//! -----------------
//! ```rust
//! use pedgraph::frame_log::{Delimiter, FrameTable};
//!
//! let delim: Delimiter = "tab".parse().unwrap();
//! let table = FrameTable::from_str_with("10\t1\t1.5\t2.0\n20\t1\t1.7\t2.1\n", delim).unwrap();
//! assert_eq!(table.len(), 2);
//! assert_eq!(table.frame_ids(), vec![10.0, 20.0]);
//! ```
//!
//! ## See also
//! ------------
//! * [`reader::read_frame_log`] – File entry point.
//! * [`crate::windowing`] – Consumer of [`FrameTable`]s.
use std::{io::Read, str::FromStr};

use itertools::Itertools;
use ndarray::{Array2, ArrayView1, ArrayView2};
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

use crate::{
    constants::{FrameId, FRAME_RECORD_WIDTH},
    pedgraph_errors::{ensure_shape, PedGraphError},
};

pub mod reader;

pub use reader::{read_frame_log, ParseFrameError};

/// Field separator of a frame log.
///
/// Single-byte separators go through the csv reader; [`Delimiter::Str`] splits each
/// trimmed line on the whole string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Delimiter {
    #[default]
    Tab,
    Space,
    Byte(u8),
    Str(String),
}

impl Delimiter {
    /// Byte used by the underlying csv reader, `None` for a multi-byte separator.
    pub fn as_byte(&self) -> Option<u8> {
        match self {
            Delimiter::Tab => Some(b'\t'),
            Delimiter::Space => Some(b' '),
            Delimiter::Byte(b) => Some(*b),
            Delimiter::Str(_) => None,
        }
    }
}

impl FromStr for Delimiter {
    type Err = PedGraphError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "tab" => Ok(Delimiter::Tab),
            "space" => Ok(Delimiter::Space),
            _ => match s.as_bytes() {
                [b'\t'] => Ok(Delimiter::Tab),
                [b' '] => Ok(Delimiter::Space),
                [b] => Ok(Delimiter::Byte(*b)),
                [] => Err(PedGraphError::InvalidDelimiter(s.to_string())),
                _ => Ok(Delimiter::Str(s.to_string())),
            },
        }
    }
}

/// Round `x` to `decimals` places, ties to even.
#[inline]
pub fn round_decimals(x: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (x * factor).round_ties_even() / factor
}

/// Parsed frame log: one row per record, columns `[frame_id, agent_id, x, y]`.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameTable {
    records: Array2<f64>,
}

impl FrameTable {
    /// Wrap an `[n, 4]` array of records.
    ///
    /// Return
    /// ----------
    /// * `Err(PedGraphError::ShapeMismatch)` if the array does not have 4 columns.
    pub fn new(records: Array2<f64>) -> Result<Self, PedGraphError> {
        let n = records.nrows();
        ensure_shape("frame records", &[n, FRAME_RECORD_WIDTH], records.shape())?;
        Ok(FrameTable { records })
    }

    /// Build a table from in-memory rows.
    pub fn from_rows(rows: &[[f64; FRAME_RECORD_WIDTH]]) -> Self {
        let records = Array2::from_shape_fn((rows.len(), FRAME_RECORD_WIDTH), |(i, j)| rows[i][j]);
        FrameTable { records }
    }

    /// Parse a frame log from any byte source.
    pub fn from_reader<R: Read>(source: R, delim: Delimiter) -> Result<Self, ParseFrameError> {
        reader::parse_records(source, delim)
    }

    /// Parse an in-memory frame log.
    pub fn from_str_with(content: &str, delim: Delimiter) -> Result<Self, ParseFrameError> {
        Self::from_reader(content.as_bytes(), delim)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.records.nrows()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.records.nrows() == 0
    }

    pub fn records(&self) -> ArrayView2<'_, f64> {
        self.records.view()
    }

    /// One record, `[frame_id, agent_id, x, y]`.
    pub fn record(&self, row: usize) -> ArrayView1<'_, f64> {
        self.records.row(row)
    }

    /// Sorted distinct frame ids.
    pub fn frame_ids(&self) -> Vec<FrameId> {
        self.records
            .column(0)
            .iter()
            .map(|&f| OrderedFloat(f))
            .sorted_unstable()
            .dedup()
            .map(|f| f.into_inner())
            .collect()
    }

    /// Copy of the table with every value rounded to `decimals` places.
    pub fn rounded(&self, decimals: i32) -> FrameTable {
        FrameTable {
            records: self.records.mapv(|v| round_decimals(v, decimals)),
        }
    }
}

#[cfg(test)]
mod frame_log_test {
    use super::*;

    #[test]
    fn test_delimiter_from_str() {
        assert_eq!("tab".parse::<Delimiter>().unwrap(), Delimiter::Tab);
        assert_eq!("space".parse::<Delimiter>().unwrap(), Delimiter::Space);
        assert_eq!("\t".parse::<Delimiter>().unwrap(), Delimiter::Tab);
        assert_eq!(",".parse::<Delimiter>().unwrap(), Delimiter::Byte(b','));
        assert_eq!("::".parse::<Delimiter>().unwrap(), Delimiter::Str("::".into()));
        assert_eq!(
            "".parse::<Delimiter>(),
            Err(PedGraphError::InvalidDelimiter(String::new()))
        );
    }

    #[test]
    fn test_round_decimals_ties_to_even() {
        assert_eq!(round_decimals(1.23456, 4), 1.2346);
        assert_eq!(round_decimals(-0.00004, 4), -0.0);
        assert_eq!(round_decimals(2.5, 0), 2.0);
        assert_eq!(round_decimals(3.5, 0), 4.0);
    }

    #[test]
    fn test_frame_ids_sorted_unique() {
        let table = FrameTable::from_rows(&[
            [20.0, 1.0, 0.0, 0.0],
            [10.0, 1.0, 0.0, 0.0],
            [20.0, 2.0, 0.0, 0.0],
            [0.0, 3.0, 0.0, 0.0],
        ]);
        assert_eq!(table.frame_ids(), vec![0.0, 10.0, 20.0]);
    }

    #[test]
    fn test_from_reader_comma_separated() {
        let src = std::io::Cursor::new("0,1,2.5,3.5\n1,1,2.6,3.4\n");
        let table = FrameTable::from_reader(src, Delimiter::Byte(b',')).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.record(1).to_vec(), vec![1.0, 1.0, 2.6, 3.4]);
    }

    #[test]
    fn test_rounded_copy() {
        let table = FrameTable::from_rows(&[[10.0, 1.0, 8.456_789, -3.000_049_9]]);
        let rounded = table.rounded(4);
        assert_eq!(rounded.record(0).to_vec(), vec![10.0, 1.0, 8.4568, -3.0]);
        assert_eq!(table.record(0)[2], 8.456_789);
    }

    #[test]
    fn test_new_rejects_wrong_width() {
        let err = FrameTable::new(Array2::zeros((3, 5))).unwrap_err();
        assert!(matches!(err, PedGraphError::ShapeMismatch { .. }));
    }
}
