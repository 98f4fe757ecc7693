//! # Frame log reader
//!
//! Parses delimited `frame_id agent_id x y` text into a [`FrameTable`].
//!
//! ## Parsing rules
//! -----------------
//! * No header line; empty lines are ignored.
//! * Fields are trimmed. With a whitespace delimiter (tab, space), empty fields at
//!   the start or end of a line are dropped, so stray leading/trailing separators
//!   are tolerated.
//! * Single-byte delimiters are decoded by the `csv` reader. A multi-byte
//!   [`Delimiter::Str`] splits each trimmed line on the whole string.
//! * Every remaining record must contain exactly four fields
//!   ([`ParseFrameError::WrongFieldCount`]) and every field must parse as `f64`
//!   ([`ParseFrameError::InvalidNumber`]).
//! * The first failure aborts the whole file: no partial table is returned and
//!   nothing is imputed.
//!
//! ## See also
//! ------------
//! * [`Delimiter`] – Delimiter specifier.
//! * [`crate::dataset::TrajectoryDataset::from_dir`] – Reads every file of a directory.
use std::io::{BufRead, BufReader, Read};

use camino::Utf8Path;
use csv::{ReaderBuilder, Trim};
use ndarray::Array2;
use smallvec::SmallVec;
use thiserror::Error;

use crate::{
    constants::FRAME_RECORD_WIDTH,
    frame_log::{Delimiter, FrameTable},
    pedgraph_errors::PedGraphError,
};

/// Line-level parsing errors for frame logs.
///
/// Variants
/// -----------------
/// * `WrongFieldCount` – The record does not have exactly four fields.
/// * `InvalidNumber` – A field is not a floating-point number; payload carries the token.
/// * `Malformed` – The csv layer could not decode the line (invalid UTF-8, I/O failure).
#[derive(Error, Debug, PartialEq)]
pub enum ParseFrameError {
    #[error("line {line}: expected 4 fields, found {found}")]
    WrongFieldCount { line: u64, found: usize },
    #[error("line {line}: invalid number {token:?}")]
    InvalidNumber { line: u64, token: String },
    #[error("malformed record: {0}")]
    Malformed(String),
}

/// Parse every record of `source`.
pub(crate) fn parse_records<R: Read>(
    source: R,
    delim: Delimiter,
) -> Result<FrameTable, ParseFrameError> {
    let values = match &delim {
        Delimiter::Tab => csv_values(source, b'\t', true)?,
        Delimiter::Space => csv_values(source, b' ', true)?,
        Delimiter::Byte(b) => csv_values(source, *b, b.is_ascii_whitespace())?,
        Delimiter::Str(sep) => split_values(source, sep)?,
    };

    let n = values.len() / FRAME_RECORD_WIDTH;
    let records = Array2::from_shape_vec((n, FRAME_RECORD_WIDTH), values)
        .map_err(|e| ParseFrameError::Malformed(e.to_string()))?;
    Ok(FrameTable { records })
}

/// Single-byte separators, decoded by the csv reader.
fn csv_values<R: Read>(
    source: R,
    byte: u8,
    whitespace: bool,
) -> Result<Vec<f64>, ParseFrameError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(Trim::All)
        .delimiter(byte)
        .from_reader(source);

    let mut values: Vec<f64> = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| ParseFrameError::Malformed(e.to_string()))?;
        let line = record.position().map(|p| p.line()).unwrap_or(0);

        let mut fields: SmallVec<[&str; FRAME_RECORD_WIDTH]> = record.iter().collect();
        if whitespace {
            while fields.last().is_some_and(|f| f.is_empty()) {
                fields.pop();
            }
            let leading = fields.iter().take_while(|f| f.is_empty()).count();
            fields.drain(..leading);
        }
        push_record(&fields, line, &mut values)?;
    }
    Ok(values)
}

/// Multi-byte separators: every trimmed, non-empty line is split on the string.
fn split_values<R: Read>(source: R, sep: &str) -> Result<Vec<f64>, ParseFrameError> {
    let mut values: Vec<f64> = Vec::new();
    for (idx, line) in BufReader::new(source).lines().enumerate() {
        let line = line.map_err(|e| ParseFrameError::Malformed(e.to_string()))?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let fields: SmallVec<[&str; FRAME_RECORD_WIDTH]> =
            trimmed.split(sep).map(str::trim).collect();
        push_record(&fields, idx as u64 + 1, &mut values)?;
    }
    Ok(values)
}

/// Check the field count of one record and append its parsed values.
fn push_record(fields: &[&str], line: u64, values: &mut Vec<f64>) -> Result<(), ParseFrameError> {
    if fields.len() != FRAME_RECORD_WIDTH {
        return Err(ParseFrameError::WrongFieldCount {
            line,
            found: fields.len(),
        });
    }
    for &token in fields {
        let v: f64 = token.parse().map_err(|_| ParseFrameError::InvalidNumber {
            line,
            token: token.to_string(),
        })?;
        values.push(v);
    }
    Ok(())
}

/// Read a full frame log from disk.
///
/// Arguments
/// -----------------
/// * `path` – Text file with one `frame_id agent_id x y` record per line.
/// * `delim` – Field separator.
///
/// Return
/// ----------
/// * The parsed [`FrameTable`] (raw values, not rounded).
/// * `Err(PedGraphError::Io)` if the file cannot be opened.
/// * `Err(PedGraphError::FrameLogParse)` on the first malformed line.
pub fn read_frame_log(path: &Utf8Path, delim: Delimiter) -> Result<FrameTable, PedGraphError> {
    let file = std::fs::File::open(path)?;
    parse_records(std::io::BufReader::new(file), delim).map_err(|source| {
        PedGraphError::FrameLogParse {
            path: path.to_owned(),
            source,
        }
    })
}
