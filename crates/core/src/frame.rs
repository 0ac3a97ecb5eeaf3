//! Positional tabular time series.
//!
//! A `TimeSeriesFrame` is an ordered index plus named `f64` columns of equal
//! length. Slicing is always by position, never by calendar time, so a fold's
//! `[start, end)` range maps directly onto rows.

use std::fmt;
use std::io::{Read, Write};
use std::ops::Range;
use std::path::Path;
use std::str::FromStr;

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::EvalError;

/// A row label: a timestamp or an integer position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum IndexLabel {
    Time(DateTime<Utc>),
    Position(i64),
}

impl fmt::Display for IndexLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Time(ts) => write!(f, "{}", ts.to_rfc3339()),
            Self::Position(p) => write!(f, "{p}"),
        }
    }
}

impl FromStr for IndexLabel {
    type Err = anyhow::Error;

    /// Parses an RFC 3339 timestamp, a `YYYY-MM-DD` date, or an integer.
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if let Ok(ts) = s.parse::<DateTime<Utc>>() {
            return Ok(Self::Time(ts));
        }
        if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
            let midnight = date
                .and_hms_opt(0, 0, 0)
                .context("Invalid midnight for date")?;
            return Ok(Self::Time(midnight.and_utc()));
        }
        let pos: i64 = s
            .parse()
            .with_context(|| format!("Unrecognised index label: {s:?}"))?;
        Ok(Self::Position(pos))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimeSeriesFrame {
    index: Vec<IndexLabel>,
    columns: Vec<(String, Vec<f64>)>,
}

impl TimeSeriesFrame {
    /// Creates an empty-columned frame over the given index.
    #[must_use]
    pub fn new(index: Vec<IndexLabel>) -> Self {
        Self {
            index,
            columns: Vec::new(),
        }
    }

    /// Creates a frame indexed by positions `0..len`.
    #[must_use]
    pub fn with_positions(len: usize) -> Self {
        Self::new((0..len as i64).map(IndexLabel::Position).collect())
    }

    /// Adds (or replaces) a column, builder style.
    ///
    /// # Errors
    ///
    /// Returns `LengthMismatch` if `values` does not match the index length.
    pub fn with_column(mut self, name: &str, values: Vec<f64>) -> Result<Self, EvalError> {
        self.insert_column(name, values)?;
        Ok(self)
    }

    /// Adds a column, replacing any existing column of the same name.
    ///
    /// # Errors
    ///
    /// Returns `LengthMismatch` if `values` does not match the index length.
    pub fn insert_column(&mut self, name: &str, values: Vec<f64>) -> Result<(), EvalError> {
        EvalError::check_len(self.index.len(), values.len())?;
        match self.columns.iter_mut().find(|(n, _)| n == name) {
            Some((_, existing)) => *existing = values,
            None => self.columns.push((name.to_string(), values)),
        }
        Ok(())
    }

    #[must_use]
    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.columns
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_slice())
    }

    /// Returns a column or a `MissingColumn` error.
    ///
    /// # Errors
    ///
    /// Returns `MissingColumn` if no column has this name.
    pub fn require_column(&self, name: &str) -> Result<&[f64], EvalError> {
        self.column(name)
            .ok_or_else(|| EvalError::MissingColumn(name.to_string()))
    }

    #[must_use]
    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(n, _)| n.as_str())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.index.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    #[must_use]
    pub fn index(&self) -> &[IndexLabel] {
        &self.index
    }

    #[must_use]
    pub fn first_label(&self) -> Option<IndexLabel> {
        self.index.first().copied()
    }

    #[must_use]
    pub fn last_label(&self) -> Option<IndexLabel> {
        self.index.last().copied()
    }

    /// Returns the rows in `range` as a new frame.
    ///
    /// The range is clamped to the frame length.
    #[must_use]
    pub fn slice(&self, range: Range<usize>) -> Self {
        let end = range.end.min(self.len());
        let start = range.start.min(end);
        Self {
            index: self.index[start..end].to_vec(),
            columns: self
                .columns
                .iter()
                .map(|(n, v)| (n.clone(), v[start..end].to_vec()))
                .collect(),
        }
    }

    /// Stacks frames row-wise.
    ///
    /// Columns are the union of all inputs in first-seen order; a frame that
    /// lacks a column contributes `NaN` for it.
    #[must_use]
    pub fn concat(frames: &[Self]) -> Self {
        let mut names: Vec<&str> = Vec::new();
        for frame in frames {
            for name in frame.column_names() {
                if !names.contains(&name) {
                    names.push(name);
                }
            }
        }

        let total: usize = frames.iter().map(Self::len).sum();
        let mut index = Vec::with_capacity(total);
        let mut columns: Vec<(String, Vec<f64>)> = names
            .iter()
            .map(|n| ((*n).to_string(), Vec::with_capacity(total)))
            .collect();

        for frame in frames {
            index.extend_from_slice(&frame.index);
            for (name, values) in &mut columns {
                match frame.column(name) {
                    Some(src) => values.extend_from_slice(src),
                    None => values.extend(std::iter::repeat(f64::NAN).take(frame.len())),
                }
            }
        }

        Self { index, columns }
    }

    /// Reads a frame from a CSV file.
    ///
    /// The first column is the index; every other column must be numeric.
    /// Empty cells and `NaN` are read as `NaN`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or a cell cannot be parsed.
    pub fn from_csv(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)
            .with_context(|| format!("Failed to open {}", path.display()))?;
        Self::from_csv_reader(file).with_context(|| format!("Failed to parse {}", path.display()))
    }

    /// Reads a frame from any CSV source.
    ///
    /// # Errors
    ///
    /// Returns an error if the CSV is malformed or a cell cannot be parsed.
    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Self> {
        let mut reader = csv::Reader::from_reader(reader);
        let headers = reader.headers()?.clone();
        if headers.is_empty() {
            anyhow::bail!("CSV has no header row");
        }

        let mut index = Vec::new();
        let mut columns: Vec<(String, Vec<f64>)> = headers
            .iter()
            .skip(1)
            .map(|h| (h.trim().to_string(), Vec::new()))
            .collect();

        for (row, result) in reader.records().enumerate() {
            let record = result?;
            index.push(record[0].parse::<IndexLabel>()?);
            for (col, (name, values)) in columns.iter_mut().enumerate() {
                let cell = record.get(col + 1).unwrap_or("").trim();
                let value = if cell.is_empty() || cell.eq_ignore_ascii_case("nan") {
                    f64::NAN
                } else {
                    cell.parse::<f64>().with_context(|| {
                        format!("Row {row}: column {name:?} is not numeric: {cell:?}")
                    })?
                };
                values.push(value);
            }
        }

        Ok(Self { index, columns })
    }

    /// Writes the frame to a CSV file with an `index` column first.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn to_csv(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let file = std::fs::File::create(path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        self.write_csv(file)
    }

    /// # Errors
    ///
    /// Returns an error if writing fails.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut writer = csv::Writer::from_writer(writer);
        let mut header = vec!["index".to_string()];
        header.extend(self.columns.iter().map(|(n, _)| n.clone()));
        writer.write_record(&header)?;

        for (row, label) in self.index.iter().enumerate() {
            let mut record = vec![label.to_string()];
            record.extend(self.columns.iter().map(|(_, v)| v[row].to_string()));
            writer.write_record(&record)?;
        }
        writer.flush()?;
        Ok(())
    }
}
