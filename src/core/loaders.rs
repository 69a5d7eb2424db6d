//! Whitespace-delimited point table loading.
//!
//! Merged scan files are plain text tables: one point per line, a fixed
//! number of whitespace-separated numeric fields per line. The loader
//! rejects ragged or non-numeric rows instead of coercing them, since a
//! silently dropped row would corrupt downstream grouping and sampling.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Errors that can occur while loading a point table.
#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Empty point table: {0}")]
    EmptyTable(PathBuf),

    #[error("{path}:{line}: expected {expected} fields, found {found}")]
    RaggedRow {
        path: PathBuf,
        line: usize,
        expected: usize,
        found: usize,
    },

    #[error("{path}:{line}: non-numeric field '{field}'")]
    NonNumericField {
        path: PathBuf,
        line: usize,
        field: String,
    },
}

/// Result type for loader operations.
pub type Result<T> = std::result::Result<T, LoaderError>;

/// Row-major numeric point table with a fixed channel count.
///
/// All pipeline stages treat a `PointSet` as immutable and produce new sets;
/// the spatial coordinates are always the first three channels.
#[derive(Debug, Clone, PartialEq)]
pub struct PointSet {
    channels: usize,
    values: Vec<f64>,
}

impl PointSet {
    /// Creates an empty point set with the given channel count.
    pub fn new(channels: usize) -> Self {
        Self {
            channels,
            values: Vec::new(),
        }
    }

    /// Creates an empty point set with capacity for `rows` points.
    pub fn with_capacity(channels: usize, rows: usize) -> Self {
        Self {
            channels,
            values: Vec::with_capacity(channels * rows),
        }
    }

    /// Creates a point set from a flat row-major value buffer.
    ///
    /// `values.len()` must be a multiple of `channels`.
    pub fn from_values(channels: usize, values: Vec<f64>) -> Self {
        debug_assert!(channels > 0);
        debug_assert_eq!(values.len() % channels, 0);
        Self { channels, values }
    }

    /// Returns the number of channels per point.
    #[inline]
    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Returns the number of points.
    #[inline]
    pub fn len(&self) -> usize {
        self.values.len() / self.channels
    }

    /// Returns true if the point set has no points.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Returns the row at index `i`.
    #[inline]
    pub fn row(&self, i: usize) -> &[f64] {
        &self.values[i * self.channels..(i + 1) * self.channels]
    }

    /// Returns the spatial coordinates of the point at index `i`.
    #[inline]
    pub fn xyz(&self, i: usize) -> [f64; 3] {
        let row = self.row(i);
        [row[0], row[1], row[2]]
    }

    /// Appends a row; `row.len()` must equal the channel count.
    #[inline]
    pub fn push_row(&mut self, row: &[f64]) {
        debug_assert_eq!(row.len(), self.channels);
        self.values.extend_from_slice(row);
    }

    /// Returns the flat row-major value buffer.
    #[inline]
    pub fn values(&self) -> &[f64] {
        &self.values
    }
}

/// Load a whitespace-delimited numeric table from a text file.
///
/// Blank and whitespace-only lines are skipped. The first data line fixes
/// the column count; every subsequent line must match it exactly.
///
/// # Errors
///
/// Returns an error if the file cannot be read, contains no data lines,
/// has rows with a mismatched field count, or has non-numeric fields.
pub fn load_point_table<P: AsRef<Path>>(path: P) -> Result<PointSet> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let reader = BufReader::with_capacity(64 * 1024, file);

    let mut channels: Option<usize> = None;
    let mut values: Vec<f64> = Vec::new();

    for (line_idx, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let fields: Vec<&str> = trimmed.split_whitespace().collect();
        let expected = *channels.get_or_insert(fields.len());

        if fields.len() != expected {
            return Err(LoaderError::RaggedRow {
                path: path.to_path_buf(),
                line: line_idx + 1,
                expected,
                found: fields.len(),
            });
        }

        for field in fields {
            let value: f64 = field.parse().map_err(|_| LoaderError::NonNumericField {
                path: path.to_path_buf(),
                line: line_idx + 1,
                field: field.to_string(),
            })?;
            values.push(value);
        }
    }

    match channels {
        Some(channels) => Ok(PointSet::from_values(channels, values)),
        None => Err(LoaderError::EmptyTable(path.to_path_buf())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_point_set_operations() {
        let mut set = PointSet::new(3);
        assert!(set.is_empty());
        assert_eq!(set.len(), 0);

        set.push_row(&[1.0, 2.0, 3.0]);
        set.push_row(&[4.0, 5.0, 6.0]);

        assert_eq!(set.len(), 2);
        assert_eq!(set.channels(), 3);
        assert_eq!(set.row(0), &[1.0, 2.0, 3.0]);
        assert_eq!(set.row(1), &[4.0, 5.0, 6.0]);
        assert_eq!(set.xyz(1), [4.0, 5.0, 6.0]);
    }

    #[test]
    fn test_load_point_table() -> Result<()> {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "1.0 2.0 3.0 0.5 7").unwrap();
        writeln!(file).unwrap();
        writeln!(file, "  4.0 5.0 6.0 0.25 2  ").unwrap();
        file.flush().unwrap();

        let set = load_point_table(file.path())?;
        assert_eq!(set.len(), 2);
        assert_eq!(set.channels(), 5);
        assert_eq!(set.row(0), &[1.0, 2.0, 3.0, 0.5, 7.0]);
        assert_eq!(set.row(1), &[4.0, 5.0, 6.0, 0.25, 2.0]);

        Ok(())
    }

    #[test]
    fn test_load_point_table_empty_file() {
        let file = NamedTempFile::new().unwrap();

        let result = load_point_table(file.path());

        assert!(matches!(result, Err(LoaderError::EmptyTable(_))));
    }

    #[test]
    fn test_load_point_table_ragged_row() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "1.0 2.0 3.0").unwrap();
        writeln!(file, "4.0 5.0").unwrap();
        file.flush().unwrap();

        let result = load_point_table(file.path());

        match result.unwrap_err() {
            LoaderError::RaggedRow {
                line,
                expected,
                found,
                ..
            } => {
                assert_eq!(line, 2);
                assert_eq!(expected, 3);
                assert_eq!(found, 2);
            }
            other => panic!("expected RaggedRow, got {other:?}"),
        }
    }

    #[test]
    fn test_load_point_table_non_numeric() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "1.0 abc 3.0").unwrap();
        file.flush().unwrap();

        let result = load_point_table(file.path());

        match result.unwrap_err() {
            LoaderError::NonNumericField { line, field, .. } => {
                assert_eq!(line, 1);
                assert_eq!(field, "abc");
            }
            other => panic!("expected NonNumericField, got {other:?}"),
        }
    }
}
