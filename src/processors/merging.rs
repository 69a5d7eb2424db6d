//! Leg file merging and component grouping.
//!
//! A scan session is a directory of per-viewpoint "leg" files. Merging
//! concatenates their rows in lexical-filename-then-line order and, in the
//! same pass, groups every row by the integer component identifier carried
//! at a fixed column position. A single malformed row aborts the whole
//! merge; a partially merged session would corrupt downstream grouping.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::core::schema::COMPONENT_COLUMN;
use crate::core::writers::{self, WriteError};

/// Errors that can occur while merging session legs.
#[derive(Debug, Error)]
pub enum MergeError {
    #[error("Session directory not found: {0}")]
    SessionNotFound(PathBuf),

    #[error("No leg files with extension '.{extension}' in directory: {path}")]
    NoLegFiles { path: PathBuf, extension: String },

    #[error("Failed to read leg file {path}: {source}")]
    LegRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path}:{line}: leg row has {found} fields, component id requires at least {needed}")]
    ShortRow {
        path: PathBuf,
        line: usize,
        found: usize,
        needed: usize,
    },

    #[error("{path}:{line}: component id '{field}' is not an integer")]
    BadComponentId {
        path: PathBuf,
        line: usize,
        field: String,
    },
}

/// Merged rows of one scan session plus their component grouping.
///
/// The grouping is a partition of `rows`: every row lands in exactly one
/// group, and insertion order is preserved within each group.
#[derive(Debug, Default)]
pub struct MergedScan {
    /// All leg rows in file-then-line order.
    pub rows: Vec<String>,
    /// Component id mapped to the rows carrying that id.
    pub components: BTreeMap<i64, Vec<String>>,
}

impl MergedScan {
    /// Component ids with their group sizes, in ascending id order.
    pub fn component_counts(&self) -> Vec<(i64, usize)> {
        self.components
            .iter()
            .map(|(&id, rows)| (id, rows.len()))
            .collect()
    }
}

/// Discover leg files in a session directory, sorted lexically by filename.
///
/// The lexical order makes merge output deterministic across runs.
pub fn find_leg_files(session_dir: &Path, extension: &str) -> Result<Vec<PathBuf>, MergeError> {
    if !session_dir.is_dir() {
        return Err(MergeError::SessionNotFound(session_dir.to_path_buf()));
    }

    let mut leg_files: Vec<PathBuf> = fs::read_dir(session_dir)
        .map_err(|e| MergeError::LegRead {
            path: session_dir.to_path_buf(),
            source: e,
        })?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file()
                && path
                    .extension()
                    .map(|ext| ext.eq_ignore_ascii_case(extension))
                    .unwrap_or(false)
        })
        .collect();

    leg_files.sort();

    if leg_files.is_empty() {
        return Err(MergeError::NoLegFiles {
            path: session_dir.to_path_buf(),
            extension: extension.to_string(),
        });
    }

    Ok(leg_files)
}

/// Merge all leg files of one scan session.
///
/// Rows are concatenated in lexical-filename-then-line order; blank and
/// whitespace-only lines are skipped and appear in neither output. Every
/// kept row must carry an integer component id at column index 8, which is
/// parsed for grouping but never reinterpreted.
pub fn merge_session_legs(session_dir: &Path, extension: &str) -> Result<MergedScan, MergeError> {
    let leg_files = find_leg_files(session_dir, extension)?;

    let mut scan = MergedScan::default();

    for leg_path in &leg_files {
        let file = File::open(leg_path).map_err(|e| MergeError::LegRead {
            path: leg_path.clone(),
            source: e,
        })?;
        let reader = BufReader::with_capacity(64 * 1024, file);

        for (line_idx, line) in reader.lines().enumerate() {
            let line = line.map_err(|e| MergeError::LegRead {
                path: leg_path.clone(),
                source: e,
            })?;
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            let component_id = parse_component_id(trimmed, leg_path, line_idx + 1)?;

            scan.rows.push(trimmed.to_string());
            scan.components
                .entry(component_id)
                .or_default()
                .push(trimmed.to_string());
        }
    }

    Ok(scan)
}

fn parse_component_id(row: &str, path: &Path, line: usize) -> Result<i64, MergeError> {
    let fields: Vec<&str> = row.split_whitespace().collect();

    if fields.len() <= COMPONENT_COLUMN {
        return Err(MergeError::ShortRow {
            path: path.to_path_buf(),
            line,
            found: fields.len(),
            needed: COMPONENT_COLUMN + 1,
        });
    }

    fields[COMPONENT_COLUMN]
        .parse::<i64>()
        .map_err(|_| MergeError::BadComponentId {
            path: path.to_path_buf(),
            line,
            field: fields[COMPONENT_COLUMN].to_string(),
        })
}

/// Write one row file per component id for the segmentation collaborator.
///
/// Files are named `<session>_component_<id>.xyz` and written atomically
/// next to the merged artifact. Returns the written paths in id order.
pub fn export_component_rows(
    scan: &MergedScan,
    output_dir: &Path,
    session: &str,
) -> Result<Vec<PathBuf>, WriteError> {
    let mut written = Vec::with_capacity(scan.components.len());

    for (id, rows) in &scan.components {
        let path = output_dir.join(format!("{}_component_{}.xyz", session, id));
        writers::write_merged_rows(&path, rows)?;
        written.push(path);
    }

    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    /// Writes an extended-schema leg file; component ids cycle through `ids`.
    fn create_leg_file(dir: &Path, name: &str, num_rows: usize, ids: &[i64]) -> PathBuf {
        let path = dir.join(name);
        let mut file = File::create(&path).unwrap();
        for i in 0..num_rows {
            let id = ids[i % ids.len()];
            writeln!(
                file,
                "{}.0 {}.5 {}.25 0.8 0.1 1 1 5 {} -1 42",
                i,
                i * 2,
                i * 3,
                id
            )
            .unwrap();
        }
        path
    }

    #[test]
    fn test_find_leg_files_sorted() {
        let temp_dir = TempDir::new().unwrap();
        create_leg_file(temp_dir.path(), "leg_b.xyz", 1, &[1]);
        create_leg_file(temp_dir.path(), "leg_a.xyz", 1, &[1]);
        create_leg_file(temp_dir.path(), "leg_c.xyz", 1, &[1]);
        File::create(temp_dir.path().join("notes.txt")).unwrap();

        let files = find_leg_files(temp_dir.path(), "xyz").unwrap();

        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["leg_a.xyz", "leg_b.xyz", "leg_c.xyz"]);
    }

    #[test]
    fn test_find_leg_files_missing_directory() {
        let temp_dir = TempDir::new().unwrap();

        let result = find_leg_files(&temp_dir.path().join("absent"), "xyz");

        assert!(matches!(result, Err(MergeError::SessionNotFound(_))));
    }

    #[test]
    fn test_find_leg_files_empty_directory() {
        let temp_dir = TempDir::new().unwrap();

        let result = find_leg_files(temp_dir.path(), "xyz");

        assert!(matches!(result, Err(MergeError::NoLegFiles { .. })));
    }

    #[test]
    fn test_merge_three_legs_preserves_order_and_partitions() {
        let temp_dir = TempDir::new().unwrap();
        create_leg_file(temp_dir.path(), "leg_1.xyz", 10, &[1, 2]);
        create_leg_file(temp_dir.path(), "leg_2.xyz", 15, &[2]);
        create_leg_file(temp_dir.path(), "leg_3.xyz", 5, &[1]);

        let scan = merge_session_legs(temp_dir.path(), "xyz").unwrap();

        assert_eq!(scan.rows.len(), 30);
        // rows of leg_1 come first, in line order
        assert!(scan.rows[0].starts_with("0.0 0.5 0.25"));
        assert!(scan.rows[9].starts_with("9.0 18.5 27.25"));

        let counts = scan.component_counts();
        assert_eq!(counts.len(), 2);
        let total: usize = counts.iter().map(|(_, n)| n).sum();
        assert_eq!(total, 30);
        assert_eq!(scan.components[&1].len(), 10); // 5 from leg_1, 5 from leg_3
        assert_eq!(scan.components[&2].len(), 20); // 5 from leg_1, 15 from leg_2
    }

    #[test]
    fn test_merge_is_deterministic() {
        let temp_dir = TempDir::new().unwrap();
        create_leg_file(temp_dir.path(), "leg_1.xyz", 8, &[1, 2, 3]);
        create_leg_file(temp_dir.path(), "leg_2.xyz", 4, &[2]);

        let first = merge_session_legs(temp_dir.path(), "xyz").unwrap();
        let second = merge_session_legs(temp_dir.path(), "xyz").unwrap();

        assert_eq!(first.rows, second.rows);
        assert_eq!(first.rows.join("\n"), second.rows.join("\n"));
    }

    #[test]
    fn test_merge_skips_blank_lines() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("leg_1.xyz");
        let mut file = File::create(&path).unwrap();
        writeln!(file, "1 2 3 0.5 0.1 1 1 5 1 -1 42").unwrap();
        writeln!(file).unwrap();
        writeln!(file, "   ").unwrap();
        writeln!(file, "4 5 6 0.5 0.1 1 1 5 2 -1 42").unwrap();

        let scan = merge_session_legs(temp_dir.path(), "xyz").unwrap();

        assert_eq!(scan.rows.len(), 2);
        assert_eq!(scan.components.len(), 2);
    }

    #[test]
    fn test_merge_fails_on_short_row() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("leg_1.xyz");
        let mut file = File::create(&path).unwrap();
        writeln!(file, "1 2 3 0.5 0.1 1 1 5 1 -1 42").unwrap();
        writeln!(file, "1 2 3").unwrap();

        let result = merge_session_legs(temp_dir.path(), "xyz");

        match result.unwrap_err() {
            MergeError::ShortRow {
                line,
                found,
                needed,
                ..
            } => {
                assert_eq!(line, 2);
                assert_eq!(found, 3);
                assert_eq!(needed, 9);
            }
            other => panic!("expected ShortRow, got {other:?}"),
        }
    }

    #[test]
    fn test_merge_fails_on_non_integer_component_id() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("leg_1.xyz");
        let mut file = File::create(&path).unwrap();
        writeln!(file, "1 2 3 0.5 0.1 1 1 5 deck -1 42").unwrap();

        let result = merge_session_legs(temp_dir.path(), "xyz");

        match result.unwrap_err() {
            MergeError::BadComponentId { line, field, .. } => {
                assert_eq!(line, 1);
                assert_eq!(field, "deck");
            }
            other => panic!("expected BadComponentId, got {other:?}"),
        }
    }

    #[test]
    fn test_export_component_rows() {
        let temp_dir = TempDir::new().unwrap();
        create_leg_file(temp_dir.path(), "leg_1.xyz", 6, &[1, 2]);
        let scan = merge_session_legs(temp_dir.path(), "xyz").unwrap();

        let out_dir = temp_dir.path().join("segmented");
        let written = export_component_rows(&scan, &out_dir, "bridge_9").unwrap();

        assert_eq!(written.len(), 2);
        assert!(out_dir.join("bridge_9_component_1.xyz").exists());
        assert!(out_dir.join("bridge_9_component_2.xyz").exists());

        let content = fs::read_to_string(out_dir.join("bridge_9_component_1.xyz")).unwrap();
        assert_eq!(content.lines().count(), 3);
    }
}
