//! Merged-text and `.npy` tensor output.
//!
//! All artifacts are written to a temporary sibling path and renamed into
//! place, so a failed step never leaves a truncated file behind.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use npyz::WriterBuilder;
use regex::Regex;
use thiserror::Error;

use super::loaders::PointSet;

/// Errors that can occur during write operations.
#[derive(Error, Debug)]
pub enum WriteError {
    /// Failed to create parent directories.
    #[error("failed to create parent directories for '{path}': {source}")]
    CreateDirectory {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Failed to create or open a file.
    #[error("failed to create file '{path}': {source}")]
    CreateFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Failed to write data to a file.
    #[error("failed to write to file '{path}': {source}")]
    WriteFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Failed to read a tensor artifact back.
    #[error("failed to read tensor '{path}': {source}")]
    ReadFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Failed to move a finished artifact into place.
    #[error("failed to rename '{from}' -> '{to}': {source}")]
    Rename {
        from: String,
        to: String,
        #[source]
        source: std::io::Error,
    },
}

/// Result type for write operations.
pub type Result<T> = std::result::Result<T, WriteError>;

/// Creates parent directories for a file path if they don't exist.
fn ensure_parent_dirs(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent).map_err(|e| WriteError::CreateDirectory {
                path: parent.display().to_string(),
                source: e,
            })?;
        }
    }
    Ok(())
}

fn commit(tmp: &Path, path: &Path) -> Result<()> {
    fs::rename(tmp, path).map_err(|e| WriteError::Rename {
        from: tmp.display().to_string(),
        to: path.display().to_string(),
        source: e,
    })
}

/// Derive the tensor artifact file name from a source file.
///
/// Source stems matching `bridge_<digits>` (case-insensitive) map to
/// `bridge_<digits>_<target_points>.npy`; anything else falls back to
/// `<stem>_<target_points>.npy`.
pub fn derive_output_name(source: &Path, target_points: usize) -> String {
    let session_pattern = Regex::new(r"(?i)bridge_(\d+)").unwrap();

    let stem = source
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default();

    match session_pattern.captures(stem).and_then(|c| c.get(1)) {
        Some(id) => format!("bridge_{}_{}.npy", id.as_str(), target_points),
        None => format!("{}_{}.npy", stem, target_points),
    }
}

/// Write merged scan rows as newline-joined text with a trailing newline.
///
/// The rows are written verbatim in their given order, to a temporary file
/// that is renamed over `path` once fully flushed.
pub fn write_merged_rows(path: &Path, rows: &[String]) -> Result<()> {
    ensure_parent_dirs(path)?;

    let tmp = path.with_extension("xyz.tmp");
    let tmp_str = tmp.display().to_string();

    let file = File::create(&tmp).map_err(|e| WriteError::CreateFile {
        path: tmp_str.clone(),
        source: e,
    })?;
    let mut writer = BufWriter::with_capacity(1024 * 1024, file);

    for row in rows {
        writeln!(writer, "{}", row).map_err(|e| WriteError::WriteFile {
            path: tmp_str.clone(),
            source: e,
        })?;
    }

    writer.flush().map_err(|e| WriteError::WriteFile {
        path: tmp_str,
        source: e,
    })?;
    drop(writer);

    commit(&tmp, path)
}

/// Write a point set as a `(rows, channels)` f32 `.npy` artifact.
///
/// Values are cast to f32 at the write boundary; no other transformation
/// happens here. The write goes to a `.npy.tmp` sibling and is renamed into
/// place on success.
pub fn write_npy_tensor(path: &Path, set: &PointSet) -> Result<()> {
    ensure_parent_dirs(path)?;

    let tmp = path.with_extension("npy.tmp");
    let tmp_str = tmp.display().to_string();

    let file = File::create(&tmp).map_err(|e| WriteError::CreateFile {
        path: tmp_str.clone(),
        source: e,
    })?;

    let mut writer: npyz::NpyWriter<f32, _> = npyz::WriteOptions::new()
        .default_dtype()
        .shape(&[set.len() as u64, set.channels() as u64])
        .writer(BufWriter::new(file))
        .begin_nd()
        .map_err(|e| WriteError::WriteFile {
            path: tmp_str.clone(),
            source: e,
        })?;

    writer
        .extend(set.values().iter().map(|&v| v as f32))
        .map_err(|e| WriteError::WriteFile {
            path: tmp_str.clone(),
            source: e,
        })?;

    writer.finish().map_err(|e| WriteError::WriteFile {
        path: tmp_str,
        source: e,
    })?;

    commit(&tmp, path)
}

/// Read a `(rows, channels)` f32 `.npy` artifact back.
///
/// Returns the stored shape and the flat row-major values.
pub fn read_npy_tensor(path: &Path) -> Result<(Vec<u64>, Vec<f32>)> {
    let path_str = path.display().to_string();

    let file = File::open(path).map_err(|e| WriteError::ReadFile {
        path: path_str.clone(),
        source: e,
    })?;

    let npy = npyz::NpyFile::new(BufReader::new(file)).map_err(|e| WriteError::ReadFile {
        path: path_str.clone(),
        source: e,
    })?;
    let shape = npy.shape().to_vec();
    let values = npy.into_vec::<f32>().map_err(|e| WriteError::ReadFile {
        path: path_str,
        source: e,
    })?;

    Ok((shape, values))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_derive_output_name_from_session_stem() {
        assert_eq!(
            derive_output_name(Path::new("/data/bridge_5_complete.xyz"), 8192),
            "bridge_5_8192.npy"
        );
        assert_eq!(
            derive_output_name(Path::new("TLS_bridge_17.xyz"), 1024),
            "bridge_17_1024.npy"
        );
        assert_eq!(
            derive_output_name(Path::new("BRIDGE_3.xyz"), 8192),
            "bridge_3_8192.npy"
        );
    }

    #[test]
    fn test_derive_output_name_fallback() {
        assert_eq!(
            derive_output_name(Path::new("/data/viaduct_scan.xyz"), 8192),
            "viaduct_scan_8192.npy"
        );
    }

    #[test]
    fn test_write_merged_rows() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("merged.xyz");
        let rows = vec!["1 2 3".to_string(), "4 5 6".to_string()];

        write_merged_rows(&path, &rows).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content, "1 2 3\n4 5 6\n");
        // no temporary file left behind
        assert!(!dir.path().join("merged.xyz.tmp").exists());
    }

    #[test]
    fn test_write_merged_rows_creates_parent_dirs() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("merged").join("session").join("out.xyz");

        write_merged_rows(&path, &["0 0 0".to_string()]).unwrap();

        assert!(path.exists());
    }

    #[test]
    fn test_npy_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tensor.npy");

        let mut set = PointSet::new(5);
        set.push_row(&[0.25, -1.5, 3.0, 0.8, 7.0]);
        set.push_row(&[1.0, 2.0, -3.0, 0.1, 2.0]);
        set.push_row(&[-0.5, 0.0, 0.125, 0.9, 7.0]);

        write_npy_tensor(&path, &set).unwrap();
        let (shape, values) = read_npy_tensor(&path).unwrap();

        assert_eq!(shape, vec![3, 5]);
        assert_eq!(values.len(), 15);
        for (read, orig) in values.iter().zip(set.values()) {
            assert!((f64::from(*read) - orig).abs() < 1e-6);
        }
        assert!(!dir.path().join("tensor.npy.tmp").exists());
    }

    #[test]
    fn test_read_npy_tensor_missing_file() {
        let dir = tempdir().unwrap();

        let result = read_npy_tensor(&dir.path().join("missing.npy"));

        assert!(matches!(result, Err(WriteError::ReadFile { .. })));
    }
}
