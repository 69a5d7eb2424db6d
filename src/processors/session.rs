//! Per-session orchestration of the pipeline stages.
//!
//! A session is processed to completion in a single thread:
//! merge -> write merged artifact -> extract -> resample -> normalize ->
//! serialize. Sessions are independent of each other (disjoint input
//! directories, output names keyed by session name), so batch runs process
//! them in parallel.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::{info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;

use crate::config::PipelineConfig;
use crate::core::{loaders, schema, transforms, writers};

use super::merging::{self, MergeError, MergedScan};

/// Artifacts produced while converting one scan file to a tensor.
#[derive(Debug)]
pub struct ConvertOutcome {
    /// Path of the written `.npy` artifact.
    pub tensor_path: PathBuf,
    /// Shape of the written tensor as (rows, channels).
    pub tensor_shape: (usize, usize),
}

/// Artifacts produced for one fully processed session.
#[derive(Debug)]
pub struct SessionOutcome {
    /// Session name (the session directory's file name).
    pub session: String,
    /// Path of the merged text artifact.
    pub merged_path: PathBuf,
    /// Number of merged rows.
    pub merged_rows: usize,
    /// Component ids and their group sizes.
    pub component_counts: Vec<(i64, usize)>,
    /// Path of the written `.npy` artifact.
    pub tensor_path: PathBuf,
    /// Shape of the written tensor as (rows, channels).
    pub tensor_shape: (usize, usize),
}

fn sampling_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

fn session_name(session_dir: &Path) -> String {
    session_dir
        .file_name()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "session".to_string())
}

/// Merge a session's leg files and write the merged text artifact.
///
/// Returns the merged artifact path together with the in-memory scan, whose
/// component grouping is the hand-off point for the segmentation
/// collaborator. With `merge.export_components` enabled the grouping is also
/// persisted as per-component row files.
pub fn merge_session(
    session_dir: &Path,
    output_dir: &Path,
    config: &PipelineConfig,
) -> Result<(PathBuf, MergedScan)> {
    let session = session_name(session_dir);
    let scan = merging::merge_session_legs(session_dir, &config.merge.leg_extension)?;

    let merged_path = output_dir.join(format!(
        "{}_complete.{}",
        session, config.merge.leg_extension
    ));
    writers::write_merged_rows(&merged_path, &scan.rows)?;
    info!(
        "merged {} rows into {}",
        scan.rows.len(),
        merged_path.display()
    );

    if config.merge.export_components {
        let written = merging::export_component_rows(&scan, output_dir, &session)?;
        info!("exported {} component files", written.len());
    }

    Ok((merged_path, scan))
}

/// Convert one merged scan file into a normalized `.npy` tensor artifact.
///
/// Stages: load table -> resolve schema and extract channels -> resample to
/// the configured cardinality -> unit-sphere normalize -> serialize. Every
/// stage produces a new point set; nothing is mutated in place, and a
/// failure before the final rename leaves no partial artifact.
pub fn convert_scan_file(
    input: &Path,
    output_dir: &Path,
    config: &PipelineConfig,
) -> Result<ConvertOutcome> {
    let table = loaders::load_point_table(input)
        .with_context(|| format!("loading point table {}", input.display()))?;

    let extracted = schema::extract_channels(&table, config.formats.color_padding)
        .with_context(|| format!("resolving schema of {}", input.display()))?;

    let mut rng = sampling_rng(config.sampling.seed);
    let resampled = transforms::resample(&extracted, config.sampling.target_points, &mut rng)
        .with_context(|| format!("resampling {}", input.display()))?;

    let normalized = transforms::normalize_unit_sphere(&resampled)
        .with_context(|| format!("normalizing {}", input.display()))?;

    let tensor_path = output_dir.join(writers::derive_output_name(
        input,
        config.sampling.target_points,
    ));
    writers::write_npy_tensor(&tensor_path, &normalized)?;
    info!(
        "wrote tensor {} with shape ({}, {})",
        tensor_path.display(),
        normalized.len(),
        normalized.channels()
    );

    Ok(ConvertOutcome {
        tensor_path,
        tensor_shape: (normalized.len(), normalized.channels()),
    })
}

/// Run the full pipeline for one session directory.
pub fn process_session(
    session_dir: &Path,
    output_dir: &Path,
    config: &PipelineConfig,
) -> Result<SessionOutcome> {
    let session = session_name(session_dir);
    let merged_dir = output_dir.join("merged");
    let npy_dir = output_dir.join("npy");

    let (merged_path, scan) = merge_session(session_dir, &merged_dir, config)?;
    let converted = convert_scan_file(&merged_path, &npy_dir, config)?;

    Ok(SessionOutcome {
        session,
        merged_rows: scan.rows.len(),
        component_counts: scan.component_counts(),
        merged_path,
        tensor_path: converted.tensor_path,
        tensor_shape: converted.tensor_shape,
    })
}

/// Process every session directory under `root`.
///
/// Sessions without leg files are reported and skipped; any other failure is
/// fatal for its session only, and the batch continues with the rest.
/// Sessions run in parallel since their inputs and outputs are disjoint.
pub fn process_batch(
    root: &Path,
    output_dir: &Path,
    config: &PipelineConfig,
) -> Result<Vec<SessionOutcome>> {
    let mut session_dirs: Vec<PathBuf> = fs::read_dir(root)
        .with_context(|| format!("reading sessions root {}", root.display()))?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_dir())
        .collect();

    session_dirs.sort();

    let mut outcomes: Vec<SessionOutcome> = session_dirs
        .par_iter()
        .filter_map(|session_dir| {
            match process_session(session_dir, output_dir, config) {
                Ok(outcome) => Some(outcome),
                Err(e) => {
                    if e.downcast_ref::<MergeError>()
                        .map(|m| matches!(m, MergeError::NoLegFiles { .. }))
                        .unwrap_or(false)
                    {
                        warn!("skipping {}: {}", session_dir.display(), e);
                    } else {
                        log::error!("session {} failed: {:#}", session_dir.display(), e);
                    }
                    None
                }
            }
        })
        .collect();

    outcomes.sort_by(|a, b| a.session.cmp(&b.session));
    Ok(outcomes)
}
