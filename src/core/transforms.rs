//! Point set resampling and unit-sphere normalization.
//!
//! The resampler rewrites a point set to an exact target cardinality:
//! farthest-point sampling when reducing, sampling with replacement when
//! enlarging. The normalizer recenters the spatial channels at their
//! centroid and rescales so the farthest point sits on the unit sphere.

use rand::rngs::StdRng;
use rand::Rng;
use thiserror::Error;

use super::loaders::PointSet;

/// Errors that can occur during point set transforms.
#[derive(Error, Debug)]
pub enum TransformError {
    #[error("cannot resample an empty point set")]
    EmptyPointSet,

    #[error("cannot resample to zero points")]
    ZeroTarget,

    #[error("point set has {channels} channels, need at least 3 spatial channels")]
    MissingSpatialChannels { channels: usize },

    #[error("degenerate point set: max centered norm is {scale}, cannot scale to unit sphere")]
    DegenerateScale { scale: f64 },
}

/// Result type for transform operations.
pub type Result<T> = std::result::Result<T, TransformError>;

/// Rewrite a point set to exactly `target` points.
///
/// - `n > target`: farthest-point sampling over the spatial channels.
/// - `n < target`: uniform sampling with replacement from the existing rows.
/// - `n == target`: the set is returned unchanged, in its original order,
///   without consuming randomness.
///
/// The RNG is injected so runs can be reproduced by seeding it.
pub fn resample(set: &PointSet, target: usize, rng: &mut StdRng) -> Result<PointSet> {
    if set.is_empty() {
        return Err(TransformError::EmptyPointSet);
    }
    if target == 0 {
        return Err(TransformError::ZeroTarget);
    }
    if set.channels() < 3 {
        return Err(TransformError::MissingSpatialChannels {
            channels: set.channels(),
        });
    }

    let n = set.len();
    if n == target {
        return Ok(set.clone());
    }

    let indices = if n > target {
        farthest_point_indices(set, target, rng.gen_range(0..n))
    } else {
        (0..target).map(|_| rng.gen_range(0..n)).collect()
    };

    let mut resampled = PointSet::with_capacity(set.channels(), target);
    for i in indices {
        resampled.push_row(set.row(i));
    }
    Ok(resampled)
}

/// Greedy farthest-point sampling over the x, y, z channels.
///
/// Starting from `start`, repeatedly selects the point whose minimum squared
/// distance to the already-selected set is largest, then relaxes the
/// distance array against the new pick. Ties are broken by the lowest index
/// (strict `>` comparison in ascending scan order). Runs in O(n * target)
/// time with O(n) auxiliary space.
///
/// The greedy heuristic does not find the optimal covering subset, but
/// guarantees each pick is as far as possible from everything chosen so far.
pub fn farthest_point_indices(set: &PointSet, target: usize, start: usize) -> Vec<usize> {
    let n = set.len();
    debug_assert!(start < n);
    debug_assert!(target <= n);

    let mut selected = Vec::with_capacity(target);
    let mut min_dist = vec![f64::INFINITY; n];
    let mut farthest = start;

    for _ in 0..target {
        selected.push(farthest);
        let [cx, cy, cz] = set.xyz(farthest);

        let mut next = 0;
        let mut next_dist = f64::NEG_INFINITY;
        for (i, slot) in min_dist.iter_mut().enumerate() {
            let [x, y, z] = set.xyz(i);
            let dx = x - cx;
            let dy = y - cy;
            let dz = z - cz;
            let dist = dx * dx + dy * dy + dz * dz;
            if dist < *slot {
                *slot = dist;
            }
            if *slot > next_dist {
                next_dist = *slot;
                next = i;
            }
        }
        farthest = next;
    }

    selected
}

/// Recenter and rescale the spatial channels into the unit sphere.
///
/// The centroid of the first three channels is subtracted from every point
/// and the result is divided by the maximum centered norm. Non-spatial
/// channels pass through unchanged in their original order. The input set
/// is left intact; a new `PointSet` is returned.
///
/// # Errors
///
/// Returns `DegenerateScale` when the maximum centered norm is zero or
/// non-finite (coincident points), since dividing by it would produce
/// non-finite coordinates.
pub fn normalize_unit_sphere(set: &PointSet) -> Result<PointSet> {
    if set.is_empty() {
        return Err(TransformError::EmptyPointSet);
    }
    if set.channels() < 3 {
        return Err(TransformError::MissingSpatialChannels {
            channels: set.channels(),
        });
    }

    let n = set.len();
    let mut centroid = [0.0f64; 3];
    for i in 0..n {
        let [x, y, z] = set.xyz(i);
        centroid[0] += x;
        centroid[1] += y;
        centroid[2] += z;
    }
    centroid[0] /= n as f64;
    centroid[1] /= n as f64;
    centroid[2] /= n as f64;

    let mut max_norm = 0.0f64;
    for i in 0..n {
        let [x, y, z] = set.xyz(i);
        let dx = x - centroid[0];
        let dy = y - centroid[1];
        let dz = z - centroid[2];
        let norm = (dx * dx + dy * dy + dz * dz).sqrt();
        if norm > max_norm {
            max_norm = norm;
        }
    }

    if max_norm == 0.0 || !max_norm.is_finite() {
        return Err(TransformError::DegenerateScale { scale: max_norm });
    }

    let mut normalized = PointSet::with_capacity(set.channels(), n);
    let mut row_buf = Vec::with_capacity(set.channels());
    for i in 0..n {
        let row = set.row(i);
        row_buf.clear();
        row_buf.push((row[0] - centroid[0]) / max_norm);
        row_buf.push((row[1] - centroid[1]) / max_norm);
        row_buf.push((row[2] - centroid[2]) / max_norm);
        row_buf.extend_from_slice(&row[3..]);
        normalized.push_row(&row_buf);
    }

    Ok(normalized)
}
