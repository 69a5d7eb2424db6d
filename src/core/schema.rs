//! Point table schema classification and channel extraction.
//!
//! Two layouts are recognized, distinguished by column count alone. Any
//! other width is rejected outright; there is no best-effort extraction.

use thiserror::Error;

use super::loaders::PointSet;

/// Column count of the extended scan schema.
pub const EXTENDED_COLUMNS: usize = 11;

/// Column count of the colored schema.
pub const COLORED_COLUMNS: usize = 6;

/// Column index of the component identifier in extended scan rows.
pub const COMPONENT_COLUMN: usize = 8;

/// Extended-schema columns retained downstream: x, y, z, intensity, classification.
const EXTENDED_KEEP: [usize; 5] = [0, 1, 2, 3, 7];

/// Errors that can occur during schema resolution.
#[derive(Error, Debug)]
pub enum FormatError {
    #[error("unsupported column count {found}: expected {EXTENDED_COLUMNS} (extended scan) or {COLORED_COLUMNS} (colored)")]
    UnknownColumnCount { found: usize },
}

/// Recognized point table layouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanSchema {
    /// 11-column simulator output:
    /// `x y z intensity echo_width return_num num_returns classification
    /// gps_time full_wave_idx hit_object_id`
    Extended,
    /// 6-column `x y z r g b` with 8-bit color values
    Colored,
}

impl ScanSchema {
    /// Classify a table by its column count.
    pub fn classify(columns: usize) -> Result<Self, FormatError> {
        match columns {
            EXTENDED_COLUMNS => Ok(ScanSchema::Extended),
            COLORED_COLUMNS => Ok(ScanSchema::Colored),
            found => Err(FormatError::UnknownColumnCount { found }),
        }
    }

    /// Number of channels after extraction.
    pub fn output_channels(&self, color_padding: bool) -> usize {
        if color_padding {
            return 6;
        }
        match self {
            ScanSchema::Extended => EXTENDED_KEEP.len(),
            ScanSchema::Colored => COLORED_COLUMNS,
        }
    }
}

/// Extract the canonical channel layout from a raw table.
///
/// - Extended scan: keeps columns `[0, 1, 2, 3, 7]`
///   (x, y, z, intensity, classification).
/// - Colored: keeps all 6 columns and divides r, g, b by 255.
///
/// With `color_padding` the non-spatial channels are discarded and replaced
/// by three zero channels, so both schemas yield a 6-channel set.
///
/// The input table is left untouched; a new `PointSet` is returned.
pub fn extract_channels(table: &PointSet, color_padding: bool) -> Result<PointSet, FormatError> {
    let schema = ScanSchema::classify(table.channels())?;
    let rows = table.len();

    let mut extracted = PointSet::with_capacity(schema.output_channels(color_padding), rows);

    for i in 0..rows {
        let row = table.row(i);
        match (schema, color_padding) {
            (_, true) => {
                extracted.push_row(&[row[0], row[1], row[2], 0.0, 0.0, 0.0]);
            }
            (ScanSchema::Extended, false) => {
                let kept: Vec<f64> = EXTENDED_KEEP.iter().map(|&c| row[c]).collect();
                extracted.push_row(&kept);
            }
            (ScanSchema::Colored, false) => {
                extracted.push_row(&[
                    row[0],
                    row[1],
                    row[2],
                    row[3] / 255.0,
                    row[4] / 255.0,
                    row[5] / 255.0,
                ]);
            }
        }
    }

    Ok(extracted)
}
