//! Core data types and numeric pipeline stages.

pub mod loaders;
pub mod schema;
pub mod transforms;
pub mod writers;

pub use loaders::PointSet;
pub use schema::{extract_channels, FormatError, ScanSchema};
pub use transforms::{normalize_unit_sphere, resample, TransformError};
pub use writers::{
    derive_output_name, read_npy_tensor, write_merged_rows, write_npy_tensor, WriteError,
};
