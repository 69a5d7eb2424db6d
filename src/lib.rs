//! Laser-scan post-processing pipeline.
//!
//! This crate provides tools for:
//! - Merging per-leg scanner output files into deterministic session artifacts
//! - Grouping scan rows by component identifier for downstream segmentation
//! - Extracting canonical channels from extended-scan and colored point tables
//! - Farthest-point resampling to a fixed cardinality
//! - Unit-sphere normalization and `.npy` tensor serialization
//!
//! # Example
//!
//! ```no_run
//! use bridgescan_pipeline::config::PipelineConfig;
//! use bridgescan_pipeline::processors::session::convert_scan_file;
//! use std::path::Path;
//!
//! let config = PipelineConfig::default();
//! let outcome = convert_scan_file(
//!     Path::new("bridge_5_complete.xyz"),
//!     Path::new("npy"),
//!     &config,
//! )
//! .unwrap();
//! println!("wrote {}", outcome.tensor_path.display());
//! ```

pub mod cli;
pub mod config;
pub mod core;
pub mod processors;

pub use config::{FormatConfig, MergeConfig, PipelineConfig, SamplingConfig};
pub use core::loaders::PointSet;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
