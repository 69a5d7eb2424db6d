//! Scan session processing modules.

pub mod merging;
pub mod session;

// Re-export key types for convenience
pub use merging::{
    export_component_rows, find_leg_files, merge_session_legs, MergeError, MergedScan,
};
pub use session::{
    convert_scan_file, merge_session, process_batch, process_session, ConvertOutcome,
    SessionOutcome,
};
