//! Processing statistics for the detector.
//!
//! Counters are cheap to update from the processing loop and can be persisted
//! so that cumulative totals survive across runs.

pub mod log;

// Re-export commonly used types
pub use log::{
    create_shared_stats, create_shared_stats_with_persistence, DetectorStats, SharedDetectorStats,
    StatsSnapshot,
};
