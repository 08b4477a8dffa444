//! Core functionality for gesture dwell detection.
//!
//! This module contains:
//! - The streaming dwell detector and its lazy iterator adapter
//! - Optional frame pre-filtering and cluster merging
//! - Gesture trace building for export

pub mod cancel;
pub mod detector;
pub mod filter;
pub mod geometry;
pub mod merge;
pub mod trace;

// Re-export commonly used types
pub use cancel::CancelToken;
pub use detector::{
    detect_all, ClusterEvent, ClusterStream, DetectorConfig, DetectorError, DetectorPhase,
    DwellClusters, StreamClusterDetector, Strategy,
};
pub use filter::{FrameMeans, SlidingMeanFilter};
pub use geometry::{bearing_degrees, displacement, MeanAccumulator};
pub use merge::{ClusterMerger, MergeConfig};
pub use trace::{GestureTrace, TraceBuilder, PRODUCER_NAME, TRACE_VERSION};
