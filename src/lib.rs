//! Gesture Dwell - streaming key-press detection for gesture typing.
//!
//! A user traces a continuous path over a virtual keyboard, with gaze or a
//! cursor, and slows down over each intended key. This library turns the raw
//! stream of `(x, y)` samples into the ordered sequence of dwell points
//! (clusters) in real time, without buffering the whole gesture.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       Gesture Dwell                         │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ┌─────────────┐   ┌─────────────┐   ┌─────────────┐        │
//! │  │   Source    │──▶│ Frame means │──▶│  Detector   │        │
//! │  │(file, live) │   │ (optional)  │   │ (hysteresis)│        │
//! │  └─────────────┘   └─────────────┘   └─────────────┘        │
//! │                                             │               │
//! │                                             ▼               │
//! │  ┌─────────────┐                     ┌─────────────┐        │
//! │  │    Stats    │◀────────────────────│   Merger    │        │
//! │  │             │                     │ (optional)  │        │
//! │  └─────────────┘                     └─────────────┘        │
//! │                                             │               │
//! │                                             ▼               │
//! │                                      ┌─────────────┐        │
//! │                                      │    Trace    │        │
//! │                                      └─────────────┘        │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use gesture_dwell::{DetectorConfig, DwellClusters, Sample};
//!
//! // A cursor resting on one key for ten ticks
//! let samples = vec![Sample::new(50.0, 50.0); 10];
//!
//! let clusters: Vec<_> = samples
//!     .into_iter()
//!     .dwell_clusters(DetectorConfig::default())
//!     .expect("default configuration is valid")
//!     .collect::<Result<_, _>>()
//!     .expect("no invariant violations");
//!
//! assert_eq!(clusters.len(), 1);
//! assert_eq!(clusters[0].mean(), Sample::new(50.0, 50.0));
//! ```

pub mod config;
pub mod core;
pub mod source;
pub mod stats;

// Re-export key types at crate root for convenience
pub use config::{Config, ConfigError};
pub use crate::core::{
    detect_all, CancelToken, ClusterEvent, ClusterMerger, ClusterStream, DetectorConfig,
    DetectorError, DetectorPhase, DwellClusters, FrameMeans, GestureTrace, MergeConfig,
    StreamClusterDetector, Strategy, TraceBuilder,
};
pub use source::{sample_channel, ActiveRegion, ChannelSource, Sample, SignalReader, SourceError};
pub use stats::{DetectorStats, SharedDetectorStats, StatsSnapshot};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
