//! Atomic detector counters with optional persistence.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::warn;

/// Counters for the current process.
#[derive(Debug)]
pub struct DetectorStats {
    /// Number of samples fed to a detector
    samples_processed: AtomicU64,
    /// Number of clusters emitted (after merging)
    clusters_emitted: AtomicU64,
    /// Number of clusters folded into a neighbour
    clusters_merged: AtomicU64,
    /// Number of in-progress dwells dropped by cancellation
    partial_dwells_discarded: AtomicU64,
    /// Number of streams run to completion
    streams_completed: AtomicU64,
    /// Session start time
    session_start: DateTime<Utc>,
    /// Path for persisting stats
    persist_path: Option<PathBuf>,
}

impl DetectorStats {
    pub fn new() -> Self {
        Self {
            samples_processed: AtomicU64::new(0),
            clusters_emitted: AtomicU64::new(0),
            clusters_merged: AtomicU64::new(0),
            partial_dwells_discarded: AtomicU64::new(0),
            streams_completed: AtomicU64::new(0),
            session_start: Utc::now(),
            persist_path: None,
        }
    }

    /// Create counters seeded from (and saved back to) a JSON file.
    pub fn with_persistence(path: PathBuf) -> Self {
        let mut stats = Self::new();
        stats.persist_path = Some(path);

        if let Err(e) = stats.load() {
            warn!("Could not load previous detector stats: {e}");
        }

        stats
    }

    pub fn record_sample(&self) {
        self.samples_processed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_samples(&self, count: u64) {
        self.samples_processed.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_cluster(&self) {
        self.clusters_emitted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_clusters(&self, count: u64) {
        self.clusters_emitted.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_merges(&self, count: u64) {
        self.clusters_merged.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_discarded_dwell(&self) {
        self.partial_dwells_discarded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_stream_completed(&self) {
        self.streams_completed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn stats(&self) -> StatsSnapshot {
        StatsSnapshot {
            samples_processed: self.samples_processed.load(Ordering::Relaxed),
            clusters_emitted: self.clusters_emitted.load(Ordering::Relaxed),
            clusters_merged: self.clusters_merged.load(Ordering::Relaxed),
            partial_dwells_discarded: self.partial_dwells_discarded.load(Ordering::Relaxed),
            streams_completed: self.streams_completed.load(Ordering::Relaxed),
            session_start: self.session_start,
            session_duration_secs: (Utc::now() - self.session_start).num_seconds().max(0) as u64,
        }
    }

    /// Get a summary string for display.
    pub fn summary(&self) -> String {
        let stats = self.stats();
        format!(
            "Detector Statistics:\n\
             - Samples processed: {}\n\
             - Clusters emitted: {}\n\
             - Clusters merged: {}\n\
             - Partial dwells discarded: {}\n\
             - Streams completed: {}\n\
             - Session duration: {} seconds",
            stats.samples_processed,
            stats.clusters_emitted,
            stats.clusters_merged,
            stats.partial_dwells_discarded,
            stats.streams_completed,
            stats.session_duration_secs
        )
    }

    /// Save stats to disk.
    pub fn save(&self) -> Result<(), std::io::Error> {
        if let Some(ref path) = self.persist_path {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }

            let stats = self.stats();
            let persisted = PersistedStats {
                samples_processed: stats.samples_processed,
                clusters_emitted: stats.clusters_emitted,
                clusters_merged: stats.clusters_merged,
                partial_dwells_discarded: stats.partial_dwells_discarded,
                streams_completed: stats.streams_completed,
                last_updated: Utc::now(),
            };

            let json = serde_json::to_string_pretty(&persisted).map_err(std::io::Error::other)?;
            std::fs::write(path, json)?;
        }
        Ok(())
    }

    fn load(&mut self) -> Result<(), std::io::Error> {
        if let Some(ref path) = self.persist_path {
            if path.exists() {
                let content = std::fs::read_to_string(path)?;
                let persisted: PersistedStats =
                    serde_json::from_str(&content).map_err(std::io::Error::other)?;

                self.samples_processed
                    .store(persisted.samples_processed, Ordering::Relaxed);
                self.clusters_emitted
                    .store(persisted.clusters_emitted, Ordering::Relaxed);
                self.clusters_merged
                    .store(persisted.clusters_merged, Ordering::Relaxed);
                self.partial_dwells_discarded
                    .store(persisted.partial_dwells_discarded, Ordering::Relaxed);
                self.streams_completed
                    .store(persisted.streams_completed, Ordering::Relaxed);
            }
        }
        Ok(())
    }

    /// Reset all counters.
    pub fn reset(&self) {
        self.samples_processed.store(0, Ordering::Relaxed);
        self.clusters_emitted.store(0, Ordering::Relaxed);
        self.clusters_merged.store(0, Ordering::Relaxed);
        self.partial_dwells_discarded.store(0, Ordering::Relaxed);
        self.streams_completed.store(0, Ordering::Relaxed);
    }
}

impl Default for DetectorStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time copy of the counters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub samples_processed: u64,
    pub clusters_emitted: u64,
    pub clusters_merged: u64,
    pub partial_dwells_discarded: u64,
    pub streams_completed: u64,
    pub session_start: DateTime<Utc>,
    pub session_duration_secs: u64,
}

/// Stats format for persistence.
#[derive(Debug, Serialize, Deserialize)]
struct PersistedStats {
    samples_processed: u64,
    clusters_emitted: u64,
    clusters_merged: u64,
    partial_dwells_discarded: u64,
    streams_completed: u64,
    last_updated: DateTime<Utc>,
}

/// Thread-safe shared counters.
pub type SharedDetectorStats = Arc<DetectorStats>;

pub fn create_shared_stats() -> SharedDetectorStats {
    Arc::new(DetectorStats::new())
}

pub fn create_shared_stats_with_persistence(path: PathBuf) -> SharedDetectorStats {
    Arc::new(DetectorStats::with_persistence(path))
}
