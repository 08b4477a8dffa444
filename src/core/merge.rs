//! Post-processing for over-detection.
//!
//! A slightly trigger-happy detector responds quickly but sometimes fires two
//! or three times on the same key, or on the border between neighbouring keys.
//! The merger collapses such runs: a short dwell right next to its neighbour is
//! folded into whichever of the two carries more ticks.

use crate::core::detector::ClusterEvent;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Dwells this short or shorter are candidates for merging.
pub const DEFAULT_MAX_WEAK_TICKS: u64 = 4;

/// Merger parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergeConfig {
    /// Clusters closer than this are considered the same press
    pub min_separation: f64,
    /// A pair is only merged if at least one side has this many ticks or fewer
    #[serde(default = "default_max_weak_ticks")]
    pub max_weak_ticks: u64,
}

fn default_max_weak_ticks() -> u64 {
    DEFAULT_MAX_WEAK_TICKS
}

impl MergeConfig {
    pub fn new(min_separation: f64) -> Self {
        Self {
            min_separation,
            max_weak_ticks: DEFAULT_MAX_WEAK_TICKS,
        }
    }

    /// Check if two consecutive clusters are distinct presses.
    pub fn separated(&self, first: &ClusterEvent, second: &ClusterEvent) -> bool {
        let distance = first.mean().distance_to(&second.mean());
        if distance >= self.min_separation {
            return true;
        }
        first.ticks > self.max_weak_ticks && second.ticks > self.max_weak_ticks
    }
}

/// Streaming merger holding at most one pending cluster.
pub struct ClusterMerger {
    config: MergeConfig,
    pending: Option<ClusterEvent>,
    merges: u64,
}

impl ClusterMerger {
    pub fn new(config: MergeConfig) -> Self {
        Self {
            config,
            pending: None,
            merges: 0,
        }
    }

    /// Offer the next cluster. Returns the previous one once it is known to be
    /// separate from its successor.
    pub fn push(&mut self, event: ClusterEvent) -> Option<ClusterEvent> {
        let Some(pending) = self.pending.take() else {
            self.pending = Some(event);
            return None;
        };

        if self.config.separated(&pending, &event) {
            self.pending = Some(event);
            return Some(pending);
        }

        self.merges += 1;
        let merged = merge_pair(pending, event);
        debug!(
            start = merged.start_tick,
            ticks = merged.ticks,
            merged = merged.merged,
            "merged neighbouring clusters"
        );
        self.pending = Some(merged);
        None
    }

    /// Release the last pending cluster at end-of-stream.
    pub fn finish(&mut self) -> Option<ClusterEvent> {
        self.pending.take()
    }

    /// Number of merges performed so far.
    pub fn merges(&self) -> u64 {
        self.merges
    }

    /// Merge a complete list of clusters.
    pub fn merge_all(config: MergeConfig, events: Vec<ClusterEvent>) -> Vec<ClusterEvent> {
        let mut merger = Self::new(config);
        let mut output: Vec<ClusterEvent> =
            events.into_iter().filter_map(|e| merger.push(e)).collect();
        output.extend(merger.finish());
        output
    }
}

/// The cluster with more ticks wins (the later one on a tie) and absorbs the
/// other's weight.
fn merge_pair(first: ClusterEvent, second: ClusterEvent) -> ClusterEvent {
    let (mut winner, loser) = if first.ticks > second.ticks {
        (first, second)
    } else {
        (second, first)
    };
    winner.ticks += loser.ticks;
    winner.merged += loser.merged + 1;
    winner
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cluster(x: f64, y: f64, start: u64, ticks: u64) -> ClusterEvent {
        ClusterEvent {
            mean_x: x,
            mean_y: y,
            start_tick: start,
            end_tick: start + ticks,
            sample_count: ticks as usize,
            ticks,
            merged: 0,
            entry_bearing: None,
        }
    }

    #[test]
    fn test_distant_clusters_pass_through() {
        let events = vec![
            cluster(10.0, 10.0, 0, 3),
            cluster(90.0, 10.0, 10, 3),
            cluster(170.0, 10.0, 20, 3),
        ];
        let merged = ClusterMerger::merge_all(MergeConfig::new(30.0), events.clone());
        assert_eq!(merged, events);
    }

    #[test]
    fn test_close_weak_cluster_absorbed_by_stronger() {
        let events = vec![cluster(10.0, 10.0, 0, 9), cluster(14.0, 12.0, 12, 2)];
        let merged = ClusterMerger::merge_all(MergeConfig::new(30.0), events);

        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].mean(), crate::Sample::new(10.0, 10.0));
        assert_eq!(merged[0].ticks, 11);
        assert_eq!(merged[0].merged, 1);
        assert_eq!(merged[0].start_tick, 0);
    }

    #[test]
    fn test_tie_prefers_later_cluster() {
        let events = vec![cluster(10.0, 10.0, 0, 3), cluster(12.0, 10.0, 8, 3)];
        let merged = ClusterMerger::merge_all(MergeConfig::new(30.0), events);

        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].start_tick, 8);
        assert_eq!(merged[0].ticks, 6);
    }

    #[test]
    fn test_close_strong_clusters_kept_apart() {
        // Both dwells are long enough to be deliberate double presses
        let events = vec![cluster(10.0, 10.0, 0, 8), cluster(12.0, 10.0, 12, 8)];
        let merged = ClusterMerger::merge_all(MergeConfig::new(30.0), events.clone());
        assert_eq!(merged, events);
    }

    #[test]
    fn test_runs_of_weak_clusters_collapse() {
        let events = vec![
            cluster(10.0, 10.0, 0, 2),
            cluster(11.0, 10.0, 4, 6),
            cluster(12.0, 11.0, 12, 2),
            cluster(13.0, 10.0, 16, 1),
            cluster(200.0, 10.0, 30, 5),
        ];
        let mut merger = ClusterMerger::new(MergeConfig::new(20.0));
        let mut output: Vec<ClusterEvent> =
            events.into_iter().filter_map(|e| merger.push(e)).collect();
        output.extend(merger.finish());

        assert_eq!(output.len(), 2);
        assert_eq!(output[0].start_tick, 4);
        assert_eq!(output[0].ticks, 11);
        assert_eq!(output[0].merged, 3);
        assert_eq!(output[1].start_tick, 30);
        assert_eq!(merger.merges(), 3);
    }
}
