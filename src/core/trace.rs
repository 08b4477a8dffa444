//! Gesture trace documents.
//!
//! A trace records everything needed to reproduce or score one processed
//! gesture downstream: the producer, the detector configuration that was in
//! force, and the ordered dwell clusters. Word inference consumes the
//! `clusters` array directly.

use crate::core::detector::{ClusterEvent, DetectorConfig};
use crate::core::merge::MergeConfig;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// The current trace format version.
pub const TRACE_VERSION: &str = "1.0";

/// The name of this producer.
pub const PRODUCER_NAME: &str = "gesture-dwell";

/// Producer metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceProducer {
    pub name: String,
    pub version: String,
    pub instance_id: Uuid,
}

/// One processed gesture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GestureTrace {
    pub trace_version: String,
    pub producer: TraceProducer,
    /// When the trace was built
    pub recorded_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub detector: DetectorConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merge: Option<MergeConfig>,
    /// Samples fed to the detector (after pre-filtering)
    pub sample_count: u64,
    pub clusters: Vec<ClusterEvent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<HashMap<String, serde_json::Value>>,
}

impl GestureTrace {
    /// Mean points in emission order.
    pub fn points(&self) -> Vec<(f64, f64)> {
        self.clusters.iter().map(|c| (c.mean_x, c.mean_y)).collect()
    }
}

/// Builder for gesture traces sharing one producer instance.
pub struct TraceBuilder {
    instance_id: Uuid,
    label: Option<String>,
}

impl TraceBuilder {
    /// Create a new builder with a unique instance ID.
    pub fn new() -> Self {
        Self {
            instance_id: Uuid::new_v4(),
            label: None,
        }
    }

    /// Label every trace built from now on (e.g. the intended word).
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn instance_id(&self) -> Uuid {
        self.instance_id
    }

    pub fn build(
        &self,
        detector: &DetectorConfig,
        merge: Option<&MergeConfig>,
        sample_count: u64,
        clusters: Vec<ClusterEvent>,
    ) -> GestureTrace {
        let mut meta = HashMap::new();
        meta.insert(
            "cluster_count".to_string(),
            serde_json::Value::from(clusters.len()),
        );
        let merged: u64 = clusters.iter().map(|c| u64::from(c.merged)).sum();
        if merged > 0 {
            meta.insert("merged_clusters".to_string(), serde_json::Value::from(merged));
        }

        GestureTrace {
            trace_version: TRACE_VERSION.to_string(),
            producer: TraceProducer {
                name: PRODUCER_NAME.to_string(),
                version: crate::VERSION.to_string(),
                instance_id: self.instance_id,
            },
            recorded_at: Utc::now(),
            label: self.label.clone(),
            detector: detector.clone(),
            merge: merge.cloned(),
            sample_count,
            clusters,
            meta: Some(meta),
        }
    }

    /// Build a trace and serialize it as pretty JSON.
    pub fn build_json(
        &self,
        detector: &DetectorConfig,
        merge: Option<&MergeConfig>,
        sample_count: u64,
        clusters: Vec<ClusterEvent>,
    ) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.build(detector, merge, sample_count, clusters))
    }
}

impl Default for TraceBuilder {
    fn default() -> Self {
        Self::new()
    }
}
