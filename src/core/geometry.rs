//! Geometric helpers used by the detector and its filters.

use crate::source::types::Sample;

/// Euclidean distance between two samples.
pub fn displacement(from: &Sample, to: &Sample) -> f64 {
    from.distance_to(to)
}

/// Bearing of travel from `from` to `to`, in degrees within `(-180, 180]`.
///
/// Measured counter-clockwise from the positive x axis in sample coordinates.
/// Two identical samples have a bearing of 0.
pub fn bearing_degrees(from: &Sample, to: &Sample) -> f64 {
    (to.y - from.y).atan2(to.x - from.x).to_degrees()
}

/// Running sum used to average the samples of a dwell without keeping them.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MeanAccumulator {
    sum_x: f64,
    sum_y: f64,
    count: usize,
}

impl MeanAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, sample: &Sample) {
        self.sum_x += sample.x;
        self.sum_y += sample.y;
        self.count += 1;
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Mean position, or `None` when nothing was accumulated.
    pub fn mean(&self) -> Option<Sample> {
        if self.count == 0 {
            return None;
        }
        let n = self.count as f64;
        Some(Sample::new(self.sum_x / n, self.sum_y / n))
    }
}
