//! Sample types shared by every sample source.
//!
//! A sample carries only its position. Its tick is implicit: the position of the
//! sample in the stream it arrived on.

use serde::{Deserialize, Serialize};

/// A single pointer reading.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub x: f64,
    pub y: f64,
}

impl Sample {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another sample.
    pub fn distance_to(&self, other: &Sample) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

impl From<(f64, f64)> for Sample {
    fn from((x, y): (f64, f64)) -> Self {
        Self { x, y }
    }
}

impl From<(i32, i32)> for Sample {
    fn from((x, y): (i32, i32)) -> Self {
        Self {
            x: f64::from(x),
            y: f64::from(y),
        }
    }
}

/// Rectangular region of the keyboard surface that counts as input.
///
/// Readings outside it (status bars, start/stop areas, tracker glitches) never
/// trigger a dwell and are not averaged into one.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ActiveRegion {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl ActiveRegion {
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// Check if a sample lies inside the region (edges inclusive).
    pub fn contains(&self, sample: &Sample) -> bool {
        sample.x >= self.min_x
            && sample.x <= self.max_x
            && sample.y >= self.min_y
            && sample.y <= self.max_y
    }

    /// Check if the region encloses a non-empty area.
    pub fn is_valid(&self) -> bool {
        self.min_x.is_finite()
            && self.min_y.is_finite()
            && self.max_x.is_finite()
            && self.max_y.is_finite()
            && self.min_x < self.max_x
            && self.min_y < self.max_y
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_distance() {
        let a = Sample::new(0.0, 0.0);
        let b = Sample::new(3.0, 4.0);
        assert!((a.distance_to(&b) - 5.0).abs() < 0.001);
        assert!((b.distance_to(&a) - 5.0).abs() < 0.001);
    }

    #[test]
    fn test_sample_from_integer_pair() {
        let sample = Sample::from((-12, 40));
        assert_eq!(sample, Sample::new(-12.0, 40.0));
    }

    #[test]
    fn test_active_region_contains() {
        let region = ActiveRegion::new(0.0, 0.0, 100.0, 50.0);
        assert!(region.contains(&Sample::new(0.0, 0.0)));
        assert!(region.contains(&Sample::new(100.0, 50.0)));
        assert!(!region.contains(&Sample::new(100.5, 10.0)));
        assert!(!region.contains(&Sample::new(10.0, -1.0)));
    }

    #[test]
    fn test_active_region_validity() {
        assert!(ActiveRegion::new(0.0, 0.0, 10.0, 10.0).is_valid());
        assert!(!ActiveRegion::new(10.0, 0.0, 0.0, 10.0).is_valid());
        assert!(!ActiveRegion::new(0.0, 0.0, f64::NAN, 10.0).is_valid());
        // Zero width or height encloses no area
        assert!(!ActiveRegion::new(5.0, 0.0, 5.0, 10.0).is_valid());
        assert!(!ActiveRegion::new(0.0, 3.0, 10.0, 3.0).is_valid());
    }
}
