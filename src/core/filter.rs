//! Sample pre-filtering.
//!
//! Trackers running at 30-50 Hz produce a lot of jitter. Averaging fixed
//! frames of samples before detection trades temporal resolution for a
//! steadier velocity signal.

use crate::core::geometry::MeanAccumulator;
use crate::source::types::Sample;
use std::iter::FusedIterator;

/// Replaces every complete, non-overlapping frame of `frame` samples with its
/// mean. A trailing partial frame is dropped.
pub struct SlidingMeanFilter<I> {
    source: I,
    frame: usize,
}

impl<I> SlidingMeanFilter<I>
where
    I: Iterator<Item = Sample>,
{
    /// Create a filter. A frame of 0 is treated as 1 (pass-through).
    pub fn new(source: I, frame: usize) -> Self {
        Self {
            source,
            frame: frame.max(1),
        }
    }

    pub fn frame(&self) -> usize {
        self.frame
    }
}

impl<I> Iterator for SlidingMeanFilter<I>
where
    I: Iterator<Item = Sample>,
{
    type Item = Sample;

    fn next(&mut self) -> Option<Sample> {
        let mut accumulator = MeanAccumulator::new();
        while accumulator.count() < self.frame {
            let sample = self.source.next()?;
            accumulator.push(&sample);
        }
        accumulator.mean()
    }
}

impl<I> FusedIterator for SlidingMeanFilter<I> where I: FusedIterator<Item = Sample> {}

/// Adapter for applying the frame filter to any sample iterator.
pub trait FrameMeans: Iterator<Item = Sample> + Sized {
    fn frame_means(self, frame: usize) -> SlidingMeanFilter<Self> {
        SlidingMeanFilter::new(self, frame)
    }
}

impl<I> FrameMeans for I where I: Iterator<Item = Sample> {}
