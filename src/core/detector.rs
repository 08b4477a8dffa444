//! Streaming dwell detection.
//!
//! The detector turns a stream of pointer samples into an ordered sequence of
//! [`ClusterEvent`]s, one per dwell (a sustained low-velocity period that most
//! likely marks an intended key press). It runs in a single forward pass and
//! only ever buffers `velocity_window + 1` samples.
//!
//! Every time sample `i + velocity_window` arrives, tick `i` is evaluated by
//! measuring the displacement between sample `i` and that lookahead sample:
//!
//! ```text
//!   SCANNING ── trigger_count reaches trigger_threshold ──▶ DWELLING
//!      ▲                                                      │
//!      └──── displacement >= inner_dx_threshold (emit) ───────┘
//! ```
//!
//! End-of-stream closes an in-progress dwell and emits it (emit-on-truncation).
//! Cancellation discards it.

use crate::core::cancel::CancelToken;
use crate::core::geometry::{bearing_degrees, displacement, MeanAccumulator};
use crate::source::types::{ActiveRegion, Sample};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::iter::FusedIterator;
use std::str::FromStr;
use thiserror::Error;
use tracing::{debug, info, trace};

/// Lookahead distance, in ticks, used to estimate velocity.
pub const DEFAULT_VELOCITY_WINDOW: usize = 3;

/// Displacement below which a tick counts towards a dwell.
pub const DEFAULT_DX_THRESHOLD: f64 = 14.0;

/// Relaxed displacement bound that keeps a confirmed dwell open.
pub const DEFAULT_INNER_DX_THRESHOLD: f64 = 16.0;

/// Consecutive low-velocity ticks needed to confirm a dwell.
pub const DEFAULT_TRIGGER_THRESHOLD: u32 = 3;

/// Errors raised by the detector.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DetectorError {
    #[error("invalid detector configuration: {0}")]
    InvalidConfig(String),

    /// Not enough samples buffered to evaluate the next tick. Handled inside the
    /// detector by waiting for more input; never surfaced from `feed`.
    #[error("insufficient lookahead: {available} of {required} samples buffered")]
    InsufficientLookahead { available: usize, required: usize },

    #[error("degenerate cluster over ticks [{start}, {end}) with {samples} averaged samples")]
    DegenerateCluster { start: u64, end: u64, samples: usize },

    #[error("detector stream is already closed")]
    StreamClosed,
}

/// How each tick is measured.
///
/// Both strategies share the same hysteresis. `VelocityAndBearing` additionally
/// tracks the bearing between consecutive samples and stamps it on every
/// confirmed dwell; it does not influence triggering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    #[default]
    VelocityOnly,
    VelocityAndBearing,
}

impl Strategy {
    fn measure(&self, lookahead: &Lookahead) -> Result<TickMeasure, DetectorError> {
        let (current, ahead) = lookahead.span()?;
        let bearing = match self {
            Strategy::VelocityOnly => None,
            Strategy::VelocityAndBearing => lookahead
                .successor()
                .map(|next| bearing_degrees(&current, &next)),
        };

        Ok(TickMeasure {
            current,
            ahead,
            displacement: displacement(&current, &ahead),
            bearing,
        })
    }
}

impl FromStr for Strategy {
    type Err = DetectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "velocity" | "velocity_only" | "velocity-only" => Ok(Strategy::VelocityOnly),
            "bearing" | "velocity_and_bearing" | "velocity-and-bearing" => {
                Ok(Strategy::VelocityAndBearing)
            }
            other => Err(DetectorError::InvalidConfig(format!(
                "unknown strategy {other:?} (expected `velocity` or `bearing`)"
            ))),
        }
    }
}

/// Signals computed for one tick.
#[derive(Debug, Clone, Copy)]
struct TickMeasure {
    current: Sample,
    ahead: Sample,
    displacement: f64,
    bearing: Option<f64>,
}

/// Detector parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectorConfig {
    /// Lookahead distance in ticks for the displacement estimate
    pub velocity_window: usize,
    /// Displacement below this counts as a low-velocity tick
    pub dx_threshold: f64,
    /// Displacement bound that keeps a confirmed dwell open
    pub inner_dx_threshold: f64,
    /// Consecutive low-velocity ticks required to confirm a dwell
    pub trigger_threshold: u32,
    /// Tick measurement strategy
    #[serde(default)]
    pub strategy: Strategy,
    /// Optional region outside of which samples are ignored
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<ActiveRegion>,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            velocity_window: DEFAULT_VELOCITY_WINDOW,
            dx_threshold: DEFAULT_DX_THRESHOLD,
            inner_dx_threshold: DEFAULT_INNER_DX_THRESHOLD,
            trigger_threshold: DEFAULT_TRIGGER_THRESHOLD,
            strategy: Strategy::default(),
            region: None,
        }
    }
}

impl DetectorConfig {
    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_region(mut self, region: ActiveRegion) -> Self {
        self.region = Some(region);
        self
    }

    /// Reject parameter combinations the state machine cannot run with.
    pub fn validate(&self) -> Result<(), DetectorError> {
        if self.velocity_window == 0 {
            return Err(DetectorError::InvalidConfig(
                "velocity_window must be at least 1".to_string(),
            ));
        }
        if self.trigger_threshold == 0 {
            return Err(DetectorError::InvalidConfig(
                "trigger_threshold must be at least 1".to_string(),
            ));
        }
        for (name, value) in [
            ("dx_threshold", self.dx_threshold),
            ("inner_dx_threshold", self.inner_dx_threshold),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(DetectorError::InvalidConfig(format!(
                    "{name} must be a positive finite number, got {value}"
                )));
            }
        }
        if let Some(region) = &self.region {
            if !region.is_valid() {
                return Err(DetectorError::InvalidConfig(format!(
                    "active region {region:?} is empty or not finite"
                )));
            }
        }
        Ok(())
    }
}

/// Mean position of one confirmed dwell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterEvent {
    pub mean_x: f64,
    pub mean_y: f64,
    /// First tick of the dwell
    pub start_tick: u64,
    /// One past the last tick of the dwell
    pub end_tick: u64,
    /// Number of samples averaged into the mean
    pub sample_count: usize,
    /// Confidence weight, initially the dwell length in ticks
    pub ticks: u64,
    /// Number of neighbouring clusters absorbed into this one
    #[serde(default)]
    pub merged: u32,
    /// Bearing in degrees at the moment the dwell was confirmed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry_bearing: Option<f64>,
}

impl ClusterEvent {
    pub fn mean(&self) -> Sample {
        Sample::new(self.mean_x, self.mean_y)
    }

    /// Length of the dwell in ticks.
    pub fn span(&self) -> u64 {
        self.end_tick - self.start_tick
    }
}

/// Externally visible state of the hysteresis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectorPhase {
    Scanning,
    Dwelling,
}

/// The last `velocity_window + 1` samples.
#[derive(Debug, Clone)]
struct Lookahead {
    samples: VecDeque<Sample>,
    window: usize,
}

impl Lookahead {
    fn new(window: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(window + 1),
            window,
        }
    }

    fn push(&mut self, sample: Sample) {
        self.samples.push_back(sample);
    }

    /// Drop the sample of the tick just evaluated.
    fn advance(&mut self) {
        self.samples.pop_front();
    }

    /// The sample of the current tick and its lookahead partner.
    fn span(&self) -> Result<(Sample, Sample), DetectorError> {
        match (self.samples.front(), self.samples.get(self.window)) {
            (Some(current), Some(ahead)) => Ok((*current, *ahead)),
            _ => Err(DetectorError::InsufficientLookahead {
                available: self.samples.len(),
                required: self.window + 1,
            }),
        }
    }

    fn successor(&self) -> Option<Sample> {
        self.samples.get(1).copied()
    }

    fn clear(&mut self) {
        self.samples.clear();
    }
}

/// A dwell that has been confirmed but not yet closed.
#[derive(Debug, Clone)]
struct Dwell {
    start: u64,
    end: u64,
    accumulator: MeanAccumulator,
    entry_bearing: Option<f64>,
}

impl Dwell {
    fn open(start: u64, entry_bearing: Option<f64>) -> Self {
        Self {
            start,
            end: start,
            accumulator: MeanAccumulator::new(),
            entry_bearing,
        }
    }

    fn extend(&mut self, tick: u64, sample: &Sample, region: Option<&ActiveRegion>) {
        if region.map_or(true, |r| r.contains(sample)) {
            self.accumulator.push(sample);
        }
        self.end = tick + 1;
    }

    fn close(self) -> Result<ClusterEvent, DetectorError> {
        let degenerate = DetectorError::DegenerateCluster {
            start: self.start,
            end: self.end,
            samples: self.accumulator.count(),
        };
        if self.end <= self.start {
            return Err(degenerate);
        }
        let mean = self.accumulator.mean().ok_or(degenerate)?;

        Ok(ClusterEvent {
            mean_x: mean.x,
            mean_y: mean.y,
            start_tick: self.start,
            end_tick: self.end,
            sample_count: self.accumulator.count(),
            ticks: self.end - self.start,
            merged: 0,
            entry_bearing: self.entry_bearing,
        })
    }
}

/// Online dwell detector for a single gesture stream.
///
/// Push samples with [`feed`](Self::feed) and call [`finish`](Self::finish) at
/// end-of-stream. One instance serves exactly one stream at a time; call
/// [`reset`](Self::reset) to reuse it for the next gesture.
#[derive(Debug, Clone)]
pub struct StreamClusterDetector {
    config: DetectorConfig,
    lookahead: Lookahead,
    /// Next tick to evaluate
    tick: u64,
    samples_seen: u64,
    trigger_count: u32,
    /// Most recent bearing (VelocityAndBearing only)
    theta: Option<f64>,
    /// Skip the tick right after an emitted dwell
    refractory: bool,
    dwell: Option<Dwell>,
    clusters_emitted: u64,
    closed: bool,
}

impl StreamClusterDetector {
    /// Create a detector after validating its configuration.
    pub fn new(config: DetectorConfig) -> Result<Self, DetectorError> {
        config.validate()?;
        Ok(Self {
            lookahead: Lookahead::new(config.velocity_window),
            config,
            tick: 0,
            samples_seen: 0,
            trigger_count: 0,
            theta: None,
            refractory: false,
            dwell: None,
            clusters_emitted: 0,
            closed: false,
        })
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    pub fn phase(&self) -> DetectorPhase {
        if self.dwell.is_some() {
            DetectorPhase::Dwelling
        } else {
            DetectorPhase::Scanning
        }
    }

    /// Index of the next tick to be evaluated.
    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn samples_seen(&self) -> u64 {
        self.samples_seen
    }

    pub fn trigger_count(&self) -> u32 {
        self.trigger_count
    }

    /// Most recent bearing in degrees, if the strategy computes one.
    pub fn last_bearing(&self) -> Option<f64> {
        self.theta
    }

    pub fn clusters_emitted(&self) -> u64 {
        self.clusters_emitted
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Push the next sample. Returns the cluster closed by this tick, if any.
    pub fn feed(&mut self, sample: Sample) -> Result<Option<ClusterEvent>, DetectorError> {
        if self.closed {
            return Err(DetectorError::StreamClosed);
        }

        self.samples_seen += 1;
        self.lookahead.push(sample);

        let measure = match self.config.strategy.measure(&self.lookahead) {
            Ok(measure) => measure,
            Err(DetectorError::InsufficientLookahead {
                available,
                required,
            }) => {
                trace!(available, required, "waiting for lookahead");
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        let result = self.step(measure);
        self.lookahead.advance();
        self.tick += 1;
        result
    }

    /// Push several samples, collecting every cluster they close.
    pub fn feed_batch<I>(&mut self, samples: I) -> Result<Vec<ClusterEvent>, DetectorError>
    where
        I: IntoIterator<Item = Sample>,
    {
        let mut events = Vec::new();
        for sample in samples {
            if let Some(event) = self.feed(sample)? {
                events.push(event);
            }
        }
        Ok(events)
    }

    /// Signal end-of-stream.
    ///
    /// An in-progress dwell is closed at the first unevaluated tick and
    /// returned. A pending, unconfirmed trigger run is dropped.
    pub fn finish(&mut self) -> Result<Option<ClusterEvent>, DetectorError> {
        if self.closed {
            return Err(DetectorError::StreamClosed);
        }
        self.closed = true;

        if self.trigger_count > 0 {
            debug!(
                pending = self.trigger_count,
                "dropping unconfirmed trigger run at end of stream"
            );
            self.trigger_count = 0;
        }

        let event = match self.dwell.take() {
            Some(dwell) => {
                let event = dwell.close()?;
                debug!(
                    start = event.start_tick,
                    end = event.end_tick,
                    "dwell truncated by end of stream"
                );
                self.clusters_emitted += 1;
                Some(event)
            }
            None => None,
        };

        info!(
            samples = self.samples_seen,
            clusters = self.clusters_emitted,
            "stream finished"
        );
        Ok(event)
    }

    /// Stop the stream without flushing. Returns `true` if a partial dwell was
    /// discarded.
    pub fn cancel(&mut self) -> bool {
        self.closed = true;
        self.trigger_count = 0;
        let discarded = self.dwell.take().is_some();
        debug!(
            tick = self.tick,
            discarded, "detector cancelled"
        );
        discarded
    }

    /// Forget all stream state and start a new gesture with the same config.
    pub fn reset(&mut self) {
        self.lookahead.clear();
        self.tick = 0;
        self.samples_seen = 0;
        self.trigger_count = 0;
        self.theta = None;
        self.refractory = false;
        self.dwell = None;
        self.clusters_emitted = 0;
        self.closed = false;
    }

    fn step(&mut self, measure: TickMeasure) -> Result<Option<ClusterEvent>, DetectorError> {
        let tick = self.tick;
        if measure.bearing.is_some() {
            self.theta = measure.bearing;
        }
        trace!(
            tick,
            displacement = measure.displacement,
            phase = ?self.phase(),
            "tick"
        );

        if self.refractory {
            self.refractory = false;
            return Ok(None);
        }

        if self.dwell.is_some() {
            return self.continue_dwell(tick, &measure);
        }

        self.scan(tick, &measure);
        Ok(None)
    }

    fn scan(&mut self, tick: u64, measure: &TickMeasure) {
        if let Some(region) = &self.config.region {
            if !region.contains(&measure.current) || !region.contains(&measure.ahead) {
                trace!(tick, "tick outside active region");
                return;
            }
        }

        if measure.displacement < self.config.dx_threshold {
            self.trigger_count += 1;
        } else {
            self.trigger_count = 0;
            return;
        }

        if self.trigger_count >= self.config.trigger_threshold {
            self.trigger_count = 0;
            let mut dwell = Dwell::open(tick, self.theta);
            dwell.extend(tick, &measure.current, None);
            debug!(tick, displacement = measure.displacement, "dwell confirmed");
            self.dwell = Some(dwell);
        }
    }

    fn continue_dwell(
        &mut self,
        tick: u64,
        measure: &TickMeasure,
    ) -> Result<Option<ClusterEvent>, DetectorError> {
        let region = self.config.region;
        if let Some(dwell) = self.dwell.as_mut() {
            dwell.extend(tick, &measure.current, region.as_ref());
        }

        if measure.displacement < self.config.inner_dx_threshold {
            return Ok(None);
        }

        let Some(dwell) = self.dwell.take() else {
            return Ok(None);
        };
        self.refractory = true;
        let event = dwell.close()?;
        self.clusters_emitted += 1;
        debug!(
            start = event.start_tick,
            end = event.end_tick,
            mean_x = event.mean_x,
            mean_y = event.mean_y,
            "dwell closed"
        );
        Ok(Some(event))
    }
}

/// Lazy iterator of clusters over a sample iterator.
///
/// Ends when the source is exhausted (flushing a truncated dwell) or when its
/// cancellation token is set (discarding it). The token is checked before every
/// sample.
pub struct ClusterStream<I> {
    source: I,
    detector: StreamClusterDetector,
    cancel: Option<CancelToken>,
    discarded: bool,
    done: bool,
}

impl<I> ClusterStream<I>
where
    I: Iterator<Item = Sample>,
{
    pub fn new(source: I, config: DetectorConfig) -> Result<Self, DetectorError> {
        Ok(Self {
            source,
            detector: StreamClusterDetector::new(config)?,
            cancel: None,
            discarded: false,
            done: false,
        })
    }

    pub fn with_cancel(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn detector(&self) -> &StreamClusterDetector {
        &self.detector
    }

    /// Whether cancellation dropped an in-progress dwell.
    pub fn discarded_dwell(&self) -> bool {
        self.discarded
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(CancelToken::is_cancelled)
    }
}

impl<I> Iterator for ClusterStream<I>
where
    I: Iterator<Item = Sample>,
{
    type Item = Result<ClusterEvent, DetectorError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        loop {
            if self.is_cancelled() {
                self.discarded = self.detector.cancel();
                self.done = true;
                return None;
            }

            match self.source.next() {
                Some(sample) => match self.detector.feed(sample) {
                    Ok(Some(event)) => return Some(Ok(event)),
                    Ok(None) => continue,
                    Err(e) => {
                        self.done = true;
                        return Some(Err(e));
                    }
                },
                None => {
                    self.done = true;
                    if self.is_cancelled() {
                        self.discarded = self.detector.cancel();
                        return None;
                    }
                    return self.detector.finish().transpose();
                }
            }
        }
    }
}

impl<I> FusedIterator for ClusterStream<I> where I: Iterator<Item = Sample> {}

/// Adapter turning any sample iterator into a [`ClusterStream`].
pub trait DwellClusters: Iterator<Item = Sample> + Sized {
    fn dwell_clusters(self, config: DetectorConfig) -> Result<ClusterStream<Self>, DetectorError> {
        ClusterStream::new(self, config)
    }
}

impl<I> DwellClusters for I where I: Iterator<Item = Sample> {}

/// Run the detector over a finished recording.
pub fn detect_all(
    samples: &[Sample],
    config: DetectorConfig,
) -> Result<Vec<ClusterEvent>, DetectorError> {
    samples.iter().copied().dwell_clusters(config)?.collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repeat(x: f64, y: f64, n: usize) -> Vec<Sample> {
        vec![Sample::new(x, y); n]
    }

    fn feed_all(
        detector: &mut StreamClusterDetector,
        samples: &[Sample],
    ) -> Vec<ClusterEvent> {
        detector.feed_batch(samples.iter().copied()).unwrap()
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = DetectorConfig::default();
        assert_eq!(config.velocity_window, 3);
        assert_eq!(config.dx_threshold, 14.0);
        assert_eq!(config.inner_dx_threshold, 16.0);
        assert_eq!(config.trigger_threshold, 3);
        assert_eq!(config.strategy, Strategy::VelocityOnly);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_configs_rejected() {
        let zero_window = DetectorConfig {
            velocity_window: 0,
            ..Default::default()
        };
        assert!(matches!(
            StreamClusterDetector::new(zero_window),
            Err(DetectorError::InvalidConfig(_))
        ));

        let zero_trigger = DetectorConfig {
            trigger_threshold: 0,
            ..Default::default()
        };
        assert!(zero_trigger.validate().is_err());

        let inner_below_dx = DetectorConfig {
            dx_threshold: 20.0,
            inner_dx_threshold: 10.0,
            ..Default::default()
        };
        assert!(inner_below_dx.validate().is_ok());

        let nan = DetectorConfig {
            dx_threshold: f64::NAN,
            ..Default::default()
        };
        assert!(nan.validate().is_err());

        let empty_region =
            DetectorConfig::default().with_region(ActiveRegion::new(10.0, 10.0, 0.0, 0.0));
        assert!(empty_region.validate().is_err());
    }

    #[test]
    fn test_strategy_parsing() {
        assert_eq!("velocity".parse::<Strategy>().unwrap(), Strategy::VelocityOnly);
        assert_eq!(
            "Bearing".parse::<Strategy>().unwrap(),
            Strategy::VelocityAndBearing
        );
        assert!("angle".parse::<Strategy>().is_err());
    }

    #[test]
    fn test_waits_for_lookahead() {
        let mut detector = StreamClusterDetector::new(DetectorConfig::default()).unwrap();
        for sample in repeat(5.0, 5.0, 3) {
            assert_eq!(detector.feed(sample).unwrap(), None);
        }
        // No tick has been evaluated yet
        assert_eq!(detector.tick(), 0);
        assert_eq!(detector.trigger_count(), 0);

        detector.feed(Sample::new(5.0, 5.0)).unwrap();
        assert_eq!(detector.tick(), 1);
        assert_eq!(detector.trigger_count(), 1);
    }

    #[test]
    fn test_phase_transitions() {
        let mut detector = StreamClusterDetector::new(DetectorConfig::default()).unwrap();
        feed_all(&mut detector, &repeat(0.0, 0.0, 5));
        assert_eq!(detector.phase(), DetectorPhase::Scanning);
        assert_eq!(detector.trigger_count(), 2);

        // Third low-velocity tick confirms the dwell
        detector.feed(Sample::new(0.0, 0.0)).unwrap();
        assert_eq!(detector.phase(), DetectorPhase::Dwelling);
        assert_eq!(detector.trigger_count(), 0);

        // A far lookahead sample closes it
        let event = detector.feed(Sample::new(100.0, 0.0)).unwrap().unwrap();
        assert_eq!(detector.phase(), DetectorPhase::Scanning);
        assert_eq!(event.start_tick, 2);
        assert_eq!(event.end_tick, 4);
        assert_eq!(event.sample_count, 2);
        assert_eq!(event.mean(), Sample::new(0.0, 0.0));
    }

    #[test]
    fn test_fast_tick_resets_trigger_run() {
        let mut detector = StreamClusterDetector::new(DetectorConfig::default()).unwrap();
        // Ticks 0 and 1 are slow, tick 2 sees the jump at sample 5
        let samples = [
            Sample::new(0.0, 0.0),
            Sample::new(0.0, 0.0),
            Sample::new(0.0, 0.0),
            Sample::new(0.0, 0.0),
            Sample::new(0.0, 0.0),
            Sample::new(50.0, 0.0),
        ];
        assert!(feed_all(&mut detector, &samples).is_empty());
        assert_eq!(detector.trigger_count(), 0);
        assert_eq!(detector.phase(), DetectorPhase::Scanning);
    }

    #[test]
    fn test_non_numeric_samples_never_trigger() {
        let mut detector = StreamClusterDetector::new(DetectorConfig::default()).unwrap();
        let events = feed_all(&mut detector, &repeat(f64::NAN, f64::NAN, 10));
        assert!(events.is_empty());
        assert_eq!(detector.trigger_count(), 0);
        assert_eq!(detector.phase(), DetectorPhase::Scanning);
        assert_eq!(detector.finish().unwrap(), None);

        let clusters = detect_all(&repeat(f64::NAN, 3.0, 10), DetectorConfig::default()).unwrap();
        assert!(clusters.is_empty());
    }

    #[test]
    fn test_inner_threshold_below_dx_closes_short_dwells() {
        let config = DetectorConfig {
            dx_threshold: 20.0,
            inner_dx_threshold: 10.0,
            ..Default::default()
        };
        // Tick 3 sees a 12px step: slow for triggering, fast enough to close
        let mut samples = repeat(0.0, 0.0, 6);
        samples.extend(repeat(12.0, 0.0, 6));

        let clusters = detect_all(&samples, config).unwrap();
        assert_eq!(clusters.len(), 2);
        assert_eq!(clusters[0].mean(), Sample::new(0.0, 0.0));
        assert_eq!((clusters[0].start_tick, clusters[0].end_tick), (2, 4));
        assert_eq!(clusters[0].sample_count, 2);
        assert_eq!(clusters[1].mean(), Sample::new(12.0, 0.0));
        assert_eq!((clusters[1].start_tick, clusters[1].end_tick), (7, 9));
    }

    #[test]
    fn test_refractory_tick_after_emit() {
        let mut detector = StreamClusterDetector::new(DetectorConfig::default()).unwrap();
        // Dwell confirmed at tick 2, closed at tick 3 by a one-sample spike
        let mut samples = repeat(0.0, 0.0, 6);
        samples.push(Sample::new(100.0, 0.0));
        let events = feed_all(&mut detector, &samples);
        assert_eq!(events.len(), 1);
        assert_eq!(detector.tick(), 4);

        // Tick 4 is slow but skipped
        detector.feed(Sample::new(0.0, 0.0)).unwrap();
        assert_eq!(detector.tick(), 5);
        assert_eq!(detector.trigger_count(), 0);

        // Tick 5 counts again
        detector.feed(Sample::new(0.0, 0.0)).unwrap();
        assert_eq!(detector.trigger_count(), 1);
    }

    #[test]
    fn test_finish_emits_truncated_dwell() {
        let mut detector = StreamClusterDetector::new(DetectorConfig::default()).unwrap();
        assert!(feed_all(&mut detector, &repeat(20.0, 30.0, 8)).is_empty());
        assert_eq!(detector.phase(), DetectorPhase::Dwelling);

        let event = detector.finish().unwrap().unwrap();
        assert_eq!(event.start_tick, 2);
        assert_eq!(event.end_tick, 5);
        assert_eq!(event.sample_count, 3);
        assert_eq!(event.mean(), Sample::new(20.0, 30.0));
        assert!(detector.is_closed());
        assert_eq!(detector.clusters_emitted(), 1);
    }

    #[test]
    fn test_finish_drops_unconfirmed_trigger_run() {
        let mut detector = StreamClusterDetector::new(DetectorConfig::default()).unwrap();
        feed_all(&mut detector, &repeat(0.0, 0.0, 5));
        assert_eq!(detector.trigger_count(), 2);
        assert_eq!(detector.finish().unwrap(), None);
        assert_eq!(detector.trigger_count(), 0);
    }

    #[test]
    fn test_feed_after_close_fails() {
        let mut detector = StreamClusterDetector::new(DetectorConfig::default()).unwrap();
        detector.finish().unwrap();
        assert_eq!(
            detector.feed(Sample::new(0.0, 0.0)),
            Err(DetectorError::StreamClosed)
        );
        assert_eq!(detector.finish(), Err(DetectorError::StreamClosed));
    }

    #[test]
    fn test_cancel_discards_partial_dwell() {
        let mut detector = StreamClusterDetector::new(DetectorConfig::default()).unwrap();
        feed_all(&mut detector, &repeat(0.0, 0.0, 8));
        assert_eq!(detector.phase(), DetectorPhase::Dwelling);

        assert!(detector.cancel());
        assert_eq!(detector.phase(), DetectorPhase::Scanning);
        assert!(detector.is_closed());
        assert_eq!(detector.clusters_emitted(), 0);
    }

    #[test]
    fn test_reset_starts_new_gesture() {
        let mut detector = StreamClusterDetector::new(DetectorConfig::default()).unwrap();
        feed_all(&mut detector, &repeat(0.0, 0.0, 8));
        detector.finish().unwrap();

        detector.reset();
        assert!(!detector.is_closed());
        assert_eq!(detector.tick(), 0);
        assert_eq!(detector.samples_seen(), 0);

        feed_all(&mut detector, &repeat(9.0, 9.0, 10));
        let event = detector.finish().unwrap().unwrap();
        assert_eq!(event.start_tick, 2);
        assert_eq!(event.mean(), Sample::new(9.0, 9.0));
    }

    #[test]
    fn test_degenerate_dwell_is_rejected() {
        let empty = Dwell::open(4, None);
        assert_eq!(
            empty.close(),
            Err(DetectorError::DegenerateCluster {
                start: 4,
                end: 4,
                samples: 0
            })
        );

        // A non-empty range whose samples were all outside the region
        let mut outside = Dwell::open(4, None);
        let region = ActiveRegion::new(0.0, 0.0, 1.0, 1.0);
        outside.extend(4, &Sample::new(50.0, 50.0), Some(&region));
        assert!(matches!(
            outside.close(),
            Err(DetectorError::DegenerateCluster { samples: 0, .. })
        ));
    }

    #[test]
    fn test_region_ignores_outside_samples() {
        let region = ActiveRegion::new(0.0, 0.0, 300.0, 300.0);
        let config = DetectorConfig::default().with_region(region);

        let outside = detect_all(&repeat(500.0, 500.0, 12), config.clone()).unwrap();
        assert!(outside.is_empty());

        let inside = detect_all(&repeat(100.0, 100.0, 12), config).unwrap();
        assert_eq!(inside.len(), 1);
    }

    #[test]
    fn test_region_excludes_outside_samples_from_mean() {
        let region = ActiveRegion::new(0.0, 0.0, 100.0, 100.0);
        let config = DetectorConfig {
            inner_dx_threshold: 40.0,
            ..DetectorConfig::default().with_region(region)
        };
        let mut detector = StreamClusterDetector::new(config).unwrap();

        // Dwell confirmed at tick 2 on (99, 50)
        feed_all(&mut detector, &repeat(99.0, 50.0, 6));
        assert_eq!(detector.phase(), DetectorPhase::Dwelling);

        // Samples drifting just outside the region stay within the inner bound
        feed_all(&mut detector, &repeat(101.0, 50.0, 4));
        let event = detector.finish().unwrap().unwrap();

        // Ticks 2..=6 are members; tick 6 is the first outside sample
        assert_eq!(event.start_tick, 2);
        assert_eq!(event.end_tick, 7);
        assert_eq!(event.sample_count, 4);
        assert_eq!(event.mean(), Sample::new(99.0, 50.0));
    }

    #[test]
    fn test_velocity_only_has_no_bearing() {
        let events = detect_all(&repeat(1.0, 1.0, 10), DetectorConfig::default()).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].entry_bearing, None);
    }

    #[test]
    fn test_bearing_strategy_tracks_direction() {
        let config = DetectorConfig::default().with_strategy(Strategy::VelocityAndBearing);
        let mut detector = StreamClusterDetector::new(config).unwrap();

        // Slow drift up and to the right: 1 px per tick on both axes
        let drift: Vec<Sample> = (0..8)
            .map(|i| Sample::new(f64::from(i), f64::from(i)))
            .collect();
        feed_all(&mut detector, &drift);

        let bearing = detector.last_bearing().unwrap();
        assert!((bearing - 45.0).abs() < 1e-9);

        let event = detector.finish().unwrap().unwrap();
        assert!((event.entry_bearing.unwrap() - 45.0).abs() < 1e-9);
    }

    #[test]
    fn test_cluster_stream_cancellation() {
        let token = CancelToken::new();
        token.cancel();
        let mut stream = repeat(0.0, 0.0, 20)
            .into_iter()
            .dwell_clusters(DetectorConfig::default())
            .unwrap()
            .with_cancel(token);

        assert!(stream.next().is_none());
        assert!(stream.detector().is_closed());
        assert!(!stream.discarded_dwell());
        assert!(stream.next().is_none());
    }

    #[test]
    fn test_cluster_stream_reports_discarded_dwell() {
        let token = CancelToken::new();
        let trip = token.clone();
        // The dwell opens at tick 2 (sample 5); cancel once sample 7 is through
        let source = repeat(0.0, 0.0, 20)
            .into_iter()
            .enumerate()
            .map(move |(i, sample)| {
                if i == 7 {
                    trip.cancel();
                }
                sample
            });
        let mut stream = source
            .dwell_clusters(DetectorConfig::default())
            .unwrap()
            .with_cancel(token);

        assert!(stream.next().is_none());
        assert!(stream.discarded_dwell());
        assert_eq!(stream.detector().samples_seen(), 8);
        assert_eq!(stream.detector().clusters_emitted(), 0);
    }
}
