//! Live sample feed over a channel.
//!
//! A tracker callback (or any other producer thread) pushes samples into the
//! sending half; the receiving half is a blocking iterator that the detector
//! consumes on its own thread. The iterator ends when every sender is dropped,
//! or early when its cancellation token is set.

use crate::core::cancel::CancelToken;
use crate::source::types::Sample;
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use std::time::Duration;
use tracing::debug;

/// Default number of samples buffered between producer and detector.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 10_000;

/// How often a blocked receiver wakes up to check for cancellation.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Create a bounded sample channel.
pub fn sample_channel(capacity: usize) -> (Sender<Sample>, ChannelSource) {
    let (sender, receiver) = bounded(capacity);
    (sender, ChannelSource::new(receiver))
}

/// Blocking iterator over samples arriving on a channel.
pub struct ChannelSource {
    receiver: Receiver<Sample>,
    cancel: Option<CancelToken>,
    poll_interval: Duration,
    received: u64,
}

impl ChannelSource {
    pub fn new(receiver: Receiver<Sample>) -> Self {
        Self {
            receiver,
            cancel: None,
            poll_interval: DEFAULT_POLL_INTERVAL,
            received: 0,
        }
    }

    pub fn with_cancel(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Number of samples received so far.
    pub fn received(&self) -> u64 {
        self.received
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(CancelToken::is_cancelled)
    }
}

impl Iterator for ChannelSource {
    type Item = Sample;

    fn next(&mut self) -> Option<Sample> {
        loop {
            if self.is_cancelled() {
                debug!(received = self.received, "channel source cancelled");
                return None;
            }

            match self.receiver.recv_timeout(self.poll_interval) {
                Ok(sample) => {
                    self.received += 1;
                    return Some(sample);
                }
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => {
                    debug!(received = self.received, "sample producer disconnected");
                    return None;
                }
            }
        }
    }
}
