//! Sample sources feeding the detector.
//!
//! Samples arrive either from a recorded signal file or live, from a tracker
//! pushing into a channel. Both are plain iterators, so they plug straight
//! into the detector's streaming adapter.

pub mod channel;
pub mod reader;
pub mod types;

// Re-export commonly used types
pub use channel::{sample_channel, ChannelSource, DEFAULT_CHANNEL_CAPACITY};
pub use reader::{parse_line, SignalReader, SourceError};
pub use types::{ActiveRegion, Sample};
