// Streaming multi-band beat detection, plus the capture and decode
// collaborators that feed it.

pub mod aggregator;
pub mod batch_analyzer;
pub mod capture;
pub mod decode;
pub mod detector;
pub mod error;
pub mod listener;
pub mod splitter;
pub mod state;
pub mod tracker;

pub use aggregator::{SampleAggregator, Spectrum};
pub use detector::{BeatDetector, ListenerId};
pub use tracker::BeatChunkTracker;
