//! Configuration, shared types, and collaborator traits for beatlights.
//!
//! This crate contains the types every other crate of the workspace agrees
//! on: detector configuration, decision events, clocks, and the seams to the
//! capture and presentation collaborators.

pub mod clock;
pub mod config;
pub mod error;
pub mod event;
pub mod traits;

pub use clock::{Clock, MediaClock, MonotonicClock};
pub use config::{AppConfig, DetectorConfig, EnergyMode, WindowFunction};
pub use error::CoreError;
pub use event::{BeatEvent, BeatKind, Decision};
pub use traits::{DecisionListener, SampleSource};
