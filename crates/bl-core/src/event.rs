use std::time::Duration;

use serde::Serialize;

/// Outcome of one per-band evaluation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum BeatKind {
    /// Energy jumped above the band's adaptive threshold.
    Beat,
    /// Energy stayed within the band's local baseline.
    NoBeat,
}

/// A tracker decision: kind plus the energy difference that triggered it.
///
/// `magnitude` is the difference to the local average for a beat and `0.0`
/// otherwise.
///
/// # Example
/// ```
/// use bl_core::event::{BeatKind, Decision};
/// let d = Decision::beat(12.5);
/// assert_eq!(d.kind, BeatKind::Beat);
/// assert_eq!(Decision::no_beat().magnitude, 0.0);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Decision {
    /// Beat or no beat.
    pub kind: BeatKind,
    /// Energy difference for a beat, `0.0` for a no-beat.
    pub magnitude: f64,
}

impl Decision {
    /// A beat with the given energy difference.
    #[must_use]
    pub fn beat(magnitude: f64) -> Self {
        Self {
            kind: BeatKind::Beat,
            magnitude,
        }
    }

    /// A no-beat.
    #[must_use]
    pub fn no_beat() -> Self {
        Self {
            kind: BeatKind::NoBeat,
            magnitude: 0.0,
        }
    }

    /// `true` for a beat.
    #[inline]
    #[must_use]
    pub fn is_beat(&self) -> bool {
        self.kind == BeatKind::Beat
    }
}

/// A decision tagged with the band it belongs to, as published to listeners.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct BeatEvent {
    /// Band index in `[0, band_count)`.
    pub band: usize,
    /// The tracker decision.
    #[serde(flatten)]
    pub decision: Decision,
    /// Clock time of the decision.
    #[serde(serialize_with = "serialize_secs")]
    pub at: Duration,
}

fn serialize_secs<S: serde::Serializer>(at: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_f64(at.as_secs_f64())
}
