use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

/// Monotonic time source read by the detector once per spectrum.
///
/// # Example
/// ```
/// use bl_core::clock::{Clock, MonotonicClock};
/// let clock = MonotonicClock::new();
/// let a = clock.now();
/// assert!(clock.now() >= a);
/// ```
pub trait Clock: Send + Sync {
    /// Time elapsed since the clock's origin. Never decreases.
    fn now(&self) -> Duration;
}

/// Wall-clock time since construction, for live capture.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    #[must_use]
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    #[inline]
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// Stream-time clock driven by a sample position.
///
/// The feeder writes `sample_pos` as it consumes samples; readers derive time
/// from `sample_pos / sample_rate`. Offline analysis uses it so debounce is
/// measured in stream time, not in how fast the CPU gets through the file.
///
/// All fields are atomic: zero-alloc, zero-lock, `Send + Sync`.
///
/// # Example
/// ```
/// use bl_core::clock::{Clock, MediaClock};
/// use std::time::Duration;
/// let clock = MediaClock::new(48000);
/// clock.set_sample_pos(24000);
/// assert_eq!(clock.now(), Duration::from_millis(500));
/// ```
#[derive(Debug)]
pub struct MediaClock {
    /// Position in samples (mono).
    sample_pos: AtomicUsize,
    /// Sample rate of the stream.
    sample_rate: AtomicU32,
}

impl MediaClock {
    #[must_use]
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_pos: AtomicUsize::new(0),
            sample_rate: AtomicU32::new(sample_rate),
        }
    }

    /// Current position in seconds. `0.0` while the sample rate is unknown.
    #[inline]
    #[must_use]
    pub fn pos_secs(&self) -> f64 {
        let rate = self.sample_rate.load(Ordering::Relaxed);
        if rate == 0 {
            return 0.0;
        }
        self.sample_pos.load(Ordering::Relaxed) as f64 / f64::from(rate)
    }

    /// Update the sample rate (e.g. once a decoder has probed the stream).
    #[inline]
    pub fn set_sample_rate(&self, rate: u32) {
        self.sample_rate.store(rate, Ordering::Relaxed);
    }

    #[inline]
    #[must_use]
    pub fn sample_pos(&self) -> usize {
        self.sample_pos.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn set_sample_pos(&self, pos: usize) {
        self.sample_pos.store(pos, Ordering::Relaxed);
    }

    /// Move the position forward by `samples`.
    #[inline]
    pub fn advance(&self, samples: usize) {
        self.sample_pos.fetch_add(samples, Ordering::Relaxed);
    }
}

impl Clock for MediaClock {
    #[inline]
    fn now(&self) -> Duration {
        let rate = u64::from(self.sample_rate.load(Ordering::Relaxed));
        if rate == 0 {
            return Duration::ZERO;
        }
        let pos = self.sample_pos.load(Ordering::Relaxed) as u64;
        let secs = pos / rate;
        let nanos = (pos % rate) * 1_000_000_000 / rate;
        Duration::new(secs, nanos as u32)
    }
}
