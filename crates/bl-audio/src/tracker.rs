use std::collections::VecDeque;
use std::time::Duration;

use bl_core::config::EnergyMode;
use bl_core::event::Decision;

use crate::aggregator::Bin;

/// Energy values kept per band (about one second of 2048-sample windows at
/// 44.1 kHz).
pub const HISTORY_LEN: usize = 43;

/// Per-band beat state: energy history, adaptive threshold, debounce timer.
///
/// A band beats when its energy exceeds the local average by more than half
/// the running average of previous beat differences. That floor only moves
/// on beats, so the tracker becomes more selective after loud transients.
///
/// # Example
/// ```
/// use bl_audio::tracker::BeatChunkTracker;
/// use bl_core::config::EnergyMode;
/// use realfft::num_complex::Complex;
/// use std::time::Duration;
///
/// let mut tracker = BeatChunkTracker::new(Duration::ZERO, EnergyMode::Imaginary, Duration::ZERO);
/// let loud = vec![Complex::new(0.0f32, 10.0); 4];
/// // No history yet: never a beat.
/// assert!(!tracker.evaluate(&loud, Duration::ZERO).unwrap().is_beat());
/// ```
#[derive(Debug, Clone)]
pub struct BeatChunkTracker {
    /// Past energy levels, oldest first (VecDeque for O(1) pop_front).
    history: VecDeque<f64>,
    /// Smoothed difference of past beats. Threshold is half of it.
    average_difference: f64,
    /// Clock time of the last decision, or of creation before the first one.
    last_decision: Duration,
    debounce: Duration,
    energy_mode: EnergyMode,
}

impl BeatChunkTracker {
    /// Create a tracker whose debounce timer starts at `created_at`.
    #[must_use]
    pub fn new(debounce: Duration, energy_mode: EnergyMode, created_at: Duration) -> Self {
        Self {
            history: VecDeque::with_capacity(HISTORY_LEN + 1),
            average_difference: 0.0,
            last_decision: created_at,
            debounce,
            energy_mode,
        }
    }

    /// Evaluate one band's bins at clock time `now`.
    ///
    /// Returns `None` when the debounce delay since the last decision has not
    /// elapsed. The energy is recorded in the history either way.
    pub fn evaluate(&mut self, band: &[Bin], now: Duration) -> Option<Decision> {
        let mut energy = band_energy(band, self.energy_mode);
        if !energy.is_finite() {
            log::debug!("non-finite band energy, recorded as 0");
            energy = 0.0;
        }

        let average = if self.history.is_empty() {
            f64::INFINITY
        } else {
            running_mean(&self.history)
        };

        let decision = if now.saturating_sub(self.last_decision) < self.debounce {
            None
        } else {
            let difference = energy - average;
            let decision = if difference > self.average_difference / 2.0 {
                self.average_difference = (difference + self.average_difference) / 2.0;
                Decision::beat(difference)
            } else {
                Decision::no_beat()
            };
            self.last_decision = now;
            Some(decision)
        };

        self.history.push_back(energy);
        if self.history.len() > HISTORY_LEN {
            self.history.pop_front();
        }

        decision
    }

    /// Energy history, oldest first.
    #[must_use]
    pub fn history(&self) -> &VecDeque<f64> {
        &self.history
    }

    #[must_use]
    pub fn average_difference(&self) -> f64 {
        self.average_difference
    }

    #[must_use]
    pub fn debounce(&self) -> Duration {
        self.debounce
    }
}

/// Incremental mean: a constant history averages to exactly that constant.
#[inline]
fn running_mean(values: &VecDeque<f64>) -> f64 {
    values
        .iter()
        .enumerate()
        .fold(0.0, |mean, (i, &v)| mean + (v - mean) / (i + 1) as f64)
}

/// Band energy according to `mode`.
///
/// # Example
/// ```
/// use bl_audio::tracker::band_energy;
/// use bl_core::config::EnergyMode;
/// use realfft::num_complex::Complex;
/// let band = [Complex::new(3.0f32, 4.0)];
/// assert_eq!(band_energy(&band, EnergyMode::Imaginary), 16.0);
/// assert_eq!(band_energy(&band, EnergyMode::Magnitude), 25.0);
/// ```
#[inline(always)]
#[must_use]
pub fn band_energy(band: &[Bin], mode: EnergyMode) -> f64 {
    match mode {
        EnergyMode::Imaginary => band.iter().map(|v| f64::from(v.im).powi(2)).sum(),
        EnergyMode::Magnitude => band
            .iter()
            .map(|v| f64::from(v.re).powi(2) + f64::from(v.im).powi(2))
            .sum(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use bl_core::event::BeatKind;
    use realfft::num_complex::Complex;

    /// A one-bin band with imaginary part `im`, energy `im²`.
    fn band(im: f32) -> Vec<Bin> {
        vec![Complex::new(0.0, im)]
    }

    fn tracker(debounce_ms: u64) -> BeatChunkTracker {
        BeatChunkTracker::new(
            Duration::from_millis(debounce_ms),
            EnergyMode::Imaginary,
            Duration::ZERO,
        )
    }

    #[test]
    fn first_evaluation_is_never_a_beat() {
        for im in [0.0, 1.0, 1e3, 1e15] {
            let mut t = tracker(0);
            let d = t.evaluate(&band(im), Duration::ZERO).unwrap();
            assert_eq!(d.kind, BeatKind::NoBeat);
            assert_eq!(d.magnitude, 0.0);
            assert_eq!(t.average_difference(), 0.0);
        }
    }

    #[test]
    fn real_part_is_ignored_by_default() {
        let mut t = tracker(0);
        t.evaluate(&band(1.0), Duration::ZERO);
        let loud_real = vec![Complex::new(1e6, 1.0)];
        assert!(!t.evaluate(&loud_real, Duration::ZERO).unwrap().is_beat());
        assert_eq!(t.history().back(), Some(&1.0));
    }

    #[test]
    fn history_is_bounded_fifo() {
        let mut t = tracker(0);
        for i in 0..HISTORY_LEN {
            t.evaluate(&band(i as f32), Duration::ZERO);
        }
        assert_eq!(t.history().len(), HISTORY_LEN);
        assert_eq!(t.history().front(), Some(&0.0));

        // 44th value evicts the oldest one.
        t.evaluate(&band(10.0), Duration::ZERO);
        assert_eq!(t.history().len(), HISTORY_LEN);
        assert_eq!(t.history().front(), Some(&1.0));
        assert_eq!(t.history().back(), Some(&100.0));
        let expected: Vec<f64> = (1..HISTORY_LEN)
            .map(|i| (i * i) as f64)
            .chain([100.0])
            .collect();
        assert_eq!(t.history().iter().copied().collect::<Vec<_>>(), expected);

        for _ in 0..500 {
            t.evaluate(&band(1.0), Duration::ZERO);
            assert!(t.history().len() <= HISTORY_LEN);
        }
    }

    #[test]
    fn zero_debounce_decides_every_call() {
        let mut t = tracker(0);
        for i in 0..200 {
            let im = if i % 7 == 0 { 7.0 } else { 1.0 };
            assert!(t.evaluate(&band(im), Duration::ZERO).is_some());
        }
    }

    #[test]
    fn debounce_spaces_decisions() {
        let debounce = Duration::from_millis(50);
        let mut t = tracker(50);
        let mut last: Option<Duration> = None;
        let mut decisions = 0;
        for step in 1..=100u64 {
            let now = Duration::from_millis(step * 10);
            if t.evaluate(&band(1.0), now).is_some() {
                if let Some(prev) = last {
                    assert!(now - prev >= debounce);
                }
                last = Some(now);
                decisions += 1;
            }
        }
        // one decision every 5 windows, first one 50 ms after creation
        assert_eq!(decisions, 20);
        // gated calls still feed the history
        assert_eq!(t.history().len(), HISTORY_LEN);
    }

    #[test]
    fn debounce_timer_starts_at_creation() {
        let mut t = BeatChunkTracker::new(
            Duration::from_millis(100),
            EnergyMode::Imaginary,
            Duration::from_secs(5),
        );
        assert!(t.evaluate(&band(1.0), Duration::from_millis(5050)).is_none());
        assert!(t.evaluate(&band(1.0), Duration::from_millis(5100)).is_some());
        assert_eq!(t.history().len(), 2);
    }

    #[test]
    fn beat_over_baseline() {
        let mut t = tracker(0);
        for _ in 0..10 {
            t.evaluate(&band(1.0), Duration::ZERO);
        }
        let d = t.evaluate(&band(3.0), Duration::ZERO).unwrap();
        assert_eq!(d.kind, BeatKind::Beat);
        assert_eq!(d.magnitude, 8.0);
        assert_eq!(t.average_difference(), 4.0);
    }

    #[test]
    fn constant_energy_never_beats() {
        let mut t = tracker(0);
        for _ in 0..100 {
            let d = t.evaluate(&band(6.0), Duration::ZERO).unwrap();
            assert!(!d.is_beat());
        }
    }

    #[test]
    fn average_difference_moves_halfway_on_every_beat() {
        let mut t = tracker(0);
        t.evaluate(&band(1.0), Duration::ZERO);

        let mut im = 1.0f32;
        for _ in 0..20 {
            im *= 2.0;
            let before = t.average_difference();
            let avg: f64 = t.history().iter().sum::<f64>() / t.history().len() as f64;
            let d = t.evaluate(&band(im), Duration::ZERO).unwrap();
            assert!(d.is_beat());

            let difference = f64::from(im).powi(2) - avg;
            assert!((d.magnitude - difference).abs() <= difference * 1e-9);
            let after = t.average_difference();
            assert!((after - (difference + before) / 2.0).abs() <= after * 1e-9);
            // converges toward the new difference from below
            assert!(after > before && after < difference);
        }
    }

    #[test]
    fn threshold_rises_after_loud_beat() {
        let mut t = tracker(0);
        for _ in 0..10 {
            t.evaluate(&band(1.0), Duration::ZERO);
        }
        assert!(t.evaluate(&band(32.0), Duration::ZERO).unwrap().is_beat());
        // A moderate bump that would have beaten a fresh baseline no longer does.
        let d = t.evaluate(&band(14.0), Duration::ZERO).unwrap();
        assert_eq!(d.kind, BeatKind::NoBeat);
    }

    #[test]
    fn no_beat_leaves_average_difference_untouched() {
        let mut t = tracker(0);
        for _ in 0..5 {
            t.evaluate(&band(1.0), Duration::ZERO);
        }
        assert!(t.evaluate(&band(3.0), Duration::ZERO).unwrap().is_beat());
        let avg = t.average_difference();
        for _ in 0..10 {
            assert!(!t.evaluate(&band(0.5), Duration::ZERO).unwrap().is_beat());
        }
        assert_eq!(t.average_difference(), avg);
    }

    #[test]
    fn repeated_inexact_energy_never_beats() {
        let mut t = tracker(0);
        for _ in 0..100 {
            assert!(!t.evaluate(&band(0.1), Duration::ZERO).unwrap().is_beat());
        }
    }

    #[test]
    fn magnitude_mode_counts_real_part() {
        let mut t = BeatChunkTracker::new(Duration::ZERO, EnergyMode::Magnitude, Duration::ZERO);
        t.evaluate(&[Complex::new(1.0, 0.0)], Duration::ZERO);
        let d = t.evaluate(&[Complex::new(3.0, 0.0)], Duration::ZERO).unwrap();
        assert!(d.is_beat());
        assert_eq!(d.magnitude, 8.0);
    }

    #[test]
    fn non_finite_energy_is_recorded_as_zero() {
        let mut t = tracker(0);
        t.evaluate(&band(f32::NAN), Duration::ZERO);
        assert_eq!(t.history().back(), Some(&0.0));
    }
}
