use std::sync::Arc;

use bl_core::clock::Clock;
use bl_core::config::DetectorConfig;
use bl_core::event::{BeatEvent, Decision};
use bl_core::traits::DecisionListener;
use bl_core::CoreError;

use crate::aggregator::SampleAggregator;
use crate::splitter::split_bands;
use crate::tracker::BeatChunkTracker;

/// Handle returned by [`BeatDetector::subscribe`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Multi-band beat detector.
///
/// Owns the sample aggregator and one tracker per band. Every full window is
/// transformed, split into bands, evaluated band by band, and each decision
/// is published to the listeners in increasing band order, synchronously, on
/// the caller's thread.
///
/// Single producer: `ingest` must be called from one thread only, and the
/// hot path does not allocate.
///
/// # Example
/// ```
/// use std::sync::Arc;
/// use bl_audio::BeatDetector;
/// use bl_core::{BeatEvent, DetectorConfig, MonotonicClock};
///
/// let mut detector = BeatDetector::new(DetectorConfig::default(), Arc::new(MonotonicClock::new())).unwrap();
/// let (tx, rx) = flume::unbounded::<BeatEvent>();
/// detector.subscribe(bl_audio::listener::ChannelListener::new(tx));
/// detector.ingest_batch(&vec![0.0; 2048]);
/// assert_eq!(rx.try_iter().count(), 4);
/// ```
pub struct BeatDetector {
    config: DetectorConfig,
    aggregator: SampleAggregator,
    trackers: Box<[BeatChunkTracker]>,
    /// Decisions of the current window, filled before publishing.
    pending: Box<[Option<Decision>]>,
    listeners: Vec<(ListenerId, Box<dyn DecisionListener>)>,
    next_listener: u64,
    clock: Arc<dyn Clock>,
    windows: u64,
    disposed: bool,
}

impl BeatDetector {
    /// Build a detector with fresh trackers whose debounce timers start now.
    ///
    /// # Errors
    /// Returns [`CoreError`] if the configuration does not validate.
    pub fn new(config: DetectorConfig, clock: Arc<dyn Clock>) -> Result<Self, CoreError> {
        let aggregator = SampleAggregator::new(&config)?;
        let created_at = clock.now();
        let trackers = (0..config.band_count)
            .map(|_| BeatChunkTracker::new(config.debounce, config.energy_mode, created_at))
            .collect();

        log::debug!(
            "detector created: window={} bands={} debounce={:?}",
            config.window_length,
            config.band_count,
            config.debounce
        );

        Ok(Self {
            pending: vec![None; config.band_count].into_boxed_slice(),
            config,
            aggregator,
            trackers,
            listeners: Vec::new(),
            next_listener: 0,
            clock,
            windows: 0,
            disposed: false,
        })
    }

    /// Attach a listener. It receives every decision published from now on.
    ///
    /// A disposed detector drops the listener immediately.
    pub fn subscribe(&mut self, listener: impl DecisionListener + 'static) -> ListenerId {
        let id = ListenerId(self.next_listener);
        self.next_listener += 1;
        if self.disposed {
            log::warn!("subscribe on a disposed detector ignored");
        } else {
            self.listeners.push((id, Box::new(listener)));
        }
        id
    }

    /// Detach a listener. Returns `false` if it was not attached.
    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(l, _)| *l != id);
        self.listeners.len() != before
    }

    /// Feed one sample. Returns the number of decisions published.
    #[inline]
    pub fn ingest(&mut self, sample: f32) -> usize {
        if self.disposed {
            return 0;
        }
        let Some(spectrum) = self.aggregator.add(sample) else {
            return 0;
        };
        self.windows += 1;
        let now = self.clock.now();

        let bands = match split_bands(spectrum, self.config.band_count) {
            Ok(bands) => bands,
            Err(e) => {
                log::error!("spectrum split failed: {e}");
                return 0;
            }
        };
        for ((tracker, slot), bins) in self.trackers.iter_mut().zip(self.pending.iter_mut()).zip(bands) {
            *slot = tracker.evaluate(bins, now);
        }

        let mut published = 0;
        for (band, slot) in self.pending.iter_mut().enumerate() {
            let Some(decision) = slot.take() else {
                continue;
            };
            let event = BeatEvent {
                band,
                decision,
                at: now,
            };
            for (id, listener) in &mut self.listeners {
                if let Err(e) = listener.on_decision(&event) {
                    log::warn!("listener {id:?} failed on band {band}: {e:#}");
                }
            }
            published += 1;
        }
        published
    }

    /// Feed a batch sample by sample. Returns the number of decisions published.
    pub fn ingest_batch(&mut self, samples: &[f32]) -> usize {
        samples.iter().map(|&s| self.ingest(s)).sum()
    }

    /// Stop processing and detach every listener. Idempotent.
    ///
    /// Later `ingest` calls are ignored, so a replacement detector can be
    /// wired in without any decision of this one reaching a listener.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        self.listeners.clear();
        self.aggregator.reset();
        log::debug!(
            "detector disposed after {} windows ({} bands)",
            self.windows,
            self.config.band_count
        );
    }

    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    #[must_use]
    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    #[must_use]
    pub fn band_count(&self) -> usize {
        self.config.band_count
    }

    /// Tracker state of band `index`.
    #[must_use]
    pub fn tracker(&self, index: usize) -> Option<&BeatChunkTracker> {
        self.trackers.get(index)
    }

    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Full windows transformed so far.
    #[must_use]
    pub fn windows_processed(&self) -> u64 {
        self.windows
    }
}

impl Drop for BeatDetector {
    fn drop(&mut self) {
        self.dispose();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::listener::ChannelListener;
    use bl_core::clock::{MediaClock, MonotonicClock};
    use std::time::Duration;

    fn config(window_length: usize, band_count: usize) -> DetectorConfig {
        DetectorConfig {
            window_length,
            band_count,
            ..DetectorConfig::default()
        }
    }

    fn detector(window_length: usize, band_count: usize) -> BeatDetector {
        BeatDetector::new(config(window_length, band_count), Arc::new(MonotonicClock::new()))
            .unwrap()
    }

    #[test]
    fn invalid_config_fails_at_construction() {
        let clock: Arc<dyn Clock> = Arc::new(MonotonicClock::new());
        assert!(matches!(
            BeatDetector::new(config(2048, 3), Arc::clone(&clock)),
            Err(CoreError::BandMismatch { .. })
        ));
        assert!(matches!(
            BeatDetector::new(config(2000, 4), Arc::clone(&clock)),
            Err(CoreError::WindowLength { .. })
        ));
        assert!(matches!(
            BeatDetector::new(config(2048, 0), clock),
            Err(CoreError::BandCount { .. })
        ));
    }

    #[test]
    fn publishes_one_decision_per_band_in_order() {
        let mut d = detector(256, 8);
        let (tx, rx) = flume::unbounded::<BeatEvent>();
        d.subscribe(ChannelListener::new(tx));

        assert_eq!(d.ingest_batch(&[0.1; 255]), 0);
        assert_eq!(rx.len(), 0);
        assert_eq!(d.ingest(0.1), 8);

        let bands: Vec<usize> = rx.try_iter().map(|e| e.band).collect();
        assert_eq!(bands, (0..8).collect::<Vec<_>>());
        assert_eq!(d.windows_processed(), 1);
    }

    #[test]
    fn failing_listener_does_not_starve_others() {
        let mut d = detector(64, 2);
        d.subscribe(|_: &BeatEvent| -> anyhow::Result<()> { anyhow::bail!("boom") });
        let (tx, rx) = flume::unbounded::<BeatEvent>();
        d.subscribe(ChannelListener::new(tx));

        d.ingest_batch(&[0.5; 64 * 3]);
        assert_eq!(rx.try_iter().count(), 6);
    }

    #[test]
    fn unsubscribe_detaches() {
        let mut d = detector(64, 1);
        let (tx, rx) = flume::unbounded::<BeatEvent>();
        let id = d.subscribe(ChannelListener::new(tx));
        d.ingest_batch(&[0.0; 64]);
        assert!(d.unsubscribe(id));
        assert!(!d.unsubscribe(id));
        d.ingest_batch(&[0.0; 64]);
        assert_eq!(rx.try_iter().count(), 1);
    }

    #[test]
    fn dispose_is_idempotent_and_silences() {
        let mut d = detector(64, 4);
        let (tx, rx) = flume::unbounded::<BeatEvent>();
        d.subscribe(ChannelListener::new(tx.clone()));
        d.ingest_batch(&[0.0; 32]);

        d.dispose();
        d.dispose();
        assert!(d.is_disposed());
        assert_eq!(d.listener_count(), 0);

        assert_eq!(d.ingest_batch(&[0.0; 64 * 4]), 0);
        assert_eq!(d.windows_processed(), 0);
        assert_eq!(rx.try_iter().count(), 0);

        d.subscribe(ChannelListener::new(tx));
        assert_eq!(d.listener_count(), 0);
    }

    #[test]
    fn debounce_measured_on_injected_clock() {
        // 64 samples per window at 64 Hz: one window per second of stream time.
        let clock = Arc::new(MediaClock::new(64));
        let cfg = DetectorConfig {
            debounce: Duration::from_secs(2),
            ..config(64, 2)
        };
        let mut d = BeatDetector::new(cfg, Arc::clone(&clock) as Arc<dyn Clock>).unwrap();
        let (tx, rx) = flume::unbounded::<BeatEvent>();
        d.subscribe(ChannelListener::new(tx));

        for w in 1..=10usize {
            clock.set_sample_pos(w * 64);
            d.ingest_batch(&[0.25; 64]);
        }

        let events: Vec<BeatEvent> = rx.try_iter().collect();
        assert_eq!(events.len(), 10);
        for band in 0..2 {
            let times: Vec<u64> = events
                .iter()
                .filter(|e| e.band == band)
                .map(|e| e.at.as_secs())
                .collect();
            assert_eq!(times, vec![2, 4, 6, 8, 10]);
        }
        assert_eq!(d.tracker(0).unwrap().history().len(), 10);
    }

    #[test]
    fn zero_debounce_decides_every_window() {
        let mut d = detector(128, 4);
        let (tx, rx) = flume::unbounded::<BeatEvent>();
        d.subscribe(ChannelListener::new(tx));
        let published = d.ingest_batch(&vec![0.3; 128 * 25]);
        assert_eq!(published, 100);
        assert_eq!(rx.try_iter().count(), 100);
    }
}
