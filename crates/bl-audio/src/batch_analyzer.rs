use std::path::Path;
use std::sync::Arc;

use bl_core::clock::{Clock, MediaClock};
use bl_core::config::DetectorConfig;
use bl_core::event::BeatEvent;
use bl_core::CoreError;

use crate::decode::decode_file;
use crate::detector::BeatDetector;
use crate::listener::ChannelListener;

/// Analyseur offline : fait passer un buffer complet dans un détecteur neuf.
///
/// Le temps suit la position dans le flux (`MediaClock`), donc le debounce
/// est mesuré en temps audio et le résultat est déterministe.
pub struct BatchAnalyzer {
    config: DetectorConfig,
}

impl BatchAnalyzer {
    /// # Errors
    /// Returns [`CoreError`] if the configuration does not validate.
    ///
    /// # Example
    /// ```
    /// use bl_audio::batch_analyzer::BatchAnalyzer;
    /// use bl_core::DetectorConfig;
    /// let analyzer = BatchAnalyzer::new(DetectorConfig::default()).unwrap();
    /// let events = analyzer.analyze(&vec![0.0; 44100], 44100);
    /// // 21 full windows of 2048 samples, 4 bands each
    /// assert_eq!(events.len(), 84);
    /// ```
    pub fn new(config: DetectorConfig) -> Result<Self, CoreError> {
        config.validate()?;
        Ok(Self { config })
    }

    #[must_use]
    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Run every full window of `samples` through a fresh detector.
    ///
    /// Each decision is stamped with the stream time of the window's last
    /// sample. A trailing partial window produces nothing.
    #[must_use]
    pub fn analyze(&self, samples: &[f32], sample_rate: u32) -> Vec<BeatEvent> {
        let clock = Arc::new(MediaClock::new(sample_rate));
        let mut detector =
            match BeatDetector::new(self.config.clone(), Arc::clone(&clock) as Arc<dyn Clock>) {
                Ok(d) => d,
                Err(e) => {
                    log::error!("batch analysis aborted: {e}");
                    return Vec::new();
                }
            };
        let (tx, rx) = flume::unbounded::<BeatEvent>();
        detector.subscribe(ChannelListener::new(tx));

        let window = self.config.window_length;
        let mut events = Vec::with_capacity(samples.len() / window * self.config.band_count);
        for (i, chunk) in samples.chunks(window).enumerate() {
            clock.set_sample_pos(i * window + chunk.len());
            detector.ingest_batch(chunk);
            events.extend(rx.try_iter());
        }
        detector.dispose();

        log::info!(
            "analyzed {:.1}s: {} windows, {} decisions",
            clock.pos_secs(),
            detector.windows_processed(),
            events.len()
        );
        events
    }

    /// Decode `path` and analyze it at its native sample rate.
    ///
    /// # Errors
    /// Returns an error if the file cannot be decoded.
    pub fn analyze_file(&self, path: &Path) -> anyhow::Result<Vec<BeatEvent>> {
        let (samples, sample_rate) = decode_file(path)?;
        Ok(self.analyze(&samples, sample_rate))
    }
}

/// Beat count per band, for `band_count` bands. Out-of-range events are skipped.
#[must_use]
pub fn beats_per_band(events: &[BeatEvent], band_count: usize) -> Vec<usize> {
    let mut counts = vec![0; band_count];
    for event in events.iter().filter(|e| e.decision.is_beat()) {
        if let Some(c) = counts.get_mut(event.band) {
            *c += 1;
        }
    }
    counts
}
