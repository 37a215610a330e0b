use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use anyhow::Result;
use bl_audio::state::{DetectorHandle, DetectorMessage};

/// Counts kept while running without a TUI.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct HeadlessStats {
    pub decisions: u64,
    pub beats_per_band: Vec<u64>,
    pub reconfigurations: u32,
}

impl HeadlessStats {
    #[must_use]
    pub fn new(band_count: usize) -> Self {
        Self {
            beats_per_band: vec![0; band_count],
            ..Self::default()
        }
    }

    /// Account for one message. Returns `false` once the source has ended.
    pub fn record(&mut self, msg: &DetectorMessage) -> bool {
        match msg {
            DetectorMessage::Decision(event) => {
                self.decisions += 1;
                if event.decision.is_beat() {
                    log::info!(
                        "beat band {} at {:.3}s ({:.3e})",
                        event.band,
                        event.at.as_secs_f64(),
                        event.decision.magnitude
                    );
                    if let Some(n) = self.beats_per_band.get_mut(event.band) {
                        *n += 1;
                    }
                }
            }
            DetectorMessage::Reconfigured { config } => {
                self.reconfigurations += 1;
                self.beats_per_band = vec![0; config.band_count];
            }
            DetectorMessage::SourceEnded => return false,
        }
        true
    }
}

/// Run until Ctrl-C or the end of a file source, logging beats.
///
/// # Errors
/// Returns an error if the Ctrl-C handler cannot be installed.
pub fn run(mut handle: DetectorHandle, band_count: usize) -> Result<HeadlessStats> {
    let running = Arc::new(AtomicBool::new(true));
    let flag = Arc::clone(&running);
    ctrlc::set_handler(move || flag.store(false, Ordering::SeqCst))?;

    let mut stats = HeadlessStats::new(band_count);
    while running.load(Ordering::SeqCst) {
        match handle.messages().recv_timeout(Duration::from_millis(100)) {
            Ok(msg) => {
                if !stats.record(&msg) {
                    break;
                }
            }
            Err(flume::RecvTimeoutError::Timeout) => {}
            Err(flume::RecvTimeoutError::Disconnected) => break,
        }
    }
    handle.stop();

    log::info!(
        "{} decisions, beats per band: {:?}",
        stats.decisions,
        stats.beats_per_band
    );
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bl_core::config::DetectorConfig;
    use bl_core::event::{BeatEvent, Decision};

    fn decision(band: usize, beat: bool) -> DetectorMessage {
        DetectorMessage::Decision(BeatEvent {
            band,
            decision: if beat {
                Decision::beat(1.0)
            } else {
                Decision::no_beat()
            },
            at: Duration::ZERO,
        })
    }

    #[test]
    fn counts_beats_and_resets_on_reconfiguration() {
        let mut stats = HeadlessStats::new(2);
        assert!(stats.record(&decision(0, true)));
        assert!(stats.record(&decision(1, false)));
        assert!(stats.record(&decision(1, true)));
        assert_eq!(stats.beats_per_band, vec![1, 1]);
        assert_eq!(stats.decisions, 3);

        assert!(stats.record(&DetectorMessage::Reconfigured {
            config: DetectorConfig::default().with_band_count(4),
        }));
        assert_eq!(stats.beats_per_band, vec![0; 4]);
        assert!(stats.record(&decision(3, true)));
        assert_eq!(stats.beats_per_band, vec![0, 0, 0, 1]);

        assert!(!stats.record(&DetectorMessage::SourceEnded));
    }

    #[test]
    fn out_of_range_band_is_counted_but_not_binned() {
        let mut stats = HeadlessStats::new(1);
        stats.record(&decision(5, true));
        assert_eq!(stats.decisions, 1);
        assert_eq!(stats.beats_per_band, vec![0]);
    }
}
