use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use anyhow::Result;
use bl_core::clock::{Clock, MonotonicClock};
use bl_core::config::DetectorConfig;
use bl_core::event::BeatEvent;
use bl_core::traits::SampleSource;

use crate::detector::BeatDetector;
use crate::listener::ChannelListener;

/// Idle sleep when the source had nothing to deliver.
const IDLE_POLL: Duration = Duration::from_millis(2);

/// Capacity of the outgoing message channel.
const MESSAGE_CAPACITY: usize = 4096;

/// Commands for the detector worker.
#[derive(Debug, Clone, PartialEq)]
pub enum DetectorCommand {
    /// Replace the detector with one of `n` bands, same other settings.
    SetBandCount(usize),
    /// Replace the detector with a new configuration.
    Reconfigure(DetectorConfig),
    Quit,
}

/// Messages published by the detector worker, in production order.
#[derive(Debug, Clone, PartialEq)]
pub enum DetectorMessage {
    Decision(BeatEvent),
    /// Every later decision comes from a fresh detector built from `config`.
    Reconfigured { config: DetectorConfig },
    /// A finite source has delivered everything.
    SourceEnded,
}

impl From<BeatEvent> for DetectorMessage {
    fn from(event: BeatEvent) -> Self {
        Self::Decision(event)
    }
}

/// Owner side of a running detector worker.
///
/// Dropping the handle stops the worker.
pub struct DetectorHandle {
    cmd_tx: flume::Sender<DetectorCommand>,
    msg_rx: flume::Receiver<DetectorMessage>,
    join: Option<JoinHandle<()>>,
}

impl DetectorHandle {
    /// Ask for a new band count. Applied between two sample batches.
    pub fn set_band_count(&self, band_count: usize) {
        self.send(DetectorCommand::SetBandCount(band_count));
    }

    /// Ask for a full reconfiguration.
    pub fn reconfigure(&self, config: DetectorConfig) {
        self.send(DetectorCommand::Reconfigure(config));
    }

    /// Sender usable from other threads (config watcher).
    #[must_use]
    pub fn commands(&self) -> flume::Sender<DetectorCommand> {
        self.cmd_tx.clone()
    }

    #[must_use]
    pub fn messages(&self) -> &flume::Receiver<DetectorMessage> {
        &self.msg_rx
    }

    /// Stop the worker and wait for it. Idempotent.
    pub fn stop(&mut self) {
        let Some(join) = self.join.take() else {
            return;
        };
        self.send(DetectorCommand::Quit);
        // The worker may be blocked on a full message channel.
        while !join.is_finished() {
            while self.msg_rx.try_recv().is_ok() {}
            thread::sleep(IDLE_POLL);
        }
        if join.join().is_err() {
            log::error!("detector thread panicked");
        }
    }

    fn send(&self, cmd: DetectorCommand) {
        if self.cmd_tx.send(cmd).is_err() {
            log::debug!("detector thread already gone");
        }
    }
}

impl Drop for DetectorHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Spawn the detector worker.
///
/// `make_source` runs on the worker thread, so sources that are not `Send`
/// (some cpal streams) stay on the thread that created them. Construction
/// and start errors are reported here, before the handle is returned.
///
/// # Errors
/// Returns an error if the configuration is invalid, the thread cannot be
/// spawned, or the source fails to open or start.
pub fn spawn_detector_thread<F, S>(config: DetectorConfig, make_source: F) -> Result<DetectorHandle>
where
    F: FnOnce() -> Result<S> + Send + 'static,
    S: SampleSource + 'static,
{
    config.validate()?;

    let (cmd_tx, cmd_rx) = flume::unbounded();
    let (msg_tx, msg_rx) = flume::bounded(MESSAGE_CAPACITY);
    let (ready_tx, ready_rx) = flume::bounded::<Result<()>>(1);

    let join = thread::Builder::new()
        .name("bl-detector".to_string())
        .spawn(move || {
            let mut source = match make_source().and_then(|mut s| s.start().map(|()| s)) {
                Ok(s) => s,
                Err(e) => {
                    let _ = ready_tx.send(Err(e));
                    return;
                }
            };
            let clock: Arc<dyn Clock> = Arc::new(MonotonicClock::new());
            let detector = match build_detector(config, &clock, &msg_tx) {
                Ok(d) => d,
                Err(e) => {
                    source.stop();
                    let _ = ready_tx.send(Err(e.into()));
                    return;
                }
            };
            let _ = ready_tx.send(Ok(()));
            run_detector_loop(&mut source, detector, &clock, &cmd_rx, &msg_tx);
            source.stop();
        })?;

    match ready_rx.recv() {
        Ok(Ok(())) => Ok(DetectorHandle {
            cmd_tx,
            msg_rx,
            join: Some(join),
        }),
        Ok(Err(e)) => {
            let _ = join.join();
            Err(e)
        }
        Err(_) => {
            let _ = join.join();
            anyhow::bail!("detector thread exited during startup")
        }
    }
}

fn build_detector(
    config: DetectorConfig,
    clock: &Arc<dyn Clock>,
    msg_tx: &flume::Sender<DetectorMessage>,
) -> Result<BeatDetector, bl_core::CoreError> {
    let mut detector = BeatDetector::new(config, Arc::clone(clock))?;
    detector.subscribe(ChannelListener::new(msg_tx.clone()));
    Ok(detector)
}

/// Single producer loop: commands, then one batch of samples, repeat.
fn run_detector_loop(
    source: &mut dyn SampleSource,
    mut detector: BeatDetector,
    clock: &Arc<dyn Clock>,
    cmd_rx: &flume::Receiver<DetectorCommand>,
    msg_tx: &flume::Sender<DetectorMessage>,
) {
    let mut batch: Vec<f32> = Vec::with_capacity(source.sample_rate() as usize);
    let mut ended = false;

    loop {
        while let Ok(cmd) = cmd_rx.try_recv() {
            let next = match cmd {
                DetectorCommand::Quit => {
                    detector.dispose();
                    return;
                }
                DetectorCommand::SetBandCount(n) => detector.config().with_band_count(n),
                DetectorCommand::Reconfigure(config) => config,
            };
            if let Err(e) = next.validate() {
                log::warn!("reconfiguration rejected: {e}");
                continue;
            }
            // Same settings: keep the histories.
            if next == *detector.config() {
                log::debug!("reconfiguration ignored, settings unchanged");
                continue;
            }
            // Old detector is fully unhooked before the replacement exists.
            detector.dispose();
            match build_detector(next, clock, msg_tx) {
                Ok(d) => {
                    detector = d;
                    log::info!(
                        "detector reconfigured: {} bands, window {}",
                        detector.band_count(),
                        detector.config().window_length
                    );
                    publish(
                        msg_tx,
                        DetectorMessage::Reconfigured {
                            config: detector.config().clone(),
                        },
                    );
                }
                Err(e) => log::error!("cannot rebuild detector: {e}"),
            }
        }

        if source.read_samples(&mut batch) > 0 {
            detector.ingest_batch(&batch);
        } else {
            if !ended && source.is_exhausted() {
                ended = true;
                log::info!("sample source exhausted");
                publish(msg_tx, DetectorMessage::SourceEnded);
            }
            thread::sleep(IDLE_POLL);
        }
    }
}

/// Control messages must not be dropped: block until there is room.
fn publish(msg_tx: &flume::Sender<DetectorMessage>, msg: DetectorMessage) {
    if msg_tx.send(msg).is_err() {
        log::debug!("no one listening for detector messages");
    }
}
