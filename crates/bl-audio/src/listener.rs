use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use bl_core::event::BeatEvent;
use bl_core::traits::DecisionListener;

/// Forwards decisions into a `flume` channel for another thread to consume.
///
/// Never blocks the producer: on a full bounded channel the message is
/// dropped and counted. A disconnected receiver is reported as an error.
///
/// # Example
/// ```
/// use bl_audio::listener::ChannelListener;
/// use bl_core::event::BeatEvent;
/// let (tx, rx) = flume::bounded::<BeatEvent>(64);
/// let listener = ChannelListener::new(tx);
/// assert_eq!(listener.dropped(), 0);
/// # drop(rx);
/// ```
pub struct ChannelListener<M> {
    tx: flume::Sender<M>,
    dropped: Arc<AtomicU64>,
}

impl<M> ChannelListener<M>
where
    M: From<BeatEvent> + Send,
{
    #[must_use]
    pub fn new(tx: flume::Sender<M>) -> Self {
        Self {
            tx,
            dropped: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Messages dropped because the channel was full.
    #[must_use]
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Shared handle on the drop counter, readable after the listener has
    /// been moved into a detector.
    #[must_use]
    pub fn dropped_counter(&self) -> Arc<AtomicU64> {
        Arc::clone(&self.dropped)
    }
}

impl<M> DecisionListener for ChannelListener<M>
where
    M: From<BeatEvent> + Send,
{
    fn on_decision(&mut self, event: &BeatEvent) -> anyhow::Result<()> {
        match self.tx.try_send(M::from(*event)) {
            Ok(()) => Ok(()),
            Err(flume::TrySendError::Full(_)) => {
                let n = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                if n.is_power_of_two() {
                    log::debug!("decision channel full, {n} messages dropped so far");
                }
                Ok(())
            }
            Err(flume::TrySendError::Disconnected(_)) => {
                anyhow::bail!("decision channel disconnected")
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use bl_core::event::Decision;
    use std::time::Duration;

    fn event(band: usize) -> BeatEvent {
        BeatEvent {
            band,
            decision: Decision::beat(1.0),
            at: Duration::ZERO,
        }
    }

    #[test]
    fn forwards_in_order() {
        let (tx, rx) = flume::unbounded::<BeatEvent>();
        let mut listener = ChannelListener::new(tx);
        for band in 0..4 {
            listener.on_decision(&event(band)).unwrap();
        }
        let bands: Vec<usize> = rx.try_iter().map(|e| e.band).collect();
        assert_eq!(bands, vec![0, 1, 2, 3]);
    }

    #[test]
    fn full_channel_drops_without_error() {
        let (tx, rx) = flume::bounded::<BeatEvent>(2);
        let mut listener = ChannelListener::new(tx);
        let counter = listener.dropped_counter();
        for band in 0..5 {
            listener.on_decision(&event(band)).unwrap();
        }
        assert_eq!(rx.len(), 2);
        assert_eq!(listener.dropped(), 3);
        assert_eq!(counter.load(Ordering::Relaxed), 3);
    }

    #[test]
    fn disconnected_channel_is_an_error() {
        let (tx, rx) = flume::bounded::<BeatEvent>(2);
        drop(rx);
        let mut listener = ChannelListener::new(tx);
        assert!(listener.on_decision(&event(0)).is_err());
    }
}
