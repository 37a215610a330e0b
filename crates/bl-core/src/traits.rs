use crate::event::BeatEvent;

/// Delivers mono f32 samples to the detector.
///
/// Implemented by : `CaptureSource` (cpal), `FileSource` (symphonia).
///
/// The detector worker owns the source and is the only caller; a source may
/// fill an internal buffer from another thread (e.g. an audio callback) but
/// `read_samples` must never block.
///
/// # Example
/// ```
/// use bl_core::traits::SampleSource;
///
/// struct Silence;
/// impl SampleSource for Silence {
///     fn start(&mut self) -> anyhow::Result<()> { Ok(()) }
///     fn stop(&mut self) {}
///     fn read_samples(&mut self, out: &mut Vec<f32>) -> usize {
///         out.clear();
///         out.resize(64, 0.0);
///         64
///     }
///     fn sample_rate(&self) -> u32 { 44100 }
/// }
/// ```
pub trait SampleSource {
    /// Begin producing samples.
    ///
    /// # Errors
    /// Returns an error if the underlying device or stream cannot start.
    fn start(&mut self) -> anyhow::Result<()>;

    /// Stop producing samples. Idempotent.
    fn stop(&mut self);

    /// Replace the contents of `out` with every sample available right now.
    ///
    /// Returns how many samples were read. Never blocks.
    fn read_samples(&mut self, out: &mut Vec<f32>) -> usize;

    /// Sample rate of the delivered stream.
    fn sample_rate(&self) -> u32;

    /// `true` once a finite source has nothing left to deliver.
    fn is_exhausted(&self) -> bool {
        false
    }
}

/// Receives every decision the detector publishes, synchronously, on the
/// producer thread.
///
/// A listener that needs another execution context (a UI thread) does its
/// own hand-off, see `ChannelListener` in `bl-audio`.
///
/// # Example
/// ```
/// use bl_core::traits::DecisionListener;
/// use bl_core::event::BeatEvent;
///
/// let mut beats = 0usize;
/// let mut listener = |e: &BeatEvent| -> anyhow::Result<()> {
///     if e.decision.is_beat() { beats += 1; }
///     Ok(())
/// };
/// let _ = &mut listener;
/// ```
pub trait DecisionListener: Send {
    /// Handle one decision.
    ///
    /// # Errors
    /// A failing listener is logged and skipped; other listeners still run.
    fn on_decision(&mut self, event: &BeatEvent) -> anyhow::Result<()>;
}

impl<F> DecisionListener for F
where
    F: FnMut(&BeatEvent) -> anyhow::Result<()> + Send,
{
    fn on_decision(&mut self, event: &BeatEvent) -> anyhow::Result<()> {
        self(event)
    }
}
