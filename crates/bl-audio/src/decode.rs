use std::fs::File;
use std::path::Path;
use std::time::Instant;

use anyhow::{Context, Result};
use bl_core::traits::SampleSource;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::error::AudioError;

/// Samples released per read when a file source is not paced.
const UNPACED_CHUNK: usize = 4096;

/// Decode an audio file into mono f32 samples at its native rate.
///
/// Supports WAV, MP3, FLAC, OGG, AAC via symphonia.
///
/// # Errors
/// Returns an error if the file cannot be opened or decoded.
///
/// # Example
/// ```no_run
/// use bl_audio::decode::decode_file;
/// let (samples, sample_rate) = decode_file("track.wav").unwrap();
/// ```
pub fn decode_file(path: impl AsRef<Path>) -> Result<(Vec<f32>, u32)> {
    let path = path.as_ref();
    let file =
        File::open(path).with_context(|| format!("cannot open audio file: {}", path.display()))?;
    let mss = MediaSourceStream::new(
        Box::new(file),
        symphonia::core::io::MediaSourceStreamOptions::default(),
    );

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| AudioError::DecodeError(e.to_string()))
        .context("failed to probe audio format")?;

    let mut format = probed.format;
    let track = format
        .default_track()
        .context("no default audio track found")?;

    let sample_rate = track.codec_params.sample_rate.unwrap_or(44100);
    let channels = track
        .codec_params
        .channels
        .map_or(1, symphonia::core::audio::Channels::count)
        .max(1);

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| AudioError::DecodeError(e.to_string()))
        .context("failed to create audio decoder")?;

    let track_id = track.id;
    let mut all_samples: Vec<f32> = Vec::new();
    let mut sample_buf: Option<SampleBuffer<f32>> = None;
    let mut max_sample_frames: usize = 0;

    loop {
        let packet = match format.next_packet() {
            Ok(p) => p,
            Err(symphonia::core::errors::Error::IoError(ref e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(e) => {
                log::warn!("audio decode packet error: {e}");
                break;
            }
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(d) => d,
            Err(e) => {
                log::warn!("audio decode frame error: {e}");
                continue;
            }
        };

        let spec = *decoded.spec();
        let num_frames = decoded.capacity();
        // Reuse SampleBuffer: only reallocate if this packet is bigger than current capacity
        if sample_buf.is_none() || num_frames > max_sample_frames {
            sample_buf = Some(SampleBuffer::<f32>::new(num_frames as u64, spec));
            max_sample_frames = num_frames;
        }
        let Some(buf) = sample_buf.as_mut() else {
            continue;
        };
        buf.copy_interleaved_ref(decoded);

        // Downmix to mono
        for chunk in buf.samples().chunks(channels) {
            all_samples.push(chunk.iter().sum::<f32>() / channels as f32);
        }
    }

    log::info!(
        "decoded {} samples @ {}Hz from {}",
        all_samples.len(),
        sample_rate,
        path.display()
    );

    Ok((all_samples, sample_rate))
}

/// A decoded file played back as a sample source.
///
/// Paced mode releases samples at the stream's real-time rate, as a capture
/// device would; unpaced mode releases fixed chunks as fast as they are read.
///
/// # Example
/// ```
/// use bl_audio::decode::FileSource;
/// use bl_core::SampleSource;
/// let mut source = FileSource::from_samples(vec![0.0; 10_000], 44100, false);
/// source.start().unwrap();
/// let mut buf = Vec::new();
/// assert_eq!(source.read_samples(&mut buf), 4096);
/// ```
pub struct FileSource {
    samples: Vec<f32>,
    sample_rate: u32,
    realtime: bool,
    /// Next sample to release.
    pos: usize,
    /// Playback start, shifted on resume so pauses are not caught up.
    started: Option<Instant>,
    /// Position at the last `stop`.
    paused_at: usize,
}

impl FileSource {
    /// Decode `path` into a source.
    ///
    /// # Errors
    /// Returns an error if decoding fails or the file holds no audio.
    pub fn open(path: &Path, realtime: bool) -> Result<Self> {
        let (samples, sample_rate) = decode_file(path)?;
        if samples.is_empty() {
            anyhow::bail!("audio file is empty: {}", path.display());
        }
        Ok(Self::from_samples(samples, sample_rate, realtime))
    }

    #[must_use]
    pub fn from_samples(samples: Vec<f32>, sample_rate: u32, realtime: bool) -> Self {
        Self {
            samples,
            sample_rate,
            realtime,
            pos: 0,
            started: None,
            paused_at: 0,
        }
    }

    /// Total length in samples.
    #[must_use]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Samples released so far.
    #[must_use]
    pub fn position(&self) -> usize {
        self.pos
    }

    fn release_until(&self) -> usize {
        let Some(started) = self.started else {
            return self.pos;
        };
        if !self.realtime {
            return self.pos + UNPACED_CHUNK;
        }
        let due = started.elapsed().as_secs_f64() * f64::from(self.sample_rate);
        self.paused_at + due as usize
    }
}

impl SampleSource for FileSource {
    fn start(&mut self) -> Result<()> {
        if self.started.is_none() {
            self.paused_at = self.pos;
            self.started = Some(Instant::now());
        }
        Ok(())
    }

    fn stop(&mut self) {
        self.started = None;
        self.paused_at = self.pos;
    }

    fn read_samples(&mut self, out: &mut Vec<f32>) -> usize {
        out.clear();
        let end = self.release_until().min(self.samples.len());
        if end > self.pos {
            out.extend_from_slice(&self.samples[self.pos..end]);
            self.pos = end;
        }
        out.len()
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn is_exhausted(&self) -> bool {
        self.pos >= self.samples.len()
    }
}
