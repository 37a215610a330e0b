use anyhow::{Context, Result};
use bl_core::traits::SampleSource;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, SizedSample};
use rtrb::{Consumer, Producer, RingBuffer};

use crate::error::AudioError;

/// Which device to capture.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CaptureKind {
    /// Default input device (microphone, line in).
    Mic,
    /// Default output device opened as an input stream: what the machine is
    /// playing. Supported by WASAPI; other hosts usually need a monitor
    /// input device selected as default instead.
    Loopback,
}

/// Audio capture via cpal.
///
/// The real-time callback downmixes to mono and writes into a lock-free ring
/// buffer; the detector worker drains it with `read_samples`.
///
/// # Example
/// ```no_run
/// use bl_audio::capture::{CaptureKind, CaptureSource};
/// use bl_core::SampleSource;
/// let mut capture = CaptureSource::open(CaptureKind::Mic).unwrap();
/// capture.start().unwrap();
/// ```
pub struct CaptureSource {
    stream: cpal::Stream,
    consumer: Consumer<f32>,
    sample_rate: u32,
    kind: CaptureKind,
    playing: bool,
}

impl CaptureSource {
    /// Open the default device of `kind`. The stream is built but paused
    /// until `start`.
    ///
    /// # Errors
    /// Returns an error if the device is unavailable or its sample format is
    /// not supported.
    pub fn open(kind: CaptureKind) -> Result<Self> {
        let host = cpal::default_host();
        let (device, config) = match kind {
            CaptureKind::Mic => {
                let device = host.default_input_device().ok_or(AudioError::NoInputDevice)?;
                let config = device.default_input_config()?;
                (device, config)
            }
            CaptureKind::Loopback => {
                let device = host
                    .default_output_device()
                    .ok_or(AudioError::NoOutputDevice)?;
                let config = device.default_output_config()?;
                (device, config)
            }
        };

        let sample_rate = config.sample_rate().0;
        let format = config.sample_format();

        // Ring buffer: 2 seconds of audio @ sample_rate
        let (producer, consumer) = RingBuffer::new(sample_rate as usize * 2);

        let stream_config: cpal::StreamConfig = config.into();
        let stream = match format {
            cpal::SampleFormat::F32 => build_stream::<f32>(&device, &stream_config, producer),
            cpal::SampleFormat::I16 => build_stream::<i16>(&device, &stream_config, producer),
            cpal::SampleFormat::U16 => build_stream::<u16>(&device, &stream_config, producer),
            cpal::SampleFormat::I32 => build_stream::<i32>(&device, &stream_config, producer),
            other => Err(AudioError::UnsupportedFormat(format!("{other:?}")).into()),
        }
        .with_context(|| format!("cannot open {kind:?} capture"))?;
        stream.pause().ok();

        log::info!(
            "{kind:?} capture ready: {} @ {sample_rate}Hz, {} ch",
            device.name().unwrap_or_else(|_| "unknown device".into()),
            stream_config.channels
        );

        Ok(Self {
            stream,
            consumer,
            sample_rate,
            kind,
            playing: false,
        })
    }

    #[must_use]
    pub fn kind(&self) -> CaptureKind {
        self.kind
    }
}

/// Build an input stream converting samples of type `T` to mono f32.
fn build_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    mut producer: Producer<f32>,
) -> Result<cpal::Stream>
where
    T: SizedSample,
    f32: FromSample<T>,
{
    let channels = usize::from(config.channels.max(1));
    let stream = device.build_input_stream(
        config,
        move |data: &[T], _: &cpal::InputCallbackInfo| {
            // Downmix to mono and push into ring buffer
            for chunk in data.chunks(channels) {
                let mono: f32 =
                    chunk.iter().map(|s| s.to_sample::<f32>()).sum::<f32>() / channels as f32;
                let _ = producer.push(mono);
            }
        },
        |err| {
            log::error!("{}", AudioError::StreamError(err.to_string()));
        },
        None,
    )?;
    Ok(stream)
}

impl SampleSource for CaptureSource {
    fn start(&mut self) -> Result<()> {
        if !self.playing {
            self.stream.play()?;
            self.playing = true;
            log::info!("{:?} capture started", self.kind);
        }
        Ok(())
    }

    fn stop(&mut self) {
        if self.playing {
            if let Err(e) = self.stream.pause() {
                log::warn!("cannot pause capture stream: {e}");
            }
            self.playing = false;
            log::info!("{:?} capture stopped", self.kind);
        }
    }

    fn read_samples(&mut self, out: &mut Vec<f32>) -> usize {
        let available = self.consumer.slots();
        out.clear();
        out.reserve(available);
        while let Ok(sample) = self.consumer.pop() {
            out.push(sample);
        }
        out.len()
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}
