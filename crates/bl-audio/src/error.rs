use thiserror::Error;

/// Errors originating from the audio module.
#[derive(Error, Debug)]
pub enum AudioError {
    /// No audio input device found.
    #[error("no audio input device found")]
    NoInputDevice,

    /// No audio output device found (loopback capture).
    #[error("no audio output device found")]
    NoOutputDevice,

    /// Unsupported sample format.
    #[error("unsupported sample format: {0}")]
    UnsupportedFormat(String),

    /// Audio stream error.
    #[error("audio stream error: {0}")]
    StreamError(String),

    /// Audio decode error.
    #[error("decode error: {0}")]
    DecodeError(String),
}
