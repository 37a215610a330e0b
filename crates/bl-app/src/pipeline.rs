use std::path::Path;

use bl_audio::capture::{CaptureKind, CaptureSource};
use bl_audio::decode::FileSource;
use bl_audio::state::{DetectorHandle, spawn_detector_thread};
use bl_core::config::{AppConfig, SourceKind};

/// Start the detector worker on the configured source.
///
/// `"loopback"` and `"mic"` capture the default devices; anything else is a
/// file path, decoded and played paced to real time unless
/// `source.realtime = false`.
///
/// # Errors
/// Returns an error if the device or file is unavailable or the detector
/// configuration is invalid.
pub fn start_detector(config: &AppConfig) -> anyhow::Result<DetectorHandle> {
    let detector = config.detector.clone();
    match config.source.kind {
        SourceKind::Loopback => {
            log::info!("Starting loopback capture");
            spawn_detector_thread(detector, || CaptureSource::open(CaptureKind::Loopback))
        }
        SourceKind::Mic => {
            log::info!("Starting microphone capture");
            spawn_detector_thread(detector, || CaptureSource::open(CaptureKind::Mic))
        }
        SourceKind::File(ref path) => {
            if !path.exists() {
                anyhow::bail!("Audio source not found: {}", path.display());
            }
            log::info!("Starting audio file playback: {}", path.display());
            let path = path.clone();
            let realtime = config.source.realtime;
            spawn_detector_thread(detector, move || FileSource::open(&path, realtime))
        }
    }
}

/// Short label of a source, for the status line.
#[must_use]
pub fn source_label(kind: &SourceKind) -> String {
    match kind {
        SourceKind::Loopback => "loopback".to_string(),
        SourceKind::Mic => "mic".to_string(),
        SourceKind::File(path) => path
            .file_name()
            .and_then(|n| n.to_str())
            .map_or_else(|| path.display().to_string(), String::from),
    }
}

/// `true` if the path looks like an audio file symphonia can open.
#[must_use]
pub fn is_audio_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| {
            matches!(
                e.to_ascii_lowercase().as_str(),
                "wav" | "mp3" | "flac" | "ogg" | "m4a" | "aac" | "mka" | "mkv"
            )
        })
}
