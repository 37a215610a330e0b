use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Taper applied to each window before the transform.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WindowFunction {
    /// Raw samples (rectangular window).
    #[default]
    None,
    /// Hann window.
    Hann,
    /// Hamming window.
    Hamming,
}

impl WindowFunction {
    /// Coefficient for sample `i` of a window of `len` samples.
    #[must_use]
    pub fn coefficient(self, i: usize, len: usize) -> f32 {
        if len < 2 {
            return 1.0;
        }
        let phase = 2.0 * std::f32::consts::PI * i as f32 / (len as f32 - 1.0);
        match self {
            Self::None => 1.0,
            Self::Hann => 0.5 * (1.0 - phase.cos()),
            Self::Hamming => 0.54 - 0.46 * phase.cos(),
        }
    }
}

/// How a band's energy is derived from its spectral bins.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EnergyMode {
    /// Σ im(v)². Reference behaviour, default.
    #[default]
    Imaginary,
    /// Σ (re(v)² + im(v)²). Changes every numeric result; opt-in only.
    Magnitude,
}

/// Beat detector configuration.
///
/// # Example
/// ```
/// use bl_core::config::DetectorConfig;
/// let config = DetectorConfig::default();
/// assert_eq!(config.window_length, 2048);
/// assert_eq!(config.band_size(), 512);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct DetectorConfig {
    /// Samples per spectral window. Power of two.
    pub window_length: usize,
    /// Number of independent frequency bands. Divides `window_length`.
    pub band_count: usize,
    /// Minimum time between two decisions of the same band. Zero = every window.
    pub debounce: Duration,
    /// Taper applied before the transform.
    pub window_function: WindowFunction,
    /// Band energy formula.
    pub energy_mode: EnergyMode,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            window_length: 2048,
            band_count: 4,
            debounce: Duration::ZERO,
            window_function: WindowFunction::None,
            energy_mode: EnergyMode::Imaginary,
        }
    }
}

impl DetectorConfig {
    /// Check the window/band relationship.
    ///
    /// # Errors
    /// Returns a [`CoreError`] naming the first violated constraint.
    ///
    /// # Example
    /// ```
    /// use bl_core::config::DetectorConfig;
    /// use bl_core::CoreError;
    /// let bad = DetectorConfig { band_count: 3, ..DetectorConfig::default() };
    /// assert_eq!(bad.validate(), Err(CoreError::BandMismatch { window: 2048, bands: 3 }));
    /// ```
    pub fn validate(&self) -> Result<(), CoreError> {
        if !self.window_length.is_power_of_two() {
            return Err(CoreError::WindowLength {
                length: self.window_length,
            });
        }
        if self.band_count == 0 {
            return Err(CoreError::BandCount {
                count: self.band_count,
            });
        }
        if !self.window_length.is_multiple_of(self.band_count) {
            return Err(CoreError::BandMismatch {
                window: self.window_length,
                bands: self.band_count,
            });
        }
        Ok(())
    }

    /// Bins per band. Only meaningful on a validated config.
    #[inline]
    #[must_use]
    pub fn band_size(&self) -> usize {
        self.window_length / self.band_count.max(1)
    }

    /// Same config with another band count (not validated).
    #[must_use]
    pub fn with_band_count(&self, band_count: usize) -> Self {
        Self {
            band_count,
            ..self.clone()
        }
    }
}

/// Where samples come from.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum SourceKind {
    /// Default output device captured as input (what is playing).
    #[default]
    Loopback,
    /// Default input device.
    Mic,
    /// Decoded audio file.
    File(PathBuf),
}

impl From<&str> for SourceKind {
    fn from(s: &str) -> Self {
        match s {
            "loopback" | "default" | "output" => Self::Loopback,
            "mic" | "microphone" | "input" => Self::Mic,
            path => Self::File(PathBuf::from(path)),
        }
    }
}

/// Sample source settings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceConfig {
    pub kind: SourceKind,
    /// Pace file sources to real time. Ignored for devices.
    pub realtime: bool,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            kind: SourceKind::Loopback,
            realtime: true,
        }
    }
}

/// Terminal UI settings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UiConfig {
    /// FPS cible du TUI.
    pub target_fps: u32,
    /// Show the key help line under the lights.
    pub show_help: bool,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            target_fps: 30,
            show_help: true,
        }
    }
}

/// Complete application configuration.
///
/// # Example
/// ```
/// use bl_core::config::AppConfig;
/// let config = AppConfig::default();
/// assert_eq!(config.ui.target_fps, 30);
/// assert_eq!(config.detector.band_count, 4);
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AppConfig {
    pub detector: DetectorConfig,
    pub source: SourceConfig,
    pub ui: UiConfig,
}

impl AppConfig {
    /// Clamp UI values to their valid ranges.
    /// Called after TOML deserialization to prevent out-of-range values.
    pub fn clamp_all(&mut self) {
        self.ui.target_fps = self.ui.target_fps.clamp(15, 120);
    }
}

/// Intermediate TOML structure, every section optional.
#[derive(Deserialize)]
struct ConfigFile {
    detector: Option<DetectorSection>,
    source: Option<SourceSection>,
    ui: Option<UiSection>,
}

#[derive(Deserialize)]
struct DetectorSection {
    window_length: Option<usize>,
    band_count: Option<usize>,
    debounce_ms: Option<u64>,
    window_function: Option<WindowFunction>,
    energy_mode: Option<EnergyMode>,
}

#[derive(Deserialize)]
struct SourceSection {
    kind: Option<String>,
    realtime: Option<bool>,
}

#[derive(Deserialize)]
struct UiSection {
    target_fps: Option<u32>,
    show_help: Option<bool>,
}

/// Load a TOML file and merge it over the defaults.
///
/// # Errors
/// Returns an error if the file cannot be read or parsed, or if the detector
/// section describes an invalid window/band relationship.
///
/// # Example
/// ```no_run
/// use bl_core::config::load_config;
/// use std::path::Path;
/// let config = load_config(Path::new("config/default.toml")).unwrap();
/// ```
pub fn load_config(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read {}", path.display()))?;
    parse_config(&content).with_context(|| format!("invalid config in {}", path.display()))
}

/// Parse TOML text and merge it over the defaults.
///
/// # Errors
/// Returns an error on malformed TOML or an invalid detector section.
pub fn parse_config(content: &str) -> Result<AppConfig> {
    let file: ConfigFile = toml::from_str(content).context("TOML parse error")?;
    let mut config = AppConfig::default();

    if let Some(d) = file.detector {
        if let Some(v) = d.window_length {
            config.detector.window_length = v;
        }
        if let Some(v) = d.band_count {
            config.detector.band_count = v;
        }
        if let Some(v) = d.debounce_ms {
            config.detector.debounce = Duration::from_millis(v);
        }
        if let Some(v) = d.window_function {
            config.detector.window_function = v;
        }
        if let Some(v) = d.energy_mode {
            config.detector.energy_mode = v;
        }
    }
    if let Some(s) = file.source {
        if let Some(v) = s.kind {
            config.source.kind = SourceKind::from(v.as_str());
        }
        if let Some(v) = s.realtime {
            config.source.realtime = v;
        }
    }
    if let Some(u) = file.ui {
        if let Some(v) = u.target_fps {
            config.ui.target_fps = v;
        }
        if let Some(v) = u.show_help {
            config.ui.show_help = v;
        }
    }

    config.detector.validate()?;
    config.clamp_all();
    Ok(config)
}
