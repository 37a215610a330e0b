use std::path::PathBuf;
use std::time::Duration;

use bl_core::config::{AppConfig, EnergyMode, SourceKind};
use clap::{Parser, ValueEnum};

/// beatlights: multi-band beat detection rendered as terminal lights.
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Source audio : "loopback", "mic", ou chemin vers un fichier audio.
    #[arg(long)]
    pub source: Option<String>,

    /// Fichier de configuration TOML. Défaut : config/default.toml.
    #[arg(short, long, default_value = "config/default.toml")]
    pub config: PathBuf,

    /// Nombre de bandes (puissance de deux divisant la fenêtre).
    #[arg(long)]
    pub bands: Option<usize>,

    /// Taille de fenêtre en échantillons (puissance de deux).
    #[arg(long)]
    pub window: Option<usize>,

    /// Délai minimal entre deux décisions d'une même bande, en ms.
    #[arg(long)]
    pub debounce_ms: Option<u64>,

    /// Formule d'énergie par bande.
    #[arg(long, value_enum)]
    pub energy: Option<EnergyArg>,

    /// Pas de TUI : les beats sont journalisés jusqu'à Ctrl-C.
    #[arg(long, default_value_t = false)]
    pub headless: bool,

    /// Analyse offline d'un fichier audio, puis sortie.
    #[arg(long)]
    pub analyze: Option<PathBuf>,

    /// Avec --analyze : un objet JSON par décision.
    #[arg(long, default_value_t = false)]
    pub json: bool,

    /// Niveau de log : error, warn, info, debug, trace.
    #[arg(long, default_value = "warn")]
    pub log_level: String,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum EnergyArg {
    /// Sum of squared imaginary parts.
    Imaginary,
    /// Sum of squared magnitudes.
    Magnitude,
}

impl From<EnergyArg> for EnergyMode {
    fn from(arg: EnergyArg) -> Self {
        match arg {
            EnergyArg::Imaginary => Self::Imaginary,
            EnergyArg::Magnitude => Self::Magnitude,
        }
    }
}

impl Cli {
    /// Apply command-line overrides on top of a loaded configuration.
    ///
    /// # Errors
    /// Returns an error if the resulting detector configuration is invalid.
    pub fn apply_overrides(&self, config: &mut AppConfig) -> anyhow::Result<()> {
        if let Some(ref source) = self.source {
            config.source.kind = SourceKind::from(source.as_str());
        }
        if let Some(bands) = self.bands {
            config.detector.band_count = bands;
        }
        if let Some(window) = self.window {
            config.detector.window_length = window;
        }
        if let Some(ms) = self.debounce_ms {
            config.detector.debounce = Duration::from_millis(ms);
        }
        if let Some(energy) = self.energy {
            config.detector.energy_mode = energy.into();
        }
        config.detector.validate()?;
        Ok(())
    }
}
