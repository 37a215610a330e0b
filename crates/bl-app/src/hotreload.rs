use std::path::Path;

use anyhow::Result;
use bl_audio::state::DetectorCommand;
use bl_core::config::{AppConfig, load_config};
use notify::{Event, EventKind, RecursiveMode, Watcher};

use crate::cli::Cli;

/// Re-read the config file and re-apply the command-line overrides.
///
/// # Errors
/// Returns an error if the file is unreadable or the result is invalid.
pub fn reload(path: &Path, cli: &Cli) -> Result<AppConfig> {
    let mut config = load_config(path)?;
    cli.apply_overrides(&mut config)?;
    Ok(config)
}

/// Surveille le fichier config et envoie la nouvelle configuration du
/// détecteur au thread de détection.
///
/// Retourne le Watcher (doit rester vivant tant que l'app tourne).
///
/// # Errors
/// Returns an error if the watcher cannot be created or the path cannot be watched.
pub fn spawn_config_watcher(
    config_path: &Path,
    cli: &Cli,
    cmd_tx: flume::Sender<DetectorCommand>,
) -> Result<impl Watcher + use<>> {
    let path = config_path.to_path_buf();
    let cli = cli.clone();

    let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
        if let Ok(event) = res
            && matches!(event.kind, EventKind::Modify(_))
        {
            match reload(&path, &cli) {
                Ok(config) => {
                    log::info!("Config rechargée depuis {}", path.display());
                    if cmd_tx.send(DetectorCommand::Reconfigure(config.detector)).is_err() {
                        log::debug!("detector thread gone, reload dropped");
                    }
                }
                Err(e) => {
                    // On garde l'ancienne config.
                    log::warn!("Erreur de rechargement config : {e:#}");
                }
            }
        }
    })?;

    watcher.watch(config_path, RecursiveMode::NonRecursive)?;
    Ok(watcher)
}
