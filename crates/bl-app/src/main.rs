use anyhow::Result;
use bl_core::config::{AppConfig, load_config};
use clap::Parser;

pub mod app;
pub mod batch;
pub mod cli;
pub mod headless;
pub mod hotreload;
pub mod pipeline;

fn main() -> Result<()> {
    // 1. Parser CLI
    let cli = cli::Cli::parse();

    // 2. Initialiser le logging
    env_logger::Builder::new()
        .filter_level(cli.log_level.parse().unwrap_or(log::LevelFilter::Warn))
        .init();

    // 3. Charger la config, puis les overrides CLI
    let mut config = resolve_config(&cli)?;
    cli.apply_overrides(&mut config)?;

    // Analyse offline
    if let Some(ref path) = cli.analyze {
        if !pipeline::is_audio_file(path) {
            log::warn!("Extension inconnue pour {}, tentative de décodage", path.display());
        }
        return batch::run_analysis(path, config.detector, cli.json);
    }

    // 4. Démarrer le thread de détection
    let handle = pipeline::start_detector(&config)?;

    // 5. Lancer le hot-reload config (thread interne notify)
    let _watcher = if cli.config.exists() {
        match hotreload::spawn_config_watcher(&cli.config, &cli, handle.commands()) {
            Ok(w) => Some(w),
            Err(e) => {
                log::warn!("Hot-reload indisponible : {e}");
                None
            }
        }
    } else {
        None
    };

    if cli.headless {
        headless::run(handle, config.detector.band_count)?;
        return Ok(());
    }

    // 6. Initialiser le terminal ratatui
    let terminal = ratatui::init();
    let mut app_instance =
        app::App::new(handle, &config, pipeline::source_label(&config.source.kind));

    // 7. Boucle principale
    let result = app_instance.run(terminal);

    // 8. Restaurer le terminal (TOUJOURS, même en cas d'erreur)
    ratatui::restore();

    result
}

/// Load `--config` if it exists, defaults otherwise.
fn resolve_config(cli: &cli::Cli) -> Result<AppConfig> {
    if cli.config.exists() {
        load_config(&cli.config)
    } else {
        log::warn!(
            "Config introuvable : {}. Utilisation des défauts.",
            cli.config.display()
        );
        Ok(AppConfig::default())
    }
}
