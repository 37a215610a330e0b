use std::io::{self, BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use bl_audio::batch_analyzer::{BatchAnalyzer, beats_per_band};
use bl_core::config::DetectorConfig;
use bl_core::event::BeatEvent;

/// Analyse offline d'un fichier audio : décisions sur stdout, résumé en log.
///
/// # Errors
/// Returns an error if the configuration is invalid, the file cannot be
/// decoded, or stdout cannot be written.
pub fn run_analysis(path: &Path, config: DetectorConfig, json: bool) -> Result<()> {
    let band_count = config.band_count;
    let analyzer = BatchAnalyzer::new(config)?;
    let events = analyzer
        .analyze_file(path)
        .with_context(|| format!("analysis of {} failed", path.display()))?;

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    write_events(&mut out, &events, json)?;
    out.flush()?;

    for (band, beats) in beats_per_band(&events, band_count).iter().enumerate() {
        log::info!("band {band}: {beats} beats");
    }
    Ok(())
}

/// JSON: every decision, one object per line. Text: beats only.
///
/// # Errors
/// Returns an error if the writer fails.
pub fn write_events<W: Write>(out: &mut W, events: &[BeatEvent], json: bool) -> Result<()> {
    for event in events {
        if json {
            serde_json::to_writer(&mut *out, event)?;
            writeln!(out)?;
        } else if event.decision.is_beat() {
            writeln!(
                out,
                "{:>9.3}s  band {:>2}  {:.3e}",
                event.at.as_secs_f64(),
                event.band,
                event.decision.magnitude
            )?;
        }
    }
    Ok(())
}
