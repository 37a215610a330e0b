use std::time::{Duration, Instant};

use anyhow::Result;
use bl_audio::state::{DetectorHandle, DetectorMessage};
use bl_core::config::{AppConfig, DetectorConfig};
use bl_render::lights::LightGrid;
use bl_render::rate::RateMeter;
use bl_render::ui::{self, RenderState, Status};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::DefaultTerminal;

/// Largest band count reachable from the keyboard.
pub const MAX_BANDS: usize = 64;

/// Application state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AppState {
    Running,
    Help,
    Quitting,
}

/// Next band count when stepping up (`+`) or down (`-`).
///
/// Band counts are powers of two in `1..=MAX_BANDS` that divide the window.
/// Returns `None` at either end of the range.
#[must_use]
pub fn step_band_count(current: usize, window_length: usize, up: bool) -> Option<usize> {
    let next = if up {
        current.checked_mul(2)?
    } else {
        current / 2
    };
    let valid = next >= 1
        && next <= MAX_BANDS
        && next.is_power_of_two()
        && window_length.is_multiple_of(next);
    valid.then_some(next)
}

/// Live TUI: detector messages in, lights out.
pub struct App {
    handle: DetectorHandle,
    detector: DetectorConfig,
    grid: LightGrid,
    state: AppState,
    source_label: String,
    target_fps: u32,
    show_hint: bool,
    beats: RateMeter,
    frames: RateMeter,
    ended: bool,
}

impl App {
    #[must_use]
    pub fn new(handle: DetectorHandle, config: &AppConfig, source_label: String) -> Self {
        Self {
            handle,
            grid: LightGrid::new(config.detector.band_count),
            detector: config.detector.clone(),
            state: AppState::Running,
            source_label,
            target_fps: config.ui.target_fps,
            show_hint: config.ui.show_help,
            beats: RateMeter::new(Duration::from_secs(2)),
            frames: RateMeter::new(Duration::from_secs(1)),
            ended: false,
        }
    }

    /// Main event loop: keys, detector messages, draw at the target FPS.
    ///
    /// # Errors
    /// Returns an error if terminal operations fail.
    pub fn run(&mut self, mut terminal: DefaultTerminal) -> Result<()> {
        let frame_duration = Duration::from_secs_f64(1.0 / f64::from(self.target_fps.max(1)));
        let mut last_frame = Instant::now();

        while self.state != AppState::Quitting {
            let elapsed = last_frame.elapsed();
            if elapsed < frame_duration {
                // Dormir le temps restant, mais rester réactif aux événements
                if event::poll(frame_duration.saturating_sub(elapsed))? {
                    self.handle_event(&event::read()?);
                }
                continue;
            }
            last_frame = Instant::now();

            while event::poll(Duration::ZERO)? {
                self.handle_event(&event::read()?);
            }

            self.drain_messages();

            let now = Instant::now();
            self.beats.expire(now);
            self.frames.tick_at(now);

            let status = Status {
                source: &self.source_label,
                band_count: self.grid.band_count(),
                window_length: self.detector.window_length,
                debounce: self.detector.debounce,
                beats_per_sec: self.beats.rate(),
                fps: self.frames.rate(),
                ended: self.ended,
                show_hint: self.show_hint,
            };
            let render_state = if self.state == AppState::Help {
                RenderState::Help
            } else {
                RenderState::Running
            };
            terminal.draw(|frame| ui::draw(frame, &self.grid, &status, render_state))?;
        }

        self.handle.stop();
        Ok(())
    }

    /// Apply every pending detector message to the lights.
    fn drain_messages(&mut self) {
        while let Ok(msg) = self.handle.messages().try_recv() {
            self.apply_message(&msg);
        }
    }

    fn apply_message(&mut self, msg: &DetectorMessage) {
        match msg {
            DetectorMessage::Decision(event) => {
                if self.grid.apply(event) && event.decision.is_beat() {
                    self.beats.tick();
                }
            }
            DetectorMessage::Reconfigured { config } => {
                self.grid.reset(config.band_count);
                self.detector = config.clone();
                self.beats.clear();
            }
            DetectorMessage::SourceEnded => {
                self.ended = true;
                self.grid.reset(self.grid.band_count());
            }
        }
    }

    fn handle_event(&mut self, event: &Event) {
        if let Event::Key(KeyEvent {
            code,
            modifiers,
            kind: KeyEventKind::Press,
            ..
        }) = *event
        {
            if modifiers.contains(KeyModifiers::CONTROL) && code == KeyCode::Char('c') {
                self.state = AppState::Quitting;
                return;
            }
            self.handle_key(code);
        }
    }

    fn handle_key(&mut self, code: KeyCode) {
        match code {
            KeyCode::Char('q') => self.state = AppState::Quitting,
            KeyCode::Esc => {
                self.state = if self.state == AppState::Help {
                    AppState::Running
                } else {
                    AppState::Quitting
                };
            }
            KeyCode::Char('h' | '?') => {
                self.state = if self.state == AppState::Help {
                    AppState::Running
                } else {
                    AppState::Help
                };
            }
            KeyCode::Char('+' | '=') => self.step_bands(true),
            KeyCode::Char('-' | '_') => self.step_bands(false),
            _ => {}
        }
    }

    /// Ask the detector thread for the next band count. The grid follows
    /// when the `Reconfigured` message comes back.
    fn step_bands(&mut self, up: bool) {
        match step_band_count(self.detector.band_count, self.detector.window_length, up) {
            Some(n) => {
                log::info!("band count {} -> {n}", self.detector.band_count);
                self.handle.set_band_count(n);
            }
            None => log::debug!("band count {} is at its limit", self.detector.band_count),
        }
    }
}
