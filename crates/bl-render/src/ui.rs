use std::time::Duration;

use ratatui::Frame;
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph};

use crate::lights::LightGrid;

/// What the screen currently shows on top of the lights.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RenderState {
    Running,
    /// Help overlay visible.
    Help,
}

/// Values shown in the status line.
#[derive(Clone, Debug)]
pub struct Status<'a> {
    /// Source label (`loopback`, `mic`, file name).
    pub source: &'a str,
    pub band_count: usize,
    pub window_length: usize,
    pub debounce: Duration,
    pub beats_per_sec: f64,
    pub fps: f64,
    /// The source has delivered everything.
    pub ended: bool,
    /// Append the `? = help` hint.
    pub show_hint: bool,
}

/// Draw the full UI: light grid + status line (+ help overlay).
pub fn draw(frame: &mut Frame, grid: &LightGrid, status: &Status<'_>, state: RenderState) {
    let area = frame.area();
    let chunks = Layout::vertical([Constraint::Min(3), Constraint::Length(1)]).split(area);

    draw_lights(frame, chunks[0], grid);
    draw_status(frame, chunks[1], status);

    if state == RenderState::Help {
        draw_help_overlay(frame, area);
    }
}

/// One bordered cell per band, row-major, filled with the band's colour.
fn draw_lights(frame: &mut Frame, area: Rect, grid: &LightGrid) {
    let (cols, rows) = grid.shape();
    if cols == 0 {
        return;
    }
    let row_areas =
        Layout::vertical((0..rows).map(|_| Constraint::Ratio(1, rows as u32))).split(area);

    for (r, row_area) in row_areas.iter().enumerate() {
        let cells =
            Layout::horizontal((0..cols).map(|_| Constraint::Ratio(1, cols as u32))).split(*row_area);
        for (c, cell) in cells.iter().enumerate() {
            let band = r * cols + c;
            let Some(color) = grid.color(band) else {
                break;
            };
            let light = Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::DarkGray))
                .title(Span::styled(
                    format!(" {band} "),
                    Style::default().fg(Color::Black),
                ))
                .style(Style::default().bg(color));
            frame.render_widget(light, *cell);
        }
    }
}

fn draw_status(frame: &mut Frame, area: Rect, status: &Status<'_>) {
    let state = if status.ended {
        Span::styled(" ⏹ END ", Style::default().fg(Color::DarkGray))
    } else {
        Span::styled(" ▶ LIVE ", Style::default().fg(Color::Green))
    };
    let mut spans = vec![
        state,
        Span::raw(format!(
            "│ {} │ {} bands │ window {} │ debounce {}ms │ {:.1} beats/s │ {:.0} FPS ",
            status.source,
            status.band_count,
            status.window_length,
            status.debounce.as_millis(),
            status.beats_per_sec,
            status.fps
        )),
    ];
    if status.show_hint {
        spans.push(Span::styled("│ ? = help", Style::default().fg(Color::DarkGray)));
    }
    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

/// Draw the help overlay with all keybindings.
fn draw_help_overlay(frame: &mut Frame, area: Rect) {
    let help_text = vec![
        Line::from(Span::styled(
            " beatlights · Controls ",
            Style::default().fg(Color::Yellow),
        )),
        Line::from(""),
        Line::from(" q/Esc    Quit"),
        Line::from(" +        Double band count"),
        Line::from(" -        Halve band count"),
        Line::from(" h/?      Toggle help"),
        Line::from(""),
        Line::from(Span::styled(
            " Press ? or Esc to close ",
            Style::default().fg(Color::DarkGray),
        )),
    ];

    let help_width = 34u16.min(area.width);
    let help_height = (help_text.len() as u16 + 2).min(area.height);
    let x = area.x + area.width.saturating_sub(help_width) / 2;
    let y = area.y + area.height.saturating_sub(help_height) / 2;
    let help_area = Rect::new(x, y, help_width, help_height);

    let help = Paragraph::new(help_text).block(
        Block::default()
            .borders(Borders::ALL)
            .title(" Help ")
            .style(Style::default().bg(Color::Black).fg(Color::White)),
    );

    frame.render_widget(Clear, help_area);
    frame.render_widget(help, help_area);
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use bl_core::event::{BeatEvent, Decision};
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;

    fn status() -> Status<'static> {
        Status {
            source: "mic",
            band_count: 4,
            window_length: 2048,
            debounce: Duration::from_millis(50),
            beats_per_sec: 2.0,
            fps: 30.0,
            ended: false,
            show_hint: true,
        }
    }

    #[test]
    fn lit_band_is_painted() {
        let mut grid = LightGrid::new(4);
        grid.apply(&BeatEvent {
            band: 0,
            decision: Decision::beat(1.0),
            at: Duration::ZERO,
        });
        let mut terminal = Terminal::new(TestBackend::new(40, 12)).unwrap();
        terminal
            .draw(|f| draw(f, &grid, &status(), RenderState::Running))
            .unwrap();

        let buffer = terminal.backend().buffer();
        // inside band 0 (top-left) vs inside band 1 (top-right)
        assert_eq!(buffer[(3, 2)].bg, Color::Red);
        assert_eq!(buffer[(23, 2)].bg, Color::White);
    }

    #[test]
    fn tiny_terminal_does_not_panic() {
        let grid = LightGrid::new(64);
        let mut terminal = Terminal::new(TestBackend::new(4, 2)).unwrap();
        terminal
            .draw(|f| draw(f, &grid, &status(), RenderState::Help))
            .unwrap();
    }
}
