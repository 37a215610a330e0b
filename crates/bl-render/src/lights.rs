use bl_core::event::{BeatEvent, BeatKind};
use ratatui::style::Color;

/// Colour of a light that is off.
pub const OFF: Color = Color::White;

/// Lit colours, from "few bands lit" to "all bands lit".
pub const PALETTE: [Color; 6] = [
    Color::Red,
    Color::Rgb(255, 165, 0),   // orange
    Color::Rgb(221, 160, 221), // plum
    Color::Rgb(128, 0, 128),   // purple
    Color::Blue,
    Color::Rgb(0, 128, 0), // green
];

/// One light per band, driven by detector decisions.
///
/// A beat lights its band with a palette colour picked from how many bands
/// are already lit; a no-beat switches it off.
///
/// # Example
/// ```
/// use bl_core::event::{BeatEvent, Decision};
/// use bl_render::lights::{LightGrid, OFF, PALETTE};
/// use std::time::Duration;
///
/// let mut grid = LightGrid::new(4);
/// grid.apply(&BeatEvent { band: 2, decision: Decision::beat(1.0), at: Duration::ZERO });
/// assert_eq!(grid.color(2), Some(PALETTE[0]));
/// assert_eq!(grid.color(0), Some(OFF));
/// ```
#[derive(Clone, Debug)]
pub struct LightGrid {
    lights: Vec<Option<Color>>,
}

impl LightGrid {
    #[must_use]
    pub fn new(band_count: usize) -> Self {
        Self {
            lights: vec![None; band_count],
        }
    }

    /// Switch every light off and resize to `band_count` bands.
    pub fn reset(&mut self, band_count: usize) {
        self.lights.clear();
        self.lights.resize(band_count, None);
    }

    /// Apply one decision. Returns `false` if the band is out of range.
    pub fn apply(&mut self, event: &BeatEvent) -> bool {
        if event.band >= self.lights.len() {
            log::debug!(
                "decision for band {} ignored ({} lights)",
                event.band,
                self.lights.len()
            );
            return false;
        }
        let color = match event.decision.kind {
            BeatKind::Beat => Some(self.next_color()),
            BeatKind::NoBeat => None,
        };
        self.lights[event.band] = color;
        true
    }

    /// Palette entry for the current number of lit bands.
    fn next_color(&self) -> Color {
        let step = (PALETTE.len() - 1) as f64 / self.lights.len() as f64;
        let index = (step * self.lit_count() as f64) as usize;
        PALETTE[index.min(PALETTE.len() - 1)]
    }

    #[must_use]
    pub fn band_count(&self) -> usize {
        self.lights.len()
    }

    #[must_use]
    pub fn lit_count(&self) -> usize {
        self.lights.iter().filter(|l| l.is_some()).count()
    }

    /// Displayed colour of band `band`, `None` if out of range.
    #[must_use]
    pub fn color(&self, band: usize) -> Option<Color> {
        self.lights.get(band).map(|l| l.unwrap_or(OFF))
    }

    /// Columns and rows of the near-square layout.
    #[must_use]
    pub fn shape(&self) -> (usize, usize) {
        let n = self.lights.len();
        if n == 0 {
            return (0, 0);
        }
        let mut cols = 1;
        while cols * cols < n {
            cols += 1;
        }
        (cols, n.div_ceil(cols))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bl_core::event::Decision;
    use std::time::Duration;

    fn beat(band: usize) -> BeatEvent {
        BeatEvent {
            band,
            decision: Decision::beat(1.0),
            at: Duration::ZERO,
        }
    }

    fn no_beat(band: usize) -> BeatEvent {
        BeatEvent {
            band,
            decision: Decision::no_beat(),
            at: Duration::ZERO,
        }
    }

    #[test]
    fn colour_follows_lit_count() {
        let mut grid = LightGrid::new(4);
        // step = 5/4 = 1.25
        for band in 0..4 {
            assert!(grid.apply(&beat(band)));
        }
        assert_eq!(grid.color(0), Some(PALETTE[0]));
        assert_eq!(grid.color(1), Some(PALETTE[1]));
        assert_eq!(grid.color(2), Some(PALETTE[2]));
        assert_eq!(grid.color(3), Some(PALETTE[3]));
        assert_eq!(grid.lit_count(), 4);

        // relit while all four are lit
        grid.apply(&beat(0));
        assert_eq!(grid.color(0), Some(PALETTE[5]));
    }

    #[test]
    fn no_beat_switches_off() {
        let mut grid = LightGrid::new(2);
        grid.apply(&beat(1));
        grid.apply(&no_beat(1));
        assert_eq!(grid.color(1), Some(OFF));
        assert_eq!(grid.lit_count(), 0);
    }

    #[test]
    fn out_of_range_band_is_ignored() {
        let mut grid = LightGrid::new(2);
        assert!(!grid.apply(&beat(2)));
        assert_eq!(grid.lit_count(), 0);
        assert_eq!(grid.color(2), None);
    }

    #[test]
    fn reset_resizes_and_clears() {
        let mut grid = LightGrid::new(4);
        grid.apply(&beat(3));
        grid.reset(16);
        assert_eq!(grid.band_count(), 16);
        assert_eq!(grid.lit_count(), 0);
        assert!(grid.apply(&beat(15)));
    }

    #[test]
    fn near_square_shape() {
        assert_eq!(LightGrid::new(0).shape(), (0, 0));
        assert_eq!(LightGrid::new(1).shape(), (1, 1));
        assert_eq!(LightGrid::new(2).shape(), (2, 1));
        assert_eq!(LightGrid::new(4).shape(), (2, 2));
        assert_eq!(LightGrid::new(8).shape(), (3, 3));
        assert_eq!(LightGrid::new(64).shape(), (8, 8));
    }
}
