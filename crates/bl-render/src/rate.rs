use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Compteur d'événements par seconde sur une fenêtre glissante.
///
/// Sert pour les FPS du rendu et pour les beats/s de la barre d'état.
///
/// # Example
/// ```
/// use bl_render::rate::RateMeter;
/// use std::time::Duration;
/// let mut meter = RateMeter::new(Duration::from_secs(1));
/// meter.tick();
/// assert!(meter.rate() >= 0.0);
/// ```
pub struct RateMeter {
    /// Horodatages dans la fenêtre, du plus ancien au plus récent.
    timestamps: VecDeque<Instant>,
    span: Duration,
}

impl RateMeter {
    #[must_use]
    pub fn new(span: Duration) -> Self {
        Self {
            timestamps: VecDeque::new(),
            span,
        }
    }

    /// Compter un événement maintenant.
    pub fn tick(&mut self) {
        self.tick_at(Instant::now());
    }

    /// Compter un événement à `at` (horodatages croissants).
    pub fn tick_at(&mut self, at: Instant) {
        self.timestamps.push_back(at);
        self.expire(at);
    }

    /// Oublier les événements sortis de la fenêtre à `now`.
    pub fn expire(&mut self, now: Instant) {
        while let Some(&first) = self.timestamps.front() {
            if now.saturating_duration_since(first) > self.span {
                self.timestamps.pop_front();
            } else {
                break;
            }
        }
    }

    /// Événements par seconde sur la fenêtre.
    #[must_use]
    pub fn rate(&self) -> f64 {
        let secs = self.span.as_secs_f64();
        if secs > 0.0 {
            self.timestamps.len() as f64 / secs
        } else {
            0.0
        }
    }

    pub fn clear(&mut self) {
        self.timestamps.clear();
    }
}
