//! Terminal rendering of the per-band beat lights.
//!
//! Provides the light grid state, rate meters, and the ratatui layout.

pub mod lights;
pub mod rate;
pub mod ui;
