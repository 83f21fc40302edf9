pub mod clock;
pub mod controller;
pub mod renderer;

pub use clock::PlaybackClock;
pub use controller::{InstallOutcome, PlaybackController, PlaybackState, TickReport};
pub use renderer::{IncrementalRenderer, LiveTrack, RenderOutcome};

pub const DEFAULT_FRAMES_PER_SECOND: u32 = 15;
pub const DEFAULT_SPEED_MULTIPLIER: f64 = 120.;

/// Speed choices offered by the viewer, in simulated seconds per wall second.
pub const SPEED_PRESETS: [f64; 8] = [1., 10., 30., 60., 120., 300., 600., 3600.];

/// Formats a playback position as `H h M m S s`, e.g. `1 h 2 m 5 s`.
pub fn format_elapsed(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0. {
        seconds.floor() as u64
    } else {
        0
    };
    format!(
        "{} h {} m {} s",
        total / 3600,
        (total % 3600) / 60,
        total % 60
    )
}

/// Label of a speed multiplier in the speed selector.
pub fn speed_label(multiplier: f64) -> String {
    format!("{}x", multiplier)
}
