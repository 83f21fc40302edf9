use std::time::Duration;

use log::warn;

use crate::TrackLapseError;

use super::{DEFAULT_FRAMES_PER_SECOND, DEFAULT_SPEED_MULTIPLIER};

/// Simulated playback position.
///
/// The clock is advanced by a fixed step per tick (`speed / fps` simulated
/// seconds), never by measured wall time, so a replay is deterministic for a
/// given number of ticks. `elapsed_seconds` always stays in
/// `[0, max_duration_seconds]`.
#[derive(Clone, Debug)]
pub struct PlaybackClock {
    elapsed_seconds: f64,
    speed_multiplier: f64,
    frames_per_second: u32,
    max_duration_seconds: f64,
    running: bool,
}

impl Default for PlaybackClock {
    fn default() -> Self {
        Self {
            elapsed_seconds: 0.,
            speed_multiplier: DEFAULT_SPEED_MULTIPLIER,
            frames_per_second: DEFAULT_FRAMES_PER_SECOND,
            max_duration_seconds: 0.,
            running: false,
        }
    }
}

impl PlaybackClock {
    pub fn new(frames_per_second: u32, speed_multiplier: f64) -> Result<Self, TrackLapseError> {
        let mut clock = Self::default();
        clock.set_frame_rate(frames_per_second)?;
        clock.set_speed(speed_multiplier)?;
        Ok(clock)
    }

    pub fn elapsed_seconds(&self) -> f64 {
        self.elapsed_seconds
    }

    pub fn speed_multiplier(&self) -> f64 {
        self.speed_multiplier
    }

    pub fn frames_per_second(&self) -> u32 {
        self.frames_per_second
    }

    pub fn max_duration_seconds(&self) -> f64 {
        self.max_duration_seconds
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn is_at_end(&self) -> bool {
        self.elapsed_seconds >= self.max_duration_seconds
    }

    /// Wall time between two ticks.
    pub fn frame_interval(&self) -> Duration {
        Duration::from_secs_f64(1. / self.frames_per_second as f64)
    }

    /// Position as a fraction of the longest track, 0 when nothing is loaded.
    pub fn fraction(&self) -> f64 {
        if self.max_duration_seconds > 0. {
            self.elapsed_seconds / self.max_duration_seconds
        } else {
            0.
        }
    }

    /// Sets the end of the timeline, clamping the current position into it.
    pub fn set_max_duration(&mut self, max_duration_seconds: f64) {
        self.max_duration_seconds = if max_duration_seconds.is_finite() {
            max_duration_seconds.max(0.)
        } else {
            0.
        };
        self.elapsed_seconds = self.elapsed_seconds.min(self.max_duration_seconds);
    }

    pub fn reset(&mut self) {
        self.elapsed_seconds = 0.;
    }

    /// Jumps to `fraction` of the timeline. Fractions outside `[0, 1]` are clamped.
    pub fn seek(&mut self, fraction: f64) {
        let fraction = match clamp_fraction(fraction) {
            Ok(f) => f,
            Err(e) => {
                warn!("{}, clamping", e);
                if fraction > 1. { 1. } else { 0. }
            }
        };
        self.elapsed_seconds = fraction * self.max_duration_seconds;
    }

    /// Changes the speed of subsequent ticks.
    pub fn set_speed(&mut self, multiplier: f64) -> Result<(), TrackLapseError> {
        if !multiplier.is_finite() || multiplier <= 0. {
            return Err(TrackLapseError::InvalidSpeed { multiplier });
        }
        self.speed_multiplier = multiplier;
        Ok(())
    }

    pub fn set_frame_rate(&mut self, frames_per_second: u32) -> Result<(), TrackLapseError> {
        if frames_per_second == 0 {
            return Err(TrackLapseError::InvalidFrameRate { frames_per_second });
        }
        self.frames_per_second = frames_per_second;
        Ok(())
    }

    pub fn play(&mut self) {
        self.running = true;
    }

    pub fn pause(&mut self) {
        self.running = false;
    }

    /// Advances by one frame interval. Returns the new elapsed time.
    pub fn tick(&mut self) -> f64 {
        self.advance(1. / self.frames_per_second as f64)
    }

    /// Advances by `delta_wall_seconds` of wall time scaled by the speed, if running.
    pub fn advance(&mut self, delta_wall_seconds: f64) -> f64 {
        if self.running && delta_wall_seconds > 0. {
            let remaining = (self.max_duration_seconds - self.elapsed_seconds).max(0.);
            self.elapsed_seconds += (self.speed_multiplier * delta_wall_seconds).min(remaining);
        }
        self.elapsed_seconds
    }
}

fn clamp_fraction(fraction: f64) -> Result<f64, TrackLapseError> {
    if (0. ..=1.).contains(&fraction) {
        Ok(fraction)
    } else {
        Err(TrackLapseError::ClockOutOfRange { fraction })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn clock_with(max: f64, speed: f64, fps: u32) -> PlaybackClock {
        let mut clock = PlaybackClock::new(fps, speed).unwrap();
        clock.set_max_duration(max);
        clock
    }

    #[test]
    fn test_tick_advances_fixed_step() {
        let mut clock = clock_with(1000., 120., 15);
        clock.play();
        assert_eq!(clock.tick(), 8.);
        assert_eq!(clock.tick(), 16.);
    }

    #[test]
    fn test_tick_does_nothing_when_paused() {
        let mut clock = clock_with(1000., 120., 15);
        assert_eq!(clock.tick(), 0.);
        clock.play();
        clock.tick();
        clock.pause();
        clock.pause();
        assert_eq!(clock.tick(), 8.);
    }

    #[test]
    fn test_tick_stops_at_max_duration() {
        let mut clock = clock_with(10., 120., 15);
        clock.play();
        assert_eq!(clock.tick(), 8.);
        assert_eq!(clock.tick(), 10.);
        assert_eq!(clock.tick(), 10.);
        assert!(clock.is_at_end());
    }

    #[test]
    fn test_seek_scales_to_max_duration() {
        let mut clock = clock_with(30., 120., 15);
        clock.seek(0.5);
        assert_eq!(clock.elapsed_seconds(), 15.);
        assert_eq!(clock.fraction(), 0.5);
    }

    #[test]
    fn test_seek_clamps_out_of_range() {
        let mut clock = clock_with(30., 120., 15);
        clock.seek(1.5);
        assert_eq!(clock.elapsed_seconds(), 30.);
        clock.seek(-0.5);
        assert_eq!(clock.elapsed_seconds(), 0.);
        clock.seek(f64::NAN);
        assert_eq!(clock.elapsed_seconds(), 0.);
    }

    #[test]
    fn test_seek_with_zero_duration() {
        let mut clock = clock_with(0., 120., 15);
        clock.seek(0.7);
        assert_eq!(clock.elapsed_seconds(), 0.);
        assert_eq!(clock.fraction(), 0.);
    }

    #[test]
    fn test_invalid_speed_rejected() {
        let mut clock = clock_with(30., 60., 15);
        assert!(matches!(
            clock.set_speed(0.),
            Err(TrackLapseError::InvalidSpeed { .. })
        ));
        assert!(clock.set_speed(-2.).is_err());
        assert!(clock.set_speed(f64::INFINITY).is_err());
        assert_eq!(clock.speed_multiplier(), 60.);
    }

    #[test]
    fn test_speed_change_keeps_elapsed() {
        let mut clock = clock_with(1000., 15., 15);
        clock.play();
        clock.tick();
        clock.set_speed(150.).unwrap();
        assert_eq!(clock.elapsed_seconds(), 1.);
        assert_eq!(clock.tick(), 11.);
    }

    #[test]
    fn test_zero_frame_rate_rejected() {
        assert!(matches!(
            PlaybackClock::new(0, 120.),
            Err(TrackLapseError::InvalidFrameRate { .. })
        ));
    }

    #[test]
    fn test_shrinking_max_duration_clamps_elapsed() {
        let mut clock = clock_with(100., 120., 15);
        clock.seek(1.);
        clock.set_max_duration(40.);
        assert_eq!(clock.elapsed_seconds(), 40.);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn prop_elapsed_stays_in_range(
            max in 0.0f64..5000.0,
            speed in 0.1f64..4000.0,
            fps in 1u32..60,
            ticks in 0usize..200,
            seek in -1.0f64..2.0,
        ) {
            let mut clock = clock_with(max, speed, fps);
            clock.seek(seek);
            clock.play();
            for _ in 0..ticks {
                let elapsed = clock.tick();
                prop_assert!(elapsed >= 0.);
                prop_assert!(elapsed <= max);
            }
        }

        #[test]
        fn prop_reset_then_seek_zero_is_idempotent(repeats in 1usize..10, start in 0.0f64..1.0) {
            let mut clock = clock_with(100., 120., 15);
            clock.seek(start);
            for _ in 0..repeats {
                clock.reset();
                clock.seek(0.);
            }
            prop_assert_eq!(clock.elapsed_seconds(), 0.);
        }
    }
}
