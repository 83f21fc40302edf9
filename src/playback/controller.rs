use log::{info, warn};

use crate::{
    TrackLapseError,
    config::AppConfig,
    loader::{DecodeFailure, LoadedBatch},
    surface::{LineStyle, RenderingSurface},
    track::{BoundingRegion, Simplifier, Track},
};

use super::{IncrementalRenderer, LiveTrack, PlaybackClock, format_elapsed};

const DEFAULT_LINE_WIDTH: f32 = 2.;

/// Where the controller is in its lifecycle.
///
/// `Loading` wins over the other states: while a selection is decoding the
/// previously installed batch (if any) keeps its own play/pause state and
/// keeps ticking.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlaybackState {
    Idle,
    Loading,
    Paused,
    Playing,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TickReport {
    pub elapsed_seconds: f64,
    /// Tracks whose drawable was updated during this tick.
    pub redrawn: usize,
    /// Playback reached the end of the longest track during this tick.
    pub finished: bool,
}

#[derive(Debug)]
pub enum InstallOutcome {
    /// The batch replaced the previous tracks and playback restarted from 0.
    Installed {
        tracks: usize,
        failures: Vec<DecodeFailure>,
    },
    /// A newer selection was made while this batch was loading; it was dropped.
    Superseded { generation: u64 },
    /// No file of the batch decoded; the previous tracks are still installed.
    NothingDecoded { failures: Vec<DecodeFailure> },
}

/// Owns the live tracks, their drawables and the clock, and drives one
/// render pass per tick.
pub struct PlaybackController<S: RenderingSurface> {
    surface: S,
    clock: PlaybackClock,
    renderer: IncrementalRenderer,
    tracks: Vec<LiveTrack>,
    line_width: f32,
    autoplay: bool,
    last_generation: u64,
    pending_generation: Option<u64>,
}

impl<S: RenderingSurface> PlaybackController<S> {
    pub fn new(surface: S, clock: PlaybackClock, renderer: IncrementalRenderer) -> Self {
        Self {
            surface,
            clock,
            renderer,
            tracks: Vec::new(),
            line_width: DEFAULT_LINE_WIDTH,
            autoplay: true,
            last_generation: 0,
            pending_generation: None,
        }
    }

    pub fn from_config(surface: S, config: &AppConfig) -> Result<Self, TrackLapseError> {
        let clock = PlaybackClock::new(config.frames_per_second, config.speed_multiplier)?;
        let renderer =
            IncrementalRenderer::new(config.simplify_tolerance_m.and_then(Simplifier::new));
        let mut controller = Self::new(surface, clock, renderer);
        controller.line_width = config.line_width;
        controller.autoplay = config.autoplay;
        Ok(controller)
    }

    pub fn state(&self) -> PlaybackState {
        if self.pending_generation.is_some() {
            PlaybackState::Loading
        } else if self.tracks.is_empty() {
            PlaybackState::Idle
        } else if self.clock.is_running() {
            PlaybackState::Playing
        } else {
            PlaybackState::Paused
        }
    }

    pub fn clock(&self) -> &PlaybackClock {
        &self.clock
    }

    pub fn tracks(&self) -> &[LiveTrack] {
        &self.tracks
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn into_surface(self) -> S {
        self.surface
    }

    pub fn set_autoplay(&mut self, autoplay: bool) {
        self.autoplay = autoplay;
    }

    /// Current position formatted for display.
    pub fn elapsed_readout(&self) -> String {
        format_elapsed(self.clock.elapsed_seconds())
    }

    /// Registers a new file selection and returns the generation its batch
    /// must carry to be installed. Any selection still loading is superseded.
    /// The current tracks stay drawn and keep playing until the batch is installed.
    pub fn begin_load(&mut self, file_count: usize) -> Result<u64, TrackLapseError> {
        if file_count == 0 {
            return Err(TrackLapseError::EmptySelection);
        }
        if let Some(previous) = self.pending_generation {
            info!("Selection {} superseded before it finished loading", previous);
        }
        self.last_generation += 1;
        self.pending_generation = Some(self.last_generation);
        info!(
            "Loading {} track files as batch {}",
            file_count, self.last_generation
        );
        Ok(self.last_generation)
    }

    /// Gives up waiting for the pending selection; its batch will be ignored.
    pub fn abandon_load(&mut self) -> Option<u64> {
        let abandoned = self.pending_generation.take();
        if let Some(generation) = abandoned {
            warn!("Abandoned loading of batch {}", generation);
        }
        abandoned
    }

    /// Installs a finished batch if it belongs to the latest selection.
    pub fn install_batch(&mut self, batch: LoadedBatch) -> InstallOutcome {
        if self.pending_generation != Some(batch.generation) {
            warn!(
                "Dropping batch {}, it is not the pending selection",
                batch.generation
            );
            return InstallOutcome::Superseded {
                generation: batch.generation,
            };
        }
        self.pending_generation = None;

        if batch.tracks.is_empty() {
            warn!(
                "No track of batch {} could be decoded, keeping the current tracks",
                batch.generation
            );
            return InstallOutcome::NothingDecoded {
                failures: batch.failures,
            };
        }

        let tracks = batch.tracks.len();
        self.install_tracks(batch.tracks);
        InstallOutcome::Installed {
            tracks,
            failures: batch.failures,
        }
    }

    /// Swaps in a new set of tracks: removes every old drawable, creates one
    /// line per new track, fits the view and restarts the clock from 0.
    pub fn install_tracks(&mut self, tracks: Vec<Track>) {
        for mut live in self.tracks.drain(..) {
            live.detach(&mut self.surface);
        }

        let max_duration = tracks
            .iter()
            .map(Track::duration_seconds)
            .fold(0., f64::max);
        let bounds = BoundingRegion::from_tracks(&tracks);

        self.tracks = tracks
            .into_iter()
            .enumerate()
            .map(|(index, track)| {
                let style = LineStyle::for_track(track.name(), index, self.line_width);
                self.renderer.attach(track, style, &mut self.surface)
            })
            .collect();

        self.clock.pause();
        self.clock.reset();
        self.clock.set_max_duration(max_duration);
        if let Some(region) = bounds {
            self.surface.fit_view_to(&region);
        }
        info!(
            "Installed {} tracks, longest is {}",
            self.tracks.len(),
            format_elapsed(max_duration)
        );

        if self.autoplay {
            self.clock.play();
        }
    }

    /// Starts or resumes playback. At the end of the timeline it starts over.
    pub fn play(&mut self) {
        if self.tracks.is_empty() {
            return;
        }
        if self.clock.is_at_end() {
            self.clock.reset();
        }
        self.clock.play();
    }

    pub fn pause(&mut self) {
        self.clock.pause();
    }

    pub fn toggle_play(&mut self) {
        if self.clock.is_running() {
            self.pause();
        } else {
            self.play();
        }
    }

    /// Rewinds to 0. Drawables shrink on the next tick.
    pub fn reset(&mut self) {
        self.clock.reset();
    }

    pub fn seek(&mut self, fraction: f64) {
        self.clock.seek(fraction);
    }

    pub fn set_speed(&mut self, multiplier: f64) -> Result<(), TrackLapseError> {
        self.clock.set_speed(multiplier)
    }

    /// One frame: advances the clock if playing, then brings every track up
    /// to date. A failing track never stops the others from rendering.
    pub fn tick(&mut self) -> TickReport {
        let elapsed_seconds = self.clock.tick();

        let mut redrawn = 0;
        for live in self.tracks.iter_mut() {
            if self
                .renderer
                .render(live, elapsed_seconds, &mut self.surface)
                .redrew()
            {
                redrawn += 1;
            }
        }

        let finished = self.clock.is_running() && self.clock.is_at_end();
        if finished {
            self.clock.pause();
            info!("Playback finished at {}", format_elapsed(elapsed_seconds));
        }

        TickReport {
            elapsed_seconds,
            redrawn,
            finished,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::MemorySurface;
    use crate::track::{Coordinate, Sample};
    use proptest::prelude::*;

    fn track(name: &str, times: &[f64]) -> Track {
        Track::new(
            name,
            times
                .iter()
                .enumerate()
                .map(|(i, t)| Sample {
                    timestamp_seconds: *t,
                    coordinate: Coordinate::new(10. + i as f64, 20. + i as f64),
                })
                .collect(),
        )
        .unwrap()
    }

    fn controller() -> PlaybackController<MemorySurface> {
        PlaybackController::new(
            MemorySurface::new(),
            PlaybackClock::new(15, 120.).unwrap(),
            IncrementalRenderer::default(),
        )
    }

    fn batch(generation: u64, tracks: Vec<Track>) -> LoadedBatch {
        LoadedBatch {
            generation,
            tracks,
            failures: Vec::new(),
        }
    }

    fn shown_len(controller: &PlaybackController<MemorySurface>, index: usize) -> usize {
        let handle = controller.tracks()[index].drawable().unwrap();
        controller.surface().line(handle).unwrap().vertices.len()
    }

    #[test]
    fn test_lifecycle_states() {
        let mut controller = controller();
        controller.set_autoplay(false);
        assert_eq!(controller.state(), PlaybackState::Idle);

        // nothing to play yet
        controller.play();
        assert_eq!(controller.state(), PlaybackState::Idle);

        let generation = controller.begin_load(1).unwrap();
        assert_eq!(controller.state(), PlaybackState::Loading);

        controller.install_batch(batch(generation, vec![track("a", &[0., 10.])]));
        assert_eq!(controller.state(), PlaybackState::Paused);

        controller.play();
        assert_eq!(controller.state(), PlaybackState::Playing);
        controller.pause();
        assert_eq!(controller.state(), PlaybackState::Paused);
    }

    #[test]
    fn test_empty_selection_is_a_no_op() {
        let mut controller = controller();
        assert!(matches!(
            controller.begin_load(0),
            Err(TrackLapseError::EmptySelection)
        ));
        assert_eq!(controller.state(), PlaybackState::Idle);
    }

    #[test]
    fn test_seek_to_middle_of_two_tracks() {
        let mut controller = controller();
        controller.install_tracks(vec![
            track("a", &[0., 5., 10., 15., 20.]),
            track("b", &[0., 6., 12., 18., 24., 30.]),
        ]);
        assert_eq!(controller.clock().max_duration_seconds(), 30.);

        controller.pause();
        controller.seek(0.5);
        assert_eq!(controller.clock().elapsed_seconds(), 15.);
        controller.tick();

        assert_eq!(controller.tracks()[0].render_cursor(), 3);
        assert_eq!(controller.tracks()[1].render_cursor(), 2);
        assert_eq!(shown_len(&controller, 0), 4);
        assert_eq!(shown_len(&controller, 1), 3);
    }

    #[test]
    fn test_full_reveal_at_end() {
        let mut controller = controller();
        controller.install_tracks(vec![
            track("short", &[0., 3., 4.]),
            track("long", &[0., 50., 100.]),
        ]);
        controller.seek(1.);
        controller.tick();
        for live in controller.tracks() {
            assert!(live.is_fully_rendered());
        }
    }

    #[test]
    fn test_playback_stops_at_end() {
        let mut controller = controller();
        controller.install_tracks(vec![track("a", &[0., 10., 20.])]);
        assert_eq!(controller.state(), PlaybackState::Playing);

        // 8 simulated seconds per tick
        let reports: Vec<TickReport> = (0..4).map(|_| controller.tick()).collect();
        assert_eq!(reports[0].elapsed_seconds, 8.);
        assert!(!reports[1].finished);
        assert!(reports[2].finished);
        assert_eq!(reports[2].elapsed_seconds, 20.);
        assert_eq!(controller.state(), PlaybackState::Paused);
        assert_eq!(reports[3].elapsed_seconds, 20.);
        assert_eq!(reports[3].redrawn, 0);

        // playing again starts over
        controller.play();
        assert_eq!(controller.clock().elapsed_seconds(), 0.);
        assert_eq!(controller.state(), PlaybackState::Playing);
    }

    #[test]
    fn test_reset_shrinks_lines() {
        let mut controller = controller();
        controller.install_tracks(vec![track("a", &[0., 10., 20.])]);
        controller.seek(1.);
        controller.tick();
        assert_eq!(shown_len(&controller, 0), 3);

        controller.reset();
        controller.tick();
        assert_eq!(controller.tracks()[0].render_cursor(), 0);
        assert_eq!(shown_len(&controller, 0), 1);
    }

    #[test]
    fn test_new_batch_replaces_old_drawables() {
        let mut controller = controller();
        let first = controller.begin_load(2).unwrap();
        controller.install_batch(batch(
            first,
            vec![track("a", &[0., 100.]), track("b", &[0., 200.])],
        ));
        for _ in 0..2 {
            controller.tick();
        }
        let old_handles: Vec<_> = controller
            .tracks()
            .iter()
            .filter_map(LiveTrack::drawable)
            .collect();

        let second = controller.begin_load(3).unwrap();
        // the old batch keeps playing while the new one loads
        assert_eq!(controller.state(), PlaybackState::Loading);
        assert_eq!(controller.tick().elapsed_seconds, 24.);
        assert_eq!(controller.surface().lines().len(), 2);

        let outcome = controller.install_batch(batch(
            second,
            vec![
                track("c", &[0., 1.]),
                track("d", &[0., 2.]),
                track("e", &[0., 3.]),
            ],
        ));
        assert!(matches!(outcome, InstallOutcome::Installed { tracks: 3, .. }));
        assert_eq!(controller.tracks().len(), 3);
        assert_eq!(controller.surface().lines().len(), 3);
        for handle in old_handles {
            assert!(controller.surface().line(handle).is_none());
        }
        assert_eq!(controller.clock().elapsed_seconds(), 0.);
        assert_eq!(controller.state(), PlaybackState::Playing);
    }

    #[test]
    fn test_superseded_batch_is_dropped() {
        let mut controller = controller();
        let stale = controller.begin_load(1).unwrap();
        let fresh = controller.begin_load(1).unwrap();

        let outcome = controller.install_batch(batch(stale, vec![track("old", &[0., 1.])]));
        assert!(matches!(outcome, InstallOutcome::Superseded { generation } if generation == stale));
        assert!(controller.tracks().is_empty());
        assert_eq!(controller.state(), PlaybackState::Loading);

        controller.install_batch(batch(fresh, vec![track("new", &[0., 1.])]));
        assert_eq!(controller.tracks()[0].track().name(), "new");
    }

    #[test]
    fn test_abandoned_load_keeps_current_batch() {
        let mut controller = controller();
        controller.install_tracks(vec![track("kept", &[0., 100.])]);
        let generation = controller.begin_load(1).unwrap();
        assert_eq!(controller.abandon_load(), Some(generation));
        assert_eq!(controller.state(), PlaybackState::Playing);

        let outcome = controller.install_batch(batch(generation, vec![track("late", &[0., 1.])]));
        assert!(matches!(outcome, InstallOutcome::Superseded { .. }));
        assert_eq!(controller.tracks()[0].track().name(), "kept");
    }

    #[test]
    fn test_failed_batch_keeps_current_tracks() {
        let mut controller = controller();
        controller.install_tracks(vec![track("kept", &[0., 100.])]);
        let generation = controller.begin_load(1).unwrap();
        let outcome = controller.install_batch(LoadedBatch {
            generation,
            tracks: Vec::new(),
            failures: vec![DecodeFailure {
                name: "bad.gpx".to_string(),
                error: TrackLapseError::Decode {
                    name: "bad.gpx".to_string(),
                    reason: "no track points found".to_string(),
                },
            }],
        });
        match outcome {
            InstallOutcome::NothingDecoded { failures } => assert_eq!(failures.len(), 1),
            other => panic!("Expected NothingDecoded, got {:?}", other),
        }
        assert_eq!(controller.state(), PlaybackState::Playing);
        assert_eq!(controller.surface().lines().len(), 1);
    }

    #[test]
    fn test_install_fits_view() {
        let mut controller = controller();
        controller.install_tracks(vec![track("a", &[0., 1., 2.])]);
        let view = controller.surface().view().unwrap();
        assert_eq!(view.min_lat, 10.);
        assert_eq!(view.max_lat, 12.);
    }

    #[test]
    fn test_elapsed_readout() {
        let mut controller = controller();
        controller.install_tracks(vec![track("a", &[0., 7200.])]);
        controller.seek(0.5);
        assert_eq!(controller.elapsed_readout(), "1 h 0 m 0 s");
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn prop_reset_then_seek_zero_recomputes_start(
            seek in 0.0f64..1.0,
            repeats in 1usize..5,
        ) {
            let mut controller = controller();
            controller.install_tracks(vec![
                track("a", &[0., 0., 5., 9.]),
                track("b", &[0., 30.]),
            ]);
            controller.pause();
            controller.seek(seek);
            controller.tick();

            for _ in 0..repeats {
                controller.reset();
                controller.seek(0.);
            }
            prop_assert_eq!(controller.clock().elapsed_seconds(), 0.);
            controller.tick();
            prop_assert_eq!(controller.tracks()[0].render_cursor(), 1);
            prop_assert_eq!(controller.tracks()[1].render_cursor(), 0);
        }
    }
}
