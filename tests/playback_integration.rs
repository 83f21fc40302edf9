// Integration tests for loading sample track logs and replaying them
//
// Covers the whole path a viewer takes:
// 1. Decode the files in track_samples/ through the loading barrier
// 2. Install the batch into a playback controller
// 3. Tick, seek and reset while checking what the surface shows

use std::path::PathBuf;
use std::time::Duration;

use tracklapse::{
    AppConfig, MemorySurface, PlaybackController, PlaybackState, TrackLapseError, TrackSource,
    load_blocking,
    playback::InstallOutcome,
};

const HARBOUR_WALK: &str = "track_samples/harbour_walk.gpx";
const RIDGE_RUN: &str = "track_samples/ridge_run.gpx";
const MISSING_TIME: &str = "track_samples/missing_time.gpx";

fn sources(paths: &[&str]) -> Vec<TrackSource> {
    paths
        .iter()
        .map(|p| TrackSource::Path(PathBuf::from(p)))
        .collect()
}

fn controller() -> PlaybackController<MemorySurface> {
    PlaybackController::from_config(MemorySurface::new(), &AppConfig::default())
        .expect("default config is valid")
}

fn load_into(
    controller: &mut PlaybackController<MemorySurface>,
    paths: &[&str],
) -> InstallOutcome {
    let generation = controller.begin_load(paths.len()).unwrap();
    let batch = load_blocking(generation, sources(paths), Duration::from_secs(10)).unwrap();
    controller.install_batch(batch)
}

/// Number of vertices currently drawn for the `index`-th live track
fn shown(controller: &PlaybackController<MemorySurface>, index: usize) -> usize {
    let handle = controller.tracks()[index]
        .drawable()
        .expect("track should have a drawable");
    controller.surface().line(handle).unwrap().vertices.len()
}

#[test]
fn test_sample_files_decode() {
    let batch = load_blocking(
        1,
        sources(&[HARBOUR_WALK, RIDGE_RUN, MISSING_TIME]),
        Duration::from_secs(10),
    )
    .unwrap();

    assert_eq!(batch.tracks.len(), 2);
    assert_eq!(batch.tracks[0].name(), "harbour_walk.gpx");
    assert_eq!(batch.tracks[0].len(), 4);
    assert_eq!(batch.tracks[0].duration_seconds(), 15.);
    // two segments, offsets in +01:00
    assert_eq!(batch.tracks[1].len(), 6);
    assert_eq!(batch.tracks[1].duration_seconds(), 30.);

    assert_eq!(batch.failures.len(), 1);
    assert_eq!(batch.failures[0].name, "missing_time.gpx");
    assert!(matches!(
        batch.failures[0].error,
        TrackLapseError::Decode { .. }
    ));

    let bounds = batch.bounds().unwrap();
    assert_eq!(bounds.min_lat, 50.3697);
    assert_eq!(bounds.max_lat, 50.3744);
}

#[test]
fn test_partial_prefix_at_seven_seconds() {
    let mut controller = controller();
    load_into(&mut controller, &[HARBOUR_WALK, RIDGE_RUN]);
    controller.pause();

    controller.seek(7. / 30.);
    assert_eq!(controller.clock().elapsed_seconds(), 7.);
    controller.tick();

    // samples at 0 and 5 seconds are visible, 10 is not
    assert_eq!(controller.tracks()[0].render_cursor(), 1);
    assert_eq!(shown(&controller, 0), 2);
    // samples at 0 and 6 seconds
    assert_eq!(shown(&controller, 1), 2);
}

#[test]
fn test_plays_to_the_end_and_stops() {
    let mut controller = controller();
    match load_into(&mut controller, &[HARBOUR_WALK, RIDGE_RUN]) {
        InstallOutcome::Installed { tracks, failures } => {
            assert_eq!(tracks, 2);
            assert!(failures.is_empty());
        }
        other => panic!("Expected Installed, got {:?}", other),
    }
    assert_eq!(controller.state(), PlaybackState::Playing);

    let mut elapsed = Vec::new();
    loop {
        let report = controller.tick();
        elapsed.push(report.elapsed_seconds);
        if report.finished {
            break;
        }
        assert!(elapsed.len() < 100, "playback never finished");
    }

    // 120x at 15 fps is 8 simulated seconds per tick
    assert_eq!(elapsed, vec![8., 16., 24., 30.]);
    assert_eq!(controller.state(), PlaybackState::Paused);
    assert_eq!(controller.elapsed_readout(), "0 h 0 m 30 s");
    for live in controller.tracks() {
        assert!(live.is_fully_rendered());
    }
    assert_eq!(shown(&controller, 0), 4);
    assert_eq!(shown(&controller, 1), 6);
}

#[test]
fn test_seek_back_and_reset_shrink_lines() {
    let mut controller = controller();
    load_into(&mut controller, &[HARBOUR_WALK, RIDGE_RUN]);
    controller.pause();

    controller.seek(1.);
    controller.tick();
    assert_eq!(shown(&controller, 1), 6);

    controller.seek(0.5);
    controller.tick();
    assert_eq!(shown(&controller, 0), 4);
    assert_eq!(shown(&controller, 1), 3);

    controller.reset();
    controller.reset();
    controller.tick();
    assert_eq!(shown(&controller, 0), 1);
    assert_eq!(shown(&controller, 1), 1);
}

#[test]
fn test_new_selection_replaces_tracks() {
    let mut controller = controller();
    load_into(&mut controller, &[HARBOUR_WALK, RIDGE_RUN]);
    controller.tick();
    assert_eq!(controller.surface().lines().len(), 2);

    load_into(&mut controller, &[RIDGE_RUN, HARBOUR_WALK, RIDGE_RUN]);
    assert_eq!(controller.tracks().len(), 3);
    assert_eq!(controller.surface().lines().len(), 3);
    assert_eq!(controller.clock().elapsed_seconds(), 0.);
    assert_eq!(controller.tracks()[1].track().name(), "harbour_walk.gpx");
}

#[test]
fn test_failed_selection_keeps_playing_tracks() {
    let mut controller = controller();
    load_into(&mut controller, &[HARBOUR_WALK]);
    controller.tick();

    match load_into(&mut controller, &[MISSING_TIME]) {
        InstallOutcome::NothingDecoded { failures } => {
            assert_eq!(failures[0].name, "missing_time.gpx");
        }
        other => panic!("Expected NothingDecoded, got {:?}", other),
    }
    assert_eq!(controller.tracks().len(), 1);
    assert_eq!(controller.clock().elapsed_seconds(), 8.);
    assert_eq!(controller.state(), PlaybackState::Playing);
}
