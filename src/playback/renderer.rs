use log::{debug, error, warn};

use crate::{
    TrackLapseError,
    surface::{DrawableHandle, LineStyle, RenderingSurface},
    track::{Simplifier, Track, last_sample_at_or_before},
};

/// What a render pass did for one track.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RenderOutcome {
    /// The whole track is already drawn and the clock is past its end.
    Finished,
    /// The visible prefix did not change, nothing was pushed.
    Unchanged,
    /// The prefix grew and was pushed to the surface.
    Advanced { from: usize, to: usize },
    /// The clock moved backwards and the prefix was truncated.
    Rewound { from: usize, to: usize },
    /// The track has no drawable, either because creating it failed or an
    /// earlier update failed.
    Detached,
    /// Pushing vertices failed during this pass; the track is now detached.
    Failed,
}

impl RenderOutcome {
    pub fn redrew(&self) -> bool {
        matches!(self, Self::Advanced { .. } | Self::Rewound { .. })
    }
}

/// A track installed in the controller together with its replay bookkeeping.
///
/// The surface shows exactly `samples[0..=render_cursor]` (possibly
/// simplified) for as long as the track has a drawable.
#[derive(Debug)]
pub struct LiveTrack {
    track: Track,
    style: LineStyle,
    render_cursor: usize,
    last_rendered_time: f64,
    drawable: Option<DrawableHandle>,
}

impl LiveTrack {
    pub fn track(&self) -> &Track {
        &self.track
    }

    /// Index of the last sample currently shown.
    pub fn render_cursor(&self) -> usize {
        self.render_cursor
    }

    pub fn last_rendered_time(&self) -> f64 {
        self.last_rendered_time
    }

    pub fn drawable(&self) -> Option<DrawableHandle> {
        self.drawable
    }

    pub fn is_fully_rendered(&self) -> bool {
        self.render_cursor + 1 == self.track.len()
    }

    /// Removes the drawable from the surface. The track stays detached afterwards.
    pub(crate) fn detach<S: RenderingSurface + ?Sized>(&mut self, surface: &mut S) {
        if let Some(handle) = self.drawable.take() {
            if let Err(e) = surface.remove_line(handle) {
                warn!("Could not remove line of track {}: {}", self.track.name(), e);
            }
        }
    }
}

/// Maps the clock position to the visible prefix of each track and pushes
/// changes to the rendering surface.
#[derive(Clone, Debug, Default)]
pub struct IncrementalRenderer {
    simplifier: Option<Simplifier>,
}

impl IncrementalRenderer {
    pub fn new(simplifier: Option<Simplifier>) -> Self {
        Self { simplifier }
    }

    /// Creates the drawable of `track` and shows the prefix visible at `t = 0`.
    ///
    /// A surface failure does not fail the attach: the track is kept, detached,
    /// so the rest of the batch can still play.
    pub fn attach<S: RenderingSurface + ?Sized>(
        &self,
        track: Track,
        style: LineStyle,
        surface: &mut S,
    ) -> LiveTrack {
        // the first sample is always at t = 0
        let initial = last_sample_at_or_before(track.samples(), 0.).unwrap_or(0);
        let mut live = LiveTrack {
            last_rendered_time: track.samples()[initial].timestamp_seconds,
            render_cursor: initial,
            drawable: None,
            style,
            track,
        };

        match surface.create_line(&live.style) {
            Ok(handle) => {
                live.drawable = Some(handle);
                if let Err(e) = self.push_prefix(&live, initial, surface) {
                    error!(
                        "Could not draw track {}, it will not be shown: {}",
                        live.track.name(),
                        e
                    );
                    live.detach(surface);
                }
            }
            Err(e) => {
                error!(
                    "Could not create a line for track {}, it will not be shown: {}",
                    live.track.name(),
                    e
                );
            }
        }
        live
    }

    /// Brings one track up to date with `elapsed_seconds`.
    pub fn render<S: RenderingSurface + ?Sized>(
        &self,
        live: &mut LiveTrack,
        elapsed_seconds: f64,
        surface: &mut S,
    ) -> RenderOutcome {
        if live.drawable.is_none() {
            return RenderOutcome::Detached;
        }
        if live.last_rendered_time == live.track.duration_seconds()
            && elapsed_seconds >= live.last_rendered_time
        {
            return RenderOutcome::Finished;
        }

        // only a negative time can precede the first sample
        let cursor = last_sample_at_or_before(live.track.samples(), elapsed_seconds).unwrap_or(0);
        let previous = live.render_cursor;
        if cursor == previous {
            return RenderOutcome::Unchanged;
        }

        if let Err(e) = self.push_prefix(live, cursor, surface) {
            error!(
                "Could not update track {}, it will no longer be shown: {}",
                live.track.name(),
                e
            );
            live.detach(surface);
            return RenderOutcome::Failed;
        }

        live.render_cursor = cursor;
        live.last_rendered_time = live.track.samples()[cursor].timestamp_seconds;
        debug!(
            "Track {}: cursor {} -> {} at {:.1}s",
            live.track.name(),
            previous,
            cursor,
            elapsed_seconds
        );

        if cursor > previous {
            RenderOutcome::Advanced {
                from: previous,
                to: cursor,
            }
        } else {
            RenderOutcome::Rewound {
                from: previous,
                to: cursor,
            }
        }
    }

    /// Full replacement of the drawable's vertex list with `samples[0..=last]`.
    fn push_prefix<S: RenderingSurface + ?Sized>(
        &self,
        live: &LiveTrack,
        last: usize,
        surface: &mut S,
    ) -> Result<(), TrackLapseError> {
        let Some(handle) = live.drawable else {
            return Ok(());
        };
        let prefix = live.track.prefix_coordinates(last);
        match &self.simplifier {
            Some(simplifier) => surface.set_vertices(handle, &simplifier.simplify(&prefix)),
            None => surface.set_vertices(handle, &prefix),
        }
    }
}
