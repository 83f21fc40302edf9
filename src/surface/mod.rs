pub mod trace;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{
    TrackLapseError,
    track::{BoundingRegion, Coordinate},
};

pub use trace::{SurfaceEvent, TraceSurface};

pub const PALETTE_GREEN: [u8; 3] = [46, 160, 67];
pub const PALETTE_ORANGE: [u8; 3] = [242, 97, 63];
pub const PALETTE_MAROON: [u8; 3] = [155, 57, 34];
pub const PALETTE_BLUE: [u8; 3] = [47, 111, 186];
pub const PALETTE_PURPLE: [u8; 3] = [128, 70, 160];

/// Line colors handed out to tracks in load order.
pub const TRACK_PALETTE: [[u8; 3]; 5] = [
    PALETTE_GREEN,
    PALETTE_ORANGE,
    PALETTE_BLUE,
    PALETTE_MAROON,
    PALETTE_PURPLE,
];

/// Opaque handle of a line owned by a rendering surface.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DrawableHandle(pub u64);

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LineStyle {
    pub label: String,
    pub color: [u8; 3],
    pub width: f32,
}

impl LineStyle {
    /// Style for the `index`-th track of a batch.
    pub fn for_track(label: impl Into<String>, index: usize, width: f32) -> Self {
        Self {
            label: label.into(),
            color: TRACK_PALETTE[index % TRACK_PALETTE.len()],
            width,
        }
    }
}

/// Something that can draw polylines over a map.
///
/// The playback engine only ever talks to the map through this trait: it
/// creates one line per track, replaces that line's vertex list as the
/// replay advances, and removes it when a new batch of tracks is installed.
pub trait RenderingSurface {
    /// Adds an empty line to the surface.
    ///
    /// # Errors
    ///
    /// Returns an error if the surface cannot allocate the drawable. The
    /// caller treats that as fatal for the one track only.
    fn create_line(&mut self, style: &LineStyle) -> Result<DrawableHandle, TrackLapseError>;

    /// Replaces the full vertex list of a line.
    fn set_vertices(
        &mut self,
        handle: DrawableHandle,
        vertices: &[Coordinate],
    ) -> Result<(), TrackLapseError>;

    /// Removes a line from the surface.
    fn remove_line(&mut self, handle: DrawableHandle) -> Result<(), TrackLapseError>;

    /// Moves the view so that `region` is visible.
    fn fit_view_to(&mut self, region: &BoundingRegion);
}

#[derive(Clone, Debug, PartialEq)]
pub struct SurfaceLine {
    pub style: LineStyle,
    pub vertices: Vec<Coordinate>,
}

/// Rendering surface that keeps lines in memory and counts vertex updates.
///
/// Used by the headless replay and as the reference surface in tests.
#[derive(Debug, Default)]
pub struct MemorySurface {
    lines: BTreeMap<DrawableHandle, SurfaceLine>,
    next_handle: u64,
    set_vertices_calls: usize,
    view: Option<BoundingRegion>,
}

impl MemorySurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> &BTreeMap<DrawableHandle, SurfaceLine> {
        &self.lines
    }

    pub fn line(&self, handle: DrawableHandle) -> Option<&SurfaceLine> {
        self.lines.get(&handle)
    }

    pub fn set_vertices_calls(&self) -> usize {
        self.set_vertices_calls
    }

    pub fn view(&self) -> Option<&BoundingRegion> {
        self.view.as_ref()
    }
}

impl RenderingSurface for MemorySurface {
    fn create_line(&mut self, style: &LineStyle) -> Result<DrawableHandle, TrackLapseError> {
        let handle = DrawableHandle(self.next_handle);
        self.next_handle += 1;
        self.lines.insert(
            handle,
            SurfaceLine {
                style: style.clone(),
                vertices: Vec::new(),
            },
        );
        Ok(handle)
    }

    fn set_vertices(
        &mut self,
        handle: DrawableHandle,
        vertices: &[Coordinate],
    ) -> Result<(), TrackLapseError> {
        let line = self
            .lines
            .get_mut(&handle)
            .ok_or_else(|| TrackLapseError::RenderingSurface {
                description: format!("unknown line {:?}", handle),
            })?;
        line.vertices = vertices.to_vec();
        self.set_vertices_calls += 1;
        Ok(())
    }

    fn remove_line(&mut self, handle: DrawableHandle) -> Result<(), TrackLapseError> {
        self.lines
            .remove(&handle)
            .map(|_| ())
            .ok_or_else(|| TrackLapseError::RenderingSurface {
                description: format!("unknown line {:?}", handle),
            })
    }

    fn fit_view_to(&mut self, region: &BoundingRegion) {
        self.view = Some(*region);
    }
}
