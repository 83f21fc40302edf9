use std::{
    fs::File,
    io::{BufWriter, Write},
    path::Path,
};

use serde::{Deserialize, Serialize};
use serde_jsonlines::JsonLinesWriter;

use crate::{
    TrackLapseError,
    track::{BoundingRegion, Coordinate},
};

use super::{DrawableHandle, LineStyle, RenderingSurface};

/// One operation performed on a rendering surface, as written to a trace file.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum SurfaceEvent {
    CreateLine {
        handle: DrawableHandle,
        style: LineStyle,
    },
    SetVertices {
        handle: DrawableHandle,
        vertices: Vec<Coordinate>,
    },
    RemoveLine {
        handle: DrawableHandle,
    },
    FitView {
        region: BoundingRegion,
    },
}

/// Rendering surface that draws nothing and records every operation as a JSON line.
pub struct TraceSurface<W: Write = BufWriter<File>> {
    writer: JsonLinesWriter<W>,
    next_handle: u64,
}

impl TraceSurface {
    pub fn create(path: &Path) -> Result<Self, TrackLapseError> {
        let file = File::create(path).map_err(|e| TrackLapseError::TraceWriterError { source: e })?;
        Ok(Self::new(BufWriter::new(file)))
    }
}

impl<W: Write> TraceSurface<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: JsonLinesWriter::new(writer),
            next_handle: 0,
        }
    }

    fn write(&mut self, event: &SurfaceEvent) -> Result<(), TrackLapseError> {
        self.writer
            .write(event)
            .map_err(|e| TrackLapseError::RenderingSurface {
                description: format!("could not write trace event: {}", e),
            })
    }

    pub fn flush(&mut self) -> Result<(), TrackLapseError> {
        self.writer
            .flush()
            .map_err(|e| TrackLapseError::TraceWriterError { source: e })
    }

    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }
}

impl<W: Write> RenderingSurface for TraceSurface<W> {
    fn create_line(&mut self, style: &LineStyle) -> Result<DrawableHandle, TrackLapseError> {
        let handle = DrawableHandle(self.next_handle);
        self.write(&SurfaceEvent::CreateLine {
            handle,
            style: style.clone(),
        })?;
        self.next_handle += 1;
        Ok(handle)
    }

    fn set_vertices(
        &mut self,
        handle: DrawableHandle,
        vertices: &[Coordinate],
    ) -> Result<(), TrackLapseError> {
        self.write(&SurfaceEvent::SetVertices {
            handle,
            vertices: vertices.to_vec(),
        })
    }

    fn remove_line(&mut self, handle: DrawableHandle) -> Result<(), TrackLapseError> {
        self.write(&SurfaceEvent::RemoveLine { handle })
    }

    fn fit_view_to(&mut self, region: &BoundingRegion) {
        if let Err(e) = self.write(&SurfaceEvent::FitView { region: *region }) {
            log::warn!("Dropping view change from trace: {}", e);
        }
    }
}
