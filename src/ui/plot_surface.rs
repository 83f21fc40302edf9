use std::collections::BTreeMap;

use egui::{Ui, Vec2b};
use egui_plot::{Legend, Line, PlotBounds, PlotPoints};

use tracklapse::{
    BoundingRegion, Coordinate, DrawableHandle, LineStyle, RenderingSurface, TrackLapseError,
};

use super::line_color;

// keeps single-point tracks from collapsing the view to nothing
const MIN_VIEW_SPAN_DEG: f64 = 0.002;

struct PlotLine {
    style: LineStyle,
    points: Vec<[f64; 2]>,
}

/// Rendering surface drawing every track as an `egui_plot` line, longitude
/// on the x axis and latitude on the y axis.
#[derive(Default)]
pub(crate) struct PlotSurface {
    lines: BTreeMap<DrawableHandle, PlotLine>,
    next_handle: u64,
    pending_view: Option<BoundingRegion>,
}

impl PlotSurface {
    pub(crate) fn show(&mut self, ui: &mut Ui) {
        let pending_view = self.pending_view.take();
        egui_plot::Plot::new("tracks")
            .show_background(false)
            .legend(Legend::default())
            .x_axis_label("longitude")
            .y_axis_label("latitude")
            .auto_bounds(Vec2b::new(false, false))
            .show(ui, |plot_ui| {
                if let Some(region) = pending_view {
                    plot_ui.set_plot_bounds(view_bounds(&region));
                }
                for line in self.lines.values() {
                    plot_ui.line(
                        Line::new(line.style.label.clone(), PlotPoints::new(line.points.clone()))
                            .color(line_color(line.style.color))
                            .width(line.style.width),
                    );
                }
            });
    }

    fn line_mut(&mut self, handle: DrawableHandle) -> Result<&mut PlotLine, TrackLapseError> {
        self.lines
            .get_mut(&handle)
            .ok_or_else(|| TrackLapseError::RenderingSurface {
                description: format!("no plot line with handle {}", handle.0),
            })
    }
}

fn view_bounds(region: &BoundingRegion) -> PlotBounds {
    let center = region.center();
    let half_lat = ((region.max_lat - region.min_lat) / 2.).max(MIN_VIEW_SPAN_DEG);
    let half_lon = ((region.max_lon - region.min_lon) / 2.).max(MIN_VIEW_SPAN_DEG);
    PlotBounds::from_min_max(
        [center.lon - half_lon, center.lat - half_lat],
        [center.lon + half_lon, center.lat + half_lat],
    )
}

impl RenderingSurface for PlotSurface {
    fn create_line(&mut self, style: &LineStyle) -> Result<DrawableHandle, TrackLapseError> {
        let handle = DrawableHandle(self.next_handle);
        self.next_handle += 1;
        self.lines.insert(
            handle,
            PlotLine {
                style: style.clone(),
                points: Vec::new(),
            },
        );
        Ok(handle)
    }

    fn set_vertices(
        &mut self,
        handle: DrawableHandle,
        vertices: &[Coordinate],
    ) -> Result<(), TrackLapseError> {
        let line = self.line_mut(handle)?;
        line.points.clear();
        line.points
            .extend(vertices.iter().map(|c| [c.lon, c.lat]));
        Ok(())
    }

    fn remove_line(&mut self, handle: DrawableHandle) -> Result<(), TrackLapseError> {
        self.lines
            .remove(&handle)
            .map(|_| ())
            .ok_or_else(|| TrackLapseError::RenderingSurface {
                description: format!("no plot line with handle {}", handle.0),
            })
    }

    fn fit_view_to(&mut self, region: &BoundingRegion) {
        self.pending_view = Some(*region);
    }
}
