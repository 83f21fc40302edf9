use geo::{Coord, LineString, SimplifyIdx};

use super::Coordinate;

const EARTH_RADIUS_M: f64 = 6_371_000.;

/// Lossy, order preserving Douglas-Peucker downsampling of a coordinate list.
///
/// Only changes what gets pushed to a rendering surface; the first and the
/// last (newest) vertex are always kept.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Simplifier {
    tolerance_m: f64,
}

impl Simplifier {
    /// `None` for a tolerance that is not a positive number.
    pub fn new(tolerance_m: f64) -> Option<Self> {
        (tolerance_m.is_finite() && tolerance_m > 0.).then_some(Self { tolerance_m })
    }

    pub fn simplify(&self, coordinates: &[Coordinate]) -> Vec<Coordinate> {
        if coordinates.len() < 3 {
            return coordinates.to_vec();
        }

        let kept = project(coordinates).simplify_idx(self.tolerance_m);
        kept.into_iter().map(|i| coordinates[i]).collect()
    }
}

/// Equirectangular projection to metres around the first coordinate, good
/// enough for the extent of a single recorded route.
fn project(coordinates: &[Coordinate]) -> LineString<f64> {
    let origin = coordinates[0];
    let lon_scale = origin.lat.to_radians().cos();
    coordinates
        .iter()
        .map(|c| Coord {
            x: (c.lon - origin.lon).to_radians() * lon_scale * EARTH_RADIUS_M,
            y: (c.lat - origin.lat).to_radians() * EARTH_RADIUS_M,
        })
        .collect()
}
