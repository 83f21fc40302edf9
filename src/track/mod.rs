pub mod search;
pub mod simplify;

use chrono::{DateTime, Utc};
use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::TrackLapseError;

pub use search::last_sample_at_or_before;
pub use simplify::Simplifier;

/// Position in decimal degrees (WGS84).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinate {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

/// One point of a track, timestamped relative to the first point of its track.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub timestamp_seconds: f64,
    pub coordinate: Coordinate,
}

/// A decoded point as it comes out of a track log, still carrying its absolute time.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RawSample {
    pub time: DateTime<Utc>,
    pub coordinate: Coordinate,
}

/// An immutable, time ordered GPS log.
///
/// A track always has at least one sample, its first sample is at `t = 0` and
/// timestamps never decrease (ties are allowed).
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(try_from = "TrackRecord")]
pub struct Track {
    name: String,
    samples: Vec<Sample>,
}

/// Serialized form of a track, checked by [`Track::new`] when read back.
#[derive(Deserialize)]
struct TrackRecord {
    name: String,
    samples: Vec<Sample>,
}

impl TryFrom<TrackRecord> for Track {
    type Error = TrackLapseError;

    fn try_from(record: TrackRecord) -> Result<Self, Self::Error> {
        Track::new(record.name, record.samples)
    }
}

impl Track {
    /// Builds a track from already relative samples.
    pub fn new(name: impl Into<String>, samples: Vec<Sample>) -> Result<Self, TrackLapseError> {
        let name = name.into();
        let Some(first) = samples.first() else {
            return Err(TrackLapseError::EmptyTrack { name });
        };

        if let Some((index, _)) = samples
            .iter()
            .tuple_windows()
            .find_position(|(previous, next)| {
                // NaN timestamps count as out of order
                !(next.timestamp_seconds >= previous.timestamp_seconds)
            })
        {
            return Err(TrackLapseError::SamplesOutOfOrder {
                name,
                index: index + 1,
            });
        }

        // rebase so that the first sample defines t = 0
        let offset = first.timestamp_seconds;
        let samples = if offset != 0. {
            samples
                .into_iter()
                .map(|s| Sample {
                    timestamp_seconds: s.timestamp_seconds - offset,
                    coordinate: s.coordinate,
                })
                .collect()
        } else {
            samples
        };

        Ok(Self { name, samples })
    }

    /// Builds a track from decoded log points with absolute times.
    pub fn from_raw(name: impl Into<String>, raw: Vec<RawSample>) -> Result<Self, TrackLapseError> {
        let name = name.into();
        let Some(start) = raw.first().map(|r| r.time) else {
            return Err(TrackLapseError::EmptyTrack { name });
        };

        let samples = raw
            .into_iter()
            .map(|r| Sample {
                timestamp_seconds: (r.time - start).num_milliseconds() as f64 / 1000.,
                coordinate: r.coordinate,
            })
            .collect();
        Self::new(name, samples)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Time of the last sample, relative to the first one.
    pub fn duration_seconds(&self) -> f64 {
        self.samples
            .last()
            .map(|s| s.timestamp_seconds)
            .unwrap_or(0.)
    }

    /// Coordinates of `samples[0..=last]`, in recording order.
    pub fn prefix_coordinates(&self, last: usize) -> Vec<Coordinate> {
        let end = (last + 1).min(self.samples.len());
        self.samples[..end].iter().map(|s| s.coordinate).collect()
    }

    pub fn bounds(&self) -> Option<BoundingRegion> {
        BoundingRegion::from_coordinates(self.samples.iter().map(|s| s.coordinate))
    }
}

/// Axis aligned lat/lon box.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoundingRegion {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

impl BoundingRegion {
    pub fn from_coordinates(coordinates: impl IntoIterator<Item = Coordinate>) -> Option<Self> {
        coordinates.into_iter().fold(None, |region, c| {
            Some(match region {
                None => Self {
                    min_lat: c.lat,
                    max_lat: c.lat,
                    min_lon: c.lon,
                    max_lon: c.lon,
                },
                Some(r) => r.extend(c),
            })
        })
    }

    /// Shared region of a batch of tracks, `None` when there is nothing to show.
    pub fn from_tracks<'t>(tracks: impl IntoIterator<Item = &'t Track>) -> Option<Self> {
        tracks
            .into_iter()
            .filter_map(Track::bounds)
            .reduce(|a, b| a.union(&b))
    }

    pub fn extend(self, c: Coordinate) -> Self {
        Self {
            min_lat: self.min_lat.min(c.lat),
            max_lat: self.max_lat.max(c.lat),
            min_lon: self.min_lon.min(c.lon),
            max_lon: self.max_lon.max(c.lon),
        }
    }

    pub fn union(&self, other: &Self) -> Self {
        Self {
            min_lat: self.min_lat.min(other.min_lat),
            max_lat: self.max_lat.max(other.max_lat),
            min_lon: self.min_lon.min(other.min_lon),
            max_lon: self.max_lon.max(other.max_lon),
        }
    }

    pub fn center(&self) -> Coordinate {
        Coordinate::new(
            (self.min_lat + self.max_lat) / 2.,
            (self.min_lon + self.max_lon) / 2.,
        )
    }
}
