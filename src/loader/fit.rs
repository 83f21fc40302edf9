use std::panic;

use chrono::Utc;
use fitparser::{FitDataRecord, Value as FitValue, de::from_bytes, profile::MesgNum};

use crate::{
    TrackLapseError,
    track::{Coordinate, RawSample},
};

const MIN_HEADER_SIZE: usize = 12;
const INVALID_SINT32: f64 = 0x7FFF_FFFF as f64;
const SEMICIRCLES_TO_DEGREES: f64 = 180. / 2_147_483_648.;

/// True when `bytes` starts with a FIT file header.
pub fn is_fit(bytes: &[u8]) -> bool {
    bytes.len() >= MIN_HEADER_SIZE && &bytes[8..12] == b".FIT"
}

/// Decodes the timestamped positions of a Garmin FIT activity file.
///
/// Only RECORD messages carrying both a timestamp and a valid position
/// become samples; every other message is skipped.
pub fn decode_fit(name: &str, bytes: &[u8]) -> Result<Vec<RawSample>, TrackLapseError> {
    let decode_error = |reason: String| TrackLapseError::Decode {
        name: name.to_string(),
        reason,
    };
    if !is_fit(bytes) {
        return Err(decode_error("missing FIT header".to_string()));
    }

    let messages = panic::catch_unwind(|| from_bytes(bytes))
        .map_err(|_| decode_error("FIT parser panicked on malformed input".to_string()))?
        .map_err(|e| decode_error(e.to_string()))?;

    let samples: Vec<RawSample> = messages
        .iter()
        .filter(|message| message.kind() == MesgNum::Record)
        .filter_map(record_sample)
        .collect();
    if samples.is_empty() {
        return Err(decode_error(
            "no records with position and timestamp".to_string(),
        ));
    }
    Ok(samples)
}

fn record_sample(message: &FitDataRecord) -> Option<RawSample> {
    let mut time = None;
    let mut lat = None;
    let mut lon = None;
    for field in message.fields() {
        match (field.name(), field.value()) {
            ("timestamp", FitValue::Timestamp(ts)) => time = Some(ts.with_timezone(&Utc)),
            ("position_lat", value) => lat = semicircles_to_degrees(value),
            ("position_long", value) => lon = semicircles_to_degrees(value),
            _ => {}
        }
    }
    Some(RawSample {
        time: time?,
        coordinate: Coordinate::new(lat?, lon?),
    })
}

// no fix yet is written as the sint32 invalid marker
fn semicircles_to_degrees(value: &FitValue) -> Option<f64> {
    let semicircles = match value {
        FitValue::SInt32(v) => *v as f64,
        FitValue::SInt64(v) => *v as f64,
        FitValue::Float32(v) => *v as f64,
        FitValue::Float64(v) => *v,
        _ => return None,
    };
    (semicircles.is_finite() && semicircles != INVALID_SINT32)
        .then_some(semicircles * SEMICIRCLES_TO_DEGREES)
}
