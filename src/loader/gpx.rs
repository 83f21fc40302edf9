use chrono::{DateTime, Utc};
use quick_xml::{
    Reader,
    events::{BytesStart, Event},
};

use crate::{
    TrackLapseError,
    track::{Coordinate, RawSample},
};

/// Decodes every `trkpt` of a GPX document, in document order.
///
/// Each point needs `lat`/`lon` attributes and a `time` child in RFC 3339
/// format. Track and segment boundaries are ignored.
pub fn decode_gpx(name: &str, bytes: &[u8]) -> Result<Vec<RawSample>, TrackLapseError> {
    let decode_error = |reason: String| TrackLapseError::Decode {
        name: name.to_string(),
        reason,
    };

    let mut reader = Reader::from_reader(bytes);
    let mut buf = Vec::new();
    let mut samples = Vec::new();

    let mut cur_point: Option<Coordinate> = None;
    let mut cur_time: Option<DateTime<Utc>> = None;
    let mut in_time = false;
    let mut time_text = String::new();

    loop {
        let event = reader.read_event_into(&mut buf).map_err(|e| {
            decode_error(format!(
                "invalid XML at position {}: {}",
                reader.buffer_position(),
                e
            ))
        })?;

        match event {
            Event::Eof => break,
            Event::Start(ref e) => match e.local_name().as_ref() {
                b"trkpt" => {
                    cur_point = Some(point_coordinate(e, samples.len()).map_err(decode_error)?);
                    cur_time = None;
                }
                b"time" if cur_point.is_some() => {
                    in_time = true;
                    time_text.clear();
                }
                _ => {}
            },
            Event::Empty(ref e) if e.local_name().as_ref() == b"trkpt" => {
                return Err(decode_error(format!(
                    "track point {} has no time",
                    samples.len()
                )));
            }
            Event::Text(ref e) if in_time => {
                let text = e
                    .unescape()
                    .map_err(|e| decode_error(format!("invalid time text: {}", e)))?;
                time_text.push_str(&text);
            }
            Event::End(ref e) => match e.local_name().as_ref() {
                b"time" if in_time => {
                    in_time = false;
                    let time = DateTime::parse_from_rfc3339(time_text.trim()).map_err(|e| {
                        decode_error(format!(
                            "track point {} has an invalid time '{}': {}",
                            samples.len(),
                            time_text.trim(),
                            e
                        ))
                    })?;
                    cur_time = Some(time.with_timezone(&Utc));
                }
                b"trkpt" => {
                    let Some(coordinate) = cur_point.take() else {
                        continue;
                    };
                    let Some(time) = cur_time.take() else {
                        return Err(decode_error(format!(
                            "track point {} has no time",
                            samples.len()
                        )));
                    };
                    samples.push(RawSample { time, coordinate });
                }
                _ => {}
            },
            _ => {}
        }
        buf.clear();
    }

    if samples.is_empty() {
        return Err(decode_error("no track points found".to_string()));
    }
    Ok(samples)
}

fn point_coordinate(element: &BytesStart, index: usize) -> Result<Coordinate, String> {
    let mut lat = None;
    let mut lon = None;
    for attribute in element.attributes() {
        let attribute =
            attribute.map_err(|e| format!("track point {} has a bad attribute: {}", index, e))?;
        let value = attribute
            .unescape_value()
            .map_err(|e| format!("track point {} has a bad attribute: {}", index, e))?;
        match attribute.key.local_name().as_ref() {
            b"lat" => lat = Some(parse_degrees(&value, "lat", index)?),
            b"lon" => lon = Some(parse_degrees(&value, "lon", index)?),
            _ => {}
        }
    }
    match (lat, lon) {
        (Some(lat), Some(lon)) => Ok(Coordinate::new(lat, lon)),
        _ => Err(format!("track point {} is missing lat/lon", index)),
    }
}

fn parse_degrees(value: &str, field: &str, index: usize) -> Result<f64, String> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| format!("track point {} has an invalid {} '{}'", index, field, value))
}
