// Error types for tracklapse

use snafu::Snafu;
use std::{io, path::PathBuf};

#[derive(Debug, Snafu)]
pub enum TrackLapseError {
    // Errors while decoding track logs
    #[snafu(display("Could not decode track {name}: {reason}"))]
    Decode { name: String, reason: String },
    #[snafu(display("Track {name} has no samples"))]
    EmptyTrack { name: String },
    #[snafu(display("Track {name} samples are out of order at index {index}"))]
    SamplesOutOfOrder { name: String, index: usize },
    #[snafu(display("Unable to read track file {path:?}"))]
    ReadTrackFile { path: PathBuf, source: io::Error },
    #[snafu(display("Timeout waiting for track {name} to decode"))]
    LoadTimeout { name: String },
    #[snafu(display("Could not start the track loader runtime"))]
    LoaderRuntime { source: io::Error },
    #[snafu(display("No track files selected"))]
    EmptySelection,

    // Playback errors
    #[snafu(display("Seek fraction {fraction} is outside [0, 1]"))]
    ClockOutOfRange { fraction: f64 },
    #[snafu(display("Invalid playback speed {multiplier}, must be a positive number"))]
    InvalidSpeed { multiplier: f64 },
    #[snafu(display("Invalid frame rate {frames_per_second}, must be at least 1"))]
    InvalidFrameRate { frames_per_second: u32 },

    // Errors reported by a rendering surface
    #[snafu(display("Rendering surface error: {description}"))]
    RenderingSurface { description: String },
    #[snafu(display("Error writing surface trace"))]
    TraceWriterError { source: io::Error },

    // Config management errors
    #[snafu(display("Could not find application data directory to save config file"))]
    NoConfigDir,
    #[snafu(display("Error writing config file"))]
    ConfigIOError { source: io::Error },
    #[snafu(display("Error serializing config file"))]
    ConfigSerializeError { source: serde_json::Error },

    // UI errors
    #[snafu(display("Viewer error: {description}"))]
    Ui { description: String },
}
