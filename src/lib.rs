// Library interface for tracklapse
// The viewer binary and the integration tests build on these modules

pub mod config;
pub mod errors;
pub mod loader;
pub mod playback;
pub mod surface;
pub mod track;

// Re-export commonly used types
pub use config::AppConfig;
pub use errors::TrackLapseError;
pub use loader::{BackgroundLoader, LoadedBatch, TrackSource, decode_track, load_blocking};
pub use playback::{PlaybackClock, PlaybackController, PlaybackState, TickReport};
pub use surface::{DrawableHandle, LineStyle, MemorySurface, RenderingSurface, TraceSurface};
pub use track::{BoundingRegion, Coordinate, Sample, Track};
