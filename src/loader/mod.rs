pub mod fit;
pub mod gpx;

use std::{
    borrow::Cow,
    path::PathBuf,
    sync::mpsc::{self, Receiver, Sender},
    thread,
    time::Duration,
};

use log::{debug, error, info, warn};

use crate::{
    TrackLapseError,
    track::{BoundingRegion, Track},
};

pub const DEFAULT_LOAD_TIMEOUT_S: u64 = 30;

/// A track log submitted for loading.
#[derive(Clone, Debug)]
pub enum TrackSource {
    Path(PathBuf),
    Bytes { name: String, contents: Vec<u8> },
}

impl TrackSource {
    /// Name used for the track and in error messages.
    pub fn name(&self) -> String {
        match self {
            Self::Path(path) => path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string()),
            Self::Bytes { name, .. } => name.clone(),
        }
    }

    fn contents(&self) -> Result<Cow<'_, [u8]>, TrackLapseError> {
        match self {
            Self::Path(path) => std::fs::read(path)
                .map(Cow::Owned)
                .map_err(|e| TrackLapseError::ReadTrackFile {
                    path: path.clone(),
                    source: e,
                }),
            Self::Bytes { contents, .. } => Ok(Cow::Borrowed(contents)),
        }
    }

    /// Reads and decodes the source into a track.
    pub fn decode(&self) -> Result<Track, TrackLapseError> {
        let contents = self.contents()?;
        decode_track(&self.name(), &contents)
    }
}

/// Decodes a GPX or FIT log into a track, sniffing the format from the content.
pub fn decode_track(name: &str, bytes: &[u8]) -> Result<Track, TrackLapseError> {
    let raw = if fit::is_fit(bytes) {
        fit::decode_fit(name, bytes)?
    } else {
        gpx::decode_gpx(name, bytes)?
    };
    let track = Track::from_raw(name, raw)?;
    debug!(
        "Decoded {}: {} samples over {:.0}s",
        name,
        track.len(),
        track.duration_seconds()
    );
    Ok(track)
}

/// A file of a batch that did not produce a track.
#[derive(Debug)]
pub struct DecodeFailure {
    pub name: String,
    pub error: TrackLapseError,
}

/// Result of one loading barrier: every submitted file either decoded or failed.
#[derive(Debug)]
pub struct LoadedBatch {
    pub generation: u64,
    pub tracks: Vec<Track>,
    pub failures: Vec<DecodeFailure>,
}

impl LoadedBatch {
    /// Region covering every decoded track.
    pub fn bounds(&self) -> Option<BoundingRegion> {
        BoundingRegion::from_tracks(&self.tracks)
    }

    fn all_failed(generation: u64, names: Vec<String>, reason: &str) -> Self {
        Self {
            generation,
            tracks: Vec::new(),
            failures: names
                .into_iter()
                .map(|name| DecodeFailure {
                    error: TrackLapseError::Decode {
                        name: name.clone(),
                        reason: reason.to_string(),
                    },
                    name,
                })
                .collect(),
        }
    }
}

/// Decodes every source on its own blocking task and waits for all of them.
///
/// Files still decoding when `timeout` expires are reported as
/// [`TrackLapseError::LoadTimeout`], so the barrier always completes. Tracks
/// keep the order of `sources`.
pub async fn load_batch(
    generation: u64,
    sources: Vec<TrackSource>,
    timeout: Duration,
) -> LoadedBatch {
    load_batch_with(generation, sources, timeout, |source| source.decode()).await
}

async fn load_batch_with<F>(
    generation: u64,
    sources: Vec<TrackSource>,
    timeout: Duration,
    decode: F,
) -> LoadedBatch
where
    F: Fn(TrackSource) -> Result<Track, TrackLapseError> + Clone + Send + 'static,
{
    let deadline = tokio::time::Instant::now() + timeout;
    let tasks: Vec<_> = sources
        .into_iter()
        .map(|source| {
            let name = source.name();
            let decode = decode.clone();
            (name, tokio::task::spawn_blocking(move || decode(source)))
        })
        .collect();

    let mut batch = LoadedBatch {
        generation,
        tracks: Vec::new(),
        failures: Vec::new(),
    };
    for (name, task) in tasks {
        match tokio::time::timeout_at(deadline, task).await {
            Ok(Ok(Ok(track))) => batch.tracks.push(track),
            Ok(Ok(Err(error))) => batch.failures.push(DecodeFailure { name, error }),
            Ok(Err(join_error)) => batch.failures.push(DecodeFailure {
                error: TrackLapseError::Decode {
                    name: name.clone(),
                    reason: format!("decoder stopped unexpectedly: {}", join_error),
                },
                name,
            }),
            Err(_) => batch.failures.push(DecodeFailure {
                error: TrackLapseError::LoadTimeout { name: name.clone() },
                name,
            }),
        }
    }

    info!(
        "Loaded batch {}: {} tracks, {} failures",
        generation,
        batch.tracks.len(),
        batch.failures.len()
    );
    for failure in &batch.failures {
        warn!("Skipping {}: {}", failure.name, failure.error);
    }
    batch
}

/// Runs [`load_batch`] to completion on a fresh current-thread runtime.
pub fn load_blocking(
    generation: u64,
    sources: Vec<TrackSource>,
    timeout: Duration,
) -> Result<LoadedBatch, TrackLapseError> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .map_err(|e| TrackLapseError::LoaderRuntime { source: e })?;
    let batch = runtime.block_on(load_batch(generation, sources, timeout));
    // do not wait for decoders that blew the deadline
    runtime.shutdown_background();
    Ok(batch)
}

/// Runs loading barriers off the UI thread and hands back finished batches.
pub struct BackgroundLoader {
    timeout: Duration,
    batch_tx: Sender<LoadedBatch>,
    batch_rx: Receiver<LoadedBatch>,
}

impl BackgroundLoader {
    pub fn new(timeout: Duration) -> Self {
        let (batch_tx, batch_rx) = mpsc::channel();
        Self {
            timeout,
            batch_tx,
            batch_rx,
        }
    }

    /// Starts loading `sources` as batch `generation`.
    pub fn submit(&self, generation: u64, sources: Vec<TrackSource>) -> Result<(), TrackLapseError> {
        if sources.is_empty() {
            return Err(TrackLapseError::EmptySelection);
        }
        let names: Vec<String> = sources.iter().map(TrackSource::name).collect();
        let batch_tx = self.batch_tx.clone();
        let timeout = self.timeout;

        thread::Builder::new()
            .name(format!("track-loader-{}", generation))
            .spawn(move || {
                let batch = load_blocking(generation, sources, timeout).unwrap_or_else(|e| {
                    error!("Track loader failed for batch {}: {}", generation, e);
                    LoadedBatch::all_failed(generation, names, &e.to_string())
                });
                if batch_tx.send(batch).is_err() {
                    debug!("Batch {} finished after the viewer closed", generation);
                }
            })
            .map_err(|e| TrackLapseError::LoaderRuntime { source: e })?;
        Ok(())
    }

    /// A finished batch, if any is waiting.
    pub fn try_recv(&self) -> Option<LoadedBatch> {
        self.batch_rx.try_recv().ok()
    }

    /// Blocks until the next batch finishes or `wait` expires.
    pub fn recv_timeout(&self, wait: Duration) -> Option<LoadedBatch> {
        self.batch_rx.recv_timeout(wait).ok()
    }
}
