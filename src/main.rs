mod ui;

use std::{
    path::PathBuf,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    thread,
    time::Duration,
};

use clap::{ArgAction, Parser, Subcommand};
use egui::Vec2;
use log::{LevelFilter, error, info, warn};
use tracklapse::{
    AppConfig, MemorySurface, PlaybackController, RenderingSurface, TraceSurface,
    TrackLapseError, TrackSource, load_blocking, playback::InstallOutcome,
};
use ui::viewer::ReplayApp;

// replay logs its position every this many ticks
const PROGRESS_EVERY_TICKS: u64 = 150;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Args {
    /// More output per occurrence
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

/// Overrides for the stored playback settings.
#[derive(clap::Args, Debug, Clone)]
struct PlaybackArgs {
    /// Simulated seconds per wall second
    #[arg(short, long)]
    speed: Option<f64>,

    /// Ticks per wall second
    #[arg(long)]
    fps: Option<u32>,

    /// Simplify drawn lines with this tolerance in metres
    #[arg(long)]
    simplify: Option<f64>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Open the track viewer
    View {
        files: Vec<PathBuf>,

        #[command(flatten)]
        playback: PlaybackArgs,
    },
    /// Play tracks to the end without a window
    Replay {
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Write every drawing operation to this JSON lines file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Wait one frame interval between ticks
        #[arg(long)]
        realtime: bool,

        #[command(flatten)]
        playback: PlaybackArgs,
    },
}

fn app_config(playback: &PlaybackArgs) -> AppConfig {
    let mut config = AppConfig::from_local_file().unwrap_or_default();
    if let Some(speed) = playback.speed {
        config.speed_multiplier = speed;
    }
    if let Some(fps) = playback.fps {
        config.frames_per_second = fps;
    }
    if playback.simplify.is_some() {
        config.simplify_tolerance_m = playback.simplify;
    }
    config.validated()
}

fn view(files: Vec<PathBuf>, app_config: AppConfig) -> Result<(), TrackLapseError> {
    let mut native_options = eframe::NativeOptions::default();
    native_options.viewport = native_options
        .viewport
        .with_inner_size(Vec2::new(1000., 700.));

    eframe::run_native(
        "Tracklapse",
        native_options,
        Box::new(|cc| {
            let app = ReplayApp::new(app_config, files, cc)?;
            Ok(Box::new(app))
        }),
    )
    .map_err(|e| TrackLapseError::Ui {
        description: e.to_string(),
    })
}

fn replay(
    files: Vec<PathBuf>,
    output: Option<PathBuf>,
    realtime: bool,
    app_config: AppConfig,
    stop: Arc<AtomicBool>,
) -> Result<(), TrackLapseError> {
    match output {
        Some(path) => {
            let surface = TraceSurface::create(&path)?;
            let controller = PlaybackController::from_config(surface, &app_config)?;
            let mut surface = replay_to_end(controller, files, realtime, &app_config, &stop)?;
            surface.flush()?;
            info!("Wrote surface trace to {:?}", path);
        }
        None => {
            let controller = PlaybackController::from_config(MemorySurface::new(), &app_config)?;
            let surface = replay_to_end(controller, files, realtime, &app_config, &stop)?;
            info!(
                "Replay drew {} lines with {} vertex updates",
                surface.lines().len(),
                surface.set_vertices_calls()
            );
        }
    }
    Ok(())
}

fn replay_to_end<S: RenderingSurface>(
    mut controller: PlaybackController<S>,
    files: Vec<PathBuf>,
    realtime: bool,
    app_config: &AppConfig,
    stop: &AtomicBool,
) -> Result<S, TrackLapseError> {
    let generation = controller.begin_load(files.len())?;
    let sources = files.into_iter().map(TrackSource::Path).collect();
    let batch = load_blocking(
        generation,
        sources,
        Duration::from_secs(app_config.load_timeout_s),
    )?;

    match controller.install_batch(batch) {
        InstallOutcome::Installed { tracks, failures } => {
            info!("Replaying {} tracks", tracks);
            for failure in failures {
                warn!("Not replaying {}: {}", failure.name, failure.error);
            }
        }
        InstallOutcome::NothingDecoded { failures } => {
            return Err(failures
                .into_iter()
                .next()
                .map(|f| f.error)
                .unwrap_or(TrackLapseError::EmptySelection));
        }
        InstallOutcome::Superseded { generation } => {
            return Err(TrackLapseError::Ui {
                description: format!("batch {} was superseded", generation),
            });
        }
    }

    controller.play();
    let mut ticks: u64 = 0;
    while !stop.load(Ordering::Relaxed) {
        let report = controller.tick();
        ticks += 1;
        if ticks % PROGRESS_EVERY_TICKS == 0 {
            info!("{}", controller.elapsed_readout());
        }
        if report.finished || !controller.clock().is_running() {
            break;
        }
        if realtime {
            thread::sleep(controller.clock().frame_interval());
        }
    }
    info!(
        "Replay stopped after {} ticks at {}",
        ticks,
        controller.elapsed_readout()
    );
    Ok(controller.into_surface())
}

fn main() {
    let cli = Args::parse();
    let level = match cli.verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    colog::default_builder().filter_level(level).init();

    // a headless replay stops at the next tick so the trace is flushed, the viewer exits at once
    let headless = matches!(cli.command, Commands::Replay { .. });
    let stop = Arc::new(AtomicBool::new(false));
    let stop_handler = stop.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        println!("Exiting...");
        if !headless || stop_handler.swap(true, Ordering::Relaxed) {
            std::process::exit(0);
        }
    }) {
        warn!("Could not set Ctrl-C handler: {}", e);
    }

    let result = match cli.command {
        Commands::View { files, playback } => view(files, app_config(&playback)),
        Commands::Replay {
            files,
            output,
            realtime,
            playback,
        } => replay(files, output, realtime, app_config(&playback), stop),
    };
    if let Err(e) = result {
        error!("{}", e);
        std::process::exit(1);
    }
}
