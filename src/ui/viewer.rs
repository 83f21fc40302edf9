use std::{
    path::PathBuf,
    time::{Duration, Instant},
};

use egui::{Align, ComboBox, Frame, Layout, RichText, Slider};
use log::{error, info, warn};

use tracklapse::{
    AppConfig, BackgroundLoader, PlaybackController, PlaybackState, TrackLapseError, TrackSource,
    loader::LoadedBatch,
    playback::{InstallOutcome, SPEED_PRESETS, speed_label},
};

use super::{PALETTE_MAROON, PlotSurface, default_visuals};

/// Desktop viewer: a map of the selected tracks drawing themselves over time.
pub struct ReplayApp {
    controller: PlaybackController<PlotSurface>,
    loader: BackgroundLoader,
    app_config: AppConfig,
    status: String,
    last_tick: Instant,
}

impl ReplayApp {
    pub fn new(
        app_config: AppConfig,
        initial_files: Vec<PathBuf>,
        cc: &eframe::CreationContext<'_>,
    ) -> Result<Self, TrackLapseError> {
        cc.egui_ctx.set_visuals(default_visuals());

        let controller = PlaybackController::from_config(PlotSurface::default(), &app_config)?;
        let loader = BackgroundLoader::new(Duration::from_secs(app_config.load_timeout_s));
        let mut app = Self {
            controller,
            loader,
            app_config,
            status: "Open one or more GPX or FIT files to start".to_string(),
            last_tick: Instant::now(),
        };
        if !initial_files.is_empty() {
            app.load_files(initial_files);
        }
        Ok(app)
    }

    fn load_files(&mut self, paths: Vec<PathBuf>) {
        let generation = match self.controller.begin_load(paths.len()) {
            Ok(generation) => generation,
            Err(e) => {
                warn!("{}", e);
                return;
            }
        };
        let sources = paths.into_iter().map(TrackSource::Path).collect();
        match self.loader.submit(generation, sources) {
            Ok(()) => self.status = "Loading tracks...".to_string(),
            Err(e) => {
                error!("Could not start loading tracks: {}", e);
                self.controller.abandon_load();
                self.status = format!("Could not load tracks: {}", e);
            }
        }
    }

    fn receive_batches(&mut self) {
        while let Some(batch) = self.loader.try_recv() {
            self.install(batch);
        }
    }

    fn install(&mut self, batch: LoadedBatch) {
        match self.controller.install_batch(batch) {
            InstallOutcome::Installed { tracks, failures } => {
                self.status = if failures.is_empty() {
                    format!("Showing {} tracks", tracks)
                } else {
                    let names: Vec<&str> = failures.iter().map(|f| f.name.as_str()).collect();
                    format!(
                        "Showing {} tracks, could not load {}",
                        tracks,
                        names.join(", ")
                    )
                };
            }
            InstallOutcome::NothingDecoded { failures } => {
                self.status = match failures.first() {
                    Some(failure) => format!("No track could be loaded: {}", failure.error),
                    None => "No track could be loaded".to_string(),
                };
            }
            InstallOutcome::Superseded { generation } => {
                info!("Ignoring superseded batch {}", generation);
            }
        }
    }

    fn advance_clock(&mut self) {
        let interval = self.controller.clock().frame_interval();
        if self.last_tick.elapsed() < interval {
            return;
        }
        self.last_tick = Instant::now();
        let report = self.controller.tick();
        if report.finished {
            self.status = format!("Finished at {}", self.controller.elapsed_readout());
        }
    }

    fn controls(&mut self, ui: &mut egui::Ui) {
        ui.horizontal_wrapped(|ui| {
            if ui.button("📂 Open tracks").clicked()
                && let Some(paths) = rfd::FileDialog::new()
                    .add_filter("Track logs", &["gpx", "fit"])
                    .pick_files()
            {
                self.load_files(paths);
            }

            ui.separator();
            let play_label = if self.controller.clock().is_running() {
                "⏸ Pause"
            } else {
                "▶ Play"
            };
            if ui.button(play_label).clicked() {
                self.controller.toggle_play();
            }
            if ui.button("⏮ Reset").clicked() {
                self.controller.reset();
            }

            let mut speed = self.controller.clock().speed_multiplier();
            ComboBox::from_id_salt("speed")
                .selected_text(speed_label(speed))
                .show_ui(ui, |ui| {
                    for preset in SPEED_PRESETS {
                        ui.selectable_value(&mut speed, preset, speed_label(preset));
                    }
                });
            if speed != self.controller.clock().speed_multiplier()
                && let Err(e) = self.controller.set_speed(speed)
            {
                warn!("{}", e);
            }

            ui.separator();
            let mut fraction = self.controller.clock().fraction();
            if ui
                .add(Slider::new(&mut fraction, 0.0..=1.0).show_value(false))
                .changed()
            {
                self.controller.seek(fraction);
            }
            ui.label(RichText::new(self.controller.elapsed_readout()).monospace());
        });
    }

    fn status_line(&self, ui: &mut egui::Ui) {
        ui.with_layout(Layout::left_to_right(Align::Center), |ui| {
            let state = match self.controller.state() {
                PlaybackState::Idle => "Idle",
                PlaybackState::Loading => "Loading",
                PlaybackState::Paused => "Paused",
                PlaybackState::Playing => "Playing",
            };
            ui.label(RichText::new(state).color(PALETTE_MAROON).strong());
            ui.label(self.status.as_str());
        });
    }
}

impl eframe::App for ReplayApp {
    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        self.app_config.speed_multiplier = self.controller.clock().speed_multiplier();
        if let Err(e) = self.app_config.save() {
            error!("Error while saving config file: {}", e);
        }
    }

    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.receive_batches();
        self.advance_clock();

        egui::TopBottomPanel::top("controls")
            .frame(Frame::new().inner_margin(4))
            .show(ctx, |ui| self.controls(ui));
        egui::TopBottomPanel::bottom("status")
            .frame(Frame::new().inner_margin(4))
            .show(ctx, |ui| self.status_line(ui));
        egui::CentralPanel::default().show(ctx, |ui| {
            self.controller.surface_mut().show(ui);
        });

        ctx.request_repaint_after(self.controller.clock().frame_interval());
    }
}
