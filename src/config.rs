use std::path::{Path, PathBuf};

use log::warn;
use serde::{Deserialize, Serialize};

use crate::{
    TrackLapseError,
    loader::DEFAULT_LOAD_TIMEOUT_S,
    playback::{DEFAULT_FRAMES_PER_SECOND, DEFAULT_SPEED_MULTIPLIER},
};

const CONFIG_DIR_NAME: &str = "tracklapse";
const CONFIG_FILE_NAME: &str = "config.json";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub frames_per_second: u32,
    pub speed_multiplier: f64,
    /// Douglas-Peucker tolerance applied to drawn lines, in metres. `None` draws every sample.
    pub simplify_tolerance_m: Option<f64>,
    pub load_timeout_s: u64,
    pub autoplay: bool,
    pub line_width: f32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            frames_per_second: DEFAULT_FRAMES_PER_SECOND,
            speed_multiplier: DEFAULT_SPEED_MULTIPLIER,
            simplify_tolerance_m: None,
            load_timeout_s: DEFAULT_LOAD_TIMEOUT_S,
            autoplay: true,
            line_width: 2.,
        }
    }
}

impl AppConfig {
    pub fn default_path() -> Option<PathBuf> {
        Some(
            dirs::config_dir()?
                .join(CONFIG_DIR_NAME)
                .join(CONFIG_FILE_NAME),
        )
    }

    /// Loads the user config, if there is a readable one.
    pub fn from_local_file() -> Option<Self> {
        Self::from_path(&Self::default_path()?)
    }

    pub fn from_path(config_path: &Path) -> Option<Self> {
        if !config_path.exists() {
            return None;
        }
        let file = match std::fs::File::open(config_path) {
            Ok(file) => file,
            Err(e) => {
                warn!("Could not open config file {:?}: {}", config_path, e);
                return None;
            }
        };
        match serde_json::from_reader::<_, Self>(file) {
            Ok(config) => Some(config.validated()),
            Err(e) => {
                warn!("Could not parse config file {:?}: {}", config_path, e);
                None
            }
        }
    }

    pub fn save(&self) -> Result<(), TrackLapseError> {
        let config_path = Self::default_path().ok_or(TrackLapseError::NoConfigDir)?;
        self.save_to(&config_path)
    }

    pub fn save_to(&self, config_path: &Path) -> Result<(), TrackLapseError> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| TrackLapseError::ConfigIOError { source: e })?;
        }

        let file = std::fs::File::create(config_path)
            .map_err(|e| TrackLapseError::ConfigIOError { source: e })?;
        serde_json::to_writer_pretty(file, self)
            .map_err(|e| TrackLapseError::ConfigSerializeError { source: e })
    }

    /// Replaces out of range values with their defaults.
    pub fn validated(mut self) -> Self {
        let defaults = Self::default();
        if self.frames_per_second == 0 {
            warn!("Config frame rate must be at least 1, using {}", defaults.frames_per_second);
            self.frames_per_second = defaults.frames_per_second;
        }
        if !self.speed_multiplier.is_finite() || self.speed_multiplier <= 0. {
            warn!(
                "Config speed {} is not a positive number, using {}",
                self.speed_multiplier, defaults.speed_multiplier
            );
            self.speed_multiplier = defaults.speed_multiplier;
        }
        if let Some(tolerance) = self.simplify_tolerance_m {
            if !tolerance.is_finite() || tolerance <= 0. {
                warn!("Ignoring simplification tolerance {}", tolerance);
                self.simplify_tolerance_m = None;
            }
        }
        if self.load_timeout_s == 0 {
            self.load_timeout_s = defaults.load_timeout_s;
        }
        if !self.line_width.is_finite() || self.line_width <= 0. {
            self.line_width = defaults.line_width;
        }
        self
    }
}
