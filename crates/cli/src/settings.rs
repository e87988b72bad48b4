use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use facecam_core::detection::domain::detector_options::DetectorOptions;
use facecam_core::pipeline::detection_loop::DetectionLoopConfig;
use facecam_core::session::camera_session::SessionConfig;
use facecam_core::shared::constants::{
    DEFAULT_ARTIFACT_EXTENSION, DEFAULT_DETECTION_INTERVAL, DEFAULT_DISPLAY_SIZE,
    DEFAULT_MODEL_LOCATION,
};
use facecam_core::shared::dimensions::Dimensions;
use facecam_core::shared::model_location::ModelLocation;

/// Persistent CLI defaults. Every field is optional in the file; missing
/// ones take their default value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub model_location: String,
    pub output_dir: PathBuf,
    pub extension: String,
    /// Minimum face score in percent.
    pub confidence: u32,
    pub detection_interval_ms: u64,
    pub display_width: u32,
    pub display_height: u32,
    pub camera_index: u32,
    pub listen: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            model_location: DEFAULT_MODEL_LOCATION.to_string(),
            output_dir: PathBuf::from("."),
            extension: DEFAULT_ARTIFACT_EXTENSION.to_string(),
            confidence: 50,
            detection_interval_ms: DEFAULT_DETECTION_INTERVAL.as_millis() as u64,
            display_width: DEFAULT_DISPLAY_SIZE.width,
            display_height: DEFAULT_DISPLAY_SIZE.height,
            camera_index: 0,
            listen: "127.0.0.1:3000".to_string(),
        }
    }
}

impl Settings {
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("FaceCam").join("settings.json"))
    }

    /// Loads the user settings file, falling back to defaults when it is
    /// missing or unreadable.
    pub fn load() -> Self {
        Self::config_path()
            .map(|path| Self::load_from(&path))
            .unwrap_or_default()
    }

    pub fn load_from(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(json) => serde_json::from_str(&json).unwrap_or_else(|e| {
                log::warn!("Ignoring malformed settings {}: {e}", path.display());
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    pub fn detector_options(&self) -> DetectorOptions {
        DetectorOptions::default().with_min_confidence(self.confidence.min(100) as f64 / 100.0)
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            model_location: ModelLocation::parse(&self.model_location),
            detection: DetectionLoopConfig {
                interval: Duration::from_millis(self.detection_interval_ms.max(1)),
                display: Dimensions::new(self.display_width, self.display_height),
                options: self.detector_options(),
            },
            output_dir: self.output_dir.clone(),
            extension: self.extension.clone(),
        }
    }
}
