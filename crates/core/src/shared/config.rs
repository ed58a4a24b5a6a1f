use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::detection::domain::face_localizer::EmptyCropPolicy;
use crate::shared::constants::{APP_DIR_NAME, DEFAULT_MIN_FACE_SIZE};
use crate::shared::device::Device;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Settings for [`EmotionRecognizer`](crate::pipeline::infrastructure::emotion_recognizer::EmotionRecognizer).
///
/// Every field has a default, so a config file only lists what it changes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecognizerConfig {
    pub device: Device,
    /// Emotion model name; the first registered model when unset.
    pub emotion_model: Option<String>,
    /// Local detector ONNX file, bypassing the model cache.
    pub detector_model_path: Option<PathBuf>,
    /// Local classifier ONNX file, bypassing the model cache.
    pub classifier_model_path: Option<PathBuf>,
    /// Extra directory searched for model files before downloading.
    pub bundled_models_dir: Option<PathBuf>,
    /// Report every face instead of only the best candidate.
    pub keep_all: bool,
    pub min_face_size: u32,
    pub empty_crops: EmptyCropPolicy,
}

impl Default for RecognizerConfig {
    fn default() -> Self {
        Self {
            device: Device::Cpu,
            emotion_model: None,
            detector_model_path: None,
            classifier_model_path: None,
            bundled_models_dir: None,
            keep_all: false,
            min_face_size: DEFAULT_MIN_FACE_SIZE,
            empty_crops: EmptyCropPolicy::default(),
        }
    }
}

impl RecognizerConfig {
    /// `<config dir>/EmotionLens/config.json`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join(APP_DIR_NAME).join("config.json"))
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let json = fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;
        serde_json::from_str(&json).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Loads the config at [`default_path`](Self::default_path) if one exists.
    ///
    /// A missing file yields defaults; a malformed one is still an error.
    pub fn load_or_default() -> Result<Self, ConfigError> {
        match Self::default_path() {
            Some(path) if path.exists() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }
}
