use capture::CameraConfig;
use shapes::DetectorConfig;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    SerdeError(#[from] serde_json::Error),
    #[error(transparent)]
    TomlDeError(#[from] toml::de::Error),
    #[error(transparent)]
    TomlSerError(#[from] toml::ser::Error),
    #[error(transparent)]
    IoError(#[from] std::io::Error),
    #[error(transparent)]
    Detector(#[from] shapes::ShapeError),
    #[error(transparent)]
    Camera(#[from] capture::CaptureError),
    #[error("Unsupported file format. Please use .toml or .json files")]
    UnsupportedFileFormat,
}

/// Where captured and displayed frames go
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(default)]
pub struct OutputConfig {
    /// Snapshot directory, created on first capture
    pub images_dir: PathBuf,
    /// Live preview JPEG, rewritten every frame. Frames are only logged when unset.
    pub preview_path: Option<PathBuf>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            images_dir: PathBuf::from("images"),
            preview_path: None,
        }
    }
}

/// Full application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub camera: CameraConfig,
    pub detector: DetectorConfig,
    pub output: OutputConfig,
    /// Start with shape detection switched on
    pub detect_on_start: bool,
}

impl AppConfig {
    /// Check the camera and detector sections
    pub fn validate(&self) -> Result<(), AppError> {
        self.camera.validate()?;
        self.detector.validate()?;
        Ok(())
    }

    /// Load configuration from a TOML file
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self, AppError> {
        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Load configuration from TOML string
    pub fn from_toml(content: &str) -> Result<Self, AppError> {
        let config: AppConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a JSON file
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, AppError> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Load configuration from JSON string
    pub fn from_json(content: &str) -> Result<Self, AppError> {
        let config: AppConfig = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Auto-detect file format and load configuration
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, AppError> {
        let path_ref = path.as_ref();
        match path_ref.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Self::from_toml_file(path),
            Some("json") => Self::from_json_file(path),
            _ => Err(AppError::UnsupportedFileFormat),
        }
    }

    /// Save configuration to a TOML file
    pub fn to_toml_file<P: AsRef<Path>>(&self, path: P) -> Result<(), AppError> {
        let content = self.to_toml()?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Convert configuration to TOML string
    pub fn to_toml(&self) -> Result<String, AppError> {
        Ok(toml::to_string_pretty(&self)?)
    }

    /// Save configuration to a JSON file
    pub fn to_json_file<P: AsRef<Path>>(&self, path: P) -> Result<(), AppError> {
        let content = self.to_json()?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Convert configuration to JSON string
    pub fn to_json(&self) -> Result<String, AppError> {
        Ok(serde_json::to_string_pretty(&self)?)
    }

    /// Save configuration, choosing the format from the file extension
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), AppError> {
        let path_ref = path.as_ref();
        match path_ref.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => self.to_toml_file(path),
            Some("json") => self.to_json_file(path),
            _ => Err(AppError::UnsupportedFileFormat),
        }
    }

    /// JSON schema of the configuration file
    pub fn schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(AppConfig)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("shape-cam-{}-{}", std::process::id(), name))
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = AppConfig::from_toml(
            r#"
            detect_on_start = true

            [camera]
            device = "/dev/video2"

            [detector.noise]
            min_area = 1500.0
            "#,
        )
        .expect("Should parse");

        assert!(config.detect_on_start);
        assert_eq!(config.camera.device.as_deref(), Some("/dev/video2"));
        assert_eq!(config.camera.width, 640);
        assert_eq!(config.detector.noise.min_area, 1500.0);
        assert_eq!(config.detector.classification.epsilon_factor, 0.02);
        assert_eq!(config.output.images_dir, PathBuf::from("images"));
    }

    #[test]
    fn test_invalid_detector_values_are_rejected() {
        let result = AppConfig::from_json(r#"{"detector":{"preprocessing":{"canny_low":300,"canny_high":100}}}"#);
        assert!(matches!(result, Err(AppError::Detector(_))));
    }

    #[test]
    fn test_zero_camera_size_is_rejected() {
        let result = AppConfig::from_toml(
            r#"
            [camera]
            width = 0
            "#,
        );
        assert!(matches!(result, Err(AppError::Camera(_))));

        let result = AppConfig::from_json(r#"{"camera":{"height":0}}"#);
        assert!(matches!(result, Err(AppError::Camera(_))));
    }

    #[test]
    fn test_file_round_trip_by_extension() {
        let mut config = AppConfig::default();
        config.output.preview_path = Some(PathBuf::from("preview.jpg"));
        config.detector.annotation.font_scale = 20.0;
        config.detector.annotation.show_captions = false;

        for name in ["config.toml", "config.json"] {
            let path = temp_path(name);
            config.to_file(&path).expect("Should save");
            let loaded = AppConfig::from_file(&path).expect("Should load");
            assert_eq!(loaded, config);
            let _ = fs::remove_file(&path);
        }
    }

    #[test]
    fn test_unknown_extension() {
        assert!(matches!(
            AppConfig::from_file("config.yaml"),
            Err(AppError::UnsupportedFileFormat)
        ));
        assert!(matches!(
            AppConfig::default().to_file(temp_path("config.ini")),
            Err(AppError::UnsupportedFileFormat)
        ));
    }

    #[test]
    fn test_schema_lists_sections() {
        let schema = serde_json::to_value(AppConfig::schema()).expect("serialize");
        let properties = &schema["properties"];
        for key in ["camera", "detector", "output", "detect_on_start"] {
            assert!(properties.get(key).is_some(), "missing {}", key);
        }
    }
}
