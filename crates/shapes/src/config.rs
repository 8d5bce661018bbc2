//! Tunable parameters of the detector.
//!
//! The defaults are the empirically tuned values the classifier was
//! calibrated with on a 640x480 webcam feed. They are tuning knobs, not
//! physical constants.

use std::path::PathBuf;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use crate::error::{Result, ShapeError};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct DetectorConfig {
    pub preprocessing: PreprocessingConfig,
    pub noise: NoiseConfig,
    pub classification: ClassificationConfig,
    pub annotation: AnnotationConfig,
}

impl DetectorConfig {
    /// Reject values the pipeline cannot work with
    pub fn validate(&self) -> Result<()> {
        let p = &self.preprocessing;
        if p.blur_sigma.is_nan() || p.blur_sigma <= 0.0 {
            return Err(invalid("preprocessing.blur_sigma must be positive"));
        }
        if p.canny_low < 0.0 || p.canny_low > p.canny_high {
            return Err(invalid("preprocessing.canny_low must be within 0..=canny_high"));
        }

        if self.noise.min_area < 0.0 {
            return Err(invalid("noise.min_area must not be negative"));
        }

        let c = &self.classification;
        if c.epsilon_factor <= 0.0 {
            return Err(invalid("classification.epsilon_factor must be positive"));
        }
        if c.quad_area_tolerance < 0.0 || c.circle_area_tolerance < 0.0 {
            return Err(invalid("classification tolerances must not be negative"));
        }

        if self.annotation.font_scale <= 0.0 {
            return Err(invalid("annotation.font_scale must be positive"));
        }

        Ok(())
    }
}

fn invalid(message: &str) -> ShapeError {
    ShapeError::InvalidConfig(message.to_string())
}

/// Blur → grayscale → Canny → dilate parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct PreprocessingConfig {
    #[schemars(range(min = 0.0, max = 10.0))]
    pub blur_sigma: f32,
    pub canny_low: f32,
    pub canny_high: f32,
    /// Chessboard radius; 1 is a 3x3 kernel, 0 disables dilation
    pub dilate_radius: u8,
}

impl Default for PreprocessingConfig {
    fn default() -> Self {
        Self {
            blur_sigma: 1.0,
            canny_low: 25.0,
            canny_high: 200.0,
            dilate_radius: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct NoiseConfig {
    /// Contours with area at or below this many pixel² are dropped
    pub min_area: f64,
}

impl Default for NoiseConfig {
    fn default() -> Self {
        Self { min_area: 1000.0 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct ClassificationConfig {
    /// Polygon approximation tolerance as a fraction of the perimeter
    #[schemars(range(min = 0.001, max = 0.5))]
    pub epsilon_factor: f64,
    /// Max pixel² the rotated rectangle's upright cover may exceed the
    /// contour area by for a 4-gon to count as square/rectangle
    pub quad_area_tolerance: f64,
    /// An 8-gon is a circle when its enclosing circle exceeds the contour
    /// area by less than this many pixel²
    pub circle_area_tolerance: f64,
}

impl Default for ClassificationConfig {
    fn default() -> Self {
        Self {
            epsilon_factor: 0.02,
            quad_area_tolerance: 3000.0,
            circle_area_tolerance: 3000.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct AnnotationConfig {
    /// RGB
    pub outline_color: [u8; 3],
    pub label_color: [u8; 3],
    pub background_color: [u8; 3],
    pub label_offset: [i32; 2],
    /// Caption height in pixels
    pub font_scale: f32,
    /// Draw `Shape: <label>` captions; outlines only when off
    pub show_captions: bool,
    /// TrueType/OpenType font for captions instead of the bundled DejaVu Sans
    pub font_path: Option<PathBuf>,
}

impl Default for AnnotationConfig {
    fn default() -> Self {
        Self {
            outline_color: [0, 252, 124],
            label_color: [0, 252, 124],
            background_color: [0, 0, 0],
            label_offset: [0, 15],
            font_scale: 16.0,
            show_captions: true,
            font_path: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = DetectorConfig::default();
        config.validate().expect("Defaults should validate");
        assert_eq!(config.noise.min_area, 1000.0);
        assert_eq!(config.classification.epsilon_factor, 0.02);
        assert_eq!(config.classification.quad_area_tolerance, 3000.0);
        assert_eq!(config.classification.circle_area_tolerance, 3000.0);
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config: DetectorConfig =
            serde_json::from_str(r#"{ "noise": { "min_area": 250.0 } }"#).expect("Should parse");
        assert_eq!(config.noise.min_area, 250.0);
        assert_eq!(config.preprocessing, PreprocessingConfig::default());
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = DetectorConfig::default();
        config.classification.epsilon_factor = 0.0;
        assert!(matches!(config.validate(), Err(ShapeError::InvalidConfig(_))));

        let mut config = DetectorConfig::default();
        config.preprocessing.canny_low = 300.0;
        assert!(config.validate().is_err());

        let mut config = DetectorConfig::default();
        config.annotation.font_scale = -1.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_blur_sigma_must_be_positive() {
        for sigma in [0.0, -0.5, f32::NAN] {
            let mut config = DetectorConfig::default();
            config.preprocessing.blur_sigma = sigma;
            assert!(
                matches!(config.validate(), Err(ShapeError::InvalidConfig(_))),
                "sigma {} accepted",
                sigma
            );
        }

        let mut config = DetectorConfig::default();
        config.preprocessing.blur_sigma = 0.3;
        assert!(config.validate().is_ok());
    }
}
