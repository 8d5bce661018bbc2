use image::{GrayImage, RgbImage};
use imageproc::distance_transform::Norm;
use crate::{
    config::PreprocessingConfig,
    error::{Result, ShapeError},
    traits::FramePreprocessor,
};

fn ensure_not_empty(frame: &RgbImage) -> Result<()> {
    let (width, height) = frame.dimensions();
    if width == 0 || height == 0 {
        return Err(ShapeError::EmptyFrame { width, height });
    }
    Ok(())
}

/// Blur, grayscale, Canny, dilate: the classic edge-mask recipe.
#[derive(Debug, Clone)]
pub struct EdgeMaskPreprocessor {
    pub blur_sigma: f32,
    pub canny_low: f32,
    pub canny_high: f32,
    /// Chessboard radius of the dilation; 1 means a 3x3 square kernel
    pub dilate_radius: u8,
}

impl Default for EdgeMaskPreprocessor {
    fn default() -> Self {
        Self::from(&PreprocessingConfig::default())
    }
}

impl From<&PreprocessingConfig> for EdgeMaskPreprocessor {
    fn from(config: &PreprocessingConfig) -> Self {
        Self {
            blur_sigma: config.blur_sigma,
            canny_low: config.canny_low,
            canny_high: config.canny_high,
            dilate_radius: config.dilate_radius,
        }
    }
}

impl FramePreprocessor for EdgeMaskPreprocessor {
    fn preprocess(&self, frame: &RgbImage) -> Result<GrayImage> {
        ensure_not_empty(frame)?;
        let blurred = if self.blur_sigma > 0.0 {
            imageproc::filter::gaussian_blur_f32(frame, self.blur_sigma)
        } else {
            frame.clone()
        };
        let gray = image::imageops::grayscale(&blurred);
        let edges = imageproc::edges::canny(&gray, self.canny_low, self.canny_high);

        if self.dilate_radius == 0 {
            return Ok(edges);
        }
        Ok(imageproc::morphology::dilate(&edges, Norm::LInf, self.dilate_radius))
    }
}

/// Treats the frame's luminance as an already-binary mask.
///
/// Useful when frames come from a segmentation step rather than a camera.
#[derive(Debug, Clone)]
pub struct ThresholdPreprocessor {
    pub threshold: u8,
}

impl Default for ThresholdPreprocessor {
    fn default() -> Self {
        Self { threshold: 128 }
    }
}

impl FramePreprocessor for ThresholdPreprocessor {
    fn preprocess(&self, frame: &RgbImage) -> Result<GrayImage> {
        ensure_not_empty(frame)?;
        let gray = image::imageops::grayscale(frame);
        Ok(imageproc::contrast::threshold(&gray, self.threshold))
    }
}
