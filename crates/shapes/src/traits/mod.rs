use image::{GrayImage, RgbImage};
use crate::{error::Result, types::{Contour, ShapeLabel}};

/// Trait for turning a raw color frame into a binary edge mask
pub trait FramePreprocessor: Send + Sync {
    /// Produce an edge mask with the same dimensions as the frame
    fn preprocess(&self, frame: &RgbImage) -> Result<GrayImage>;
}

/// Trait for contour extraction algorithms
pub trait ContourExtractor: Send + Sync {
    /// Extract contours from a binary image
    fn extract_contours(&self, mask: &GrayImage) -> Result<Vec<Contour>>;
}

/// Trait for discarding contours before classification
pub trait ContourFilter: Send + Sync {
    /// Keep only the contours worth classifying
    fn filter(&self, contours: Vec<Contour>) -> Result<Vec<Contour>>;
}

/// Trait for shape classification algorithms
pub trait ShapeClassifier: Send + Sync {
    /// Label a contour. `area` is the contour's own area in pixel².
    /// Returns the label and the vertex count the decision was based on.
    fn classify(&self, contour: &Contour, area: f64) -> Result<(ShapeLabel, usize)>;
}
