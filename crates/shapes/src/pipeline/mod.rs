pub mod builder;

use image::{GrayImage, RgbImage};
use crate::{
    algorithms::Annotator,
    error::Result,
    types::{ClassifiedRegion, FrameDetections},
    traits::{ContourExtractor, ContourFilter, FramePreprocessor, ShapeClassifier},
};

/// Frame → edge mask → contours → filtered regions → labels → overlay.
///
/// Every call is independent; nothing carries over between frames.
pub struct ShapePipeline {
    preprocessor: Box<dyn FramePreprocessor>,
    contour_extractor: Box<dyn ContourExtractor>,
    filters: Vec<Box<dyn ContourFilter>>,
    classifier: Box<dyn ShapeClassifier>,
    annotator: Annotator,
}

impl ShapePipeline {
    /// Create a new pipeline builder
    pub fn builder() -> builder::PipelineBuilder {
        builder::PipelineBuilder::new()
    }

    /// Create a new pipeline with the given components
    pub fn new(
        preprocessor: Box<dyn FramePreprocessor>,
        contour_extractor: Box<dyn ContourExtractor>,
        filters: Vec<Box<dyn ContourFilter>>,
        classifier: Box<dyn ShapeClassifier>,
        annotator: Annotator,
    ) -> Self {
        Self {
            preprocessor,
            contour_extractor,
            filters,
            classifier,
            annotator,
        }
    }

    pub fn annotator(&self) -> &Annotator {
        &self.annotator
    }

    /// Detect and classify shapes in a color frame
    pub fn process(&self, frame: &RgbImage) -> Result<FrameDetections> {
        let mask = self.preprocessor.preprocess(frame)?;
        self.classify_edge_mask(&mask)
    }

    /// Classify the shapes outlined by an existing edge mask
    pub fn classify_edge_mask(&self, mask: &GrayImage) -> Result<FrameDetections> {
        let mut contours = self.contour_extractor.extract_contours(mask)?;
        for filter in &self.filters {
            contours = filter.filter(contours)?;
        }

        let mut regions = Vec::with_capacity(contours.len());
        for contour in contours {
            let area = contour.area();
            let (label, vertices) = self.classifier.classify(&contour, area)?;
            regions.push(ClassifiedRegion {
                bounding_rect: contour.bounding_rect(),
                contour,
                label,
                area,
                vertices,
            });
        }

        Ok(FrameDetections {
            regions,
            image_width: mask.width(),
            image_height: mask.height(),
        })
    }

    /// Detect shapes and draw the overlay onto `frame` in place
    pub fn annotate_frame(&self, frame: &mut RgbImage) -> Result<FrameDetections> {
        let detections = self.process(frame)?;
        self.annotator.annotate_mut(frame, &detections);
        Ok(detections)
    }

    /// Get information about the pipeline configuration
    pub fn info(&self) -> String {
        format!(
            "Pipeline: 1 preprocessor, 1 contour extractor, {} filters, 1 classifier, captions {}",
            self.filters.len(),
            if self.annotator.has_font() { "on" } else { "off" }
        )
    }
}
