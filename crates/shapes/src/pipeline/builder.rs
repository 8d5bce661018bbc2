use crate::{
    pipeline::ShapePipeline,
    traits::{ContourExtractor, ContourFilter, FramePreprocessor, ShapeClassifier},
    algorithms::{
        Annotator,
        AreaNoiseFilter,
        EdgeMaskPreprocessor,
        ExternalContourExtractor,
        ThresholdPreprocessor,
        VertexCountClassifier,
    },
    config::DetectorConfig,
    error::Result,
};

/// Builder for creating shape pipelines with a fluent API
pub struct PipelineBuilder {
    preprocessor: Option<Box<dyn FramePreprocessor>>,
    contour_extractor: Option<Box<dyn ContourExtractor>>,
    filters: Vec<Box<dyn ContourFilter>>,
    classifier: Option<Box<dyn ShapeClassifier>>,
    annotator: Option<Annotator>,
}

impl PipelineBuilder {
    /// Create a new pipeline builder
    pub fn new() -> Self {
        Self {
            preprocessor: None,
            contour_extractor: None,
            filters: Vec::new(),
            classifier: None,
            annotator: None,
        }
    }

    /// Start from a full detector configuration.
    ///
    /// Fails when the configuration is invalid or its font cannot be loaded.
    pub fn from_config(config: &DetectorConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::new()
            .set_preprocessor(EdgeMaskPreprocessor::from(&config.preprocessing))
            .add_filter(AreaNoiseFilter::from(&config.noise))
            .set_classifier(VertexCountClassifier::new(config.classification.clone()))
            .set_annotator(Annotator::from_config(&config.annotation)?))
    }

    /// Set the frame preprocessor (replaces any existing one)
    pub fn set_preprocessor<P>(mut self, preprocessor: P) -> Self
    where
        P: FramePreprocessor + 'static,
    {
        self.preprocessor = Some(Box::new(preprocessor));
        self
    }

    /// Treat frames as ready-made masks, thresholded at `threshold`
    pub fn with_threshold_mask(self, threshold: u8) -> Self {
        self.set_preprocessor(ThresholdPreprocessor { threshold })
    }

    /// Set the contour extractor (replaces any existing one)
    pub fn set_contour_extractor<E>(mut self, extractor: E) -> Self
    where
        E: ContourExtractor + 'static,
    {
        self.contour_extractor = Some(Box::new(extractor));
        self
    }

    /// Add a contour filter; filters run in insertion order
    pub fn add_filter<F>(mut self, filter: F) -> Self
    where
        F: ContourFilter + 'static,
    {
        self.filters.push(Box::new(filter));
        self
    }

    /// Drop contours with area at or below `min_area` pixel²
    pub fn with_min_area(self, min_area: f64) -> Self {
        self.add_filter(AreaNoiseFilter::new(min_area))
    }

    /// Set the shape classifier (replaces any existing one)
    pub fn set_classifier<C>(mut self, classifier: C) -> Self
    where
        C: ShapeClassifier + 'static,
    {
        self.classifier = Some(Box::new(classifier));
        self
    }

    pub fn set_annotator(mut self, annotator: Annotator) -> Self {
        self.annotator = Some(annotator);
        self
    }

    /// Build the pipeline with default components if not specified.
    ///
    /// Without any filter, the default area noise filter is installed.
    pub fn build(self) -> ShapePipeline {
        let preprocessor = self.preprocessor
            .unwrap_or_else(|| Box::new(EdgeMaskPreprocessor::default()));

        let contour_extractor = self.contour_extractor
            .unwrap_or_else(|| Box::new(ExternalContourExtractor));

        let mut filters = self.filters;
        if filters.is_empty() {
            filters.push(Box::new(AreaNoiseFilter::default()));
        }

        let classifier = self.classifier
            .unwrap_or_else(|| Box::new(VertexCountClassifier::default()));

        ShapePipeline::new(
            preprocessor,
            contour_extractor,
            filters,
            classifier,
            self.annotator.unwrap_or_default(),
        )
    }
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}
