//! # Shape Detection Library
//!
//! Finds closed outlines in camera frames and labels each one as a triangle,
//! square, rectangle, quadrilateral, pentagon, hexagon, heptagon, octagon,
//! circle or n-sided polygon.
//!
//! ## Pipeline
//!
//! 1. **Preprocess**: blur, grayscale, Canny edges, dilate → binary edge mask
//! 2. **Extract**: outermost contours of the mask
//! 3. **Filter**: drop noise contours (area ≤ 1000 px² by default)
//! 4. **Classify**: polygon-approximate each contour and apply a vertex-count
//!    decision table with geometric tie-breaks for 4 and 8 vertices
//! 5. **Annotate**: draw outlines and `Shape: <label>` captions
//!
//! Each frame is processed independently.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use shapes::ShapePipeline;
//!
//! let pipeline = ShapePipeline::builder().build();
//!
//! let mut frame = image::open("frame.png")?.to_rgb8();
//! let detections = pipeline.annotate_frame(&mut frame)?;
//! for region in &detections.regions {
//!     println!("{} at {:?}", region.label, region.bounding_rect);
//! }
//! frame.save("annotated.png")?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## From configuration
//!
//! ```rust,no_run
//! use shapes::{DetectorConfig, PipelineBuilder};
//!
//! let mut config = DetectorConfig::default();
//! config.noise.min_area = 1500.0;
//! // Captions use the bundled DejaVu Sans unless another font is given
//! config.annotation.font_path = Some("/usr/share/fonts/truetype/freefont/FreeSans.ttf".into());
//!
//! let pipeline = PipelineBuilder::from_config(&config)?.build();
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

// Core modules
pub mod error;
pub mod types;
pub mod traits;
pub mod config;
pub mod algorithms;
pub mod pipeline;

// Re-exports for convenience
pub use error::{ShapeError, Result};
pub use types::{BoundingRect, ClassifiedRegion, Contour, FrameDetections, ShapeLabel};
pub use traits::*;
pub use config::{AnnotationConfig, ClassificationConfig, DetectorConfig, NoiseConfig, PreprocessingConfig};
pub use algorithms::*;
pub use pipeline::{ShapePipeline, builder::PipelineBuilder};
