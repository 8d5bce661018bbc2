use image::GrayImage;
use imageproc::contours::BorderType;
use crate::{error::Result, traits::ContourExtractor, types::Contour};

/// Imageproc-based extractor returning only outermost boundaries.
///
/// Holes and anything nested inside another boundary are dropped, so a
/// dilated edge ring yields a single contour along its outer side.
#[derive(Debug, Clone, Default)]
pub struct ExternalContourExtractor;

impl ContourExtractor for ExternalContourExtractor {
    fn extract_contours(&self, mask: &GrayImage) -> Result<Vec<Contour>> {
        let contours = imageproc::contours::find_contours::<i32>(mask);

        let result = contours
            .into_iter()
            .filter(|contour| contour.border_type == BorderType::Outer && contour.parent.is_none())
            .map(|contour| {
                Contour::new(contour.points.iter().map(|p| [p.x, p.y]).collect())
            })
            .collect();

        Ok(result)
    }
}
