use crate::{config::NoiseConfig, error::Result, traits::ContourFilter, types::Contour};

/// Drops contours whose enclosed area does not exceed `min_area`.
///
/// Tiny contours come from sensor noise and compression artifacts, so they
/// never reach classification or annotation.
#[derive(Debug, Clone)]
pub struct AreaNoiseFilter {
    /// Exclusive lower bound in pixel²
    pub min_area: f64,
}

impl AreaNoiseFilter {
    pub fn new(min_area: f64) -> Self {
        Self { min_area }
    }

    pub fn is_noise(&self, contour: &Contour) -> bool {
        contour.area() <= self.min_area
    }
}

impl Default for AreaNoiseFilter {
    fn default() -> Self {
        Self::from(&NoiseConfig::default())
    }
}

impl From<&NoiseConfig> for AreaNoiseFilter {
    fn from(config: &NoiseConfig) -> Self {
        Self::new(config.min_area)
    }
}

impl ContourFilter for AreaNoiseFilter {
    fn filter(&self, contours: Vec<Contour>) -> Result<Vec<Contour>> {
        let before = contours.len();
        let kept: Vec<Contour> = contours
            .into_iter()
            .filter(|contour| !self.is_noise(contour))
            .collect();

        tracing::trace!(before, after = kept.len(), "noise filter applied");
        Ok(kept)
    }
}
