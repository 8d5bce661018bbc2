use crate::{
    algorithms::geometry::{approximate_polygon, Circle, RotatedRect},
    config::ClassificationConfig,
    error::Result,
    traits::ShapeClassifier,
    types::{Contour, ShapeLabel},
};

/// One row of the vertex-count decision table.
///
/// Each row either names its label outright or defers to a geometric
/// tie-break evaluated against the simplified polygon.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VertexRule {
    Fixed(ShapeLabel),
    /// Square, rectangle or generic quadrilateral
    Quadrilateral,
    /// Octagon or circle
    Octagonal,
    /// No dedicated rule; labelled with the raw vertex count
    Fallback(usize),
}

impl VertexRule {
    pub fn for_vertex_count(vertices: usize) -> Self {
        match vertices {
            3 => VertexRule::Fixed(ShapeLabel::Triangle),
            4 => VertexRule::Quadrilateral,
            5 => VertexRule::Fixed(ShapeLabel::Pentagon),
            6 => VertexRule::Fixed(ShapeLabel::Hexagon),
            7 => VertexRule::Fixed(ShapeLabel::Heptagon),
            8 => VertexRule::Octagonal,
            sides => VertexRule::Fallback(sides),
        }
    }

    pub fn resolve(self, polygon: &[[i32; 2]], contour_area: f64, config: &ClassificationConfig) -> ShapeLabel {
        match self {
            VertexRule::Fixed(label) => label,
            VertexRule::Quadrilateral => {
                quadrilateral_label(polygon, contour_area, config.quad_area_tolerance)
            }
            VertexRule::Octagonal => {
                octagonal_label(polygon, contour_area, config.circle_area_tolerance)
            }
            VertexRule::Fallback(sides) => ShapeLabel::Polygon { sides },
        }
    }
}

/// Tie-break for four vertices.
///
/// A quad whose rotated bounding rectangle covers noticeably more than the
/// contour (by more than `tolerance` pixel² once snapped to the pixel grid)
/// is a generic quadrilateral. Otherwise the rounded long/short side ratio
/// separates squares from rectangles.
pub fn quadrilateral_label(polygon: &[[i32; 2]], contour_area: f64, tolerance: f64) -> ShapeLabel {
    let Some(rect) = RotatedRect::fit(polygon) else {
        return ShapeLabel::Quadrilateral;
    };

    let discrepancy = rect.bounding_rect().area() - contour_area;
    if discrepancy > tolerance {
        return ShapeLabel::Quadrilateral;
    }

    if rect.aspect_ratio().round() == 1.0 {
        ShapeLabel::Square
    } else {
        ShapeLabel::Rectangle
    }
}

/// Tie-break for eight vertices: round enough to fill its enclosing circle
/// within `tolerance` pixel² means circle, otherwise octagon.
pub fn octagonal_label(polygon: &[[i32; 2]], contour_area: f64, tolerance: f64) -> ShapeLabel {
    match Circle::enclosing(polygon) {
        Some(circle) if circle.area() - contour_area < tolerance => ShapeLabel::Circle,
        _ => ShapeLabel::Octagon,
    }
}

/// Labels a contour from the vertex count of its polygon approximation.
#[derive(Debug, Clone, Default)]
pub struct VertexCountClassifier {
    pub config: ClassificationConfig,
}

impl VertexCountClassifier {
    pub fn new(config: ClassificationConfig) -> Self {
        Self { config }
    }

    /// Polygon approximation with a tolerance proportional to the perimeter
    pub fn simplify(&self, contour: &Contour) -> Vec<[i32; 2]> {
        let epsilon = self.config.epsilon_factor * contour.perimeter();
        approximate_polygon(&contour.points, epsilon)
    }

    /// Apply the decision table to an already simplified polygon
    pub fn decide(&self, polygon: &[[i32; 2]], contour_area: f64) -> ShapeLabel {
        VertexRule::for_vertex_count(polygon.len()).resolve(polygon, contour_area, &self.config)
    }
}

impl ShapeClassifier for VertexCountClassifier {
    fn classify(&self, contour: &Contour, area: f64) -> Result<(ShapeLabel, usize)> {
        let polygon = self.simplify(contour);
        let label = self.decide(&polygon, area);

        tracing::debug!(
            points = contour.len(),
            vertices = polygon.len(),
            area,
            %label,
            "contour classified"
        );

        Ok((label, polygon.len()))
    }
}
