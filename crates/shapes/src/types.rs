use std::fmt;

use geo_types::{Coord, LineString, Polygon};
use imageproc::{geometry::arc_length, point::Point};
use serde::{Deserialize, Serialize};
use strum::AsRefStr;

/// A closed boundary traced from an edge mask.
///
/// Points are pixel coordinates in tracing order. The ring is implicitly
/// closed; the first point is not repeated at the end.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contour {
    pub points: Vec<[i32; 2]>,
}

impl Contour {
    pub fn new(points: Vec<[i32; 2]>) -> Self {
        Self { points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Convert to geo-types Polygon for geometric operations
    pub fn to_geo_polygon(&self) -> Polygon<f64> {
        let coords: Vec<Coord<f64>> = self
            .points
            .iter()
            .map(|&[x, y]| Coord {
                x: x as f64,
                y: y as f64,
            })
            .collect();

        Polygon::new(LineString::new(coords), vec![])
    }

    /// Enclosed area in pixel², shoelace over the point chain
    pub fn area(&self) -> f64 {
        use geo::Area;
        if self.points.len() < 3 {
            return 0.0;
        }
        self.to_geo_polygon().unsigned_area()
    }

    /// Closed arc length, including the segment back to the first point
    pub fn perimeter(&self) -> f64 {
        let points: Vec<Point<i32>> = self.points.iter().map(|&[x, y]| Point::new(x, y)).collect();
        arc_length(&points, true)
    }

    /// Axis-aligned bounding box with inclusive pixel extents
    pub fn bounding_rect(&self) -> BoundingRect {
        BoundingRect::enclosing(self.points.iter().map(|&[x, y]| [x as f64, y as f64]))
    }
}

/// Axis-aligned rectangle in pixel units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BoundingRect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl BoundingRect {
    /// Smallest pixel rectangle covering every point. Fractional extents are
    /// floored at the low edge and ceiled at the high edge; both edges are
    /// inclusive, so a single point yields a 1x1 rectangle.
    pub fn enclosing<I>(points: I) -> Self
    where
        I: IntoIterator<Item = [f64; 2]>,
    {
        let mut min_x = f64::INFINITY;
        let mut min_y = f64::INFINITY;
        let mut max_x = f64::NEG_INFINITY;
        let mut max_y = f64::NEG_INFINITY;

        for [x, y] in points {
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);
        }

        if !min_x.is_finite() || !min_y.is_finite() {
            return Self::default();
        }

        let x = min_x.floor() as i32;
        let y = min_y.floor() as i32;
        Self {
            x,
            y,
            width: (max_x.ceil() as i32 - x + 1) as u32,
            height: (max_y.ceil() as i32 - y + 1) as u32,
        }
    }

    pub fn area(&self) -> f64 {
        self.width as f64 * self.height as f64
    }

    pub fn right(&self) -> i32 {
        self.x + self.width as i32
    }

    pub fn bottom(&self) -> i32 {
        self.y + self.height as i32
    }
}

/// Result of classifying a single contour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "lowercase")]
pub enum ShapeLabel {
    Triangle,
    Square,
    Rectangle,
    Quadrilateral,
    Pentagon,
    Hexagon,
    Heptagon,
    Octagon,
    Circle,
    /// Any vertex count without a dedicated rule, including degenerate 0–2
    Polygon { sides: usize },
}

impl fmt::Display for ShapeLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShapeLabel::Polygon { sides } => write!(f, "{}-sided polygon", sides),
            named => f.write_str(named.as_ref()),
        }
    }
}

/// A contour that survived noise filtering, together with its label.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifiedRegion {
    pub contour: Contour,
    pub bounding_rect: BoundingRect,
    pub label: ShapeLabel,
    /// Contour area in pixel²
    pub area: f64,
    /// Vertex count of the simplified polygon
    pub vertices: usize,
}

/// All detections from one frame.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FrameDetections {
    pub regions: Vec<ClassifiedRegion>,
    /// Original image dimensions
    pub image_width: u32,
    pub image_height: u32,
}

impl FrameDetections {
    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn labels(&self) -> Vec<ShapeLabel> {
        self.regions.iter().map(|region| region.label).collect()
    }

    /// Count of regions per label, in first-seen order
    pub fn label_counts(&self) -> Vec<(ShapeLabel, usize)> {
        let mut counts: Vec<(ShapeLabel, usize)> = Vec::new();
        for region in &self.regions {
            match counts.iter_mut().find(|(label, _)| *label == region.label) {
                Some((_, count)) => *count += 1,
                None => counts.push((region.label, 1)),
            }
        }
        counts
    }

    pub fn to_json(&self) -> crate::error::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(side: i32) -> Contour {
        Contour::new(vec![[0, 0], [side, 0], [side, side], [0, side]])
    }

    #[test]
    fn test_contour_area_and_perimeter() {
        let contour = square(10);
        assert!((contour.area() - 100.0).abs() < 1e-9);
        assert!((contour.perimeter() - 40.0).abs() < 1e-9);
    }

    #[test]
    fn test_degenerate_contour_has_no_area() {
        let contour = Contour::new(vec![[3, 3], [9, 3]]);
        assert_eq!(contour.area(), 0.0);
        // Two points are an open segment, not a ring
        assert!((contour.perimeter() - 6.0).abs() < 1e-9);
        assert_eq!(Contour::new(vec![]).perimeter(), 0.0);
    }

    #[test]
    fn test_bounding_rect_is_inclusive() {
        let rect = square(10).bounding_rect();
        assert_eq!(rect, BoundingRect { x: 0, y: 0, width: 11, height: 11 });
        assert_eq!(rect.right(), 11);
        assert_eq!(rect.bottom(), 11);
    }

    #[test]
    fn test_bounding_rect_of_fractional_points() {
        let rect = BoundingRect::enclosing([[0.4, 1.6], [9.2, 5.0]]);
        assert_eq!(rect, BoundingRect { x: 0, y: 1, width: 11, height: 5 });
        assert_eq!(BoundingRect::enclosing(Vec::<[f64; 2]>::new()), BoundingRect::default());
    }

    #[test]
    fn test_label_display() {
        assert_eq!(ShapeLabel::Triangle.to_string(), "triangle");
        assert_eq!(ShapeLabel::Quadrilateral.to_string(), "quadrilateral");
        assert_eq!(ShapeLabel::Polygon { sides: 9 }.to_string(), "9-sided polygon");
        assert_eq!(ShapeLabel::Polygon { sides: 2 }.to_string(), "2-sided polygon");
    }

    #[test]
    fn test_label_counts() {
        let region = |label| ClassifiedRegion {
            contour: square(40),
            bounding_rect: BoundingRect::default(),
            label,
            area: 1600.0,
            vertices: 4,
        };
        let detections = FrameDetections {
            regions: vec![
                region(ShapeLabel::Square),
                region(ShapeLabel::Circle),
                region(ShapeLabel::Square),
            ],
            image_width: 100,
            image_height: 100,
        };

        assert_eq!(
            detections.label_counts(),
            vec![(ShapeLabel::Square, 2), (ShapeLabel::Circle, 1)]
        );
    }
}
