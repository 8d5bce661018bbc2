//! Geometric helpers the classifier builds on: closed-curve polygon
//! approximation, minimum-area rotated rectangle and minimum enclosing circle.

use geo_types::MultiPoint;
use imageproc::{geometry::approximate_polygon_dp, point::Point};
use crate::types::BoundingRect;

/// Douglas-Peucker approximation of a closed curve.
///
/// The ring is split at a pair of far-apart points (found by walking to the
/// farthest point a few times), each half goes through imageproc's
/// Douglas-Peucker, and the halves are joined again. A last pass drops
/// vertices lying within `epsilon / √2` of the line through their
/// neighbours while the walk continues forward, so a cut that lands on a
/// straight edge does not leave an extra vertex. Returned vertices are a
/// subset of the input points and the ring is not closed explicitly.
pub fn approximate_polygon(points: &[[i32; 2]], epsilon: f64) -> Vec<[i32; 2]> {
    let mut ring = points.to_vec();
    ring.dedup();
    while ring.len() > 1 && ring.first() == ring.last() {
        ring.pop();
    }

    if ring.len() < 3 || epsilon <= 0.0 {
        return ring;
    }

    let mut start = 0;
    for _ in 0..3 {
        start = farthest_from(&ring, ring[start]);
    }
    let end = farthest_from(&ring, ring[start]);
    if start == end {
        return vec![ring[start]];
    }

    ring.rotate_left(start);
    let end = (end + ring.len() - start) % ring.len();

    let forward: Vec<Point<i32>> = ring[..=end].iter().map(|&[x, y]| Point::new(x, y)).collect();
    let backward: Vec<Point<i32>> = ring[end..]
        .iter()
        .chain(std::iter::once(&ring[0]))
        .map(|&[x, y]| Point::new(x, y))
        .collect();

    let mut vertices = approximate_polygon_dp(&forward, epsilon, false);
    vertices.pop();
    let mut tail = approximate_polygon_dp(&backward, epsilon, false);
    tail.pop();
    vertices.extend(tail);

    let vertices = vertices.into_iter().map(|p| [p.x, p.y]).collect();
    drop_straight_vertices(vertices, epsilon)
}

fn drop_straight_vertices(mut vertices: Vec<[i32; 2]>, epsilon: f64) -> Vec<[i32; 2]> {
    let limit = epsilon * std::f64::consts::FRAC_1_SQRT_2;

    'scan: while vertices.len() > 3 {
        let n = vertices.len();
        for i in 0..n {
            let prev = vertices[(i + n - 1) % n];
            let current = vertices[i];
            let next = vertices[(i + 1) % n];

            let forward = (current[0] - prev[0]) as i64 * (next[0] - current[0]) as i64
                + (current[1] - prev[1]) as i64 * (next[1] - current[1]) as i64;
            let Some(offset) = line_distance(prev, next, current) else {
                continue;
            };
            if forward >= 0 && offset <= limit {
                vertices.remove(i);
                continue 'scan;
            }
        }
        break;
    }
    vertices
}

/// Distance from `point` to the infinite line through `a` and `b`; `None` when `a == b`
fn line_distance(a: [i32; 2], b: [i32; 2], point: [i32; 2]) -> Option<f64> {
    let (dx, dy) = ((b[0] - a[0]) as f64, (b[1] - a[1]) as f64);
    let length = (dx * dx + dy * dy).sqrt();
    if length == 0.0 {
        return None;
    }
    let cross = dx * (point[1] - a[1]) as f64 - dy * (point[0] - a[0]) as f64;
    Some(cross.abs() / length)
}

fn farthest_from(ring: &[[i32; 2]], origin: [i32; 2]) -> usize {
    let mut best = 0;
    let mut best_distance = -1i64;
    for (i, p) in ring.iter().enumerate() {
        let dx = (p[0] - origin[0]) as i64;
        let dy = (p[1] - origin[1]) as i64;
        let distance = dx * dx + dy * dy;
        if distance > best_distance {
            best = i;
            best_distance = distance;
        }
    }
    best
}

/// Minimum-area rectangle around a point set, in any orientation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RotatedRect {
    pub corners: [[f64; 2]; 4],
    pub width: f64,
    pub height: f64,
}

impl RotatedRect {
    /// Fit the rectangle with geo's rotating-calipers implementation.
    /// `None` when the point set has no usable hull.
    pub fn fit(points: &[[i32; 2]]) -> Option<Self> {
        use geo::MinimumRotatedRect;

        if points.is_empty() {
            return None;
        }

        let multi_point: MultiPoint<f64> = points
            .iter()
            .map(|&[x, y]| (x as f64, y as f64))
            .collect::<Vec<_>>()
            .into();
        let rect = multi_point.minimum_rotated_rect()?;
        let ring = &rect.exterior().0;
        if ring.len() < 4 {
            return None;
        }

        let corners = [
            [ring[0].x, ring[0].y],
            [ring[1].x, ring[1].y],
            [ring[2].x, ring[2].y],
            [ring[3].x, ring[3].y],
        ];

        Some(Self {
            corners,
            width: distance(corners[0], corners[1]),
            height: distance(corners[1], corners[2]),
        })
    }

    /// Long side over short side, so always ≥ 1 for a non-degenerate rectangle
    pub fn aspect_ratio(&self) -> f64 {
        let long = self.width.max(self.height);
        let short = self.width.min(self.height);
        if short <= f64::EPSILON {
            return f64::INFINITY;
        }
        long / short
    }

    /// Axis-aligned pixel rectangle covering all four corners
    pub fn bounding_rect(&self) -> BoundingRect {
        BoundingRect::enclosing(self.corners)
    }
}

/// Smallest circle containing a point set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Circle {
    pub center: [f64; 2],
    pub radius: f64,
}

impl Circle {
    fn from_diameter(a: [f64; 2], b: [f64; 2]) -> Self {
        Self {
            center: [(a[0] + b[0]) / 2.0, (a[1] + b[1]) / 2.0],
            radius: distance(a, b) / 2.0,
        }
    }

    fn through(a: [f64; 2], b: [f64; 2], c: [f64; 2]) -> Self {
        let d = 2.0 * (a[0] * (b[1] - c[1]) + b[0] * (c[1] - a[1]) + c[0] * (a[1] - b[1]));
        if d.abs() < 1e-12 {
            // Collinear: the circle spans the two outermost points
            let candidates = [
                Self::from_diameter(a, b),
                Self::from_diameter(a, c),
                Self::from_diameter(b, c),
            ];
            return candidates
                .into_iter()
                .fold(candidates[0], |widest, candidate| {
                    if candidate.radius > widest.radius { candidate } else { widest }
                });
        }

        let a2 = a[0] * a[0] + a[1] * a[1];
        let b2 = b[0] * b[0] + b[1] * b[1];
        let c2 = c[0] * c[0] + c[1] * c[1];
        let center = [
            (a2 * (b[1] - c[1]) + b2 * (c[1] - a[1]) + c2 * (a[1] - b[1])) / d,
            (a2 * (c[0] - b[0]) + b2 * (a[0] - c[0]) + c2 * (b[0] - a[0])) / d,
        ];
        Self {
            center,
            radius: distance(center, a),
        }
    }

    pub fn contains(&self, point: [f64; 2]) -> bool {
        distance(self.center, point) <= self.radius + 1e-7 * self.radius.max(1.0)
    }

    pub fn area(&self) -> f64 {
        std::f64::consts::PI * self.radius * self.radius
    }

    /// Incremental Welzl construction. Intended for the handful of vertices
    /// of a simplified polygon; worst case is cubic in the point count.
    pub fn enclosing(points: &[[i32; 2]]) -> Option<Self> {
        let points: Vec<[f64; 2]> = points.iter().map(|&[x, y]| [x as f64, y as f64]).collect();
        let (&first, _) = points.split_first()?;

        let mut circle = Self { center: first, radius: 0.0 };
        for i in 1..points.len() {
            if circle.contains(points[i]) {
                continue;
            }
            circle = Self { center: points[i], radius: 0.0 };
            for j in 0..i {
                if circle.contains(points[j]) {
                    continue;
                }
                circle = Self::from_diameter(points[i], points[j]);
                for k in 0..j {
                    if !circle.contains(points[k]) {
                        circle = Self::through(points[i], points[j], points[k]);
                    }
                }
            }
        }

        Some(circle)
    }
}

fn distance(a: [f64; 2], b: [f64; 2]) -> f64 {
    let dx = b[0] - a[0];
    let dy = b[1] - a[1];
    (dx * dx + dy * dy).sqrt()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::types::Contour;

    /// Pixel chain along the edges of a polygon, one point per unit step.
    pub(crate) fn trace_polygon(vertices: &[[f64; 2]]) -> Vec<[i32; 2]> {
        let mut chain: Vec<[i32; 2]> = Vec::new();
        for (i, &start) in vertices.iter().enumerate() {
            let end = vertices[(i + 1) % vertices.len()];
            let steps = distance(start, end).ceil().max(1.0) as usize;
            for step in 0..steps {
                let t = step as f64 / steps as f64;
                let point = [
                    (start[0] + (end[0] - start[0]) * t).round() as i32,
                    (start[1] + (end[1] - start[1]) * t).round() as i32,
                ];
                if chain.last() != Some(&point) {
                    chain.push(point);
                }
            }
        }
        chain
    }

    pub(crate) fn regular_polygon(sides: usize, radius: f64, center: [f64; 2], phase: f64) -> Vec<[f64; 2]> {
        (0..sides)
            .map(|i| {
                let angle = phase + i as f64 * std::f64::consts::TAU / sides as f64;
                [center[0] + radius * angle.cos(), center[1] + radius * angle.sin()]
            })
            .collect()
    }

    #[test]
    fn test_approximate_square_chain() {
        let chain = trace_polygon(&[[0.0, 0.0], [99.0, 0.0], [99.0, 99.0], [0.0, 99.0]]);
        let polygon = approximate_polygon(&chain, 0.02 * 396.0);

        assert_eq!(polygon.len(), 4);
        for corner in [[0, 0], [99, 0], [99, 99], [0, 99]] {
            assert!(polygon.contains(&corner), "missing corner {:?} in {:?}", corner, polygon);
        }
    }

    #[test]
    fn test_approximate_keeps_small_inputs() {
        assert_eq!(approximate_polygon(&[], 1.0), Vec::<[i32; 2]>::new());
        assert_eq!(approximate_polygon(&[[1, 1], [1, 1]], 1.0), vec![[1, 1]]);
        assert_eq!(approximate_polygon(&[[0, 0], [5, 0]], 1.0), vec![[0, 0], [5, 0]]);
    }

    #[test]
    fn test_approximate_thin_line_collapses_to_two_vertices() {
        let mut chain: Vec<[i32; 2]> = (0..50).map(|x| [x, 10]).collect();
        chain.extend((1..49).rev().map(|x| [x, 10]));
        let polygon = approximate_polygon(&chain, 2.0);
        assert_eq!(polygon.len(), 2);
    }

    #[test]
    fn test_cut_on_a_straight_edge_leaves_no_extra_vertex() {
        // The far-point cut lands mid-edge on this pentagon
        let chain = trace_polygon(&regular_polygon(5, 150.0, [200.0, 200.0], 0.1));
        let perimeter = Contour::new(chain.clone()).perimeter();
        let polygon = approximate_polygon(&chain, 0.02 * perimeter);
        assert_eq!(polygon.len(), 5, "{:?}", polygon);
    }

    #[test]
    fn test_regular_polygons_keep_their_corners() {
        for sides in 3..=8 {
            for radius in [40.0, 75.0, 110.0, 150.0, 180.0] {
                for phase in [0.0, 0.1, 0.37, 0.8, 1.3] {
                    let chain = trace_polygon(&regular_polygon(sides, radius, [250.0, 250.0], phase));
                    let perimeter = Contour::new(chain.clone()).perimeter();
                    let polygon = approximate_polygon(&chain, 0.02 * perimeter);
                    assert_eq!(
                        polygon.len(),
                        sides,
                        "{} sides, radius {}, phase {}: {:?}",
                        sides,
                        radius,
                        phase,
                        polygon
                    );
                }
            }
        }
    }

    #[test]
    fn test_straight_vertices_are_dropped() {
        let polygon = drop_straight_vertices(vec![[0, 0], [50, 1], [100, 0], [100, 100], [0, 100]], 4.0);
        assert_eq!(polygon, vec![[0, 0], [100, 0], [100, 100], [0, 100]]);

        // A spike doubling back is a real corner, not a straight run
        let spike = drop_straight_vertices(vec![[0, 0], [100, 0], [50, 0], [50, 50]], 4.0);
        assert_eq!(spike.len(), 4);
    }

    #[test]
    fn test_rotated_rect_of_axis_aligned_rectangle() {
        let rect = RotatedRect::fit(&[[0, 0], [200, 0], [200, 100], [0, 100]])
            .expect("rectangle has a hull");
        assert!((rect.aspect_ratio() - 2.0).abs() < 1e-6);
        assert!((rect.width * rect.height - 20000.0).abs() < 1e-3);
    }

    #[test]
    fn test_rotated_rect_of_diamond() {
        let rect = RotatedRect::fit(&[[50, 0], [100, 50], [50, 100], [0, 50]])
            .expect("diamond has a hull");
        assert!((rect.aspect_ratio() - 1.0).abs() < 1e-6);
        // The rotated square's axis-aligned cover is the full 100x100 box
        let bounds = rect.bounding_rect();
        assert!(bounds.width >= 101 && bounds.width <= 103);
    }

    #[test]
    fn test_enclosing_circle_of_square() {
        let circle = Circle::enclosing(&[[0, 0], [10, 0], [10, 10], [0, 10]]).expect("non-empty");
        assert!((circle.center[0] - 5.0).abs() < 1e-9);
        assert!((circle.center[1] - 5.0).abs() < 1e-9);
        assert!((circle.radius - 50f64.sqrt()).abs() < 1e-9);
    }

    #[test]
    fn test_enclosing_circle_of_triangle_and_degenerate_sets() {
        let circle = Circle::enclosing(&[[0, 0], [10, 0], [5, 8]]).expect("non-empty");
        for p in [[0.0, 0.0], [10.0, 0.0], [5.0, 8.0]] {
            assert!(circle.contains(p));
        }
        assert!(circle.radius < 6.0);

        let line = Circle::enclosing(&[[0, 0], [4, 0], [8, 0]]).expect("non-empty");
        assert!((line.radius - 4.0).abs() < 1e-9);

        assert!(Circle::enclosing(&[]).is_none());
    }

    #[test]
    fn test_enclosing_circle_of_regular_octagon() {
        let vertices: Vec<[i32; 2]> = regular_polygon(8, 50.0, [100.0, 100.0], 0.0)
            .into_iter()
            .map(|[x, y]| [x.round() as i32, y.round() as i32])
            .collect();
        let circle = Circle::enclosing(&vertices).expect("non-empty");
        assert!((circle.radius - 50.0).abs() < 1.0);
    }
}
