//! Contour measurements over integer pixel points. Area and arc length come
//! from `imageproc::geometry`; circularity, bounding boxes and the closed
//! Douglas-Peucker approximation live here.

use imageproc::point::Point;
use std::f64::consts::PI;

pub use imageproc::geometry::{arc_length, contour_area};

use crate::pipeline::types::BoundingBox;

/// `4π·area / perimeter²`; 1.0 for a perfect circle.
pub fn circularity(area: f64, perimeter: f64) -> f64 {
    if perimeter <= 0.0 {
        return 0.0;
    }
    4.0 * PI * area / (perimeter * perimeter)
}

/// Inclusive pixel bounds of a point set.
pub fn bounding_box(points: &[Point<i32>]) -> BoundingBox {
    let Some(first) = points.first() else {
        return BoundingBox::new(0, 0, 0, 0);
    };
    let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);
    for p in points {
        min_x = min_x.min(p.x);
        min_y = min_y.min(p.y);
        max_x = max_x.max(p.x);
        max_y = max_y.max(p.y);
    }
    BoundingBox::new(
        min_x,
        min_y,
        (max_x - min_x + 1) as u32,
        (max_y - min_y + 1) as u32,
    )
}

/// Douglas-Peucker simplification of a closed curve.
///
/// `imageproc::geometry::approximate_polygon_dp` anchors a closed curve on its
/// first and last points, which are neighbours on a traced contour, and panics
/// for a non-positive epsilon. This variant anchors on the first point and the
/// point farthest from it, and accepts any epsilon.
///
/// The curve is split at the point farthest from its first point and each
/// half is simplified independently, so the result keeps both anchors. Points
/// are returned in contour order without repeating the first point.
pub fn approximate_polygon(points: &[Point<i32>], epsilon: f64) -> Vec<Point<i32>> {
    let n = points.len();
    if n < 3 {
        return points.to_vec();
    }

    let start = points[0];
    let mut far = 0;
    let mut far_distance = 0.0;
    for (i, p) in points.iter().enumerate().skip(1) {
        let d = distance(start, *p);
        if d > far_distance {
            far_distance = d;
            far = i;
        }
    }
    if far == 0 {
        return vec![start];
    }

    let mut keep = vec![false; n];
    keep[0] = true;
    keep[far] = true;
    // index n stands for the first point again, closing the curve
    let mut pending = vec![(0, far), (far, n)];
    while let Some((first, last)) = pending.pop() {
        if last - first < 2 {
            continue;
        }
        let a = points[first % n];
        let b = points[last % n];
        let mut split = first;
        let mut max_distance = 0.0;
        for i in first + 1..last {
            let d = segment_distance(points[i], a, b);
            if d > max_distance {
                max_distance = d;
                split = i;
            }
        }
        if max_distance > epsilon {
            keep[split] = true;
            pending.push((split, last));
            pending.push((first, split));
        }
    }

    points
        .iter()
        .zip(keep)
        .filter_map(|(p, kept)| kept.then_some(*p))
        .collect()
}

fn distance(a: Point<i32>, b: Point<i32>) -> f64 {
    let dx = (b.x - a.x) as f64;
    let dy = (b.y - a.y) as f64;
    dx.hypot(dy)
}

/// Perpendicular distance from `p` to the line through `a` and `b`.
fn segment_distance(p: Point<i32>, a: Point<i32>, b: Point<i32>) -> f64 {
    let length = distance(a, b);
    if length == 0.0 {
        return distance(a, p);
    }
    let cross = (b.x - a.x) as f64 * (p.y - a.y) as f64 - (b.y - a.y) as f64 * (p.x - a.x) as f64;
    cross.abs() / length
}
