use imageproc::contours::find_contours;
use imageproc::point::Point;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::color_mask_service::ColorMask;
use super::geometry::{approximate_polygon, arc_length, bounding_box, circularity, contour_area};
use crate::error::AppError;
use crate::pipeline::types::{ClassifiedShape, ShapeKind};

/// Geometric bounds a contour must satisfy before it is classified. Bounds are inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShapeFilter {
    pub min_area: f64,
    pub max_area: f64,
    pub min_perimeter: f64,
    pub max_perimeter: f64,
    /// Approximation tolerance as a fraction of the perimeter.
    pub approx_epsilon_ratio: f64,
}

impl Default for ShapeFilter {
    fn default() -> Self {
        Self {
            min_area: 500.0,
            max_area: 20_000.0,
            min_perimeter: 100.0,
            max_perimeter: 10_000.0,
            approx_epsilon_ratio: 0.02,
        }
    }
}

impl ShapeFilter {
    pub fn accepts(&self, area: f64, perimeter: f64) -> bool {
        (self.min_area..=self.max_area).contains(&area)
            && (self.min_perimeter..=self.max_perimeter).contains(&perimeter)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.min_area < 0.0 || self.min_area > self.max_area {
            return Err(AppError::Config(format!(
                "shape filter area bounds [{}, {}] are not ordered",
                self.min_area, self.max_area
            )));
        }
        if self.min_perimeter < 0.0 || self.min_perimeter > self.max_perimeter {
            return Err(AppError::Config(format!(
                "shape filter perimeter bounds [{}, {}] are not ordered",
                self.min_perimeter, self.max_perimeter
            )));
        }
        if !(self.approx_epsilon_ratio > 0.0 && self.approx_epsilon_ratio < 1.0) {
            return Err(AppError::Config(format!(
                "approximation ratio {} must be in (0, 1)",
                self.approx_epsilon_ratio
            )));
        }
        Ok(())
    }
}

/// A traced contour with the measures the classifier needs.
#[derive(Debug, Clone)]
pub struct CandidateContour {
    pub points: Vec<Point<i32>>,
    pub area: f64,
    pub perimeter: f64,
}

impl CandidateContour {
    pub fn new(points: Vec<Point<i32>>) -> Self {
        let area = contour_area(&points);
        let perimeter = arc_length(&points, true);
        Self {
            points,
            area,
            perimeter,
        }
    }

    pub fn approximate(&self, epsilon_ratio: f64) -> Vec<Point<i32>> {
        approximate_polygon(&self.points, epsilon_ratio * self.perimeter)
    }
}

/// Vertex-count classification of a polygon approximation.
pub fn classify_polygon(approx: &[Point<i32>], area: f64, perimeter: f64) -> ShapeKind {
    match approx.len() {
        3 => ShapeKind::Triangle,
        4 => {
            let ratio = bounding_box(approx).aspect_ratio();
            if ratio > 0.95 && ratio < 1.05 {
                ShapeKind::Square
            } else {
                ShapeKind::Rectangle
            }
        }
        n if n > 4 => {
            if (0.8..=1.2).contains(&circularity(area, perimeter)) {
                ShapeKind::Circle
            } else {
                ShapeKind::Polygon
            }
        }
        _ => ShapeKind::None,
    }
}

#[derive(Debug, Clone, Default)]
pub struct ShapeClassifier {
    filter: ShapeFilter,
}

impl ShapeClassifier {
    pub fn new(filter: ShapeFilter) -> Self {
        Self { filter }
    }

    pub fn filter(&self) -> &ShapeFilter {
        &self.filter
    }

    /// Traces every border of the edge mask, holes included, and classifies the survivors.
    pub fn classify(&self, mask: &ColorMask) -> Vec<ClassifiedShape> {
        let contours = find_contours::<i32>(&mask.edges);
        let shapes =
            self.classify_contours(contours.into_iter().map(|c| c.points), mask.confidence);
        if !shapes.is_empty() {
            debug!("Found {} {} shape(s)", shapes.len(), mask.color);
        }
        shapes
    }

    pub fn classify_contours<I>(&self, contours: I, confidence: f32) -> Vec<ClassifiedShape>
    where
        I: IntoIterator<Item = Vec<Point<i32>>>,
    {
        contours
            .into_iter()
            .map(CandidateContour::new)
            .filter(|c| self.filter.accepts(c.area, c.perimeter))
            .filter_map(|candidate| {
                let approx = candidate.approximate(self.filter.approx_epsilon_ratio);
                if approx.len() < 3 {
                    return None;
                }
                Some(ClassifiedShape {
                    kind: classify_polygon(&approx, candidate.area, candidate.perimeter),
                    bounding_box: bounding_box(&approx),
                    confidence,
                })
            })
            .collect()
    }
}
