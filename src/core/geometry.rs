//! Geometric primitives for page layout classification.
//!
//! This module provides the axis-aligned bounding box used throughout the
//! crate, together with the containment, overlap, distance and alignment
//! operations the classifiers score with. Coordinates are PDF points with
//! the y axis growing downward.

use serde::{Deserialize, Serialize};

/// An axis-aligned rectangle in page coordinates.
///
/// Invariants: `x0 <= x1` and `y0 <= y1`. The y axis grows downward, so
/// `y0` is the top edge and `y1` the bottom edge.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BBox {
    /// Left edge.
    pub x0: f64,
    /// Top edge.
    pub y0: f64,
    /// Right edge.
    pub x1: f64,
    /// Bottom edge.
    pub y1: f64,
}

impl BBox {
    /// Creates a new bounding box from its four edges.
    ///
    /// Returns `None` if the coordinates violate `x0 <= x1` or `y0 <= y1`;
    /// callers dealing with extractor output should drop such boxes with a
    /// warning rather than panic.
    pub fn new(x0: f64, y0: f64, x1: f64, y1: f64) -> Option<Self> {
        if x0 > x1
            || y0 > y1
            || !(x0.is_finite() && y0.is_finite() && x1.is_finite() && y1.is_finite())
        {
            return None;
        }
        Some(Self { x0, y0, x1, y1 })
    }

    /// Creates a bounding box from a `(x0, y0, x1, y1)` tuple.
    pub fn from_tuple(t: (f64, f64, f64, f64)) -> Option<Self> {
        Self::new(t.0, t.1, t.2, t.3)
    }

    /// Width of the box (non-negative).
    #[inline]
    pub fn width(&self) -> f64 {
        self.x1 - self.x0
    }

    /// Height of the box (non-negative).
    #[inline]
    pub fn height(&self) -> f64 {
        self.y1 - self.y0
    }

    /// Area of the box (non-negative).
    #[inline]
    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }

    /// Center point `(x, y)` of the box.
    #[inline]
    pub fn center(&self) -> (f64, f64) {
        ((self.x0 + self.x1) / 2.0, (self.y0 + self.y1) / 2.0)
    }

    /// Checks whether this box is fully inside `other` (edges may touch).
    pub fn fully_inside(&self, other: &BBox) -> bool {
        self.x0 >= other.x0 && self.y0 >= other.y0 && self.x1 <= other.x1 && self.y1 <= other.y1
    }

    /// Checks whether this box overlaps `other` with positive area.
    pub fn intersects(&self, other: &BBox) -> bool {
        if self.x0 >= other.x1 || other.x0 >= self.x1 {
            return false;
        }
        !(self.y0 >= other.y1 || other.y0 >= self.y1)
    }

    /// Area of the intersection with `other` (zero when disjoint).
    pub fn overlap_area(&self, other: &BBox) -> f64 {
        let w = (self.x1.min(other.x1) - self.x0.max(other.x0)).max(0.0);
        let h = (self.y1.min(other.y1) - self.y0.max(other.y0)).max(0.0);
        w * h
    }

    /// Intersection over union with `other`.
    ///
    /// Returns 0.0 when there is no overlap or the union is degenerate.
    pub fn iou(&self, other: &BBox) -> f64 {
        let inter = self.overlap_area(other);
        if inter == 0.0 {
            return 0.0;
        }
        let union = self.area() + other.area() - inter;
        if union <= 0.0 {
            return 0.0;
        }
        inter / union
    }

    /// Returns a copy grown by `margin` on every side.
    ///
    /// A negative margin shrinks the box; the result is clamped so it never
    /// inverts.
    pub fn expand(&self, margin: f64) -> BBox {
        let x0 = self.x0 - margin;
        let y0 = self.y0 - margin;
        let x1 = self.x1 + margin;
        let y1 = self.y1 + margin;
        BBox {
            x0: x0.min(x1),
            y0: y0.min(y1),
            x1: x0.max(x1),
            y1: y0.max(y1),
        }
    }

    /// Horizontal gap between the boxes (zero when their x ranges overlap).
    pub fn horizontal_distance(&self, other: &BBox) -> f64 {
        if self.x1 < other.x0 {
            other.x0 - self.x1
        } else if other.x1 < self.x0 {
            self.x0 - other.x1
        } else {
            0.0
        }
    }

    /// Vertical gap between the boxes (zero when their y ranges overlap).
    pub fn vertical_distance(&self, other: &BBox) -> f64 {
        if self.y1 < other.y0 {
            other.y0 - self.y1
        } else if other.y1 < self.y0 {
            self.y0 - other.y1
        } else {
            0.0
        }
    }

    /// Minimum Euclidean distance between the boxes (zero when touching).
    pub fn min_distance(&self, other: &BBox) -> f64 {
        let dx = self.horizontal_distance(other);
        let dy = self.vertical_distance(other);
        (dx * dx + dy * dy).sqrt()
    }

    /// Checks whether the horizontal projections overlap.
    pub fn overlaps_horizontal(&self, other: &BBox) -> bool {
        self.x0.max(other.x0) < self.x1.min(other.x1)
    }

    /// Checks whether the vertical projections overlap.
    pub fn overlaps_vertical(&self, other: &BBox) -> bool {
        self.y0.max(other.y0) < self.y1.min(other.y1)
    }

    /// Checks whether the left edges align within `tolerance`.
    pub fn left_aligned(&self, other: &BBox, tolerance: f64) -> bool {
        (self.x0 - other.x0).abs() <= tolerance
    }

    /// Smallest box containing both `self` and `other`.
    pub fn union(&self, other: &BBox) -> BBox {
        BBox {
            x0: self.x0.min(other.x0),
            y0: self.y0.min(other.y0),
            x1: self.x1.max(other.x1),
            y1: self.y1.max(other.y1),
        }
    }

    /// Smallest box containing every box in `bboxes`.
    ///
    /// Returns `None` for an empty slice.
    pub fn union_all(bboxes: &[BBox]) -> Option<BBox> {
        let (first, rest) = bboxes.split_first()?;
        Some(rest.iter().fold(*first, |acc, b| acc.union(b)))
    }

    /// Clips this box to stay within `bounds`.
    ///
    /// If the boxes are disjoint the result degenerates to a zero-area box
    /// clamped to the nearest edge of `bounds`.
    pub fn clip_to(&self, bounds: &BBox) -> BBox {
        let mut x0 = self.x0.max(bounds.x0);
        let mut y0 = self.y0.max(bounds.y0);
        let mut x1 = self.x1.min(bounds.x1);
        let mut y1 = self.y1.min(bounds.y1);
        if x0 > x1 {
            let edge = self.x0.clamp(bounds.x0, bounds.x1);
            x0 = edge;
            x1 = edge;
        }
        if y0 > y1 {
            let edge = self.y0.clamp(bounds.y0, bounds.y1);
            y0 = edge;
            y1 = edge;
        }
        BBox { x0, y0, x1, y1 }
    }

    /// Distance from this box's center to the nearest point of `other`.
    ///
    /// Zero when the center lies inside `other`. Used by the spatial cost
    /// functions, which prefer edge proximity over center-to-center
    /// distance for large diagrams.
    pub fn center_to_nearest_point(&self, other: &BBox) -> f64 {
        let (cx, cy) = self.center();
        let nx = cx.clamp(other.x0, other.x1);
        let ny = cy.clamp(other.y0, other.y1);
        ((cx - nx).powi(2) + (cy - ny).powi(2)).sqrt()
    }

    /// Checks whether the segment between `a` and `b` passes through this box.
    ///
    /// Used for divider-crossing rejection: a divider separates two
    /// elements when it intersects the segment joining their centers.
    pub fn segment_intersects(&self, a: (f64, f64), b: (f64, f64)) -> bool {
        // Liang-Barsky clipping of the segment against the box.
        let (mut t0, mut t1) = (0.0f64, 1.0f64);
        let dx = b.0 - a.0;
        let dy = b.1 - a.1;
        let checks = [
            (-dx, a.0 - self.x0),
            (dx, self.x1 - a.0),
            (-dy, a.1 - self.y0),
            (dy, self.y1 - a.1),
        ];
        for (p, q) in checks {
            if p == 0.0 {
                if q < 0.0 {
                    return false;
                }
            } else {
                let r = q / p;
                if p < 0.0 {
                    if r > t1 {
                        return false;
                    }
                    if r > t0 {
                        t0 = r;
                    }
                } else {
                    if r < t0 {
                        return false;
                    }
                    if r < t1 {
                        t1 = r;
                    }
                }
            }
        }
        t0 <= t1
    }
}

impl std::fmt::Display for BBox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "({:.1},{:.1},{:.1},{:.1})",
            self.x0, self.y0, self.x1, self.y1
        )
    }
}
