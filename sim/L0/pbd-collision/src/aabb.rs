//! Axis-aligned bounding boxes and interval overlap tests.
//!
//! All overlap tests are inclusive: boxes that merely touch on a face,
//! edge, or corner are reported as overlapping.

use nalgebra::{Point3, Vector3};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// An axis-aligned bounding box (AABB).
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Aabb {
    /// Minimum corner of the bounding box.
    pub min: Point3<f64>,
    /// Maximum corner of the bounding box.
    pub max: Point3<f64>,
}

impl Aabb {
    /// Create a new AABB from minimum and maximum corners.
    #[must_use]
    pub const fn new(min: Point3<f64>, max: Point3<f64>) -> Self {
        Self { min, max }
    }

    /// Create an AABB centered at a point with the given half-extents.
    #[must_use]
    pub fn from_center(center: Point3<f64>, half_extents: Vector3<f64>) -> Self {
        Self {
            min: center - half_extents,
            max: center + half_extents,
        }
    }

    /// Smallest box enclosing all points, in a single pass.
    ///
    /// Returns `None` for an empty iterator.
    pub fn from_points<'a, I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a Point3<f64>>,
    {
        let mut iter = points.into_iter();
        let first = *iter.next()?;
        let mut aabb = Self::new(first, first);
        for p in iter {
            aabb.include(p);
        }
        Some(aabb)
    }

    /// Grow this box to contain `p`.
    pub fn include(&mut self, p: &Point3<f64>) {
        self.min = self.min.inf(p);
        self.max = self.max.sup(p);
    }

    /// Smallest box containing both boxes.
    #[must_use]
    pub fn merged(&self, other: &Self) -> Self {
        Self {
            min: self.min.inf(&other.min),
            max: self.max.sup(&other.max),
        }
    }

    /// Expand this AABB by a margin on all sides.
    #[must_use]
    pub fn expanded(&self, margin: f64) -> Self {
        let m = Vector3::repeat(margin);
        Self {
            min: self.min - m,
            max: self.max + m,
        }
    }

    /// Check if this AABB overlaps with another AABB.
    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        (0..3).all(|i| intervals_overlap(self.min[i], self.max[i], other.min[i], other.max[i]))
    }

    /// Whether `min[i] <= max[i]` on every axis.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        (0..3).all(|i| self.min[i] <= self.max[i])
    }

    /// Returns the center point of the AABB.
    #[must_use]
    pub fn center(&self) -> Point3<f64> {
        nalgebra::center(&self.min, &self.max)
    }

    /// Returns the full size of the AABB.
    #[must_use]
    pub fn extents(&self) -> Vector3<f64> {
        self.max - self.min
    }
}

impl Default for Aabb {
    fn default() -> Self {
        Self::new(Point3::origin(), Point3::origin())
    }
}

/// Whether intervals `[a, b]` and `[c, d]` overlap, endpoints included.
#[must_use]
pub fn intervals_overlap(a: f64, b: f64, c: f64, d: f64) -> bool {
    (a <= d && a >= c) || (c <= b && c >= a)
}

/// Whether boxes `[min1, max1]` and `[min2, max2]` intersect on all three axes.
#[must_use]
pub fn aabb_overlap(
    min1: &Point3<f64>,
    max1: &Point3<f64>,
    min2: &Point3<f64>,
    max2: &Point3<f64>,
) -> bool {
    aabb_overlap_padded(min1, max1, min2, max2, 0.0, 0.0)
}

/// [`aabb_overlap`] with each box inflated by its own padding.
#[must_use]
pub fn aabb_overlap_padded(
    min1: &Point3<f64>,
    max1: &Point3<f64>,
    min2: &Point3<f64>,
    max2: &Point3<f64>,
    pad1: f64,
    pad2: f64,
) -> bool {
    (0..3).all(|i| {
        intervals_overlap(
            min1[i] - pad1,
            max1[i] + pad1,
            min2[i] - pad2,
            max2[i] + pad2,
        )
    })
}
