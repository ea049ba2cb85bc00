//! Analytic shapes and their closed-form bounding boxes.
//!
//! These do not take part in the mesh-vs-mesh pipeline; they give tools and
//! obstacles described analytically the same [`BoundingVolume`] capability
//! as meshes.

use nalgebra::{Point3, Unit, UnitQuaternion, Vector3};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::aabb::Aabb;

/// Anything that can report an axis-aligned bounding box.
pub trait BoundingVolume {
    /// Tight (or conservative) world-space bounding box.
    fn bounding_box(&self) -> Aabb;
}

/// Analytic collision shape.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Shape {
    /// Sphere.
    Sphere {
        /// Center.
        center: Point3<f64>,
        /// Radius.
        radius: f64,
    },
    /// Capsule between two endpoints.
    Capsule {
        /// First endpoint of the core segment.
        start: Point3<f64>,
        /// Second endpoint of the core segment.
        end: Point3<f64>,
        /// Radius around the segment.
        radius: f64,
    },
    /// Solid cylinder.
    Cylinder {
        /// Center.
        center: Point3<f64>,
        /// Axis direction.
        axis: Unit<Vector3<f64>>,
        /// Radius.
        radius: f64,
        /// Half the length along the axis.
        half_length: f64,
    },
    /// Oriented box.
    Cuboid {
        /// Center.
        center: Point3<f64>,
        /// Half extents in the local frame.
        half_extents: Vector3<f64>,
        /// Orientation of the local frame.
        rotation: UnitQuaternion<f64>,
    },
    /// Square patch of a plane.
    Plane {
        /// Center of the patch.
        center: Point3<f64>,
        /// Plane normal.
        normal: Unit<Vector3<f64>>,
        /// Edge length of the patch.
        width: f64,
    },
}

impl Shape {
    /// Sphere at `center`.
    #[must_use]
    pub const fn sphere(center: Point3<f64>, radius: f64) -> Self {
        Self::Sphere { center, radius }
    }

    /// Capsule around the segment `start`-`end`.
    #[must_use]
    pub const fn capsule(start: Point3<f64>, end: Point3<f64>, radius: f64) -> Self {
        Self::Capsule { start, end, radius }
    }

    /// Axis-aligned cube.
    #[must_use]
    pub fn cube(center: Point3<f64>, width: f64) -> Self {
        Self::Cuboid {
            center,
            half_extents: Vector3::repeat(width * 0.5),
            rotation: UnitQuaternion::identity(),
        }
    }
}

/// Half-extent of a disk of radius `r` with unit normal `n`, per axis.
fn disk_extent(n: &Vector3<f64>, r: f64) -> Vector3<f64> {
    Vector3::new(
        r * n.x.mul_add(-n.x, 1.0).max(0.0).sqrt(),
        r * n.y.mul_add(-n.y, 1.0).max(0.0).sqrt(),
        r * n.z.mul_add(-n.z, 1.0).max(0.0).sqrt(),
    )
}

impl BoundingVolume for Shape {
    fn bounding_box(&self) -> Aabb {
        match self {
            Self::Sphere { center, radius } => {
                Aabb::from_center(*center, Vector3::repeat(*radius))
            }
            Self::Capsule { start, end, radius } => {
                Aabb::new(start.inf(end), start.sup(end)).expanded(*radius)
            }
            Self::Cylinder {
                center,
                axis,
                radius,
                half_length,
            } => {
                let cap = disk_extent(axis, *radius);
                let along = axis.into_inner().abs() * *half_length;
                Aabb::from_center(*center, along + cap)
            }
            Self::Cuboid {
                center,
                half_extents,
                rotation,
            } => {
                let r = rotation.to_rotation_matrix().into_inner().abs();
                Aabb::from_center(*center, r * half_extents)
            }
            Self::Plane {
                center,
                normal,
                width,
            } => {
                // The square's in-plane frame is arbitrary, so bound it by its
                // circumscribed disk.
                let radius = width * std::f64::consts::FRAC_1_SQRT_2;
                Aabb::from_center(*center, disk_extent(normal, radius))
            }
        }
    }
}
