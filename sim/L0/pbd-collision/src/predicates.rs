//! Coarse proximity predicates used to generate narrow-phase candidates.
//!
//! Both tests compare padded bounding boxes, so they never miss a pair that
//! is within proximity but may report pairs that are not. The exact
//! closest-point computation inside each constraint rejects those.

use nalgebra::Point3;

use crate::aabb::Aabb;

/// Whether two segments, each padded by its own tolerance, may be within
/// proximity.
///
/// Non-parallel segments whose boxes overlap without the segments coming
/// close still pass.
#[must_use]
pub fn segment_segment_proximity(
    p: &Point3<f64>,
    q: &Point3<f64>,
    p2: &Point3<f64>,
    q2: &Point3<f64>,
    pad1: f64,
    pad2: f64,
) -> bool {
    let first = Aabb::new(p.inf(q), p.sup(q)).expanded(pad1);
    let second = Aabb::new(p2.inf(q2), p2.sup(q2)).expanded(pad2);
    first.overlaps(&second)
}

/// Whether a point padded by `pad_point` may be within proximity of the
/// triangle `(t0, t1, t2)` padded by `pad_tri`.
#[must_use]
pub fn point_triangle_proximity(
    p: &Point3<f64>,
    t0: &Point3<f64>,
    t1: &Point3<f64>,
    t2: &Point3<f64>,
    pad_point: f64,
    pad_tri: f64,
) -> bool {
    let point = Aabb::new(*p, *p).expanded(pad_point);
    let triangle = Aabb::new(t0.inf(t1).inf(t2), t0.sup(t1).sup(t2)).expanded(pad_tri);
    point.overlaps(&triangle)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crossing_segments() {
        let p = Point3::new(-1.0, 0.0, 0.0);
        let q = Point3::new(1.0, 0.0, 0.0);
        let p2 = Point3::new(0.0, -1.0, 0.05);
        let q2 = Point3::new(0.0, 1.0, 0.05);
        assert!(!segment_segment_proximity(&p, &q, &p2, &q2, 0.0, 0.0));
        assert!(segment_segment_proximity(&p, &q, &p2, &q2, 0.03, 0.03));
    }

    #[test]
    fn test_far_segments() {
        let p = Point3::new(0.0, 0.0, 0.0);
        let q = Point3::new(1.0, 0.0, 0.0);
        let p2 = Point3::new(0.0, 0.0, 5.0);
        let q2 = Point3::new(1.0, 0.0, 5.0);
        assert!(!segment_segment_proximity(&p, &q, &p2, &q2, 1.0, 1.0));
    }

    #[test]
    fn test_segment_false_positive_is_allowed() {
        // Skew segments on opposite corners of a shared box: the boxes overlap
        // although the segments stay far apart.
        let p = Point3::new(0.0, 0.0, 0.0);
        let q = Point3::new(1.0, 1.0, 1.0);
        let p2 = Point3::new(1.0, 0.0, 1.0);
        let q2 = Point3::new(0.9, 0.1, 0.9);
        assert!(segment_segment_proximity(&p, &q, &p2, &q2, 0.0, 0.0));
    }

    #[test]
    fn test_point_triangle() {
        let t0 = Point3::new(1.0, 0.0, 0.0);
        let t1 = Point3::new(-1.0, 1.0, 0.0);
        let t2 = Point3::new(-1.0, -1.0, 0.0);

        assert!(point_triangle_proximity(
            &Point3::origin(),
            &t0,
            &t1,
            &t2,
            0.1,
            0.1
        ));
        assert!(point_triangle_proximity(
            &Point3::new(0.0, 0.0, 0.15),
            &t0,
            &t1,
            &t2,
            0.1,
            0.1
        ));
        assert!(!point_triangle_proximity(
            &Point3::new(0.0, 0.0, 0.25),
            &t0,
            &t1,
            &t2,
            0.1,
            0.1
        ));
    }
}
