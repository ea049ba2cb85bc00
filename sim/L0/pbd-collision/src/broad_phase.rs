//! Broad phase: cull pairs whose padded bounding boxes are disjoint.

use tracing::trace;

use crate::aabb::{Aabb, aabb_overlap_padded};
use crate::error::{CollisionError, Result};
use crate::mesh::VertexView;
use crate::types::CollisionConfig;
use crate::CollisionBody;

/// Bounding box of a body's colliding vertices, read through its index map.
///
/// Empty geometry yields a degenerate box at the origin.
///
/// # Errors
///
/// Returns [`CollisionError::IndexOutOfRange`] if a colliding vertex maps
/// outside the physics buffer.
pub fn compute_bounding_box(vertices: &VertexView<'_>) -> Result<Aabb> {
    let points = vertices.collect_positions()?;
    Ok(Aabb::from_points(&points).unwrap_or_default())
}

pub(crate) fn require_config<B: CollisionBody + ?Sized>(body: &B) -> Result<CollisionConfig> {
    body.collision_config()
        .ok_or_else(|| CollisionError::MissingConfig(body.name().to_string()))
}

/// Whether two bodies may be in contact.
///
/// Each body's box is inflated by its own proximity. Bodies with no colliding
/// vertices never overlap.
///
/// # Errors
///
/// Returns an error if either body lacks a collision configuration or maps a
/// colliding vertex outside its physics buffer.
pub fn broad_phase<A, B>(a: &A, b: &B) -> Result<bool>
where
    A: CollisionBody + ?Sized,
    B: CollisionBody + ?Sized,
{
    let config_a = require_config(a)?;
    let config_b = require_config(b)?;

    let view_a = a.geometry_view();
    let view_b = b.geometry_view();
    if view_a.vertices().is_empty() || view_b.vertices().is_empty() {
        trace!(a = a.name(), b = b.name(), "empty colliding geometry");
        return Ok(false);
    }

    let box_a = compute_bounding_box(view_a.vertices())?;
    let box_b = compute_bounding_box(view_b.vertices())?;

    Ok(aabb_overlap_padded(
        &box_a.min,
        &box_a.max,
        &box_b.min,
        &box_b.max,
        config_a.proximity,
        config_b.proximity,
    ))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::body::PbdBody;
    use crate::mesh::{CollisionGeometry, IndexMap, Triangle};
    use nalgebra::Point3;

    fn point(at: Point3<f64>, proximity: f64) -> PbdBody {
        PbdBody::new("point", vec![at], &[1.0], CollisionGeometry::point_set(1))
            .unwrap()
            .with_config(CollisionConfig::rigid(proximity))
    }

    fn floor(proximity: f64) -> PbdBody {
        PbdBody::new(
            "floor",
            vec![
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(-1.0, 1.0, 0.0),
                Point3::new(-1.0, -1.0, 0.0),
            ],
            &[0.0; 3],
            CollisionGeometry::surface(3, vec![Triangle::new(0, 1, 2)]).unwrap(),
        )
        .unwrap()
        .with_config(CollisionConfig::rigid(proximity))
    }

    #[test]
    fn test_bounding_box_through_map() {
        let positions = vec![
            Point3::new(5.0, 5.0, 5.0),
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 2.0, 3.0),
        ];
        let geometry = CollisionGeometry::point_set(2);
        let map = IndexMap::Lookup(vec![1, 2]);
        let view = geometry.view(&positions, &map);

        let aabb = compute_bounding_box(view.vertices()).unwrap();
        assert_eq!(aabb.min, Point3::new(0.0, 0.0, 0.0));
        assert_eq!(aabb.max, Point3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn test_bounding_box_matches_from_points() {
        let positions = vec![
            Point3::new(0.5, -1.0, 2.0),
            Point3::new(-3.0, 4.0, 0.0),
            Point3::new(1.0, 1.0, -1.0),
        ];
        let geometry = CollisionGeometry::point_set(3);
        let map = IndexMap::Identity;
        let view = geometry.view(&positions, &map);
        assert_eq!(
            Some(compute_bounding_box(view.vertices()).unwrap()),
            Aabb::from_points(&positions)
        );

        let bad = IndexMap::Lookup(vec![0, 7, 1]);
        let view = geometry.view(&positions, &bad);
        assert!(matches!(
            compute_bounding_box(view.vertices()),
            Err(CollisionError::IndexOutOfRange { index: 7, len: 3, .. })
        ));
    }

    #[test]
    fn test_empty_bounding_box() {
        let geometry = CollisionGeometry::point_set(0);
        let map = IndexMap::Identity;
        let view = geometry.view(&[], &map);
        assert_eq!(compute_bounding_box(view.vertices()).unwrap(), Aabb::default());
    }

    #[test]
    fn test_broad_phase_padding() {
        // Gap of 0.15 is closed by 0.1 + 0.1 of padding.
        assert!(broad_phase(&point(Point3::new(0.0, 0.0, 0.15), 0.1), &floor(0.1)).unwrap());
        assert!(!broad_phase(&point(Point3::new(0.0, 0.0, 0.25), 0.1), &floor(0.1)).unwrap());
    }

    #[test]
    fn test_broad_phase_is_symmetric() {
        let a = point(Point3::new(0.0, 0.0, 0.15), 0.1);
        let b = floor(0.1);
        assert_eq!(broad_phase(&a, &b).unwrap(), broad_phase(&b, &a).unwrap());
    }

    #[test]
    fn test_broad_phase_missing_config() {
        let bare = PbdBody::new("bare", vec![Point3::origin()], &[1.0], CollisionGeometry::point_set(1))
            .unwrap();
        assert!(matches!(
            broad_phase(&bare, &floor(0.1)),
            Err(CollisionError::MissingConfig(name)) if name == "bare"
        ));
    }

    #[test]
    fn test_broad_phase_empty_geometry() {
        let empty = PbdBody::new("empty", vec![Point3::origin()], &[1.0], CollisionGeometry::point_set(0))
            .unwrap()
            .with_config(CollisionConfig::rigid(1.0));
        assert!(!broad_phase(&empty, &floor(0.1)).unwrap());
    }
}
