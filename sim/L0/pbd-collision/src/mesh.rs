//! Colliding geometry: topology, index maps, and typed mesh views.
//!
//! A body's colliding geometry stores topology only. Vertex positions are
//! read from the body's physics buffer through its [`IndexMap`], so the
//! colliding mesh can never drift from the simulated particles:
//!
//! ```text
//! colliding vertex i ──IndexMap──▶ physics index j ──▶ positions[j]
//! ```
//!
//! - [`Edge`] / [`Triangle`] - Index pairs and triples
//! - [`CollisionGeometry`] - Closed set of geometry kinds
//! - [`IndexMap`] - Identity or lookup from colliding to physics indices
//! - [`PointSetView`], [`PolylineView`], [`SurfaceView`] - Bounds-checked views

use nalgebra::Point3;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{CollisionError, Result};

/// An edge connecting two vertices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Edge {
    /// Index of the first vertex.
    pub v0: usize,
    /// Index of the second vertex.
    pub v1: usize,
}

impl Edge {
    /// Create a new edge.
    #[must_use]
    pub const fn new(v0: usize, v1: usize) -> Self {
        Self { v0, v1 }
    }

    /// Get the edge with vertices in canonical order (sorted).
    #[must_use]
    pub const fn canonical(self) -> Self {
        if self.v0 <= self.v1 {
            self
        } else {
            Self {
                v0: self.v1,
                v1: self.v0,
            }
        }
    }
}

/// A triangle face (three vertices).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Triangle {
    /// Indices of the three vertices.
    pub vertices: [usize; 3],
}

impl Triangle {
    /// Create a new triangle.
    #[must_use]
    pub const fn new(v0: usize, v1: usize, v2: usize) -> Self {
        Self {
            vertices: [v0, v1, v2],
        }
    }

    /// Get the edges of this triangle, in winding order.
    #[must_use]
    pub const fn edges(&self) -> [Edge; 3] {
        [
            Edge::new(self.vertices[0], self.vertices[1]),
            Edge::new(self.vertices[1], self.vertices[2]),
            Edge::new(self.vertices[2], self.vertices[0]),
        ]
    }
}

/// Kind of colliding geometry, used for dispatch and diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum GeometryKind {
    /// Unconnected points.
    PointSet,
    /// Points joined by line segments.
    Polyline,
    /// Triangulated surface.
    Surface,
}

impl GeometryKind {
    /// Human-readable name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::PointSet => "point set",
            Self::Polyline => "polyline",
            Self::Surface => "surface mesh",
        }
    }
}

/// Topology of a body's colliding geometry.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum CollisionGeometry {
    /// Unconnected points.
    PointSet {
        /// Number of colliding vertices.
        num_vertices: usize,
    },
    /// Line segments.
    Polyline {
        /// Number of colliding vertices.
        num_vertices: usize,
        /// Segments as vertex index pairs.
        edges: Vec<Edge>,
    },
    /// Triangles.
    Surface {
        /// Number of colliding vertices.
        num_vertices: usize,
        /// Faces as vertex index triples.
        triangles: Vec<Triangle>,
    },
}

impl CollisionGeometry {
    /// A point set with `num_vertices` points.
    #[must_use]
    pub const fn point_set(num_vertices: usize) -> Self {
        Self::PointSet { num_vertices }
    }

    /// A polyline visiting vertices `0..num_vertices` in order.
    #[must_use]
    pub fn chain(num_vertices: usize) -> Self {
        let edges = (1..num_vertices).map(|i| Edge::new(i - 1, i)).collect();
        Self::Polyline {
            num_vertices,
            edges,
        }
    }

    /// A polyline with explicit segments.
    pub fn polyline(num_vertices: usize, edges: Vec<Edge>) -> Result<Self> {
        let geometry = Self::Polyline {
            num_vertices,
            edges,
        };
        geometry.validate()?;
        Ok(geometry)
    }

    /// A triangulated surface.
    pub fn surface(num_vertices: usize, triangles: Vec<Triangle>) -> Result<Self> {
        let geometry = Self::Surface {
            num_vertices,
            triangles,
        };
        geometry.validate()?;
        Ok(geometry)
    }

    /// The geometry kind.
    #[must_use]
    pub const fn kind(&self) -> GeometryKind {
        match self {
            Self::PointSet { .. } => GeometryKind::PointSet,
            Self::Polyline { .. } => GeometryKind::Polyline,
            Self::Surface { .. } => GeometryKind::Surface,
        }
    }

    /// Number of colliding vertices.
    #[must_use]
    pub const fn num_vertices(&self) -> usize {
        match self {
            Self::PointSet { num_vertices }
            | Self::Polyline { num_vertices, .. }
            | Self::Surface { num_vertices, .. } => *num_vertices,
        }
    }

    /// Check that every referenced vertex index is in range and that no
    /// element repeats a vertex.
    pub fn validate(&self) -> Result<()> {
        match self {
            Self::PointSet { .. } => Ok(()),
            Self::Polyline {
                num_vertices,
                edges,
            } => {
                for (i, edge) in edges.iter().enumerate() {
                    check_indices(&[edge.v0, edge.v1], *num_vertices, "polyline vertices")?;
                    if edge.v0 == edge.v1 {
                        return Err(CollisionError::invalid_topology(format!(
                            "edge {i} connects vertex {} to itself",
                            edge.v0
                        )));
                    }
                }
                Ok(())
            }
            Self::Surface {
                num_vertices,
                triangles,
            } => {
                for (i, tri) in triangles.iter().enumerate() {
                    check_indices(&tri.vertices, *num_vertices, "surface vertices")?;
                    let [a, b, c] = tri.vertices;
                    if a == b || b == c || c == a {
                        return Err(CollisionError::invalid_topology(format!(
                            "triangle {i} repeats a vertex: {:?}",
                            tri.vertices
                        )));
                    }
                }
                Ok(())
            }
        }
    }

    /// View this geometry over a physics position buffer.
    #[must_use]
    pub fn view<'a>(&'a self, positions: &'a [Point3<f64>], map: &'a IndexMap) -> GeometryView<'a> {
        let vertices = VertexView {
            positions,
            map,
            num_vertices: self.num_vertices(),
        };
        match self {
            Self::PointSet { .. } => GeometryView::PointSet(PointSetView { vertices }),
            Self::Polyline { edges, .. } => GeometryView::Polyline(PolylineView { vertices, edges }),
            Self::Surface { triangles, .. } => {
                GeometryView::Surface(SurfaceView {
                    vertices,
                    triangles,
                })
            }
        }
    }
}

fn check_indices(indices: &[usize], len: usize, context: &'static str) -> Result<()> {
    match indices.iter().find(|&&i| i >= len) {
        Some(&i) => Err(CollisionError::index_out_of_range(i, len, context)),
        None => Ok(()),
    }
}

/// Mapping from colliding vertex indices to physics vertex indices.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum IndexMap {
    /// Colliding and physics vertices coincide.
    #[default]
    Identity,
    /// `table[i]` is the physics index of colliding vertex `i`.
    Lookup(Vec<usize>),
}

impl IndexMap {
    /// Physics index for colliding vertex `i`.
    pub fn map(&self, i: usize) -> Result<usize> {
        match self {
            Self::Identity => Ok(i),
            Self::Lookup(table) => table
                .get(i)
                .copied()
                .ok_or_else(|| CollisionError::index_out_of_range(i, table.len(), "index map")),
        }
    }

    /// Check the map against the colliding vertex count and physics buffer length.
    pub fn validate(&self, num_colliding: usize, num_physics: usize) -> Result<()> {
        match self {
            Self::Identity => {
                if num_colliding > num_physics {
                    return Err(CollisionError::index_out_of_range(
                        num_colliding - 1,
                        num_physics,
                        "physics positions",
                    ));
                }
                Ok(())
            }
            Self::Lookup(table) => {
                if table.len() < num_colliding {
                    return Err(CollisionError::index_out_of_range(
                        table.len(),
                        table.len(),
                        "index map",
                    ));
                }
                check_indices(table, num_physics, "physics positions")
            }
        }
    }
}

/// Colliding vertices resolved through an index map onto physics positions.
#[derive(Debug, Clone, Copy)]
pub struct VertexView<'a> {
    positions: &'a [Point3<f64>],
    map: &'a IndexMap,
    num_vertices: usize,
}

impl<'a> VertexView<'a> {
    /// Number of colliding vertices.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.num_vertices
    }

    /// Whether the geometry has no vertices.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.num_vertices == 0
    }

    /// Physics index of colliding vertex `i`, bounds-checked on both sides.
    pub fn physics_index(&self, i: usize) -> Result<usize> {
        if i >= self.num_vertices {
            return Err(CollisionError::index_out_of_range(
                i,
                self.num_vertices,
                "colliding vertices",
            ));
        }
        let j = self.map.map(i)?;
        if j >= self.positions.len() {
            return Err(CollisionError::index_out_of_range(
                j,
                self.positions.len(),
                "physics positions",
            ));
        }
        Ok(j)
    }

    /// Position of colliding vertex `i`.
    pub fn position(&self, i: usize) -> Result<Point3<f64>> {
        Ok(self.positions[self.physics_index(i)?])
    }

    /// Positions of all colliding vertices, in index order.
    pub fn collect_positions(&self) -> Result<Vec<Point3<f64>>> {
        (0..self.num_vertices).map(|i| self.position(i)).collect()
    }

    /// Physics indices of all colliding vertices, in index order.
    pub fn collect_physics_indices(&self) -> Result<Vec<usize>> {
        (0..self.num_vertices).map(|i| self.physics_index(i)).collect()
    }

    pub(crate) const fn positions(&self) -> &'a [Point3<f64>] {
        self.positions
    }
}

/// A point set over physics positions.
#[derive(Debug, Clone, Copy)]
pub struct PointSetView<'a> {
    /// Colliding vertices.
    pub vertices: VertexView<'a>,
}

impl PointSetView<'_> {
    /// Position of point `i`.
    pub fn vertex(&self, i: usize) -> Result<Point3<f64>> {
        self.vertices.position(i)
    }
}

/// A polyline over physics positions.
#[derive(Debug, Clone, Copy)]
pub struct PolylineView<'a> {
    /// Colliding vertices.
    pub vertices: VertexView<'a>,
    /// Segments.
    pub edges: &'a [Edge],
}

impl PolylineView<'_> {
    /// Position of vertex `i`.
    pub fn vertex(&self, i: usize) -> Result<Point3<f64>> {
        self.vertices.position(i)
    }

    /// Endpoints of segment `j`.
    pub fn segment(&self, j: usize) -> Result<[Point3<f64>; 2]> {
        let edge = self
            .edges
            .get(j)
            .ok_or_else(|| CollisionError::index_out_of_range(j, self.edges.len(), "polyline edges"))?;
        Ok([self.vertex(edge.v0)?, self.vertex(edge.v1)?])
    }
}

/// A triangulated surface over physics positions.
#[derive(Debug, Clone, Copy)]
pub struct SurfaceView<'a> {
    /// Colliding vertices.
    pub vertices: VertexView<'a>,
    /// Faces.
    pub triangles: &'a [Triangle],
}

impl SurfaceView<'_> {
    /// Position of vertex `i`.
    pub fn vertex(&self, i: usize) -> Result<Point3<f64>> {
        self.vertices.position(i)
    }

    /// Corners of triangle `j`.
    pub fn triangle(&self, j: usize) -> Result<[Point3<f64>; 3]> {
        let tri = self.triangles.get(j).ok_or_else(|| {
            CollisionError::index_out_of_range(j, self.triangles.len(), "surface triangles")
        })?;
        let [a, b, c] = tri.vertices;
        Ok([self.vertex(a)?, self.vertex(b)?, self.vertex(c)?])
    }
}

/// Typed view of any colliding geometry.
#[derive(Debug, Clone, Copy)]
pub enum GeometryView<'a> {
    /// Point set.
    PointSet(PointSetView<'a>),
    /// Polyline.
    Polyline(PolylineView<'a>),
    /// Surface.
    Surface(SurfaceView<'a>),
}

impl<'a> GeometryView<'a> {
    /// Vertices of the viewed geometry.
    #[must_use]
    pub const fn vertices(&self) -> &VertexView<'a> {
        match self {
            Self::PointSet(v) => &v.vertices,
            Self::Polyline(v) => &v.vertices,
            Self::Surface(v) => &v.vertices,
        }
    }

    /// The geometry kind.
    #[must_use]
    pub const fn kind(&self) -> GeometryKind {
        match self {
            Self::PointSet(_) => GeometryKind::PointSet,
            Self::Polyline(_) => GeometryKind::Polyline,
            Self::Surface(_) => GeometryKind::Surface,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edge_canonical() {
        assert_eq!(Edge::new(3, 1).canonical(), Edge::new(1, 3));
        assert_eq!(Edge::new(1, 3).canonical(), Edge::new(1, 3));
    }

    #[test]
    fn test_triangle_edges() {
        let t = Triangle::new(0, 1, 2);
        assert_eq!(t.edges(), [Edge::new(0, 1), Edge::new(1, 2), Edge::new(2, 0)]);
    }

    #[test]
    fn test_chain_topology() {
        let geometry = CollisionGeometry::chain(4);
        assert_eq!(geometry.kind(), GeometryKind::Polyline);
        assert!(matches!(
            geometry,
            CollisionGeometry::Polyline { ref edges, .. }
                if *edges == [Edge::new(0, 1), Edge::new(1, 2), Edge::new(2, 3)]
        ));
    }

    #[test]
    fn test_surface_validation() {
        assert!(CollisionGeometry::surface(3, vec![Triangle::new(0, 1, 2)]).is_ok());
        assert!(matches!(
            CollisionGeometry::surface(3, vec![Triangle::new(0, 1, 3)]),
            Err(CollisionError::IndexOutOfRange { index: 3, len: 3, .. })
        ));
        assert!(matches!(
            CollisionGeometry::surface(3, vec![Triangle::new(0, 1, 1)]),
            Err(CollisionError::InvalidTopology(_))
        ));
        assert!(CollisionGeometry::polyline(2, vec![Edge::new(0, 2)]).is_err());
    }

    #[test]
    fn test_index_map() {
        let identity = IndexMap::Identity;
        assert_eq!(identity.map(5).ok(), Some(5));

        let lookup = IndexMap::Lookup(vec![4, 0, 2]);
        assert_eq!(lookup.map(0).ok(), Some(4));
        assert!(lookup.map(3).is_err());

        assert!(lookup.validate(3, 5).is_ok());
        assert!(lookup.validate(3, 4).is_err());
        assert!(lookup.validate(4, 5).is_err());
        assert!(identity.validate(3, 3).is_ok());
        assert!(identity.validate(4, 3).is_err());
    }

    #[test]
    fn test_view_resolves_through_map() {
        let positions = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(2.0, 0.0, 0.0),
        ];
        let geometry = CollisionGeometry::point_set(2);
        let map = IndexMap::Lookup(vec![2, 0]);
        let view = geometry.view(&positions, &map);

        assert_eq!(view.kind(), GeometryKind::PointSet);
        let vertices = view.vertices();
        assert_eq!(vertices.len(), 2);
        assert_eq!(vertices.physics_index(0).ok(), Some(2));
        assert_eq!(vertices.position(0).ok(), Some(Point3::new(2.0, 0.0, 0.0)));
        assert!(vertices.position(2).is_err());
    }

    #[test]
    fn test_typed_views() {
        let positions = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ];
        let map = IndexMap::Identity;

        let chain = CollisionGeometry::chain(3);
        let GeometryView::Polyline(polyline) = chain.view(&positions, &map) else {
            unreachable!("chain is a polyline");
        };
        assert_eq!(polyline.segment(1).ok(), Some([positions[1], positions[2]]));
        assert!(polyline.segment(2).is_err());

        let surface = CollisionGeometry::surface(3, vec![Triangle::new(2, 1, 0)]);
        let surface = surface.as_ref().map(|s| s.view(&positions, &map));
        assert!(matches!(
            surface,
            Ok(GeometryView::Surface(view))
                if view.triangle(0).ok() == Some([positions[2], positions[1], positions[0]])
                    && view.vertex(3).is_err()
        ));
    }

    #[test]
    fn test_view_rejects_bad_map_target() {
        let positions = vec![Point3::origin()];
        let geometry = CollisionGeometry::point_set(1);
        let map = IndexMap::Lookup(vec![9]);
        let view = geometry.view(&positions, &map);
        assert!(matches!(
            view.vertices().position(0),
            Err(CollisionError::IndexOutOfRange { index: 9, len: 1, .. })
        ));
    }
}
