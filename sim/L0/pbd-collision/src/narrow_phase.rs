//! Narrow phase: generate collision constraints for an overlapping pair.
//!
//! Body B must be a triangulated surface. Depending on body A's geometry:
//!
//! | A          | Point sweep                | Edge sweep                          |
//! |------------|----------------------------|-------------------------------------|
//! | point set  | A vertices × B triangles   | -                                   |
//! | polyline   | A vertices × B triangles   | A segments × unique B edges         |
//! | surface    | A vertices × B triangles   | unique A edges × unique B edges     |
//!
//! Candidates pass a coarse padded-box test before a constraint is created;
//! the constraint itself decides at solve time whether contact is real.
//!
//! Every colliding vertex index is resolved through its own body's
//! [`IndexMap`](crate::mesh::IndexMap) before it is stored, so constraints
//! address physics particles directly.
//!
//! # Parallelism
//!
//! Large sweeps fan out over A's elements with rayon. Each element produces
//! its own list and the lists are joined in element order, so the pool is
//! identical to the sequential sweep.

use nalgebra::Point3;
use rayon::prelude::*;
use tracing::trace;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::constraints::{
    CollisionConstraint, EdgeEdgeConstraint, PairConfig, PointTriangleConstraint,
};
use crate::edge_set::{DEFAULT_MATRIX_THRESHOLD, EdgeDedup, unique_edges};
use crate::error::{CollisionError, Result};
use crate::mesh::{Edge, GeometryKind, GeometryView, SurfaceView, Triangle, VertexView};
use crate::pool::ConstraintPool;
use crate::predicates::{point_triangle_proximity, segment_segment_proximity};
use crate::types::ParticleRef;
use crate::CollisionBody;

/// Narrow-phase tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct NarrowPhaseConfig {
    /// Allow sweeping in parallel.
    pub parallel: bool,
    /// Minimum candidate count (`|A| × |B|`) before a sweep goes parallel.
    pub parallel_threshold: usize,
    /// Largest vertex count for which edges are deduplicated with a dense
    /// matrix instead of a hash set.
    pub edge_matrix_threshold: usize,
}

impl Default for NarrowPhaseConfig {
    fn default() -> Self {
        Self {
            parallel: true,
            parallel_threshold: 4096,
            edge_matrix_threshold: DEFAULT_MATRIX_THRESHOLD,
        }
    }
}

impl NarrowPhaseConfig {
    /// Always sweep on the calling thread.
    #[must_use]
    pub fn sequential() -> Self {
        Self {
            parallel: false,
            ..Self::default()
        }
    }

    /// Check the configuration.
    pub fn validate(&self) -> Result<()> {
        // n × n bytes; keep the dense matrix at about a megabyte at most.
        if self.edge_matrix_threshold > 1024 {
            return Err(CollisionError::invalid_config(format!(
                "edge_matrix_threshold must be <= 1024, got {}",
                self.edge_matrix_threshold
            )));
        }
        Ok(())
    }

    fn go_parallel(&self, candidates: usize) -> bool {
        self.parallel && candidates >= self.parallel_threshold
    }
}

/// Check that a pair of geometry kinds has a detection algorithm.
///
/// # Errors
///
/// Returns [`CollisionError::UnsupportedGeometry`] unless B is a surface.
pub const fn check_supported(a: GeometryKind, b: GeometryKind) -> Result<()> {
    match (a, b) {
        (GeometryKind::PointSet | GeometryKind::Polyline | GeometryKind::Surface, GeometryKind::Surface) => Ok(()),
        _ => Err(CollisionError::UnsupportedGeometry {
            a: a.name(),
            b: b.name(),
        }),
    }
}

/// Colliding vertices with positions and physics indices resolved up front.
///
/// Resolving once bounds-checks every mapping before the sweep, which then
/// runs without fallible lookups.
struct Resolved {
    positions: Vec<Point3<f64>>,
    physics: Vec<usize>,
}

impl Resolved {
    fn new(vertices: &VertexView<'_>) -> Result<Self> {
        Ok(Self {
            positions: vertices.collect_positions()?,
            physics: vertices.collect_physics_indices()?,
        })
    }

    fn segment(&self, edge: Edge) -> (&Point3<f64>, &Point3<f64>) {
        (&self.positions[edge.v0], &self.positions[edge.v1])
    }
}

/// Run `per_element` for every element of A and join the results in order.
fn sweep<F>(count_a: usize, count_b: usize, config: &NarrowPhaseConfig, per_element: F) -> Vec<CollisionConstraint>
where
    F: Fn(usize) -> Vec<CollisionConstraint> + Sync + Send,
{
    if config.go_parallel(count_a.saturating_mul(count_b)) {
        let per_element: Vec<Vec<CollisionConstraint>> =
            (0..count_a).into_par_iter().map(per_element).collect();
        per_element.into_iter().flatten().collect()
    } else {
        (0..count_a).flat_map(per_element).collect()
    }
}

/// Every A vertex against every B triangle.
fn point_sweep(
    points: &Resolved,
    surface: &Resolved,
    triangles: &[Triangle],
    pair: &PairConfig,
    config: &NarrowPhaseConfig,
) -> Vec<CollisionConstraint> {
    let (pad_a, pad_b) = (pair.a.proximity, pair.b.proximity);

    sweep(points.positions.len(), triangles.len(), config, |i| {
        let p = &points.positions[i];
        triangles
            .iter()
            .filter(|tri| {
                let [t0, t1, t2] = tri.vertices.map(|v| &surface.positions[v]);
                point_triangle_proximity(p, t0, t1, t2, pad_a, pad_b)
            })
            .map(|tri| {
                PointTriangleConstraint::new(
                    ParticleRef::a(points.physics[i]),
                    tri.vertices.map(|v| ParticleRef::b(surface.physics[v])),
                    *pair,
                )
                .into()
            })
            .collect()
    })
}

/// Every A edge against every B edge.
fn edge_sweep(
    side_a: &Resolved,
    edges_a: &[Edge],
    side_b: &Resolved,
    edges_b: &[Edge],
    pair: &PairConfig,
    config: &NarrowPhaseConfig,
) -> Vec<CollisionConstraint> {
    let (pad_a, pad_b) = (pair.a.proximity, pair.b.proximity);

    sweep(edges_a.len(), edges_b.len(), config, |i| {
        let edge_a = edges_a[i];
        let (p, q) = side_a.segment(edge_a);
        edges_b
            .iter()
            .filter(|&&edge_b| {
                let (p2, q2) = side_b.segment(edge_b);
                segment_segment_proximity(p, q, p2, q2, pad_a, pad_b)
            })
            .map(|edge_b| {
                EdgeEdgeConstraint::new(
                    [
                        ParticleRef::a(side_a.physics[edge_a.v0]),
                        ParticleRef::a(side_a.physics[edge_a.v1]),
                    ],
                    [
                        ParticleRef::b(side_b.physics[edge_b.v0]),
                        ParticleRef::b(side_b.physics[edge_b.v1]),
                    ],
                    *pair,
                )
                .into()
            })
            .collect()
    })
}

fn surface_edges(surface: &SurfaceView<'_>, config: &NarrowPhaseConfig) -> Result<Vec<Edge>> {
    let n = surface.vertices.len();
    unique_edges(
        surface.triangles,
        n,
        EdgeDedup::for_vertex_count(n, config.edge_matrix_threshold),
    )
}

/// Append the constraints for one pair to `pool`.
///
/// Returns the number of constraints added.
///
/// # Errors
///
/// Returns [`CollisionError::UnsupportedGeometry`] for a geometry combination
/// without an algorithm, an error for malformed topology, and
/// [`CollisionError::IndexOutOfRange`] if a colliding vertex cannot be mapped
/// to a physics particle.
pub fn narrow_phase<A, B>(
    a: &A,
    b: &B,
    pair: &PairConfig,
    config: &NarrowPhaseConfig,
    pool: &mut ConstraintPool,
) -> Result<usize>
where
    A: CollisionBody + ?Sized,
    B: CollisionBody + ?Sized,
{
    a.colliding_geometry().validate()?;
    b.colliding_geometry().validate()?;

    let view_a = a.geometry_view();
    let view_b = b.geometry_view();
    check_supported(view_a.kind(), view_b.kind())?;

    let GeometryView::Surface(surface_b) = view_b else {
        return Err(CollisionError::UnsupportedGeometry {
            a: view_a.kind().name(),
            b: view_b.kind().name(),
        });
    };

    let side_a = Resolved::new(view_a.vertices())?;
    let side_b = Resolved::new(&surface_b.vertices)?;

    let points = point_sweep(&side_a, &side_b, surface_b.triangles, pair, config);
    trace!(
        candidates = side_a.positions.len() * surface_b.triangles.len(),
        constraints = points.len(),
        "point-triangle sweep"
    );

    let edges = match view_a {
        GeometryView::PointSet(_) => Vec::new(),
        GeometryView::Polyline(polyline) => {
            let edges_b = surface_edges(&surface_b, config)?;
            edge_sweep(&side_a, polyline.edges, &side_b, &edges_b, pair, config)
        }
        GeometryView::Surface(surface_a) => {
            let edges_a = surface_edges(&surface_a, config)?;
            let edges_b = surface_edges(&surface_b, config)?;
            trace!(
                edges_a = edges_a.len(),
                edges_b = edges_b.len(),
                "unique surface edges"
            );
            edge_sweep(&side_a, &edges_a, &side_b, &edges_b, pair, config)
        }
    };
    if !edges.is_empty() {
        trace!(constraints = edges.len(), "edge-edge sweep");
    }

    let added = points.len() + edges.len();
    pool.reserve(added);
    pool.extend(points);
    pool.extend(edges);
    Ok(added)
}
