//! Unique undirected edges of a triangulated surface.
//!
//! Adjacent triangles share edges, and an edge-edge sweep over raw triangle
//! edges would test (and constrain) each shared edge twice. [`unique_edges`]
//! keeps the first occurrence of every undirected edge, in triangle order.
//!
//! Two strategies give identical output:
//!
//! - [`EdgeDedup::Matrix`] - `n × n` boolean matrix, cheap for small meshes
//! - [`EdgeDedup::Hash`] - set of canonical `(min, max)` pairs, `O(E)` memory

use hashbrown::HashSet;

use crate::error::{CollisionError, Result};
use crate::mesh::{Edge, Triangle};

/// Vertex count at or below which the dense matrix is used by default.
pub const DEFAULT_MATRIX_THRESHOLD: usize = 256;

/// Strategy used to remember which edges were already emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeDedup {
    /// Dense `n × n` matrix of "still available" flags.
    Matrix,
    /// Hash set of canonical edges.
    Hash,
}

impl EdgeDedup {
    /// Pick a strategy for a mesh with `num_vertices` vertices.
    #[must_use]
    pub const fn for_vertex_count(num_vertices: usize, matrix_threshold: usize) -> Self {
        if num_vertices <= matrix_threshold {
            Self::Matrix
        } else {
            Self::Hash
        }
    }
}

/// Dense availability matrix: `E[u][v]` is set until edge `(u, v)` is consumed.
struct EdgeMatrix {
    n: usize,
    available: Vec<bool>,
}

impl EdgeMatrix {
    fn new(n: usize) -> Self {
        Self {
            n,
            available: vec![true; n * n],
        }
    }

    /// Consume `(u, v)` if neither direction was consumed yet.
    fn take(&mut self, edge: Edge) -> bool {
        let uv = edge.v0 * self.n + edge.v1;
        let vu = edge.v1 * self.n + edge.v0;
        if self.available[uv] && self.available[vu] {
            self.available[uv] = false;
            self.available[vu] = false;
            true
        } else {
            false
        }
    }
}

/// Unique undirected edges of `triangles`, first occurrence order.
///
/// # Errors
///
/// Returns [`CollisionError::IndexOutOfRange`] if a triangle references a
/// vertex at or past `num_vertices`.
pub fn unique_edges(
    triangles: &[Triangle],
    num_vertices: usize,
    strategy: EdgeDedup,
) -> Result<Vec<Edge>> {
    if let Some(&v) = triangles
        .iter()
        .flat_map(|tri| &tri.vertices)
        .find(|&&v| v >= num_vertices)
    {
        return Err(CollisionError::index_out_of_range(
            v,
            num_vertices,
            "surface vertices",
        ));
    }

    let mut edges = Vec::with_capacity(triangles.len() * 3 / 2 + 3);
    let all = triangles.iter().flat_map(Triangle::edges);

    match strategy {
        EdgeDedup::Matrix => {
            let mut matrix = EdgeMatrix::new(num_vertices);
            edges.extend(all.filter(|&e| matrix.take(e)));
        }
        EdgeDedup::Hash => {
            let mut seen = HashSet::with_capacity(triangles.len() * 2);
            edges.extend(all.filter(|e| seen.insert(e.canonical())));
        }
    }

    Ok(edges)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    /// Two triangles sharing the diagonal of a unit quad.
    fn quad() -> Vec<Triangle> {
        vec![Triangle::new(0, 1, 2), Triangle::new(0, 2, 3)]
    }

    #[test]
    fn test_shared_edge_emitted_once() {
        for strategy in [EdgeDedup::Matrix, EdgeDedup::Hash] {
            let edges = unique_edges(&quad(), 4, strategy).unwrap();
            assert_eq!(edges.len(), 5, "{strategy:?}");
            let diagonals = edges
                .iter()
                .filter(|e| e.canonical() == Edge::new(0, 2))
                .count();
            assert_eq!(diagonals, 1, "{strategy:?}");
        }
    }

    #[test]
    fn test_strategies_agree() {
        // Fan of triangles around vertex 0.
        let triangles: Vec<_> = (1..7).map(|i| Triangle::new(0, i, i + 1)).collect();
        let matrix = unique_edges(&triangles, 8, EdgeDedup::Matrix).unwrap();
        let hash = unique_edges(&triangles, 8, EdgeDedup::Hash).unwrap();
        assert_eq!(matrix, hash);
        // 7 spokes and 6 rim edges.
        assert_eq!(matrix.len(), 13);
    }

    #[test]
    fn test_first_occurrence_keeps_direction() {
        let edges = unique_edges(&quad(), 4, EdgeDedup::Matrix).unwrap();
        assert_eq!(edges[2], Edge::new(2, 0));
    }

    #[test]
    fn test_out_of_range_vertex_rejected() {
        // Vertex 4 does not exist in a 4-vertex mesh.
        let triangles = vec![Triangle::new(0, 1, 2), Triangle::new(0, 2, 4)];
        for strategy in [EdgeDedup::Matrix, EdgeDedup::Hash] {
            assert!(matches!(
                unique_edges(&triangles, 4, strategy),
                Err(CollisionError::IndexOutOfRange { index: 4, len: 4, .. })
            ));
        }
    }

    #[test]
    fn test_strategy_selection() {
        assert_eq!(EdgeDedup::for_vertex_count(10, 256), EdgeDedup::Matrix);
        assert_eq!(EdgeDedup::for_vertex_count(1000, 256), EdgeDedup::Hash);
    }
}
