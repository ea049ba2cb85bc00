//! Collision detection and position-based response between simulated bodies.
//!
//! This crate keeps two particle bodies (cloth, tissue, tools, ropes) from
//! interpenetrating by generating Position-Based Dynamics (PBD) collision
//! constraints each step and relaxing them directly on the bodies' positions:
//!
//! - **Broad phase**: padded bounding boxes cull distant pairs
//! - **Narrow phase**: point-triangle and edge-edge candidate sweeps
//! - **Response**: PBD projection of every candidate for a fixed iteration budget
//!
//! # Pipeline
//!
//! ```text
//! For each pairing, each step:
//!   1. Reset the pairing's constraint pool
//!   2. Broad phase: AABB(A) ⊕ proximity_A  ∩  AABB(B) ⊕ proximity_B ?
//!        no  → done
//!   3. Narrow phase:
//!        A vertices × B triangles     → point-triangle constraints
//!        A edges    × B unique edges  → edge-edge constraints
//!   4. For each iteration:
//!        project every constraint in pool order
//! ```
//!
//! # Collision Constraints
//!
//! Both constraint kinds push the bodies apart until they are separated by
//! `proximity_A + proximity_B`:
//!
//! ```text
//!   point-triangle                 edge-edge
//!
//!        ● p (A)                    x2 ●────────● x3  (B)
//!        │ n                              │ n
//!        │ d ≥ r                          │ d ≥ r
//!   t0 ●─┴─────● t1  (B)        x0 ●──────┴─● x1  (A)
//!
//!   r = proximity_A + proximity_B
//! ```
//!
//! Each body weighs the correction by its own stiffness, and particles with
//! zero inverse mass are never moved.
//!
//! # Bodies
//!
//! Anything that owns particle positions can take part by implementing
//! [`CollisionBody`]. A body exposes topology-only colliding geometry plus an
//! [`IndexMap`] from colliding vertices to physics particles, so the
//! colliding mesh always follows the simulated particles. [`PbdBody`] is a
//! ready-made implementation.
//!
//! # Quick Start
//!
//! ```
//! use sim_pbd_collision::{
//!     CollisionBody, CollisionConfig, CollisionGeometry, CollisionScene, HandlingConfig, PbdBody,
//!     Triangle,
//! };
//! use nalgebra::Point3;
//!
//! # fn main() -> sim_pbd_collision::Result<()> {
//! // A free particle resting on a fixed triangle.
//! let particle = PbdBody::new(
//!     "particle",
//!     vec![Point3::new(0.0, 0.0, 0.0)],
//!     &[1.0],
//!     CollisionGeometry::point_set(1),
//! )?
//! .with_config(CollisionConfig::rigid(0.1));
//!
//! let floor = PbdBody::new(
//!     "floor",
//!     vec![
//!         Point3::new(1.0, 0.0, 0.0),
//!         Point3::new(-1.0, 1.0, 0.0),
//!         Point3::new(-1.0, -1.0, 0.0),
//!     ],
//!     &[0.0, 0.0, 0.0],
//!     CollisionGeometry::surface(3, vec![Triangle::new(0, 1, 2)])?,
//! )?
//! .with_config(CollisionConfig::rigid(0.1));
//!
//! let mut scene = CollisionScene::new();
//! let a = scene.add_body(particle);
//! let b = scene.add_body(floor);
//! scene.add_pairing(a, b, HandlingConfig::default())?;
//!
//! scene.step();
//!
//! // Lifted to the combined proximity above the floor.
//! let z = scene.body(a).map_or(0.0, |body| body.positions()[0].z);
//! assert!((z - 0.2).abs() < 1e-9);
//! # Ok(())
//! # }
//! ```
//!
//! # Layer 0 Crate
//!
//! This is a Layer 0 crate with **zero Bevy dependencies**. It does not
//! integrate bodies over time; a simulation loop calls it between its own
//! prediction and velocity update.

#![doc(html_root_url = "https://docs.rs/sim-pbd-collision/0.1.0")]
#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![warn(missing_docs)]
// Allow precision loss when converting indices to f64 - these are small values
#![allow(clippy::cast_precision_loss)]
// Allow sign loss for array indices - we validate bounds
#![allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
// Allow pass by value for small Copy types
#![allow(clippy::needless_pass_by_value)]
// Short geometric names (p, q, t0, x0) follow the usual notation
#![allow(clippy::many_single_char_names, clippy::similar_names)]
// Test-related lints - these are style preferences
#![cfg_attr(test, allow(clippy::uninlined_format_args, clippy::float_cmp))]

pub mod aabb;
pub mod body;
pub mod broad_phase;
pub mod constraints;
pub mod edge_set;
pub mod error;
pub mod handling;
pub mod mesh;
pub mod narrow_phase;
pub mod pool;
pub mod predicates;
pub mod scene;
pub mod shapes;
pub mod solver;
pub mod types;

// Re-export main types at crate root
pub use aabb::Aabb;
pub use body::PbdBody;
pub use broad_phase::{broad_phase, compute_bounding_box};
pub use constraints::{
    BodyBuffers, CollisionConstraint, ConstraintType, EdgeEdgeConstraint, PairBuffers, PairConfig,
    PointTriangleConstraint,
};
pub use edge_set::{EdgeDedup, unique_edges};
pub use error::{CollisionError, Result};
pub use handling::{CollisionHandling, HandlingConfig, PairPhase, StepOutcome};
pub use mesh::{
    CollisionGeometry, Edge, GeometryKind, GeometryView, IndexMap, PointSetView, PolylineView,
    SurfaceView, Triangle, VertexView,
};
pub use narrow_phase::{NarrowPhaseConfig, narrow_phase};
pub use pool::ConstraintPool;
pub use scene::CollisionScene;
pub use shapes::{BoundingVolume, Shape};
pub use solver::{CollisionSolver, SolverConfig, SolverStats};
pub use types::{BodyId, BodySlot, CollisionConfig, PairingId, ParticleRef, VertexFlags};

use nalgebra::Point3;

/// A body that takes part in collision pairings.
///
/// The body owns its particle buffers; pairings borrow them for the length of
/// one step and keep no references afterwards.
pub trait CollisionBody {
    /// Get the body's unique identifier.
    fn id(&self) -> BodyId;

    /// Get the name of this body.
    fn name(&self) -> &str;

    /// Topology of the colliding geometry.
    fn colliding_geometry(&self) -> &CollisionGeometry;

    /// Map from colliding vertex indices to physics particle indices.
    fn index_map(&self) -> &IndexMap;

    /// Get the particle positions.
    fn positions(&self) -> &[Point3<f64>];

    /// Get mutable access to particle positions.
    fn positions_mut(&mut self) -> &mut [Point3<f64>];

    /// Get the particle inverse masses (0 for immovable particles).
    fn inverse_masses(&self) -> &[f64];

    /// Borrow positions mutably and inverse masses immutably at once.
    fn buffers_mut(&mut self) -> BodyBuffers<'_>;

    /// Proximity and stiffness, if configured.
    fn collision_config(&self) -> Option<CollisionConfig>;

    /// Colliding geometry viewed over the current particle positions.
    fn geometry_view(&self) -> GeometryView<'_> {
        self.colliding_geometry()
            .view(self.positions(), self.index_map())
    }
}
