//! Collision constraints between two bodies.
//!
//! This module provides PBD constraints that keep two bodies separated by the
//! sum of their proximities:
//!
//! - [`EdgeEdgeConstraint`] - Closest approach of two segments
//! - [`PointTriangleConstraint`] - Point above a triangle
//!
//! # PBD Constraint Projection
//!
//! Each constraint projects its particles with
//!
//! ```text
//! C  = d - (proximity_a + proximity_b)
//! λ  = C / Σ wᵢ |∇Cᵢ|²
//! Δxᵢ = -wᵢ · λ · ∇Cᵢ · kᵢ
//! ```
//!
//! where `d` is the current separation, `wᵢ` the inverse masses and `kᵢ` the
//! stiffness of the body owning particle `i`. Particles with `wᵢ = 0` are
//! never written.
//!
//! A constraint that finds its primitives out of contact (too far apart,
//! closest points beyond a segment end, projection outside the triangle) or
//! degenerate (parallel segments at zero distance, zero-area triangle) reports
//! "no correction" instead of failing.

use nalgebra::{Point3, Vector3};
use smallvec::SmallVec;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::types::{BodySlot, CollisionConfig, ParticleRef};

/// Below this `|det|` the segment closest-point system is treated as singular.
pub const SINGULAR_DET_EPS: f64 = 1e-12;

/// Lengths and weights below this are treated as zero.
pub const DEGENERATE_EPS: f64 = 1e-12;

/// Mutable physics buffers of one body, borrowed for the solve phase.
#[derive(Debug)]
pub struct BodyBuffers<'a> {
    /// Particle positions.
    pub positions: &'a mut [Point3<f64>],
    /// Particle inverse masses (0 = immovable).
    pub inv_masses: &'a [f64],
}

/// Buffers of both sides of a pair.
#[derive(Debug)]
pub struct PairBuffers<'a> {
    /// Body A.
    pub a: BodyBuffers<'a>,
    /// Body B.
    pub b: BodyBuffers<'a>,
}

impl<'a> PairBuffers<'a> {
    /// Borrow two bodies' buffers.
    pub const fn new(a: BodyBuffers<'a>, b: BodyBuffers<'a>) -> Self {
        Self { a, b }
    }

    fn side(&self, slot: BodySlot) -> &BodyBuffers<'a> {
        match slot {
            BodySlot::A => &self.a,
            BodySlot::B => &self.b,
        }
    }

    fn side_mut(&mut self, slot: BodySlot) -> &mut BodyBuffers<'a> {
        match slot {
            BodySlot::A => &mut self.a,
            BodySlot::B => &mut self.b,
        }
    }

    /// Current position of a particle.
    #[must_use]
    pub fn position(&self, particle: ParticleRef) -> Point3<f64> {
        self.side(particle.slot).positions[particle.index]
    }

    /// Inverse mass of a particle.
    #[must_use]
    pub fn inv_mass(&self, particle: ParticleRef) -> f64 {
        self.side(particle.slot).inv_masses[particle.index]
    }

    fn displace(&mut self, particle: ParticleRef, delta: Vector3<f64>) {
        self.side_mut(particle.slot).positions[particle.index] += delta;
    }
}

/// Collision parameters of both sides of a pair.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PairConfig {
    /// Body A.
    pub a: CollisionConfig,
    /// Body B.
    pub b: CollisionConfig,
}

impl PairConfig {
    /// Combine two sides.
    #[must_use]
    pub const fn new(a: CollisionConfig, b: CollisionConfig) -> Self {
        Self { a, b }
    }

    /// Configuration of one side.
    #[must_use]
    pub const fn get(&self, slot: BodySlot) -> &CollisionConfig {
        match slot {
            BodySlot::A => &self.a,
            BodySlot::B => &self.b,
        }
    }

    /// Target separation of the pair.
    #[must_use]
    pub fn rest_distance(&self) -> f64 {
        self.a.proximity + self.b.proximity
    }
}

/// Apply `Δxᵢ = -wᵢ λ ∇Cᵢ kᵢ` to every movable particle.
///
/// Returns the largest displacement written, or `None` if every particle is
/// immovable.
fn apply_correction<const N: usize>(
    buffers: &mut PairBuffers<'_>,
    config: &PairConfig,
    particles: [ParticleRef; N],
    gradients: [Vector3<f64>; N],
    constraint_value: f64,
) -> Option<f64> {
    let weights = particles.map(|p| buffers.inv_mass(p));

    let denominator: f64 = weights
        .iter()
        .zip(&gradients)
        .map(|(w, g)| w * g.norm_squared())
        .sum();
    if denominator < DEGENERATE_EPS {
        return None;
    }

    let lambda = constraint_value / denominator;
    let mut max_displacement: f64 = 0.0;

    for ((particle, w), grad) in particles.into_iter().zip(weights).zip(gradients) {
        if w <= 0.0 {
            continue;
        }
        let stiffness = config.get(particle.slot).stiffness;
        let delta = grad * (-w * lambda * stiffness);
        max_displacement = max_displacement.max(delta.norm());
        buffers.displace(particle, delta);
    }

    Some(max_displacement)
}

/// Type of collision constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ConstraintType {
    /// Segment against segment.
    EdgeEdge,
    /// Point against triangle.
    PointTriangle,
}

/// A collision constraint solved by PBD projection.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum CollisionConstraint {
    /// Edge-edge constraint.
    EdgeEdge(EdgeEdgeConstraint),
    /// Point-triangle constraint.
    PointTriangle(PointTriangleConstraint),
}

impl CollisionConstraint {
    /// Get the type of this constraint.
    #[must_use]
    pub const fn constraint_type(&self) -> ConstraintType {
        match self {
            Self::EdgeEdge(_) => ConstraintType::EdgeEdge,
            Self::PointTriangle(_) => ConstraintType::PointTriangle,
        }
    }

    /// Get the particles involved in this constraint.
    #[must_use]
    pub fn particles(&self) -> SmallVec<[ParticleRef; 4]> {
        match self {
            Self::EdgeEdge(c) => SmallVec::from_buf([c.edge_a[0], c.edge_a[1], c.edge_b[0], c.edge_b[1]]),
            Self::PointTriangle(c) => SmallVec::from_buf([
                c.point,
                c.triangle[0],
                c.triangle[1],
                c.triangle[2],
            ]),
        }
    }

    /// Project this constraint once.
    ///
    /// Returns the largest particle displacement, or `None` if no correction
    /// was applied.
    pub fn project(&self, buffers: &mut PairBuffers<'_>) -> Option<f64> {
        match self {
            Self::EdgeEdge(c) => c.project(buffers),
            Self::PointTriangle(c) => c.project(buffers),
        }
    }

    /// Project this constraint once; `true` if a correction was applied.
    pub fn solve(&self, buffers: &mut PairBuffers<'_>) -> bool {
        self.project(buffers).is_some()
    }
}

impl From<EdgeEdgeConstraint> for CollisionConstraint {
    fn from(c: EdgeEdgeConstraint) -> Self {
        Self::EdgeEdge(c)
    }
}

impl From<PointTriangleConstraint> for CollisionConstraint {
    fn from(c: PointTriangleConstraint) -> Self {
        Self::PointTriangle(c)
    }
}

/// Keeps two segments at least `proximity_a + proximity_b` apart.
///
/// The closest points are found from the 2×2 normal equations of the two
/// segments. Parameters outside `[0, 1]` mean the closest approach lies past
/// a segment end; that is treated as no contact rather than clamped.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EdgeEdgeConstraint {
    /// Endpoints of the first segment.
    pub edge_a: [ParticleRef; 2],
    /// Endpoints of the second segment.
    pub edge_b: [ParticleRef; 2],
    /// Collision parameters of both sides.
    pub config: PairConfig,
}

impl EdgeEdgeConstraint {
    /// Create a new edge-edge constraint.
    #[must_use]
    pub const fn new(edge_a: [ParticleRef; 2], edge_b: [ParticleRef; 2], config: PairConfig) -> Self {
        Self {
            edge_a,
            edge_b,
            config,
        }
    }

    /// Closest-point parameters `(s, t)` of segments `x0-x1` and `x2-x3`.
    ///
    /// Falls back to the midpoints when the segments are parallel or
    /// degenerate.
    #[must_use]
    pub fn closest_parameters(
        x0: &Point3<f64>,
        x1: &Point3<f64>,
        x2: &Point3<f64>,
        x3: &Point3<f64>,
    ) -> (f64, f64) {
        let u = x1 - x0;
        let v = x3 - x2;
        let w = x2 - x0;

        let a = u.dot(&u);
        let b = u.dot(&v);
        let c = v.dot(&v);
        let d = v.dot(&w);
        let e = u.dot(&w);

        let det = a.mul_add(c, -(b * b));
        if det.abs() <= SINGULAR_DET_EPS {
            return (0.5, 0.5);
        }

        let s = c.mul_add(e, -(b * d)) / det;
        let t = b.mul_add(e, -(a * d)) / det;
        (s, t)
    }

    /// Project this constraint once.
    pub fn project(&self, buffers: &mut PairBuffers<'_>) -> Option<f64> {
        let [r0, r1] = self.edge_a;
        let [r2, r3] = self.edge_b;

        let x0 = buffers.position(r0);
        let x1 = buffers.position(r1);
        let x2 = buffers.position(r2);
        let x3 = buffers.position(r3);

        let (s, t) = Self::closest_parameters(&x0, &x1, &x2, &x3);
        if !(0.0..=1.0).contains(&s) || !(0.0..=1.0).contains(&t) {
            return None;
        }

        let p = x0 + (x1 - x0) * s;
        let q = x2 + (x3 - x2) * t;
        let diff = q - p;
        let distance = diff.norm();

        let rest = self.config.rest_distance();
        if distance > rest || distance < DEGENERATE_EPS {
            return None;
        }

        let n = diff / distance;
        let gradients = [-n * (1.0 - s), -n * s, n * (1.0 - t), n * t];

        apply_correction(
            buffers,
            &self.config,
            [r0, r1, r2, r3],
            gradients,
            distance - rest,
        )
    }

    /// Project this constraint once; `true` if a correction was applied.
    pub fn solve(&self, buffers: &mut PairBuffers<'_>) -> bool {
        self.project(buffers).is_some()
    }
}

/// Keeps a point at least `proximity_a + proximity_b` above a triangle.
///
/// "Above" is measured along the triangle normal `(t1 - t0) × (t2 - t0)`, so
/// a point that slipped just behind the face is pushed back out on the front
/// side. Only points whose projection falls inside the triangle (boundary
/// included) are corrected.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PointTriangleConstraint {
    /// The point.
    pub point: ParticleRef,
    /// Triangle corners, in winding order.
    pub triangle: [ParticleRef; 3],
    /// Collision parameters of both sides.
    pub config: PairConfig,
}

impl PointTriangleConstraint {
    /// Create a new point-triangle constraint.
    #[must_use]
    pub const fn new(point: ParticleRef, triangle: [ParticleRef; 3], config: PairConfig) -> Self {
        Self {
            point,
            triangle,
            config,
        }
    }

    /// Barycentric weights `(w0, w1, w2)` of the projection of `p` onto the
    /// plane of `(t0, t1, t2)`, or `None` for a degenerate triangle.
    #[must_use]
    pub fn barycentric(
        p: &Point3<f64>,
        t0: &Point3<f64>,
        t1: &Point3<f64>,
        t2: &Point3<f64>,
    ) -> Option<[f64; 3]> {
        let e1 = t1 - t0;
        let e2 = t2 - t0;
        let n = e1.cross(&e2);
        let nn = n.norm_squared();
        if nn.sqrt() < DEGENERATE_EPS {
            return None;
        }

        let v = p - t0;
        let w1 = n.dot(&v.cross(&e2)) / nn;
        let w2 = n.dot(&e1.cross(&v)) / nn;
        Some([1.0 - w1 - w2, w1, w2])
    }

    /// Project this constraint once.
    pub fn project(&self, buffers: &mut PairBuffers<'_>) -> Option<f64> {
        let [r0, r1, r2] = self.triangle;

        let p = buffers.position(self.point);
        let t0 = buffers.position(r0);
        let t1 = buffers.position(r1);
        let t2 = buffers.position(r2);

        let bary = Self::barycentric(&p, &t0, &t1, &t2)?;
        if bary.iter().any(|&w| w < 0.0) {
            return None;
        }

        let n = (t1 - t0).cross(&(t2 - t0)).normalize();
        let height = (p - t0).dot(&n);

        let rest = self.config.rest_distance();
        if height > rest {
            return None;
        }

        let [g0, g1, g2] = bary;
        let gradients = [n, -n * g0, -n * g1, -n * g2];

        apply_correction(
            buffers,
            &self.config,
            [self.point, r0, r1, r2],
            gradients,
            height - rest,
        )
    }

    /// Project this constraint once; `true` if a correction was applied.
    pub fn solve(&self, buffers: &mut PairBuffers<'_>) -> bool {
        self.project(buffers).is_some()
    }
}
