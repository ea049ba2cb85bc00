//! Collision handling for one pair of bodies.
//!
//! # Step Sequence
//!
//! ```text
//! Idle ─▶ BroadPhase ─┬─ no overlap ─────────────────────────▶ Idle
//!                     └─ overlap ─▶ NarrowPhase ─▶ Solving ─▶ Idle
//! ```
//!
//! 1. Reset the pair's constraint pool
//! 2. Broad phase; on no overlap the step ends with an empty pool
//! 3. Narrow phase fills the pool
//! 4. The solver relaxes the pool against both bodies' buffers
//! 5. The bodies' positions now hold the post-collision state
//!
//! Nothing but the pool's allocation survives from one step to the next.

use tracing::{debug, trace, warn};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::broad_phase::{broad_phase, require_config};
use crate::constraints::{PairBuffers, PairConfig};
use crate::error::{CollisionError, Result};
use crate::narrow_phase::{NarrowPhaseConfig, check_supported, narrow_phase};
use crate::pool::ConstraintPool;
use crate::solver::{CollisionSolver, SolverConfig, SolverStats};
use crate::types::{BodyId, CollisionConfig};
use crate::CollisionBody;

/// Configuration of one pairing.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct HandlingConfig {
    /// Constraint solver settings.
    pub solver: SolverConfig,
    /// Candidate generation settings.
    pub narrow_phase: NarrowPhaseConfig,
}

impl HandlingConfig {
    /// Real-time preset.
    #[must_use]
    pub fn realtime() -> Self {
        Self {
            solver: SolverConfig::realtime(),
            narrow_phase: NarrowPhaseConfig::default(),
        }
    }

    /// Accuracy preset.
    #[must_use]
    pub fn accurate() -> Self {
        Self {
            solver: SolverConfig::accurate(),
            narrow_phase: NarrowPhaseConfig::default(),
        }
    }

    /// Check both halves of the configuration.
    pub fn validate(&self) -> Result<()> {
        self.solver.validate()?;
        self.narrow_phase.validate()
    }
}

/// Where a pairing is within its step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PairPhase {
    /// Between steps.
    #[default]
    Idle,
    /// Testing bounding boxes.
    BroadPhase,
    /// Generating constraints.
    NarrowPhase,
    /// Relaxing constraints.
    Solving,
}

/// Result of one collision step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StepOutcome {
    /// The padded bounding boxes are disjoint; nothing was generated.
    NoOverlap,
    /// Constraints were generated and solved.
    Resolved {
        /// Constraints generated this step.
        constraints: usize,
        /// Solver statistics.
        stats: SolverStats,
    },
}

impl StepOutcome {
    /// Constraints generated this step.
    #[must_use]
    pub const fn constraints(&self) -> usize {
        match self {
            Self::NoOverlap => 0,
            Self::Resolved { constraints, .. } => *constraints,
        }
    }

    /// Whether the narrow phase and solver ran.
    #[must_use]
    pub const fn is_resolved(&self) -> bool {
        matches!(self, Self::Resolved { .. })
    }
}

fn checked_config<B: CollisionBody + ?Sized>(body: &B) -> Result<CollisionConfig> {
    let config = require_config(body)?;
    config.validate().map_err(|e| match e {
        CollisionError::InvalidConfig(msg) => {
            CollisionError::InvalidConfig(format!("body '{}': {msg}", body.name()))
        }
        other => other,
    })?;
    Ok(config)
}

/// Every particle needs an inverse mass before the solver may move it.
fn check_buffers<B: CollisionBody + ?Sized>(body: &B) -> Result<()> {
    let (positions, inv_masses) = (body.positions().len(), body.inverse_masses().len());
    if inv_masses != positions {
        return Err(CollisionError::index_out_of_range(
            positions.max(inv_masses) - 1,
            positions.min(inv_masses),
            "inverse masses",
        ));
    }
    Ok(())
}

/// Collision handling between two bodies.
#[derive(Debug, Clone)]
pub struct CollisionHandling {
    body_a: BodyId,
    body_b: BodyId,
    config: HandlingConfig,
    solver: CollisionSolver,
    pool: ConstraintPool,
    phase: PairPhase,
    last_stats: Option<SolverStats>,
}

impl CollisionHandling {
    /// Bind two bodies into a pairing.
    ///
    /// # Errors
    ///
    /// Returns an error if both are the same body, if either lacks a valid
    /// collision configuration, if `config` is invalid, or if no algorithm
    /// handles their geometry kinds.
    pub fn new<A, B>(a: &A, b: &B, config: HandlingConfig) -> Result<Self>
    where
        A: CollisionBody + ?Sized,
        B: CollisionBody + ?Sized,
    {
        if a.id() == b.id() {
            return Err(CollisionError::IdenticalBodies(a.id()));
        }
        checked_config(a)
            .and_then(|_| checked_config(b))
            .inspect_err(|e| warn!(a = a.name(), b = b.name(), error = %e, "rejected collision config"))?;
        config.validate()?;
        check_supported(a.colliding_geometry().kind(), b.colliding_geometry().kind())?;

        debug!(a = a.name(), b = b.name(), "created collision pairing");

        Ok(Self {
            body_a: a.id(),
            body_b: b.id(),
            config,
            solver: CollisionSolver::new(config.solver),
            pool: ConstraintPool::new(),
            phase: PairPhase::Idle,
            last_stats: None,
        })
    }

    /// Ids of the bound bodies, A first.
    #[must_use]
    pub const fn body_ids(&self) -> (BodyId, BodyId) {
        (self.body_a, self.body_b)
    }

    /// Get the pairing configuration.
    #[must_use]
    pub const fn config(&self) -> &HandlingConfig {
        &self.config
    }

    /// Constraints generated by the last step.
    #[must_use]
    pub const fn pool(&self) -> &ConstraintPool {
        &self.pool
    }

    /// Current phase. Always [`PairPhase::Idle`] between steps.
    #[must_use]
    pub const fn phase(&self) -> PairPhase {
        self.phase
    }

    /// Solver statistics from the last step that reached the solver.
    #[must_use]
    pub const fn last_stats(&self) -> Option<&SolverStats> {
        self.last_stats.as_ref()
    }

    fn enter(&mut self, phase: PairPhase) {
        trace!(from = ?self.phase, to = ?phase, "pair phase");
        self.phase = phase;
    }

    /// Run one collision step, moving both bodies' particles in place.
    ///
    /// # Errors
    ///
    /// Returns [`CollisionError::BodyMismatch`] if `a` and `b` are not the
    /// bodies this pairing was built for, [`CollisionError::IndexOutOfRange`]
    /// if a body's inverse masses and positions differ in length, and
    /// propagates configuration and index-mapping errors. Degenerate geometry
    /// is never an error.
    pub fn step<A, B>(&mut self, a: &mut A, b: &mut B) -> Result<StepOutcome>
    where
        A: CollisionBody + ?Sized,
        B: CollisionBody + ?Sized,
    {
        if (a.id(), b.id()) != (self.body_a, self.body_b) {
            return Err(CollisionError::BodyMismatch {
                expected_a: self.body_a,
                expected_b: self.body_b,
                got_a: a.id(),
                got_b: b.id(),
            });
        }

        self.pool.reset();
        let outcome = self.run(a, b);
        self.enter(PairPhase::Idle);
        outcome
    }

    fn run<A, B>(&mut self, a: &mut A, b: &mut B) -> Result<StepOutcome>
    where
        A: CollisionBody + ?Sized,
        B: CollisionBody + ?Sized,
    {
        self.enter(PairPhase::BroadPhase);
        if !broad_phase(&*a, &*b)? {
            debug!(a = a.name(), b = b.name(), "no overlap");
            return Ok(StepOutcome::NoOverlap);
        }

        self.enter(PairPhase::NarrowPhase);
        let pair = PairConfig::new(checked_config(&*a)?, checked_config(&*b)?);
        let constraints = narrow_phase(&*a, &*b, &pair, &self.config.narrow_phase, &mut self.pool)?;

        check_buffers(&*a)?;
        check_buffers(&*b)?;

        self.enter(PairPhase::Solving);
        let mut buffers = PairBuffers::new(a.buffers_mut(), b.buffers_mut());
        let stats = self.solver.solve(&self.pool, &mut buffers);
        self.last_stats = Some(stats);

        debug!(
            a = a.name(),
            b = b.name(),
            constraints,
            iterations = stats.iterations,
            corrections = stats.corrections,
            max_displacement = stats.first_pass_displacement,
            "resolved collisions"
        );

        Ok(StepOutcome::Resolved { constraints, stats })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::body::PbdBody;
    use crate::mesh::{CollisionGeometry, Triangle};
    use crate::types::BodySlot;
    use nalgebra::Point3;

    fn point(z: f64) -> PbdBody {
        PbdBody::new("point", vec![Point3::new(0.0, 0.0, z)], &[1.0], CollisionGeometry::point_set(1))
            .unwrap()
            .with_config(CollisionConfig::rigid(0.1))
    }

    fn floor() -> PbdBody {
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
        .with_config(CollisionConfig::rigid(0.1))
    }

    #[test]
    fn test_identical_bodies_rejected() {
        let body = floor();
        let result = CollisionHandling::new(&body, &body, HandlingConfig::default());
        assert!(matches!(result, Err(CollisionError::IdenticalBodies(id)) if id == body.id()));
    }

    #[test]
    fn test_missing_config_rejected() {
        let bare = PbdBody::new("bare", vec![Point3::origin()], &[1.0], CollisionGeometry::point_set(1))
            .unwrap();
        let result = CollisionHandling::new(&bare, &floor(), HandlingConfig::default());
        assert!(matches!(result, Err(CollisionError::MissingConfig(_))));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let soft = point(0.0).with_config(CollisionConfig::new(0.1, 0.0));
        let result = CollisionHandling::new(&soft, &floor(), HandlingConfig::default());
        assert!(matches!(result, Err(CollisionError::InvalidConfig(msg)) if msg.contains("point")));
    }

    #[test]
    fn test_unsupported_geometry_rejected() {
        let result = CollisionHandling::new(&floor(), &point(0.0), HandlingConfig::default());
        assert!(matches!(result, Err(CollisionError::UnsupportedGeometry { .. })));
    }

    #[test]
    fn test_step_resolves_and_returns_to_idle() {
        let mut a = point(0.0);
        let mut b = floor();
        let mut handling = CollisionHandling::new(&a, &b, HandlingConfig::default()).unwrap();

        let outcome = handling.step(&mut a, &mut b).unwrap();
        assert_eq!(outcome.constraints(), 1);
        assert!(outcome.is_resolved());
        assert_eq!(handling.phase(), PairPhase::Idle);
        assert_eq!(handling.pool().len(), 1);
        assert!(handling.last_stats().is_some());

        a.mark_colliding(handling.pool().particles_on(BodySlot::A));
        assert!(a.is_colliding(0));
    }

    #[test]
    fn test_no_overlap_leaves_pool_empty() {
        let mut a = point(0.0);
        let mut b = floor();
        let mut handling = CollisionHandling::new(&a, &b, HandlingConfig::default()).unwrap();
        handling.step(&mut a, &mut b).unwrap();
        assert!(!handling.pool().is_empty());

        let mut far = point(5.0);
        let mut far_handling = CollisionHandling::new(&far, &b, HandlingConfig::default()).unwrap();
        let outcome = far_handling.step(&mut far, &mut b).unwrap();
        assert_eq!(outcome, StepOutcome::NoOverlap);
        assert!(far_handling.pool().is_empty());
        assert_eq!(far.positions()[0], Point3::new(0.0, 0.0, 5.0));
    }

    #[test]
    fn test_body_mismatch() {
        let mut a = point(0.0);
        let mut b = floor();
        let mut other = point(0.0);
        let mut handling = CollisionHandling::new(&a, &b, HandlingConfig::default()).unwrap();

        assert!(matches!(
            handling.step(&mut other, &mut b),
            Err(CollisionError::BodyMismatch { .. })
        ));
        assert!(handling.step(&mut a, &mut b).is_ok());
    }
}
