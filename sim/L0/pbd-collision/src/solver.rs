//! Gauss-Seidel relaxation of a pair's collision constraints.
//!
//! # Algorithm Overview
//!
//! ```text
//! For each iteration (fixed budget):
//!   For each constraint, in pool order:
//!     project it against the current positions
//!   Stop early if a tolerance is set and no particle moved more than it
//! ```
//!
//! Each projection sees the positions written by the ones before it in the
//! same pass. The solver holds only its configuration, so one instance can be
//! shared by any number of pairings.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::constraints::PairBuffers;
use crate::error::{CollisionError, Result};
use crate::pool::ConstraintPool;

/// Configuration for the collision solver.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SolverConfig {
    /// Number of relaxation passes over the pool.
    /// More iterations = deeper separation of stacked contacts, but slower.
    pub num_iterations: u32,

    /// Stop once a whole pass moves no particle further than this.
    /// `None` always runs the full iteration budget.
    pub convergence_tolerance: Option<f64>,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            num_iterations: 5,
            convergence_tolerance: None,
        }
    }
}

impl SolverConfig {
    /// Create a config optimized for real-time simulation.
    #[must_use]
    pub const fn realtime() -> Self {
        Self {
            num_iterations: 2,
            convergence_tolerance: Some(1e-6),
        }
    }

    /// Create a config optimized for accuracy.
    #[must_use]
    pub const fn accurate() -> Self {
        Self {
            num_iterations: 20,
            convergence_tolerance: Some(1e-12),
        }
    }

    /// Check the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.num_iterations == 0 {
            return Err(CollisionError::invalid_config(
                "num_iterations must be at least 1",
            ));
        }
        if let Some(tolerance) = self.convergence_tolerance {
            if !tolerance.is_finite() || tolerance <= 0.0 {
                return Err(CollisionError::invalid_config(format!(
                    "convergence_tolerance must be finite and > 0, got {tolerance}"
                )));
            }
        }
        Ok(())
    }
}

/// Statistics from one solve.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SolverStats {
    /// Passes actually run.
    pub iterations: u32,
    /// Constraints in the pool.
    pub num_constraints: usize,
    /// Constraints that applied a correction in the last pass.
    pub corrections: usize,
    /// Largest particle displacement in the first pass.
    pub first_pass_displacement: f64,
    /// Largest particle displacement in the last pass.
    pub last_pass_displacement: f64,
    /// Whether a pass fell below the convergence tolerance.
    /// Always `false` when no tolerance is set.
    pub converged: bool,
}

/// Collision constraint solver.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CollisionSolver {
    config: SolverConfig,
}

impl CollisionSolver {
    /// Create a new solver with the given configuration.
    #[must_use]
    pub const fn new(config: SolverConfig) -> Self {
        Self { config }
    }

    /// Get the solver configuration.
    #[must_use]
    pub const fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// Relax every constraint in `pool` against `buffers`.
    ///
    /// Positions are updated in place. An empty pool runs no passes.
    pub fn solve(&self, pool: &ConstraintPool, buffers: &mut PairBuffers<'_>) -> SolverStats {
        let mut stats = SolverStats {
            num_constraints: pool.len(),
            ..SolverStats::default()
        };
        if pool.is_empty() {
            return stats;
        }

        for iteration in 0..self.config.num_iterations {
            let mut corrections = 0;
            let mut max_displacement: f64 = 0.0;

            for constraint in pool {
                if let Some(displacement) = constraint.project(buffers) {
                    corrections += 1;
                    max_displacement = max_displacement.max(displacement);
                }
            }

            if iteration == 0 {
                stats.first_pass_displacement = max_displacement;
            }
            stats.iterations = iteration + 1;
            stats.corrections = corrections;
            stats.last_pass_displacement = max_displacement;

            if self
                .config
                .convergence_tolerance
                .is_some_and(|tol| max_displacement <= tol)
            {
                stats.converged = true;
                break;
            }
        }

        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraints::{BodyBuffers, PairConfig, PointTriangleConstraint};
    use crate::types::{CollisionConfig, ParticleRef};
    use approx::assert_relative_eq;
    use nalgebra::Point3;

    fn floor_pool() -> ConstraintPool {
        let mut pool = ConstraintPool::new();
        pool.push(PointTriangleConstraint::new(
            ParticleRef::a(0),
            [ParticleRef::b(0), ParticleRef::b(1), ParticleRef::b(2)],
            PairConfig::new(CollisionConfig::rigid(0.1), CollisionConfig::rigid(0.1)),
        ));
        pool
    }

    fn floor() -> Vec<Point3<f64>> {
        vec![
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(-1.0, 1.0, 0.0),
            Point3::new(-1.0, -1.0, 0.0),
        ]
    }

    #[test]
    fn test_config_presets() {
        assert_eq!(SolverConfig::default().num_iterations, 5);
        assert!(SolverConfig::default().validate().is_ok());
        assert!(SolverConfig::realtime().validate().is_ok());
        assert!(SolverConfig::accurate().num_iterations > SolverConfig::realtime().num_iterations);
    }

    #[test]
    fn test_config_validation() {
        let zero = SolverConfig {
            num_iterations: 0,
            ..SolverConfig::default()
        };
        assert!(zero.validate().is_err());

        let negative = SolverConfig {
            convergence_tolerance: Some(-1.0),
            ..SolverConfig::default()
        };
        assert!(negative.validate().is_err());
    }

    #[test]
    fn test_empty_pool_runs_nothing() {
        let solver = CollisionSolver::default();
        let mut a = vec![Point3::origin()];
        let mut b = floor();
        let mut buffers = PairBuffers::new(
            BodyBuffers {
                positions: &mut a,
                inv_masses: &[1.0],
            },
            BodyBuffers {
                positions: &mut b,
                inv_masses: &[0.0; 3],
            },
        );
        let stats = solver.solve(&ConstraintPool::new(), &mut buffers);
        assert_eq!(stats, SolverStats::default());
    }

    #[test]
    fn test_fixed_budget() {
        let solver = CollisionSolver::default();
        let mut a = vec![Point3::origin()];
        let mut b = floor();
        let mut buffers = PairBuffers::new(
            BodyBuffers {
                positions: &mut a,
                inv_masses: &[1.0],
            },
            BodyBuffers {
                positions: &mut b,
                inv_masses: &[0.0; 3],
            },
        );
        let stats = solver.solve(&floor_pool(), &mut buffers);

        assert_eq!(stats.iterations, 5);
        assert_eq!(stats.num_constraints, 1);
        assert_eq!(stats.corrections, 1);
        assert_relative_eq!(stats.first_pass_displacement, 0.2, epsilon = 1e-12);
        assert!(stats.last_pass_displacement < 1e-12);
        assert!(!stats.converged);
        assert_relative_eq!(a[0].z, 0.2, epsilon = 1e-12);
    }

    #[test]
    fn test_early_exit() {
        let solver = CollisionSolver::new(SolverConfig {
            num_iterations: 50,
            convergence_tolerance: Some(1e-9),
        });
        let mut a = vec![Point3::origin()];
        let mut b = floor();
        let mut buffers = PairBuffers::new(
            BodyBuffers {
                positions: &mut a,
                inv_masses: &[1.0],
            },
            BodyBuffers {
                positions: &mut b,
                inv_masses: &[0.0; 3],
            },
        );
        let stats = solver.solve(&floor_pool(), &mut buffers);

        assert!(stats.converged);
        assert!(stats.iterations < 50);
    }
}
