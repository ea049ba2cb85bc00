//! Per-pair constraint storage, reset every step.

use crate::constraints::{CollisionConstraint, ConstraintType};
use crate::types::BodySlot;

/// Ordered constraint arena owned by one pairing.
///
/// Insertion order is detection order, which is also solve order. [`reset`]
/// drops the logical contents but keeps the allocation, so a pairing that
/// produces a similar number of contacts every step does not reallocate.
///
/// [`reset`]: ConstraintPool::reset
#[derive(Debug, Clone, Default)]
pub struct ConstraintPool {
    constraints: Vec<CollisionConstraint>,
}

impl ConstraintPool {
    /// Create an empty pool.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            constraints: Vec::new(),
        }
    }

    /// Create an empty pool with room for `capacity` constraints.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            constraints: Vec::with_capacity(capacity),
        }
    }

    /// Forget all constraints, keeping capacity.
    pub fn reset(&mut self) {
        self.constraints.clear();
    }

    /// Append one constraint.
    pub fn push(&mut self, constraint: impl Into<CollisionConstraint>) {
        self.constraints.push(constraint.into());
    }

    /// Append constraints in iteration order.
    pub fn extend<I>(&mut self, constraints: I)
    where
        I: IntoIterator<Item = CollisionConstraint>,
    {
        self.constraints.extend(constraints);
    }

    /// Reserve room for `additional` more constraints.
    pub fn reserve(&mut self, additional: usize) {
        self.constraints.reserve(additional);
    }

    /// Constraints in solve order.
    #[must_use]
    pub fn as_slice(&self) -> &[CollisionConstraint] {
        &self.constraints
    }

    /// Iterate over constraints in solve order.
    pub fn iter(&self) -> std::slice::Iter<'_, CollisionConstraint> {
        self.constraints.iter()
    }

    /// Number of constraints.
    #[must_use]
    pub fn len(&self) -> usize {
        self.constraints.len()
    }

    /// Whether the pool holds no constraints.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }

    /// Allocated capacity.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.constraints.capacity()
    }

    /// Number of constraints of one type.
    #[must_use]
    pub fn count_by_type(&self, constraint_type: ConstraintType) -> usize {
        self.constraints
            .iter()
            .filter(|c| c.constraint_type() == constraint_type)
            .count()
    }

    /// Physics indices on one side referenced by any constraint.
    ///
    /// Indices repeat when several constraints share a particle.
    pub fn particles_on(&self, slot: BodySlot) -> impl Iterator<Item = usize> + '_ {
        self.constraints
            .iter()
            .flat_map(CollisionConstraint::particles)
            .filter(move |p| p.slot == slot)
            .map(|p| p.index)
    }
}

impl<'a> IntoIterator for &'a ConstraintPool {
    type Item = &'a CollisionConstraint;
    type IntoIter = std::slice::Iter<'a, CollisionConstraint>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
