//! Core types shared by the collision pipeline.
//!
//! - [`BodyId`] / [`PairingId`] - Unique identifiers handed out by global generators
//! - [`BodySlot`] / [`ParticleRef`] - Arena-style references into one side of a pair
//! - [`CollisionConfig`] - Per-body proximity and stiffness
//! - [`VertexFlags`] - Per-vertex state (pinned, colliding)

use std::sync::atomic::{AtomicU64, Ordering};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{CollisionError, Result};

/// Unique identifier for a body taking part in collisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BodyId(pub u64);

impl BodyId {
    /// Create a new body ID.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get the raw ID value.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl From<u64> for BodyId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for BodyId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Body({})", self.0)
    }
}

/// Handle to a collision pairing registered in a scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PairingId(pub u64);

impl PairingId {
    /// Get the raw ID value.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for PairingId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Pairing({})", self.0)
    }
}

/// Thread-safe counter for generating unique IDs.
pub struct IdGenerator {
    next_id: AtomicU64,
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl IdGenerator {
    /// Create a new ID generator starting at 0.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            next_id: AtomicU64::new(0),
        }
    }

    /// Generate the next raw ID.
    pub fn next_raw(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }
}

static BODY_IDS: IdGenerator = IdGenerator::new();
static PAIRING_IDS: IdGenerator = IdGenerator::new();

/// Generate a new unique body ID.
pub fn next_body_id() -> BodyId {
    BodyId(BODY_IDS.next_raw())
}

/// Generate a new unique pairing ID.
pub fn next_pairing_id() -> PairingId {
    PairingId(PAIRING_IDS.next_raw())
}

/// Which side of a collision pair a particle belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum BodySlot {
    /// The first body of the pair.
    A,
    /// The second body of the pair.
    B,
}

/// A particle addressed by pair side and physics vertex index.
///
/// Constraints hold these instead of references into position buffers; the
/// solver resolves the slot to a buffer when the constraint is projected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ParticleRef {
    /// Side of the pair.
    pub slot: BodySlot,
    /// Index into that side's physics buffers.
    pub index: usize,
}

impl ParticleRef {
    /// A particle on body A.
    #[must_use]
    pub const fn a(index: usize) -> Self {
        Self {
            slot: BodySlot::A,
            index,
        }
    }

    /// A particle on body B.
    #[must_use]
    pub const fn b(index: usize) -> Self {
        Self {
            slot: BodySlot::B,
            index,
        }
    }
}

/// Per-body collision parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CollisionConfig {
    /// Distance below which this body is considered in contact.
    /// Two bodies separate to the sum of their proximities.
    pub proximity: f64,

    /// Fraction of the computed correction applied to this body's particles.
    /// Must lie in `(0, 1]`.
    pub stiffness: f64,
}

impl CollisionConfig {
    /// Create a new configuration.
    #[must_use]
    pub const fn new(proximity: f64, stiffness: f64) -> Self {
        Self {
            proximity,
            stiffness,
        }
    }

    /// Thin contact shell with full-strength correction.
    #[must_use]
    pub const fn rigid(proximity: f64) -> Self {
        Self::new(proximity, 1.0)
    }

    /// Check that both parameters are in range.
    pub fn validate(&self) -> Result<()> {
        if !self.proximity.is_finite() || self.proximity < 0.0 {
            return Err(CollisionError::invalid_config(format!(
                "proximity must be finite and >= 0, got {}",
                self.proximity
            )));
        }
        if !(self.stiffness > 0.0 && self.stiffness <= 1.0) {
            return Err(CollisionError::invalid_config(format!(
                "stiffness must be in (0, 1], got {}",
                self.stiffness
            )));
        }
        Ok(())
    }
}

bitflags::bitflags! {
    /// Flags for vertex state.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    #[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
    pub struct VertexFlags: u32 {
        /// Vertex is pinned (zero inverse mass).
        const PINNED = 0b0000_0001;
        /// Vertex took part in a collision constraint during the last step.
        const COLLIDING = 0b0000_0010;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_body_id() {
        let id = BodyId::new(42);
        assert_eq!(id.raw(), 42);
        assert_eq!(id.to_string(), "Body(42)");

        let id2: BodyId = 42.into();
        assert_eq!(id, id2);
    }

    #[test]
    fn test_id_generator() {
        let generator = IdGenerator::new();
        assert_eq!(generator.next_raw(), 0);
        assert_eq!(generator.next_raw(), 1);
    }

    #[test]
    fn test_global_ids_are_unique() {
        let a = next_body_id();
        let b = next_body_id();
        assert_ne!(a, b);
        assert_ne!(next_pairing_id(), next_pairing_id());
    }

    #[test]
    fn test_particle_ref() {
        assert_eq!(ParticleRef::a(3).slot, BodySlot::A);
        assert_eq!(ParticleRef::b(5).index, 5);
    }

    #[test]
    fn test_config_validation() {
        assert!(CollisionConfig::new(0.1, 1.0).validate().is_ok());
        assert!(CollisionConfig::new(0.0, 0.5).validate().is_ok());
        assert!(CollisionConfig::new(-0.1, 1.0).validate().is_err());
        assert!(CollisionConfig::new(0.1, 0.0).validate().is_err());
        assert!(CollisionConfig::new(0.1, 1.5).validate().is_err());
        assert!(CollisionConfig::new(f64::NAN, 1.0).validate().is_err());
        assert!(CollisionConfig::new(0.1, f64::NAN).validate().is_err());
    }

    #[test]
    fn test_vertex_flags() {
        let mut flags = VertexFlags::empty();
        flags.insert(VertexFlags::PINNED | VertexFlags::COLLIDING);
        flags.remove(VertexFlags::PINNED);
        assert!(!flags.contains(VertexFlags::PINNED));
        assert!(flags.contains(VertexFlags::COLLIDING));
    }
}
