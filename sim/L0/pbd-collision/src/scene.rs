//! Registry of bodies and collision pairings driven by a simulation loop.
//!
//! The scene owns its bodies and hands out [`BodyId`] and [`PairingId`]
//! handles. [`CollisionScene::step`] runs every active pairing once, in the
//! order the pairings were added; pairings that share a body therefore never
//! touch its particles concurrently.
//!
//! A pairing whose step fails is deactivated with a warning and skipped from
//! then on. The rest of the scene keeps stepping.

use tracing::{debug, warn};

use crate::error::{CollisionError, Result};
use crate::handling::{CollisionHandling, HandlingConfig, StepOutcome};
use crate::types::{BodyId, PairingId, next_pairing_id};
use crate::CollisionBody;

/// A body stored in a scene.
pub type SceneBody = Box<dyn CollisionBody + Send>;

#[derive(Debug)]
struct Pairing {
    id: PairingId,
    a: usize,
    b: usize,
    handling: CollisionHandling,
    active: bool,
}

/// Bodies and the pairings between them.
#[derive(Default)]
pub struct CollisionScene {
    bodies: Vec<SceneBody>,
    pairings: Vec<Pairing>,
}

impl std::fmt::Debug for CollisionScene {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CollisionScene")
            .field("bodies", &self.bodies.iter().map(|b| b.id()).collect::<Vec<_>>())
            .field("pairings", &self.pairings)
            .finish()
    }
}

/// Mutable access to two different elements of a slice.
fn two_mut<T>(items: &mut [T], i: usize, j: usize) -> (&mut T, &mut T) {
    debug_assert_ne!(i, j);
    if i < j {
        let (left, right) = items.split_at_mut(j);
        (&mut left[i], &mut right[0])
    } else {
        let (left, right) = items.split_at_mut(i);
        (&mut right[0], &mut left[j])
    }
}

impl CollisionScene {
    /// Create an empty scene.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Take ownership of a body.
    pub fn add_body<B>(&mut self, body: B) -> BodyId
    where
        B: CollisionBody + Send + 'static,
    {
        let id = body.id();
        self.bodies.push(Box::new(body));
        id
    }

    fn body_index(&self, id: BodyId) -> Result<usize> {
        self.bodies
            .iter()
            .position(|b| b.id() == id)
            .ok_or(CollisionError::UnknownBody(id))
    }

    fn pairing_index(&self, id: PairingId) -> Result<usize> {
        self.pairings
            .iter()
            .position(|p| p.id == id)
            .ok_or(CollisionError::UnknownPairing(id))
    }

    /// Get a body by id.
    #[must_use]
    pub fn body(&self, id: BodyId) -> Option<&(dyn CollisionBody + Send)> {
        self.bodies.iter().find(|b| b.id() == id).map(AsRef::as_ref)
    }

    /// Get a body by id, mutably.
    pub fn body_mut(&mut self, id: BodyId) -> Option<&mut (dyn CollisionBody + Send + 'static)> {
        self.bodies
            .iter_mut()
            .find(|b| b.id() == id)
            .map(AsMut::as_mut)
    }

    /// Number of bodies.
    #[must_use]
    pub fn num_bodies(&self) -> usize {
        self.bodies.len()
    }

    /// Number of pairings, active or not.
    #[must_use]
    pub fn num_pairings(&self) -> usize {
        self.pairings.len()
    }

    /// Pair two bodies.
    ///
    /// # Errors
    ///
    /// Returns [`CollisionError::UnknownBody`] for an id not in the scene,
    /// and any construction error from [`CollisionHandling::new`]. No pairing
    /// is created on error.
    pub fn add_pairing(&mut self, a: BodyId, b: BodyId, config: HandlingConfig) -> Result<PairingId> {
        let ia = self.body_index(a)?;
        let ib = self.body_index(b)?;
        let handling = CollisionHandling::new(&*self.bodies[ia], &*self.bodies[ib], config)?;

        let id = next_pairing_id();
        self.pairings.push(Pairing {
            id,
            a: ia,
            b: ib,
            handling,
            active: true,
        });
        debug!(pairing = %id, a = %a, b = %b, "added pairing");
        Ok(id)
    }

    /// Whether the pairing exists and has not been deactivated.
    #[must_use]
    pub fn is_valid(&self, pairing: PairingId) -> bool {
        self.pairings
            .iter()
            .any(|p| p.id == pairing && p.active)
    }

    /// Get a pairing's handler.
    #[must_use]
    pub fn handling(&self, pairing: PairingId) -> Option<&CollisionHandling> {
        self.pairings
            .iter()
            .find(|p| p.id == pairing)
            .map(|p| &p.handling)
    }

    fn step_index(&mut self, index: usize) -> Result<StepOutcome> {
        let pairing = &mut self.pairings[index];
        if !pairing.active {
            return Err(CollisionError::InactivePairing(pairing.id));
        }

        let (a, b) = two_mut(&mut self.bodies, pairing.a, pairing.b);
        let result = pairing.handling.step(&mut **a, &mut **b);
        if let Err(e) = &result {
            warn!(pairing = %pairing.id, error = %e, "collision step failed, deactivating pairing");
            pairing.active = false;
        }
        result
    }

    /// Step one pairing.
    ///
    /// # Errors
    ///
    /// Returns an error for an unknown or inactive pairing. A pairing whose
    /// step fails returns the error and is deactivated.
    pub fn step_pairing(&mut self, pairing: PairingId) -> Result<StepOutcome> {
        let index = self.pairing_index(pairing)?;
        self.step_index(index)
    }

    /// Step every active pairing once, in creation order.
    ///
    /// Returns the outcome of each pairing that stepped successfully.
    pub fn step(&mut self) -> Vec<(PairingId, StepOutcome)> {
        let mut outcomes = Vec::with_capacity(self.pairings.len());
        for index in 0..self.pairings.len() {
            if !self.pairings[index].active {
                continue;
            }
            if let Ok(outcome) = self.step_index(index) {
                outcomes.push((self.pairings[index].id, outcome));
            }
        }
        outcomes
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::body::PbdBody;
    use crate::mesh::{CollisionGeometry, Triangle};
    use crate::types::CollisionConfig;
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
    fn test_two_mut() {
        let mut items = [1, 2, 3, 4];
        let (a, b) = two_mut(&mut items, 3, 1);
        std::mem::swap(a, b);
        assert_eq!(items, [1, 4, 3, 2]);
    }

    #[test]
    fn test_add_and_step() {
        let mut scene = CollisionScene::new();
        let a = scene.add_body(point(0.0));
        let b = scene.add_body(floor());
        let pairing = scene.add_pairing(a, b, HandlingConfig::default()).unwrap();
        assert!(scene.is_valid(pairing));

        let outcomes = scene.step();
        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].0, pairing);
        assert!(outcomes[0].1.is_resolved());

        let z = scene.body(a).unwrap().positions()[0].z;
        assert!((z - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_unknown_ids() {
        let mut scene = CollisionScene::new();
        let a = scene.add_body(point(0.0));
        let stranger = point(0.0).id();
        assert!(matches!(
            scene.add_pairing(a, stranger, HandlingConfig::default()),
            Err(CollisionError::UnknownBody(id)) if id == stranger
        ));
        assert_eq!(scene.num_pairings(), 0);
        assert!(scene.body(stranger).is_none());
    }

    #[test]
    fn test_same_body_twice() {
        let mut scene = CollisionScene::new();
        let b = scene.add_body(floor());
        assert!(matches!(
            scene.add_pairing(b, b, HandlingConfig::default()),
            Err(CollisionError::IdenticalBodies(_))
        ));
        assert_eq!(scene.num_pairings(), 0);
    }
}
