//! A self-contained particle body for collision pairings.
//!
//! [`PbdBody`] owns its physics buffers (positions and inverse masses), its
//! colliding geometry, and the index map between the two. Simulation loops
//! that keep particles elsewhere implement [`CollisionBody`] on their own
//! types instead.

use nalgebra::Point3;

use crate::aabb::Aabb;
use crate::constraints::BodyBuffers;
use crate::error::{CollisionError, Result};
use crate::mesh::{CollisionGeometry, IndexMap};
use crate::types::{BodyId, CollisionConfig, VertexFlags, next_body_id};
use crate::CollisionBody;

/// Particle body with colliding geometry.
///
/// Not `Clone`: every body carries a unique [`BodyId`].
#[derive(Debug)]
pub struct PbdBody {
    id: BodyId,
    name: String,
    positions: Vec<Point3<f64>>,
    inv_masses: Vec<f64>,
    vertex_flags: Vec<VertexFlags>,
    geometry: CollisionGeometry,
    index_map: IndexMap,
    config: Option<CollisionConfig>,
}

impl PbdBody {
    /// Create a body from particle positions and masses.
    ///
    /// A mass of zero (or less) makes the particle immovable. The geometry's
    /// colliding vertices map onto the particles one to one until
    /// [`with_index_map`](Self::with_index_map) says otherwise.
    ///
    /// # Errors
    ///
    /// Returns an error if `masses` and `positions` differ in length, if the
    /// geometry references a vertex it does not have, or if it has more
    /// vertices than there are particles.
    pub fn new(
        name: &str,
        positions: Vec<Point3<f64>>,
        masses: &[f64],
        geometry: CollisionGeometry,
    ) -> Result<Self> {
        if masses.len() != positions.len() {
            return Err(CollisionError::invalid_config(format!(
                "body '{name}' has {} masses for {} positions",
                masses.len(),
                positions.len()
            )));
        }
        geometry.validate()?;
        let index_map = IndexMap::Identity;
        index_map.validate(geometry.num_vertices(), positions.len())?;

        let inv_masses: Vec<f64> = masses
            .iter()
            .map(|&m| if m > 0.0 { 1.0 / m } else { 0.0 })
            .collect();
        let vertex_flags = inv_masses
            .iter()
            .map(|&w| {
                if w > 0.0 {
                    VertexFlags::empty()
                } else {
                    VertexFlags::PINNED
                }
            })
            .collect();

        Ok(Self {
            id: next_body_id(),
            name: name.to_string(),
            positions,
            inv_masses,
            vertex_flags,
            geometry,
            index_map,
            config: None,
        })
    }

    /// Route colliding vertices to particles through `map`.
    ///
    /// # Errors
    ///
    /// Returns an error if the map is shorter than the colliding vertex count
    /// or targets a particle that does not exist.
    pub fn with_index_map(mut self, map: IndexMap) -> Result<Self> {
        map.validate(self.geometry.num_vertices(), self.positions.len())?;
        self.index_map = map;
        Ok(self)
    }

    /// Attach collision parameters.
    #[must_use]
    pub const fn with_config(mut self, config: CollisionConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Pin a particle (make it immovable).
    pub fn pin_vertex(&mut self, index: usize) {
        if index < self.inv_masses.len() {
            self.inv_masses[index] = 0.0;
            self.vertex_flags[index].insert(VertexFlags::PINNED);
        }
    }

    /// Unpin a particle, giving it `mass`.
    pub fn unpin_vertex(&mut self, index: usize, mass: f64) {
        if index < self.inv_masses.len() && mass > 0.0 {
            self.inv_masses[index] = 1.0 / mass;
            self.vertex_flags[index].remove(VertexFlags::PINNED);
        }
    }

    /// Check if a particle is pinned.
    #[must_use]
    pub fn is_pinned(&self, index: usize) -> bool {
        self.vertex_flags
            .get(index)
            .is_some_and(|f| f.contains(VertexFlags::PINNED))
    }

    /// Per-particle flags.
    #[must_use]
    pub fn vertex_flags(&self) -> &[VertexFlags] {
        &self.vertex_flags
    }

    /// Overwrite every particle position.
    ///
    /// # Errors
    ///
    /// Returns an error if `positions` has a different length.
    pub fn set_positions(&mut self, positions: &[Point3<f64>]) -> Result<()> {
        if positions.len() != self.positions.len() {
            return Err(CollisionError::index_out_of_range(
                positions.len(),
                self.positions.len(),
                "physics positions",
            ));
        }
        self.positions.copy_from_slice(positions);
        Ok(())
    }

    /// Flag exactly the given particles as colliding.
    ///
    /// Flags from an earlier call are cleared; indices past the end are
    /// ignored.
    pub fn mark_colliding<I>(&mut self, indices: I)
    where
        I: IntoIterator<Item = usize>,
    {
        for flags in &mut self.vertex_flags {
            flags.remove(VertexFlags::COLLIDING);
        }
        for i in indices {
            if let Some(flags) = self.vertex_flags.get_mut(i) {
                flags.insert(VertexFlags::COLLIDING);
            }
        }
    }

    /// Check if a particle took part in the last marked step.
    #[must_use]
    pub fn is_colliding(&self, index: usize) -> bool {
        self.vertex_flags
            .get(index)
            .is_some_and(|f| f.contains(VertexFlags::COLLIDING))
    }

    /// Bounding box of all particles, or `None` for an empty body.
    #[must_use]
    pub fn bounding_box(&self) -> Option<Aabb> {
        Aabb::from_points(&self.positions)
    }
}

impl CollisionBody for PbdBody {
    fn id(&self) -> BodyId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn colliding_geometry(&self) -> &CollisionGeometry {
        &self.geometry
    }

    fn index_map(&self) -> &IndexMap {
        &self.index_map
    }

    fn positions(&self) -> &[Point3<f64>] {
        &self.positions
    }

    fn positions_mut(&mut self) -> &mut [Point3<f64>] {
        &mut self.positions
    }

    fn inverse_masses(&self) -> &[f64] {
        &self.inv_masses
    }

    fn buffers_mut(&mut self) -> BodyBuffers<'_> {
        BodyBuffers {
            positions: &mut self.positions,
            inv_masses: &self.inv_masses,
        }
    }

    fn collision_config(&self) -> Option<CollisionConfig> {
        self.config
    }
}
