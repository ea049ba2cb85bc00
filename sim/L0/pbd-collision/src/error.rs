//! Error types for collision pairing and stepping.

use thiserror::Error;

use crate::types::{BodyId, PairingId};

/// Errors that can occur while building or stepping a collision pairing.
///
/// Geometric degeneracies met while solving (singular closest-point systems,
/// zero-area triangles, projections outside a triangle) are not errors: the
/// constraint simply reports "no correction".
#[derive(Debug, Clone, PartialEq, Error)]
#[non_exhaustive]
pub enum CollisionError {
    /// Both sides of a pairing refer to the same body.
    #[error("a pairing needs two distinct bodies, got {0} twice")]
    IdenticalBodies(BodyId),

    /// A body has no collision configuration.
    #[error("body '{0}' has no collision configuration")]
    MissingConfig(String),

    /// A configuration value is out of range.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// No detection algorithm exists for this geometry combination.
    #[error("no collision algorithm for {a} against {b}")]
    UnsupportedGeometry {
        /// Geometry kind of the first body.
        a: &'static str,
        /// Geometry kind of the second body.
        b: &'static str,
    },

    /// An index fell outside the buffer it addresses.
    #[error("index {index} out of range for {context} of length {len}")]
    IndexOutOfRange {
        /// The offending index.
        index: usize,
        /// Length of the addressed buffer.
        len: usize,
        /// Which buffer was addressed.
        context: &'static str,
    },

    /// Mesh topology is malformed.
    #[error("Invalid mesh topology: {0}")]
    InvalidTopology(String),

    /// The bodies handed to a step are not the ones the pairing was built for.
    #[error("pairing expects bodies ({expected_a}, {expected_b}), got ({got_a}, {got_b})")]
    BodyMismatch {
        /// Body registered as side A.
        expected_a: BodyId,
        /// Body registered as side B.
        expected_b: BodyId,
        /// Body passed as side A.
        got_a: BodyId,
        /// Body passed as side B.
        got_b: BodyId,
    },

    /// The scene holds no body with this id.
    #[error("unknown body {0}")]
    UnknownBody(BodyId),

    /// The scene holds no pairing with this id.
    #[error("unknown pairing {0}")]
    UnknownPairing(PairingId),

    /// The pairing was deactivated after an earlier failure.
    #[error("pairing {0} is inactive")]
    InactivePairing(PairingId),
}

impl CollisionError {
    /// Create an invalid configuration error.
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Create an invalid topology error.
    pub fn invalid_topology(msg: impl Into<String>) -> Self {
        Self::InvalidTopology(msg.into())
    }

    /// Create an index out of range error.
    pub const fn index_out_of_range(index: usize, len: usize, context: &'static str) -> Self {
        Self::IndexOutOfRange {
            index,
            len,
            context,
        }
    }

    /// Whether this error can only arise when a pairing is constructed.
    #[must_use]
    pub const fn is_construction_error(&self) -> bool {
        matches!(
            self,
            Self::IdenticalBodies(_)
                | Self::MissingConfig(_)
                | Self::InvalidConfig(_)
                | Self::UnsupportedGeometry { .. }
        )
    }
}

/// Result type for collision operations.
pub type Result<T> = std::result::Result<T, CollisionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CollisionError::index_out_of_range(7, 3, "physics positions");
        assert_eq!(
            err.to_string(),
            "index 7 out of range for physics positions of length 3"
        );

        let err = CollisionError::UnsupportedGeometry {
            a: "point set",
            b: "polyline",
        };
        assert_eq!(
            err.to_string(),
            "no collision algorithm for point set against polyline"
        );
    }

    #[test]
    fn test_construction_classification() {
        assert!(CollisionError::IdenticalBodies(BodyId::new(1)).is_construction_error());
        assert!(CollisionError::invalid_config("stiffness").is_construction_error());
        assert!(!CollisionError::index_out_of_range(0, 0, "map").is_construction_error());
    }
}
