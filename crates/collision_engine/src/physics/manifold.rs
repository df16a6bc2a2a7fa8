//! Contact and ray-cast manifolds

use crate::foundation::math::Vec3;

use super::rigidbody::Rigidbody;

/// Contact between two bodies, in world space
///
/// The normal points from the other body toward the body receiving the
/// manifold.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CollisionManifold {
    /// Point of contact
    pub contact_point: Vec3,
    /// Contact normal
    pub normal: Vec3,
}

impl CollisionManifold {
    /// Create a manifold
    pub fn new(contact_point: Vec3, normal: Vec3) -> Self {
        Self {
            contact_point,
            normal,
        }
    }

    /// The same contact seen from the other body
    #[must_use]
    pub fn mirrored(&self) -> Self {
        Self::new(self.contact_point, -self.normal)
    }
}

/// Ray hit reported by a narrow phase
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayCastHit {
    /// Fraction of the cast segment at which the hit occurs
    pub distance: f32,
    /// Surface normal at the hit point
    pub normal: Vec3,
}

/// Ray hit against a specific body
#[derive(Debug, Clone)]
pub struct RayCastManifold {
    /// Fraction of the cast segment at which the hit occurs
    pub distance: f32,
    /// Surface normal at the hit point
    pub normal: Vec3,
    /// The body that was hit
    pub rigidbody: Rigidbody,
}
