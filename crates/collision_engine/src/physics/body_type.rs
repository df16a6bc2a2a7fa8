//! Rigid body type flags
//!
//! The two low bits hold the rigid type (kinematic, dynamic or static) and
//! [`BodyType::SENSOR`] marks bodies whose contacts are reported but never
//! answered by other bodies' callbacks.

use bitflags::bitflags;

use super::collision_system::CollisionError;

bitflags! {
    /// Body type bits
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct BodyType: u32 {
        /// Moved by its owner, unaffected by contacts
        const KINEMATIC = 1;
        /// Moved by simulation
        const DYNAMIC = 2;
        /// Never moves on its own; never searches for contacts
        const STATIC = 3;
        /// Mask of the rigid type bits
        const RIGID = 3;
        /// Reports overlaps without being reported to others
        const SENSOR = 4;
    }
}

impl BodyType {
    /// Validate raw bits coming from scripts or configuration
    pub fn try_from_bits(bits: u32) -> Result<Self, CollisionError> {
        Self::from_bits(bits)
            .filter(|body_type| !body_type.is_empty())
            .ok_or(CollisionError::IllegalBodyType(bits))
    }

    /// The rigid part of the type, with the sensor bit cleared
    pub fn rigid_type(self) -> Self {
        self & Self::RIGID
    }

    /// Whether the rigid type is static
    pub fn is_static(self) -> bool {
        self.rigid_type() == Self::STATIC
    }

    /// Whether the sensor bit is set
    pub fn is_sensor(self) -> bool {
        self.contains(Self::SENSOR)
    }

    /// Sensor without any rigid type
    pub fn is_pure_sensor(self) -> bool {
        self.is_sensor() && self.rigid_type().is_empty()
    }
}
