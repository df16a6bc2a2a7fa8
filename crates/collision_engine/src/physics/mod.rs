//! Collision detection and contact notification
//!
//! Bodies are indexed in one or more broad phases, tested by a pluggable
//! narrow phase and tracked across ticks so that every contact produces one
//! begin and one end notification per receiver.

pub mod body_type;
pub mod collision;
pub mod collision_layers;
pub mod collision_system;
pub mod contact_state;
pub mod manifold;
pub mod rigidbody;
pub mod shape;

mod body;

#[cfg(test)]
mod tests;

pub use body_type::BodyType;
pub use collision::{BodyDef, Candidate, CollisionShape, NarrowPhase, PrimitiveNarrowPhase, Ray};
pub use collision_layers::{CollisionFilter, CollisionLayers};
pub use collision_system::{CollisionEngine, CollisionError};
pub use contact_state::ContactRecorder;
pub use manifold::{CollisionManifold, RayCastHit, RayCastManifold};
pub use rigidbody::{CollisionCallback, KinematicController, Rigidbody, RigidbodyController};
pub use shape::{Shape, ShapeType};
