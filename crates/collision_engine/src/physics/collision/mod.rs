//! Narrow-phase collision detection
//!
//! - [`primitives`] - Rays, spheres and oriented boxes with their intersection tests
//! - [`shape`] - Model-space shapes placed in world space on demand
//! - [`narrow_phase`] - The [`NarrowPhase`] contract and the primitive backend

pub mod primitives;
pub mod shape;
pub mod narrow_phase;

pub use primitives::{BoundingSphere, Contact, OrientedBox, Ray};
pub use shape::{CollisionShape, WorldSpaceShape};
pub use narrow_phase::{BodyDef, Candidate, NarrowPhase, PrimitiveNarrowPhase, ShapeFactory};
