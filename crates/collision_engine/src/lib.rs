//! # Collision Engine
//!
//! Incremental collision resolution with contact begin/end notifications.
//!
//! ## Features
//!
//! - **Pluggable broad phases**: uniform grid and octree, each gated by a collision filter
//! - **Pluggable narrow phase**: balls and oriented boxes out of the box
//! - **Incremental resolution**: only bodies that moved, turned or resized are re-tested
//! - **Contact notifications**: exactly one begin and one end per contact and receiver
//! - **Ray casting**: nearest-first hits across every broad phase
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use collision_engine::prelude::*;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ColliderConfig::default();
//!     let mut engine = CollisionEngine::from_config(&config, PrimitiveNarrowPhase::new())?;
//!
//!     let recorder = std::rc::Rc::new(ContactRecorder::new());
//!     let body = engine.create_body(
//!         BodyType::DYNAMIC,
//!         Shape::new(ShapeType::BALL, Vec3::repeat(1.0)),
//!         constant(Vec3::zeros()),
//!         constant(Quat::identity()),
//!         None,
//!         None,
//!     )?;
//!     body.set_collision_callback(Some(recorder.clone()));
//!
//!     engine.update();
//!     println!("{} contacts", recorder.collision_count());
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod config;
pub mod foundation;
pub mod physics;
pub mod spatial;

/// Common imports for engine users
pub mod prelude {
    pub use crate::{
        config::{ColliderConfig, Config},
        foundation::{
            math::{Quat, Vec3, AABB},
            registry::RefId,
            variable::{constant, Settable, SharedVar, Variable},
        },
        physics::{
            BodyType, CollisionCallback, CollisionEngine, CollisionError, CollisionFilter, CollisionLayers,
            CollisionManifold, ContactRecorder, KinematicController, PrimitiveNarrowPhase, RayCastManifold, Rigidbody,
            Shape, ShapeType,
        },
        spatial::{BroadPhase, GridBroadPhase, OctreeBroadPhase},
    };
}
