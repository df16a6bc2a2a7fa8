//! Narrow phase: exact geometry tests between candidates
//!
//! The engine is generic over a [`NarrowPhase`] backend. Backends turn a shape
//! type and size into a [`BodyDef`] once, then answer pair and ray queries on
//! [`Candidate`] snapshots built from those definitions.

use std::collections::HashMap;
use std::fmt;

use crate::config::ShapeManifest;
use crate::foundation::math::{Quat, Vec3};
use crate::foundation::registry::RefId;
use crate::physics::collision_layers::CollisionFilter;
use crate::physics::collision_system::CollisionError;
use crate::physics::manifold::{CollisionManifold, RayCastHit};
use crate::physics::shape::ShapeType;

use super::primitives::Ray;
use super::shape::CollisionShape;

/// Backend shape data plus the radius used for broad-phase bounds
#[derive(Debug, Clone, PartialEq)]
pub struct BodyDef<S> {
    /// Backend shape data
    pub shape: S,
    /// Radius of the sphere enclosing the shape; the broad-phase box is twice
    /// this on every axis
    pub occupy_radius: f32,
}

impl<S> BodyDef<S> {
    /// Create a body definition
    pub fn new(shape: S, occupy_radius: f32) -> Self {
        Self {
            shape,
            occupy_radius,
        }
    }

    /// Full size of the broad-phase bounding box
    pub fn aabb_size(&self) -> Vec3 {
        Vec3::repeat(self.occupy_radius * 2.0)
    }
}

/// Snapshot of a body for one narrow-phase query
#[derive(Debug, Clone, Copy)]
pub struct Candidate<'a, S> {
    /// Body id
    pub id: RefId,
    /// World position
    pub position: Vec3,
    /// World rotation
    pub rotation: Quat,
    /// Shape type
    pub shape_type: ShapeType,
    /// Collision filter, if any
    pub collision_filter: Option<CollisionFilter>,
    /// Backend shape data
    pub shape: &'a S,
}

/// Exact collision tests
pub trait NarrowPhase {
    /// Backend shape data stored in body definitions
    type Shape;
    /// Backend ray representation
    type Ray;

    /// Derive a body definition; fails for unknown shape types
    fn make_body_def(
        &self,
        shape_type: ShapeType,
        size: Vec3,
    ) -> Result<BodyDef<Self::Shape>, CollisionError>;

    /// Build a fixed body definition from a configuration entry
    fn body_def_from_manifest(&self, manifest: &ShapeManifest) -> BodyDef<Self::Shape>;

    /// Contact between `a` and `b`, with the normal pointing from `b` toward `a`
    fn collision_manifold(
        &self,
        a: &Candidate<'_, Self::Shape>,
        b: &Candidate<'_, Self::Shape>,
    ) -> Option<CollisionManifold>;

    /// Ray hit against `candidate`, distance as a fraction of the cast
    fn ray_cast_manifold(
        &self,
        ray: &Self::Ray,
        candidate: &Candidate<'_, Self::Shape>,
    ) -> Option<RayCastHit>;

    /// Ray covering the segment `from -> to`
    fn to_ray(&self, from: Vec3, to: Vec3) -> Self::Ray;
}

/// Factory turning a size into a body definition
pub type ShapeFactory = Box<dyn Fn(Vec3) -> BodyDef<CollisionShape>>;

/// Narrow phase over balls and oriented boxes
pub struct PrimitiveNarrowPhase {
    factories: HashMap<ShapeType, ShapeFactory>,
}

impl PrimitiveNarrowPhase {
    /// Narrow phase with the built-in `ball` and `box` types
    pub fn new() -> Self {
        let mut narrow_phase = Self {
            factories: HashMap::new(),
        };
        narrow_phase.register_factory(ShapeType::BALL, Box::new(ball_def));
        narrow_phase.register_factory(ShapeType::BOX, Box::new(box_def));
        narrow_phase
    }

    /// Register or replace the factory for `shape_type`
    pub fn register_factory(&mut self, shape_type: ShapeType, factory: ShapeFactory) {
        self.factories.insert(shape_type, factory);
    }
}

impl Default for PrimitiveNarrowPhase {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for PrimitiveNarrowPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrimitiveNarrowPhase")
            .field("shape_types", &self.factories.keys().collect::<Vec<_>>())
            .finish()
    }
}

fn ball_def(size: Vec3) -> BodyDef<CollisionShape> {
    let radius = size.max() * 0.5;
    BodyDef::new(CollisionShape::Ball(radius), radius)
}

fn box_def(size: Vec3) -> BodyDef<CollisionShape> {
    let half_extents = size * 0.5;
    BodyDef::new(CollisionShape::Cuboid(half_extents), half_extents.magnitude())
}

impl NarrowPhase for PrimitiveNarrowPhase {
    type Shape = CollisionShape;
    type Ray = Ray;

    fn make_body_def(
        &self,
        shape_type: ShapeType,
        size: Vec3,
    ) -> Result<BodyDef<CollisionShape>, CollisionError> {
        self.factories
            .get(&shape_type)
            .map(|factory| factory(size))
            .ok_or(CollisionError::UnknownShapeType {
                name: shape_type.name(),
                hash: shape_type.id(),
            })
    }

    fn body_def_from_manifest(&self, manifest: &ShapeManifest) -> BodyDef<CollisionShape> {
        match *manifest {
            ShapeManifest::Ball { radius } => BodyDef::new(CollisionShape::Ball(radius), radius),
            ShapeManifest::Box { half_extents } => {
                let half_extents = Vec3::from(half_extents);
                BodyDef::new(CollisionShape::Cuboid(half_extents), half_extents.magnitude())
            }
        }
    }

    fn collision_manifold(
        &self,
        a: &Candidate<'_, CollisionShape>,
        b: &Candidate<'_, CollisionShape>,
    ) -> Option<CollisionManifold> {
        let world_a = a.shape.to_world_space(a.position, a.rotation);
        let world_b = b.shape.to_world_space(b.position, b.rotation);
        world_a
            .contact(&world_b)
            .map(|contact| CollisionManifold::new(contact.point, contact.normal))
    }

    fn ray_cast_manifold(
        &self,
        ray: &Ray,
        candidate: &Candidate<'_, CollisionShape>,
    ) -> Option<RayCastHit> {
        let world = candidate
            .shape
            .to_world_space(candidate.position, candidate.rotation);
        world.intersect_ray(ray).map(|(t, normal)| RayCastHit {
            distance: t / ray.length,
            normal,
        })
    }

    fn to_ray(&self, from: Vec3, to: Vec3) -> Ray {
        Ray::from_segment(from, to)
    }
}
