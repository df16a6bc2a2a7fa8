//! Narrow-phase collision shapes
//!
//! Shapes are stored in model space and transformed to world space on demand
//! during collision tests, using the candidate's position and rotation.

use crate::foundation::math::{Quat, Vec3};

use super::primitives::{BoundingSphere, Contact, OrientedBox, Ray};

/// Collision shape in model space
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CollisionShape {
    /// Sphere with the given radius
    Ball(f32),
    /// Box with the given half extents
    Cuboid(Vec3),
}

impl CollisionShape {
    /// Radius of the sphere enclosing the shape around its origin
    pub fn local_bounding_radius(&self) -> f32 {
        match self {
            Self::Ball(radius) => *radius,
            Self::Cuboid(half_extents) => half_extents.magnitude(),
        }
    }

    /// Place this shape in world space
    pub fn to_world_space(&self, position: Vec3, rotation: Quat) -> WorldSpaceShape {
        match self {
            Self::Ball(radius) => WorldSpaceShape::Sphere(BoundingSphere::new(position, *radius)),
            Self::Cuboid(half_extents) => {
                WorldSpaceShape::Box(OrientedBox::new(position, rotation, *half_extents))
            }
        }
    }
}

/// World-space collision shape (temporary, for testing only)
#[derive(Debug, Clone, Copy)]
pub enum WorldSpaceShape {
    /// World-space sphere
    Sphere(BoundingSphere),
    /// World-space oriented box
    Box(OrientedBox),
}

impl WorldSpaceShape {
    /// Get center position
    pub fn center(&self) -> Vec3 {
        match self {
            Self::Sphere(sphere) => sphere.center,
            Self::Box(obb) => obb.center,
        }
    }

    /// Contact with `other`; the normal points from `other` toward `self`
    pub fn contact(&self, other: &WorldSpaceShape) -> Option<Contact> {
        match (self, other) {
            (Self::Sphere(a), Self::Sphere(b)) => a.contact_sphere(b),
            (Self::Sphere(a), Self::Box(b)) => a.contact_box(b),
            (Self::Box(a), Self::Sphere(b)) => b.contact_box(a).map(|contact| Contact {
                normal: -contact.normal,
                ..contact
            }),
            (Self::Box(a), Self::Box(b)) => a.contact_box(b),
        }
    }

    /// Ray intersection: distance along the ray and surface normal
    pub fn intersect_ray(&self, ray: &Ray) -> Option<(f32, Vec3)> {
        match self {
            Self::Sphere(sphere) => sphere.intersect_ray(ray),
            Self::Box(obb) => obb.intersect_ray(ray),
        }
    }
}
