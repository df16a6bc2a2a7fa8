//! Primitive collision shapes and intersection algorithms
//!
//! Rays, spheres and oriented boxes in world space, with the contact and ray
//! tests the primitive narrow phase is built from. Contact normals always
//! point from the second shape toward the first.

use crate::foundation::math::{Quat, Vec3, AABB};

/// Segments shorter than this become a minimal ray along +Y
pub const MIN_RAY_LENGTH: f32 = 0.01;

const EPSILON: f32 = 1.0e-6;

/// A finite ray for ray casting
#[derive(Debug, Clone, Copy)]
pub struct Ray {
    /// The origin point of the ray in world space
    pub origin: Vec3,
    /// Unit direction
    pub direction: Vec3,
    /// Length of the cast
    pub length: f32,
}

impl Ray {
    /// Creates a new ray with the given origin, direction and length
    pub fn new(origin: Vec3, direction: Vec3, length: f32) -> Self {
        Self {
            origin,
            direction: direction.normalize(),
            length,
        }
    }

    /// Ray covering the segment `from -> to`
    pub fn from_segment(from: Vec3, to: Vec3) -> Self {
        let delta = to - from;
        let length = delta.magnitude();
        if length > MIN_RAY_LENGTH {
            Self {
                origin: from,
                direction: delta / length,
                length,
            }
        } else {
            Self {
                origin: from,
                direction: Vec3::y(),
                length: MIN_RAY_LENGTH,
            }
        }
    }

    /// Get a point along the ray at distance t
    pub fn point_at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }
}

/// Contact produced by a pair test
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Contact {
    /// Point of contact in world space
    pub point: Vec3,
    /// Unit normal from the second shape toward the first
    pub normal: Vec3,
    /// Penetration depth along the normal
    pub depth: f32,
}

/// A sphere in world space
#[derive(Debug, Clone, Copy)]
pub struct BoundingSphere {
    /// The center position of the sphere in world space
    pub center: Vec3,
    /// The radius of the sphere
    pub radius: f32,
}

impl BoundingSphere {
    /// Creates a new bounding sphere with the given center and radius
    pub fn new(center: Vec3, radius: f32) -> Self {
        Self { center, radius }
    }

    /// Check if this sphere intersects with another
    pub fn intersects(&self, other: &BoundingSphere) -> bool {
        let distance_squared = (self.center - other.center).magnitude_squared();
        let radius_sum = self.radius + other.radius;
        distance_squared <= radius_sum * radius_sum
    }

    /// Contact against another sphere
    pub fn contact_sphere(&self, other: &BoundingSphere) -> Option<Contact> {
        if !self.intersects(other) {
            return None;
        }
        let offset = self.center - other.center;
        let distance = offset.magnitude();
        // Concentric spheres get an arbitrary but stable normal
        let normal = if distance > EPSILON { offset / distance } else { Vec3::y() };
        Some(Contact {
            point: other.center + normal * other.radius,
            normal,
            depth: self.radius + other.radius - distance,
        })
    }

    /// Contact against an oriented box
    pub fn contact_box(&self, other: &OrientedBox) -> Option<Contact> {
        let local = other.to_local(self.center);
        let closest = local.inf(&other.half_extents).sup(&-other.half_extents);
        let diff = local - closest;
        let distance_squared = diff.magnitude_squared();
        if distance_squared > self.radius * self.radius {
            return None;
        }

        let (point, normal, depth) = if distance_squared > EPSILON {
            let distance = distance_squared.sqrt();
            (closest, diff / distance, self.radius - distance)
        } else {
            // Center inside the box: push out through the nearest face
            let axis = (0..3)
                .min_by(|&i, &j| {
                    let di = other.half_extents[i] - local[i].abs();
                    let dj = other.half_extents[j] - local[j].abs();
                    di.total_cmp(&dj)
                })
                .unwrap_or(0);
            let sign = if local[axis] < 0.0 { -1.0 } else { 1.0 };
            let mut normal = Vec3::zeros();
            normal[axis] = sign;
            let mut point = local;
            point[axis] = sign * other.half_extents[axis];
            let depth = other.half_extents[axis] - local[axis].abs() + self.radius;
            (point, normal, depth)
        };

        Some(Contact {
            point: other.to_world(point),
            normal: other.rotation * normal,
            depth,
        })
    }

    /// Test ray intersection with this sphere
    ///
    /// Returns the distance along the ray and the surface normal. Rays
    /// starting inside the sphere do not hit it.
    pub fn intersect_ray(&self, ray: &Ray) -> Option<(f32, Vec3)> {
        // Solve |origin + t*direction - center|^2 = radius^2 with a unit direction
        let oc = ray.origin - self.center;
        let b = oc.dot(&ray.direction);
        let c = oc.dot(&oc) - self.radius * self.radius;
        if c <= 0.0 {
            return None;
        }

        let discriminant = b * b - c;
        if discriminant < 0.0 {
            return None;
        }

        let t = -b - discriminant.sqrt();
        if t < 0.0 || t > ray.length {
            return None;
        }
        let normal = (ray.point_at(t) - self.center).normalize();
        Some((t, normal))
    }
}

/// A box with arbitrary orientation in world space
#[derive(Debug, Clone, Copy)]
pub struct OrientedBox {
    /// Center in world space
    pub center: Vec3,
    /// Orientation
    pub rotation: Quat,
    /// Half size along each local axis
    pub half_extents: Vec3,
}

impl OrientedBox {
    /// Create an oriented box
    pub fn new(center: Vec3, rotation: Quat, half_extents: Vec3) -> Self {
        Self {
            center,
            rotation,
            half_extents,
        }
    }

    /// World-space unit axes
    pub fn axes(&self) -> [Vec3; 3] {
        [
            self.rotation * Vec3::x(),
            self.rotation * Vec3::y(),
            self.rotation * Vec3::z(),
        ]
    }

    fn to_local(&self, point: Vec3) -> Vec3 {
        self.rotation.inverse_transform_vector(&(point - self.center))
    }

    fn to_world(&self, point: Vec3) -> Vec3 {
        self.center + self.rotation * point
    }

    /// Closest point of the box to `point`
    pub fn closest_point(&self, point: Vec3) -> Vec3 {
        let local = self.to_local(point);
        self.to_world(local.inf(&self.half_extents).sup(&-self.half_extents))
    }

    /// Radius of the box projected onto `axis`
    fn projected_radius(&self, axes: &[Vec3; 3], axis: &Vec3) -> f32 {
        (0..3)
            .map(|i| self.half_extents[i] * axes[i].dot(axis).abs())
            .sum()
    }

    /// Separating axis test over the 15 candidate axes
    ///
    /// The reported normal is the axis of least penetration.
    pub fn contact_box(&self, other: &OrientedBox) -> Option<Contact> {
        let axes_a = self.axes();
        let axes_b = other.axes();
        let offset = self.center - other.center;

        let mut candidates = Vec::with_capacity(15);
        candidates.extend_from_slice(&axes_a);
        candidates.extend_from_slice(&axes_b);
        for a in &axes_a {
            for b in &axes_b {
                let cross = a.cross(b);
                // Parallel edges give no new axis
                if cross.magnitude_squared() > EPSILON {
                    candidates.push(cross.normalize());
                }
            }
        }

        let mut best: Option<(f32, Vec3)> = None;
        for axis in candidates {
            let ra = self.projected_radius(&axes_a, &axis);
            let rb = other.projected_radius(&axes_b, &axis);
            let distance = offset.dot(&axis);
            let overlap = ra + rb - distance.abs();
            if overlap < 0.0 {
                return None;
            }
            if best.map_or(true, |(depth, _)| overlap < depth) {
                let normal = if distance < 0.0 { -axis } else { axis };
                best = Some((overlap, normal));
            }
        }

        best.map(|(depth, normal)| {
            let on_self = self.closest_point(other.center);
            let on_other = other.closest_point(self.center);
            Contact {
                point: (on_self + on_other) * 0.5,
                normal,
                depth,
            }
        })
    }

    /// Test ray intersection with this box using the slab method in box space
    ///
    /// Returns the distance along the ray and the normal of the entry face.
    /// Rays starting inside the box do not hit it.
    pub fn intersect_ray(&self, ray: &Ray) -> Option<(f32, Vec3)> {
        let local_box = AABB::new(-self.half_extents, self.half_extents);
        let origin = self.to_local(ray.origin);
        if local_box.contains_point(origin) {
            return None;
        }
        let direction = self.rotation.inverse_transform_vector(&ray.direction);

        let (t, _) = local_box.intersect_ray(origin, direction)?;
        if t > ray.length {
            return None;
        }

        let hit = origin + direction * t;
        let axis = (0..3)
            .max_by(|&i, &j| {
                let di = hit[i].abs() / self.half_extents[i].max(EPSILON);
                let dj = hit[j].abs() / self.half_extents[j].max(EPSILON);
                di.total_cmp(&dj)
            })
            .unwrap_or(0);
        let mut normal = Vec3::zeros();
        normal[axis] = if hit[axis] < 0.0 { -1.0 } else { 1.0 };
        Some((t, self.rotation * normal))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f32::consts::FRAC_PI_4;

    #[test]
    fn test_degenerate_segment_becomes_short_ray() {
        let ray = Ray::from_segment(Vec3::new(1.0, 1.0, 1.0), Vec3::new(1.0, 1.0, 1.0));
        assert_eq!(ray.direction, Vec3::y());
        assert_relative_eq!(ray.length, MIN_RAY_LENGTH);

        let ray = Ray::from_segment(Vec3::zeros(), Vec3::new(0.0, 0.0, 5.0));
        assert_relative_eq!(ray.direction.z, 1.0);
        assert_relative_eq!(ray.length, 5.0);
    }

    #[test]
    fn test_sphere_sphere_contact_normal() {
        let a = BoundingSphere::new(Vec3::new(3.0, 0.0, 0.0), 2.0);
        let b = BoundingSphere::new(Vec3::zeros(), 2.0);

        let contact = a.contact_sphere(&b).expect("spheres overlap");
        assert_relative_eq!(contact.normal.x, 1.0);
        assert_relative_eq!(contact.depth, 1.0);
        assert_relative_eq!(contact.point.x, 2.0);

        let far = BoundingSphere::new(Vec3::new(10.0, 0.0, 0.0), 2.0);
        assert!(far.contact_sphere(&b).is_none());
    }

    #[test]
    fn test_sphere_box_contact() {
        let obb = OrientedBox::new(Vec3::zeros(), Quat::identity(), Vec3::new(1.0, 1.0, 1.0));
        let sphere = BoundingSphere::new(Vec3::new(0.0, 1.5, 0.0), 1.0);

        let contact = sphere.contact_box(&obb).expect("sphere touches top face");
        assert_relative_eq!(contact.normal.y, 1.0);
        assert_relative_eq!(contact.point.y, 1.0);
        assert_relative_eq!(contact.depth, 0.5);

        let outside = BoundingSphere::new(Vec3::new(3.0, 3.0, 0.0), 1.0);
        assert!(outside.contact_box(&obb).is_none());
    }

    #[test]
    fn test_sphere_center_inside_box() {
        let obb = OrientedBox::new(Vec3::zeros(), Quat::identity(), Vec3::new(2.0, 1.0, 2.0));
        let sphere = BoundingSphere::new(Vec3::new(0.0, -0.5, 0.0), 0.25);

        let contact = sphere.contact_box(&obb).expect("sphere is inside");
        assert_relative_eq!(contact.normal.y, -1.0);
    }

    #[test]
    fn test_box_box_separating_axis() {
        let a = OrientedBox::new(Vec3::new(1.5, 0.0, 0.0), Quat::identity(), Vec3::new(1.0, 1.0, 1.0));
        let b = OrientedBox::new(Vec3::zeros(), Quat::identity(), Vec3::new(1.0, 1.0, 1.0));

        let contact = a.contact_box(&b).expect("boxes overlap");
        assert_relative_eq!(contact.normal.x, 1.0);
        assert_relative_eq!(contact.depth, 0.5);

        // A box rotated 45 degrees about z reaches sqrt(2) along x
        let rotated = OrientedBox::new(
            Vec3::new(2.3, 0.0, 0.0),
            Quat::from_axis_angle(&Vec3::z_axis(), FRAC_PI_4),
            Vec3::new(1.0, 1.0, 1.0),
        );
        assert!(rotated.contact_box(&b).is_some());

        let apart = OrientedBox::new(
            Vec3::new(2.5, 0.0, 0.0),
            Quat::from_axis_angle(&Vec3::z_axis(), FRAC_PI_4),
            Vec3::new(1.0, 1.0, 1.0),
        );
        assert!(apart.contact_box(&b).is_none());
    }

    #[test]
    fn test_ray_sphere() {
        let sphere = BoundingSphere::new(Vec3::new(10.0, 0.0, 0.0), 2.0);
        let ray = Ray::from_segment(Vec3::zeros(), Vec3::new(20.0, 0.0, 0.0));

        let (t, normal) = sphere.intersect_ray(&ray).expect("ray hits");
        assert_relative_eq!(t, 8.0);
        assert_relative_eq!(normal.x, -1.0);

        let short = Ray::from_segment(Vec3::zeros(), Vec3::new(5.0, 0.0, 0.0));
        assert!(sphere.intersect_ray(&short).is_none());
    }

    #[test]
    fn test_ray_box_entry_face() {
        let obb = OrientedBox::new(Vec3::new(50.0, 0.0, 0.0), Quat::identity(), Vec3::new(10.0, 10.0, 10.0));
        let ray = Ray::from_segment(Vec3::zeros(), Vec3::new(100.0, 0.0, 0.0));

        let (t, normal) = obb.intersect_ray(&ray).expect("ray hits");
        assert_relative_eq!(t, 40.0, epsilon = 1.0e-4);
        assert_relative_eq!(normal.x, -1.0);

        let inside = Ray::from_segment(Vec3::new(50.0, 0.0, 0.0), Vec3::new(100.0, 0.0, 0.0));
        assert!(obb.intersect_ray(&inside).is_none());
    }
}
