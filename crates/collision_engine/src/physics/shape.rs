//! Shape descriptors attached to rigid bodies

use std::fmt;
use std::hash::{Hash, Hasher};

use crate::foundation::math::Vec3;
use crate::foundation::variable::{constant, SharedVar};

const fn fnv1a(name: &str) -> u32 {
    let bytes = name.as_bytes();
    let mut hash: u32 = 0x811c_9dc5;
    let mut i = 0;
    while i < bytes.len() {
        hash ^= bytes[i] as u32;
        hash = hash.wrapping_mul(0x0100_0193);
        i += 1;
    }
    hash
}

/// Shape type tag: a name and its 32-bit hash
///
/// Equality and hashing only look at the hash, so a type rebuilt from a
/// configuration id compares equal to the named constant.
#[derive(Clone, Copy)]
pub struct ShapeType {
    id: u32,
    name: &'static str,
}

impl ShapeType {
    /// No shape; bodies created with it are detached placeholders
    pub const NONE: Self = Self { id: 0, name: "none" };
    /// Sphere sized by the largest size component
    pub const BALL: Self = Self::named("ball");
    /// Box sized by its full extents
    pub const BOX: Self = Self::named("box");

    /// Shape type identified by hashing `name`
    pub const fn named(name: &'static str) -> Self {
        Self {
            id: fnv1a(name),
            name,
        }
    }

    /// Shape type known only by its id
    pub fn from_id(id: u32) -> Self {
        [Self::NONE, Self::BALL, Self::BOX]
            .into_iter()
            .find(|known| known.id == id)
            .unwrap_or(Self { id, name: "" })
    }

    /// The 32-bit type hash
    pub fn id(&self) -> u32 {
        self.id
    }

    /// The type name, empty when only the id is known
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Whether this is [`ShapeType::NONE`]
    pub fn is_none(&self) -> bool {
        self.id == 0
    }
}

impl PartialEq for ShapeType {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ShapeType {}

impl Hash for ShapeType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for ShapeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.name.is_empty() {
            write!(f, "ShapeType({:#010x})", self.id)
        } else {
            write!(f, "ShapeType({}, {:#010x})", self.name, self.id)
        }
    }
}

/// Shape type plus a (possibly changing) size
#[derive(Clone)]
pub struct Shape {
    shape_type: ShapeType,
    size: SharedVar<Vec3>,
}

impl Shape {
    /// Shape with a fixed size
    pub fn new(shape_type: ShapeType, size: Vec3) -> Self {
        Self::with_size(shape_type, constant(size))
    }

    /// Shape whose size is driven by a variable
    pub fn with_size(shape_type: ShapeType, size: SharedVar<Vec3>) -> Self {
        Self { shape_type, size }
    }

    /// Placeholder shape
    pub fn none() -> Self {
        Self::new(ShapeType::NONE, Vec3::zeros())
    }

    /// The shape type
    pub fn shape_type(&self) -> ShapeType {
        self.shape_type
    }

    /// The size source
    pub fn size(&self) -> &SharedVar<Vec3> {
        &self.size
    }
}

impl fmt::Debug for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Shape")
            .field("shape_type", &self.shape_type)
            .field("size", &self.size.val())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fnv_hash_of_names() {
        // Reference FNV-1a values
        assert_eq!(fnv1a(""), 0x811c_9dc5);
        assert_eq!(fnv1a("a"), 0xe40c_292c);
        assert_ne!(ShapeType::BALL, ShapeType::BOX);
    }

    #[test]
    fn test_from_id_recovers_known_names() {
        let ball = ShapeType::from_id(ShapeType::BALL.id());
        assert_eq!(ball, ShapeType::BALL);
        assert_eq!(ball.name(), "ball");

        let custom = ShapeType::from_id(42);
        assert_eq!(custom.id(), 42);
        assert!(custom.name().is_empty());
        assert!(ShapeType::from_id(0).is_none());
    }
}
