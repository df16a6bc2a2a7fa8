//! Collision layers and filters
//!
//! A [`CollisionFilter`] carries a category (the layers a body belongs to), a
//! mask (the layers it accepts) and a group index. Two filters collide when
//! each one's category is accepted by the other's mask, unless both share a
//! non-zero group: a positive shared group always collides and a negative one
//! never does.

use serde::{Deserialize, Serialize};

/// Collision layer bits
///
/// Layers are plain `u32` bits; applications name their own, e.g.
/// `const WALLS: u32 = CollisionLayers::bit(3);`.
pub struct CollisionLayers;

impl CollisionLayers {
    /// No collision layer
    pub const NONE: u32 = 0;

    /// All collision layers
    pub const ALL: u32 = 0xFFFF_FFFF;

    /// The layer at `index`, which must be below 32
    pub const fn bit(index: u32) -> u32 {
        1 << index
    }

    /// Combine several layers into one mask
    pub fn mask(layers: &[u32]) -> u32 {
        layers.iter().fold(0, |acc, &layer| acc | layer)
    }
}

/// Category/mask/group collision predicate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CollisionFilter {
    /// Layers this body belongs to
    pub category_bits: u32,
    /// Layers this body collides with
    pub mask_bits: u32,
    /// Group override; zero means no group
    #[serde(default)]
    pub group_index: i32,
}

impl CollisionFilter {
    /// Filter that belongs to and accepts every layer
    pub const ALL: Self = Self::new(CollisionLayers::ALL, CollisionLayers::ALL, 0);

    /// Create a filter
    pub const fn new(category_bits: u32, mask_bits: u32, group_index: i32) -> Self {
        Self {
            category_bits,
            mask_bits,
            group_index,
        }
    }

    /// Filter in `category` accepting `mask`, without a group
    pub const fn layer(category: u32, mask: u32) -> Self {
        Self::new(category, mask, 0)
    }

    /// Whether bodies carrying these two filters should be tested for contact
    pub fn collision_test(&self, other: &Self) -> bool {
        if self.group_index != 0 && self.group_index == other.group_index {
            return self.group_index > 0;
        }
        (self.category_bits & other.mask_bits) != 0 && (other.category_bits & self.mask_bits) != 0
    }

    /// Test two optional filters; a missing filter accepts everything
    pub fn test_optional(a: Option<&Self>, b: Option<&Self>) -> bool {
        match (a, b) {
            (Some(a), Some(b)) => a.collision_test(b),
            _ => true,
        }
    }
}

impl Default for CollisionFilter {
    fn default() -> Self {
        Self::ALL
    }
}
