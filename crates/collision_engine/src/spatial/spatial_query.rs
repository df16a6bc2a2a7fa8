//! Broad-phase spatial query interface
//!
//! A broad phase quickly culls pairs of bodies that cannot possibly be
//! touching. The engine keeps several broad phases side by side, each gated
//! by an optional collision filter, and merges their answers.

use std::collections::HashSet;

use crate::foundation::math::Vec3;
use crate::foundation::registry::RefId;
use crate::physics::collision_layers::CollisionFilter;

/// Candidate ids returned by a broad-phase query
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BroadPhaseResult {
    /// Ids of bodies indexed by this broad phase
    pub dynamic_candidates: HashSet<RefId>,
    /// Ids of geometry the broad phase itself knows to be static
    pub static_candidates: HashSet<RefId>,
}

impl BroadPhaseResult {
    /// Result holding only dynamic candidates
    pub fn from_dynamic(dynamic_candidates: HashSet<RefId>) -> Self {
        Self {
            dynamic_candidates,
            static_candidates: HashSet::new(),
        }
    }

    /// Union another result into this one
    pub fn merge(&mut self, other: Self) {
        self.dynamic_candidates.extend(other.dynamic_candidates);
        self.static_candidates.extend(other.static_candidates);
    }

    /// Drop an id from both sets
    pub fn remove(&mut self, id: RefId) {
        self.dynamic_candidates.remove(&id);
        self.static_candidates.remove(&id);
    }

    /// Whether no candidates were found
    pub fn is_empty(&self) -> bool {
        self.dynamic_candidates.is_empty() && self.static_candidates.is_empty()
    }

    /// Number of candidates in both sets
    pub fn len(&self) -> usize {
        self.dynamic_candidates.len() + self.static_candidates.len()
    }
}

/// Spatial index over body bounding boxes
///
/// Boxes are given as a center position and a full size. Implementations may
/// return false positives but never miss an overlapping id.
pub trait BroadPhase {
    /// Start tracking `id`
    fn create(&mut self, id: RefId, position: Vec3, aabb_size: Vec3);

    /// Move or resize a tracked id
    fn update(&mut self, id: RefId, position: Vec3, aabb_size: Vec3);

    /// Stop tracking `id`
    ///
    /// # Panics
    ///
    /// Removing an id that is not tracked is a programming error.
    fn remove(&mut self, id: RefId);

    /// Ids whose boxes overlap the given box
    fn search(
        &self,
        position: Vec3,
        aabb_size: Vec3,
        collision_filter: Option<&CollisionFilter>,
    ) -> BroadPhaseResult;

    /// Ids whose boxes may be crossed by the segment `from -> to`
    fn ray_cast(
        &self,
        from: Vec3,
        to: Vec3,
        collision_filter: Option<&CollisionFilter>,
    ) -> BroadPhaseResult;

    /// Whether `id` is tracked
    fn contains(&self, id: RefId) -> bool;

    /// Number of tracked ids
    fn len(&self) -> usize;

    /// Whether nothing is tracked
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
