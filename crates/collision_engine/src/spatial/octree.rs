//! Octree broad phase
//!
//! Divides a fixed world volume into hierarchical regions. Each node
//! subdivides into 8 octants when its entity count exceeds a threshold.
//! Bodies are stored by center point with a bounding radius; an id cache holds
//! the exact box for refinement. Bodies whose center leaves the world volume
//! are kept in an overflow list and scanned linearly.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::foundation::logging::warn;
use crate::foundation::math::{Vec3, AABB};
use crate::foundation::registry::RefId;
use crate::physics::collision_layers::CollisionFilter;

use super::spatial_query::{BroadPhase, BroadPhaseResult};

/// Configuration for octree behavior
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OctreeConfig {
    /// Maximum entities per node before subdivision
    pub max_entities_per_node: usize,

    /// Maximum subdivision depth
    pub max_depth: u32,

    /// Minimum node size (prevents excessive subdivision)
    pub min_node_size: f32,
}

impl Default for OctreeConfig {
    fn default() -> Self {
        Self {
            max_entities_per_node: 8,
            max_depth: 8,
            min_node_size: 1.0,
        }
    }
}

/// Entity stored in the octree
#[derive(Debug, Clone, Copy)]
pub struct OctreeEntity {
    /// Body id
    pub id: RefId,
    /// Center of the body's box
    pub position: Vec3,
    /// Radius enclosing the body's box
    pub radius: f32,
}

/// Single node in the octree hierarchy
#[derive(Debug, Clone)]
pub struct OctreeNode {
    /// World-space bounds of this node
    pub bounds: AABB,

    /// Entities contained in this node
    pub entities: Vec<OctreeEntity>,

    /// Child nodes (8 octants), None if this is a leaf
    pub children: Option<Box<[OctreeNode; 8]>>,

    /// Depth in the tree (0 = root)
    pub depth: u32,
}

impl OctreeNode {
    /// Create a new leaf node
    pub fn new(bounds: AABB, depth: u32) -> Self {
        Self {
            bounds,
            entities: Vec::new(),
            children: None,
            depth,
        }
    }

    /// Check if this node is a leaf (has no children)
    pub fn is_leaf(&self) -> bool {
        self.children.is_none()
    }

    /// Octant layout: bit 0 is +X, bit 1 is +Y, bit 2 is +Z
    fn octant_index(&self, position: Vec3) -> usize {
        let center = self.bounds.center();
        let x_bit = usize::from(position.x >= center.x);
        let y_bit = usize::from(position.y >= center.y);
        let z_bit = usize::from(position.z >= center.z);
        (z_bit << 2) | (y_bit << 1) | x_bit
    }

    fn subdivide(&mut self) {
        if self.children.is_some() {
            return;
        }

        let center = self.bounds.center();
        let quarter_extents = self.bounds.extents() * 0.5;
        let depth = self.depth + 1;
        let children: [OctreeNode; 8] = std::array::from_fn(|octant| {
            let sign = |bit: usize| if octant & bit != 0 { 1.0 } else { -1.0 };
            let child_center = center
                + Vec3::new(
                    quarter_extents.x * sign(1),
                    quarter_extents.y * sign(2),
                    quarter_extents.z * sign(4),
                );
            OctreeNode::new(AABB::from_center_extents(child_center, quarter_extents), depth)
        });
        self.children = Some(Box::new(children));

        for entity in std::mem::take(&mut self.entities) {
            let octant = self.octant_index(entity.position);
            if let Some(children) = self.children.as_mut() {
                children[octant].entities.push(entity);
            }
        }
    }

    /// Insert an entity; returns `false` if its center is outside this node
    pub fn insert(&mut self, entity: OctreeEntity, config: &OctreeConfig) -> bool {
        if !self.bounds.contains_point(entity.position) {
            return false;
        }

        if self.is_leaf() {
            let should_subdivide = self.entities.len() >= config.max_entities_per_node
                && self.depth < config.max_depth
                && self.bounds.extents().x > config.min_node_size;
            if !should_subdivide {
                self.entities.push(entity);
                return true;
            }
            self.subdivide();
        }

        let octant = self.octant_index(entity.position);
        match self.children.as_mut() {
            Some(children) => children[octant].insert(entity, config),
            None => false,
        }
    }

    /// Remove an entity from this node or its children
    pub fn remove(&mut self, id: RefId) -> bool {
        if let Some(index) = self.entities.iter().position(|e| e.id == id) {
            self.entities.swap_remove(index);
            return true;
        }

        self.children
            .as_mut()
            .is_some_and(|children| children.iter_mut().any(|child| child.remove(id)))
    }

    /// Collect entities whose bounding sphere touches the query sphere
    pub fn query_radius(&self, center: Vec3, radius: f32, max_entity_radius: f32, results: &mut Vec<OctreeEntity>) {
        // Entities may stick out of their node by up to the largest radius
        let reach = radius + max_entity_radius;
        let closest_point = center.sup(&self.bounds.min).inf(&self.bounds.max);
        if (closest_point - center).magnitude_squared() > reach * reach {
            return;
        }

        for entity in &self.entities {
            let combined_radius = radius + entity.radius;
            if (entity.position - center).magnitude_squared() <= combined_radius * combined_radius {
                results.push(*entity);
            }
        }

        if let Some(children) = self.children.as_ref() {
            for child in children.iter() {
                child.query_radius(center, radius, max_entity_radius, results);
            }
        }
    }

    /// Collect entities in nodes the segment `origin + t * delta, t in [0, 1]`
    /// passes through
    pub fn query_segment(&self, origin: Vec3, delta: Vec3, max_entity_radius: f32, results: &mut Vec<OctreeEntity>) {
        let expanded = self.bounds.expanded(Vec3::repeat(max_entity_radius));
        match expanded.intersect_ray(origin, delta) {
            Some((enter, _)) if enter <= 1.0 => {}
            _ => return,
        }

        results.extend_from_slice(&self.entities);

        if let Some(children) = self.children.as_ref() {
            for child in children.iter() {
                child.query_segment(origin, delta, max_entity_radius, results);
            }
        }
    }

    /// Count total entities in this node and all children
    pub fn count_entities(&self) -> usize {
        self.entities.len()
            + self
                .children
                .as_ref()
                .map_or(0, |children| children.iter().map(OctreeNode::count_entities).sum())
    }
}

/// Octree spatial partitioning structure
#[derive(Debug, Clone)]
pub struct Octree {
    /// Root node containing the entire world space
    pub root: OctreeNode,

    config: OctreeConfig,

    /// Largest radius ever inserted; only grows until `clear`
    max_entity_radius: f32,
}

impl Octree {
    /// Create a new octree with given world bounds
    pub fn new(world_bounds: AABB, config: OctreeConfig) -> Self {
        Self {
            root: OctreeNode::new(world_bounds, 0),
            config,
            max_entity_radius: 0.0,
        }
    }

    /// Insert an entity; returns `false` if its center is outside the world bounds
    pub fn insert(&mut self, id: RefId, position: Vec3, radius: f32) -> bool {
        self.max_entity_radius = self.max_entity_radius.max(radius);
        self.root.insert(OctreeEntity { id, position, radius }, &self.config)
    }

    /// Remove an entity from the octree
    pub fn remove(&mut self, id: RefId) -> bool {
        self.root.remove(id)
    }

    /// Query all entities within a radius of a point
    pub fn query_radius(&self, center: Vec3, radius: f32) -> Vec<OctreeEntity> {
        let mut results = Vec::new();
        self.root.query_radius(center, radius, self.max_entity_radius, &mut results);
        results
    }

    /// Entities in nodes crossed by the segment `from -> to`
    ///
    /// Candidates still need an exact test.
    pub fn query_segment(&self, from: Vec3, to: Vec3) -> Vec<OctreeEntity> {
        let mut results = Vec::new();
        self.root.query_segment(from, to - from, self.max_entity_radius, &mut results);
        results
    }

    /// Get total entity count
    pub fn entity_count(&self) -> usize {
        self.root.count_entities()
    }

    /// Clear the octree
    pub fn clear(&mut self) {
        self.root = OctreeNode::new(self.root.bounds, 0);
        self.max_entity_radius = 0.0;
    }
}

/// Broad phase backed by an [`Octree`]
#[derive(Debug, Clone)]
pub struct OctreeBroadPhase {
    octree: Octree,
    /// Exact box of every tracked id
    boxes: HashMap<RefId, AABB>,
    /// Ids whose center lies outside the octree bounds
    overflow: HashSet<RefId>,
}

impl OctreeBroadPhase {
    /// Create an octree broad phase over `world_bounds`
    pub fn new(world_bounds: AABB, config: OctreeConfig) -> Self {
        Self {
            octree: Octree::new(world_bounds, config),
            boxes: HashMap::new(),
            overflow: HashSet::new(),
        }
    }

    /// The underlying octree
    pub fn octree(&self) -> &Octree {
        &self.octree
    }

    /// Number of ids kept outside the tree
    pub fn overflow_count(&self) -> usize {
        self.overflow.len()
    }

    fn insert(&mut self, id: RefId, position: Vec3, aabb_size: Vec3) {
        let aabb = AABB::from_center_size(position, aabb_size);
        if !self.octree.insert(id, position, aabb.extents().magnitude()) {
            warn!("Rigidbody({id}) at {position:?} is outside the octree bounds");
            self.overflow.insert(id);
        }
        self.boxes.insert(id, aabb);
    }

    fn detach(&mut self, id: RefId) {
        if !self.overflow.remove(&id) {
            self.octree.remove(id);
        }
    }
}

impl BroadPhase for OctreeBroadPhase {
    fn create(&mut self, id: RefId, position: Vec3, aabb_size: Vec3) {
        if self.boxes.contains_key(&id) {
            self.detach(id);
        }
        self.insert(id, position, aabb_size);
    }

    fn update(&mut self, id: RefId, position: Vec3, aabb_size: Vec3) {
        // Octree requires remove + re-insert for updates
        self.detach(id);
        self.insert(id, position, aabb_size);
    }

    fn remove(&mut self, id: RefId) {
        assert!(
            self.boxes.remove(&id).is_some(),
            "Rigidbody({id}) is not tracked by this octree broad phase"
        );
        self.detach(id);
    }

    fn search(&self, position: Vec3, aabb_size: Vec3, _collision_filter: Option<&CollisionFilter>) -> BroadPhaseResult {
        let query = AABB::from_center_size(position, aabb_size);
        // Conservative sphere around the query box, refined by the exact boxes
        let hits = self
            .octree
            .query_radius(query.center(), query.extents().magnitude())
            .into_iter()
            .map(|entity| entity.id)
            .chain(self.overflow.iter().copied())
            .filter(|id| self.boxes.get(id).is_some_and(|aabb| aabb.intersects(&query)))
            .collect();
        BroadPhaseResult::from_dynamic(hits)
    }

    fn ray_cast(&self, from: Vec3, to: Vec3, _collision_filter: Option<&CollisionFilter>) -> BroadPhaseResult {
        let delta = to - from;
        let hits = self
            .octree
            .query_segment(from, to)
            .into_iter()
            .map(|entity| entity.id)
            .chain(self.overflow.iter().copied())
            .filter(|id| {
                self.boxes
                    .get(id)
                    .and_then(|aabb| aabb.intersect_ray(from, delta))
                    .is_some_and(|(enter, _)| enter <= 1.0)
            })
            .collect();
        BroadPhaseResult::from_dynamic(hits)
    }

    fn contains(&self, id: RefId) -> bool {
        self.boxes.contains_key(&id)
    }

    fn len(&self) -> usize {
        self.boxes.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::splat;

    fn world() -> AABB {
        AABB::new(splat(-100.0), splat(100.0))
    }

    fn id(raw: u64) -> RefId {
        RefId::from_u64(raw)
    }

    #[test]
    fn test_octree_basic_insertion() {
        let mut octree = Octree::new(world(), OctreeConfig::default());
        assert!(octree.insert(id(1), Vec3::zeros(), 1.0));
        assert!(!octree.insert(id(2), Vec3::new(500.0, 0.0, 0.0), 1.0));
        assert_eq!(octree.entity_count(), 1);
    }

    #[test]
    fn test_octree_subdivision() {
        let config = OctreeConfig {
            max_entities_per_node: 4,
            max_depth: 3,
            min_node_size: 1.0,
        };
        let mut octree = Octree::new(world(), config);

        // Same position everywhere to force subdivision down to max depth
        for raw in 1..=10 {
            octree.insert(id(raw), Vec3::zeros(), 1.0);
        }

        assert_eq!(octree.entity_count(), 10);
        assert!(octree.root.children.is_some());

        assert!(octree.remove(id(7)));
        assert!(!octree.remove(id(7)));
        assert_eq!(octree.entity_count(), 9);
    }

    #[test]
    fn test_octree_radius_query() {
        let mut octree = Octree::new(world(), OctreeConfig::default());
        octree.insert(id(1), Vec3::zeros(), 1.0);
        octree.insert(id(2), Vec3::new(5.0, 0.0, 0.0), 1.0);
        octree.insert(id(3), Vec3::new(50.0, 0.0, 0.0), 1.0);

        let results = octree.query_radius(Vec3::zeros(), 10.0);
        assert_eq!(results.len(), 2);
    }

    #[test]
    fn test_broad_phase_search_refines_by_box() {
        let mut broad_phase = OctreeBroadPhase::new(world(), OctreeConfig::default());
        broad_phase.create(id(1), Vec3::zeros(), splat(2.0));
        broad_phase.create(id(2), Vec3::new(2.2, 2.2, 0.0), splat(2.0));

        // Bounding spheres overlap but the boxes are 0.2 apart on both axes
        let result = broad_phase.search(Vec3::zeros(), splat(2.0), None);
        assert_eq!(result.dynamic_candidates, HashSet::from([id(1)]));

        broad_phase.update(id(2), Vec3::new(1.5, 1.5, 0.0), splat(2.0));
        let result = broad_phase.search(Vec3::zeros(), splat(2.0), None);
        assert_eq!(result.dynamic_candidates.len(), 2);
    }

    #[test]
    fn test_broad_phase_overflow() {
        let mut broad_phase = OctreeBroadPhase::new(world(), OctreeConfig::default());
        broad_phase.create(id(1), Vec3::new(150.0, 0.0, 0.0), splat(4.0));
        assert_eq!(broad_phase.overflow_count(), 1);

        let result = broad_phase.search(Vec3::new(148.0, 0.0, 0.0), splat(2.0), None);
        assert!(result.dynamic_candidates.contains(&id(1)));

        // Moving back inside the bounds leaves the overflow list
        broad_phase.update(id(1), Vec3::zeros(), splat(4.0));
        assert_eq!(broad_phase.overflow_count(), 0);
        assert_eq!(broad_phase.octree().entity_count(), 1);

        broad_phase.remove(id(1));
        assert!(broad_phase.is_empty());
    }

    #[test]
    fn test_broad_phase_ray_cast_respects_segment() {
        let mut broad_phase = OctreeBroadPhase::new(world(), OctreeConfig::default());
        broad_phase.create(id(1), Vec3::new(50.0, 0.0, 0.0), splat(20.0));
        broad_phase.create(id(2), Vec3::new(0.0, 50.0, 0.0), splat(20.0));

        let result = broad_phase.ray_cast(Vec3::zeros(), Vec3::new(100.0, 0.0, 0.0), None);
        assert_eq!(result.dynamic_candidates, HashSet::from([id(1)]));

        let short = broad_phase.ray_cast(Vec3::zeros(), Vec3::new(30.0, 0.0, 0.0), None);
        assert!(short.is_empty());
    }

    #[test]
    #[should_panic(expected = "is not tracked")]
    fn test_remove_unknown_panics() {
        let mut broad_phase = OctreeBroadPhase::new(world(), OctreeConfig::default());
        broad_phase.remove(id(42));
    }
}
