//! Uniform grid broad phase
//!
//! Each axis is cut into cells of a fixed stride. A tracked box occupies a
//! half-open range of cells on every axis; a search collects the ids found in
//! the query's cell range on each axis and intersects the per-axis sets.
//! A 2D grid ignores the Z axis entirely.
//!
//! Boxes reaching past [`CELL_LIMIT`] cells from the origin, or wider than
//! [`MAX_TRACKED_SPAN`] cells on an axis, are kept in an overflow list and
//! scanned linearly.

use std::collections::{HashMap, HashSet};

use crate::foundation::logging::warn;
use crate::foundation::math::{Vec3, AABB};
use crate::foundation::registry::RefId;
use crate::physics::collision_layers::CollisionFilter;
use crate::physics::collision_system::CollisionError;

use super::spatial_query::{BroadPhase, BroadPhaseResult};

/// Largest cell index, in either direction, a box may occupy
pub const CELL_LIMIT: f32 = 16_777_216.0;

/// Most cells a box may span on one axis
pub const MAX_TRACKED_SPAN: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct CellRange {
    begin: i32,
    end: i32,
}

impl CellRange {
    /// Cells covering `[low, high]`, clamped to the index limit
    #[allow(clippy::cast_possible_truncation)]
    fn clamped(low: f32, high: f32, stride: f32) -> Self {
        let cell = |value: f32| (value / stride).floor().clamp(-CELL_LIMIT, CELL_LIMIT) as i32;
        Self {
            begin: cell(low),
            end: cell(high) + 1,
        }
    }

    /// Cells covering `[low, high]`, or `None` if that range cannot be indexed
    fn tracked(low: f32, high: f32, stride: f32) -> Option<Self> {
        let indexable = |value: f32| (-CELL_LIMIT..=CELL_LIMIT).contains(&(value / stride).floor());
        if !indexable(low) || !indexable(high) {
            return None;
        }
        let range = Self::clamped(low, high, stride);
        (range.width() <= MAX_TRACKED_SPAN).then_some(range)
    }

    fn width(&self) -> usize {
        usize::try_from(self.end - self.begin).unwrap_or(0)
    }

    fn contains(&self, cell: i32) -> bool {
        cell >= self.begin && cell < self.end
    }
}

#[derive(Debug, Clone)]
struct Axis {
    stride: f32,
    ranges: HashMap<RefId, CellRange>,
    cells: HashMap<i32, HashSet<RefId>>,
}

impl Axis {
    fn new(stride: f32) -> Self {
        Self {
            stride,
            ranges: HashMap::new(),
            cells: HashMap::new(),
        }
    }

    fn track(&mut self, id: RefId, current: CellRange) {
        let previous = self.ranges.insert(id, current);
        if previous == Some(current) {
            return;
        }

        if let Some(previous) = previous {
            for cell in previous.begin..previous.end {
                if !current.contains(cell) {
                    self.unlink(id, cell);
                }
            }
        }
        for cell in current.begin..current.end {
            if !previous.is_some_and(|previous| previous.contains(cell)) {
                self.cells.entry(cell).or_default().insert(id);
            }
        }
    }

    fn untrack(&mut self, id: RefId) -> bool {
        let Some(range) = self.ranges.remove(&id) else {
            return false;
        };
        for cell in range.begin..range.end {
            self.unlink(id, cell);
        }
        true
    }

    fn unlink(&mut self, id: RefId, cell: i32) {
        if let Some(ids) = self.cells.get_mut(&cell) {
            ids.remove(&id);
            if ids.is_empty() {
                self.cells.remove(&cell);
            }
        }
    }

    fn search(&self, low: f32, high: f32) -> HashSet<RefId> {
        let range = CellRange::clamped(low, high, self.stride);
        // Walk whichever is smaller: the query's cells or the occupied ones
        if range.width() > self.cells.len() {
            self.cells
                .iter()
                .filter(|(cell, _)| range.contains(**cell))
                .flat_map(|(_, ids)| ids)
                .copied()
                .collect()
        } else {
            (range.begin..range.end)
                .filter_map(|cell| self.cells.get(&cell))
                .flatten()
                .copied()
                .collect()
        }
    }
}

/// Broad phase over a uniform 2D or 3D grid
#[derive(Debug, Clone)]
pub struct GridBroadPhase {
    axes: Vec<Axis>,
    /// Boxes too far out or too wide for the cells
    overflow: HashMap<RefId, AABB>,
}

impl GridBroadPhase {
    /// Create a grid over the first `dimension` axes with the given cell size
    pub fn new(dimension: usize, cell: Vec3) -> Result<Self, CollisionError> {
        if !(2..=3).contains(&dimension) {
            return Err(CollisionError::InvalidBroadPhase(format!(
                "grid dimension must be 2 or 3, got {dimension}"
            )));
        }
        if let Some(axis) = (0..dimension).find(|&axis| cell[axis] <= 0.0) {
            return Err(CollisionError::InvalidBroadPhase(format!(
                "grid cell size must be positive, axis {axis} is {}",
                cell[axis]
            )));
        }
        Ok(Self {
            axes: (0..dimension).map(|axis| Axis::new(cell[axis])).collect(),
            overflow: HashMap::new(),
        })
    }

    /// Number of axes
    pub fn dimension(&self) -> usize {
        self.axes.len()
    }

    /// Number of ids kept outside the cells
    pub fn overflow_count(&self) -> usize {
        self.overflow.len()
    }

    fn track(&mut self, id: RefId, position: Vec3, aabb_size: Vec3) {
        let aabb = AABB::from_center_size(position, aabb_size);
        let ranges: Option<Vec<CellRange>> = self
            .axes
            .iter()
            .enumerate()
            .map(|(index, axis)| CellRange::tracked(aabb.min[index], aabb.max[index], axis.stride))
            .collect();

        if let Some(ranges) = ranges {
            self.overflow.remove(&id);
            for (axis, range) in self.axes.iter_mut().zip(ranges) {
                axis.track(id, range);
            }
        } else {
            if self.overflow.insert(id, aabb).is_none() {
                warn!("Rigidbody({id}) at {position:?} does not fit the grid cells");
            }
            for axis in &mut self.axes {
                axis.untrack(id);
            }
        }
    }

    /// Whether two boxes overlap on the grid's axes
    fn overlaps(&self, a: &AABB, b: &AABB) -> bool {
        (0..self.axes.len()).all(|index| a.min[index] <= b.max[index] && a.max[index] >= b.min[index])
    }

    fn search_box(&self, aabb: &AABB) -> HashSet<RefId> {
        let mut candidates = self.search_cells(aabb);
        candidates.extend(
            self.overflow
                .iter()
                .filter(|(_, tracked)| self.overlaps(tracked, aabb))
                .map(|(id, _)| *id),
        );
        candidates
    }

    fn search_cells(&self, aabb: &AABB) -> HashSet<RefId> {
        let mut axes = self.axes.iter().enumerate();
        let Some((index, first)) = axes.next() else {
            return HashSet::new();
        };
        let mut candidates = first.search(aabb.min[index], aabb.max[index]);
        for (index, axis) in axes {
            if candidates.is_empty() {
                break;
            }
            let on_axis = axis.search(aabb.min[index], aabb.max[index]);
            candidates.retain(|id| on_axis.contains(id));
        }
        candidates
    }
}

impl BroadPhase for GridBroadPhase {
    fn create(&mut self, id: RefId, position: Vec3, aabb_size: Vec3) {
        self.track(id, position, aabb_size);
    }

    fn update(&mut self, id: RefId, position: Vec3, aabb_size: Vec3) {
        self.track(id, position, aabb_size);
    }

    fn remove(&mut self, id: RefId) {
        let mut removed = self.overflow.remove(&id).is_some();
        for axis in &mut self.axes {
            removed |= axis.untrack(id);
        }
        assert!(removed, "Rigidbody({id}) is not tracked by this grid broad phase");
    }

    fn search(&self, position: Vec3, aabb_size: Vec3, _collision_filter: Option<&CollisionFilter>) -> BroadPhaseResult {
        BroadPhaseResult::from_dynamic(self.search_box(&AABB::from_center_size(position, aabb_size)))
    }

    fn ray_cast(&self, from: Vec3, to: Vec3, _collision_filter: Option<&CollisionFilter>) -> BroadPhaseResult {
        BroadPhaseResult::from_dynamic(self.search_box(&AABB::from_points(from, to)))
    }

    fn contains(&self, id: RefId) -> bool {
        self.overflow.contains_key(&id)
            || self
                .axes
                .first()
                .is_some_and(|axis| axis.ranges.contains_key(&id))
    }

    fn len(&self) -> usize {
        self.overflow.len() + self.axes.first().map_or(0, |axis| axis.ranges.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::splat;

    fn id(raw: u64) -> RefId {
        RefId::from_u64(raw)
    }

    fn grid() -> GridBroadPhase {
        GridBroadPhase::new(3, splat(10.0)).expect("valid grid")
    }

    #[test]
    fn test_rejects_bad_dimension_and_cell() {
        assert!(matches!(
            GridBroadPhase::new(4, splat(10.0)),
            Err(CollisionError::InvalidBroadPhase(_))
        ));
        assert!(GridBroadPhase::new(2, Vec3::new(10.0, 0.0, 0.0)).is_err());
        // Z is ignored by a 2D grid
        assert!(GridBroadPhase::new(2, Vec3::new(10.0, 10.0, 0.0)).is_ok());
    }

    #[test]
    fn test_search_intersects_axes() {
        let mut grid = grid();
        grid.create(id(1), Vec3::new(5.0, 5.0, 5.0), splat(2.0));
        // Same x cells, far away on y
        grid.create(id(2), Vec3::new(5.0, 95.0, 5.0), splat(2.0));

        let result = grid.search(Vec3::new(3.0, 3.0, 3.0), splat(2.0), None);
        assert_eq!(result.dynamic_candidates, HashSet::from([id(1)]));
        assert_eq!(grid.len(), 2);
    }

    #[test]
    fn test_update_moves_between_cells() {
        let mut grid = grid();
        grid.create(id(1), Vec3::new(5.0, 5.0, 5.0), splat(2.0));

        grid.update(id(1), Vec3::new(45.0, 5.0, 5.0), splat(2.0));
        assert!(grid.search(Vec3::new(5.0, 5.0, 5.0), splat(2.0), None).is_empty());
        assert!(!grid.search(Vec3::new(45.0, 5.0, 5.0), splat(2.0), None).is_empty());

        // Spanning a cell boundary keeps the id in both cells
        grid.update(id(1), Vec3::new(50.0, 5.0, 5.0), splat(2.0));
        assert!(!grid.search(Vec3::new(45.0, 5.0, 5.0), splat(1.0), None).is_empty());
        assert!(!grid.search(Vec3::new(55.0, 5.0, 5.0), splat(1.0), None).is_empty());
    }

    #[test]
    fn test_negative_coordinates() {
        let mut grid = grid();
        grid.create(id(1), Vec3::new(-5.0, -5.0, -5.0), splat(2.0));
        assert!(grid.search(Vec3::new(5.0, 5.0, 5.0), splat(2.0), None).is_empty());
        assert!(!grid.search(Vec3::new(-4.0, -4.0, -4.0), splat(1.0), None).is_empty());
    }

    #[test]
    fn test_ray_cast_searches_segment_bounds() {
        let mut grid = grid();
        grid.create(id(1), Vec3::new(50.0, 0.0, 0.0), splat(20.0));
        grid.create(id(2), Vec3::new(50.0, 80.0, 0.0), splat(20.0));

        let result = grid.ray_cast(Vec3::zeros(), Vec3::new(100.0, 0.0, 0.0), None);
        assert_eq!(result.dynamic_candidates, HashSet::from([id(1)]));
    }

    #[test]
    fn test_remove() {
        let mut grid = grid();
        grid.create(id(1), Vec3::zeros(), splat(2.0));
        assert!(grid.contains(id(1)));

        grid.remove(id(1));
        assert!(!grid.contains(id(1)));
        assert!(grid.is_empty());
    }

    #[test]
    fn test_far_body_overflows() {
        let mut grid = grid();
        grid.create(id(1), Vec3::new(3.0e10, 0.0, 0.0), splat(2.0));
        grid.create(id(2), Vec3::zeros(), splat(2.0));
        assert!(grid.contains(id(1)));
        assert_eq!(grid.overflow_count(), 1);
        assert_eq!(grid.len(), 2);

        let far = grid.search(Vec3::new(3.0e10, 0.0, 0.0), splat(4.0), None);
        assert_eq!(far.dynamic_candidates, HashSet::from([id(1)]));
        let near = grid.search(Vec3::zeros(), splat(4.0), None);
        assert_eq!(near.dynamic_candidates, HashSet::from([id(2)]));

        // Moving back within the cells leaves the overflow list
        grid.update(id(1), Vec3::new(20.0, 0.0, 0.0), splat(2.0));
        assert_eq!(grid.overflow_count(), 0);
        assert!(grid.search(Vec3::new(3.0e10, 0.0, 0.0), splat(4.0), None).is_empty());
        assert!(!grid.search(Vec3::new(20.0, 0.0, 0.0), splat(1.0), None).is_empty());

        grid.update(id(1), Vec3::new(0.0, -3.0e10, 0.0), splat(2.0));
        grid.remove(id(1));
        assert!(!grid.contains(id(1)));
        assert_eq!(grid.len(), 1);
    }

    #[test]
    fn test_huge_body_overflows() {
        let mut grid = grid();
        // A million cells wide on every axis
        grid.create(id(1), Vec3::zeros(), splat(1.0e7));
        assert_eq!(grid.overflow_count(), 1);

        let result = grid.search(Vec3::new(4.0e6, -4.0e6, 0.0), splat(1.0), None);
        assert_eq!(result.dynamic_candidates, HashSet::from([id(1)]));
        assert!(grid.search(Vec3::new(6.0e6, 0.0, 0.0), splat(1.0), None).is_empty());
    }

    #[test]
    fn test_unbounded_queries() {
        let mut grid = grid();
        grid.create(id(1), Vec3::zeros(), splat(2.0));

        let result = grid.ray_cast(Vec3::new(-1.0e9, 0.0, 0.0), Vec3::new(1.0e9, 0.0, 0.0), None);
        assert_eq!(result.dynamic_candidates, HashSet::from([id(1)]));
        assert!(grid.search(Vec3::new(3.0e10, 0.0, 0.0), splat(2.0), None).is_empty());
    }

    #[test]
    #[should_panic(expected = "is not tracked")]
    fn test_remove_unknown_panics() {
        grid().remove(id(3));
    }
}
