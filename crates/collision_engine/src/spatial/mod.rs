//! Broad-phase spatial indices
//!
//! Cull body pairs that cannot be touching before the narrow phase runs.

mod grid;
mod octree;
mod spatial_query;

pub use grid::{GridBroadPhase, CELL_LIMIT, MAX_TRACKED_SPAN};
pub use octree::{Octree, OctreeBroadPhase, OctreeConfig, OctreeEntity, OctreeNode};
pub use spatial_query::{BroadPhase, BroadPhaseResult};
