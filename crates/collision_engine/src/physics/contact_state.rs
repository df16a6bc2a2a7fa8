//! Ready-made collision callback tracking contact state
//!
//! [`ContactRecorder`] keeps the set of bodies currently touching its owner
//! plus the begin/end events received since the last
//! [`clear_frame_data`](ContactRecorder::clear_frame_data).

use std::cell::RefCell;
use std::collections::HashSet;

use crate::foundation::registry::RefId;

use super::manifold::CollisionManifold;
use super::rigidbody::{CollisionCallback, Rigidbody};

#[derive(Debug, Default)]
struct ContactState {
    colliding_with: HashSet<RefId>,
    entered: Vec<(RefId, CollisionManifold)>,
    exited: Vec<RefId>,
    begin_count: usize,
    end_count: usize,
}

/// Collision callback recording contacts and per-tick transitions
#[derive(Debug, Default)]
pub struct ContactRecorder {
    state: RefCell<ContactState>,
}

impl ContactRecorder {
    /// Create an empty recorder
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether any body is touching
    pub fn is_colliding(&self) -> bool {
        !self.state.borrow().colliding_with.is_empty()
    }

    /// Whether `id` is touching
    pub fn is_colliding_with(&self, id: RefId) -> bool {
        self.state.borrow().colliding_with.contains(&id)
    }

    /// Number of bodies touching
    pub fn collision_count(&self) -> usize {
        self.state.borrow().colliding_with.len()
    }

    /// Begin events since the last clear, in arrival order
    pub fn entered(&self) -> Vec<(RefId, CollisionManifold)> {
        self.state.borrow().entered.clone()
    }

    /// End events since the last clear, in arrival order
    pub fn exited(&self) -> Vec<RefId> {
        self.state.borrow().exited.clone()
    }

    /// Whether `id` started touching since the last clear
    pub fn just_collided_with(&self, id: RefId) -> bool {
        self.state.borrow().entered.iter().any(|(entered, _)| *entered == id)
    }

    /// Whether `id` stopped touching since the last clear
    pub fn just_stopped_colliding_with(&self, id: RefId) -> bool {
        self.state.borrow().exited.contains(&id)
    }

    /// Total begin events ever received
    pub fn begin_count(&self) -> usize {
        self.state.borrow().begin_count
    }

    /// Total end events ever received
    pub fn end_count(&self) -> usize {
        self.state.borrow().end_count
    }

    /// Forget the per-tick event lists
    pub fn clear_frame_data(&self) {
        let mut state = self.state.borrow_mut();
        state.entered.clear();
        state.exited.clear();
    }
}

impl CollisionCallback for ContactRecorder {
    fn on_begin_contact(&self, other: &Rigidbody, manifold: &CollisionManifold) {
        let mut state = self.state.borrow_mut();
        state.colliding_with.insert(other.id());
        state.entered.push((other.id(), *manifold));
        state.begin_count += 1;
    }

    fn on_end_contact(&self, other: &Rigidbody) {
        let mut state = self.state.borrow_mut();
        state.colliding_with.remove(&other.id());
        state.exited.push(other.id());
        state.end_count += 1;
    }
}
