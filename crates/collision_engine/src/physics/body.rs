//! Engine-side body records

use std::collections::HashSet;
use std::rc::{Rc, Weak};

use crate::foundation::logging::warn;
use crate::foundation::math::{Quat, Vec3};
use crate::foundation::registry::{Ref, RefId};
use crate::foundation::variable::SharedVar;

use super::body_type::BodyType;
use super::collision::{BodyDef, Candidate};
use super::collision_layers::CollisionFilter;
use super::collision_system::{BroadPhaseSlot, CollisionError};
use super::rigidbody::{Rigidbody, RigidbodyStub};
use super::shape::{Shape, ShapeType};

/// Which contact set a contact belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ContactKind {
    Dynamic,
    Static,
}

impl ContactKind {
    pub(crate) fn of(body_type: BodyType) -> Self {
        if body_type.is_static() {
            Self::Static
        } else {
            Self::Dynamic
        }
    }
}

/// A registered body: a weak link to its handle, the sources it is polled
/// from, its cached definition and its contact sets
///
/// The engine never keeps a handle alive. Once the owner drops the last
/// [`Rigidbody`], the next poll retires the body.
///
/// The contact sets hold the ids that touched this body as of the last
/// completed tick and are only replaced wholesale.
pub(crate) struct Body<S> {
    reference: Rc<Ref>,
    owner: Weak<RigidbodyStub>,
    pub(crate) body_type: BodyType,
    pub(crate) collision_filter: Option<CollisionFilter>,
    shape: Shape,
    position: SharedVar<Vec3>,
    rotation: SharedVar<Quat>,
    pub(crate) body_def: Rc<BodyDef<S>>,
    pub(crate) dynamic_contacts: HashSet<RefId>,
    pub(crate) static_contacts: HashSet<RefId>,
    polled: bool,
}

impl<S> Body<S> {
    pub(crate) fn new(rigidbody: &Rigidbody, body_def: Rc<BodyDef<S>>) -> Self {
        Self {
            reference: Rc::clone(rigidbody.reference()),
            owner: rigidbody.downgrade(),
            body_type: rigidbody.body_type(),
            collision_filter: rigidbody.collision_filter().copied(),
            shape: rigidbody.shape().clone(),
            position: Rc::clone(rigidbody.position()),
            rotation: Rc::clone(rigidbody.rotation()),
            body_def,
            dynamic_contacts: HashSet::new(),
            static_contacts: HashSet::new(),
            polled: false,
        }
    }

    pub(crate) fn id(&self) -> RefId {
        self.reference.id()
    }

    pub(crate) fn is_discarded(&self) -> bool {
        self.reference.is_discarded()
    }

    /// Whether every handle to this body was dropped
    pub(crate) fn is_released(&self) -> bool {
        self.owner.strong_count() == 0
    }

    /// The live handle, if its owner still holds one
    pub(crate) fn rigidbody(&self) -> Option<Rigidbody> {
        self.owner.upgrade().map(Rigidbody::from_stub)
    }

    /// The live handle, or a callback-less stand-in with the same id once the
    /// owner let go of it
    pub(crate) fn handle(&self) -> Rigidbody {
        self.rigidbody().unwrap_or_else(|| {
            Rigidbody::from_stub(Rc::new(RigidbodyStub::new(
                Rc::clone(&self.reference),
                self.body_type,
                self.shape.clone(),
                Rc::clone(&self.position),
                Rc::clone(&self.rotation),
                self.collision_filter,
            )))
        })
    }

    pub(crate) fn contacts(&self, kind: ContactKind) -> &HashSet<RefId> {
        match kind {
            ContactKind::Dynamic => &self.dynamic_contacts,
            ContactKind::Static => &self.static_contacts,
        }
    }

    pub(crate) fn contacts_mut(&mut self, kind: ContactKind) -> &mut HashSet<RefId> {
        match kind {
            ContactKind::Dynamic => &mut self.dynamic_contacts,
            ContactKind::Static => &mut self.static_contacts,
        }
    }

    /// Poll the size, position and rotation sources for `tick`
    ///
    /// Re-derives the body definition on resize and pushes the new box into
    /// every broad phase that indexes this body. Returns whether anything
    /// changed; the first poll always counts as a change.
    pub(crate) fn update<F>(&mut self, tick: u64, derive_body_def: F, broad_phases: &mut [BroadPhaseSlot]) -> bool
    where
        F: FnOnce(ShapeType, Vec3) -> Result<Rc<BodyDef<S>>, CollisionError>,
    {
        let first_poll = !std::mem::replace(&mut self.polled, true);
        let size_updated = self.shape.size().update(tick);
        let position_updated = self.position.update(tick);
        let rotation_updated = self.rotation.update(tick);

        if size_updated {
            match derive_body_def(self.shape.shape_type(), self.shape.size().val()) {
                Ok(body_def) => self.body_def = body_def,
                Err(err) => warn!("Rigidbody({}) keeps its previous shape: {err}", self.id()),
            }
        }

        if size_updated || position_updated {
            let id = self.id();
            let position = self.position.val();
            let aabb_size = self.body_def.aabb_size();
            for slot in broad_phases
                .iter_mut()
                .filter(|slot| slot.accepts(self.collision_filter.as_ref()))
            {
                slot.broad_phase.update(id, position, aabb_size);
            }
        }

        first_poll || size_updated || position_updated || rotation_updated
    }

    pub(crate) fn to_candidate(&self) -> Candidate<'_, S> {
        Candidate {
            id: self.id(),
            position: self.position.val(),
            rotation: self.rotation.val(),
            shape_type: self.shape.shape_type(),
            collision_filter: self.collision_filter,
            shape: &self.body_def.shape,
        }
    }
}
