//! Rigid body handles
//!
//! A [`Rigidbody`] is the application's view of a body registered with a
//! [`CollisionEngine`](super::CollisionEngine): identity, type, shape, the
//! position/rotation sources the engine polls, an optional collision filter
//! and the callback that receives contact notifications.
//!
//! Handles are cheap to clone and single-threaded. Discarding a handle only
//! flips a flag; the engine retires the body during its next reap phase and
//! sends the remaining end-contact notifications. Dropping every handle to a
//! body retires it the same way.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::foundation::math::{Quat, Vec3};
use crate::foundation::registry::{Ref, RefId};
use crate::foundation::variable::{constant, Integrated, SharedVar, Variable};

use super::body_type::BodyType;
use super::collision_layers::CollisionFilter;
use super::manifold::CollisionManifold;
use super::shape::Shape;

/// Receiver of contact notifications
pub trait CollisionCallback {
    /// `other` started touching the body this callback is attached to
    fn on_begin_contact(&self, other: &Rigidbody, manifold: &CollisionManifold);

    /// `other` stopped touching the body this callback is attached to
    fn on_end_contact(&self, other: &Rigidbody);
}

/// Velocity control for a body, typically backed by a dynamics solver
pub trait RigidbodyController {
    /// Current linear velocity
    fn linear_velocity(&self) -> Vec3;

    /// Replace the linear velocity
    fn set_linear_velocity(&self, velocity: Vec3);

    /// Apply an impulse through the center of mass
    fn apply_central_impulse(&self, impulse: Vec3);
}

/// Controller moving a body at constant velocity, with unit mass
///
/// Its [`position`](Self::position) source must be the one the body was
/// created with.
#[derive(Debug)]
pub struct KinematicController {
    position: Rc<Integrated>,
}

impl KinematicController {
    /// Start at `position` moving with `velocity` units per tick
    pub fn new(position: Vec3, velocity: Vec3) -> Self {
        Self {
            position: Rc::new(Integrated::new(position, velocity)),
        }
    }

    /// The integrated position source
    pub fn position(&self) -> SharedVar<Vec3> {
        self.position.clone()
    }

    /// Teleport the body
    pub fn set_position(&self, position: Vec3) {
        self.position.set_position(position);
    }
}

impl RigidbodyController for KinematicController {
    fn linear_velocity(&self) -> Vec3 {
        self.position.velocity()
    }

    fn set_linear_velocity(&self, velocity: Vec3) {
        self.position.set_velocity(velocity);
    }

    fn apply_central_impulse(&self, impulse: Vec3) {
        self.position.set_velocity(self.position.velocity() + impulse);
    }
}

/// Shared state behind a [`Rigidbody`] handle
pub struct RigidbodyStub {
    reference: Rc<Ref>,
    body_type: BodyType,
    shape: Shape,
    position: SharedVar<Vec3>,
    rotation: SharedVar<Quat>,
    collision_filter: Option<CollisionFilter>,
    callback: RefCell<Option<Rc<dyn CollisionCallback>>>,
    controller: RefCell<Option<Rc<dyn RigidbodyController>>>,
}

impl RigidbodyStub {
    pub(crate) fn new(
        reference: Rc<Ref>,
        body_type: BodyType,
        shape: Shape,
        position: SharedVar<Vec3>,
        rotation: SharedVar<Quat>,
        collision_filter: Option<CollisionFilter>,
    ) -> Self {
        Self {
            reference,
            body_type,
            shape,
            position,
            rotation,
            collision_filter,
            callback: RefCell::new(None),
            controller: RefCell::new(None),
        }
    }
}

/// Handle to a body registered with a collision engine
#[derive(Clone)]
pub struct Rigidbody(Rc<RigidbodyStub>);

impl Rigidbody {
    pub(crate) fn from_stub(stub: Rc<RigidbodyStub>) -> Self {
        Self(stub)
    }

    pub(crate) fn reference(&self) -> &Rc<Ref> {
        &self.0.reference
    }

    pub(crate) fn downgrade(&self) -> Weak<RigidbodyStub> {
        Rc::downgrade(&self.0)
    }

    /// Handle that belongs to no engine and never receives contacts
    pub fn detached(body_type: BodyType, shape: Shape, position: SharedVar<Vec3>) -> Self {
        Self(Rc::new(RigidbodyStub::new(
            Ref::detached(),
            body_type,
            shape,
            position,
            constant(Quat::identity()),
            None,
        )))
    }

    /// Stable id; [`RefId::NONE`] for detached handles
    pub fn id(&self) -> RefId {
        self.0.reference.id()
    }

    /// The body type
    pub fn body_type(&self) -> BodyType {
        self.0.body_type
    }

    /// The shape descriptor
    pub fn shape(&self) -> &Shape {
        &self.0.shape
    }

    /// The position source
    pub fn position(&self) -> &SharedVar<Vec3> {
        &self.0.position
    }

    /// The rotation source
    pub fn rotation(&self) -> &SharedVar<Quat> {
        &self.0.rotation
    }

    /// The collision filter, if any
    pub fn collision_filter(&self) -> Option<&CollisionFilter> {
        self.0.collision_filter.as_ref()
    }

    /// The attached collision callback
    pub fn collision_callback(&self) -> Option<Rc<dyn CollisionCallback>> {
        self.0.callback.borrow().clone()
    }

    /// Attach a collision callback, replacing any previous one
    pub fn set_collision_callback(&self, callback: Option<Rc<dyn CollisionCallback>>) {
        *self.0.callback.borrow_mut() = callback;
    }

    /// The attached controller
    pub fn controller(&self) -> Option<Rc<dyn RigidbodyController>> {
        self.0.controller.borrow().clone()
    }

    /// Attach a controller, replacing any previous one
    pub fn set_controller(&self, controller: Option<Rc<dyn RigidbodyController>>) {
        *self.0.controller.borrow_mut() = controller;
    }

    /// Linear velocity from the controller, zero without one
    pub fn linear_velocity(&self) -> Vec3 {
        self.controller()
            .map_or_else(Vec3::zeros, |controller| controller.linear_velocity())
    }

    /// Forward to the controller; ignored without one
    pub fn set_linear_velocity(&self, velocity: Vec3) {
        if let Some(controller) = self.controller() {
            controller.set_linear_velocity(velocity);
        }
    }

    /// Forward to the controller; ignored without one
    pub fn apply_central_impulse(&self, impulse: Vec3) {
        if let Some(controller) = self.controller() {
            controller.apply_central_impulse(impulse);
        }
    }

    /// Request removal; takes effect at the engine's next update
    pub fn discard(&self) {
        self.0.reference.discard();
    }

    /// Whether removal was requested
    pub fn is_discarded(&self) -> bool {
        self.0.reference.is_discarded()
    }

    /// Whether this handle belongs to no engine
    pub fn is_detached(&self) -> bool {
        self.id().is_none()
    }

    /// Whether both handles refer to the same body
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Current position
    pub fn position_val(&self) -> Vec3 {
        self.0.position.val()
    }

    /// Deliver a begin-contact notification; contacts from pure sensors are
    /// dropped, a sensor with a rigid type is reported like any other body
    pub fn on_begin_contact(&self, other: &Self, manifold: &CollisionManifold) {
        if other.body_type().is_pure_sensor() {
            return;
        }
        // Clone out so the callback may replace itself
        if let Some(callback) = self.collision_callback() {
            callback.on_begin_contact(other, manifold);
        }
    }

    /// Deliver an end-contact notification; contacts from pure sensors are dropped
    pub fn on_end_contact(&self, other: &Self) {
        if other.body_type().is_pure_sensor() {
            return;
        }
        if let Some(callback) = self.collision_callback() {
            callback.on_end_contact(other);
        }
    }
}

impl fmt::Debug for Rigidbody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rigidbody")
            .field("id", &self.id())
            .field("body_type", &self.body_type())
            .field("shape", &self.0.shape)
            .field("discarded", &self.is_discarded())
            .finish()
    }
}
