//! Time-varying value sources polled once per tick
//!
//! Bodies read their position, rotation, size and discarded state through
//! [`Variable`]. The engine calls [`Variable::update`] with the current tick
//! during its poll phase and uses the returned flag to decide what needs to be
//! re-indexed or re-resolved.

use std::cell::Cell;
use std::rc::Rc;

use super::math::Vec3;

/// A value source that may change from one tick to the next
pub trait Variable<T> {
    /// Current value
    fn val(&self) -> T;

    /// Advance the source to `tick`, returning `true` if the value changed
    /// since the previous call
    fn update(&self, tick: u64) -> bool;
}

/// Shared, dynamically typed variable
pub type SharedVar<T> = Rc<dyn Variable<T>>;

/// A value that never changes
#[derive(Debug, Clone, Copy)]
pub struct Const<T>(pub T);

impl<T: Copy> Variable<T> for Const<T> {
    fn val(&self) -> T {
        self.0
    }

    fn update(&self, _tick: u64) -> bool {
        false
    }
}

/// Wrap a constant value as a shared variable
pub fn constant<T: Copy + 'static>(value: T) -> SharedVar<T> {
    Rc::new(Const(value))
}

/// A value set explicitly by its owner
///
/// The change flag is consumed by the first `update` after a `set`, so one
/// settable should feed one body.
#[derive(Debug)]
pub struct Settable<T: Copy> {
    value: Cell<T>,
    changed: Cell<bool>,
}

impl<T: Copy> Settable<T> {
    /// Create a settable variable holding `value`
    pub fn new(value: T) -> Self {
        Self {
            value: Cell::new(value),
            changed: Cell::new(false),
        }
    }

    /// Replace the value; the next `update` reports a change
    pub fn set(&self, value: T) {
        self.value.set(value);
        self.changed.set(true);
    }
}

impl<T: Copy> Variable<T> for Settable<T> {
    fn val(&self) -> T {
        self.value.get()
    }

    fn update(&self, _tick: u64) -> bool {
        self.changed.replace(false)
    }
}

/// A position integrated from a linear velocity, one step per tick
#[derive(Debug)]
pub struct Integrated {
    position: Cell<Vec3>,
    velocity: Cell<Vec3>,
    last_tick: Cell<u64>,
}

impl Integrated {
    /// Start at `position` moving with `velocity` units per tick
    pub fn new(position: Vec3, velocity: Vec3) -> Self {
        Self {
            position: Cell::new(position),
            velocity: Cell::new(velocity),
            last_tick: Cell::new(0),
        }
    }

    /// Current velocity
    pub fn velocity(&self) -> Vec3 {
        self.velocity.get()
    }

    /// Change the velocity for subsequent ticks
    pub fn set_velocity(&self, velocity: Vec3) {
        self.velocity.set(velocity);
    }

    /// Teleport to `position`
    pub fn set_position(&self, position: Vec3) {
        self.position.set(position);
    }
}

impl Variable<Vec3> for Integrated {
    fn val(&self) -> Vec3 {
        self.position.get()
    }

    fn update(&self, tick: u64) -> bool {
        let last = self.last_tick.replace(tick);
        if tick <= last {
            return false;
        }

        let velocity = self.velocity.get();
        if velocity == Vec3::zeros() {
            return false;
        }

        // Tick deltas are small, the precision loss is irrelevant here
        #[allow(clippy::cast_precision_loss)]
        let steps = (tick - last) as f32;
        self.position.set(self.position.get() + velocity * steps);
        true
    }
}
