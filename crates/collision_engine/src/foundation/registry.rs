//! Object identity registry
//!
//! Hands out stable ids for collidable objects and resolves them back to their
//! owners. Ids are the FFI form of generational slot keys, so an id is never
//! handed out twice while its owner is alive and a stale id resolves to
//! nothing instead of to a newer object.

use std::cell::Cell;
use std::fmt;
use std::rc::{Rc, Weak};

use slotmap::{new_key_type, Key, KeyData, SlotMap};

use super::variable::SharedVar;

new_key_type! {
    struct RefKey;
}

/// Stable identifier of a registered object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RefId(u64);

impl RefId {
    /// The id of detached objects; never allocated by a registry
    pub const NONE: Self = Self(0);

    fn from_key(key: RefKey) -> Self {
        Self(key.data().as_ffi())
    }

    fn key(self) -> RefKey {
        KeyData::from_ffi(self.0).into()
    }

    /// Rebuild an id from its raw value
    pub const fn from_u64(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw integer value
    pub fn as_u64(self) -> u64 {
        self.0
    }

    /// Whether this is [`RefId::NONE`]
    pub fn is_none(self) -> bool {
        self == Self::NONE
    }
}

impl fmt::Display for RefId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// Identity record shared between an object and the registry
///
/// Carries the discarded state: either flipped explicitly through
/// [`Ref::discard`] or driven by an external boolean source.
pub struct Ref {
    id: RefId,
    discarded: Cell<bool>,
    discarded_source: Option<SharedVar<bool>>,
}

impl Ref {
    fn new(id: RefId, discarded_source: Option<SharedVar<bool>>) -> Self {
        Self {
            id,
            discarded: Cell::new(false),
            discarded_source,
        }
    }

    /// A reference that belongs to no registry
    pub fn detached() -> Rc<Self> {
        Rc::new(Self::new(RefId::NONE, None))
    }

    /// The stable id
    pub fn id(&self) -> RefId {
        self.id
    }

    /// Mark the object as discarded
    pub fn discard(&self) {
        self.discarded.set(true);
    }

    /// Whether the object was discarded, explicitly or by its source
    pub fn is_discarded(&self) -> bool {
        self.discarded.get() || self.discarded_source.as_ref().is_some_and(|source| source.val())
    }
}

impl fmt::Debug for Ref {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ref")
            .field("id", &self.id)
            .field("discarded", &self.is_discarded())
            .finish()
    }
}

struct RefSlot<T> {
    reference: Rc<Ref>,
    owner: Weak<T>,
}

/// Registry mapping stable ids to weakly held owners
pub struct RefRegistry<T> {
    slots: SlotMap<RefKey, RefSlot<T>>,
}

impl<T> RefRegistry<T> {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            slots: SlotMap::with_key(),
        }
    }

    /// Allocate an id for `owner`
    ///
    /// Use with [`Rc::new_cyclic`] when the owner stores its own [`Ref`].
    pub fn allocate(&mut self, owner: Weak<T>, discarded: Option<SharedVar<bool>>) -> Rc<Ref> {
        let key = self.slots.insert_with_key(|key| RefSlot {
            reference: Rc::new(Ref::new(RefId::from_key(key), discarded)),
            owner,
        });
        Rc::clone(&self.slots[key].reference)
    }

    /// Resolve an id to its owner, if both are still alive
    pub fn resolve(&self, id: RefId) -> Option<Rc<T>> {
        if id.is_none() {
            return None;
        }
        self.slots.get(id.key()).and_then(|slot| slot.owner.upgrade())
    }

    /// Identity record of a registered id
    pub fn reference(&self, id: RefId) -> Option<&Rc<Ref>> {
        if id.is_none() {
            return None;
        }
        self.slots.get(id.key()).map(|slot| &slot.reference)
    }

    /// Release an id; returns `false` if it was not registered
    pub fn release(&mut self, id: RefId) -> bool {
        !id.is_none() && self.slots.remove(id.key()).is_some()
    }

    /// Number of live ids
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether no ids are registered
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

impl<T> Default for RefRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}
