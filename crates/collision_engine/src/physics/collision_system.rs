//! Incremental collision engine
//!
//! Each [`CollisionEngine::update`] runs four phases in order:
//!
//! 1. **Reap planning**: bodies whose disposal was deferred last tick join the
//!    removal set.
//! 2. **Poll**: every live body polls its sources; discarded bodies and bodies
//!    whose handles were all dropped join the removal set, moved or resized
//!    non-static bodies become dirty.
//! 3. **Resolve**: every dirty body searches the broad phases, runs the narrow
//!    phase against the candidates and diffs the result against its previous
//!    contact sets, firing begin/end notifications.
//! 4. **Reap**: removed bodies send their remaining end notifications and
//!    leave the broad phases, the body table and the registry.
//!
//! When a dirty body touches a body that is not dirty this tick, the engine
//! notifies both sides and updates the other body's contact set on its behalf.
//! When both are dirty, each side records the contact during its own
//! resolution. Every notification matches exactly one change to the
//! receiver's contact set, so begin and end notifications always alternate.

use std::collections::{HashMap, HashSet};
use std::mem;
use std::rc::Rc;

use crate::config::{ColliderConfig, ConfigError};
use crate::foundation::logging::{debug, info, trace};
use crate::foundation::math::{Quat, Vec3};
use crate::foundation::registry::{Ref, RefId, RefRegistry};
use crate::foundation::variable::SharedVar;
use crate::spatial::{BroadPhase, BroadPhaseResult};

use super::body::{Body, ContactKind};
use super::body_type::BodyType;
use super::collision::{BodyDef, NarrowPhase};
use super::collision_layers::CollisionFilter;
use super::manifold::{CollisionManifold, RayCastManifold};
use super::rigidbody::{Rigidbody, RigidbodyStub};
use super::shape::{Shape, ShapeType};

/// Collision engine errors
#[derive(thiserror::Error, Debug)]
pub enum CollisionError {
    /// No narrow-phase factory or manifest for the shape type
    #[error("Unknown shape type \"{name}\" ({hash:#010x})")]
    UnknownShapeType {
        /// Type name, empty if only the hash is known
        name: &'static str,
        /// Type hash
        hash: u32,
    },

    /// Body type bits outside the known flags, or no bits at all
    #[error("Illegal body type {0:#x}")]
    IllegalBodyType(u32),

    /// A manifest for the shape type exists already
    #[error("Body manifest for shape type {hash:#010x} is already registered")]
    ManifestAlreadyRegistered {
        /// Type hash
        hash: u32,
    },

    /// An engine needs at least one broad phase
    #[error("At least one broad phase is required")]
    MissingBroadPhase,

    /// Broad-phase parameters are unusable
    #[error("Invalid broad phase: {0}")]
    InvalidBroadPhase(String),

    /// Configuration loading failed
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// A broad phase together with the filter gating it
pub(crate) struct BroadPhaseSlot {
    pub(crate) broad_phase: Box<dyn BroadPhase>,
    pub(crate) collision_filter: Option<CollisionFilter>,
}

impl BroadPhaseSlot {
    /// Whether a body or query carrying `collision_filter` uses this broad phase
    pub(crate) fn accepts(&self, collision_filter: Option<&CollisionFilter>) -> bool {
        CollisionFilter::test_optional(self.collision_filter.as_ref(), collision_filter)
    }
}

fn derive_body_def<N: NarrowPhase>(
    manifests: &HashMap<ShapeType, Rc<BodyDef<N::Shape>>>,
    narrow_phase: &N,
    shape_type: ShapeType,
    size: Vec3,
) -> Result<Rc<BodyDef<N::Shape>>, CollisionError> {
    match manifests.get(&shape_type) {
        Some(body_def) => Ok(Rc::clone(body_def)),
        None => narrow_phase.make_body_def(shape_type, size).map(Rc::new),
    }
}

/// Incremental collision resolution over pluggable broad and narrow phases
pub struct CollisionEngine<N: NarrowPhase> {
    broad_phases: Vec<BroadPhaseSlot>,
    narrow_phase: N,
    registry: RefRegistry<RigidbodyStub>,
    bodies: HashMap<RefId, Body<N::Shape>>,
    dirty: HashSet<RefId>,
    pending_removal: HashSet<RefId>,
    deferred_dispose: HashSet<RefId>,
    manifests: HashMap<ShapeType, Rc<BodyDef<N::Shape>>>,
    tick: u64,
}

impl<N: NarrowPhase> CollisionEngine<N> {
    /// Create an engine over broad phases, each gated by an optional filter
    pub fn new(
        broad_phases: Vec<(Box<dyn BroadPhase>, Option<CollisionFilter>)>,
        narrow_phase: N,
    ) -> Result<Self, CollisionError> {
        if broad_phases.is_empty() {
            return Err(CollisionError::MissingBroadPhase);
        }
        info!("Creating collision engine with {} broad phase(s)", broad_phases.len());

        Ok(Self {
            broad_phases: broad_phases
                .into_iter()
                .map(|(broad_phase, collision_filter)| BroadPhaseSlot {
                    broad_phase,
                    collision_filter,
                })
                .collect(),
            narrow_phase,
            registry: RefRegistry::new(),
            bodies: HashMap::new(),
            dirty: HashSet::new(),
            pending_removal: HashSet::new(),
            deferred_dispose: HashSet::new(),
            manifests: HashMap::new(),
            tick: 0,
        })
    }

    /// Build broad phases and body manifests from configuration
    pub fn from_config(config: &ColliderConfig, narrow_phase: N) -> Result<Self, CollisionError> {
        let broad_phases = config
            .broad_phases
            .iter()
            .map(|broad_phase| Ok((broad_phase.kind.build()?, broad_phase.collision_filter)))
            .collect::<Result<Vec<_>, CollisionError>>()?;

        let mut engine = Self::new(broad_phases, narrow_phase)?;
        for manifest in &config.manifests {
            let body_def = engine.narrow_phase.body_def_from_manifest(&manifest.shape);
            engine.set_body_manifest(ShapeType::from_id(manifest.shape_id), body_def)?;
        }
        Ok(engine)
    }

    /// Register a fixed body definition for `shape_type`
    ///
    /// Bodies created afterwards with this shape type use it instead of
    /// deriving one from their size.
    pub fn set_body_manifest(&mut self, shape_type: ShapeType, body_def: BodyDef<N::Shape>) -> Result<(), CollisionError> {
        if self.manifests.contains_key(&shape_type) {
            return Err(CollisionError::ManifestAlreadyRegistered { hash: shape_type.id() });
        }
        self.replace_body_manifest(shape_type, body_def);
        Ok(())
    }

    /// Register or override the body definition for `shape_type`
    pub fn replace_body_manifest(&mut self, shape_type: ShapeType, body_def: BodyDef<N::Shape>) {
        debug!("Registering body manifest for {shape_type:?}");
        self.manifests.insert(shape_type, Rc::new(body_def));
    }

    /// Create and index a body
    ///
    /// A [`ShapeType::NONE`] shape yields a detached handle that is never
    /// indexed. The body is indexed in every broad phase whose filter accepts
    /// `collision_filter`.
    pub fn create_body(
        &mut self,
        body_type: BodyType,
        shape: Shape,
        position: SharedVar<Vec3>,
        rotation: SharedVar<Quat>,
        collision_filter: Option<CollisionFilter>,
        discarded: Option<SharedVar<bool>>,
    ) -> Result<Rigidbody, CollisionError> {
        let body_type = BodyType::try_from_bits(body_type.bits())?;
        if shape.shape_type().is_none() {
            return Ok(Rigidbody::from_stub(Rc::new(RigidbodyStub::new(
                Ref::detached(),
                body_type,
                shape,
                position,
                rotation,
                collision_filter,
            ))));
        }

        let body_def = derive_body_def(&self.manifests, &self.narrow_phase, shape.shape_type(), shape.size().val())?;
        let registry = &mut self.registry;
        let stub = Rc::new_cyclic(|owner| {
            RigidbodyStub::new(
                registry.allocate(owner.clone(), discarded),
                body_type,
                shape,
                position,
                rotation,
                collision_filter,
            )
        });
        let rigidbody = Rigidbody::from_stub(stub);
        let id = rigidbody.id();

        let position = rigidbody.position().val();
        let aabb_size = body_def.aabb_size();
        for slot in self
            .broad_phases
            .iter_mut()
            .filter(|slot| slot.accepts(collision_filter.as_ref()))
        {
            slot.broad_phase.create(id, position, aabb_size);
        }

        debug!("Creating {rigidbody:?}");
        self.bodies.insert(id, Body::new(&rigidbody, body_def));
        Ok(rigidbody)
    }

    /// Advance one tick: poll, resolve contacts, retire discarded bodies
    pub fn update(&mut self) {
        self.tick += 1;

        // Reap planning
        self.dirty.clear();
        self.pending_removal = mem::take(&mut self.deferred_dispose);

        self.poll();

        // Sorted for reproducible notification order
        let mut dirty: Vec<RefId> = self.dirty.iter().copied().collect();
        dirty.sort_unstable();
        trace!(
            "Tick {}: {} dirty, {} pending removal",
            self.tick,
            dirty.len(),
            self.pending_removal.len()
        );

        let mut resolved = HashSet::with_capacity(dirty.len());
        for id in dirty {
            let Some(body) = self.bodies.get(&id) else {
                continue;
            };
            if body.is_discarded() || body.is_released() {
                debug!("Deferring disposal of Rigidbody({id})");
                self.deferred_dispose.insert(id);
                continue;
            }
            self.resolve(id);
            resolved.insert(id);
        }
        // Skipping the mirror for dirty peers relies on every dirty body
        // resolving (or being deferred) within the same tick
        debug_assert!(
            self.dirty
                .iter()
                .all(|id| resolved.contains(id) || self.deferred_dispose.contains(id)),
            "every dirty body must be resolved or deferred"
        );

        let mut removal: Vec<RefId> = mem::take(&mut self.pending_removal).into_iter().collect();
        removal.sort_unstable();
        for id in removal {
            self.reap(id);
        }
    }

    fn poll(&mut self) {
        let tick = self.tick;
        for (&id, body) in &mut self.bodies {
            if self.pending_removal.contains(&id) {
                continue;
            }
            if body.is_discarded() || body.is_released() {
                self.pending_removal.insert(id);
                continue;
            }

            let manifests = &self.manifests;
            let narrow_phase = &self.narrow_phase;
            let dirty = body.update(
                tick,
                |shape_type, size| derive_body_def(manifests, narrow_phase, shape_type, size),
                &mut self.broad_phases,
            );
            if dirty && !body.body_type.is_static() {
                self.dirty.insert(id);
            }
        }
    }

    fn search(&self, position: Vec3, aabb_size: Vec3, collision_filter: Option<&CollisionFilter>) -> BroadPhaseResult {
        let mut result = BroadPhaseResult::default();
        for slot in self.broad_phases.iter().filter(|slot| slot.accepts(collision_filter)) {
            result.merge(slot.broad_phase.search(position, aabb_size, collision_filter));
        }
        result
    }

    fn resolve(&mut self, id: RefId) {
        let Some(body) = self.bodies.get(&id) else {
            return;
        };
        let collision_filter = body.collision_filter;
        let subject = body.to_candidate();

        let mut candidates = self.search(subject.position, body.body_def.aabb_size(), collision_filter.as_ref());
        candidates.remove(id);
        for removing in &self.pending_removal {
            candidates.remove(*removing);
        }

        let mut dynamic_hits = Vec::new();
        let mut static_hits = Vec::new();
        for other_id in candidates
            .dynamic_candidates
            .iter()
            .chain(candidates.static_candidates.iter())
        {
            let Some(other) = self.bodies.get(other_id) else {
                trace!("Skipping vanished candidate Rigidbody({other_id})");
                continue;
            };
            if other.is_discarded() || other.is_released() {
                trace!("Skipping discarded candidate Rigidbody({other_id})");
                continue;
            }
            if !CollisionFilter::test_optional(collision_filter.as_ref(), other.collision_filter.as_ref()) {
                continue;
            }
            if let Some(manifold) = self.narrow_phase.collision_manifold(&subject, &other.to_candidate()) {
                match ContactKind::of(other.body_type) {
                    ContactKind::Dynamic => dynamic_hits.push((*other_id, manifold)),
                    ContactKind::Static => static_hits.push((*other_id, manifold)),
                }
            }
        }
        dynamic_hits.sort_unstable_by_key(|(other_id, _)| *other_id);
        static_hits.sort_unstable_by_key(|(other_id, _)| *other_id);

        self.diff_contacts(id, ContactKind::Dynamic, dynamic_hits);
        self.diff_contacts(id, ContactKind::Static, static_hits);
    }

    fn diff_contacts(&mut self, id: RefId, kind: ContactKind, hits: Vec<(RefId, CollisionManifold)>) {
        let Some(body) = self.bodies.get_mut(&id) else {
            return;
        };
        let previous = mem::take(body.contacts_mut(kind));
        let subject = body.handle();
        // Where the subject lives in its peers' contact sets
        let subject_kind = ContactKind::of(body.body_type);

        let mut next = HashSet::with_capacity(hits.len());
        for (other_id, manifold) in hits {
            let Some(other) = self.bodies.get_mut(&other_id) else {
                continue;
            };
            if !previous.contains(&other_id) {
                let other_handle = other.handle();
                subject.on_begin_contact(&other_handle, &manifold);
                if !self.dirty.contains(&other_id) && other.contacts_mut(subject_kind).insert(id) {
                    other_handle.on_begin_contact(&subject, &manifold.mirrored());
                }
            }
            next.insert(other_id);
        }

        for other_id in previous.difference(&next) {
            let Some(other) = self.bodies.get_mut(other_id) else {
                trace!("Contact Rigidbody({other_id}) of Rigidbody({id}) is gone");
                continue;
            };
            let other_handle = other.handle();
            subject.on_end_contact(&other_handle);
            if !self.dirty.contains(other_id) && other.contacts_mut(subject_kind).remove(&id) {
                other_handle.on_end_contact(&subject);
            }
        }

        if let Some(body) = self.bodies.get_mut(&id) {
            *body.contacts_mut(kind) = next;
        }
    }

    fn reap(&mut self, id: RefId) {
        let Some(body) = self.bodies.remove(&id) else {
            panic!("Removing Rigidbody({id}) which is not registered");
        };
        debug!("Removing Rigidbody({id})");
        let rigidbody = body.handle();

        for other_id in body.dynamic_contacts.iter().chain(body.static_contacts.iter()) {
            if let Some(other) = self.bodies.get(other_id) {
                rigidbody.on_end_contact(&other.handle());
            }
        }
        let kind = ContactKind::of(body.body_type);
        for other in self.bodies.values_mut() {
            if other.contacts_mut(kind).remove(&id) {
                other.handle().on_end_contact(&rigidbody);
            }
        }

        for slot in self
            .broad_phases
            .iter_mut()
            .filter(|slot| slot.accepts(body.collision_filter.as_ref()))
        {
            slot.broad_phase.remove(id);
        }
        self.registry.release(id);
    }

    /// Bodies crossed by the segment `from -> to`, nearest first
    ///
    /// Pure sensors and discarded bodies are never reported.
    pub fn ray_cast(&self, from: Vec3, to: Vec3, collision_filter: Option<&CollisionFilter>) -> Vec<RayCastManifold> {
        let ray = self.narrow_phase.to_ray(from, to);
        let mut candidates = BroadPhaseResult::default();
        for slot in self.broad_phases.iter().filter(|slot| slot.accepts(collision_filter)) {
            candidates.merge(slot.broad_phase.ray_cast(from, to, collision_filter));
        }

        let mut hits: Vec<RayCastManifold> = candidates
            .dynamic_candidates
            .iter()
            .chain(candidates.static_candidates.iter())
            .filter_map(|id| self.bodies.get(id))
            .filter(|body| {
                !body.is_discarded()
                    && !body.body_type.is_pure_sensor()
                    && CollisionFilter::test_optional(collision_filter, body.collision_filter.as_ref())
            })
            .filter_map(|body| {
                let rigidbody = body.rigidbody()?;
                self.narrow_phase
                    .ray_cast_manifold(&ray, &body.to_candidate())
                    .map(|hit| RayCastManifold {
                        distance: hit.distance,
                        normal: hit.normal,
                        rigidbody,
                    })
            })
            .collect();
        hits.sort_by(|a, b| {
            a.distance
                .total_cmp(&b.distance)
                .then_with(|| a.rigidbody.id().cmp(&b.rigidbody.id()))
        });
        hits
    }

    /// Look up a live body by id
    pub fn resolve_body(&self, id: RefId) -> Option<Rigidbody> {
        self.registry.resolve(id).map(Rigidbody::from_stub)
    }

    /// Ids currently touching `id`, dynamic and static
    pub fn contacts_of(&self, id: RefId) -> Option<HashSet<RefId>> {
        self.bodies.get(&id).map(|body| {
            body.contacts(ContactKind::Dynamic)
                .union(body.contacts(ContactKind::Static))
                .copied()
                .collect()
        })
    }

    /// Number of registered bodies
    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    /// Whether `id` is registered
    pub fn contains_body(&self, id: RefId) -> bool {
        self.bodies.contains_key(&id)
    }

    /// Number of completed updates
    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// The narrow phase
    pub fn narrow_phase(&self) -> &N {
        &self.narrow_phase
    }

    /// Number of broad phases
    pub fn broad_phase_count(&self) -> usize {
        self.broad_phases.len()
    }
}
