use std::cell::Cell;
use std::collections::HashSet;
use std::rc::Rc;

use super::*;
use crate::config::{BodyManifest, ColliderConfig, ShapeManifest};
use crate::foundation::variable::Settable;
use crate::physics::{BodyDef, CollisionCallback, CollisionError, CollisionManifold, CollisionShape};

/// Discards every body it starts touching
#[derive(Default)]
struct DiscardOnBegin {
    begins: Cell<usize>,
    ends: Cell<usize>,
}

impl CollisionCallback for DiscardOnBegin {
    fn on_begin_contact(&self, other: &Rigidbody, _manifold: &CollisionManifold) {
        self.begins.set(self.begins.get() + 1);
        other.discard();
    }

    fn on_end_contact(&self, _other: &Rigidbody) {
        self.ends.set(self.ends.get() + 1);
    }
}

#[test]
fn test_discard_before_first_update() {
    let mut engine = grid_engine();
    let neighbour = ball_at(&mut engine, BodyType::DYNAMIC, 4.0, 1.0);
    let doomed = ball_at(&mut engine, BodyType::DYNAMIC, 4.0, 0.0);
    let id = doomed.body.id();
    assert!(engine.resolve_body(id).is_some_and(|body| body.ptr_eq(&doomed.body)));

    doomed.body.discard();
    engine.update();

    assert_eq!(doomed.counts(), (0, 0));
    assert_eq!(neighbour.counts(), (0, 0));
    assert!(!engine.contains_body(id));
    assert!(engine.resolve_body(id).is_none());
    assert_eq!(engine.body_count(), 1);
}

#[test]
fn test_discard_ends_contact_exactly_once() {
    let mut engine = grid_engine();
    let doomed = ball_at(&mut engine, BodyType::DYNAMIC, 4.0, 0.0);
    let wall = ball_at(&mut engine, BodyType::STATIC, 4.0, 3.0);

    engine.update();
    assert_eq!(doomed.counts(), (1, 0));
    assert_eq!(wall.counts(), (1, 0));

    doomed.body.discard();
    run(&mut engine, 3);
    assert_eq!(doomed.counts(), (1, 1));
    assert_eq!(wall.counts(), (1, 1));
    assert_eq!(engine.contacts_of(wall.body.id()), Some(HashSet::new()));
    assert_eq!(engine.contacts_of(doomed.body.id()), None);

    let hits = engine.ray_cast(Vec3::new(-10.0, 0.0, 0.0), Vec3::new(10.0, 0.0, 0.0), None);
    assert_eq!(hits.len(), 1);
    assert!(hits[0].rigidbody.ptr_eq(&wall.body));
}

#[test]
fn test_simultaneous_discard() {
    let mut engine = grid_engine();
    let a = ball_at(&mut engine, BodyType::DYNAMIC, 4.0, 0.0);
    let b = ball_at(&mut engine, BodyType::DYNAMIC, 4.0, 2.0);

    engine.update();
    assert_eq!(a.counts(), (1, 0));
    assert_eq!(b.counts(), (1, 0));

    a.body.discard();
    b.body.discard();
    engine.update();
    assert_eq!(a.counts(), (1, 1));
    assert_eq!(b.counts(), (1, 1));
    assert_eq!(engine.body_count(), 0);
}

#[test]
fn test_dropped_handle_retires_body() {
    let mut engine = grid_engine();
    let keeper = ball_at(&mut engine, BodyType::DYNAMIC, 4.0, 0.0);
    let abandoned = ball_at(&mut engine, BodyType::DYNAMIC, 4.0, 2.0);
    let id = abandoned.body.id();

    engine.update();
    assert_eq!(keeper.counts(), (1, 0));

    drop(abandoned);
    run(&mut engine, 3);
    assert!(!engine.contains_body(id));
    assert!(engine.resolve_body(id).is_none());
    assert_eq!(engine.body_count(), 1);
    assert_eq!(keeper.counts(), (1, 1));
    assert_eq!(keeper.recorder.exited(), vec![id]);
    assert_eq!(engine.contacts_of(keeper.body.id()), Some(HashSet::new()));
}

#[test]
fn test_dropped_static_ends_mirrored_contact() {
    let mut engine = grid_engine();
    let mover = ball_at(&mut engine, BodyType::DYNAMIC, 4.0, 0.0);
    let wall = ball_at(&mut engine, BodyType::STATIC, 4.0, 3.0);
    let wall_id = wall.body.id();

    engine.update();
    assert_eq!(mover.counts(), (1, 0));

    drop(wall);
    engine.update();
    assert!(!engine.contains_body(wall_id));
    assert_eq!(mover.counts(), (1, 1));
    let hits = engine.ray_cast(Vec3::new(-10.0, 0.0, 0.0), Vec3::new(10.0, 0.0, 0.0), None);
    assert_eq!(hits.len(), 1);
    assert!(hits[0].rigidbody.ptr_eq(&mover.body));
}

#[test]
fn test_discard_by_source() {
    let mut engine = grid_engine();
    let flag = Rc::new(Settable::new(false));
    let body = engine
        .create_body(
            BodyType::DYNAMIC,
            Shape::new(ShapeType::BALL, splat(4.0)),
            constant(Vec3::zeros()),
            constant(Quat::identity()),
            None,
            Some(flag.clone()),
        )
        .expect("body is created");

    engine.update();
    assert!(engine.contains_body(body.id()));

    flag.set(true);
    assert!(body.is_discarded());
    engine.update();
    assert!(!engine.contains_body(body.id()));
}

#[test]
fn test_discard_during_resolution_is_deferred() {
    let mut engine = grid_engine();
    let hunter = ball_at(&mut engine, BodyType::DYNAMIC, 4.0, 0.0);
    let prey = ball_at(&mut engine, BodyType::DYNAMIC, 4.0, 2.0);
    let discarder = Rc::new(DiscardOnBegin::default());
    hunter.body.set_collision_callback(Some(discarder.clone()));

    // The hunter resolves first and discards the prey before its turn
    engine.update();
    assert_eq!(discarder.begins.get(), 1);
    assert_eq!(prey.counts(), (0, 0));
    assert!(engine.contains_body(prey.body.id()));

    engine.update();
    assert!(!engine.contains_body(prey.body.id()));
    assert_eq!(discarder.ends.get(), 1);
    assert_eq!(prey.counts(), (0, 0));
    assert_eq!(engine.contacts_of(hunter.body.id()), Some(HashSet::new()));
}

#[test]
fn test_create_body_rejects_unknown_shape() {
    let mut engine = grid_engine();
    let result = engine.create_body(
        BodyType::DYNAMIC,
        Shape::new(ShapeType::named("capsule"), splat(1.0)),
        constant(Vec3::zeros()),
        constant(Quat::identity()),
        None,
        None,
    );
    assert!(matches!(
        result,
        Err(CollisionError::UnknownShapeType { name: "capsule", .. })
    ));
    assert_eq!(engine.body_count(), 0);
}

#[test]
fn test_create_body_rejects_illegal_body_type() {
    let mut engine = grid_engine();
    for bits in [0, 8] {
        let result = engine.create_body(
            BodyType::from_bits_retain(bits),
            Shape::new(ShapeType::BALL, splat(1.0)),
            constant(Vec3::zeros()),
            constant(Quat::identity()),
            None,
            None,
        );
        assert!(matches!(result, Err(CollisionError::IllegalBodyType(rejected)) if rejected == bits));
    }
}

#[test]
fn test_none_shape_yields_detached_body() {
    let mut engine = grid_engine();
    let body = engine
        .create_body(
            BodyType::DYNAMIC,
            Shape::none(),
            constant(Vec3::zeros()),
            constant(Quat::identity()),
            None,
            None,
        )
        .expect("placeholder is created");

    assert!(body.is_detached());
    assert!(body.id().is_none());
    assert_eq!(engine.body_count(), 0);
    engine.update();
    assert_eq!(engine.body_count(), 0);
}

#[test]
fn test_engine_requires_broad_phase() {
    assert!(matches!(
        CollisionEngine::new(Vec::new(), PrimitiveNarrowPhase::new()),
        Err(CollisionError::MissingBroadPhase)
    ));
}

#[test]
fn test_body_manifest_overrides_size() {
    let mut engine = grid_engine();
    engine
        .set_body_manifest(ShapeType::BALL, BodyDef::new(CollisionShape::Ball(3.0), 3.0))
        .expect("first manifest");
    assert!(matches!(
        engine.set_body_manifest(ShapeType::BALL, BodyDef::new(CollisionShape::Ball(1.0), 1.0)),
        Err(CollisionError::ManifestAlreadyRegistered { hash }) if hash == ShapeType::BALL.id()
    ));

    // Nominal radius 0.5, but the manifest makes them radius 3
    let a = ball_at(&mut engine, BodyType::DYNAMIC, 1.0, 0.0);
    let b = ball_at(&mut engine, BodyType::DYNAMIC, 1.0, 5.0);
    engine.update();
    assert_eq!(a.counts(), (1, 0));
    assert_eq!(b.counts(), (1, 0));
}

#[test]
fn test_from_config() {
    logging::init_for_tests();
    let mut config = ColliderConfig::default();
    config.manifests.push(BodyManifest {
        shape_id: ShapeType::BOX.id(),
        shape: ShapeManifest::Box {
            half_extents: [1.0, 1.0, 1.0],
        },
    });
    let mut engine = CollisionEngine::from_config(&config, PrimitiveNarrowPhase::new()).expect("engine builds");
    assert_eq!(engine.broad_phase_count(), 1);

    // The manifest shrinks this box to a cube of side 2
    let crate_box = spawn(&mut engine, BodyType::STATIC, ShapeType::BOX, 100.0, constant(Vec3::zeros()), None);
    let ball = ball_at(&mut engine, BodyType::DYNAMIC, 2.0, 10.0);
    engine.update();
    assert_eq!(ball.counts(), (0, 0));
    assert_eq!(crate_box.counts(), (0, 0));

    let duplicate = config.manifests[0].clone();
    config.manifests.push(duplicate);
    assert!(matches!(
        CollisionEngine::from_config(&config, PrimitiveNarrowPhase::new()),
        Err(CollisionError::ManifestAlreadyRegistered { .. })
    ));
}

#[test]
fn test_from_config_rejects_invalid_broad_phase() {
    let mut config = ColliderConfig::default();
    config.broad_phases[0].kind = crate::config::BroadPhaseKind::Grid {
        dimension: 4,
        cell: [1.0, 1.0, 1.0],
    };
    assert!(matches!(
        CollisionEngine::from_config(&config, PrimitiveNarrowPhase::new()),
        Err(CollisionError::InvalidBroadPhase(_))
    ));
}
