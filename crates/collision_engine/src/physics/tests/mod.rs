//! Engine-level tests driving bodies through whole ticks

mod lifecycle;

use std::rc::Rc;

use crate::foundation::logging;
use crate::foundation::math::{splat, Quat, Vec3, AABB};
use crate::foundation::variable::{constant, SharedVar};
use crate::physics::{
    BodyType, CollisionEngine, CollisionFilter, CollisionLayers, ContactRecorder, KinematicController,
    PrimitiveNarrowPhase, Rigidbody, Shape, ShapeType,
};
use crate::spatial::{BroadPhase, GridBroadPhase, OctreeBroadPhase, OctreeConfig};

type Engine = CollisionEngine<PrimitiveNarrowPhase>;

const PLAYER: u32 = CollisionLayers::bit(0);
const ENEMY: u32 = CollisionLayers::bit(1);
const PROJECTILE: u32 = CollisionLayers::bit(2);
const ENVIRONMENT: u32 = CollisionLayers::bit(3);

fn grid_engine() -> Engine {
    logging::init_for_tests();
    let grid: Box<dyn BroadPhase> = Box::new(GridBroadPhase::new(3, splat(16.0)).expect("valid grid"));
    CollisionEngine::new(vec![(grid, None)], PrimitiveNarrowPhase::new()).expect("engine builds")
}

fn octree_engine() -> Engine {
    logging::init_for_tests();
    let octree: Box<dyn BroadPhase> = Box::new(OctreeBroadPhase::new(
        AABB::new(splat(-256.0), splat(256.0)),
        OctreeConfig::default(),
    ));
    CollisionEngine::new(vec![(octree, None)], PrimitiveNarrowPhase::new()).expect("engine builds")
}

/// A body with a recorder attached
struct Watched {
    body: Rigidbody,
    recorder: Rc<ContactRecorder>,
}

impl Watched {
    fn attach(body: Rigidbody) -> Self {
        let recorder = Rc::new(ContactRecorder::new());
        body.set_collision_callback(Some(recorder.clone()));
        Self { body, recorder }
    }

    fn counts(&self) -> (usize, usize) {
        (self.recorder.begin_count(), self.recorder.end_count())
    }
}

fn spawn(
    engine: &mut Engine,
    body_type: BodyType,
    shape_type: ShapeType,
    size: f32,
    position: SharedVar<Vec3>,
    collision_filter: Option<CollisionFilter>,
) -> Watched {
    let body = engine
        .create_body(
            body_type,
            Shape::new(shape_type, splat(size)),
            position,
            constant(Quat::identity()),
            collision_filter,
            None,
        )
        .expect("body is created");
    Watched::attach(body)
}

fn ball_at(engine: &mut Engine, body_type: BodyType, size: f32, x: f32) -> Watched {
    spawn(engine, body_type, ShapeType::BALL, size, constant(Vec3::new(x, 0.0, 0.0)), None)
}

fn moving_ball(engine: &mut Engine, body_type: BodyType, size: f32, x: f32, velocity: f32) -> Watched {
    let controller = Rc::new(KinematicController::new(Vec3::new(x, 0.0, 0.0), Vec3::new(velocity, 0.0, 0.0)));
    let watched = spawn(engine, body_type, ShapeType::BALL, size, controller.position(), None);
    watched.body.set_controller(Some(controller));
    watched
}

fn run(engine: &mut Engine, ticks: u64) {
    for _ in 0..ticks {
        engine.update();
    }
}
