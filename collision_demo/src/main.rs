//! Approach demo
//!
//! Drives a ship past an asteroid and through a trigger zone, logging every
//! contact notification and a forward ray cast once per second.
//!
//! Usage: `approach_demo [collider.ron|collider.toml]`

use std::rc::Rc;

use collision_engine::foundation::logging;
use collision_engine::prelude::*;

// Simulation settings
const TICKS: u64 = 300;
const TICKS_PER_SECOND: u64 = 60;
const SHIP_SPEED: f32 = 0.17;
const SHIP_SIZE: f32 = 10.0;
const ASTEROID_SIZE: f32 = 20.0;
const SENSOR_SIZE: f32 = 12.0;
const RAY_LENGTH: f32 = 100.0;

/// Logs every notification a body receives
struct ContactLogger {
    name: &'static str,
}

impl CollisionCallback for ContactLogger {
    fn on_begin_contact(&self, other: &Rigidbody, manifold: &CollisionManifold) {
        log::info!(
            "{} touched {} at {:?} (normal {:?})",
            self.name,
            other.id(),
            manifold.contact_point,
            manifold.normal
        );
    }

    fn on_end_contact(&self, other: &Rigidbody) {
        log::info!("{} left {}", self.name, other.id());
    }
}

fn spawn(
    engine: &mut CollisionEngine<PrimitiveNarrowPhase>,
    name: &'static str,
    body_type: BodyType,
    size: f32,
    position: SharedVar<Vec3>,
) -> Result<Rigidbody, CollisionError> {
    let body = engine.create_body(
        body_type,
        Shape::new(ShapeType::BALL, Vec3::repeat(size)),
        position,
        constant(Quat::identity()),
        None,
        None,
    )?;
    body.set_collision_callback(Some(Rc::new(ContactLogger { name })));
    log::info!("Spawned {name} as {}", body.id());
    Ok(body)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init("info");

    let config = match std::env::args().nth(1) {
        Some(path) => {
            log::info!("Loading collider config from {path}");
            ColliderConfig::load_from_file(&path)?
        }
        None => ColliderConfig::default(),
    };
    let mut engine = CollisionEngine::from_config(&config, PrimitiveNarrowPhase::new())?;

    let ship_controller = Rc::new(KinematicController::new(Vec3::zeros(), Vec3::new(SHIP_SPEED, 0.0, 0.0)));
    let ship = spawn(&mut engine, "ship", BodyType::DYNAMIC, SHIP_SIZE, ship_controller.position())?;
    ship.set_controller(Some(ship_controller));
    // The engine retires bodies whose handles are all dropped
    let _asteroid = spawn(
        &mut engine,
        "asteroid",
        BodyType::STATIC,
        ASTEROID_SIZE,
        constant(Vec3::new(20.0, 0.0, 0.0)),
    )?;
    let _trigger = spawn(
        &mut engine,
        "trigger",
        BodyType::SENSOR,
        SENSOR_SIZE,
        constant(Vec3::new(45.0, 0.0, 0.0)),
    )?;

    for _ in 0..TICKS {
        engine.update();

        if engine.tick() % TICKS_PER_SECOND == 0 {
            let from = ship.position_val();
            let to = from + Vec3::new(RAY_LENGTH, 0.0, 0.0);
            let hits = engine.ray_cast(from, to, None);
            log::info!(
                "Tick {}: ship at x={:.2}, {} ray hit(s) ahead",
                engine.tick(),
                from.x,
                hits.len()
            );
            for hit in hits {
                log::info!("  {} at {:.1}% of the ray", hit.rigidbody.id(), hit.distance * 100.0);
            }
        }
    }

    log::info!("Done after {} ticks with {} bodies", engine.tick(), engine.body_count());
    Ok(())
}
