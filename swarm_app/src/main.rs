//! Swarm demo application
//!
//! Exercises the lifecycle engine end to end: a mover system integrates
//! drone positions every frame, a beacon system fades its markers out and
//! despawns the dead ones, and a deferred task spawns status logs over the
//! first few frames.

use entity_engine::prelude::*;
use nalgebra::Vector3;

/// Fixed simulation step in seconds.
const FRAME_DT: f32 = 1.0 / 60.0;

/// Frames driven before the demo reports and exits.
const FRAME_LIMIT: u32 = 240;

/// A drone moving with constant velocity.
struct Drone {
    position: Vector3<f32>,
    velocity: Vector3<f32>,
}

impl Drone {
    fn new(position: Vector3<f32>, velocity: Vector3<f32>) -> Self {
        Self { position, velocity }
    }
}

impl Component for Drone {
    type System = DroneSystem;
}

/// Integrates drone positions once per frame.
struct DroneSystem {
    dt: f32,
    integrations: u64,
}

impl DroneSystem {
    fn new(dt: f32) -> Self {
        Self {
            dt,
            integrations: 0,
        }
    }
}

impl System for DroneSystem {
    type Component = Drone;

    fn on_initialized(&mut self) -> EngineResult<()> {
        log::info!("drone system online");
        Ok(())
    }

    fn on_update(&mut self, entities: &mut EntityList<Drone>) -> EngineResult<()> {
        for (_, drone) in entities.iter_mut() {
            drone.position += drone.velocity * self.dt;
            self.integrations += 1;
        }
        Ok(())
    }

    fn on_entity_will_destroy(
        &mut self,
        entities: &mut EntityList<Drone>,
        entity: EntityId,
    ) -> EngineResult<()> {
        if let Some(drone) = entities.get(entity) {
            log::debug!("drone lost at {:?}", drone.position);
        }
        Ok(())
    }
}

/// A fading beacon; despawns once fully faded.
struct Beacon {
    intensity: f32,
    decay: f32,
}

impl Component for Beacon {
    type System = BeaconSystem;
}

/// Fades beacons out and retires the dead ones mid-update.
#[derive(Default)]
struct BeaconSystem {
    retired: u32,
}

impl System for BeaconSystem {
    type Component = Beacon;

    fn on_update(&mut self, entities: &mut EntityList<Beacon>) -> EngineResult<()> {
        let faded: Vec<EntityId> = entities
            .find_all(|beacon| beacon.intensity <= 0.0)
            .into_iter()
            .map(|(id, _)| id)
            .collect();
        for id in faded {
            entities.despawn(id);
            self.retired += 1;
        }
        for (_, beacon) in entities.iter_mut() {
            beacon.intensity -= beacon.decay;
        }
        Ok(())
    }
}

fn populate(controller: &mut Controller) -> EngineResult<()> {
    for lane in 0..8 {
        let offset = lane as f32;
        controller.spawn(Drone::new(
            Vector3::new(offset, 0.0, 0.0),
            Vector3::new(0.0, 1.0 + offset * 0.25, 0.0),
        ))?;
    }
    for _ in 0..4 {
        controller.spawn(Beacon {
            intensity: 1.0,
            decay: 0.02,
        })?;
    }
    Ok(())
}

fn main() -> EngineResult<()> {
    entity_engine::foundation::logging::init();
    log::info!("starting swarm demo");

    let config = ControllerConfig::new().with_max_entities(256);
    let mut controller = Controller::with_config(config);
    controller.register(DroneSystem::new(FRAME_DT))?;
    controller.register(BeaconSystem::default())?;
    populate(&mut controller)?;

    // A short-lived deferred task, stepped once per frame by the controller.
    let mut heartbeats = 3u32;
    controller.start_task(Box::new(move || {
        log::info!("heartbeat ({heartbeats} left)");
        heartbeats -= 1;
        if heartbeats == 0 {
            TaskStatus::Finished
        } else {
            TaskStatus::Running
        }
    }));

    let mut timer = Timer::new();
    for _ in 0..FRAME_LIMIT {
        controller.tick()?;
        timer.update();
    }

    let stats = controller.stats();
    log::info!(
        "done: {} ticks, {} entities live, avg tick {}us, {:.0} fps",
        stats.tick_count,
        stats.entity_count,
        stats.average_tick_us(),
        timer.average_fps(),
    );
    log::info!(
        "integrations: {}, beacons retired: {}",
        controller.resolve::<DroneSystem>()?.integrations,
        controller.resolve::<BeaconSystem>()?.retired
    );
    Ok(())
}
