use drive_core::config::VehicleConfig;
use drive_core::control::HumanInput;
use drive_core::navigation::NavGoal;
use drive_core::sim::{SimError, Simulation};
use drive_core::time_scale::TimeScaleConfig;
use drive_core::vehicle::Driver;

use log::{error, info};
use nalgebra::Point3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::time::{interval, Duration, MissedTickBehavior};

const TICK_HZ: u64 = 50;
const MAX_TICKS: u64 = 60 * TICK_HZ;
const WANDER_EVERY: u64 = 4 * TICK_HZ;
const WANDER_RADIUS: f32 = 60.0;

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = run().await {
        error!("❌ {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), SimError> {
    info!("🚀 Starting drive simulation...");

    // Optional JSON config for the AI car; the player always uses the preset.
    let pursuer = match std::env::args().nth(1) {
        Some(path) => {
            info!("📄 Loading pursuer config from {path}");
            VehicleConfig::load(&path)?
        }
        None => VehicleConfig::pursuer(),
    };
    let player = VehicleConfig::player();

    let mut sim = Simulation::new(TimeScaleConfig {
        base_dt: 1.0 / TICK_HZ as f32,
        ..TimeScaleConfig::default()
    });
    let mut rng = StdRng::seed_from_u64(7);

    for _ in 0..12 {
        let x = rng.gen_range(-50.0..50.0);
        let z = rng.gen_range(-50.0..50.0);
        if x * x + z * z > 100.0 {
            sim.world_mut().add_obstacle([x, 1.0, z], [1.5, 1.0, 1.5]);
        }
    }

    let player_id = sim.spawn("player", &player, Driver::Human(HumanInput::with_deadzone(0.05)), [-5.0, 1.3, 0.0], 0.0)?;
    let ai_id = sim.spawn(
        "pursuer",
        &pursuer,
        Driver::autopilot_from(&pursuer, NavGoal::default()),
        [5.0, 1.3, -10.0],
        0.0,
    )?;

    let mut waypoint = Point3::new(0.0, 0.0, 40.0);
    let mut ticker = interval(Duration::from_millis(1000 / TICK_HZ));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = tokio::signal::ctrl_c() => {
                info!("🛑 Ctrl-C, stopping");
                break;
            }
        }

        let tick = sim.tick_count();
        if tick >= MAX_TICKS {
            break;
        }

        // Scripted player: full throttle, slow weave, brake tap every 10 s.
        let t = tick as f32 / TICK_HZ as f32;
        let braking = tick % (10 * TICK_HZ) > 9 * TICK_HZ;
        let throttle = if braking { 0.0 } else { 1.0 };
        sim.set_human_input(player_id, throttle, (t * 0.4).sin() * 0.6, braking)?;

        if tick % WANDER_EVERY == 0 {
            waypoint = Point3::new(
                rng.gen_range(-WANDER_RADIUS..WANDER_RADIUS),
                0.0,
                rng.gen_range(-WANDER_RADIUS..WANDER_RADIUS),
            );
            info!("🎯 Pursuer waypoint -> ({:.1}, {:.1})", waypoint.x, waypoint.z);
        }
        sim.set_target(ai_id, Some(waypoint))?;

        if tick == 20 * TICK_HZ {
            sim.time_scale_mut().activate_for(5.0);
        }

        sim.tick();

        if tick % TICK_HZ == 0 {
            match serde_json::to_string(&sim.snapshot()) {
                Ok(json) => info!("{json}"),
                Err(e) => error!("snapshot serialization failed: {e}"),
            }
        }
    }

    info!("✅ Simulation finished after {} ticks ({:.1} s simulated)", sim.tick_count(), sim.time());
    Ok(())
}
