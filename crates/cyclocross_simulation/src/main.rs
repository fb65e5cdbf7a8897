//! Headless симуляция гонки
//!
//! Два участника на трассе асфальт → трава → песок → грязь.
//! Первый давит на педали, второй едет ровно. Печатает снимки раз в секунду.

use bevy::prelude::*;
use cyclocross_simulation::logger::{self, LogLevel};
use cyclocross_simulation::terrain::TerrainStrips;
use cyclocross_simulation::{
    create_headless_app, race_snapshot, CompetitorConfig, CompetitorNotification, EffortIntent,
    EffortKind, MotionLimits, MotionSample, RaceEvent, RaceSession, TerrainKind, TrackTerrain,
};

const TICKS: u32 = 60 * 20;

fn main() {
    let seed = 42;
    println!("Starting cyclocross headless simulation (seed: {})", seed);

    let mut app = create_headless_app(seed);
    logger::set_log_level(LogLevel::Info);

    app.insert_resource(TrackTerrain::new(
        TerrainStrips::new()
            .with_strip(0.0, TerrainKind::Asphalt)
            .with_strip(60.0, TerrainKind::Grass)
            .with_strip(140.0, TerrainKind::Sand)
            .with_strip(200.0, TerrainKind::Mud),
    ));

    let config = CompetitorConfig::default();
    let mut riders = Vec::new();
    for speed in [14.0_f32, 11.0] {
        let competitor = match app.world_mut().resource_mut::<RaceSession>().create_competitor(&config) {
            Ok(competitor) => competitor,
            Err(err) => {
                eprintln!("invalid competitor config: {}", err);
                return;
            }
        };
        let entity = app
            .world_mut()
            .spawn((competitor, MotionSample::new(speed, Vec2::ZERO), CruiseSpeed(speed)))
            .id();
        riders.push(entity);
    }

    app.add_systems(FixedPostUpdate, (advance_riders, report_crashes));

    let attacker = riders[0];
    for tick in 0..TICKS {
        app.world_mut().send_event(EffortIntent {
            entity: attacker,
            kind: EffortKind::Accelerate,
        });
        app.update();

        if tick % 60 == 0 {
            for snapshot in race_snapshot(app.world_mut()) {
                println!(
                    "t={:>5.2}s {:?}: stamina {:>5.1} ({:?}), stability {:>6.1} ({:?}), {:?}",
                    snapshot.elapsed.as_secs_f32(),
                    snapshot.id,
                    snapshot.stamina.current,
                    snapshot.stamina.zone,
                    snapshot.stability.current,
                    snapshot.stability.level,
                    snapshot.locomotion,
                );
            }
        }
    }

    println!("Simulation complete!");
}

/// Желаемая скорость райдера без ограничений
#[derive(Component)]
struct CruiseSpeed(f32);

/// Простейшая "физика": cruise × MotionLimits, позиция вдоль X
fn advance_riders(
    time: Res<Time<Fixed>>,
    mut riders: Query<(&mut MotionSample, &CruiseSpeed, Option<&mut MotionLimits>)>,
) {
    for (mut motion, cruise, limits) in riders.iter_mut() {
        let factor = match limits {
            Some(mut limits) => {
                if let Some(scale) = limits.pending_velocity_scale.take() {
                    motion.speed *= scale;
                }
                limits.max_speed_factor
            }
            None => 1.0,
        };
        // Разгон к cruise × factor
        let target = cruise.0 * factor;
        motion.speed += (target - motion.speed) * 0.1;
        let dx = motion.speed * time.delta_secs();
        motion.position.x += dx;
    }
}

fn report_crashes(mut notifications: EventReader<CompetitorNotification>) {
    for CompetitorNotification(notification) in notifications.read() {
        if let RaceEvent::LocomotionStateChanged { from, to, reason } = &notification.event {
            println!(
                "{:?}: {} -> {} ({})",
                notification.source,
                from.name(),
                to.name(),
                reason.as_deref().unwrap_or("-")
            );
        }
    }
}
