//! Cyclocross Simulation Core
//!
//! Физическое состояние участника гонки на Bevy 0.16 (fixed-step, headless):
//! - body: stamina (усилие) и stability (равновесие)
//! - locomotion: RIDING / CARRYING / REMOUNTING / CRASHED с таймерами
//! - terrain: покрытие трассы → perturbation равновесия
//! - notifications: синхронная шина событий race session
//! - competitor: агрегат участника + ECS plugin
//!
//! Физика, рендер и tile map — снаружи (MotionSample / TrackTerrain на входе,
//! MotionLimits и CompetitorNotification на выходе).

use std::time::Duration;

use bevy::prelude::*;
use bevy::time::TimeUpdateStrategy;

// Публичные модули
pub mod body;
pub mod competitor;
pub mod config;
pub mod locomotion;
pub mod logger;
pub mod notifications;
pub mod terrain;

// Re-export основных типов для удобства
pub use body::{
    EffortKind, Perturbation, PerturbationKind, StabilityConfig, StabilityLevel, StabilityResource,
    StaminaConfig, StaminaResource, StaminaZone,
};
pub use competitor::{
    Competitor, CompetitorNotification, CompetitorPlugin, CompetitorSnapshot, EffortIntent,
    MotionLimits, MotionSample, RaceSession, SprintIntent, TerrainSample, TrackTerrain,
};
pub use config::{CompetitorConfig, ConfigError};
pub use locomotion::{LocomotionConfig, LocomotionHandle, LocomotionState, LocomotionStateMachine};
pub use logger::init_logger;
pub use notifications::{
    CompetitorId, EventKind, ListenerError, Notification, NotificationBus, NotificationOutbox,
    RaceEvent,
};
pub use terrain::{PerturbationPolicyConfig, TerrainClassifier, TerrainKind};

/// Частота simulation tick
pub const SIMULATION_HZ: f64 = 60.0;

/// Главный plugin симуляции (объединяет все подсистемы)
pub struct SimulationPlugin {
    /// Seed race session (направления случайных perturbation)
    pub seed: u64,
}

impl Default for SimulationPlugin {
    fn default() -> Self {
        Self { seed: 42 }
    }
}

impl Plugin for SimulationPlugin {
    fn build(&self, app: &mut App) {
        app
            // Fixed timestep 60Hz для simulation tick
            .insert_resource(Time::<Fixed>::from_hz(SIMULATION_HZ))
            // Одна шина + seed на гонку
            .insert_resource(RaceSession::new(self.seed))
            .add_plugins(CompetitorPlugin);
    }
}

/// Создаёт minimal Bevy App для headless симуляции
///
/// Время шагает вручную ровно на один fixed tick за `app.update()`:
/// прогоны с одинаковым seed совпадают независимо от wall clock.
pub fn create_headless_app(seed: u64) -> App {
    let mut app = App::new();
    init_logger();
    app.add_plugins(MinimalPlugins)
        .insert_resource(TimeUpdateStrategy::ManualDuration(Duration::from_secs_f64(
            1.0 / SIMULATION_HZ,
        )))
        .add_plugins(SimulationPlugin { seed });

    app
}

/// Снимки всех участников мира, отсортированные по id
pub fn race_snapshot(world: &mut World) -> Vec<CompetitorSnapshot> {
    let mut query = world.query::<&Competitor>();
    let mut snapshots: Vec<_> = query.iter(world).map(Competitor::snapshot).collect();
    snapshots.sort_by_key(|snapshot| snapshot.id);
    snapshots
}
