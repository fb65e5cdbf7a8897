//! Competitor domain — участник гонки и его ECS обвязка
//!
//! Core (без движка):
//! - Competitor: stamina + stability + locomotion + perturbation policy + bridge
//!
//! ECS слой:
//! - RaceSession / TrackTerrain (resources)
//! - MotionSample / TerrainSample (входы от физики и tile map)
//! - MotionLimits (выход для физики)
//! - EffortIntent / SprintIntent / CompetitorNotification (events)

use bevy::prelude::*;

pub mod aggregate;
pub mod components;
pub mod events;
pub mod session;
pub mod systems;

// Tests (separate files with _tests suffix)
#[cfg(test)]
mod aggregate_tests;

pub use aggregate::*;
pub use components::*;
pub use events::*;
pub use session::*;
pub use systems::*;

/// Competitor Plugin
///
/// Регистрирует competitor системы в FixedUpdate (60Hz).
///
/// Порядок выполнения:
/// 1. apply_competitor_intents — EffortIntent / SprintIntent от command layer
/// 2. tick_competitors — Competitor::update (terrain → stability → stamina → fall → таймеры)
/// 3. forward_competitor_notifications — шина → CompetitorNotification
/// 4. sync_motion_limits — профиль locomotion → MotionLimits для физики
pub struct CompetitorPlugin;

impl Plugin for CompetitorPlugin {
    fn build(&self, app: &mut App) {
        // RaceSession с конкретным seed вставляет SimulationPlugin / create_headless_app
        app.init_resource::<RaceSession>();

        app.add_event::<EffortIntent>()
            .add_event::<SprintIntent>()
            .add_event::<CompetitorNotification>();

        app.add_systems(
            FixedUpdate,
            (
                apply_competitor_intents,
                tick_competitors,
                forward_competitor_notifications,
                sync_motion_limits,
            )
                .chain(),
        );
    }
}
