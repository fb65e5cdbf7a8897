//! ECS компоненты вокруг Competitor
//!
//! MotionSample / TerrainSample пишут внешние collaborator'ы (физика,
//! tile map). MotionLimits читает физика.

use bevy::prelude::*;

use crate::terrain::{MotionSampler, TerrainKind};

/// Текущая скорость и позиция на трассе
#[derive(Component, Debug, Clone, Copy, Default, PartialEq, Reflect)]
#[reflect(Component)]
pub struct MotionSample {
    pub speed: f32,
    pub position: Vec2,
}

impl MotionSample {
    pub fn new(speed: f32, position: Vec2) -> Self {
        Self { speed, position }
    }
}

impl MotionSampler for MotionSample {
    fn current_speed(&self) -> f32 {
        self.speed.max(0.0)
    }

    fn position(&self) -> Vec2 {
        self.position
    }
}

/// Покрытие под участником, если классификация уже сделана снаружи
///
/// Приоритетнее `TrackTerrain`.
#[derive(Component, Debug, Clone, Copy, Default, PartialEq, Reflect)]
#[reflect(Component)]
pub struct TerrainSample(pub Option<TerrainKind>);

/// Ограничения движения для физики (синхронизируются каждый тик)
#[derive(Component, Debug, Clone, Copy, PartialEq, Reflect)]
#[reflect(Component)]
pub struct MotionLimits {
    /// Множитель максимальной скорости (профиль locomotion × зона stamina)
    pub max_speed_factor: f32,
    pub accepts_input: bool,
    /// One-shot scale текущей скорости; физика забирает через take()
    pub pending_velocity_scale: Option<f32>,
}

impl Default for MotionLimits {
    fn default() -> Self {
        Self {
            max_speed_factor: 1.0,
            accepts_input: true,
            pending_velocity_scale: None,
        }
    }
}
