//! Terrain domain — классификация покрытия и perturbation policy
//!
//! Содержит:
//! - TerrainKind (виды покрытия трассы)
//! - TerrainClassifier / MotionSampler (polled interfaces внешних collaborator'ов)
//! - PerturbationPolicy (terrain + speed → perturbation stability)

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

pub mod policy;


pub use policy::*;

/// Вид покрытия трассы
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Reflect)]
pub enum TerrainKind {
    Asphalt,
    Concrete,
    Grass,
    Dirt,
    Gravel,
    Sand,
    Mud,
}

impl TerrainKind {
    /// Множитель perturbation для нестабильных покрытий, None для стабильных
    pub fn instability_factor(self) -> Option<f32> {
        match self {
            TerrainKind::Mud => Some(1.5),
            TerrainKind::Sand => Some(1.2),
            TerrainKind::Gravel => Some(1.0),
            TerrainKind::Grass => Some(0.8),
            TerrainKind::Asphalt | TerrainKind::Concrete | TerrainKind::Dirt => None,
        }
    }

    /// Множитель расхода stamina на усилие (песок и грязь тяжелее асфальта)
    pub fn stamina_drain_multiplier(self) -> f32 {
        match self {
            TerrainKind::Concrete => 0.7,
            TerrainKind::Asphalt => 0.8,
            TerrainKind::Dirt => 0.9,
            TerrainKind::Gravel => 1.1,
            TerrainKind::Grass => 1.2,
            TerrainKind::Sand => 1.8,
            TerrainKind::Mud => 2.0,
        }
    }

    pub fn is_unstable(self) -> bool {
        self.instability_factor().is_some()
    }
}

/// Классификация покрытия по позиции (tile map вне core)
pub trait TerrainClassifier: Send + Sync {
    fn classify(&self, position: Vec2) -> Option<TerrainKind>;
}

/// Одно покрытие на всю трассу (тестовые сцены, headless прогоны)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UniformTerrain(pub Option<TerrainKind>);

impl TerrainClassifier for UniformTerrain {
    fn classify(&self, _position: Vec2) -> Option<TerrainKind> {
        self.0
    }
}

/// Полосы покрытия вдоль оси X: `[start_x, next_start_x)` → kind
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TerrainStrips {
    strips: Vec<(f32, TerrainKind)>,
}

impl TerrainStrips {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_strip(mut self, start_x: f32, kind: TerrainKind) -> Self {
        self.strips.push((start_x, kind));
        self.strips.sort_by(|a, b| a.0.total_cmp(&b.0));
        self
    }
}

impl TerrainClassifier for TerrainStrips {
    fn classify(&self, position: Vec2) -> Option<TerrainKind> {
        self.strips
            .iter()
            .take_while(|(start_x, _)| *start_x <= position.x)
            .last()
            .map(|(_, kind)| *kind)
    }
}

/// Текущая скорость и позиция участника (физика вне core)
pub trait MotionSampler {
    fn current_speed(&self) -> f32;
    fn position(&self) -> Vec2;
}
