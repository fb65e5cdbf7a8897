//! Конфигурация участника + ошибки валидации
//!
//! Все секции `#[serde(default)]`: частичный JSON/RON дополняется
//! каноническими константами.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::body::{StabilityConfig, StaminaConfig};
use crate::locomotion::LocomotionConfig;
use crate::terrain::PerturbationPolicyConfig;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("{field} must be positive, got {value}")]
    NonPositive { field: &'static str, value: f32 },

    #[error("{field} must be non-negative, got {value}")]
    Negative { field: &'static str, value: f32 },

    #[error("{field} = {value} is outside {min}..={max}")]
    OutOfRange {
        field: &'static str,
        value: f32,
        min: f32,
        max: f32,
    },

    #[error("{field} must be at least 1")]
    ZeroCapacity { field: &'static str },
}

/// Полный набор параметров одного участника
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompetitorConfig {
    pub stamina: StaminaConfig,
    pub stability: StabilityConfig,
    pub locomotion: LocomotionConfig,
    pub perturbation: PerturbationPolicyConfig,
}

impl CompetitorConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.stamina.validate()?;
        self.stability.validate()?;
        self.locomotion.validate()?;
        self.perturbation.validate()?;
        Ok(())
    }
}
