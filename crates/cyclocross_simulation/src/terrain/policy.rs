//! Perturbation Policy — terrain + скорость → perturbation равновесия
//!
//! Throttled: sampling раз в N тиков. No-op если участник почти стоит
//! или покрытие стабильное. Уставший участник (stamina ниже low_stamina_ratio)
//! раскачивается сильнее.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::TerrainKind;
use crate::body::{Perturbation, PerturbationKind, StabilityResource};
use crate::config::ConfigError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PerturbationPolicyConfig {
    /// Sampling раз в N тиков (N ≥ 1)
    pub sample_interval_ticks: u32,
    /// Ниже этой скорости участник считается стоящим
    pub moving_speed_threshold: f32,
    /// Magnitude до умножения на terrain factor
    pub base_magnitude: f32,
    /// Доля stamina, ниже которой растёт magnitude
    pub low_stamina_ratio: f32,
    /// Множитель magnitude при нулевой stamina
    pub low_stamina_multiplier: f32,
}

impl Default for PerturbationPolicyConfig {
    fn default() -> Self {
        Self {
            sample_interval_ticks: 5,
            moving_speed_threshold: 10.0,
            base_magnitude: 20.0,
            low_stamina_ratio: 0.3,
            low_stamina_multiplier: 1.8,
        }
    }
}

impl PerturbationPolicyConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sample_interval_ticks == 0 {
            return Err(ConfigError::ZeroCapacity {
                field: "perturbation.sample_interval_ticks",
            });
        }
        if !(self.moving_speed_threshold >= 0.0) {
            return Err(ConfigError::Negative {
                field: "perturbation.moving_speed_threshold",
                value: self.moving_speed_threshold,
            });
        }
        if !(self.base_magnitude >= 0.0) {
            return Err(ConfigError::Negative {
                field: "perturbation.base_magnitude",
                value: self.base_magnitude,
            });
        }
        if !(0.0..=1.0).contains(&self.low_stamina_ratio) {
            return Err(ConfigError::OutOfRange {
                field: "perturbation.low_stamina_ratio",
                value: self.low_stamina_ratio,
                min: 0.0,
                max: 1.0,
            });
        }
        if !(self.low_stamina_multiplier >= 1.0) {
            return Err(ConfigError::OutOfRange {
                field: "perturbation.low_stamina_multiplier",
                value: self.low_stamina_multiplier,
                min: 1.0,
                max: f32::MAX,
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct PerturbationPolicy {
    config: PerturbationPolicyConfig,
    ticks_since_sample: u32,
}

impl PerturbationPolicy {
    pub fn new(config: &PerturbationPolicyConfig) -> Self {
        Self {
            config: config.clone(),
            ticks_since_sample: 0,
        }
    }

    pub fn config(&self) -> &PerturbationPolicyConfig {
        &self.config
    }

    /// Magnitude для покрытия, None если покрытие не раскачивает
    pub fn magnitude_for(&self, terrain: TerrainKind) -> Option<f32> {
        terrain
            .instability_factor()
            .map(|factor| self.config.base_magnitude * factor)
    }

    /// Усиление perturbation от усталости: 1.0 при stamina ≥ low_stamina_ratio,
    /// линейно до low_stamina_multiplier при нулевой stamina
    pub fn stamina_factor(&self, stamina_ratio: f32) -> f32 {
        let threshold = self.config.low_stamina_ratio;
        if threshold <= 0.0 || !(stamina_ratio < threshold) {
            return 1.0;
        }
        let deficit = ((threshold - stamina_ratio) / threshold).clamp(0.0, 1.0);
        1.0 + deficit * (self.config.low_stamina_multiplier - 1.0)
    }

    /// Один тик симуляции. true если perturbation была принята stability.
    pub fn tick(
        &mut self,
        stability: &mut StabilityResource,
        terrain: Option<TerrainKind>,
        speed: f32,
        stamina_ratio: f32,
        now: Duration,
    ) -> bool {
        self.ticks_since_sample += 1;
        if self.ticks_since_sample < self.config.sample_interval_ticks.max(1) {
            return false;
        }
        self.ticks_since_sample = 0;

        if !(speed >= self.config.moving_speed_threshold) {
            return false;
        }

        let Some(magnitude) = terrain.and_then(|kind| self.magnitude_for(kind)) else {
            return false;
        };

        stability.apply_perturbation(Perturbation::new(
            PerturbationKind::DifficultTerrain,
            magnitude * self.stamina_factor(stamina_ratio),
            0,
            now,
        ))
    }
}
