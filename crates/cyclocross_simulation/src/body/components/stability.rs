//! Stability — двунаправленный gauge равновесия (-100..+100)
//!
//! - 0 = идеальное равновесие, знак = сторона крена
//! - Пассивно возвращается к 0 (recovery замедляется на высоких уровнях)
//! - Perturbation: дискретный толчок с cooldown
//! - Falling: |current| ≥ fall threshold, сбрасывается только через reset()

use std::time::Duration;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::config::ConfigError;
use crate::logger;
use crate::notifications::{CompetitorId, Notification, NotificationBus, RaceEvent};

pub const STABILITY_MIN: f32 = -100.0;
pub const STABILITY_MAX: f32 = 100.0;

/// Ниже этого |current| значение прижимается к 0
pub const CENTER_SNAP_EPSILON: f32 = 0.1;

/// Уровень нестабильности по |current|
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum StabilityLevel {
    Balanced,
    SlightlyUnbalanced,
    VeryUnbalanced,
    Critical,
}

impl StabilityLevel {
    pub fn from_value(value: f32) -> Self {
        let magnitude = value.abs();
        if magnitude < 20.0 {
            StabilityLevel::Balanced
        } else if magnitude < 50.0 {
            StabilityLevel::SlightlyUnbalanced
        } else if magnitude < 80.0 {
            StabilityLevel::VeryUnbalanced
        } else {
            StabilityLevel::Critical
        }
    }

    /// Чем хуже равновесие, тем медленнее самокоррекция
    pub fn recovery_multiplier(self) -> f32 {
        match self {
            StabilityLevel::Balanced => 1.0,
            StabilityLevel::SlightlyUnbalanced => 0.9,
            StabilityLevel::VeryUnbalanced => 0.7,
            StabilityLevel::Critical => 0.5,
        }
    }
}

/// Источник возмущения
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PerturbationKind {
    DifficultTerrain,
    /// Контакт с соперником / препятствием (от внешнего collision слоя)
    Collision,
}

/// Дискретный толчок равновесия (применяется один раз)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Perturbation {
    pub kind: PerturbationKind,
    pub magnitude: f32,
    /// -1 / +1, 0 = случайная сторона
    pub direction: i8,
    /// Время гонки на момент sampling'а
    pub timestamp: Duration,
}

impl Perturbation {
    pub fn new(kind: PerturbationKind, magnitude: f32, direction: i8, timestamp: Duration) -> Self {
        Self {
            kind,
            magnitude,
            direction,
            timestamp,
        }
    }
}

/// Параметры равновесия
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StabilityConfig {
    /// Возврат к центру (units/sec) на уровне Balanced
    pub recovery_rate: f32,
    /// Минимальный интервал между принятыми perturbation (сек)
    pub perturbation_cooldown_secs: f32,
    /// |current| от которого начинается падение
    pub fall_threshold: f32,
}

impl Default for StabilityConfig {
    fn default() -> Self {
        Self {
            recovery_rate: 20.0,
            perturbation_cooldown_secs: 0.5,
            fall_threshold: 95.0,
        }
    }
}

impl StabilityConfig {
    pub fn cooldown(&self) -> Duration {
        Duration::try_from_secs_f32(self.perturbation_cooldown_secs.max(0.0)).unwrap_or(Duration::MAX)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.recovery_rate >= 0.0) {
            return Err(ConfigError::Negative {
                field: "stability.recovery_rate",
                value: self.recovery_rate,
            });
        }
        if !(self.perturbation_cooldown_secs >= 0.0) {
            return Err(ConfigError::Negative {
                field: "stability.perturbation_cooldown_secs",
                value: self.perturbation_cooldown_secs,
            });
        }
        if !(self.fall_threshold > 0.0 && self.fall_threshold <= STABILITY_MAX) {
            return Err(ConfigError::OutOfRange {
                field: "stability.fall_threshold",
                value: self.fall_threshold,
                min: 0.0,
                max: STABILITY_MAX,
            });
        }
        Ok(())
    }
}

/// Read-only снимок для UI / диагностики
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StabilitySnapshot {
    pub current: f32,
    pub direction: i8,
    pub level: StabilityLevel,
    pub is_falling: bool,
}

fn sign(value: f32) -> i8 {
    if value > 0.0 {
        1
    } else if value < 0.0 {
        -1
    } else {
        0
    }
}

/// Равновесие участника
///
/// Инварианты:
/// - -100 ≤ current ≤ 100
/// - direction == sign(current)
/// - is_falling очищается только reset()
pub struct StabilityResource {
    current: f32,
    direction: i8,
    is_falling: bool,
    level: StabilityLevel,
    recovery_rate: f32,
    cooldown: Duration,
    fall_threshold: f32,
    last_accepted: Option<Duration>,
    /// Seeded RNG для direction = 0 (детерминизм replay)
    rng: ChaCha8Rng,
    source: CompetitorId,
    bus: NotificationBus,
}

impl StabilityResource {
    pub fn new(config: &StabilityConfig, seed: u64, source: CompetitorId, bus: NotificationBus) -> Self {
        Self {
            current: 0.0,
            direction: 0,
            is_falling: false,
            level: StabilityLevel::Balanced,
            recovery_rate: config.recovery_rate.max(0.0),
            cooldown: config.cooldown(),
            fall_threshold: config.fall_threshold,
            last_accepted: None,
            rng: ChaCha8Rng::seed_from_u64(seed),
            source,
            bus,
        }
    }

    pub fn current(&self) -> f32 {
        self.current
    }

    pub fn direction(&self) -> i8 {
        self.direction
    }

    /// |current| в процентах от предела (0..=100)
    pub fn percentage(&self) -> f32 {
        self.current.abs() / STABILITY_MAX * 100.0
    }

    pub fn level(&self) -> StabilityLevel {
        StabilityLevel::from_value(self.current)
    }

    pub fn is_falling(&self) -> bool {
        self.is_falling
    }

    pub fn fall_threshold(&self) -> f32 {
        self.fall_threshold
    }

    pub fn last_accepted(&self) -> Option<Duration> {
        self.last_accepted
    }

    /// false (без изменений) если cooldown с последнего принятого толчка не истёк
    pub fn apply_perturbation(&mut self, perturbation: Perturbation) -> bool {
        if let Some(last) = self.last_accepted {
            if perturbation.timestamp.saturating_sub(last) < self.cooldown {
                return false;
            }
        }
        self.last_accepted = Some(perturbation.timestamp);

        let direction = match perturbation.direction.signum() {
            0 => {
                if self.rng.gen_bool(0.5) {
                    1
                } else {
                    -1
                }
            }
            resolved => resolved,
        };
        let magnitude = perturbation.magnitude.max(0.0);

        let previous_level = self.level;
        self.set_current(self.current + magnitude * f32::from(direction));

        self.publish(RaceEvent::StabilityPerturbed {
            perturbation: Perturbation {
                magnitude,
                direction,
                ..perturbation
            },
        });
        self.publish_changed();
        self.publish_level_change(previous_level);

        true
    }

    /// Пассивный возврат к центру без перелёта через 0
    pub fn recover_to_center(&mut self, delta_seconds: f32) {
        if self.current.abs() < CENTER_SNAP_EPSILON {
            if self.current != 0.0 {
                self.set_current(0.0);
                self.publish_changed();
                self.publish(RaceEvent::StabilityRecovered);
            }
            return;
        }

        let step = self.recovery_rate * self.level.recovery_multiplier() * delta_seconds.max(0.0);
        if step <= 0.0 {
            return;
        }

        let previous_level = self.level;
        let centered = step >= self.current.abs();
        let next = if centered {
            0.0
        } else {
            self.current - step * f32::from(self.direction)
        };
        self.set_current(next);

        // StabilityRecovered публикуют только snap и reset()
        self.publish_changed();
        self.publish_level_change(previous_level);
    }

    /// Post-crash восстановление: единственный способ снять is_falling
    pub fn reset(&mut self) {
        let previous_level = self.level;
        self.set_current(0.0);
        self.is_falling = false;

        self.publish(RaceEvent::StabilityRecovered);
        self.publish_changed();
        self.publish_level_change(previous_level);
    }

    /// Проверка падения (каждый тик). true если падение началось в этом вызове.
    pub fn check_fall(&mut self) -> bool {
        if self.is_falling || self.current.abs() < self.fall_threshold {
            return false;
        }

        self.is_falling = true;
        logger::log_info(&format!(
            "{:?} falling: stability {:.1} (threshold {:.1})",
            self.source, self.current, self.fall_threshold
        ));
        self.publish(RaceEvent::StabilityFalling { current: self.current });
        true
    }

    pub fn snapshot(&self) -> StabilitySnapshot {
        StabilitySnapshot {
            current: self.current,
            direction: self.direction,
            level: self.level(),
            is_falling: self.is_falling,
        }
    }

    fn set_current(&mut self, value: f32) {
        self.current = value.clamp(STABILITY_MIN, STABILITY_MAX);
        self.direction = sign(self.current);
    }

    fn publish_changed(&self) {
        self.publish(RaceEvent::StabilityChanged {
            current: self.current,
            direction: self.direction,
        });
    }

    fn publish_level_change(&mut self, previous: StabilityLevel) {
        let level = self.level();
        if level == previous {
            return;
        }
        self.level = level;

        self.publish(RaceEvent::StabilityLevelChanged { previous, level });
        if level == StabilityLevel::Critical {
            self.publish(RaceEvent::StabilityCritical { current: self.current });
        }
    }

    fn publish(&self, event: RaceEvent) {
        self.bus.publish(Notification::new(self.source, event));
    }
}

impl std::fmt::Debug for StabilityResource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StabilityResource")
            .field("current", &self.current)
            .field("direction", &self.direction)
            .field("level", &self.level)
            .field("is_falling", &self.is_falling)
            .finish()
    }
}

#[cfg(test)]
impl StabilityResource {
    /// Прямая установка значения для тестов fall detection
    pub(crate) fn force_value(&mut self, value: f32) {
        self.set_current(value);
        self.level = StabilityLevel::from_value(self.current);
    }
}
