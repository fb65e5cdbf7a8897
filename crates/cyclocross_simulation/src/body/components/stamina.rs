//! Stamina — однонаправленный gauge выносливости (0..max)
//!
//! - Drain от усилий (accelerate / sprint), clamp в 0
//! - Recovery в покое, clamp в max
//! - Зоны GREEN / YELLOW / RED → speed multiplier
//! - Exhaustion: current == 0 (событие один раз на falling edge)
//! - Fatigue: копится от усилий, режет recovery, уходит в покое

use serde::{Deserialize, Serialize};

use crate::config::ConfigError;
use crate::logger;
use crate::notifications::{CompetitorId, Notification, NotificationBus, RaceEvent};

/// Зона выносливости (чистая функция от current / max)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum StaminaZone {
    Green,
    Yellow,
    Red,
}

impl StaminaZone {
    pub const GREEN_THRESHOLD: f32 = 0.6;
    pub const YELLOW_THRESHOLD: f32 = 0.3;

    pub fn from_ratio(ratio: f32) -> Self {
        if ratio >= Self::GREEN_THRESHOLD {
            StaminaZone::Green
        } else if ratio >= Self::YELLOW_THRESHOLD {
            StaminaZone::Yellow
        } else {
            StaminaZone::Red
        }
    }

    pub fn speed_multiplier(self) -> f32 {
        match self {
            StaminaZone::Green => 1.0,
            StaminaZone::Yellow => 0.8,
            StaminaZone::Red => 0.5,
        }
    }
}

/// Вид усилия (от command/input слоя)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EffortKind {
    Accelerate,
    Sprint,
}

/// Параметры выносливости
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StaminaConfig {
    pub max: f32,
    /// Recovery (units/sec)
    pub recovery_rate: f32,
    /// Разовая стоимость активации спринта
    pub sprint_activation_cost: f32,
    /// Drain при разгоне (units/sec)
    pub accelerate_drain_rate: f32,
    /// Drain пока спринт удерживается (units/sec)
    pub sprint_drain_rate: f32,
    /// Ниже этой скорости участник считается отдыхающим
    pub rest_speed_threshold: f32,
    pub fatigue_max: f32,
    /// Прирост fatigue за секунду усилия
    pub fatigue_accumulation_rate: f32,
    /// Сброс fatigue за секунду отдыха
    pub fatigue_recovery_rate: f32,
    /// Доля recovery при fatigue == fatigue_max (0..=1)
    pub fatigue_recovery_penalty: f32,
}

impl Default for StaminaConfig {
    fn default() -> Self {
        Self {
            max: 100.0,
            recovery_rate: 8.0,
            sprint_activation_cost: 20.0,
            accelerate_drain_rate: 8.0,
            sprint_drain_rate: 20.0,
            rest_speed_threshold: 5.0,
            fatigue_max: 100.0,
            fatigue_accumulation_rate: 0.5,
            fatigue_recovery_rate: 2.0,
            fatigue_recovery_penalty: 0.7,
        }
    }
}

impl StaminaConfig {
    pub fn effort_rate(&self, kind: EffortKind) -> f32 {
        match kind {
            EffortKind::Accelerate => self.accelerate_drain_rate,
            EffortKind::Sprint => self.sprint_drain_rate,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.max > 0.0) {
            return Err(ConfigError::NonPositive { field: "stamina.max", value: self.max });
        }
        if !(self.fatigue_max > 0.0) {
            return Err(ConfigError::NonPositive {
                field: "stamina.fatigue_max",
                value: self.fatigue_max,
            });
        }
        for (field, value) in [
            ("stamina.recovery_rate", self.recovery_rate),
            ("stamina.sprint_activation_cost", self.sprint_activation_cost),
            ("stamina.accelerate_drain_rate", self.accelerate_drain_rate),
            ("stamina.sprint_drain_rate", self.sprint_drain_rate),
            ("stamina.rest_speed_threshold", self.rest_speed_threshold),
            ("stamina.fatigue_accumulation_rate", self.fatigue_accumulation_rate),
            ("stamina.fatigue_recovery_rate", self.fatigue_recovery_rate),
        ] {
            if !(value >= 0.0) {
                return Err(ConfigError::Negative { field, value });
            }
        }
        if self.sprint_activation_cost > self.max {
            return Err(ConfigError::OutOfRange {
                field: "stamina.sprint_activation_cost",
                value: self.sprint_activation_cost,
                min: 0.0,
                max: self.max,
            });
        }
        if !(0.0..=1.0).contains(&self.fatigue_recovery_penalty) {
            return Err(ConfigError::OutOfRange {
                field: "stamina.fatigue_recovery_penalty",
                value: self.fatigue_recovery_penalty,
                min: 0.0,
                max: 1.0,
            });
        }
        Ok(())
    }
}

/// Read-only снимок для UI / диагностики
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StaminaSnapshot {
    pub current: f32,
    pub max: f32,
    pub percentage: f32,
    pub zone: StaminaZone,
    pub speed_multiplier: f32,
    pub is_exhausted: bool,
    pub is_recovering: bool,
    pub fatigue: f32,
}

/// Выносливость участника
///
/// Инварианты:
/// - 0.0 ≤ current ≤ max
/// - is_exhausted ⇔ current == 0
/// - 0.0 ≤ fatigue ≤ fatigue_max
pub struct StaminaResource {
    current: f32,
    max: f32,
    /// Последний применённый drain (диагностика)
    drain_rate: f32,
    recovery_rate: f32,
    is_exhausted: bool,
    is_recovering: bool,
    fatigue: f32,
    zone: StaminaZone,
    config: StaminaConfig,
    source: CompetitorId,
    bus: NotificationBus,
}

impl StaminaResource {
    pub fn new(config: &StaminaConfig, source: CompetitorId, bus: NotificationBus) -> Self {
        let max = config.max.max(f32::EPSILON);
        Self {
            current: max,
            max,
            drain_rate: 0.0,
            recovery_rate: config.recovery_rate.max(0.0),
            is_exhausted: false,
            is_recovering: false,
            fatigue: 0.0,
            zone: StaminaZone::Green,
            config: config.clone(),
            source,
            bus,
        }
    }

    pub fn current(&self) -> f32 {
        self.current
    }

    pub fn max(&self) -> f32 {
        self.max
    }

    pub fn ratio(&self) -> f32 {
        self.current / self.max
    }

    /// 0.0..=100.0
    pub fn percentage(&self) -> f32 {
        self.ratio() * 100.0
    }

    pub fn zone(&self) -> StaminaZone {
        StaminaZone::from_ratio(self.ratio())
    }

    pub fn speed_multiplier(&self) -> f32 {
        self.zone().speed_multiplier()
    }

    pub fn is_exhausted(&self) -> bool {
        self.is_exhausted
    }

    pub fn is_recovering(&self) -> bool {
        self.is_recovering
    }

    pub fn drain_rate(&self) -> f32 {
        self.drain_rate
    }

    pub fn recovery_rate(&self) -> f32 {
        self.recovery_rate
    }

    pub fn config(&self) -> &StaminaConfig {
        &self.config
    }

    pub fn fatigue(&self) -> f32 {
        self.fatigue
    }

    /// 0.0..=100.0
    pub fn fatigue_percentage(&self) -> f32 {
        self.fatigue / self.config.fatigue_max.max(f32::EPSILON) * 100.0
    }

    /// Множитель recovery: 1.0 без fatigue, fatigue_recovery_penalty на максимуме
    pub fn fatigue_recovery_factor(&self) -> f32 {
        let ratio = (self.fatigue / self.config.fatigue_max.max(f32::EPSILON)).clamp(0.0, 1.0);
        1.0 - ratio * (1.0 - self.config.fatigue_recovery_penalty.clamp(0.0, 1.0))
    }

    /// Внешняя fatigue (удар, длинный подъём и т.п.)
    pub fn apply_fatigue(&mut self, amount: f32) {
        self.add_fatigue(amount.max(0.0));
    }

    pub fn drain(&mut self, amount: f32) {
        let amount = amount.max(0.0);
        self.drain_rate = amount;

        let previous = self.current;
        self.current = (self.current - amount).clamp(0.0, self.max);
        if self.current == previous {
            return;
        }

        // Drain прерывает восстановление: следующий recover снова даст recovery_started
        self.is_recovering = false;
        self.after_change();
    }

    /// Drain по фиксированному rate вида усилия. No-op если exhausted.
    pub fn drain_for_effort(&mut self, kind: EffortKind, delta_seconds: f32) {
        self.drain_for_effort_scaled(kind, delta_seconds, 1.0);
    }

    /// Drain усилия с контекстным множителем (покрытие трассы)
    pub fn drain_for_effort_scaled(&mut self, kind: EffortKind, delta_seconds: f32, multiplier: f32) {
        if self.is_exhausted {
            return;
        }
        let delta_seconds = delta_seconds.max(0.0);
        let multiplier = if multiplier.is_finite() { multiplier.max(0.0) } else { 1.0 };
        let rate = self.config.effort_rate(kind) * multiplier;
        self.drain(rate * delta_seconds);
        self.drain_rate = rate;
        self.add_fatigue(self.config.fatigue_accumulation_rate * delta_seconds);
    }

    /// Восстановление: вызывается update loop'ом владельца когда участник отдыхает
    pub fn recover(&mut self, delta_seconds: f32) {
        let delta_seconds = delta_seconds.max(0.0);
        // Штраф считается по fatigue до отдыха этого тика
        let factor = self.fatigue_recovery_factor();
        self.fatigue = (self.fatigue - self.config.fatigue_recovery_rate * delta_seconds).max(0.0);

        if self.current >= self.max {
            return;
        }

        if !self.is_recovering {
            self.is_recovering = true;
            self.publish(RaceEvent::StaminaRecoveryStarted { current: self.current });
        }

        let previous = self.current;
        self.current = (self.current + self.recovery_rate * factor * delta_seconds).min(self.max);
        if self.current != previous {
            self.after_change();
        }

        if self.current >= self.max {
            self.is_recovering = false;
            self.publish(RaceEvent::StaminaRecoveryCompleted);
        }
    }

    pub fn can_sprint(&self) -> bool {
        self.current >= self.config.sprint_activation_cost && !self.is_exhausted
    }

    /// Списывает стоимость активации. Без stamina — false, состояние не меняется.
    pub fn activate_sprint(&mut self) -> bool {
        if !self.can_sprint() {
            return false;
        }
        self.drain(self.config.sprint_activation_cost);
        true
    }

    pub fn snapshot(&self) -> StaminaSnapshot {
        StaminaSnapshot {
            current: self.current,
            max: self.max,
            percentage: self.percentage(),
            zone: self.zone(),
            speed_multiplier: self.speed_multiplier(),
            is_exhausted: self.is_exhausted,
            is_recovering: self.is_recovering,
            fatigue: self.fatigue,
        }
    }

    fn add_fatigue(&mut self, amount: f32) {
        if amount.is_finite() {
            self.fatigue = (self.fatigue + amount).clamp(0.0, self.config.fatigue_max.max(0.0));
        }
    }

    fn after_change(&mut self) {
        self.publish(RaceEvent::StaminaChanged {
            current: self.current,
            max: self.max,
        });

        let zone = self.zone();
        if zone != self.zone {
            let previous = std::mem::replace(&mut self.zone, zone);
            self.publish(RaceEvent::StaminaZoneChanged { previous, zone });
        }

        self.refresh_exhaustion();
    }

    fn refresh_exhaustion(&mut self) {
        if self.current <= 0.0 {
            if !self.is_exhausted {
                self.is_exhausted = true;
                logger::log_info(&format!("{:?} exhausted", self.source));
                self.publish(RaceEvent::StaminaExhausted);
            }
        } else if self.is_exhausted {
            self.is_exhausted = false;
        }
    }

    fn publish(&self, event: RaceEvent) {
        self.bus.publish(Notification::new(self.source, event));
    }
}

impl std::fmt::Debug for StaminaResource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaminaResource")
            .field("current", &self.current)
            .field("max", &self.max)
            .field("zone", &self.zone)
            .field("is_exhausted", &self.is_exhausted)
            .field("is_recovering", &self.is_recovering)
            .field("fatigue", &self.fatigue)
            .finish()
    }
}
