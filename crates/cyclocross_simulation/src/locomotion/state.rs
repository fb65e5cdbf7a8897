//! Locomotion states, transition table, motion profile

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::ConfigError;

/// Режим передвижения участника (ровно один активен)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LocomotionState {
    /// В седле, полный контроль
    Riding,
    /// Бег с велосипедом на плече
    Carrying,
    /// Посадка на велосипед (таймер → Riding)
    Remounting,
    /// Падение (таймер → Remounting)
    Crashed,
}

impl Default for LocomotionState {
    fn default() -> Self {
        Self::Riding
    }
}

impl LocomotionState {
    /// Таблица переходов (направленная, не симметричная)
    pub fn allowed_targets(self) -> &'static [LocomotionState] {
        match self {
            LocomotionState::Riding => &[LocomotionState::Carrying, LocomotionState::Crashed],
            LocomotionState::Carrying => &[LocomotionState::Remounting],
            LocomotionState::Remounting => &[LocomotionState::Riding, LocomotionState::Crashed],
            LocomotionState::Crashed => &[LocomotionState::Remounting],
        }
    }

    pub fn can_transition_to(self, target: LocomotionState) -> bool {
        self.allowed_targets().contains(&target)
    }

    pub fn name(self) -> &'static str {
        match self {
            LocomotionState::Riding => "RIDING",
            LocomotionState::Carrying => "CARRYING",
            LocomotionState::Remounting => "REMOUNTING",
            LocomotionState::Crashed => "CRASHED",
        }
    }
}

/// Запись истории переходов
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transition {
    pub from: LocomotionState,
    pub to: LocomotionState,
    /// Время гонки (clock state machine)
    pub timestamp: Duration,
    pub reason: Option<String>,
}

/// Ограничения движения, выставляемые enter/exit hooks
///
/// Физика (внешний collaborator) читает профиль каждый тик:
/// - max_speed_factor: множитель к базовой max speed
/// - accepts_input: принимает ли участник команды движения
/// - velocity_scale: one-shot множитель скорости при входе в состояние
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MotionProfile {
    pub max_speed_factor: f32,
    pub accepts_input: bool,
    pub velocity_scale: Option<f32>,
}

impl Default for MotionProfile {
    fn default() -> Self {
        Self {
            max_speed_factor: 1.0,
            accepts_input: true,
            velocity_scale: None,
        }
    }
}

/// Параметры state machine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocomotionConfig {
    /// Длительность посадки (сек) до автоматического Riding
    pub remount_duration_secs: f32,
    /// Время лежания после падения (сек) до автоматического Remounting
    pub crash_recovery_secs: f32,
    /// Максимум записей в истории переходов
    pub history_capacity: usize,
    /// Max speed при беге с велосипедом
    pub carrying_speed_factor: f32,
    /// Потеря скорости в начале посадки
    pub remount_velocity_scale: f32,
}

impl Default for LocomotionConfig {
    fn default() -> Self {
        Self {
            remount_duration_secs: 1.0,
            crash_recovery_secs: 2.0,
            history_capacity: 50,
            carrying_speed_factor: 0.3,
            remount_velocity_scale: 0.5,
        }
    }
}

impl LocomotionConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("locomotion.remount_duration_secs", self.remount_duration_secs),
            ("locomotion.crash_recovery_secs", self.crash_recovery_secs),
        ] {
            if !(value >= 0.0) {
                return Err(ConfigError::Negative { field, value });
            }
        }
        for (field, value) in [
            ("locomotion.carrying_speed_factor", self.carrying_speed_factor),
            ("locomotion.remount_velocity_scale", self.remount_velocity_scale),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::OutOfRange {
                    field,
                    value,
                    min: 0.0,
                    max: 1.0,
                });
            }
        }
        if self.history_capacity == 0 {
            return Err(ConfigError::ZeroCapacity {
                field: "locomotion.history_capacity",
            });
        }
        Ok(())
    }
}
