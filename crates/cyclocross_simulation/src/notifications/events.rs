//! Race events — payloads шины уведомлений
//!
//! Один tagged union на все имена событий: listener матчит `RaceEvent`
//! exhaustively вместо чтения опциональных полей.

use serde::{Deserialize, Serialize};

use crate::body::{Perturbation, StabilityLevel, StaminaZone};
use crate::locomotion::LocomotionState;

/// Идентификатор участника гонки внутри одной race session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct CompetitorId(pub u32);

/// Имя события (ключ подписки)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    StaminaChanged,
    StaminaZoneChanged,
    StaminaExhausted,
    StaminaRecoveryStarted,
    StaminaRecoveryCompleted,
    StabilityChanged,
    StabilityLevelChanged,
    StabilityPerturbed,
    StabilityCritical,
    StabilityFalling,
    StabilityRecovered,
    LocomotionStateChanged,
}

impl EventKind {
    pub const ALL: [EventKind; 12] = [
        EventKind::StaminaChanged,
        EventKind::StaminaZoneChanged,
        EventKind::StaminaExhausted,
        EventKind::StaminaRecoveryStarted,
        EventKind::StaminaRecoveryCompleted,
        EventKind::StabilityChanged,
        EventKind::StabilityLevelChanged,
        EventKind::StabilityPerturbed,
        EventKind::StabilityCritical,
        EventKind::StabilityFalling,
        EventKind::StabilityRecovered,
        EventKind::LocomotionStateChanged,
    ];

    /// Стабильное имя для логов и UI listener'ов
    pub fn name(self) -> &'static str {
        match self {
            EventKind::StaminaChanged => "stamina.changed",
            EventKind::StaminaZoneChanged => "stamina.zone_changed",
            EventKind::StaminaExhausted => "stamina.exhausted",
            EventKind::StaminaRecoveryStarted => "stamina.recovery_started",
            EventKind::StaminaRecoveryCompleted => "stamina.recovery_completed",
            EventKind::StabilityChanged => "stability.changed",
            EventKind::StabilityLevelChanged => "stability.level_changed",
            EventKind::StabilityPerturbed => "stability.perturbed",
            EventKind::StabilityCritical => "stability.critical",
            EventKind::StabilityFalling => "stability.falling",
            EventKind::StabilityRecovered => "stability.recovered",
            EventKind::LocomotionStateChanged => "locomotion.state_changed",
        }
    }

    pub fn from_name(name: &str) -> Option<EventKind> {
        EventKind::ALL.into_iter().find(|kind| kind.name() == name)
    }
}

/// Payload события
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RaceEvent {
    StaminaChanged {
        current: f32,
        max: f32,
    },
    StaminaZoneChanged {
        previous: StaminaZone,
        zone: StaminaZone,
    },
    /// Stamina упала до 0 (falling edge)
    StaminaExhausted,
    StaminaRecoveryStarted {
        current: f32,
    },
    StaminaRecoveryCompleted,

    StabilityChanged {
        current: f32,
        direction: i8,
    },
    StabilityLevelChanged {
        previous: StabilityLevel,
        level: StabilityLevel,
    },
    /// Принятое возмущение (direction уже resolved в ±1)
    StabilityPerturbed {
        perturbation: Perturbation,
    },
    StabilityCritical {
        current: f32,
    },
    /// |current| пересёк fall threshold (edge triggered)
    StabilityFalling {
        current: f32,
    },
    StabilityRecovered,

    LocomotionStateChanged {
        from: LocomotionState,
        to: LocomotionState,
        reason: Option<String>,
    },
}

impl RaceEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            RaceEvent::StaminaChanged { .. } => EventKind::StaminaChanged,
            RaceEvent::StaminaZoneChanged { .. } => EventKind::StaminaZoneChanged,
            RaceEvent::StaminaExhausted => EventKind::StaminaExhausted,
            RaceEvent::StaminaRecoveryStarted { .. } => EventKind::StaminaRecoveryStarted,
            RaceEvent::StaminaRecoveryCompleted => EventKind::StaminaRecoveryCompleted,
            RaceEvent::StabilityChanged { .. } => EventKind::StabilityChanged,
            RaceEvent::StabilityLevelChanged { .. } => EventKind::StabilityLevelChanged,
            RaceEvent::StabilityPerturbed { .. } => EventKind::StabilityPerturbed,
            RaceEvent::StabilityCritical { .. } => EventKind::StabilityCritical,
            RaceEvent::StabilityFalling { .. } => EventKind::StabilityFalling,
            RaceEvent::StabilityRecovered => EventKind::StabilityRecovered,
            RaceEvent::LocomotionStateChanged { .. } => EventKind::LocomotionStateChanged,
        }
    }
}

/// Событие + его источник (одна шина на всю race session)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub source: CompetitorId,
    pub event: RaceEvent,
}

impl Notification {
    pub fn new(source: CompetitorId, event: RaceEvent) -> Self {
        Self { source, event }
    }

    pub fn kind(&self) -> EventKind {
        self.event.kind()
    }
}
