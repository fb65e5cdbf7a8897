//! Competitor events

use bevy::prelude::*;

use crate::body::EffortKind;
use crate::notifications::Notification;

/// Event: усилие участника на текущий тик
///
/// Генерируется command layer'ом (игрок / AI) каждый тик, пока усилие удерживается.
/// Обрабатывается: apply_competitor_intents → Competitor::hold_effort
#[derive(Event, Debug, Clone, Copy)]
pub struct EffortIntent {
    pub entity: Entity,
    pub kind: EffortKind,
}

/// Event: активация спринта (списывает activation cost один раз)
#[derive(Event, Debug, Clone, Copy)]
pub struct SprintIntent {
    pub entity: Entity,
}

/// Event: уведомление шины, переложенное в ECS (UI bars, анимации, VFX)
#[derive(Event, Debug, Clone, PartialEq)]
pub struct CompetitorNotification(pub Notification);
