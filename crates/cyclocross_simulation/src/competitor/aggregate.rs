//! Competitor — один участник гонки
//!
//! Владеет stamina, stability, state machine (через handle) и perturbation
//! policy. Bridge listener подписан на `stability.falling` этого участника и
//! переводит machine в CRASHED.
//!
//! Порядок внутри тика:
//! 1. terrain sampling (policy)
//! 2. perturbation или возврат к центру
//! 3. stamina: effort drain (× terrain multiplier) или recovery
//! 4. fall check (bridge срабатывает синхронно внутри publish);
//!    падение которое bridge не принял (CARRYING) сразу закрывается reset()
//! 5. таймеры state machine

use std::time::Duration;

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::body::{
    EffortKind, Perturbation, StabilityResource, StabilitySnapshot, StaminaResource, StaminaSnapshot,
};
use crate::config::{CompetitorConfig, ConfigError};
use crate::locomotion::{
    LocomotionHandle, LocomotionState, LocomotionStateMachine, MotionProfile, Transition,
};
use crate::logger;
use crate::notifications::{CompetitorId, EventKind, ListenerError, ListenerId, NotificationBus};
use crate::terrain::{PerturbationPolicy, TerrainKind};

pub const FALL_REASON: &str = "stability fall threshold exceeded";

/// Seed RNG участника: session seed + id (SplitMix64 finalizer)
pub fn competitor_seed(session_seed: u64, id: CompetitorId) -> u64 {
    let mut z = session_seed ^ u64::from(id.0).wrapping_mul(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Read-only снимок участника (UI, диагностика, сравнение прогонов)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompetitorSnapshot {
    pub id: CompetitorId,
    pub elapsed: Duration,
    pub stamina: StaminaSnapshot,
    pub stability: StabilitySnapshot,
    pub locomotion: LocomotionState,
    pub time_in_state: f32,
    pub profile: MotionProfile,
}

#[derive(Component)]
pub struct Competitor {
    id: CompetitorId,
    stamina: StaminaResource,
    stability: StabilityResource,
    locomotion: LocomotionHandle,
    policy: PerturbationPolicy,
    /// Усилие, заявленное command layer'ом на текущий тик
    held_effort: Option<EffortKind>,
    bus: NotificationBus,
    bridge: ListenerId,
}

impl Competitor {
    pub fn new(
        id: CompetitorId,
        config: &CompetitorConfig,
        session_seed: u64,
        bus: NotificationBus,
    ) -> Result<Self, ConfigError> {
        Self::with_state(id, config, session_seed, bus, LocomotionState::default())
    }

    pub fn with_state(
        id: CompetitorId,
        config: &CompetitorConfig,
        session_seed: u64,
        bus: NotificationBus,
        initial: LocomotionState,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        let stamina = StaminaResource::new(&config.stamina, id, bus.clone());
        let stability = StabilityResource::new(
            &config.stability,
            competitor_seed(session_seed, id),
            id,
            bus.clone(),
        );
        let locomotion = LocomotionHandle::new(LocomotionStateMachine::new(
            initial,
            &config.locomotion,
            id,
            bus.clone(),
        ));
        let bridge = attach_fall_bridge(&bus, id, &locomotion);

        logger::log(&format!("{:?} joined race (initial state {})", id, initial.name()));

        Ok(Self {
            id,
            stamina,
            stability,
            locomotion,
            policy: PerturbationPolicy::new(&config.perturbation),
            held_effort: None,
            bus,
            bridge,
        })
    }

    pub fn id(&self) -> CompetitorId {
        self.id
    }

    pub fn stamina(&self) -> &StaminaResource {
        &self.stamina
    }

    pub fn stability(&self) -> &StabilityResource {
        &self.stability
    }

    pub fn locomotion(&self) -> &LocomotionHandle {
        &self.locomotion
    }

    pub fn state(&self) -> LocomotionState {
        self.locomotion.state()
    }

    pub fn profile(&self) -> MotionProfile {
        self.locomotion.lock().profile()
    }

    pub fn elapsed(&self) -> Duration {
        self.locomotion.lock().clock()
    }

    /// Итоговый множитель скорости: зона stamina × профиль locomotion
    pub fn speed_factor(&self) -> f32 {
        self.stamina.speed_multiplier() * self.profile().max_speed_factor
    }

    /// Запрос смены режима от command layer (спешиться перед барьером и т.п.)
    pub fn request_state(&mut self, target: LocomotionState, reason: Option<&str>) -> bool {
        self.locomotion.lock().change_state(target, reason)
    }

    /// Усилие на следующий тик; игнорируется пока профиль не принимает input
    pub fn hold_effort(&mut self, kind: EffortKind) {
        self.held_effort = Some(kind);
    }

    /// Мгновенный drain (command layer с собственным dt)
    pub fn drain_for_effort(&mut self, kind: EffortKind, delta_seconds: f32) {
        if !self.profile().accepts_input {
            return;
        }
        self.stamina.drain_for_effort(kind, delta_seconds);
    }

    pub fn can_sprint(&self) -> bool {
        self.stamina.can_sprint()
    }

    pub fn activate_sprint(&mut self) -> bool {
        if !self.profile().accepts_input {
            return false;
        }
        self.stamina.activate_sprint()
    }

    /// Внешний толчок (collision слой)
    pub fn apply_perturbation(&mut self, perturbation: Perturbation) -> bool {
        self.stability.apply_perturbation(perturbation)
    }

    /// Один тик симуляции; возвращает автоматический переход state machine
    pub fn update(
        &mut self,
        delta_seconds: f32,
        terrain: Option<TerrainKind>,
        speed: f32,
    ) -> Option<Transition> {
        if !delta_seconds.is_finite() || delta_seconds <= 0.0 {
            return None;
        }

        // Lock держим только на чтение: bridge listener берёт его сам
        let (now, state, accepts_input) = {
            let mut machine = self.locomotion.lock();
            machine.advance_clock(delta_seconds);
            (machine.clock(), machine.state(), machine.profile().accepts_input)
        };

        // 1-2. Perturbation или возврат к центру
        if !self
            .policy
            .tick(&mut self.stability, terrain, speed, self.stamina.ratio(), now)
        {
            self.stability.recover_to_center(delta_seconds);
        }

        // 3. Stamina
        let effort = self.held_effort.take().filter(|_| accepts_input);
        let resting = speed < self.stamina.config().rest_speed_threshold
            || state == LocomotionState::Carrying;
        match effort {
            Some(kind) if !self.stamina.is_exhausted() => {
                let multiplier = terrain.map_or(1.0, TerrainKind::stamina_drain_multiplier);
                self.stamina.drain_for_effort_scaled(kind, delta_seconds, multiplier)
            }
            _ if resting => self.stamina.recover(delta_seconds),
            _ => {}
        }

        // 4. Fall check
        self.stability.check_fall();
        if self.stability.is_falling() {
            let locomotion_state = self.locomotion.state();
            if locomotion_state != LocomotionState::Crashed {
                // Bridge отказал: без reset() следующий выход за порог не заметим
                logger::log_warning(&format!(
                    "{:?} fall rejected while {}, stability reset",
                    self.id,
                    locomotion_state.name()
                ));
                self.stability.reset();
            }
        }

        // 5. Таймеры
        let automatic = self.locomotion.lock().update_timers(delta_seconds);
        if let Some(transition) = &automatic {
            if transition.from == LocomotionState::Crashed {
                // Поднялся после падения: равновесие с нуля
                self.stability.reset();
            }
        }
        automatic
    }

    pub fn snapshot(&self) -> CompetitorSnapshot {
        let machine = self.locomotion.lock();
        CompetitorSnapshot {
            id: self.id,
            elapsed: machine.clock(),
            stamina: self.stamina.snapshot(),
            stability: self.stability.snapshot(),
            locomotion: machine.state(),
            time_in_state: machine.time_in_state(),
            profile: machine.profile(),
        }
    }

    /// One-shot velocity scale для физики (REMOUNTING / CRASHED entry)
    pub fn take_velocity_scale(&mut self) -> Option<f32> {
        self.locomotion.lock().take_velocity_scale()
    }
}

impl Drop for Competitor {
    fn drop(&mut self) {
        self.bus.unsubscribe_all(self.bridge);
    }
}

impl std::fmt::Debug for Competitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Competitor")
            .field("id", &self.id)
            .field("stamina", &self.stamina)
            .field("stability", &self.stability)
            .field("locomotion", &self.locomotion)
            .finish()
    }
}

/// Bridge: `stability.falling` → CRASHED
///
/// Уже CRASHED — no-op. Занятая machine (переход в процессе) — отказ.
fn attach_fall_bridge(
    bus: &NotificationBus,
    id: CompetitorId,
    locomotion: &LocomotionHandle,
) -> ListenerId {
    let locomotion = locomotion.clone();
    bus.subscribe(EventKind::StabilityFalling, move |notification| {
        if notification.source != id {
            return Ok(());
        }

        let Some(mut machine) = locomotion.try_lock() else {
            return Err(ListenerError::Rejected {
                event: EventKind::StabilityFalling.name(),
                reason: format!("{:?} locomotion transition in progress", id),
            });
        };

        if machine.is_in(LocomotionState::Crashed) {
            return Ok(());
        }

        if !machine.change_state(LocomotionState::Crashed, Some(FALL_REASON)) {
            return Err(ListenerError::Rejected {
                event: EventKind::StabilityFalling.name(),
                reason: format!("{:?} cannot crash from {}", id, machine.state().name()),
            });
        }
        Ok(())
    })
}

#[cfg(test)]
impl Competitor {
    pub(crate) fn stability_mut(&mut self) -> &mut StabilityResource {
        &mut self.stability
    }
}
