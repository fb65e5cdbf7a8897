//! Locomotion State Machine
//!
//! RIDING → CARRYING | CRASHED
//! CARRYING → REMOUNTING
//! REMOUNTING → RIDING | CRASHED
//! CRASHED → REMOUNTING
//!
//! Enter/exit hooks выставляют MotionProfile и таймеры:
//! - REMOUNTING: через remount_duration → RIDING
//! - CRASHED: через crash_recovery → REMOUNTING
//! Таймер отменяется если exit() случился раньше.
//!
//! Machine внутри LocomotionHandle не публикует под mutex'ом: уведомление
//! уходит в очередь и публикуется когда LocomotionGuard отпускает lock.

use std::collections::VecDeque;
use std::mem::ManuallyDrop;
use std::ops::{Deref, DerefMut};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, TryLockError};
use std::time::Duration;

use super::state::{LocomotionConfig, LocomotionState, MotionProfile, Transition};
use crate::logger;
use crate::notifications::{CompetitorId, Notification, NotificationBus, RaceEvent};

pub const REMOUNT_COMPLETE_REASON: &str = "remount complete";
pub const CRASH_RECOVERY_REASON: &str = "crash recovery elapsed";

/// One-shot таймер автоматического перехода
#[derive(Debug, Clone, Copy, PartialEq)]
struct StateTimer {
    remaining: f32,
    target: LocomotionState,
    reason: &'static str,
}

pub struct LocomotionStateMachine {
    state: LocomotionState,
    config: LocomotionConfig,
    profile: MotionProfile,
    timer: Option<StateTimer>,
    history: VecDeque<Transition>,
    clock: Duration,
    time_in_state: f32,
    /// Re-entrancy guard: true пока идёт exit → swap → enter
    transitioning: bool,
    /// true когда machine живёт в LocomotionHandle
    defer_notifications: bool,
    pending: Vec<Notification>,
    source: CompetitorId,
    bus: NotificationBus,
}

impl LocomotionStateMachine {
    /// Начальное состояние задаётся снаружи; его enter() вызывается сразу
    pub fn new(
        initial: LocomotionState,
        config: &LocomotionConfig,
        source: CompetitorId,
        bus: NotificationBus,
    ) -> Self {
        let mut machine = Self {
            state: initial,
            config: config.clone(),
            profile: MotionProfile::default(),
            timer: None,
            history: VecDeque::with_capacity(config.history_capacity.max(1)),
            clock: Duration::ZERO,
            time_in_state: 0.0,
            transitioning: false,
            defer_notifications: false,
            pending: Vec::new(),
            source,
            bus,
        };
        machine.enter(initial);
        machine
    }

    pub fn state(&self) -> LocomotionState {
        self.state
    }

    pub fn is_in(&self, state: LocomotionState) -> bool {
        self.state == state
    }

    pub fn is_transitioning(&self) -> bool {
        self.transitioning
    }

    pub fn profile(&self) -> MotionProfile {
        self.profile
    }

    /// Забирает one-shot velocity scale (физика применяет его один раз)
    pub fn take_velocity_scale(&mut self) -> Option<f32> {
        self.profile.velocity_scale.take()
    }

    pub fn time_in_state(&self) -> f32 {
        self.time_in_state
    }

    pub fn clock(&self) -> Duration {
        self.clock
    }

    /// Взведённый таймер: (цель, оставшиеся секунды)
    pub fn pending_timer(&self) -> Option<(LocomotionState, f32)> {
        self.timer.map(|timer| (timer.target, timer.remaining))
    }

    pub fn history(&self) -> impl Iterator<Item = &Transition> {
        self.history.iter()
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    pub fn last_transition(&self) -> Option<&Transition> {
        self.history.back()
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    pub fn can_transition_to(&self, target: LocomotionState) -> bool {
        self.state.can_transition_to(target)
    }

    /// false если: переход уже идёт, target == текущее, таблица запрещает
    pub fn change_state(&mut self, target: LocomotionState, reason: Option<&str>) -> bool {
        if self.transitioning {
            logger::log_warning(&format!(
                "{:?} nested transition to {} rejected (transition in progress)",
                self.source,
                target.name()
            ));
            return false;
        }

        if target == self.state {
            return false;
        }

        if !self.state.can_transition_to(target) {
            logger::log_warning(&format!(
                "{:?} transition {} -> {} not allowed",
                self.source,
                self.state.name(),
                target.name()
            ));
            return false;
        }

        self.transitioning = true;

        let from = self.state;
        self.exit(from);
        self.state = target;
        self.enter(target);

        self.record(Transition {
            from,
            to: target,
            timestamp: self.clock,
            reason: reason.map(str::to_string),
        });

        logger::log(&format!(
            "{:?} transition {} -> {}{}",
            self.source,
            from.name(),
            target.name(),
            reason.map(|r| format!(" ({})", r)).unwrap_or_default()
        ));

        let notification = Notification::new(
            self.source,
            RaceEvent::LocomotionStateChanged {
                from,
                to: target,
                reason: reason.map(str::to_string),
            },
        );
        if self.defer_notifications {
            self.pending.push(notification);
        } else {
            self.bus.publish(notification);
        }

        self.transitioning = false;
        true
    }

    pub fn advance_clock(&mut self, delta_seconds: f32) {
        if !delta_seconds.is_finite() || delta_seconds <= 0.0 {
            return;
        }
        self.clock += Duration::from_secs_f32(delta_seconds);
        self.time_in_state += delta_seconds;
    }

    /// Проверка таймеров; возвращает автоматический переход если он случился
    pub fn update_timers(&mut self, delta_seconds: f32) -> Option<Transition> {
        let timer = self.timer.as_mut()?;
        timer.remaining -= delta_seconds.max(0.0);
        if timer.remaining > 0.0 {
            return None;
        }

        let StateTimer { target, reason, .. } = *timer;
        self.timer = None;

        if self.change_state(target, Some(reason)) {
            self.last_transition().cloned()
        } else {
            None
        }
    }

    /// Standalone tick: clock + таймеры
    pub fn update(&mut self, delta_seconds: f32) -> Option<Transition> {
        self.advance_clock(delta_seconds);
        self.update_timers(delta_seconds)
    }

    /// Уведомления, отложенные до освобождения handle
    pub fn pending_notifications(&self) -> usize {
        self.pending.len()
    }

    fn enter(&mut self, state: LocomotionState) {
        self.time_in_state = 0.0;

        match state {
            LocomotionState::Riding => {
                self.profile = MotionProfile::default();
            }
            LocomotionState::Carrying => {
                self.profile = MotionProfile {
                    max_speed_factor: self.config.carrying_speed_factor,
                    accepts_input: true,
                    velocity_scale: None,
                };
            }
            LocomotionState::Remounting => {
                self.profile = MotionProfile {
                    max_speed_factor: 1.0,
                    accepts_input: false,
                    velocity_scale: Some(self.config.remount_velocity_scale),
                };
                self.arm_timer(
                    self.config.remount_duration_secs,
                    LocomotionState::Riding,
                    REMOUNT_COMPLETE_REASON,
                );
            }
            LocomotionState::Crashed => {
                self.profile = MotionProfile {
                    max_speed_factor: 0.0,
                    accepts_input: false,
                    velocity_scale: Some(0.0),
                };
                self.arm_timer(
                    self.config.crash_recovery_secs,
                    LocomotionState::Remounting,
                    CRASH_RECOVERY_REASON,
                );
            }
        }
    }

    fn exit(&mut self, state: LocomotionState) {
        if let Some(timer) = self.timer.take() {
            logger::log(&format!(
                "{:?} {} timer to {} cancelled ({:.2}s left)",
                self.source,
                state.name(),
                timer.target.name(),
                timer.remaining
            ));
        }
        // Профиль следующего состояния выставит его enter()
        self.profile = MotionProfile::default();
    }

    fn arm_timer(&mut self, seconds: f32, target: LocomotionState, reason: &'static str) {
        self.timer = Some(StateTimer {
            remaining: seconds.max(0.0),
            target,
            reason,
        });
    }

    fn record(&mut self, transition: Transition) {
        let capacity = self.config.history_capacity.max(1);
        while self.history.len() >= capacity {
            self.history.pop_front();
        }
        self.history.push_back(transition);
    }
}

impl std::fmt::Debug for LocomotionStateMachine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocomotionStateMachine")
            .field("state", &self.state)
            .field("time_in_state", &self.time_in_state)
            .field("timer", &self.timer)
            .field("history", &self.history.len())
            .finish()
    }
}

/// Разделяемый handle на state machine участника
///
/// Владелец (Competitor) и bridge listener шины держат один и тот же
/// экземпляр. `try_lock` не ждёт: занятый mutex означает что machine
/// прямо сейчас меняется выше по стеку.
#[derive(Clone, Debug)]
pub struct LocomotionHandle {
    inner: Arc<Mutex<LocomotionStateMachine>>,
}

impl LocomotionHandle {
    pub fn new(mut machine: LocomotionStateMachine) -> Self {
        machine.defer_notifications = true;
        Self {
            inner: Arc::new(Mutex::new(machine)),
        }
    }

    pub fn lock(&self) -> LocomotionGuard<'_> {
        LocomotionGuard::new(self.inner.lock().unwrap_or_else(PoisonError::into_inner))
    }

    /// None если machine уже занята (re-entrant запрос)
    pub fn try_lock(&self) -> Option<LocomotionGuard<'_>> {
        match self.inner.try_lock() {
            Ok(guard) => Some(LocomotionGuard::new(guard)),
            Err(TryLockError::Poisoned(poisoned)) => Some(LocomotionGuard::new(poisoned.into_inner())),
            Err(TryLockError::WouldBlock) => None,
        }
    }

    pub fn state(&self) -> LocomotionState {
        self.lock().state()
    }
}

/// Guard над machine: на drop сначала отпускает mutex, потом публикует
/// накопленные `locomotion.state_changed`
pub struct LocomotionGuard<'a> {
    guard: ManuallyDrop<MutexGuard<'a, LocomotionStateMachine>>,
}

impl<'a> LocomotionGuard<'a> {
    fn new(guard: MutexGuard<'a, LocomotionStateMachine>) -> Self {
        Self {
            guard: ManuallyDrop::new(guard),
        }
    }
}

impl Deref for LocomotionGuard<'_> {
    type Target = LocomotionStateMachine;

    fn deref(&self) -> &Self::Target {
        &self.guard
    }
}

impl DerefMut for LocomotionGuard<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.guard
    }
}

impl Drop for LocomotionGuard<'_> {
    fn drop(&mut self) {
        let pending = std::mem::take(&mut self.guard.pending);
        let bus = self.guard.bus.clone();

        // SAFETY: guard больше не используется, drop ровно один раз
        unsafe { ManuallyDrop::drop(&mut self.guard) };

        if std::thread::panicking() {
            return;
        }
        for notification in pending {
            bus.publish(notification);
        }
    }
}
