//! Notification Bus — синхронный publish/subscribe
//!
//! - Подписка по `EventKind`, несколько listener'ов на одно имя
//! - Доставка в порядке подписки, inline внутри `publish`
//! - Ошибка или panic одного listener'а не блокирует остальных
//!
//! Шина создаётся явно на race session и передаётся в ресурсы
//! (никакого глобального default instance).

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use thiserror::Error;

use super::events::{EventKind, Notification};
use crate::logger;

/// Ошибка listener'а (логируется шиной, доставка продолжается)
#[derive(Debug, Error)]
pub enum ListenerError {
    #[error("listener rejected {event}: {reason}")]
    Rejected { event: &'static str, reason: String },

    #[error("listener target unavailable: {0}")]
    Unavailable(String),
}

pub type ListenerResult = Result<(), ListenerError>;

type Listener = Arc<dyn Fn(&Notification) -> ListenerResult + Send + Sync>;

/// Handle подписки (closures нельзя сравнивать, поэтому отписка по id)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

struct Subscription {
    id: ListenerId,
    listener: Listener,
}

#[derive(Default)]
struct Registry {
    next_id: u64,
    subscriptions: HashMap<EventKind, Vec<Subscription>>,
}

/// Итог одного `publish`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PublishReport {
    pub delivered: usize,
    pub failed: usize,
}

/// Шина уведомлений race session
///
/// `Clone` даёт handle на ту же шину (Arc внутри).
#[derive(Clone, Default)]
pub struct NotificationBus {
    registry: Arc<Mutex<Registry>>,
}

impl NotificationBus {
    pub fn new() -> Self {
        Self::default()
    }

    fn registry(&self) -> MutexGuard<'_, Registry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn subscribe<F>(&self, kind: EventKind, listener: F) -> ListenerId
    where
        F: Fn(&Notification) -> ListenerResult + Send + Sync + 'static,
    {
        self.subscribe_to(&[kind], listener)
    }

    /// Один listener на несколько имён событий (общий `ListenerId`)
    pub fn subscribe_to<F>(&self, kinds: &[EventKind], listener: F) -> ListenerId
    where
        F: Fn(&Notification) -> ListenerResult + Send + Sync + 'static,
    {
        let listener: Listener = Arc::new(listener);
        let mut registry = self.registry();

        let id = ListenerId(registry.next_id);
        registry.next_id += 1;

        for kind in kinds {
            registry.subscriptions.entry(*kind).or_default().push(Subscription {
                id,
                listener: Arc::clone(&listener),
            });
        }

        id
    }

    /// Возвращает true если подписка существовала
    pub fn unsubscribe(&self, kind: EventKind, id: ListenerId) -> bool {
        let mut registry = self.registry();
        let Some(subscriptions) = registry.subscriptions.get_mut(&kind) else {
            return false;
        };

        let before = subscriptions.len();
        subscriptions.retain(|subscription| subscription.id != id);
        before != subscriptions.len()
    }

    /// Снимает listener со всех имён событий
    pub fn unsubscribe_all(&self, id: ListenerId) -> usize {
        let mut registry = self.registry();
        let mut removed = 0;
        for subscriptions in registry.subscriptions.values_mut() {
            let before = subscriptions.len();
            subscriptions.retain(|subscription| subscription.id != id);
            removed += before - subscriptions.len();
        }
        removed
    }

    pub fn listener_count(&self, kind: EventKind) -> usize {
        self.registry()
            .subscriptions
            .get(&kind)
            .map_or(0, |subscriptions| subscriptions.len())
    }

    /// Синхронная доставка всем подписчикам `notification.kind()`
    ///
    /// Список listener'ов снимается до вызовов: listener может
    /// подписываться/отписываться во время доставки без deadlock.
    pub fn publish(&self, notification: Notification) -> PublishReport {
        let kind = notification.kind();
        let listeners: Vec<Listener> = self
            .registry()
            .subscriptions
            .get(&kind)
            .map(|subscriptions| {
                subscriptions
                    .iter()
                    .map(|subscription| Arc::clone(&subscription.listener))
                    .collect()
            })
            .unwrap_or_default();

        let mut report = PublishReport::default();
        for listener in listeners {
            match catch_unwind(AssertUnwindSafe(|| listener(&notification))) {
                Ok(Ok(())) => report.delivered += 1,
                Ok(Err(err)) => {
                    report.failed += 1;
                    logger::log_warning(&format!(
                        "{} listener failed for {:?}: {}",
                        kind.name(),
                        notification.source,
                        err
                    ));
                }
                Err(_) => {
                    report.failed += 1;
                    logger::log_error(&format!(
                        "{} listener panicked for {:?}",
                        kind.name(),
                        notification.source
                    ));
                }
            }
        }

        report
    }
}

impl std::fmt::Debug for NotificationBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let registry = self.registry();
        let listeners: usize = registry.subscriptions.values().map(Vec::len).sum();
        f.debug_struct("NotificationBus")
            .field("listeners", &listeners)
            .finish()
    }
}
