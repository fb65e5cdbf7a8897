//! Outbox — listener, накапливающий уведомления для отложенного чтения
//!
//! Используется ECS-слоем: шина доставляет inline, а Bevy systems
//! забирают накопленное через `drain()` и пишут в `Events`.

use std::sync::{Arc, Mutex, PoisonError};

use super::bus::{ListenerId, NotificationBus};
use super::events::{EventKind, Notification, RaceEvent};

#[derive(Clone, Debug, Default)]
pub struct NotificationOutbox {
    pending: Arc<Mutex<Vec<Notification>>>,
}

impl NotificationOutbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Подписывает outbox на все события шины
    pub fn attach(&self, bus: &NotificationBus) -> ListenerId {
        self.attach_to(bus, &EventKind::ALL)
    }

    pub fn attach_to(&self, bus: &NotificationBus, kinds: &[EventKind]) -> ListenerId {
        let pending = Arc::clone(&self.pending);
        bus.subscribe_to(kinds, move |notification| {
            pending
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(notification.clone());
            Ok(())
        })
    }

    pub fn drain(&self) -> Vec<Notification> {
        std::mem::take(&mut *self.pending.lock().unwrap_or_else(PoisonError::into_inner))
    }

    /// Только payloads (удобно для проверок порядка событий)
    pub fn drain_events(&self) -> Vec<RaceEvent> {
        self.drain().into_iter().map(|notification| notification.event).collect()
    }

    pub fn drain_kinds(&self) -> Vec<EventKind> {
        self.drain().iter().map(Notification::kind).collect()
    }

    pub fn len(&self) -> usize {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
