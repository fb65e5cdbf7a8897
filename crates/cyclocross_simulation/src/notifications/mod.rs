//! Notifications — шина событий race session
//!
//! Содержит:
//! - RaceEvent / EventKind / Notification (payloads)
//! - NotificationBus (синхронный publish/subscribe)
//! - NotificationOutbox (буфер для ECS-слоя и тестов)

pub mod bus;
pub mod events;
pub mod outbox;


pub use bus::*;
pub use events::*;
pub use outbox::*;
