//! Body domain — два связанных ресурса участника
//!
//! Содержит:
//! - StaminaResource (0..max, drain / recovery, зоны)
//! - StabilityResource (-100..+100, perturbation / возврат к центру, падение)
//!
//! Оба публикуют изменения в NotificationBus race session.

pub mod components;

pub use components::*;
