//! Locomotion domain — режим передвижения участника
//!
//! Содержит:
//! - LocomotionState + таблица переходов
//! - LocomotionStateMachine (hooks, таймеры, bounded history)
//! - LocomotionHandle (разделяемый доступ для bridge listener'а)

pub mod state;
pub mod state_machine;


pub use state::*;
pub use state_machine::*;
