//! Body components: физическое состояние участника

pub mod stability;
pub mod stamina;

#[cfg(test)]
mod stamina_tests;

// Re-export all components
pub use stability::*;
pub use stamina::*;
