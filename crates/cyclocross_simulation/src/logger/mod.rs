//! Логгер симуляции
//!
//! Глобальный pluggable printer: хост (headless binary, тесты, движок)
//! подставляет свой `LogPrinter`, core пишет через `log_*` функции.
//! Уровень фильтрации — `set_log_level`.

use once_cell::sync::Lazy;
use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard, PoisonError};

static LOGGER: Lazy<Mutex<Option<Box<dyn LogPrinter>>>> = Lazy::new(|| Mutex::new(None));

static LOGGER_LEVEL: Lazy<Mutex<LogLevel>> = Lazy::new(|| Mutex::new(LogLevel::Debug));

/// Ключи уже залогированных `log_once` сообщений.
/// Ключ = вид проблемы, не entity: множество ограничено числом call site'ов.
static LOGGED_ONCE: Lazy<Mutex<HashSet<String>>> = Lazy::new(|| Mutex::new(HashSet::new()));

/// Poisoned mutex у логгера не критичен — продолжаем с inner значением
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

pub fn set_logger(logger: Box<dyn LogPrinter>) {
    *lock(&LOGGER) = Some(logger);
}

pub fn set_logger_if_needed(logger: Box<dyn LogPrinter>) {
    let mut slot = lock(&LOGGER);
    if slot.is_none() {
        *slot = Some(logger);
    }
}

pub fn set_log_level(level: LogLevel) {
    *lock(&LOGGER_LEVEL) = level;
}

pub fn log_level() -> LogLevel {
    *lock(&LOGGER_LEVEL)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warning => "WARNING",
            LogLevel::Error => "ERROR",
        }
    }
}

pub trait LogPrinter: Send + Sync {
    fn log(&self, level: LogLevel, message: &str);
}

pub fn log(message: &str) {
    log_with_level(LogLevel::Debug, message);
}

pub fn log_info(message: &str) {
    log_with_level(LogLevel::Info, message);
}

pub fn log_warning(message: &str) {
    log_with_level(LogLevel::Warning, message);
}

pub fn log_error(message: &str) {
    log_with_level(LogLevel::Error, message);
}

pub fn log_with_level(level: LogLevel, message: &str) {
    if level < log_level() {
        return;
    }

    // timestamp добавляем здесь, printer только форматирует уровень
    if let Some(logger) = lock(&LOGGER).as_ref() {
        let timestamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
        logger.log(level, &format!("[{}] {}", timestamp, message));
    }
}

/// Логирует сообщение только при первом вызове с данным `key`
///
/// Для configuration errors (нет collaborator'а у entity): каждый тик
/// update пропускается, но в лог попадает одна строка.
/// Возвращает true если сообщение было записано.
pub fn log_once(key: &str, level: LogLevel, message: &str) -> bool {
    let first = lock(&LOGGED_ONCE).insert(key.to_string());
    if first {
        log_with_level(level, message);
    }
    first
}

/// Ключи сработавших `log_once` (диагностика)
pub fn logged_once_keys() -> Vec<String> {
    let mut keys: Vec<String> = lock(&LOGGED_ONCE).iter().cloned().collect();
    keys.sort();
    keys
}

pub struct ConsoleLogger;

impl LogPrinter for ConsoleLogger {
    fn log(&self, level: LogLevel, message: &str) {
        println!("[{}] {}", level.as_str(), message);
    }
}

pub fn init_logger() {
    set_logger_if_needed(Box::new(ConsoleLogger));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_ordering() {
        assert!(LogLevel::Debug < LogLevel::Info);
        assert!(LogLevel::Info < LogLevel::Warning);
        assert!(LogLevel::Warning < LogLevel::Error);
        assert_eq!(LogLevel::Warning.as_str(), "WARNING");
    }

    #[test]
    fn test_log_once_only_first_call() {
        let key = "logger-test:missing-terrain";
        assert!(log_once(key, LogLevel::Warning, "terrain classifier missing"));
        assert!(!log_once(key, LogLevel::Warning, "terrain classifier missing"));
        assert!(!log_once(key, LogLevel::Warning, "terrain classifier missing"));
    }
}
