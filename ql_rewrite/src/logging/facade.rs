//! Bridge from coded events to the `log` crate facade

use super::events::{LogEvent, LogLevel};
use super::service::Logger;

/// Forwards events to whatever `log` backend the host installed
pub struct LogFacadeLogger;

impl LogFacadeLogger {
    fn level(level: LogLevel) -> log::Level {
        match level {
            LogLevel::Error => log::Level::Error,
            LogLevel::Warning => log::Level::Warn,
            LogLevel::Info => log::Level::Info,
            LogLevel::Debug => log::Level::Debug,
        }
    }
}

impl Logger for LogFacadeLogger {
    fn log(&self, event: &LogEvent) {
        let level = Self::level(event.level);
        if !log::log_enabled!(target: "ql_rewrite", level) {
            return;
        }
        if event.context.is_empty() {
            log::log!(target: "ql_rewrite", level, "{} - {}", event.code, event.message);
        } else {
            let mut pairs: Vec<_> = event.context.iter().collect();
            pairs.sort();
            let context = pairs
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect::<Vec<_>>()
                .join(" ");
            log::log!(target: "ql_rewrite", level, "{} - {} [{}]", event.code, event.message, context);
        }
    }
}
