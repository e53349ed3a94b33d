//! Global logging for the query rewriting engine
//!
//! Events are coded (see [`codes`]) and routed through a process-wide
//! [`LoggingService`]. Until one is installed, every logging call is a no-op,
//! so embedding the engine never forces output on the host.

#[macro_use]
pub mod macros;

pub mod codes;
pub mod config;
pub mod events;
#[cfg(feature = "log")]
pub mod facade;
pub mod service;

use std::sync::{Arc, OnceLock};

pub use codes::Code;
pub use events::{LogEvent, LogLevel};
pub use service::{ConsoleLogger, Logger, LoggingService, MemoryLogger, StructuredLogger};

static GLOBAL_LOGGER: OnceLock<Arc<LoggingService>> = OnceLock::new();

// ============================================================================
// INITIALIZATION
// ============================================================================

/// Install the configured console or JSON logger
pub fn init_global_logging() -> Result<(), String> {
    config::validate_config().map_err(|e| format!("Configuration validation failed: {}", e))?;
    install(Arc::new(service::create_configured_service()))
}

/// Install a caller-provided service
pub fn init_global_logging_with_service(service: Arc<LoggingService>) -> Result<(), String> {
    install(service)
}

fn install(service: Arc<LoggingService>) -> Result<(), String> {
    GLOBAL_LOGGER
        .set(service.clone())
        .map_err(|_| "Global logger already initialized".to_string())?;

    for code in [
        codes::system::INTERNAL_ERROR,
        codes::syntax::BAD_GRAMMAR,
        codes::transform::NOT_A_SELECT,
        codes::binding::MIXED_PARAMETER_STYLES,
    ] {
        if codes::get_error_metadata(code.as_str()).is_none() {
            return Err(format!("Missing metadata for error code: {}", code));
        }
    }

    service.log_event(LogEvent::success(
        codes::success::SYSTEM_INITIALIZATION_COMPLETED,
        "Global logging system initialized",
    ));

    Ok(())
}

pub fn is_initialized() -> bool {
    GLOBAL_LOGGER.get().is_some()
}

pub fn try_get_global_logger() -> Option<&'static LoggingService> {
    GLOBAL_LOGGER.get().map(|service| service.as_ref())
}

/// Whether an event at `level` would reach a logger
pub fn enabled(level: LogLevel) -> bool {
    try_get_global_logger().is_some_and(|logger| logger.should_log(level))
}

// ============================================================================
// MACRO SUPPORT FUNCTIONS
// ============================================================================

pub fn dispatch(event: LogEvent) {
    if let Some(logger) = try_get_global_logger() {
        logger.log_event(event);
    }
}

fn with_pairs(event: LogEvent, context: Vec<(&str, &str)>) -> LogEvent {
    context
        .into_iter()
        .fold(event, |event, (key, value)| event.with_context(key, value))
}

/// Used by `log_error!`
pub fn log_error_with_context(
    code: Code,
    message: &str,
    span: Option<crate::utils::Span>,
    context: Vec<(&str, &str)>,
) {
    if !enabled(LogLevel::Error) {
        return;
    }
    let mut event = LogEvent::error(code, config::clamp_message(message));
    if let Some(s) = span {
        event = event.with_span(s);
    }
    dispatch(with_pairs(event, context));
}

/// Used by `log_success!`
pub fn log_success_with_context(code: Code, message: &str, context: Vec<(&str, &str)>) {
    if enabled(LogLevel::Info) {
        dispatch(with_pairs(LogEvent::success(code, message), context));
    }
}

/// Used by `log_info!`
pub fn log_info_with_context(message: &str, context: Vec<(&str, &str)>) {
    if enabled(LogLevel::Info) {
        dispatch(with_pairs(LogEvent::info(message), context));
    }
}

/// Error logging that falls back to stderr before initialization
pub fn safe_log_error(code: Code, message: &str) {
    match try_get_global_logger() {
        Some(logger) => logger.log_event(LogEvent::error(code, message)),
        None => eprintln!("[ERROR] FALLBACK: [{}] {}", code.as_str(), message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logging_calls_are_safe_without_initialization() {
        log_error_with_context(codes::system::INTERNAL_ERROR, "boom", None, vec![]);
        log_info_with_context("info", vec![("k", "v")]);
        safe_log_error(codes::system::INTERNAL_ERROR, "fallback");
    }

    #[test]
    fn test_second_initialization_is_rejected() {
        let service = Arc::new(LoggingService::new(
            service::create_test_logger(),
            LogLevel::Error,
        ));
        let _ = init_global_logging_with_service(service.clone());
        assert!(is_initialized());
        assert!(init_global_logging_with_service(service).is_err());
    }
}
