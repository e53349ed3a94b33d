// RUNTIME PREFERENCES

use crate::config::compile_time::rewrite::{SORT_CACHE_CAPACITY, SORT_CACHE_SHARDS};
use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;

fn env_or<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LexicalPreferences {
    /// Whether lexer errors carry line/column information in their message
    pub include_position_in_errors: bool,

    /// Whether to log token counts after each successful tokenization
    pub collect_metrics: bool,
}

impl Default for LexicalPreferences {
    fn default() -> Self {
        Self {
            include_position_in_errors: env_or(env_vars::LEXICAL_INCLUDE_POSITIONS, true),
            collect_metrics: env_or(env_vars::LEXICAL_COLLECT_METRICS, false),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyntaxPreferences {
    /// Whether to emit a success event for every parsed query
    pub log_parse_events: bool,

    /// Whether grammar errors render a caret excerpt of the query
    pub include_excerpt_in_errors: bool,
}

impl Default for SyntaxPreferences {
    fn default() -> Self {
        Self {
            log_parse_events: env_or(env_vars::SYNTAX_LOG_PARSE_EVENTS, false),
            include_excerpt_in_errors: env_or(env_vars::SYNTAX_INCLUDE_EXCERPT, true),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RewritePreferences {
    /// Entry capacity of the sorted-query LRU cache
    pub sort_cache_capacity: usize,

    /// Number of independently locked cache segments
    pub sort_cache_shards: usize,
}

impl Default for RewritePreferences {
    fn default() -> Self {
        let capacity = env_or(env_vars::REWRITE_SORT_CACHE_CAPACITY, SORT_CACHE_CAPACITY).max(1);
        let shards = env_or(env_vars::REWRITE_SORT_CACHE_SHARDS, SORT_CACHE_SHARDS).clamp(1, capacity);
        Self {
            sort_cache_capacity: capacity,
            sort_cache_shards: shards,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingPreferences {
    /// Whether to use structured JSON logging
    pub use_structured_logging: bool,

    /// Whether to enable console output
    pub enable_console_logging: bool,

    /// Preferred minimum log level
    pub min_log_level: LogLevel,

    /// Whether query text is attached to log events as context
    pub include_query_text: bool,
}

impl Default for LoggingPreferences {
    fn default() -> Self {
        Self {
            use_structured_logging: env_or(env_vars::LOGGING_USE_STRUCTURED, false),
            enable_console_logging: env_or(env_vars::LOGGING_ENABLE_CONSOLE, false),
            min_log_level: env::var(env_vars::LOGGING_MIN_LEVEL)
                .ok()
                .and_then(|v| parse_log_level(&v))
                .unwrap_or(LogLevel::Info),
            include_query_text: env_or(env_vars::LOGGING_INCLUDE_QUERY_TEXT, true),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LogLevel {
    Error = 0,
    Warning = 1,
    Info = 2,
    Debug = 3,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Error => "ERROR",
            LogLevel::Warning => "WARN",
            LogLevel::Info => "INFO",
            LogLevel::Debug => "DEBUG",
        }
    }

    pub fn to_events_log_level(self) -> crate::logging::events::LogLevel {
        match self {
            LogLevel::Error => crate::logging::events::LogLevel::Error,
            LogLevel::Warning => crate::logging::events::LogLevel::Warning,
            LogLevel::Info => crate::logging::events::LogLevel::Info,
            LogLevel::Debug => crate::logging::events::LogLevel::Debug,
        }
    }
}

/// Parse log level from string (used for environment variables)
pub fn parse_log_level(level: &str) -> Option<LogLevel> {
    match level.to_lowercase().as_str() {
        "error" | "0" => Some(LogLevel::Error),
        "warning" | "warn" | "1" => Some(LogLevel::Warning),
        "info" | "2" => Some(LogLevel::Info),
        "debug" | "3" => Some(LogLevel::Debug),
        _ => None,
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuntimeConfig {
    pub lexical: LexicalPreferences,
    pub syntax: SyntaxPreferences,
    pub rewrite: RewritePreferences,
    pub logging: LoggingPreferences,
}

/// Environment variable names for configuration
pub mod env_vars {
    // Lexical
    pub const LEXICAL_INCLUDE_POSITIONS: &str = "QLR_LEXICAL_INCLUDE_POSITIONS";
    pub const LEXICAL_COLLECT_METRICS: &str = "QLR_LEXICAL_COLLECT_METRICS";

    // Syntax
    pub const SYNTAX_LOG_PARSE_EVENTS: &str = "QLR_SYNTAX_LOG_PARSE_EVENTS";
    pub const SYNTAX_INCLUDE_EXCERPT: &str = "QLR_SYNTAX_INCLUDE_EXCERPT";

    // Rewrite
    pub const REWRITE_SORT_CACHE_CAPACITY: &str = "QLR_REWRITE_SORT_CACHE_CAPACITY";
    pub const REWRITE_SORT_CACHE_SHARDS: &str = "QLR_REWRITE_SORT_CACHE_SHARDS";

    // Logging
    pub const LOGGING_USE_STRUCTURED: &str = "QLR_LOGGING_USE_STRUCTURED";
    pub const LOGGING_ENABLE_CONSOLE: &str = "QLR_LOGGING_ENABLE_CONSOLE";
    pub const LOGGING_MIN_LEVEL: &str = "QLR_LOGGING_MIN_LEVEL";
    pub const LOGGING_INCLUDE_QUERY_TEXT: &str = "QLR_LOGGING_INCLUDE_QUERY_TEXT";
}
