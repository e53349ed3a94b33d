// build.rs - TOML-driven compile-time limit generation
use std::env;
use std::fs;
use std::path::Path;

#[derive(serde::Deserialize)]
struct CompileTimeConfig {
    lexical: LexicalLimits,
    syntax: SyntaxLimits,
    rewrite: RewriteLimits,
    binding: BindingLimits,
    logging: LoggingLimits,
}

#[derive(serde::Deserialize)]
struct LexicalLimits {
    max_query_length: usize,
    max_identifier_length: usize,
    max_string_size: usize,
    max_token_count: usize,
}

#[derive(serde::Deserialize)]
struct SyntaxLimits {
    max_parse_depth: usize,
    max_error_history: usize,
    max_context_stack_depth: usize,
}

#[derive(serde::Deserialize)]
struct RewriteLimits {
    sort_cache_capacity: usize,
    sort_cache_shards: usize,
    max_sort_orders: usize,
}

#[derive(serde::Deserialize)]
struct BindingLimits {
    max_bindings: usize,
    max_expression_length: usize,
}

#[derive(serde::Deserialize)]
struct LoggingLimits {
    max_error_collection: usize,
    log_buffer_size: usize,
    max_log_message_length: usize,
    security_min_log_level: u8,
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-env-changed=QLR_BUILD_PROFILE");
    println!("cargo:rerun-if-env-changed=QLR_CONFIG_DIR");

    let profile = env::var("QLR_BUILD_PROFILE").unwrap_or_else(|_| "development".to_string());
    let config_dir = env::var("QLR_CONFIG_DIR").unwrap_or_else(|_| "config".to_string());

    // Workspace root is the parent of the ql_rewrite directory
    let manifest_dir = env::var("CARGO_MANIFEST_DIR").unwrap();
    let workspace_root = Path::new(&manifest_dir)
        .parent()
        .expect("Could not find workspace root (parent directory)");

    let config_path = workspace_root
        .join(&config_dir)
        .join(format!("{}.toml", profile));

    println!("cargo:rerun-if-changed={}", config_path.display());

    if !config_path.exists() {
        panic!(
            "Configuration file not found: {}\nWorkspace root: {}\nLooking for: {}/{}/{}.toml",
            config_path.display(),
            workspace_root.display(),
            workspace_root.display(),
            config_dir,
            profile
        );
    }

    let config_content = fs::read_to_string(&config_path)
        .unwrap_or_else(|e| panic!("Failed to read {}: {}", config_path.display(), e));

    let config: CompileTimeConfig = toml::from_str(&config_content)
        .unwrap_or_else(|e| panic!("Invalid TOML in {}: {}", config_path.display(), e));

    validate_limits(&config, &profile);
    generate_constants(&config, &profile);

    println!(
        "cargo:warning=Generated constants from {}",
        config_path.display()
    );
}

fn validate_limits(config: &CompileTimeConfig, profile: &str) {
    const ABSOLUTE_MAX_QUERY_LENGTH: usize = 16 * 1024 * 1024;
    const ABSOLUTE_MAX_PARSE_DEPTH: usize = 4096;
    const ABSOLUTE_MAX_CACHE_CAPACITY: usize = 65_536;

    if config.lexical.max_query_length > ABSOLUTE_MAX_QUERY_LENGTH {
        panic!("LIMITS: max_query_length exceeds absolute maximum");
    }

    if config.syntax.max_parse_depth == 0 || config.syntax.max_parse_depth > ABSOLUTE_MAX_PARSE_DEPTH
    {
        panic!("LIMITS: max_parse_depth must be within 1..={}", ABSOLUTE_MAX_PARSE_DEPTH);
    }

    if config.rewrite.sort_cache_capacity == 0
        || config.rewrite.sort_cache_capacity > ABSOLUTE_MAX_CACHE_CAPACITY
    {
        panic!("LIMITS: sort_cache_capacity must be within 1..={}", ABSOLUTE_MAX_CACHE_CAPACITY);
    }

    if config.rewrite.sort_cache_shards == 0
        || config.rewrite.sort_cache_shards > config.rewrite.sort_cache_capacity
    {
        panic!("LIMITS: sort_cache_shards must be within 1..=sort_cache_capacity");
    }

    if config.logging.security_min_log_level > 3 {
        panic!("LIMITS: security_min_log_level too high (max: 3)");
    }

    if profile == "production" {
        if config.lexical.max_query_length > 1024 * 1024 {
            panic!("PRODUCTION: max_query_length too high for production");
        }
        if config.syntax.max_parse_depth > 512 {
            panic!("PRODUCTION: max_parse_depth too high for production");
        }
    }
}

fn generate_constants(config: &CompileTimeConfig, profile: &str) {
    let out_dir = env::var("OUT_DIR").unwrap();
    let output_path = Path::new(&out_dir).join("constants.rs");

    let constants_code = format!(
        r#"
// Generated compile-time constants from TOML configuration
// Profile: {}
// DO NOT EDIT - Generated by build.rs

pub mod compile_time {{
    pub mod lexical {{
        pub const MAX_QUERY_LENGTH: usize = {};
        pub const MAX_IDENTIFIER_LENGTH: usize = {};
        pub const MAX_STRING_SIZE: usize = {};
        pub const MAX_TOKEN_COUNT: usize = {};
    }}

    pub mod syntax {{
        pub const MAX_PARSE_DEPTH: usize = {};
        pub const MAX_ERROR_HISTORY: usize = {};
        pub const MAX_CONTEXT_STACK_DEPTH: usize = {};
    }}

    pub mod rewrite {{
        pub const SORT_CACHE_CAPACITY: usize = {};
        pub const SORT_CACHE_SHARDS: usize = {};
        pub const MAX_SORT_ORDERS: usize = {};
    }}

    pub mod binding {{
        pub const MAX_BINDINGS: usize = {};
        pub const MAX_EXPRESSION_LENGTH: usize = {};
    }}

    pub mod logging {{
        pub const MAX_ERROR_COLLECTION: usize = {};
        pub const LOG_BUFFER_SIZE: usize = {};
        pub const MAX_LOG_MESSAGE_LENGTH: usize = {};
        pub const SECURITY_MIN_LOG_LEVEL: u8 = {};
    }}
}}
"#,
        profile,
        // Lexical
        config.lexical.max_query_length,
        config.lexical.max_identifier_length,
        config.lexical.max_string_size,
        config.lexical.max_token_count,
        // Syntax
        config.syntax.max_parse_depth,
        config.syntax.max_error_history,
        config.syntax.max_context_stack_depth,
        // Rewrite
        config.rewrite.sort_cache_capacity,
        config.rewrite.sort_cache_shards,
        config.rewrite.max_sort_orders,
        // Binding
        config.binding.max_bindings,
        config.binding.max_expression_length,
        // Logging
        config.logging.max_error_collection,
        config.logging.log_buffer_size,
        config.logging.max_log_message_length,
        config.logging.security_min_log_level,
    );

    fs::write(output_path, constants_code).unwrap();
}
