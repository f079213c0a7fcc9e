//! Shared types, error model, and configuration for fieldfill.
//!
//! This crate is the foundation depended on by all other fieldfill crates.
//! It provides:
//! - [`FieldFillError`]: the unified error type
//! - Domain types ([`FieldDescriptor`], [`FillResult`], [`FillSummary`], [`FieldId`])
//! - Configuration ([`AppConfig`], [`FillSettings`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AnthropicConfig, AppConfig, FillConfig, FillSettings, PromptConfig, config_dir,
    config_file_path, init_config, load_config, load_config_from, resolve_api_key,
    validate_api_key_format, validate_system_prompt, EXAMPLE_SYSTEM_PROMPT,
    MAX_SYSTEM_PROMPT_CHARS,
};
pub use error::{FieldFillError, Result};
pub use types::{
    FIELD_MARKER_ATTR, FieldDescriptor, FieldId, FieldKind, FillResult, FillSummary,
    truncate_chars,
};
