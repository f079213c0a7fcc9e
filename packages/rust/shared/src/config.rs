//! Application configuration for fieldfill.
//!
//! User config lives at `~/.fieldfill/fieldfill.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{FieldFillError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "fieldfill.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".fieldfill";

/// Expected prefix of an Anthropic API key.
const API_KEY_PREFIX: &str = "sk-ant-";

/// Longest system prompt accepted, in characters.
pub const MAX_SYSTEM_PROMPT_CHARS: usize = 5000;

/// Starter prompt printed by `fieldfill config example-prompt`.
pub const EXAMPLE_SYSTEM_PROMPT: &str = r#"You are helping fill out professional event registration forms and business inquiry forms. Use a professional but friendly tone throughout.

Personal Information:
- For name fields, use "John Smith"
- For email fields, use "john.smith@techsolutions.com"
- For company/organization, use "TechSolutions Inc."
- For job title/position, use "Senior Software Developer"
- For phone numbers, use "+1 (555) 123-4567"

Professional Background:
- When asked about experience, mention 8+ years in software development
- For skills/expertise, focus on: web development, cloud technologies, AI/ML, and team leadership
- For interests, mention: emerging technologies, digital transformation, and innovation

Communication Style:
- Keep responses concise but informative
- Use professional language appropriate for business contexts
- For "why interested" or motivation fields, express genuine interest in learning and networking
- For bio/description fields, keep to 2-3 sentences maximum

Always provide responses that are appropriate for the field type and context."#;

// ---------------------------------------------------------------------------
// Config structs (matching fieldfill.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Fill instructions.
    #[serde(default)]
    pub prompt: PromptConfig,

    /// Anthropic completion backend settings.
    #[serde(default)]
    pub anthropic: AnthropicConfig,

    /// Fill pipeline tuning.
    #[serde(default)]
    pub fill: FillConfig,
}

/// `[prompt]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PromptConfig {
    /// The fill instruction sent as the system prompt with every field.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
}

/// `[anthropic]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnthropicConfig {
    /// Name of the env var holding the API key (never store the key itself).
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Model used for completions.
    #[serde(default = "default_model")]
    pub model: String,

    /// Completion token cap per field.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Messages endpoint.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request HTTP timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for AnthropicConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_api_key_env(),
            model: default_model(),
            max_tokens: default_max_tokens(),
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_api_key_env() -> String {
    "ANTHROPIC_API_KEY".into()
}
fn default_model() -> String {
    "claude-sonnet-4-20250514".into()
}
fn default_max_tokens() -> u32 {
    1024
}
fn default_base_url() -> String {
    "https://api.anthropic.com/v1/messages".into()
}
fn default_timeout_secs() -> u64 {
    30
}

/// `[fill]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FillConfig {
    /// Maximum completion requests in flight for one batch.
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
}

impl Default for FillConfig {
    fn default() -> Self {
        Self {
            max_concurrency: default_max_concurrency(),
        }
    }
}

fn default_max_concurrency() -> usize {
    8
}

// ---------------------------------------------------------------------------
// Fill settings (runtime, merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// The persisted values read before each fill session.
#[derive(Debug, Clone, Default)]
pub struct FillSettings {
    /// Fill instruction; `None` when the user never configured one.
    pub system_prompt: Option<String>,
    /// Credential; `None` when the env var is unset.
    pub api_key: Option<String>,
}

impl FillSettings {
    /// Resolve settings from config: prompt from the file, key from the env.
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            system_prompt: config
                .prompt
                .system_prompt
                .clone()
                .filter(|p| !p.trim().is_empty()),
            api_key: env_api_key(config),
        }
    }
}

/// The trimmed key from the configured env var, if set and non-blank.
fn env_api_key(config: &AppConfig) -> Option<String> {
    std::env::var(&config.anthropic.api_key_env)
        .ok()
        .map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty())
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.fieldfill/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| FieldFillError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.fieldfill/fieldfill.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| FieldFillError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        FieldFillError::config(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| FieldFillError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| FieldFillError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| FieldFillError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Read the API key from the configured env var and check its format.
pub fn resolve_api_key(config: &AppConfig) -> Result<String> {
    let key = env_api_key(config).ok_or_else(|| {
        FieldFillError::config(format!(
            "Anthropic API key not found. Set the {} environment variable.",
            config.anthropic.api_key_env
        ))
    })?;
    validate_api_key_format(&key)?;
    Ok(key)
}

/// Anthropic keys start with `sk-ant-`.
pub fn validate_api_key_format(key: &str) -> Result<()> {
    if key.starts_with(API_KEY_PREFIX) {
        Ok(())
    } else {
        Err(FieldFillError::validation(format!(
            "API key should start with \"{API_KEY_PREFIX}\""
        )))
    }
}

/// A usable system prompt is non-blank and within [`MAX_SYSTEM_PROMPT_CHARS`].
pub fn validate_system_prompt(prompt: &str) -> Result<()> {
    if prompt.trim().is_empty() {
        return Err(FieldFillError::validation("system prompt is empty"));
    }
    let chars = prompt.chars().count();
    if chars > MAX_SYSTEM_PROMPT_CHARS {
        return Err(FieldFillError::validation(format!(
            "system prompt is {chars} characters, max {MAX_SYSTEM_PROMPT_CHARS}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("ANTHROPIC_API_KEY"));
        assert!(toml_str.contains("max_concurrency"));
        assert!(!toml_str.contains("system_prompt"));
    }

    #[test]
    fn config_roundtrip() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.fill.max_concurrency, 8);
        assert_eq!(parsed.anthropic.max_tokens, 1024);
        assert_eq!(parsed.anthropic.timeout_secs, 30);
    }

    #[test]
    fn config_with_prompt() {
        let toml_str = r#"
[prompt]
system_prompt = "Use Jane Doe for names."

[fill]
max_concurrency = 2
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(
            config.prompt.system_prompt.as_deref(),
            Some("Use Jane Doe for names.")
        );
        assert_eq!(config.fill.max_concurrency, 2);
        assert_eq!(config.anthropic.model, "claude-sonnet-4-20250514");
    }

    #[test]
    fn settings_from_config_reads_env() {
        let mut config = AppConfig::default();
        // Use a unique env var name to avoid interfering with other tests
        config.anthropic.api_key_env = "FF_TEST_NONEXISTENT_KEY_98765".into();
        config.prompt.system_prompt = Some("   ".into());
        let settings = FillSettings::from_config(&config);
        assert!(settings.system_prompt.is_none());
        assert!(settings.api_key.is_none());
    }

    #[test]
    fn settings_and_resolver_agree_on_padded_key() {
        let mut config = AppConfig::default();
        config.anthropic.api_key_env = "FF_TEST_PADDED_KEY_24680".into();
        // SAFETY: the variable name is unique to this test.
        unsafe { std::env::set_var("FF_TEST_PADDED_KEY_24680", "  sk-ant-padded\n") };

        let settings = FillSettings::from_config(&config);
        assert_eq!(settings.api_key.as_deref(), Some("sk-ant-padded"));
        assert_eq!(resolve_api_key(&config).unwrap(), "sk-ant-padded");

        unsafe { std::env::remove_var("FF_TEST_PADDED_KEY_24680") };
    }

    #[test]
    fn api_key_missing() {
        let mut config = AppConfig::default();
        config.anthropic.api_key_env = "FF_TEST_NONEXISTENT_KEY_12345".into();
        let result = resolve_api_key(&config);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("API key not found"));
    }

    #[test]
    fn api_key_format() {
        assert!(validate_api_key_format("sk-ant-abc123").is_ok());
        let err = validate_api_key_format("sk-live-abc").unwrap_err();
        assert!(err.to_string().contains("sk-ant-"));
    }

    #[test]
    fn system_prompt_validation() {
        assert!(validate_system_prompt("Fill politely.").is_ok());
        assert!(validate_system_prompt("  \n ").is_err());
        let long = "x".repeat(MAX_SYSTEM_PROMPT_CHARS + 1);
        assert!(validate_system_prompt(&long).is_err());
        assert!(validate_system_prompt(EXAMPLE_SYSTEM_PROMPT).is_ok());
    }
}
