//! Text-completion capability used to produce one value per form field.
//!
//! This crate provides:
//! - [`CompletionProvider`]: the black-box async contract the orchestrator relies on
//! - [`ProviderFactory`]: builds a provider from the credential carried by a request
//! - [`AnthropicProvider`]: the Messages API implementation
//! - [`prompt`]: the per-field user prompt

mod anthropic;
pub mod prompt;

use std::sync::Arc;

use async_trait::async_trait;
use fieldfill_shared::{FieldDescriptor, Result};

pub use anthropic::{AnthropicFactory, AnthropicProvider};

/// Produces a fill value for a single field.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Ask the backend for the value of `field` under `system_prompt`.
    async fn complete(&self, field: &FieldDescriptor, system_prompt: &str) -> Result<String>;

    /// Cheap round-trip proving the credential works.
    async fn test_connection(&self) -> Result<()>;

    /// Human-readable backend name for tracing.
    fn name(&self) -> &str;
}

/// Builds providers per request, since each batch carries its own key.
pub trait ProviderFactory: Send + Sync {
    fn create(&self, api_key: &str) -> Result<Arc<dyn CompletionProvider>>;
}
