//! Generation service providers.
//!
//! A provider turns a target description into a structured `AttackScenario`
//! and a visual prompt into an inline image. The only remote implementation is
//! the Google Gemini API; `MockStoryboardProvider` backs the tests.
//!
//! Use `create_provider()` to instantiate the configured provider.

pub mod gemini;
pub mod mock;

use crate::config::GenerationConfig;
use crate::error::GenerationError;
use crate::types::{AttackScenario, Complexity};
use async_trait::async_trait;
use std::sync::Arc;

pub use gemini::GeminiProvider;
pub use mock::MockStoryboardProvider;

/// Trait for services that generate storyboards and their illustrations.
///
/// Each call is exactly one outbound request. Implementations never retry.
#[async_trait]
pub trait StoryboardProvider: Send + Sync {
    /// Generate a scenario skeleton (no images) for the given target.
    ///
    /// Steps come back in kill-chain order, each with a fresh id, no image,
    /// and `is_loading_image = false`.
    async fn generate_scenario(
        &self,
        complexity: Complexity,
        description: &str,
    ) -> Result<AttackScenario, GenerationError>;

    /// Generate one illustration and return it as a data URI.
    async fn generate_step_image(&self, visual_prompt: &str) -> Result<String, GenerationError>;

    /// Provider name for logs.
    fn name(&self) -> &str;
}

/// Resolve the API key: inline config value first, then the configured env var.
pub fn resolve_api_key(config: &GenerationConfig) -> Result<String, GenerationError> {
    if let Some(key) = config.api_key.as_ref().filter(|k| !k.trim().is_empty()) {
        return Ok(key.clone());
    }
    std::env::var(&config.api_key_env)
        .ok()
        .filter(|k| !k.trim().is_empty())
        .ok_or_else(|| GenerationError::AuthFailed {
            provider: format!("{} (env var '{}' not set)", config.provider, config.api_key_env),
        })
}

/// Create the provider named in the configuration.
pub fn create_provider(
    config: &GenerationConfig,
) -> Result<Arc<dyn StoryboardProvider>, GenerationError> {
    match config.provider.as_str() {
        "gemini" => Ok(Arc::new(GeminiProvider::new(config)?)),
        other => Err(GenerationError::UnsupportedProvider {
            provider: other.to_string(),
        }),
    }
}
