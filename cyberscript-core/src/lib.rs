//! # CyberScript Core
//!
//! Core library for CyberScript, a generator of illustrated cyber-attack
//! storyboards for security-awareness training.
//! Provides the domain model, Gemini-backed generation providers, the
//! storyboard controller, configuration, and report export.

pub mod config;
pub mod controller;
pub mod error;
pub mod image;
pub mod prompts;
pub mod providers;
pub mod report;
pub mod schema;
pub mod types;

// Re-export commonly used types at the crate root.
pub use config::{AppConfig, ConfigOverrides, GenerationConfig, UiConfig};
pub use controller::{NoOpCallback, RecordingCallback, StoryboardCallback, StoryboardController};
pub use error::{ConfigError, CyberscriptError, GenerationError, Result, ValidationError};
pub use providers::{
    GeminiProvider, MockStoryboardProvider, StoryboardProvider, create_provider,
};
pub use report::{MemorySink, ReportSink, format_report};
pub use types::{AttackScenario, AttackStep, Complexity, ViewState, ViewStatus};
