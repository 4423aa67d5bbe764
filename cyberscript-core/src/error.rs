//! Error types for the CyberScript core.
//!
//! Uses `thiserror` for public API error types. Generation failures collapse
//! into two kinds: scenario-level errors, which abort a run, and image-level
//! errors, which are isolated to a single step.

/// Top-level error type for the CyberScript core library.
#[derive(Debug, thiserror::Error)]
pub enum CyberscriptError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Generation error: {0}")]
    Generation(#[from] GenerationError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Clipboard error: {message}")]
    Clipboard { message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Input rejected before any network activity.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Please provide a description of the target organization.")]
    EmptyDescription,
}

/// Errors from the remote text and image generation services.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("Scenario request failed: {message}")]
    ScenarioRequest { message: String },

    #[error("Scenario response could not be parsed: {message}")]
    ScenarioParse { message: String },

    #[error("Image request failed: {message}")]
    ImageRequest { message: String },

    #[error("Failed to generate image: no inline image data in response")]
    MissingImagePayload,

    #[error("Authentication failed for provider {provider}")]
    AuthFailed { provider: String },

    #[error("Unsupported provider: {provider}")]
    UnsupportedProvider { provider: String },
}

impl GenerationError {
    /// Whether this error belongs to the text (scenario) call.
    pub fn is_scenario_error(&self) -> bool {
        matches!(
            self,
            GenerationError::ScenarioRequest { .. } | GenerationError::ScenarioParse { .. }
        )
    }

    /// Whether this error belongs to a per-step image call.
    pub fn is_image_error(&self) -> bool {
        matches!(
            self,
            GenerationError::ImageRequest { .. } | GenerationError::MissingImagePayload
        )
    }
}

/// Errors from the configuration system.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration parse error: {message}")]
    ParseError { message: String },
}

impl From<Box<figment::Error>> for ConfigError {
    fn from(e: Box<figment::Error>) -> Self {
        ConfigError::ParseError {
            message: e.to_string(),
        }
    }
}

/// A type alias for results using the top-level `CyberscriptError`.
pub type Result<T> = std::result::Result<T, CyberscriptError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_validation() {
        let err = CyberscriptError::Validation(ValidationError::EmptyDescription);
        assert_eq!(
            err.to_string(),
            "Validation error: Please provide a description of the target organization."
        );
    }

    #[test]
    fn test_error_display_generation() {
        let err = CyberscriptError::Generation(GenerationError::ScenarioRequest {
            message: "connection refused".into(),
        });
        assert_eq!(
            err.to_string(),
            "Generation error: Scenario request failed: connection refused"
        );
    }

    #[test]
    fn test_error_display_config() {
        let err = CyberscriptError::Config(ConfigError::ParseError {
            message: "invalid type: found string, expected a boolean".into(),
        });
        assert_eq!(
            err.to_string(),
            "Configuration error: Configuration parse error: invalid type: found string, expected a boolean"
        );
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: CyberscriptError = io_err.into();
        assert!(matches!(err, CyberscriptError::Io(_)));
    }

    #[test]
    fn test_error_from_serde() {
        let serde_err = serde_json::from_str::<serde_json::Value>("invalid json").unwrap_err();
        let err: CyberscriptError = serde_err.into();
        assert!(matches!(err, CyberscriptError::Serialization(_)));
    }

    #[test]
    fn test_generation_error_kinds() {
        assert!(GenerationError::ScenarioParse { message: "x".into() }.is_scenario_error());
        assert!(!GenerationError::ScenarioParse { message: "x".into() }.is_image_error());
        assert!(GenerationError::MissingImagePayload.is_image_error());
        assert!(GenerationError::ImageRequest { message: "x".into() }.is_image_error());
        assert!(
            !GenerationError::AuthFailed {
                provider: "gemini".into()
            }
            .is_scenario_error()
        );
    }
}
