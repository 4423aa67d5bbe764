//! Google Gemini API provider implementation.
//!
//! Implements `StoryboardProvider` against the native Gemini `generateContent`
//! endpoint, once in structured-output mode (JSON + response schema) for the
//! scenario and once per step in image mode for the illustrations.
//!
//! - Auth via `?key=API_KEY` query parameter (not header-based)
//! - System instruction is a top-level `system_instruction` field
//! - Images come back as `inlineData` parts carrying base64 bytes

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::debug;

use super::{StoryboardProvider, resolve_api_key};
use crate::config::GenerationConfig;
use crate::error::GenerationError;
use crate::image::{DEFAULT_IMAGE_MIME, encode_data_uri};
use crate::prompts::{SYSTEM_INSTRUCTION, image_prompt, scenario_user_prompt};
use crate::schema::{decode_scenario, scenario_response_schema};
use crate::types::{AttackScenario, Complexity};

/// Which of the two calls a request belongs to. Decides the error kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CallKind {
    Scenario,
    Image,
}

impl CallKind {
    fn request_error(self, message: String) -> GenerationError {
        match self {
            CallKind::Scenario => GenerationError::ScenarioRequest { message },
            CallKind::Image => GenerationError::ImageRequest { message },
        }
    }
}

/// Google Gemini API provider.
pub struct GeminiProvider {
    client: Client,
    base_url: String,
    api_key: String,
    text_model: String,
    image_model: String,
    aspect_ratio: String,
}

impl GeminiProvider {
    /// Create a new Gemini provider from configuration.
    ///
    /// Returns `GenerationError::AuthFailed` if no API key can be resolved.
    pub fn new(config: &GenerationConfig) -> Result<Self, GenerationError> {
        let api_key = resolve_api_key(config)?;
        Self::new_with_key(config, api_key)
    }

    /// Create a new Gemini provider with an explicitly provided API key.
    pub fn new_with_key(config: &GenerationConfig, api_key: String) -> Result<Self, GenerationError> {
        let mut builder = Client::builder();
        if let Some(secs) = config.request_timeout_secs {
            builder = builder.timeout(std::time::Duration::from_secs(secs));
        }
        let client = builder
            .build()
            .map_err(|e| GenerationError::ScenarioRequest {
                message: format!("Failed to build HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            base_url: config
                .effective_base_url()
                .trim_end_matches('/')
                .to_string(),
            api_key,
            text_model: config.text_model.clone(),
            image_model: config.image_model.clone(),
            aspect_ratio: config.aspect_ratio.clone(),
        })
    }

    /// Build the JSON request body for a structured scenario request.
    fn build_scenario_body(complexity: Complexity, description: &str) -> Value {
        serde_json::json!({
            "system_instruction": {
                "parts": [{ "text": SYSTEM_INSTRUCTION }]
            },
            "contents": [{
                "role": "user",
                "parts": [{ "text": scenario_user_prompt(complexity, description) }]
            }],
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": scenario_response_schema(),
            },
        })
    }

    /// Build the JSON request body for a single illustration.
    fn build_image_body(&self, visual_prompt: &str) -> Value {
        serde_json::json!({
            "contents": [{
                "role": "user",
                "parts": [{ "text": image_prompt(visual_prompt) }]
            }],
            "generationConfig": {
                "imageConfig": { "aspectRatio": self.aspect_ratio },
            },
        })
    }

    /// Parts of the first candidate, or an error of the given kind.
    fn candidate_parts(body: &Value, kind: CallKind) -> Result<&Vec<Value>, GenerationError> {
        let missing = |what: &str| match kind {
            CallKind::Scenario => GenerationError::ScenarioParse {
                message: format!("Missing {} in response", what),
            },
            CallKind::Image => GenerationError::MissingImagePayload,
        };
        let candidate = body["candidates"]
            .as_array()
            .and_then(|c| c.first())
            .ok_or_else(|| missing("'candidates'"))?;
        candidate["content"]["parts"]
            .as_array()
            .ok_or_else(|| missing("'parts' in candidate content"))
    }

    /// Parse a scenario response: concatenate text parts, then decode them.
    fn parse_scenario_response(body: &Value) -> Result<AttackScenario, GenerationError> {
        let parts = Self::candidate_parts(body, CallKind::Scenario)?;
        let text: String = parts
            .iter()
            .filter(|p| p.get("thought").and_then(Value::as_bool) != Some(true))
            .filter_map(|p| p.get("text").and_then(Value::as_str))
            .collect();
        decode_scenario(&text)
    }

    /// Parse an image response: the first `inlineData` part becomes a data URI.
    fn parse_image_response(body: &Value) -> Result<String, GenerationError> {
        let parts = Self::candidate_parts(body, CallKind::Image)?;
        for part in parts {
            let inline = match part.get("inlineData").or_else(|| part.get("inline_data")) {
                Some(inline) => inline,
                None => continue,
            };
            if let Some(data) = inline["data"].as_str().filter(|d| !d.is_empty()) {
                let mime = inline["mimeType"]
                    .as_str()
                    .or_else(|| inline["mime_type"].as_str())
                    .unwrap_or(DEFAULT_IMAGE_MIME);
                return Ok(encode_data_uri(mime, data));
            }
        }
        Err(GenerationError::MissingImagePayload)
    }

    /// Map a non-success HTTP status to the error kind of the call.
    fn map_http_error(status: reqwest::StatusCode, body_text: &str, kind: CallKind) -> GenerationError {
        match status.as_u16() {
            401 | 403 => GenerationError::AuthFailed {
                provider: "Gemini".to_string(),
            },
            _ => kind.request_error(format!("HTTP {} from Gemini API: {}", status, body_text)),
        }
    }

    /// Build the endpoint URL for a Gemini API call.
    fn endpoint_url(&self, model: &str) -> String {
        format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, model, self.api_key
        )
    }

    /// Send one request and return the parsed JSON body.
    async fn post(&self, model: &str, body: &Value, kind: CallKind) -> Result<Value, GenerationError> {
        debug!(model, ?kind, "Sending Gemini generateContent request");

        let response = self
            .client
            .post(self.endpoint_url(model))
            .header("content-type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(|e| {
                // reqwest includes the URL, and with it the key, in its errors.
                kind.request_error(format!(
                    "Request to Gemini API failed: {}",
                    e.without_url()
                ))
            })?;

        let status = response.status();
        let body_text = response
            .text()
            .await
            .map_err(|e| kind.request_error(format!("Failed to read response body: {}", e.without_url())))?;

        if !status.is_success() {
            return Err(Self::map_http_error(status, &body_text, kind));
        }

        serde_json::from_str(&body_text).map_err(|e| match kind {
            CallKind::Scenario => GenerationError::ScenarioParse {
                message: format!("Invalid JSON in response: {}", e),
            },
            CallKind::Image => GenerationError::ImageRequest {
                message: format!("Invalid JSON in response: {}", e),
            },
        })
    }
}

#[async_trait]
impl StoryboardProvider for GeminiProvider {
    async fn generate_scenario(
        &self,
        complexity: Complexity,
        description: &str,
    ) -> Result<AttackScenario, GenerationError> {
        let body = Self::build_scenario_body(complexity, description);
        let response = self.post(&self.text_model, &body, CallKind::Scenario).await?;
        let scenario = Self::parse_scenario_response(&response)?;
        debug!(
            steps = scenario.steps.len(),
            scenario_id = scenario.id.as_str(),
            "Decoded scenario"
        );
        Ok(scenario)
    }

    async fn generate_step_image(&self, visual_prompt: &str) -> Result<String, GenerationError> {
        let body = self.build_image_body(visual_prompt);
        let response = self.post(&self.image_model, &body, CallKind::Image).await?;
        Self::parse_image_response(&response)
    }

    fn name(&self) -> &str {
        "gemini"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn make_provider() -> GeminiProvider {
        GeminiProvider::new_with_key(&GenerationConfig::default(), "test-gemini-key".to_string())
            .expect("Provider creation should succeed")
    }

    #[test]
    fn test_new_missing_env_returns_auth_failed() {
        // SAFETY: test-only env var manipulation
        unsafe { std::env::remove_var("GEMINI_MISSING_KEY_XYZ") };
        let config = GenerationConfig {
            api_key_env: "GEMINI_MISSING_KEY_XYZ".into(),
            ..Default::default()
        };
        match GeminiProvider::new(&config) {
            Err(GenerationError::AuthFailed { provider }) => {
                assert!(provider.contains("GEMINI_MISSING_KEY_XYZ"));
            }
            Err(other) => panic!("Expected AuthFailed, got {:?}", other),
            Ok(_) => panic!("Expected AuthFailed, got a provider"),
        }
    }

    #[test]
    fn test_new_custom_base_url() {
        let config = GenerationConfig {
            base_url: Some("https://my-proxy.example.com/v1/".to_string()),
            ..Default::default()
        };
        let provider = GeminiProvider::new_with_key(&config, "k".into()).unwrap();
        assert_eq!(provider.base_url, "https://my-proxy.example.com/v1");
    }

    #[test]
    fn test_endpoint_url() {
        let provider = make_provider();
        assert_eq!(
            provider.endpoint_url("gemini-3-flash-preview"),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-3-flash-preview:generateContent?key=test-gemini-key"
        );
    }

    #[test]
    fn test_build_scenario_body() {
        let body = GeminiProvider::build_scenario_body(Complexity::Advanced, "A bank");
        assert!(
            body["system_instruction"]["parts"][0]["text"]
                .as_str()
                .unwrap()
                .starts_with("You are CyberScript")
        );
        let prompt = body["contents"][0]["parts"][0]["text"].as_str().unwrap();
        assert!(prompt.contains("Target Description: A bank"));
        assert!(prompt.contains("Difficulty Level: Advanced"));
        assert_eq!(body["contents"][0]["role"], "user");
        assert_eq!(
            body["generationConfig"]["responseMimeType"],
            "application/json"
        );
        assert_eq!(
            body["generationConfig"]["responseSchema"]["type"],
            "OBJECT"
        );
    }

    #[test]
    fn test_build_image_body() {
        let provider = make_provider();
        let body = provider.build_image_body("a dark SOC");
        let text = body["contents"][0]["parts"][0]["text"].as_str().unwrap();
        assert!(text.starts_with("High quality, cinematic digital art"));
        assert!(text.ends_with("a dark SOC"));
        assert_eq!(
            body["generationConfig"]["imageConfig"]["aspectRatio"],
            "16:9"
        );
        assert!(body.get("system_instruction").is_none());
    }

    #[test]
    fn test_parse_scenario_response() {
        let scenario_json = json!({
            "threatActor": "Insider",
            "attackVector": "Data Theft",
            "summary": "s",
            "steps": [{
                "phase": "Exfiltration",
                "title": "USB copy",
                "description": "d",
                "mitreTechnique": "T1052",
                "visualPrompt": "v"
            }],
            "sampleLogs": "l",
            "attackFlowDiagram": "f",
            "mitigationLessons": "m"
        })
        .to_string();
        // Split across two text parts to check they are concatenated.
        let (head, tail) = scenario_json.split_at(20);
        let body = json!({
            "candidates": [{
                "content": {
                    "role": "model",
                    "parts": [{ "text": head }, { "text": tail }]
                },
                "finishReason": "STOP"
            }]
        });

        let scenario = GeminiProvider::parse_scenario_response(&body).unwrap();
        assert_eq!(scenario.threat_actor, "Insider");
        assert_eq!(scenario.steps.len(), 1);
        assert_eq!(scenario.steps[0].phase, "Exfiltration");
    }

    #[test]
    fn test_parse_scenario_skips_thought_parts() {
        let body = json!({
            "candidates": [{
                "content": {
                    "parts": [
                        { "text": "thinking about it", "thought": true },
                        { "text": "{\"threatActor\":\"a\",\"attackVector\":\"b\",\"summary\":\"c\",\"steps\":[],\"sampleLogs\":\"d\",\"attackFlowDiagram\":\"e\",\"mitigationLessons\":\"f\"}" }
                    ]
                }
            }]
        });
        let scenario = GeminiProvider::parse_scenario_response(&body).unwrap();
        assert_eq!(scenario.attack_vector, "b");
    }

    #[test]
    fn test_parse_scenario_missing_candidates() {
        let err = GeminiProvider::parse_scenario_response(&json!({})).unwrap_err();
        assert!(matches!(err, GenerationError::ScenarioParse { .. }));

        let err = GeminiProvider::parse_scenario_response(&json!({ "candidates": [] })).unwrap_err();
        assert!(matches!(err, GenerationError::ScenarioParse { .. }));
    }

    #[test]
    fn test_parse_scenario_incomplete_json() {
        let body = json!({
            "candidates": [{ "content": { "parts": [{ "text": "{\"threatActor\": \"x\"}" }] } }]
        });
        let err = GeminiProvider::parse_scenario_response(&body).unwrap_err();
        assert!(err.is_scenario_error());
    }

    #[test]
    fn test_parse_image_response_first_inline_part() {
        let body = json!({
            "candidates": [{
                "content": {
                    "parts": [
                        { "text": "Here is your image" },
                        { "inlineData": { "mimeType": "image/png", "data": "AAAA" } },
                        { "inlineData": { "mimeType": "image/png", "data": "BBBB" } }
                    ]
                }
            }]
        });
        let uri = GeminiProvider::parse_image_response(&body).unwrap();
        assert_eq!(uri, "data:image/png;base64,AAAA");
    }

    #[test]
    fn test_parse_image_response_defaults_mime() {
        let body = json!({
            "candidates": [{ "content": { "parts": [{ "inlineData": { "data": "AAAA" } }] } }]
        });
        let uri = GeminiProvider::parse_image_response(&body).unwrap();
        assert!(uri.starts_with("data:image/png;base64,"));
    }

    #[test]
    fn test_parse_image_response_without_payload() {
        let body = json!({
            "candidates": [{ "content": { "parts": [{ "text": "I cannot draw that." }] } }]
        });
        let err = GeminiProvider::parse_image_response(&body).unwrap_err();
        assert!(matches!(err, GenerationError::MissingImagePayload));

        let err = GeminiProvider::parse_image_response(&json!({ "candidates": [] })).unwrap_err();
        assert!(matches!(err, GenerationError::MissingImagePayload));
    }

    #[test]
    fn test_http_error_mapping() {
        let err = GeminiProvider::map_http_error(
            reqwest::StatusCode::UNAUTHORIZED,
            "bad key",
            CallKind::Scenario,
        );
        assert!(matches!(err, GenerationError::AuthFailed { .. }));

        let err = GeminiProvider::map_http_error(
            reqwest::StatusCode::TOO_MANY_REQUESTS,
            "slow down",
            CallKind::Image,
        );
        assert!(err.is_image_error());

        let err = GeminiProvider::map_http_error(
            reqwest::StatusCode::INTERNAL_SERVER_ERROR,
            "boom",
            CallKind::Scenario,
        );
        match err {
            GenerationError::ScenarioRequest { message } => {
                assert!(message.contains("500"));
                assert!(message.contains("boom"));
            }
            other => panic!("Expected ScenarioRequest, got {:?}", other),
        }
    }

    #[test]
    fn test_provider_name() {
        assert_eq!(make_provider().name(), "gemini");
    }
}
