//! Structured-output schema for scenario generation and the decode step that
//! turns the model's JSON into an `AttackScenario`.
//!
//! The remote payload is trusted only as far as the declared schema: every
//! field is required and must be a string (or, for `steps`, an array of step
//! objects). Anything else is a `GenerationError::ScenarioParse`.

use chrono::Utc;
use serde::Deserialize;
use serde_json::{Value, json};
use uuid::Uuid;

use crate::error::GenerationError;
use crate::types::{AttackScenario, AttackStep};

/// Fields every scenario response must carry.
pub const SCENARIO_REQUIRED_FIELDS: [&str; 7] = [
    "threatActor",
    "attackVector",
    "summary",
    "steps",
    "sampleLogs",
    "attackFlowDiagram",
    "mitigationLessons",
];

/// Fields every step object must carry.
pub const STEP_REQUIRED_FIELDS: [&str; 5] = [
    "phase",
    "title",
    "description",
    "mitreTechnique",
    "visualPrompt",
];

/// Strict response schema for structured scenario output.
pub fn scenario_response_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "threatActor": { "type": "STRING", "description": "Threat actor type" },
            "attackVector": { "type": "STRING", "description": "Main vector/Title" },
            "summary": { "type": "STRING", "description": "OVERVIEW section content" },
            "steps": {
                "type": "ARRAY",
                "description": "ATTACK STORYBOARD section (Phased steps)",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "phase": { "type": "STRING" },
                        "title": { "type": "STRING" },
                        "description": { "type": "STRING" },
                        "mitreTechnique": { "type": "STRING" },
                        "visualPrompt": { "type": "STRING" }
                    },
                    "required": STEP_REQUIRED_FIELDS
                }
            },
            "sampleLogs": { "type": "STRING", "description": "SAMPLE LOGS section content" },
            "attackFlowDiagram": { "type": "STRING", "description": "ATTACK FLOW DIAGRAM section content" },
            "mitigationLessons": { "type": "STRING", "description": "MITIGATION & LESSONS section content" }
        },
        "required": SCENARIO_REQUIRED_FIELDS
    })
}

/// Scenario exactly as the model returns it.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawScenario {
    pub threat_actor: String,
    pub attack_vector: String,
    pub summary: String,
    pub steps: Vec<RawStep>,
    pub sample_logs: String,
    pub attack_flow_diagram: String,
    pub mitigation_lessons: String,
}

/// One step exactly as the model returns it.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawStep {
    pub phase: String,
    pub title: String,
    pub description: String,
    pub mitre_technique: String,
    pub visual_prompt: String,
}

impl RawScenario {
    /// Assign fresh identifiers and a timestamp. Step order is preserved.
    pub fn into_scenario(self) -> AttackScenario {
        AttackScenario {
            id: Uuid::new_v4().to_string(),
            attack_vector: self.attack_vector,
            threat_actor: self.threat_actor,
            summary: self.summary,
            steps: self
                .steps
                .into_iter()
                .map(|s| {
                    AttackStep::new(
                        s.phase,
                        s.title,
                        s.description,
                        s.mitre_technique,
                        s.visual_prompt,
                    )
                })
                .collect(),
            timestamp: Utc::now(),
            sample_logs: self.sample_logs,
            attack_flow_diagram: self.attack_flow_diagram,
            mitigation_lessons: self.mitigation_lessons,
        }
    }
}

/// Decode the model's JSON text into a scenario skeleton.
pub fn decode_scenario(text: &str) -> Result<AttackScenario, GenerationError> {
    let trimmed = strip_code_fence(text.trim());
    if trimmed.is_empty() {
        return Err(GenerationError::ScenarioParse {
            message: "empty response text".to_string(),
        });
    }
    let raw: RawScenario =
        serde_json::from_str(trimmed).map_err(|e| GenerationError::ScenarioParse {
            message: e.to_string(),
        })?;
    Ok(raw.into_scenario())
}

/// Some models wrap JSON output in a markdown fence even in JSON mode.
fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}
