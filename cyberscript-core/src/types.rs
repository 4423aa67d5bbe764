//! Core type definitions for CyberScript.
//!
//! Defines the scenario model (attack scenario and its phased steps), the
//! difficulty tiers, and the view state the controller exposes to front-ends.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

/// Difficulty tier selected by the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Complexity {
    Beginner,
    #[default]
    Intermediate,
    Advanced,
}

impl Complexity {
    /// All tiers, in the order they are offered to the user.
    pub const ALL: [Complexity; 3] = [
        Complexity::Beginner,
        Complexity::Intermediate,
        Complexity::Advanced,
    ];

    /// The label sent to the text model and shown in the form.
    pub fn label(&self) -> &'static str {
        match self {
            Complexity::Beginner => "Beginner",
            Complexity::Intermediate => "Intermediate",
            Complexity::Advanced => "Advanced",
        }
    }
}

impl std::fmt::Display for Complexity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Complexity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "beginner" => Ok(Complexity::Beginner),
            "intermediate" => Ok(Complexity::Intermediate),
            "advanced" => Ok(Complexity::Advanced),
            other => Err(format!(
                "unknown complexity '{}': expected Beginner, Intermediate or Advanced",
                other
            )),
        }
    }
}

/// One phase of the attack kill chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttackStep {
    pub id: String,
    /// Free-text phase label (e.g. "Reconnaissance"). Not constrained to a fixed set.
    pub phase: String,
    pub title: String,
    pub description: String,
    pub mitre_technique: String,
    pub visual_prompt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default)]
    pub is_loading_image: bool,
}

impl AttackStep {
    /// Create a step with a fresh identifier and no image.
    pub fn new(
        phase: impl Into<String>,
        title: impl Into<String>,
        description: impl Into<String>,
        mitre_technique: impl Into<String>,
        visual_prompt: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            phase: phase.into(),
            title: title.into(),
            description: description.into(),
            mitre_technique: mitre_technique.into(),
            visual_prompt: visual_prompt.into(),
            image_url: None,
            is_loading_image: false,
        }
    }

    pub fn has_image(&self) -> bool {
        self.image_url.is_some()
    }
}

/// One complete generated attack narrative plus its phased steps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttackScenario {
    pub id: String,
    pub attack_vector: String,
    pub threat_actor: String,
    pub summary: String,
    /// Kill-chain order. Never reordered after creation.
    pub steps: Vec<AttackStep>,
    pub timestamp: DateTime<Utc>,
    pub sample_logs: String,
    pub attack_flow_diagram: String,
    pub mitigation_lessons: String,
}

impl AttackScenario {
    /// Short reference shown in report headers: the first segment of the id, uppercased.
    pub fn reference_id(&self) -> String {
        self.id
            .split('-')
            .next()
            .unwrap_or_default()
            .to_uppercase()
    }

    /// True once no step has an image request outstanding.
    pub fn settled(&self) -> bool {
        self.steps.iter().all(|s| !s.is_loading_image)
    }

    /// Number of steps that carry a generated image.
    pub fn illustrated_steps(&self) -> usize {
        self.steps.iter().filter(|s| s.has_image()).count()
    }
}

/// Overall view state machine.
///
/// `Idle` → `GeneratingText` → `GeneratingImages` → `IdleWithResult`.
/// A failed text generation returns to `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewStatus {
    #[default]
    Idle,
    GeneratingText,
    GeneratingImages,
    IdleWithResult,
}

impl std::fmt::Display for ViewStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ViewStatus::Idle => write!(f, "idle"),
            ViewStatus::GeneratingText => write!(f, "generating scenario"),
            ViewStatus::GeneratingImages => write!(f, "generating images"),
            ViewStatus::IdleWithResult => write!(f, "complete"),
        }
    }
}

/// Read-only snapshot of the controller's state, handed to presentation code.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ViewState {
    pub status: ViewStatus,
    pub is_generating: bool,
    pub scenario: Option<AttackScenario>,
    /// Token of the run that produced (or is producing) this state. 0 before any run.
    pub run_id: u64,
}
