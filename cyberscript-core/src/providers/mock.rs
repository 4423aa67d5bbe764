//! In-memory provider for tests and offline demos.
//!
//! Scenarios are served from a queue; image results are keyed by visual
//! prompt and default to a small valid PNG. Every call is recorded so tests
//! can assert ordering, and image calls for a given prompt can be held open
//! until released.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::sync::Mutex;
use tokio::sync::Notify;

use super::StoryboardProvider;
use crate::error::GenerationError;
use crate::image::encode_data_uri;
use crate::types::{AttackScenario, AttackStep, Complexity};

/// A 1x1 transparent PNG.
pub const TINY_PNG_B64: &str = "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAQAAAC1HAwCAAAAC0lEQVR42mNkYAAAAAYAAjCB0C8AAAAASUVORK5CYII=";

/// One observed provider call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockCall {
    Scenario {
        complexity: Complexity,
        description: String,
    },
    ImageStarted(String),
    ImageFinished(String),
}

enum QueuedScenario {
    Ok(AttackScenario),
    Fail(String),
}

#[derive(Default)]
struct MockState {
    scenarios: VecDeque<QueuedScenario>,
    failing_images: HashMap<String, bool>,
    gates: HashMap<String, Arc<Notify>>,
    calls: Vec<MockCall>,
    images_in_flight: usize,
    max_images_in_flight: usize,
}

/// Queue-driven `StoryboardProvider`.
#[derive(Default)]
pub struct MockStoryboardProvider {
    state: Mutex<MockState>,
}

impl MockStoryboardProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock that serves one scenario with the given step visual prompts.
    pub fn with_scenario(visual_prompts: &[&str]) -> Self {
        let provider = Self::new();
        provider.queue_scenario(Self::scenario_with_prompts(visual_prompts));
        provider
    }

    /// Queue a scenario to be returned by the next `generate_scenario` call.
    pub fn queue_scenario(&self, scenario: AttackScenario) {
        self.lock().scenarios.push_back(QueuedScenario::Ok(scenario));
    }

    /// Queue a transport-style failure for the next `generate_scenario` call.
    pub fn queue_scenario_failure(&self, message: &str) {
        self.lock()
            .scenarios
            .push_back(QueuedScenario::Fail(message.to_string()));
    }

    /// Image calls for `visual_prompt` fail with `MissingImagePayload`
    /// (or `ImageRequest` when `transport` is true).
    pub fn fail_image(&self, visual_prompt: &str, transport: bool) {
        self.lock()
            .failing_images
            .insert(visual_prompt.to_string(), transport);
    }

    /// Hold image calls for `visual_prompt` until the returned handle is notified.
    pub fn hold_image(&self, visual_prompt: &str) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.lock()
            .gates
            .insert(visual_prompt.to_string(), gate.clone());
        gate
    }

    /// All calls observed so far, in order.
    pub fn calls(&self) -> Vec<MockCall> {
        self.lock().calls.clone()
    }

    pub fn scenario_calls(&self) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|c| matches!(c, MockCall::Scenario { .. }))
            .count()
    }

    /// Visual prompts of started image calls, in order.
    pub fn image_prompts(&self) -> Vec<String> {
        self.lock()
            .calls
            .iter()
            .filter_map(|c| match c {
                MockCall::ImageStarted(p) => Some(p.clone()),
                _ => None,
            })
            .collect()
    }

    /// Highest number of image calls that were outstanding at once.
    pub fn max_images_in_flight(&self) -> usize {
        self.lock().max_images_in_flight
    }

    /// Build a scenario whose steps use the given visual prompts.
    pub fn scenario_with_prompts(visual_prompts: &[&str]) -> AttackScenario {
        AttackScenario {
            id: uuid::Uuid::new_v4().to_string(),
            attack_vector: "Mock Attack Vector".to_string(),
            threat_actor: "Mock Threat Actor".to_string(),
            summary: "Mock summary".to_string(),
            steps: visual_prompts
                .iter()
                .enumerate()
                .map(|(i, prompt)| {
                    AttackStep::new(
                        format!("Phase {}", i + 1),
                        format!("Step {}", i + 1),
                        format!("Description {}", i + 1),
                        format!("T{}", 1000 + i),
                        *prompt,
                    )
                })
                .collect(),
            timestamp: chrono::Utc::now(),
            sample_logs: "mock logs".to_string(),
            attack_flow_diagram: "A -> B".to_string(),
            mitigation_lessons: "mock mitigation".to_string(),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl StoryboardProvider for MockStoryboardProvider {
    async fn generate_scenario(
        &self,
        complexity: Complexity,
        description: &str,
    ) -> Result<AttackScenario, GenerationError> {
        let next = {
            let mut state = self.lock();
            state.calls.push(MockCall::Scenario {
                complexity,
                description: description.to_string(),
            });
            state.scenarios.pop_front()
        };
        match next {
            Some(QueuedScenario::Ok(scenario)) => Ok(scenario),
            Some(QueuedScenario::Fail(message)) => Err(GenerationError::ScenarioRequest { message }),
            None => Err(GenerationError::ScenarioRequest {
                message: "no scenario queued in mock provider".to_string(),
            }),
        }
    }

    async fn generate_step_image(&self, visual_prompt: &str) -> Result<String, GenerationError> {
        let (gate, failure) = {
            let mut state = self.lock();
            state
                .calls
                .push(MockCall::ImageStarted(visual_prompt.to_string()));
            state.images_in_flight += 1;
            state.max_images_in_flight = state.max_images_in_flight.max(state.images_in_flight);
            (
                state.gates.get(visual_prompt).cloned(),
                state.failing_images.get(visual_prompt).copied(),
            )
        };

        if let Some(gate) = gate {
            gate.notified().await;
        } else {
            tokio::task::yield_now().await;
        }

        {
            let mut state = self.lock();
            state.images_in_flight -= 1;
            state
                .calls
                .push(MockCall::ImageFinished(visual_prompt.to_string()));
        }

        match failure {
            Some(true) => Err(GenerationError::ImageRequest {
                message: format!("mock transport failure for '{}'", visual_prompt),
            }),
            Some(false) => Err(GenerationError::MissingImagePayload),
            None => Ok(encode_data_uri("image/png", TINY_PNG_B64)),
        }
    }

    fn name(&self) -> &str {
        "mock"
    }
}
