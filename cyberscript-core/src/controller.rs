//! Storyboard orchestration.
//!
//! `StoryboardController` drives one end-to-end run: validate input, request
//! the scenario, then request one illustration per step, strictly in step
//! order. Partial results are merged into the controller's `ViewState` as
//! they arrive and announced through a `StoryboardCallback`.
//!
//! Every run is tagged with a token. A newer `generate` call supersedes the
//! older one: the older run stops issuing requests and any result it still
//! receives is discarded instead of patching the newer scenario.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use tracing::{debug, error, info, warn};

use crate::error::{GenerationError, Result, ValidationError};
use crate::providers::StoryboardProvider;
use crate::report::{ReportSink, format_report};
use crate::types::{AttackScenario, AttackStep, Complexity, ViewState, ViewStatus};

/// Alert shown when scenario generation fails.
pub const SCENARIO_FAILED_ALERT: &str = "Error generating scenario. Please try again.";

/// Alert shown after the report is copied.
pub const REPORT_COPIED_ALERT: &str = "Full report copied to clipboard!";

/// Receives state changes from the controller. Implemented by front-ends.
#[async_trait]
pub trait StoryboardCallback: Send + Sync {
    /// The overall view status changed.
    async fn on_status_change(&self, status: ViewStatus);

    /// The current scenario was replaced or patched. Receives a full snapshot.
    async fn on_scenario_update(&self, scenario: &AttackScenario);

    /// An image request for step `index` is about to be sent.
    async fn on_step_image_start(&self, _index: usize, _step: &AttackStep) {}

    /// Step `index` received its image.
    async fn on_step_image_ready(&self, _index: usize, _step: &AttackStep) {}

    /// The image request for step `index` failed. The run continues.
    async fn on_image_failed(&self, _index: usize, _error: &GenerationError) {}

    /// A blocking, user-visible message.
    async fn on_alert(&self, message: &str);
}

/// A callback that ignores everything.
pub struct NoOpCallback;

#[async_trait]
impl StoryboardCallback for NoOpCallback {
    async fn on_status_change(&self, _status: ViewStatus) {}
    async fn on_scenario_update(&self, _scenario: &AttackScenario) {}
    async fn on_alert(&self, _message: &str) {}
}

/// Owns the current view state and funnels every mutation through `generate`.
pub struct StoryboardController {
    provider: Arc<dyn StoryboardProvider>,
    callback: Arc<dyn StoryboardCallback>,
    state: Mutex<ViewState>,
    runs: AtomicU64,
}

/// Clears the generating flag when a run ends, however it ends.
struct GeneratingGuard<'a> {
    controller: &'a StoryboardController,
    run: u64,
}

impl Drop for GeneratingGuard<'_> {
    fn drop(&mut self) {
        let mut state = self.controller.lock();
        if state.run_id == self.run {
            state.is_generating = false;
            if matches!(
                state.status,
                ViewStatus::GeneratingText | ViewStatus::GeneratingImages
            ) {
                state.status = if state.scenario.is_some() {
                    ViewStatus::IdleWithResult
                } else {
                    ViewStatus::Idle
                };
            }
        }
    }
}

impl StoryboardController {
    pub fn new(
        provider: Arc<dyn StoryboardProvider>,
        callback: Arc<dyn StoryboardCallback>,
    ) -> Self {
        Self {
            provider,
            callback,
            state: Mutex::new(ViewState::default()),
            runs: AtomicU64::new(0),
        }
    }

    /// Snapshot of the current view state.
    pub fn state(&self) -> ViewState {
        self.lock().clone()
    }

    pub fn current_scenario(&self) -> Option<AttackScenario> {
        self.lock().scenario.clone()
    }

    pub fn is_generating(&self) -> bool {
        self.lock().is_generating
    }

    pub fn status(&self) -> ViewStatus {
        self.lock().status
    }

    /// Run one generation end to end.
    ///
    /// Returns the final scenario, or `Ok(None)` if a newer run superseded
    /// this one before it finished. Per-step image failures are not errors.
    pub async fn generate(
        &self,
        description: &str,
        complexity: Complexity,
    ) -> Result<Option<AttackScenario>> {
        if description.trim().is_empty() {
            let err = ValidationError::EmptyDescription;
            debug!("Rejected empty target description");
            self.callback.on_alert(&err.to_string()).await;
            return Err(err.into());
        }

        let run = self.runs.fetch_add(1, Ordering::SeqCst) + 1;
        let _guard = GeneratingGuard {
            controller: self,
            run,
        };
        {
            let mut state = self.lock();
            state.run_id = run;
            state.is_generating = true;
            state.scenario = None;
            state.status = ViewStatus::GeneratingText;
        }
        info!(
            run,
            complexity = %complexity,
            provider = self.provider.name(),
            "Starting storyboard generation"
        );
        self.callback
            .on_status_change(ViewStatus::GeneratingText)
            .await;

        let scenario = match self.provider.generate_scenario(complexity, description).await {
            Ok(scenario) => scenario,
            Err(e) => {
                if !self.finish_failed_run(run) {
                    debug!(run, error = %e, "Superseded run failed; ignoring");
                    return Ok(None);
                }
                error!(run, error = %e, "Failed to generate scenario");
                self.callback.on_status_change(ViewStatus::Idle).await;
                self.callback.on_alert(SCENARIO_FAILED_ALERT).await;
                return Err(e.into());
            }
        };

        let step_prompts: Vec<String> = scenario
            .steps
            .iter()
            .map(|s| s.visual_prompt.clone())
            .collect();
        info!(
            run,
            scenario_id = scenario.id.as_str(),
            steps = step_prompts.len(),
            "Scenario generated"
        );

        let Some(snapshot) = self.with_current(run, |state| {
            state.scenario = Some(scenario);
            state.status = ViewStatus::GeneratingImages;
        }) else {
            return Ok(None);
        };
        self.callback
            .on_status_change(ViewStatus::GeneratingImages)
            .await;
        self.callback.on_scenario_update(&snapshot).await;

        for (index, prompt) in step_prompts.iter().enumerate() {
            let Some(snapshot) = self.patch_step(run, index, |step| step.is_loading_image = true)
            else {
                return Ok(None);
            };
            self.callback.on_scenario_update(&snapshot).await;
            self.callback
                .on_step_image_start(index, &snapshot.steps[index])
                .await;

            match self.provider.generate_step_image(prompt).await {
                Ok(image_url) => {
                    let Some(snapshot) = self.patch_step(run, index, |step| {
                        step.image_url = Some(image_url);
                        step.is_loading_image = false;
                    }) else {
                        debug!(run, step = index, "Discarding image for superseded run");
                        return Ok(None);
                    };
                    debug!(run, step = index, "Step image ready");
                    self.callback.on_scenario_update(&snapshot).await;
                    self.callback
                        .on_step_image_ready(index, &snapshot.steps[index])
                        .await;
                }
                Err(e) => {
                    warn!(run, step = index, error = %e, "Failed to generate image for step");
                    let Some(snapshot) =
                        self.patch_step(run, index, |step| step.is_loading_image = false)
                    else {
                        return Ok(None);
                    };
                    self.callback.on_scenario_update(&snapshot).await;
                    self.callback.on_image_failed(index, &e).await;
                }
            }
        }

        let Some(finished) = self.with_current(run, |state| {
            state.status = ViewStatus::IdleWithResult;
            state.is_generating = false;
        }) else {
            return Ok(None);
        };
        info!(
            run,
            illustrated = finished.illustrated_steps(),
            steps = finished.steps.len(),
            "Storyboard complete"
        );
        self.callback
            .on_status_change(ViewStatus::IdleWithResult)
            .await;
        Ok(Some(finished))
    }

    /// Write the plain-text report of the current scenario to `sink`.
    ///
    /// Returns `Ok(false)` without touching the sink when there is no scenario.
    pub async fn copy_report(&self, sink: &mut dyn ReportSink) -> Result<bool> {
        let Some(scenario) = self.current_scenario() else {
            return Ok(false);
        };
        sink.write_text(&format_report(&scenario))?;
        info!(scenario_id = scenario.id.as_str(), "Report copied");
        self.callback.on_alert(REPORT_COPIED_ALERT).await;
        Ok(true)
    }

    fn lock(&self) -> MutexGuard<'_, ViewState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Apply `f` if `run` is still current and return the resulting scenario.
    fn with_current(
        &self,
        run: u64,
        f: impl FnOnce(&mut ViewState),
    ) -> Option<AttackScenario> {
        let mut state = self.lock();
        if state.run_id != run {
            return None;
        }
        f(&mut state);
        state.scenario.clone()
    }

    /// Update a single step of the current run's scenario.
    fn patch_step(
        &self,
        run: u64,
        index: usize,
        f: impl FnOnce(&mut AttackStep),
    ) -> Option<AttackScenario> {
        let mut state = self.lock();
        if state.run_id != run {
            return None;
        }
        let step = state.scenario.as_mut()?.steps.get_mut(index)?;
        f(step);
        state.scenario.clone()
    }

    /// Reset to `Idle` after a scenario failure. False if `run` was superseded.
    fn finish_failed_run(&self, run: u64) -> bool {
        let mut state = self.lock();
        if state.run_id != run {
            return false;
        }
        state.scenario = None;
        state.is_generating = false;
        state.status = ViewStatus::Idle;
        true
    }
}

/// A callback that records everything for test assertions.
pub struct RecordingCallback {
    statuses: tokio::sync::Mutex<Vec<ViewStatus>>,
    alerts: tokio::sync::Mutex<Vec<String>>,
    updates: tokio::sync::Mutex<Vec<AttackScenario>>,
    events: tokio::sync::Mutex<Vec<String>>,
}

impl RecordingCallback {
    pub fn new() -> Self {
        Self {
            statuses: tokio::sync::Mutex::new(Vec::new()),
            alerts: tokio::sync::Mutex::new(Vec::new()),
            updates: tokio::sync::Mutex::new(Vec::new()),
            events: tokio::sync::Mutex::new(Vec::new()),
        }
    }

    pub async fn statuses(&self) -> Vec<ViewStatus> {
        self.statuses.lock().await.clone()
    }

    pub async fn alerts(&self) -> Vec<String> {
        self.alerts.lock().await.clone()
    }

    /// Every scenario snapshot the controller published, in order.
    pub async fn updates(&self) -> Vec<AttackScenario> {
        self.updates.lock().await.clone()
    }

    /// Step events as `image_start:N`, `image_ready:N`, `image_failed:N`.
    pub async fn events(&self) -> Vec<String> {
        self.events.lock().await.clone()
    }
}

impl Default for RecordingCallback {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StoryboardCallback for RecordingCallback {
    async fn on_status_change(&self, status: ViewStatus) {
        self.statuses.lock().await.push(status);
    }

    async fn on_scenario_update(&self, scenario: &AttackScenario) {
        self.updates.lock().await.push(scenario.clone());
    }

    async fn on_step_image_start(&self, index: usize, _step: &AttackStep) {
        self.events.lock().await.push(format!("image_start:{}", index));
    }

    async fn on_step_image_ready(&self, index: usize, _step: &AttackStep) {
        self.events.lock().await.push(format!("image_ready:{}", index));
    }

    async fn on_image_failed(&self, index: usize, _error: &GenerationError) {
        self.events.lock().await.push(format!("image_failed:{}", index));
    }

    async fn on_alert(&self, message: &str) {
        self.alerts.lock().await.push(message.to_string());
    }
}
