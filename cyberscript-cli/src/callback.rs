//! TerminalCallback: prints controller progress to stderr.
//!
//! Stdout is reserved for the final report (or JSON), so progress lines and
//! alerts never interleave with piped output.

use std::io::Write;
use std::sync::Mutex;

use cyberscript_core::controller::StoryboardCallback;
use cyberscript_core::error::GenerationError;
use cyberscript_core::types::{AttackScenario, AttackStep, ViewStatus};

use crate::render::{header_status, reference_line};

pub(crate) struct TerminalCallback {
    color: bool,
    quiet: bool,
    /// Id of the last scenario announced.
    announced: Mutex<Option<String>>,
}

impl TerminalCallback {
    pub(crate) fn new(color: bool, quiet: bool) -> Self {
        Self {
            color,
            quiet,
            announced: Mutex::new(None),
        }
    }

    fn line(&self, code: &str, label: &str, text: &str) {
        if self.quiet {
            return;
        }
        let mut err = std::io::stderr().lock();
        let _ = if self.color {
            writeln!(err, "{}[{}]\x1b[0m {}", code, label, text)
        } else {
            writeln!(err, "[{}] {}", label, text)
        };
    }
}

#[async_trait::async_trait]
impl StoryboardCallback for TerminalCallback {
    async fn on_status_change(&self, status: ViewStatus) {
        let generating = matches!(
            status,
            ViewStatus::GeneratingText | ViewStatus::GeneratingImages
        );
        self.line(
            "\x1b[90m",
            header_status(generating),
            &status.to_string(),
        );
    }

    async fn on_scenario_update(&self, scenario: &AttackScenario) {
        let is_new = {
            let mut announced = self.announced.lock().unwrap_or_else(|e| e.into_inner());
            if announced.as_deref() == Some(scenario.id.as_str()) {
                false
            } else {
                *announced = Some(scenario.id.clone());
                true
            }
        };
        if is_new {
            self.line(
                "\x1b[36m",
                &reference_line(scenario),
                &format!("{} ({} steps)", scenario.attack_vector, scenario.steps.len()),
            );
        }
    }

    async fn on_step_image_start(&self, index: usize, step: &AttackStep) {
        self.line(
            "\x1b[33m",
            &format!("STEP {}", index + 1),
            &format!("Generating Scene {}... ({})", index + 1, step.title),
        );
    }

    async fn on_step_image_ready(&self, index: usize, _step: &AttackStep) {
        self.line("\x1b[32m", &format!("STEP {}", index + 1), "image ready");
    }

    async fn on_image_failed(&self, index: usize, _error: &GenerationError) {
        self.line(
            "\x1b[90m",
            &format!("STEP {}", index + 1),
            "Visual representation pending",
        );
    }

    async fn on_alert(&self, message: &str) {
        // Alerts are shown even in quiet mode.
        if self.color {
            eprintln!("\x1b[1;31m!\x1b[0m {}", message);
        } else {
            eprintln!("! {}", message);
        }
    }
}
