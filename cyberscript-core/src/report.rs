//! Plain-text report export.
//!
//! `format_report` produces the clipboard template: title and threat actor,
//! overview, one line per step, sample logs, flow diagram, and mitigation.
//! Embedded text is copied verbatim, without escaping.

use std::path::Path;

use crate::error::Result;
use crate::types::AttackScenario;

/// Destination for an exported report (the OS clipboard in the CLI).
pub trait ReportSink {
    fn write_text(&mut self, text: &str) -> Result<()>;
}

/// Sink that keeps the last written text in memory.
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    pub contents: Option<String>,
}

impl ReportSink for MemorySink {
    fn write_text(&mut self, text: &str) -> Result<()> {
        self.contents = Some(text.to_string());
        Ok(())
    }
}

/// Serialize a scenario into the fixed plain-text report template.
pub fn format_report(scenario: &AttackScenario) -> String {
    let steps = scenario
        .steps
        .iter()
        .enumerate()
        .map(|(i, s)| format!("Step {}: {} ({}) - {}", i + 1, s.title, s.phase, s.description))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "CYBERSCRIPT STORYBOARD: {}\n\
         THREAT ACTOR: {}\n\
         \n\
         OVERVIEW:\n\
         {}\n\
         \n\
         ATTACK STORYBOARD:\n\
         {}\n\
         \n\
         SAMPLE LOGS:\n\
         {}\n\
         \n\
         ATTACK FLOW DIAGRAM:\n\
         {}\n\
         \n\
         MITIGATION & LESSONS:\n\
         {}\n",
        scenario.attack_vector,
        scenario.threat_actor,
        scenario.summary,
        steps,
        scenario.sample_logs,
        scenario.attack_flow_diagram,
        scenario.mitigation_lessons,
    )
}

/// Write the plain-text report to `path`.
pub fn write_report_file(path: &Path, scenario: &AttackScenario) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, format_report(scenario))?;
    Ok(())
}

/// Pretty JSON export of the full scenario, images included.
pub fn to_json(scenario: &AttackScenario) -> Result<String> {
    Ok(serde_json::to_string_pretty(scenario)?)
}
