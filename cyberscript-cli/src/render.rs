//! Terminal renderer for the storyboard view.
//!
//! Maps a `ViewState` snapshot to styled terminal text. Rendering is a pure
//! function of the snapshot and the options; nothing here mutates state.

use std::collections::HashMap;
use std::path::PathBuf;

use cyberscript_core::types::{AttackScenario, AttackStep, ViewState};

/// ANSI escape codes for terminal formatting.
mod ansi {
    pub const BOLD_ON: &str = "\x1b[1m";
    pub const DIM_ON: &str = "\x1b[2m";
    pub const ITALIC_ON: &str = "\x1b[3m";
    pub const BLUE: &str = "\x1b[34m";
    pub const CYAN: &str = "\x1b[36m";
    pub const GREEN: &str = "\x1b[32m";
    pub const YELLOW: &str = "\x1b[33m";
    pub const RESET: &str = "\x1b[0m";
}

/// Options controlling how a view is rendered.
#[derive(Debug, Clone)]
pub struct RenderOptions {
    /// Emit ANSI styling.
    pub color: bool,
    /// Wrap width for prose sections.
    pub width: usize,
    /// Files the step images were saved to, by step index.
    pub image_paths: HashMap<usize, PathBuf>,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            color: true,
            width: 88,
            image_paths: HashMap::new(),
        }
    }
}

struct Painter {
    color: bool,
}

impl Painter {
    fn paint(&self, codes: &[&str], text: &str) -> String {
        if !self.color || codes.is_empty() {
            return text.to_string();
        }
        format!("{}{}{}", codes.concat(), text, ansi::RESET)
    }

    fn bold(&self, text: &str) -> String {
        self.paint(&[ansi::BOLD_ON], text)
    }

    fn dim(&self, text: &str) -> String {
        self.paint(&[ansi::DIM_ON], text)
    }

    fn heading(&self, text: &str) -> String {
        self.paint(&[ansi::BOLD_ON, ansi::BLUE], text)
    }
}

/// Status line shown at the top of every render.
pub fn header_status(is_generating: bool) -> &'static str {
    if is_generating {
        "ANALYZING_THREATS..."
    } else {
        "SYSTEM_STATUS: READY"
    }
}

/// `REF_ID: {first id segment} // LVL_{step count}`.
pub fn reference_line(scenario: &AttackScenario) -> String {
    format!(
        "REF_ID: {} // LVL_{}",
        scenario.reference_id(),
        scenario.steps.len()
    )
}

/// Render the full view for `state`.
pub fn render_view(state: &ViewState, opts: &RenderOptions) -> String {
    let p = Painter { color: opts.color };
    let mut out = String::new();

    let status_code = if state.is_generating {
        ansi::YELLOW
    } else {
        ansi::CYAN
    };
    out.push_str(&format!(
        "{}  {}\n",
        p.paint(&[ansi::BOLD_ON, ansi::CYAN], "CyberScript"),
        p.paint(&[status_code], header_status(state.is_generating))
    ));

    match &state.scenario {
        None if state.is_generating => {
            out.push('\n');
            out.push_str(&p.paint(
                &[ansi::BOLD_ON, ansi::ITALIC_ON, ansi::BLUE],
                "Generating Attack Killchain",
            ));
            out.push('\n');
            out.push_str(&p.dim("Compiling Phase Details & Visual Prompts..."));
            out.push('\n');
        }
        None => {
            out.push('\n');
            out.push_str(&p.bold("Target Data Required"));
            out.push('\n');
            out.push_str(&p.dim(
                "Input a target description to initiate the CyberScript threat synthesis engine.",
            ));
            out.push('\n');
        }
        Some(scenario) => {
            out.push_str(&p.dim(&reference_line(scenario)));
            out.push('\n');
            render_scenario(&mut out, scenario, opts, &p);
        }
    }
    out
}

fn render_scenario(out: &mut String, scenario: &AttackScenario, opts: &RenderOptions, p: &Painter) {
    let rule = "─".repeat(opts.width.min(60));

    out.push('\n');
    out.push_str(&p.heading("01 // OVERVIEW"));
    out.push('\n');
    out.push_str(&p.bold(&scenario.attack_vector));
    out.push('\n');
    out.push_str(&p.dim(&format!(
        "THREAT_ACTOR: {}",
        scenario.threat_actor.to_uppercase()
    )));
    out.push_str("\n\n");
    push_wrapped(out, &scenario.summary, opts.width, "");

    out.push('\n');
    out.push_str(&p.heading("02 // ATTACK STORYBOARD (PHASED)"));
    out.push('\n');
    for (index, step) in scenario.steps.iter().enumerate() {
        out.push_str(&p.dim(&rule));
        out.push('\n');
        render_step(out, index, step, opts, p);
    }
    if !scenario.steps.is_empty() {
        out.push_str(&p.dim(&rule));
        out.push('\n');
    }

    out.push('\n');
    out.push_str(&p.heading("03 // SAMPLE LOGS"));
    out.push('\n');
    // Logs are preformatted telemetry; keep their lines intact.
    for line in scenario.sample_logs.lines() {
        out.push_str(&p.paint(&[ansi::GREEN], line));
        out.push('\n');
    }

    out.push('\n');
    out.push_str(&p.heading("04 // ATTACK FLOW DIAGRAM (TEXT)"));
    out.push('\n');
    for line in scenario.attack_flow_diagram.lines() {
        out.push_str(line);
        out.push('\n');
    }

    out.push('\n');
    out.push_str(&p.heading("05 // MITIGATION & LESSONS"));
    out.push('\n');
    push_wrapped(out, &scenario.mitigation_lessons, opts.width, "");
}

/// One step card: badge line, title, description, and the image slot.
fn render_step(out: &mut String, index: usize, step: &AttackStep, opts: &RenderOptions, p: &Painter) {
    out.push_str(&format!(
        "{}  {}  {}\n",
        p.paint(&[ansi::BOLD_ON, ansi::BLUE], &format!("STEP {}", index + 1)),
        p.paint(&[ansi::CYAN], &step.phase.to_uppercase()),
        p.dim(&format!("[{}]", step.mitre_technique)),
    ));
    out.push_str(&p.bold(&step.title));
    out.push('\n');
    push_wrapped(out, &step.description, opts.width, "  ");
    out.push_str(&format!("  {}\n", image_slot(index, step, opts, p)));
}

fn image_slot(index: usize, step: &AttackStep, opts: &RenderOptions, p: &Painter) -> String {
    if step.is_loading_image {
        return p.paint(&[ansi::YELLOW], &format!("Generating Scene {}...", index + 1));
    }
    match (&step.image_url, opts.image_paths.get(&index)) {
        (Some(_), Some(path)) => p.paint(&[ansi::GREEN], &format!("Image: {}", path.display())),
        (Some(url), None) => p.paint(
            &[ansi::GREEN],
            &format!("Image: inline data URI ({} bytes)", url.len()),
        ),
        (None, _) => p.paint(&[ansi::DIM_ON, ansi::ITALIC_ON], "Visual representation pending"),
    }
}

fn push_wrapped(out: &mut String, text: &str, width: usize, indent: &str) {
    let options = textwrap::Options::new(width.max(20))
        .initial_indent(indent)
        .subsequent_indent(indent);
    for paragraph in text.split('\n') {
        if paragraph.trim().is_empty() {
            out.push('\n');
            continue;
        }
        for line in textwrap::wrap(paragraph, &options) {
            out.push_str(&line);
            out.push('\n');
        }
    }
}
