//! Single-run driver: resolve input, generate, then print, save, and copy.

use std::collections::HashMap;
use std::io::{IsTerminal, Read, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use cyberscript_core::config::AppConfig;
use cyberscript_core::image::save_step_images;
use cyberscript_core::providers::{StoryboardProvider, create_provider};
use cyberscript_core::report::{ReportSink, to_json, write_report_file};
use cyberscript_core::types::{AttackScenario, Complexity};
use cyberscript_core::StoryboardController;
use tracing::{info, warn};

use crate::callback::TerminalCallback;
use crate::clipboard::ClipboardSink;
use crate::form::{FormInput, prompt_form};
use crate::render::{RenderOptions, render_view};

/// Options for one storyboard run, as given on the command line.
#[derive(Debug, Clone, Default)]
pub(crate) struct RunRequest {
    pub description: Option<String>,
    pub complexity: Option<Complexity>,
    pub copy: bool,
    pub output: Option<PathBuf>,
    pub json: bool,
    pub quiet: bool,
}

/// Run one storyboard generation against the configured provider.
pub(crate) async fn run_storyboard(request: RunRequest, config: AppConfig) -> anyhow::Result<()> {
    let input = resolve_input(&request, &config)?;
    let provider = create_provider(&config.generation)?;
    let mut sink = ClipboardSink::new();
    let mut stdout = std::io::stdout();
    execute(input, &request, &config, provider, &mut sink, &mut stdout).await?;
    Ok(())
}

/// Description and complexity from the arguments, the interactive form, or stdin.
fn resolve_input(request: &RunRequest, config: &AppConfig) -> anyhow::Result<FormInput> {
    let complexity = request
        .complexity
        .unwrap_or(config.ui.default_complexity);
    if let Some(description) = &request.description {
        return Ok(FormInput {
            description: description.clone(),
            complexity,
        });
    }
    if std::io::stdin().is_terminal() {
        return prompt_form(complexity);
    }
    let mut description = String::new();
    std::io::stdin()
        .read_to_string(&mut description)
        .context("Failed to read target description from stdin")?;
    Ok(FormInput {
        description,
        complexity,
    })
}

/// Generate a storyboard and emit every requested output.
pub(crate) async fn execute(
    input: FormInput,
    request: &RunRequest,
    config: &AppConfig,
    provider: Arc<dyn StoryboardProvider>,
    sink: &mut dyn ReportSink,
    out: &mut dyn Write,
) -> anyhow::Result<AttackScenario> {
    let callback = Arc::new(TerminalCallback::new(config.ui.color, request.quiet));
    let controller = StoryboardController::new(provider, callback);

    let scenario = controller
        .generate(&input.description, input.complexity)
        .await?
        .context("Storyboard run was superseded")?;

    let mut opts = RenderOptions {
        color: config.ui.color,
        ..RenderOptions::default()
    };
    if let Some(dir) = &config.ui.image_dir {
        let saved = save_step_images(&scenario, dir)
            .with_context(|| format!("Failed to save step images to {}", dir.display()))?;
        info!(count = saved.len(), dir = %dir.display(), "Saved step images");
        opts.image_paths = saved.into_iter().collect::<HashMap<_, _>>();
    }

    if request.json {
        writeln!(out, "{}", to_json(&scenario)?)?;
    } else {
        write!(out, "{}", render_view(&controller.state(), &opts))?;
    }

    if let Some(path) = &request.output {
        write_report_file(path, &scenario)
            .with_context(|| format!("Failed to write report to {}", path.display()))?;
        info!(path = %path.display(), "Wrote report");
    }

    if request.copy {
        // The report is already printed; a missing clipboard is not a failure.
        if let Err(e) = controller.copy_report(sink).await {
            warn!(error = %e, "Failed to copy report");
            eprintln!("Could not copy report to clipboard: {}", e);
        }
    }

    Ok(scenario)
}
