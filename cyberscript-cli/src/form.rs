//! Interactive input form: target description and difficulty level.

use cyberscript_core::types::Complexity;
use dialoguer::{Input, Select};

/// Values collected from the form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct FormInput {
    pub description: String,
    pub complexity: Complexity,
}

/// Prompt for the target description and the difficulty level.
///
/// An empty description is accepted here; the controller rejects it.
pub(crate) fn prompt_form(default_complexity: Complexity) -> anyhow::Result<FormInput> {
    println!("\n  Inquiry Terminal");
    println!("  \"Define the target environment to begin synthesis.\"\n");

    let description: String = Input::new()
        .with_prompt("Target Description")
        .allow_empty(true)
        .interact_text()?;

    let labels: Vec<&str> = Complexity::ALL.iter().map(|c| c.label()).collect();
    let selection = Select::new()
        .with_prompt("Difficulty Level")
        .items(&labels)
        .default(complexity_index(default_complexity))
        .interact()?;

    Ok(FormInput {
        description,
        complexity: Complexity::ALL[selection],
    })
}

/// Position of `complexity` in the selection list.
fn complexity_index(complexity: Complexity) -> usize {
    Complexity::ALL
        .iter()
        .position(|c| *c == complexity)
        .unwrap_or(1)
}
