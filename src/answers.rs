//! Prompt orchestration: gathers answers and layers derived values on top.
//!
//! Resolution order is fixed: answers (prompted or overridden), then the built-in
//! default stage, then caller stages, then archetype stages.

use std::path::Path;
use std::sync::Arc;

use log::debug;
use serde_json::Value;

use crate::config::{ArchetypeConfig, DestinationOverride, Question};
use crate::constants::DESTINATION_FIELD;
use crate::derive::{self, Data, Stage};
use crate::error::{Error, Result};
use crate::prompt::Prompter;
use crate::renderer::TemplateRenderer;

/// Questions and derivation stages supplied by the caller.
#[derive(Debug, Clone, Default)]
pub struct Defaults {
    /// Asked before the archetype's own questions
    pub questions: Vec<Question>,
    /// Resolved after the built-in stage and before the archetype's stages
    pub stages: Vec<Stage>,
}

/// Built-in derivations applied to every run.
///
/// Dotfiles are shipped in archetypes under token names (`{{_gitignore}}`) since package
/// managers would otherwise drop or act on them when packing the archetype.
pub fn default_stage() -> Stage {
    Stage::new()
        .value("_gitignore", ".gitignore")
        .value("_npmignore", ".npmignore")
        .value("_eslintrc", ".eslintrc")
        .value("_npmrc", ".npmrc")
}

/// Parses a non-interactive answer set.
///
/// The value may be wrapped in one pair of single or double quotes.
///
/// # Errors
/// * `Error::PromptOverridesError` if the value is not a JSON object
pub fn parse_overrides(raw: &str) -> Result<Data> {
    let raw = strip_quotes(raw.trim());
    match serde_json::from_str(raw) {
        Ok(Value::Object(answers)) => Ok(answers),
        Ok(other) => {
            Err(Error::PromptOverridesError(format!("expected a JSON object, found: {}", other)))
        }
        Err(e) => Err(Error::PromptOverridesError(e.to_string())),
    }
}

fn strip_quotes(raw: &str) -> &str {
    for quote in ['\'', '"'] {
        if raw.len() >= 2 && raw.starts_with(quote) && raw.ends_with(quote) {
            return &raw[1..raw.len() - 1];
        }
    }
    raw
}

/// Validates the destination directory answer.
pub fn validate_destination(value: &str) -> std::result::Result<(), String> {
    if value.trim().is_empty() {
        return Err("Must specify a destination directory".to_string());
    }
    match Path::new(value).try_exists() {
        Ok(false) => Ok(()),
        Ok(true) => Err(format!("Path: {} already exists", value)),
        Err(e) => Err(format!("Unable to check path {}: {}", value, e)),
    }
}

/// The implicit trailing question asking where to write the project.
pub fn destination_question(overrides: Option<&DestinationOverride>) -> Question {
    let mut question = Question::new(DESTINATION_FIELD, "Destination directory to write");
    if let Some(overrides) = overrides {
        if let Some(message) = &overrides.message {
            question.message = message.clone();
        }
        if let Some(default) = &overrides.default {
            question.default = Some(Value::String(default.clone()));
        }
    }
    question.validate = Some(validate_destination);
    question
}

/// Gathers answers and resolves every derivation stage.
///
/// # Arguments
/// * `config` - Archetype configuration (prompts, derived, destination)
/// * `defaults` - Caller-supplied questions and stages
/// * `overrides` - Raw `--prompts` value; when present nothing is asked interactively
/// * `prompter` - Interactive answer source
/// * `renderer` - Renderer used by the archetype's template derivations
///
/// # Returns
/// * `Result<Data>` - Answers merged with derived values, derived values winning
pub async fn resolve_answers(
    config: &ArchetypeConfig,
    defaults: &Defaults,
    overrides: Option<&str>,
    prompter: &dyn Prompter,
    renderer: &Arc<dyn TemplateRenderer>,
) -> Result<Data> {
    let mut questions = defaults.questions.clone();
    questions.extend(config.questions()?);

    let answers = match overrides {
        Some(raw) => {
            debug!("Using prompt overrides, skipping {} questions", questions.len());
            parse_overrides(raw)?
        }
        None => {
            questions.push(destination_question(config.destination.as_ref()));
            prompter.prompt(&questions)?
        }
    };

    let mut stages = vec![default_stage()];
    stages.extend(defaults.stages.iter().cloned());
    stages.extend(config.stages(renderer));

    derive::resolve(answers, &stages).await
}
