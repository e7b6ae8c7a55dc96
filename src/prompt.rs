//! User input and interaction handling.
//! Questions are collected through the `Prompter` trait; the terminal implementation
//! is backed by dialoguer.

use crate::config::{Question, QuestionKind};
use crate::derive::Data;
use crate::error::{Error, Result};
use dialoguer::{Confirm, Input, MultiSelect, Select};
use serde_json::Value;

/// Collects answers for a list of questions.
pub trait Prompter {
    /// Asks every question in order.
    ///
    /// # Returns
    /// * `Result<Data>` - Answers keyed by question name
    fn prompt(&self, questions: &[Question]) -> Result<Data>;
}

/// Interactive terminal prompter.
#[derive(Debug, Default)]
pub struct DialoguerPrompter;

impl DialoguerPrompter {
    pub fn new() -> Self {
        Self
    }

    fn ask(&self, question: &Question) -> Result<Value> {
        match question.kind {
            QuestionKind::Input => ask_text(question),
            QuestionKind::Confirm => {
                let default = question.default.as_ref().and_then(Value::as_bool).unwrap_or(false);
                let answer = Confirm::new()
                    .with_prompt(question.prompt())
                    .default(default)
                    .interact()
                    .map_err(prompt_error)?;
                Ok(Value::Bool(answer))
            }
            QuestionKind::List => {
                let selection = Select::new()
                    .with_prompt(question.prompt())
                    .default(single_choice_default(question))
                    .items(&question.choices)
                    .interact()
                    .map_err(prompt_error)?;
                Ok(Value::String(question.choices[selection].clone()))
            }
            QuestionKind::Checkbox => {
                let selections = MultiSelect::new()
                    .with_prompt(question.prompt())
                    .items(&question.choices)
                    .defaults(&multiple_choice_defaults(question))
                    .interact()
                    .map_err(prompt_error)?;
                Ok(Value::Array(
                    selections
                        .into_iter()
                        .map(|index| Value::String(question.choices[index].clone()))
                        .collect(),
                ))
            }
        }
    }
}

fn ask_text(question: &Question) -> Result<Value> {
    let mut input = Input::<String>::new()
        .with_prompt(question.prompt())
        .allow_empty(question.validate.is_none());
    if let Some(default) = text_default(question) {
        input = input.default(default);
    }
    if let Some(validate) = question.validate {
        input = input.validate_with(move |value: &String| validate(value));
    }
    let answer = input.interact_text().map_err(prompt_error)?;
    Ok(Value::String(answer))
}

fn prompt_error(e: dialoguer::Error) -> Error {
    Error::PromptError(e.to_string())
}

impl Prompter for DialoguerPrompter {
    fn prompt(&self, questions: &[Question]) -> Result<Data> {
        let mut answers = Data::new();
        for question in questions {
            let value = self.ask(question)?;
            answers.insert(question.name.clone(), value);
        }
        Ok(answers)
    }
}

/// Text default as shown in the prompt. Non-string defaults use their JSON text.
pub fn text_default(question: &Question) -> Option<String> {
    match &question.default {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s.clone()),
        Some(other) => Some(other.to_string()),
    }
}

/// Index of the default choice, 0 when unset or not among the choices.
pub fn single_choice_default(question: &Question) -> usize {
    question
        .default
        .as_ref()
        .and_then(Value::as_str)
        .and_then(|default| question.choices.iter().position(|choice| choice == default))
        .unwrap_or(0)
}

/// Checked state of each choice, from a default given as a list of choice names.
pub fn multiple_choice_defaults(question: &Question) -> Vec<bool> {
    let defaults: Vec<&str> = question
        .default
        .as_ref()
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();

    question.choices.iter().map(|choice| defaults.contains(&choice.as_str())).collect()
}
