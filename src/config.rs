//! Configuration handling for stencil archetypes.
//! This module loads the optional archetype configuration file (`init.json`, `init.yaml`
//! or `init.yml`) and normalizes its prompts and derivations.

use crate::constants::CONFIG_FILES;
use crate::derive::Stage;
use crate::error::{Error, Result};
use crate::renderer::TemplateRenderer;
use indexmap::IndexMap;
use log::debug;
use serde::Deserialize;
use serde_json::Value;
use std::fmt;
use std::io::ErrorKind;
use std::path::Path;
use std::sync::Arc;

/// Validates a raw text answer, returning a message to show the user on failure.
pub type Validator = fn(&str) -> std::result::Result<(), String>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestionKind {
    /// Free text
    #[default]
    Input,
    /// Yes/no
    Confirm,
    /// Single choice among `choices`
    List,
    /// Multiple choices among `choices`
    Checkbox,
}

/// A single prompt question.
#[derive(Clone, Default, Deserialize)]
pub struct Question {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub message: String,
    #[serde(rename = "type", default)]
    pub kind: QuestionKind,
    #[serde(default)]
    pub default: Option<Value>,
    #[serde(default)]
    pub choices: Vec<String>,
    #[serde(skip)]
    pub validate: Option<Validator>,
}

impl fmt::Debug for Question {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Question")
            .field("name", &self.name)
            .field("message", &self.message)
            .field("kind", &self.kind)
            .field("default", &self.default)
            .field("choices", &self.choices)
            .field("validate", &self.validate.is_some())
            .finish()
    }
}

impl Question {
    pub fn new<N: Into<String>, M: Into<String>>(name: N, message: M) -> Self {
        Self { name: name.into(), message: message.into(), ..Self::default() }
    }

    /// Text shown to the user, falling back to the field name.
    pub fn prompt(&self) -> &str {
        if self.message.is_empty() {
            &self.name
        } else {
            &self.message
        }
    }
}

/// Overrides for the built-in destination question.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DestinationOverride {
    pub message: Option<String>,
    pub default: Option<String>,
}

/// Archetype derivations: template strings keyed by name, either one stage or several.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum DerivedConfig {
    Stage(IndexMap<String, String>),
    Stages(Vec<IndexMap<String, String>>),
}

/// Archetype configuration file contents.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ArchetypeConfig {
    /// Either a list of questions or a map from field name to question
    #[serde(default)]
    pub prompts: Option<Value>,
    #[serde(default)]
    pub derived: Option<DerivedConfig>,
    #[serde(default)]
    pub destination: Option<DestinationOverride>,
}

impl ArchetypeConfig {
    /// Normalizes `prompts` into an ordered list of questions.
    ///
    /// Map keys become question names unless the question names itself.
    ///
    /// # Errors
    /// * `Error::ConfigError` if `prompts` is neither a list nor a map, or a question is malformed
    pub fn questions(&self) -> Result<Vec<Question>> {
        match &self.prompts {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(Value::Array(items)) => items.iter().map(parse_question).collect(),
            Some(Value::Object(map)) => map
                .iter()
                .map(|(key, value)| {
                    let mut question = parse_question(value)?;
                    if question.name.is_empty() {
                        question.name = key.clone();
                    }
                    Ok(question)
                })
                .collect(),
            Some(other) => Err(Error::ConfigError(format!(
                "Invalid prompts type: {}",
                value_type(other)
            ))),
        }
    }

    /// Builds derivation stages from `derived`. Each value is rendered as a template
    /// against the data snapshot of its stage.
    pub fn stages(&self, renderer: &Arc<dyn TemplateRenderer>) -> Vec<Stage> {
        let groups: Vec<&IndexMap<String, String>> = match &self.derived {
            None => Vec::new(),
            Some(DerivedConfig::Stage(group)) => vec![group],
            Some(DerivedConfig::Stages(groups)) => groups.iter().collect(),
        };

        groups
            .into_iter()
            .map(|group| {
                group.iter().fold(Stage::new(), |stage, (name, template)| {
                    let renderer = Arc::clone(renderer);
                    let template = template.clone();
                    stage.derive(name.clone(), move |data| {
                        let rendered = renderer.render(&template, &data).map(Value::String);
                        async move { rendered }
                    })
                })
            })
            .collect()
    }
}

fn parse_question(value: &Value) -> Result<Question> {
    serde_json::from_value(value.clone())
        .map_err(|e| Error::ConfigError(format!("Invalid question: {}", e)))
}

fn value_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Parses configuration content as JSON, falling back to YAML.
///
/// # Errors
/// * `Error::ConfigError` if the content is neither valid JSON nor valid YAML
pub fn parse_config(content: &str) -> Result<ArchetypeConfig> {
    if content.trim().is_empty() {
        return Ok(ArchetypeConfig::default());
    }
    match serde_json::from_str(content) {
        Ok(config) => Ok(config),
        Err(_) => serde_yaml::from_str(content)
            .map_err(|e| Error::ConfigError(format!("Invalid configuration format: {}", e))),
    }
}

/// Loads the archetype configuration from `archetype_dir`.
///
/// # Arguments
/// * `archetype_dir` - Root of the extracted archetype
/// * `archetype` - Archetype identifier, used in error messages
///
/// # Returns
/// * `Result<ArchetypeConfig>` - Parsed configuration, empty if no file exists
///
/// # Errors
/// * `Error::ImportError` if a configuration file exists but cannot be read or parsed
pub async fn load_config<P: AsRef<Path>>(
    archetype_dir: P,
    archetype: &str,
) -> Result<ArchetypeConfig> {
    for file in CONFIG_FILES {
        let config_path = archetype_dir.as_ref().join(file);
        let import_error = |reason: String| Error::ImportError {
            archetype: archetype.to_string(),
            file: file.to_string(),
            reason,
        };

        let content = match tokio::fs::read_to_string(&config_path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => continue,
            Err(e) => return Err(import_error(e.to_string())),
        };
        debug!("Loading configuration from {}", config_path.display());
        return parse_config(&content).map_err(|e| import_error(e.to_string()));
    }

    debug!("No configuration file found (tried: {})", CONFIG_FILES.join(", "));
    Ok(ArchetypeConfig::default())
}
