//! Content rendering for stencil templates.
//! File contents are rendered with MiniJinja using an ERB-like delimiter set, so that
//! sources containing Jinja, Handlebars or JavaScript template literals are left alone.
use crate::derive::Data;
use crate::error::Result;
use cruet::Inflector;
use minijinja::syntax::SyntaxConfig;
use minijinja::Environment;

/// Trait for template rendering engines.
pub trait TemplateRenderer: Send + Sync {
    /// Renders a template string with the given data.
    ///
    /// # Arguments
    /// * `template` - Template string to render
    /// * `data` - Data mapping exposed to template expressions
    ///
    /// # Returns
    /// * `Result<String>` - Rendered template string
    fn render(&self, template: &str, data: &Data) -> Result<String>;
}

/// Delimiter configuration for the content renderer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderConfig {
    pub variable: (String, String),
    pub block: (String, String),
    pub comment: (String, String),
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            variable: ("<%=".to_string(), "%>".to_string()),
            block: ("<%@".to_string(), "%>".to_string()),
            comment: ("<%#".to_string(), "%>".to_string()),
        }
    }
}

impl RenderConfig {
    /// Longest prefix shared by every start delimiter, used to skip content that
    /// cannot contain any markup.
    fn marker(&self) -> String {
        let starts = [&self.variable.0, &self.block.0, &self.comment.0];
        let first = starts[0];
        let len = starts.iter().fold(first.len(), |len, start| {
            first
                .chars()
                .zip(start.chars())
                .take(len)
                .take_while(|(a, b)| a == b)
                .count()
        });
        first.chars().take(len).collect()
    }
}

/// MiniJinja-based template rendering engine.
pub struct MiniJinjaRenderer {
    /// MiniJinja environment instance
    env: Environment<'static>,
    marker: String,
}

impl MiniJinjaRenderer {
    /// Creates a renderer for the given delimiter configuration.
    ///
    /// # Errors
    /// * `Error::MinijinjaError` if the delimiters are rejected by MiniJinja
    pub fn new(config: &RenderConfig) -> Result<Self> {
        let syntax = SyntaxConfig::builder()
            .variable_delimiters(config.variable.0.clone(), config.variable.1.clone())
            .block_delimiters(config.block.0.clone(), config.block.1.clone())
            .comment_delimiters(config.comment.0.clone(), config.comment.1.clone())
            .build()?;

        let mut env = Environment::new();
        env.set_syntax(syntax);
        env.set_keep_trailing_newline(true);
        register_case_helpers(&mut env);

        Ok(Self { env, marker: config.marker() })
    }
}

fn register_case_helpers(env: &mut Environment<'static>) {
    let helpers: [(&str, fn(String) -> String); 8] = [
        ("capitalize", capitalize),
        ("upper", |s| s.to_uppercase()),
        ("lower", |s| s.to_lowercase()),
        ("camel_case", |s| s.to_camel_case()),
        ("pascal_case", |s| s.to_pascal_case()),
        ("snake_case", |s| s.to_snake_case()),
        ("kebab_case", |s| s.to_kebab_case()),
        ("title_case", |s| s.to_title_case()),
    ];
    for (name, helper) in helpers {
        env.add_function(name, helper);
        env.add_filter(name, helper);
    }
}

/// Upper-cases the first character and lower-cases the rest.
fn capitalize(s: String) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

impl TemplateRenderer for MiniJinjaRenderer {
    /// Renders a template string using MiniJinja.
    ///
    /// Templates without any start delimiter are returned unchanged.
    fn render(&self, template: &str, data: &Data) -> Result<String> {
        if !self.marker.is_empty() && !template.contains(self.marker.as_str()) {
            return Ok(template.to_string());
        }
        Ok(self.env.render_str(template, data)?)
    }
}
