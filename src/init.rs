//! The run pipeline: load an archetype, resolve its data and render its templates.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::debug;
use serde_json::Value;

use crate::answers::{resolve_answers, Defaults};
use crate::config::load_config;
use crate::constants::{ARCHETYPE_FIELD, DEFAULT_TEMPLATES_DIR, DESTINATION_FIELD, SCRIPT_NAME};
use crate::derive::{Data, Stage};
use crate::error::{Error, Result};
use crate::loader::load_archetype;
use crate::metadata::read_archetype_metadata;
use crate::processor::{Processor, RenderedTemplate};
use crate::prompt::Prompter;
use crate::renderer::{MiniJinjaRenderer, RenderConfig, TemplateRenderer};

/// Options for a single run.
#[derive(Debug, Clone)]
pub struct InitOptions {
    /// Archetype identifier (path, git URL or package specifier)
    pub archetype: String,
    /// Raw non-interactive answers
    pub overrides: Option<String>,
    /// Templates directory inside the archetype
    pub templates_dir: String,
    /// Label printed in front of progress messages
    pub script: String,
    /// Delimiters for file contents
    pub render_config: RenderConfig,
}

impl InitOptions {
    pub fn new<S: Into<String>>(archetype: S) -> Self {
        Self {
            archetype: archetype.into(),
            overrides: None,
            templates_dir: DEFAULT_TEMPLATES_DIR.to_string(),
            script: SCRIPT_NAME.to_string(),
            render_config: RenderConfig::default(),
        }
    }
}

/// Derivations every run adds on top of the built-in defaults: archetype metadata and
/// the unprefixed dotfile names older archetypes use as filename tokens.
pub fn archetype_stage<P: AsRef<Path>>(archetype_dir: P) -> Stage {
    let archetype_dir = archetype_dir.as_ref().to_path_buf();
    let stage = Stage::new().derive(ARCHETYPE_FIELD, move |_| {
        let archetype_dir = archetype_dir.clone();
        async move { read_archetype_metadata(&archetype_dir).await }
    });

    ["gitignore", "npmignore", "eslintrc", "npmrc"].into_iter().fold(stage, |stage, name| {
        stage.derive(name, move |data| {
            let value = data.get(&format!("_{}", name)).cloned().unwrap_or(Value::Null);
            async move { Ok(value) }
        })
    })
}

/// Locates the templates directory inside the archetype.
pub fn templates_dir<P: AsRef<Path>>(archetype_dir: P, dir: &str) -> Result<PathBuf> {
    let path = archetype_dir.as_ref().join(dir);
    if !path.exists() {
        return Err(Error::TemplatesDirNotFoundError {
            dir: dir.to_string(),
            path: path.display().to_string(),
        });
    }
    if !path.is_dir() {
        return Err(Error::TemplatesDirNotADirectoryError { path: path.display().to_string() });
    }
    Ok(path)
}

/// Extracts the destination answer, resolved against the current directory.
pub fn destination(data: &Data) -> Result<PathBuf> {
    let destination = data
        .get(DESTINATION_FIELD)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|destination| !destination.is_empty())
        .ok_or(Error::MissingDestinationError)?;

    let destination = PathBuf::from(destination);
    if destination.is_absolute() {
        Ok(destination)
    } else {
        Ok(std::env::current_dir()?.join(destination))
    }
}

fn display_relative(path: &Path) -> String {
    let relative = std::env::current_dir()
        .ok()
        .and_then(|cwd| path.strip_prefix(cwd).ok().map(Path::to_path_buf));
    relative.unwrap_or_else(|| path.to_path_buf()).display().to_string()
}

/// Runs the whole pipeline.
///
/// # Arguments
/// * `options` - Run options
/// * `prompter` - Answer source used when no overrides are given
///
/// # Returns
/// * `Result<Vec<RenderedTemplate>>` - Every written file
///
/// # Flow
/// 1. Loads the archetype
/// 2. Loads its configuration and locates the templates directory
/// 3. Gathers answers and resolves derived values
/// 4. Renders the templates into the destination
pub async fn run(options: &InitOptions, prompter: &dyn Prompter) -> Result<Vec<RenderedTemplate>> {
    let bin = format!("[{}]", options.script);

    let archetype = load_archetype(&options.archetype).await?;
    println!("{} Preparing templates for: {}", bin, archetype.name);

    let config = load_config(&archetype.root, &archetype.name).await?;
    let template_root = templates_dir(&archetype.root, &options.templates_dir)?;

    let renderer: Arc<dyn TemplateRenderer> =
        Arc::new(MiniJinjaRenderer::new(&options.render_config)?);
    let defaults = Defaults { questions: Vec::new(), stages: vec![archetype_stage(&archetype.root)] };

    let data = resolve_answers(
        &config,
        &defaults,
        options.overrides.as_deref(),
        prompter,
        &renderer,
    )
    .await?;
    debug!("Resolved data: {}", Value::Object(data.clone()));

    let output_root = destination(&data)?;
    let processor = Processor::new(renderer.as_ref(), &template_root, &output_root, &data);
    let written = processor.process().await?;

    println!("\n{} Wrote files:", bin);
    for template in &written {
        println!(" - {}", display_relative(&template.dest));
    }
    println!(
        "\n{} New {} project is ready at: {}",
        bin,
        archetype.name,
        display_relative(&output_root)
    );

    Ok(written)
}
