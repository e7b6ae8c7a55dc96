//! Core template processing.
//!
//! A processing run walks the templates directory, drops ignored files, reads and renders
//! the rest, checks that no two templates land on the same destination and finally writes
//! them. Every step must succeed before the next one starts; files already written when a
//! write fails are left in place.

use std::path::{Component, Path, PathBuf};

use futures::stream::{FuturesOrdered, FuturesUnordered, StreamExt};
use indexmap::IndexMap;
use log::debug;
use tokio::fs;
use walkdir::WalkDir;

use crate::derive::Data;
use crate::error::{Error, Result};
use crate::filename::resolve_filename;
use crate::ignore::read_ignore_file;
use crate::renderer::TemplateRenderer;

/// A source file found while walking the templates directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateDescriptor {
    pub source: PathBuf,
    /// `/`-separated path below the templates root, tokens unresolved
    pub relative: String,
}

/// Raw template content paired with its unresolved destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedTemplate {
    pub relative: String,
    pub content: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Content {
    Text(String),
    /// Passed through without rendering
    Binary(Vec<u8>),
}

impl Content {
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Content::Text(text) => text.as_bytes(),
            Content::Binary(bytes) => bytes,
        }
    }
}

/// A fully resolved template, ready to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedTemplate {
    pub dest: PathBuf,
    pub content: Content,
}

/// Renders a templates directory into a destination directory.
pub struct Processor<'a> {
    /// Renderer for file contents
    renderer: &'a dyn TemplateRenderer,
    /// Templates directory
    template_root: PathBuf,
    /// Destination directory, must not exist yet
    output_root: PathBuf,
    /// Data for filename tokens and content expressions
    data: &'a Data,
}

impl<'a> Processor<'a> {
    pub fn new<S: AsRef<Path>, D: AsRef<Path>>(
        renderer: &'a dyn TemplateRenderer,
        template_root: S,
        output_root: D,
        data: &'a Data,
    ) -> Self {
        Self {
            renderer,
            template_root: template_root.as_ref().to_path_buf(),
            output_root: output_root.as_ref().to_path_buf(),
            data,
        }
    }

    /// Reads, renders, validates and writes every template.
    ///
    /// # Returns
    /// * `Result<Vec<RenderedTemplate>>` - Written templates in walk order
    pub async fn process(&self) -> Result<Vec<RenderedTemplate>> {
        let loaded = self.load().await?;
        let rendered = self.render(loaded)?;
        validate(&rendered)?;
        write(&rendered).await?;
        Ok(rendered)
    }

    /// Loads templates without rendering them.
    ///
    /// # Errors
    /// * `Error::DestinationExistsError` if the destination is already present
    /// * `Error::InvalidSourceEntryError` for sources that are neither files nor directories
    pub async fn load(&self) -> Result<Vec<LoadedTemplate>> {
        ensure_output_dir_absent(&self.output_root).await?;

        let mut descriptors = walk(&self.template_root)?;

        if let Some(ignore) = read_ignore_file(&self.template_root).await? {
            descriptors.retain(|descriptor| {
                let keep = descriptor.relative == ignore.name
                    || ignore.rules.accepts(&descriptor.relative);
                if !keep {
                    debug!("Skipping ignored file {}", descriptor.relative);
                }
                keep
            });
        }

        let mut reads: FuturesOrdered<_> = descriptors
            .into_iter()
            .map(|descriptor| async move {
                let content = fs::read(&descriptor.source).await?;
                Ok::<_, Error>(LoadedTemplate { relative: descriptor.relative, content })
            })
            .collect();

        let mut loaded = Vec::new();
        while let Some(template) = reads.next().await {
            loaded.push(template?);
        }
        Ok(loaded)
    }

    /// Resolves destinations and renders contents.
    pub fn render(&self, loaded: Vec<LoadedTemplate>) -> Result<Vec<RenderedTemplate>> {
        loaded.into_iter().map(|template| self.render_template(template)).collect()
    }

    fn render_template(&self, template: LoadedTemplate) -> Result<RenderedTemplate> {
        let resolved = resolve_filename(&template.relative, self.data)?;
        let dest = self.output_root.join(contained_path(&template.relative, &resolved)?);
        debug!("Rendering {} -> {}", template.relative, dest.display());

        let content = render_content(self.renderer, template.content, self.data)?;
        Ok(RenderedTemplate { dest, content })
    }
}

/// Checks that a resolved relative path stays below the destination root.
///
/// # Errors
/// * `Error::PathEscapeError` for absolute paths, `..` components or an empty leading segment
pub fn contained_path<'r>(relative: &str, resolved: &'r str) -> Result<&'r Path> {
    let escape = || Error::PathEscapeError {
        path: relative.to_string(),
        resolved: resolved.to_string(),
    };

    if resolved.is_empty() || resolved.starts_with('/') || resolved.starts_with('\\') {
        return Err(escape());
    }
    let path = Path::new(resolved);
    let escapes = path
        .components()
        .any(|c| matches!(c, Component::RootDir | Component::Prefix(_) | Component::ParentDir));
    if escapes {
        return Err(escape());
    }
    Ok(path)
}

/// Renders text content; binary content is returned untouched.
///
/// Content is binary when it is not valid UTF-8 or contains a NUL byte.
pub fn render_content(
    renderer: &dyn TemplateRenderer,
    content: Vec<u8>,
    data: &Data,
) -> Result<Content> {
    match String::from_utf8(content) {
        Ok(text) if !text.contains('\0') => Ok(Content::Text(renderer.render(&text, data)?)),
        Ok(text) => Ok(Content::Binary(text.into_bytes())),
        Err(e) => Ok(Content::Binary(e.into_bytes())),
    }
}

/// Ensures the destination does not exist yet.
pub async fn ensure_output_dir_absent<P: AsRef<Path>>(output_root: P) -> Result<()> {
    let output_root = output_root.as_ref();
    match fs::metadata(output_root).await {
        Ok(_) => Err(Error::DestinationExistsError { path: output_root.display().to_string() }),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(Error::IoError(e)),
    }
}

/// Lists every file under `template_root` in a stable order.
///
/// A missing templates directory yields no templates.
pub fn walk<P: AsRef<Path>>(template_root: P) -> Result<Vec<TemplateDescriptor>> {
    let template_root = template_root.as_ref();
    if !template_root.exists() {
        debug!("Templates directory {} does not exist", template_root.display());
        return Ok(Vec::new());
    }

    let mut descriptors = Vec::new();
    for entry in WalkDir::new(template_root).follow_links(false).sort_by_file_name() {
        let entry = entry.map_err(|e| Error::IoError(e.into()))?;
        let file_type = entry.file_type();
        if file_type.is_dir() {
            continue;
        }
        if !file_type.is_file() {
            return Err(Error::InvalidSourceEntryError { path: entry.path().display().to_string() });
        }

        let relative = entry
            .path()
            .strip_prefix(template_root)
            .map_err(|e| Error::TemplateError(e.to_string()))?;
        let relative = relative
            .components()
            .map(|c| {
                c.as_os_str().to_str().ok_or_else(|| {
                    Error::TemplateError(format!("Invalid path: {}", entry.path().display()))
                })
            })
            .collect::<Result<Vec<_>>>()?
            .join("/");

        descriptors.push(TemplateDescriptor { source: entry.path().to_path_buf(), relative });
    }
    Ok(descriptors)
}

/// Checks that every destination path is unique.
///
/// # Errors
/// * `Error::PathConflictError` listing each conflicting path once
pub fn validate(rendered: &[RenderedTemplate]) -> Result<()> {
    let mut counts: IndexMap<&Path, usize> = IndexMap::new();
    for template in rendered {
        *counts.entry(template.dest.as_path()).or_insert(0) += 1;
    }

    let paths: Vec<String> = counts
        .into_iter()
        .filter(|(_, count)| *count > 1)
        .map(|(path, _)| path.display().to_string())
        .collect();

    if paths.is_empty() {
        Ok(())
    } else {
        Err(Error::PathConflictError { count: paths.len(), paths })
    }
}

/// Writes every rendered template, creating parent directories as needed.
pub async fn write(rendered: &[RenderedTemplate]) -> Result<()> {
    let mut writes: FuturesUnordered<_> = rendered.iter().map(write_template).collect();
    while let Some(result) = writes.next().await {
        result?;
    }
    Ok(())
}

async fn write_template(template: &RenderedTemplate) -> Result<()> {
    if let Some(parent) = template.dest.parent() {
        fs::create_dir_all(parent).await?;
    }
    fs::write(&template.dest, template.content.as_bytes()).await?;
    Ok(())
}
