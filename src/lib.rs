//! stencil creates new projects from archetypes.
//! An archetype is a package holding a templates directory and an optional configuration
//! file. stencil gathers answers to the archetype's prompts, derives extra values from
//! them and renders file names and contents into a new destination directory.

/// Prompt orchestration: answers, overrides and derivation stages
pub mod answers;

/// Command-line interface module for the stencil application
pub mod cli;

/// Archetype configuration handling
/// Supports JSON and YAML formats (init.json, init.yaml, init.yml)
pub mod config;

pub mod constants;

/// Staged async derivation of computed values
pub mod derive;

/// Error types and handling for the stencil application
pub mod error;

/// `{{token}}` resolution in destination file names
pub mod filename;

/// File and directory ignore patterns
/// Processes the templates' ignore file to exclude specific paths
pub mod ignore;

/// The complete run pipeline
pub mod init;

/// Archetype acquisition from directories, git and npm
pub mod loader;

/// Archetype `package.json` metadata
pub mod metadata;

/// Core template processing orchestration
/// Walks, filters, renders, validates and writes templates
pub mod processor;

/// User input and interaction handling
pub mod prompt;

/// File content rendering
pub mod renderer;
