//! Error handling for the stencil application.
//! Defines custom error types and results used throughout the application.

use std::io;
use thiserror::Error;

/// Custom error types for stencil operations.
///
/// This enum represents all possible errors that can occur while loading an archetype,
/// resolving its data and rendering its templates.
#[derive(Error, Debug)]
pub enum Error {
    /// Represents errors that occur during file system operations
    #[error("IO error: {0}.")]
    IoError(#[from] io::Error),

    /// Represents errors that occur while rendering file contents
    #[error("Template error: {0}.")]
    MinijinjaError(#[from] minijinja::Error),

    /// Represents errors that occur during template processing
    #[error("Template error: {0}.")]
    TemplateError(String),

    /// Represents errors in the shape of prompts or other configuration values
    #[error("Configuration error: {0}.")]
    ConfigError(String),

    /// The `--prompts` value could not be parsed into an answer set
    #[error("Prompt overrides loading failed: {0}")]
    PromptOverridesError(String),

    /// The archetype configuration file could not be read or parsed
    #[error("Error while importing '{archetype}/{file}': {reason}")]
    ImportError { archetype: String, file: String, reason: String },

    /// One of the archetype `package.json` files could not be read or parsed
    #[error("Failed to read archetype metadata '{path}': {reason}")]
    MetadataError { path: String, reason: String },

    #[error("Path: {path} already exists")]
    DestinationExistsError { path: String },

    #[error("Destination field missing from prompts")]
    MissingDestinationError,

    #[error("Unknown token: '{token}' for path: {path}")]
    UnknownTokenError { token: String, path: String },

    #[error("Forbidden template characters in: '{token}' for path: {path}")]
    ForbiddenTokenError { token: String, path: String },

    /// Two or more templates resolved to the same destination path
    #[error(
        "Encountered {count} file path conflict{} when resolving: {}",
        plural_suffix(.count),
        .paths.join(", ")
    )]
    PathConflictError { count: usize, paths: Vec<String> },

    /// A resolved file name would be written outside the destination directory
    #[error("Resolved path: '{resolved}' for: {path} is outside the destination directory")]
    PathEscapeError { path: String, resolved: String },

    #[error("Source: {path} is not a file or directory")]
    InvalidSourceEntryError { path: String },

    #[error("'{dir}' directory not found at: {path}")]
    TemplatesDirNotFoundError { dir: String, path: String },

    #[error("{path} exists, but is not a directory")]
    TemplatesDirNotADirectoryError { path: String },

    /// Represents errors in processing ignore files
    #[error("Ignore file error: {0}.")]
    IgnoreError(String),

    /// A derivation function failed, aborting data resolution
    #[error("Derivation '{name}' failed: {source}")]
    DerivationError {
        name: String,
        #[source]
        source: Box<Error>,
    },

    /// Represents validation failures in user input or data
    #[error("Validation error: {0}.")]
    ValidationError(String),

    /// Represents failures while interacting with the terminal
    #[error("Prompt error: {0}.")]
    PromptError(String),

    #[error("Template does not exist: {template_dir}")]
    TemplateDoesNotExistsError { template_dir: String },

    /// `npm pack` exited unsuccessfully
    #[error("Downloading '{archetype}' failed: {command} exited with error code: {code}")]
    DownloadError { archetype: String, command: String, code: i32 },

    /// `npm pack` succeeded without naming the archive it wrote
    #[error("Downloading '{archetype}' failed: npm pack produced no archive")]
    MissingArchiveError { archetype: String },

    #[error("Git error: {0}.")]
    Git2Error(#[from] git2::Error),
}

fn plural_suffix(count: &usize) -> &'static str {
    if *count == 1 {
        ""
    } else {
        "s"
    }
}

impl Error {
    /// Process exit code for this error.
    ///
    /// Download failures carry the exit code of the failed command, everything else
    /// exits with 1.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::DownloadError { code, .. } if *code != 0 => *code,
            _ => 1,
        }
    }
}

/// Convenience type alias for Results with Error as the error type.
///
/// # Type Parameters
/// * `T` - The type of the success value
pub type Result<T> = std::result::Result<T, Error>;

/// Default error handler that prints the error and exits the program.
///
/// # Arguments
/// * `err` - The Error to handle
///
/// # Behavior
/// Prints the error message to stderr and exits with the error's exit code
pub fn default_error_handler(err: Error) {
    eprintln!("{}", err);
    std::process::exit(err.exit_code());
}
