//! Destination filename resolution.
//!
//! File names use a tiny curly-brace scheme, separate from the content syntax:
//!
//! ```text
//! "{{foo}}.js" + {"foo": "bar"} -> "bar.js"
//! ```

use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::derive::Data;
use crate::error::{Error, Result};

static TOKEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{([^}]+?)\}\}").expect("token pattern is valid"));

/// Resolves every `{{name}}` span in `path` against `data`.
///
/// # Errors
/// * `Error::ForbiddenTokenError` if a token name contains `{{` or `}}`
/// * `Error::UnknownTokenError` if a token name is missing from `data`, `null` or an empty string
pub fn resolve_filename(path: &str, data: &Data) -> Result<String> {
    if path.is_empty() {
        return Ok(String::new());
    }

    let mut failure = None;
    let resolved = TOKEN_RE.replace_all(path, |caps: &Captures| {
        if failure.is_some() {
            return String::new();
        }
        match resolve_token(&caps[1], path, data) {
            Ok(value) => value,
            Err(e) => {
                failure = Some(e);
                String::new()
            }
        }
    });

    match failure {
        Some(e) => Err(e),
        None => Ok(resolved.into_owned()),
    }
}

fn resolve_token(token: &str, path: &str, data: &Data) -> Result<String> {
    if token.contains("{{") || token.contains("}}") {
        return Err(Error::ForbiddenTokenError {
            token: token.to_string(),
            path: path.to_string(),
        });
    }

    match data.get(token) {
        Some(serde_json::Value::String(s)) if !s.is_empty() => Ok(s.clone()),
        Some(serde_json::Value::String(_)) | Some(serde_json::Value::Null) | None => Err(Error::UnknownTokenError {
            token: token.to_string(),
            path: path.to_string(),
        }),
        Some(other) => Ok(other.to_string()),
    }
}
