//! File and directory ignore pattern handling for stencil templates.
//! This module reads the ignore file at the top of a templates directory and compiles
//! its git-ignore style rules, so ignored sources never become output files.

use crate::constants::IGNORE_FILES;
use crate::error::{Error, Result};
use globset::{GlobBuilder, GlobMatcher};
use log::debug;
use std::path::Path;

#[derive(Debug, Clone)]
struct Rule {
    matcher: GlobMatcher,
    negated: bool,
    dir_only: bool,
}

/// Compiled ignore rules. An empty rule set accepts every path.
#[derive(Debug, Clone, Default)]
pub struct IgnoreRules {
    rules: Vec<Rule>,
}

/// An ignore file found in a templates directory.
#[derive(Debug, Clone)]
pub struct IgnoreFile {
    /// File name relative to the templates directory
    pub name: String,
    pub rules: IgnoreRules,
}

impl IgnoreRules {
    /// Compiles ignore rules from the contents of an ignore file.
    ///
    /// # Notes
    /// - Blank lines and lines starting with `#` are skipped
    /// - A leading `!` re-includes paths excluded by earlier rules
    /// - A trailing `/` restricts the rule to directories
    /// - Patterns containing `/` are anchored to the templates root, others match at any depth
    ///
    /// # Example
    /// ```ignore
    /// # Contents of {{gitignore}}:
    /// coverage/
    /// *.log
    /// !keep.log
    /// ```
    pub fn parse(contents: &str) -> Result<Self> {
        let mut rules = Vec::new();
        for line in contents.lines() {
            let line = line.trim_end();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let (negated, pattern) = match line.strip_prefix('!') {
                Some(rest) => (true, rest),
                None => (false, line),
            };
            let (dir_only, pattern) = match pattern.strip_suffix('/') {
                Some(rest) => (true, rest),
                None => (false, pattern),
            };
            if pattern.is_empty() {
                continue;
            }

            let glob = if pattern.contains('/') {
                pattern.trim_start_matches('/').to_string()
            } else {
                format!("**/{}", pattern)
            };
            let matcher = GlobBuilder::new(&glob)
                .literal_separator(true)
                .build()
                .map_err(|e| Error::IgnoreError(format!("ignore file loading failed: {}", e)))?
                .compile_matcher();

            rules.push(Rule { matcher, negated, dir_only });
        }
        Ok(Self { rules })
    }

    /// Returns whether `path` (relative, `/`-separated) should be kept.
    ///
    /// A path inside an ignored directory is never kept, whatever later rules say.
    pub fn accepts(&self, path: &str) -> bool {
        if self.rules.is_empty() {
            return true;
        }
        let parts: Vec<&str> = path.split('/').filter(|p| !p.is_empty()).collect();
        for depth in 1..parts.len() {
            if self.is_ignored(&parts[..depth].join("/"), true) {
                return false;
            }
        }
        !self.is_ignored(&parts.join("/"), false)
    }

    fn is_ignored(&self, path: &str, is_dir: bool) -> bool {
        let mut ignored = false;
        for rule in &self.rules {
            if rule.dir_only && !is_dir {
                continue;
            }
            if rule.matcher.is_match(path) {
                ignored = !rule.negated;
            }
        }
        ignored
    }
}

/// Reads the first ignore file present at the top of `templates_dir`.
///
/// # Returns
/// * `Result<Option<IgnoreFile>>` - `None` when no ignore file exists
pub async fn read_ignore_file<P: AsRef<Path>>(templates_dir: P) -> Result<Option<IgnoreFile>> {
    let templates_dir = templates_dir.as_ref();
    for name in IGNORE_FILES {
        let path = templates_dir.join(name);
        match tokio::fs::read(&path).await {
            Ok(contents) => {
                debug!("Loading ignore rules from {}", path.display());
                let rules = IgnoreRules::parse(&String::from_utf8_lossy(&contents))?;
                return Ok(Some(IgnoreFile { name: name.to_string(), rules }));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
            Err(e) => return Err(Error::IoError(e)),
        }
    }
    debug!("No ignore file in {}", templates_dir.display());
    Ok(None)
}
