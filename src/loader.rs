//! Archetype loading.
//! Archetypes come from a local directory, a git repository cloned with git2, or any
//! other source `npm pack` understands (registry names, `user/repo`, tarballs).
use crate::error::{Error, Result};
use log::debug;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tokio::process::Command;
use url::Url;

/// Represents the source location of an archetype.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArchetypeSource {
    /// Local filesystem directory, used in place
    FileSystem(PathBuf),
    /// Git repository URL (HTTPS, git or SSH) with an optional `#ref` to check out
    Git { url: String, reference: Option<String> },
    /// Anything `npm pack` resolves
    Package(String),
}

impl std::fmt::Display for ArchetypeSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ArchetypeSource::FileSystem(path) => write!(f, "local path: '{}'", path.display()),
            ArchetypeSource::Git { url, reference: None } => write!(f, "git repository: '{url}'"),
            ArchetypeSource::Git { url, reference: Some(reference) } => {
                write!(f, "git repository: '{url}' at '{reference}'")
            }
            ArchetypeSource::Package(name) => write!(f, "package: '{name}'"),
        }
    }
}

impl ArchetypeSource {
    /// Classifies an archetype identifier.
    ///
    /// # Arguments
    /// * `s` - Directory path, git URL or package specifier
    ///
    /// # Errors
    /// * `Error::TemplateDoesNotExistsError` for explicit paths (`./`, `../`, `/`) that don't exist
    pub fn from_string(s: &str) -> Result<Self> {
        if is_git_url(s) {
            let (url, reference) = split_reference(s.trim_start_matches("git+"));
            return Ok(Self::Git {
                url: normalize_git_url(url),
                reference: reference.map(str::to_string),
            });
        }

        let path = Path::new(s);
        if path.is_dir() {
            return Ok(Self::FileSystem(path.to_path_buf()));
        }
        let explicit_path = s.starts_with("./") || s.starts_with("../") || path.is_absolute();
        if explicit_path && !path.exists() {
            return Err(Error::TemplateDoesNotExistsError { template_dir: s.to_string() });
        }

        Ok(Self::Package(s.to_string()))
    }
}

/// Checks whether `s` looks like a git repository URL.
pub fn is_git_url(s: &str) -> bool {
    if s.starts_with("git@") || s.starts_with("git+") || s.starts_with("git://") {
        return true;
    }
    match Url::parse(s) {
        Ok(url) => match url.scheme() {
            "ssh" => true,
            "https" | "http" => url.path().ends_with(".git"),
            _ => false,
        },
        Err(_) => false,
    }
}

/// Splits a trailing `#ref` (branch, tag or commit) off a git URL.
pub fn split_reference(url: &str) -> (&str, Option<&str>) {
    match url.rsplit_once('#') {
        Some((url, reference)) if !reference.is_empty() => (url, Some(reference)),
        Some((url, _)) => (url, None),
        None => (url, None),
    }
}

/// Rewrites `ssh://user@host:path` into the scp form `user@host:path`.
///
/// `ssh://` URLs with a numeric port or a `/`-separated path are left as they are.
pub fn normalize_git_url(url: &str) -> String {
    if let Some(rest) = url.strip_prefix("ssh://") {
        if let Some((authority, path)) = rest.split_once(':') {
            let is_port = path.starts_with(|c: char| c.is_ascii_digit());
            if !authority.contains('/') && !is_port {
                return format!("{}:{}", authority, path);
            }
        }
    }
    url.to_string()
}

/// A loaded archetype. Downloaded archetypes live in a temporary directory that is
/// removed when this value is dropped.
#[derive(Debug)]
pub struct Archetype {
    /// Identifier as given by the user
    pub name: String,
    /// Root of the archetype contents
    pub root: PathBuf,
    _workdir: Option<TempDir>,
}

/// Loads an archetype from its identifier.
pub async fn load_archetype(archetype: &str) -> Result<Archetype> {
    let source = ArchetypeSource::from_string(archetype)?;
    debug!("Using archetype from the {}", source);

    match source {
        ArchetypeSource::FileSystem(root) => {
            Ok(Archetype { name: archetype.to_string(), root, _workdir: None })
        }
        ArchetypeSource::Git { url, reference } => {
            let workdir = TempDir::new()?;
            let root = workdir.path().join("package");
            clone_repository(&url, reference.as_deref(), &root)?;
            Ok(Archetype { name: archetype.to_string(), root, _workdir: Some(workdir) })
        }
        ArchetypeSource::Package(name) => {
            let workdir = TempDir::new()?;
            let tarball = npm_pack(&name, workdir.path()).await?;
            let root = workdir.path().join("package");
            extract_tarball(&name, &tarball, &root).await?;
            Ok(Archetype { name: archetype.to_string(), root, _workdir: Some(workdir) })
        }
    }
}

fn clone_repository(repo: &str, reference: Option<&str>, clone_path: &Path) -> Result<()> {
    debug!("Cloning '{}' to '{}'.", repo, clone_path.display());

    let mut callbacks = git2::RemoteCallbacks::new();
    callbacks.credentials(|_url, username_from_url, _allowed_types| {
        git2::Cred::ssh_key_from_agent(username_from_url.unwrap_or("git"))
    });

    let mut fetch_opts = git2::FetchOptions::new();
    fetch_opts.remote_callbacks(callbacks);

    let mut builder = git2::build::RepoBuilder::new();
    builder.fetch_options(fetch_opts);
    let repository = builder.clone(repo, clone_path)?;

    if let Some(reference) = reference {
        checkout_reference(&repository, reference)?;
    }
    Ok(())
}

/// Checks out `reference` (local name, remote branch, tag or commit) with a detached HEAD.
fn checkout_reference(repository: &git2::Repository, reference: &str) -> Result<()> {
    debug!("Checking out '{}'.", reference);
    let object = repository
        .revparse_single(reference)
        .or_else(|_| repository.revparse_single(&format!("origin/{}", reference)))?;
    let commit = object.peel_to_commit()?;

    let mut checkout = git2::build::CheckoutBuilder::new();
    checkout.force();
    repository.checkout_tree(commit.as_object(), Some(&mut checkout))?;
    repository.set_head_detached(commit.id())?;
    Ok(())
}

/// Runs `npm pack` in `workdir` and returns the path of the produced tarball.
async fn npm_pack(name: &str, workdir: &Path) -> Result<PathBuf> {
    debug!("Running npm pack for '{}'.", name);
    let output = Command::new("npm").args(["pack", name]).current_dir(workdir).output().await?;

    if !output.status.success() {
        return Err(Error::DownloadError {
            archetype: name.to_string(),
            command: "npm pack".to_string(),
            code: output.status.code().unwrap_or(1),
        });
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let tarball = stdout
        .lines()
        .rev()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .ok_or_else(|| Error::MissingArchiveError { archetype: name.to_string() })?;
    Ok(workdir.join(tarball))
}

/// Extracts `tarball` into `root`, dropping the archive's top-level directory.
async fn extract_tarball(name: &str, tarball: &Path, root: &Path) -> Result<()> {
    tokio::fs::create_dir_all(root).await?;
    let status = Command::new("tar")
        .arg("-xzf")
        .arg(tarball)
        .arg("--strip-components=1")
        .arg("-C")
        .arg(root)
        .status()
        .await?;

    if !status.success() {
        return Err(Error::DownloadError {
            archetype: name.to_string(),
            command: "tar".to_string(),
            code: status.code().unwrap_or(1),
        });
    }
    Ok(())
}
