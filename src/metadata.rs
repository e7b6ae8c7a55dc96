//! Archetype package metadata exposed to templates as `archetype.package` and
//! `archetype.devPackage`.

use std::io::ErrorKind;
use std::path::Path;

use serde_json::{json, Value};

use crate::constants::{DEV_PACKAGE_FILE, PACKAGE_FILE};
use crate::error::{Error, Result};

/// Reads `package.json` and `dev/package.json` from the archetype root.
///
/// Missing files yield empty objects.
///
/// # Errors
/// * `Error::MetadataError` if a file exists but cannot be read or is not valid JSON
pub async fn read_archetype_metadata<P: AsRef<Path>>(archetype_dir: P) -> Result<Value> {
    let package_path = archetype_dir.as_ref().join(PACKAGE_FILE);
    let dev_package_path = archetype_dir.as_ref().join(DEV_PACKAGE_FILE);
    let (package, dev_package) =
        tokio::try_join!(read_package(&package_path), read_package(&dev_package_path))?;

    Ok(json!({
        "package": package,
        "devPackage": dev_package,
    }))
}

async fn read_package(path: &Path) -> Result<Value> {
    let metadata_error = |reason: String| Error::MetadataError {
        path: path.display().to_string(),
        reason,
    };

    match tokio::fs::read_to_string(path).await {
        Ok(content) => serde_json::from_str(&content).map_err(|e| metadata_error(e.to_string())),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(json!({})),
        Err(e) => Err(metadata_error(e.to_string())),
    }
}
