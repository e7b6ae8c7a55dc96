use std::fs;

use serde_json::json;
use stencil::{error::Error, metadata::read_archetype_metadata};
use tempfile::TempDir;

#[tokio::test]
async fn test_missing_packages() {
    let temp_dir = TempDir::new().unwrap();
    let metadata = read_archetype_metadata(temp_dir.path()).await.unwrap();
    assert_eq!(metadata, json!({ "package": {}, "devPackage": {} }));
}

#[tokio::test]
async fn test_reads_both_packages() {
    let temp_dir = TempDir::new().unwrap();
    fs::create_dir_all(temp_dir.path().join("dev")).unwrap();
    fs::write(
        temp_dir.path().join("package.json"),
        r#"{ "name": "mock-archetype", "version": "1.2.3" }"#,
    )
    .unwrap();
    fs::write(
        temp_dir.path().join("dev/package.json"),
        r#"{ "name": "mock-archetype-dev", "version": "1.2.3" }"#,
    )
    .unwrap();

    let metadata = read_archetype_metadata(temp_dir.path()).await.unwrap();
    assert_eq!(metadata["package"]["name"], "mock-archetype");
    assert_eq!(metadata["package"]["version"], "1.2.3");
    assert_eq!(metadata["devPackage"]["name"], "mock-archetype-dev");
}

#[tokio::test]
async fn test_invalid_package() {
    let temp_dir = TempDir::new().unwrap();
    fs::write(temp_dir.path().join("package.json"), "{ not json").unwrap();

    match read_archetype_metadata(temp_dir.path()).await {
        Err(Error::MetadataError { path, .. }) => assert!(path.ends_with("package.json")),
        other => panic!("Expected MetadataError, got {:?}", other),
    }
}
