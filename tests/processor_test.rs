use std::fs;
use std::path::Path;

use serde_json::{json, Value};
use stencil::{
    derive::Data,
    error::Error,
    processor::{
        contained_path, ensure_output_dir_absent, render_content, validate, walk, Content,
        LoadedTemplate, Processor, RenderedTemplate,
    },
    renderer::{MiniJinjaRenderer, RenderConfig},
};
use tempfile::TempDir;

fn renderer() -> MiniJinjaRenderer {
    MiniJinjaRenderer::new(&RenderConfig::default()).unwrap()
}

fn data(value: Value) -> Data {
    value.as_object().unwrap().clone()
}

fn write_tree(root: &Path, files: &[(&str, &[u8])]) {
    for (path, content) in files {
        let path = root.join(path);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }
}

fn basic_tree(root: &Path) {
    write_tree(
        root,
        &[
            (
                "src/index.js",
                b"var <%= codeName %> = require(\"./<%= code %>.js\");\n\nmodule.exports[<%= codeName %>] = <%= codeName %>;\n",
            ),
            ("src/{{code}}.js", b"module.exports = {\n  greeting: \"Hello <%= username %>\"\n};"),
            ("README.md", b"# Basic Tests\n\nThese files test interpolation for file names and contents.\n"),
            ("{{text}}.md", b"<%= username %>'s very own file\n"),
        ],
    );
}

#[tokio::test]
async fn test_ensure_output_dir_absent() {
    let temp_dir = TempDir::new().unwrap();
    assert!(ensure_output_dir_absent(temp_dir.path().join("new_dir")).await.is_ok());

    match ensure_output_dir_absent(temp_dir.path()).await {
        Err(Error::DestinationExistsError { path }) => {
            assert_eq!(path, temp_dir.path().display().to_string())
        }
        other => panic!("Expected DestinationExistsError, got {:?}", other),
    }
}

#[tokio::test]
async fn test_existing_destination_fails_before_reading() {
    let temp_dir = TempDir::new().unwrap();
    let src = temp_dir.path().join("src");
    let dest = temp_dir.path().join("dest");
    write_tree(&src, &[("{{missing}}.txt", b"never rendered")]);
    fs::create_dir_all(&dest).unwrap();

    let renderer = renderer();
    let data = Data::new();
    let err = Processor::new(&renderer, &src, &dest, &data).process().await.unwrap_err();
    assert!(err.to_string().contains("already exists"));
    assert_eq!(fs::read_dir(&dest).unwrap().count(), 0);
}

#[tokio::test]
async fn test_nonexistent_templates_directory() {
    let temp_dir = TempDir::new().unwrap();
    let renderer = renderer();
    let data = Data::new();
    let processor = Processor::new(
        &renderer,
        temp_dir.path().join("nonexistent-dir"),
        temp_dir.path().join("nonexistent-dir-dest"),
        &data,
    );
    assert!(processor.process().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_empty_templates_directory() {
    let temp_dir = TempDir::new().unwrap();
    let src = temp_dir.path().join("empty-dir");
    fs::create_dir_all(src.join("another-empty-dir")).unwrap();

    let renderer = renderer();
    let data = Data::new();
    let processor = Processor::new(&renderer, &src, temp_dir.path().join("empty-dir-dest"), &data);
    assert!(processor.process().await.unwrap().is_empty());
}

#[test]
fn test_walk_lists_files_in_order() {
    let temp_dir = TempDir::new().unwrap();
    write_tree(temp_dir.path(), &[("b.txt", b""), ("a/z.txt", b""), ("a/y/x.txt", b"")]);

    let relative: Vec<String> =
        walk(temp_dir.path()).unwrap().into_iter().map(|d| d.relative).collect();
    assert_eq!(relative, vec!["a/y/x.txt", "a/z.txt", "b.txt"]);
}

#[cfg(unix)]
#[test]
fn test_walk_rejects_symlinks() {
    let temp_dir = TempDir::new().unwrap();
    write_tree(temp_dir.path(), &[("real.txt", b"real")]);
    std::os::unix::fs::symlink(temp_dir.path().join("real.txt"), temp_dir.path().join("link.txt"))
        .unwrap();

    match walk(temp_dir.path()) {
        Err(Error::InvalidSourceEntryError { path }) => assert!(path.ends_with("link.txt")),
        other => panic!("Expected InvalidSourceEntryError, got {:?}", other),
    }
}

#[tokio::test]
async fn test_ignore_file_filters_templates() {
    let temp_dir = TempDir::new().unwrap();
    let src = temp_dir.path().join("src");
    let dest = temp_dir.path().join("dest");
    write_tree(
        &src,
        &[
            ("{{gitignore}}", b"coverage"),
            ("COPY.txt", b"Should be copied"),
            ("coverage/NO_COPY.txt", b"Should not be copied"),
        ],
    );

    let renderer = renderer();
    let data = data(json!({ "gitignore": ".gitignore" }));
    Processor::new(&renderer, &src, &dest, &data).process().await.unwrap();

    assert_eq!(fs::read_to_string(dest.join(".gitignore")).unwrap(), "coverage");
    assert_eq!(fs::read_to_string(dest.join("COPY.txt")).unwrap(), "Should be copied");
    assert!(!dest.join("coverage").exists());
}

#[tokio::test]
async fn test_plain_ignore_file_is_copied() {
    let temp_dir = TempDir::new().unwrap();
    let src = temp_dir.path().join("src");
    let dest = temp_dir.path().join("dest");
    write_tree(
        &src,
        &[(".gitignore", b"*\n"), ("COPY.txt", b"Should not be copied either")],
    );

    let renderer = renderer();
    let data = Data::new();
    let written = Processor::new(&renderer, &src, &dest, &data).process().await.unwrap();

    assert_eq!(written.len(), 1);
    assert_eq!(fs::read_to_string(dest.join(".gitignore")).unwrap(), "*\n");
    assert!(!dest.join("COPY.txt").exists());
}

#[tokio::test]
async fn test_missing_data_value() {
    let temp_dir = TempDir::new().unwrap();
    let src = temp_dir.path().join("basic");
    basic_tree(&src);

    let renderer = renderer();
    let data = data(json!({ "code": "the-codez", "codeName": "TheCodez", "username": "Billy" }));
    let err = Processor::new(&renderer, &src, temp_dir.path().join("dest"), &data)
        .process()
        .await
        .unwrap_err();

    let message = err.to_string();
    assert!(message.contains("Unknown"));
    assert!(message.contains("text"));
    assert!(!temp_dir.path().join("dest").exists());
}

#[tokio::test]
async fn test_file_name_expansion_clash() {
    let temp_dir = TempDir::new().unwrap();
    let src = temp_dir.path().join("basic");
    basic_tree(&src);

    let renderer = renderer();
    let data = data(json!({
        "code": "the-codez",
        "codeName": "TheCodez",
        "text": "README",
        "username": "Billy"
    }));
    let err = Processor::new(&renderer, &src, temp_dir.path().join("dest"), &data)
        .process()
        .await
        .unwrap_err();

    let message = err.to_string();
    assert!(message.contains("Encountered 1 file path conflict when resolving"));
    assert!(message.contains("README"));
    assert!(!temp_dir.path().join("dest").exists());
}

#[test]
fn test_validate_counts_conflicts() {
    let template = |dest: &str| RenderedTemplate {
        dest: dest.into(),
        content: Content::Text(String::new()),
    };

    assert!(validate(&[template("dest/a"), template("dest/b")]).is_ok());

    let err = validate(&[
        template("dest/.gitignore"),
        template("dest/.npmignore"),
        template("dest/.gitignore"),
        template("dest/.npmignore"),
        template("dest/.npmignore"),
    ])
    .unwrap_err();
    match &err {
        Error::PathConflictError { count, paths } => {
            assert_eq!(*count, 2);
            assert_eq!(paths, &vec!["dest/.gitignore".to_string(), "dest/.npmignore".to_string()]);
        }
        other => panic!("Expected PathConflictError, got {:?}", other),
    }
    assert!(err.to_string().starts_with("Encountered 2 file path conflicts when resolving:"));
}

#[test_log::test(tokio::test)]
async fn test_writes_out_correct_templates() {
    let temp_dir = TempDir::new().unwrap();
    let src = temp_dir.path().join("basic");
    let dest = temp_dir.path().join("basic-dest");
    let expected = temp_dir.path().join("expected");
    basic_tree(&src);
    write_tree(
        &expected,
        &[
            (
                "src/index.js",
                b"var TheCodez = require(\"./the-codez.js\");\n\nmodule.exports[TheCodez] = TheCodez;\n",
            ),
            ("src/the-codez.js", b"module.exports = {\n  greeting: \"Hello Billy\"\n};"),
            ("README.md", b"# Basic Tests\n\nThese files test interpolation for file names and contents.\n"),
            ("the-textz.md", b"Billy's very own file\n"),
        ],
    );

    let renderer = renderer();
    let data = data(json!({
        "code": "the-codez",
        "codeName": "TheCodez",
        "text": "the-textz",
        "username": "Billy"
    }));
    let written = Processor::new(&renderer, &src, &dest, &data).process().await.unwrap();

    assert_eq!(written.len(), 4);
    assert_eq!(written[0].dest, dest.join("README.md"));
    assert!(!dir_diff::is_different(&dest, &expected).unwrap());
}

#[tokio::test]
async fn test_binary_content_passes_through() {
    let temp_dir = TempDir::new().unwrap();
    let src = temp_dir.path().join("src");
    let dest = temp_dir.path().join("dest");
    let png: &[u8] = &[0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a, 0x00, b'<', b'%', b'=', 0xff];
    write_tree(
        &src,
        &[
            ("image.png", png),
            ("{{fileName}}.svg", b"<svg><text>static</text></svg>\n"),
            ("from-template.svg", b"<svg style=\"fill:<%= fillColor %>;\"></svg>\n"),
        ],
    );

    let renderer = renderer();
    let data = data(json!({ "fileName": "svg-file", "fillColor": "#993300" }));
    Processor::new(&renderer, &src, &dest, &data).process().await.unwrap();

    assert_eq!(fs::read(dest.join("image.png")).unwrap(), png);
    assert_eq!(
        fs::read_to_string(dest.join("svg-file.svg")).unwrap(),
        "<svg><text>static</text></svg>\n"
    );
    assert_eq!(
        fs::read_to_string(dest.join("from-template.svg")).unwrap(),
        "<svg style=\"fill:#993300;\"></svg>\n"
    );
}

#[test]
fn test_render_content_detects_binary() {
    let renderer = renderer();
    let data = data(json!({ "name": "x" }));

    assert_eq!(
        render_content(&renderer, b"<%= name %>".to_vec(), &data).unwrap(),
        Content::Text("x".to_string())
    );
    assert_eq!(
        render_content(&renderer, vec![0xff, 0xfe], &data).unwrap(),
        Content::Binary(vec![0xff, 0xfe])
    );
    assert_eq!(
        render_content(&renderer, b"a\0<%= name %>".to_vec(), &data).unwrap(),
        Content::Binary(b"a\0<%= name %>".to_vec())
    );
}

#[tokio::test]
async fn test_chester() {
    let temp_dir = TempDir::new().unwrap();
    let src = temp_dir.path().join("src");
    let dest = temp_dir.path().join("dest");
    write_tree(
        &src,
        &[
            ("{{name}}.txt", b"A <%= name %>."),
            ("{{name}}-capitalized.txt", b"A <%= name|capitalize %>."),
        ],
    );

    let renderer = renderer();
    let data = data(json!({ "name": "chester" }));
    Processor::new(&renderer, &src, &dest, &data).process().await.unwrap();

    assert_eq!(fs::read_to_string(dest.join("chester.txt")).unwrap(), "A chester.");
    assert_eq!(
        fs::read_to_string(dest.join("chester-capitalized.txt")).unwrap(),
        "A Chester."
    );
}

#[test]
fn test_contained_path() {
    assert_eq!(contained_path("{{a}}.txt", "a.txt").unwrap(), Path::new("a.txt"));
    assert_eq!(contained_path("{{a}}/b.txt", "a/b.txt").unwrap(), Path::new("a/b.txt"));
    assert!(contained_path("{{a}}/b.txt", "a/./b.txt").is_ok());

    for resolved in ["", "/a.txt", "/tmp/outside/b.txt", "../c.txt", "a/../../c.txt", "a/.."] {
        match contained_path("{{x}}", resolved) {
            Err(Error::PathEscapeError { path, resolved: escaped }) => {
                assert_eq!(path, "{{x}}");
                assert_eq!(escaped, resolved);
            }
            other => panic!("Expected PathEscapeError for {:?}, got {:?}", resolved, other),
        }
    }
}

#[test]
fn test_render_keeps_destinations_inside_output_root() {
    let temp_dir = TempDir::new().unwrap();
    let dest = temp_dir.path().join("dest");
    let outside = temp_dir.path().join("outside");

    let renderer = renderer();
    let data = data(json!({
        "name": "",
        "abs": outside.display().to_string(),
        "up": "..",
        "ok": "inside"
    }));
    let processor = Processor::new(&renderer, temp_dir.path().join("src"), &dest, &data);
    let template = |relative: &str| LoadedTemplate {
        relative: relative.to_string(),
        content: b"content".to_vec(),
    };

    let rendered = processor.render(vec![template("{{ok}}/a.txt")]).unwrap();
    assert_eq!(rendered[0].dest, dest.join("inside/a.txt"));
    assert!(rendered[0].dest.starts_with(&dest));

    assert!(matches!(
        processor.render(vec![template("{{name}}/a.txt")]),
        Err(Error::UnknownTokenError { .. })
    ));
    assert!(matches!(
        processor.render(vec![template("{{abs}}/b.txt")]),
        Err(Error::PathEscapeError { .. })
    ));
    assert!(matches!(
        processor.render(vec![template("nested/{{up}}/{{up}}/c.txt")]),
        Err(Error::PathEscapeError { .. })
    ));
}

#[tokio::test]
async fn test_escaping_token_writes_nothing() {
    let temp_dir = TempDir::new().unwrap();
    let src = temp_dir.path().join("src");
    let dest = temp_dir.path().join("dest");
    let outside = temp_dir.path().join("outside");
    write_tree(&src, &[("README.md", b"readme"), ("{{abs}}/b.txt", b"escaped")]);

    let renderer = renderer();
    let data = data(json!({ "abs": outside.display().to_string() }));
    let err = Processor::new(&renderer, &src, &dest, &data).process().await.unwrap_err();

    assert!(err.to_string().contains("is outside the destination directory"));
    assert!(!dest.exists());
    assert!(!outside.exists());
}
