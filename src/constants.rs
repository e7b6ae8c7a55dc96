//! Common constants used throughout the stencil application.

/// Label printed in front of progress messages
pub const SCRIPT_NAME: &str = "stencil";

/// Supported archetype configuration file names, in lookup order
pub const CONFIG_FILES: [&str; 3] = ["init.json", "init.yaml", "init.yml"];

/// Default directory inside an archetype that holds the templates
pub const DEFAULT_TEMPLATES_DIR: &str = "init";

/// Ignore file names recognized at the top of the templates directory, in lookup order.
/// The token forms keep package managers from treating the file as the archetype's own.
pub const IGNORE_FILES: [&str; 3] = ["{{_gitignore}}", "{{gitignore}}", ".gitignore"];

/// Archetype metadata files, relative to the archetype root
pub const PACKAGE_FILE: &str = "package.json";
pub const DEV_PACKAGE_FILE: &str = "dev/package.json";

/// Name of the implicit trailing question
pub const DESTINATION_FIELD: &str = "destination";

/// Key under which archetype metadata is exposed to templates
pub const ARCHETYPE_FIELD: &str = "archetype";
