//! Command-line interface implementation for stencil.
//! Provides argument parsing and help text formatting using clap.

use clap::{error::ErrorKind, CommandFactory, Parser};

use crate::constants::{DEFAULT_TEMPLATES_DIR, SCRIPT_NAME};
use crate::init::InitOptions;

/// Command-line arguments structure for stencil.
#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "stencil: create new projects from archetype packages",
    long_about = None,
    after_help = r#"Archetypes can come from any source `npm pack` understands, a git URL or a local directory:

  (npm)    stencil builder-react-component
  (npm)    stencil builder-react-component@0.1.3
  (github) stencil FormidableLabs/builder-react-component#v0.1.3
  (git)    stencil git+ssh://git@github.com:FormidableLabs/builder-react-component.git#v0.1.3
  (file)   stencil ../builder-react-component"#
)]
pub struct Args {
    /// Archetype to initialize from: package name, git URL or local directory
    #[arg(value_name = "ARCHETYPE")]
    pub archetype: String,

    /// Answers as a JSON object, skipping interactive prompts.
    /// Must include every prompted field, `destination` included.
    #[arg(long, value_name = "JSON")]
    pub prompts: Option<String>,

    /// Directory inside the archetype holding the templates
    #[arg(long, value_name = "DIR", default_value = DEFAULT_TEMPLATES_DIR)]
    pub init_dir: String,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,
}

impl From<Args> for InitOptions {
    fn from(args: Args) -> Self {
        let mut options = InitOptions::new(args.archetype);
        options.overrides = args.prompts;
        options.templates_dir = args.init_dir;
        options.script = SCRIPT_NAME.to_string();
        options
    }
}

/// Parses command line arguments and returns the Args structure.
///
/// # Returns
/// * `Args` - Parsed command line arguments
///
/// # Exits
/// * With status code 1 if required arguments are missing
/// * With clap's default error handling for other argument errors
pub fn get_args() -> Args {
    match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            if e.kind() == ErrorKind::MissingRequiredArgument {
                let _ = Args::command()
                    .help_template(
                        r#"{about-section}
{usage-heading} {usage}

{all-args}
{after-help}
"#,
                    )
                    .print_help();
                std::process::exit(1);
            } else {
                e.exit();
            }
        }
    }
}
