//! stencil's main application entry point.
//! Parses the command line, configures logging and runs the init pipeline.

use stencil::{
    cli::get_args,
    error::default_error_handler,
    init::{run, InitOptions},
    prompt::DialoguerPrompter,
};

/// Main application entry point.
#[tokio::main(flavor = "current_thread")]
async fn main() {
    let args = get_args();

    // Logger configuration
    env_logger::Builder::new()
        .filter_level(if args.verbose { log::LevelFilter::Trace } else { log::LevelFilter::Off })
        .init();

    let options = InitOptions::from(args);
    let prompter = DialoguerPrompter::new();

    if let Err(err) = run(&options, &prompter).await {
        default_error_handler(err);
    }
}
