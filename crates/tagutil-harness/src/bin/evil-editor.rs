//! Stand-in editor for tagutil's edit action.
//!
//! Rewrites "Good" to "Bad" in every tag value of the YAML file it is given.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;

/// Scripted editor used by the edit workflow tests
#[derive(Parser, Debug)]
#[command(name = "evil-editor")]
#[command(version)]
struct Cli {
    /// YAML tag list file, rewritten in place
    file: PathBuf,
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    tagutil_harness::edit_file(&cli.file)
        .with_context(|| format!("failed to edit {}", cli.file.display()))
}

fn main() -> ExitCode {
    tagutil_harness::init_stderr_logging();
    let cli = Cli::parse();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("evil-editor: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
