//! Command-line interface implementation

use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::process::ExitCode;

use crate::run::{run_project, Mode};

const EXIT_SUCCESS: u8 = 0;
const EXIT_ERROR: u8 = 1;
const EXIT_INVALID_ARGS: u8 = 2;

/// gmlforge - build-time asset and code assistant for GameMaker projects
#[derive(Parser)]
#[command(name = "gmlforge")]
#[command(about = "Build-time asset and code assistant for GameMaker projects")]
#[command(version)]
pub struct Cli {
    /// Project root directory (the character folder containing config.ini)
    pub root: PathBuf,

    /// Which half of the pipeline to run
    #[arg(long, value_enum, default_value_t = ModeArg::All)]
    pub mode: ModeArg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    /// Scripts and animations
    All,
    /// Only parse and export animations
    Anims,
    /// Only process scripts
    Scripts,
}

impl From<ModeArg> for Mode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::All => Mode::All,
            ModeArg::Anims => Mode::Anims,
            ModeArg::Scripts => Mode::Scripts,
        }
    }
}

/// Run the CLI application
pub async fn run() -> ExitCode {
    let cli = Cli::parse();

    if !cli.root.is_dir() {
        eprintln!("Error: '{}' is not a directory", cli.root.display());
        return ExitCode::from(EXIT_INVALID_ARGS);
    }
    if !cli.root.join("config.ini").exists() {
        eprintln!(
            "Error: '{}' does not look like a character root (no config.ini)",
            cli.root.display()
        );
        return ExitCode::from(EXIT_INVALID_ARGS);
    }

    match run_project(&cli.root, cli.mode.into()).await {
        Ok(outcome) if outcome.first_run => {
            println!(
                "First time setup: an `assistant` folder was created.\n\
                 Edit `assistant/gmlforge.toml`, then run again."
            );
            ExitCode::from(EXIT_SUCCESS)
        }
        Ok(outcome) if outcome.is_success() => {
            println!(
                "Processed {} scripts, found {} anims, supplied {} sprites",
                outcome.scripts_processed, outcome.anims_found, outcome.sprites_supplied
            );
            ExitCode::from(EXIT_SUCCESS)
        }
        Ok(outcome) => {
            eprintln!(
                "Error: completed with {} failed exports and {} failed script saves",
                outcome.exports_failed, outcome.script_saves_failed
            );
            ExitCode::from(EXIT_ERROR)
        }
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::from(EXIT_ERROR)
        }
    }
}
