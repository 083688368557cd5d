//! Application orchestration and command routing.
//!
//! Handles command-line argument parsing and delegates to appropriate command handlers.

use crate::commands::{self, ScopeOverrides};
use crate::config::{RenderMode, SourceKind};
use crate::logging;
use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use std::io;
use std::path::PathBuf;
use std::process;

/// A terminal X-Y oscilloscope with a phosphor-style fading trace
#[derive(Parser)]
#[command(name = "vectorglow")]
#[command(version)]
#[command(about = "A terminal X-Y oscilloscope with a phosphor-style fading trace")]
#[command(long_about = "A terminal X-Y oscilloscope with a phosphor-style fading trace.\n\nThe left channel drives the horizontal axis and the right channel the vertical\naxis. Every sample becomes a point; older points fade out.\n\nDEFAULT COMMAND:\n    If no command is specified, 'run' is used by default.\n    Run options can be used without explicitly saying 'run'.\n\nKEYS:\n    a           toggle vertical alignment (mono collapses to a vertical line)\n    + / - / ↑↓  faster / slower fade\n    m           switch between banded and segment rendering\n    c           clear the trail\n    q / Esc     quit\n    mouse       drag to move the origin, right click to recentre\n\nEXAMPLES:\n    # Scope the default microphone\n    $ vectorglow\n\n    # Scope what the system is playing (Windows)\n    $ vectorglow --source loopback\n\n    # Replay a Lissajous demo file once\n    $ vectorglow --file lissajous.wav --no-loop")]
#[command(
    after_help = "CONFIGURATION:\n    Config file:        ~/.config/vectorglow/vectorglow.toml\n    Logs:               ~/.local/state/vectorglow/vectorglow.log.*"
)]
struct Cli {
    #[command(flatten)]
    run: RunArgs,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Options of the scope, overriding the configuration file.
#[derive(Args, Debug, Clone, Default)]
struct RunArgs {
    /// Capture source
    #[arg(short, long, value_enum)]
    source: Option<SourceKind>,

    /// Device name or ID from `vectorglow list-devices`
    #[arg(short, long, value_name = "DEVICE")]
    device: Option<String>,

    /// WAV file to replay (implies --source file)
    #[arg(short, long, value_name = "FILE")]
    file: Option<PathBuf>,

    /// Restart the file when it ends
    #[arg(long = "loop", overrides_with = "no_loop")]
    looping: bool,

    /// Play the file once
    #[arg(long = "no-loop", overrides_with = "looping")]
    no_loop: bool,

    /// Number of points in the trail
    #[arg(long, value_name = "N")]
    capacity: Option<usize>,

    /// Frames per second
    #[arg(long, value_name = "HZ")]
    refresh_hz: Option<u32>,

    /// Trail rendering mode
    #[arg(short, long, value_enum)]
    mode: Option<RenderMode>,

    /// Start with vertical alignment enabled
    #[arg(short, long)]
    align: bool,
}

impl From<RunArgs> for ScopeOverrides {
    fn from(args: RunArgs) -> Self {
        ScopeOverrides {
            source: args.source,
            device: args.device,
            file: args.file,
            looping: match (args.looping, args.no_loop) {
                (_, true) => Some(false),
                (true, false) => Some(true),
                (false, false) => None,
            },
            capacity: args.capacity,
            refresh_hz: args.refresh_hz,
            mode: args.mode,
            align: args.align,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Show the live trace (default)
    #[command(visible_alias = "r")]
    Run {
        #[command(flatten)]
        args: RunArgs,
    },

    /// List audio devices usable as capture sources
    ///
    /// Shows device IDs, names and default formats for input devices and for
    /// output devices (loopback).
    #[command(name = "list-devices")]
    ListDevices,

    /// Open configuration file in your preferred editor
    ///
    /// Uses $VISUAL or $EDITOR, falling back to nano/vi. The file is validated
    /// after the editor exits.
    #[command(visible_alias = "c")]
    Config,

    /// Show recent log entries from the application
    ///
    /// Display the last 50 lines of the most recent log file.
    Logs,

    /// Generate shell completion script
    ///
    /// Examples:
    ///   vectorglow completions bash > vectorglow.bash
    ///   vectorglow completions zsh > _vectorglow
    ///   vectorglow completions fish > vectorglow.fish
    Completions {
        /// The shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Runs the main application based on command-line arguments.
///
/// # Exit Codes
/// - 0: Success
/// - 1: General error
/// - 2: Usage error (invalid arguments)
///
/// # Errors
/// - If logging initialization fails
/// - If command execution fails
pub async fn run() -> Result<(), anyhow::Error> {
    let cli = Cli::parse();

    // Commands that print to the terminal and need no logging
    match &cli.command {
        Some(Commands::Completions { shell }) => {
            generate(*shell, &mut Cli::command(), "vectorglow", &mut io::stdout());
            return Ok(());
        }
        Some(Commands::ListDevices) => {
            if let Err(e) = commands::handle_list_devices() {
                eprintln!("Error: {e}");
                process::exit(1);
            }
            return Ok(());
        }
        Some(Commands::Logs) => {
            if let Err(e) = commands::handle_logs() {
                eprintln!("Error: {e}");
                process::exit(1);
            }
            return Ok(());
        }
        _ => {}
    }

    logging::init_logging()?;

    match cli.command {
        None => commands::handle_scope(cli.run.into()).await?,
        // Explicit run options take precedence over top-level ones
        Some(Commands::Run { args }) => commands::handle_scope(args.into()).await?,
        Some(Commands::Config) => commands::handle_config()?,
        Some(Commands::Completions { .. }) | Some(Commands::ListDevices) | Some(Commands::Logs) => {
            unreachable!("These commands are handled earlier")
        }
    }

    Ok(())
}
