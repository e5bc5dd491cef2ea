use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::surfaces::SurfaceKind;

/// rzpchat: chat with your Razorpay account from the terminal.
/// Starts an interactive session by default, or answers a single message.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase message verbosity.
    ///
    /// Specify multiple times for more verbose output:
    ///  -v:  INFO level
    ///  -vv: DEBUG level
    ///  -vvv: TRACE level (most verbose)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to a Rzpchat.toml. Defaults to the nearest one above the current directory.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Print raw Markdown instead of rendering it.
    #[arg(long, global = true)]
    pub plain: bool,

    /// Surface the interactive session opens on.
    #[arg(long, value_enum, default_value_t = SurfaceArg::Auto)]
    pub surface: SurfaceArg,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run one chat command against the Razorpay tools (e.g. "list orders").
    Ask {
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
    },
    /// Ask the Razorpay documentation a question.
    Docs {
        #[arg(required = true, num_args = 1..)]
        question: Vec<String>,
    },
    /// List the tools the MCP server exposes.
    Tools,
    /// Show how a message would be classified, without calling anything.
    Classify {
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceArg {
    Tools,
    Docs,
    Auto,
}

impl From<SurfaceArg> for SurfaceKind {
    fn from(arg: SurfaceArg) -> Self {
        match arg {
            SurfaceArg::Tools => SurfaceKind::Tools,
            SurfaceArg::Docs => SurfaceKind::Docs,
            SurfaceArg::Auto => SurfaceKind::Auto,
        }
    }
}
