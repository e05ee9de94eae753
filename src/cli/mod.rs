//! Command-line interface module
//!
//! This module handles argument parsing and output formatting.
//! Build logic lives in [`crate::core`].

pub mod commands;
pub mod output;

use std::path::PathBuf;
use std::sync::OnceLock;

use anyhow::Result;
use clap::Parser;

use crate::core::reporter::Preset;
use commands::{Commands, Session};

/// `--version` text, including the commit when the build script recorded one
fn long_version() -> &'static str {
    static VERSION: OnceLock<String> = OnceLock::new();
    VERSION.get_or_init(|| {
        let version = env!("CARGO_PKG_VERSION");
        let sha = option_env!("VERGEN_GIT_SHA")
            .filter(|sha| !sha.is_empty() && *sha != "VERGEN_IDEMPOTENT_OUTPUT");
        match sha {
            Some(sha) if option_env!("VERGEN_GIT_DIRTY") == Some("true") => {
                format!("{version} ({sha}, dirty)")
            }
            Some(sha) => format!("{version} ({sha})"),
            None => version.to_string(),
        }
    })
}

/// bld - build Java archives, native libraries and bindings in dependency order
#[derive(Parser, Debug)]
#[command(name = "bld")]
#[command(author, version, long_version = long_version(), about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Project root (defaults to the current directory)
    #[arg(short = 'C', long, global = true, value_name = "DIR")]
    pub root: Option<PathBuf>,

    /// Enable verbose logging (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Which build events to print
    #[arg(long, global = true, value_name = "PRESET", env = "BLD_REPORTER")]
    pub reporter: Option<Preset>,

    /// Continue with independent artifacts after a failure
    #[arg(short = 'k', long, global = true)]
    pub keep_going: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

impl Cli {
    /// Log filter directive implied by `-q` and `-v`
    pub fn log_level(&self) -> &'static str {
        if self.quiet {
            return "error";
        }
        match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }

    /// Execute the CLI command
    pub fn run(self) -> Result<()> {
        let Some(command) = self.command else {
            // No subcommand provided, show help
            use clap::CommandFactory;
            let mut cmd = Self::command();
            cmd.print_help()?;
            return Ok(());
        };

        let root = match self.root {
            Some(root) => root,
            None => std::env::current_dir()?,
        };
        let reporter = if self.quiet {
            Some(Preset::Quiet)
        } else {
            self.reporter
        };
        let session = Session {
            root,
            reporter,
            keep_going: self.keep_going,
            quiet: self.quiet,
        };
        command.run(&session)
    }
}
