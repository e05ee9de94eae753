//! CLI implementation for `bld clean`
//!
//! Cleans the named artifacts and their dependencies. With no names every
//! artifact is cleaned and the build directory is removed.

use anyhow::{Context, Result};

use super::Session;
use crate::cli::output::{self, status};

/// Execute the clean command
pub fn execute(session: &Session, names: &[String]) -> Result<()> {
    let project = session.open()?;
    let requests = project.resolve_all(names)?;

    let order = project.clean(&requests).context("Clean failed")?;
    let cleaned = order.iter().filter(|d| d.is_buildable()).count();

    if !session.quiet {
        println!("{} Cleaned {}", status::SUCCESS, output::artifacts(cleaned));
        if names.is_empty() {
            println!("  Removed {}/", project.build_path().display());
        }
    }
    Ok(())
}
