//! Build command implementation
//!
//! Implements `bld bld [names...]`: builds the named artifacts and their
//! dependencies, or every registered artifact when none are named.

use anyhow::{Context, Result};

use super::Session;
use crate::cli::output::{self, status, SuspendingSink};

/// Execute the build command
pub fn execute(session: &Session, names: &[String]) -> Result<()> {
    let bar = output::create_build_bar(0);
    let project =
        session.open_with(|reporter| Box::new(SuspendingSink::new(reporter, bar.clone())))?;
    let requests = project.resolve_all(names)?;

    let plan = project.plan(&requests)?;
    bar.set_length(plan.order.len() as u64);

    let result = project.build_with(&requests, |node| {
        bar.set_message(node.id().to_string());
        bar.inc(1);
    });
    bar.finish_and_clear();

    let order = result.context("Build failed")?;
    let built = order.iter().filter(|d| d.is_buildable()).count();
    tracing::info!(built, skipped = plan.skipped.len(), "build finished");

    if !session.quiet {
        println!("{} Built {}", status::SUCCESS, output::artifacts(built));
        if !plan.skipped.is_empty() {
            println!(
                "{} Skipped {} unavailable on this host",
                status::WARNING,
                output::artifacts(plan.skipped.len())
            );
        }
    }
    Ok(())
}
