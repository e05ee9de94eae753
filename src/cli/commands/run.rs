//! CLI implementation for `bld run`
//!
//! Builds `backend-<backend>` and `example-<example>` with everything they
//! depend on, then launches the example with the ordered class path.

use anyhow::{Context, Result};

use super::Session;

/// Execute the run command
pub fn execute(session: &Session, backend: &str, example: &str, args: &[String]) -> Result<()> {
    let project = session.open()?;
    project
        .run(backend, example, args)
        .with_context(|| format!("Failed to run example '{example}' on backend '{backend}'"))
}
