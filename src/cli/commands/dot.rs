//! CLI implementation for `bld dot`

use anyhow::Result;

use super::Session;

/// Print the Graphviz rendering of the requested graph
pub fn execute(session: &Session, names: &[String]) -> Result<()> {
    let project = session.open()?;
    let requests = project.resolve_all(names)?;
    print!("{}", project.graph(&requests)?.to_dot());
    Ok(())
}
