use std::error::Error;

// Commit sha and dirty flag for `bld --version`
fn main() -> Result<(), Box<dyn Error>> {
    let git = vergen_gitcl::GitclBuilder::default()
        .sha(true)
        .dirty(true)
        .build()?;
    vergen_gitcl::Emitter::default()
        .add_instructions(&git)?
        .emit()?;
    Ok(())
}
