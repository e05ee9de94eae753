//! Core build logic
//!
//! Everything here is driven through [`project::Project`]; process spawning
//! and filesystem primitives live in [`crate::infra`].
//!
//! # Submodules
//!
//! - [`identity`] - Artifact name resolution
//! - [`dependency`] - Dependency nodes and their capabilities
//! - [`graph`] - Graph expansion, ordering and availability pruning
//! - [`project`] - Artifact registry and build orchestration
//! - [`layout`] - Project root, build and conf directories
//! - [`reporter`] - Build event channels and presets
//! - [`artifacts`] - Concrete artifact kinds
//! - [`manifest`] - Manifest (bld.toml) parsing

pub mod artifacts;
pub mod dependency;
pub mod graph;
pub mod identity;
pub mod layout;
pub mod manifest;
pub mod project;
pub mod reporter;
