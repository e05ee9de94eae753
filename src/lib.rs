//! bld - dependency-ordered builds for mixed Java and native projects
//!
//! This library resolves named artifacts into a dependency graph, decides
//! which optional artifacts the host supports, and drives each artifact's
//! build, clean or run action in dependency order.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`cli`] - Command-line interface parsing and output formatting
//! - [`core`] - Identities, graph engine, project registry and artifact kinds
//! - [`infra`] - Infrastructure layer (filesystem, processes)
//! - [`config`] - Configuration and constants
//! - [`error`] - Error types and handling

pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod infra;

#[cfg(test)]
pub mod test_utils;
