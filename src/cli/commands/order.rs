//! CLI implementation for `bld order`
//!
//! Prints the order `bld bld` would follow. Artifacts the host cannot build
//! are listed after it, prefixed with `-`.

use std::path::PathBuf;

use anyhow::Result;
use serde::Serialize;

use super::Session;
use crate::core::dependency::DependencyRef;

/// One artifact in the printed order
#[derive(Debug, Serialize)]
pub struct OrderEntry {
    pub name: String,
    pub short_name: String,
    pub full_name: String,
    pub version: String,
    pub path: Option<PathBuf>,
    pub capabilities: Vec<&'static str>,
}

impl From<&DependencyRef> for OrderEntry {
    fn from(node: &DependencyRef) -> Self {
        let id = node.id();
        Self {
            name: id.relative_name().to_string(),
            short_name: id.short_name().to_string(),
            full_name: id.full_name().to_string(),
            version: id.version().to_string(),
            path: id.path().map(std::path::Path::to_path_buf),
            capabilities: node.capabilities(),
        }
    }
}

/// JSON document printed by `bld order --json`
#[derive(Debug, Serialize)]
pub struct OrderReport {
    pub project: String,
    pub order: Vec<OrderEntry>,
    pub skipped: Vec<OrderEntry>,
}

/// Execute the order command
pub fn execute(session: &Session, names: &[String], json: bool) -> Result<()> {
    let project = session.open()?;
    let requests = project.resolve_all(names)?;
    let plan = project.plan(&requests)?;

    if json {
        let report = OrderReport {
            project: project.name().to_string(),
            order: plan.order.iter().map(OrderEntry::from).collect(),
            skipped: plan.skipped.iter().map(OrderEntry::from).collect(),
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    for node in &plan.order {
        println!("{}", node.id());
    }
    for node in &plan.skipped {
        println!("- {}", node.id());
    }
    Ok(())
}
