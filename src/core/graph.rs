//! Dependency graph engine
//!
//! Expands a set of root nodes into their transitive closure, computes a
//! build order by repeated leaf extraction, and prunes everything that
//! (transitively) needs an unavailable optional node.
//!
//! The engine is generic over [`GraphNode`]; [`DependencyRef`] is the node
//! type the project uses.

use std::collections::HashSet;
use std::fmt::Write as _;
use std::hash::Hash;
use std::sync::Arc;

use indexmap::{IndexMap, IndexSet};

use crate::core::dependency::DependencyRef;
use crate::error::GraphError;

/// A node the graph engine can walk
pub trait GraphNode: Clone {
    /// Identity of the node; two handles with equal keys are the same node
    type Key: Clone + Eq + Hash;

    fn key(&self) -> Self::Key;

    /// Display name used in cycle reports and DOT output
    fn label(&self) -> String;

    /// Direct dependencies in declaration order
    fn children(&self) -> Vec<Self>;

    /// True for optional nodes that are absent on this host
    fn is_unavailable(&self) -> bool {
        false
    }
}

impl GraphNode for DependencyRef {
    type Key = usize;

    fn key(&self) -> usize {
        Arc::as_ptr(self) as usize
    }

    fn label(&self) -> String {
        self.id().relative_name().to_string()
    }

    fn children(&self) -> Vec<Self> {
        self.dependencies().to_vec()
    }

    fn is_unavailable(&self) -> bool {
        !self.is_available()
    }
}

/// Transitive dependency graph of a set of roots
#[derive(Debug, Clone)]
pub struct Graph<N: GraphNode> {
    nodes: IndexMap<N::Key, N>,
    /// node -> direct dependencies, both in discovery order
    adjacency: IndexMap<N::Key, IndexSet<N::Key>>,
    edges: Vec<(N::Key, N::Key)>,
}

impl<N: GraphNode> Graph<N> {
    /// Walk every root depth-first and record the closure
    ///
    /// Each node is expanded once. Re-entering a node that is still being
    /// expanded is a cycle and fails with [`GraphError::CircularDependency`].
    pub fn expand<I>(roots: I) -> Result<Self, GraphError>
    where
        I: IntoIterator<Item = N>,
    {
        let mut graph = Self {
            nodes: IndexMap::new(),
            adjacency: IndexMap::new(),
            edges: Vec::new(),
        };
        let mut stack = Vec::new();
        for root in roots {
            graph.visit(root, &mut stack)?;
        }
        tracing::debug!(
            nodes = graph.nodes.len(),
            edges = graph.edges.len(),
            "expanded dependency graph"
        );
        Ok(graph)
    }

    fn visit(&mut self, node: N, stack: &mut Vec<(N::Key, String)>) -> Result<(), GraphError> {
        let key = node.key();
        if let Some(start) = stack.iter().position(|(k, _)| *k == key) {
            let mut cycle: Vec<String> = stack[start..].iter().map(|(_, l)| l.clone()).collect();
            cycle.push(node.label());
            return Err(GraphError::CircularDependency { cycle });
        }
        if self.adjacency.contains_key(&key) {
            return Ok(());
        }

        self.adjacency.insert(key.clone(), IndexSet::new());
        self.nodes.insert(key.clone(), node.clone());
        stack.push((key.clone(), node.label()));

        for child in node.children() {
            let child_key = child.key();
            self.edges.push((key.clone(), child_key.clone()));
            if let Some(deps) = self.adjacency.get_mut(&key) {
                deps.insert(child_key);
            }
            self.visit(child, stack)?;
        }

        stack.pop();
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Nodes in discovery order
    pub fn nodes(&self) -> impl Iterator<Item = &N> {
        self.nodes.values()
    }

    /// Recorded `(dependent, dependency)` edges
    pub fn edges(&self) -> impl Iterator<Item = (&N, &N)> {
        self.edges
            .iter()
            .filter_map(|(from, to)| Some((self.nodes.get(from)?, self.nodes.get(to)?)))
    }

    /// Dependencies first, ties in discovery order
    ///
    /// Each pass takes every node with no remaining dependencies, strips them
    /// from all other dependency sets and appends them to the result.
    pub fn order(&self) -> Vec<N> {
        let mut remaining = self.adjacency.clone();
        let mut ordered = Vec::with_capacity(remaining.len());

        while !remaining.is_empty() {
            let leaves: Vec<N::Key> = remaining
                .iter()
                .filter(|(_, deps)| deps.is_empty())
                .map(|(key, _)| key.clone())
                .collect();
            if leaves.is_empty() {
                // expand() rejects cycles, so this is unreachable for a built graph
                tracing::warn!(left = remaining.len(), "no leaves left while ordering");
                break;
            }
            for deps in remaining.values_mut() {
                for leaf in &leaves {
                    deps.shift_remove(leaf);
                }
            }
            for leaf in leaves {
                remaining.shift_remove(&leaf);
                if let Some(node) = self.nodes.get(&leaf) {
                    ordered.push(node.clone());
                }
            }
        }

        ordered
    }

    /// Graphviz rendering of the graph
    pub fn to_dot(&self) -> String {
        fn quoted(s: &str) -> String {
            format!("\"{}\"", s.replace('"', "\\\""))
        }

        let mut out = String::from("strict digraph graphname {\n   node [shape=record];\n");
        for node in self.nodes.values() {
            let label = quoted(&node.label());
            let _ = write!(out, "\n   {label}[label={label}];");
        }
        for (from, to) in self.edges() {
            let _ = write!(out, "\n   {}->{};", quoted(&from.label()), quoted(&to.label()));
        }
        out.push_str("\n}\n");
        out
    }
}

/// Split `order` into the nodes that can be built and those that cannot
///
/// A node is dropped when it is an unavailable optional node, or when one of
/// its direct dependencies was dropped or is unavailable. Dropping repeats
/// until nothing changes, so exclusion propagates transitively. Both halves
/// keep the relative order of `order`.
pub fn partition_available<N: GraphNode>(order: &[N]) -> (Vec<N>, Vec<N>) {
    let mut unavailable: HashSet<N::Key> = HashSet::new();
    let mut dropped = Vec::new();
    let mut surviving = Vec::with_capacity(order.len());

    for node in order {
        if node.is_unavailable() {
            unavailable.insert(node.key());
            dropped.push(node.clone());
        } else {
            surviving.push(node.clone());
        }
    }

    // One removal per scan; graphs are small.
    while let Some(index) = surviving.iter().position(|node| {
        node.children()
            .iter()
            .any(|dep| dep.is_unavailable() || unavailable.contains(&dep.key()))
    }) {
        let node = surviving.remove(index);
        unavailable.insert(node.key());
        dropped.push(node);
    }

    let dropped_keys: HashSet<N::Key> = dropped.iter().map(GraphNode::key).collect();
    let dropped = order
        .iter()
        .filter(|n| dropped_keys.contains(&n.key()))
        .cloned()
        .collect();
    (surviving, dropped)
}

/// The buildable subset of `order`
pub fn prune_unavailable<N: GraphNode>(order: &[N]) -> Vec<N> {
    partition_available(order).0
}
