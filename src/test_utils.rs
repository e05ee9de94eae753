//! Test utilities for property-based testing
//!
//! This module provides generators and helpers for proptest.

#[cfg(test)]
pub mod generators {
    use std::collections::HashSet;
    use std::rc::Rc;

    use proptest::prelude::*;
    use proptest::sample::Index;

    use crate::core::graph::GraphNode;

    #[derive(Debug)]
    struct Inner {
        names: Vec<String>,
        deps: Vec<Vec<usize>>,
        unavailable: HashSet<usize>,
    }

    /// Adjacency table standing in for a set of artifacts
    ///
    /// Unlike real dependency nodes, tables can describe cycles.
    #[derive(Debug, Clone)]
    pub struct TestTable(Rc<Inner>);

    /// Handle to one row of a [`TestTable`]
    #[derive(Debug, Clone)]
    pub struct TableNode {
        table: TestTable,
        index: usize,
    }

    impl TestTable {
        /// Table from `(name, dependency names)` rows
        pub fn new(rows: &[(&str, &[&str])]) -> Self {
            Self::with_unavailable(rows, &[])
        }

        /// Table where the named rows are unavailable optional nodes
        pub fn with_unavailable(rows: &[(&str, &[&str])], unavailable: &[&str]) -> Self {
            let names: Vec<String> = rows.iter().map(|(n, _)| (*n).to_string()).collect();
            let index_of = |name: &str| {
                names
                    .iter()
                    .position(|n| n == name)
                    .unwrap_or_else(|| panic!("unknown row '{name}'"))
            };
            let deps = rows
                .iter()
                .map(|(_, deps)| deps.iter().map(|d| index_of(d)).collect())
                .collect();
            let unavailable = unavailable.iter().map(|n| index_of(n)).collect();
            Self(Rc::new(Inner {
                names,
                deps,
                unavailable,
            }))
        }

        fn from_parts(deps: Vec<Vec<usize>>, unavailable: HashSet<usize>) -> Self {
            let names = (0..deps.len()).map(|i| format!("n{i}")).collect();
            Self(Rc::new(Inner {
                names,
                deps,
                unavailable,
            }))
        }

        pub fn len(&self) -> usize {
            self.0.names.len()
        }

        pub fn node(&self, name: &str) -> TableNode {
            let index = self
                .0
                .names
                .iter()
                .position(|n| n == name)
                .unwrap_or_else(|| panic!("unknown row '{name}'"));
            TableNode {
                table: self.clone(),
                index,
            }
        }

        /// Every row, in table order
        pub fn all(&self) -> Vec<TableNode> {
            (0..self.len())
                .map(|index| TableNode {
                    table: self.clone(),
                    index,
                })
                .collect()
        }

        /// Whether row `index` is unavailable or depends on one that is
        pub fn reaches_unavailable(&self, index: usize) -> bool {
            let mut stack = vec![index];
            let mut seen = HashSet::new();
            while let Some(i) = stack.pop() {
                if !seen.insert(i) {
                    continue;
                }
                if self.0.unavailable.contains(&i) {
                    return true;
                }
                stack.extend(self.0.deps[i].iter().copied());
            }
            false
        }
    }

    impl TableNode {
        pub fn index(&self) -> usize {
            self.index
        }
    }

    impl GraphNode for TableNode {
        type Key = usize;

        fn key(&self) -> usize {
            self.index
        }

        fn label(&self) -> String {
            self.table.0.names[self.index].clone()
        }

        fn children(&self) -> Vec<Self> {
            self.table.0.deps[self.index]
                .iter()
                .map(|&index| TableNode {
                    table: self.table.clone(),
                    index,
                })
                .collect()
        }

        fn is_unavailable(&self) -> bool {
            self.table.0.unavailable.contains(&self.index)
        }
    }

    /// Generate an acyclic table: row `i` only depends on rows below `i`
    pub fn acyclic_table(max_nodes: usize) -> impl Strategy<Value = TestTable> {
        (1..=max_nodes)
            .prop_flat_map(|n| {
                (
                    proptest::collection::vec(proptest::collection::vec(any::<Index>(), 0..4), n),
                    proptest::collection::vec(proptest::bool::weighted(0.2), n),
                )
            })
            .prop_map(|(picks, unavailable)| {
                let deps = picks
                    .iter()
                    .enumerate()
                    .map(|(i, row)| {
                        let mut deps: Vec<usize> = Vec::new();
                        if i > 0 {
                            for pick in row {
                                let dep = pick.index(i);
                                if !deps.contains(&dep) {
                                    deps.push(dep);
                                }
                            }
                        }
                        deps
                    })
                    .collect();
                let unavailable = unavailable
                    .iter()
                    .enumerate()
                    .filter_map(|(i, off)| off.then_some(i))
                    .collect();
                TestTable::from_parts(deps, unavailable)
            })
    }

    /// Generate an artifact name segment (lowercase alphanumeric)
    pub fn segment() -> impl Strategy<Value = String> {
        "[a-z][a-z0-9]{0,8}"
    }

    /// Generate a `major.minor` version
    pub fn version() -> impl Strategy<Value = String> {
        (0u32..100, 0u32..100).prop_map(|(major, minor)| format!("{major}.{minor}"))
    }
}

#[cfg(test)]
mod tests {
    use super::generators::*;
    use crate::core::identity;
    use proptest::prelude::*;
    use tempfile::TempDir;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn test_acyclic_table_rows_point_down(table in acyclic_table(10)) {
            for node in table.all() {
                for dep in crate::core::graph::GraphNode::children(&node) {
                    prop_assert!(dep.index() < node.index());
                }
            }
        }

        /// `<a>-<b>-<version>` always resolves to `root/<a>/<b>` with the version split off.
        #[test]
        fn prop_identity_resolution_round_trip(a in segment(), b in segment(), v in version()) {
            let root = TempDir::new().unwrap();
            std::fs::create_dir_all(root.path().join(&a).join(&b)).unwrap();

            let id = identity::resolve(root.path(), "proj", &format!("{a}-{b}-{v}")).unwrap();

            prop_assert_eq!(id.version(), v.as_str());
            prop_assert_eq!(id.short_name(), b.as_str());
            let expected = root.path().join(&a).join(&b);
            prop_assert_eq!(id.path(), Some(expected.as_path()));
        }
    }
}
