// ABOUTME: Service dependency graph and depth-first topological ordering.
// ABOUTME: Ties break by declaration order; re-entering an active node is a cycle.

use nonempty::NonEmpty;

use super::{CompileError, CompileErrors};
use crate::manifest::ServiceSpec;
use crate::types::OrderedMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    Active,
    Done,
}

/// Services as nodes, `depends_on` entries as edges, both in declaration order.
#[derive(Debug)]
pub struct DependencyGraph<'a> {
    names: Vec<&'a str>,
    edges: Vec<Vec<usize>>,
}

impl<'a> DependencyGraph<'a> {
    /// Build from `(service, dependencies)` pairs. Every unknown dependency
    /// is reported.
    pub fn new<I, D>(nodes: I) -> Result<Self, CompileErrors>
    where
        I: IntoIterator<Item = (&'a str, D)>,
        D: IntoIterator<Item = &'a str>,
    {
        let nodes: Vec<(&'a str, Vec<&'a str>)> = nodes
            .into_iter()
            .map(|(name, deps)| (name, deps.into_iter().collect()))
            .collect();
        let names: Vec<&'a str> = nodes.iter().map(|(name, _)| *name).collect();

        let mut errors = Vec::new();
        let mut edges = Vec::with_capacity(nodes.len());
        for (name, deps) in &nodes {
            let mut targets = Vec::with_capacity(deps.len());
            for dep in deps {
                match names.iter().position(|n| n == dep) {
                    Some(i) => targets.push(i),
                    None => errors.push(CompileError::UnknownDependency {
                        service: name.to_string(),
                        dependency: dep.to_string(),
                    }),
                }
            }
            // Visit dependencies in declaration order, not list order.
            targets.sort_unstable();
            targets.dedup();
            edges.push(targets);
        }

        match NonEmpty::from_vec(errors) {
            Some(errors) => Err(errors),
            None => Ok(Self { names, edges }),
        }
    }

    pub fn from_services(services: &'a OrderedMap<ServiceSpec>) -> Result<Self, CompileErrors> {
        Self::new(
            services
                .iter()
                .map(|(name, spec)| (name, spec.depends_on.iter().map(String::as_str))),
        )
    }

    /// Node indices with every dependency ahead of its dependents.
    pub fn order(&self) -> Result<Vec<usize>, CompileError> {
        let mut marks = vec![Mark::Unvisited; self.names.len()];
        let mut path = Vec::new();
        let mut order = Vec::with_capacity(self.names.len());
        for node in 0..self.names.len() {
            self.visit(node, &mut marks, &mut path, &mut order)?;
        }
        Ok(order)
    }

    /// Service names in dependency order.
    pub fn ordered_names(&self) -> Result<Vec<&'a str>, CompileError> {
        Ok(self.order()?.into_iter().map(|i| self.names[i]).collect())
    }

    fn visit(
        &self,
        node: usize,
        marks: &mut [Mark],
        path: &mut Vec<usize>,
        order: &mut Vec<usize>,
    ) -> Result<(), CompileError> {
        match marks[node] {
            Mark::Done => return Ok(()),
            Mark::Active => {
                let start = path.iter().position(|&n| n == node).unwrap_or(0);
                let mut cycle: Vec<String> =
                    path[start..].iter().map(|&n| self.names[n].to_string()).collect();
                cycle.push(self.names[node].to_string());
                return Err(CompileError::CircularDependency {
                    service: self.names[node].to_string(),
                    cycle,
                });
            }
            Mark::Unvisited => {}
        }

        marks[node] = Mark::Active;
        path.push(node);
        for &dep in &self.edges[node] {
            self.visit(dep, marks, path, order)?;
        }
        path.pop();
        marks[node] = Mark::Done;
        order.push(node);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn graph(nodes: &[(&'static str, &[&'static str])]) -> DependencyGraph<'static> {
        DependencyGraph::new(nodes.iter().map(|(n, deps)| (*n, deps.iter().copied()))).unwrap()
    }

    #[test]
    fn dependencies_come_first() {
        let g = graph(&[("web", &["db", "cache"]), ("db", &[]), ("cache", &[])]);
        assert_eq!(g.ordered_names().unwrap(), vec!["db", "cache", "web"]);
    }

    #[test]
    fn dependency_list_order_does_not_override_declaration_order() {
        let g = graph(&[("web", &["cache", "db"]), ("db", &[]), ("cache", &[])]);
        assert_eq!(g.ordered_names().unwrap(), vec!["db", "cache", "web"]);
    }

    #[test]
    fn independent_services_keep_declaration_order() {
        let g = graph(&[("c", &[]), ("a", &[]), ("b", &[])]);
        assert_eq!(g.ordered_names().unwrap(), vec!["c", "a", "b"]);
    }

    #[test]
    fn two_node_cycle_names_a_member() {
        let g = graph(&[("a", &["b"]), ("b", &["a"])]);
        match g.order() {
            Err(CompileError::CircularDependency { service, cycle }) => {
                assert!(service == "a" || service == "b");
                assert_eq!(cycle, vec!["a", "b", "a"]);
            }
            other => panic!("expected cycle, got {other:?}"),
        }
    }

    #[test]
    fn self_dependency_is_a_cycle() {
        let g = graph(&[("a", &["a"])]);
        assert!(matches!(g.order(), Err(CompileError::CircularDependency { .. })));
    }

    #[test]
    fn unknown_dependencies_are_all_reported() {
        let nodes: [(&str, &[&str]); 2] = [("a", &["x"]), ("b", &["y", "a"])];
        let errors =
            DependencyGraph::new(nodes.iter().map(|(n, d)| (*n, d.iter().copied()))).unwrap_err();
        assert_eq!(errors.len(), 2);
    }

    /// Random DAG: node i may only depend on nodes with a smaller index.
    fn dag() -> impl Strategy<Value = Vec<Vec<usize>>> {
        (1usize..12).prop_flat_map(|n| {
            (0..n)
                .map(|i| proptest::collection::vec(0..i.max(1), 0..=i.min(3)))
                .collect::<Vec<_>>()
        })
    }

    proptest! {
        #[test]
        fn every_service_follows_its_dependencies(edges in dag()) {
            let names: Vec<String> = (0..edges.len()).map(|i| format!("s{i}")).collect();
            let deps: Vec<Vec<&str>> = edges
                .iter()
                .enumerate()
                .map(|(i, targets)| {
                    targets
                        .iter()
                        .filter(|&&t| t < i)
                        .map(|&t| names[t].as_str())
                        .collect()
                })
                .collect();
            let g = DependencyGraph::new(
                names.iter().map(String::as_str).zip(deps.iter().map(|d| d.iter().copied())),
            )
            .unwrap();
            let order = g.ordered_names().unwrap();
            prop_assert_eq!(order.len(), names.len());
            for (i, targets) in deps.iter().enumerate() {
                let me = order.iter().position(|n| *n == names[i]).unwrap();
                for dep in targets {
                    let them = order.iter().position(|n| n == dep).unwrap();
                    prop_assert!(them < me);
                }
            }
        }
    }
}
