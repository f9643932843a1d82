//! Service dependency graph.
//!
//! Edges point from a dependency to the service that requires it, so a
//! topological walk yields dependencies first. Names referenced before their
//! own registration are held as placeholder nodes until registered.

use crate::error::GraphError;
use parking_lot::RwLock;
use petgraph::algo::{is_cyclic_directed, toposort};
use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use petgraph::Direction;
use std::collections::{HashMap, HashSet};

#[derive(Debug, Default)]
struct Inner {
    graph: StableDiGraph<String, ()>,
    index: HashMap<String, NodeIndex>,
    registered: HashSet<String>,
}

impl Inner {
    fn ensure_node(&mut self, name: &str) -> (NodeIndex, bool) {
        if let Some(&idx) = self.index.get(name) {
            return (idx, false);
        }
        let idx = self.graph.add_node(name.to_string());
        self.index.insert(name.to_string(), idx);
        (idx, true)
    }

    fn remove_node(&mut self, idx: NodeIndex) {
        if let Some(name) = self.graph.remove_node(idx) {
            self.index.remove(&name);
        }
    }

    /// Walks dependency edges from `start` until it is reached again.
    fn cycle_through(&self, start: NodeIndex) -> Vec<String> {
        let mut stack = vec![(start, vec![start])];
        let mut seen = HashSet::new();

        while let Some((node, path)) = stack.pop() {
            for dep in self.graph.neighbors_directed(node, Direction::Incoming) {
                if dep == start {
                    let mut names: Vec<String> =
                        path.iter().map(|i| self.graph[*i].clone()).collect();
                    names.push(self.graph[start].clone());
                    return names;
                }
                if seen.insert(dep) {
                    let mut next = path.clone();
                    next.push(dep);
                    stack.push((dep, next));
                }
            }
        }

        vec![self.graph[start].clone()]
    }
}

/// Directed dependency graph over service names.
#[derive(Debug, Default)]
pub struct DependencyGraph {
    inner: RwLock<Inner>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a service and its dependency edges.
    ///
    /// The cycle check runs over the whole graph, not just the new node. On
    /// failure the graph is left exactly as it was before the call.
    pub fn add_service<S: AsRef<str>>(&self, name: &str, dependencies: &[S]) -> Result<(), GraphError> {
        let mut g = self.inner.write();
        if g.registered.contains(name) {
            return Err(GraphError::DuplicateNode(name.to_string()));
        }

        let (node, node_created) = g.ensure_node(name);
        let mut created_nodes = Vec::new();
        let mut added_edges = Vec::new();

        for dep in dependencies {
            let (dep_idx, created) = g.ensure_node(dep.as_ref());
            if created {
                created_nodes.push(dep_idx);
            }
            if g.graph.find_edge(dep_idx, node).is_none() {
                added_edges.push(g.graph.add_edge(dep_idx, node, ()));
            }
        }

        if is_cyclic_directed(&g.graph) {
            let path = g.cycle_through(node);
            for edge in added_edges {
                g.graph.remove_edge(edge);
            }
            for idx in created_nodes {
                g.remove_node(idx);
            }
            if node_created {
                g.remove_node(node);
            }
            return Err(GraphError::CycleDetected { path });
        }

        g.registered.insert(name.to_string());
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.inner.read().registered.contains(name)
    }

    pub fn node_count(&self) -> usize {
        self.inner.read().graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.inner.read().graph.edge_count()
    }

    /// Direct dependencies of `name`.
    pub fn dependencies_of(&self, name: &str) -> Vec<String> {
        self.neighbors(name, Direction::Incoming)
    }

    /// Services that directly depend on `name`.
    pub fn dependents_of(&self, name: &str) -> Vec<String> {
        self.neighbors(name, Direction::Outgoing)
    }

    fn neighbors(&self, name: &str, direction: Direction) -> Vec<String> {
        let g = self.inner.read();
        let Some(&idx) = g.index.get(name) else {
            return Vec::new();
        };
        let mut out: Vec<String> = g
            .graph
            .neighbors_directed(idx, direction)
            .map(|n| g.graph[n].clone())
            .collect();
        out.sort();
        out
    }

    /// Names referenced as dependencies but never registered.
    pub fn unresolved(&self) -> Vec<String> {
        let g = self.inner.read();
        let mut out: Vec<String> = g
            .index
            .keys()
            .filter(|n| !g.registered.contains(*n))
            .cloned()
            .collect();
        out.sort();
        out
    }

    /// Validate the entire graph structure
    pub fn validate(&self) -> Result<(), GraphError> {
        let g = self.inner.read();
        if is_cyclic_directed(&g.graph) {
            let start = g.graph.node_indices().next();
            let path = start.map(|s| g.cycle_through(s)).unwrap_or_default();
            return Err(GraphError::CycleDetected { path });
        }
        Ok(())
    }

    /// Get topological sort of registered services (dependencies first)
    pub fn topological_sort(&self) -> Result<Vec<String>, GraphError> {
        let g = self.inner.read();
        match toposort(&g.graph, None) {
            Ok(order) => Ok(order
                .into_iter()
                .map(|i| g.graph[i].clone())
                .filter(|n| g.registered.contains(n))
                .collect()),
            Err(cycle) => Err(GraphError::CycleDetected {
                path: g.cycle_through(cycle.node_id()),
            }),
        }
    }

    /// Order a subset of services so that dependencies among them come first.
    ///
    /// Services with no mutual edge keep their relative order in `subset`.
    pub fn order_subset(&self, subset: &[String]) -> Result<Vec<String>, GraphError> {
        let wanted: HashSet<&str> = subset.iter().map(String::as_str).collect();
        let g = self.inner.read();
        let mut remaining: Vec<&String> = subset.iter().collect();
        let mut placed: HashSet<&str> = HashSet::new();
        let mut out = Vec::with_capacity(subset.len());

        while !remaining.is_empty() {
            let before = remaining.len();
            remaining.retain(|name| {
                let name: &String = *name;
                let ready = g.index.get(name.as_str()).map_or(true, |&idx| {
                    g.graph
                        .neighbors_directed(idx, Direction::Incoming)
                        .map(|d| g.graph[d].as_str())
                        .filter(|d| wanted.contains(d))
                        .all(|d| placed.contains(d))
                });
                if ready {
                    placed.insert(name.as_str());
                    out.push(name.clone());
                }
                !ready
            });
            if remaining.len() == before {
                return Err(GraphError::CycleDetected {
                    path: remaining.iter().map(|s| (*s).clone()).collect(),
                });
            }
        }

        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NONE: [&str; 0] = [];

    #[test]
    fn duplicate_registration_is_rejected() {
        let dag = DependencyGraph::new();
        dag.add_service("db", &NONE).unwrap();
        assert_eq!(
            dag.add_service("db", &NONE),
            Err(GraphError::DuplicateNode("db".into()))
        );
    }

    #[test]
    fn forward_reference_becomes_registered_later() {
        let dag = DependencyGraph::new();
        dag.add_service("auth", &["db"]).unwrap();
        assert_eq!(dag.unresolved(), vec!["db".to_string()]);
        dag.add_service("db", &NONE).unwrap();
        assert!(dag.unresolved().is_empty());
        assert_eq!(dag.topological_sort().unwrap(), vec!["db", "auth"]);
    }

    #[test]
    fn cycle_is_rejected_and_rolled_back() {
        let dag = DependencyGraph::new();
        dag.add_service("a", &["b"]).unwrap();
        dag.add_service("b", &["c"]).unwrap();
        let edges = dag.edge_count();
        let nodes = dag.node_count();

        let err = dag.add_service("c", &["a"]).unwrap_err();
        match err {
            GraphError::CycleDetected { path } => {
                assert_eq!(path.first(), path.last());
                assert!(path.contains(&"a".to_string()));
                assert!(path.contains(&"b".to_string()));
            }
            other => panic!("expected cycle, got {other:?}"),
        }

        assert_eq!(dag.edge_count(), edges);
        assert_eq!(dag.node_count(), nodes);
        assert!(!dag.contains("c"));
        dag.add_service("c", &NONE).unwrap();
    }

    #[test]
    fn self_dependency_is_a_cycle() {
        let dag = DependencyGraph::new();
        let err = dag.add_service("loop", &["loop"]).unwrap_err();
        assert_eq!(
            err,
            GraphError::CycleDetected {
                path: vec!["loop".into(), "loop".into()]
            }
        );
        assert_eq!(dag.node_count(), 0);
    }

    #[test]
    fn subset_order_respects_edges_and_input_order() {
        let dag = DependencyGraph::new();
        dag.add_service("gateway", &["runtime"]).unwrap();
        dag.add_service("runtime", &NONE).unwrap();
        dag.add_service("metrics", &NONE).unwrap();

        let order = dag
            .order_subset(&["gateway".into(), "metrics".into(), "runtime".into()])
            .unwrap();
        assert_eq!(order, vec!["metrics", "runtime", "gateway"]);
    }

    #[test]
    fn neighbors_are_sorted() {
        let dag = DependencyGraph::new();
        dag.add_service("svc", &["z", "a"]).unwrap();
        assert_eq!(dag.dependencies_of("svc"), vec!["a", "z"]);
        assert_eq!(dag.dependents_of("a"), vec!["svc"]);
    }
}
