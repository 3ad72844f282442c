//! Dependency resolution.
//!
//! # Responsibilities
//! - Hold the dependency declarations of every known tool
//! - Produce a start order where dependencies precede dependents
//! - Reject cyclic graphs, naming a tool on the cycle
//!
//! # Design Decisions
//! - Depth-first search with three marks (unvisited / in progress / done)
//! - Deterministic: roots in insertion order, dependencies in declared order
//! - Dependencies that were never inserted are treated as leaves

use std::collections::HashMap;

use thiserror::Error;

use crate::belt::ToolId;

/// The graph contains a cycle; the tool that closed it is named.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("cyclic dependencies in tool: {0}")]
pub struct CyclicDependency(pub ToolId);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    InProgress,
    Done,
}

/// Tool identifiers and their declared dependencies.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    nodes: Vec<ToolId>,
    edges: HashMap<ToolId, Vec<ToolId>>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a tool's declaration. Re-inserting replaces the declaration.
    pub fn insert(&mut self, id: ToolId, dependencies: Vec<ToolId>) {
        if self.edges.insert(id, dependencies).is_none() {
            self.nodes.push(id);
        }
    }

    #[cfg(test)]
    fn contains(&self, id: ToolId) -> bool {
        self.edges.contains_key(&id)
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn dependencies(&self, id: ToolId) -> &[ToolId] {
        self.edges.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Topological order of every node, dependencies first.
    pub fn start_order(&self) -> Result<Vec<ToolId>, CyclicDependency> {
        let mut marks = HashMap::with_capacity(self.nodes.len());
        let mut order = Vec::with_capacity(self.nodes.len());

        for &id in &self.nodes {
            self.visit(id, &mut marks, &mut order)?;
        }

        Ok(order)
    }

    fn visit(
        &self,
        id: ToolId,
        marks: &mut HashMap<ToolId, Mark>,
        order: &mut Vec<ToolId>,
    ) -> Result<(), CyclicDependency> {
        match marks.get(&id) {
            Some(Mark::Done) => return Ok(()),
            Some(Mark::InProgress) => return Err(CyclicDependency(id)),
            None => {}
        }

        marks.insert(id, Mark::InProgress);
        for &dependency in self.dependencies(id) {
            self.visit(dependency, marks, order)?;
        }
        marks.insert(id, Mark::Done);
        order.push(id);

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const A: ToolId = ToolId::new("a");
    const B: ToolId = ToolId::new("b");
    const C: ToolId = ToolId::new("c");
    const D: ToolId = ToolId::new("d");

    fn position(order: &[ToolId], id: ToolId) -> usize {
        order.iter().position(|&x| x == id).unwrap()
    }

    #[test]
    fn chain_resolves_dependencies_first() {
        let mut graph = DependencyGraph::new();
        graph.insert(A, vec![B]);
        graph.insert(B, vec![C]);
        graph.insert(C, vec![]);

        assert_eq!(graph.start_order().unwrap(), vec![C, B, A]);
    }

    #[test]
    fn diamond_respects_every_edge() {
        let mut graph = DependencyGraph::new();
        graph.insert(A, vec![B, C]);
        graph.insert(B, vec![D]);
        graph.insert(C, vec![D]);
        graph.insert(D, vec![]);

        let order = graph.start_order().unwrap();
        assert_eq!(order.len(), 4);
        for (id, deps) in [(A, vec![B, C]), (B, vec![D]), (C, vec![D])] {
            for dep in deps {
                assert!(position(&order, dep) < position(&order, id), "{dep} before {id}");
            }
        }
    }

    #[test]
    fn order_is_deterministic() {
        let build = || {
            let mut graph = DependencyGraph::new();
            graph.insert(D, vec![]);
            graph.insert(A, vec![C, B]);
            graph.insert(B, vec![]);
            graph.insert(C, vec![]);
            graph
        };
        let first = build().start_order().unwrap();
        for _ in 0..10 {
            assert_eq!(build().start_order().unwrap(), first);
        }
        assert_eq!(first, vec![D, C, B, A]);
    }

    #[test]
    fn two_node_cycle_is_rejected() {
        let mut graph = DependencyGraph::new();
        graph.insert(A, vec![B]);
        graph.insert(B, vec![A]);

        let CyclicDependency(id) = graph.start_order().unwrap_err();
        assert!(id == A || id == B);
    }

    #[test]
    fn self_dependency_is_a_cycle() {
        let mut graph = DependencyGraph::new();
        graph.insert(A, vec![A]);
        assert_eq!(graph.start_order().unwrap_err(), CyclicDependency(A));
    }

    #[test]
    fn cycle_behind_acyclic_prefix_is_found() {
        let mut graph = DependencyGraph::new();
        graph.insert(A, vec![B]);
        graph.insert(B, vec![C]);
        graph.insert(C, vec![D]);
        graph.insert(D, vec![B]);

        let CyclicDependency(id) = graph.start_order().unwrap_err();
        assert!([B, C, D].contains(&id));
    }

    #[test]
    fn undeclared_dependencies_are_leaves() {
        let mut graph = DependencyGraph::new();
        graph.insert(A, vec![B]);

        assert_eq!(graph.start_order().unwrap(), vec![B, A]);
        assert!(!graph.contains(B));
    }

    #[test]
    fn reinsert_keeps_single_node() {
        let mut graph = DependencyGraph::new();
        graph.insert(A, vec![]);
        graph.insert(A, vec![B]);
        assert_eq!(graph.len(), 1);
        assert_eq!(graph.dependencies(A), &[B]);
    }
}
