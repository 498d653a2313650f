//! Up-front validation of the declared dependency graph.
//!
//! Building an [`ExecutionPlan`] checks, before anything runs, that:
//! 1. every declared dependency names a registered node;
//! 2. the graph is acyclic (Kahn's algorithm, one level at a time).
//!
//! On success the plan groups nodes into levels: every node of level `k`
//! depends only on nodes of levels `< k`, so the nodes of one level are
//! mutually independent.

use crate::registry::NodeRegistry;
use flowcore::WorkflowError;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use std::collections::HashMap;

/// Levelled topological order of a registry's nodes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionPlan {
    levels: Vec<Vec<String>>,
}

impl ExecutionPlan {
    /// Validate the registry's graph and compute its execution levels.
    ///
    /// # Errors
    /// - [`WorkflowError::UnresolvedDependency`] for the first (in declaration
    ///   order) dependency that names no registered node.
    /// - [`WorkflowError::CyclicDependency`] listing every node left with a
    ///   non-zero in-degree once no more nodes can be released.
    pub fn build(registry: &NodeRegistry) -> Result<Self, WorkflowError> {
        let graph = build_graph(registry)?;

        // Residual in-degree of every node. Parallel edges from a repeated
        // dependency are counted and released together.
        let mut in_degree: Vec<usize> = graph
            .node_indices()
            .map(|idx| graph.neighbors_directed(idx, Direction::Incoming).count())
            .collect();

        let mut current: Vec<NodeIndex> = graph
            .node_indices()
            .filter(|idx| in_degree[idx.index()] == 0)
            .collect();

        let mut levels = Vec::new();
        let mut placed = 0;

        while !current.is_empty() {
            let mut next = Vec::new();
            for &idx in &current {
                for dependent in graph.neighbors_directed(idx, Direction::Outgoing) {
                    let degree = &mut in_degree[dependent.index()];
                    *degree -= 1;
                    if *degree == 0 {
                        next.push(dependent);
                    }
                }
            }

            // Node indices follow declaration order.
            next.sort();
            next.dedup();

            placed += current.len();
            levels.push(current.iter().map(|&idx| graph[idx].clone()).collect());
            current = next;
        }

        if placed != graph.node_count() {
            let mut nodes: Vec<String> = graph
                .node_indices()
                .filter(|idx| in_degree[idx.index()] > 0)
                .map(|idx| graph[idx].clone())
                .collect();
            nodes.sort();
            return Err(WorkflowError::CyclicDependency { nodes });
        }

        Ok(Self { levels })
    }

    /// Nodes grouped by level, each level in declaration order
    pub fn levels(&self) -> &[Vec<String>] {
        &self.levels
    }

    /// Flattened topological order
    pub fn order(&self) -> Vec<String> {
        self.levels.iter().flatten().cloned().collect()
    }

    pub fn node_count(&self) -> usize {
        self.levels.iter().map(Vec::len).sum()
    }
}

/// Build the dependency graph; edges point from a dependency to its dependent
fn build_graph(registry: &NodeRegistry) -> Result<DiGraph<String, ()>, WorkflowError> {
    let mut graph = DiGraph::new();
    let mut node_to_index = HashMap::new();

    for descriptor in registry.descriptors() {
        let idx = graph.add_node(descriptor.name().to_string());
        node_to_index.insert(descriptor.name(), idx);
    }

    for descriptor in registry.descriptors() {
        let to_idx = node_to_index[descriptor.name()];
        for dependency in descriptor.depends_on() {
            let from_idx = node_to_index.get(dependency.as_str()).ok_or_else(|| {
                WorkflowError::UnresolvedDependency {
                    node: descriptor.name().to_string(),
                    dependency: dependency.clone(),
                }
            })?;
            graph.add_edge(*from_idx, to_idx, ());
        }
    }

    Ok(graph)
}
