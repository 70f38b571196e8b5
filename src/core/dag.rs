//! Subtask dependency graph.
//!
//! The planner emits subtasks whose dependencies point only backward. This
//! module lifts a subtask list into a petgraph DAG, checks that invariant,
//! and gives the executor its run order.

use crate::core::plan::Subtask;
use crate::error::{Error, Result};
use petgraph::algo::is_cyclic_directed;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use std::collections::HashSet;

/// Directed graph of subtask indices. An edge `a → b` means `b` waits on `a`.
#[derive(Debug)]
pub struct SubtaskGraph {
    graph: DiGraph<usize, ()>,
    nodes: Vec<NodeIndex>,
}

impl SubtaskGraph {
    /// Build the graph for a plan's subtasks.
    ///
    /// # Errors
    /// Returns a validation error if:
    /// - a subtask's `index` does not match its position
    /// - a dependency names the subtask itself or a later subtask
    /// - the result is cyclic
    pub fn from_subtasks(subtasks: &[Subtask]) -> Result<Self> {
        let mut graph = DiGraph::with_capacity(subtasks.len(), subtasks.len());
        let mut nodes = Vec::with_capacity(subtasks.len());

        for (position, subtask) in subtasks.iter().enumerate() {
            if subtask.index != position {
                return Err(Error::Validation(format!(
                    "Subtask at position {} carries index {}",
                    position, subtask.index
                )));
            }
            nodes.push(graph.add_node(subtask.index));
        }

        for subtask in subtasks {
            for &dep in &subtask.dependencies {
                if dep >= subtask.index {
                    return Err(Error::Validation(format!(
                        "Subtask {} depends on non-earlier subtask {}",
                        subtask.index, dep
                    )));
                }
                graph.add_edge(nodes[dep], nodes[subtask.index], ());
            }
        }

        if is_cyclic_directed(&graph) {
            return Err(Error::Validation("Subtask graph contains a cycle".into()));
        }

        Ok(Self { graph, nodes })
    }

    /// Number of subtasks.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Number of dependency edges.
    pub fn dependency_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Indices the given subtask waits on, ascending.
    pub fn dependencies_of(&self, index: usize) -> Vec<usize> {
        let Some(&node) = self.nodes.get(index) else {
            return Vec::new();
        };
        let mut deps: Vec<usize> = self
            .graph
            .neighbors_directed(node, Direction::Incoming)
            .map(|n| self.graph[n])
            .collect();
        deps.sort_unstable();
        deps
    }

    /// Subtasks whose dependencies are all in `completed` and which are not
    /// themselves completed.
    pub fn ready(&self, completed: &HashSet<usize>) -> Vec<usize> {
        self.nodes
            .iter()
            .map(|&n| self.graph[n])
            .filter(|index| !completed.contains(index))
            .filter(|&index| {
                self.dependencies_of(index)
                    .iter()
                    .all(|dep| completed.contains(dep))
            })
            .collect()
    }

    /// Subtask indices in an order where each comes after its dependencies.
    ///
    /// Among ready subtasks the lowest index goes first, so a plan whose
    /// dependencies all point backward runs in listed order.
    pub fn execution_order(&self) -> Vec<usize> {
        let mut completed = HashSet::with_capacity(self.len());
        let mut order = Vec::with_capacity(self.len());
        while let Some(next) = self.ready(&completed).into_iter().min() {
            completed.insert(next);
            order.push(next);
        }
        order
    }
}
