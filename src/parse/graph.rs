//! petgraph-based step dependency graph.
//!
//! An edge `a -> b` means step `a` must run before step `b`, either because
//! `b` lists `a` in its dependencies or because `b`'s arguments reference
//! one of `a`'s outputs.

use std::collections::HashMap;

use petgraph::Direction;
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};

use super::types::ExperimentDescription;
use crate::error::DescriptionError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeKind {
    /// Listed in the step's `dependencies`.
    Dependency,
    /// Induced by a `$step` / `$step.output` argument.
    Reference,
}

pub struct StepGraph {
    pub graph: DiGraph<String, EdgeKind>,
    pub step_indices: HashMap<String, NodeIndex>,
}

impl StepGraph {
    /// Build the graph. Dependencies on undeclared steps and references to
    /// non-steps are left out; the validation rules report those.
    pub fn build(description: &ExperimentDescription) -> Self {
        let mut graph = DiGraph::new();
        let mut step_indices = HashMap::new();

        for step in &description.steps {
            let idx = graph.add_node(step.name.clone());
            step_indices.insert(step.name.clone(), idx);
        }

        for step in &description.steps {
            let target = step_indices[&step.name];

            for dependency in &step.dependencies {
                if let Some(&source) = step_indices.get(dependency) {
                    graph.update_edge(source, target, EdgeKind::Dependency);
                }
            }

            for reference in step.references() {
                if let Some(&source) = step_indices.get(&reference.name) {
                    if graph.find_edge(source, target).is_none() {
                        graph.add_edge(source, target, EdgeKind::Reference);
                    }
                }
            }
        }

        StepGraph {
            graph,
            step_indices,
        }
    }

    /// Steps that must run before `step`.
    pub fn predecessors(&self, step: &str) -> Vec<&str> {
        self.neighbors(step, Direction::Incoming)
    }

    /// Steps that wait on `step`.
    pub fn successors(&self, step: &str) -> Vec<&str> {
        self.neighbors(step, Direction::Outgoing)
    }

    fn neighbors(&self, step: &str, direction: Direction) -> Vec<&str> {
        let Some(&idx) = self.step_indices.get(step) else {
            return vec![];
        };
        let mut names: Vec<&str> = self
            .graph
            .neighbors_directed(idx, direction)
            .map(|n| self.graph[n].as_str())
            .collect();
        names.sort_unstable();
        names
    }

    pub fn edge_kind(&self, from: &str, to: &str) -> Option<EdgeKind> {
        let from = *self.step_indices.get(from)?;
        let to = *self.step_indices.get(to)?;
        self.graph.find_edge(from, to).map(|e| self.graph[e])
    }

    /// Step names in an order where every step follows its prerequisites.
    pub fn topo_order(&self) -> Result<Vec<String>, DescriptionError> {
        match toposort(&self.graph, None) {
            Ok(indices) => Ok(indices
                .into_iter()
                .map(|idx| self.graph[idx].clone())
                .collect()),
            Err(cycle) => {
                let step = &self.graph[cycle.node_id()];
                Err(DescriptionError::validate(
                    "V004",
                    format!("Cycle detected at step '{}'", step),
                    Some(step),
                ))
            }
        }
    }
}
