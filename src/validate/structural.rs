//! Graph-level structural rules (V001–V004).

use std::collections::HashSet;

use petgraph::algo::tarjan_scc;

use crate::error::DescriptionError;
use crate::parse::graph::StepGraph;
use crate::parse::types::ExperimentDescription;

/// Run all structural rules. Returns all errors found.
pub fn validate_structural(
    description: &ExperimentDescription,
    graph: &StepGraph,
) -> Vec<DescriptionError> {
    let mut errors = Vec::new();

    v001_no_parameter_step_collisions(description, &mut errors);
    v002_dependencies_reference_existing_steps(description, graph, &mut errors);
    v003_no_self_dependencies(graph, &mut errors);
    v004_no_cycles(graph, &mut errors);

    errors
}

fn v001_no_parameter_step_collisions(
    description: &ExperimentDescription,
    errors: &mut Vec<DescriptionError>,
) {
    let parameters: HashSet<&str> = description
        .parameters
        .iter()
        .map(|p| p.name.as_str())
        .collect();
    for step in &description.steps {
        if parameters.contains(step.name.as_str()) {
            errors.push(DescriptionError::validate(
                "V001",
                format!("Step '{}' has the same name as a parameter", step.name),
                Some(&step.name),
            ));
        }
    }
}

fn v002_dependencies_reference_existing_steps(
    description: &ExperimentDescription,
    graph: &StepGraph,
    errors: &mut Vec<DescriptionError>,
) {
    for step in &description.steps {
        for dependency in &step.dependencies {
            if !graph.step_indices.contains_key(dependency) {
                errors.push(DescriptionError::validate(
                    "V002",
                    format!(
                        "Step '{}' depends on unknown step '{}'",
                        step.name, dependency
                    ),
                    Some(&step.name),
                ));
            }
        }
    }
}

fn v003_no_self_dependencies(graph: &StepGraph, errors: &mut Vec<DescriptionError>) {
    for edge in graph.graph.raw_edges() {
        if edge.source() == edge.target() {
            let step = &graph.graph[edge.source()];
            errors.push(DescriptionError::validate(
                "V003",
                format!("Step '{}' depends on itself", step),
                Some(step),
            ));
        }
    }
}

fn v004_no_cycles(graph: &StepGraph, errors: &mut Vec<DescriptionError>) {
    for component in tarjan_scc(&graph.graph) {
        // Single-step components only cycle through a self-loop (V003).
        if component.len() < 2 {
            continue;
        }
        let mut steps: Vec<&str> = component.iter().map(|&idx| graph.graph[idx].as_str()).collect();
        steps.sort_unstable();
        errors.push(DescriptionError::validate(
            "V004",
            format!("Steps form a dependency cycle: {}", steps.join(", ")),
            steps.first().copied(),
        ));
    }
}
