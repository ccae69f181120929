//! Validation phase.
//!
//! Validates an experiment description: shape (in `parse::describe`), then
//! name collisions, dependencies, cycles and references.

pub mod references;
pub mod structural;

use serde_yaml::Value;

use crate::error::DescriptionError;
use crate::parse::graph::StepGraph;
use crate::parse::types::ExperimentDescription;

/// Validate a typed description against its step graph.
pub fn validate_description(
    description: &ExperimentDescription,
    graph: &StepGraph,
) -> Vec<DescriptionError> {
    let mut errors = structural::validate_structural(description, graph);
    errors.extend(references::validate_references(description));
    errors
}

/// Validate a YAML document. An empty result means the description is valid.
pub fn validate_document(doc: &Value) -> Vec<DescriptionError> {
    let errors = match crate::parse::describe(doc) {
        Ok(description) => {
            let graph = StepGraph::build(&description);
            validate_description(&description, &graph)
        }
        Err(errors) => errors,
    };
    tracing::debug!(errors = errors.len(), "validated experiment description");
    errors
}

/// Validate experiment description YAML text.
pub fn validate_yaml(yaml: &str) -> Vec<DescriptionError> {
    match crate::parse::parse(yaml) {
        Ok(doc) => validate_document(&doc),
        Err(errors) => errors,
    }
}

/// True if `doc` is a valid experiment description. Never panics on
/// malformed input.
pub fn is_valid(doc: &Value) -> bool {
    validate_document(doc).is_empty()
}
