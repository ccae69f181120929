//! Parse phase: YAML → document → typed description + step graph.

pub mod describe;
pub mod graph;
pub mod reference;
pub mod types;

pub use describe::describe;
pub use graph::{EdgeKind, StepGraph};
pub use reference::Reference;
pub use types::*;

use serde_yaml::Value;

use crate::error::DescriptionError;

/// Deserialize experiment description YAML into a document.
pub fn parse(yaml: &str) -> Result<Value, Vec<DescriptionError>> {
    serde_yaml::from_str::<Value>(yaml).map_err(|e| {
        vec![DescriptionError::parse(
            "P001",
            format!("Failed to parse experiment description YAML: {}", e),
        )]
    })
}

/// Parse YAML, check its shape and build the step graph in one step.
pub fn parse_and_build(yaml: &str) -> Result<(ExperimentDescription, StepGraph), Vec<DescriptionError>> {
    let doc = parse(yaml)?;
    let description = describe(&doc)?;
    let graph = StepGraph::build(&description);
    Ok((description, graph))
}
