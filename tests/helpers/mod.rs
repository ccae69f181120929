use serde_yaml::Value;

use task_engine::error::DescriptionError;
use task_engine::types::{TypeError, TypeRegistry};

// =============================================================================
// Experiment description builders
// =============================================================================

/// Task declarations shared by most descriptions.
pub const TASKS: &str = "\
tasks:
  add:
    plugin: org.example.add
    outputs: sum
  split:
    plugin: org.example.split
    outputs: [train, test]
  log:
    plugin: org.example.log
";

pub fn doc(yaml: &str) -> Value {
    serde_yaml::from_str(yaml).expect("test YAML should parse")
}

/// A description with the shared tasks and the given `graph` body.
pub fn with_graph(graph: &str) -> Value {
    doc(&format!("{}graph:\n{}", TASKS, indent(graph)))
}

/// Like [`with_graph`], with a `parameters` section prepended.
pub fn with_parameters(parameters: &str, graph: &str) -> Value {
    doc(&format!(
        "parameters:\n{}{}graph:\n{}",
        indent(parameters),
        TASKS,
        indent(graph)
    ))
}

fn indent(body: &str) -> String {
    body.lines().map(|line| format!("  {}\n", line)).collect()
}

// =============================================================================
// Assertions
// =============================================================================

pub fn codes(errors: &[DescriptionError]) -> Vec<&'static str> {
    errors.iter().map(|e| e.code).collect()
}

pub fn has_code(errors: &[DescriptionError], code: &str) -> bool {
    errors.iter().any(|e| e.code == code)
}

pub fn registry(yaml: &str) -> TypeRegistry {
    TypeRegistry::from_yaml(yaml).expect("type declarations should build")
}

pub fn registry_err(yaml: &str) -> TypeError {
    TypeRegistry::from_yaml(yaml).expect_err("type declarations should be rejected")
}
