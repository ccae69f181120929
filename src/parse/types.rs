//! Typed model of an experiment description.
//!
//! Produced by `parse::describe` from the loose YAML document once its shape
//! has been checked. Semantic rules (references, collisions, cycles) run on
//! this model.

use serde::Serialize;
use serde_yaml::Value;

use super::reference::Reference;

#[derive(Debug, Clone, Serialize)]
pub struct ExperimentDescription {
    pub parameters: Vec<Parameter>,
    pub tasks: Vec<TaskDef>,
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Parameter {
    pub name: String,
    /// `null` when the description gives no default.
    pub default: Value,
    /// Built-in type the default must satisfy.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub type_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskDef {
    pub name: String,
    pub plugin: String,
    pub outputs: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Step {
    pub name: String,
    pub task: String,
    pub args: Vec<Argument>,
    pub kwargs: Vec<(String, Argument)>,
    pub dependencies: Vec<String>,
}

/// A step argument, possibly nested.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Argument {
    Literal(Value),
    Reference(Reference),
    List(Vec<Argument>),
    Map(Vec<(Value, Argument)>),
}

impl Argument {
    /// Collect every reference in this argument tree, depth first.
    pub fn collect_references<'a>(&'a self, refs: &mut Vec<&'a Reference>) {
        match self {
            Argument::Literal(_) => {}
            Argument::Reference(r) => refs.push(r),
            Argument::List(items) => {
                for item in items {
                    item.collect_references(refs);
                }
            }
            Argument::Map(entries) => {
                for (_, value) in entries {
                    value.collect_references(refs);
                }
            }
        }
    }
}

impl Step {
    /// Every reference in the step's positional and keyword arguments.
    pub fn references(&self) -> Vec<&Reference> {
        let mut refs = Vec::new();
        for arg in &self.args {
            arg.collect_references(&mut refs);
        }
        for (_, arg) in &self.kwargs {
            arg.collect_references(&mut refs);
        }
        refs
    }
}

impl ExperimentDescription {
    pub fn parameter(&self, name: &str) -> Option<&Parameter> {
        self.parameters.iter().find(|p| p.name == name)
    }

    pub fn task(&self, name: &str) -> Option<&TaskDef> {
        self.tasks.iter().find(|t| t.name == name)
    }

    pub fn step(&self, name: &str) -> Option<&Step> {
        self.steps.iter().find(|s| s.name == name)
    }
}
