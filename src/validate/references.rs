//! Reference resolution rules (R001–R004).
//!
//! Parameters and steps share one namespace. A parameter may only be
//! referenced bare (`$param`). A step is referenced through its task's
//! outputs: `$step.output` names one of them, and bare `$step` is allowed
//! only when the task declares exactly one output.

use crate::error::DescriptionError;
use crate::parse::reference::Reference;
use crate::parse::types::{ExperimentDescription, Step};

pub fn validate_references(description: &ExperimentDescription) -> Vec<DescriptionError> {
    let mut errors = Vec::new();
    for step in &description.steps {
        for reference in step.references() {
            if let Some((code, message)) = check_reference(description, reference) {
                errors.push(DescriptionError::validate(code, message, Some(&step.name)));
            }
        }
    }
    errors
}

fn check_reference(
    description: &ExperimentDescription,
    reference: &Reference,
) -> Option<(&'static str, String)> {
    if description.parameter(&reference.name).is_some() {
        return reference.field.as_ref().map(|_| {
            (
                "R002",
                format!(
                    "'{}' refers to parameter '{}', which has no fields",
                    reference, reference.name
                ),
            )
        });
    }

    let Some(target) = description.step(&reference.name) else {
        return Some((
            "R001",
            format!(
                "'{}' does not name a parameter or a step",
                reference
            ),
        ));
    };

    check_output_reference(description, target, reference)
}

fn check_output_reference(
    description: &ExperimentDescription,
    target: &Step,
    reference: &Reference,
) -> Option<(&'static str, String)> {
    let outputs = description
        .task(&target.task)
        .map(|t| t.outputs.as_slice())
        .unwrap_or_default();

    match &reference.field {
        None if outputs.len() == 1 => None,
        None => Some((
            "R003",
            format!(
                "'{}' is ambiguous: task '{}' declares {} outputs",
                reference,
                target.task,
                outputs.len()
            ),
        )),
        Some(field) if outputs.contains(field) => None,
        Some(field) => Some((
            "R004",
            format!(
                "'{}' refers to output '{}', which task '{}' does not declare",
                reference, field, target.task
            ),
        )),
    }
}
