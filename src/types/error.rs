//! Errors raised while building a type registry.

use std::sync::Arc;

use thiserror::Error;

use super::Type;
use super::definition::StructureKind;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TypeError {
    #[error("Type '{0}' is not defined")]
    TypeNotFound(String),

    #[error("Type reference cycle: {}", .0.join(" -> "))]
    TypeReferenceCycle(Vec<String>),

    #[error("Built-in type '{0}' cannot be redefined")]
    BuiltinTypeRedefinition(String),

    /// Carries the resolved key type.
    #[error("Invalid mapping key type '{0}': must be 'string' or 'integer'")]
    InvalidKeyType(Arc<Type>),

    #[error("Super-type '{0}' of a simple type must itself be a simple type")]
    NonSimpleSuperType(String),

    #[error("Only simple types may declare a super-type (found 'is_a' with {0})")]
    SuperTypeOnNonSimple(&'static str),

    #[error("A type may have at most one structure, found: {}", format_structures(.0))]
    TooManyTypeStructures(Vec<StructureKind>),

    #[error("A union type cannot also be a {0}")]
    UnionWithStructure(StructureKind),

    #[error("Anonymous types must be structured or union types")]
    AnonymousSimpleType,

    #[error("Malformed definition for type {}: {reason}", .type_name.as_deref().unwrap_or("<anonymous>"))]
    MalformedTypeDefinition {
        type_name: Option<String>,
        reason: String,
    },
}

impl TypeError {
    pub(crate) fn malformed(type_name: Option<&str>, reason: impl Into<String>) -> Self {
        TypeError::MalformedTypeDefinition {
            type_name: type_name.map(str::to_string),
            reason: reason.into(),
        }
    }
}

fn format_structures(structures: &[StructureKind]) -> String {
    structures
        .iter()
        .map(|s| s.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
