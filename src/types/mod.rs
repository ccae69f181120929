//! Plugin parameter type system.
//!
//! Types are immutable trees shared through `Arc`. Reference cycles are
//! rejected when the registry is built, so a type never reaches itself.

pub mod definition;
pub mod error;
pub mod registry;

use std::fmt;
use std::sync::Arc;

use serde_yaml::Value;

pub use definition::{MappingSpec, StructureKind, TypeDefinition, TypeSpec};
pub use error::TypeError;
pub use registry::TypeRegistry;

pub const ANY: &str = "any";
pub const NUMBER: &str = "number";
pub const INTEGER: &str = "integer";
pub const BOOLEAN: &str = "boolean";
pub const STRING: &str = "string";
pub const NULL: &str = "null";

/// Built-in simple types, each paired with its super-type.
pub const BUILTIN_TYPES: [(&str, Option<&str>); 6] = [
    (ANY, None),
    (NUMBER, Some(ANY)),
    (INTEGER, Some(NUMBER)),
    (BOOLEAN, Some(ANY)),
    (STRING, Some(ANY)),
    (NULL, Some(ANY)),
];

pub fn is_builtin(name: &str) -> bool {
    BUILTIN_TYPES.iter().any(|(builtin, _)| *builtin == name)
}

#[derive(Debug, Clone)]
pub struct Type {
    name: Option<String>,
    kind: TypeKind,
}

#[derive(Debug, Clone)]
pub enum TypeKind {
    Simple { super_type: Option<Arc<Type>> },
    Structured(TypeStructure),
    Union(Vec<Arc<Type>>),
}

#[derive(Debug, Clone)]
pub enum TypeStructure {
    List(Arc<Type>),
    Tuple(Vec<Arc<Type>>),
    Mapping(MappingStructure),
}

#[derive(Debug, Clone)]
pub enum MappingStructure {
    Fields(Vec<(String, Arc<Type>)>),
    KeyValue { key: Arc<Type>, value: Arc<Type> },
}

impl Type {
    pub fn new(name: Option<String>, kind: TypeKind) -> Self {
        Type { name, kind }
    }

    pub fn simple(name: impl Into<String>, super_type: Option<Arc<Type>>) -> Self {
        Type::new(Some(name.into()), TypeKind::Simple { super_type })
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn kind(&self) -> &TypeKind {
        &self.kind
    }

    pub fn super_type(&self) -> Option<&Arc<Type>> {
        match &self.kind {
            TypeKind::Simple { super_type } => super_type.as_ref(),
            _ => None,
        }
    }

    pub fn is_simple(&self) -> bool {
        matches!(self.kind, TypeKind::Simple { .. })
    }

    pub fn is_builtin(&self) -> bool {
        self.is_simple() && self.name().is_some_and(is_builtin)
    }

    fn is_named(&self, name: &str) -> bool {
        self.name() == Some(name)
    }

    /// Walks the simple super-type chain, starting with `self`.
    pub fn ancestors(&self) -> impl Iterator<Item = &Type> {
        std::iter::successors(Some(self), |t| t.super_type().map(|s| s.as_ref()))
    }

    /// True if a value of `self` can be used where `other` is expected.
    pub fn is_subtype_of(&self, other: &Type) -> bool {
        if self.same_type(other) || (other.is_builtin() && other.is_named(ANY)) {
            return true;
        }

        if let TypeKind::Union(members) = &self.kind {
            return members.iter().all(|m| m.is_subtype_of(other));
        }
        if let TypeKind::Union(members) = &other.kind {
            return members.iter().any(|m| self.is_subtype_of(m));
        }

        match (&self.kind, &other.kind) {
            (TypeKind::Simple { .. }, TypeKind::Simple { .. }) => {
                self.ancestors().any(|t| t.same_type(other))
            }
            (TypeKind::Structured(mine), TypeKind::Structured(theirs)) => {
                structure_is_subtype(mine, theirs)
            }
            _ => false,
        }
    }

    /// Named types are identified by name; anonymous types structurally.
    pub fn same_type(&self, other: &Type) -> bool {
        match (&self.name, &other.name) {
            (Some(a), Some(b)) => a == b,
            (None, None) => match (&self.kind, &other.kind) {
                (TypeKind::Structured(a), TypeKind::Structured(b)) => structure_eq(a, b),
                (TypeKind::Union(a), TypeKind::Union(b)) => all_same(a, b),
                _ => false,
            },
            _ => false,
        }
    }

    /// Value-level check of a YAML value against this type.
    ///
    /// User simple types defer to their nearest built-in ancestor. A simple
    /// type with no built-in ancestor is purely nominal and accepts anything.
    pub fn accepts(&self, value: &Value) -> bool {
        match &self.kind {
            TypeKind::Simple { .. } => match self.ancestors().find(|t| t.is_builtin()) {
                Some(builtin) => builtin_accepts(builtin.name().unwrap_or(ANY), value),
                None => true,
            },
            TypeKind::Union(members) => members.iter().any(|m| m.accepts(value)),
            TypeKind::Structured(TypeStructure::List(element)) => value
                .as_sequence()
                .is_some_and(|items| items.iter().all(|v| element.accepts(v))),
            TypeKind::Structured(TypeStructure::Tuple(elements)) => {
                value.as_sequence().is_some_and(|items| {
                    items.len() == elements.len()
                        && items.iter().zip(elements).all(|(v, t)| t.accepts(v))
                })
            }
            TypeKind::Structured(TypeStructure::Mapping(MappingStructure::Fields(fields))) => {
                value.as_mapping().is_some_and(|map| {
                    map.len() == fields.len()
                        && fields
                            .iter()
                            .all(|(name, t)| map.get(name.as_str()).is_some_and(|v| t.accepts(v)))
                })
            }
            TypeKind::Structured(TypeStructure::Mapping(MappingStructure::KeyValue {
                key,
                value: value_type,
            })) => value.as_mapping().is_some_and(|map| {
                map.iter().all(|(k, v)| key.accepts(k) && value_type.accepts(v))
            }),
        }
    }
}

fn builtin_accepts(builtin: &str, value: &Value) -> bool {
    match builtin {
        NUMBER => value.is_number(),
        INTEGER => value.is_i64() || value.is_u64(),
        BOOLEAN => value.is_bool(),
        STRING => value.is_string(),
        NULL => value.is_null(),
        _ => true,
    }
}

fn all_same(a: &[Arc<Type>], b: &[Arc<Type>]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.same_type(y))
}

fn structure_eq(a: &TypeStructure, b: &TypeStructure) -> bool {
    match (a, b) {
        (TypeStructure::List(x), TypeStructure::List(y)) => x.same_type(y),
        (TypeStructure::Tuple(x), TypeStructure::Tuple(y)) => all_same(x, y),
        (
            TypeStructure::Mapping(MappingStructure::Fields(x)),
            TypeStructure::Mapping(MappingStructure::Fields(y)),
        ) => {
            x.len() == y.len()
                && x.iter().all(|(name, t)| {
                    y.iter().any(|(other, u)| other == name && t.same_type(u))
                })
        }
        (
            TypeStructure::Mapping(MappingStructure::KeyValue { key: k1, value: v1 }),
            TypeStructure::Mapping(MappingStructure::KeyValue { key: k2, value: v2 }),
        ) => k1.same_type(k2) && v1.same_type(v2),
        _ => false,
    }
}

fn structure_is_subtype(mine: &TypeStructure, theirs: &TypeStructure) -> bool {
    match (mine, theirs) {
        (TypeStructure::List(x), TypeStructure::List(y)) => x.is_subtype_of(y),
        (TypeStructure::Tuple(x), TypeStructure::Tuple(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(a, b)| a.is_subtype_of(b))
        }
        (
            TypeStructure::Mapping(MappingStructure::Fields(x)),
            TypeStructure::Mapping(MappingStructure::Fields(y)),
        ) => {
            x.len() == y.len()
                && y.iter().all(|(name, u)| {
                    x.iter().any(|(other, t)| other == name && t.is_subtype_of(u))
                })
        }
        (
            TypeStructure::Mapping(MappingStructure::KeyValue { key: k1, value: v1 }),
            TypeStructure::Mapping(MappingStructure::KeyValue { key: k2, value: v2 }),
        ) => k1.same_type(k2) && v1.is_subtype_of(v2),
        (
            TypeStructure::Mapping(MappingStructure::Fields(fields)),
            TypeStructure::Mapping(MappingStructure::KeyValue { key, value }),
        ) => key.is_named(STRING) && fields.iter().all(|(_, t)| t.is_subtype_of(value)),
        _ => false,
    }
}

impl PartialEq for Type {
    fn eq(&self, other: &Self) -> bool {
        self.same_type(other)
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(name) = &self.name {
            return f.write_str(name);
        }
        match &self.kind {
            TypeKind::Simple { .. } => f.write_str("<anonymous>"),
            TypeKind::Union(members) => write!(f, "union[{}]", join(members)),
            TypeKind::Structured(TypeStructure::List(element)) => write!(f, "list[{}]", element),
            TypeKind::Structured(TypeStructure::Tuple(elements)) => {
                write!(f, "tuple[{}]", join(elements))
            }
            TypeKind::Structured(TypeStructure::Mapping(MappingStructure::KeyValue {
                key,
                value,
            })) => write!(f, "mapping[{}, {}]", key, value),
            TypeKind::Structured(TypeStructure::Mapping(MappingStructure::Fields(fields))) => {
                let fields: Vec<String> =
                    fields.iter().map(|(name, t)| format!("{}: {}", name, t)).collect();
                write!(f, "{{{}}}", fields.join(", "))
            }
        }
    }
}

fn join(types: &[Arc<Type>]) -> String {
    types.iter().map(|t| t.to_string()).collect::<Vec<_>>().join(", ")
}
