//! Tagged form of a type declaration.
//!
//! A declaration arrives as loose YAML (`null`, or a mapping with one of
//! `is_a`/`list`/`tuple`/`mapping`/`union`). It is parsed once into a
//! `TypeDefinition` so illegal key combinations are rejected before any
//! name resolution happens.

use std::fmt;

use serde_yaml::Value;

use super::error::TypeError;

const IS_A: &str = "is_a";
const LIST: &str = "list";
const TUPLE: &str = "tuple";
const MAPPING: &str = "mapping";
const UNION: &str = "union";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StructureKind {
    List,
    Tuple,
    Mapping,
}

impl StructureKind {
    /// Structure keys in the order they are looked for.
    const ALL: [StructureKind; 3] = [StructureKind::List, StructureKind::Tuple, StructureKind::Mapping];

    pub fn key(self) -> &'static str {
        match self {
            StructureKind::List => LIST,
            StructureKind::Tuple => TUPLE,
            StructureKind::Mapping => MAPPING,
        }
    }
}

impl fmt::Display for StructureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Reference to a type from inside another definition.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeSpec {
    Named(String),
    Inline(Box<TypeDefinition>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum MappingSpec {
    Fields(Vec<(String, TypeSpec)>),
    KeyValue { key: TypeSpec, value: TypeSpec },
}

#[derive(Debug, Clone, PartialEq)]
pub enum TypeDefinition {
    Simple { super_type: Option<String> },
    List(TypeSpec),
    Tuple(Vec<TypeSpec>),
    Mapping(MappingSpec),
    Union(Vec<TypeSpec>),
}

impl TypeDefinition {
    /// Parse a declaration. `name` is `None` for inline definitions.
    pub fn from_yaml(name: Option<&str>, value: &Value) -> Result<Self, TypeError> {
        let map = match value {
            Value::Null => return Ok(TypeDefinition::Simple { super_type: None }),
            Value::Mapping(map) => map,
            _ => {
                return Err(TypeError::malformed(
                    name,
                    "definition must be a mapping or null",
                ));
            }
        };

        for key in map.keys() {
            match key.as_str() {
                Some(IS_A | LIST | TUPLE | MAPPING | UNION) => {}
                Some(other) => {
                    return Err(TypeError::malformed(name, format!("unknown key '{}'", other)));
                }
                None => return Err(TypeError::malformed(name, "definition keys must be strings")),
            }
        }

        let structures: Vec<(StructureKind, &Value)> = StructureKind::ALL
            .into_iter()
            .filter_map(|s| map.get(s.key()).map(|v| (s, v)))
            .collect();
        if structures.len() > 1 {
            return Err(TypeError::TooManyTypeStructures(
                structures.into_iter().map(|(s, _)| s).collect(),
            ));
        }
        let structure = structures.first().map(|(s, _)| *s);
        let union = map.get(UNION);
        let is_a = map.get(IS_A);

        if let (Some(_), Some(structure)) = (union, structure) {
            return Err(TypeError::UnionWithStructure(structure));
        }
        if is_a.is_some() {
            if let Some(structure) = structure {
                return Err(TypeError::SuperTypeOnNonSimple(structure.key()));
            }
            if union.is_some() {
                return Err(TypeError::SuperTypeOnNonSimple(UNION));
            }
        }

        if let Some(members) = union {
            let members = parse_spec_list(name, UNION, members)?;
            if members.is_empty() {
                return Err(TypeError::malformed(name, "union must have at least one member"));
            }
            return Ok(TypeDefinition::Union(members));
        }

        match structures.first() {
            Some((StructureKind::List, element)) => {
                Ok(TypeDefinition::List(TypeSpec::from_yaml(name, element)?))
            }
            Some((StructureKind::Tuple, elements)) => {
                Ok(TypeDefinition::Tuple(parse_spec_list(name, TUPLE, elements)?))
            }
            Some((StructureKind::Mapping, mapping)) => {
                Ok(TypeDefinition::Mapping(parse_mapping(name, mapping)?))
            }
            None => {
                let super_type = match is_a {
                    None => None,
                    Some(Value::String(s)) => Some(s.clone()),
                    Some(_) => {
                        return Err(TypeError::malformed(name, "'is_a' must name a type"));
                    }
                };
                Ok(TypeDefinition::Simple { super_type })
            }
        }
    }

    pub fn is_simple(&self) -> bool {
        matches!(self, TypeDefinition::Simple { .. })
    }
}

impl TypeSpec {
    /// Parse a member type spec: a type name or an inline anonymous definition.
    pub fn from_yaml(owner: Option<&str>, value: &Value) -> Result<Self, TypeError> {
        match value {
            Value::String(s) => Ok(TypeSpec::Named(s.clone())),
            Value::Mapping(_) => {
                let def = TypeDefinition::from_yaml(None, value)?;
                if def.is_simple() {
                    return Err(TypeError::AnonymousSimpleType);
                }
                Ok(TypeSpec::Inline(Box::new(def)))
            }
            Value::Null => Err(TypeError::AnonymousSimpleType),
            _ => Err(TypeError::malformed(
                owner,
                "member types must be type names or inline definitions",
            )),
        }
    }
}

fn parse_spec_list(owner: Option<&str>, key: &str, value: &Value) -> Result<Vec<TypeSpec>, TypeError> {
    let Value::Sequence(items) = value else {
        return Err(TypeError::malformed(owner, format!("'{}' must be a list of types", key)));
    };
    items.iter().map(|item| TypeSpec::from_yaml(owner, item)).collect()
}

fn parse_mapping(owner: Option<&str>, value: &Value) -> Result<MappingSpec, TypeError> {
    match value {
        Value::Mapping(fields) => {
            let mut parsed = Vec::with_capacity(fields.len());
            for (field, spec) in fields {
                let Some(field) = field.as_str() else {
                    return Err(TypeError::malformed(owner, "mapping field names must be strings"));
                };
                parsed.push((field.to_string(), TypeSpec::from_yaml(owner, spec)?));
            }
            Ok(MappingSpec::Fields(parsed))
        }
        Value::Sequence(pair) if pair.len() == 2 => Ok(MappingSpec::KeyValue {
            key: TypeSpec::from_yaml(owner, &pair[0])?,
            value: TypeSpec::from_yaml(owner, &pair[1])?,
        }),
        _ => Err(TypeError::malformed(
            owner,
            "'mapping' must be a field mapping or a [key_type, value_type] pair",
        )),
    }
}
