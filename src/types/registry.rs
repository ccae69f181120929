//! Builds the table of resolved types from a flat `name -> definition` mapping.

use std::collections::{BTreeMap, HashMap};
use std::ops::Index;
use std::sync::Arc;

use serde_yaml::{Mapping, Value};

use super::definition::{MappingSpec, TypeDefinition, TypeSpec};
use super::error::TypeError;
use super::{
    BUILTIN_TYPES, INTEGER, MappingStructure, STRING, Type, TypeKind, TypeStructure, is_builtin,
};

/// Immutable table of named types: every declared type plus the built-ins.
#[derive(Debug, Clone)]
pub struct TypeRegistry {
    types: BTreeMap<String, Arc<Type>>,
}

impl TypeRegistry {
    /// Registry holding only the built-in types.
    pub fn builtin() -> Self {
        TypeRegistry {
            types: builtin_types(),
        }
    }

    /// Parse `text` as a YAML mapping of type declarations and build it.
    pub fn from_yaml(text: &str) -> Result<Self, TypeError> {
        let value: Value = serde_yaml::from_str(text)
            .map_err(|e| TypeError::malformed(None, format!("invalid YAML: {}", e)))?;
        match value {
            Value::Null => Ok(Self::builtin()),
            Value::Mapping(types) => Self::build(&types),
            _ => Err(TypeError::malformed(None, "type declarations must be a mapping")),
        }
    }

    pub fn build(types: &Mapping) -> Result<Self, TypeError> {
        tracing::debug!(declared = types.len(), "building type registry");

        let mut declarations: Vec<(&str, TypeDefinition)> = Vec::with_capacity(types.len());
        for (key, definition) in types {
            let name = match key {
                Value::String(name) => name.as_str(),
                Value::Null => {
                    let definition = TypeDefinition::from_yaml(None, definition)?;
                    if definition.is_simple() {
                        return Err(TypeError::AnonymousSimpleType);
                    }
                    return Err(TypeError::malformed(None, "top-level types must be named"));
                }
                _ => return Err(TypeError::malformed(None, "type names must be strings")),
            };
            if is_builtin(name) {
                return Err(TypeError::BuiltinTypeRedefinition(name.to_string()));
            }
            declarations.push((name, TypeDefinition::from_yaml(Some(name), definition)?));
        }

        let mut resolver = Resolver {
            declarations: declarations.iter().map(|(n, d)| (*n, d)).collect(),
            resolved: builtin_types(),
            resolving: Vec::new(),
        };
        for (name, _) in &declarations {
            resolver.resolve_name(name)?;
        }

        tracing::debug!(types = resolver.resolved.len(), "type registry built");
        Ok(TypeRegistry {
            types: resolver.resolved,
        })
    }

    pub fn get(&self, name: &str) -> Option<&Arc<Type>> {
        self.types.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Arc<Type>)> {
        self.types.iter().map(|(name, t)| (name.as_str(), t))
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

impl Index<&str> for TypeRegistry {
    type Output = Arc<Type>;

    fn index(&self, name: &str) -> &Self::Output {
        match self.types.get(name) {
            Some(t) => t,
            None => panic!("type '{}' is not registered", name),
        }
    }
}

fn builtin_types() -> BTreeMap<String, Arc<Type>> {
    let mut types: BTreeMap<String, Arc<Type>> = BTreeMap::new();
    // Ordered so that every super-type is inserted before its subtypes.
    for (name, super_name) in BUILTIN_TYPES {
        let super_type = super_name.and_then(|s| types.get(s).cloned());
        types.insert(name.to_string(), Arc::new(Type::simple(name, super_type)));
    }
    types
}

struct Resolver<'a> {
    declarations: HashMap<&'a str, &'a TypeDefinition>,
    resolved: BTreeMap<String, Arc<Type>>,
    /// Names currently being resolved, outermost first.
    resolving: Vec<String>,
}

impl Resolver<'_> {
    fn resolve_name(&mut self, name: &str) -> Result<Arc<Type>, TypeError> {
        if let Some(t) = self.resolved.get(name) {
            return Ok(t.clone());
        }

        if let Some(start) = self.resolving.iter().position(|n| n == name) {
            let mut cycle = self.resolving[start..].to_vec();
            cycle.push(name.to_string());
            return Err(TypeError::TypeReferenceCycle(cycle));
        }

        let definition = *self
            .declarations
            .get(name)
            .ok_or_else(|| TypeError::TypeNotFound(name.to_string()))?;

        self.resolving.push(name.to_string());
        let resolved = Arc::new(self.build_type(Some(name), definition)?);
        self.resolving.pop();

        tracing::trace!(type_name = name, resolved = %resolved, "resolved type");
        self.resolved.insert(name.to_string(), resolved.clone());
        Ok(resolved)
    }

    fn resolve_spec(&mut self, spec: &TypeSpec) -> Result<Arc<Type>, TypeError> {
        match spec {
            TypeSpec::Named(name) => self.resolve_name(name),
            TypeSpec::Inline(definition) => Ok(Arc::new(self.build_type(None, definition)?)),
        }
    }

    fn resolve_specs(&mut self, specs: &[TypeSpec]) -> Result<Vec<Arc<Type>>, TypeError> {
        specs.iter().map(|spec| self.resolve_spec(spec)).collect()
    }

    fn build_type(&mut self, name: Option<&str>, definition: &TypeDefinition) -> Result<Type, TypeError> {
        let kind = match definition {
            TypeDefinition::Simple { super_type } => {
                let super_type = match super_type {
                    Some(super_name) => {
                        let resolved = self.resolve_name(super_name)?;
                        if !resolved.is_simple() {
                            return Err(TypeError::NonSimpleSuperType(super_name.clone()));
                        }
                        Some(resolved)
                    }
                    None => None,
                };
                TypeKind::Simple { super_type }
            }
            TypeDefinition::List(element) => {
                TypeKind::Structured(TypeStructure::List(self.resolve_spec(element)?))
            }
            TypeDefinition::Tuple(elements) => {
                TypeKind::Structured(TypeStructure::Tuple(self.resolve_specs(elements)?))
            }
            TypeDefinition::Mapping(MappingSpec::Fields(fields)) => {
                let mut resolved = Vec::with_capacity(fields.len());
                for (field, spec) in fields {
                    resolved.push((field.clone(), self.resolve_spec(spec)?));
                }
                TypeKind::Structured(TypeStructure::Mapping(MappingStructure::Fields(resolved)))
            }
            TypeDefinition::Mapping(MappingSpec::KeyValue { key, value }) => {
                let key = self.resolve_spec(key)?;
                let valid_key = key.is_builtin() && matches!(key.name(), Some(STRING | INTEGER));
                if !valid_key {
                    return Err(TypeError::InvalidKeyType(key));
                }
                let value = self.resolve_spec(value)?;
                TypeKind::Structured(TypeStructure::Mapping(MappingStructure::KeyValue { key, value }))
            }
            TypeDefinition::Union(members) => TypeKind::Union(self.resolve_specs(members)?),
        };
        Ok(Type::new(name.map(str::to_string), kind))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(yaml: &str) -> Result<TypeRegistry, TypeError> {
        TypeRegistry::from_yaml(yaml)
    }

    #[test]
    fn empty_registry_has_builtins() {
        let reg = build("{}").unwrap();
        assert_eq!(reg.len(), 6);
        for name in ["any", "number", "integer", "boolean", "string", "null"] {
            assert!(reg.contains(name), "missing builtin {}", name);
        }
    }

    #[test]
    fn memoized_reference_is_shared() {
        let reg = build("{A: null, B: {list: A}, C: {list: A}}").unwrap();
        let TypeKind::Structured(TypeStructure::List(b_elem)) = reg["B"].kind() else {
            panic!("B should be a list");
        };
        let TypeKind::Structured(TypeStructure::List(c_elem)) = reg["C"].kind() else {
            panic!("C should be a list");
        };
        assert!(Arc::ptr_eq(b_elem, c_elem));
        assert!(Arc::ptr_eq(b_elem, &reg["A"]));
    }

    #[test]
    fn cycle_path_starts_at_repeated_name() {
        let err = build("{X: {is_a: A}, A: {is_a: C}, B: {is_a: A}, C: {is_a: B}}").unwrap_err();
        assert_eq!(
            err,
            TypeError::TypeReferenceCycle(vec!["A".into(), "C".into(), "B".into(), "A".into()])
        );
    }

    #[test]
    fn null_keyed_simple_type_is_anonymous() {
        assert_eq!(build("{~: {is_a: integer}}").unwrap_err(), TypeError::AnonymousSimpleType);
    }
}
