//! WASM entry points for browser use.

use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};
use wasm_bindgen::prelude::*;

use crate::error::DescriptionError;
use crate::search::{SearchParseError, SearchTerm};
use crate::types::TypeRegistry;

/// Validate an entrypoint: a YAML task graph plus the tasks and parameters
/// it may use. Returns `{valid, errors}`.
#[wasm_bindgen]
pub fn validate_entrypoint(request_json: &str) -> JsValue {
    let result = validate_entrypoint_inner(request_json);
    serde_wasm_bindgen::to_value(&result).unwrap_or(JsValue::NULL)
}

/// Parse REST search text. Returns the terms or the parse error.
#[wasm_bindgen]
pub fn parse_search(text: &str) -> JsValue {
    let result = parse_search_inner(text);
    serde_wasm_bindgen::to_value(&result).unwrap_or(JsValue::NULL)
}

/// Check a YAML mapping of type declarations. Returns `{valid, error}`.
#[wasm_bindgen]
pub fn check_types(types_yaml: &str) -> JsValue {
    let result = check_types_inner(types_yaml);
    serde_wasm_bindgen::to_value(&result).unwrap_or(JsValue::NULL)
}

// ---------------------------------------------------------------------------
// Inner implementations (plain Rust, testable off-wasm)
// ---------------------------------------------------------------------------

pub fn validate_entrypoint_inner(request_json: &str) -> ValidationResponse {
    let request = match serde_json::from_str::<EntrypointRequest>(request_json) {
        Ok(r) => r,
        Err(e) => {
            return ValidationResponse::from_errors(vec![DescriptionError::parse(
                "P001",
                format!("Failed to parse entrypoint request JSON: {}", e),
            )]);
        }
    };

    match request.to_document() {
        Ok(doc) => ValidationResponse::from_errors(crate::validate::validate_document(&doc)),
        Err(errors) => ValidationResponse::from_errors(errors),
    }
}

pub fn parse_search_inner(text: &str) -> SearchResponse {
    match crate::search::parse_search_text(text) {
        Ok(terms) => SearchResponse::Success { terms },
        Err(error) => SearchResponse::Error { error },
    }
}

pub fn check_types_inner(types_yaml: &str) -> TypeCheckResponse {
    match TypeRegistry::from_yaml(types_yaml) {
        Ok(_) => TypeCheckResponse {
            valid: true,
            error: None,
        },
        Err(e) => TypeCheckResponse {
            valid: false,
            error: Some(e.to_string()),
        },
    }
}

// ---------------------------------------------------------------------------
// DTOs for serialization to and from JS
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct EntrypointRequest {
    /// YAML mapping of step name to step.
    pub task_graph: String,
    /// Task declarations of the entrypoint's plugins, keyed by short name.
    #[serde(default)]
    pub tasks: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    pub entrypoint_parameters: Vec<EntrypointParameter>,
}

#[derive(Debug, Deserialize)]
pub struct EntrypointParameter {
    pub name: String,
    #[serde(default)]
    pub default_value: Option<serde_json::Value>,
    /// Built-in type name the default must satisfy.
    #[serde(default)]
    pub parameter_type: Option<String>,
}

impl EntrypointRequest {
    /// Assemble the experiment description document.
    pub fn to_document(&self) -> Result<Value, Vec<DescriptionError>> {
        let graph = crate::parse::parse(&self.task_graph)?;
        let tasks = serde_yaml::to_value(&self.tasks).map_err(|e| {
            vec![DescriptionError::parse(
                "P001",
                format!("Failed to convert task declarations: {}", e),
            )]
        })?;

        let mut doc = Mapping::new();
        if !self.entrypoint_parameters.is_empty() {
            let mut parameters = Mapping::new();
            for parameter in &self.entrypoint_parameters {
                parameters.insert(Value::from(parameter.name.as_str()), parameter.to_spec()?);
            }
            doc.insert(Value::from("parameters"), Value::Mapping(parameters));
        }
        doc.insert(Value::from("tasks"), tasks);
        doc.insert(Value::from("graph"), graph);
        Ok(Value::Mapping(doc))
    }
}

impl EntrypointParameter {
    fn to_spec(&self) -> Result<Value, Vec<DescriptionError>> {
        let mut spec = Mapping::new();
        if let Some(default) = &self.default_value {
            let default = serde_yaml::to_value(default).map_err(|e| {
                vec![DescriptionError::parse(
                    "P001",
                    format!("Failed to convert default of parameter '{}': {}", self.name, e),
                )]
            })?;
            spec.insert(Value::from("default"), default);
        }
        if let Some(type_name) = &self.parameter_type {
            spec.insert(Value::from("type"), Value::from(type_name.as_str()));
        }
        Ok(Value::Mapping(spec))
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDto {
    pub code: String,
    pub phase: String,
    pub message: String,
    pub step: Option<String>,
}

impl From<DescriptionError> for ErrorDto {
    fn from(e: DescriptionError) -> Self {
        ErrorDto {
            code: e.code.to_string(),
            phase: e.phase.to_string(),
            message: e.message,
            step: e.step,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ValidationResponse {
    pub valid: bool,
    pub errors: Vec<ErrorDto>,
}

impl ValidationResponse {
    fn from_errors(errors: Vec<DescriptionError>) -> Self {
        ValidationResponse {
            valid: errors.is_empty(),
            errors: errors.into_iter().map(ErrorDto::from).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(tag = "status")]
pub enum SearchResponse {
    #[serde(rename = "success")]
    Success { terms: Vec<SearchTerm> },
    #[serde(rename = "error")]
    Error { error: SearchParseError },
}

#[derive(Debug, Serialize)]
pub struct TypeCheckResponse {
    pub valid: bool,
    pub error: Option<String>,
}
