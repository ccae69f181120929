//! Integration tests for the browser entry points, through their plain-Rust
//! inner functions.

use serde_json::json;
use task_engine::wasm::{
    SearchResponse, check_types_inner, parse_search_inner, validate_entrypoint_inner,
};

fn request(task_graph: &str, parameters: serde_json::Value) -> String {
    json!({
        "task_graph": task_graph,
        "tasks": {
            "load": {"plugin": "org.example.load", "outputs": "dataset"},
            "fit": {"plugin": "org.example.fit", "outputs": ["model", "history"]},
        },
        "entrypoint_parameters": parameters,
    })
    .to_string()
}

#[test]
fn valid_entrypoint() {
    let graph = "\
load_step:
  load: [$data_dir]
fit_step:
  task: fit
  kwargs:
    data: $load_step
    epochs: $epochs
";
    let parameters = json!([
        {"name": "data_dir", "default_value": "/data", "parameter_type": "string"},
        {"name": "epochs", "default_value": 3, "parameter_type": "integer"},
    ]);
    let response = validate_entrypoint_inner(&request(graph, parameters));
    assert!(response.valid, "Expected valid, got: {:?}", response.errors);
    assert!(response.errors.is_empty());
}

#[test]
fn undeclared_parameter_is_reported_with_step() {
    let response = validate_entrypoint_inner(&request("load_step: {load: [$data_dir]}", json!([])));
    assert!(!response.valid);
    assert_eq!(response.errors.len(), 1);
    let error = &response.errors[0];
    assert_eq!(error.code, "R001");
    assert_eq!(error.phase, "Validate");
    assert_eq!(error.step.as_deref(), Some("load_step"));
}

#[test]
fn default_must_match_parameter_type() {
    let parameters = json!([{"name": "epochs", "default_value": "many", "parameter_type": "integer"}]);
    let response = validate_entrypoint_inner(&request("load_step: {load: [$epochs]}", parameters));
    assert!(!response.valid);
    assert_eq!(response.errors[0].code, "S025");
    assert_eq!(response.errors[0].phase, "Parse");
}

#[test]
fn ambiguous_output_reference() {
    let graph = "fit_step: {fit: [1]}\nload_step: {load: [$fit_step]}";
    let response = validate_entrypoint_inner(&request(graph, json!([])));
    let codes: Vec<&str> = response.errors.iter().map(|e| e.code.as_str()).collect();
    assert_eq!(codes, vec!["R003"]);
}

#[test]
fn malformed_request_json() {
    let response = validate_entrypoint_inner("{not json");
    assert!(!response.valid);
    assert_eq!(response.errors[0].code, "P001");
}

#[test]
fn malformed_task_graph_yaml() {
    let response = validate_entrypoint_inner(&request("load_step: [", json!([])));
    assert!(!response.valid);
    assert_eq!(response.errors[0].code, "P001");
}

#[test]
fn search_success_and_error() {
    match parse_search_inner("name:mnist*") {
        SearchResponse::Success { terms } => {
            assert_eq!(terms.len(), 1);
            assert_eq!(terms[0].field.as_deref(), Some("name"));
        }
        SearchResponse::Error { error } => panic!("unexpected error: {}", error),
    }

    let SearchResponse::Error { error } = parse_search_inner("name:two words") else {
        panic!("multi-word field value should be rejected");
    };
    assert_eq!(error.text, "name:two words");
}

#[test]
fn search_response_is_tagged() {
    let value = serde_json::to_value(parse_search_inner("cv")).unwrap();
    assert_eq!(value, json!({"status": "success", "terms": [{"field": null, "value": ["cv"]}]}));
}

#[test]
fn type_check() {
    let response = check_types_inner("{A: null, B: {is_a: A}}");
    assert!(response.valid);
    assert_eq!(response.error, None);

    let response = check_types_inner("{A: {list: B}, B: {list: A}}");
    assert!(!response.valid);
    assert_eq!(
        response.error.as_deref(),
        Some("Type reference cycle: A -> B -> A")
    );
}
