//! Shape checks (S001–S038) that turn a YAML document into an
//! `ExperimentDescription`.

use std::collections::HashSet;

use serde_yaml::{Mapping, Value};

use super::reference::Reference;
use super::types::*;
use crate::error::DescriptionError;
use crate::types::TypeRegistry;

pub const PARAMETERS: &str = "parameters";
pub const TASKS: &str = "tasks";
pub const GRAPH: &str = "graph";

/// Minimum number of dot-separated segments in a plugin path.
pub const PLUGIN_MIN_SEGMENTS: usize = 3;

const PLUGIN: &str = "plugin";
const OUTPUTS: &str = "outputs";
const DEFAULT: &str = "default";
const TYPE: &str = "type";
const TASK: &str = "task";
const ARGS: &str = "args";
const KWARGS: &str = "kwargs";
const DEPENDENCIES: &str = "dependencies";

/// Check the shape of `doc` and build the typed description.
pub fn describe(doc: &Value) -> Result<ExperimentDescription, Vec<DescriptionError>> {
    let Value::Mapping(root) = doc else {
        return Err(vec![DescriptionError::parse(
            "S001",
            "Experiment description must be a mapping",
        )]);
    };

    let mut errors = Vec::new();

    for key in root.keys() {
        if !matches!(key.as_str(), Some(PARAMETERS | TASKS | GRAPH)) {
            errors.push(DescriptionError::parse(
                "S002",
                format!("Unknown top-level key {}", describe_key(key)),
            ));
        }
    }
    for required in [TASKS, GRAPH] {
        if !root.contains_key(required) {
            errors.push(DescriptionError::parse(
                "S003",
                format!("Missing required key '{}'", required),
            ));
        }
    }

    let parameters = match root.get(PARAMETERS) {
        Some(value) => parse_parameters(value, &mut errors),
        None => Vec::new(),
    };
    let tasks = root
        .get(TASKS)
        .map(|value| parse_tasks(value, &mut errors))
        .unwrap_or_default();
    let task_names = declared_task_names(root);
    let steps = root
        .get(GRAPH)
        .map(|value| parse_graph(value, &task_names, &mut errors))
        .unwrap_or_default();

    if errors.is_empty() {
        Ok(ExperimentDescription {
            parameters,
            tasks,
            steps,
        })
    } else {
        Err(errors)
    }
}

fn describe_key(key: &Value) -> String {
    match key.as_str() {
        Some(s) => format!("'{}'", s),
        None => format!("{:?}", key),
    }
}

// ---------------------------------------------------------------------------
// parameters
// ---------------------------------------------------------------------------

fn parse_parameters(value: &Value, errors: &mut Vec<DescriptionError>) -> Vec<Parameter> {
    let mut seen = HashSet::new();
    let mut parameters = Vec::new();

    let mut declare = |name: &str, errors: &mut Vec<DescriptionError>| -> bool {
        if name.contains('.') {
            errors.push(DescriptionError::parse(
                "S023",
                format!("Parameter name '{}' must not contain '.'", name),
            ));
            return false;
        }
        if !seen.insert(name.to_string()) {
            errors.push(DescriptionError::parse(
                "S022",
                format!("Duplicate parameter '{}'", name),
            ));
            return false;
        }
        true
    };

    match value {
        Value::Sequence(names) => {
            for name in names {
                let Some(name) = name.as_str() else {
                    errors.push(DescriptionError::parse(
                        "S021",
                        format!("Parameter names must be strings, found {:?}", name),
                    ));
                    continue;
                };
                if declare(name, errors) {
                    parameters.push(Parameter {
                        name: name.to_string(),
                        default: Value::Null,
                        type_name: None,
                    });
                }
            }
        }
        Value::Mapping(entries) => {
            for (name, spec) in entries {
                let Some(name) = name.as_str() else {
                    errors.push(DescriptionError::parse(
                        "S021",
                        format!("Parameter names must be strings, found {:?}", name),
                    ));
                    continue;
                };
                if !declare(name, errors) {
                    continue;
                }
                if let Some(parameter) = parse_parameter(name, spec, errors) {
                    parameters.push(parameter);
                }
            }
        }
        _ => errors.push(DescriptionError::parse(
            "S020",
            "'parameters' must be a list of names or a mapping",
        )),
    }

    parameters
}

fn parse_parameter(name: &str, spec: &Value, errors: &mut Vec<DescriptionError>) -> Option<Parameter> {
    let Value::Mapping(spec) = spec else {
        return Some(Parameter {
            name: name.to_string(),
            default: spec.clone(),
            type_name: None,
        });
    };

    for key in spec.keys() {
        if !matches!(key.as_str(), Some(DEFAULT | TYPE)) {
            errors.push(DescriptionError::parse(
                "S024",
                format!("Unknown key {} in parameter '{}'", describe_key(key), name),
            ));
            return None;
        }
    }

    let default = spec.get(DEFAULT);
    let type_name = match spec.get(TYPE) {
        None => None,
        Some(Value::String(type_name)) => Some(type_name.clone()),
        Some(other) => {
            errors.push(DescriptionError::parse(
                "S025",
                format!("Type of parameter '{}' must be a type name, found {:?}", name, other),
            ));
            return None;
        }
    };

    if let Some(type_name) = &type_name {
        let builtins = TypeRegistry::builtin();
        let Some(parameter_type) = builtins.get(type_name) else {
            errors.push(DescriptionError::parse(
                "S025",
                format!("Parameter '{}' has unknown type '{}'", name, type_name),
            ));
            return None;
        };
        if let Some(default) = default {
            if !parameter_type.accepts(default) {
                errors.push(DescriptionError::parse(
                    "S025",
                    format!(
                        "Default of parameter '{}' is not a valid '{}'",
                        name, type_name
                    ),
                ));
                return None;
            }
        }
    }

    Some(Parameter {
        name: name.to_string(),
        default: default.cloned().unwrap_or(Value::Null),
        type_name,
    })
}

// ---------------------------------------------------------------------------
// tasks
// ---------------------------------------------------------------------------

fn parse_tasks(value: &Value, errors: &mut Vec<DescriptionError>) -> Vec<TaskDef> {
    let entries = match value {
        Value::Mapping(entries) if !entries.is_empty() => entries,
        _ => {
            errors.push(DescriptionError::parse(
                "S010",
                "'tasks' must be a non-empty mapping",
            ));
            return Vec::new();
        }
    };

    let mut tasks = Vec::with_capacity(entries.len());
    for (name, spec) in entries {
        let Some(name) = name.as_str() else {
            errors.push(DescriptionError::parse(
                "S011",
                format!("Task names must be strings, found {:?}", name),
            ));
            continue;
        };
        if let Some(task) = parse_task(name, spec, errors) {
            tasks.push(task);
        }
    }
    tasks
}

fn parse_task(name: &str, spec: &Value, errors: &mut Vec<DescriptionError>) -> Option<TaskDef> {
    let Value::Mapping(spec) = spec else {
        errors.push(DescriptionError::parse(
            "S012",
            format!("Task '{}' must be a mapping with a 'plugin'", name),
        ));
        return None;
    };

    let mut ok = true;
    for key in spec.keys() {
        if !matches!(key.as_str(), Some(PLUGIN | OUTPUTS)) {
            errors.push(DescriptionError::parse(
                "S014",
                format!("Unknown key {} in task '{}'", describe_key(key), name),
            ));
            ok = false;
        }
    }

    let plugin = match spec.get(PLUGIN) {
        None => {
            errors.push(DescriptionError::parse(
                "S012",
                format!("Task '{}' is missing 'plugin'", name),
            ));
            None
        }
        Some(Value::String(plugin)) if is_valid_plugin_path(plugin) => Some(plugin.clone()),
        Some(other) => {
            errors.push(DescriptionError::parse(
                "S013",
                format!(
                    "Task '{}' plugin {:?} must be a dotted path of at least {} identifiers",
                    name, other, PLUGIN_MIN_SEGMENTS
                ),
            ));
            None
        }
    };

    let outputs = match spec.get(OUTPUTS) {
        None => Some(Vec::new()),
        Some(value) => parse_outputs(name, value, errors),
    };

    match (plugin, outputs) {
        (Some(plugin), Some(outputs)) if ok => Some(TaskDef {
            name: name.to_string(),
            plugin,
            outputs,
        }),
        _ => None,
    }
}

fn parse_outputs(task: &str, value: &Value, errors: &mut Vec<DescriptionError>) -> Option<Vec<String>> {
    let outputs = match value {
        Value::String(output) => vec![output.clone()],
        Value::Sequence(items) => {
            let names: Option<Vec<String>> =
                items.iter().map(|v| v.as_str().map(str::to_string)).collect();
            match names {
                Some(names) => names,
                None => {
                    errors.push(DescriptionError::parse(
                        "S015",
                        format!("Outputs of task '{}' must be strings", task),
                    ));
                    return None;
                }
            }
        }
        _ => {
            errors.push(DescriptionError::parse(
                "S015",
                format!("Outputs of task '{}' must be a name or a list of names", task),
            ));
            return None;
        }
    };

    let mut seen = HashSet::new();
    for output in &outputs {
        if output.is_empty() || output.contains('.') || !seen.insert(output.as_str()) {
            errors.push(DescriptionError::parse(
                "S015",
                format!("Invalid or duplicate output '{}' in task '{}'", output, task),
            ));
            return None;
        }
    }
    Some(outputs)
}

/// `a.b.c`: at least `PLUGIN_MIN_SEGMENTS` identifiers joined by dots.
pub fn is_valid_plugin_path(path: &str) -> bool {
    let segments: Vec<&str> = path.split('.').collect();
    segments.len() >= PLUGIN_MIN_SEGMENTS && segments.iter().all(|s| is_identifier(s))
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}

/// Task names as declared, even when a task's own definition is invalid, so
/// graph steps are not also flagged for naming it.
fn declared_task_names(root: &Mapping) -> HashSet<String> {
    root.get(TASKS)
        .and_then(Value::as_mapping)
        .map(|tasks| {
            tasks
                .keys()
                .filter_map(|k| k.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

// ---------------------------------------------------------------------------
// graph
// ---------------------------------------------------------------------------

fn parse_graph(
    value: &Value,
    task_names: &HashSet<String>,
    errors: &mut Vec<DescriptionError>,
) -> Vec<Step> {
    let entries = match value {
        Value::Mapping(entries) if !entries.is_empty() => entries,
        _ => {
            errors.push(DescriptionError::parse(
                "S030",
                "'graph' must be a non-empty mapping",
            ));
            return Vec::new();
        }
    };

    let mut steps = Vec::with_capacity(entries.len());
    for (name, spec) in entries {
        let Some(name) = name.as_str() else {
            errors.push(DescriptionError::parse(
                "S031",
                format!("Step names must be strings, found {:?}", name),
            ));
            continue;
        };
        if name.contains('.') {
            errors.push(DescriptionError::parse_at(
                "S038",
                format!("Step name '{}' must not contain '.'", name),
                name,
            ));
            continue;
        }
        if let Some(step) = parse_step(name, spec, task_names, errors) {
            steps.push(step);
        }
    }
    steps
}

fn parse_step(
    name: &str,
    spec: &Value,
    task_names: &HashSet<String>,
    errors: &mut Vec<DescriptionError>,
) -> Option<Step> {
    let Value::Mapping(spec) = spec else {
        errors.push(DescriptionError::parse_at(
            "S032",
            format!("Step '{}' must be a mapping", name),
            name,
        ));
        return None;
    };

    let before = errors.len();
    let mut builder = ArgBuilder {
        step: name,
        errors: &mut *errors,
    };

    let step = if is_expanded_step(spec, task_names) {
        builder.expanded_step(spec, task_names)
    } else {
        builder.shorthand_step(spec, task_names)
    };

    let dependencies = match spec.get(DEPENDENCIES) {
        None => Vec::new(),
        Some(value) => builder.dependencies(value),
    };

    match step {
        Some((task, args, kwargs)) if errors.len() == before => Some(Step {
            name: name.to_string(),
            task,
            args,
            kwargs,
            dependencies,
        }),
        _ => None,
    }
}

/// A step is in expanded form when its `task` key names a declared task.
/// When a task is itself declared as `task`, any other `task` value is a
/// shorthand invocation of it.
fn is_expanded_step(spec: &Mapping, task_names: &HashSet<String>) -> bool {
    match spec.get(TASK) {
        None => false,
        Some(Value::String(name)) if task_names.contains(name) => true,
        Some(_) => !task_names.contains(TASK),
    }
}

type Invocation = (String, Vec<Argument>, Vec<(String, Argument)>);

struct ArgBuilder<'a> {
    step: &'a str,
    errors: &'a mut Vec<DescriptionError>,
}

impl ArgBuilder<'_> {
    fn error(&mut self, code: &'static str, message: String) {
        self.errors
            .push(DescriptionError::parse_at(code, message, self.step));
    }

    /// `{task: name, args?: ..., kwargs?: {...}, dependencies?: ...}`
    fn expanded_step(&mut self, spec: &Mapping, task_names: &HashSet<String>) -> Option<Invocation> {
        for key in spec.keys() {
            if !matches!(key.as_str(), Some(TASK | ARGS | KWARGS | DEPENDENCIES)) {
                self.error(
                    "S034",
                    format!("Unknown key {} in step '{}'", describe_key(key), self.step),
                );
            }
        }

        let task = match spec.get(TASK).and_then(Value::as_str) {
            Some(task) if task_names.contains(task) => task.to_string(),
            other => {
                self.error(
                    "S033",
                    format!("Step '{}' names unknown task {:?}", self.step, other),
                );
                return None;
            }
        };

        let args = match spec.get(ARGS) {
            None => Vec::new(),
            Some(Value::Sequence(items)) => items.iter().map(|v| self.argument(v)).collect(),
            Some(value) => vec![self.argument(value)],
        };

        let kwargs = match spec.get(KWARGS) {
            None => Vec::new(),
            Some(Value::Mapping(entries)) => self.keyword_arguments(entries)?,
            Some(_) => {
                self.error(
                    "S035",
                    format!("'kwargs' of step '{}' must be a mapping", self.step),
                );
                return None;
            }
        };

        Some((task, args, kwargs))
    }

    /// `{task_name: args, dependencies?: ...}`
    fn shorthand_step(&mut self, spec: &Mapping, task_names: &HashSet<String>) -> Option<Invocation> {
        let invocations: Vec<(&Value, &Value)> = spec
            .iter()
            .filter(|(k, _)| k.as_str() != Some(DEPENDENCIES))
            .collect();

        let [(task, value)] = invocations.as_slice() else {
            self.error(
                "S034",
                format!(
                    "Step '{}' must invoke exactly one task, found {}",
                    self.step,
                    invocations.len()
                ),
            );
            return None;
        };

        let task = match task.as_str() {
            Some(task) if task_names.contains(task) => task.to_string(),
            _ => {
                self.error(
                    "S033",
                    format!("Step '{}' names unknown task {}", self.step, describe_key(task)),
                );
                return None;
            }
        };

        match value {
            Value::Sequence(items) => {
                let args = items.iter().map(|v| self.argument(v)).collect();
                Some((task, args, Vec::new()))
            }
            Value::Mapping(entries) => {
                let kwargs = self.keyword_arguments(entries)?;
                Some((task, Vec::new(), kwargs))
            }
            value => {
                let arg = self.argument(value);
                Some((task, vec![arg], Vec::new()))
            }
        }
    }

    fn keyword_arguments(&mut self, entries: &Mapping) -> Option<Vec<(String, Argument)>> {
        let mut kwargs = Vec::with_capacity(entries.len());
        for (key, value) in entries {
            let Some(key) = key.as_str() else {
                self.error(
                    "S035",
                    format!(
                        "Keyword argument names of step '{}' must be strings, found {:?}",
                        self.step, key
                    ),
                );
                return None;
            };
            kwargs.push((key.to_string(), self.argument(value)));
        }
        Some(kwargs)
    }

    fn argument(&mut self, value: &Value) -> Argument {
        match value {
            Value::String(text) => match Reference::parse(text) {
                None => Argument::Literal(value.clone()),
                Some(Ok(reference)) => Argument::Reference(reference),
                Some(Err(message)) => {
                    self.error("S037", message);
                    Argument::Literal(value.clone())
                }
            },
            Value::Sequence(items) => Argument::List(items.iter().map(|v| self.argument(v)).collect()),
            Value::Mapping(entries) => Argument::Map(
                entries
                    .iter()
                    .map(|(k, v)| (k.clone(), self.argument(v)))
                    .collect(),
            ),
            Value::Tagged(tagged) => self.argument(&tagged.value),
            _ => Argument::Literal(value.clone()),
        }
    }

    fn dependencies(&mut self, value: &Value) -> Vec<String> {
        let names: Option<Vec<String>> = match value {
            Value::String(name) => Some(vec![name.clone()]),
            Value::Sequence(items) => items.iter().map(|v| v.as_str().map(str::to_string)).collect(),
            _ => None,
        };
        names.unwrap_or_else(|| {
            self.error(
                "S036",
                format!(
                    "Dependencies of step '{}' must be a step name or a list of step names",
                    self.step
                ),
            );
            Vec::new()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(yaml: &str) -> Value {
        serde_yaml::from_str(yaml).unwrap()
    }

    fn codes(yaml: &str) -> Vec<&'static str> {
        describe(&doc(yaml))
            .err()
            .unwrap_or_default()
            .into_iter()
            .map(|e| e.code)
            .collect()
    }

    #[test]
    fn plugin_paths() {
        assert!(is_valid_plugin_path("org.example.add"));
        assert!(is_valid_plugin_path("a.b.c.d"));
        assert!(!is_valid_plugin_path("example.add"));
        assert!(!is_valid_plugin_path("org.example.add."));
        assert!(!is_valid_plugin_path(""));
        assert!(!is_valid_plugin_path("org.1example.add"));
    }

    #[test]
    fn shorthand_list_becomes_positional_args() {
        let desc = describe(&doc(
            "tasks: {add: {plugin: org.example.add}}\ngraph: {step1: {add: [1, 2, 3]}}",
        ))
        .unwrap();
        let step = desc.step("step1").unwrap();
        assert_eq!(step.task, "add");
        assert_eq!(step.args.len(), 3);
        assert!(step.kwargs.is_empty());
    }

    #[test]
    fn shorthand_mapping_becomes_kwargs() {
        let desc = describe(&doc(
            "tasks: {add: {plugin: org.example.add}}\ngraph: {step1: {add: {a: 1, b: 2}}}",
        ))
        .unwrap();
        let step = desc.step("step1").unwrap();
        assert!(step.args.is_empty());
        assert_eq!(step.kwargs.len(), 2);
    }

    #[test]
    fn task_named_task_in_shorthand() {
        let desc = describe(&doc(
            "tasks: {task: {plugin: a.b.c}, t: {plugin: a.b.d}}\n\
             graph: {s1: {task: 1}, s2: {task: t, args: [1]}, s3: {task: [task]}}",
        ))
        .unwrap();
        assert_eq!(desc.step("s1").unwrap().task, "task");
        assert_eq!(desc.step("s2").unwrap().task, "t");
        assert_eq!(desc.step("s3").unwrap().task, "task");
        assert_eq!(desc.step("s3").unwrap().args, vec![Argument::Literal(Value::from("task"))]);
    }

    #[test]
    fn unknown_expanded_task_still_reported() {
        assert_eq!(codes("tasks: {t: {plugin: a.b.c}}\ngraph: {s: {task: 1}}"), vec!["S033"]);
    }

    #[test]
    fn single_dependency_string_becomes_list() {
        let desc = describe(&doc(
            "tasks: {t: {plugin: a.b.c}}\ngraph: {s1: {t: 1}, s2: {task: t, dependencies: s1}}",
        ))
        .unwrap();
        assert_eq!(desc.step("s2").unwrap().dependencies, vec!["s1".to_string()]);
    }

    #[test]
    fn nested_references_are_found() {
        let desc = describe(&doc(
            "parameters: [p]\ntasks: {t: {plugin: a.b.c}}\ngraph: {s1: {t: {x: [1, {y: $p}]}}}",
        ))
        .unwrap();
        let refs = desc.step("s1").unwrap().references();
        assert_eq!(refs, vec![&Reference::new("p", None)]);
    }

    #[test]
    fn structural_codes() {
        assert_eq!(codes("[1, 2]"), vec!["S001"]);
        assert_eq!(codes("tasks: {t: {plugin: a.b.c}}"), vec!["S003"]);
        assert_eq!(codes("tasks: {}\ngraph: {s: {t: 1}}"), vec!["S010", "S033"]);
        assert_eq!(codes("parameters: 5\ntasks: {t: {plugin: a.b.c}}\ngraph: {s: {t: 1}}"), vec!["S020"]);
        assert_eq!(codes("parameters: [a.b]\ntasks: {t: {plugin: a.b.c}}\ngraph: {s: {t: 1}}"), vec!["S023"]);
        assert_eq!(codes("tasks: {t: {plugin: a.b.c, x: 1}}\ngraph: {s: {t: 1}}"), vec!["S014"]);
        assert_eq!(codes("tasks: {t: {plugin: a.b.c}}\ngraph: {s: {task: t, kwargs: [1]}}"), vec!["S035"]);
        assert_eq!(codes("tasks: {t: {plugin: a.b.c}}\ngraph: {s: {t: $}}"), vec!["S037"]);
    }

    #[test]
    fn typed_parameter_default_is_checked() {
        let base = "tasks: {t: {plugin: a.b.c}}\ngraph: {s: {t: 1}}\n";
        assert!(codes(&format!("{}parameters: {{lr: {{default: 0.1, type: number}}}}", base)).is_empty());
        assert_eq!(
            codes(&format!("{}parameters: {{lr: {{default: fast, type: number}}}}", base)),
            vec!["S025"]
        );
        assert_eq!(
            codes(&format!("{}parameters: {{lr: {{type: float}}}}", base)),
            vec!["S025"]
        );
    }
}
