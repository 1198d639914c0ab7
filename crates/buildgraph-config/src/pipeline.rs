//! Pipeline definition parsing.

use crate::variables::VariableContext;
use crate::{ConfigError, ConfigResult};
use buildgraph_core::pipeline::{
    Constraint, PipelineDefinition, RawDefinition, StepDefinition, When,
};
use buildgraph_core::PipelineName;
use kdl::{KdlDocument, KdlNode, KdlValue};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashSet};

/// Decode, substitute and parse one raw definition.
pub fn parse_definition(
    raw: &RawDefinition,
    vars: &VariableContext,
) -> ConfigResult<PipelineDefinition> {
    let text = std::str::from_utf8(&raw.data)?;
    let substituted = vars.substitute(text);
    parse_pipeline(&raw.name, &substituted)
}

/// Parse a pipeline definition from substituted KDL text.
///
/// Missing sections default to empty; a definition without steps is valid.
pub fn parse_pipeline(name: &PipelineName, kdl: &str) -> ConfigResult<PipelineDefinition> {
    let doc: KdlDocument = kdl.parse()?;

    let mut def = PipelineDefinition {
        name: name.clone(),
        ..Default::default()
    };

    for node in doc.nodes() {
        match node.name().value() {
            "pipeline" => {
                def.steps = parse_steps(node)?;
            }
            "skip_clone" | "skip-clone" => {
                def.skip_clone = parse_flag(node)?;
            }
            "depends_on" | "depends-on" => {
                def.depends_on = get_list(node).into_iter().map(PipelineName::from).collect();
            }
            "runs_on" | "runs-on" => {
                def.runs_on = get_list(node);
            }
            "branches" => {
                def.branches = parse_constraint(node);
            }
            "events" => {
                def.events = parse_constraint(node);
            }
            "platform" => {
                def.platform = get_first_string_arg(node);
            }
            "labels" => {
                def.labels = parse_string_map(node);
            }
            "environment" | "env" => {
                def.environment = parse_string_map(node);
            }
            "clone" => {
                def.clone = Some(parse_step_body("clone", 0, node)?);
            }
            _ => {} // Ignore unknown nodes
        }
    }

    Ok(def)
}

fn parse_steps(node: &KdlNode) -> ConfigResult<Vec<StepDefinition>> {
    let mut steps = Vec::new();
    let mut names = HashSet::new();

    let Some(children) = node.children() else {
        return Ok(steps);
    };

    for (position, child) in children.nodes().iter().enumerate() {
        // Both `build { ... }` and `step "build" { ... }` name a step.
        let name = match child.name().value() {
            "step" => get_first_string_arg(child)
                .ok_or_else(|| ConfigError::MissingField("step name".to_string()))?,
            other => other.to_string(),
        };

        if !names.insert(name.clone()) {
            return Err(ConfigError::Duplicate(format!("step '{}'", name)));
        }

        let step = parse_step_body(&name, position, child)?;
        if step.image.is_empty() {
            return Err(ConfigError::MissingField(format!(
                "image for step '{}'",
                name
            )));
        }
        steps.push(step);
    }

    Ok(steps)
}

fn parse_step_body(name: &str, position: usize, node: &KdlNode) -> ConfigResult<StepDefinition> {
    let mut step = StepDefinition {
        name: name.to_string(),
        position,
        ..Default::default()
    };

    let Some(children) = node.children() else {
        return Ok(step);
    };

    for child in children.nodes() {
        match child.name().value() {
            "image" => {
                step.image = get_first_string_arg(child).unwrap_or_default();
            }
            "commands" => {
                step.commands.extend(get_list(child));
            }
            "run" => {
                if let Some(cmd) = get_first_string_arg(child) {
                    step.commands.push(cmd);
                }
            }
            "environment" | "env" => {
                step.environment.extend(parse_string_map(child));
            }
            "secrets" => {
                step.secrets.extend(get_list(child));
            }
            "when" => {
                step.when = parse_when(child);
            }
            "detach" => {
                step.detach = parse_flag(child)?;
            }
            "privileged" => {
                step.privileged = parse_flag(child)?;
            }
            "pull" => {
                step.pull = parse_flag(child)?;
            }
            key => {
                step.settings.insert(key.to_string(), node_to_json(child));
            }
        }
    }

    Ok(step)
}

fn parse_when(node: &KdlNode) -> When {
    let mut when = When::default();

    // Short form: `when branch="main" event="push"`
    for entry in node.entries() {
        let (Some(key), Some(text)) = (entry.name(), value_to_text(entry.value())) else {
            continue;
        };
        if let Some(constraint) = when_field(&mut when, key.value()) {
            constraint.include.push(text);
        }
    }

    if let Some(children) = node.children() {
        for child in children.nodes() {
            let parsed = parse_constraint(child);
            if let Some(constraint) = when_field(&mut when, child.name().value()) {
                constraint.include.extend(parsed.include);
                constraint.exclude.extend(parsed.exclude);
            }
        }
    }

    when
}

fn when_field<'a>(when: &'a mut When, key: &str) -> Option<&'a mut Constraint> {
    match key {
        "branch" | "branches" => Some(&mut when.branch),
        "event" | "events" => Some(&mut when.event),
        "ref" => Some(&mut when.git_ref),
        "environment" => Some(&mut when.environment),
        "status" => Some(&mut when.status),
        _ => None,
    }
}

/// `branch "main" "release/*"`, `branch include="main" exclude="wip/*"` or
/// `branch { include "main"; exclude "wip/*" }`.
fn parse_constraint(node: &KdlNode) -> Constraint {
    let mut constraint = Constraint::default();

    for entry in node.entries() {
        let Some(text) = value_to_text(entry.value()) else {
            continue;
        };
        match entry.name().map(|n| n.value()) {
            None | Some("include") => constraint.include.push(text),
            Some("exclude") => constraint.exclude.push(text),
            Some(_) => {}
        }
    }

    if let Some(children) = node.children() {
        for child in children.nodes() {
            match child.name().value() {
                "include" => constraint.include.extend(get_list(child)),
                "exclude" => constraint.exclude.extend(get_list(child)),
                _ => {}
            }
        }
    }

    constraint
}

/// `environment KEY="value"` or `environment { KEY "value" }`.
fn parse_string_map(node: &KdlNode) -> BTreeMap<String, String> {
    let mut map = BTreeMap::new();

    for entry in node.entries() {
        if let (Some(key), Some(text)) = (entry.name(), value_to_text(entry.value())) {
            map.insert(key.value().to_string(), text);
        }
    }

    if let Some(children) = node.children() {
        for child in children.nodes() {
            let value = child
                .entries()
                .iter()
                .find(|e| e.name().is_none())
                .and_then(|e| value_to_text(e.value()))
                .unwrap_or_default();
            map.insert(child.name().value().to_string(), value);
        }
    }

    map
}

/// A bare node is a set flag; otherwise the first argument must be a boolean.
fn parse_flag(node: &KdlNode) -> ConfigResult<bool> {
    match node.entries().iter().find(|e| e.name().is_none()) {
        None => Ok(true),
        Some(entry) => entry
            .value()
            .as_bool()
            .ok_or_else(|| ConfigError::InvalidValue {
                field: node.name().value().to_string(),
                message: "expected #true or #false".to_string(),
            }),
    }
}

/// Convert an arbitrary node into an opaque settings value.
fn node_to_json(node: &KdlNode) -> Value {
    let mut args: Vec<Value> = node
        .entries()
        .iter()
        .filter(|e| e.name().is_none())
        .map(|e| kdl_to_json(e.value()))
        .collect();

    let mut object = Map::new();
    for entry in node.entries() {
        if let Some(key) = entry.name() {
            object.insert(key.value().to_string(), kdl_to_json(entry.value()));
        }
    }
    if let Some(children) = node.children() {
        for child in children.nodes() {
            object.insert(child.name().value().to_string(), node_to_json(child));
        }
    }

    if object.is_empty() {
        return match args.len() {
            0 => Value::Null,
            1 => args.remove(0),
            _ => Value::Array(args),
        };
    }

    if !args.is_empty() {
        object.insert("args".to_string(), Value::Array(args));
    }
    Value::Object(object)
}

fn kdl_to_json(value: &KdlValue) -> Value {
    if let Some(s) = value.as_string() {
        Value::String(s.to_string())
    } else if let Some(b) = value.as_bool() {
        Value::Bool(b)
    } else if let Some(i) = value.as_integer() {
        i64::try_from(i)
            .map(Value::from)
            .unwrap_or_else(|_| Value::String(i.to_string()))
    } else if let Some(f) = value.as_float() {
        serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null)
    } else {
        Value::Null
    }
}

// Helper functions for extracting values from KDL nodes

fn value_to_text(value: &KdlValue) -> Option<String> {
    if let Some(s) = value.as_string() {
        Some(s.to_string())
    } else if let Some(b) = value.as_bool() {
        Some(b.to_string())
    } else if let Some(i) = value.as_integer() {
        Some(i.to_string())
    } else {
        value.as_float().map(|f| f.to_string())
    }
}

fn get_first_string_arg(node: &KdlNode) -> Option<String> {
    node.entries()
        .iter()
        .find(|e| e.name().is_none())
        .and_then(|e| e.value().as_string())
        .map(|s| s.to_string())
}

/// Positional arguments, or the names of child nodes for block syntax.
fn get_list(node: &KdlNode) -> Vec<String> {
    let args: Vec<String> = node
        .entries()
        .iter()
        .filter(|e| e.name().is_none())
        .filter_map(|e| value_to_text(e.value()))
        .collect();

    if !args.is_empty() {
        return args;
    }

    node.children()
        .map(|children| {
            children
                .nodes()
                .iter()
                .map(|child| child.name().value().to_string())
                .collect()
        })
        .unwrap_or_default()
}
