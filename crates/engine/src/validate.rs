//! Load-time structural validation of pipeline documents.
//!
//! Validation checks the shape a built-in action needs before a run
//! starts. Unknown type names pass — plugin actions may be registered any
//! time up to (and during) execution — and semantic problems like a
//! missing context key stay runtime concerns.

use thiserror::Error;

use crate::model::{ActionSpec, Pipeline};

/// Structural problems detected at configuration-load time.
///
/// Distinct from the runtime diagnostic taxonomy: these surface before
/// execution and fail the load.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{path}: descriptor needs a 'type' or 'transformation'")]
    MissingType { path: String },

    #[error("{path}: '{kind}' action requires '{field}'")]
    MissingField { path: String, kind: String, field: String },
}

/// Validate every action of a pipeline, recursing into nested lists.
///
/// Error paths locate the offending descriptor, e.g.
/// `actions[2].elseActions[0]`.
pub fn validate_pipeline(pipeline: &Pipeline) -> Result<(), ValidationError> {
    validate_actions(&pipeline.actions, "actions")
}

fn validate_actions(actions: &[ActionSpec], path: &str) -> Result<(), ValidationError> {
    for (index, action) in actions.iter().enumerate() {
        validate_action(action, &format!("{path}[{index}]"))?;
    }
    Ok(())
}

fn validate_action(action: &ActionSpec, path: &str) -> Result<(), ValidationError> {
    let kind = match (action.r#type.as_deref(), action.transformation.as_deref()) {
        (Some(kind), _) => kind,
        (None, Some(_)) => "transform",
        (None, None) => return Err(ValidationError::MissingType { path: path.to_string() }),
    };

    let require = |field: &str, present: bool| {
        if present {
            Ok(())
        } else {
            Err(ValidationError::MissingField {
                path: path.to_string(),
                kind: kind.to_string(),
                field: field.to_string(),
            })
        }
    };

    match kind {
        "loop" => {
            require("inputKey", action.input_key.is_some())?;
            require("itemKey", action.item_key.is_some())?;
            require("actions", action.actions.is_some())?;
        }
        "condition" => {
            require("inputKey", action.input_key.is_some())?;
            require("condition", action.condition.is_some())?;
        }
        "query" | "queryAll" => require("selector", action.selector.is_some())?,
        "fetch" => require("url", action.url.is_some())?,
        "setContext" | "deleteContext" => require("key", action.key.is_some())?,
        "log" => require("message", action.message.is_some())?,
        "transform" => require("transformation", action.transformation.is_some())?,
        // Plugin kinds validate their own shapes at dispatch time.
        _ => {}
    }

    if let Some(nested) = &action.actions {
        validate_actions(nested, &format!("{path}.actions"))?;
    }
    if let Some(nested) = &action.else_actions {
        validate_actions(nested, &format!("{path}.elseActions"))?;
    }
    Ok(())
}
