//! Pipeline documents and action descriptors.
//!
//! A pipeline is an ordered list of action descriptors; a bundle maps names
//! to pipelines so one file can carry several. Descriptors are one serde
//! struct with typed optional fields rather than a free-form map: the shape
//! a built-in action needs is checked at load time by the `validate`
//! module, while fields this model does not know about are retained in
//! `extra` for plugin handlers.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::resolve::{Context, JsonMap, resolve_placeholders, resolve_str};

/// A collection of named pipelines loaded from one document.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PipelineBundle {
    /// Mapping of pipeline names to their definitions, in document order.
    pub pipelines: IndexMap<String, Pipeline>,
}

/// One declarative pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Pipeline {
    /// Optional identifier; single-pipeline files use it as the bundle key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pipeline: Option<String>,

    /// Ordered action descriptors; order is evaluation order.
    pub actions: Vec<ActionSpec>,
}

/// One configured step, tagged by type, with type-specific parameters.
///
/// Wire names are camelCase. A descriptor may omit `type` and carry only
/// `transformation`, which the dispatcher treats as an implicit `transform`
/// action.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ActionSpec {
    /// Action kind; resolved against the built-in tier, then plugins.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub r#type: Option<String>,

    /// Transformation name for `transform` actions (and the implicit form).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transformation: Option<String>,

    /// Context key the action reads its primary input from.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_key: Option<String>,

    /// Context key the action's produced value is stored under.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_key: Option<String>,

    /// Context key naming the scope for selector-based actions; when absent
    /// or missing from the context, the engine's root document is used.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context_key: Option<String>,

    /// Selector for `query`/`queryAll`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selector: Option<String>,

    /// Request URL for `fetch`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// HTTP method for `fetch`; defaults to GET.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,

    /// Request payload for `fetch`, sent only for non-GET methods.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,

    /// Response decoding for `fetch`: json (default), text, or markup.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_type: Option<String>,

    /// Target key for `setContext`/`deleteContext`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,

    /// Value written by `setContext`, or the comparand of a `condition`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,

    /// Context key each `loop` iteration writes the current element to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item_key: Option<String>,

    /// Predicate name for `condition` actions.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,

    /// Message template for `log`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// Substring searched for by the `replace` transformation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,

    /// Replacement token for `replace`; a token naming a context key
    /// substitutes that key's value.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replacement: Option<String>,

    /// Delimiter for the `split` transformation; defaults to a comma.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delimiter: Option<String>,

    /// Config handed to the next level of a chained `transform`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<JsonMap>,

    /// Nested list dispatched by `loop`, or the true branch of `condition`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actions: Option<Vec<ActionSpec>>,

    /// False branch of `condition`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub else_actions: Option<Vec<ActionSpec>>,

    /// Fields not modeled above, kept for plugin handlers.
    #[serde(flatten)]
    pub extra: JsonMap,
}

impl ActionSpec {
    /// Resolve `${key}` tokens in every field against `context`.
    ///
    /// Nested `actions`/`elseActions` lists are deliberately left
    /// untouched: each nested action is resolved when its own dispatch
    /// runs, so loop iterations see the loop variable of their own pass.
    pub fn resolved(&self, context: &Context) -> ActionSpec {
        let text = |field: &Option<String>| field.as_ref().map(|text| resolve_str(text, context));
        ActionSpec {
            r#type: text(&self.r#type),
            transformation: text(&self.transformation),
            input_key: text(&self.input_key),
            output_key: text(&self.output_key),
            context_key: text(&self.context_key),
            selector: text(&self.selector),
            url: text(&self.url),
            method: text(&self.method),
            data: self.data.as_ref().map(|value| resolve_placeholders(value, context)),
            response_type: text(&self.response_type),
            key: text(&self.key),
            value: self.value.as_ref().map(|value| resolve_placeholders(value, context)),
            item_key: text(&self.item_key),
            condition: text(&self.condition),
            message: text(&self.message),
            search: text(&self.search),
            replacement: text(&self.replacement),
            delimiter: text(&self.delimiter),
            params: self.params.as_ref().map(|map| resolve_map(map, context)),
            actions: self.actions.clone(),
            else_actions: self.else_actions.clone(),
            extra: resolve_map(&self.extra, context),
        }
    }

    /// View the descriptor as the config map handed to transformations.
    pub fn as_config(&self) -> JsonMap {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => JsonMap::new(),
        }
    }
}

fn resolve_map(map: &JsonMap, context: &Context) -> JsonMap {
    map.iter()
        .map(|(key, value)| (key.clone(), resolve_placeholders(value, context)))
        .collect()
}
