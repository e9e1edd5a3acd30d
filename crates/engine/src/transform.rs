//! Built-in transformations and the chaining mechanism.
//!
//! A transformation maps a value to a new value, optionally steered by the
//! config map of the invoking descriptor. The built-in tier is always
//! consulted before plugins, so a plugin cannot shadow a built-in name.
//! The generic `transform` entry performs one more level of name lookup
//! and delegates, which lets configurations compose transformations by
//! name.

use serde_json::Value;

use crate::diagnostics::Diagnostic;
use crate::dispatch::Run;
use crate::resolve::{Context, JsonMap, value_to_text};

/// A named value-to-value function applied by `transform` actions.
///
/// `config` carries the invoking descriptor (or the `params` of an outer
/// chaining level); `context` is read-only here. Plain functions with the
/// pure shape `fn(&Value, &JsonMap, &Context) -> Value` implement this
/// trait directly, so most plugins never touch the run handle.
pub trait Transformation: Send + Sync {
    fn apply(&self, value: &Value, config: &JsonMap, context: &Context, run: &mut Run<'_>) -> Value;
}

impl<F> Transformation for F
where
    F: Fn(&Value, &JsonMap, &Context) -> Value + Send + Sync,
{
    fn apply(&self, value: &Value, config: &JsonMap, context: &Context, _run: &mut Run<'_>) -> Value {
        self(value, config, context)
    }
}

/// The built-in transformation tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BuiltinTransformation {
    Uppercase,
    Lowercase,
    Split,
    JsonParse,
    Replace,
    Chain,
}

impl BuiltinTransformation {
    pub(crate) fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "uppercase" => Self::Uppercase,
            "lowercase" => Self::Lowercase,
            "split" => Self::Split,
            "jsonParse" => Self::JsonParse,
            "replace" => Self::Replace,
            "transform" => Self::Chain,
            _ => return None,
        })
    }

    fn apply(self, value: &Value, config: &JsonMap, context: &Context, run: &mut Run<'_>) -> Value {
        match self {
            Self::Uppercase => Value::String(value_to_text(value).to_uppercase()),
            Self::Lowercase => Value::String(value_to_text(value).to_lowercase()),
            Self::Split => split(value, config),
            Self::JsonParse => json_parse(value, run),
            Self::Replace => replace(value, config, context),
            Self::Chain => chain(value, config, context, run),
        }
    }
}

/// Resolve `name` against the built-in tier, then the plugin tier, and
/// apply the winner. Returns `None` when the name is unknown in both
/// tiers; reporting that is the caller's concern.
pub(crate) fn apply_named(
    name: &str,
    value: &Value,
    config: &JsonMap,
    context: &Context,
    run: &mut Run<'_>,
) -> Option<Value> {
    if let Some(builtin) = BuiltinTransformation::from_name(name) {
        return Some(builtin.apply(value, config, context, run));
    }
    let plugin = run.engine().plugins().transformation(name)?;
    Some(plugin.apply(value, config, context, run))
}

fn split(value: &Value, config: &JsonMap) -> Value {
    let delimiter = config.get("delimiter").and_then(Value::as_str).unwrap_or(",");
    let text = value_to_text(value);
    Value::Array(text.split(delimiter).map(|part| Value::String(part.to_string())).collect())
}

fn json_parse(value: &Value, run: &mut Run<'_>) -> Value {
    let parsed = match value {
        Value::String(text) => serde_json::from_str(text).map_err(|error| error.to_string()),
        other => Err(format!("expected a string, got {other}")),
    };
    match parsed {
        Ok(value) => value,
        Err(message) => {
            run.report(Diagnostic::InvalidStructuredData { message });
            Value::Null
        }
    }
}

fn replace(value: &Value, config: &JsonMap, context: &Context) -> Value {
    let Some(search) = config.get("search").and_then(Value::as_str) else {
        return value.clone();
    };
    let token = config.get("replacement").and_then(Value::as_str).unwrap_or_default();
    // A replacement token naming a context key substitutes that key's value.
    let replacement = if context.contains(token) {
        context.render(token)
    } else {
        token.to_string()
    };
    Value::String(value_to_text(value).replace(search, &replacement))
}

/// The generic `transform` entry: one more level of name lookup, with
/// `params` becoming the config of the inner transformation. Each level
/// peels one `params` nesting, so chains written in configuration
/// terminate.
fn chain(value: &Value, config: &JsonMap, context: &Context, run: &mut Run<'_>) -> Value {
    let name = config
        .get("transformation")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let params = match config.get("params") {
        Some(Value::Object(map)) => map.clone(),
        _ => JsonMap::new(),
    };
    let applied = apply_named(&name, value, &params, context, run);
    applied.unwrap_or_else(|| {
        run.report(Diagnostic::UnknownTransformation { name });
        value.clone()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::Engine;
    use serde_json::json;

    fn config_with(entries: Value) -> JsonMap {
        entries.as_object().expect("object literal").clone()
    }

    fn apply(name: &str, value: Value, config: Value, context: &Context) -> (Option<Value>, Vec<Diagnostic>) {
        let engine = Engine::new();
        let mut run = Run::new(&engine);
        let result = apply_named(name, &value, &config_with(config), context, &mut run);
        (result, run.into_report().diagnostics)
    }

    #[test]
    fn case_folding_renders_values_as_text() {
        let context = Context::new();
        let (result, _) = apply("uppercase", json!("hello"), json!({}), &context);
        assert_eq!(result, Some(json!("HELLO")));
        let (result, _) = apply("lowercase", json!("LOUD"), json!({}), &context);
        assert_eq!(result, Some(json!("loud")));
        let (result, _) = apply("uppercase", json!(null), json!({}), &context);
        assert_eq!(result, Some(json!("")));
    }

    #[test]
    fn split_uses_the_configured_delimiter() {
        let context = Context::new();
        let (result, _) = apply("split", json!("a,b,c"), json!({}), &context);
        assert_eq!(result, Some(json!(["a", "b", "c"])));
        let (result, _) = apply("split", json!("a|b"), json!({"delimiter": "|"}), &context);
        assert_eq!(result, Some(json!(["a", "b"])));
    }

    #[test]
    fn json_parse_round_trips_valid_documents() {
        let context = Context::new();
        let (result, diagnostics) = apply("jsonParse", json!("{\"n\": 1}"), json!({}), &context);
        assert_eq!(result, Some(json!({"n": 1})));
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn json_parse_degrades_to_null_on_bad_input() {
        let context = Context::new();
        let (result, diagnostics) = apply("jsonParse", json!("{nope"), json!({}), &context);
        assert_eq!(result, Some(json!(null)));
        assert_eq!(diagnostics.len(), 1);
        assert!(matches!(diagnostics[0], Diagnostic::InvalidStructuredData { .. }));

        let (result, diagnostics) = apply("jsonParse", json!(5), json!({}), &context);
        assert_eq!(result, Some(json!(null)));
        assert_eq!(diagnostics.len(), 1);
    }

    #[test]
    fn replace_prefers_context_values_over_literals() {
        let mut context = Context::new();
        context.set("target", json!("world"));
        let config = json!({"search": "X", "replacement": "target"});
        let (result, _) = apply("replace", json!("hello X"), config, &context);
        assert_eq!(result, Some(json!("hello world")));

        let config = json!({"search": "X", "replacement": "literal"});
        let (result, _) = apply("replace", json!("hello X"), config, &context);
        assert_eq!(result, Some(json!("hello literal")));
    }

    #[test]
    fn replace_without_search_is_identity() {
        let context = Context::new();
        let (result, _) = apply("replace", json!("unchanged"), json!({}), &context);
        assert_eq!(result, Some(json!("unchanged")));
    }

    #[test]
    fn chain_delegates_through_params() {
        let context = Context::new();
        let config = json!({
            "transformation": "uppercase",
            "params": {}
        });
        let (result, _) = apply("transform", json!("quiet"), config, &context);
        assert_eq!(result, Some(json!("QUIET")));
    }

    #[test]
    fn chain_reports_unknown_names_and_passes_the_value_through() {
        let context = Context::new();
        let config = json!({"transformation": "nonexistent"});
        let (result, diagnostics) = apply("transform", json!("kept"), config, &context);
        assert_eq!(result, Some(json!("kept")));
        assert_eq!(
            diagnostics,
            vec![Diagnostic::UnknownTransformation { name: "nonexistent".into() }]
        );
    }

    #[test]
    fn unknown_names_resolve_to_none() {
        let context = Context::new();
        let (result, _) = apply("nope", json!(1), json!({}), &context);
        assert_eq!(result, None);
    }
}
