//! Context storage and `${key}` placeholder resolution.
//!
//! Action descriptors refer to earlier results through `${key}` tokens.
//! Resolution walks a JSON value structurally: strings are scanned for
//! tokens, arrays and objects recurse, everything else passes through
//! untouched. Mapping keys are never resolved, only their values.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Convenience alias for a JSON object map.
pub type JsonMap = serde_json::Map<String, Value>;

/// Shared mutable key/value store threaded through one pipeline run.
///
/// The same context instance is visible to every action of a run, including
/// actions dispatched recursively by `loop` and `condition`, so later
/// actions observe all effects of earlier ones. Callers may seed it before
/// a run and read the mutated state back afterwards.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Context {
    values: JsonMap,
}

impl Context {
    /// An empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up the value stored under `key`.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Store `value` under `key`, overwriting any prior value.
    pub fn set(&mut self, key: impl Into<String>, value: Value) {
        self.values.insert(key.into(), value);
    }

    /// Remove `key`, returning the value it held.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.values.remove(key)
    }

    /// True when `key` is present.
    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Render the value under `key` as text; missing keys render empty.
    pub fn render(&self, key: &str) -> String {
        self.get(key).map(value_to_text).unwrap_or_default()
    }

    /// Borrow the underlying map.
    pub fn as_map(&self) -> &JsonMap {
        &self.values
    }

    /// Consume the context, yielding the underlying map.
    pub fn into_map(self) -> JsonMap {
        self.values
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True when no entries are stored.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl From<JsonMap> for Context {
    fn from(values: JsonMap) -> Self {
        Self { values }
    }
}

/// Render a JSON value as plain text.
///
/// Strings render as-is, null renders empty, scalars use their display
/// form, and containers fall back to compact JSON.
pub fn value_to_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Number(number) => number.to_string(),
        Value::Bool(flag) => flag.to_string(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Recursively resolve `${key}` tokens in a JSON value against a context.
pub fn resolve_placeholders(value: &Value, context: &Context) -> Value {
    match value {
        Value::String(text) => Value::String(resolve_str(text, context)),
        Value::Array(items) => Value::Array(items.iter().map(|item| resolve_placeholders(item, context)).collect()),
        Value::Object(map) => {
            let mut resolved = JsonMap::new();
            for (key, item) in map {
                resolved.insert(key.clone(), resolve_placeholders(item, context));
            }
            Value::Object(resolved)
        }
        other => other.clone(),
    }
}

/// Resolve `${key}` tokens in a single string, left to right.
///
/// A token is `${` followed by one or more identifier characters
/// (`[A-Za-z0-9_]`) and a closing `}`. Keys present in the context are
/// substituted by their rendered text, absent keys by the empty string.
/// Anything that does not form a token is preserved verbatim, and
/// substituted text is not re-scanned.
pub fn resolve_str(input: &str, context: &Context) -> String {
    let mut output = String::new();
    let mut rest = input;

    while let Some(start) = rest.find("${") {
        let (head, tail) = rest.split_at(start);
        output.push_str(head);

        let after_marker = &tail[2..];
        let key_end = after_marker
            .find(|c: char| !is_identifier_char(c))
            .unwrap_or(after_marker.len());
        if key_end > 0 && after_marker[key_end..].starts_with('}') {
            let key = &after_marker[..key_end];
            if context.contains(key) {
                output.push_str(&context.render(key));
            }
            rest = &after_marker[key_end + 1..];
        } else {
            // Malformed token (`${}`, `${a.b}`, unterminated). Emit the
            // dollar sign and rescan from the brace so `$${x}` still
            // resolves the inner token.
            output.push('$');
            rest = &tail[1..];
        }
    }

    output.push_str(rest);
    output
}

fn is_identifier_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}
