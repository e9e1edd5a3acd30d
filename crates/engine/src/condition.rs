//! Predicate evaluation for the `condition` action.

use std::cmp::Ordering;
use std::str::FromStr;

use serde_json::Value;

use crate::diagnostics::Diagnostic;
use crate::resolve::value_to_text;

/// The comparison kinds understood by `condition` actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConditionKind {
    Equals,
    StrictEquals,
    GreaterThan,
    GreaterThanOrEqual,
    LessThan,
    LessThanOrEqual,
    Contains,
    DoesNotContain,
    Empty,
    IsNotEmpty,
}

impl FromStr for ConditionKind {
    type Err = ();

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        Ok(match name {
            "equals" => Self::Equals,
            "strictEquals" => Self::StrictEquals,
            "greaterThan" => Self::GreaterThan,
            "greaterThanOrEqual" => Self::GreaterThanOrEqual,
            "lessThan" => Self::LessThan,
            "lessThanOrEqual" => Self::LessThanOrEqual,
            "contains" => Self::Contains,
            "doesNotContain" => Self::DoesNotContain,
            "empty" => Self::Empty,
            "isNotEmpty" => Self::IsNotEmpty,
            _ => return Err(()),
        })
    }
}

/// Evaluate a named condition against a value and comparand.
///
/// Unknown names surface as an [`Diagnostic::UnknownCondition`]; callers
/// treat that as false, so evaluation fails closed.
pub fn evaluate(value: &Value, condition: &str, expected: &Value) -> Result<bool, Diagnostic> {
    let kind = condition
        .parse::<ConditionKind>()
        .map_err(|()| Diagnostic::UnknownCondition { name: condition.to_string() })?;
    Ok(apply(kind, value, expected))
}

fn apply(kind: ConditionKind, value: &Value, expected: &Value) -> bool {
    match kind {
        ConditionKind::Equals | ConditionKind::StrictEquals => value == expected,
        ConditionKind::GreaterThan => matches!(compare(value, expected), Some(Ordering::Greater)),
        ConditionKind::GreaterThanOrEqual => {
            matches!(compare(value, expected), Some(Ordering::Greater | Ordering::Equal))
        }
        ConditionKind::LessThan => matches!(compare(value, expected), Some(Ordering::Less)),
        ConditionKind::LessThanOrEqual => {
            matches!(compare(value, expected), Some(Ordering::Less | Ordering::Equal))
        }
        ConditionKind::Contains => contains(value, expected),
        ConditionKind::DoesNotContain => !contains(value, expected),
        ConditionKind::Empty => is_empty_string(value),
        ConditionKind::IsNotEmpty => !is_empty_string(value),
    }
}

/// Ordered comparison: numeric between numbers, lexicographic between
/// strings, undefined across types. An undefined ordering makes every
/// ordered condition false.
fn compare(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

/// Substring containment on strings, element containment on arrays,
/// false for everything else.
fn contains(value: &Value, expected: &Value) -> bool {
    match value {
        Value::String(text) => text.contains(&value_to_text(expected)),
        Value::Array(items) => items.contains(expected),
        _ => false,
    }
}

fn is_empty_string(value: &Value) -> bool {
    matches!(value, Value::String(text) if text.is_empty())
}
