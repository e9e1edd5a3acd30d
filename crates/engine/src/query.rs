//! Document querying over JSON trees.
//!
//! The engine treats "the document" as a JSON value. Selectors are dot
//! paths with optional numeric or wildcard indices: `items[0].name`
//! selects one node, `items[*].name` fans out over every element. Adapters
//! for other document shapes implement [`DocumentQuery`].

use serde_json::Value;

/// Selector-based lookup against a document subtree.
///
/// `scope` is the subtree chosen by the dispatcher: a context value named
/// by the action's `contextKey`, or the engine's root document.
pub trait DocumentQuery: Send + Sync {
    /// First node matching `selector`, if any.
    fn query_one(&self, selector: &str, scope: &Value) -> Option<Value>;

    /// Every node matching `selector`, in document order.
    fn query_all(&self, selector: &str, scope: &Value) -> Vec<Value>;
}

/// The default adapter: dot-path selection with `[n]` and `[*]` indices.
#[derive(Debug, Clone, Copy, Default)]
pub struct PathQuery;

impl DocumentQuery for PathQuery {
    fn query_one(&self, selector: &str, scope: &Value) -> Option<Value> {
        select_path(scope, selector)
    }

    fn query_all(&self, selector: &str, scope: &Value) -> Vec<Value> {
        select_all(scope, selector)
    }
}

/// Select the first node reached by `selector`.
pub fn select_path(root: &Value, selector: &str) -> Option<Value> {
    select_all(root, selector).into_iter().next()
}

/// Select every node reached by a dot path with optional indices.
///
/// An empty or blank selector yields the scope itself. Missing keys and
/// out-of-range indices prune that branch rather than failing; `[*]` fans
/// out over array elements.
pub fn select_all(root: &Value, selector: &str) -> Vec<Value> {
    let trimmed = selector.trim();
    if trimmed.is_empty() {
        return vec![root.clone()];
    }

    let mut current: Vec<&Value> = vec![root];
    for segment in trimmed.split('.') {
        if segment.is_empty() {
            continue;
        }
        let (key, indices) = split_segment(segment);
        if !key.is_empty() {
            current = current.into_iter().filter_map(|node| node.get(key)).collect();
        }
        for index in indices {
            current = match index {
                Index::At(position) => current.into_iter().filter_map(|node| node.get(position)).collect(),
                Index::Every => current
                    .into_iter()
                    .filter_map(Value::as_array)
                    .flat_map(|items| items.iter())
                    .collect(),
            };
        }
        if current.is_empty() {
            break;
        }
    }

    current.into_iter().cloned().collect()
}

enum Index {
    At(usize),
    Every,
}

/// Split one path segment into its key and trailing `[..]` indices.
/// Unparseable indices are skipped.
fn split_segment(segment: &str) -> (&str, Vec<Index>) {
    let key_end = segment.find('[').unwrap_or(segment.len());
    let key = &segment[..key_end];

    let mut indices = Vec::new();
    let mut rest = &segment[key_end..];
    while let Some(stripped) = rest.strip_prefix('[') {
        let Some(close) = stripped.find(']') else { break };
        let body = &stripped[..close];
        if body == "*" {
            indices.push(Index::Every);
        } else if let Ok(position) = body.parse::<usize>() {
            indices.push(Index::At(position));
        }
        rest = &stripped[close + 1..];
    }

    (key, indices)
}
