//! Built-in action handlers.
//!
//! Each handler implements one row of the built-in action table. They run
//! as methods on [`Run`] so control-flow actions can re-enter the
//! dispatcher, and they report recoverable problems instead of failing:
//! the only `Err` paths are structurally invalid descriptors, which are
//! programmer errors by contract.

use anyhow::{Result, bail};
use serde_json::Value;
use tracing::warn;

use crate::condition;
use crate::diagnostics::Diagnostic;
use crate::dispatch::{BuiltinAction, Run};
use crate::fetch::ResponseFormat;
use crate::model::ActionSpec;
use crate::resolve::{Context, resolve_str, value_to_text};
use crate::transform;

impl Run<'_> {
    pub(crate) fn run_builtin(
        &mut self,
        builtin: BuiltinAction,
        action: &ActionSpec,
        scope: &Value,
        context: &mut Context,
    ) -> Result<Option<Value>> {
        match builtin {
            BuiltinAction::Loop => self.run_loop(action, context),
            BuiltinAction::Condition => self.run_condition(action, context),
            BuiltinAction::Query => Ok(self.run_query(action, scope)),
            BuiltinAction::QueryAll => Ok(self.run_query_all(action, scope)),
            BuiltinAction::Fetch => Ok(self.run_fetch(action)),
            BuiltinAction::SetContext => Self::run_set_context(action, context),
            BuiltinAction::DeleteContext => Self::run_delete_context(action, context),
            BuiltinAction::Log => Ok(self.run_log(action, context)),
            BuiltinAction::Transform => Ok(self.run_transform(action, context)),
        }
    }

    /// `loop`: one pass of the nested list per element of the input array.
    ///
    /// The loop variable is left in place after the last iteration, and
    /// diagnostics reported by nested actions never stop the remaining
    /// iterations. A missing or non-array input iterates zero times.
    fn run_loop(&mut self, action: &ActionSpec, context: &mut Context) -> Result<Option<Value>> {
        let Some(item_key) = action.item_key.as_deref() else {
            bail!("loop action requires 'itemKey'");
        };
        let Some(nested) = action.actions.as_ref() else {
            bail!("loop action requires 'actions'");
        };

        let items = action
            .input_key
            .as_deref()
            .and_then(|key| context.get(key))
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        for item in items {
            context.set(item_key.to_string(), item);
            self.dispatch(nested, context)?;
        }
        Ok(None)
    }

    /// `condition`: branch on the evaluated predicate.
    ///
    /// An unknown predicate name fails closed, and a selected branch the
    /// descriptor does not carry is reported rather than fatal.
    fn run_condition(&mut self, action: &ActionSpec, context: &mut Context) -> Result<Option<Value>> {
        let name = action.condition.as_deref().unwrap_or_default();
        let input = action
            .input_key
            .as_deref()
            .and_then(|key| context.get(key))
            .cloned()
            .unwrap_or(Value::Null);
        let expected = action.value.clone().unwrap_or(Value::Null);

        let met = match condition::evaluate(&input, name, &expected) {
            Ok(met) => met,
            Err(diagnostic) => {
                self.report(diagnostic);
                false
            }
        };

        let branch = if met { action.actions.as_ref() } else { action.else_actions.as_ref() };
        match branch {
            Some(actions) => self.dispatch(actions, context)?,
            None => self.report(Diagnostic::ConditionWithoutBranch),
        }
        Ok(None)
    }

    fn run_query(&mut self, action: &ActionSpec, scope: &Value) -> Option<Value> {
        let selector = action.selector.as_deref().unwrap_or_default();
        let node = self.engine().query().query_one(selector, scope);
        Some(node.map(|node| Value::String(value_to_text(&node))).unwrap_or(Value::Null))
    }

    fn run_query_all(&mut self, action: &ActionSpec, scope: &Value) -> Option<Value> {
        let selector = action.selector.as_deref().unwrap_or_default();
        let nodes = self.engine().query().query_all(selector, scope);
        Some(Value::Array(
            nodes.iter().map(|node| Value::String(value_to_text(node))).collect(),
        ))
    }

    /// `fetch`: failures degrade to null with a `NetworkFailure` report;
    /// the request body is sent only for non-GET methods.
    fn run_fetch(&mut self, action: &ActionSpec) -> Option<Value> {
        let url = action.url.clone().unwrap_or_default();
        let method = action.method.clone().unwrap_or_else(|| "GET".to_string());
        let format = match action.response_type.as_deref() {
            None => ResponseFormat::default(),
            Some(name) => ResponseFormat::from_name(name).unwrap_or_else(|| {
                warn!(name, "unknown responseType, decoding as text");
                ResponseFormat::Text
            }),
        };

        match self.engine().fetcher().fetch(&url, &method, action.data.as_ref(), format) {
            Ok(value) => Some(value),
            Err(error) => {
                self.report(Diagnostic::NetworkFailure {
                    url,
                    message: format!("{error:#}"),
                });
                Some(Value::Null)
            }
        }
    }

    fn run_set_context(action: &ActionSpec, context: &mut Context) -> Result<Option<Value>> {
        let Some(key) = action.key.clone() else {
            bail!("setContext action requires 'key'");
        };
        context.set(key, action.value.clone().unwrap_or(Value::Null));
        Ok(None)
    }

    fn run_delete_context(action: &ActionSpec, context: &mut Context) -> Result<Option<Value>> {
        let Some(key) = action.key.as_deref() else {
            bail!("deleteContext action requires 'key'");
        };
        context.remove(key);
        Ok(None)
    }

    /// `log`: the message gets a second resolution pass at log time, so
    /// tokens stored inside context values still resolve before emission.
    fn run_log(&mut self, action: &ActionSpec, context: &Context) -> Option<Value> {
        let message = action.message.as_deref().unwrap_or_default();
        let message = resolve_str(message, context);
        self.engine().sink().emit(&message);
        None
    }

    fn run_transform(&mut self, action: &ActionSpec, context: &mut Context) -> Option<Value> {
        let name = action.transformation.clone().unwrap_or_default();
        let input = action
            .input_key
            .as_deref()
            .and_then(|key| context.get(key))
            .cloned()
            .unwrap_or(Value::Null);
        let config = action.as_config();

        match transform::apply_named(&name, &input, &config, context, self) {
            Some(value) => Some(value),
            None => {
                self.report(Diagnostic::UnknownTransformation { name });
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::Engine;
    use crate::model::Pipeline;
    use crate::sink::MemorySink;
    use serde_json::json;
    use std::sync::Arc;

    fn pipeline(actions: Value) -> Pipeline {
        serde_json::from_value(json!({ "actions": actions })).expect("pipeline literal")
    }

    fn seeded(entries: Value) -> Context {
        Context::from(entries.as_object().expect("object literal").clone())
    }

    #[test]
    fn loop_iterates_in_order_and_keeps_the_loop_variable() {
        let engine = Engine::new();
        let mut context = seeded(json!({"items": ["x", "y", "z"]}));
        let report = engine
            .execute(
                &pipeline(json!([{
                    "type": "loop",
                    "inputKey": "items",
                    "itemKey": "it",
                    "actions": [
                        {"type": "setContext", "key": "last", "value": "${it}"}
                    ]
                }])),
                &mut context,
            )
            .expect("execute");

        assert!(report.is_clean());
        assert_eq!(context.get("items"), Some(&json!(["x", "y", "z"])));
        assert_eq!(context.get("it"), Some(&json!("z")));
        assert_eq!(context.get("last"), Some(&json!("z")));
    }

    #[test]
    fn loop_over_missing_input_iterates_zero_times() {
        let engine = Engine::new();
        let mut context = Context::new();
        engine
            .execute(
                &pipeline(json!([{
                    "type": "loop",
                    "inputKey": "absent",
                    "itemKey": "it",
                    "actions": [{"type": "setContext", "key": "ran", "value": true}]
                }])),
                &mut context,
            )
            .expect("execute");
        assert!(!context.contains("ran"));
        assert!(!context.contains("it"));
    }

    #[test]
    fn loop_continues_past_nested_diagnostics() {
        let engine = Engine::new();
        let mut context = seeded(json!({"items": [1, 2]}));
        let report = engine
            .execute(
                &pipeline(json!([{
                    "type": "loop",
                    "inputKey": "items",
                    "itemKey": "it",
                    "actions": [
                        {"type": "doesNotExist"},
                        {"type": "setContext", "key": "last", "value": "${it}"}
                    ]
                }])),
                &mut context,
            )
            .expect("execute");

        // One unknown-type report per iteration, but every iteration ran.
        assert_eq!(report.diagnostics.len(), 2);
        assert_eq!(context.get("last"), Some(&json!("2")));
    }

    #[test]
    fn loop_without_item_key_is_a_programmer_error() {
        let engine = Engine::new();
        let mut context = seeded(json!({"items": [1]}));
        let error = engine
            .execute(
                &pipeline(json!([{"type": "loop", "inputKey": "items", "actions": []}])),
                &mut context,
            )
            .expect_err("should abort");
        assert!(error.to_string().contains("itemKey"));
    }

    #[test]
    fn condition_dispatches_the_matching_branch() {
        let engine = Engine::new();
        let mut context = seeded(json!({"n": 5}));
        engine
            .execute(
                &pipeline(json!([{
                    "type": "condition",
                    "inputKey": "n",
                    "condition": "greaterThan",
                    "value": 3,
                    "actions": [{"type": "setContext", "key": "branch", "value": "then"}],
                    "elseActions": [{"type": "setContext", "key": "branch", "value": "else"}]
                }])),
                &mut context,
            )
            .expect("execute");
        assert_eq!(context.get("branch"), Some(&json!("then")));
    }

    #[test]
    fn condition_falls_back_to_else_actions() {
        let engine = Engine::new();
        let mut context = seeded(json!({"n": 1}));
        engine
            .execute(
                &pipeline(json!([{
                    "type": "condition",
                    "inputKey": "n",
                    "condition": "greaterThan",
                    "value": 3,
                    "actions": [{"type": "setContext", "key": "branch", "value": "then"}],
                    "elseActions": [{"type": "setContext", "key": "branch", "value": "else"}]
                }])),
                &mut context,
            )
            .expect("execute");
        assert_eq!(context.get("branch"), Some(&json!("else")));
    }

    #[test]
    fn condition_without_a_selected_branch_reports() {
        let engine = Engine::new();
        let mut context = seeded(json!({"n": 1}));
        let report = engine
            .execute(
                &pipeline(json!([{
                    "type": "condition",
                    "inputKey": "n",
                    "condition": "greaterThan",
                    "value": 3,
                    "actions": [{"type": "setContext", "key": "branch", "value": "then"}]
                }])),
                &mut context,
            )
            .expect("execute");
        assert_eq!(report.diagnostics, vec![Diagnostic::ConditionWithoutBranch]);
        assert!(!context.contains("branch"));
    }

    #[test]
    fn condition_with_unknown_name_fails_closed() {
        let engine = Engine::new();
        let mut context = seeded(json!({"n": 1}));
        let report = engine
            .execute(
                &pipeline(json!([{
                    "type": "condition",
                    "inputKey": "n",
                    "condition": "roughly",
                    "value": 1,
                    "elseActions": [{"type": "setContext", "key": "branch", "value": "else"}]
                }])),
                &mut context,
            )
            .expect("execute");
        assert_eq!(
            report.diagnostics,
            vec![Diagnostic::UnknownCondition { name: "roughly".into() }]
        );
        assert_eq!(context.get("branch"), Some(&json!("else")));
    }

    #[test]
    fn query_renders_the_first_match_or_null() {
        let engine = Engine::new().with_document(json!({"items": [{"name": "first"}]}));
        let mut context = Context::new();
        engine
            .execute(
                &pipeline(json!([
                    {"type": "query", "selector": "items[0].name", "outputKey": "hit"},
                    {"type": "query", "selector": "items[9].name", "outputKey": "miss"}
                ])),
                &mut context,
            )
            .expect("execute");
        assert_eq!(context.get("hit"), Some(&json!("first")));
        assert_eq!(context.get("miss"), Some(&json!(null)));
    }

    #[test]
    fn query_all_renders_every_match() {
        let engine = Engine::new().with_document(json!({"items": [{"n": 1}, {"n": 2}]}));
        let mut context = Context::new();
        engine
            .execute(
                &pipeline(json!([{"type": "queryAll", "selector": "items[*].n", "outputKey": "all"}])),
                &mut context,
            )
            .expect("execute");
        assert_eq!(context.get("all"), Some(&json!(["1", "2"])));
    }

    #[test]
    fn fetch_echoes_through_the_noop_fetcher() {
        let engine = Engine::new();
        let mut context = seeded(json!({"id": 7}));
        engine
            .execute(
                &pipeline(json!([{
                    "type": "fetch",
                    "url": "https://example.test/items/${id}",
                    "outputKey": "response"
                }])),
                &mut context,
            )
            .expect("execute");
        assert_eq!(
            context.get("response"),
            Some(&json!({"url": "https://example.test/items/7", "method": "GET"}))
        );
    }

    #[test]
    fn delete_context_removes_the_key() {
        let engine = Engine::new();
        let mut context = seeded(json!({"gone": 1, "kept": 2}));
        engine
            .execute(&pipeline(json!([{"type": "deleteContext", "key": "gone"}])), &mut context)
            .expect("execute");
        assert!(!context.contains("gone"));
        assert_eq!(context.get("kept"), Some(&json!(2)));
    }

    #[test]
    fn log_resolves_tokens_a_second_time() {
        let sink = Arc::new(MemorySink::new());
        let engine = Engine::new().with_sink(Arc::clone(&sink));
        // The context value itself carries a token; the descriptor-level
        // pass resolves ${template}, the log-time pass resolves ${name}.
        let mut context = seeded(json!({"template": "hello ${name}", "name": "trawl"}));
        engine
            .execute(&pipeline(json!([{"type": "log", "message": "${template}"}])), &mut context)
            .expect("execute");
        assert_eq!(sink.messages(), vec!["hello trawl"]);
    }

    #[test]
    fn transform_action_applies_builtins() {
        let engine = Engine::new();
        let mut context = seeded(json!({"word": "quiet"}));
        engine
            .execute(
                &pipeline(json!([{
                    "type": "transform",
                    "transformation": "uppercase",
                    "inputKey": "word",
                    "outputKey": "loud"
                }])),
                &mut context,
            )
            .expect("execute");
        assert_eq!(context.get("loud"), Some(&json!("QUIET")));
    }

    #[test]
    fn implicit_transform_without_type() {
        let engine = Engine::new();
        let mut context = seeded(json!({"csv": "a,b"}));
        engine
            .execute(
                &pipeline(json!([{
                    "transformation": "split",
                    "inputKey": "csv",
                    "outputKey": "parts"
                }])),
                &mut context,
            )
            .expect("execute");
        assert_eq!(context.get("parts"), Some(&json!(["a", "b"])));
    }

    #[test]
    fn unknown_transformation_reports_and_stores_nothing() {
        let engine = Engine::new();
        let mut context = seeded(json!({"v": 1}));
        let report = engine
            .execute(
                &pipeline(json!([{
                    "type": "transform",
                    "transformation": "mystery",
                    "inputKey": "v",
                    "outputKey": "out"
                }])),
                &mut context,
            )
            .expect("execute");
        assert_eq!(
            report.diagnostics,
            vec![Diagnostic::UnknownTransformation { name: "mystery".into() }]
        );
        assert!(!context.contains("out"));
    }
}
