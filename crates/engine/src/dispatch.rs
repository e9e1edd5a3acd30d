//! The interpreter core: resolves, scopes, and dispatches actions in order.
//!
//! [`Engine`] holds everything that outlives a single run: the plugin
//! registry, the collaborator adapters, and the root document. [`Run`]
//! carries the state of one execution and is the handle through which
//! control-flow handlers re-enter the dispatcher; there is no separate
//! sub-dispatch code path.

use std::sync::Arc;

use anyhow::Result;
use serde_json::Value;
use tracing::{debug, warn};

use crate::diagnostics::{Diagnostic, RunReport};
use crate::fetch::{Fetcher, NoopFetcher};
use crate::model::{ActionSpec, Pipeline};
use crate::query::{DocumentQuery, PathQuery};
use crate::registry::PluginRegistry;
use crate::resolve::Context;
use crate::sink::{LogSink, TracingSink};

/// One registered action kind, shared by built-ins and plugins.
///
/// Handlers receive the placeholder-resolved descriptor, the scope chosen
/// from `contextKey`, the shared mutable context, and the run handle for
/// re-entrant dispatch. `Ok(Some(value))` is stored under the descriptor's
/// `outputKey`; `Ok(None)` stores nothing. `Err` is a programmer error and
/// aborts the run — recoverable conditions go through [`Run::report`]
/// instead.
pub trait ActionHandler: Send + Sync {
    fn invoke(&self, action: &ActionSpec, scope: &Value, context: &mut Context, run: &mut Run<'_>) -> Result<Option<Value>>;
}

impl<F> ActionHandler for F
where
    F: Fn(&ActionSpec, &Value, &mut Context, &mut Run<'_>) -> Result<Option<Value>> + Send + Sync,
{
    fn invoke(&self, action: &ActionSpec, scope: &Value, context: &mut Context, run: &mut Run<'_>) -> Result<Option<Value>> {
        self(action, scope, context, run)
    }
}

/// The built-in action tier, consulted before plugins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BuiltinAction {
    Loop,
    Condition,
    Query,
    QueryAll,
    Fetch,
    SetContext,
    DeleteContext,
    Log,
    Transform,
}

impl BuiltinAction {
    pub(crate) fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "loop" => Self::Loop,
            "condition" => Self::Condition,
            "query" => Self::Query,
            "queryAll" => Self::QueryAll,
            "fetch" => Self::Fetch,
            "setContext" => Self::SetContext,
            "deleteContext" => Self::DeleteContext,
            "log" => Self::Log,
            "transform" => Self::Transform,
            _ => return None,
        })
    }
}

/// The configured interpreter.
///
/// An engine owns the plugin registry, the collaborator adapters, and the
/// root document that selector actions fall back to. It is immutable
/// during a run except for the registry, which deliberately accepts
/// registrations at any time — including from handlers of the run itself.
pub struct Engine {
    plugins: PluginRegistry,
    fetcher: Box<dyn Fetcher>,
    query: Box<dyn DocumentQuery>,
    sink: Box<dyn LogSink>,
    document: Value,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    /// An engine with the default adapters: path-based JSON querying, the
    /// echoing no-op fetcher, and tracing log output.
    pub fn new() -> Self {
        Self {
            plugins: PluginRegistry::new(),
            fetcher: Box::new(NoopFetcher),
            query: Box::new(PathQuery),
            sink: Box::new(TracingSink),
            document: Value::Null,
        }
    }

    /// Replace the root document queried when `contextKey` is absent.
    pub fn with_document(mut self, document: Value) -> Self {
        self.document = document;
        self
    }

    /// Replace the network collaborator.
    pub fn with_fetcher(mut self, fetcher: impl Fetcher + 'static) -> Self {
        self.fetcher = Box::new(fetcher);
        self
    }

    /// Replace the document-query collaborator.
    pub fn with_query(mut self, query: impl DocumentQuery + 'static) -> Self {
        self.query = Box::new(query);
        self
    }

    /// Replace the log sink.
    pub fn with_sink(mut self, sink: impl LogSink + 'static) -> Self {
        self.sink = Box::new(sink);
        self
    }

    /// The plugin registry.
    pub fn plugins(&self) -> &PluginRegistry {
        &self.plugins
    }

    /// Register a plugin action; built-ins of the same name shadow it.
    pub fn register_action(&self, name: impl Into<String>, handler: impl ActionHandler + 'static) {
        self.plugins.register_action(name, handler);
    }

    /// Register a plugin transformation; built-ins of the same name shadow it.
    pub fn register_transformation(&self, name: impl Into<String>, transformation: impl crate::transform::Transformation + 'static) {
        self.plugins.register_transformation(name, transformation);
    }

    pub(crate) fn fetcher(&self) -> &dyn Fetcher {
        self.fetcher.as_ref()
    }

    pub(crate) fn query(&self) -> &dyn DocumentQuery {
        self.query.as_ref()
    }

    pub(crate) fn sink(&self) -> &dyn LogSink {
        self.sink.as_ref()
    }

    pub(crate) fn document(&self) -> &Value {
        &self.document
    }

    /// Run a pipeline to completion against `context`.
    ///
    /// The context is mutated in place; the returned report carries every
    /// diagnostic the run produced. `Err` is reserved for failures outside
    /// the diagnostic taxonomy: structurally invalid descriptors reaching a
    /// built-in handler, and errors returned by plugin handlers.
    pub fn execute(&self, pipeline: &Pipeline, context: &mut Context) -> Result<RunReport> {
        let mut run = Run::new(self);
        run.dispatch(&pipeline.actions, context)?;
        Ok(run.into_report())
    }
}

/// Re-entrant dispatch handle for one execution.
///
/// Control-flow handlers re-enter the interpreter through
/// [`Run::dispatch`] with a sub-list and the same context reference.
pub struct Run<'e> {
    engine: &'e Engine,
    report: RunReport,
}

impl<'e> Run<'e> {
    pub(crate) fn new(engine: &'e Engine) -> Self {
        Self {
            engine,
            report: RunReport::default(),
        }
    }

    /// The engine this run executes under.
    pub fn engine(&self) -> &'e Engine {
        self.engine
    }

    pub(crate) fn into_report(self) -> RunReport {
        self.report
    }

    /// Record a recoverable diagnostic and keep going.
    pub fn report(&mut self, diagnostic: Diagnostic) {
        warn!(%diagnostic, "pipeline diagnostic");
        self.report.diagnostics.push(diagnostic);
    }

    /// Dispatch a list of actions, in order, against the live context.
    pub fn dispatch(&mut self, actions: &[ActionSpec], context: &mut Context) -> Result<()> {
        for action in actions {
            self.run_action(action, context)?;
        }
        Ok(())
    }

    fn run_action(&mut self, action: &ActionSpec, context: &mut Context) -> Result<()> {
        // Resolve against the current context so the action observes every
        // effect of the actions before it in the same list.
        let resolved = action.resolved(context);
        let scope = self.scope_for(&resolved, context);

        let produced = match self.target_for(&resolved) {
            Some(Target::Builtin(builtin)) => {
                debug!(action = ?builtin, "dispatching built-in action");
                self.run_builtin(builtin, &resolved, &scope, context)?
            }
            Some(Target::Plugin(handler)) => {
                debug!(action = resolved.r#type.as_deref().unwrap_or_default(), "dispatching plugin action");
                handler.invoke(&resolved, &scope, context, self)?
            }
            None => {
                let name = resolved
                    .transformation
                    .clone()
                    .or_else(|| resolved.r#type.clone())
                    .unwrap_or_default();
                self.report(Diagnostic::UnknownActionType { name });
                return Ok(());
            }
        };

        if let (Some(output_key), Some(value)) = (&resolved.output_key, produced) {
            context.set(output_key.clone(), value);
        }
        Ok(())
    }

    /// Scope selection: `contextKey` names a context value; an absent key
    /// or a missing value falls back to the engine's root document.
    fn scope_for(&self, action: &ActionSpec, context: &Context) -> Value {
        action
            .context_key
            .as_deref()
            .and_then(|key| context.get(key))
            .cloned()
            .unwrap_or_else(|| self.engine.document().clone())
    }

    fn target_for(&self, action: &ActionSpec) -> Option<Target> {
        if let Some(name) = action.r#type.as_deref() {
            if let Some(builtin) = BuiltinAction::from_name(name) {
                return Some(Target::Builtin(builtin));
            }
            return self.engine.plugins().action(name).map(Target::Plugin);
        }
        // A bare `transformation` field acts as an implicit transform.
        action.transformation.as_ref().map(|_| Target::Builtin(BuiltinAction::Transform))
    }
}

enum Target {
    Builtin(BuiltinAction),
    Plugin(Arc<dyn ActionHandler>),
}
