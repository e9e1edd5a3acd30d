//! Plugin tiers for caller-supplied actions and transformations.
//!
//! The registry is owned by an `Engine` rather than living in process-wide
//! state, so registration order and test isolation stay explicit. Lookups
//! happen on every dispatch: a registration made while a run is in flight
//! applies to every action dispatched after it.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};

use crate::dispatch::ActionHandler;
use crate::transform::Transformation;

/// Two independent name-to-handler maps with last-write-wins registration.
///
/// Built-in names always shadow plugin entries of the same name: the
/// dispatcher and the transformation resolver consult the built-in tier
/// first and only then this registry.
#[derive(Default)]
pub struct PluginRegistry {
    actions: RwLock<HashMap<String, Arc<dyn ActionHandler>>>,
    transformations: RwLock<HashMap<String, Arc<dyn Transformation>>>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or silently replace) an action handler under `name`.
    pub fn register_action(&self, name: impl Into<String>, handler: impl ActionHandler + 'static) {
        self.actions
            .write()
            .expect("action registry lock")
            .insert(name.into(), Arc::new(handler));
    }

    /// Register (or silently replace) a transformation under `name`.
    pub fn register_transformation(&self, name: impl Into<String>, transformation: impl Transformation + 'static) {
        self.transformations
            .write()
            .expect("transformation registry lock")
            .insert(name.into(), Arc::new(transformation));
    }

    /// Look up a plugin action handler.
    pub fn action(&self, name: &str) -> Option<Arc<dyn ActionHandler>> {
        self.actions.read().expect("action registry lock").get(name).cloned()
    }

    /// Look up a plugin transformation.
    pub fn transformation(&self, name: &str) -> Option<Arc<dyn Transformation>> {
        self.transformations
            .read()
            .expect("transformation registry lock")
            .get(name)
            .cloned()
    }
}

impl fmt::Debug for PluginRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginRegistry")
            .field("actions", &self.actions.read().expect("action registry lock").len())
            .field(
                "transformations",
                &self.transformations.read().expect("transformation registry lock").len(),
            )
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolve::{Context, JsonMap};
    use serde_json::Value;

    fn first(value: &Value, _config: &JsonMap, _context: &Context) -> Value {
        value.clone()
    }

    fn second(_value: &Value, _config: &JsonMap, _context: &Context) -> Value {
        Value::Null
    }

    #[test]
    fn registration_is_last_write_wins() {
        let registry = PluginRegistry::new();
        registry.register_transformation("t", first);
        registry.register_transformation("t", second);
        assert!(registry.transformation("t").is_some());
        // Only one entry survives the overwrite.
        assert_eq!(format!("{registry:?}"), "PluginRegistry { actions: 0, transformations: 1 }");
    }

    #[test]
    fn lookups_miss_unregistered_names() {
        let registry = PluginRegistry::new();
        assert!(registry.action("nothing").is_none());
        assert!(registry.transformation("nothing").is_none());
    }
}
