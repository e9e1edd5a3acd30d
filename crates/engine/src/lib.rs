//! # Trawl Engine
//!
//! A declarative pipeline interpreter: a configuration lists actions that
//! read from and write to a shared mutable context, branch, loop, query a
//! document, fetch remote data, and reshape values through named
//! transformations. Callers extend the action and transformation
//! vocabularies through a plugin registry without modifying the
//! interpreter.
//!
//! ## Example
//!
//! ```rust
//! use serde_json::json;
//! use trawl_engine::{Context, Engine, Pipeline};
//!
//! let pipeline: Pipeline = serde_json::from_value(json!({
//!     "actions": [
//!         { "type": "setContext", "key": "name", "value": "world" },
//!         { "type": "log", "message": "hello ${name}" }
//!     ]
//! }))?;
//!
//! let engine = Engine::new();
//! let mut context = Context::new();
//! let report = engine.execute(&pipeline, &mut context)?;
//! assert!(report.is_clean());
//! assert_eq!(context.get("name"), Some(&json!("world")));
//! # Ok::<(), anyhow::Error>(())
//! ```
//!
//! ## Architecture
//!
//! - **`model`**: pipeline documents and action descriptors
//! - **`resolve`**: the context store and `${key}` interpolation
//! - **`dispatch`**: the interpreter core and built-in dispatch
//! - **`condition`**: predicate evaluation for `condition` actions
//! - **`transform`**: built-in transformations and chaining
//! - **`registry`**: the plugin tiers for actions and transformations
//! - **`query`/`fetch`/`sink`**: collaborator contracts and their default
//!   adapters
//! - **`validate`**: load-time structural checks

use std::{fs, path::Path};

use anyhow::{Context as _, Result};
use indexmap::IndexMap;
use serde::Deserialize;

mod actions;
pub mod condition;
pub mod diagnostics;
pub mod dispatch;
pub mod fetch;
pub mod model;
pub mod query;
pub mod registry;
pub mod resolve;
pub mod sink;
pub mod transform;
pub mod validate;

pub use condition::{ConditionKind, evaluate};
pub use diagnostics::{Diagnostic, RunReport};
pub use dispatch::{ActionHandler, Engine, Run};
pub use fetch::{Fetcher, HttpFetcher, NoopFetcher, ResponseFormat};
pub use model::{ActionSpec, Pipeline, PipelineBundle};
pub use query::{DocumentQuery, PathQuery, select_all, select_path};
pub use registry::PluginRegistry;
pub use resolve::{Context, JsonMap, resolve_placeholders, resolve_str, value_to_text};
pub use sink::{LogSink, MemorySink, TracingSink};
pub use transform::Transformation;
pub use validate::{ValidationError, validate_pipeline};

/// Load pipelines from a YAML or JSON file.
///
/// Both single-pipeline documents (an `actions` list with an optional
/// `pipeline` name) and bundles (a `pipelines` map) are accepted; every
/// loaded pipeline is structurally validated before it is returned.
///
/// # Errors
///
/// Fails when the file cannot be read, matches neither document shape, or
/// contains a pipeline that does not validate.
pub fn parse_pipeline_file(file_path: impl AsRef<Path>) -> Result<PipelineBundle> {
    let file_path = file_path.as_ref();
    let content = fs::read_to_string(file_path)
        .with_context(|| format!("failed to read pipeline file: {}", file_path.display()))?;

    let bundle = parse_pipeline_document(&content)?;
    for (name, pipeline) in &bundle.pipelines {
        validate_pipeline(pipeline).with_context(|| format!("invalid pipeline '{name}'"))?;
    }
    Ok(bundle)
}

/// Parse a pipeline document from text (YAML or JSON — JSON is a YAML
/// subset, so one parser covers both).
pub fn parse_pipeline_document(content: &str) -> Result<PipelineBundle> {
    #[derive(Deserialize)]
    struct MultiPipelineDocument {
        pipelines: IndexMap<String, Pipeline>,
    }

    // Probe the bundle shape first so multi-pipeline documents are not
    // accepted as single pipelines with their `pipelines` key ignored.
    if let Ok(multi) = serde_yaml::from_str::<MultiPipelineDocument>(content) {
        return Ok(PipelineBundle {
            pipelines: multi.pipelines,
        });
    }

    if let Ok(pipeline) = serde_yaml::from_str::<Pipeline>(content) {
        let name = pipeline.pipeline.clone().unwrap_or_else(|| "default".to_string());
        let mut pipelines = IndexMap::new();
        pipelines.insert(name, pipeline);
        return Ok(PipelineBundle { pipelines });
    }

    anyhow::bail!(
        "unsupported pipeline document; expected a single pipeline with an \
         'actions' list or a bundle with pipelines under a 'pipelines' key"
    )
}
