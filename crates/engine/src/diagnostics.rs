//! Runtime diagnostic taxonomy and the per-run report.
//!
//! Every kind here is non-fatal: the dispatcher records the diagnostic and
//! proceeds to the next action in the current list. Failures outside this
//! taxonomy are programmer errors and abort the run instead (see the
//! dispatcher module).

use thiserror::Error;

/// A recoverable condition reported during a pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Diagnostic {
    /// The descriptor's `type` resolved to neither a built-in nor a plugin.
    #[error("unknown action or transformation type '{name}'")]
    UnknownActionType { name: String },

    /// A transformation name resolved in neither tier.
    #[error("unknown transformation '{name}'")]
    UnknownTransformation { name: String },

    /// A `condition` action named a predicate the evaluator does not know.
    #[error("unknown condition '{name}'")]
    UnknownCondition { name: String },

    /// `jsonParse` received input that is not valid JSON text.
    #[error("invalid structured data: {message}")]
    InvalidStructuredData { message: String },

    /// The fetch collaborator signalled a transport or status failure.
    #[error("fetch of '{url}' failed: {message}")]
    NetworkFailure { url: String, message: String },

    /// A `condition` selected a branch its descriptor does not carry.
    #[error("condition selected a branch that is not present")]
    ConditionWithoutBranch,
}

/// Diagnostics collected over one execution of a pipeline.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunReport {
    /// Everything reported, in the order it occurred.
    pub diagnostics: Vec<Diagnostic>,
}

impl RunReport {
    /// True when the run completed without reporting anything.
    pub fn is_clean(&self) -> bool {
        self.diagnostics.is_empty()
    }
}
