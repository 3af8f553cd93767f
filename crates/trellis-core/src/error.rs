//! Error types for the content model engine.

use miette::Diagnostic;
use trellis_dom::DomError;

/// Registering a format handler out of order.
#[derive(thiserror::Error, Debug, Diagnostic, Clone, PartialEq, Eq)]
pub enum FormatError {
    #[error("format handler `{key}` depends on `{dependency}`, which is not registered before it")]
    #[diagnostic(
        code(trellis::format::missing_dependency),
        help("register `{dependency}` first; parse and apply run in registration order")
    )]
    MissingDependency { key: String, dependency: String },
}

/// Errors surfaced by `Editor` operations.
#[derive(thiserror::Error, Debug, Diagnostic)]
#[non_exhaustive]
pub enum EditorError {
    /// The editor was disposed; no further operations are accepted.
    #[error("editor has been disposed")]
    #[diagnostic(code(trellis::editor::disposed))]
    Disposed,

    /// The mutator passed to `try_format_content_model` failed. The DOM was
    /// not touched and the cached model was discarded.
    #[error("content model mutator failed")]
    #[diagnostic(code(trellis::editor::mutator))]
    Mutator(#[source] Box<dyn std::error::Error + Send + Sync + 'static>),

    #[error(transparent)]
    #[diagnostic_source]
    Dom(#[from] DomError),

    #[error("invalid editor configuration")]
    #[diagnostic(code(trellis::editor::config))]
    Config(#[from] serde_json::Error),

    #[error(transparent)]
    #[diagnostic_source]
    Format(#[from] FormatError),
}

impl EditorError {
    /// Wrap any error raised inside a mutator.
    pub fn mutator(err: impl Into<Box<dyn std::error::Error + Send + Sync + 'static>>) -> Self {
        Self::Mutator(err.into())
    }
}
