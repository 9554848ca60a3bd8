//! Configuration errors raised by the decision graph and the engine.
//!
//! None of these are user-correctable. They mean the graph table is wrong.

/// A broken decision graph, or a choice the graph cannot honour.
#[derive(Debug, thiserror::Error)]
pub enum ConfigurationError {
    #[error("start node '{0}' is not defined")]
    MissingStart(String),
    #[error("node '{from}' routes to unknown node '{next}'")]
    UnknownNode { from: String, next: String },
    #[error("node '{0}' offers no options")]
    NoOptions(String),
    #[error("node '{node}' option '{label}': {reason}")]
    ScoringAttribute {
        node: String,
        label: String,
        reason: &'static str,
    },
    #[error("evaluation node '{node}': {reason}")]
    MalformedEvaluation { node: String, reason: String },
    #[error("outcome node '{node}': {reason}")]
    MalformedOutcome { node: String, reason: String },
    #[error("node '{node}' offers a restart but is not an outcome")]
    MisplacedRestart { node: String },
    #[error("option '{label}' is not offered by node '{node}'")]
    ForeignChoice { node: String, label: String },
    #[error("duplicate node id '{0}'")]
    DuplicateNode(String),
    #[error("invalid decision graph JSON: {0}")]
    Json(#[from] serde_json::Error),
}
