// SPDX-License-Identifier: MIT

//! Typed error handling for querygpt-rs
//!
//! Faults that abort a request are expressed here. Query execution faults are
//! not: the execute stage folds them into the `db_result` text so they can be
//! routed through the graph like any other outcome.

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for querygpt-rs
#[derive(Debug, Error)]
pub enum QueryGptError {
    /// Completion service failures (unreachable provider, bad response)
    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    /// Knowledge document could not be read or parsed
    #[error("Knowledge base error: {0}")]
    Knowledge(#[from] KnowledgeError),

    /// Graph construction or execution errors
    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),

    /// I/O errors
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    /// SQLite errors outside the execute stage (seeding)
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
}

/// Model/LLM-specific errors
#[derive(Debug, Error)]
pub enum ModelError {
    /// API key not configured
    #[error("API key not configured for provider: {0}")]
    ApiKeyMissing(String),

    /// Provider not supported
    #[error("Model provider not supported: {0}")]
    UnsupportedProvider(String),

    /// Non-success HTTP status from the provider
    #[error("API error from {provider} ({status}): {message}")]
    Api {
        provider: String,
        status: u16,
        message: String,
    },

    /// Invalid response from model
    #[error("Invalid response from model: {0}")]
    InvalidResponse(String),

    /// Transport failure
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

/// Knowledge document errors
#[derive(Debug, Error)]
pub enum KnowledgeError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// SQL executor faults.
///
/// Never crosses the execute stage: it is rendered into the tagged
/// `db_result` text there.
#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
}

/// Graph validation and execution errors
#[derive(Debug, Error, PartialEq)]
pub enum GraphError {
    /// A node name was registered twice
    #[error("Node '{0}' is declared more than once")]
    DuplicateNode(String),

    /// START or END used as a regular node name
    #[error("Node name '{0}' is reserved")]
    ReservedName(String),

    /// An edge references a node that was never declared
    #[error("Edge references undeclared node '{0}'")]
    UnknownNode(String),

    /// No edge leaves START
    #[error("Graph has no entry edge from START")]
    MissingEntry,

    /// More than one edge leaves START
    #[error("Graph has {0} entry edges from START, expected exactly one")]
    MultipleEntries(usize),

    /// No edge reaches END
    #[error("No edge leads to END")]
    UnreachableEnd,

    /// A declared node has no outgoing edge
    #[error("Node '{0}' has no outgoing edge")]
    DanglingNode(String),

    /// A node was registered under a name other than its stage's own
    #[error("Node '{node}' is registered with stage '{stage}'")]
    NameMismatch { node: String, stage: String },

    /// A node has more than one outgoing edge definition
    #[error("Node '{0}' has more than one outgoing edge definition")]
    ConflictingEdges(String),

    /// A branch predicate produced a label missing from the dispatch table
    #[error("Node '{node}' produced branch label '{label}' with no target")]
    UnmappedBranch { node: String, label: String },

    /// Too many node executions in one run
    #[error("Graph execution exceeded {0} steps")]
    StepLimitExceeded(usize),
}

/// Result alias used across the crate
pub type Result<T, E = QueryGptError> = std::result::Result<T, E>;
