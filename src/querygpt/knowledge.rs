// SPDX-License-Identifier: MIT

//! Knowledge base - schema and business-rule text per workspace
//!
//! The backing document is JSON shaped as
//! `workspace -> { description, tables -> { schema, rules, sample_query } }`.
//! Table order in the document is preserved and drives the order of the
//! retrieval context.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::adk::error::KnowledgeError;

/// Descriptive text for one table
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct TableKnowledge {
    pub schema: String,
    pub rules: String,
    /// Example query; kept in the document but not used for prompting
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sample_query: Option<String>,
}

/// One workspace entry
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct WorkspaceKnowledge {
    #[serde(default)]
    pub description: String,
    pub tables: IndexMap<String, TableKnowledge>,
}

/// Whole knowledge document
pub type KnowledgeDocument = IndexMap<String, WorkspaceKnowledge>;

/// Workspace -> table text lookup
pub trait KnowledgeLookup: Send + Sync {
    /// `Ok(None)` when the workspace is not in the knowledge base
    fn lookup(&self, workspace: &str) -> Result<Option<WorkspaceKnowledge>, KnowledgeError>;
}

/// File-backed knowledge base, re-read on every lookup
#[derive(Debug, Clone)]
pub struct JsonKnowledgeBase {
    path: PathBuf,
}

impl JsonKnowledgeBase {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read and parse the whole document
    pub fn load(&self) -> Result<KnowledgeDocument, KnowledgeError> {
        let content = fs::read_to_string(&self.path).map_err(|source| KnowledgeError::Read {
            path: self.path.clone(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| KnowledgeError::Parse {
            path: self.path.clone(),
            source,
        })
    }

    /// Write a document as indented JSON
    pub fn write(path: impl AsRef<Path>, document: &KnowledgeDocument) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(document)?;
        fs::write(path, json)
    }
}

impl KnowledgeLookup for JsonKnowledgeBase {
    fn lookup(&self, workspace: &str) -> Result<Option<WorkspaceKnowledge>, KnowledgeError> {
        let mut document = self.load()?;
        Ok(document.shift_remove(workspace))
    }
}

/// In-memory knowledge base
#[derive(Debug, Clone, Default)]
pub struct StaticKnowledgeBase {
    document: KnowledgeDocument,
}

impl StaticKnowledgeBase {
    pub fn new(document: KnowledgeDocument) -> Self {
        Self { document }
    }
}

impl KnowledgeLookup for StaticKnowledgeBase {
    fn lookup(&self, workspace: &str) -> Result<Option<WorkspaceKnowledge>, KnowledgeError> {
        Ok(self.document.get(workspace).cloned())
    }
}
