// SPDX-License-Identifier: MIT

//! Knowledge retrieval: workspace -> full schema and rules text

use async_trait::async_trait;
use std::sync::Arc;

use super::RETRIEVAL;
use crate::adk::error::Result;
use crate::querygpt::knowledge::{KnowledgeLookup, WorkspaceKnowledge};
use crate::querygpt::workflow::graph::Stage;
use crate::querygpt::workflow::state::{QueryState, StateUpdate};

/// Context text when routing produced no workspace
pub const NO_WORKSPACE_SENTINEL: &str = "Error: No workspace identified.";

/// Context text when the workspace has no knowledge entry
pub const UNKNOWN_WORKSPACE_SENTINEL: &str = "Error: Workspace not found in knowledge base.";

/// Header plus one TABLE/SCHEMA/RULES block per table, in document order
pub fn render_context(workspace: &str, knowledge: &WorkspaceKnowledge) -> String {
    let mut context = format!("WORKSPACE: {}\n", workspace);
    for (table, info) in &knowledge.tables {
        context.push_str(&format!(
            "\nTABLE: {}\nSCHEMA: {}\nRULES: {}\n",
            table, info.schema, info.rules
        ));
    }
    context
}

/// Pulls every table of the routed workspace, unfiltered by the question
pub struct RetrievalStage {
    knowledge: Arc<dyn KnowledgeLookup>,
}

impl RetrievalStage {
    pub fn new(knowledge: Arc<dyn KnowledgeLookup>) -> Self {
        Self { knowledge }
    }
}

#[async_trait]
impl Stage for RetrievalStage {
    fn name(&self) -> &str {
        RETRIEVAL
    }

    async fn run(&self, state: &QueryState) -> Result<StateUpdate> {
        let workspace = state.workspace_name.as_str();
        if workspace.is_empty() {
            log::warn!("No workspace on record, skipping knowledge lookup");
            return Ok(StateUpdate::new().context_schema(NO_WORKSPACE_SENTINEL));
        }

        let context = match self.knowledge.lookup(workspace)? {
            Some(knowledge) => render_context(workspace, &knowledge),
            None => {
                log::warn!("Workspace '{}' not found in knowledge base", workspace);
                UNKNOWN_WORKSPACE_SENTINEL.to_string()
            }
        };

        log::info!(
            "Retrieved {} characters of schema/rules for {}",
            context.chars().count(),
            workspace
        );
        Ok(StateUpdate::new().context_schema(context))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adk::error::{KnowledgeError, QueryGptError};
    use crate::querygpt::knowledge::{KnowledgeDocument, StaticKnowledgeBase, TableKnowledge};
    use indexmap::IndexMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingLookup {
        inner: StaticKnowledgeBase,
        calls: AtomicUsize,
    }

    impl KnowledgeLookup for CountingLookup {
        fn lookup(&self, workspace: &str) -> Result<Option<WorkspaceKnowledge>, KnowledgeError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.lookup(workspace)
        }
    }

    struct BrokenLookup;

    impl KnowledgeLookup for BrokenLookup {
        fn lookup(&self, _workspace: &str) -> Result<Option<WorkspaceKnowledge>, KnowledgeError> {
            Err(KnowledgeError::Read {
                path: "knowledge_base.json".into(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
            })
        }
    }

    fn mobility() -> KnowledgeDocument {
        let mut tables = IndexMap::new();
        tables.insert(
            "trips".to_string(),
            TableKnowledge {
                schema: "trip_id (INT)".into(),
                rules: "completed only".into(),
                sample_query: None,
            },
        );
        tables.insert(
            "cities".to_string(),
            TableKnowledge {
                schema: "city (VARCHAR)".into(),
                rules: "none".into(),
                sample_query: None,
            },
        );
        let mut doc = IndexMap::new();
        doc.insert(
            "Mobility".to_string(),
            WorkspaceKnowledge {
                description: String::new(),
                tables,
            },
        );
        doc
    }

    fn counting() -> Arc<CountingLookup> {
        Arc::new(CountingLookup {
            inner: StaticKnowledgeBase::new(mobility()),
            calls: AtomicUsize::new(0),
        })
    }

    fn routed(workspace: &str) -> QueryState {
        QueryState::new("q").apply(StateUpdate::new().workspace_name(workspace))
    }

    #[tokio::test]
    async fn test_renders_every_table_in_order() {
        let stage = RetrievalStage::new(counting());
        let update = stage.run(&routed("Mobility")).await.unwrap();
        assert_eq!(
            update.context_schema.unwrap(),
            "WORKSPACE: Mobility\n\
             \nTABLE: trips\nSCHEMA: trip_id (INT)\nRULES: completed only\n\
             \nTABLE: cities\nSCHEMA: city (VARCHAR)\nRULES: none\n"
        );
    }

    #[tokio::test]
    async fn test_empty_workspace_skips_lookup() {
        let lookup = counting();
        let stage = RetrievalStage::new(lookup.clone());
        let update = stage.run(&QueryState::new("q")).await.unwrap();
        assert_eq!(update.context_schema.as_deref(), Some(NO_WORKSPACE_SENTINEL));
        assert_eq!(lookup.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_unknown_workspace_sentinel() {
        let lookup = counting();
        let stage = RetrievalStage::new(lookup.clone());
        let update = stage.run(&routed("Payments")).await.unwrap();
        assert_eq!(
            update.context_schema.as_deref(),
            Some(UNKNOWN_WORKSPACE_SENTINEL)
        );
        assert_eq!(lookup.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_replay_keeps_prior_context_as_prefix() {
        let stage = RetrievalStage::new(counting());
        let state = routed("Mobility");
        let once = state.clone().apply(stage.run(&state).await.unwrap());
        let twice = once.clone().apply(stage.run(&once).await.unwrap());
        assert!(twice.context_schema.starts_with(&once.context_schema));
        assert_eq!(twice.context_schema.len(), 2 * once.context_schema.len());
    }

    #[tokio::test]
    async fn test_unreadable_knowledge_propagates() {
        let stage = RetrievalStage::new(Arc::new(BrokenLookup));
        let err = stage.run(&routed("Mobility")).await.unwrap_err();
        assert!(matches!(err, QueryGptError::Knowledge(_)));
    }
}
