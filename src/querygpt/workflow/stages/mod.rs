// SPDX-License-Identifier: MIT

//! The seven stages of the query graph
//!
//! Each stage reads the fields it needs from the [`QueryState`] and returns
//! only the fields it writes. External collaborators (completion service,
//! knowledge base, database) are injected at construction.
//!
//! [`QueryState`]: crate::querygpt::workflow::state::QueryState

mod column_prune;
mod execute;
mod query_gen;
mod retrieval;
mod router;
mod synthesize;
mod table_prune;

pub use column_prune::{build_pruned_schema, ColumnPruneStage};
pub use execute::{is_error_result, run_statement, ExecuteStage, ERROR_TAG, NON_SELECT_ACK};
pub use query_gen::{first_statement, QueryGenStage, ROW_LIMIT};
pub use retrieval::{
    render_context, RetrievalStage, NO_WORKSPACE_SENTINEL, UNKNOWN_WORKSPACE_SENTINEL,
};
pub use router::{normalize_workspace, RouterStage, DEFAULT_WORKSPACE, WORKSPACES};
pub use synthesize::{error_answer, SynthesizeStage};
pub use table_prune::{parse_table_list, TablePruneStage, KNOWN_TABLES};

/// Node names as they appear in traces
pub const ROUTER: &str = "router";
pub const RETRIEVAL: &str = "rag_retrieval";
pub const TABLE_PRUNER: &str = "table_pruner";
pub const COLUMN_PRUNER: &str = "column_pruner";
pub const QUERY_GEN: &str = "query_gen";
pub const QUERY_EXEC: &str = "query_exec";
pub const FINAL_SYNTH: &str = "final_synth";

#[cfg(test)]
pub(crate) mod testing {
    use async_trait::async_trait;
    use std::sync::Mutex;

    use crate::adk::error::ModelError;
    use crate::adk::model::{CompletionService, ModelTier, Prompt};

    /// Replies with a fixed text and records every prompt it sees
    pub struct ScriptedCompletion {
        reply: Result<String, String>,
        pub calls: Mutex<Vec<(Prompt, ModelTier)>>,
    }

    impl ScriptedCompletion {
        pub fn replying(reply: &str) -> Self {
            Self {
                reply: Ok(reply.to_string()),
                calls: Mutex::new(Vec::new()),
            }
        }

        pub fn failing(message: &str) -> Self {
            Self {
                reply: Err(message.to_string()),
                calls: Mutex::new(Vec::new()),
            }
        }

        pub fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }

        pub fn last_call(&self) -> (Prompt, ModelTier) {
            self.calls.lock().unwrap().last().cloned().unwrap()
        }
    }

    #[async_trait]
    impl CompletionService for ScriptedCompletion {
        async fn complete(&self, prompt: &Prompt, tier: ModelTier) -> Result<String, ModelError> {
            self.calls.lock().unwrap().push((prompt.clone(), tier));
            self.reply
                .clone()
                .map_err(ModelError::InvalidResponse)
        }
    }
}
