// SPDX-License-Identifier: MIT

//! Table pruning: keep only the tables the question needs

use async_trait::async_trait;
use std::sync::Arc;

use super::TABLE_PRUNER;
use crate::adk::error::Result;
use crate::adk::model::{CompletionService, ModelTier, Prompt};
use crate::querygpt::workflow::graph::Stage;
use crate::querygpt::workflow::state::{QueryState, StateUpdate};

/// Tables the pruner is allowed to select
pub const KNOWN_TABLES: [&str; 2] = ["trips", "drivers"];

/// Parse a comma-separated completion into whitelisted table names.
///
/// Unknown names are dropped, order and duplicates are kept as emitted.
pub fn parse_table_list(raw: &str) -> Vec<String> {
    raw.trim()
        .to_lowercase()
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .filter(|t| KNOWN_TABLES.contains(t))
        .map(String::from)
        .collect()
}

fn selection_prompt(context: &str, question: &str) -> String {
    format!(
        "You are a Table Selection Agent. Identify ALL tables from the context below that are needed to answer the user's question.\n\n\
         CONTEXT (Schema, Rules, Tables):\n{}\n\n\
         User Question: {}\n\n\
         Your output MUST be a comma-separated list of table names and nothing else. Example: 'trips,drivers'.\n\
         Relevant Tables:",
        context, question
    )
}

/// Asks the fast model which tables of the retrieved context matter
pub struct TablePruneStage {
    completion: Arc<dyn CompletionService>,
}

impl TablePruneStage {
    pub fn new(completion: Arc<dyn CompletionService>) -> Self {
        Self { completion }
    }
}

#[async_trait]
impl Stage for TablePruneStage {
    fn name(&self) -> &str {
        TABLE_PRUNER
    }

    async fn run(&self, state: &QueryState) -> Result<StateUpdate> {
        log::info!(
            "Pruning tables from {} characters of context",
            state.context_schema.chars().count()
        );
        let prompt = Prompt::text(selection_prompt(&state.context_schema, &state.user_question));
        let raw = self.completion.complete(&prompt, ModelTier::Fast).await?;

        let tables = parse_table_list(&raw);
        if tables.is_empty() {
            log::warn!("No known tables in pruner output: {:?}", raw);
        } else {
            log::info!("Selected tables: {}", tables.join(", "));
        }
        Ok(StateUpdate::new().relevant_tables(tables))
    }
}
