// SPDX-License-Identifier: MIT

//! SQL generation from the pruned schema

use async_trait::async_trait;
use std::sync::Arc;

use super::QUERY_GEN;
use crate::adk::error::Result;
use crate::adk::model::{CompletionService, ModelTier, Prompt};
use crate::querygpt::workflow::graph::Stage;
use crate::querygpt::workflow::state::{QueryState, StateUpdate};

/// Row cap for exploratory queries
pub const ROW_LIMIT: usize = 5;

/// Keep only the first statement and terminate it with exactly one `;`
pub fn first_statement(raw: &str) -> String {
    let statement = raw.trim().split(';').next().unwrap_or_default().trim();
    format!("{};", statement)
}

fn system_prompt(pruned_schema: &str) -> String {
    format!(
        "You are an expert SQL engineer. Write one syntactically correct SQLite query that answers \
         the user's question, using *only* the database schema and rules below.\n\n\
         DATABASE CONTEXT:\n{schema}\n\n\
         CRITICAL INSTRUCTIONS:\n\
         1. Only use the tables and columns provided in the context.\n\
         2. Adhere strictly to the 'RULES' for each table.\n\
         3. Use the 'completed' status rule for trip counting.\n\
         4. For exploratory queries, limit the result to {limit} rows (use LIMIT {limit}).\n\
         5. Return ONLY the raw SQL query, no explanations, no markdown block (```sql).",
        schema = pruned_schema,
        limit = ROW_LIMIT
    )
}

fn human_turn(question: &str) -> String {
    format!("User Question: {}\nSQL Query:", question)
}

/// Generates SQL with the main model
pub struct QueryGenStage {
    completion: Arc<dyn CompletionService>,
}

impl QueryGenStage {
    pub fn new(completion: Arc<dyn CompletionService>) -> Self {
        Self { completion }
    }
}

#[async_trait]
impl Stage for QueryGenStage {
    fn name(&self) -> &str {
        QUERY_GEN
    }

    async fn run(&self, state: &QueryState) -> Result<StateUpdate> {
        log::info!("Generating SQL");
        let prompt = Prompt::chat(
            system_prompt(&state.pruned_schema),
            human_turn(&state.user_question),
        );
        let raw = self.completion.complete(&prompt, ModelTier::Main).await?;

        let sql = first_statement(&raw);
        log::info!("Generated SQL: {}", sql);
        Ok(StateUpdate::new().sql_query(sql))
    }
}
