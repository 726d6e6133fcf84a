// SPDX-License-Identifier: MIT

//! Final answer synthesis

use async_trait::async_trait;
use std::sync::Arc;

use super::{is_error_result, FINAL_SYNTH};
use crate::adk::error::Result;
use crate::adk::model::{CompletionService, ModelTier, Prompt};
use crate::querygpt::workflow::graph::Stage;
use crate::querygpt::workflow::state::{QueryState, StateUpdate};

/// User-facing answer for a failed query; embeds the query and error verbatim
pub fn error_answer(sql_query: &str, db_result: &str) -> String {
    format!(
        "I encountered an error executing the query. The generated query was:\n\n`{}`\n\n**Error:** {}",
        sql_query, db_result
    )
}

fn summary_prompt(question: &str, sql_query: &str, db_result: &str) -> String {
    format!(
        "You are a friendly data analyst. Turn the SQL query result into a concise, natural language answer for the user.\n\n\
         User Question: {}\n\
         Generated SQL: {}\n\
         SQL Result (Markdown Table):\n{}\n\n\
         Final Answer (Summary of the data):",
        question, sql_query, db_result
    )
}

/// Terminal stage for both execution outcomes
pub struct SynthesizeStage {
    completion: Arc<dyn CompletionService>,
}

impl SynthesizeStage {
    pub fn new(completion: Arc<dyn CompletionService>) -> Self {
        Self { completion }
    }
}

#[async_trait]
impl Stage for SynthesizeStage {
    fn name(&self) -> &str {
        FINAL_SYNTH
    }

    async fn run(&self, state: &QueryState) -> Result<StateUpdate> {
        let answer = if is_error_result(&state.db_result) {
            log::info!("Reporting query failure without synthesis");
            error_answer(&state.sql_query, &state.db_result)
        } else {
            log::info!("Synthesizing final answer");
            let prompt = Prompt::text(summary_prompt(
                &state.user_question,
                &state.sql_query,
                &state.db_result,
            ));
            self.completion
                .complete(&prompt, ModelTier::Fast)
                .await?
                .trim()
                .to_string()
        };

        Ok(StateUpdate::new()
            .final_answer(answer)
            .sql_query(state.sql_query.clone())
            .db_result(state.db_result.clone()))
    }
}
