// SPDX-License-Identifier: MIT

//! SQL execution
//!
//! Executor faults never leave this stage. They become `db_result` text
//! starting with [`ERROR_TAG`].

use async_trait::async_trait;
use std::sync::Arc;

use super::QUERY_EXEC;
use crate::adk::error::Result;
use crate::querygpt::sql::{is_read_query, SqlExecutor};
use crate::querygpt::workflow::graph::Stage;
use crate::querygpt::workflow::state::{QueryState, StateUpdate};

/// Prefix marking a failed execution
pub const ERROR_TAG: &str = "SQL ERROR";

/// Result text for statements that return no rows
pub const NON_SELECT_ACK: &str = "Query executed successfully (non-SELECT).";

/// True when `db_result` carries [`ERROR_TAG`]
pub fn is_error_result(db_result: &str) -> bool {
    db_result.starts_with(ERROR_TAG)
}

/// Run one statement and render the outcome as text
pub fn run_statement(executor: &dyn SqlExecutor, sql: &str) -> String {
    let outcome = if is_read_query(sql) {
        executor.query(sql).map(|table| table.to_markdown())
    } else {
        executor.execute(sql).map(|()| NON_SELECT_ACK.to_string())
    };

    outcome.unwrap_or_else(|e| {
        log::warn!("Query failed: {}", e);
        format!("{}: {}", ERROR_TAG, e)
    })
}

/// Executes `sql_query` against the database
pub struct ExecuteStage {
    executor: Arc<dyn SqlExecutor>,
}

impl ExecuteStage {
    pub fn new(executor: Arc<dyn SqlExecutor>) -> Self {
        Self { executor }
    }
}

#[async_trait]
impl Stage for ExecuteStage {
    fn name(&self) -> &str {
        QUERY_EXEC
    }

    async fn run(&self, state: &QueryState) -> Result<StateUpdate> {
        log::info!("Executing SQL: {}", state.sql_query);
        let executor = Arc::clone(&self.executor);
        let sql = state.sql_query.clone();

        let db_result = tokio::task::spawn_blocking(move || run_statement(executor.as_ref(), &sql))
            .await
            .unwrap_or_else(|e| format!("{}: {}", ERROR_TAG, e));

        if is_error_result(&db_result) {
            log::warn!("Execution failed");
        } else {
            log::info!("Execution succeeded");
        }
        Ok(StateUpdate::new().db_result(db_result))
    }
}
