// SPDX-License-Identifier: MIT

//! The text-to-SQL pipeline
//!
//! Wires the seven stages into a [`CompiledGraph`]:
//! router -> rag_retrieval -> table_pruner -> column_pruner -> query_gen ->
//! query_exec -> (success | error) -> final_synth.

use std::sync::Arc;

use super::graph::{CompiledGraph, StateGraph, StepRecord, END, START};
use super::stages::{
    self, is_error_result, ColumnPruneStage, ExecuteStage, QueryGenStage, RetrievalStage,
    RouterStage, SynthesizeStage, TablePruneStage,
};
use super::state::QueryState;
use crate::adk::error::GraphError;
use crate::adk::model::CompletionService;
use crate::querygpt::knowledge::KnowledgeLookup;
use crate::querygpt::sql::SqlExecutor;

/// Branch label after a clean execution
pub const BRANCH_SUCCESS: &str = "success";

/// Branch label after a tagged execution failure
pub const BRANCH_ERROR: &str = "error";

/// Characters of SQL shown in a step summary
const SQL_PREVIEW_CHARS: usize = 50;

/// External collaborators of the pipeline
#[derive(Clone)]
pub struct PipelineDeps {
    pub completion: Arc<dyn CompletionService>,
    pub knowledge: Arc<dyn KnowledgeLookup>,
    pub executor: Arc<dyn SqlExecutor>,
}

impl PipelineDeps {
    pub fn new(
        completion: Arc<dyn CompletionService>,
        knowledge: Arc<dyn KnowledgeLookup>,
        executor: Arc<dyn SqlExecutor>,
    ) -> Self {
        Self {
            completion,
            knowledge,
            executor,
        }
    }
}

/// Branch predicate for the edge leaving `query_exec`
pub fn check_for_error(state: &QueryState) -> &'static str {
    if is_error_result(&state.db_result) {
        BRANCH_ERROR
    } else {
        BRANCH_SUCCESS
    }
}

/// Declare and compile the query graph
pub fn build_query_graph(deps: PipelineDeps) -> Result<CompiledGraph, GraphError> {
    let mut graph = StateGraph::new();
    graph
        .add_node(stages::ROUTER, Arc::new(RouterStage::new(deps.completion.clone())))
        .add_node(stages::RETRIEVAL, Arc::new(RetrievalStage::new(deps.knowledge)))
        .add_node(
            stages::TABLE_PRUNER,
            Arc::new(TablePruneStage::new(deps.completion.clone())),
        )
        .add_node(stages::COLUMN_PRUNER, Arc::new(ColumnPruneStage::new()))
        .add_node(
            stages::QUERY_GEN,
            Arc::new(QueryGenStage::new(deps.completion.clone())),
        )
        .add_node(stages::QUERY_EXEC, Arc::new(ExecuteStage::new(deps.executor)))
        .add_node(
            stages::FINAL_SYNTH,
            Arc::new(SynthesizeStage::new(deps.completion)),
        );

    graph
        .add_edge(START, stages::ROUTER)
        .add_edge(stages::ROUTER, stages::RETRIEVAL)
        .add_edge(stages::RETRIEVAL, stages::TABLE_PRUNER)
        .add_edge(stages::TABLE_PRUNER, stages::COLUMN_PRUNER)
        .add_edge(stages::COLUMN_PRUNER, stages::QUERY_GEN)
        .add_edge(stages::QUERY_GEN, stages::QUERY_EXEC)
        .add_conditional_edges(
            stages::QUERY_EXEC,
            check_for_error,
            [
                (BRANCH_SUCCESS, stages::FINAL_SYNTH),
                (BRANCH_ERROR, stages::FINAL_SYNTH),
            ],
        )
        .add_edge(stages::FINAL_SYNTH, END);

    graph.compile()
}

/// One-line description of what a step produced
pub fn step_summary(step: &StepRecord) -> String {
    let state = &step.state;
    match step.node.as_str() {
        stages::ROUTER => format!("Intent Classified: {}", state.workspace_name),
        stages::RETRIEVAL => format!(
            "Retrieved {} characters of schema/rules",
            state.context_schema.chars().count()
        ),
        stages::TABLE_PRUNER => format!("Tables Selected: {}", state.relevant_tables.join(", ")),
        stages::COLUMN_PRUNER => format!(
            "Final prompt context is {} characters",
            state.pruned_schema.chars().count()
        ),
        stages::QUERY_GEN => {
            let preview: String = state.sql_query.chars().take(SQL_PREVIEW_CHARS).collect();
            if state.sql_query.chars().count() > SQL_PREVIEW_CHARS {
                format!("SQL Generated: {}...", preview)
            } else {
                format!("SQL Generated: {}", preview)
            }
        }
        stages::QUERY_EXEC => {
            if is_error_result(&state.db_result) {
                "Execution Error".to_string()
            } else {
                "Execution Success".to_string()
            }
        }
        stages::FINAL_SYNTH => "Answer Synthesized".to_string(),
        other => format!("Completed {}", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::querygpt::knowledge::StaticKnowledgeBase;
    use crate::querygpt::sql::SqliteExecutor;
    use crate::querygpt::workflow::stages::testing::ScriptedCompletion;
    use crate::querygpt::workflow::state::StateUpdate;
    use chrono::Utc;

    fn record(node: &str, state: QueryState) -> StepRecord {
        StepRecord {
            node: node.to_string(),
            state,
            completed_at: Utc::now(),
        }
    }

    #[test]
    fn test_check_for_error_labels() {
        let ok = QueryState::new("q").apply(StateUpdate::new().db_result("| n |"));
        let failed =
            QueryState::new("q").apply(StateUpdate::new().db_result("SQL ERROR: no such table"));
        assert_eq!(check_for_error(&ok), BRANCH_SUCCESS);
        assert_eq!(check_for_error(&failed), BRANCH_ERROR);
        assert_eq!(check_for_error(&QueryState::new("q")), BRANCH_SUCCESS);
    }

    #[test]
    fn test_graph_compiles_with_all_stages() {
        let deps = PipelineDeps::new(
            Arc::new(ScriptedCompletion::replying("Mobility")),
            Arc::new(StaticKnowledgeBase::default()),
            Arc::new(SqliteExecutor::new("unused.db")),
        );
        let graph = build_query_graph(deps).unwrap();
        let mut names: Vec<_> = graph.node_names().collect();
        names.sort_unstable();
        assert_eq!(
            names,
            vec![
                "column_pruner",
                "final_synth",
                "query_exec",
                "query_gen",
                "rag_retrieval",
                "router",
                "table_pruner"
            ]
        );
    }

    #[test]
    fn test_step_summaries() {
        let state = QueryState::new("q").apply(
            StateUpdate::new()
                .workspace_name("Mobility")
                .context_schema("WORKSPACE: Mobility\n")
                .relevant_tables(vec!["trips".into(), "drivers".into()])
                .pruned_schema("abc")
                .sql_query("SELECT 1;")
                .db_result("SQL ERROR: boom"),
        );

        let cases = [
            ("router", "Intent Classified: Mobility"),
            ("rag_retrieval", "Retrieved 20 characters of schema/rules"),
            ("table_pruner", "Tables Selected: trips, drivers"),
            ("column_pruner", "Final prompt context is 3 characters"),
            ("query_gen", "SQL Generated: SELECT 1;"),
            ("query_exec", "Execution Error"),
            ("final_synth", "Answer Synthesized"),
        ];
        for (node, expected) in cases {
            assert_eq!(step_summary(&record(node, state.clone())), expected);
        }
    }

    #[test]
    fn test_sql_preview_is_truncated() {
        let sql = format!("SELECT {} FROM trips;", "x".repeat(80));
        let state = QueryState::new("q").apply(StateUpdate::new().sql_query(sql.clone()));
        let summary = step_summary(&record("query_gen", state));
        assert_eq!(summary, format!("SQL Generated: {}...", &sql[..50]));
    }
}
