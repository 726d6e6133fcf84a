// SPDX-License-Identifier: MIT

//! State schema definitions

use serde::{Deserialize, Serialize};

/// Reducer types for merging a stage's value into the record
#[derive(Debug, Clone, Copy, Deserialize, Serialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ReducerType {
    /// Replace the value (default)
    #[default]
    Overwrite,
    /// Concatenate text / extend lists
    Append,
}

/// Fields of the query record
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum StateField {
    UserQuestion,
    WorkspaceName,
    RelevantTables,
    ContextSchema,
    PrunedSchema,
    SqlQuery,
    DbResult,
    FinalAnswer,
}

impl StateField {
    pub const ALL: [StateField; 8] = [
        StateField::UserQuestion,
        StateField::WorkspaceName,
        StateField::RelevantTables,
        StateField::ContextSchema,
        StateField::PrunedSchema,
        StateField::SqlQuery,
        StateField::DbResult,
        StateField::FinalAnswer,
    ];

    pub fn name(self) -> &'static str {
        match self {
            StateField::UserQuestion => "user_question",
            StateField::WorkspaceName => "workspace_name",
            StateField::RelevantTables => "relevant_tables",
            StateField::ContextSchema => "context_schema",
            StateField::PrunedSchema => "pruned_schema",
            StateField::SqlQuery => "sql_query",
            StateField::DbResult => "db_result",
            StateField::FinalAnswer => "final_answer",
        }
    }

    /// Merge policy for this field.
    ///
    /// Only `context_schema` accumulates; a re-entered retrieval stage
    /// therefore extends the context instead of replacing it.
    pub fn reducer(self) -> ReducerType {
        match self {
            StateField::ContextSchema => ReducerType::Append,
            _ => ReducerType::Overwrite,
        }
    }
}
