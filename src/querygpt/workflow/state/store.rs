// SPDX-License-Identifier: MIT

//! Runtime state record and partial updates

use serde::{Deserialize, Serialize};

use super::schema::{ReducerType, StateField};

/// The record threaded through the query graph.
///
/// Owned by the graph driver. Stages only borrow it for the length of one
/// call and answer with a [`StateUpdate`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryState {
    pub user_question: String,
    pub workspace_name: String,
    pub relevant_tables: Vec<String>,
    pub context_schema: String,
    pub pruned_schema: String,
    pub sql_query: String,
    pub db_result: String,
    pub final_answer: String,
}

/// Partial update returned by a stage; `None` leaves a field untouched
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StateUpdate {
    pub user_question: Option<String>,
    pub workspace_name: Option<String>,
    pub relevant_tables: Option<Vec<String>>,
    pub context_schema: Option<String>,
    pub pruned_schema: Option<String>,
    pub sql_query: Option<String>,
    pub db_result: Option<String>,
    pub final_answer: Option<String>,
}

/// Values that can be merged under a reducer
trait Reduce {
    fn reduce(&mut self, value: Self, reducer: ReducerType);
}

impl Reduce for String {
    fn reduce(&mut self, value: Self, reducer: ReducerType) {
        match reducer {
            ReducerType::Overwrite => *self = value,
            ReducerType::Append => self.push_str(&value),
        }
    }
}

impl Reduce for Vec<String> {
    fn reduce(&mut self, value: Self, reducer: ReducerType) {
        match reducer {
            ReducerType::Overwrite => *self = value,
            ReducerType::Append => self.extend(value),
        }
    }
}

fn merge<T: Reduce>(slot: &mut T, value: Option<T>, field: StateField) {
    if let Some(value) = value {
        slot.reduce(value, field.reducer());
    }
}

impl QueryState {
    /// Fresh record for one question, every other field empty
    pub fn new(user_question: impl Into<String>) -> Self {
        Self {
            user_question: user_question.into(),
            ..Self::default()
        }
    }

    /// Merge an update into the record, consuming both
    pub fn apply(mut self, update: StateUpdate) -> Self {
        merge(&mut self.user_question, update.user_question, StateField::UserQuestion);
        merge(&mut self.workspace_name, update.workspace_name, StateField::WorkspaceName);
        merge(&mut self.relevant_tables, update.relevant_tables, StateField::RelevantTables);
        merge(&mut self.context_schema, update.context_schema, StateField::ContextSchema);
        merge(&mut self.pruned_schema, update.pruned_schema, StateField::PrunedSchema);
        merge(&mut self.sql_query, update.sql_query, StateField::SqlQuery);
        merge(&mut self.db_result, update.db_result, StateField::DbResult);
        merge(&mut self.final_answer, update.final_answer, StateField::FinalAnswer);
        self
    }

    /// Convert state to a JSON object
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

impl StateUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn workspace_name(mut self, value: impl Into<String>) -> Self {
        self.workspace_name = Some(value.into());
        self
    }

    pub fn relevant_tables(mut self, value: Vec<String>) -> Self {
        self.relevant_tables = Some(value);
        self
    }

    pub fn context_schema(mut self, value: impl Into<String>) -> Self {
        self.context_schema = Some(value.into());
        self
    }

    pub fn pruned_schema(mut self, value: impl Into<String>) -> Self {
        self.pruned_schema = Some(value.into());
        self
    }

    pub fn sql_query(mut self, value: impl Into<String>) -> Self {
        self.sql_query = Some(value.into());
        self
    }

    pub fn db_result(mut self, value: impl Into<String>) -> Self {
        self.db_result = Some(value.into());
        self
    }

    pub fn final_answer(mut self, value: impl Into<String>) -> Self {
        self.final_answer = Some(value.into());
        self
    }

    /// Fields this update writes, in schema order
    pub fn written_fields(&self) -> Vec<StateField> {
        StateField::ALL
            .into_iter()
            .filter(|field| match field {
                StateField::UserQuestion => self.user_question.is_some(),
                StateField::WorkspaceName => self.workspace_name.is_some(),
                StateField::RelevantTables => self.relevant_tables.is_some(),
                StateField::ContextSchema => self.context_schema.is_some(),
                StateField::PrunedSchema => self.pruned_schema.is_some(),
                StateField::SqlQuery => self.sql_query.is_some(),
                StateField::DbResult => self.db_result.is_some(),
                StateField::FinalAnswer => self.final_answer.is_some(),
            })
            .collect()
    }
}
