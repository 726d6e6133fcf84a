// SPDX-License-Identifier: MIT

//! Column pruning: narrowed per-table schema text
//!
//! The narrowed views are a closed table of entries. Tables without an entry
//! contribute nothing.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use std::collections::HashMap;

use super::COLUMN_PRUNER;
use crate::adk::error::Result;
use crate::querygpt::workflow::graph::Stage;
use crate::querygpt::workflow::state::{QueryState, StateUpdate};

struct PrunedTable {
    schema: &'static str,
    rules: &'static str,
}

static PRUNED_TABLES: Lazy<HashMap<&'static str, PrunedTable>> = Lazy::new(|| {
    HashMap::from([
        (
            "trips",
            PrunedTable {
                schema: "trip_id (INT), driver_id (INT), city (VARCHAR), distance_miles (FLOAT), \
                         fare_usd (FLOAT), trip_status (VARCHAR), trip_date (DATE)",
                rules: "The column `trip_status` must be 'completed' to count a successful trip. \
                        Always filter by `trip_date` when a time frame is provided.",
            },
        ),
        (
            // annual_bonus_target and long_term_retention_score left out
            "drivers",
            PrunedTable {
                schema: "driver_id (INT), name (VARCHAR), license_status (VARCHAR), \
                         vehicle_make (VARCHAR), hire_date (DATE), current_rating (FLOAT)",
                rules: "To check for an active driver, filter on `license_status` = 'active'.",
            },
        ),
    ])
});

/// Workspace header plus one block per selected table with a narrowed view
pub fn build_pruned_schema(workspace: &str, tables: &[String]) -> String {
    let mut pruned = format!("WORKSPACE: {}\n", workspace);
    for table in tables {
        match PRUNED_TABLES.get(table.as_str()) {
            Some(view) => pruned.push_str(&format!(
                "\nTABLE: {}\nSCHEMA: {}\nRULES: {}",
                table, view.schema, view.rules
            )),
            None => log::debug!("No narrowed view for table '{}', skipping", table),
        }
    }
    pruned
}

/// Replaces full table text with the narrowed views
#[derive(Debug, Default)]
pub struct ColumnPruneStage;

impl ColumnPruneStage {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Stage for ColumnPruneStage {
    fn name(&self) -> &str {
        COLUMN_PRUNER
    }

    async fn run(&self, state: &QueryState) -> Result<StateUpdate> {
        let pruned = build_pruned_schema(&state.workspace_name, &state.relevant_tables);
        log::info!("Pruned schema is {} characters", pruned.chars().count());
        Ok(StateUpdate::new().pruned_schema(pruned))
    }
}
