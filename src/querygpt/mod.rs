// SPDX-License-Identifier: MIT

pub mod config;
pub mod knowledge;
pub mod seed;
pub mod server;
pub mod sql;
pub mod workflow;

use std::sync::Arc;

use crate::adk::error::Result;
use config::PipelineConfig;
use knowledge::JsonKnowledgeBase;
use sql::SqliteExecutor;
use workflow::graph::CompiledGraph;
use workflow::{build_query_graph, PipelineDeps};

/// Wire the configured model, knowledge file and database into a graph
pub fn graph_from_config(config: &PipelineConfig) -> Result<CompiledGraph> {
    let completion = config.completion_service()?;
    let deps = PipelineDeps::new(
        completion,
        Arc::new(JsonKnowledgeBase::new(&config.knowledge_base_path)),
        Arc::new(SqliteExecutor::new(&config.database_path)),
    );
    Ok(build_query_graph(deps)?)
}
