// SPDX-License-Identifier: MIT

pub mod graph;
pub mod pipeline;
pub mod stages;
pub mod state;

pub use pipeline::{build_query_graph, check_for_error, step_summary, PipelineDeps};
