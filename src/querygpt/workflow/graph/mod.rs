// SPDX-License-Identifier: MIT

//! Graph-based stage execution
//!
//! [`StateGraph`] declares nodes and edges, [`StateGraph::compile`] validates
//! them, and [`CompiledGraph`] drives a run one node at a time.

pub mod builder;
pub mod executor;
pub mod types;

pub use builder::{StateGraph, DEFAULT_MAX_STEPS};
pub use executor::{CompiledGraph, GraphEvent, GraphRun, RunOutput, StepRecord};
pub use types::{BranchPredicate, Edge, Stage, END, START};
