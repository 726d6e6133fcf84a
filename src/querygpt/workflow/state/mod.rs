// SPDX-License-Identifier: MIT

//! State management for the query graph
//!
//! This module provides:
//! - `StateField` - the closed set of record fields and their merge policy
//! - `QueryState` - the record threaded through every stage
//! - `StateUpdate` - the partial update a stage hands back to the driver

mod schema;
mod store;

pub use schema::{ReducerType, StateField};
pub use store::{QueryState, StateUpdate};
