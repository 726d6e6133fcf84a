//! Graph type definitions
//!
//! Nodes are [`Stage`]s addressed by name. Every node owns exactly one
//! outgoing [`Edge`]: either a fixed successor or a branch predicate plus a
//! label -> node dispatch table.

use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;

use crate::adk::error::Result;
use crate::querygpt::workflow::state::{QueryState, StateUpdate};

/// Entry pseudo-node
pub const START: &str = "__start__";
/// Exit pseudo-node
pub const END: &str = "__end__";

/// One node of the query graph
#[async_trait]
pub trait Stage: Send + Sync {
    /// Returns the stage name
    fn name(&self) -> &str;

    /// Compute this stage's update from the current record
    async fn run(&self, state: &QueryState) -> Result<StateUpdate>;
}

/// Chooses a branch label from the record
pub type BranchPredicate = fn(&QueryState) -> &'static str;

/// Outgoing edge of a node
#[derive(Clone)]
pub enum Edge {
    /// Always continue to the named node
    Direct(String),
    /// Evaluate the predicate and look its label up in `branches`
    Conditional {
        predicate: BranchPredicate,
        branches: HashMap<String, String>,
    },
}

impl Edge {
    /// Every node this edge can lead to
    pub fn targets(&self) -> Vec<&str> {
        match self {
            Edge::Direct(to) => vec![to.as_str()],
            Edge::Conditional { branches, .. } => {
                let mut targets: Vec<&str> = branches.values().map(String::as_str).collect();
                targets.sort_unstable();
                targets.dedup();
                targets
            }
        }
    }
}

impl fmt::Debug for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Edge::Direct(to) => f.debug_tuple("Direct").field(to).finish(),
            Edge::Conditional { branches, .. } => f
                .debug_struct("Conditional")
                .field("branches", branches)
                .finish_non_exhaustive(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn always_ok(_: &QueryState) -> &'static str {
        "success"
    }

    #[test]
    fn test_direct_targets() {
        let edge = Edge::Direct("query_gen".to_string());
        assert_eq!(edge.targets(), vec!["query_gen"]);
    }

    #[test]
    fn test_conditional_targets_dedup() {
        let edge = Edge::Conditional {
            predicate: always_ok,
            branches: HashMap::from([
                ("success".to_string(), "final_synth".to_string()),
                ("error".to_string(), "final_synth".to_string()),
            ]),
        };
        assert_eq!(edge.targets(), vec!["final_synth"]);
    }
}
