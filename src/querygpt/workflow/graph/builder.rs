// SPDX-License-Identifier: MIT

//! Graph builder - declare nodes and edges, then compile
//!
//! Declarations are recorded as-is; all validation happens in
//! [`StateGraph::compile`], which either returns a runnable
//! [`CompiledGraph`] or the first structural problem found.

use indexmap::IndexMap;
use std::collections::HashMap;
use std::sync::Arc;

use super::executor::CompiledGraph;
use super::types::{BranchPredicate, Edge, Stage, END, START};
use crate::adk::error::GraphError;

/// Default bound on node executions per run
pub const DEFAULT_MAX_STEPS: usize = 100;

/// Mutable graph declaration
#[derive(Default)]
pub struct StateGraph {
    nodes: IndexMap<String, Arc<dyn Stage>>,
    duplicates: Vec<String>,
    edges: Vec<(String, Edge)>,
    max_steps: Option<usize>,
}

impl StateGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a node. `name` must equal `stage.name()`
    pub fn add_node(&mut self, name: impl Into<String>, stage: Arc<dyn Stage>) -> &mut Self {
        let name = name.into();
        if self.nodes.contains_key(&name) {
            self.duplicates.push(name);
        } else {
            self.nodes.insert(name, stage);
        }
        self
    }

    /// Unconditional edge
    pub fn add_edge(&mut self, from: impl Into<String>, to: impl Into<String>) -> &mut Self {
        self.edges.push((from.into(), Edge::Direct(to.into())));
        self
    }

    /// Branching edge: `predicate` yields a label, `branches` maps it to a node
    pub fn add_conditional_edges<I, L, T>(
        &mut self,
        from: impl Into<String>,
        predicate: BranchPredicate,
        branches: I,
    ) -> &mut Self
    where
        I: IntoIterator<Item = (L, T)>,
        L: Into<String>,
        T: Into<String>,
    {
        let branches = branches
            .into_iter()
            .map(|(label, to)| (label.into(), to.into()))
            .collect();
        self.edges
            .push((from.into(), Edge::Conditional { predicate, branches }));
        self
    }

    /// Override the step bound
    pub fn max_steps(&mut self, limit: usize) -> &mut Self {
        self.max_steps = Some(limit);
        self
    }

    /// Validate the declaration and produce a runnable graph
    pub fn compile(self) -> Result<CompiledGraph, GraphError> {
        for name in self.nodes.keys() {
            if name == START || name == END {
                return Err(GraphError::ReservedName(name.clone()));
            }
        }
        if let Some(name) = self.duplicates.into_iter().next() {
            return Err(GraphError::DuplicateNode(name));
        }
        if let Some((node, stage)) = self.nodes.iter().find(|(n, s)| s.name() != n.as_str()) {
            return Err(GraphError::NameMismatch {
                node: node.clone(),
                stage: stage.name().to_string(),
            });
        }

        let mut outgoing: HashMap<String, Edge> = HashMap::new();
        let mut entries = 0;
        let mut reaches_end = false;

        for (from, edge) in self.edges {
            if from == START {
                entries += 1;
            } else if !self.nodes.contains_key(&from) {
                return Err(GraphError::UnknownNode(from));
            }

            for target in edge.targets() {
                if target == END {
                    reaches_end = true;
                } else if target == START || !self.nodes.contains_key(target) {
                    return Err(GraphError::UnknownNode(target.to_string()));
                }
            }

            if from != START && outgoing.contains_key(&from) {
                return Err(GraphError::ConflictingEdges(from));
            }
            outgoing.insert(from, edge);
        }

        match entries {
            0 => return Err(GraphError::MissingEntry),
            1 => {}
            n => return Err(GraphError::MultipleEntries(n)),
        }
        if !reaches_end {
            return Err(GraphError::UnreachableEnd);
        }
        if let Some(name) = self.nodes.keys().find(|n| !outgoing.contains_key(*n)) {
            return Err(GraphError::DanglingNode(name.clone()));
        }

        log::debug!(
            "Compiled graph with {} nodes: {:?}",
            self.nodes.len(),
            self.nodes.keys().collect::<Vec<_>>()
        );

        Ok(CompiledGraph::new(
            self.nodes.into_iter().collect(),
            outgoing,
            self.max_steps.unwrap_or(DEFAULT_MAX_STEPS),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adk::error::Result;
    use crate::querygpt::workflow::state::{QueryState, StateUpdate};
    use async_trait::async_trait;

    struct NoopStage(String);

    #[async_trait]
    impl Stage for NoopStage {
        fn name(&self) -> &str {
            &self.0
        }

        async fn run(&self, _state: &QueryState) -> Result<StateUpdate> {
            Ok(StateUpdate::new())
        }
    }

    fn noop(name: &str) -> Arc<dyn Stage> {
        Arc::new(NoopStage(name.to_string()))
    }

    fn label(_: &QueryState) -> &'static str {
        "success"
    }

    #[test]
    fn test_compile_linear_graph() {
        let mut graph = StateGraph::new();
        graph
            .add_node("a", noop("a"))
            .add_node("b", noop("b"))
            .add_edge(START, "a")
            .add_edge("a", "b")
            .add_edge("b", END);
        assert!(graph.compile().is_ok());
    }

    #[test]
    fn test_unknown_edge_target() {
        let mut graph = StateGraph::new();
        graph
            .add_node("a", noop("a"))
            .add_edge(START, "a")
            .add_edge("a", "missing");
        assert_eq!(
            graph.compile().err(),
            Some(GraphError::UnknownNode("missing".into()))
        );
    }

    #[test]
    fn test_unknown_edge_source() {
        let mut graph = StateGraph::new();
        graph
            .add_node("a", noop("a"))
            .add_edge(START, "a")
            .add_edge("a", END)
            .add_edge("ghost", END);
        assert_eq!(
            graph.compile().err(),
            Some(GraphError::UnknownNode("ghost".into()))
        );
    }

    #[test]
    fn test_unknown_branch_target() {
        let mut graph = StateGraph::new();
        graph
            .add_node("a", noop("a"))
            .add_edge(START, "a")
            .add_conditional_edges("a", label, [("success", END), ("error", "repair")]);
        assert_eq!(
            graph.compile().err(),
            Some(GraphError::UnknownNode("repair".into()))
        );
    }

    #[test]
    fn test_missing_entry() {
        let mut graph = StateGraph::new();
        graph.add_node("a", noop("a")).add_edge("a", END);
        assert_eq!(graph.compile().err(), Some(GraphError::MissingEntry));
    }

    #[test]
    fn test_multiple_entries() {
        let mut graph = StateGraph::new();
        graph
            .add_node("a", noop("a"))
            .add_node("b", noop("b"))
            .add_edge(START, "a")
            .add_edge(START, "b")
            .add_edge("a", END)
            .add_edge("b", END);
        assert_eq!(graph.compile().err(), Some(GraphError::MultipleEntries(2)));
    }

    #[test]
    fn test_unreachable_end() {
        let mut graph = StateGraph::new();
        graph
            .add_node("a", noop("a"))
            .add_node("b", noop("b"))
            .add_edge(START, "a")
            .add_edge("a", "b")
            .add_edge("b", "a");
        assert_eq!(graph.compile().err(), Some(GraphError::UnreachableEnd));
    }

    #[test]
    fn test_dangling_node() {
        let mut graph = StateGraph::new();
        graph
            .add_node("a", noop("a"))
            .add_node("orphan", noop("orphan"))
            .add_edge(START, "a")
            .add_edge("a", END);
        assert_eq!(
            graph.compile().err(),
            Some(GraphError::DanglingNode("orphan".into()))
        );
    }

    #[test]
    fn test_duplicate_node() {
        let mut graph = StateGraph::new();
        graph
            .add_node("a", noop("a"))
            .add_node("a", noop("a"))
            .add_edge(START, "a")
            .add_edge("a", END);
        assert_eq!(
            graph.compile().err(),
            Some(GraphError::DuplicateNode("a".into()))
        );
    }

    #[test]
    fn test_reserved_name() {
        let mut graph = StateGraph::new();
        graph.add_node(END, noop(END)).add_edge(START, END);
        assert_eq!(
            graph.compile().err(),
            Some(GraphError::ReservedName(END.into()))
        );
    }

    #[test]
    fn test_conflicting_edges() {
        let mut graph = StateGraph::new();
        graph
            .add_node("a", noop("a"))
            .add_node("b", noop("b"))
            .add_edge(START, "a")
            .add_edge("a", "b")
            .add_edge("a", END)
            .add_edge("b", END);
        assert_eq!(
            graph.compile().err(),
            Some(GraphError::ConflictingEdges("a".into()))
        );
    }

    #[test]
    fn test_stage_name_must_match_node() {
        let mut graph = StateGraph::new();
        graph
            .add_node("table_pruner", noop("column_pruner"))
            .add_edge(START, "table_pruner")
            .add_edge("table_pruner", END);
        assert_eq!(
            graph.compile().err(),
            Some(GraphError::NameMismatch {
                node: "table_pruner".into(),
                stage: "column_pruner".into(),
            })
        );
    }
}
