//! Graph executor
//!
//! Runs one node at a time from START to END. After each node the stage's
//! update is merged into the owned record and a [`StepRecord`] carrying the
//! full post-update state is produced.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;

use super::types::{Edge, Stage, END, START};
use crate::adk::error::{GraphError, Result};
use crate::querygpt::workflow::state::QueryState;

/// Snapshot emitted after a node completes
#[derive(Debug, Clone, Serialize)]
pub struct StepRecord {
    pub node: String,
    pub state: QueryState,
    pub completed_at: DateTime<Utc>,
}

/// Events streamed by [`CompiledGraph::run_stream`]
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GraphEvent {
    Step(StepRecord),
    Done { state: QueryState },
    Error { message: String },
}

/// Result of a full run
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub state: QueryState,
    pub steps: Vec<StepRecord>,
}

/// Validated, runnable graph
pub struct CompiledGraph {
    nodes: HashMap<String, Arc<dyn Stage>>,
    edges: HashMap<String, Edge>,
    max_steps: usize,
}

impl CompiledGraph {
    pub(super) fn new(
        nodes: HashMap<String, Arc<dyn Stage>>,
        edges: HashMap<String, Edge>,
        max_steps: usize,
    ) -> Self {
        Self {
            nodes,
            edges,
            max_steps,
        }
    }

    /// Names of the declared nodes
    pub fn node_names(&self) -> impl Iterator<Item = &str> {
        self.nodes.keys().map(String::as_str)
    }

    /// Resolve the successor of `from` given the current record
    fn next_node(&self, from: &str, state: &QueryState) -> Result<String, GraphError> {
        let edge = self
            .edges
            .get(from)
            .ok_or_else(|| GraphError::DanglingNode(from.to_string()))?;

        match edge {
            Edge::Direct(to) => Ok(to.clone()),
            Edge::Conditional {
                predicate,
                branches,
            } => {
                let label = predicate(state);
                log::debug!("Node {} branched on '{}'", from, label);
                branches
                    .get(label)
                    .cloned()
                    .ok_or_else(|| GraphError::UnmappedBranch {
                        node: from.to_string(),
                        label: label.to_string(),
                    })
            }
        }
    }

    /// Start a step-wise run
    pub fn stream(&self, initial: QueryState) -> GraphRun<'_> {
        GraphRun {
            graph: self,
            state: initial,
            current: None,
            steps: 0,
            finished: false,
        }
    }

    /// Run to END, collecting every step
    pub async fn invoke(&self, initial: QueryState) -> Result<RunOutput> {
        let mut run = self.stream(initial);
        let mut steps = Vec::new();
        while let Some(step) = run.next_step().await {
            steps.push(step?);
        }
        Ok(RunOutput {
            state: run.into_state(),
            steps,
        })
    }

    /// Run to END, forwarding each step as an event
    pub async fn run_stream(
        &self,
        initial: QueryState,
        tx: mpsc::Sender<GraphEvent>,
    ) -> Result<QueryState> {
        let mut run = self.stream(initial);
        while let Some(step) = run.next_step().await {
            match step {
                Ok(record) => {
                    let _ = tx.send(GraphEvent::Step(record)).await;
                }
                Err(e) => {
                    let _ = tx
                        .send(GraphEvent::Error {
                            message: e.to_string(),
                        })
                        .await;
                    return Err(e);
                }
            }
        }

        let state = run.into_state();
        let _ = tx
            .send(GraphEvent::Done {
                state: state.clone(),
            })
            .await;
        Ok(state)
    }
}

/// In-progress run of a [`CompiledGraph`]
pub struct GraphRun<'g> {
    graph: &'g CompiledGraph,
    state: QueryState,
    /// Next node to execute; `None` before the entry edge is resolved
    current: Option<String>,
    steps: usize,
    finished: bool,
}

impl GraphRun<'_> {
    /// Execute the next node. `None` once END is reached or after an error.
    pub async fn next_step(&mut self) -> Option<Result<StepRecord>> {
        if self.finished {
            return None;
        }

        let result = self.advance().await;
        match result {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => {
                self.finished = true;
                None
            }
            Err(e) => {
                self.finished = true;
                Some(Err(e))
            }
        }
    }

    async fn advance(&mut self) -> Result<Option<StepRecord>> {
        let graph = self.graph;
        let node_id = match self.current.take() {
            Some(id) => id,
            None => graph.next_node(START, &self.state)?,
        };
        if node_id == END {
            log::info!("Graph reached END after {} steps", self.steps);
            return Ok(None);
        }

        self.steps += 1;
        if self.steps > graph.max_steps {
            log::error!("Graph execution exceeded {} steps", graph.max_steps);
            return Err(GraphError::StepLimitExceeded(graph.max_steps).into());
        }

        let stage = graph
            .nodes
            .get(&node_id)
            .ok_or_else(|| GraphError::UnknownNode(node_id.clone()))?;

        log::info!("Executing node: {}", node_id);
        let update = stage.run(&self.state).await.map_err(|e| {
            log::error!("Node {} failed: {}", node_id, e);
            e
        })?;
        log::debug!("Node {} wrote {:?}", node_id, update.written_fields());

        self.state = std::mem::take(&mut self.state).apply(update);
        self.current = Some(graph.next_node(&node_id, &self.state)?);

        Ok(Some(StepRecord {
            node: node_id,
            state: self.state.clone(),
            completed_at: Utc::now(),
        }))
    }

    /// Current record
    pub fn state(&self) -> &QueryState {
        &self.state
    }

    /// Consume the run, returning the record
    pub fn into_state(self) -> QueryState {
        self.state
    }
}

#[cfg(test)]
mod tests {
    use super::super::builder::StateGraph;
    use super::*;
    use crate::adk::error::{ModelError, QueryGptError};
    use crate::querygpt::workflow::state::StateUpdate;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Appends its name to `context_schema` and counts invocations
    struct TraceStage {
        name: String,
        calls: AtomicUsize,
    }

    impl TraceStage {
        fn new(name: &str) -> Arc<Self> {
            Arc::new(Self {
                name: name.to_string(),
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl Stage for TraceStage {
        fn name(&self) -> &str {
            &self.name
        }

        async fn run(&self, _state: &QueryState) -> Result<StateUpdate> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(StateUpdate::new()
                .context_schema(format!("{};", self.name))
                .sql_query(self.name.clone()))
        }
    }

    struct FailingStage;

    #[async_trait]
    impl Stage for FailingStage {
        fn name(&self) -> &str {
            "boom"
        }

        async fn run(&self, _state: &QueryState) -> Result<StateUpdate> {
            Err(ModelError::InvalidResponse("upstream unreachable".into()).into())
        }
    }

    fn by_sql(state: &QueryState) -> &'static str {
        if state.sql_query == "a" {
            "left"
        } else {
            "right"
        }
    }

    fn linear() -> CompiledGraph {
        let mut graph = StateGraph::new();
        graph
            .add_node("a", TraceStage::new("a"))
            .add_node("b", TraceStage::new("b"))
            .add_edge(START, "a")
            .add_edge("a", "b")
            .add_edge("b", END);
        graph.compile().unwrap()
    }

    #[tokio::test]
    async fn test_steps_in_order_with_full_state() {
        let graph = linear();
        let mut run = graph.stream(QueryState::new("q"));

        let first = run.next_step().await.unwrap().unwrap();
        assert_eq!(first.node, "a");
        assert_eq!(first.state.context_schema, "a;");

        let second = run.next_step().await.unwrap().unwrap();
        assert_eq!(second.node, "b");
        assert_eq!(second.state.context_schema, "a;b;");
        assert_eq!(second.state.sql_query, "b");
        assert_eq!(second.state.user_question, "q");

        assert!(run.next_step().await.is_none());
        assert!(run.next_step().await.is_none());
    }

    #[tokio::test]
    async fn test_invoke_collects_trace() {
        let output = linear().invoke(QueryState::new("q")).await.unwrap();
        let nodes: Vec<_> = output.steps.iter().map(|s| s.node.as_str()).collect();
        assert_eq!(nodes, vec!["a", "b"]);
        assert_eq!(output.state, output.steps[1].state);
    }

    #[tokio::test]
    async fn test_conditional_dispatch() {
        let left = TraceStage::new("left");
        let right = TraceStage::new("right");
        let mut graph = StateGraph::new();
        graph
            .add_node("a", TraceStage::new("a"))
            .add_node("left", left.clone())
            .add_node("right", right.clone())
            .add_edge(START, "a")
            .add_conditional_edges("a", by_sql, [("left", "left"), ("right", "right")])
            .add_edge("left", END)
            .add_edge("right", END);
        let graph = graph.compile().unwrap();

        let output = graph.invoke(QueryState::new("q")).await.unwrap();
        let nodes: Vec<_> = output.steps.iter().map(|s| s.node.as_str()).collect();
        assert_eq!(nodes, vec!["a", "left"]);
        assert_eq!(left.calls.load(Ordering::SeqCst), 1);
        assert_eq!(right.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_unmapped_branch_label() {
        let mut graph = StateGraph::new();
        graph
            .add_node("a", TraceStage::new("a"))
            .add_edge(START, "a")
            .add_conditional_edges("a", by_sql, [("right", END)]);
        let graph = graph.compile().unwrap();

        let err = graph.invoke(QueryState::new("q")).await.unwrap_err();
        assert!(matches!(
            err,
            QueryGptError::Graph(GraphError::UnmappedBranch { .. })
        ));
    }

    #[tokio::test]
    async fn test_stage_error_stops_run() {
        let after = TraceStage::new("after");
        let mut graph = StateGraph::new();
        graph
            .add_node("boom", Arc::new(FailingStage))
            .add_node("after", after.clone())
            .add_edge(START, "boom")
            .add_edge("boom", "after")
            .add_edge("after", END);
        let graph = graph.compile().unwrap();

        let mut run = graph.stream(QueryState::new("q"));
        assert!(run.next_step().await.unwrap().is_err());
        assert!(run.next_step().await.is_none());
        assert_eq!(after.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_step_limit_on_cycle() {
        let mut graph = StateGraph::new();
        graph
            .add_node("a", TraceStage::new("a"))
            .add_edge(START, "a")
            .add_conditional_edges("a", by_sql, [("left", "a"), ("right", END)])
            .max_steps(5);
        let graph = graph.compile().unwrap();

        let err = graph.invoke(QueryState::new("q")).await.unwrap_err();
        assert!(matches!(
            err,
            QueryGptError::Graph(GraphError::StepLimitExceeded(5))
        ));
    }

    #[tokio::test]
    async fn test_run_stream_events() {
        let (tx, mut rx) = mpsc::channel(16);
        let state = linear().run_stream(QueryState::new("q"), tx).await.unwrap();
        assert_eq!(state.context_schema, "a;b;");

        let mut kinds = Vec::new();
        while let Some(event) = rx.recv().await {
            kinds.push(match event {
                GraphEvent::Step(record) => record.node,
                GraphEvent::Done { .. } => "done".to_string(),
                GraphEvent::Error { .. } => "error".to_string(),
            });
        }
        assert_eq!(kinds, vec!["a", "b", "done"]);
    }
}
