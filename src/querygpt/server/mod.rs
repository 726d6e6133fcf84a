// SPDX-License-Identifier: MIT

//! HTTP presentation API
//!
//! - `GET /api/health`
//! - `POST /api/query` runs the pipeline and returns the final record plus
//!   the step trace
//! - `POST /api/query/stream` streams each step as a server-sent event

use axum::{
    extract::State,
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use futures::stream::Stream;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use uuid::Uuid;

use crate::adk::error::Result;
use crate::querygpt::workflow::graph::{CompiledGraph, GraphEvent, StepRecord};
use crate::querygpt::workflow::state::QueryState;
use crate::querygpt::workflow::step_summary;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    graph: Arc<CompiledGraph>,
}

impl AppState {
    pub fn new(graph: CompiledGraph) -> Self {
        Self {
            graph: Arc::new(graph),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    pub question: String,
}

/// A step as shown to API clients
#[derive(Debug, Serialize)]
struct StepView<'a> {
    node: &'a str,
    summary: String,
    completed_at: chrono::DateTime<chrono::Utc>,
    state: &'a QueryState,
}

impl<'a> From<&'a StepRecord> for StepView<'a> {
    fn from(record: &'a StepRecord) -> Self {
        Self {
            node: &record.node,
            summary: step_summary(record),
            completed_at: record.completed_at,
            state: &record.state,
        }
    }
}

/// Routes with CORS and request tracing
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health_check))
        .route("/api/query", post(run_query))
        .route("/api/query/stream", post(stream_query))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn serve(port: u16, state: AppState) -> Result<()> {
    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    log::info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router(state)).await?;

    Ok(())
}

async fn health_check() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

fn bad_request(message: &str) -> Response {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": message }))).into_response()
}

async fn run_query(State(state): State<AppState>, Json(payload): Json<QueryRequest>) -> Response {
    let question = payload.question.trim();
    if question.is_empty() {
        return bad_request("question must not be empty");
    }

    let run_id = Uuid::new_v4();
    log::info!("Run {} started: {}", run_id, question);

    match state.graph.invoke(QueryState::new(question)).await {
        Ok(output) => {
            let steps: Vec<StepView> = output.steps.iter().map(StepView::from).collect();
            Json(json!({
                "run_id": run_id,
                "status": "completed",
                "question": output.state.user_question,
                "final_answer": output.state.final_answer,
                "sql_query": output.state.sql_query,
                "db_result": output.state.db_result,
                "steps": steps,
            }))
            .into_response()
        }
        Err(e) => {
            log::error!("Run {} failed: {}", run_id, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "run_id": run_id,
                    "status": "failed",
                    "error": e.to_string(),
                })),
            )
                .into_response()
        }
    }
}

/// JSON body of one server-sent event
fn event_payload(event: &GraphEvent) -> Value {
    match event {
        GraphEvent::Step(record) => {
            let mut value = serde_json::to_value(StepView::from(record)).unwrap_or_default();
            value["type"] = json!("step");
            value
        }
        other => serde_json::to_value(other).unwrap_or_default(),
    }
}

async fn stream_query(
    State(state): State<AppState>,
    Json(payload): Json<QueryRequest>,
) -> std::result::Result<Sse<impl Stream<Item = std::result::Result<Event, Infallible>>>, Response>
{
    let question = payload.question.trim().to_string();
    if question.is_empty() {
        return Err(bad_request("question must not be empty"));
    }

    let run_id = Uuid::new_v4().to_string();
    let (tx, rx) = mpsc::channel(100);

    let graph = Arc::clone(&state.graph);
    let task_run_id = run_id.clone();
    tokio::spawn(async move {
        log::info!("Streaming run {} started: {}", task_run_id, question);
        match graph.run_stream(QueryState::new(question), tx).await {
            Ok(_) => log::info!("Streaming run {} finished", task_run_id),
            Err(e) => log::error!("Streaming run {} failed: {}", task_run_id, e),
        }
    });

    let stream = ReceiverStream::new(rx).map(move |event| {
        let event = Event::default()
            .id(run_id.clone())
            .json_data(event_payload(&event))
            .unwrap_or_else(|e| Event::default().event("error").data(e.to_string()));
        Ok(event)
    });

    Ok(Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(1))))
}
