// SPDX-License-Identifier: MIT

//! Intent routing: question -> workspace

use async_trait::async_trait;
use std::sync::Arc;

use super::ROUTER;
use crate::adk::error::Result;
use crate::adk::model::{CompletionService, ModelTier, Prompt};
use crate::querygpt::workflow::graph::Stage;
use crate::querygpt::workflow::state::{QueryState, StateUpdate};

/// The closed set of workspaces the router may emit
pub const WORKSPACES: [&str; 2] = ["Mobility", "Core Services"];

/// Used when the completion is not one of [`WORKSPACES`]
pub const DEFAULT_WORKSPACE: &str = "Mobility";

/// Strip whitespace and quotes, then map anything unknown to the default
pub fn normalize_workspace(raw: &str) -> String {
    let cleaned = raw.trim().replace(['\'', '"'], "");
    let cleaned = cleaned.trim();
    if WORKSPACES.contains(&cleaned) {
        cleaned.to_string()
    } else {
        log::warn!(
            "Router returned unknown workspace '{}', falling back to {}",
            cleaned,
            DEFAULT_WORKSPACE
        );
        DEFAULT_WORKSPACE.to_string()
    }
}

fn routing_prompt(question: &str) -> String {
    format!(
        "You are an Intent Agent. Classify the user question into one of the following workspaces:\n\
         - 'Mobility': Questions about trips, drivers, fares, and cities.\n\
         - 'Core Services': Questions about driver licensing, HR, and long-term retention.\n\n\
         Your output MUST be the name of the workspace and nothing else. No punctuation, no explanation.\n\
         Question: {}\n\
         Workspace:",
        question
    )
}

/// Classifies the question into a workspace using the fast model
pub struct RouterStage {
    completion: Arc<dyn CompletionService>,
}

impl RouterStage {
    pub fn new(completion: Arc<dyn CompletionService>) -> Self {
        Self { completion }
    }
}

#[async_trait]
impl Stage for RouterStage {
    fn name(&self) -> &str {
        ROUTER
    }

    async fn run(&self, state: &QueryState) -> Result<StateUpdate> {
        log::info!("Routing question: {}", state.user_question);
        let prompt = Prompt::text(routing_prompt(&state.user_question));
        let raw = self.completion.complete(&prompt, ModelTier::Fast).await?;

        let workspace = normalize_workspace(&raw);
        log::info!("Routed to workspace: {}", workspace);
        Ok(StateUpdate::new().workspace_name(workspace))
    }
}
