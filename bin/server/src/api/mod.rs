//! HTTP surface of the resume-review workflow.
//!
//! | route | purpose |
//! |---|---|
//! | `POST /api/resume-review` | start a review, stream its progress |
//! | `POST /api/workflows` | start a named workflow, stream its progress |
//! | `POST /api/approval` | answer a pending approval |
//! | `GET /api/approvals/pending` | list approvals waiting for a reviewer |
//! | `POST /api/runs/{run_id}/resume` | restart an unfinished run, stream its progress |
//!
//! Streaming responses are `text/event-stream` bodies of line-delimited JSON
//! progress events. The run id is returned in the `x-run-id` header.

pub mod routes;

use axum::{
    Router,
    routing::{get, post},
};
use resume_review_workflow::WorkflowEngine;
use tower_http::trace::TraceLayer;

pub use routes::{pending_approvals, resolve_approval, resume_run, start_review, start_workflow};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Starts, resumes and answers runs.
    pub engine: WorkflowEngine,
}

impl AppState {
    /// Creates a new application state.
    pub fn new(engine: WorkflowEngine) -> Self {
        Self { engine }
    }
}

/// Builds the API router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/resume-review", post(start_review))
        .route("/api/workflows", post(start_workflow))
        .route("/api/approval", post(resolve_approval))
        .route("/api/approvals/pending", get(pending_approvals))
        .route("/api/runs/{run_id}/resume", post(resume_run))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
