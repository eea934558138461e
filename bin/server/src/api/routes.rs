//! Handlers for the resume-review API.

use super::AppState;
use crate::error::ApiError;
use axum::{
    Json,
    body::Body,
    extract::{Path, State, rejection::JsonRejection},
    http::{HeaderName, header},
    response::{IntoResponse, Response},
};
use futures::StreamExt;
use resume_review_core::{CandidateId, WorkflowRunId};
use resume_review_workflow::{
    ApprovalResult, CandidateInput, PendingWaitpoint, RunHandle, WebhookToken,
};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use tracing::info;

/// Response header carrying the id of the streamed run.
pub const RUN_ID_HEADER: HeaderName = HeaderName::from_static("x-run-id");

/// Workflow name accepted by `/api/workflows`.
pub const RESUME_REVIEW_WORKFLOW: &str = "resume-review";

/// Body of `POST /api/workflows`.
#[derive(Debug, Deserialize)]
pub struct StartWorkflowRequest {
    pub workflow: String,
    #[serde(default)]
    pub input: CandidateInput,
}

/// Body of `POST /api/approval`.
#[derive(Debug, Deserialize)]
pub struct ApprovalDecision {
    pub token: String,
    pub approved: bool,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct Acknowledgement {
    pub success: bool,
}

/// Starts a review and streams its progress.
pub async fn start_review(
    State(state): State<AppState>,
    body: Result<Json<CandidateInput>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(input) = body.map_err(|e| ApiError::bad_request(e.body_text()))?;
    start(&state, input).await
}

/// Starts the named workflow and streams its progress.
pub async fn start_workflow(
    State(state): State<AppState>,
    body: Result<Json<StartWorkflowRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = body.map_err(|e| ApiError::bad_request(e.body_text()))?;
    if request.workflow != RESUME_REVIEW_WORKFLOW {
        return Err(ApiError::UnknownWorkflow {
            workflow: request.workflow,
        });
    }
    start(&state, request.input).await
}

/// Records a reviewer's decision for a pending approval.
pub async fn resolve_approval(
    State(state): State<AppState>,
    body: Result<Json<ApprovalDecision>, JsonRejection>,
) -> Result<Json<Acknowledgement>, ApiError> {
    let Json(decision) = body.map_err(|e| ApiError::bad_request(e.body_text()))?;
    if decision.token.trim().is_empty() {
        return Err(ApiError::bad_request("token is required"));
    }

    let token = WebhookToken::new(decision.token);
    let approved = decision.approved;
    let result = if approved {
        ApprovalResult::approve(decision.reason)
    } else {
        ApprovalResult::reject(decision.reason)
    };
    state.engine.resolve_approval(&token, result)?;

    info!(%token, approved, "approval recorded");
    Ok(Json(Acknowledgement { success: true }))
}

/// Lists approvals waiting for a reviewer.
pub async fn pending_approvals(State(state): State<AppState>) -> Json<Vec<PendingWaitpoint>> {
    Json(state.engine.pending_approvals())
}

/// Restarts an unfinished run and streams its progress.
pub async fn resume_run(
    State(state): State<AppState>,
    Path(run_id): Path<String>,
) -> Result<Response, ApiError> {
    let run_id: WorkflowRunId = run_id
        .parse()
        .map_err(|e: resume_review_core::ParseIdError| ApiError::bad_request(e.to_string()))?;
    let handle = state.engine.resume(run_id).await?;
    Ok(stream(handle))
}

async fn start(state: &AppState, input: CandidateInput) -> Result<Response, ApiError> {
    CandidateId::new(input.candidate_label()).map_err(|e| ApiError::bad_request(e.to_string()))?;
    let handle = state.engine.start(input).await?;
    info!(run_id = %handle.run_id(), "streaming run progress");
    Ok(stream(handle))
}

fn stream(handle: RunHandle) -> Response {
    let run_id = handle.run_id().to_string();
    let body = Body::from_stream(handle.into_events().map(Ok::<_, Infallible>));
    (
        [
            (header::CONTENT_TYPE, "text/event-stream".to_string()),
            (header::CACHE_CONTROL, "no-cache".to_string()),
            (RUN_ID_HEADER, run_id),
        ],
        body,
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::router;
    use axum::Router;
    use axum::http::{Request, StatusCode};
    use resume_review_workflow::{
        Collaborators, EventStatus, InMemoryJournal, ProgressRecord, WorkflowConfig,
        WorkflowEngine,
    };
    use serde_json::{Value as JsonValue, json};
    use std::sync::Arc;
    use tower::ServiceExt;

    fn app(config: WorkflowConfig) -> (Router, WorkflowEngine) {
        let engine = WorkflowEngine::new(
            config,
            Collaborators::fixtures(),
            Arc::new(InMemoryJournal::new()),
        );
        (router(AppState::new(engine.clone())), engine)
    }

    fn post(uri: &str, body: JsonValue) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .expect("request")
    }

    async fn body_text(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        String::from_utf8(bytes.to_vec()).expect("utf-8 body")
    }

    async fn error_message(response: Response) -> String {
        let body: JsonValue = serde_json::from_str(&body_text(response).await).expect("json");
        body["error"].as_str().expect("error message").to_string()
    }

    fn labels(body: &str) -> Vec<String> {
        body.lines()
            .map(|line| ProgressRecord::parse(line).expect("progress line").label())
            .collect()
    }

    #[tokio::test]
    async fn review_streams_progress_until_completion() {
        let (app, _) = app(WorkflowConfig::default());
        let response = app
            .oneshot(post("/api/resume-review", json!({"candidateId": "c1"})))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/event-stream"
        );
        assert_eq!(response.headers()[header::CACHE_CONTROL], "no-cache");
        assert!(
            response.headers()[RUN_ID_HEADER]
                .to_str()
                .expect("header")
                .starts_with("run_")
        );

        let body = body_text(response).await;
        let labels = labels(&body);
        assert_eq!(labels.first().map(String::as_str), Some("workflow/started"));
        assert_eq!(labels.last().map(String::as_str), Some("workflow/completed"));
    }

    #[tokio::test]
    async fn missing_candidate_is_rejected_before_starting() {
        let (app, _) = app(WorkflowConfig::default());
        let response = app
            .oneshot(post("/api/resume-review", json!({"linkedInUrl": "https://x"})))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(error_message(response).await, "candidateId is required");
    }

    #[tokio::test]
    async fn malformed_body_is_a_bad_request() {
        let (app, _) = app(WorkflowConfig::default());
        let request = Request::builder()
            .method("POST")
            .uri("/api/resume-review")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .expect("request");

        let response = app.oneshot(request).await.expect("response");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn workflow_router_dispatches_by_name() {
        let (app, _) = app(WorkflowConfig::default());

        let unknown = app
            .clone()
            .oneshot(post(
                "/api/workflows",
                json!({"workflow": "schedule-planner", "input": {"candidateId": "c1"}}),
            ))
            .await
            .expect("response");
        assert_eq!(unknown.status(), StatusCode::BAD_REQUEST);
        assert_eq!(error_message(unknown).await, "Unknown workflow type");

        let known = app
            .oneshot(post(
                "/api/workflows",
                json!({"workflow": "resume-review", "input": {"candidateId": "c1"}}),
            ))
            .await
            .expect("response");
        assert_eq!(known.status(), StatusCode::OK);
        let body = body_text(known).await;
        assert_eq!(
            labels(&body).last().map(String::as_str),
            Some("workflow/completed")
        );
    }

    #[tokio::test]
    async fn approval_endpoint_resolves_pending_runs() {
        let (app, engine) = app(WorkflowConfig {
            mock_approval: false,
            ..WorkflowConfig::default()
        });

        let missing = app
            .clone()
            .oneshot(post(
                "/api/approval",
                json!({"token": "approval:nobody:run_x", "approved": true}),
            ))
            .await
            .expect("response");
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);

        let mut handle = engine.start(CandidateInput::new("c1")).await.expect("start");
        let token = loop {
            let line = handle.next_line().await.expect("run still streaming");
            let record = ProgressRecord::parse(&line).expect("progress line");
            if record.status == EventStatus::Waiting {
                break record.data.expect("data")["webhookToken"]
                    .as_str()
                    .expect("token")
                    .to_string();
            }
        };

        let pending = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/api/approvals/pending")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        let pending: JsonValue = serde_json::from_str(&body_text(pending).await).expect("json");
        assert_eq!(pending[0]["token"], token.as_str());
        assert_eq!(pending[0]["candidateId"], "c1");

        let decision = json!({"token": token, "approved": false, "reason": "not a fit"});
        let resolved = app
            .clone()
            .oneshot(post("/api/approval", decision.clone()))
            .await
            .expect("response");
        assert_eq!(resolved.status(), StatusCode::OK);
        assert_eq!(body_text(resolved).await, r#"{"success":true}"#);

        let again = app
            .oneshot(post("/api/approval", decision))
            .await
            .expect("response");
        assert_eq!(again.status(), StatusCode::CONFLICT);

        let (_, result) = handle.collect().await.expect("run");
        assert!(!result.approved);
        assert_eq!(result.reason.as_deref(), Some("not a fit"));
    }

    #[tokio::test]
    async fn resume_checks_the_run_id() {
        let (app, engine) = app(WorkflowConfig::default());

        let malformed = app
            .clone()
            .oneshot(post("/api/runs/not-a-run/resume", json!({})))
            .await
            .expect("response");
        assert_eq!(malformed.status(), StatusCode::BAD_REQUEST);

        let unknown = app
            .clone()
            .oneshot(post(
                &format!("/api/runs/{}/resume", WorkflowRunId::new()),
                json!({}),
            ))
            .await
            .expect("response");
        assert_eq!(unknown.status(), StatusCode::NOT_FOUND);

        let handle = engine.start(CandidateInput::new("c1")).await.expect("start");
        let run_id = handle.run_id();
        handle.wait().await.expect("run");
        let finished = app
            .oneshot(post(&format!("/api/runs/{run_id}/resume"), json!({})))
            .await
            .expect("response");
        assert_eq!(finished.status(), StatusCode::CONFLICT);
    }
}
