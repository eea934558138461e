//! Human approval.

use crate::error::StepError;
use crate::model::ApprovalResult;
use crate::progress::{ApprovalRequest, Progress, ProgressEmitter, ProgressEvent};
use crate::step::Step;
use crate::waitpoint::{WaitpointRegistry, WebhookToken};
use std::time::Duration;
use tracing::info;

/// Reason recorded when approval is granted without a reviewer.
pub const MOCK_APPROVAL_REASON: &str = "mock_auto_approve";

/// The decision used when reviews are approved automatically.
#[must_use]
pub fn auto_approve() -> ApprovalResult {
    ApprovalResult::approve(Some(MOCK_APPROVAL_REASON.to_string()))
}

/// Publishes an approval request and suspends until a reviewer decides.
///
/// The waitpoint is registered before the request is published, so a
/// reviewer reacting to the `waiting` event always finds it.
///
/// # Errors
///
/// Returns a timeout error if nobody decides within `timeout`, or an
/// internal error if the token is already waiting.
pub async fn request_approval(
    waitpoints: &WaitpointRegistry<ApprovalResult>,
    emitter: &ProgressEmitter,
    request: ApprovalRequest,
    timeout: Option<Duration>,
) -> Result<ApprovalResult, StepError> {
    let token = WebhookToken::new(request.webhook_token.clone());
    let waitpoint = waitpoints.create(token.clone(), request.candidate_id.clone())?;

    info!(%token, candidate_id = %request.candidate_id, "waiting for approval");
    emitter
        .emit(ProgressEvent::new(
            Step::HumanApproval,
            Progress::Waiting(request),
        ))
        .await;

    let decision = waitpoint.wait(timeout).await?;
    info!(%token, approved = decision.approved, "approval received");
    Ok(decision)
}
