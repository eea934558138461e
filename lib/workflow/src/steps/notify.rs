//! Completion notification.

use resume_review_core::CandidateId;
use resume_review_integration::{Notification, Notifier};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Result of a notification attempt. Failure does not fail the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum NotifyOutcome {
    Delivered,
    Failed { message: String },
}

/// Tells the team a review finished.
pub async fn notify(
    notifier: &dyn Notifier,
    candidate_id: &CandidateId,
    approved: bool,
) -> NotifyOutcome {
    let notification = Notification {
        candidate_id: candidate_id.to_string(),
        approved,
    };
    match notifier.notify(&notification).await {
        Ok(()) => NotifyOutcome::Delivered,
        Err(e) => {
            warn!(%candidate_id, error = %e, "notification failed");
            NotifyOutcome::Failed {
                message: e.to_string(),
            }
        }
    }
}
