//! Suspension points that external callers resolve by token.
//!
//! A run creates a [`Waitpoint`] and awaits it; anyone holding the token can
//! deliver a payload through [`WaitpointRegistry::resolve`]. Each token is
//! resolved at most once. Settled tokens are kept as tombstones so late or
//! repeated resolutions get a precise error, and are pruned after a
//! retention window.

use chrono::{DateTime, Utc};
use resume_review_core::WorkflowRunId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::{debug, info, instrument};

/// Opaque token naming one waitpoint.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WebhookToken(String);

impl WebhookToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Token for a candidate's approval within one run.
    ///
    /// The run id keeps tokens unique when a candidate is reviewed more
    /// than once.
    pub fn for_approval(candidate_id: &str, run_id: WorkflowRunId) -> Self {
        Self(format!("approval:{candidate_id}:{run_id}"))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WebhookToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Errors from creating, resolving or awaiting a waitpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WaitpointError {
    /// No waitpoint was ever created for the token, or it was pruned.
    NotFound { token: String },
    /// The token was already resolved.
    AlreadyResolved { token: String },
    /// The wait deadline passed before anyone resolved the token.
    Expired { token: String },
    /// An open waitpoint already uses the token.
    DuplicateToken { token: String },
    /// The waiting run is gone.
    Abandoned { token: String },
}

impl fmt::Display for WaitpointError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound { token } => write!(f, "no pending approval for token {token}"),
            Self::AlreadyResolved { token } => write!(f, "token {token} was already resolved"),
            Self::Expired { token } => write!(f, "approval for token {token} expired"),
            Self::DuplicateToken { token } => {
                write!(f, "a waitpoint is already open for token {token}")
            }
            Self::Abandoned { token } => {
                write!(f, "the run waiting on token {token} is no longer running")
            }
        }
    }
}

impl std::error::Error for WaitpointError {}

/// Lifecycle of a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaitpointState {
    Open,
    Resolved,
    Expired,
}

/// An open waitpoint, as listed for reviewers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingWaitpoint {
    pub token: WebhookToken,
    pub candidate_id: String,
    pub created_at: DateTime<Utc>,
}

enum SlotState<P> {
    Open(oneshot::Sender<P>),
    Resolved { at: DateTime<Utc> },
    Expired { at: DateTime<Utc> },
}

struct Slot<P> {
    candidate_id: String,
    created_at: DateTime<Utc>,
    state: SlotState<P>,
}

/// Shared table of waitpoints, keyed by token.
///
/// Cloning yields another handle to the same table.
pub struct WaitpointRegistry<P> {
    slots: Arc<Mutex<HashMap<WebhookToken, Slot<P>>>>,
}

impl<P> Clone for WaitpointRegistry<P> {
    fn clone(&self) -> Self {
        Self {
            slots: Arc::clone(&self.slots),
        }
    }
}

impl<P> Default for WaitpointRegistry<P> {
    fn default() -> Self {
        Self {
            slots: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

impl<P: Send + 'static> WaitpointRegistry<P> {
    pub fn new() -> Self {
        Self::default()
    }

    fn slots(&self) -> MutexGuard<'_, HashMap<WebhookToken, Slot<P>>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Opens a waitpoint for `token`.
    ///
    /// A settled tombstone under the same token is replaced, which lets a
    /// resumed run wait again after its earlier wait expired.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateToken` if an open waitpoint already uses the token.
    pub fn create(
        &self,
        token: WebhookToken,
        candidate_id: impl Into<String>,
    ) -> Result<Waitpoint<P>, WaitpointError> {
        let mut slots = self.slots();
        let occupied = matches!(
            slots.get(&token),
            Some(Slot { state: SlotState::Open(tx), .. }) if !tx.is_closed()
        );
        if occupied {
            return Err(WaitpointError::DuplicateToken {
                token: token.to_string(),
            });
        }

        let (tx, rx) = oneshot::channel();
        slots.insert(
            token.clone(),
            Slot {
                candidate_id: candidate_id.into(),
                created_at: Utc::now(),
                state: SlotState::Open(tx),
            },
        );
        debug!(%token, "waitpoint opened");

        Ok(Waitpoint {
            token,
            registry: self.clone(),
            rx,
        })
    }

    /// Delivers `payload` to the run waiting on `token`.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the token is unknown
    /// - `AlreadyResolved` if it was resolved before
    /// - `Expired` if its deadline passed
    /// - `Abandoned` if the waiting run has stopped
    #[instrument(skip_all, fields(token = %token))]
    pub fn resolve(&self, token: &WebhookToken, payload: P) -> Result<(), WaitpointError> {
        let mut slots = self.slots();
        let Some(slot) = slots.get_mut(token) else {
            return Err(WaitpointError::NotFound {
                token: token.to_string(),
            });
        };

        let now = Utc::now();
        match std::mem::replace(&mut slot.state, SlotState::Resolved { at: now }) {
            SlotState::Open(tx) => {
                if tx.send(payload).is_err() {
                    slot.state = SlotState::Expired { at: now };
                    return Err(WaitpointError::Abandoned {
                        token: token.to_string(),
                    });
                }
                info!(%token, "waitpoint resolved");
                Ok(())
            }
            previous @ SlotState::Resolved { .. } => {
                slot.state = previous;
                Err(WaitpointError::AlreadyResolved {
                    token: token.to_string(),
                })
            }
            previous @ SlotState::Expired { .. } => {
                slot.state = previous;
                Err(WaitpointError::Expired {
                    token: token.to_string(),
                })
            }
        }
    }

    /// Returns the state of `token`, if it is known.
    pub fn state(&self, token: &WebhookToken) -> Option<WaitpointState> {
        self.slots().get(token).map(|slot| match slot.state {
            SlotState::Open(_) => WaitpointState::Open,
            SlotState::Resolved { .. } => WaitpointState::Resolved,
            SlotState::Expired { .. } => WaitpointState::Expired,
        })
    }

    /// Lists open waitpoints whose run is still waiting, oldest first.
    pub fn pending(&self) -> Vec<PendingWaitpoint> {
        let mut pending: Vec<_> = self
            .slots()
            .iter()
            .filter(|(_, slot)| matches!(&slot.state, SlotState::Open(tx) if !tx.is_closed()))
            .map(|(token, slot)| PendingWaitpoint {
                token: token.clone(),
                candidate_id: slot.candidate_id.clone(),
                created_at: slot.created_at,
            })
            .collect();
        pending.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.token.cmp(&b.token)));
        pending
    }

    /// Drops tombstones settled more than `retention` ago, along with open
    /// slots whose waiting run has gone. Returns how many were removed.
    pub fn prune(&self, retention: Duration) -> usize {
        let cutoff = chrono::Duration::from_std(retention)
            .ok()
            .and_then(|retention| Utc::now().checked_sub_signed(retention))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        let mut slots = self.slots();
        let before = slots.len();
        slots.retain(|_, slot| match &slot.state {
            SlotState::Open(tx) => !tx.is_closed(),
            SlotState::Resolved { at } | SlotState::Expired { at } => *at > cutoff,
        });
        before - slots.len()
    }

    /// Marks an open slot expired. If a resolution won the race, leaves it.
    fn expire(&self, token: &WebhookToken) -> WaitpointState {
        let mut slots = self.slots();
        match slots.get_mut(token) {
            Some(slot) => match slot.state {
                SlotState::Open(_) => {
                    slot.state = SlotState::Expired { at: Utc::now() };
                    WaitpointState::Expired
                }
                SlotState::Resolved { .. } => WaitpointState::Resolved,
                SlotState::Expired { .. } => WaitpointState::Expired,
            },
            None => WaitpointState::Expired,
        }
    }
}

/// The waiting side of one token.
pub struct Waitpoint<P> {
    token: WebhookToken,
    registry: WaitpointRegistry<P>,
    rx: oneshot::Receiver<P>,
}

impl<P: Send + 'static> Waitpoint<P> {
    #[must_use]
    pub fn token(&self) -> &WebhookToken {
        &self.token
    }

    /// Suspends until the token is resolved or `timeout` passes.
    ///
    /// `None` waits indefinitely.
    ///
    /// # Errors
    ///
    /// Returns `Expired` on timeout, or `Abandoned` if the slot was dropped
    /// without a payload.
    pub async fn wait(mut self, timeout: Option<Duration>) -> Result<P, WaitpointError> {
        let received = match timeout {
            Some(limit) => match tokio::time::timeout(limit, &mut self.rx).await {
                Ok(received) => received,
                Err(_) => {
                    return match self.registry.expire(&self.token) {
                        WaitpointState::Resolved => self.rx.try_recv().map_err(|_| {
                            WaitpointError::Abandoned {
                                token: self.token.to_string(),
                            }
                        }),
                        _ => {
                            info!(token = %self.token, "waitpoint expired");
                            Err(WaitpointError::Expired {
                                token: self.token.to_string(),
                            })
                        }
                    };
                }
            },
            None => (&mut self.rx).await,
        };

        received.map_err(|_| WaitpointError::Abandoned {
            token: self.token.to_string(),
        })
    }
}
