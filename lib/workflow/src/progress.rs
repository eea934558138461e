//! Progress events and the sinks they are streamed to.
//!
//! Each event goes out as one JSON object per line:
//!
//! ```text
//! {"step":"ingest","status":"completed","data":{...},"timestamp":1718000000000}
//! ```
//!
//! Events are typed on the producing side ([`ProgressEvent`], where the data
//! shape follows from the status) and loosely typed on the consuming side
//! ([`ProgressRecord`]).
//!
//! Delivery is best effort. A run never fails because its listener went
//! away: the first failed write detaches the emitter and later events are
//! dropped with a debug log.

use crate::error::ErrorKind;
use crate::model::{ApprovalResult, Snippets, WorkflowResult};
use crate::step::Step;
use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value as JsonValue;
use std::fmt;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::{Mutex, mpsc};
use tracing::{debug, warn};

/// Status component of a progress event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EventStatus {
    Started,
    Running,
    ToolCall,
    Waiting,
    Completed,
    Error,
}

/// One tool invocation made while enriching a profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCall {
    pub name: String,
    pub description: String,
    /// Epoch milliseconds.
    pub timestamp: i64,
}

impl ToolCall {
    pub fn now(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            timestamp: Utc::now().timestamp_millis(),
        }
    }
}

/// Published with `human-approval/waiting` so a reviewer can decide.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalRequest {
    pub webhook_token: String,
    pub candidate_id: String,
    pub snippets: Snippets,
    pub score: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestSummary {
    pub has_resume: bool,
    pub has_linked_in: bool,
    pub has_git_hub: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichSummary {
    pub score: u8,
    pub gaps: usize,
    pub risk_flags: usize,
}

/// Data attached to a `completed` event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum StepOutput {
    Ingested(IngestSummary),
    Extracted { tokens: u32 },
    Enriched(EnrichSummary),
    Decided(ApprovalResult),
    Finished(Box<WorkflowResult>),
}

/// Data attached to an `error` event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Failure {
    pub message: String,
    pub kind: ErrorKind,
    /// Present and false when the run carries on past the error.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fatal: Option<bool>,
}

impl Failure {
    pub fn fatal(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind,
            fatal: None,
        }
    }

    pub fn non_fatal(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind,
            fatal: Some(false),
        }
    }
}

/// Status plus the data that status carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Progress {
    Started { candidate_id: Option<String> },
    Running,
    ToolCall { tool_calls: Vec<ToolCall> },
    Waiting(ApprovalRequest),
    Completed(Option<StepOutput>),
    Error(Failure),
}

impl Progress {
    #[must_use]
    pub fn status(&self) -> EventStatus {
        match self {
            Self::Started { .. } => EventStatus::Started,
            Self::Running => EventStatus::Running,
            Self::ToolCall { .. } => EventStatus::ToolCall,
            Self::Waiting(_) => EventStatus::Waiting,
            Self::Completed(_) => EventStatus::Completed,
            Self::Error(_) => EventStatus::Error,
        }
    }
}

/// A single progress notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressEvent {
    pub step: Step,
    pub progress: Progress,
    /// Epoch milliseconds.
    pub timestamp: i64,
}

impl ProgressEvent {
    pub fn new(step: Step, progress: Progress) -> Self {
        Self {
            step,
            progress,
            timestamp: Utc::now().timestamp_millis(),
        }
    }

    pub fn running(step: Step) -> Self {
        Self::new(step, Progress::Running)
    }

    pub fn completed(step: Step, output: Option<StepOutput>) -> Self {
        Self::new(step, Progress::Completed(output))
    }

    pub fn failed(step: Step, failure: Failure) -> Self {
        Self::new(step, Progress::Error(failure))
    }

    #[must_use]
    pub fn status(&self) -> EventStatus {
        self.progress.status()
    }

    /// Encodes the event as one newline-terminated JSON line.
    ///
    /// # Errors
    ///
    /// Returns an error if the event data cannot be serialized.
    pub fn to_line(&self) -> Result<String, serde_json::Error> {
        let mut line = serde_json::to_string(self)?;
        line.push('\n');
        Ok(line)
    }
}

#[derive(Serialize)]
#[serde(untagged)]
enum WireData<'a> {
    Started {
        #[serde(rename = "candidateId", skip_serializing_if = "Option::is_none")]
        candidate_id: Option<&'a str>,
    },
    ToolCalls {
        #[serde(rename = "toolCalls")]
        tool_calls: &'a [ToolCall],
    },
    Waiting(&'a ApprovalRequest),
    Output(&'a StepOutput),
    Failure(&'a Failure),
}

#[derive(Serialize)]
struct WireEvent<'a> {
    step: Step,
    status: EventStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<WireData<'a>>,
    timestamp: i64,
}

impl Serialize for ProgressEvent {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let data = match &self.progress {
            Progress::Started { candidate_id } => Some(WireData::Started {
                candidate_id: candidate_id.as_deref(),
            }),
            Progress::Running => None,
            Progress::ToolCall { tool_calls } => Some(WireData::ToolCalls { tool_calls }),
            Progress::Waiting(request) => Some(WireData::Waiting(request)),
            Progress::Completed(output) => output.as_ref().map(WireData::Output),
            Progress::Error(failure) => Some(WireData::Failure(failure)),
        };
        WireEvent {
            step: self.step,
            status: self.status(),
            data,
            timestamp: self.timestamp,
        }
        .serialize(serializer)
    }
}

/// A progress event as read back from the stream.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ProgressRecord {
    pub step: String,
    pub status: EventStatus,
    #[serde(default)]
    pub data: Option<JsonValue>,
    pub timestamp: i64,
}

impl ProgressRecord {
    /// Parses one line of the progress stream.
    ///
    /// # Errors
    ///
    /// Returns an error if the line is not a progress event.
    pub fn parse(line: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(line.trim_end())
    }

    /// Returns `step/status`, e.g. `agent-enrich/tool-call`.
    #[must_use]
    pub fn label(&self) -> String {
        let status = serde_json::to_value(self.status)
            .ok()
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_default();
        format!("{}/{status}", self.step)
    }
}

/// A write to a progress sink failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkError {
    /// The reading side has gone away.
    Closed,
    /// The underlying writer reported an error.
    Io { reason: String },
}

impl fmt::Display for SinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Closed => write!(f, "progress listener disconnected"),
            Self::Io { reason } => write!(f, "progress write failed: {reason}"),
        }
    }
}

impl std::error::Error for SinkError {}

/// Destination for encoded progress lines.
#[async_trait]
pub trait ProgressSink: Send {
    async fn write_line(&mut self, line: String) -> Result<(), SinkError>;
}

/// Hands lines to an in-process reader, such as an HTTP response body.
///
/// The channel is bounded, so a slow reader applies backpressure to the run.
pub struct ChannelSink {
    tx: mpsc::Sender<String>,
}

impl ChannelSink {
    pub fn new(tx: mpsc::Sender<String>) -> Self {
        Self { tx }
    }
}

#[async_trait]
impl ProgressSink for ChannelSink {
    async fn write_line(&mut self, line: String) -> Result<(), SinkError> {
        self.tx.send(line).await.map_err(|_| SinkError::Closed)
    }
}

/// Writes lines to any async writer and flushes after each one.
pub struct WriterSink<W> {
    writer: W,
}

impl<W> WriterSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

#[async_trait]
impl<W: AsyncWrite + Unpin + Send> ProgressSink for WriterSink<W> {
    async fn write_line(&mut self, line: String) -> Result<(), SinkError> {
        let io = |e: std::io::Error| SinkError::Io {
            reason: e.to_string(),
        };
        self.writer.write_all(line.as_bytes()).await.map_err(io)?;
        self.writer.flush().await.map_err(io)
    }
}

struct EmitterState {
    sink: Box<dyn ProgressSink>,
    detached: bool,
}

/// Serializes events for one run and writes them to its sink in order.
pub struct ProgressEmitter {
    state: Mutex<EmitterState>,
}

impl ProgressEmitter {
    pub fn new(sink: impl ProgressSink + 'static) -> Self {
        Self {
            state: Mutex::new(EmitterState {
                sink: Box::new(sink),
                detached: false,
            }),
        }
    }

    /// Writes an event. Returns true if it reached the sink.
    pub async fn emit(&self, event: ProgressEvent) -> bool {
        let mut state = self.state.lock().await;
        if state.detached {
            debug!(step = %event.step, status = ?event.status(), "listener detached, dropping event");
            return false;
        }

        let line = match event.to_line() {
            Ok(line) => line,
            Err(e) => {
                warn!(step = %event.step, error = %e, "failed to encode progress event");
                return false;
            }
        };

        match state.sink.write_line(line).await {
            Ok(()) => true,
            Err(e) => {
                warn!(step = %event.step, error = %e, "detaching progress listener");
                state.detached = true;
                false
            }
        }
    }

    /// Returns true once a write has failed.
    pub async fn is_detached(&self) -> bool {
        self.state.lock().await.detached
    }
}
