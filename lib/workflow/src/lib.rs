//! Durable resume-review workflow engine.
//!
//! A run takes a candidate through a fixed pipeline of steps, streams its
//! progress as line-delimited JSON and may suspend on a human approval:
//!
//! - **Steps**: typed step identity and the per-step logic ([`step`], [`steps`])
//! - **Progress**: wire events and the per-run emitter ([`progress`])
//! - **Waitpoints**: token-addressed suspension with expiry ([`waitpoint`])
//! - **Journal**: versioned record of step outputs, in memory or on NATS ([`journal`], [`nats`])
//! - **Execution**: replay and retry around each step ([`executor`])
//! - **Runs**: the pipeline and the engine that starts and resumes it ([`orchestrator`], [`engine`])

pub mod config;
pub mod engine;
pub mod envelope;
pub mod error;
pub mod executor;
pub mod journal;
pub mod model;
pub mod nats;
pub mod orchestrator;
pub mod progress;
pub mod step;
pub mod steps;
pub mod waitpoint;

pub use config::WorkflowConfig;
pub use engine::{RunHandle, WorkflowEngine};
pub use envelope::{Envelope, RawEnvelope};
pub use error::{EngineError, ErrorKind, StepError};
pub use executor::{RetryPolicy, StepExecutor, StepRun};
pub use journal::{InMemoryJournal, JournalEntry, JournalError, RunHistory, StepJournal};
pub use model::{
    ApprovalResult, CandidateInput, EnrichedProfile, ExtractedData, RunStatus, Snippets,
    ValidatedInput, WorkflowResult,
};
pub use nats::{NatsConfig, NatsStepJournal};
pub use orchestrator::{Collaborators, ReviewOrchestrator};
pub use progress::{
    ChannelSink, EventStatus, Failure, Progress, ProgressEmitter, ProgressEvent, ProgressRecord,
    ProgressSink, SinkError, WriterSink,
};
pub use step::Step;
pub use waitpoint::{
    PendingWaitpoint, Waitpoint, WaitpointError, WaitpointRegistry, WaitpointState, WebhookToken,
};
