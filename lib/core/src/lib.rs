//! Core identifiers and utilities for the resume-review workflow.
//!
//! This crate provides the foundational types shared by the workflow engine,
//! its external collaborators and the HTTP server.

pub mod error;
pub mod id;

pub use error::Result;
pub use id::{CandidateId, InvalidCandidateId, ParseIdError, WorkflowRunId};
