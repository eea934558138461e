//! resume-review HTTP server.
//!
//! Exposes the resume-review workflow over HTTP: streaming run progress,
//! answering approvals and resuming unfinished runs.

pub mod api;
pub mod bootstrap;
pub mod config;
pub mod error;
