//! The work done by each pipeline step.
//!
//! Steps are plain async functions over their collaborators. Journaling,
//! retry and progress reporting around them belong to the orchestrator.

pub mod approval;
pub mod enrich;
pub mod extract;
pub mod ingest;
pub mod notify;
pub mod persist;
pub mod snippets;
pub mod validate;
