//! Connectors to the systems around a resume review.
//!
//! - **Sources**: fetch raw resume, LinkedIn and GitHub material
//! - **Store**: keyed upsert of reviewed candidate records
//! - **Notify**: tell the recruiting channel a review finished

pub mod error;
pub mod notify;
pub mod source;
pub mod store;

pub use error::{ConnectorError, StoreError};
pub use notify::{LogNotifier, Notification, Notifier, WebhookNotifier};
pub use source::{FixtureSources, HttpSourceFetcher, RawSources, SourceFetcher, SourceLocators};
pub use store::{InMemoryProfileStore, ProfileStore};
