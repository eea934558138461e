//! Versioned wrapper for journaled records.
//!
//! Everything written to a [`StepJournal`](crate::journal::StepJournal) is
//! wrapped so that records written by an older build can still be read
//! after the payload types change.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Version stamped on newly written records.
pub const CURRENT_VERSION: u32 = 1;

/// A payload tagged with the record format version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub version: u32,
    pub payload: T,
}

impl<T> Envelope<T> {
    /// Wraps a payload at [`CURRENT_VERSION`].
    #[must_use]
    pub fn new(payload: T) -> Self {
        Self {
            version: CURRENT_VERSION,
            payload,
        }
    }

    #[must_use]
    pub fn into_payload(self) -> T {
        self.payload
    }

    #[must_use]
    pub fn payload(&self) -> &T {
        &self.payload
    }
}

impl<T: Serialize> Envelope<T> {
    /// Encodes the envelope as JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload cannot be serialized.
    pub fn to_json_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }
}

/// An envelope whose payload has not been decoded yet.
///
/// Readers decode into this first so the version can be inspected before
/// committing to a payload type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawEnvelope {
    pub version: u32,
    pub payload: serde_json::Value,
}

impl RawEnvelope {
    /// Decodes a raw envelope from JSON bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the bytes are not an envelope.
    pub fn from_json_bytes(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }

    /// Returns true if this build knows how to read the record.
    #[must_use]
    pub fn is_readable(&self) -> bool {
        self.version <= CURRENT_VERSION
    }

    /// Decodes the payload into `T`.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload does not match `T`.
    pub fn decode<T: DeserializeOwned>(self) -> Result<Envelope<T>, serde_json::Error> {
        let payload = serde_json::from_value(self.payload)?;
        Ok(Envelope {
            version: self.version,
            payload,
        })
    }
}
