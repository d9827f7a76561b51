//! Error types for the failover system
//!
//! This module defines all error types used throughout the crate.

use thiserror::Error;

/// Result type alias for failover operations
pub type Result<T> = std::result::Result<T, Error>;

/// Which layer of an inbound notification could not be interpreted
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MalformedEvent {
    /// The outer delivery envelope is not valid or lacks a message
    #[error("invalid notification envelope: {0}")]
    Envelope(String),

    /// The embedded alarm document is not valid JSON or not an object
    #[error("invalid alarm document: {0}")]
    Document(String),

    /// The alarm document has no (or an empty) `NewStateValue`
    #[error("alarm document is missing NewStateValue")]
    MissingState,
}

/// Core error type for the failover system
#[derive(Error, Debug)]
pub enum Error {
    /// The notification could not be interpreted
    #[error("Malformed event: {0}")]
    MalformedEvent(#[from] MalformedEvent),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// One or both configured identifiers are absent from the record set
    #[error("Record not found: {record_name} has no weighted variant for {}", .missing.join(", "))]
    RecordNotFound {
        /// The record set name that was searched
        record_name: String,
        /// Identifiers that could not be matched
        missing: Vec<String>,
    },

    /// More than one variant carries the same set identifier
    #[error("Ambiguous record: {count} variants share identifier '{identifier}'")]
    AmbiguousRecord {
        /// The duplicated set identifier
        identifier: String,
        /// How many variants carried it
        count: usize,
    },

    /// A variant matched by identifier is not a weighted record
    #[error("Unsupported record '{identifier}': {reason}")]
    UnsupportedRecord {
        /// The matched set identifier
        identifier: String,
        /// Why the variant cannot be rewritten
        reason: String,
    },

    /// The provider refused a change batch
    #[error("Change rejected by {provider}: {message}")]
    ProviderRejected {
        /// Provider name
        provider: String,
        /// Rejection detail as reported by the provider
        message: String,
    },

    /// Provider call failed without a structured rejection (transport, auth, throttling)
    #[error("Provider error ({provider}): {message}")]
    Provider {
        /// Provider name
        provider: String,
        /// Error message
        message: String,
    },

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an envelope-layer malformed event error
    pub fn malformed_envelope(msg: impl Into<String>) -> Self {
        Self::MalformedEvent(MalformedEvent::Envelope(msg.into()))
    }

    /// Create a document-layer malformed event error
    pub fn malformed_document(msg: impl Into<String>) -> Self {
        Self::MalformedEvent(MalformedEvent::Document(msg.into()))
    }

    /// Create an unsupported record error
    pub fn unsupported_record(identifier: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::UnsupportedRecord {
            identifier: identifier.into(),
            reason: reason.into(),
        }
    }

    /// Create a provider rejection error
    pub fn provider_rejected(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ProviderRejected {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Create a provider-specific error
    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Whether redelivering the same notification could succeed
    ///
    /// Malformed input, configuration defects and zone/record mismatches need
    /// an operator; provider failures may be transient.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Provider { .. } | Self::ProviderRejected { .. })
    }

    /// Short machine-readable kind, used in outcome records
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MalformedEvent(_) => "malformed_event",
            Self::Config(_) => "configuration",
            Self::RecordNotFound { .. } => "record_not_found",
            Self::AmbiguousRecord { .. } => "ambiguous_record",
            Self::UnsupportedRecord { .. } => "unsupported_record",
            Self::ProviderRejected { .. } => "provider_rejected",
            Self::Provider { .. } => "provider",
            Self::Json(_) => "json",
            Self::Other(_) => "other",
        }
    }
}
