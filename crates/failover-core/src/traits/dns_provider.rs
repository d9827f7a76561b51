// # DNS Provider Trait
//
// Defines the interface for reading and rewriting record sets in a hosted zone.
//
// ## Implementations
//
// - Route 53: `failover-provider-route53` crate
//
// ## Usage
//
// ```rust,ignore
// use failover_core::traits::{DnsProvider, ListCursor};
// use failover_core::config::RecordType;
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let provider = /* DnsProvider implementation */;
//
//     let cursor = ListCursor::new("app.example.com.", RecordType::A);
//     let page = provider.list_record_sets("Z1234567890ABC", &cursor).await?;
//     for set in page.record_sets {
//         println!("{} {:?} weight={:?}", set.name, set.set_identifier, set.weight);
//     }
//
//     Ok(())
// }
// ```

use crate::config::RecordType;
use crate::record::ResourceRecordSet;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Position from which a zone listing starts
///
/// Listings are ordered by name, then type, then set identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListCursor {
    /// Record name to start at
    pub name: String,
    /// Record type to start at, as the provider spells it
    pub record_type: String,
    /// Set identifier to start at (only meaningful on continuation pages)
    pub identifier: Option<String>,
}

impl ListCursor {
    /// Cursor positioned at the first set with the given name and type
    pub fn new(name: impl Into<String>, record_type: RecordType) -> Self {
        Self {
            name: name.into(),
            record_type: record_type.as_str().to_string(),
            identifier: None,
        }
    }
}

/// One page of a zone listing
#[derive(Debug, Clone, Default)]
pub struct RecordSetPage {
    /// Record sets on this page, in listing order
    pub record_sets: Vec<ResourceRecordSet>,
    /// Where the next page starts, `None` when the listing is exhausted
    pub next: Option<ListCursor>,
}

/// Action applied to a record set within a change batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeAction {
    /// Create the set, or replace it if one with the same name/type/identifier exists
    Upsert,
}

/// A single change within a batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Change {
    /// What to do with the record set
    pub action: ChangeAction,
    /// The full desired record set
    pub record_set: ResourceRecordSet,
}

impl Change {
    /// Upsert the given record set
    pub fn upsert(record_set: ResourceRecordSet) -> Self {
        Self {
            action: ChangeAction::Upsert,
            record_set,
        }
    }
}

/// A group of changes the provider applies all-or-nothing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeBatch {
    /// Free-form note stored with the change
    pub comment: Option<String>,
    /// Changes, applied atomically
    pub changes: Vec<Change>,
}

/// Propagation status of an accepted change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeStatus {
    /// Accepted, not yet on every authoritative nameserver
    Pending,
    /// Propagated to every authoritative nameserver
    InSync,
}

/// Provider acknowledgement of a submitted change batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeInfo {
    /// Provider-assigned change ID
    pub id: String,
    /// Propagation status at submission time
    pub status: ChangeStatus,
    /// When the provider recorded the submission
    pub submitted_at: Option<DateTime<Utc>>,
}

/// Trait for DNS provider implementations
///
/// # Thread Safety
///
/// Implementations must be thread-safe; independent invocations may call the
/// same provider concurrently.
///
/// # Trust Level: Untrusted
///
/// ## Allowed Capabilities
/// - ✅ Perform API calls to their own endpoints
/// - ✅ Translate provider responses into the neutral types of this module
/// - ✅ Return success or failure (the invoking trigger owns redelivery)
///
/// ## Forbidden Capabilities
/// - ❌ Implement retry logic or backoff
/// - ❌ Decide whether a change is needed (owned by `ChangeApplier`)
/// - ❌ Cache listings between calls
/// - ❌ Split a batch into several requests (atomicity is the whole point)
#[async_trait]
pub trait DnsProvider: Send + Sync {
    /// List record sets in a zone starting at `cursor`
    ///
    /// Returns a single page. Callers follow `RecordSetPage::next` to continue.
    async fn list_record_sets(
        &self,
        zone_id: &str,
        cursor: &ListCursor,
    ) -> Result<RecordSetPage, crate::Error>;

    /// Submit a change batch, atomically
    ///
    /// # Returns
    ///
    /// - `Ok(ChangeInfo)`: The provider accepted the whole batch
    /// - `Err(Error::ProviderRejected)`: The provider refused the batch; nothing was applied
    /// - `Err(Error::Provider)`: The call failed before a decision was made
    async fn change_record_sets(
        &self,
        zone_id: &str,
        batch: &ChangeBatch,
    ) -> Result<ChangeInfo, crate::Error>;

    /// Get the provider name (for logging/debugging)
    fn provider_name(&self) -> &'static str;
}
