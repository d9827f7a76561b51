// # failover-core
//
// Core library for weighted DNS failover driven by alarm state changes.
//
// ## Architecture Overview
//
// On each health-state notification the library repoints a weighted record
// pair between a primary and a secondary target:
// - **Event interpreter** (`event`): two-layer decode of the notification into a `HealthEvent`
// - **Record locator** (`locator`): pages the zone listing and matches primary/secondary variants
// - **Weight policy** (`policy`): pure mapping from health state to target weights
// - **Change applier** (`applier`): one atomic two-UPSERT batch, skipped when already in place
// - **FailoverEngine** (`engine`): sequences the above and yields one `ChangeOutcome`
// - **DnsProvider** (`traits`): the read/write capability the provider crates implement
//
// ## Design Principles
//
// 1. **Stateless**: every invocation derives its action from the event and the zone as read
// 2. **Idempotent**: a pair already at its target weights is never written
// 3. **Atomic**: both variants move in one provider batch or not at all
// 4. **No hidden retries**: failures surface to the invoking trigger
// 5. **Library-First**: configuration is an explicit value, never ambient global state

pub mod applier;
pub mod config;
pub mod engine;
pub mod error;
pub mod event;
pub mod locator;
pub mod outcome;
pub mod policy;
pub mod record;
pub mod traits;

// Re-export core types for convenience
pub use config::{FailoverConfig, RecordType};
pub use engine::{FailoverEngine, InvocationError};
pub use error::{Error, MalformedEvent, Result};
pub use event::{HealthEvent, HealthState};
pub use outcome::{ChangeOutcome, OutcomeAction};
pub use policy::WeightAssignment;
pub use record::{RecordPair, RecordTarget, ResourceRecordSet, WeightedRecordVariant};
pub use traits::DnsProvider;
