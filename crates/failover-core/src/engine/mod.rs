//! Core failover engine
//!
//! The FailoverEngine is responsible for:
//! - Interpreting an inbound notification into a health state
//! - Short-circuiting states that call for no change
//! - Locating the weighted pair in the zone
//! - Computing and applying the target weights
//! - Producing exactly one [`ChangeOutcome`] per invocation
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐
//! │ notification │
//! └──────────────┘
//!        │
//!        ▼
//! ┌──────────────┐  Indeterminate  ┌──────────────────────┐
//! │ HealthEvent  │────────────────▶│ SkippedIndeterminate │
//! └──────────────┘                 └──────────────────────┘
//!        │
//!        ▼
//! ┌──────────────┐    ┌──────────────┐    ┌───────────────┐
//! │RecordLocator │───▶│ WeightPolicy │───▶│ ChangeApplier │
//! │ (list pages) │    │   (pure)     │    │ (one batch)   │
//! └──────────────┘    └──────────────┘    └───────────────┘
//!                                                 │
//!                                                 ▼
//!                                   Applied / SkippedNoOp / Failed
//! ```
//!
//! ## Failure Policy
//!
//! The engine never retries. Any error becomes a `Failed` outcome, is logged,
//! and is handed back to the caller inside an [`InvocationError`] so the
//! trigger's own redelivery semantics apply.

use crate::applier::{ApplyResult, ChangeApplier};
use crate::config::FailoverConfig;
use crate::error::{Error, Result};
use crate::event::HealthEvent;
use crate::locator::RecordLocator;
use crate::outcome::ChangeOutcome;
use crate::policy::{self, WeightAssignment};
use crate::traits::DnsProvider;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, error, info};

/// A failed invocation: the `Failed` outcome plus the error that caused it
#[derive(thiserror::Error, Debug)]
#[error("{error}")]
pub struct InvocationError {
    /// Outcome describing the failure
    pub outcome: ChangeOutcome,
    /// Underlying error
    #[source]
    pub error: Error,
}

impl InvocationError {
    /// Whether redelivering the notification could succeed
    pub fn is_retryable(&self) -> bool {
        self.error.is_retryable()
    }
}

/// What was learned before a failure, for the `Failed` outcome
#[derive(Default)]
struct Progress {
    event: Option<HealthEvent>,
    previous: Option<WeightAssignment>,
    target: Option<WeightAssignment>,
}

/// Core failover engine
///
/// Holds the immutable configuration and a provider handle. Holds no other
/// state, so one engine can serve concurrent invocations; overlapping
/// invocations are not coordinated and the provider's last write wins.
///
/// ## Lifecycle
///
/// 1. Load a [`FailoverConfig`] once at process start
/// 2. Create with [`FailoverEngine::new()`] (validates the configuration)
/// 3. Call [`FailoverEngine::handle()`] once per notification
pub struct FailoverEngine {
    /// DNS provider for reading and writing the zone
    provider: Arc<dyn DnsProvider>,

    /// The pair this engine manages
    config: FailoverConfig,
}

impl FailoverEngine {
    /// Create a new failover engine
    ///
    /// # Returns
    ///
    /// - `Ok(FailoverEngine)`: The configuration is complete
    /// - `Err(Error::Config)`: The configuration is invalid
    pub fn new(provider: Arc<dyn DnsProvider>, config: FailoverConfig) -> Result<Self> {
        config.validate()?;

        info!(
            "Failover engine ready: {} {} in zone {} (primary: '{}', secondary: '{}', provider: {})",
            config.record_name,
            config.record_type,
            config.zone_id,
            config.primary_identifier,
            config.secondary_identifier,
            provider.provider_name()
        );

        Ok(Self { provider, config })
    }

    /// The configuration this engine was built with
    pub fn config(&self) -> &FailoverConfig {
        &self.config
    }

    /// Handle a notification given as JSON text
    pub async fn handle_str(
        &self,
        raw: &str,
    ) -> std::result::Result<ChangeOutcome, InvocationError> {
        match serde_json::from_str::<Value>(raw) {
            Ok(payload) => self.handle(payload).await,
            Err(e) => Err(self.fail(
                Progress::default(),
                Error::malformed_envelope(format!("not valid JSON: {}", e)),
            )),
        }
    }

    /// Handle one decoded notification
    ///
    /// # Returns
    ///
    /// - `Ok(ChangeOutcome)`: `Applied`, `SkippedNoOp` or `SkippedIndeterminate`
    /// - `Err(InvocationError)`: carries the `Failed` outcome and its cause
    pub async fn handle(
        &self,
        payload: Value,
    ) -> std::result::Result<ChangeOutcome, InvocationError> {
        let mut progress = Progress::default();

        match self.process(payload, &mut progress).await {
            Ok(outcome) => {
                info!(
                    "Invocation finished: {:?} (previous: {:?}, new: {:?})",
                    outcome.action, outcome.previous_weights, outcome.new_weights
                );
                Ok(outcome)
            }
            Err(e) => Err(self.fail(progress, e)),
        }
    }

    async fn process(&self, payload: Value, progress: &mut Progress) -> Result<ChangeOutcome> {
        let event = HealthEvent::from_value(payload)?;
        progress.event = Some(event.clone());

        info!(
            "Processing alarm state {} ({}) for alarm {}",
            event.raw_state,
            event.state,
            event.alarm_name.as_deref().unwrap_or("<unnamed>")
        );

        let Some(target) = policy::target_weights(event.state) else {
            info!(
                "No action taken for state {}; provider not contacted",
                event.raw_state
            );
            return Ok(ChangeOutcome::skipped_indeterminate(&event));
        };
        progress.target = Some(target);

        let pair = RecordLocator::new(self.provider.as_ref())
            .locate(&self.config)
            .await?;
        let previous = pair.current_weights();
        progress.previous = Some(previous);

        debug!("Current weights {}, target {}", previous, target);

        let comment = change_comment(&event, target);
        let result = ChangeApplier::new(self.provider.as_ref())
            .apply(&self.config.zone_id, &pair, target, Some(comment))
            .await?;

        Ok(match result {
            ApplyResult::Unchanged => ChangeOutcome::skipped_noop(&event, previous),
            ApplyResult::Submitted(change) => {
                ChangeOutcome::applied(&event, previous, target, change.id)
            }
        })
    }

    fn fail(&self, progress: Progress, error: Error) -> InvocationError {
        let outcome = ChangeOutcome::failed(
            progress.event.as_ref(),
            progress.previous,
            progress.target,
            &error,
        );

        error!(
            "Invocation failed for {} ({}, retryable: {}): {}",
            self.config.record_name,
            error.kind(),
            error.is_retryable(),
            error
        );

        InvocationError { outcome, error }
    }
}

/// Comment recorded with a change batch
fn change_comment(event: &HealthEvent, target: WeightAssignment) -> String {
    match &event.alarm_name {
        Some(alarm) => format!("failover: {} is {} -> {}", alarm, event.raw_state, target),
        None => format!("failover: alarm {} -> {}", event.raw_state, target),
    }
}
