//! Invocation outcome
//!
//! Every handled notification ends in exactly one [`ChangeOutcome`]. It is
//! returned to the caller and logged; nothing persists it.

use crate::error::Error;
use crate::event::{HealthEvent, HealthState};
use crate::policy::WeightAssignment;
use serde::{Deserialize, Serialize};

/// What an invocation did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeAction {
    /// The provider accepted a weight change
    Applied,
    /// The pair already served the target weights
    SkippedNoOp,
    /// The health state called for no change
    SkippedIndeterminate,
    /// The invocation failed; see `error_detail`
    Failed,
}

/// Structured result of one invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeOutcome {
    /// What happened
    pub action: OutcomeAction,

    /// Weights read from the provider, when the pair was located
    pub previous_weights: Option<WeightAssignment>,

    /// Weights the pair serves (or would have served) afterwards
    pub new_weights: Option<WeightAssignment>,

    /// Interpreted health state, when the event could be parsed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<HealthState>,

    /// Alarm name from the notification
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alarm_name: Option<String>,

    /// Provider change ID for applied changes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub change_id: Option<String>,

    /// Error kind, present iff `action` is `Failed`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<String>,

    /// Error message, present iff `action` is `Failed`
    pub error_detail: Option<String>,
}

impl ChangeOutcome {
    fn base(action: OutcomeAction, event: Option<&HealthEvent>) -> Self {
        Self {
            action,
            previous_weights: None,
            new_weights: None,
            state: event.map(|e| e.state),
            alarm_name: event.and_then(|e| e.alarm_name.clone()),
            change_id: None,
            error_kind: None,
            error_detail: None,
        }
    }

    /// The provider accepted a change from `previous` to `new`
    pub fn applied(
        event: &HealthEvent,
        previous: WeightAssignment,
        new: WeightAssignment,
        change_id: impl Into<String>,
    ) -> Self {
        Self {
            previous_weights: Some(previous),
            new_weights: Some(new),
            change_id: Some(change_id.into()),
            ..Self::base(OutcomeAction::Applied, Some(event))
        }
    }

    /// The pair already served `current`
    pub fn skipped_noop(event: &HealthEvent, current: WeightAssignment) -> Self {
        Self {
            previous_weights: Some(current),
            new_weights: Some(current),
            ..Self::base(OutcomeAction::SkippedNoOp, Some(event))
        }
    }

    /// The event carried no actionable state
    pub fn skipped_indeterminate(event: &HealthEvent) -> Self {
        Self::base(OutcomeAction::SkippedIndeterminate, Some(event))
    }

    /// The invocation failed with `error`
    ///
    /// `previous` and `target` are whatever was known before the failure.
    pub fn failed(
        event: Option<&HealthEvent>,
        previous: Option<WeightAssignment>,
        target: Option<WeightAssignment>,
        error: &Error,
    ) -> Self {
        Self {
            previous_weights: previous,
            new_weights: target,
            error_kind: Some(error.kind().to_string()),
            error_detail: Some(error.to_string()),
            ..Self::base(OutcomeAction::Failed, event)
        }
    }

    /// Whether the provider was asked to write
    pub fn wrote(&self) -> bool {
        self.action == OutcomeAction::Applied
    }
}
