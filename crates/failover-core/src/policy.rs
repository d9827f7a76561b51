//! Weight policy
//!
//! Maps a health state to the weights the pair should serve. Pure, no I/O.

use crate::event::HealthState;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Target weights for a primary/secondary pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WeightAssignment {
    /// Weight of the primary variant
    pub primary: u64,
    /// Weight of the secondary variant
    pub secondary: u64,
}

impl WeightAssignment {
    /// All traffic to the primary
    pub const PRIMARY_ACTIVE: Self = Self {
        primary: 1,
        secondary: 0,
    };

    /// All traffic to the secondary
    pub const SECONDARY_ACTIVE: Self = Self {
        primary: 0,
        secondary: 1,
    };
}

impl fmt::Display for WeightAssignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "primary={} secondary={}", self.primary, self.secondary)
    }
}

/// Weights for a health state, or `None` when the state calls for no change
pub fn target_weights(state: HealthState) -> Option<WeightAssignment> {
    match state {
        HealthState::Healthy => Some(WeightAssignment::PRIMARY_ACTIVE),
        HealthState::Unhealthy => Some(WeightAssignment::SECONDARY_ACTIVE),
        HealthState::Indeterminate => None,
    }
}
