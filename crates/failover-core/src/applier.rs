//! Change applier
//!
//! Submits the weight change for a [`RecordPair`] as one atomic batch of two
//! UPSERTs, or skips the write entirely when the provider already serves the
//! target weights. "Applied" means the provider accepted the batch; the
//! applier does not wait for propagation to authoritative nameservers.

use crate::error::{Error, Result};
use crate::policy::WeightAssignment;
use crate::record::RecordPair;
use crate::traits::{Change, ChangeBatch, ChangeInfo, DnsProvider};
use tracing::{debug, info};

/// Provider limit on change batch comments
const MAX_COMMENT_LEN: usize = 256;

/// Result of an apply attempt that did not fail
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyResult {
    /// The pair already had the target weights; nothing was written
    Unchanged,
    /// The provider accepted the change batch
    Submitted(ChangeInfo),
}

/// Writes weight changes through a provider's write API
pub struct ChangeApplier<'a> {
    provider: &'a dyn DnsProvider,
}

impl<'a> ChangeApplier<'a> {
    /// Create an applier over the given provider
    pub fn new(provider: &'a dyn DnsProvider) -> Self {
        Self { provider }
    }

    /// Bring `pair` to `target` weights
    ///
    /// # Errors
    ///
    /// - `ProviderRejected`: the provider refused the batch, or acknowledged
    ///   it without a change ID
    /// - `Provider`: the call failed before the provider decided
    pub async fn apply(
        &self,
        zone_id: &str,
        pair: &RecordPair,
        target: WeightAssignment,
        comment: Option<String>,
    ) -> Result<ApplyResult> {
        let current = pair.current_weights();
        if current == target {
            debug!(
                "{} already serves {}, no change submitted",
                pair.primary.name, target
            );
            return Ok(ApplyResult::Unchanged);
        }

        let batch = build_change_batch(pair, target, comment);
        info!(
            "Submitting change for {}: {} -> {}",
            pair.primary.name, current, target
        );

        let change = self.provider.change_record_sets(zone_id, &batch).await?;

        if change.id.trim().is_empty() {
            return Err(Error::provider_rejected(
                self.provider.provider_name(),
                "change acknowledged without a change ID",
            ));
        }

        info!(
            "Change {} accepted for {} (status: {:?})",
            change.id, pair.primary.name, change.status
        );
        Ok(ApplyResult::Submitted(change))
    }
}

/// Build the two-UPSERT batch moving `pair` to `target`
///
/// Each UPSERT carries the variant exactly as listed except for its weight.
pub fn build_change_batch(
    pair: &RecordPair,
    target: WeightAssignment,
    comment: Option<String>,
) -> ChangeBatch {
    let rewritten = pair.with_weights(target);

    ChangeBatch {
        comment: comment.map(truncate_comment),
        changes: vec![
            Change::upsert(rewritten.primary.to_record_set()),
            Change::upsert(rewritten.secondary.to_record_set()),
        ],
    }
}

fn truncate_comment(comment: String) -> String {
    if comment.len() <= MAX_COMMENT_LEN {
        return comment;
    }

    let mut end = MAX_COMMENT_LEN;
    while !comment.is_char_boundary(end) {
        end -= 1;
    }
    comment[..end].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RecordType;
    use crate::record::{RecordTarget, WeightedRecordVariant};
    use crate::traits::ChangeAction;

    fn pair() -> RecordPair {
        RecordPair {
            primary: WeightedRecordVariant {
                name: "example.com.".to_string(),
                identifier: "primary".to_string(),
                record_type: RecordType::A,
                ttl: None,
                target: RecordTarget::Alias {
                    dns_name: "primary-lb.example.net.".to_string(),
                    hosted_zone_id: "Z111".to_string(),
                    evaluate_target_health: true,
                },
                weight: 1,
                health_check_id: Some("hc-primary".to_string()),
                traffic_policy_instance_id: None,
            },
            secondary: WeightedRecordVariant {
                name: "example.com.".to_string(),
                identifier: "secondary".to_string(),
                record_type: RecordType::A,
                ttl: Some(300),
                target: RecordTarget::Values(vec!["198.51.100.7".to_string()]),
                weight: 0,
                health_check_id: None,
                traffic_policy_instance_id: None,
            },
        }
    }

    #[test]
    fn batch_holds_two_upserts_in_pair_order() {
        let batch = build_change_batch(&pair(), WeightAssignment::SECONDARY_ACTIVE, None);

        assert_eq!(batch.changes.len(), 2);
        assert!(batch.changes.iter().all(|c| c.action == ChangeAction::Upsert));
        assert_eq!(
            batch.changes[0].record_set.set_identifier.as_deref(),
            Some("primary")
        );
        assert_eq!(batch.changes[0].record_set.weight, Some(0));
        assert_eq!(
            batch.changes[1].record_set.set_identifier.as_deref(),
            Some("secondary")
        );
        assert_eq!(batch.changes[1].record_set.weight, Some(1));
    }

    #[test]
    fn batch_preserves_everything_but_weight() {
        let original = pair();
        let batch = build_change_batch(&original, WeightAssignment::SECONDARY_ACTIVE, None);

        assert_eq!(
            batch.changes[0].record_set.health_check_id.as_deref(),
            Some("hc-primary")
        );

        let mut primary = batch.changes[0].record_set.clone();
        primary.weight = Some(original.primary.weight);
        assert_eq!(primary, original.primary.to_record_set());

        let mut secondary = batch.changes[1].record_set.clone();
        secondary.weight = Some(original.secondary.weight);
        assert_eq!(secondary, original.secondary.to_record_set());
    }

    #[test]
    fn long_comment_is_truncated_on_char_boundary() {
        let comment = "é".repeat(200);
        let batch = build_change_batch(&pair(), WeightAssignment::PRIMARY_ACTIVE, Some(comment));

        let kept = batch.comment.unwrap();
        assert!(kept.len() <= MAX_COMMENT_LEN);
        assert!(kept.chars().all(|c| c == 'é'));
    }
}
