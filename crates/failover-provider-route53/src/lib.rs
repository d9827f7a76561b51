// # Route 53 DNS Provider
//
// This crate implements `DnsProvider` on top of the Amazon Route 53 API.
//
// ## Implementation Status
//
// - ✅ One API call per `DnsProvider` method call
// - ✅ Paginated listing positioned by name, type and set identifier
// - ✅ Weighted alias and literal record sets, round-tripped field for field
// - ✅ Atomic change batches (all UPSERTs in one `ChangeResourceRecordSets`)
// - ✅ Service rejections distinguished from transport failures
// - ✅ Dry-run mode for safe testing
// - ❌ NO retry logic (redelivery is owned by the invoking trigger)
// - ❌ NO waiting for INSYNC (an accepted batch is the success condition)
// - ❌ NO caching of listings between calls
//
// ## Trust Level: Untrusted (DNS Provider)
//
// **Allowed Capabilities**:
// - ✅ Call the Route 53 API with credentials from the default AWS chain
// - ✅ Translate SDK types to and from the neutral `failover_core` types
//
// **Forbidden Capabilities**:
// - ❌ Decide whether a change is needed (owned by `ChangeApplier`)
// - ❌ Split a batch across requests
// - ❌ Spawn tasks or threads
//
// ## API Reference
//
// - ListResourceRecordSets: `GET /2013-04-01/hostedzone/{Id}/rrset`
// - ChangeResourceRecordSets: `POST /2013-04-01/hostedzone/{Id}/rrset/`

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_route53::Client;
use aws_sdk_route53::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_route53::operation::list_resource_record_sets::ListResourceRecordSetsOutput;
use aws_sdk_route53::types as r53;
use chrono::{DateTime, Utc};
use failover_core::record::{RecordTarget, ResourceRecordSet};
use failover_core::traits::{
    ChangeAction, ChangeBatch, ChangeInfo, ChangeStatus, DnsProvider, ListCursor, RecordSetPage,
};
use failover_core::{Error, Result};

/// Provider name used in logs and errors
const PROVIDER: &str = "route53";

/// Largest page the listing API returns
const MAX_PAGE_ITEMS: i32 = 300;

/// Change ID reported for batches that dry-run mode did not submit
pub const DRY_RUN_CHANGE_ID: &str = "dry-run";

/// Route 53 DNS provider
///
/// # Dry-Run Mode
///
/// When `dry_run` is true, the provider will:
/// - Perform listing calls as usual
/// - Log the change batch it would have submitted
/// - **NOT** submit it, reporting change ID `dry-run` instead
pub struct Route53Provider {
    /// Route 53 API client
    client: Client,

    /// Dry-run mode: if true, list normally but skip change submission
    dry_run: bool,
}

impl std::fmt::Debug for Route53Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Route53Provider")
            .field("client", &"<aws-sdk-route53>")
            .field("dry_run", &self.dry_run)
            .finish()
    }
}

impl Route53Provider {
    /// Create a provider over an existing client
    pub fn new(client: Client, dry_run: bool) -> Self {
        if dry_run {
            tracing::warn!("Route 53 provider running in DRY-RUN mode - no changes will be made");
        }
        Self { client, dry_run }
    }

    /// Create a provider using the default AWS credential and region chain
    pub async fn from_env(dry_run: bool) -> Self {
        let aws_config = aws_config::defaults(BehaviorVersion::latest()).load().await;
        Self::new(Client::new(&aws_config), dry_run)
    }

    /// Whether change batches are only logged
    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }
}

#[async_trait]
impl DnsProvider for Route53Provider {
    async fn list_record_sets(&self, zone_id: &str, cursor: &ListCursor) -> Result<RecordSetPage> {
        tracing::debug!(
            "Listing {} starting at {} {} ({})",
            zone_id,
            cursor.name,
            cursor.record_type,
            cursor.identifier.as_deref().unwrap_or("-")
        );

        let output = self
            .client
            .list_resource_record_sets()
            .hosted_zone_id(zone_id)
            .start_record_name(&cursor.name)
            .start_record_type(r53::RrType::from(cursor.record_type.as_str()))
            .set_start_record_identifier(cursor.identifier.clone())
            .max_items(MAX_PAGE_ITEMS)
            .send()
            .await
            .map_err(|e| {
                Error::provider(
                    PROVIDER,
                    format!("ListResourceRecordSets failed: {}", DisplayErrorContext(&e)),
                )
            })?;

        let record_sets = output
            .resource_record_sets()
            .iter()
            .map(from_sdk_record_set)
            .collect::<Result<Vec<_>>>()?;

        let next = next_cursor(&output, cursor)?;

        tracing::debug!(
            "Listing page holds {} set(s), truncated: {}",
            record_sets.len(),
            next.is_some()
        );

        Ok(RecordSetPage { record_sets, next })
    }

    async fn change_record_sets(&self, zone_id: &str, batch: &ChangeBatch) -> Result<ChangeInfo> {
        let request = to_sdk_change_batch(batch)?;

        if self.dry_run {
            tracing::info!(
                "[DRY-RUN] Would submit change batch to {}: {}",
                zone_id,
                serde_json::to_string(batch)?
            );
            return Ok(ChangeInfo {
                id: DRY_RUN_CHANGE_ID.to_string(),
                status: ChangeStatus::Pending,
                submitted_at: Some(Utc::now()),
            });
        }

        let output = self
            .client
            .change_resource_record_sets()
            .hosted_zone_id(zone_id)
            .change_batch(request)
            .send()
            .await
            .map_err(change_error)?;

        let info = output
            .change_info()
            .ok_or_else(|| Error::provider_rejected(PROVIDER, "response carried no ChangeInfo"))?;

        Ok(from_sdk_change_info(info))
    }

    fn provider_name(&self) -> &'static str {
        PROVIDER
    }
}

/// Map a failed change submission
///
/// A service error means Route 53 looked at the batch and refused it; anything
/// else (dispatch, timeout, unparseable response) never reached a decision.
fn change_error<E, R>(err: SdkError<E, R>) -> Error
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
    R: std::fmt::Debug,
{
    match err.as_service_error() {
        Some(service) => Error::provider_rejected(
            PROVIDER,
            format!(
                "{}: {}",
                service.code().unwrap_or("Unknown"),
                service.message().unwrap_or("no message")
            ),
        ),
        None => Error::provider(
            PROVIDER,
            format!("ChangeResourceRecordSets failed: {}", DisplayErrorContext(&err)),
        ),
    }
}

/// Cursor for the page after `output`, or `None` when the listing is complete
///
/// Route 53 omits `NextRecordType` in some truncated responses; the type of
/// the current cursor is kept then.
pub fn next_cursor(
    output: &ListResourceRecordSetsOutput,
    current: &ListCursor,
) -> Result<Option<ListCursor>> {
    if !output.is_truncated() {
        return Ok(None);
    }

    let name = output
        .next_record_name()
        .ok_or_else(|| Error::provider(PROVIDER, "truncated listing without NextRecordName"))?;

    Ok(Some(ListCursor {
        name: name.to_string(),
        record_type: output
            .next_record_type()
            .map(|t| t.as_str().to_string())
            .unwrap_or_else(|| current.record_type.clone()),
        identifier: output.next_record_identifier().map(str::to_string),
    }))
}

/// Convert a listed SDK record set into the neutral form
pub fn from_sdk_record_set(set: &r53::ResourceRecordSet) -> Result<ResourceRecordSet> {
    let weight = set
        .weight()
        .map(|w| {
            u64::try_from(w).map_err(|_| {
                Error::provider(PROVIDER, format!("negative weight {} on {}", w, set.name()))
            })
        })
        .transpose()?;

    let target = match set.alias_target() {
        Some(alias) => RecordTarget::Alias {
            dns_name: alias.dns_name().to_string(),
            hosted_zone_id: alias.hosted_zone_id().to_string(),
            evaluate_target_health: alias.evaluate_target_health(),
        },
        None => RecordTarget::Values(
            set.resource_records()
                .iter()
                .map(|r| r.value().to_string())
                .collect(),
        ),
    };

    Ok(ResourceRecordSet {
        name: set.name().to_string(),
        record_type: set.r#type().as_str().to_string(),
        set_identifier: set.set_identifier().map(str::to_string),
        weight,
        ttl: set.ttl(),
        target,
        health_check_id: set.health_check_id().map(str::to_string),
        traffic_policy_instance_id: set.traffic_policy_instance_id().map(str::to_string),
    })
}

/// Convert a neutral record set into the SDK form used in change batches
pub fn to_sdk_record_set(set: &ResourceRecordSet) -> Result<r53::ResourceRecordSet> {
    let label = set.set_identifier.as_deref().unwrap_or(&set.name);
    let invalid = |e: aws_sdk_route53::error::BuildError| {
        Error::unsupported_record(label, format!("cannot build Route 53 record set: {}", e))
    };

    let weight = set
        .weight
        .map(|w| {
            i64::try_from(w)
                .map_err(|_| Error::unsupported_record(label, format!("weight {} out of range", w)))
        })
        .transpose()?;

    let mut builder = r53::ResourceRecordSet::builder()
        .name(&set.name)
        .r#type(r53::RrType::from(set.record_type.as_str()))
        .set_set_identifier(set.set_identifier.clone())
        .set_weight(weight)
        .set_ttl(set.ttl)
        .set_health_check_id(set.health_check_id.clone())
        .set_traffic_policy_instance_id(set.traffic_policy_instance_id.clone());

    builder = match &set.target {
        RecordTarget::Alias {
            dns_name,
            hosted_zone_id,
            evaluate_target_health,
        } => builder.alias_target(
            r53::AliasTarget::builder()
                .dns_name(dns_name)
                .hosted_zone_id(hosted_zone_id)
                .evaluate_target_health(*evaluate_target_health)
                .build()
                .map_err(invalid)?,
        ),
        RecordTarget::Values(values) => {
            let records = values
                .iter()
                .map(|v| r53::ResourceRecord::builder().value(v).build())
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(invalid)?;
            builder.set_resource_records(Some(records))
        }
    };

    builder.build().map_err(invalid)
}

/// Convert a neutral change batch into the SDK request form
pub fn to_sdk_change_batch(batch: &ChangeBatch) -> Result<r53::ChangeBatch> {
    let changes = batch
        .changes
        .iter()
        .map(|change| {
            let action = match change.action {
                ChangeAction::Upsert => r53::ChangeAction::Upsert,
            };
            r53::Change::builder()
                .action(action)
                .resource_record_set(to_sdk_record_set(&change.record_set)?)
                .build()
                .map_err(|e| Error::Other(format!("cannot build Route 53 change: {}", e)))
        })
        .collect::<Result<Vec<_>>>()?;

    r53::ChangeBatch::builder()
        .set_comment(batch.comment.clone())
        .set_changes(Some(changes))
        .build()
        .map_err(|e| Error::Other(format!("cannot build Route 53 change batch: {}", e)))
}

/// Convert the SDK acknowledgement of a change
pub fn from_sdk_change_info(info: &r53::ChangeInfo) -> ChangeInfo {
    let status = match info.status() {
        r53::ChangeStatus::Insync => ChangeStatus::InSync,
        _ => ChangeStatus::Pending,
    };
    let submitted = info.submitted_at();

    ChangeInfo {
        id: info.id().to_string(),
        status,
        submitted_at: DateTime::<Utc>::from_timestamp(submitted.secs(), submitted.subsec_nanos()),
    }
}
