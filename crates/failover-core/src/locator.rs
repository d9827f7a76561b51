//! Record locator
//!
//! Finds the primary and secondary weighted variants for a configuration.
//! The zone listing is paginated and ordered by name, type and identifier, so
//! the locator asks for a listing positioned at the configured name/type and
//! keeps paging until the first set with a different name or type, or until
//! the listing runs out. The full candidate set is assembled before any
//! matching happens.

use crate::config::FailoverConfig;
use crate::error::{Error, Result};
use crate::record::{RecordPair, ResourceRecordSet, WeightedRecordVariant};
use crate::traits::{DnsProvider, ListCursor};
use tracing::debug;

/// Resolves a [`RecordPair`] through a provider's read API
pub struct RecordLocator<'a> {
    provider: &'a dyn DnsProvider,
}

impl<'a> RecordLocator<'a> {
    /// Create a locator over the given provider
    pub fn new(provider: &'a dyn DnsProvider) -> Self {
        Self { provider }
    }

    /// Locate the pair described by `config`
    ///
    /// # Errors
    ///
    /// - `RecordNotFound`: either identifier has no matching variant
    /// - `AmbiguousRecord`: an identifier matches more than one variant
    /// - `UnsupportedRecord`: a matched variant is not weighted
    /// - `Provider`: the listing call failed
    pub async fn locate(&self, config: &FailoverConfig) -> Result<RecordPair> {
        let candidates = self.candidates(config).await?;

        debug!(
            "Found {} candidate variant(s) for {} {}",
            candidates.len(),
            config.record_name,
            config.record_type
        );

        let primary = select(&candidates, &config.primary_identifier)?;
        let secondary = select(&candidates, &config.secondary_identifier)?;

        match (primary, secondary) {
            (Some(primary), Some(secondary)) => Ok(RecordPair {
                primary: WeightedRecordVariant::from_record_set(primary, config.record_type)?,
                secondary: WeightedRecordVariant::from_record_set(secondary, config.record_type)?,
            }),
            (primary, secondary) => {
                let mut missing = Vec::new();
                if primary.is_none() {
                    missing.push(config.primary_identifier.clone());
                }
                if secondary.is_none() {
                    missing.push(config.secondary_identifier.clone());
                }
                Err(Error::RecordNotFound {
                    record_name: config.record_name.clone(),
                    missing,
                })
            }
        }
    }

    /// Collect every set with the configured name and type, across pages
    async fn candidates(&self, config: &FailoverConfig) -> Result<Vec<ResourceRecordSet>> {
        let mut candidates = Vec::new();
        let mut cursor = Some(ListCursor::new(&config.record_name, config.record_type));
        let mut pages = 0usize;

        while let Some(current) = cursor.take() {
            let page = self
                .provider
                .list_record_sets(&config.zone_id, &current)
                .await?;
            pages += 1;

            let mut passed_target = false;
            for set in page.record_sets {
                if !set.is_named(&config.record_name, config.record_type) {
                    passed_target = true;
                    break;
                }
                candidates.push(set);
            }

            if passed_target {
                break;
            }

            if let Some(next) = page.next {
                if next == current {
                    return Err(Error::provider(
                        self.provider.provider_name(),
                        "listing returned the same page cursor twice",
                    ));
                }
                cursor = Some(next);
            }
        }

        debug!("Scanned {} listing page(s)", pages);
        Ok(candidates)
    }
}

/// Pick the single candidate carrying `identifier`
fn select<'s>(
    candidates: &'s [ResourceRecordSet],
    identifier: &str,
) -> Result<Option<&'s ResourceRecordSet>> {
    let mut matches = candidates
        .iter()
        .filter(|set| set.set_identifier.as_deref() == Some(identifier));

    let first = matches.next();
    let extra = matches.count();
    if extra > 0 {
        return Err(Error::AmbiguousRecord {
            identifier: identifier.to_string(),
            count: extra + 1,
        });
    }

    Ok(first)
}
