//! Resource record model
//!
//! [`ResourceRecordSet`] is the provider-neutral view of anything a zone
//! listing can return. [`WeightedRecordVariant`] is the narrower shape the
//! failover logic works with: a set that carries both a set identifier and a
//! weight. A [`RecordPair`] holds the primary and secondary variants matched
//! for one configuration.

use crate::config::RecordType;
use crate::policy::WeightAssignment;
use serde::{Deserialize, Serialize};

/// Where a record set points
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RecordTarget {
    /// Provider-side alias to another resource (no TTL of its own)
    Alias {
        /// DNS name the alias resolves to
        dns_name: String,
        /// Hosted zone of the alias target
        hosted_zone_id: String,
        /// Whether the provider evaluates the target's health
        evaluate_target_health: bool,
    },
    /// Literal record values
    Values(Vec<String>),
}

impl RecordTarget {
    /// Whether this target is an alias
    pub fn is_alias(&self) -> bool {
        matches!(self, RecordTarget::Alias { .. })
    }
}

/// A record set as returned by a provider listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRecordSet {
    /// Fully-qualified name, trailing-dot form
    pub name: String,
    /// Record type as reported by the provider (may be any type, e.g. "MX")
    pub record_type: String,
    /// Set identifier for weighted/latency/failover routing
    pub set_identifier: Option<String>,
    /// Routing weight, present only on weighted sets
    pub weight: Option<u64>,
    /// Time-to-live, absent for alias targets
    pub ttl: Option<i64>,
    /// Alias target or literal values
    pub target: RecordTarget,
    /// Health check associated with the set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub health_check_id: Option<String>,
    /// Traffic policy instance that created the set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub traffic_policy_instance_id: Option<String>,
}

impl ResourceRecordSet {
    /// Whether this set has the given name and type
    ///
    /// DNS names compare case-insensitively, with `\NNN` escapes decoded on
    /// both sides.
    pub fn is_named(&self, name: &str, record_type: RecordType) -> bool {
        unescape_dns_name(&self.name).eq_ignore_ascii_case(&unescape_dns_name(name))
            && self.record_type.eq_ignore_ascii_case(record_type.as_str())
    }
}

/// Decode the `\NNN` octal escapes zone listings use for characters other
/// than letters, digits, hyphen and dot (`*.example.com.` lists as
/// `\052.example.com.`)
pub fn unescape_dns_name(name: &str) -> String {
    let bytes = name.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'\\'
            && let Some(value) = bytes.get(i + 1..i + 4).and_then(octal_byte)
        {
            decoded.push(value);
            i += 4;
        } else {
            decoded.push(bytes[i]);
            i += 1;
        }
    }

    String::from_utf8_lossy(&decoded).into_owned()
}

fn octal_byte(digits: &[u8]) -> Option<u8> {
    digits.iter().try_fold(0u16, |acc, d| match d {
        b'0'..=b'7' => Some(acc * 8 + u16::from(d - b'0')),
        _ => None,
    })
    .and_then(|value| u8::try_from(value).ok())
}

/// A single weighted resource record owned by the provider
///
/// Only `weight` is ever rewritten; identifier, type, TTL, target and the
/// health check / traffic policy associations are carried through unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeightedRecordVariant {
    /// Fully-qualified record name
    pub name: String,
    /// Set identifier distinguishing this variant
    pub identifier: String,
    /// Record type shared with its sibling
    pub record_type: RecordType,
    /// Time-to-live, absent for alias targets
    pub ttl: Option<i64>,
    /// Alias target or literal values
    pub target: RecordTarget,
    /// Weight currently served by the provider
    pub weight: u64,
    /// Health check associated with the variant
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub health_check_id: Option<String>,
    /// Traffic policy instance that created the variant
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub traffic_policy_instance_id: Option<String>,
}

impl WeightedRecordVariant {
    /// Narrow a listed record set to a weighted variant
    ///
    /// Fails when the set has no identifier or no weight, which means it uses
    /// a routing policy this system does not manage.
    pub fn from_record_set(
        set: &ResourceRecordSet,
        record_type: RecordType,
    ) -> Result<Self, crate::Error> {
        let identifier = set.set_identifier.clone().ok_or_else(|| {
            crate::Error::unsupported_record(set.name.clone(), "record set has no set identifier")
        })?;

        let weight = set.weight.ok_or_else(|| {
            crate::Error::unsupported_record(
                identifier.clone(),
                "record set is not weighted (no weight present)",
            )
        })?;

        if let RecordTarget::Values(values) = &set.target
            && values.is_empty()
        {
            return Err(crate::Error::unsupported_record(
                identifier,
                "record set has neither an alias target nor any values",
            ));
        }

        Ok(Self {
            name: set.name.clone(),
            identifier,
            record_type,
            ttl: set.ttl,
            target: set.target.clone(),
            weight,
            health_check_id: set.health_check_id.clone(),
            traffic_policy_instance_id: set.traffic_policy_instance_id.clone(),
        })
    }

    /// Copy of this variant carrying a different weight
    pub fn with_weight(&self, weight: u64) -> Self {
        Self {
            weight,
            ..self.clone()
        }
    }

    /// Provider-neutral record set for this variant
    pub fn to_record_set(&self) -> ResourceRecordSet {
        ResourceRecordSet {
            name: self.name.clone(),
            record_type: self.record_type.as_str().to_string(),
            set_identifier: Some(self.identifier.clone()),
            weight: Some(self.weight),
            ttl: self.ttl,
            target: self.target.clone(),
            health_check_id: self.health_check_id.clone(),
            traffic_policy_instance_id: self.traffic_policy_instance_id.clone(),
        }
    }
}

/// Primary and secondary variants matched for one failover configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordPair {
    /// Variant that serves traffic while healthy
    pub primary: WeightedRecordVariant,
    /// Variant that takes over while unhealthy
    pub secondary: WeightedRecordVariant,
}

impl RecordPair {
    /// Weights the provider currently serves for this pair
    pub fn current_weights(&self) -> WeightAssignment {
        WeightAssignment {
            primary: self.primary.weight,
            secondary: self.secondary.weight,
        }
    }

    /// Copy of this pair with the given weights applied
    pub fn with_weights(&self, weights: WeightAssignment) -> Self {
        Self {
            primary: self.primary.with_weight(weights.primary),
            secondary: self.secondary.with_weight(weights.secondary),
        }
    }
}
