//! Configuration types for the failover system
//!
//! A [`FailoverConfig`] describes one primary/secondary pair of weighted
//! records. It is loaded once at process start and handed to the engine by
//! value; nothing in this crate reads the environment on its own.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::warn;

/// Environment variable holding the hosted zone ID
pub const ENV_HOSTED_ZONE_ID: &str = "HOSTED_ZONE_ID";
/// Environment variable holding the record set name
pub const ENV_RECORD_SET_NAME: &str = "RECORD_SET_NAME";
/// Environment variable holding the primary set identifier
pub const ENV_PRIMARY_IDENTIFIER: &str = "PRIMARY_IDENTIFIER";
/// Environment variable holding the secondary set identifier
pub const ENV_SECONDARY_IDENTIFIER: &str = "SECONDARY_IDENTIFIER";
/// Environment variable holding the record type (optional, default `A`)
pub const ENV_RECORD_TYPE: &str = "RECORD_TYPE";

const REQUIRED_VARS: [&str; 4] = [
    ENV_HOSTED_ZONE_ID,
    ENV_RECORD_SET_NAME,
    ENV_PRIMARY_IDENTIFIER,
    ENV_SECONDARY_IDENTIFIER,
];

/// Static configuration for one failover pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailoverConfig {
    /// Hosted zone that contains both weighted variants
    pub zone_id: String,

    /// Fully-qualified record name, trailing-dot form (e.g. "app.example.com.")
    pub record_name: String,

    /// Record type shared by both variants
    #[serde(default)]
    pub record_type: RecordType,

    /// Set identifier of the variant that serves traffic while healthy
    pub primary_identifier: String,

    /// Set identifier of the variant that takes over while unhealthy
    pub secondary_identifier: String,
}

impl FailoverConfig {
    /// Create a new configuration
    ///
    /// The record name is normalised to trailing-dot form.
    pub fn new(
        zone_id: impl Into<String>,
        record_name: impl Into<String>,
        primary_identifier: impl Into<String>,
        secondary_identifier: impl Into<String>,
    ) -> Self {
        Self {
            zone_id: zone_id.into(),
            record_name: normalize_record_name(record_name.into()),
            record_type: RecordType::default(),
            primary_identifier: primary_identifier.into(),
            secondary_identifier: secondary_identifier.into(),
        }
    }

    /// Set the record type
    pub fn with_record_type(mut self, record_type: RecordType) -> Self {
        self.record_type = record_type;
        self
    }

    /// Load configuration from the process environment
    pub fn from_env() -> Result<Self, crate::Error> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup
    ///
    /// Every missing required key is reported in a single error. Empty values
    /// count as missing.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, crate::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let missing: Vec<&str> = REQUIRED_VARS
            .iter()
            .copied()
            .filter(|key| get(*key).is_none())
            .collect();

        if !missing.is_empty() {
            return Err(crate::Error::config(format!(
                "Missing required environment variables: {}",
                missing.join(", ")
            )));
        }

        let record_type = match get(ENV_RECORD_TYPE) {
            Some(raw) => raw.parse()?,
            None => RecordType::default(),
        };

        let config = Self {
            zone_id: get(ENV_HOSTED_ZONE_ID).unwrap_or_default(),
            record_name: normalize_record_name(get(ENV_RECORD_SET_NAME).unwrap_or_default()),
            record_type,
            primary_identifier: get(ENV_PRIMARY_IDENTIFIER).unwrap_or_default(),
            secondary_identifier: get(ENV_SECONDARY_IDENTIFIER).unwrap_or_default(),
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.zone_id.trim().is_empty() {
            return Err(crate::Error::config("Hosted zone ID cannot be empty"));
        }

        if self.record_name.trim().is_empty() || self.record_name == "." {
            return Err(crate::Error::config("Record set name cannot be empty"));
        }

        if !self.record_name.ends_with('.') {
            return Err(crate::Error::config(format!(
                "Record set name '{}' must be fully qualified (trailing dot)",
                self.record_name
            )));
        }

        if self.primary_identifier.is_empty() {
            return Err(crate::Error::config("Primary identifier cannot be empty"));
        }

        if self.secondary_identifier.is_empty() {
            return Err(crate::Error::config("Secondary identifier cannot be empty"));
        }

        if self.primary_identifier == self.secondary_identifier {
            return Err(crate::Error::config(format!(
                "Primary and secondary identifiers must differ (both are '{}')",
                self.primary_identifier
            )));
        }

        Ok(())
    }
}

/// Append the trailing dot a fully-qualified name needs, warning when it was absent
fn normalize_record_name(name: String) -> String {
    let name = name.trim().to_string();
    if name.is_empty() || name.ends_with('.') {
        return name;
    }

    warn!("Record set name '{}' does not end with a dot, appending one", name);
    format!("{}.", name)
}

/// DNS record type of the weighted pair
///
/// Alias records carry one of these types too; whether a variant is an alias
/// is decided by its target, not by its type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RecordType {
    /// A record (IPv4)
    #[default]
    A,
    /// AAAA record (IPv6)
    Aaaa,
    /// CNAME record
    Cname,
}

impl RecordType {
    /// Wire representation of the type
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordType::A => "A",
            RecordType::Aaaa => "AAAA",
            RecordType::Cname => "CNAME",
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecordType {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "A" => Ok(RecordType::A),
            "AAAA" => Ok(RecordType::Aaaa),
            "CNAME" => Ok(RecordType::Cname),
            "ALIAS" => Err(crate::Error::config(
                "RECORD_TYPE 'ALIAS' is not a record type; \
                 set the alias record's underlying type (A, AAAA or CNAME)",
            )),
            other => Err(crate::Error::config(format!(
                "RECORD_TYPE '{}' is not supported. Supported types: A, AAAA, CNAME",
                other
            ))),
        }
    }
}
