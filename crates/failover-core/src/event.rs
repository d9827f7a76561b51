//! Event interpreter
//!
//! Turns a raw notification into a [`HealthEvent`]. The notification is two
//! independent serialization layers: an outer delivery envelope whose
//! `Records[0].Sns.Message` is itself a JSON document describing the alarm.
//! Each layer is decoded by its own typed step so that a broken envelope and
//! a broken alarm document fail with different [`MalformedEvent`] kinds.
//!
//! ```text
//! { "Records": [ { "Sns": { "Message": "{\"NewStateValue\":\"ALARM\", ...}" } } ] }
//! ```

use crate::error::{Error, MalformedEvent, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use tracing::{debug, warn};

/// Alarm state literal for an unhealthy target
pub const STATE_ALARM: &str = "ALARM";
/// Alarm state literal for a healthy target
pub const STATE_OK: &str = "OK";
/// Alarm state literal for missing data
pub const STATE_INSUFFICIENT_DATA: &str = "INSUFFICIENT_DATA";

/// Outer delivery envelope
#[derive(Debug, Clone, Deserialize)]
pub struct NotificationEnvelope {
    /// Delivered notifications; only the first is interpreted
    #[serde(rename = "Records")]
    pub records: Vec<EnvelopeRecord>,
}

/// One delivered notification
#[derive(Debug, Clone, Deserialize)]
pub struct EnvelopeRecord {
    /// Topic message
    #[serde(rename = "Sns")]
    pub sns: TopicMessage,
}

/// Topic message carrying the alarm document as text
#[derive(Debug, Clone, Deserialize)]
pub struct TopicMessage {
    /// Serialized alarm document
    #[serde(rename = "Message")]
    pub message: Option<String>,

    /// Publish time of the message (RFC 3339)
    #[serde(rename = "Timestamp", default)]
    pub timestamp: Option<String>,
}

/// Inner alarm-state document
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AlarmDocument {
    /// Alarm name
    #[serde(rename = "AlarmName", default)]
    pub alarm_name: Option<String>,

    /// State the alarm moved into
    #[serde(rename = "NewStateValue", default)]
    pub new_state_value: Option<String>,

    /// Human-readable reason for the transition
    #[serde(rename = "NewStateReason", default)]
    pub new_state_reason: Option<String>,

    /// When the transition happened, e.g. "2024-01-01T12:00:00.000+0000"
    #[serde(rename = "StateChangeTime", default)]
    pub state_change_time: Option<String>,
}

/// Normalized health state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthState {
    /// Primary target is healthy
    Healthy,
    /// Primary target is unhealthy
    Unhealthy,
    /// No actionable information
    Indeterminate,
}

impl HealthState {
    /// Map an alarm state literal to a health state
    ///
    /// Only exact literals are recognised; anything else is indeterminate.
    pub fn from_alarm_state(value: &str) -> Self {
        match value {
            STATE_ALARM => HealthState::Unhealthy,
            STATE_OK => HealthState::Healthy,
            _ => HealthState::Indeterminate,
        }
    }
}

impl fmt::Display for HealthState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            HealthState::Healthy => "healthy",
            HealthState::Unhealthy => "unhealthy",
            HealthState::Indeterminate => "indeterminate",
        };
        f.write_str(s)
    }
}

/// Health signal extracted from one notification
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthEvent {
    /// Normalized state
    pub state: HealthState,
    /// State literal exactly as received
    pub raw_state: String,
    /// When the source observed the transition, if known
    pub source_timestamp: Option<DateTime<Utc>>,
    /// Alarm name, for diagnostics
    pub alarm_name: Option<String>,
    /// Transition reason, for diagnostics
    pub reason: Option<String>,
}

impl HealthEvent {
    /// Interpret a notification given as JSON text
    pub fn from_json_str(raw: &str) -> Result<Self> {
        let payload: Value = serde_json::from_str(raw)
            .map_err(|e| Error::malformed_envelope(format!("not valid JSON: {}", e)))?;
        Self::from_value(payload)
    }

    /// Interpret an already-decoded notification
    pub fn from_value(payload: Value) -> Result<Self> {
        let envelope = parse_envelope(payload)?;

        if envelope.records.len() > 1 {
            warn!(
                "Notification carries {} records, interpreting only the first",
                envelope.records.len()
            );
        }

        let sns = envelope
            .records
            .into_iter()
            .next()
            .map(|record| record.sns)
            .ok_or_else(|| Error::malformed_envelope("'Records' is empty"))?;

        let message = sns
            .message
            .filter(|m| !m.is_empty())
            .ok_or_else(|| Error::malformed_envelope("record is missing 'Sns.Message'"))?;

        let document = parse_alarm_document(&message)?;

        let raw_state = document
            .new_state_value
            .filter(|s| !s.is_empty())
            .ok_or(MalformedEvent::MissingState)?;

        let state = HealthState::from_alarm_state(&raw_state);
        if state == HealthState::Indeterminate && raw_state != STATE_INSUFFICIENT_DATA {
            warn!("Unexpected alarm state '{}', treating as indeterminate", raw_state);
        }

        let source_timestamp = document
            .state_change_time
            .as_deref()
            .and_then(parse_timestamp)
            .or_else(|| sns.timestamp.as_deref().and_then(parse_timestamp));

        Ok(Self {
            state,
            raw_state,
            source_timestamp,
            alarm_name: document.alarm_name,
            reason: document.new_state_reason,
        })
    }

    /// Whether this event can lead to a weight change
    pub fn is_actionable(&self) -> bool {
        self.state != HealthState::Indeterminate
    }
}

/// Decode the outer envelope layer
pub fn parse_envelope(payload: Value) -> Result<NotificationEnvelope> {
    serde_json::from_value(payload).map_err(|e| Error::malformed_envelope(e.to_string()))
}

/// Decode the inner alarm document layer
pub fn parse_alarm_document(message: &str) -> Result<AlarmDocument> {
    serde_json::from_str(message).map_err(|e| Error::malformed_document(e.to_string()))
}

/// Parse the timestamp formats alarm notifications use
///
/// Unparseable timestamps are dropped; they are diagnostic only.
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .or_else(|_| DateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f%z"))
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| debug!("Ignoring unparseable timestamp '{}': {}", raw, e))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn notification(document: Value) -> Value {
        json!({
            "Records": [
                { "Sns": { "Message": document.to_string() } }
            ]
        })
    }

    #[test]
    fn alarm_maps_to_unhealthy() {
        let event = HealthEvent::from_value(notification(json!({
            "AlarmName": "test-alarm",
            "NewStateValue": "ALARM",
            "NewStateReason": "Threshold Crossed",
        })))
        .unwrap();

        assert_eq!(event.state, HealthState::Unhealthy);
        assert_eq!(event.raw_state, "ALARM");
        assert_eq!(event.alarm_name.as_deref(), Some("test-alarm"));
        assert_eq!(event.reason.as_deref(), Some("Threshold Crossed"));
        assert!(event.is_actionable());
    }

    #[test]
    fn ok_maps_to_healthy() {
        let event =
            HealthEvent::from_value(notification(json!({ "NewStateValue": "OK" }))).unwrap();
        assert_eq!(event.state, HealthState::Healthy);
    }

    #[test]
    fn insufficient_data_is_indeterminate() {
        let event = HealthEvent::from_value(notification(json!({
            "NewStateValue": "INSUFFICIENT_DATA"
        })))
        .unwrap();
        assert_eq!(event.state, HealthState::Indeterminate);
        assert!(!event.is_actionable());
    }

    #[test]
    fn unknown_and_differently_cased_states_are_indeterminate() {
        for raw in ["PENDING", "alarm", "Ok"] {
            let event =
                HealthEvent::from_value(notification(json!({ "NewStateValue": raw }))).unwrap();
            assert_eq!(event.state, HealthState::Indeterminate, "{}", raw);
            assert_eq!(event.raw_state, raw);
        }
    }

    #[test]
    fn missing_records_is_envelope_error() {
        let err = HealthEvent::from_value(json!({})).unwrap_err();
        assert!(matches!(
            err,
            Error::MalformedEvent(MalformedEvent::Envelope(_))
        ));
    }

    #[test]
    fn empty_records_is_envelope_error() {
        let err = HealthEvent::from_value(json!({ "Records": [] })).unwrap_err();
        assert!(matches!(
            err,
            Error::MalformedEvent(MalformedEvent::Envelope(_))
        ));
    }

    #[test]
    fn missing_sns_or_message_is_envelope_error() {
        for payload in [
            json!({ "Records": [{}] }),
            json!({ "Records": [{ "Sns": {} }] }),
            json!({ "Records": [{ "Sns": { "Message": "" } }] }),
        ] {
            let err = HealthEvent::from_value(payload.clone()).unwrap_err();
            assert!(
                matches!(err, Error::MalformedEvent(MalformedEvent::Envelope(_))),
                "{}",
                payload
            );
        }
    }

    #[test]
    fn non_json_message_is_document_error() {
        let err = HealthEvent::from_value(json!({
            "Records": [{ "Sns": { "Message": "not-json" } }]
        }))
        .unwrap_err();
        assert!(matches!(
            err,
            Error::MalformedEvent(MalformedEvent::Document(_))
        ));
    }

    #[test]
    fn missing_or_empty_state_is_missing_state() {
        for document in [json!({ "AlarmName": "test" }), json!({ "NewStateValue": "" })] {
            let err = HealthEvent::from_value(notification(document)).unwrap_err();
            assert!(matches!(
                err,
                Error::MalformedEvent(MalformedEvent::MissingState)
            ));
        }
    }

    #[test]
    fn invalid_outer_text_is_envelope_error() {
        let err = HealthEvent::from_json_str("{ nope").unwrap_err();
        assert!(matches!(
            err,
            Error::MalformedEvent(MalformedEvent::Envelope(_))
        ));
    }

    #[test]
    fn parses_state_change_time() {
        let event = HealthEvent::from_value(notification(json!({
            "NewStateValue": "ALARM",
            "StateChangeTime": "2024-03-01T12:30:45.123+0000",
        })))
        .unwrap();

        let ts = event.source_timestamp.unwrap();
        assert_eq!(ts.to_rfc3339(), "2024-03-01T12:30:45.123+00:00");
    }

    #[test]
    fn falls_back_to_envelope_timestamp() {
        let payload = json!({
            "Records": [{
                "Sns": {
                    "Message": json!({ "NewStateValue": "OK" }).to_string(),
                    "Timestamp": "2024-03-01T12:31:00.000Z",
                }
            }]
        });

        let event = HealthEvent::from_value(payload).unwrap();
        assert!(event.source_timestamp.is_some());
    }

    #[test]
    fn unparseable_timestamp_is_dropped() {
        let event = HealthEvent::from_value(notification(json!({
            "NewStateValue": "OK",
            "StateChangeTime": "yesterday",
        })))
        .unwrap();
        assert_eq!(event.source_timestamp, None);
    }

    #[test]
    fn only_first_record_is_interpreted() {
        let payload = json!({
            "Records": [
                { "Sns": { "Message": json!({ "NewStateValue": "OK" }).to_string() } },
                { "Sns": { "Message": json!({ "NewStateValue": "ALARM" }).to_string() } },
            ]
        });

        let event = HealthEvent::from_value(payload).unwrap();
        assert_eq!(event.state, HealthState::Healthy);
    }
}
