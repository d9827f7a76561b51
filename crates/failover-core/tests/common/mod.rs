//! Test doubles and common utilities for contract tests
//!
//! `MockZone` is an in-memory hosted zone that behaves like a paginated,
//! ordered provider listing and applies UPSERT batches atomically. It counts
//! every call so tests can assert on provider traffic.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::Utc;
use failover_core::error::{Error, Result};
use failover_core::record::{RecordTarget, ResourceRecordSet};
use failover_core::traits::{
    ChangeAction, ChangeBatch, ChangeInfo, ChangeStatus, DnsProvider, ListCursor, RecordSetPage,
};
use failover_core::{FailoverConfig, FailoverEngine};
use serde_json::{Value, json};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub const ZONE_ID: &str = "Z1234567890ABC";
pub const RECORD_NAME: &str = "example.com.";

/// In-memory zone implementing `DnsProvider`
pub struct MockZone {
    /// Record sets, kept in listing order
    records: Mutex<Vec<ResourceRecordSet>>,
    /// Sets returned per listing page
    page_size: usize,
    /// Call counter for list_record_sets()
    list_call_count: AtomicUsize,
    /// Call counter for change_record_sets()
    change_call_count: AtomicUsize,
    /// Every batch submitted, accepted or not
    submitted: Mutex<Vec<ChangeBatch>>,
    /// When set, change_record_sets() rejects with this message
    reject_with: Mutex<Option<String>>,
    /// When set, list_record_sets() fails with this message
    fail_listing_with: Mutex<Option<String>>,
}

impl MockZone {
    pub fn new(records: Vec<ResourceRecordSet>) -> Arc<Self> {
        Self::with_page_size(records, 100)
    }

    pub fn with_page_size(mut records: Vec<ResourceRecordSet>, page_size: usize) -> Arc<Self> {
        records.sort_by(|a, b| sort_key(a).cmp(&sort_key(b)));
        Arc::new(Self {
            records: Mutex::new(records),
            page_size,
            list_call_count: AtomicUsize::new(0),
            change_call_count: AtomicUsize::new(0),
            submitted: Mutex::new(Vec::new()),
            reject_with: Mutex::new(None),
            fail_listing_with: Mutex::new(None),
        })
    }

    /// Get the number of times list_record_sets() was called
    pub fn list_call_count(&self) -> usize {
        self.list_call_count.load(Ordering::SeqCst)
    }

    /// Get the number of times change_record_sets() was called
    pub fn change_call_count(&self) -> usize {
        self.change_call_count.load(Ordering::SeqCst)
    }

    /// Total provider calls of any kind
    pub fn total_call_count(&self) -> usize {
        self.list_call_count() + self.change_call_count()
    }

    /// Batches submitted so far
    pub fn submitted(&self) -> Vec<ChangeBatch> {
        self.submitted.lock().unwrap().clone()
    }

    /// Snapshot of the zone contents
    pub fn records(&self) -> Vec<ResourceRecordSet> {
        self.records.lock().unwrap().clone()
    }

    /// Find a set by identifier under the default name
    pub fn variant(&self, identifier: &str) -> Option<ResourceRecordSet> {
        self.records()
            .into_iter()
            .find(|s| s.name == RECORD_NAME && s.set_identifier.as_deref() == Some(identifier))
    }

    /// Current (primary, secondary) weights under the default name
    pub fn weights(&self) -> (Option<u64>, Option<u64>) {
        (
            self.variant("primary").and_then(|s| s.weight),
            self.variant("secondary").and_then(|s| s.weight),
        )
    }

    pub fn reject_changes(&self, message: &str) {
        *self.reject_with.lock().unwrap() = Some(message.to_string());
    }

    pub fn fail_listing(&self, message: &str) {
        *self.fail_listing_with.lock().unwrap() = Some(message.to_string());
    }
}

fn sort_key(set: &ResourceRecordSet) -> (String, String, String) {
    (
        set.name.to_ascii_lowercase(),
        set.record_type.clone(),
        set.set_identifier.clone().unwrap_or_default(),
    )
}

fn cursor_key(cursor: &ListCursor) -> (String, String, String) {
    (
        cursor.name.to_ascii_lowercase(),
        cursor.record_type.clone(),
        cursor.identifier.clone().unwrap_or_default(),
    )
}

#[async_trait]
impl DnsProvider for MockZone {
    async fn list_record_sets(&self, zone_id: &str, cursor: &ListCursor) -> Result<RecordSetPage> {
        self.list_call_count.fetch_add(1, Ordering::SeqCst);
        assert_eq!(zone_id, ZONE_ID, "listing must target the configured zone");

        if let Some(message) = self.fail_listing_with.lock().unwrap().clone() {
            return Err(Error::provider("mock", message));
        }

        let records = self.records.lock().unwrap();
        let start = cursor_key(cursor);
        let first = records
            .iter()
            .position(|s| sort_key(s) >= start)
            .unwrap_or(records.len());

        let end = (first + self.page_size).min(records.len());
        let next = records.get(end).map(|s| ListCursor {
            name: s.name.clone(),
            record_type: s.record_type.clone(),
            identifier: s.set_identifier.clone(),
        });

        Ok(RecordSetPage {
            record_sets: records[first..end].to_vec(),
            next,
        })
    }

    async fn change_record_sets(&self, zone_id: &str, batch: &ChangeBatch) -> Result<ChangeInfo> {
        let n = self.change_call_count.fetch_add(1, Ordering::SeqCst) + 1;
        assert_eq!(zone_id, ZONE_ID, "change must target the configured zone");
        self.submitted.lock().unwrap().push(batch.clone());

        if let Some(message) = self.reject_with.lock().unwrap().clone() {
            return Err(Error::provider_rejected("mock", message));
        }

        let mut records = self.records.lock().unwrap();
        for change in &batch.changes {
            assert_eq!(change.action, ChangeAction::Upsert);
            let key = sort_key(&change.record_set);
            match records.iter_mut().find(|s| sort_key(s) == key) {
                Some(existing) => *existing = change.record_set.clone(),
                None => records.push(change.record_set.clone()),
            }
        }
        records.sort_by(|a, b| sort_key(a).cmp(&sort_key(b)));

        Ok(ChangeInfo {
            id: format!("/change/C{:04}", n),
            status: ChangeStatus::Pending,
            submitted_at: Some(Utc::now()),
        })
    }

    fn provider_name(&self) -> &'static str {
        "mock"
    }
}

/// Weighted alias variant under the default name
pub fn alias_variant(identifier: &str, weight: u64) -> ResourceRecordSet {
    ResourceRecordSet {
        name: RECORD_NAME.to_string(),
        record_type: "A".to_string(),
        set_identifier: Some(identifier.to_string()),
        weight: Some(weight),
        ttl: None,
        target: RecordTarget::Alias {
            dns_name: format!("{}-lb.us-east-1.elb.amazonaws.com.", identifier),
            hosted_zone_id: "Z35SXDOTRQ7X7K".to_string(),
            evaluate_target_health: identifier == "primary",
        },
        health_check_id: None,
        traffic_policy_instance_id: None,
    }
}

/// Weighted literal variant under the default name
pub fn value_variant(identifier: &str, weight: u64, ttl: i64, values: &[&str]) -> ResourceRecordSet {
    ResourceRecordSet {
        name: RECORD_NAME.to_string(),
        record_type: "A".to_string(),
        set_identifier: Some(identifier.to_string()),
        weight: Some(weight),
        ttl: Some(ttl),
        target: RecordTarget::Values(values.iter().map(|v| v.to_string()).collect()),
        health_check_id: None,
        traffic_policy_instance_id: None,
    }
}

/// A non-weighted set under another name
pub fn unrelated_set(name: &str) -> ResourceRecordSet {
    ResourceRecordSet {
        name: name.to_string(),
        record_type: "A".to_string(),
        set_identifier: None,
        weight: None,
        ttl: Some(300),
        target: RecordTarget::Values(vec!["203.0.113.9".to_string()]),
        health_check_id: None,
        traffic_policy_instance_id: None,
    }
}

/// A zone with a primary/secondary alias pair at the given weights
pub fn zone_with_weights(primary: u64, secondary: u64) -> Arc<MockZone> {
    MockZone::new(vec![
        alias_variant("primary", primary),
        alias_variant("secondary", secondary),
        unrelated_set("www.example.com."),
    ])
}

/// Default configuration for the pair
pub fn test_config() -> FailoverConfig {
    FailoverConfig::new(ZONE_ID, RECORD_NAME, "primary", "secondary")
}

/// Engine over the given zone with the default configuration
pub fn engine_for(zone: &Arc<MockZone>) -> FailoverEngine {
    FailoverEngine::new(zone.clone(), test_config()).expect("engine construction succeeds")
}

/// Notification envelope carrying an alarm transition into `state`
pub fn notification(state: &str) -> Value {
    json!({
        "Records": [{
            "EventSource": "aws:sns",
            "Sns": {
                "Type": "Notification",
                "Timestamp": "2024-05-01T10:00:05.000Z",
                "Message": json!({
                    "AlarmName": "example-health",
                    "NewStateValue": state,
                    "NewStateReason": "Threshold Crossed",
                    "StateChangeTime": "2024-05-01T10:00:00.000+0000",
                }).to_string(),
            }
        }]
    })
}
