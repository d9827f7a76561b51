//! Core traits for the failover system
//!
//! - [`DnsProvider`]: Read and atomically rewrite record sets in a hosted zone

pub mod dns_provider;

pub use dns_provider::{
    Change, ChangeAction, ChangeBatch, ChangeInfo, ChangeStatus, DnsProvider, ListCursor,
    RecordSetPage,
};
