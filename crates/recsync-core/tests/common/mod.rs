//! Test doubles and common utilities for contract tests
//!
//! This module provides call-counting collaborators that let tests verify
//! exactly which provider calls a sync cycle makes.

#![allow(dead_code)]

use recsync_core::error::{Error, Result};
use recsync_core::traits::{IpSource, RateLimit, RecordListing, RecordStore, RemoteRecord};
use recsync_core::{SyncPolicy, SyncTarget, Syncer, SyncerConfig};
use std::collections::VecDeque;
use std::net::IpAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const DOMAIN: &str = "example.com";
pub const RECORD_ID: u64 = 3352896;

/// A store call, in the order it was made
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCall {
    List { domain: String },
    Edit { domain: String, record_id: u64, data: String },
}

/// How the mock answers `edit_record`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditBehavior {
    /// Accept the write and apply it to the remote records
    Succeed,
    /// Reject with a provider response that carries quota headers
    Reject,
    /// Fail before any response arrives
    ConnectionFailure,
}

/// A mock RecordStore backed by an in-memory record list
pub struct MockRecordStore {
    /// Remote records, mutated by successful edits
    records: Arc<Mutex<Vec<RemoteRecord>>>,
    /// Every call, in order
    calls: Arc<Mutex<Vec<StoreCall>>>,
    /// Call counter for list_records()
    list_call_count: Arc<AtomicUsize>,
    /// Call counter for edit_record()
    edit_call_count: Arc<AtomicUsize>,
    /// Whether list_records() fails
    fail_list: Arc<Mutex<bool>>,
    /// How edit_record() answers
    edit_behavior: Arc<Mutex<EditBehavior>>,
}

impl MockRecordStore {
    pub fn new(records: Vec<RemoteRecord>) -> Self {
        Self {
            records: Arc::new(Mutex::new(records)),
            calls: Arc::new(Mutex::new(Vec::new())),
            list_call_count: Arc::new(AtomicUsize::new(0)),
            edit_call_count: Arc::new(AtomicUsize::new(0)),
            fail_list: Arc::new(Mutex::new(false)),
            edit_behavior: Arc::new(Mutex::new(EditBehavior::Succeed)),
        }
    }

    /// A store holding the managed A record with `data` plus some neighbours
    pub fn with_a_record(data: &str) -> Self {
        Self::new(vec![
            RemoteRecord::new(1, "NS", "@", "ns1.digitalocean.com"),
            RemoteRecord::new(2, "A", "www", "9.9.9.9"),
            RemoteRecord::new(RECORD_ID, "A", "@", data),
        ])
    }

    /// Create a new MockRecordStore that shares state with an existing one
    pub fn sharing_counters_with(other: &Self) -> Self {
        Self {
            records: Arc::clone(&other.records),
            calls: Arc::clone(&other.calls),
            list_call_count: Arc::clone(&other.list_call_count),
            edit_call_count: Arc::clone(&other.edit_call_count),
            fail_list: Arc::clone(&other.fail_list),
            edit_behavior: Arc::clone(&other.edit_behavior),
        }
    }

    /// Get the number of times list_records() was called
    pub fn list_call_count(&self) -> usize {
        self.list_call_count.load(Ordering::SeqCst)
    }

    /// Get the number of times edit_record() was called
    pub fn edit_call_count(&self) -> usize {
        self.edit_call_count.load(Ordering::SeqCst)
    }

    /// Get every call made so far
    pub fn calls(&self) -> Vec<StoreCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Make list_records() fail (or succeed again)
    pub fn set_fail_list(&self, fail: bool) {
        *self.fail_list.lock().unwrap() = fail;
    }

    /// Change how edit_record() answers
    pub fn set_edit_behavior(&self, behavior: EditBehavior) {
        *self.edit_behavior.lock().unwrap() = behavior;
    }

    /// Change a remote record behind the syncer's back
    pub fn set_remote_data(&self, record_id: u64, data: &str) {
        let mut records = self.records.lock().unwrap();
        if let Some(record) = records.iter_mut().find(|r| r.id == record_id) {
            record.data = data.to_string();
        }
    }

    /// Current remote value of a record
    pub fn remote_data(&self, record_id: u64) -> Option<String> {
        self.records
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.id == record_id)
            .map(|r| r.data.clone())
    }
}

/// Quota reported by successful mock responses
pub fn ok_rate_limit() -> RateLimit {
    RateLimit {
        limit: 5000,
        remaining: 4321,
        reset: None,
    }
}

/// Quota reported by rejected mock responses
pub fn exhausted_rate_limit() -> RateLimit {
    RateLimit {
        limit: 5000,
        remaining: 0,
        reset: None,
    }
}

#[async_trait::async_trait]
impl RecordStore for MockRecordStore {
    async fn list_records(&self, domain: &str) -> Result<RecordListing> {
        self.list_call_count.fetch_add(1, Ordering::SeqCst);
        self.calls.lock().unwrap().push(StoreCall::List {
            domain: domain.to_string(),
        });

        if *self.fail_list.lock().unwrap() {
            return Err(Error::transport("GET records: connection reset"));
        }

        Ok(RecordListing {
            records: self.records.lock().unwrap().clone(),
            rate_limit: Some(ok_rate_limit()),
        })
    }

    async fn edit_record(&self, domain: &str, record_id: u64, data: &str) -> Result<RateLimit> {
        self.edit_call_count.fetch_add(1, Ordering::SeqCst);
        self.calls.lock().unwrap().push(StoreCall::Edit {
            domain: domain.to_string(),
            record_id,
            data: data.to_string(),
        });

        let behavior = *self.edit_behavior.lock().unwrap();
        match behavior {
            EditBehavior::Succeed => {
                self.set_remote_data(record_id, data);
                Ok(ok_rate_limit())
            }
            EditBehavior::Reject => Err(Error::transport("PUT record: 429 Too Many Requests")
                .with_rate_limit(Some(exhausted_rate_limit()))),
            EditBehavior::ConnectionFailure => {
                Err(Error::transport("PUT record: connection refused"))
            }
        }
    }

    fn store_name(&self) -> &'static str {
        "mock"
    }
}

/// An IpSource that answers from a script, repeating the last answer
pub struct ScriptedIpSource {
    /// Remaining answers
    script: Mutex<VecDeque<std::result::Result<IpAddr, String>>>,
    /// Answer once the script runs out
    last: Mutex<std::result::Result<IpAddr, String>>,
    /// Call counter for current()
    call_count: Arc<AtomicUsize>,
}

impl ScriptedIpSource {
    pub fn new(script: Vec<std::result::Result<IpAddr, String>>) -> Self {
        let last = script
            .last()
            .cloned()
            .unwrap_or_else(|| Err("empty script".to_string()));

        Self {
            script: Mutex::new(script.into()),
            last: Mutex::new(last),
            call_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Always answer `ip`
    pub fn fixed(ip: IpAddr) -> Self {
        Self::new(vec![Ok(ip)])
    }

    /// Shared handle to the call counter
    pub fn call_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.call_count)
    }
}

#[async_trait::async_trait]
impl IpSource for ScriptedIpSource {
    async fn current(&self) -> Result<IpAddr> {
        self.call_count.fetch_add(1, Ordering::SeqCst);

        let answer = match self.script.lock().unwrap().pop_front() {
            Some(answer) => answer,
            None => self.last.lock().unwrap().clone(),
        };

        answer.map_err(Error::transport)
    }

    fn source_name(&self) -> &'static str {
        "scripted"
    }
}

/// Helper to create the managed target
pub fn apex_a_target() -> SyncTarget {
    SyncTarget::new(DOMAIN, "A", "@")
}

/// Helper to build a syncer over a mock store sharing counters with `store`
pub fn syncer_over(store: &MockRecordStore, refresh_interval: Duration) -> Syncer {
    let config = SyncerConfig::new(apex_a_target()).with_policy(SyncPolicy::new(refresh_interval));
    Syncer::new(config, Box::new(MockRecordStore::sharing_counters_with(store)))
        .expect("syncer construction succeeds")
}
