//! Test doubles and common utilities for engine contract tests
//!
//! This module provides an in-memory record store that counts calls and
//! records every write, so tests can assert on exactly what reached the
//! remote side.

#![allow(dead_code)]

use aliasdns_core::codec::{self, AliasRecord};
use aliasdns_core::config::{AliasConfig, EngineConfig, StoreConfig};
use aliasdns_core::error::{Error, Result};
use aliasdns_core::traits::{RecordStore, RecordStoreFactory, TxtRecord};
use aliasdns_core::{AliasEngine, Endpoint, Notice};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

pub const DOMAIN: &str = "example.com";
pub const RECORD_NAME: &str = "_aliases.example.com";
pub const RECORD_ID: &str = "rec-1";
pub const DEFAULT_EMAIL: &str = "catchall@home.example";
pub const SALES: &str = "sales@corp.example";
pub const PERSONAL: &str = "me@home.example";

/// Which verb a write used
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteKind {
    Overwrite,
    Patch,
}

/// In-memory RecordStore that tracks calls
pub struct MemoryRecordStore {
    content: Arc<Mutex<String>>,
    fetch_count: Arc<AtomicUsize>,
    writes: Arc<Mutex<Vec<(WriteKind, String)>>>,
    fail_writes: Arc<AtomicBool>,
    fetch_delay: Option<Duration>,
}

impl MemoryRecordStore {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: Arc::new(Mutex::new(content.into())),
            fetch_count: Arc::new(AtomicUsize::new(0)),
            writes: Arc::new(Mutex::new(Vec::new())),
            fail_writes: Arc::new(AtomicBool::new(false)),
            fetch_delay: None,
        }
    }

    /// Store holding the encoded records
    pub fn with_records(records: &[AliasRecord]) -> Self {
        Self::new(codec::encode(records, DEFAULT_EMAIL))
    }

    /// Sleep inside every fetch, widening the read-to-write window
    pub fn with_fetch_delay(mut self, delay: Duration) -> Self {
        self.fetch_delay = Some(delay);
        self
    }

    /// Create a new store that shares state and counters with an existing one
    pub fn sharing_state_with(other: &Self) -> Self {
        Self {
            content: Arc::clone(&other.content),
            fetch_count: Arc::clone(&other.fetch_count),
            writes: Arc::clone(&other.writes),
            fail_writes: Arc::clone(&other.fail_writes),
            fetch_delay: other.fetch_delay,
        }
    }

    /// Make every following write fail with a transient error
    pub fn fail_writes(&self) {
        self.fail_writes.store(true, Ordering::SeqCst);
    }

    pub fn content(&self) -> String {
        self.content.lock().unwrap().clone()
    }

    pub fn fetch_count(&self) -> usize {
        self.fetch_count.load(Ordering::SeqCst)
    }

    pub fn write_count(&self) -> usize {
        self.writes.lock().unwrap().len()
    }

    pub fn writes(&self) -> Vec<(WriteKind, String)> {
        self.writes.lock().unwrap().clone()
    }

    fn write(&self, kind: WriteKind, record_id: &str, content: &str) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Error::unavailable("memory store is failing writes"));
        }
        if record_id != RECORD_ID {
            return Err(Error::not_found(format!("record {}", record_id)));
        }
        *self.content.lock().unwrap() = content.to_string();
        self.writes
            .lock()
            .unwrap()
            .push((kind, content.to_string()));
        Ok(())
    }
}

#[async_trait::async_trait]
impl RecordStore for MemoryRecordStore {
    async fn fetch(&self) -> Result<TxtRecord> {
        self.fetch_count.fetch_add(1, Ordering::SeqCst);
        let content = self.content();
        if let Some(delay) = self.fetch_delay {
            tokio::time::sleep(delay).await;
        }
        Ok(TxtRecord::new(RECORD_ID, RECORD_NAME, content))
    }

    async fn overwrite(&self, record_id: &str, content: &str) -> Result<()> {
        self.write(WriteKind::Overwrite, record_id, content)
    }

    async fn patch(&self, record_id: &str, content: &str) -> Result<()> {
        self.write(WriteKind::Patch, record_id, content)
    }

    fn record_name(&self) -> &str {
        RECORD_NAME
    }

    fn store_name(&self) -> &'static str {
        "memory"
    }
}

/// Factory handing out stores that share one MemoryRecordStore's state
pub struct MemoryStoreFactory {
    pub seed: MemoryRecordStore,
}

#[async_trait::async_trait]
impl RecordStoreFactory for MemoryStoreFactory {
    async fn create(&self, _config: &AliasConfig) -> Result<Box<dyn RecordStore>> {
        Ok(Box::new(MemoryRecordStore::sharing_state_with(&self.seed)))
    }
}

/// Configuration used by every contract test
///
/// Endpoint 0 is the sales team, endpoint 1 is personal.
pub fn test_config() -> AliasConfig {
    let mut config = AliasConfig::new(
        DOMAIN,
        "_aliases",
        DEFAULT_EMAIL,
        StoreConfig::Custom {
            factory: "memory".to_string(),
            config: serde_json::Value::Null,
        },
    )
    .with_endpoint(Endpoint::new(SALES, "Sales Team").with_legacy_name("corp.example"))
    .with_endpoint(Endpoint::new(PERSONAL, "Personal").with_legacy_name("home-old.example"));
    config.engine = EngineConfig {
        notice_channel_capacity: 64,
    };
    config
}

/// Engine over a store sharing state with `store`
pub fn engine_for(store: &MemoryRecordStore) -> (AliasEngine, mpsc::Receiver<Notice>) {
    AliasEngine::new(
        Box::new(MemoryRecordStore::sharing_state_with(store)),
        &test_config(),
    )
    .expect("engine construction succeeds")
}

/// Collect every notice emitted so far
pub fn drain(rx: &mut mpsc::Receiver<Notice>) -> Vec<Notice> {
    let mut notices = Vec::new();
    while let Ok(notice) = rx.try_recv() {
        notices.push(notice);
    }
    notices
}

pub fn sales(alias: &str) -> AliasRecord {
    AliasRecord::new(alias, SALES)
}

pub fn personal(alias: &str) -> AliasRecord {
    AliasRecord::new(alias, PERSONAL)
}
