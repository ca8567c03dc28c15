//! Alias CRUD engine
//!
//! The AliasEngine is responsible for:
//! - Reading the TXT record through a RecordStore
//! - Decoding it into a Directory
//! - Applying one change
//! - Writing the re-encoded content back
//! - Emitting notices for the caller
//!
//! ## Architecture
//!
//! ```text
//!   caller ──► AliasEngine ──► RecordStore::fetch
//!                   │
//!                   ▼
//!              Directory (decode → mutate → encode)
//!                   │
//!                   ▼
//!              RecordStore::overwrite / patch ──► Notice channel
//! ```
//!
//! ## Concurrency
//!
//! The store offers no conditional writes, so two overlapping
//! read-modify-write cycles would lose one of the changes. Every mutating
//! operation holds the engine's write lock from fetch to write; callers that
//! share one engine are therefore serialized. Positions handed out by
//! [`AliasEngine::list_aliases`] can still go stale between calls, which is
//! what [`EntryRef::expecting`] guards against.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use tokio::sync::{Mutex, mpsc};
use tracing::{debug, error, info};

use crate::catalog::{EndpointCatalog, EndpointId};
use crate::codec::{self, AliasRecord};
use crate::config::AliasConfig;
use crate::directory::Directory;
use crate::error::{Error, Result};
use crate::import;
use crate::traits::{RecordStore, TxtRecord};

/// Notices emitted by the AliasEngine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// Alias written to the record
    Added { alias: String, email: String },

    /// Alias skipped because it is already stored
    AlreadyPresent { alias: String },

    /// Alias at a position replaced
    Changed { previous: String, current: String },

    /// Alias removed
    Deleted { alias: String },

    /// The record was rewritten; listings taken before are stale
    DirectoryChanged { len: usize },

    /// An operation failed
    Failed {
        operation: &'static str,
        error: String,
    },
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::Added { alias, email } => write!(f, "Added alias {} to {}", alias, email),
            Notice::AlreadyPresent { alias } => write!(f, "Alias {} was already present!", alias),
            Notice::Changed { previous, current } => {
                write!(f, "Changed alias {} to {}", previous, current)
            }
            Notice::Deleted { alias } => write!(f, "Deleted alias {}", alias),
            Notice::DirectoryChanged { len } => write!(f, "Directory now holds {} alias(es)", len),
            Notice::Failed { error, .. } => write!(f, "Error: {}", error),
        }
    }
}

/// A new alias as requested by a caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasDraft {
    /// Local part
    pub alias: String,
    /// Destination
    pub endpoint: EndpointId,
}

impl AliasDraft {
    /// Create a draft
    pub fn new(alias: impl Into<String>, endpoint: EndpointId) -> Self {
        Self {
            alias: alias.into(),
            endpoint,
        }
    }
}

/// Address of an existing entry
///
/// The index is a position in the directory as last listed. Setting
/// `expected_alias` makes the engine refuse the change if a concurrent
/// writer has moved a different alias into that position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryRef {
    /// Position in the directory
    pub index: usize,
    /// Alias the caller believes is at `index`
    pub expected_alias: Option<String>,
}

impl EntryRef {
    /// Address by position only
    pub fn at(index: usize) -> Self {
        Self {
            index,
            expected_alias: None,
        }
    }

    /// Require the entry to still carry this alias
    pub fn expecting(mut self, alias: impl Into<String>) -> Self {
        self.expected_alias = Some(alias.into());
        self
    }
}

impl From<usize> for EntryRef {
    fn from(index: usize) -> Self {
        Self::at(index)
    }
}

/// Result of a single add
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddOutcome {
    /// Written
    Added(AliasRecord),
    /// Already stored; nothing written
    AlreadyPresent(AliasRecord),
}

/// Result of an add-batch
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    /// Records written, in input order
    pub added: Vec<AliasRecord>,
    /// Records dropped as duplicates, in input order
    pub skipped: Vec<AliasRecord>,
}

/// Result of an edit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasChange {
    /// Position that was edited
    pub index: usize,
    /// Record before the edit
    pub previous: AliasRecord,
    /// Record after the edit
    pub current: AliasRecord,
}

/// Alias CRUD engine
///
/// ## Lifecycle
///
/// 1. Create with [`AliasEngine::new()`], keeping the notice receiver
/// 2. Call operations; each one performs a full read-modify-write
/// 3. Drop the engine to close the notice channel
///
/// Operations wait for room in the notice channel, so a kept receiver must
/// be drained concurrently once an operation can emit more notices than
/// `notice_channel_capacity`. Dropping the receiver discards notices.
///
/// No directory state is kept between operations.
pub struct AliasEngine {
    /// Remote record store
    store: Box<dyn RecordStore>,

    /// Endpoint catalog
    catalog: Arc<EndpointCatalog>,

    /// Catch-all destination (sentinel)
    default_email: String,

    /// Held from fetch to write by every mutating operation
    write_lock: Mutex<()>,

    /// Notice sender for the caller
    notice_tx: mpsc::Sender<Notice>,
}

impl AliasEngine {
    /// Create a new engine
    ///
    /// # Returns
    ///
    /// A tuple of (engine, notice_receiver)
    pub fn new(
        store: Box<dyn RecordStore>,
        config: &AliasConfig,
    ) -> Result<(Self, mpsc::Receiver<Notice>)> {
        config.validate()?;

        let (tx, rx) = mpsc::channel(config.engine.notice_channel_capacity);

        let engine = Self {
            store,
            catalog: Arc::new(config.catalog()),
            default_email: config.default_email.clone(),
            write_lock: Mutex::new(()),
            notice_tx: tx,
        };

        Ok((engine, rx))
    }

    /// The endpoint catalog
    pub fn catalog(&self) -> &EndpointCatalog {
        &self.catalog
    }

    /// Read and decode the current directory
    pub async fn list_aliases(&self) -> Result<Directory> {
        let result = async {
            let raw = self.store.fetch().await?;
            self.decode(&raw)
        }
        .await;
        self.observe("list-aliases", result).await
    }

    /// Add one alias
    ///
    /// Nothing is written when the alias already forwards to the same
    /// destination.
    pub async fn add_alias(&self, draft: AliasDraft) -> Result<AddOutcome> {
        let result = self.add_alias_inner(draft).await;
        self.observe("add-alias", result).await
    }

    /// Add several aliases with one write
    pub async fn add_aliases(&self, drafts: Vec<AliasDraft>) -> Result<BatchOutcome> {
        let result = self.add_aliases_inner(drafts).await;
        self.observe("add-aliases", result).await
    }

    /// Replace the alias at a position
    ///
    /// The new value is not checked for duplicates.
    pub async fn edit_alias(
        &self,
        entry: impl Into<EntryRef>,
        draft: AliasDraft,
    ) -> Result<AliasChange> {
        let result = self.edit_alias_inner(entry.into(), draft).await;
        self.observe("edit-alias", result).await
    }

    /// Remove the alias at a position
    pub async fn delete_alias(&self, entry: impl Into<EntryRef>) -> Result<AliasRecord> {
        let result = self.delete_alias_inner(entry.into()).await;
        self.observe("delete-alias", result).await
    }

    /// Import an export document given as text
    pub async fn import_document(&self, document: &str) -> Result<BatchOutcome> {
        let result = async {
            let pairs = import::parse_export(document, &self.catalog)?;
            let batch = import::build_batch(&pairs)?;
            self.add_aliases_inner(batch).await
        }
        .await;
        self.observe("import", result).await
    }

    /// Import an export document from disk
    pub async fn import_file(&self, path: impl AsRef<Path>) -> Result<BatchOutcome> {
        let path = path.as_ref();
        let document = match tokio::fs::read_to_string(path).await {
            Ok(document) => document,
            Err(e) => {
                error!("Cannot read {}: {}", path.display(), e);
                return self.observe("import", Err(Error::from(e))).await;
            }
        };
        debug!("Importing aliases from {}", path.display());
        self.import_document(&document).await
    }

    async fn add_alias_inner(&self, draft: AliasDraft) -> Result<AddOutcome> {
        let record = self.record_for(&draft)?;

        let guard = self.write_lock.lock().await;
        let raw = self.store.fetch().await?;
        let mut directory = self.decode(&raw)?;

        if is_present(&raw, &directory, &record) {
            drop(guard);
            info!("Alias {} already forwards to {}", record.alias, record.email);
            self.notify(Notice::AlreadyPresent {
                alias: record.alias.clone(),
            })
            .await;
            return Ok(AddOutcome::AlreadyPresent(record));
        }

        directory.push(record.clone());
        self.store
            .overwrite(directory.record_id(), &directory.encode())
            .await?;
        drop(guard);

        info!("Added alias {} -> {}", record.alias, record.email);
        self.notify(Notice::Added {
            alias: record.alias.clone(),
            email: record.email.clone(),
        })
        .await;
        self.notify(Notice::DirectoryChanged {
            len: directory.len(),
        })
        .await;
        Ok(AddOutcome::Added(record))
    }

    async fn add_aliases_inner(&self, drafts: Vec<AliasDraft>) -> Result<BatchOutcome> {
        let records = drafts
            .iter()
            .map(|draft| self.record_for(draft))
            .collect::<Result<Vec<_>>>()?;

        let guard = self.write_lock.lock().await;
        let raw = self.store.fetch().await?;
        let mut directory = self.decode(&raw)?;
        let mut outcome = BatchOutcome::default();

        for record in records {
            if is_present(&raw, &directory, &record) {
                debug!("Skipping {}: already present", record.alias);
                outcome.skipped.push(record);
            } else {
                directory.push(record.clone());
                outcome.added.push(record);
            }
        }

        if !outcome.added.is_empty() {
            self.store
                .patch(directory.record_id(), &directory.encode())
                .await?;
        }
        drop(guard);

        for record in &outcome.skipped {
            self.notify(Notice::AlreadyPresent {
                alias: record.alias.clone(),
            })
            .await;
        }

        if outcome.added.is_empty() {
            info!("Nothing to add ({} duplicate(s))", outcome.skipped.len());
            return Ok(outcome);
        }

        info!(
            "Added {} alias(es), skipped {}",
            outcome.added.len(),
            outcome.skipped.len()
        );
        for record in &outcome.added {
            self.notify(Notice::Added {
                alias: record.alias.clone(),
                email: record.email.clone(),
            })
            .await;
        }
        self.notify(Notice::DirectoryChanged {
            len: directory.len(),
        })
        .await;
        Ok(outcome)
    }

    async fn edit_alias_inner(&self, entry: EntryRef, draft: AliasDraft) -> Result<AliasChange> {
        let record = self.record_for(&draft)?;

        let guard = self.write_lock.lock().await;
        let raw = self.store.fetch().await?;
        let mut directory = self.decode(&raw)?;
        check_entry(&directory, &entry)?;

        let previous = directory.replace(entry.index, record.clone())?;
        self.store
            .overwrite(directory.record_id(), &directory.encode())
            .await?;
        drop(guard);

        info!(
            "Changed alias {} at position {} to {} -> {}",
            previous.alias, entry.index, record.alias, record.email
        );
        self.notify(Notice::Changed {
            previous: previous.alias.clone(),
            current: record.alias.clone(),
        })
        .await;
        self.notify(Notice::DirectoryChanged {
            len: directory.len(),
        })
        .await;
        Ok(AliasChange {
            index: entry.index,
            previous,
            current: record,
        })
    }

    async fn delete_alias_inner(&self, entry: EntryRef) -> Result<AliasRecord> {
        let guard = self.write_lock.lock().await;
        let raw = self.store.fetch().await?;
        let mut directory = self.decode(&raw)?;
        check_entry(&directory, &entry)?;

        let removed = directory.remove(entry.index)?;
        self.store
            .overwrite(directory.record_id(), &directory.encode())
            .await?;
        drop(guard);

        info!("Deleted alias {} at position {}", removed.alias, entry.index);
        self.notify(Notice::Deleted {
            alias: removed.alias.clone(),
        })
        .await;
        self.notify(Notice::DirectoryChanged {
            len: directory.len(),
        })
        .await;
        Ok(removed)
    }

    /// Validate a draft and resolve its destination
    fn record_for(&self, draft: &AliasDraft) -> Result<AliasRecord> {
        codec::validate_alias(&draft.alias)?;
        let endpoint = self.catalog.get(draft.endpoint).ok_or_else(|| {
            Error::unknown_endpoint(format!(
                "Endpoint {} does not exist ({} configured)",
                draft.endpoint,
                self.catalog.len()
            ))
        })?;
        Ok(AliasRecord::new(draft.alias.clone(), endpoint.email.clone()))
    }

    fn decode(&self, raw: &TxtRecord) -> Result<Directory> {
        Ok(Directory::decode(
            raw,
            Arc::clone(&self.catalog),
            &self.default_email,
        )?)
    }

    /// Log and report a failed operation, passing the result through
    async fn observe<T>(&self, operation: &'static str, result: Result<T>) -> Result<T> {
        if let Err(e) = &result {
            error!("{} failed: {}", operation, e);
            self.notify(Notice::Failed {
                operation,
                error: e.to_string(),
            })
            .await;
        }
        result
    }

    /// Deliver a notice, waiting for room in the channel
    ///
    /// Notices are never dropped while a receiver exists; a caller that keeps
    /// the receiver must drain it. Called with the write lock released.
    async fn notify(&self, notice: Notice) {
        if self.notice_tx.send(notice).await.is_err() {
            debug!("Notice receiver dropped");
        }
    }
}

/// Duplicate check for adds
///
/// A record counts as present when its exact segment occurs in the raw
/// content, or when a decoded entry has the same alias and destination
/// ignoring ASCII case.
fn is_present(raw: &TxtRecord, directory: &Directory, record: &AliasRecord) -> bool {
    raw.content.contains(&record.segment()) || directory.contains(record)
}

/// Verify that an entry reference still points where the caller thinks
fn check_entry(directory: &Directory, entry: &EntryRef) -> Result<()> {
    let current = directory.get(entry.index).ok_or(Error::IndexOutOfRange {
        index: entry.index,
        len: directory.len(),
    })?;

    if let Some(expected) = &entry.expected_alias
        && current.record.alias != *expected
    {
        return Err(Error::StaleEntry {
            index: entry.index,
            expected: expected.clone(),
            found: current.record.alias.clone(),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notice_messages() {
        let added = Notice::Added {
            alias: "sales".to_string(),
            email: "sales@corp.example".to_string(),
        };
        assert_eq!(added.to_string(), "Added alias sales to sales@corp.example");

        let present = Notice::AlreadyPresent {
            alias: "sales".to_string(),
        };
        assert_eq!(present.to_string(), "Alias sales was already present!");

        let changed = Notice::Changed {
            previous: "a".to_string(),
            current: "b".to_string(),
        };
        assert_eq!(changed.to_string(), "Changed alias a to b");

        let failed = Notice::Failed {
            operation: "add-alias",
            error: "boom".to_string(),
        };
        assert_eq!(failed.to_string(), "Error: boom");
    }

    #[test]
    fn test_entry_ref() {
        assert_eq!(EntryRef::from(3), EntryRef::at(3));
        assert_eq!(
            EntryRef::at(1).expecting("sales").expected_alias.as_deref(),
            Some("sales")
        );
    }
}
