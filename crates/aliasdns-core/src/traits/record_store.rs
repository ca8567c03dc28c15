// # Record Store Trait
//
// Defines the interface to the one remote TXT record that holds the alias
// directory.
//
// ## Implementations
//
// - Cloudflare: `aliasdns-store-cloudflare` crate
//
// ## Usage
//
// ```rust,ignore
// use aliasdns_core::RecordStore;
//
// #[tokio::main]
// async fn main() -> aliasdns_core::Result<()> {
//     let store = /* RecordStore implementation */;
//
//     let record = store.fetch().await?;
//     store.overwrite(&record.id, &record.content).await?;
//
//     Ok(())
// }
// ```

use async_trait::async_trait;

/// The TXT record as read from the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxtRecord {
    /// Store-specific record id, used to address the write
    pub id: String,
    /// Fully qualified record name
    pub name: String,
    /// Raw record content
    pub content: String,
}

impl TxtRecord {
    /// Create a record
    pub fn new(id: impl Into<String>, name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            content: content.into(),
        }
    }
}

/// Trait for remote record store implementations
///
/// A store is bound to a single record name at construction time; the zone
/// and record name are resolved before the store is handed to the engine.
///
/// # Thread Safety
///
/// Implementations must be thread-safe and usable across async tasks.
///
/// # Responsibilities
///
/// Stores perform exactly the HTTP calls their methods name. They do not
/// retry, cache content between calls, decode the content, or serialize
/// concurrent writers; ordering of read and write is owned by `AliasEngine`.
/// Every call must be bounded by a timeout and report it as
/// [`Error::Timeout`](crate::Error::Timeout).
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Read the record
    ///
    /// # Returns
    ///
    /// - `Ok(TxtRecord)`: id and raw content
    /// - `Err(Error::NotFound)`: the record does not exist
    /// - `Err(Error)`: any other failure
    async fn fetch(&self) -> Result<TxtRecord, crate::Error>;

    /// Replace the record content
    ///
    /// # Parameters
    ///
    /// - `record_id`: id returned by [`fetch`](Self::fetch)
    /// - `content`: the complete new content
    async fn overwrite(&self, record_id: &str, content: &str) -> Result<(), crate::Error>;

    /// Replace the record content through the partial-update verb
    ///
    /// The content is still the complete new content; only the HTTP verb
    /// differs from [`overwrite`](Self::overwrite).
    async fn patch(&self, record_id: &str, content: &str) -> Result<(), crate::Error>;

    /// Fully qualified name of the record this store manages
    fn record_name(&self) -> &str;

    /// Get the store name (for logging/debugging)
    fn store_name(&self) -> &'static str;
}

/// Helper trait for constructing record stores from configuration
///
/// Creation is async because stores resolve their zone before they are
/// usable; a failed resolution fails creation.
#[async_trait]
pub trait RecordStoreFactory: Send + Sync {
    /// Create a RecordStore instance from configuration
    async fn create(
        &self,
        config: &crate::config::AliasConfig,
    ) -> Result<Box<dyn RecordStore>, crate::Error>;
}
