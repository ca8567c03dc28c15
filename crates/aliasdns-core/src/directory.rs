//! Per-operation view of the alias directory
//!
//! A [`Directory`] is decoded from one fetch of the TXT record and discarded
//! after the matching write. Positions are only meaningful for the instance
//! they were read from.

use std::sync::Arc;

use crate::catalog::{Endpoint, EndpointCatalog, EndpointId};
use crate::codec::{self, AliasRecord, CodecError};
use crate::error::{Error, Result};
use crate::traits::TxtRecord;

/// One decoded alias with its resolved endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryEntry {
    /// The stored record
    pub record: AliasRecord,
    /// Catalog endpoint with the record's email, if any
    pub endpoint: Option<EndpointId>,
    /// Stored segment text; `None` once the entry was written by this process
    segment: Option<String>,
}

/// Decoded alias directory
#[derive(Debug, Clone)]
pub struct Directory {
    record_id: String,
    default_email: String,
    sentinel_present: bool,
    entries: Vec<DirectoryEntry>,
    catalog: Arc<EndpointCatalog>,
}

impl Directory {
    /// Decode a fetched record
    pub fn decode(
        record: &TxtRecord,
        catalog: Arc<EndpointCatalog>,
        default_email: &str,
    ) -> std::result::Result<Self, CodecError> {
        let decoded = codec::decode(&record.content, default_email)?;

        if !decoded.sentinel_present {
            tracing::warn!(
                "Record {} has no default forward; it will be restored on the next write",
                record.name
            );
        }

        let entries = decoded
            .records
            .into_iter()
            .zip(decoded.segments)
            .map(|(record, segment)| {
                let endpoint = catalog.by_email(&record.email);
                if endpoint.is_none() {
                    tracing::debug!(
                        "Alias {} forwards to {} which is not in the catalog",
                        record.alias,
                        record.email
                    );
                }
                DirectoryEntry {
                    record,
                    endpoint,
                    segment: Some(segment),
                }
            })
            .collect();

        Ok(Self {
            record_id: record.id.clone(),
            default_email: default_email.to_string(),
            sentinel_present: decoded.sentinel_present,
            entries,
            catalog,
        })
    }

    /// Store id of the record this directory was read from
    pub fn record_id(&self) -> &str {
        &self.record_id
    }

    /// Whether the default forward was present when read
    pub fn sentinel_present(&self) -> bool {
        self.sentinel_present
    }

    /// Entries in record order
    pub fn entries(&self) -> &[DirectoryEntry] {
        &self.entries
    }

    /// Entry at a position
    pub fn get(&self, index: usize) -> Option<&DirectoryEntry> {
        self.entries.get(index)
    }

    /// Number of aliases
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether there are no aliases
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The endpoint catalog used for resolution
    pub fn catalog(&self) -> &EndpointCatalog {
        &self.catalog
    }

    /// Catalog endpoint of an entry
    pub fn endpoint_of(&self, entry: &DirectoryEntry) -> Option<&Endpoint> {
        entry.endpoint.and_then(|id| self.catalog.get(id))
    }

    /// Whether an entry with the same alias and destination exists
    pub fn contains(&self, record: &AliasRecord) -> bool {
        self.entries.iter().any(|e| e.record.same_forward(record))
    }

    /// Encode back to record content
    ///
    /// The sentinel always comes first. Entries read from the record are
    /// re-emitted exactly as stored; new or replaced entries are encoded.
    pub fn encode(&self) -> String {
        let mut content = codec::sentinel_segment(&self.default_email);
        for entry in &self.entries {
            match &entry.segment {
                Some(stored) => content.push_str(stored),
                None => content.push_str(&entry.record.segment()),
            }
        }
        content
    }

    /// Append a record
    pub(crate) fn push(&mut self, record: AliasRecord) {
        let endpoint = self.catalog.by_email(&record.email);
        self.entries.push(DirectoryEntry {
            record,
            endpoint,
            segment: None,
        });
    }

    /// Replace the record at a position, returning the old one
    pub(crate) fn replace(&mut self, index: usize, record: AliasRecord) -> Result<AliasRecord> {
        let len = self.entries.len();
        let endpoint = self.catalog.by_email(&record.email);
        let slot = self
            .entries
            .get_mut(index)
            .ok_or(Error::IndexOutOfRange { index, len })?;
        let previous = std::mem::replace(
            slot,
            DirectoryEntry {
                record,
                endpoint,
                segment: None,
            },
        );
        Ok(previous.record)
    }

    /// Remove the record at a position
    pub(crate) fn remove(&mut self, index: usize) -> Result<AliasRecord> {
        if index >= self.entries.len() {
            return Err(Error::IndexOutOfRange {
                index,
                len: self.entries.len(),
            });
        }
        Ok(self.entries.remove(index).record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEFAULT: &str = "catchall@home.example";

    fn catalog() -> Arc<EndpointCatalog> {
        Arc::new(EndpointCatalog::new(vec![
            Endpoint::new("sales@corp.example", "Sales Team"),
            Endpoint::new("me@home.example", "Personal"),
        ]))
    }

    fn directory(records: &[AliasRecord]) -> Directory {
        let content = codec::encode(records, DEFAULT);
        let record = TxtRecord::new("rec-1", "_aliases.example.com", content);
        Directory::decode(&record, catalog(), DEFAULT).unwrap()
    }

    #[test]
    fn test_resolves_endpoints() {
        let dir = directory(&[
            AliasRecord::new("sales", "sales@corp.example"),
            AliasRecord::new("old", "legacy@elsewhere.example"),
        ]);

        assert_eq!(dir.record_id(), "rec-1");
        assert_eq!(dir.len(), 2);
        assert_eq!(dir.entries()[0].endpoint, Some(EndpointId::new(0)));
        assert_eq!(dir.entries()[1].endpoint, None);
        assert_eq!(
            dir.endpoint_of(&dir.entries()[0]).map(|e| e.nickname.as_str()),
            Some("Sales Team")
        );
    }

    #[test]
    fn test_unknown_endpoint_survives_encode() {
        let records = [AliasRecord::new("old", "legacy@elsewhere.example")];
        let dir = directory(&records);
        assert_eq!(dir.encode(), codec::encode(&records, DEFAULT));
    }

    #[test]
    fn test_replace_and_remove() {
        let mut dir = directory(&[
            AliasRecord::new("a", "sales@corp.example"),
            AliasRecord::new("b", "me@home.example"),
        ]);

        let previous = dir.replace(1, AliasRecord::new("c", "sales@corp.example")).unwrap();
        assert_eq!(previous.alias, "b");
        assert_eq!(dir.entries()[1].endpoint, Some(EndpointId::new(0)));

        let removed = dir.remove(0).unwrap();
        assert_eq!(removed.alias, "a");
        assert_eq!(dir.entries()[0].record.alias, "c");

        assert!(matches!(
            dir.remove(1),
            Err(Error::IndexOutOfRange { index: 1, len: 1 })
        ));
        assert!(matches!(
            dir.replace(4, AliasRecord::new("d", "me@home.example")),
            Err(Error::IndexOutOfRange { index: 4, len: 1 })
        ));
    }

    #[test]
    fn test_untouched_entries_keep_stored_bytes() {
        let padded = "\"forward-email= b : me@home.example\"";
        let content = format!(
            "{} {}{}",
            codec::sentinel_segment(DEFAULT),
            codec::segment("a", "sales@corp.example"),
            padded
        );
        let record = TxtRecord::new("rec-1", "_aliases.example.com", content);
        let mut dir = Directory::decode(&record, catalog(), DEFAULT).unwrap();

        dir.replace(0, AliasRecord::new("z", "sales@corp.example")).unwrap();
        assert_eq!(
            dir.encode(),
            format!(
                "{}{}{}",
                codec::sentinel_segment(DEFAULT),
                codec::segment("z", "sales@corp.example"),
                padded
            )
        );

        dir.remove(0).unwrap();
        assert_eq!(
            dir.encode(),
            format!("{}{}", codec::sentinel_segment(DEFAULT), padded)
        );
    }

    #[test]
    fn test_contains_ignores_case() {
        let dir = directory(&[AliasRecord::new("sales", "sales@corp.example")]);
        assert!(dir.contains(&AliasRecord::new("SALES", "Sales@Corp.example")));
        assert!(!dir.contains(&AliasRecord::new("sales", "me@home.example")));
    }

    #[test]
    fn test_corrupt_content_is_an_error() {
        let record = TxtRecord::new("rec-1", "_aliases.example.com", "\"forward-email=");
        assert!(Directory::decode(&record, catalog(), DEFAULT).is_err());
    }
}
