// # aliasdns-core
//
// Core library for managing email-forwarding aliases kept in a single DNS
// TXT record.
//
// ## Architecture Overview
//
// - **codec**: TXT content ⇄ ordered alias records (pure)
// - **EndpointCatalog**: static table of forwarding destinations
// - **Directory**: per-operation decoded view of the record
// - **RecordStore**: trait for reading and writing the remote record
// - **AliasEngine**: read → decode → mutate → encode → write → notify
// - **import**: alias exports from other tools → add-batch
// - **StoreRegistry**: plugin-based registry for record stores
//
// ## Design Principles
//
// 1. **No cached state**: every operation starts from a fresh read
// 2. **One writer at a time**: mutating operations are serialized per engine
// 3. **Fail loudly**: corrupt content, bad positions and unknown endpoints are
//    typed errors, never silent partial results
// 4. **Library-First**: front ends only wire configuration to the engine

pub mod catalog;
pub mod codec;
pub mod config;
pub mod directory;
pub mod engine;
pub mod error;
pub mod import;
pub mod registry;
pub mod traits;

// Re-export core types for convenience
pub use catalog::{Endpoint, EndpointCatalog, EndpointId};
pub use codec::{AliasRecord, CodecError};
pub use config::{AliasConfig, EngineConfig, StoreConfig};
pub use directory::{Directory, DirectoryEntry};
pub use engine::{AddOutcome, AliasChange, AliasDraft, AliasEngine, BatchOutcome, EntryRef, Notice};
pub use error::{Error, Result};
pub use registry::StoreRegistry;
pub use traits::{RecordStore, RecordStoreFactory, TxtRecord};
