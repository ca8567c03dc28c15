//! Core traits for the alias directory
//!
//! This module defines the abstract interfaces that all implementations must follow.
//!
//! - [`RecordStore`]: Read and write the remote TXT record

pub mod record_store;

pub use record_store::{RecordStore, RecordStoreFactory, TxtRecord};
