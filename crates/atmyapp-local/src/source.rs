//! Sources of locally materialized collection entries.

use std::collections::BTreeMap;

use async_trait::async_trait;
use atmyapp_api_rs::collections::RawEntry;
use serde_json::Value;

use crate::lookups::find_similar_name;
use crate::store::{Result, SnapshotStoreError};

/// One stored record: `{id, data, createdAt?, updatedAt?}`.
pub type SnapshotEntry = RawEntry<Value>;

/// Anything that can hand out every entry of a named collection.
///
/// The collections client only ever reads through this trait, so a deployment
/// chooses the backing (filesystem, embedded data, nothing) when it builds
/// the client.
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    /// Returns true when the source can serve reads.
    async fn is_available(&self) -> bool;

    /// Returns every entry of `collection`.
    async fn list_entries(&self, collection: &str) -> Result<Vec<SnapshotEntry>>;

    /// Returns the names of the collections the source holds.
    async fn list_collections(&self) -> Result<Vec<String>> {
        Ok(Vec::new())
    }
}

/// A source that never has anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSnapshotSource;

#[async_trait]
impl SnapshotSource for NullSnapshotSource {
    async fn is_available(&self) -> bool {
        false
    }

    async fn list_entries(&self, _collection: &str) -> Result<Vec<SnapshotEntry>> {
        Err(SnapshotStoreError::Unavailable)
    }
}

/// Collections held in memory.
#[derive(Debug, Clone, Default)]
pub struct MemorySnapshotSource {
    collections: BTreeMap<String, Vec<SnapshotEntry>>,
}

impl MemorySnapshotSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds (or replaces) a collection.
    pub fn with_collection(mut self, name: impl Into<String>, entries: Vec<SnapshotEntry>) -> Self {
        self.insert(name, entries);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, entries: Vec<SnapshotEntry>) {
        self.collections.insert(name.into(), entries);
    }
}

#[async_trait]
impl SnapshotSource for MemorySnapshotSource {
    async fn is_available(&self) -> bool {
        true
    }

    async fn list_entries(&self, collection: &str) -> Result<Vec<SnapshotEntry>> {
        self.collections
            .get(collection)
            .cloned()
            .ok_or_else(|| SnapshotStoreError::CollectionNotFound {
                name: collection.to_string(),
                suggestion: find_similar_name(collection, self.collections.keys().map(String::as_str)),
            })
    }

    async fn list_collections(&self) -> Result<Vec<String>> {
        Ok(self.collections.keys().cloned().collect())
    }
}
