//! Local snapshots and online/offline orchestration for AtMyApp collections.
//!
//! A snapshot is a locally materialized copy of collection entries. This crate
//! reads snapshots through the [`SnapshotSource`] trait, evaluates collection
//! queries against them in memory, and provides [`CollectionsClient`], which
//! serves reads from the remote service, the snapshot, or the snapshot as a
//! fallback for the remote service.

pub mod client;
pub mod config;
pub mod evaluator;
mod lookups;
pub mod source;
pub mod store;

pub use client::{CollectionsClient, NO_REMOTE_MESSAGE};
pub use config::{ClientMode, CollectionsConfig, LocalStorageConfig};
pub use evaluator::{evaluate, FilterEvaluator};
pub use source::{MemorySnapshotSource, NullSnapshotSource, SnapshotEntry, SnapshotSource};
pub use store::{
    BlobManifest, CollectionManifest, EntryManifest, FileManifest, FsSnapshotStore, Manifest,
    SnapshotStoreError, DEFAULT_LOCAL_PATH,
};
