//! Filesystem-backed collection snapshots.
//!
//! A snapshot directory (by default `.ama/local`, resolved against the current
//! directory) looks like:
//!
//! ```text
//! manifest.json
//! collections/<name>/<id>/entry.json
//! collections/<name>/<id>/blob_<blobId>.<ext>
//! f/<path>
//! ```
//!
//! All reads go through `tokio::fs`.

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::lookups::find_similar_name;
use crate::source::{SnapshotEntry, SnapshotSource};

/// Default snapshot directory, relative to the working directory.
pub const DEFAULT_LOCAL_PATH: &str = ".ama/local";

/// Snapshot manifest filename.
const MANIFEST_FILENAME: &str = "manifest.json";

/// Entry filename inside an entry directory.
const ENTRY_FILENAME: &str = "entry.json";

/// Errors raised while reading a snapshot.
#[derive(Debug, Error)]
pub enum SnapshotStoreError {
    /// I/O error while reading a snapshot file or directory.
    #[error("failed to read snapshot path '{path}': {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// JSON deserialization error.
    #[error("invalid snapshot JSON in '{path}': {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// No snapshot is present.
    #[error("local snapshot is not available")]
    Unavailable,

    /// A collection name, entry id or file path that would leave the
    /// snapshot root.
    #[error("invalid snapshot path component '{0}'")]
    InvalidPath(String),

    /// The snapshot does not contain the requested collection.
    #[error("{}", format_collection_not_found(.name, .suggestion.as_deref()))]
    CollectionNotFound {
        name: String,
        suggestion: Option<String>,
    },
}

fn format_collection_not_found(name: &str, suggestion: Option<&str>) -> String {
    let base = format!("collection '{}' not found in local snapshot.", name);
    match suggestion {
        Some(s) => format!("{} Did you mean '{}'?", base, s),
        None => base,
    }
}

/// Result type for snapshot store operations.
pub type Result<T> = std::result::Result<T, SnapshotStoreError>;

/// Snapshot manifest (`manifest.json`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub project_id: String,
    #[serde(default)]
    pub branch: String,
    #[serde(default)]
    pub generated_at: String,
    #[serde(default)]
    pub collections: BTreeMap<String, CollectionManifest>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub files: Option<BTreeMap<String, FileManifest>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionManifest {
    #[serde(default)]
    pub collection_name: String,
    #[serde(default)]
    pub entry_count: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_synced: Option<String>,
    #[serde(default)]
    pub entries: BTreeMap<String, EntryManifest>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntryManifest {
    pub sha256: String,
    pub size: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blobs: Option<BTreeMap<String, BlobManifest>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlobManifest {
    pub sha256: String,
    pub size: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileManifest {
    pub path: String,
    pub sha256: String,
    pub size: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<String>,
}

/// Read-only access to a snapshot directory.
///
/// # Example
///
/// ```no_run
/// use atmyapp_local_rs::FsSnapshotStore;
///
/// # async fn run() -> Result<(), atmyapp_local_rs::SnapshotStoreError> {
/// let store = FsSnapshotStore::new(".ama/local");
/// if store.is_available().await {
///     let entries = store.list_entries("orders").await?;
///     println!("{} orders", entries.len());
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct FsSnapshotStore {
    root: PathBuf,
}

impl Default for FsSnapshotStore {
    fn default() -> Self {
        Self::new(DEFAULT_LOCAL_PATH)
    }
}

impl FsSnapshotStore {
    /// Creates a store rooted at `root`. Relative paths are resolved against
    /// the current directory.
    pub fn new(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        let root = if root.is_absolute() {
            root.to_path_buf()
        } else {
            std::env::current_dir()
                .map(|cwd| cwd.join(root))
                .unwrap_or_else(|_| root.to_path_buf())
        };
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.root.join(MANIFEST_FILENAME)
    }

    fn collection_dir(&self, collection: &str) -> Result<PathBuf> {
        Ok(self.root.join("collections").join(checked_segment(collection)?))
    }

    fn entry_dir(&self, collection: &str, id: &str) -> Result<PathBuf> {
        Ok(self.collection_dir(collection)?.join(checked_segment(id)?))
    }

    fn file_path(&self, path: &str) -> Result<PathBuf> {
        let relative = path.trim_start_matches('/');
        if relative.split(['/', '\\']).any(|part| part == "..") {
            return Err(SnapshotStoreError::InvalidPath(path.to_string()));
        }
        Ok(self.root.join("f").join(relative))
    }

    /// Returns true when `manifest.json` exists.
    pub async fn is_available(&self) -> bool {
        tokio::fs::try_exists(self.manifest_path())
            .await
            .unwrap_or(false)
    }

    /// Loads the manifest, or `None` when there is none.
    pub async fn load_manifest(&self) -> Result<Option<Manifest>> {
        let path = self.manifest_path();
        match tokio::fs::read_to_string(&path).await {
            Ok(contents) => serde_json::from_str(&contents)
                .map(Some)
                .map_err(|source| SnapshotStoreError::Json { path, source }),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(SnapshotStoreError::ReadError { path, source }),
        }
    }

    /// Lists collection names: the manifest's keys, else the directories under
    /// `collections/`.
    pub async fn list_collections(&self) -> Result<Vec<String>> {
        if let Some(manifest) = self.load_manifest().await? {
            return Ok(manifest.collections.into_keys().collect());
        }

        let dir = self.root.join("collections");
        let mut names = read_dir_names(&dir, true).await?;
        names.sort();
        Ok(names)
    }

    /// Reads one entry, or `None` when its `entry.json` does not exist.
    pub async fn read_entry(&self, collection: &str, id: &str) -> Result<Option<SnapshotEntry>> {
        let path = self.entry_dir(collection, id)?.join(ENTRY_FILENAME);
        read_json_opt(&path).await
    }

    /// Reads every entry of `collection`.
    ///
    /// Entries whose `entry.json` cannot be parsed are skipped with a warning.
    /// A collection listed in the manifest without a directory is empty. One
    /// unknown to the snapshot is an error carrying the closest known name.
    pub async fn list_entries(&self, collection: &str) -> Result<Vec<SnapshotEntry>> {
        let dir = self.collection_dir(collection)?;
        if !tokio::fs::try_exists(&dir).await.unwrap_or(false) {
            let known = self.list_collections().await.unwrap_or_default();
            if known.iter().any(|name| name == collection) {
                tracing::debug!(collection, "Collection has no entries in snapshot");
                return Ok(Vec::new());
            }
            return Err(SnapshotStoreError::CollectionNotFound {
                name: collection.to_string(),
                suggestion: find_similar_name(collection, known.iter().map(String::as_str)),
            });
        }

        let mut ids = read_dir_names(&dir, true).await?;
        ids.sort();

        let mut entries = Vec::with_capacity(ids.len());
        for id in ids {
            let path = dir.join(&id).join(ENTRY_FILENAME);
            match read_json_opt::<SnapshotEntry>(&path).await {
                Ok(Some(entry)) => entries.push(entry),
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(collection, entry = %id, error = %e, "Skipping unreadable snapshot entry");
                }
            }
        }

        tracing::debug!(collection, count = entries.len(), "Loaded snapshot entries");
        Ok(entries)
    }

    /// Reads blob `blob_id` of an entry: the first file named
    /// `blob_<blob_id>.*` in the entry directory.
    pub async fn read_blob(&self, collection: &str, id: &str, blob_id: &str) -> Result<Option<Vec<u8>>> {
        let dir = self.entry_dir(collection, id)?;
        if !tokio::fs::try_exists(&dir).await.unwrap_or(false) {
            return Ok(None);
        }

        let prefix = format!("blob_{}.", checked_segment(blob_id)?);
        let mut names = read_dir_names(&dir, false).await?;
        names.sort();
        let Some(name) = names.into_iter().find(|n| n.starts_with(&prefix)) else {
            return Ok(None);
        };

        let path = dir.join(name);
        tokio::fs::read(&path)
            .await
            .map(Some)
            .map_err(|source| SnapshotStoreError::ReadError { path, source })
    }

    /// Reads a stored file under `f/`.
    pub async fn read_file(&self, path: &str) -> Result<Option<Vec<u8>>> {
        let full = self.file_path(path)?;
        match tokio::fs::read(&full).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(SnapshotStoreError::ReadError { path: full, source }),
        }
    }

    /// Reads a stored file under `f/` as JSON.
    pub async fn read_file_json<T: DeserializeOwned>(&self, path: &str) -> Result<Option<T>> {
        read_json_opt(&self.file_path(path)?).await
    }

    /// Returns the `file://` URL of a stored file under `f/`.
    pub fn file_url(&self, path: &str) -> Result<String> {
        let full = self.file_path(path)?;
        Ok(format!("file://{}", full.to_string_lossy().replace('\\', "/")))
    }
}

#[async_trait]
impl SnapshotSource for FsSnapshotStore {
    async fn is_available(&self) -> bool {
        FsSnapshotStore::is_available(self).await
    }

    async fn list_entries(&self, collection: &str) -> Result<Vec<SnapshotEntry>> {
        FsSnapshotStore::list_entries(self, collection).await
    }

    async fn list_collections(&self) -> Result<Vec<String>> {
        FsSnapshotStore::list_collections(self).await
    }
}

/// Accepts a single path segment: not empty, not `.` or `..`, and free of
/// separators.
fn checked_segment(name: &str) -> Result<&str> {
    if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\']) {
        return Err(SnapshotStoreError::InvalidPath(name.to_string()));
    }
    Ok(name)
}

async fn read_json_opt<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    match tokio::fs::read_to_string(path).await {
        Ok(contents) => serde_json::from_str(&contents)
            .map(Some)
            .map_err(|source| SnapshotStoreError::Json {
                path: path.to_path_buf(),
                source,
            }),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(source) => Err(SnapshotStoreError::ReadError {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Lists the names in `dir`: directories only when `dirs` is true, files
/// otherwise. A missing directory yields an empty list.
async fn read_dir_names(dir: &Path, dirs: bool) -> Result<Vec<String>> {
    let read_error = |source| SnapshotStoreError::ReadError {
        path: dir.to_path_buf(),
        source,
    };

    let mut reader = match tokio::fs::read_dir(dir).await {
        Ok(reader) => reader,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(read_error(e)),
    };

    let mut names = Vec::new();
    while let Some(item) = reader.next_entry().await.map_err(read_error)? {
        let file_type = item.file_type().await.map_err(read_error)?;
        if file_type.is_dir() == dirs {
            names.push(item.file_name().to_string_lossy().into_owned());
        }
    }
    Ok(names)
}
