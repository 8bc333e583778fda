//! Collections client: dispatches reads to the remote service, the local
//! snapshot, or both, and shapes the rows for the caller.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use atmyapp_api_rs::client::AtMyAppClient;
//! use atmyapp_api_rs::collections::{FilterExpr, ListOptions};
//! use atmyapp_local_rs::{ClientMode, CollectionsClient, CollectionsConfig, FsSnapshotStore};
//!
//! # async fn example() -> atmyapp_api_rs::error::Result<()> {
//! let remote = AtMyAppClient::new("api-key")?;
//! let config = CollectionsConfig::new(ClientMode::WithFallback).timeout_ms(500);
//! let client = CollectionsClient::new(config, Some(remote), Arc::new(FsSnapshotStore::default()));
//!
//! let options = ListOptions::new().filter(FilterExpr::eq("status", "done"));
//! let rows = client.list::<serde_json::Value>("orders", options).await?;
//! println!("{} rows", rows.len());
//! # Ok(())
//! # }
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use atmyapp_api_rs::client::AtMyAppClient;
use atmyapp_api_rs::collections::{
    check_pagination, shape_list, shape_single, wire_params, EntryId, FilterExpr, ListOptions,
    ListResult, ResponseEnvelope, SingleResult,
};
use atmyapp_api_rs::error::{ApiError, Result};
use serde::de::DeserializeOwned;

use crate::config::{ClientMode, CollectionsConfig};
use crate::evaluator::evaluate;
use crate::source::SnapshotSource;
use crate::store::{self, FsSnapshotStore, SnapshotStoreError};

/// Failure message when a remote read is needed but no transport was given.
pub const NO_REMOTE_MESSAGE: &str = "No remote client configured";

/// Reads collections in one of three [`ClientMode`]s.
///
/// The mode is fixed at construction. Every list-style call accepts
/// [`ListOptions`]; `format` is consumed here, while `plugins` and
/// `preview_key` fall back to the configuration and then to the transport
/// defaults.
#[derive(Clone)]
pub struct CollectionsClient {
    config: CollectionsConfig,
    remote: Option<AtMyAppClient>,
    local: Arc<dyn SnapshotSource>,
}

impl std::fmt::Debug for CollectionsClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CollectionsClient")
            .field("config", &self.config)
            .field("remote", &self.remote)
            .finish_non_exhaustive()
    }
}

/// How the remote attempt in `with-fallback` mode ended.
enum RemoteOutcome {
    Settled(ResponseEnvelope),
    TimedOut(ApiError),
}

impl CollectionsClient {
    pub fn new(
        config: CollectionsConfig,
        remote: Option<AtMyAppClient>,
        local: Arc<dyn SnapshotSource>,
    ) -> Self {
        Self {
            config,
            remote,
            local,
        }
    }

    /// Builds a client reading snapshots from `config.local_storage.path`.
    pub fn from_config(config: CollectionsConfig, remote: Option<AtMyAppClient>) -> Self {
        let store = FsSnapshotStore::new(&config.local_storage.path);
        Self::new(config, remote, Arc::new(store))
    }

    pub fn config(&self) -> &CollectionsConfig {
        &self.config
    }

    pub fn mode(&self) -> ClientMode {
        self.config.client_mode
    }

    pub fn remote(&self) -> Option<&AtMyAppClient> {
        self.remote.as_ref()
    }

    pub fn local(&self) -> &dyn SnapshotSource {
        self.local.as_ref()
    }

    /// Names of the collections held by the local snapshot.
    pub async fn local_collections(&self) -> store::Result<Vec<String>> {
        if !self.local.is_available().await {
            return Err(SnapshotStoreError::Unavailable);
        }
        self.local.list_collections().await
    }

    /// Fills unset `plugins` and `preview_key` from the configuration.
    fn with_defaults(&self, mut options: ListOptions) -> ListOptions {
        if options.plugins.is_none() {
            options.plugins = self.config.plugins.clone();
        }
        if options.preview_key.as_deref().map_or(true, str::is_empty) {
            options.preview_key = self.config.preview_key.clone().or(options.preview_key);
        }
        options
    }

    /// Fetches entries of `collection` without shaping.
    ///
    /// Query errors (`not`, `and` below `or`, `range` with `limit`/`offset`)
    /// are returned as `Err` before any I/O. Every other failure is a
    /// `success: false` envelope.
    pub async fn list_raw(&self, collection: &str, options: &ListOptions) -> Result<ResponseEnvelope> {
        check_pagination(options)?;
        let options = self.with_defaults(options.clone());

        match self.config.client_mode {
            ClientMode::Local => self.list_local(collection, &options).await,
            ClientMode::Online => match &self.remote {
                Some(remote) => remote.list_entries(collection, &options).await,
                None => Ok(ResponseEnvelope::failure(NO_REMOTE_MESSAGE)),
            },
            ClientMode::WithFallback => self.list_with_fallback(collection, &options).await,
        }
    }

    async fn list_local(&self, collection: &str, options: &ListOptions) -> Result<ResponseEnvelope> {
        if !self.local.is_available().await {
            return Ok(ResponseEnvelope::failure(
                SnapshotStoreError::Unavailable.to_string(),
            ));
        }

        let entries = match self.local.list_entries(collection).await {
            Ok(entries) => entries,
            Err(e) => return Ok(ResponseEnvelope::failure(e.to_string())),
        };

        let page = evaluate(entries, options)?;
        Ok(ResponseEnvelope {
            success: true,
            data: Some(page),
            error: None,
        })
    }

    async fn list_with_fallback(&self, collection: &str, options: &ListOptions) -> Result<ResponseEnvelope> {
        let outcome = match &self.remote {
            Some(remote) => {
                // Compile before racing so query errors never fall back
                wire_params(options, remote.plugins(), remote.preview_key())?;
                self.race_remote(remote, collection, options).await
            }
            None => RemoteOutcome::Settled(ResponseEnvelope::failure(NO_REMOTE_MESSAGE)),
        };

        let remote_failure = match outcome {
            RemoteOutcome::Settled(envelope) if envelope.is_ok() => return Ok(envelope),
            RemoteOutcome::Settled(envelope) => {
                tracing::warn!(
                    collection,
                    reason = envelope.error_message(),
                    "Remote read failed, falling back to local snapshot"
                );
                envelope
            }
            RemoteOutcome::TimedOut(error) => {
                tracing::warn!(
                    collection,
                    reason = %error,
                    "Remote read timed out, falling back to local snapshot"
                );
                ResponseEnvelope::failure(error.to_string())
            }
        };

        if !self.local.is_available().await {
            return Ok(remote_failure);
        }

        match self.list_local(collection, options).await {
            Ok(envelope) if envelope.is_ok() => Ok(envelope),
            Ok(envelope) => {
                tracing::warn!(
                    collection,
                    reason = envelope.error_message(),
                    "Local fallback failed"
                );
                Ok(remote_failure)
            }
            Err(e) => {
                tracing::warn!(collection, reason = %e, "Local fallback failed");
                Ok(remote_failure)
            }
        }
    }

    /// Runs the remote read on its own task, bounded by the configured
    /// timeout. A timed-out task keeps running; its result is never read.
    async fn race_remote(&self, remote: &AtMyAppClient, collection: &str, options: &ListOptions) -> RemoteOutcome {
        let task = {
            let remote = remote.clone();
            let collection = collection.to_string();
            let options = options.clone();
            tokio::spawn(async move { remote.list_entries(&collection, &options).await })
        };

        let joined = match self.config.local_storage.timeout() {
            Some(limit) => match tokio::time::timeout(limit, task).await {
                Ok(joined) => joined,
                Err(_) => {
                    return RemoteOutcome::TimedOut(ApiError::Timeout {
                        after_ms: u64::try_from(limit.as_millis()).unwrap_or(u64::MAX),
                    })
                }
            },
            None => task.await,
        };

        let envelope = match joined {
            Ok(Ok(envelope)) => envelope,
            Ok(Err(e)) => ResponseEnvelope::failure(e.to_string()),
            Err(e) => ResponseEnvelope::failure(format!("Remote request task failed: {}", e)),
        };
        RemoteOutcome::Settled(envelope)
    }

    /// Lists entries of `collection`, decoded into `Row` and shaped by
    /// `options.format`.
    ///
    /// A failed read becomes [`Error::Request`] with the failure message.
    ///
    /// [`Error::Request`]: atmyapp_api_rs::error::Error::Request
    pub async fn list<Row: DeserializeOwned>(&self, collection: &str, options: ListOptions) -> Result<ListResult<Row>> {
        let (format, options) = options.split_format();
        let page = self
            .list_raw(collection, &options)
            .await?
            .decode::<Row>()
            .into_page()?;
        Ok(shape_list(page.entries, format, page.total))
    }

    /// Fetches the entry with `id`, or `None` when there is none.
    ///
    /// The caller's filter and pagination are replaced by `id == id`,
    /// `limit 1`.
    pub async fn get_by_id<Row: DeserializeOwned>(
        &self,
        collection: &str,
        id: impl Into<EntryId>,
        options: ListOptions,
    ) -> Result<SingleResult<Row>> {
        let id: EntryId = id.into();
        let (format, mut options) = options.split_format();
        options.filter = Some(FilterExpr::eq("id", id));
        options.range = None;
        options.offset = None;
        options.limit = Some(1);

        let page = self
            .list_raw(collection, &options)
            .await?
            .decode::<Row>()
            .into_page()?;
        let total = page.total.unwrap_or(0);
        Ok(shape_single(page.entries.into_iter().next(), format, total))
    }

    /// Fetches the first entry matching `options`.
    ///
    /// Without an explicit `order` the row returned depends on the backend's
    /// default ordering.
    pub async fn first<Row: DeserializeOwned>(&self, collection: &str, options: ListOptions) -> Result<SingleResult<Row>> {
        let (format, mut options) = options.split_format();
        options.range = None;
        options.limit = Some(1);

        let page = self
            .list_raw(collection, &options)
            .await?
            .decode::<Row>()
            .into_page()?;
        let total = page.total_or_len();
        Ok(shape_single(page.entries.into_iter().next(), format, total))
    }

    /// Fetches the entries with the given ids, in the order the ids were
    /// given. Ids with no entry are left out.
    ///
    /// No limit is sent, so the service-side cap still applies. An empty id
    /// list makes no request.
    pub async fn get_many_by_ids<Row, I, Id>(
        &self,
        collection: &str,
        ids: I,
        options: ListOptions,
    ) -> Result<ListResult<Row>>
    where
        Row: DeserializeOwned,
        I: IntoIterator<Item = Id>,
        Id: Into<EntryId>,
    {
        let ids: Vec<EntryId> = ids.into_iter().map(Into::into).collect();
        let (format, mut options) = options.split_format();
        if ids.is_empty() {
            return Ok(shape_list(Vec::new(), format, Some(0)));
        }

        let mut rank: HashMap<String, usize> = HashMap::with_capacity(ids.len());
        for (position, id) in ids.iter().enumerate() {
            rank.entry(id.to_string()).or_insert(position);
        }

        options.filter = Some(FilterExpr::is_in("id", ids));
        options.range = None;
        options.limit = None;
        options.offset = None;

        let mut page = self
            .list_raw(collection, &options)
            .await?
            .decode::<Row>()
            .into_page()?;
        page.entries
            .sort_by_key(|entry| rank.get(&entry.id.to_string()).copied().unwrap_or(usize::MAX));
        Ok(shape_list(page.entries, format, page.total))
    }
}
