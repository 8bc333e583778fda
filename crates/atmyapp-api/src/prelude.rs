//! Prelude module for convenient imports.
//!
//! # Example
//!
//! ```
//! use atmyapp_api_rs::prelude::*;
//!
//! // Now you have access to:
//! // - AtMyAppClient, AtMyAppClientBuilder, FetchMode (API client)
//! // - Error, ApiError, QueryError, Result (error handling)
//! // - FilterExpr, ListOptions, build_params (collection queries)
//! // - Format, ListResult, SingleResult (response shaping)
//! ```

// Client types
pub use crate::client::{AtMyAppClient, AtMyAppClientBuilder, FetchMode};

// Error types
pub use crate::error::{ApiError, Error, QueryError, Result};

// Collection queries
pub use crate::collections::{
    build_params, compile_filter, shape_list, shape_single, EntriesPage, EntryId, FilterExpr,
    Format, ListOptions, ListResult, Op, Primitive, QueryParams, RawEntry, ResponseEnvelope,
    Select, SingleResult,
};

// Metadata, storage and analytics
pub use crate::analytics::EventData;
pub use crate::meta::HeadConfig;
pub use crate::storage::{clean_path, AssetKind, StoredAsset};
