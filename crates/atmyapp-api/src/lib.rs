//! AtMyApp API client library
//!
//! The crate turns structured collection queries into the wire format the
//! AtMyApp collections service understands, issues them over HTTP, and shapes
//! the returned rows into the representation the caller asked for.
//!
//! # Quick Start
//!
//! For convenient imports, use the prelude:
//!
//! ```
//! use atmyapp_api_rs::prelude::*;
//!
//! let filter = FilterExpr::and([
//!     FilterExpr::eq("status", "done"),
//!     FilterExpr::gte("total", 100),
//! ]);
//! let options = ListOptions::new().filter(filter).limit(10);
//! let params = build_params(&options).unwrap();
//! assert_eq!(params.get("status.eq"), Some("done"));
//! ```

pub mod analytics;
pub mod client;
pub mod collections;
pub mod error;
pub mod meta;
pub mod prelude;
pub mod storage;
