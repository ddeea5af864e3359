//! Document index client for rdf-docindex
//!
//! Provides the store-facing half of the system:
//!
//! - **`FilterTree`**: plain recursive filter data, rendered to the
//!   Elasticsearch query DSL by [`dsl`].
//! - **`DocumentStore`**: blocking interface used by the repository facade.
//! - **`HttpStore`**: talks to an Elasticsearch-compatible server.
//! - **`MemoryStore`**: in-process index for tests, benches and embedded use.
//!
//! # Quick Start
//!
//! ```rust
//! use docindex_client::{DocumentStore, FilterTree, MemoryStore};
//! use serde_json::json;
//!
//! let store = MemoryStore::new();
//! store.create_index("quadb", &json!({ "properties": {} })).unwrap();
//! store.index_document("quadb", "1", &json!({ "s": "urn:a", "p": "urn:p", "o": "x" }), true).unwrap();
//!
//! let hits = store.count("quadb", &FilterTree::equals("s", "urn:a")).unwrap();
//! assert_eq!(hits, 1);
//! ```

pub mod client;
pub mod dsl;
pub mod error;
pub mod filter;
pub mod http;
pub mod memory;
pub mod models;

pub use client::DocumentStore;
pub use error::{StoreError, StoreResult};
pub use filter::FilterTree;
pub use http::HttpStore;
pub use memory::MemoryStore;
pub use models::{
    BulkAction, BulkItemResult, BulkOperation, DeleteByQueryOutcome, DeleteOutcome, Hit, ScrollPage,
};
