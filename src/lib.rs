//! RDF DocIndex
//!
//! An RDF quad store persisted in an Elasticsearch-compatible document index.
//!
//! # Architecture
//!
//! - [`rdf`]: terms, statements, the statement ⇄ document codec and the
//!   per-type-tag index schema
//! - [`query`]: quad pattern → store filter translation
//! - [`repository`]: statement operations over any
//!   [`DocumentStore`](docindex_client::DocumentStore)
//! - [`config`]: YAML repository configuration
//!
//! Statements become documents `{s, p, o, g?, type, datatype?}` keyed by a
//! 64-bit hash of their N-Quads form. The `type` field records how the object
//! was written so it decodes to the exact same term.
//!
//! ## Example Usage
//! ```rust
//! use docindex_client::MemoryStore;
//! use rdf_docindex::{GraphPattern, Literal, NamedNode, QuadPattern, Repository, RepositoryConfig, Statement};
//!
//! let repo = Repository::new(MemoryStore::new(), RepositoryConfig::default());
//!
//! let alice = NamedNode::new("http://example.org/alice").unwrap();
//! let name = NamedNode::new("http://xmlns.com/foaf/0.1/name").unwrap();
//! repo.insert(&Statement::new(alice.clone(), name.clone(), Literal::plain("Alice"), None)).unwrap();
//!
//! let pattern = QuadPattern::any()
//!     .with_subject(alice)
//!     .with_graph(GraphPattern::DefaultGraph);
//! let found: Vec<_> = repo.scan(&pattern).unwrap().collect::<Result<_, _>>().unwrap();
//! assert_eq!(found.len(), 1);
//! ```

#![allow(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod query;
pub mod rdf;
pub mod repository;

pub use config::{ConfigError, ConfigResult, RepositoryConfig};

pub use query::{object_type_filter, pattern_to_filter, text_search_filter, typed_pattern_filter};

pub use rdf::{
    BlankNode, CodecError, CodecResult, Document, FieldKind, FieldSpec, GraphPattern, IndexSchema,
    Literal, LiteralKind, NamedNode, QuadPattern, Resource, SchemaRegistry, Statement, StatementId,
    Term, TypeTag,
};

pub use repository::{
    BatchFailure, Changeset, ChangesetReport, Feature, Readiness, Repository, RepositoryError,
    RepositoryResult, StatementIter,
};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get version string
pub fn version() -> &'static str {
    VERSION
}
