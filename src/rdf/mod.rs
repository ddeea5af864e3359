//! RDF data model and its document encoding
//!
//! - [`types`]: terms, statements and quad patterns over oxrdf primitives
//! - [`codec`]: statement ⇄ index document, type tags, statement ids
//! - [`schema`]: per-tag field specs and the index mapping
//!
//! # Example
//!
//! ```rust
//! use rdf_docindex::rdf::{statement_to_document, document_to_statement, Literal, NamedNode, Statement};
//!
//! let statement = Statement::new(
//!     NamedNode::new("http://example.org/alice").unwrap(),
//!     NamedNode::new("http://xmlns.com/foaf/0.1/name").unwrap(),
//!     Literal::language_tagged("Alice", "en").unwrap(),
//!     None,
//! );
//!
//! let document = statement_to_document(&statement);
//! assert_eq!(document.tag, "lang_en");
//! assert_eq!(document_to_statement(&document).unwrap(), statement);
//! ```

pub mod codec;
pub mod schema;
pub mod types;

pub use codec::{
    decode_resource, decode_term, document_to_statement, encode_term, statement_id,
    statement_to_document, CodecError, CodecResult, Document, ObjectFields, TypeTag, VALUE_FIELD,
};
pub use schema::{FieldKind, FieldSpec, IndexSchema, SchemaRegistry, SchemaRegistryBuilder};
pub use types::{
    BlankNode, GraphPattern, Literal, LiteralKind, NamedNode, QuadPattern, Resource, Statement,
    StatementId, Term,
};
