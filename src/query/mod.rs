//! Pattern translation
//!
//! Turns quad patterns into [`FilterTree`](docindex_client::FilterTree)s the
//! document store evaluates. Bound positions become equality clauses; the
//! graph position distinguishes unbound, explicitly default, a specific named
//! graph and any named graph.

pub mod translate;

pub use translate::{object_type_filter, pattern_to_filter, text_search_filter, typed_pattern_filter};
