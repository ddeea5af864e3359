use docindex_client::FilterTree;

use crate::rdf::{encode_term, GraphPattern, QuadPattern, SchemaRegistry, Term, TypeTag};

/// Translate a pattern into a store filter.
///
/// A bound object compares the shared `o` field, plus `datatype` for a custom
/// typed literal. The type tag is not compared, so a literal and an IRI with
/// the same string form both match. Use [`typed_pattern_filter`] to require
/// the exact term type.
pub fn pattern_to_filter(pattern: &QuadPattern) -> FilterTree {
    let mut clauses = Vec::with_capacity(4);

    if let Some(subject) = &pattern.subject {
        clauses.push(FilterTree::equals("s", subject.as_str()));
    }
    if let Some(predicate) = &pattern.predicate {
        clauses.push(FilterTree::equals("p", predicate.as_str()));
    }
    if let Some(object) = &pattern.object {
        let (_, fields) = encode_term(object);
        clauses.push(FilterTree::equals("o", fields.o));
        if let Some(datatype) = fields.datatype {
            clauses.push(FilterTree::equals("datatype", datatype));
        }
    }
    match &pattern.graph {
        GraphPattern::Any => {}
        GraphPattern::DefaultGraph => clauses.push(FilterTree::not_exists("g")),
        GraphPattern::Named(graph) => clauses.push(FilterTree::equals("g", graph.as_str())),
        GraphPattern::AnyNamed => clauses.push(FilterTree::exists("g")),
    }

    FilterTree::and(clauses)
}

/// Clauses that pin an object's type tag (and datatype for `typed`)
pub fn object_type_filter(object: &Term) -> FilterTree {
    let (tag, fields) = encode_term(object);
    let mut clauses = vec![FilterTree::equals("type", tag.to_string())];
    if let Some(datatype) = fields.datatype {
        clauses.push(FilterTree::equals("datatype", datatype));
    }
    FilterTree::and(clauses)
}

/// Pattern filter that also requires the bound object's exact type
pub fn typed_pattern_filter(pattern: &QuadPattern) -> FilterTree {
    let base = pattern_to_filter(pattern);
    match &pattern.object {
        Some(object) => {
            let (tag, _) = encode_term(object);
            FilterTree::and([base, FilterTree::equals("type", tag.to_string())])
        }
        None => base,
    }
}

/// Full-text search over the values stored with a given type tag
pub fn text_search_filter(registry: &SchemaRegistry, tag: &TypeTag, text: &str) -> FilterTree {
    let tag = tag.to_string();
    FilterTree::and([
        FilterTree::equals("type", tag.as_str()),
        FilterTree::text_match(registry.value_field(&tag), text),
    ])
}
