//! Filter trees for document queries
//!
//! A [`FilterTree`] is plain recursive data built by ordinary function
//! composition. [`crate::dsl`] renders it to the Elasticsearch query wire
//! format and [`crate::MemoryStore`] evaluates it directly.

use serde::{Deserialize, Serialize};

/// Boolean filter over document fields
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterTree {
    /// Matches every document
    MatchAll,
    /// Exact (keyword) equality
    Equals { field: String, value: String },
    /// Field is present
    Exists { field: String },
    /// Field is absent
    NotExists { field: String },
    /// Full-text match against an analyzed field
    Match { field: String, text: String },
    /// Logical AND of all clauses
    And(Vec<FilterTree>),
}

impl FilterTree {
    pub fn equals(field: impl Into<String>, value: impl Into<String>) -> Self {
        FilterTree::Equals {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn exists(field: impl Into<String>) -> Self {
        FilterTree::Exists { field: field.into() }
    }

    pub fn not_exists(field: impl Into<String>) -> Self {
        FilterTree::NotExists { field: field.into() }
    }

    pub fn text_match(field: impl Into<String>, text: impl Into<String>) -> Self {
        FilterTree::Match {
            field: field.into(),
            text: text.into(),
        }
    }

    /// Conjoin clauses.
    ///
    /// Nested conjunctions are flattened and `MatchAll` clauses dropped. An
    /// empty conjunction is `MatchAll`; a single clause is returned unwrapped.
    pub fn and(clauses: impl IntoIterator<Item = FilterTree>) -> Self {
        let mut flat = Vec::new();
        for clause in clauses {
            match clause {
                FilterTree::MatchAll => {}
                FilterTree::And(inner) => flat.extend(inner),
                other => flat.push(other),
            }
        }

        match flat.len() {
            0 => FilterTree::MatchAll,
            1 => flat.remove(0),
            _ => FilterTree::And(flat),
        }
    }

    pub fn is_match_all(&self) -> bool {
        matches!(self, FilterTree::MatchAll)
    }
}

impl Default for FilterTree {
    fn default() -> Self {
        FilterTree::MatchAll
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_conjunction_is_match_all() {
        assert_eq!(FilterTree::and(Vec::new()), FilterTree::MatchAll);
        assert_eq!(FilterTree::and(vec![FilterTree::MatchAll]), FilterTree::MatchAll);
    }

    #[test]
    fn test_single_clause_unwrapped() {
        let f = FilterTree::and(vec![FilterTree::equals("s", "urn:a")]);
        assert_eq!(f, FilterTree::equals("s", "urn:a"));
    }

    #[test]
    fn test_nested_and_flattened() {
        let inner = FilterTree::and(vec![
            FilterTree::equals("s", "urn:a"),
            FilterTree::equals("p", "urn:p"),
        ]);
        let outer = FilterTree::and(vec![inner, FilterTree::not_exists("g")]);

        match outer {
            FilterTree::And(clauses) => {
                assert_eq!(clauses.len(), 3);
                assert_eq!(clauses[2], FilterTree::not_exists("g"));
            }
            other => panic!("expected conjunction, got {:?}", other),
        }
    }
}
