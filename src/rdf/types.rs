//! RDF type definitions
//!
//! Thin wrappers around oxrdf primitives plus the statement and pattern
//! shapes the store works with. Subject and graph positions only admit a
//! [`Resource`]; the predicate is always a [`NamedNode`].

use std::fmt;

use oxrdf::vocab::xsd;
use oxrdf::{BlankNode as OxBlankNode, Literal as OxLiteral, NamedNode as OxNamedNode};

use super::codec::{CodecError, CodecResult};

/// Named node (IRI)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NamedNode(OxNamedNode);

impl NamedNode {
    /// Create a named node, validating the IRI
    pub fn new(iri: impl Into<String>) -> CodecResult<Self> {
        OxNamedNode::new(iri)
            .map(Self)
            .map_err(|e| CodecError::InvalidTerm(e.to_string()))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for NamedNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<OxNamedNode> for NamedNode {
    fn from(node: OxNamedNode) -> Self {
        Self(node)
    }
}

/// Blank node
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BlankNode(OxBlankNode);

impl BlankNode {
    /// Create a blank node with a fresh unique identifier
    pub fn new() -> Self {
        Self(OxBlankNode::default())
    }

    /// Create a blank node from an existing identifier
    pub fn from_id(id: impl Into<String>) -> CodecResult<Self> {
        OxBlankNode::new(id)
            .map(Self)
            .map_err(|e| CodecError::InvalidTerm(e.to_string()))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl Default for BlankNode {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for BlankNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<OxBlankNode> for BlankNode {
    fn from(node: OxBlankNode) -> Self {
        Self(node)
    }
}

/// How a literal qualifies its lexical form
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LiteralKind {
    /// No language and the implicit `xsd:string` datatype
    Plain,
    /// Language-tagged (`"chat"@fr`)
    Language(String),
    /// Any datatype other than `xsd:string`
    Datatype(NamedNode),
}

/// RDF literal value
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Literal(OxLiteral);

impl Literal {
    pub fn plain(value: impl Into<String>) -> Self {
        Self(OxLiteral::new_simple_literal(value))
    }

    /// Language-tagged literal; the tag is validated and normalised to lowercase
    pub fn language_tagged(value: impl Into<String>, language: impl Into<String>) -> CodecResult<Self> {
        OxLiteral::new_language_tagged_literal(value, language)
            .map(Self)
            .map_err(|e| CodecError::InvalidTerm(e.to_string()))
    }

    /// Typed literal. Typing with `xsd:string` yields a plain literal.
    pub fn typed(value: impl Into<String>, datatype: NamedNode) -> Self {
        Self(OxLiteral::new_typed_literal(value, datatype.0))
    }

    pub fn value(&self) -> &str {
        self.0.value()
    }

    pub fn kind(&self) -> LiteralKind {
        if let Some(language) = self.0.language() {
            return LiteralKind::Language(language.to_string());
        }
        let datatype = self.0.datatype();
        if datatype == xsd::STRING {
            LiteralKind::Plain
        } else {
            LiteralKind::Datatype(NamedNode(datatype.into_owned()))
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<OxLiteral> for Literal {
    fn from(lit: OxLiteral) -> Self {
        Self(lit)
    }
}

/// Subject or graph name: an IRI or a blank node
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Resource {
    NamedNode(NamedNode),
    BlankNode(BlankNode),
}

impl Resource {
    /// Stored form: the IRI, or the bare blank node identifier
    pub fn as_str(&self) -> &str {
        match self {
            Resource::NamedNode(n) => n.as_str(),
            Resource::BlankNode(b) => b.as_str(),
        }
    }

    pub fn is_blank_node(&self) -> bool {
        matches!(self, Resource::BlankNode(_))
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resource::NamedNode(n) => write!(f, "{}", n),
            Resource::BlankNode(b) => write!(f, "{}", b),
        }
    }
}

impl From<NamedNode> for Resource {
    fn from(node: NamedNode) -> Self {
        Resource::NamedNode(node)
    }
}

impl From<BlankNode> for Resource {
    fn from(node: BlankNode) -> Self {
        Resource::BlankNode(node)
    }
}

impl TryFrom<Term> for Resource {
    type Error = CodecError;

    fn try_from(term: Term) -> CodecResult<Self> {
        match term {
            Term::NamedNode(n) => Ok(Resource::NamedNode(n)),
            Term::BlankNode(b) => Ok(Resource::BlankNode(b)),
            Term::Literal(_) => Err(CodecError::InvalidPosition {
                position: "resource",
                kind: "literal",
            }),
        }
    }
}

/// Any RDF term
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Term {
    NamedNode(NamedNode),
    BlankNode(BlankNode),
    Literal(Literal),
}

impl Term {
    fn kind_name(&self) -> &'static str {
        match self {
            Term::NamedNode(_) => "named node",
            Term::BlankNode(_) => "blank node",
            Term::Literal(_) => "literal",
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::NamedNode(n) => write!(f, "{}", n),
            Term::BlankNode(b) => write!(f, "{}", b),
            Term::Literal(l) => write!(f, "{}", l),
        }
    }
}

impl From<NamedNode> for Term {
    fn from(node: NamedNode) -> Self {
        Term::NamedNode(node)
    }
}

impl From<BlankNode> for Term {
    fn from(node: BlankNode) -> Self {
        Term::BlankNode(node)
    }
}

impl From<Literal> for Term {
    fn from(lit: Literal) -> Self {
        Term::Literal(lit)
    }
}

impl From<Resource> for Term {
    fn from(resource: Resource) -> Self {
        match resource {
            Resource::NamedNode(n) => Term::NamedNode(n),
            Resource::BlankNode(b) => Term::BlankNode(b),
        }
    }
}

/// A quad: triple plus optional graph name (`None` = default graph)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Statement {
    pub subject: Resource,
    pub predicate: NamedNode,
    pub object: Term,
    pub graph_name: Option<Resource>,
}

impl Statement {
    pub fn new(
        subject: impl Into<Resource>,
        predicate: NamedNode,
        object: impl Into<Term>,
        graph_name: Option<Resource>,
    ) -> Self {
        Self {
            subject: subject.into(),
            predicate,
            object: object.into(),
            graph_name,
        }
    }

    /// Build a statement from loosely typed positions.
    ///
    /// Missing subject, predicate or object is `IncompleteStatement`; a term of
    /// the wrong kind for its position is `InvalidPosition`.
    pub fn from_terms(
        subject: Option<Term>,
        predicate: Option<Term>,
        object: Option<Term>,
        graph_name: Option<Term>,
    ) -> CodecResult<Self> {
        let subject = subject.ok_or(CodecError::IncompleteStatement("subject"))?;
        let predicate = predicate.ok_or(CodecError::IncompleteStatement("predicate"))?;
        let object = object.ok_or(CodecError::IncompleteStatement("object"))?;

        let subject = resource_in(subject, "subject")?;
        let predicate = match predicate {
            Term::NamedNode(n) => n,
            other => {
                return Err(CodecError::InvalidPosition {
                    position: "predicate",
                    kind: other.kind_name(),
                })
            }
        };
        let graph_name = graph_name.map(|g| resource_in(g, "graph")).transpose()?;

        Ok(Self {
            subject,
            predicate,
            object,
            graph_name,
        })
    }

    pub fn in_default_graph(&self) -> bool {
        self.graph_name.is_none()
    }
}

fn resource_in(term: Term, position: &'static str) -> CodecResult<Resource> {
    Resource::try_from(term).map_err(|_| CodecError::InvalidPosition {
        position,
        kind: "literal",
    })
}

/// N-Quads line, the canonical string form
impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.subject, self.predicate, self.object)?;
        if let Some(graph) = &self.graph_name {
            write!(f, " {}", graph)?;
        }
        write!(f, " .")
    }
}

/// Statement identifier derived from the canonical string form
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StatementId(pub u64);

impl fmt::Display for StatementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Graph position of a pattern
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum GraphPattern {
    /// Unbound: any graph, including the default graph
    #[default]
    Any,
    /// Explicitly the default graph (no graph name)
    DefaultGraph,
    /// A specific named graph
    Named(Resource),
    /// Any named graph, excluding the default graph
    AnyNamed,
}

/// Quad pattern; `None` positions are unbound
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct QuadPattern {
    pub subject: Option<Resource>,
    pub predicate: Option<NamedNode>,
    pub object: Option<Term>,
    pub graph: GraphPattern,
}

impl QuadPattern {
    /// Pattern with every position unbound
    pub fn any() -> Self {
        Self::default()
    }

    pub fn with_subject(mut self, subject: impl Into<Resource>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    pub fn with_predicate(mut self, predicate: NamedNode) -> Self {
        self.predicate = Some(predicate);
        self
    }

    pub fn with_object(mut self, object: impl Into<Term>) -> Self {
        self.object = Some(object.into());
        self
    }

    pub fn with_graph(mut self, graph: GraphPattern) -> Self {
        self.graph = graph;
        self
    }

    /// Check a statement against this pattern
    pub fn matches(&self, statement: &Statement) -> bool {
        if let Some(ref s) = self.subject {
            if s != &statement.subject {
                return false;
            }
        }
        if let Some(ref p) = self.predicate {
            if p != &statement.predicate {
                return false;
            }
        }
        if let Some(ref o) = self.object {
            if o != &statement.object {
                return false;
            }
        }
        match &self.graph {
            GraphPattern::Any => true,
            GraphPattern::DefaultGraph => statement.graph_name.is_none(),
            GraphPattern::Named(g) => statement.graph_name.as_ref() == Some(g),
            GraphPattern::AnyNamed => statement.graph_name.is_some(),
        }
    }
}

impl From<&Statement> for QuadPattern {
    fn from(statement: &Statement) -> Self {
        Self {
            subject: Some(statement.subject.clone()),
            predicate: Some(statement.predicate.clone()),
            object: Some(statement.object.clone()),
            graph: match &statement.graph_name {
                Some(g) => GraphPattern::Named(g.clone()),
                None => GraphPattern::DefaultGraph,
            },
        }
    }
}

/// A fully bound pattern is a statement
impl TryFrom<QuadPattern> for Statement {
    type Error = CodecError;

    fn try_from(pattern: QuadPattern) -> CodecResult<Self> {
        let graph_name = match pattern.graph {
            GraphPattern::DefaultGraph => None,
            GraphPattern::Named(g) => Some(g),
            GraphPattern::Any | GraphPattern::AnyNamed => {
                return Err(CodecError::IncompleteStatement("graph"))
            }
        };
        Ok(Self {
            subject: pattern.subject.ok_or(CodecError::IncompleteStatement("subject"))?,
            predicate: pattern.predicate.ok_or(CodecError::IncompleteStatement("predicate"))?,
            object: pattern.object.ok_or(CodecError::IncompleteStatement("object"))?,
            graph_name,
        })
    }
}
