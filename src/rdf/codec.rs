//! Term and statement codec
//!
//! Maps statements to index documents `{s, p, o, g?, type, datatype?, v}` and
//! back. The `type` field carries a [`TypeTag`] that records how the object
//! was written, so decoding restores IRIs, blank nodes and every literal kind
//! exactly. The object value is also copied to `v.<tag>`, the one field whose
//! mapping matches its type; decoding never reads it.
//!
//! Subject and graph values are stored as bare strings. On the way back a
//! value that parses as an absolute IRI is an IRI, otherwise it must be a
//! valid blank node identifier. Anything else is reported rather than guessed.

use std::borrow::Cow;
use std::fmt;

use oxiri::Iri;
use oxrdf::vocab::xsd;
use oxrdf::NamedNodeRef;
use serde::Deserialize;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use thiserror::Error;

use super::types::{BlankNode, Literal, LiteralKind, NamedNode, Resource, Statement, StatementId, Term};

/// Codec errors
#[derive(Error, Debug)]
pub enum CodecError {
    /// A statement position is unbound
    #[error("Statement is incomplete: missing {0}")]
    IncompleteStatement(&'static str),

    /// Stored type tag is not one this codec writes
    #[error("Unknown type tag: {0}")]
    UnknownTypeTag(String),

    /// Stored resource is neither an absolute IRI nor a blank node id
    #[error("Cannot classify resource value: {0:?}")]
    AmbiguousResourceForm(String),

    /// A term of the wrong kind for its position
    #[error("A {kind} cannot be used as {position}")]
    InvalidPosition {
        position: &'static str,
        kind: &'static str,
    },

    /// Invalid IRI, blank node id or language tag
    #[error("Invalid term: {0}")]
    InvalidTerm(String),

    /// Document lacks a field required by its type tag
    #[error("Document is missing field: {0}")]
    MissingField(&'static str),

    /// Document source is not the expected JSON shape
    #[error("Malformed document: {0}")]
    Deserialize(#[from] serde_json::Error),
}

pub type CodecResult<T> = Result<T, CodecError>;

/// Type discriminator stored with each document
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeTag {
    Uri,
    Node,
    Literal,
    /// `lang_<code>`
    Language(String),
    Boolean,
    Date,
    DateTime,
    Decimal,
    Double,
    Integer,
    Time,
    Token,
    /// Any other datatype; the IRI goes in the `datatype` field
    Typed,
}

/// Datatype aliases with a dedicated tag
static DATATYPE_ALIASES: [(TypeTag, NamedNodeRef<'static>); 8] = [
    (TypeTag::Boolean, xsd::BOOLEAN),
    (TypeTag::Date, xsd::DATE),
    (TypeTag::DateTime, xsd::DATE_TIME),
    (TypeTag::Decimal, xsd::DECIMAL),
    (TypeTag::Double, xsd::DOUBLE),
    (TypeTag::Integer, xsd::INTEGER),
    (TypeTag::Time, xsd::TIME),
    (TypeTag::Token, xsd::TOKEN),
];

const LANGUAGE_PREFIX: &str = "lang_";

impl TypeTag {
    /// Parse the stored string form
    pub fn parse(tag: &str) -> CodecResult<Self> {
        let parsed = match tag {
            "uri" => TypeTag::Uri,
            "node" => TypeTag::Node,
            "literal" => TypeTag::Literal,
            "boolean" => TypeTag::Boolean,
            "date" => TypeTag::Date,
            "dateTime" => TypeTag::DateTime,
            "decimal" => TypeTag::Decimal,
            "double" => TypeTag::Double,
            "integer" => TypeTag::Integer,
            "time" => TypeTag::Time,
            "token" => TypeTag::Token,
            "typed" => TypeTag::Typed,
            other => match other.strip_prefix(LANGUAGE_PREFIX) {
                Some(code) if !code.is_empty() => TypeTag::Language(code.to_string()),
                _ => return Err(CodecError::UnknownTypeTag(other.to_string())),
            },
        };
        Ok(parsed)
    }

    pub fn as_str(&self) -> Cow<'static, str> {
        match self {
            TypeTag::Language(code) => Cow::Owned(format!("{}{}", LANGUAGE_PREFIX, code)),
            TypeTag::Uri => Cow::Borrowed("uri"),
            TypeTag::Node => Cow::Borrowed("node"),
            TypeTag::Literal => Cow::Borrowed("literal"),
            TypeTag::Boolean => Cow::Borrowed("boolean"),
            TypeTag::Date => Cow::Borrowed("date"),
            TypeTag::DateTime => Cow::Borrowed("dateTime"),
            TypeTag::Decimal => Cow::Borrowed("decimal"),
            TypeTag::Double => Cow::Borrowed("double"),
            TypeTag::Integer => Cow::Borrowed("integer"),
            TypeTag::Time => Cow::Borrowed("time"),
            TypeTag::Token => Cow::Borrowed("token"),
            TypeTag::Typed => Cow::Borrowed("typed"),
        }
    }

    /// Tag for a literal datatype, when it is one of the aliases
    pub fn for_datatype(datatype: &NamedNode) -> Option<Self> {
        DATATYPE_ALIASES
            .iter()
            .find(|(_, iri)| iri.as_str() == datatype.as_str())
            .map(|(tag, _)| tag.clone())
    }

    /// Datatype implied by an alias tag
    pub fn datatype(&self) -> Option<NamedNode> {
        DATATYPE_ALIASES
            .iter()
            .find(|(tag, _)| tag == self)
            .map(|(_, iri)| NamedNode::from(iri.into_owned()))
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_str())
    }
}

/// Object holding the per-tag copy of the object value
pub const VALUE_FIELD: &str = "v";

/// Object value as stored: lexical form plus datatype for `typed`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectFields {
    pub o: String,
    pub datatype: Option<String>,
}

/// Index document for one statement
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Document {
    pub s: String,
    pub p: String,
    pub o: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub g: Option<String>,
    #[serde(rename = "type")]
    pub tag: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub datatype: Option<String>,
}

impl Document {
    pub fn type_tag(&self) -> CodecResult<TypeTag> {
        TypeTag::parse(&self.tag)
    }

    pub fn object_fields(&self) -> ObjectFields {
        ObjectFields {
            o: self.o.clone(),
            datatype: self.datatype.clone(),
        }
    }

    /// Read a document from a stored `_source`
    pub fn from_value(source: Value) -> CodecResult<Self> {
        Ok(serde_json::from_value(source)?)
    }

    /// Render the `_source` to store
    pub fn to_value(&self) -> Value {
        let mut map = Map::new();
        map.insert("s".to_string(), Value::String(self.s.clone()));
        map.insert("p".to_string(), Value::String(self.p.clone()));
        map.insert("o".to_string(), Value::String(self.o.clone()));
        if let Some(g) = &self.g {
            map.insert("g".to_string(), Value::String(g.clone()));
        }
        map.insert("type".to_string(), Value::String(self.tag.clone()));
        if let Some(datatype) = &self.datatype {
            map.insert("datatype".to_string(), Value::String(datatype.clone()));
        }
        let mut by_tag = Map::new();
        by_tag.insert(self.tag.clone(), Value::String(self.o.clone()));
        map.insert(VALUE_FIELD.to_string(), Value::Object(by_tag));
        Value::Object(map)
    }
}

/// Encode an object term
pub fn encode_term(term: &Term) -> (TypeTag, ObjectFields) {
    let fields = |o: &str, datatype: Option<String>| ObjectFields {
        o: o.to_string(),
        datatype,
    };

    match term {
        Term::NamedNode(n) => (TypeTag::Uri, fields(n.as_str(), None)),
        Term::BlankNode(b) => (TypeTag::Node, fields(b.as_str(), None)),
        Term::Literal(lit) => match lit.kind() {
            LiteralKind::Plain => (TypeTag::Literal, fields(lit.value(), None)),
            LiteralKind::Language(code) => (TypeTag::Language(code), fields(lit.value(), None)),
            LiteralKind::Datatype(datatype) => match TypeTag::for_datatype(&datatype) {
                Some(alias) => (alias, fields(lit.value(), None)),
                None => (
                    TypeTag::Typed,
                    fields(lit.value(), Some(datatype.as_str().to_string())),
                ),
            },
        },
    }
}

/// Decode an object term from its tag and stored fields
pub fn decode_term(tag: &TypeTag, fields: &ObjectFields) -> CodecResult<Term> {
    let value = fields.o.as_str();
    let term: Term = match tag {
        TypeTag::Uri => NamedNode::new(value)?.into(),
        TypeTag::Node => BlankNode::from_id(value)?.into(),
        TypeTag::Literal => Literal::plain(value).into(),
        TypeTag::Language(code) => Literal::language_tagged(value, code.as_str())?.into(),
        TypeTag::Typed => {
            let datatype = fields
                .datatype
                .as_deref()
                .ok_or(CodecError::MissingField("datatype"))?;
            Literal::typed(value, NamedNode::new(datatype)?).into()
        }
        alias => {
            let datatype = alias
                .datatype()
                .ok_or_else(|| CodecError::UnknownTypeTag(alias.to_string()))?;
            Literal::typed(value, datatype).into()
        }
    };
    Ok(term)
}

/// Classify a stored subject or graph value
pub fn decode_resource(value: &str) -> CodecResult<Resource> {
    if Iri::parse(value).is_ok() {
        return Ok(NamedNode::new(value)?.into());
    }
    BlankNode::from_id(value)
        .map(Resource::from)
        .map_err(|_| CodecError::AmbiguousResourceForm(value.to_string()))
}

pub fn statement_to_document(statement: &Statement) -> Document {
    let (tag, object) = encode_term(&statement.object);
    Document {
        s: statement.subject.as_str().to_string(),
        p: statement.predicate.as_str().to_string(),
        o: object.o,
        g: statement.graph_name.as_ref().map(|g| g.as_str().to_string()),
        tag: tag.to_string(),
        datatype: object.datatype,
    }
}

pub fn document_to_statement(document: &Document) -> CodecResult<Statement> {
    let subject = decode_resource(&document.s)?;
    let predicate = NamedNode::new(document.p.as_str())?;
    let object = decode_term(&document.type_tag()?, &document.object_fields())?;
    let graph_name = document.g.as_deref().map(decode_resource).transpose()?;

    Ok(Statement {
        subject,
        predicate,
        object,
        graph_name,
    })
}

/// First 8 bytes (big endian) of SHA-256 over the N-Quads line
pub fn statement_id(statement: &Statement) -> StatementId {
    let digest = Sha256::digest(statement.to_string().as_bytes());
    let mut prefix = [0u8; 8];
    prefix.copy_from_slice(&digest[..8]);
    StatementId(u64::from_be_bytes(prefix))
}
