//! Schema registry
//!
//! Maps each type tag to the storage kind of its `v.<tag>` value field and
//! renders the index mapping. The registry is built once and shared behind an
//! `Arc`; adding tags means building a new registry.

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::{json, Map, Value};

use super::codec::VALUE_FIELD;

/// Built-in analyzers of the store, keyed by language code
const LANGUAGE_ANALYZERS: &[(&str, &str)] = &[
    ("ar", "arabic"),
    ("hy", "armenian"),
    ("eu", "basque"),
    ("bn", "bengali"),
    ("pt-br", "brazilian"),
    ("bg", "bulgarian"),
    ("ca", "catalan"),
    ("cs", "czech"),
    ("da", "danish"),
    ("nl", "dutch"),
    ("en", "english"),
    ("et", "estonian"),
    ("fi", "finnish"),
    ("fr", "french"),
    ("gl", "galician"),
    ("de", "german"),
    ("el", "greek"),
    ("hi", "hindi"),
    ("hu", "hungarian"),
    ("id", "indonesian"),
    ("ga", "irish"),
    ("it", "italian"),
    ("lv", "latvian"),
    ("lt", "lithuanian"),
    ("no", "norwegian"),
    ("fa", "persian"),
    ("pt", "portuguese"),
    ("ro", "romanian"),
    ("ru", "russian"),
    ("ckb", "sorani"),
    ("es", "spanish"),
    ("sv", "swedish"),
    ("tr", "turkish"),
    ("th", "thai"),
];

/// Storage kind of an indexed field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Keyword,
    Text,
    Boolean,
    Date,
    Float,
    Double,
    Integer,
}

impl FieldKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldKind::Keyword => "keyword",
            FieldKind::Text => "text",
            FieldKind::Boolean => "boolean",
            FieldKind::Date => "date",
            FieldKind::Float => "float",
            FieldKind::Double => "double",
            FieldKind::Integer => "integer",
        }
    }

    /// Numeric and date kinds, where an ill-typed lexical form is skipped
    /// instead of failing the whole document
    pub fn ignores_malformed(&self) -> bool {
        matches!(
            self,
            FieldKind::Date | FieldKind::Float | FieldKind::Double | FieldKind::Integer
        )
    }
}

/// How one field is indexed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    pub kind: FieldKind,
    pub analyzer: Option<String>,
    pub format: Option<String>,
}

impl FieldSpec {
    pub fn new(kind: FieldKind) -> Self {
        Self {
            kind,
            analyzer: None,
            format: None,
        }
    }

    pub fn keyword() -> Self {
        Self::new(FieldKind::Keyword)
    }

    pub fn text() -> Self {
        Self::new(FieldKind::Text)
    }

    pub fn with_analyzer(mut self, analyzer: impl Into<String>) -> Self {
        self.analyzer = Some(analyzer.into());
        self
    }

    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    /// Mapping JSON for this field
    pub fn to_mapping(&self) -> Value {
        let mut field = Map::new();
        field.insert("type".to_string(), json!(self.kind.as_str()));
        if let Some(analyzer) = &self.analyzer {
            field.insert("analyzer".to_string(), json!(analyzer));
        }
        if let Some(format) = &self.format {
            field.insert("format".to_string(), json!(format));
        }
        if self.kind.ignores_malformed() {
            field.insert("ignore_malformed".to_string(), json!(true));
        }
        Value::Object(field)
    }
}

/// Fields of the index: top-level fields plus one value field per tag
#[derive(Debug, Clone, PartialEq)]
pub struct IndexSchema {
    pub default_fields: IndexMap<String, FieldSpec>,
    pub per_tag: IndexMap<String, FieldSpec>,
}

impl IndexSchema {
    /// Render the mapping body, `{"properties": {...}}`
    pub fn to_mapping(&self) -> Value {
        let mut properties = Map::new();
        for (name, spec) in &self.default_fields {
            properties.insert(name.clone(), spec.to_mapping());
        }

        // Unregistered tags stay in _source but are not indexed
        let value_fields: Map<String, Value> = self
            .per_tag
            .iter()
            .map(|(tag, spec)| (tag.clone(), spec.to_mapping()))
            .collect();
        properties.insert(
            VALUE_FIELD.to_string(),
            json!({ "dynamic": false, "properties": value_fields }),
        );

        json!({ "properties": properties })
    }
}

/// Immutable tag → field spec registry
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaRegistry {
    specs: IndexMap<String, FieldSpec>,
}

impl SchemaRegistry {
    pub fn builder() -> SchemaRegistryBuilder {
        SchemaRegistryBuilder::new()
    }

    /// Registered tags, in registration order
    pub fn type_tags(&self) -> impl Iterator<Item = &str> {
        self.specs.keys().map(String::as_str)
    }

    pub fn field_spec(&self, tag: &str) -> Option<&FieldSpec> {
        self.specs.get(tag)
    }

    /// Spec for a tag, falling back to keyword for unregistered tags
    /// (languages without an analyzer)
    pub fn field_spec_or_default(&self, tag: &str) -> FieldSpec {
        self.field_spec(tag).cloned().unwrap_or_else(FieldSpec::keyword)
    }

    /// Field a value of this tag is indexed under
    pub fn value_field(&self, tag: &str) -> String {
        if self.specs.contains_key(tag) {
            format!("{}.{}", VALUE_FIELD, tag)
        } else {
            "o".to_string()
        }
    }

    pub fn index_schema(&self) -> IndexSchema {
        let default_fields = ["s", "p", "o", "g", "type", "datatype"]
            .into_iter()
            .map(|name| (name.to_string(), FieldSpec::keyword()))
            .collect();

        IndexSchema {
            default_fields,
            per_tag: self.specs.clone(),
        }
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}

impl Default for SchemaRegistry {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Builder for [`SchemaRegistry`]; starts from the standard tags
#[derive(Debug, Clone)]
pub struct SchemaRegistryBuilder {
    specs: IndexMap<String, FieldSpec>,
    languages: IndexMap<String, String>,
}

impl SchemaRegistryBuilder {
    fn new() -> Self {
        let mut specs = IndexMap::new();
        specs.insert("uri".to_string(), FieldSpec::keyword());
        specs.insert("node".to_string(), FieldSpec::keyword());
        specs.insert("token".to_string(), FieldSpec::keyword());
        specs.insert("literal".to_string(), FieldSpec::text());
        specs.insert("typed".to_string(), FieldSpec::keyword());
        specs.insert("boolean".to_string(), FieldSpec::new(FieldKind::Boolean));
        specs.insert("date".to_string(), FieldSpec::new(FieldKind::Date));
        specs.insert("dateTime".to_string(), FieldSpec::new(FieldKind::Date));
        specs.insert("decimal".to_string(), FieldSpec::new(FieldKind::Float));
        specs.insert("double".to_string(), FieldSpec::new(FieldKind::Double));
        specs.insert("integer".to_string(), FieldSpec::new(FieldKind::Integer));
        specs.insert(
            "time".to_string(),
            FieldSpec::new(FieldKind::Date).with_format("HH:mm:ssZ"),
        );

        let languages = LANGUAGE_ANALYZERS
            .iter()
            .map(|(code, analyzer)| (code.to_string(), analyzer.to_string()))
            .collect();

        Self { specs, languages }
    }

    /// Register (or replace) an analyzer for a language code
    pub fn language(mut self, code: &str, analyzer: &str) -> Self {
        self.languages.insert(code.to_ascii_lowercase(), analyzer.to_string());
        self
    }

    /// Register (or replace) a tag
    pub fn tag(mut self, tag: &str, spec: FieldSpec) -> Self {
        self.specs.insert(tag.to_string(), spec);
        self
    }

    /// Drop every language analyzer registered so far
    pub fn without_language_analyzers(mut self) -> Self {
        self.languages.clear();
        self
    }

    pub fn build(self) -> SchemaRegistry {
        let mut specs = self.specs;
        for (code, analyzer) in self.languages {
            specs.insert(
                format!("lang_{}", code),
                FieldSpec::text().with_analyzer(analyzer),
            );
        }
        SchemaRegistry { specs }
    }
}
