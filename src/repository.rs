//! Repository facade
//!
//! Statement-level operations over a [`DocumentStore`]. The index is created
//! and its mapping applied lazily on first use; after that every operation is
//! one or a few store calls keyed by the statement id.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};

use docindex_client::{
    BulkAction, BulkOperation, DocumentStore, FilterTree, Hit, HttpStore, StoreError,
};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::RepositoryConfig;
use crate::query::{pattern_to_filter, text_search_filter};
use crate::rdf::{
    document_to_statement, statement_id, statement_to_document, CodecError, Document, QuadPattern,
    Resource, SchemaRegistry, Statement, TypeTag,
};

/// Repository errors
#[derive(Error, Debug)]
pub enum RepositoryError {
    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Some operations of a changeset were applied, others failed
    #[error("Changeset partially applied: {applied} succeeded, {} failed", .failures.len())]
    PartialBatchFailure {
        applied: usize,
        failures: Vec<BatchFailure>,
    },
}

pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// One failed operation inside a changeset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchFailure {
    /// Document id of the statement
    pub id: String,
    pub action: BulkAction,
    /// Store status, when the store answered
    pub status: Option<u16>,
    pub reason: String,
}

/// Index lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    Uninitialized,
    /// Index exists; mapping not yet applied
    SchemaEnsured,
    Ready,
}

/// Optional capabilities a caller can query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Feature {
    /// Named graphs are stored
    GraphName,
    /// Changesets are applied in one request
    AtomicWrite,
    /// Statements are validated
    Validity,
    /// Literals compare by value rather than lexical form
    LiteralEquality,
}

/// Statements to delete and insert together. Deletes run first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Changeset {
    pub deletes: Vec<Statement>,
    pub inserts: Vec<Statement>,
}

impl Changeset {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, statement: Statement) -> &mut Self {
        self.inserts.push(statement);
        self
    }

    pub fn delete(&mut self, statement: Statement) -> &mut Self {
        self.deletes.push(statement);
        self
    }

    pub fn len(&self) -> usize {
        self.deletes.len() + self.inserts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.deletes.is_empty() && self.inserts.is_empty()
    }
}

/// Outcome of a fully applied changeset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChangesetReport {
    pub applied: usize,
    pub used_bulk: bool,
}

/// RDF repository persisted in a document index
pub struct Repository<S: DocumentStore> {
    store: S,
    config: RepositoryConfig,
    registry: Arc<SchemaRegistry>,
    readiness: Mutex<Readiness>,
}

impl Repository<HttpStore> {
    /// Connect to the store at `config.url`
    pub fn connect(config: RepositoryConfig) -> RepositoryResult<Self> {
        let store = HttpStore::with_timeout(&config.url, config.timeout())?;
        Ok(Self::new(store, config))
    }
}

impl<S: DocumentStore> Repository<S> {
    pub fn new(store: S, config: RepositoryConfig) -> Self {
        Self::with_registry(store, config, Arc::new(SchemaRegistry::default()))
    }

    pub fn with_registry(store: S, config: RepositoryConfig, registry: Arc<SchemaRegistry>) -> Self {
        Self {
            store,
            config,
            registry,
            readiness: Mutex::new(Readiness::Uninitialized),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &RepositoryConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<SchemaRegistry> {
        &self.registry
    }

    pub fn readiness(&self) -> Readiness {
        *self.readiness.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn index(&self) -> &str {
        &self.config.index
    }

    /// Create the index if missing and apply the mapping.
    ///
    /// Called by every operation; a no-op once `Ready`. A failed mapping
    /// update leaves the repository in `SchemaEnsured` and is retried on
    /// the next call.
    pub fn ensure_ready(&self) -> RepositoryResult<()> {
        let mut state = self.readiness.lock().unwrap_or_else(PoisonError::into_inner);
        if *state == Readiness::Ready {
            return Ok(());
        }

        let mapping = self.registry.index_schema().to_mapping();

        if *state == Readiness::Uninitialized {
            if !self.store.index_exists(self.index())? {
                match self.store.create_index(self.index(), &mapping) {
                    Ok(()) => info!("Created index {}", self.index()),
                    Err(StoreError::Status { status: 400, body })
                        if body.contains("resource_already_exists_exception") =>
                    {
                        debug!("Index {} created concurrently", self.index());
                    }
                    Err(e) => return Err(e.into()),
                }
            }
            *state = Readiness::SchemaEnsured;
        }

        self.store.put_mapping(self.index(), &mapping)?;
        *state = Readiness::Ready;
        info!("Repository ready on index {} ({} type tags)", self.index(), self.registry.len());
        Ok(())
    }

    /// Store a statement. Inserting an existing statement overwrites it.
    pub fn insert(&self, statement: &Statement) -> RepositoryResult<()> {
        self.ensure_ready()?;
        let id = statement_id(statement).to_string();
        let document = statement_to_document(statement);
        self.store
            .index_document(self.index(), &id, &document.to_value(), self.config.refresh)?;
        debug!("Inserted statement {}", id);
        Ok(())
    }

    /// Remove a statement; removing a missing statement is not an error
    pub fn delete(&self, statement: &Statement) -> RepositoryResult<()> {
        self.ensure_ready()?;
        let id = statement_id(statement).to_string();
        let outcome = self.store.delete_document(self.index(), &id, self.config.refresh)?;
        debug!("Deleted statement {} ({:?})", id, outcome);
        Ok(())
    }

    pub fn exists(&self, statement: &Statement) -> RepositoryResult<bool> {
        self.ensure_ready()?;
        let id = statement_id(statement).to_string();
        Ok(self.store.document_exists(self.index(), &id)?)
    }

    pub fn count(&self) -> RepositoryResult<u64> {
        self.ensure_ready()?;
        Ok(self.store.count(self.index(), &FilterTree::MatchAll)?)
    }

    pub fn is_empty(&self) -> RepositoryResult<bool> {
        Ok(self.count()? == 0)
    }

    /// Delete every statement and return how many were removed.
    ///
    /// Runs further passes while the store reports version conflicts, up to
    /// `clear_retries`; remaining conflicts are left to complete eventually.
    pub fn clear(&self) -> RepositoryResult<u64> {
        self.ensure_ready()?;
        let mut deleted = 0;

        for attempt in 0..=self.config.clear_retries {
            let outcome = self
                .store
                .delete_by_query(self.index(), &FilterTree::MatchAll, self.config.refresh)?;
            deleted += outcome.deleted;

            if outcome.version_conflicts == 0 {
                info!("Cleared {} statements from {}", deleted, self.index());
                return Ok(deleted);
            }
            warn!(
                "Clear pass {} on {} hit {} version conflicts",
                attempt + 1,
                self.index(),
                outcome.version_conflicts
            );
        }

        warn!(
            "Giving up on clearing {} after {} retries; conflicting documents remain",
            self.index(),
            self.config.clear_retries
        );
        Ok(deleted)
    }

    /// Lazily iterate the statements matching a pattern.
    ///
    /// Every call issues a fresh query.
    pub fn scan(&self, pattern: &QuadPattern) -> RepositoryResult<StatementIter<'_, S>> {
        self.scan_filter(pattern_to_filter(pattern))
    }

    /// Lazily iterate the statements matching an arbitrary filter
    pub fn scan_filter(&self, filter: FilterTree) -> RepositoryResult<StatementIter<'_, S>> {
        self.ensure_ready()?;
        Ok(StatementIter::new(&self.store, &self.config, filter))
    }

    pub fn statements(&self) -> RepositoryResult<StatementIter<'_, S>> {
        self.scan(&QuadPattern::any())
    }

    /// Full-text search over object values written with `tag`
    pub fn search_text(&self, tag: &TypeTag, text: &str) -> RepositoryResult<StatementIter<'_, S>> {
        self.scan_filter(text_search_filter(&self.registry, tag, text))
    }

    pub fn has_graph(&self, graph: &Resource) -> RepositoryResult<bool> {
        self.ensure_ready()?;
        let count = self
            .store
            .count(self.index(), &FilterTree::equals("g", graph.as_str()))?;
        Ok(count > 0)
    }

    /// Apply deletes then inserts.
    ///
    /// All statements are encoded before the first request. With
    /// `AtomicWrite` the whole changeset is one bulk request; otherwise the
    /// operations run one by one and the first failure stops the run.
    pub fn apply_changeset(&self, changeset: &Changeset) -> RepositoryResult<ChangesetReport> {
        self.ensure_ready()?;
        if changeset.is_empty() {
            return Ok(ChangesetReport::default());
        }

        let operations: Vec<BulkOperation> = changeset
            .deletes
            .iter()
            .map(|statement| BulkOperation::Delete {
                id: statement_id(statement).to_string(),
            })
            .chain(changeset.inserts.iter().map(|statement| BulkOperation::Index {
                id: statement_id(statement).to_string(),
                source: statement_to_document(statement).to_value(),
            }))
            .collect();

        if self.supports(Feature::AtomicWrite) {
            self.apply_bulk(&operations)
        } else {
            self.apply_sequential(&operations)
        }
    }

    fn apply_bulk(&self, operations: &[BulkOperation]) -> RepositoryResult<ChangesetReport> {
        let results = self.store.bulk(self.index(), operations, self.config.refresh)?;

        let mut failures: Vec<BatchFailure> = results
            .iter()
            .take(operations.len())
            .filter(|item| !item.is_success())
            .map(|item| BatchFailure {
                id: item.id.clone(),
                action: item.action,
                status: Some(item.status),
                reason: item
                    .error
                    .clone()
                    .unwrap_or_else(|| format!("status {}", item.status)),
            })
            .collect();
        failures.extend(operations.iter().skip(results.len()).map(|op| BatchFailure {
            id: op.id().to_string(),
            action: op.action(),
            status: None,
            reason: "no result reported by the store".to_string(),
        }));
        let applied = operations.len() - failures.len();

        debug!("Bulk changeset: {} applied, {} failed", applied, failures.len());

        if failures.is_empty() {
            Ok(ChangesetReport {
                applied,
                used_bulk: true,
            })
        } else {
            Err(RepositoryError::PartialBatchFailure { applied, failures })
        }
    }

    fn apply_sequential(&self, operations: &[BulkOperation]) -> RepositoryResult<ChangesetReport> {
        for (applied, operation) in operations.iter().enumerate() {
            let result = match operation {
                BulkOperation::Delete { id } => self
                    .store
                    .delete_document(self.index(), id, self.config.refresh)
                    .map(|_| ()),
                BulkOperation::Index { id, source } => {
                    self.store
                        .index_document(self.index(), id, source, self.config.refresh)
                }
            };

            if let Err(e) = result {
                let status = match &e {
                    StoreError::Status { status, .. } => Some(*status),
                    _ => None,
                };
                return Err(RepositoryError::PartialBatchFailure {
                    applied,
                    failures: vec![BatchFailure {
                        id: operation.id().to_string(),
                        action: operation.action(),
                        status,
                        reason: e.to_string(),
                    }],
                });
            }
        }

        Ok(ChangesetReport {
            applied: operations.len(),
            used_bulk: false,
        })
    }

    pub fn supports(&self, feature: Feature) -> bool {
        match feature {
            Feature::GraphName => true,
            Feature::AtomicWrite => self.config.atomic_write && self.store.supports_bulk(),
            Feature::Validity => self.config.with_validity,
            Feature::LiteralEquality => false,
        }
    }

    /// Statements survive a restart of the process
    pub fn is_durable(&self) -> bool {
        true
    }
}

/// Lazy statement iterator over a scroll cursor.
///
/// The cursor opens on the first `next()` and is released on exhaustion, on
/// the first error, or when the iterator is dropped.
pub struct StatementIter<'a, S: DocumentStore> {
    store: &'a S,
    index: &'a str,
    keep_alive: &'a str,
    batch_size: usize,
    filter: FilterTree,
    scroll_id: Option<String>,
    buffer: VecDeque<Hit>,
    started: bool,
    finished: bool,
}

impl<'a, S: DocumentStore> StatementIter<'a, S> {
    fn new(store: &'a S, config: &'a RepositoryConfig, filter: FilterTree) -> Self {
        Self {
            store,
            index: &config.index,
            keep_alive: &config.scroll_keep_alive,
            batch_size: config.batch_size,
            filter,
            scroll_id: None,
            buffer: VecDeque::new(),
            started: false,
            finished: false,
        }
    }

    /// Pull the next page into the buffer; `false` once the cursor is exhausted
    fn fill(&mut self) -> Result<bool, StoreError> {
        let page = if self.started {
            match &self.scroll_id {
                Some(scroll_id) => self.store.next_scroll(scroll_id, self.keep_alive)?,
                None => return Ok(false),
            }
        } else {
            self.started = true;
            self.store
                .open_scroll(self.index, &self.filter, self.batch_size, self.keep_alive)?
        };

        if page.scroll_id.is_some() {
            self.scroll_id = page.scroll_id;
        }
        debug!("Scroll page with {} hits", page.hits.len());
        self.buffer.extend(page.hits);
        Ok(!self.buffer.is_empty())
    }

    fn finish(&mut self) {
        self.finished = true;
        self.buffer.clear();
        if let Some(scroll_id) = self.scroll_id.take() {
            if let Err(e) = self.store.clear_scroll(&scroll_id) {
                warn!("Failed to release scroll {}: {}", scroll_id, e);
            }
        }
    }
}

fn decode_hit(hit: Hit) -> RepositoryResult<Statement> {
    let document = Document::from_value(hit.source)?;
    Ok(document_to_statement(&document)?)
}

impl<S: DocumentStore> Iterator for StatementIter<'_, S> {
    type Item = RepositoryResult<Statement>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        if self.buffer.is_empty() {
            match self.fill() {
                Ok(true) => {}
                Ok(false) => {
                    self.finish();
                    return None;
                }
                Err(e) => {
                    self.finish();
                    return Some(Err(e.into()));
                }
            }
        }

        let hit = self.buffer.pop_front()?;
        let result = decode_hit(hit);
        if result.is_err() {
            self.finish();
        }
        Some(result)
    }
}

impl<S: DocumentStore> Drop for StatementIter<'_, S> {
    fn drop(&mut self) {
        self.finish();
    }
}
