use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use docindex_client::{
    BulkItemResult, BulkOperation, DeleteByQueryOutcome, DeleteOutcome, DocumentStore, FilterTree,
    MemoryStore, ScrollPage, StoreError, StoreResult,
};
use rdf_docindex::rdf::statement_id;
use rdf_docindex::{
    typed_pattern_filter, BlankNode, Changeset, CodecError, GraphPattern, Literal, NamedNode,
    QuadPattern, Readiness, Repository, RepositoryConfig, RepositoryError, Resource, Statement,
    TypeTag,
};
use serde_json::{json, Value};

fn iri(s: &str) -> NamedNode {
    NamedNode::new(s).unwrap()
}

fn stmt(s: &str, p: &str, o: &str, g: Option<&str>) -> Statement {
    Statement::new(iri(s), iri(p), Literal::plain(o), g.map(|g| Resource::from(iri(g))))
}

fn memory_repo() -> Repository<MemoryStore> {
    Repository::new(MemoryStore::new(), RepositoryConfig::default())
}

fn collect<S: DocumentStore>(repo: &Repository<S>, pattern: &QuadPattern) -> Vec<Statement> {
    repo.scan(pattern)
        .unwrap()
        .collect::<Result<Vec<_>, _>>()
        .unwrap()
}

/// MemoryStore wrapper that injects failures
#[derive(Default)]
struct FlakyStore {
    inner: MemoryStore,
    reject_id: Option<String>,
    fail_put_mapping: AtomicBool,
    fail_next_scroll: AtomicBool,
    bulk: bool,
    /// Drop the last item from every bulk response
    truncate_bulk: bool,
    /// Delete-by-query passes that still report version conflicts
    conflicting_passes: AtomicUsize,
    delete_by_query_calls: AtomicUsize,
}

impl FlakyStore {
    fn rejection(&self, id: &str) -> Option<StoreError> {
        match &self.reject_id {
            Some(reject) if reject == id => Some(StoreError::Status {
                status: 400,
                body: "mapper_parsing_exception".to_string(),
            }),
            _ => None,
        }
    }
}

impl DocumentStore for FlakyStore {
    fn index_exists(&self, index: &str) -> StoreResult<bool> {
        self.inner.index_exists(index)
    }

    fn create_index(&self, index: &str, mapping: &Value) -> StoreResult<()> {
        self.inner.create_index(index, mapping)
    }

    fn put_mapping(&self, index: &str, mapping: &Value) -> StoreResult<()> {
        if self.fail_put_mapping.swap(false, Ordering::SeqCst) {
            return Err(StoreError::Unavailable("connection refused".to_string()));
        }
        self.inner.put_mapping(index, mapping)
    }

    fn index_document(&self, index: &str, id: &str, source: &Value, refresh: bool) -> StoreResult<()> {
        if let Some(err) = self.rejection(id) {
            return Err(err);
        }
        self.inner.index_document(index, id, source, refresh)
    }

    fn delete_document(&self, index: &str, id: &str, refresh: bool) -> StoreResult<DeleteOutcome> {
        self.inner.delete_document(index, id, refresh)
    }

    fn document_exists(&self, index: &str, id: &str) -> StoreResult<bool> {
        self.inner.document_exists(index, id)
    }

    fn count(&self, index: &str, filter: &FilterTree) -> StoreResult<u64> {
        self.inner.count(index, filter)
    }

    fn delete_by_query(&self, index: &str, filter: &FilterTree, refresh: bool)
        -> StoreResult<DeleteByQueryOutcome> {
        self.delete_by_query_calls.fetch_add(1, Ordering::SeqCst);
        let conflicting = self.conflicting_passes.load(Ordering::SeqCst);
        if conflicting == 0 {
            return self.inner.delete_by_query(index, filter, refresh);
        }
        self.conflicting_passes.store(conflicting - 1, Ordering::SeqCst);

        // One document goes, the rest conflict
        let page = self.inner.open_scroll(index, filter, 1, "1m")?;
        if let Some(scroll_id) = &page.scroll_id {
            self.inner.clear_scroll(scroll_id)?;
        }
        let mut deleted = 0;
        if let Some(hit) = page.hits.first() {
            self.inner.delete_document(index, &hit.id, refresh)?;
            deleted = 1;
        }
        Ok(DeleteByQueryOutcome {
            deleted,
            version_conflicts: self.inner.count(index, filter)?,
        })
    }

    fn bulk(&self, index: &str, operations: &[BulkOperation], refresh: bool)
        -> StoreResult<Vec<BulkItemResult>> {
        let accepted: Vec<BulkOperation> = operations
            .iter()
            .filter(|op| self.rejection(op.id()).is_none())
            .cloned()
            .collect();
        let mut applied = self.inner.bulk(index, &accepted, refresh)?.into_iter();

        let mut results: Vec<BulkItemResult> = operations
            .iter()
            .map(|op| match self.rejection(op.id()) {
                Some(_) => BulkItemResult {
                    action: op.action(),
                    id: op.id().to_string(),
                    status: 400,
                    error: Some("failed to parse field [v.integer]".to_string()),
                },
                None => applied.next().expect("one result per accepted operation"),
            })
            .collect();
        if self.truncate_bulk {
            results.pop();
        }
        Ok(results)
    }

    fn open_scroll(&self, index: &str, filter: &FilterTree, size: usize, keep_alive: &str)
        -> StoreResult<ScrollPage> {
        self.inner.open_scroll(index, filter, size, keep_alive)
    }

    fn next_scroll(&self, scroll_id: &str, keep_alive: &str) -> StoreResult<ScrollPage> {
        if self.fail_next_scroll.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("timed out".to_string()));
        }
        self.inner.next_scroll(scroll_id, keep_alive)
    }

    fn clear_scroll(&self, scroll_id: &str) -> StoreResult<()> {
        self.inner.clear_scroll(scroll_id)
    }

    fn supports_bulk(&self) -> bool {
        self.bulk
    }
}

#[test]
fn test_insert_is_idempotent() {
    let repo = memory_repo();
    let statement = stmt("urn:s", "urn:p", "o", None);

    repo.insert(&statement).unwrap();
    repo.insert(&statement).unwrap();

    assert_eq!(repo.count().unwrap(), 1);
    assert!(repo.exists(&statement).unwrap());
    assert_eq!(collect(&repo, &QuadPattern::any()), vec![statement]);
}

#[test]
fn test_delete_missing_statement_is_ok() {
    let repo = memory_repo();
    let present = stmt("urn:s", "urn:p", "present", None);
    repo.insert(&present).unwrap();

    repo.delete(&stmt("urn:s", "urn:p", "absent", None)).unwrap();
    assert_eq!(repo.count().unwrap(), 1);

    repo.delete(&present).unwrap();
    assert!(repo.is_empty().unwrap());
    assert!(!repo.exists(&present).unwrap());
}

#[test]
fn test_pattern_semantics() {
    let repo = memory_repo();
    let statements = vec![
        stmt("urn:a", "urn:p1", "1", None),
        stmt("urn:a", "urn:p1", "2", Some("urn:g1")),
        stmt("urn:a", "urn:p2", "3", None),
        stmt("urn:b", "urn:p1", "4", Some("urn:g2")),
    ];
    for statement in &statements {
        repo.insert(statement).unwrap();
    }

    // all unbound
    let all: HashSet<_> = collect(&repo, &QuadPattern::any()).into_iter().collect();
    assert_eq!(all, statements.iter().cloned().collect());

    // explicitly absent graph
    let default_graph = collect(&repo, &QuadPattern::any().with_graph(GraphPattern::DefaultGraph));
    assert_eq!(default_graph.len(), 2);
    assert!(default_graph.iter().all(Statement::in_default_graph));

    // any named graph
    let named = collect(&repo, &QuadPattern::any().with_graph(GraphPattern::AnyNamed));
    assert_eq!(named.len(), 2);
    assert!(named.iter().all(|s| s.graph_name.is_some()));

    // subject and predicate bound, object and graph free
    let pattern = QuadPattern::any().with_subject(iri("urn:a")).with_predicate(iri("urn:p1"));
    let bound: HashSet<_> = collect(&repo, &pattern).into_iter().collect();
    let expected: HashSet<_> = statements.iter().filter(|s| pattern.matches(s)).cloned().collect();
    assert_eq!(bound.len(), 2);
    assert_eq!(bound, expected);

    // specific graph
    let g1 = GraphPattern::Named(iri("urn:g1").into());
    assert_eq!(collect(&repo, &QuadPattern::any().with_graph(g1)), vec![statements[1].clone()]);
}

#[test]
fn test_default_graph_with_blank_node_subject() {
    let repo = memory_repo();
    let a = BlankNode::from_id("a").unwrap();
    let in_default = Statement::new(a.clone(), iri("urn:p"), Literal::plain("x"), None);
    let in_g1 = Statement::new(
        a.clone(),
        iri("urn:p"),
        Literal::plain("y"),
        Some(iri("urn:g1").into()),
    );
    repo.insert(&in_default).unwrap();
    repo.insert(&in_g1).unwrap();

    let pattern = QuadPattern::any()
        .with_subject(a.clone())
        .with_graph(GraphPattern::DefaultGraph);
    assert_eq!(collect(&repo, &pattern), vec![in_default]);

    let unbound_graph = QuadPattern::any().with_subject(a);
    assert_eq!(collect(&repo, &unbound_graph).len(), 2);
}

#[test]
fn test_custom_datatype_is_part_of_object_equality() {
    let repo = memory_repo();
    let celsius = iri("http://example.org/units#celsius");
    let fahrenheit = iri("http://example.org/units#fahrenheit");
    let warm = Statement::new(iri("urn:room"), iri("urn:temp"), Literal::typed("21", celsius.clone()), None);
    let cold = Statement::new(iri("urn:room"), iri("urn:temp"), Literal::typed("21", fahrenheit), None);
    let untyped = stmt("urn:room", "urn:temp", "21", None);
    repo.insert(&warm).unwrap();
    repo.insert(&cold).unwrap();
    repo.insert(&untyped).unwrap();

    let pattern = QuadPattern::any().with_object(Literal::typed("21", celsius));
    assert_eq!(collect(&repo, &pattern), vec![warm]);

    // Without a datatype only the value is compared
    let plain = QuadPattern::any().with_object(Literal::plain("21"));
    assert_eq!(collect(&repo, &plain).len(), 3);
}

#[test]
fn test_object_equality_ignores_type() {
    let repo = memory_repo();
    let as_iri = Statement::new(iri("urn:s"), iri("urn:p"), iri("urn:x"), None);
    let as_literal = Statement::new(iri("urn:s"), iri("urn:p"), Literal::plain("urn:x"), None);
    repo.insert(&as_iri).unwrap();
    repo.insert(&as_literal).unwrap();

    let pattern = QuadPattern::any().with_object(iri("urn:x"));
    assert_eq!(collect(&repo, &pattern).len(), 2);

    let typed: Vec<_> = repo
        .scan_filter(typed_pattern_filter(&pattern))
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(typed, vec![as_iri]);
}

#[test]
fn test_large_scan_pages_without_duplicates() {
    let config = RepositoryConfig {
        batch_size: 1000,
        ..RepositoryConfig::default()
    };
    let repo = Repository::new(MemoryStore::new(), config);

    let mut changeset = Changeset::new();
    for i in 0..2500 {
        changeset.insert(stmt(&format!("urn:s{}", i), "urn:p", &i.to_string(), None));
    }
    repo.apply_changeset(&changeset).unwrap();
    assert_eq!(repo.count().unwrap(), 2500);

    let scanned = collect(&repo, &QuadPattern::any());
    assert_eq!(scanned.len(), 2500);
    let unique: HashSet<_> = scanned.into_iter().collect();
    assert_eq!(unique.len(), 2500);
    assert_eq!(repo.store().open_scroll_count(), 0);
}

#[test]
fn test_scroll_released_on_early_drop() {
    let repo = memory_repo();
    for i in 0..10 {
        repo.insert(&stmt("urn:s", "urn:p", &i.to_string(), None)).unwrap();
    }

    {
        let mut iter = repo.statements().unwrap();
        assert_eq!(repo.store().open_scroll_count(), 0);
        assert!(iter.next().is_some());
        assert_eq!(repo.store().open_scroll_count(), 1);
    }
    assert_eq!(repo.store().open_scroll_count(), 0);

    // Never pulled: no cursor opened at all
    drop(repo.statements().unwrap());
    assert_eq!(repo.store().open_scroll_count(), 0);
}

#[test]
fn test_scroll_released_on_exhaustion() {
    let config = RepositoryConfig {
        batch_size: 3,
        ..RepositoryConfig::default()
    };
    let repo = Repository::new(MemoryStore::new(), config);
    for i in 0..7 {
        repo.insert(&stmt("urn:s", "urn:p", &i.to_string(), None)).unwrap();
    }

    let mut iter = repo.statements().unwrap();
    for _ in 0..7 {
        assert!(iter.next().unwrap().is_ok());
    }
    assert!(iter.next().is_none());
    assert_eq!(repo.store().open_scroll_count(), 0);
    assert!(iter.next().is_none());
}

#[test]
fn test_scroll_released_on_store_error() {
    let store = FlakyStore::default();
    let config = RepositoryConfig {
        batch_size: 2,
        ..RepositoryConfig::default()
    };
    let repo = Repository::new(store, config);
    for i in 0..5 {
        repo.insert(&stmt("urn:s", "urn:p", &i.to_string(), None)).unwrap();
    }

    let mut iter = repo.statements().unwrap();
    assert!(iter.next().unwrap().is_ok());
    assert!(iter.next().unwrap().is_ok());

    repo.store().fail_next_scroll.store(true, Ordering::SeqCst);
    assert!(matches!(
        iter.next(),
        Some(Err(RepositoryError::Store(StoreError::Unavailable(_))))
    ));
    assert_eq!(repo.store().inner.open_scroll_count(), 0);
    assert!(iter.next().is_none());
}

#[test]
fn test_undecodable_document_is_reported() {
    let repo = memory_repo();
    repo.ensure_ready().unwrap();
    repo.store()
        .index_document(
            "quadb",
            "1",
            &json!({ "s": "not a resource", "p": "urn:p", "o": "x", "type": "literal" }),
            true,
        )
        .unwrap();

    let mut iter = repo.statements().unwrap();
    assert!(matches!(
        iter.next(),
        Some(Err(RepositoryError::Codec(CodecError::AmbiguousResourceForm(_))))
    ));
    assert!(iter.next().is_none());
    assert_eq!(repo.store().open_scroll_count(), 0);
}

#[test]
fn test_changeset_deletes_then_inserts() {
    let repo = memory_repo();
    let old = stmt("urn:s", "urn:p", "old", None);
    let new = stmt("urn:s", "urn:p", "new", None);
    repo.insert(&old).unwrap();

    let mut changeset = Changeset::new();
    changeset
        .delete(old.clone())
        .delete(stmt("urn:s", "urn:p", "never stored", None))
        .insert(new.clone());
    let report = repo.apply_changeset(&changeset).unwrap();

    assert_eq!(report.applied, 3);
    assert!(report.used_bulk);
    assert!(!repo.exists(&old).unwrap());
    assert!(repo.exists(&new).unwrap());
}

#[test]
fn test_bulk_partial_failure_is_reported() {
    let bad = Statement::new(
        iri("urn:s"),
        iri("urn:p"),
        Literal::typed("not a number", iri("http://www.w3.org/2001/XMLSchema#integer")),
        None,
    );
    let good = stmt("urn:s", "urn:p", "fine", None);

    let store = FlakyStore {
        reject_id: Some(statement_id(&bad).to_string()),
        bulk: true,
        ..FlakyStore::default()
    };
    let repo = Repository::new(store, RepositoryConfig::default());

    let mut changeset = Changeset::new();
    changeset.insert(good.clone()).insert(bad.clone());

    match repo.apply_changeset(&changeset) {
        Err(RepositoryError::PartialBatchFailure { applied, failures }) => {
            assert_eq!(applied, 1);
            assert_eq!(failures.len(), 1);
            assert_eq!(failures[0].id, statement_id(&bad).to_string());
            assert_eq!(failures[0].status, Some(400));
        }
        other => panic!("expected partial failure, got {:?}", other),
    }
    assert!(repo.exists(&good).unwrap());
    assert!(!repo.exists(&bad).unwrap());
}

#[test]
fn test_missing_bulk_result_is_a_failure() {
    let first = stmt("urn:s", "urn:p", "1", None);
    let second = stmt("urn:s", "urn:p", "2", None);
    let store = FlakyStore {
        bulk: true,
        truncate_bulk: true,
        ..FlakyStore::default()
    };
    let repo = Repository::new(store, RepositoryConfig::default());

    let mut changeset = Changeset::new();
    changeset.insert(first).insert(second.clone());

    match repo.apply_changeset(&changeset) {
        Err(RepositoryError::PartialBatchFailure { applied, failures }) => {
            assert_eq!(applied, 1);
            assert_eq!(failures.len(), 1);
            assert_eq!(failures[0].id, statement_id(&second).to_string());
            assert_eq!(failures[0].status, None);
        }
        other => panic!("expected partial failure, got {:?}", other),
    }
}

#[test]
fn test_sequential_changeset_stops_at_failure() {
    let first = stmt("urn:s", "urn:p", "1", None);
    let rejected = stmt("urn:s", "urn:p", "2", None);
    let never_sent = stmt("urn:s", "urn:p", "3", None);

    let store = FlakyStore {
        reject_id: Some(statement_id(&rejected).to_string()),
        bulk: false,
        ..FlakyStore::default()
    };
    let repo = Repository::new(store, RepositoryConfig::default());

    let mut changeset = Changeset::new();
    changeset.insert(first.clone()).insert(rejected).insert(never_sent.clone());

    match repo.apply_changeset(&changeset) {
        Err(RepositoryError::PartialBatchFailure { applied, failures }) => {
            assert_eq!(applied, 1);
            assert_eq!(failures[0].status, Some(400));
        }
        other => panic!("expected partial failure, got {:?}", other),
    }
    assert!(repo.exists(&first).unwrap());
    assert!(!repo.exists(&never_sent).unwrap());
}

#[test]
fn test_sequential_changeset_when_bulk_disabled() {
    let config = RepositoryConfig {
        atomic_write: false,
        ..RepositoryConfig::default()
    };
    let repo = Repository::new(MemoryStore::new(), config);

    let mut changeset = Changeset::new();
    changeset.insert(stmt("urn:s", "urn:p", "a", None)).insert(stmt("urn:s", "urn:p", "b", None));
    let report = repo.apply_changeset(&changeset).unwrap();

    assert!(!report.used_bulk);
    assert_eq!(report.applied, 2);
    assert_eq!(repo.count().unwrap(), 2);
}

#[test]
fn test_readiness_retries_failed_mapping() {
    let store = FlakyStore {
        fail_put_mapping: AtomicBool::new(true),
        ..FlakyStore::default()
    };
    let repo = Repository::new(store, RepositoryConfig::default());

    assert!(matches!(
        repo.count(),
        Err(RepositoryError::Store(StoreError::Unavailable(_)))
    ));
    assert_eq!(repo.readiness(), Readiness::SchemaEnsured);
    assert!(repo.store().inner.index_exists("quadb").unwrap());

    assert_eq!(repo.count().unwrap(), 0);
    assert_eq!(repo.readiness(), Readiness::Ready);
}

#[test]
fn test_has_graph() {
    let repo = memory_repo();
    let graph = BlankNode::from_id("g7").unwrap();
    repo.insert(&Statement::new(
        iri("urn:s"),
        iri("urn:p"),
        Literal::plain("x"),
        Some(graph.clone().into()),
    ))
    .unwrap();

    assert!(repo.has_graph(&graph.into()).unwrap());
    assert!(!repo.has_graph(&iri("urn:g:other").into()).unwrap());
}

#[test]
fn test_search_text() {
    let repo = memory_repo();
    let english = Statement::new(
        iri("urn:s"),
        iri("urn:bio"),
        Literal::language_tagged("Walks her dogs daily", "en").unwrap(),
        None,
    );
    let finnish = Statement::new(
        iri("urn:s"),
        iri("urn:bio"),
        Literal::language_tagged("dogs", "fi").unwrap(),
        None,
    );
    repo.insert(&english).unwrap();
    repo.insert(&finnish).unwrap();

    let found: Vec<_> = repo
        .search_text(&TypeTag::Language("en".to_string()), "DOGS")
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(found, vec![english]);
}

#[test]
fn test_clear_empties_repository() {
    let repo = memory_repo();
    for i in 0..20 {
        repo.insert(&stmt("urn:s", "urn:p", &i.to_string(), Some("urn:g"))).unwrap();
    }
    assert_eq!(repo.clear().unwrap(), 20);
    assert!(repo.is_empty().unwrap());
    assert!(!repo.has_graph(&iri("urn:g").into()).unwrap());
}

#[test]
fn test_clear_retries_version_conflicts() {
    let store = FlakyStore {
        conflicting_passes: AtomicUsize::new(2),
        ..FlakyStore::default()
    };
    let repo = Repository::new(store, RepositoryConfig::default());
    for i in 0..5 {
        repo.insert(&stmt("urn:s", "urn:p", &i.to_string(), None)).unwrap();
    }

    assert_eq!(repo.clear().unwrap(), 5);
    assert_eq!(repo.store().delete_by_query_calls.load(Ordering::SeqCst), 3);
    assert!(repo.is_empty().unwrap());
}

#[test]
fn test_clear_gives_up_after_retries() {
    let store = FlakyStore {
        conflicting_passes: AtomicUsize::new(usize::MAX),
        ..FlakyStore::default()
    };
    let config = RepositoryConfig {
        clear_retries: 3,
        ..RepositoryConfig::default()
    };
    let repo = Repository::new(store, config);
    for i in 0..10 {
        repo.insert(&stmt("urn:s", "urn:p", &i.to_string(), None)).unwrap();
    }

    // One pass plus three retries, one document each
    assert_eq!(repo.clear().unwrap(), 4);
    assert_eq!(repo.store().delete_by_query_calls.load(Ordering::SeqCst), 4);
    assert_eq!(repo.count().unwrap(), 6);
}
