use anyhow::Context;
use docindex_client::{DocumentStore, HttpStore, MemoryStore};
use rdf_docindex::{
    BlankNode, Changeset, Feature, GraphPattern, Literal, NamedNode, QuadPattern, Repository,
    RepositoryConfig, Statement, TypeTag,
};

fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    println!("RDF DocIndex v{}", rdf_docindex::version());
    println!("==========================================");

    // With a config file, run against a live store; otherwise in memory
    match std::env::args().nth(1) {
        Some(path) => {
            let config = RepositoryConfig::from_file(&path)
                .with_context(|| format!("loading config from {}", path))?;
            println!("Using store at {} (index {})", config.url, config.index);
            let store = HttpStore::with_timeout(&config.url, config.timeout())?;
            demo(Repository::new(store, config))
        }
        None => {
            println!("Using in-memory store");
            demo(Repository::new(MemoryStore::new(), RepositoryConfig::default()))
        }
    }
}

fn demo<S: DocumentStore>(repo: Repository<S>) -> anyhow::Result<()> {
    let ex = |local: &str| NamedNode::new(format!("http://example.org/{}", local));
    let foaf = |local: &str| NamedNode::new(format!("http://xmlns.com/foaf/0.1/{}", local));

    let alice = ex("alice")?;
    let social = ex("graph/social")?;
    let address = BlankNode::new();

    let mut changeset = Changeset::new();
    changeset
        .insert(Statement::new(alice.clone(), foaf("name")?, Literal::plain("Alice"), None))
        .insert(Statement::new(
            alice.clone(),
            ex("bio")?,
            Literal::language_tagged("Alice enjoys running with her dogs", "en")?,
            None,
        ))
        .insert(Statement::new(
            alice.clone(),
            foaf("knows")?,
            ex("bob")?,
            Some(social.clone().into()),
        ))
        .insert(Statement::new(alice.clone(), ex("address")?, address.clone(), None))
        .insert(Statement::new(address, ex("city")?, Literal::plain("Helsinki"), None));

    let report = repo.apply_changeset(&changeset)?;
    println!(
        "\n✓ Applied {} statements (bulk: {})",
        report.applied, report.used_bulk
    );
    println!("  Total statements: {}", repo.count()?);

    println!("\nStatements about <{}>:", alice.as_str());
    for statement in repo.scan(&QuadPattern::any().with_subject(alice.clone()))? {
        println!("  {}", statement?);
    }

    println!("\nDefault graph only:");
    let default_graph = QuadPattern::any().with_graph(GraphPattern::DefaultGraph);
    println!("  → {} statements", repo.scan(&default_graph)?.count());

    println!("\nFull-text search on English literals for \"dogs\":");
    for statement in repo.search_text(&TypeTag::Language("en".to_string()), "dogs")? {
        println!("  {}", statement?);
    }

    let has_social = repo.has_graph(&social.clone().into())?;
    println!("\nHas graph <{}>: {}", social.as_str(), has_social);
    println!("Supports atomic write: {}", repo.supports(Feature::AtomicWrite));

    let removed = repo.clear()?;
    println!("\n✅ Cleared {} statements", removed);
    Ok(())
}
