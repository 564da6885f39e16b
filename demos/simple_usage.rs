/// Complete papyra API demo
///
/// Demonstrates all major engine operations:
/// - CRUD (insert, find, update, delete)
/// - Predicates (equality, membership, ranges, boolean combinators)
/// - Aggregation pipelines (match / sort / group / project / limit)
/// - Map/reduce into a named output collection
/// - Indexes and statistics
use papyra::{
    AccumulatorSpec, Config, Database, Document, FindOptions, ID_FIELD, Pipeline, Predicate,
    Projection, SortOrder, SortSpec, Value,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "papyra=debug".into()),
        )
        .init();

    println!("papyra: in-process document query & aggregation engine\n");

    // Step 1: open a database handle
    let db = Database::open(Config::default());

    // Step 2: INSERT - seed the bookstore
    println!("Step 2: INSERT - adding books...");
    let ids = db.insert_many(
        "books",
        vec![
            Document::new()
                .with("title", "Echoes of Tomorrow")
                .with("author", "Ravi Sharma")
                .with("genre", "Fiction")
                .with("price", 500),
            Document::new()
                .with("title", "Whispers in the Fog")
                .with("author", "Anita Rao")
                .with("genre", "Mystery")
                .with("price", 600),
            Document::new()
                .with("title", "The Last Horizon")
                .with("author", "Ravi Sharma")
                .with("genre", "Fiction")
                .with("price", 700),
            Document::new()
                .with("title", "Stars Beyond Reach")
                .with("author", "Karan Mehta")
                .with("genre", "Sci-Fi")
                .with("price", 800),
            Document::new()
                .with("title", "The Hidden Truth")
                .with("author", "Anita Rao")
                .with("genre", "Mystery")
                .with("price", 550),
        ],
    )?;
    println!("  inserted {} books\n", ids.len());

    // Step 3: FIND - predicates, sorting, projection
    println!("Step 3: FIND - querying books...");
    let affordable = db.find(
        "books",
        &Predicate::and(vec![
            Predicate::is_in("genre", vec!["Fiction", "Mystery"]),
            Predicate::lte("price", 600),
        ]),
        &FindOptions::new()
            .sort(SortSpec::asc("price"))
            .project(Projection::include(vec!["title", "price"]).without_id()),
    )?;
    for book in &affordable {
        println!("  {}", book.to_json());
    }
    println!();

    // Step 4: AGGREGATE - most expensive book per genre
    println!("Step 4: AGGREGATE - most expensive per genre...");
    let top_per_genre = db.aggregate(
        "books",
        &Pipeline::new().sort("price", SortOrder::Desc).group(
            Some("genre"),
            vec![
                AccumulatorSpec::first("mostExpensiveBook", "title"),
                AccumulatorSpec::first("price", "price"),
            ],
        ),
    )?;
    for group in &top_per_genre {
        println!("  {}", group.to_json());
    }
    println!();

    // Step 5: UPDATE - reprice one title, discount a genre
    println!("Step 5: UPDATE - repricing...");
    let one = db.update_one(
        "books",
        &Predicate::eq("title", "Echoes of Tomorrow"),
        &Document::new().with("price", 525),
        false,
    )?;
    let many = db.update_many(
        "books",
        &Predicate::eq("genre", "Mystery"),
        &Document::new().with("on_sale", true),
    )?;
    println!(
        "  update_one matched {}, update_many modified {}\n",
        one.matched_count, many.modified_count
    );

    // Step 6: MAP/REDUCE - revenue per author
    println!("Step 6: MAP/REDUCE - revenue per author...");
    db.map_reduce(
        "books",
        &|doc| match (doc.get("author"), doc.get("price")) {
            (Some(author), Some(price)) => Ok(vec![(author.clone(), price.clone())]),
            _ => Ok(vec![]),
        },
        &|_author, prices| {
            Ok(Value::Int(
                prices
                    .iter()
                    .map(|v| if let Value::Int(n) = v { *n } else { 0 })
                    .sum(),
            ))
        },
        "author_revenue",
    )?;
    for row in db.find("author_revenue", &Predicate::All, &FindOptions::new())? {
        println!("  {}", row.to_json());
    }
    println!();

    // Step 7: INDEX - accelerate price lookups
    println!("Step 7: INDEX - indexing price...");
    db.create_index("books", "price")?;
    println!("  indexes on books: {:?}\n", db.list_indexes("books")?);

    // Step 8: DELETE - drop the bargain bin
    println!("Step 8: DELETE - removing cheap books...");
    let deleted = db.delete_many("books", &Predicate::lte("price", 525))?;
    println!("  deleted {} book(s)\n", deleted.deleted_count);

    // Step 9: STATS
    println!("Step 9: STATISTICS");
    let stats = db.stats();
    println!("  collections:     {}", stats.collection_count);
    println!("  documents:       {}", stats.total_documents);
    println!("  indexes:         {}", stats.index_count);
    println!("  queries served:  {}", stats.query_count);
    println!("  writes applied:  {}", stats.write_count);
    println!(
        "  cache hit rate:  {:.0}%",
        stats.cache_stats.hit_rate() * 100.0
    );

    let sci_fi = db.find(
        "books",
        &Predicate::eq(ID_FIELD, ids[3].clone()),
        &FindOptions::new(),
    )?;
    println!("\nLookup by id: {}", sci_fi[0].to_json());

    Ok(())
}
