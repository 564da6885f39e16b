use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use papyra::{Database, Document, FindOptions, Predicate, SortSpec};
use rand::Rng;

/// Helper to create test documents
fn create_test_document(id: u64) -> Document {
    let mut rng = rand::thread_rng();
    let categories = ["fiction", "mystery", "scifi", "history", "poetry"];

    Document::new()
        .with("title", format!("Document {}", id))
        .with("category", categories[rng.gen_range(0..categories.len())])
        .with("score", rng.gen_range(0.0..100.0))
        .with("pages", rng.gen_range(50..900) as i64)
}

fn seeded_database(count: u64) -> Database {
    let db = Database::new();
    let docs: Vec<Document> = (0..count).map(create_test_document).collect();
    db.insert_many("library", docs).unwrap();
    db
}

fn bench_single_insert(c: &mut Criterion) {
    let db = Database::new();

    c.bench_function("single_document_insert", |b| {
        let mut id = 0u64;
        b.iter(|| {
            let doc = create_test_document(id);
            db.insert_one("library", doc).unwrap();
            id += 1;
        });
    });
}

fn bench_batch_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("batch_insert");

    for batch_size in [10, 100, 1000].iter() {
        group.bench_with_input(
            BenchmarkId::from_parameter(batch_size),
            batch_size,
            |b, &batch_size| {
                let db = Database::new();
                let mut id = 0u64;

                b.iter(|| {
                    let docs: Vec<Document> = (0..batch_size)
                        .map(|_| {
                            let doc = create_test_document(id);
                            id += 1;
                            doc
                        })
                        .collect();
                    db.insert_many("library", docs).unwrap();
                });
            },
        );
    }
    group.finish();
}

fn bench_find(c: &mut Criterion) {
    let db = seeded_database(5000);
    let mut group = c.benchmark_group("find");

    group.bench_function("equality_scan", |b| {
        b.iter(|| {
            db.find(
                "library",
                black_box(&Predicate::eq("category", "mystery")),
                &FindOptions::new(),
            )
            .unwrap()
        });
    });

    group.bench_function("membership_and_range", |b| {
        let pred = Predicate::and(vec![
            Predicate::is_in("category", vec!["fiction", "scifi"]),
            Predicate::gte("score", 50.0),
        ]);
        b.iter(|| db.find("library", black_box(&pred), &FindOptions::new()).unwrap());
    });

    group.bench_function("sorted_with_limit", |b| {
        let options = FindOptions::new().sort(SortSpec::desc("score")).limit(10);
        b.iter(|| db.find("library", &Predicate::All, &options).unwrap());
    });

    db.create_index("library", "category").unwrap();
    group.bench_function("equality_indexed", |b| {
        b.iter(|| {
            db.find(
                "library",
                black_box(&Predicate::eq("category", "mystery")),
                &FindOptions::new(),
            )
            .unwrap()
        });
    });

    group.finish();
}

fn bench_update_and_delete(c: &mut Criterion) {
    let mut group = c.benchmark_group("mutation");

    group.bench_function("update_many_category", |b| {
        let db = seeded_database(2000);
        let mut flip = false;
        b.iter(|| {
            let (from, to) = if flip {
                ("archived", "mystery")
            } else {
                ("mystery", "archived")
            };
            flip = !flip;
            db.update_many(
                "library",
                &Predicate::eq("category", from),
                &Document::new().with("category", to),
            )
            .unwrap()
        });
    });

    group.bench_function("delete_and_refill", |b| {
        let db = seeded_database(1000);
        let mut id = 1_000_000u64;
        b.iter(|| {
            let deleted = db
                .delete_many("library", &Predicate::gte("score", 99.0))
                .unwrap();
            for _ in 0..deleted.deleted_count {
                db.insert_one(
                    "library",
                    Document::new()
                        .with("title", format!("refill {}", id))
                        .with("score", 99.5),
                )
                .unwrap();
                id += 1;
            }
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_single_insert,
    bench_batch_insert,
    bench_find,
    bench_update_and_delete
);
criterion_main!(benches);
