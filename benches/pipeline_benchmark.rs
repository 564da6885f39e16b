use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use papyra::{
    AccumulatorSpec, Database, Document, Pipeline, Predicate, Projection, SortOrder, Value,
};
use rand::Rng;

fn seeded_database(count: u64) -> Database {
    let mut rng = rand::thread_rng();
    let authors = ["Ravi Sharma", "Anita Rao", "Karan Mehta", "Sunita Iyer"];
    let genres = ["Fiction", "Mystery", "Sci-Fi"];

    let db = Database::new();
    let docs: Vec<Document> = (0..count)
        .map(|i| {
            Document::new()
                .with("title", format!("Book {}", i))
                .with("author", authors[rng.gen_range(0..authors.len())])
                .with("genre", genres[rng.gen_range(0..genres.len())])
                .with("price", rng.gen_range(100..1000) as i64)
        })
        .collect();
    db.insert_many("books", docs).unwrap();
    db
}

fn bench_aggregate(c: &mut Criterion) {
    let mut group = c.benchmark_group("aggregate");

    for size in [100u64, 1000, 10000].iter() {
        let db = seeded_database(*size);

        let pipeline = Pipeline::new()
            .matching(Predicate::gte("price", 300))
            .sort("price", SortOrder::Desc)
            .group(
                Some("genre"),
                vec![
                    AccumulatorSpec::first("top", "title"),
                    AccumulatorSpec::avg("avgPrice", "price"),
                    AccumulatorSpec::sum_constant("count", 1),
                ],
            );

        group.bench_with_input(
            BenchmarkId::new("match_sort_group", size),
            &db,
            |b, db| {
                b.iter(|| db.aggregate("books", black_box(&pipeline)).unwrap());
            },
        );

        let project = Pipeline::new()
            .project(Projection::include(vec!["title", "price"]).without_id())
            .limit(25);
        group.bench_with_input(BenchmarkId::new("project_limit", size), &db, |b, db| {
            b.iter(|| db.aggregate("books", black_box(&project)).unwrap());
        });
    }

    group.finish();
}

fn bench_map_reduce(c: &mut Criterion) {
    let mut group = c.benchmark_group("map_reduce");

    for size in [100u64, 1000, 10000].iter() {
        let db = seeded_database(*size);

        group.bench_with_input(BenchmarkId::from_parameter(size), &db, |b, db| {
            b.iter(|| {
                db.map_reduce(
                    "books",
                    &|doc| match (doc.get("author"), doc.get("price")) {
                        (Some(author), Some(price)) => {
                            Ok(vec![(author.clone(), price.clone())])
                        }
                        _ => Ok(vec![]),
                    },
                    &|_key, values| {
                        Ok(Value::Int(
                            values
                                .iter()
                                .map(|v| if let Value::Int(n) = v { *n } else { 0 })
                                .sum(),
                        ))
                    },
                    "author_revenue",
                )
                .unwrap()
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_aggregate, bench_map_reduce);
criterion_main!(benches);
