use criterion::{black_box, criterion_group, criterion_main, Criterion};

use mocards_sql::{SQLStore, SqliteStore, Value};

const CARDS_DDL: &str =
    "CREATE TABLE cards (id TEXT PRIMARY KEY, control_number TEXT UNIQUE, passcode TEXT UNIQUE)";

fn card_params(round: usize, i: usize) -> Vec<Value> {
    vec![
        Value::Text(format!("{round}-{i}")),
        Value::Text(format!("PHL-R{round}-{i:04}")),
        Value::Text(format!("MNL-{round}-{i}")),
    ]
}

fn bench_single_inserts(c: &mut Criterion) {
    let store = SqliteStore::open_in_memory().unwrap();
    store.exec(CARDS_DDL, &[]).unwrap();

    let mut round = 0usize;
    c.bench_function("cards_insert_100_single", |b| {
        b.iter(|| {
            round += 1;
            for i in 0..100 {
                store
                    .exec(
                        "INSERT INTO cards (id, control_number, passcode) VALUES (?1, ?2, ?3)",
                        &card_params(round, i),
                    )
                    .unwrap();
            }
        });
    });
}

fn bench_bulk_insert(c: &mut Criterion) {
    let store = SqliteStore::open_in_memory().unwrap();
    store.exec(CARDS_DDL, &[]).unwrap();

    let mut round = 0usize;
    c.bench_function("cards_insert_100_bulk", |b| {
        b.iter(|| {
            round += 1;
            let sets: Vec<Vec<Value>> = (0..100).map(|i| card_params(round, i)).collect();
            store
                .exec_many(
                    "INSERT INTO cards (id, control_number, passcode) VALUES (?1, ?2, ?3)",
                    &sets,
                )
                .unwrap();
        });
    });
}

fn bench_probe_control_number(c: &mut Criterion) {
    let store = SqliteStore::open_in_memory().unwrap();
    store.exec(CARDS_DDL, &[]).unwrap();
    let sets: Vec<Vec<Value>> = (0..10_000).map(|i| card_params(0, i)).collect();
    store
        .exec_many(
            "INSERT INTO cards (id, control_number, passcode) VALUES (?1, ?2, ?3)",
            &sets,
        )
        .unwrap();

    let mut i = 0usize;
    c.bench_function("cards_probe_control_number", |b| {
        b.iter(|| {
            let rows = store
                .query(
                    "SELECT 1 AS hit FROM cards WHERE control_number = ?1 LIMIT 1",
                    &[Value::Text(format!("PHL-R0-{:04}", black_box(i % 10_000)))],
                )
                .unwrap();
            assert_eq!(rows.len(), 1);
            i += 1;
        });
    });
}

criterion_group!(benches, bench_single_inserts, bench_bulk_insert, bench_probe_control_number);
criterion_main!(benches);
