//! Criterion benchmarks for the object store.
//!
//! Covers: create under an open session, indexed lookup, prefix scans, and
//! rolling back a session of mixed mutations.

use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};

use tessera_store::{desc, IndexKey, IndexSpec, Object, ObjectDatabase, ObjectId};

#[derive(Clone, Debug, PartialEq, Default)]
struct Entry {
    id: ObjectId,
    owner: String,
    seq: u64,
    value: i64,
}

impl Object for Entry {
    const TYPE_NAME: &'static str = "entry";

    fn id(&self) -> ObjectId {
        self.id
    }

    fn set_id(&mut self, id: ObjectId) {
        self.id = id;
    }

    fn indices() -> Vec<IndexSpec<Self>> {
        vec![
            IndexSpec::unique("by_owner_seq", |e| IndexKey::new().with(&e.owner).with(e.seq)),
            IndexSpec::non_unique("by_value", |e| IndexKey::new().with(desc(e.value))),
        ]
    }
}

fn populated(n: u64) -> ObjectDatabase {
    let mut db = ObjectDatabase::new();
    db.add_table::<Entry>().unwrap();
    for i in 0..n {
        db.create::<Entry>(|e| {
            e.owner = format!("owner{}", i % 100);
            e.seq = i;
            e.value = (i * 7919 % 1000) as i64;
        })
        .unwrap();
    }
    db
}

fn bench_create(c: &mut Criterion) {
    c.bench_function("create_1000_in_session", |b| {
        b.iter_batched(
            || populated(0),
            |mut db| {
                db.begin_undo();
                for i in 0..1000u64 {
                    db.create::<Entry>(|e| {
                        e.owner = "bench".into();
                        e.seq = i;
                    })
                    .unwrap();
                }
                db
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_lookup(c: &mut Criterion) {
    let db = populated(10_000);
    let key = IndexKey::new().with("owner42").with(4242u64);
    c.bench_function("find_by_unique", |b| b.iter(|| db.find_by::<Entry>("by_owner_seq", black_box(&key)).unwrap()));
    let prefix = IndexKey::new().with("owner42");
    c.bench_function("prefix_scan_100", |b| {
        b.iter(|| db.table::<Entry>().unwrap().prefix("by_owner_seq", black_box(&prefix)).unwrap().count())
    });
}

fn bench_undo(c: &mut Criterion) {
    c.bench_function("undo_500_mixed", |b| {
        b.iter_batched(
            || {
                let mut db = populated(1_000);
                db.begin_undo();
                for id in 0..250 {
                    db.modify::<Entry>(id, |e| e.value += 1).unwrap();
                    db.remove::<Entry>(id + 500).unwrap();
                }
                db
            },
            |mut db| db.undo().unwrap(),
            BatchSize::SmallInput,
        )
    });
}

criterion_group!(benches, bench_create, bench_lookup, bench_undo);
criterion_main!(benches);
