use std::time::Duration;

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use docstore::{DocumentStore, bench_utils::generate_social};
use serde_json::json;

const SOCIAL_SEED: u64 = 0xB25F;
const SAMPLE_SIZE: usize = 20;
const WARM_UP: Duration = Duration::from_millis(300);
const MEASURE: Duration = Duration::from_millis(500);

fn bench_scales() -> &'static [usize] {
    #[cfg(feature = "bench-ci")]
    {
        &[100, 1_000]
    }
    #[cfg(not(feature = "bench-ci"))]
    {
        &[1_000, 10_000]
    }
}

fn loaded_store(users: usize, indexed: bool) -> DocumentStore {
    let store = DocumentStore::new();
    if indexed {
        store.create_index("posts", "category");
    }
    generate_social(users, 3, 5, SOCIAL_SEED + users as u64).load(&store);
    store
}

fn bench_category_lookup(c: &mut Criterion) {
    let mut group = c.benchmark_group("category_lookup");
    group.sample_size(SAMPLE_SIZE);
    group.warm_up_time(WARM_UP);
    group.measurement_time(MEASURE);
    let value = json!("music");
    for &users in bench_scales() {
        for indexed in [false, true] {
            let store = loaded_store(users, indexed);
            let label = if indexed { "index" } else { "scan" };
            group.bench_function(BenchmarkId::new(label, users), |b| {
                b.iter(|| store.query_by_index("posts", "category", &value));
            });
        }
    }
    group.finish();
}

fn bench_related(c: &mut Criterion) {
    let mut group = c.benchmark_group("related_documents");
    group.sample_size(SAMPLE_SIZE);
    group.warm_up_time(WARM_UP);
    group.measurement_time(MEASURE);
    for &users in bench_scales() {
        let store = loaded_store(users, false);
        group.bench_function(BenchmarkId::from_parameter(users), |b| {
            b.iter(|| store.get_related_documents("users", "u0", "users", "follows"));
        });
    }
    group.finish();
}

criterion_group!(
    name = lookup_benches;
    config = Criterion::default();
    targets = bench_category_lookup, bench_related
);
criterion_main!(lookup_benches);
