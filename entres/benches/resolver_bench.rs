use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion, Throughput};
use rand::distributions::Alphanumeric;
use rand::prelude::{Distribution, StdRng};
use rand::{Rng, SeedableRng};
use rapidfuzz::fuzz;

use entres::model::{FieldDef, Reference, Schema, SchemaHandle};
use entres::resolver::{MergeResolver, SerialResolver};

fn product_schema() -> SchemaHandle {
    Schema::builder()
        .field(
            FieldDef::new("observed_name")
                .probabilities(0.85, 0.15)
                .comparator(|a, b| match (a.as_str(), b.as_str()) {
                    (Some(a), Some(b)) => fuzz::ratio(a.chars(), b.chars()) >= 70.0,
                    _ => false,
                }),
        )
        .build()
        .unwrap()
}

fn corrupt(rng: &mut StdRng, canonical: &str, substitutions: usize) -> String {
    let mut chars: Vec<char> = canonical.chars().collect();
    for _ in 0..substitutions {
        let i = rng.gen_range(0..chars.len());
        chars[i] = char::from(Alphanumeric.sample(rng));
    }
    chars.into_iter().collect()
}

/// Noisy observations of `num_entities` synthetic product names, two
/// character substitutions per observation.
fn noisy_names(rng: &mut StdRng, num_entities: usize, observations: usize) -> Vec<String> {
    let mut names = Vec::with_capacity(num_entities * observations);
    for _ in 0..num_entities {
        let canonical: String = Alphanumeric
            .sample_iter(&mut *rng)
            .take(24)
            .map(char::from)
            .collect();
        for _ in 0..observations {
            names.push(corrupt(rng, &canonical, 2));
        }
    }
    names
}

fn references(schema: &SchemaHandle, names: &[String]) -> Vec<Reference> {
    names
        .iter()
        .map(|name| {
            Reference::builder(schema.clone())
                .field("observed_name", name.as_str())
                .build()
                .unwrap()
        })
        .collect()
}

fn bench_reference_compare(c: &mut Criterion) {
    let schema = product_schema();
    let refs = references(
        &schema,
        &[
            "PrimeHarvestCheese10Qg".to_string(),
            "PrimeHarvLstCheese1F0g".to_string(),
        ],
    );
    let mut group = c.benchmark_group("bench_reference_compare");
    group.throughput(Throughput::Elements(1));
    group.bench_function("compare", |b| {
        b.iter(|| {
            black_box(refs[0].compare(&refs[1]));
        })
    });
    group.finish();
}

fn bench_serial_resolve(c: &mut Criterion) {
    let schema = product_schema();
    let mut rng = StdRng::seed_from_u64(3);
    let names = noisy_names(&mut rng, 20, 3);
    let mut group = c.benchmark_group("bench_serial_resolve");
    group.throughput(Throughput::Elements(names.len() as u64));
    group.bench_function("serial_resolve_60", |b| {
        b.iter_batched(
            || references(&schema, &names),
            |refs| {
                let mut resolver = SerialResolver::new(refs);
                resolver.resolve();
                black_box(resolver.clusters().count());
            },
            BatchSize::SmallInput,
        )
    });
    group.finish();
}

fn bench_merge_resolve(c: &mut Criterion) {
    let schema = product_schema();
    let mut rng = StdRng::seed_from_u64(3);
    let names = noisy_names(&mut rng, 40, 3);
    let mut group = c.benchmark_group("bench_merge_resolve");
    group.throughput(Throughput::Elements(names.len() as u64));
    group.bench_function("merge_resolve_120", |b| {
        b.iter_batched(
            || references(&schema, &names),
            |refs| {
                let mut resolver = MergeResolver::with_merge_unit_size(refs, 30);
                resolver.resolve();
                black_box(resolver.clusters().count());
            },
            BatchSize::SmallInput,
        )
    });
    group.finish();
}

criterion_group! {
    name = benches;
    config = Criterion::default();
    targets = bench_reference_compare, bench_serial_resolve, bench_merge_resolve
}

criterion_main!(benches);
