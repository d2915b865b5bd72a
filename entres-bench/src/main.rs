mod generate_references;
mod metrics;

use std::collections::HashSet;
use std::time::Instant;

use itertools::Itertools;
use rand::prelude::*;
use rapidfuzz::fuzz;
use serde_json::json;

use entres::model::{FieldDef, Reference, Schema, SchemaHandle};
use entres::resolver::{ClusterData, MergeResolver, SerialResolver};

use crate::generate_references::{generate_entities, GeneratedEntity};
use crate::metrics::{MetricResult, Metrics};

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

/// Flattens the generated entities into shuffled references. Every
/// reference carries its ground-truth entity and a stable reference id in
/// the metadata.
fn build_references(
    schema: &SchemaHandle,
    entities: &[GeneratedEntity],
    rng: &mut StdRng,
) -> Vec<Reference> {
    let mut rows: Vec<(usize, u64, &str)> = Vec::new();
    let mut reference_id = 0u64;
    for (entity_id, entity) in entities.iter().enumerate() {
        for observed in &entity.observed {
            rows.push((entity_id, reference_id, observed.as_str()));
            reference_id += 1;
        }
    }
    rows.shuffle(rng);
    rows.into_iter()
        .map(|(entity_id, reference_id, name)| {
            Reference::builder(schema.clone())
                .field("observed_name", name)
                .metadata(json!({ "entity": entity_id, "ref": reference_id }))
                .build()
                .unwrap()
        })
        .collect()
}

/// Matches every ground-truth entity with its best-overlapping resolved
/// cluster and aggregates precision and recall.
fn score(data: &ClusterData, entities: &[GeneratedEntity]) -> MetricResult {
    let clusters: Vec<HashSet<u64>> = data
        .values()
        .map(|records| {
            records
                .iter()
                .map(|record| record["metadata"]["ref"].as_u64().unwrap())
                .collect()
        })
        .collect();
    let mut metrics = Metrics::new();
    let mut reference_id = 0u64;
    for entity in entities {
        let expected: HashSet<u64> = entity
            .observed
            .iter()
            .map(|_| {
                let id = reference_id;
                reference_id += 1;
                id
            })
            .collect();
        let empty = HashSet::new();
        let found = clusters
            .iter()
            .max_by_key(|cluster| cluster.intersection(&expected).count())
            .unwrap_or(&empty);
        metrics.update(found, &expected);
    }
    metrics.result()
}

fn report(label: &str, elapsed_millis: u128, num_clusters: usize, result: &MetricResult) {
    println!(
        "{}: {} clusters in {} ms, precision {:.3} recall {:.3} fscore {:.3}",
        label, num_clusters, elapsed_millis, result.precision, result.recall, result.fscore
    );
}

fn main() {
    env_logger::init();
    let mut rng = StdRng::seed_from_u64(42);
    let schema = product_schema();
    let entities = generate_entities(&mut rng, 200, 3, 2);
    let num_references: usize = entities.iter().map(|entity| entity.observed.len()).sum();
    println!(
        "Generated {} entities, {} references",
        entities.len(),
        num_references
    );
    println!(
        "Example: {} observed as {}",
        entities[0].canonical,
        entities[0].observed.join(", ")
    );

    let references = build_references(&schema, &entities, &mut rng);
    let now = Instant::now();
    let mut serial = SerialResolver::new(references);
    serial.resolve();
    let elapsed = now.elapsed();
    report(
        "SerialResolver",
        elapsed.as_millis(),
        serial.clusters().count(),
        &score(&serial.cluster_data(true), &entities),
    );

    let references = build_references(&schema, &entities, &mut rng);
    let now = Instant::now();
    let mut merge = MergeResolver::with_merge_unit_size(references, 100);
    merge.resolve();
    let elapsed = now.elapsed();
    report(
        "MergeResolver",
        elapsed.as_millis(),
        merge.clusters().count(),
        &score(&merge.cluster_data(true), &entities),
    );

    let largest: Vec<usize> = merge
        .clusters()
        .map(|cluster| cluster.len())
        .sorted()
        .rev()
        .take(5)
        .collect();
    println!("Largest clusters: {:?}", largest);
}
