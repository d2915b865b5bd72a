use std::mem;

use itertools::Itertools;
use log::debug;
use rayon::prelude::*;
use triomphe::Arc;

use super::serial::SerialResolver;
use super::{cluster_data, ClusterData, ClusterMap};
use crate::model::{Cluster, Reference, ReferenceHandle};

/// Implementation of the parallel, batch resolver.
///
/// The queued references are split into chunks of at most
/// `merge_unit_size`, each chunk is resolved by a fresh [`SerialResolver`],
/// and the partial resolutions are combined pyramidally: resolvers are
/// paired up level by level, every pair folding the second map's clusters
/// into the first through the same streaming primitive used for single
/// references. Chunk resolves and per-level pair merges run on the rayon
/// pool; a single accumulator is never shared between threads.
pub struct MergeResolver {
    references: Vec<ReferenceHandle>,
    cluster_map: ClusterMap,
    merge_unit_size: usize,
}

/// Chunk size used when none is given.
pub const DEFAULT_MERGE_UNIT_SIZE: usize = 500;

impl MergeResolver {
    pub fn new<I>(references: I) -> Self
    where
        I: IntoIterator<Item = Reference>,
    {
        Self::with_merge_unit_size(references, DEFAULT_MERGE_UNIT_SIZE)
    }

    /// # Panics
    ///
    /// When `merge_unit_size` is zero.
    pub fn with_merge_unit_size<I>(references: I, merge_unit_size: usize) -> Self
    where
        I: IntoIterator<Item = Reference>,
    {
        assert!(merge_unit_size > 0, "merge_unit_size must be positive");
        MergeResolver {
            references: references.into_iter().map(Arc::new).collect(),
            cluster_map: ClusterMap::default(),
            merge_unit_size,
        }
    }

    pub fn merge_unit_size(&self) -> usize {
        self.merge_unit_size
    }

    /// Enqueues one reference for the next [`resolve`] call.
    ///
    /// [`resolve`]: MergeResolver::resolve
    pub fn add(&mut self, reference: Reference) {
        self.references.push(Arc::new(reference));
    }

    pub fn bulk_add<I>(&mut self, references: I)
    where
        I: IntoIterator<Item = Reference>,
    {
        self.references.extend(references.into_iter().map(Arc::new));
    }

    /// Resolves every queued reference and folds the result into the
    /// cluster map left by earlier `resolve` calls.
    pub fn resolve(&mut self) {
        let pending = mem::take(&mut self.references);
        if pending.is_empty() {
            return;
        }
        debug!(
            "resolving {} references in units of {}",
            pending.len(),
            self.merge_unit_size
        );
        let mut resolvers: Vec<SerialResolver> = pending
            .par_chunks(self.merge_unit_size)
            .map(|chunk| {
                let mut resolver = SerialResolver::from_handles(chunk.to_vec());
                resolver.resolve();
                resolver
            })
            .collect();
        let mut level = 0;
        while resolvers.len() > 1 {
            level += 1;
            let carried = if resolvers.len() % 2 == 1 {
                resolvers.pop()
            } else {
                None
            };
            debug!(
                "merge level {}: combining {} partial resolutions",
                level,
                resolvers.len() + carried.iter().count()
            );
            let pairs: Vec<(SerialResolver, SerialResolver)> =
                resolvers.drain(..).tuples().collect();
            resolvers = pairs
                .into_par_iter()
                .map(|(accumulator, donor)| fold_into(accumulator, donor))
                .collect();
            resolvers.extend(carried);
        }
        let survivor = resolvers.pop().expect("at least one partial resolution");
        if self.cluster_map.is_empty() {
            self.cluster_map = survivor.into_cluster_map();
        } else {
            let accumulator = SerialResolver::from_cluster_map(mem::take(&mut self.cluster_map));
            self.cluster_map = fold_into(accumulator, survivor).into_cluster_map();
        }
    }

    /// The current live clusters, in no particular order.
    pub fn clusters(&self) -> impl Iterator<Item = &Cluster> {
        self.cluster_map.values()
    }

    pub fn cluster_map(&self) -> &ClusterMap {
        &self.cluster_map
    }

    /// The current clusters as structured records, keyed by cluster oid.
    pub fn cluster_data(&self, include_metadata: bool) -> ClusterData {
        cluster_data(&self.cluster_map, include_metadata)
    }
}

/// Streams every cluster of `donor` into `accumulator`.
fn fold_into(mut accumulator: SerialResolver, donor: SerialResolver) -> SerialResolver {
    accumulator.enqueue_clusters(donor.into_cluster_map().into_iter().map(|(_, cluster)| cluster));
    accumulator.resolve_clusters();
    accumulator
}
