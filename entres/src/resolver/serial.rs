use std::collections::VecDeque;

use log::debug;
use triomphe::Arc;

use super::greedy::cluster_stream;
use super::{cluster_data, ClusterData, ClusterMap};
use crate::model::{Cluster, Reference, ReferenceHandle};

/// Implementation of the single threaded, incremental resolver.
///
/// References queue up through [`add`] and are drained by [`resolve`],
/// which inserts each one as a singleton cluster and greedily merges until
/// no positive-weightsum pair of live clusters remains. Resolution is
/// synchronous and, with distinct pair scores, deterministic in the
/// insertion order.
///
/// [`add`]: SerialResolver::add
/// [`resolve`]: SerialResolver::resolve
pub struct SerialResolver {
    references: VecDeque<ReferenceHandle>,
    pending_clusters: VecDeque<Cluster>,
    cluster_map: ClusterMap,
}

impl SerialResolver {
    pub fn new<I>(references: I) -> Self
    where
        I: IntoIterator<Item = Reference>,
    {
        SerialResolver {
            references: references.into_iter().map(Arc::new).collect(),
            pending_clusters: VecDeque::new(),
            cluster_map: ClusterMap::default(),
        }
    }

    pub(crate) fn from_handles(references: Vec<ReferenceHandle>) -> Self {
        SerialResolver {
            references: references.into(),
            pending_clusters: VecDeque::new(),
            cluster_map: ClusterMap::default(),
        }
    }

    pub(crate) fn from_cluster_map(cluster_map: ClusterMap) -> Self {
        SerialResolver {
            references: VecDeque::new(),
            pending_clusters: VecDeque::new(),
            cluster_map,
        }
    }

    /// Enqueues one reference for the next [`resolve`] call.
    ///
    /// [`resolve`]: SerialResolver::resolve
    pub fn add(&mut self, reference: Reference) {
        self.references.push_back(Arc::new(reference));
    }

    pub fn bulk_add<I>(&mut self, references: I)
    where
        I: IntoIterator<Item = Reference>,
    {
        self.references.extend(references.into_iter().map(Arc::new));
    }

    /// Drains the queue in insertion order, streaming every reference into
    /// the cluster map. Progress is reported through the `log` facade.
    pub fn resolve(&mut self) {
        let total = self.references.len();
        let mut done = 0usize;
        while let Some(reference) = self.references.pop_front() {
            done += 1;
            debug!("resolving {}/{}: {:?}", done, total, reference);
            cluster_stream(Cluster::singleton(reference), &mut self.cluster_map);
        }
    }

    /// Enqueues already-formed clusters; used by the batch resolver to
    /// fold one partial resolution into another.
    pub(crate) fn enqueue_clusters<I>(&mut self, clusters: I)
    where
        I: IntoIterator<Item = Cluster>,
    {
        self.pending_clusters.extend(clusters);
    }

    /// Streams every queued cluster into the cluster map. Each incoming
    /// cluster is re-minted with a fresh oid, so maps from different
    /// resolvers never collide.
    pub(crate) fn resolve_clusters(&mut self) {
        while let Some(cluster) = self.pending_clusters.pop_front() {
            cluster_stream(Cluster::new(cluster.into_references()), &mut self.cluster_map);
        }
    }

    /// The current live clusters, in no particular order.
    pub fn clusters(&self) -> impl Iterator<Item = &Cluster> {
        self.cluster_map.values()
    }

    pub fn cluster_map(&self) -> &ClusterMap {
        &self.cluster_map
    }

    pub(crate) fn into_cluster_map(self) -> ClusterMap {
        self.cluster_map
    }

    /// The current clusters as structured records, keyed by cluster oid.
    pub fn cluster_data(&self, include_metadata: bool) -> ClusterData {
        cluster_data(&self.cluster_map, include_metadata)
    }
}
