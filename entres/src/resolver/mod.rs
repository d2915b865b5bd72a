mod greedy;
mod merge;
mod serial;

pub use self::merge::{MergeResolver, DEFAULT_MERGE_UNIT_SIZE};
pub use self::serial::SerialResolver;

use std::collections::HashMap;

use ahash::AHashMap;
use serde_json::{Map, Value};

use crate::model::{Cluster, Oid};

/// The live-cluster database every resolver maintains: a bijection from
/// cluster oid to cluster.
pub type ClusterMap = AHashMap<Oid, Cluster>;

/// Structured resolver output: one list of flat reference records per live
/// cluster oid.
pub type ClusterData = HashMap<Oid, Vec<Map<String, Value>>>;

pub(crate) fn cluster_data(cluster_map: &ClusterMap, include_metadata: bool) -> ClusterData {
    cluster_map
        .iter()
        .map(|(oid, cluster)| (*oid, cluster.to_records(include_metadata)))
        .collect()
}
