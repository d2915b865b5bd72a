//! The greedy agglomeration primitives shared by both resolvers.
//!
//! `cluster_pass` and `cluster_solve` are pure: they consume and return
//! their cluster map and never touch resolver state, which is what lets
//! the batch resolver run them on local sub-maps. `cluster_stream` is the
//! single state-advancing operation.

use std::collections::BinaryHeap;

use itertools::Itertools;
use log::trace;

use super::ClusterMap;
use crate::model::{Cluster, Pair};

/// One greedy step: merge the highest-weightsum cluster pair, if any.
///
/// Returns the map and whether it was already optimal (no strictly
/// positive pair left). Each non-optimal pass shrinks the map by one.
pub(crate) fn cluster_pass(mut cluster_map: ClusterMap) -> (ClusterMap, bool) {
    let mut candidates = BinaryHeap::new();
    for ((oid_1, cluster_1), (oid_2, cluster_2)) in cluster_map.iter().tuple_combinations() {
        let weightsum = cluster_1.weightsum(cluster_2);
        if weightsum > 0.0 {
            candidates.push(Pair::new(*oid_1, *oid_2, weightsum));
        }
    }
    let best = match candidates.pop() {
        Some(best) => best,
        None => return (cluster_map, true),
    };
    let cluster_1 = cluster_map
        .remove(&best.lo())
        .expect("candidate pair names a live cluster");
    let cluster_2 = cluster_map
        .remove(&best.hi())
        .expect("candidate pair names a live cluster");
    let merged = cluster_1.merge(&cluster_2);
    trace!(
        "merged {:?} and {:?} into {:?} (weightsum {})",
        cluster_1,
        cluster_2,
        merged,
        best.score()
    );
    cluster_map.insert(merged.oid(), merged);
    (cluster_map, false)
}

/// Runs `cluster_pass` to its fixed point. Returns the map and whether any
/// merge happened. Terminates because every merge removes one cluster.
pub(crate) fn cluster_solve(mut cluster_map: ClusterMap) -> (ClusterMap, bool) {
    let mut changed = false;
    loop {
        let (next, optimal) = cluster_pass(cluster_map);
        cluster_map = next;
        if optimal {
            return (cluster_map, changed);
        }
        changed = true;
    }
}

/// Inserts a freshly minted cluster and locally re-optimises around it.
///
/// The frontier starts as the new cluster alone. Each round collects every
/// positive-weightsum pair between a frontier cluster and the rest of the
/// map, pops the best one, resolves those two clusters in isolation with
/// `cluster_solve`, and folds the local solution back: merged clusters
/// join the frontier, consumed ones leave the map. The loop ends when the
/// frontier produces no positive pair, so only neighbourhoods affected by
/// a merge are ever revisited.
pub(crate) fn cluster_stream(new: Cluster, cluster_map: &mut ClusterMap) {
    let mut active = vec![new.oid()];
    cluster_map.insert(new.oid(), new);
    loop {
        let mut pair_set = BinaryHeap::new();
        for active_oid in &active {
            let active_cluster = &cluster_map[active_oid];
            for (oid, cluster) in cluster_map.iter() {
                if oid == active_oid {
                    continue;
                }
                let weightsum = active_cluster.weightsum(cluster);
                if weightsum > 0.0 {
                    pair_set.push(Pair::new(*active_oid, *oid, weightsum));
                }
            }
        }
        active.clear();
        let best = match pair_set.pop() {
            Some(best) => best,
            None => break,
        };
        let cluster_1 = cluster_map
            .remove(&best.lo())
            .expect("best pair names a live cluster");
        let cluster_2 = cluster_map
            .remove(&best.hi())
            .expect("best pair names a live cluster");
        let mut local = ClusterMap::default();
        local.insert(cluster_1.oid(), cluster_1);
        local.insert(cluster_2.oid(), cluster_2);
        let (solution, _) = cluster_solve(local);
        for (oid, cluster) in solution {
            if oid != best.lo() && oid != best.hi() {
                active.push(oid);
            }
            cluster_map.insert(oid, cluster);
        }
    }
}
