use std::fmt;

use ahash::AHashSet;
use fnv::FnvHashMap;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};
use smallvec::SmallVec;

use super::reference::ReferenceHandle;
use super::{next_oid, Oid};

/// Most clusters stay small; keep a few member handles inline before
/// spilling to the heap.
type Members = SmallVec<[ReferenceHandle; 4]>;

/// A non-empty set of references hypothesised to denote one entity.
///
/// A cluster is immutable: merging two clusters produces a third one with a
/// fresh oid, and the resolver discards the inputs. Its blocking keys are
/// the per-name unions of the members' blocking values; two clusters are
/// comparable only when some shared key name has intersecting value sets.
pub struct Cluster {
    oid: Oid,
    references: Members,
    blocking_keys: FnvHashMap<String, AHashSet<String>>,
}

impl Cluster {
    /// Builds a cluster around the given references, minting a fresh oid.
    ///
    /// Members are deduplicated and kept sorted by oid so that score
    /// summation order is deterministic.
    ///
    /// # Panics
    ///
    /// When the reference set is empty; an empty cluster is an internal
    /// invariant violation.
    pub fn new(references: impl IntoIterator<Item = ReferenceHandle>) -> Self {
        let mut references: Members = references.into_iter().collect();
        references.sort_unstable_by_key(|reference| reference.oid());
        references.dedup_by_key(|reference| reference.oid());
        assert!(!references.is_empty(), "cluster must hold at least one reference");
        let mut blocking_keys: FnvHashMap<String, AHashSet<String>> = FnvHashMap::default();
        for reference in &references {
            for (name, value) in reference.blocking_keys() {
                blocking_keys
                    .entry(name.clone())
                    .or_default()
                    .insert(value.clone());
            }
        }
        Cluster {
            oid: next_oid(),
            references,
            blocking_keys,
        }
    }

    pub fn singleton(reference: ReferenceHandle) -> Self {
        Cluster::new([reference])
    }

    pub fn oid(&self) -> Oid {
        self.oid
    }

    pub fn references(&self) -> &[ReferenceHandle] {
        &self.references
    }

    pub fn len(&self) -> usize {
        self.references.len()
    }

    pub fn is_empty(&self) -> bool {
        self.references.is_empty()
    }

    /// Per-name unions of the members' blocking key values.
    pub fn blocking_keys(&self) -> &FnvHashMap<String, AHashSet<String>> {
        &self.blocking_keys
    }

    /// Whether some shared key name has intersecting value sets.
    pub fn has_common_block(&self, other: &Cluster) -> bool {
        self.blocking_keys.iter().any(|(name, values)| {
            other
                .blocking_keys
                .get(name)
                .map_or(false, |other_values| !values.is_disjoint(other_values))
        })
    }

    /// Raw pairwise log-odds: the sum of member-by-member reference scores,
    /// short-circuited to zero when the clusters share no block.
    pub fn compare(&self, other: &Cluster) -> f64 {
        if !self.has_common_block(other) {
            return 0.0;
        }
        let mut score = 0.0;
        for reference in &self.references {
            for other_reference in &other.references {
                score += reference.compare(other_reference);
            }
        }
        score
    }

    /// [`compare`] clamped at zero: the non-negative merge priority. A
    /// positive weightsum means merging the clusters improves the total
    /// log-likelihood.
    ///
    /// [`compare`]: Cluster::compare
    pub fn weightsum(&self, other: &Cluster) -> f64 {
        self.compare(other).max(0.0)
    }

    /// A new cluster holding the union of both member sets.
    pub fn merge(&self, other: &Cluster) -> Cluster {
        Cluster::new(
            self.references
                .iter()
                .cloned()
                .chain(other.references.iter().cloned()),
        )
    }

    pub(crate) fn into_references(self) -> impl Iterator<Item = ReferenceHandle> {
        self.references.into_iter()
    }

    /// One record per member reference, in member order.
    pub fn to_records(&self, include_metadata: bool) -> Vec<Map<String, Value>> {
        self.references
            .iter()
            .map(|reference| reference.to_record(include_metadata))
            .collect()
    }
}

impl fmt::Debug for Cluster {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<Cluster oid={} refcount={}>", self.oid, self.references.len())
    }
}

impl Serialize for Cluster {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_records(true).serialize(serializer)
    }
}
