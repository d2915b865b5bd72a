mod cluster;
mod field;
mod pair;
mod reference;
mod schema;

pub use self::cluster::Cluster;
pub use self::field::{fellegi_sunter_adjustment, FieldDef};
pub use self::pair::Pair;
pub use self::reference::{Reference, ReferenceBuilder, ReferenceHandle};
pub use self::schema::{
    BlockingKeyDef, FieldValues, Schema, SchemaBuilder, SchemaError, SchemaHandle,
};

use std::sync::atomic::{AtomicU64, Ordering};

/// Object id minted for every Reference and Cluster from one process-wide
/// sequence. Ids are opaque: monotonically increasing but not contiguous.
pub type Oid = u64;

static OID_SEQUENCE: AtomicU64 = AtomicU64::new(0);

pub(crate) fn next_oid() -> Oid {
    OID_SEQUENCE.fetch_add(1, Ordering::Relaxed)
}
