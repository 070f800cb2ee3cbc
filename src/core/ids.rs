/// Synthetic node identities.

use crate::schema::node::NodeId;

/// Real node ids are always below this value.
pub const MAX_REAL_ID: u64 = 10_000_000_000;
/// First id of the range reserved for synthesized nodes.
pub const SYNTHETIC_ID_BASE: u64 = MAX_REAL_ID;
/// Width of the reserved range.
pub const SYNTHETIC_ID_SPAN: u64 = 1 << 32;

/// Derive a stable id in the synthetic range from a string key.
///
/// FNV-1a over the key's bytes, folded into the reserved span. Collisions are
/// possible inside the span but can never hit a real id.
pub fn derive_synthetic_id(key: &str) -> NodeId {
    const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

    let mut hash = FNV_OFFSET;
    for byte in key.as_bytes() {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    let folded = (hash ^ (hash >> 32)) % SYNTHETIC_ID_SPAN;
    NodeId(SYNTHETIC_ID_BASE + folded)
}

/// Same as [`derive_synthetic_id`] for numeric keys.
pub fn derive_synthetic_id_from_number(key: u64) -> NodeId {
    derive_synthetic_id(&key.to_string())
}

pub fn is_synthetic(id: NodeId) -> bool {
    id.0 >= SYNTHETIC_ID_BASE
}
