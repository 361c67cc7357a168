//! Chat message deduplication.
//!
//! Paginated chat APIs may hand back an item more than once (a retried page,
//! the backlog returned on a fresh cursor). [`MessageIdDedup`] remembers the
//! IDs of recently emitted messages so the same chat line never counts as two
//! votes.

/// Number of slots in the hash table.
///
/// Must be a power of 2. 8192 slots × 8 bytes = 64 KB.
const TABLE_SIZE: usize = 8192;

/// Fixed-size table of recently seen message IDs.
///
/// IDs are hashed with xxHash64 and stored by hash. A colliding newer ID
/// evicts the older one, so very old IDs may be accepted again; with chat
/// volume far below the table size this does not happen in practice.
///
/// Not thread-safe. Each poll loop owns its own instance.
pub struct MessageIdDedup {
    table: Vec<u64>,
}

impl MessageIdDedup {
    pub fn new() -> Self {
        Self { table: vec![0u64; TABLE_SIZE] }
    }

    #[inline]
    fn hash_id(id: &str) -> u64 {
        xxhash_rust::xxh64::xxh64(id.as_bytes(), 0)
    }

    /// Record `id` and report whether it is new.
    ///
    /// Returns `false` if the ID was already recorded.
    #[inline]
    pub fn check_and_insert(&mut self, id: &str) -> bool {
        let hash = Self::hash_id(id);
        let idx = (hash as usize) & (TABLE_SIZE - 1);

        if self.table[idx] == hash {
            false
        } else {
            self.table[idx] = hash;
            true
        }
    }
}

impl Default for MessageIdDedup {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeats_are_rejected() {
        let mut d = MessageIdDedup::new();
        assert!(d.check_and_insert("LCC.abc123"));
        assert!(!d.check_and_insert("LCC.abc123"));
        assert!(d.check_and_insert("LCC.abc124"));
    }
}
