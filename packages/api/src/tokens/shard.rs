//! Shard-allocation policy: one tenant per shard, lowest free index first.

use std::collections::HashSet;

/// Prefix of every shard identifier.
pub const SHARD_PREFIX: &str = "shard-";

/// Returns the shard id for a zero-based index.
pub fn shard_id(index: usize) -> String {
    format!("{SHARD_PREFIX}{index}")
}

/// Returns the lowest-indexed shard in `0..shard_count` that is not in
/// `occupied`, or `None` when every shard already has a tenant.
pub fn next_free_shard(shard_count: usize, occupied: &HashSet<String>) -> Option<String> {
    (0..shard_count)
        .map(shard_id)
        .find(|shard| !occupied.contains(shard))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn occupied(shards: &[&str]) -> HashSet<String> {
        shards.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn empty_pool_allocates_shard_zero() {
        assert_eq!(
            next_free_shard(4, &HashSet::new()),
            Some("shard-0".to_string())
        );
    }

    #[test]
    fn allocation_skips_occupied_shards() {
        assert_eq!(
            next_free_shard(4, &occupied(&["shard-0", "shard-1"])),
            Some("shard-2".to_string())
        );
    }

    #[test]
    fn lowest_index_wins_over_gaps() {
        assert_eq!(
            next_free_shard(4, &occupied(&["shard-1", "shard-3"])),
            Some("shard-0".to_string())
        );
    }

    #[test]
    fn full_pool_is_exhausted() {
        assert_eq!(next_free_shard(2, &occupied(&["shard-0", "shard-1"])), None);
    }

    #[test]
    fn foreign_shard_ids_do_not_count() {
        // Occupancy outside 0..N (e.g. after SHARD_COUNT shrank) does not
        // block allocation of in-range shards.
        assert_eq!(
            next_free_shard(1, &occupied(&["shard-7"])),
            Some("shard-0".to_string())
        );
    }
}
