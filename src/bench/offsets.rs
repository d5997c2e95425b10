//! Read offsets
//!
//! The read pass visits every block of the file exactly once, in a
//! uniformly shuffled order, so neither readahead nor locality helps.

use rand::seq::SliceRandom;
use rand::Rng;

/// `[0, block_size, 2 * block_size, ...]` with `block_count` entries
pub fn block_offsets(block_size: u64, block_count: u64) -> Vec<u64> {
    (0..block_count).map(|i| i * block_size).collect()
}

/// Block offsets in a uniformly random visiting order
pub fn shuffled_offsets<R: Rng + ?Sized>(block_size: u64, block_count: u64, rng: &mut R) -> Vec<u64> {
    let mut offsets = block_offsets(block_size, block_count);
    offsets.shuffle(rng);
    offsets
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashMap;

    #[test]
    fn test_block_offsets_in_order() {
        assert_eq!(block_offsets(512, 4), vec![0, 512, 1024, 1536]);
        assert!(block_offsets(512, 0).is_empty());
    }

    #[test]
    fn test_shuffle_is_a_permutation() {
        let mut rng = StdRng::seed_from_u64(42);
        let mut offsets = shuffled_offsets(512, 4, &mut rng);
        offsets.sort_unstable();
        assert_eq!(offsets, vec![0, 512, 1024, 1536]);
    }

    #[test]
    fn test_large_shuffle_has_no_repeats_or_gaps() {
        let mut rng = StdRng::seed_from_u64(7);
        let offsets = shuffled_offsets(4096, 10_000, &mut rng);
        assert_eq!(offsets.len(), 10_000);
        assert_ne!(offsets, block_offsets(4096, 10_000));

        let mut sorted = offsets.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, block_offsets(4096, 10_000));
        assert!(offsets.iter().all(|o| o % 4096 == 0));
    }

    #[test]
    fn test_first_position_is_uniform() {
        let mut rng = StdRng::seed_from_u64(2024);
        let mut first_counts: HashMap<u64, u32> = HashMap::new();
        let trials = 10_000;

        for _ in 0..trials {
            let offsets = shuffled_offsets(512, 4, &mut rng);
            *first_counts.entry(offsets[0]).or_insert(0) += 1;
        }

        assert_eq!(first_counts.len(), 4);
        // Expected 2500 each; binomial sd is about 43
        for (offset, count) in &first_counts {
            assert!(
                (2200..=2800).contains(count),
                "offset {} came first {} times",
                offset,
                count
            );
        }
    }
}
