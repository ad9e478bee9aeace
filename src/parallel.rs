//! Parallel reductions and work-splitting helpers.

use rayon::prelude::*;

/// Sum a slice of values with a parallel reduction.
///
/// Used to precompute node-level gradient/hessian totals and for sanity
/// checks. The result is deterministic for a fixed thread count and chunk
/// boundaries, but is not guaranteed bit-identical across different thread
/// counts.
pub fn sum_parallel(values: &[f64]) -> f64 {
    values.par_iter().sum()
}

/// Split `len` items into `n_regions` contiguous regions.
///
/// The first `len % n_regions` regions get one extra item. Returns the
/// start offset of each region plus a trailing end offset, so the result
/// has `n_regions + 1` entries and `windows(2)` yields the region bounds.
pub(crate) fn region_offsets(len: usize, n_regions: usize) -> Vec<usize> {
    debug_assert!(n_regions > 0);
    let base = len / n_regions;
    let extra = len % n_regions;

    let mut offsets = Vec::with_capacity(n_regions + 1);
    let mut pos = 0;
    offsets.push(pos);
    for region in 0..n_regions {
        pos += base + usize::from(region < extra);
        offsets.push(pos);
    }
    offsets
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sum_parallel_matches_sequential() {
        let values: Vec<f64> = (0..10_000).map(|i| (i as f64) * 0.25 - 7.0).collect();
        let expected: f64 = values.iter().sum();
        assert!((sum_parallel(&values) - expected).abs() < 1e-6);
    }

    #[test]
    fn test_sum_parallel_empty() {
        assert_eq!(sum_parallel(&[]), 0.0);
    }

    #[test]
    fn test_region_offsets_even() {
        assert_eq!(region_offsets(8, 4), vec![0, 2, 4, 6, 8]);
    }

    #[test]
    fn test_region_offsets_remainder_goes_first() {
        // 10 items over 4 regions: sizes 3, 3, 2, 2
        assert_eq!(region_offsets(10, 4), vec![0, 3, 6, 8, 10]);
    }

    #[test]
    fn test_region_offsets_more_regions_than_items() {
        // Trailing regions are empty but still present.
        assert_eq!(region_offsets(2, 4), vec![0, 1, 2, 2, 2]);
    }

    #[test]
    fn test_region_offsets_empty() {
        assert_eq!(region_offsets(0, 3), vec![0, 0, 0, 0]);
    }
}
