//! Two-phase parallel partition of a node's sample indices.
//!
//! A single serial partition of a large node is memory-bandwidth bound, so
//! `split_indices` spreads the work over the thread pool in two phases:
//!
//! 1. **Route.** The node's slice is cut into one contiguous region per
//!    thread. Each region compacts its left-going samples into the left
//!    scratch buffer and its right-going samples into the right scratch
//!    buffer, at the region's own offset, and reports both counts.
//! 2. **Copy back.** Prefix sums over the per-region counts give every
//!    region's destination in the permuted `[left | right]` layout; each
//!    region then copies its two compacted fragments into place.
//!
//! The scratch buffers span the full partition array rather than the node
//! slice, so phase-1 offsets are the same indices in the buffers and in
//! `partition` and no range mapping is needed between the phases.

use std::ops::Range;

use rayon::prelude::*;

use crate::parallel::region_offsets;

use super::{SplitInfo, Splitter};

impl Splitter<'_> {
    /// Partition a node's samples about a chosen split.
    ///
    /// `node` must be a sub-range of the partition array that currently
    /// holds exactly the node's samples. On return the range is permuted so
    /// the left child's samples come first; the two child slices and the
    /// right child's start position in the partition array are returned.
    /// Order within each child is not preserved.
    pub fn split_indices(
        &mut self,
        split_info: &SplitInfo,
        node: Range<usize>,
    ) -> (&[u32], &[u32], usize) {
        debug_assert!(node.end <= self.partition.len());

        let lo = node.start;
        let n_node = node.len();
        if n_node == 0 {
            return (&[], &[], lo);
        }

        let bins = self.binned.feature_column(split_info.feature_idx);
        let missing_values_bin_idx = self.missing_values_bin_idx;
        let sample_goes_left = |sample_idx: u32| -> bool {
            let bin = bins[sample_idx as usize];
            if split_info.is_categorical {
                split_info.left_cat_bitset.test(bin)
            } else {
                (split_info.missing_go_to_left && bin == missing_values_bin_idx)
                    || bin <= split_info.bin_idx
            }
        };

        let n_regions = rayon::current_num_threads();
        let offsets = region_offsets(n_node, n_regions);

        // Phase 1: each region routes its samples into the scratch buffers.
        let node_samples = &self.partition[lo..lo + n_node];
        let left_chunks = split_mut_at_offsets(
            &mut self.left_indices_buffer[lo..lo + n_node],
            &offsets,
        );
        let right_chunks = split_mut_at_offsets(
            &mut self.right_indices_buffer[lo..lo + n_node],
            &offsets,
        );

        let counts: Vec<(usize, usize)> = left_chunks
            .into_par_iter()
            .zip(right_chunks)
            .enumerate()
            .map(|(region, (left_out, right_out))| {
                let mut n_left = 0;
                let mut n_right = 0;
                for &sample_idx in &node_samples[offsets[region]..offsets[region + 1]] {
                    if sample_goes_left(sample_idx) {
                        left_out[n_left] = sample_idx;
                        n_left += 1;
                    } else {
                        right_out[n_right] = sample_idx;
                        n_right += 1;
                    }
                }
                (n_left, n_right)
            })
            .collect();

        // Per-region destinations: lefts pack from the front of the node
        // range, rights from position `right_child_position`.
        let n_left_total: usize = counts.iter().map(|&(n_left, _)| n_left).sum();

        // Phase 2: copy each region's fragments to their final positions.
        let left_sources = &self.left_indices_buffer[lo..lo + n_node];
        let right_sources = &self.right_indices_buffer[lo..lo + n_node];
        let (left_dst, right_dst) = self.partition[lo..lo + n_node].split_at_mut(n_left_total);
        let left_dst_chunks =
            split_mut_by_sizes(left_dst, counts.iter().map(|&(n_left, _)| n_left));
        let right_dst_chunks =
            split_mut_by_sizes(right_dst, counts.iter().map(|&(_, n_right)| n_right));

        left_dst_chunks
            .into_par_iter()
            .zip(right_dst_chunks)
            .enumerate()
            .for_each(|(region, (left_out, right_out))| {
                let start = offsets[region];
                left_out.copy_from_slice(&left_sources[start..start + left_out.len()]);
                right_out.copy_from_slice(&right_sources[start..start + right_out.len()]);
            });

        let right_child_position = lo + n_left_total;
        log::trace!(
            "partitioned node [{lo}, {}): {} left, {} right",
            lo + n_node,
            n_left_total,
            n_node - n_left_total
        );

        let (left, right) = self.partition[lo..lo + n_node].split_at(n_left_total);
        (left, right, right_child_position)
    }
}

/// Split a slice into chunks at the given ascending offsets.
///
/// `offsets` must start at 0 and end at `slice.len()`.
fn split_mut_at_offsets<'s, T>(slice: &'s mut [T], offsets: &[usize]) -> Vec<&'s mut [T]> {
    split_mut_by_sizes(slice, offsets.windows(2).map(|pair| pair[1] - pair[0]))
}

/// Split a slice into consecutive chunks of the given sizes.
///
/// The sizes must sum to `slice.len()`.
fn split_mut_by_sizes<'s, T>(
    slice: &'s mut [T],
    sizes: impl Iterator<Item = usize>,
) -> Vec<&'s mut [T]> {
    let mut rest = slice;
    let mut chunks = Vec::new();
    for size in sizes {
        let (chunk, tail) = rest.split_at_mut(size);
        chunks.push(chunk);
        rest = tail;
    }
    debug_assert!(rest.is_empty());
    chunks
}
