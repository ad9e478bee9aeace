//! Categorical split search.
//!
//! A categorical split sends a set of categories left and its complement
//! right; there is no natural ordering to scan. Categories are instead
//! ranked by their smoothed gradient/hessian ratio (Fisher 1958) and then
//! scanned exactly like ordered numeric bins. The missing values bin is a
//! first-class category here, not a direction.

use std::cmp::Ordering;

use crate::histogram::HistogramEntry;

use super::gain::split_gain;
use super::{Bitset256, MonotonicConstraint, SplitCandidate, Splitter};

/// Minimum smoothed hessian weight a category needs to participate in a
/// split, and the smoothing term of the ordering ratio. Fixed, not a
/// hyperparameter.
pub(super) const MIN_CAT_SUPPORT: f64 = 10.0;

/// One participating category during the ordered scan.
#[derive(Debug, Clone, Copy)]
struct CategoryInfo {
    bin_idx: u8,
    sum_gradients: f64,
    sum_hessians: f64,
    count: u32,
    /// Ordering key: `sum_gradients / (sum_hessians + MIN_CAT_SUPPORT)`.
    score: f64,
}

/// Best prefix found by the ordered scan, before the bitset is built.
#[derive(Debug, Clone, Copy)]
struct BestPrefix {
    gain: f64,
    /// Index into the sorted category list; categories `0..=end_idx` go left.
    end_idx: usize,
    sum_gradient_left: f64,
    sum_hessian_left: f64,
    n_samples_left: u32,
}

impl Splitter<'_> {
    /// Find the best categorical split of one feature.
    #[allow(clippy::too_many_arguments)]
    pub(super) fn find_best_split_category(
        &self,
        feature_idx: usize,
        histogram: &[HistogramEntry],
        n_samples: u32,
        sum_gradients: f64,
        sum_hessians: f64,
        loss_current_node: f64,
        lower_bound: f64,
        upper_bound: f64,
    ) -> Option<SplitCandidate> {
        let n_bins_non_missing = self.n_bins_non_missing[feature_idx] as usize;
        if n_bins_non_missing <= 1 {
            return None;
        }

        // Near 1 when hessians are (close to) constant; scales per-category
        // hessian mass to an effective sample count for the support filter.
        let support_factor = f64::from(n_samples) / sum_hessians;

        let mut cat_infos: Vec<CategoryInfo> = Vec::with_capacity(n_bins_non_missing + 1);
        let push_category = |bin_idx: usize, cat_infos: &mut Vec<CategoryInfo>| {
            let entry = &histogram[bin_idx];
            let sum_hessians_bin = self.entry_hessian(entry);
            if sum_hessians_bin * support_factor >= MIN_CAT_SUPPORT {
                cat_infos.push(CategoryInfo {
                    bin_idx: bin_idx as u8,
                    sum_gradients: entry.sum_gradients,
                    sum_hessians: sum_hessians_bin,
                    count: entry.count,
                    score: entry.sum_gradients / (sum_hessians_bin + MIN_CAT_SUPPORT),
                });
            }
        };
        for bin_idx in 0..n_bins_non_missing {
            push_category(bin_idx, &mut cat_infos);
        }
        // Missing values form their own category, under the same filter.
        if self.has_missing_values[feature_idx] {
            push_category(self.missing_values_bin_idx as usize, &mut cat_infos);
        }

        if cat_infos.len() < 2 {
            return None;
        }

        cat_infos.sort_by(|a, b| a.score.partial_cmp(&b.score).unwrap_or(Ordering::Equal));

        // Scan the sorted categories like ordered bins. The last category is
        // excluded as a prefix end so the right child can never be empty.
        let mut best: Option<BestPrefix> = None;
        let mut sum_gradient_left = 0.0;
        let mut sum_hessian_left = 0.0;
        let mut n_samples_left = 0u32;

        for (sorted_idx, cat_info) in cat_infos[..cat_infos.len() - 1].iter().enumerate() {
            n_samples_left += cat_info.count;
            sum_gradient_left += cat_info.sum_gradients;
            sum_hessian_left += cat_info.sum_hessians;

            let n_samples_right = n_samples - n_samples_left;
            let sum_gradient_right = sum_gradients - sum_gradient_left;
            let sum_hessian_right = sum_hessians - sum_hessian_left;

            if n_samples_left < self.params.min_samples_leaf
                || sum_hessian_left < self.params.min_hessian_to_split
            {
                continue;
            }
            // The remaining categories only shrink the right side.
            if n_samples_right < self.params.min_samples_leaf
                || sum_hessian_right < self.params.min_hessian_to_split
            {
                break;
            }

            let gain = split_gain(
                sum_gradient_left,
                sum_hessian_left,
                sum_gradient_right,
                sum_hessian_right,
                loss_current_node,
                MonotonicConstraint::None,
                lower_bound,
                upper_bound,
                self.params.l2_regularization,
            );
            let best_so_far = best
                .as_ref()
                .map_or(self.params.min_gain_to_split, |prefix| prefix.gain);
            if gain > best_so_far && gain > self.params.min_gain_to_split {
                best = Some(BestPrefix {
                    gain,
                    end_idx: sorted_idx,
                    sum_gradient_left,
                    sum_hessian_left,
                    n_samples_left,
                });
            }
        }

        best.map(|prefix| {
            let mut left_cat_bitset = Bitset256::new();
            for cat_info in &cat_infos[..=prefix.end_idx] {
                left_cat_bitset.set(cat_info.bin_idx);
            }
            SplitCandidate {
                gain: prefix.gain,
                // The bitset is the whole split; the bin index is meaningless.
                bin_idx: 0,
                missing_go_to_left: left_cat_bitset.test(self.missing_values_bin_idx),
                left_cat_bitset,
                sum_gradient_left: prefix.sum_gradient_left,
                sum_hessian_left: prefix.sum_hessian_left,
                n_samples_left: prefix.n_samples_left,
            }
        })
    }
}
