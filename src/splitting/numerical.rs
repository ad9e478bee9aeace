//! Numeric split search: histogram scans over ordered bins.
//!
//! A feature without missing values is scanned once, left to right. A
//! feature with missing values is scanned in both directions: the
//! left-to-right scan sends the missing bin right, the right-to-left scan
//! sends it left, and the better of the two wins.

use crate::histogram::HistogramEntry;

use super::gain::split_gain;
use super::{Bitset256, SplitCandidate, Splitter};

impl Splitter<'_> {
    /// Scan bins left to right, accumulating the left child.
    ///
    /// Missing values (and at prediction time, unseen values) go right.
    #[allow(clippy::too_many_arguments)]
    pub(super) fn find_best_bin_left_to_right(
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
        let has_missing = self.has_missing_values[feature_idx];
        let monotonic_cst = self.monotonic_cst[feature_idx];

        // The `-1` keeps the last non-missing bin from producing an empty
        // right child; with missing values, one extra bin index lets the
        // missing bin be the whole right child.
        let end = n_bins_non_missing - 1 + usize::from(has_missing);

        let mut best: Option<SplitCandidate> = None;
        let mut sum_gradient_left = 0.0;
        let mut sum_hessian_left = 0.0;
        let mut n_samples_left = 0u32;

        for bin_idx in 0..end {
            let entry = &histogram[bin_idx];
            n_samples_left += entry.count;
            sum_gradient_left += entry.sum_gradients;
            sum_hessian_left += self.entry_hessian(entry);

            let n_samples_right = n_samples - n_samples_left;
            let sum_gradient_right = sum_gradients - sum_gradient_left;
            let sum_hessian_right = sum_hessians - sum_hessian_left;

            if n_samples_left < self.params.min_samples_leaf
                || sum_hessian_left < self.params.min_hessian_to_split
            {
                continue;
            }
            // The right side only shrinks as the scan advances.
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
                monotonic_cst,
                lower_bound,
                upper_bound,
                self.params.l2_regularization,
            );
            let best_so_far = best
                .as_ref()
                .map_or(self.params.min_gain_to_split, |candidate| candidate.gain);
            if gain > best_so_far && gain > self.params.min_gain_to_split {
                best = Some(SplitCandidate {
                    gain,
                    bin_idx: bin_idx as u8,
                    missing_go_to_left: false,
                    left_cat_bitset: Bitset256::new(),
                    sum_gradient_left,
                    sum_hessian_left,
                    n_samples_left,
                });
            }
        }

        best
    }

    /// Scan bins right to left, accumulating the right child.
    ///
    /// Only called for features with missing values; the missing bin rides
    /// with the left child (it is never accumulated into the right side, so
    /// the derived left aggregates contain it). Starts from whatever the
    /// left-to-right scan found, so a worse direction never overwrites a
    /// better one.
    #[allow(clippy::too_many_arguments)]
    pub(super) fn find_best_bin_right_to_left(
        &self,
        feature_idx: usize,
        histogram: &[HistogramEntry],
        n_samples: u32,
        sum_gradients: f64,
        sum_hessians: f64,
        loss_current_node: f64,
        lower_bound: f64,
        upper_bound: f64,
        mut best: Option<SplitCandidate>,
    ) -> Option<SplitCandidate> {
        let n_bins_non_missing = self.n_bins_non_missing[feature_idx] as usize;
        let monotonic_cst = self.monotonic_cst[feature_idx];

        let mut sum_gradient_right = 0.0;
        let mut sum_hessian_right = 0.0;
        let mut n_samples_right = 0u32;

        for bin_idx in (0..n_bins_non_missing - 1).rev() {
            let entry = &histogram[bin_idx + 1];
            n_samples_right += entry.count;
            sum_gradient_right += entry.sum_gradients;
            sum_hessian_right += self.entry_hessian(entry);

            let n_samples_left = n_samples - n_samples_right;
            let sum_gradient_left = sum_gradients - sum_gradient_right;
            let sum_hessian_left = sum_hessians - sum_hessian_right;

            if n_samples_right < self.params.min_samples_leaf
                || sum_hessian_right < self.params.min_hessian_to_split
            {
                continue;
            }
            // The left side only shrinks as the scan runs down.
            if n_samples_left < self.params.min_samples_leaf
                || sum_hessian_left < self.params.min_hessian_to_split
            {
                break;
            }

            let gain = split_gain(
                sum_gradient_left,
                sum_hessian_left,
                sum_gradient_right,
                sum_hessian_right,
                loss_current_node,
                monotonic_cst,
                lower_bound,
                upper_bound,
                self.params.l2_regularization,
            );
            let best_so_far = best
                .as_ref()
                .map_or(self.params.min_gain_to_split, |candidate| candidate.gain);
            if gain > best_so_far && gain > self.params.min_gain_to_split {
                best = Some(SplitCandidate {
                    gain,
                    bin_idx: bin_idx as u8,
                    missing_go_to_left: true,
                    left_cat_bitset: Bitset256::new(),
                    sum_gradient_left,
                    sum_hessian_left,
                    n_samples_left,
                });
            }
        }

        best
    }
}

#[cfg(test)]
mod tests {
    use crate::binning::BinnedMatrix;
    use crate::histogram::NodeHistograms;
    use crate::splitting::{MonotonicConstraint, Splitter, SplitterParams};

    const MISSING: u8 = 9;
    const N_BINS: usize = 10;

    /// Bin a single feature's codes through the public binning path and
    /// build its node histograms (constant hessians).
    fn splitter_and_histograms(bins: &[u8], gradients: &[f64]) -> (BinnedMatrix, NodeHistograms) {
        assert_eq!(bins.len(), gradients.len());
        let data = ndarray::Array2::from_shape_vec(
            (bins.len(), 1),
            bins.iter()
                .map(|&b| {
                    if b == MISSING {
                        f64::NAN
                    } else {
                        f64::from(b)
                    }
                })
                .collect(),
        )
        .unwrap();
        let thresholds = crate::binning::BinThresholds::new(
            vec![(0..MISSING - 1).map(f64::from).collect()],
            vec![false],
        )
        .unwrap();
        let mut matrix = BinnedMatrix::zeros(bins.len(), 1);
        crate::binning::map_to_bins(data.view(), &thresholds, MISSING, &mut matrix).unwrap();
        assert_eq!(matrix.feature_column(0), bins);

        let mut histograms = NodeHistograms::zeros(1, N_BINS);
        for (sample_idx, &gradient) in gradients.iter().enumerate() {
            histograms.accumulate(0, matrix.get(sample_idx, 0), gradient, 0.0);
        }
        (matrix, histograms)
    }

    fn make_splitter<'a>(
        matrix: &'a BinnedMatrix,
        has_missing: bool,
        params: SplitterParams,
    ) -> Splitter<'a> {
        Splitter::new(
            matrix,
            vec![MISSING as u32],
            MISSING,
            vec![has_missing],
            vec![false],
            vec![MonotonicConstraint::None],
            params.with_constant_hessians(true),
        )
        .unwrap()
    }

    #[test]
    fn test_scan_finds_expected_bin_without_missing() {
        // Gradient step between bins 3 and 4 makes bin 3 the best split.
        let bins: Vec<u8> = (0..9).collect();
        let gradients = [1.0, 1.0, 1.0, 1.0, 5.0, 5.0, 5.0, 5.0, 5.0];
        let (matrix, histograms) = splitter_and_histograms(&bins, &gradients);
        let splitter = make_splitter(
            &matrix,
            false,
            SplitterParams::default().with_min_samples_leaf(1),
        );

        let sum_gradients: f64 = gradients.iter().sum();
        let n = bins.len() as u32;
        let value = crate::splitting::compute_node_value(
            sum_gradients,
            f64::from(n),
            f64::NEG_INFINITY,
            f64::INFINITY,
            0.0,
        );
        let info = splitter.find_node_split(
            n,
            &histograms,
            sum_gradients,
            f64::from(n),
            value,
            f64::NEG_INFINITY,
            f64::INFINITY,
        );

        assert!(info.is_split());
        assert_eq!(info.bin_idx, 3);
        assert!(!info.missing_go_to_left);
        assert_eq!(info.n_samples_left, 4);
    }

    #[test]
    fn test_missing_values_follow_their_gradient_side() {
        // Low-gradient samples 0 and 3 become missing: the two-direction
        // scan must route the missing bin left and cut at bin 2.
        let bins: Vec<u8> = vec![0, 1, 2, MISSING, 3, 4, 5, 6, 7, MISSING];
        // The missing samples carry gradient 1.0 like the low bins.
        let gradients = [1.0, 1.0, 1.0, 1.0, 2.0, 2.0, 2.0, 2.0, 2.0, 1.0];
        let (matrix, histograms) = splitter_and_histograms(&bins, &gradients);
        let splitter = make_splitter(
            &matrix,
            true,
            SplitterParams::default().with_min_samples_leaf(1),
        );

        let sum_gradients: f64 = gradients.iter().sum();
        let n = bins.len() as u32;
        let info = splitter.find_node_split(
            n,
            &histograms,
            sum_gradients,
            f64::from(n),
            crate::splitting::compute_node_value(
                sum_gradients,
                f64::from(n),
                f64::NEG_INFINITY,
                f64::INFINITY,
                0.0,
            ),
            f64::NEG_INFINITY,
            f64::INFINITY,
        );

        assert!(info.is_split());
        assert_eq!(info.bin_idx, 2);
        assert!(info.missing_go_to_left);
        // Left child: bins 0, 1, 2 plus the two missing samples.
        assert_eq!(info.n_samples_left, 5);
    }

    #[test]
    fn test_empty_right_child_is_never_produced() {
        // Every sample in bin 0: the only cut would leave the right child
        // empty, so no split exists.
        let bins = vec![0u8; 12];
        let gradients: Vec<f64> = (0..12).map(|i| f64::from(i) - 6.0).collect();
        let (matrix, histograms) = splitter_and_histograms(&bins, &gradients);
        let splitter = make_splitter(
            &matrix,
            false,
            SplitterParams::default().with_min_samples_leaf(1),
        );

        let sum_gradients: f64 = gradients.iter().sum();
        let info = splitter.find_node_split(
            12,
            &histograms,
            sum_gradients,
            12.0,
            0.0,
            f64::NEG_INFINITY,
            f64::INFINITY,
        );
        assert!(!info.is_split());
        assert_eq!(info.gain, -1.0);
    }

    #[test]
    fn test_pure_node_yields_sentinel() {
        // Uniform gradients: every candidate has gain 0, which does not
        // clear the strict min_gain_to_split comparison.
        let bins: Vec<u8> = (0..8).collect();
        let gradients = vec![1.0; 8];
        let (matrix, histograms) = splitter_and_histograms(&bins, &gradients);
        let splitter = make_splitter(
            &matrix,
            false,
            SplitterParams::default()
                .with_min_samples_leaf(1)
                .with_min_hessian_to_split(0.0),
        );

        let sum_gradients = 8.0;
        let value = crate::splitting::compute_node_value(
            sum_gradients,
            8.0,
            f64::NEG_INFINITY,
            f64::INFINITY,
            0.0,
        );
        let info = splitter.find_node_split(
            8,
            &histograms,
            sum_gradients,
            8.0,
            value,
            f64::NEG_INFINITY,
            f64::INFINITY,
        );
        assert_eq!(info.gain, -1.0);
    }

    #[test]
    fn test_min_samples_leaf_prunes() {
        let bins: Vec<u8> = (0..8).collect();
        let gradients = [-1.0, -1.0, -1.0, -1.0, 1.0, 1.0, 1.0, 1.0];
        let (matrix, histograms) = splitter_and_histograms(&bins, &gradients);
        let splitter = make_splitter(
            &matrix,
            false,
            SplitterParams::default().with_min_samples_leaf(3),
        );

        let info = splitter.find_node_split(
            8,
            &histograms,
            0.0,
            8.0,
            0.0,
            f64::NEG_INFINITY,
            f64::INFINITY,
        );
        assert!(info.is_split());
        assert!(info.n_samples_left >= 3);
        assert!(info.n_samples_right >= 3);

        // Demanding more samples than any admissible cut can deliver kills
        // the split entirely.
        let splitter = make_splitter(
            &matrix,
            false,
            SplitterParams::default().with_min_samples_leaf(5),
        );
        let info = splitter.find_node_split(
            8,
            &histograms,
            0.0,
            8.0,
            0.0,
            f64::NEG_INFINITY,
            f64::INFINITY,
        );
        assert_eq!(info.gain, -1.0);
    }

    #[test]
    fn test_monotonic_increasing_rejects_decreasing_split() {
        // Negative gradients on low bins force value_left > value_right.
        let bins: Vec<u8> = (0..8).collect();
        let gradients = [-1.0, -1.0, -1.0, -1.0, 1.0, 1.0, 1.0, 1.0];
        let (matrix, histograms) = splitter_and_histograms(&bins, &gradients);
        let splitter = Splitter::new(
            &matrix,
            vec![MISSING as u32],
            MISSING,
            vec![false],
            vec![false],
            vec![MonotonicConstraint::Increasing],
            SplitterParams::default()
                .with_min_samples_leaf(1)
                .with_constant_hessians(true),
        )
        .unwrap();

        let info = splitter.find_node_split(
            8,
            &histograms,
            0.0,
            8.0,
            0.0,
            f64::NEG_INFINITY,
            f64::INFINITY,
        );
        assert_eq!(info.gain, -1.0);

        // Flipping the constraint accepts it, and the child values respect
        // the ordering.
        let splitter = Splitter::new(
            &matrix,
            vec![MISSING as u32],
            MISSING,
            vec![false],
            vec![false],
            vec![MonotonicConstraint::Decreasing],
            SplitterParams::default()
                .with_min_samples_leaf(1)
                .with_constant_hessians(true),
        )
        .unwrap();
        let info = splitter.find_node_split(
            8,
            &histograms,
            0.0,
            8.0,
            0.0,
            f64::NEG_INFINITY,
            f64::INFINITY,
        );
        assert!(info.is_split());
        assert!(info.value_left >= info.value_right);
    }
}
