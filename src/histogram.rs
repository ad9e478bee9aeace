//! Per-node gradient histograms.
//!
//! A histogram aggregates, per feature and per bin, the gradients and
//! hessians of the samples sitting at one tree node. The split search reads
//! them; the grower builds them, either directly from the binned matrix
//! (brute) or by subtracting a child's histograms from its parent's.

use std::ops::Sub;

use rayon::prelude::*;

use crate::binning::BinnedMatrix;

// ============================================================================
// HistogramEntry / NodeHistograms
// ============================================================================

/// Aggregated statistics of one (feature, bin) cell.
///
/// When hessians are constant (e.g. squared-error regression) the builder
/// leaves `sum_hessians` at zero and readers synthesize it from `count`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct HistogramEntry {
    pub sum_gradients: f64,
    pub sum_hessians: f64,
    pub count: u32,
}

/// Histograms of every feature at one node.
///
/// Backed by a single flat allocation of `n_features * n_bins` entries;
/// feature `f` owns the contiguous slice `entries[f * n_bins..][..n_bins]`.
/// Every feature gets the full `n_bins` (the global bin budget including the
/// missing values bin), so feature slices are uniform and the flat buffer
/// splits evenly for parallel work.
#[derive(Debug, Clone)]
pub struct NodeHistograms {
    entries: Box<[HistogramEntry]>,
    n_features: usize,
    n_bins: usize,
}

impl NodeHistograms {
    /// Create zeroed histograms.
    pub fn zeros(n_features: usize, n_bins: usize) -> Self {
        Self {
            entries: vec![HistogramEntry::default(); n_features * n_bins].into_boxed_slice(),
            n_features,
            n_bins,
        }
    }

    /// Number of features.
    #[inline]
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Number of bins per feature (including the missing values bin).
    #[inline]
    pub fn n_bins(&self) -> usize {
        self.n_bins
    }

    /// One feature's histogram.
    #[inline]
    pub fn feature(&self, feature_idx: usize) -> &[HistogramEntry] {
        let start = feature_idx * self.n_bins;
        &self.entries[start..start + self.n_bins]
    }

    /// Add one sample's gradient and hessian to a bin.
    #[inline]
    pub fn accumulate(&mut self, feature_idx: usize, bin: u8, gradient: f64, hessian: f64) {
        let entry = &mut self.entries[feature_idx * self.n_bins + bin as usize];
        entry.sum_gradients += gradient;
        entry.sum_hessians += hessian;
        entry.count += 1;
    }

    /// Mutable per-feature histograms, for parallel filling.
    #[inline]
    fn features_mut(
        &mut self,
    ) -> impl IndexedParallelIterator<Item = &mut [HistogramEntry]> + '_ {
        self.entries.par_chunks_mut(self.n_bins)
    }
}

/// Histogram subtraction: `parent - child` yields the sibling's histograms.
///
/// Cheaper than a brute rebuild when the sibling holds most of the parent's
/// samples.
impl Sub<&NodeHistograms> for &NodeHistograms {
    type Output = NodeHistograms;

    fn sub(self, rhs: &NodeHistograms) -> NodeHistograms {
        debug_assert_eq!(self.n_features, rhs.n_features);
        debug_assert_eq!(self.n_bins, rhs.n_bins);

        let entries = self
            .entries
            .iter()
            .zip(rhs.entries.iter())
            .map(|(parent, child)| HistogramEntry {
                sum_gradients: parent.sum_gradients - child.sum_gradients,
                sum_hessians: parent.sum_hessians - child.sum_hessians,
                count: parent.count - child.count,
            })
            .collect();

        NodeHistograms {
            entries,
            n_features: self.n_features,
            n_bins: self.n_bins,
        }
    }
}

// ============================================================================
// HistogramBuilder
// ============================================================================

/// Builds per-node histograms from the binned matrix.
///
/// Holds the training-wide inputs (bin codes, gradients, hessians) so the
/// grower only has to pass each node's sample indices.
pub struct HistogramBuilder<'a> {
    binned: &'a BinnedMatrix,
    n_bins: usize,
    gradients: &'a [f64],
    hessians: &'a [f64],
    hessians_are_constant: bool,
}

impl<'a> HistogramBuilder<'a> {
    /// Create a builder.
    ///
    /// `n_bins` is the global bin budget (`missing_values_bin_idx + 1`).
    /// When `hessians_are_constant` is set, `hessians` is unused and may be
    /// empty; histogram hessian sums stay at zero and readers use `count`.
    pub fn new(
        binned: &'a BinnedMatrix,
        n_bins: usize,
        gradients: &'a [f64],
        hessians: &'a [f64],
        hessians_are_constant: bool,
    ) -> Self {
        assert_eq!(
            gradients.len(),
            binned.n_samples(),
            "one gradient per sample"
        );
        if !hessians_are_constant {
            assert_eq!(
                hessians.len(),
                binned.n_samples(),
                "one hessian per sample"
            );
        }
        Self {
            binned,
            n_bins,
            gradients,
            hessians,
            hessians_are_constant,
        }
    }

    /// Build histograms for a node by direct accumulation.
    ///
    /// Gradients and hessians are first gathered in sample-index order so
    /// the per-feature accumulation loops read them sequentially; features
    /// are then filled in parallel.
    pub fn compute_histograms_brute(&self, sample_indices: &[u32]) -> NodeHistograms {
        let ordered_gradients: Vec<f64> = sample_indices
            .iter()
            .map(|&sample_idx| self.gradients[sample_idx as usize])
            .collect();
        let ordered_hessians: Vec<f64> = if self.hessians_are_constant {
            Vec::new()
        } else {
            sample_indices
                .iter()
                .map(|&sample_idx| self.hessians[sample_idx as usize])
                .collect()
        };

        let mut histograms = NodeHistograms::zeros(self.binned.n_features(), self.n_bins);
        histograms
            .features_mut()
            .enumerate()
            .for_each(|(feature_idx, histogram)| {
                let column = self.binned.feature_column(feature_idx);
                if self.hessians_are_constant {
                    for (ordered_idx, &sample_idx) in sample_indices.iter().enumerate() {
                        let entry = &mut histogram[column[sample_idx as usize] as usize];
                        entry.sum_gradients += ordered_gradients[ordered_idx];
                        entry.count += 1;
                    }
                } else {
                    for (ordered_idx, &sample_idx) in sample_indices.iter().enumerate() {
                        let entry = &mut histogram[column[sample_idx as usize] as usize];
                        entry.sum_gradients += ordered_gradients[ordered_idx];
                        entry.sum_hessians += ordered_hessians[ordered_idx];
                        entry.count += 1;
                    }
                }
            });
        histograms
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binning::BinnedMatrix;
    use ndarray::Array2;

    fn binned_from_columns(columns: &[&[u8]]) -> BinnedMatrix {
        let n_samples = columns[0].len();
        let data: Vec<f64> = (0..n_samples)
            .flat_map(|s| columns.iter().map(move |col| f64::from(col[s])))
            .collect();
        let data = Array2::from_shape_vec((n_samples, columns.len()), data).unwrap();
        // Bin code k <-> value k: thresholds are the integers themselves.
        let max = columns
            .iter()
            .flat_map(|col| col.iter().copied())
            .max()
            .unwrap();
        let cuts = (0..max).map(f64::from).collect::<Vec<_>>();
        let thresholds = crate::binning::BinThresholds::new(
            vec![cuts; columns.len()],
            vec![false; columns.len()],
        )
        .unwrap();
        let mut out = BinnedMatrix::zeros(n_samples, columns.len());
        crate::binning::map_to_bins(data.view(), &thresholds, 255, &mut out).unwrap();
        out
    }

    #[test]
    fn test_brute_accumulation() {
        let binned = binned_from_columns(&[&[0, 1, 0, 2, 1]]);
        let gradients = [1.0, 2.0, 3.0, 4.0, 5.0];
        let hessians = [0.5, 0.5, 1.0, 1.0, 2.0];
        let builder = HistogramBuilder::new(&binned, 4, &gradients, &hessians, false);

        let histograms = builder.compute_histograms_brute(&[0, 1, 2, 3, 4]);
        let hist = histograms.feature(0);

        assert_eq!(hist[0].sum_gradients, 4.0);
        assert_eq!(hist[0].sum_hessians, 1.5);
        assert_eq!(hist[0].count, 2);
        assert_eq!(hist[1].sum_gradients, 7.0);
        assert_eq!(hist[1].count, 2);
        assert_eq!(hist[2].sum_gradients, 4.0);
        assert_eq!(hist[2].count, 1);
        assert_eq!(hist[3], HistogramEntry::default());
    }

    #[test]
    fn test_brute_on_subset() {
        let binned = binned_from_columns(&[&[0, 1, 0, 2, 1]]);
        let gradients = [1.0, 2.0, 3.0, 4.0, 5.0];
        let hessians = [1.0; 5];
        let builder = HistogramBuilder::new(&binned, 4, &gradients, &hessians, false);

        let histograms = builder.compute_histograms_brute(&[1, 3]);
        let hist = histograms.feature(0);
        assert_eq!(hist[0].count, 0);
        assert_eq!(hist[1].sum_gradients, 2.0);
        assert_eq!(hist[2].sum_gradients, 4.0);
    }

    #[test]
    fn test_constant_hessians_leave_sums_at_zero() {
        let binned = binned_from_columns(&[&[0, 0, 1, 1]]);
        let gradients = [1.0, 1.0, -1.0, -1.0];
        let builder = HistogramBuilder::new(&binned, 3, &gradients, &[], true);

        let histograms = builder.compute_histograms_brute(&[0, 1, 2, 3]);
        let hist = histograms.feature(0);
        assert_eq!(hist[0].sum_hessians, 0.0);
        assert_eq!(hist[0].count, 2);
        assert_eq!(hist[1].count, 2);
    }

    #[test]
    fn test_subtraction_matches_brute() {
        let binned = binned_from_columns(&[&[0, 1, 2, 0, 1, 2, 0, 1], &[1, 1, 0, 0, 1, 0, 1, 0]]);
        let gradients = [1.0, -2.0, 3.0, -4.0, 5.0, -6.0, 7.0, -8.0];
        let hessians = [1.0, 2.0, 1.0, 2.0, 1.0, 2.0, 1.0, 2.0];
        let builder = HistogramBuilder::new(&binned, 4, &gradients, &hessians, false);

        let parent = builder.compute_histograms_brute(&[0, 1, 2, 3, 4, 5, 6, 7]);
        let left = builder.compute_histograms_brute(&[0, 2, 4, 6]);
        let right_brute = builder.compute_histograms_brute(&[1, 3, 5, 7]);

        let right = &parent - &left;
        for feature_idx in 0..2 {
            for (subtracted, brute) in right
                .feature(feature_idx)
                .iter()
                .zip(right_brute.feature(feature_idx))
            {
                assert_eq!(subtracted.count, brute.count);
                assert!((subtracted.sum_gradients - brute.sum_gradients).abs() < 1e-12);
                assert!((subtracted.sum_hessians - brute.sum_hessians).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn test_accumulate() {
        let mut histograms = NodeHistograms::zeros(2, 3);
        histograms.accumulate(1, 2, 0.5, 0.25);
        histograms.accumulate(1, 2, 0.5, 0.25);
        assert_eq!(histograms.feature(1)[2].sum_gradients, 1.0);
        assert_eq!(histograms.feature(1)[2].sum_hessians, 0.5);
        assert_eq!(histograms.feature(1)[2].count, 2);
        assert_eq!(histograms.feature(0)[2], HistogramEntry::default());
    }
}
