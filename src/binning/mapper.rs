//! The binned matrix and the raw-value-to-bin transform.

use ndarray::ArrayView2;
use rayon::prelude::*;

use super::thresholds::{BinThresholds, BinningError};

// ============================================================================
// BinnedMatrix
// ============================================================================

/// Feature matrix of bin codes.
///
/// Stored in **column-major** order: iterating the samples of a single
/// feature is contiguous memory access, which is what the split search and
/// the partitioner do all day.
///
/// ```text
/// For 4 samples x 3 features:
///
/// bins: [s0f0, s1f0, s2f0, s3f0,   <- feature 0 column (contiguous)
///        s0f1, s1f1, s2f1, s3f1,   <- feature 1 column
///        s0f2, s1f2, s2f2, s3f2]   <- feature 2 column
/// ```
#[derive(Debug, Clone)]
pub struct BinnedMatrix {
    /// Bin codes in column-major layout: `bins[feature * n_samples + sample]`.
    bins: Box<[u8]>,
    n_samples: usize,
    n_features: usize,
}

impl BinnedMatrix {
    /// Create a zero-filled matrix (every cell in bin 0).
    pub fn zeros(n_samples: usize, n_features: usize) -> Self {
        Self {
            bins: vec![0u8; n_samples * n_features].into_boxed_slice(),
            n_samples,
            n_features,
        }
    }

    /// Number of samples (rows).
    #[inline]
    pub fn n_samples(&self) -> usize {
        self.n_samples
    }

    /// Number of features (columns).
    #[inline]
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Bin code of one cell.
    #[inline]
    pub fn get(&self, sample_idx: usize, feature_idx: usize) -> u8 {
        self.bins[feature_idx * self.n_samples + sample_idx]
    }

    /// All bin codes of one feature as a contiguous slice.
    #[inline]
    pub fn feature_column(&self, feature_idx: usize) -> &[u8] {
        let start = feature_idx * self.n_samples;
        &self.bins[start..start + self.n_samples]
    }

    /// Mutable per-feature columns, for filling.
    #[inline]
    fn columns_mut(&mut self) -> impl IndexedParallelIterator<Item = &mut [u8]> + '_ {
        self.bins.par_chunks_mut(self.n_samples)
    }
}

// ============================================================================
// map_to_bins
// ============================================================================

/// Map a raw feature matrix to bin codes.
///
/// `data` is `(n_samples, n_features)` in the usual row-major layout; `out`
/// must have the same shape. Columns are binned independently and in
/// parallel. Per value:
///
/// 1. NaN maps to `missing_values_bin_idx`.
/// 2. Otherwise, binary-search the feature's thresholds for the smallest
///    index `k` with `value <= thresholds[k]`; the bin is `k`, or
///    `thresholds.len()` when the value exceeds them all.
/// 3. For categorical features the value must additionally equal
///    `thresholds[k]` exactly, otherwise the category was not seen at fit
///    time and the value maps to `missing_values_bin_idx`.
pub fn map_to_bins(
    data: ArrayView2<'_, f64>,
    thresholds: &BinThresholds,
    missing_values_bin_idx: u8,
    out: &mut BinnedMatrix,
) -> Result<(), BinningError> {
    let (n_samples, n_features) = data.dim();
    if n_features != thresholds.n_features() {
        return Err(BinningError::DataShapeMismatch {
            got: n_features,
            expected: thresholds.n_features(),
        });
    }
    if out.n_samples() != n_samples || out.n_features() != n_features {
        return Err(BinningError::OutputShapeMismatch {
            got_samples: out.n_samples(),
            got_features: out.n_features(),
            samples: n_samples,
            features: n_features,
        });
    }
    thresholds.check_fits(missing_values_bin_idx)?;
    if n_samples == 0 || n_features == 0 {
        return Ok(());
    }

    out.columns_mut().enumerate().for_each(|(feature_idx, column)| {
        let feature_thresholds = thresholds.feature_thresholds(feature_idx);
        let categorical = thresholds.is_categorical(feature_idx);
        for (binned, &value) in column.iter_mut().zip(data.column(feature_idx)) {
            *binned = bin_value(
                value,
                feature_thresholds,
                categorical,
                missing_values_bin_idx,
            );
        }
    });

    log::debug!(
        "mapped {} samples x {} features to bins (missing bin {})",
        n_samples,
        n_features,
        missing_values_bin_idx
    );
    Ok(())
}

/// Bin a single value against one feature's thresholds.
#[inline]
fn bin_value(
    value: f64,
    thresholds: &[f64],
    categorical: bool,
    missing_values_bin_idx: u8,
) -> u8 {
    if value.is_nan() {
        return missing_values_bin_idx;
    }

    // Smallest index with `value <= thresholds[k]`. The midpoint is biased
    // toward the lower half so that equality collapses the upper bound.
    let mut left = 0usize;
    let mut right = thresholds.len();
    while left < right {
        let middle = left + (right - left - 1) / 2;
        if value <= thresholds[middle] {
            right = middle;
        } else {
            left = middle + 1;
        }
    }

    if categorical {
        // Categories match exactly or not at all; a near miss is an unseen
        // category and goes to the missing bin.
        if left == thresholds.len() || thresholds[left] != value {
            return missing_values_bin_idx;
        }
    }

    debug_assert!(left < missing_values_bin_idx as usize + 1);
    left as u8
}

// ============================================================================
// Tests
// ============================================================================
