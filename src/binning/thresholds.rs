//! Per-feature bin thresholds.

// ============================================================================
// BinningError
// ============================================================================

/// Binning configuration and shape errors.
///
/// Raised at the boundary, before any parallel work starts.
#[derive(Debug, Clone, thiserror::Error)]
pub enum BinningError {
    #[error("thresholds for feature {feature_idx} are not strictly ascending at position {position}")]
    UnsortedThresholds { feature_idx: usize, position: usize },

    #[error("got {thresholds} threshold arrays but {flags} categorical flags")]
    FeatureCountMismatch { thresholds: usize, flags: usize },

    #[error("feature {feature_idx} needs {required} bins, which does not fit below the missing values bin {missing_values_bin_idx}")]
    TooManyBins {
        feature_idx: usize,
        required: usize,
        missing_values_bin_idx: u8,
    },

    #[error("data has {got} columns but thresholds were built for {expected}")]
    DataShapeMismatch { got: usize, expected: usize },

    #[error("output matrix is {got_samples}x{got_features}, expected {samples}x{features}")]
    OutputShapeMismatch {
        got_samples: usize,
        got_features: usize,
        samples: usize,
        features: usize,
    },
}

// ============================================================================
// BinThresholds
// ============================================================================

/// Bin thresholds for all features.
///
/// Stores the per-feature threshold arrays in a CSR-like layout:
/// - `values`: all thresholds concatenated, ascending per feature
/// - `ptrs`: offsets into `values` for each feature (`n_features + 1` entries)
///
/// For a numeric feature with thresholds `[t0, t1, t2]`, a value `v` maps to
/// the smallest bin `k` with `v <= t_k`, or to bin 3 when `v > t2`; that is
/// `len + 1` real bins. For a categorical feature the thresholds are the
/// sorted category values seen at fit time, and a value maps to its exact
/// position among them (`len` real bins); anything else is treated as
/// missing.
///
/// Threshold discovery itself (quantiles, midpoints, subsampling) is the
/// caller's job; this type only validates and stores the result.
#[derive(Debug, Clone)]
pub struct BinThresholds {
    /// All thresholds concatenated, ascending per feature.
    values: Box<[f64]>,
    /// Offsets into `values`: feature `f` owns `values[ptrs[f]..ptrs[f + 1]]`.
    ptrs: Box<[u32]>,
    /// Per-feature categorical flag.
    is_categorical: Box<[bool]>,
}

impl BinThresholds {
    /// Build from per-feature threshold arrays.
    ///
    /// Each array must be strictly ascending (NaN thresholds are rejected by
    /// the same check). The two input vectors must have one entry per
    /// feature.
    pub fn new(
        thresholds: Vec<Vec<f64>>,
        is_categorical: Vec<bool>,
    ) -> Result<Self, BinningError> {
        if thresholds.len() != is_categorical.len() {
            return Err(BinningError::FeatureCountMismatch {
                thresholds: thresholds.len(),
                flags: is_categorical.len(),
            });
        }

        for (feature_idx, feature_thresholds) in thresholds.iter().enumerate() {
            for position in 1..feature_thresholds.len() {
                // `!(a < b)` also rejects NaN.
                if !(feature_thresholds[position - 1] < feature_thresholds[position]) {
                    return Err(BinningError::UnsortedThresholds {
                        feature_idx,
                        position,
                    });
                }
            }
        }

        let mut values = Vec::new();
        let mut ptrs = Vec::with_capacity(thresholds.len() + 1);
        ptrs.push(0u32);
        for feature_thresholds in &thresholds {
            values.extend_from_slice(feature_thresholds);
            ptrs.push(values.len() as u32);
        }

        Ok(Self {
            values: values.into_boxed_slice(),
            ptrs: ptrs.into_boxed_slice(),
            is_categorical: is_categorical.into_boxed_slice(),
        })
    }

    /// Number of features.
    #[inline]
    pub fn n_features(&self) -> usize {
        self.ptrs.len() - 1
    }

    /// Thresholds for one feature (ascending).
    #[inline]
    pub fn feature_thresholds(&self, feature_idx: usize) -> &[f64] {
        let start = self.ptrs[feature_idx] as usize;
        let end = self.ptrs[feature_idx + 1] as usize;
        &self.values[start..end]
    }

    /// Whether a feature is categorical.
    #[inline]
    pub fn is_categorical(&self, feature_idx: usize) -> bool {
        self.is_categorical[feature_idx]
    }

    /// Number of real (non-missing) bins for a feature.
    ///
    /// Numeric features have one more bin than thresholds; categorical
    /// features have exactly one bin per seen category.
    #[inline]
    pub fn n_bins_non_missing(&self, feature_idx: usize) -> u32 {
        let n_thresholds =
            (self.ptrs[feature_idx + 1] - self.ptrs[feature_idx]) as u32;
        if self.is_categorical[feature_idx] {
            n_thresholds
        } else {
            n_thresholds + 1
        }
    }

    /// Check that every feature's real bins fit below the missing values bin.
    pub(crate) fn check_fits(
        &self,
        missing_values_bin_idx: u8,
    ) -> Result<(), BinningError> {
        for feature_idx in 0..self.n_features() {
            let required = self.n_bins_non_missing(feature_idx) as usize;
            if required > missing_values_bin_idx as usize {
                return Err(BinningError::TooManyBins {
                    feature_idx,
                    required,
                    missing_values_bin_idx,
                });
            }
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
