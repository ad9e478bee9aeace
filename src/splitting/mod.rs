//! Split search and node partitioning.
//!
//! The [`Splitter`] owns the training-wide state (the binned matrix, the
//! per-feature metadata, and the sample index partition) and exposes two
//! operations the tree grower drives one node at a time:
//!
//! - [`Splitter::find_node_split`]: evaluate every feature's candidate
//!   splits against the node's histograms and return the best one.
//! - [`Splitter::split_indices`]: rewrite the node's slice of the partition
//!   array into `[left | right]` according to a chosen split.

use rayon::prelude::*;

use crate::binning::BinnedMatrix;
use crate::histogram::NodeHistograms;

mod bitset;
mod categorical;
mod gain;
mod numerical;
mod partition;

pub use bitset::Bitset256;
pub use gain::{compute_node_value, loss_from_value, MonotonicConstraint};

// ============================================================================
// SplitterParams
// ============================================================================

/// Scalar knobs of the split search.
#[derive(Debug, Clone, Copy)]
pub struct SplitterParams {
    /// L2 regularization on node values.
    pub l2_regularization: f64,
    /// Minimum hessian sum required in each child.
    pub min_hessian_to_split: f64,
    /// Minimum number of samples required in each child.
    pub min_samples_leaf: u32,
    /// Minimum gain required to record a split (strict inequality).
    pub min_gain_to_split: f64,
    /// Set when the loss has a constant hessian; histogram hessian sums are
    /// then synthesized from sample counts.
    pub hessians_are_constant: bool,
}

impl Default for SplitterParams {
    fn default() -> Self {
        Self {
            l2_regularization: 0.0,
            min_hessian_to_split: 1e-3,
            min_samples_leaf: 20,
            min_gain_to_split: 0.0,
            hessians_are_constant: false,
        }
    }
}

impl SplitterParams {
    /// Builder: set L2 regularization.
    pub fn with_l2_regularization(mut self, l2_regularization: f64) -> Self {
        self.l2_regularization = l2_regularization;
        self
    }

    /// Builder: set the minimum hessian sum per child.
    pub fn with_min_hessian_to_split(mut self, min_hessian_to_split: f64) -> Self {
        self.min_hessian_to_split = min_hessian_to_split;
        self
    }

    /// Builder: set the minimum samples per child.
    pub fn with_min_samples_leaf(mut self, min_samples_leaf: u32) -> Self {
        self.min_samples_leaf = min_samples_leaf;
        self
    }

    /// Builder: set the minimum gain to split.
    pub fn with_min_gain_to_split(mut self, min_gain_to_split: f64) -> Self {
        self.min_gain_to_split = min_gain_to_split;
        self
    }

    /// Builder: mark hessians as constant.
    pub fn with_constant_hessians(mut self, hessians_are_constant: bool) -> Self {
        self.hessians_are_constant = hessians_are_constant;
        self
    }
}

// ============================================================================
// SplitInfo
// ============================================================================

/// The verdict of a split search at one node.
#[derive(Debug, Clone)]
pub struct SplitInfo {
    /// Gain of the split; `-1.0` is the "no admissible split" sentinel.
    pub gain: f64,
    /// Feature the split is on.
    pub feature_idx: usize,
    /// Last bin routed left (unused for categorical splits).
    pub bin_idx: u8,
    /// Whether this is a categorical split.
    pub is_categorical: bool,
    /// Where samples with a missing value go.
    ///
    /// For categorical splits this mirrors `left_cat_bitset` (the missing
    /// bin's bit), kept separately because prediction consults it without
    /// expanding the bitset.
    pub missing_go_to_left: bool,
    /// Categories routed left (meaningful only when `is_categorical`).
    pub left_cat_bitset: Bitset256,
    pub sum_gradient_left: f64,
    pub sum_gradient_right: f64,
    pub sum_hessian_left: f64,
    pub sum_hessian_right: f64,
    pub n_samples_left: u32,
    pub n_samples_right: u32,
    /// Bounded value the left child would take as a leaf.
    pub value_left: f64,
    /// Bounded value the right child would take as a leaf.
    pub value_right: f64,
}

impl SplitInfo {
    /// The "no admissible split" verdict; the grower turns the node into a
    /// leaf.
    pub fn no_split() -> Self {
        Self {
            gain: -1.0,
            feature_idx: 0,
            bin_idx: 0,
            is_categorical: false,
            missing_go_to_left: false,
            left_cat_bitset: Bitset256::new(),
            sum_gradient_left: 0.0,
            sum_gradient_right: 0.0,
            sum_hessian_left: 0.0,
            sum_hessian_right: 0.0,
            n_samples_left: 0,
            n_samples_right: 0,
            value_left: 0.0,
            value_right: 0.0,
        }
    }

    /// Whether an admissible split was found.
    ///
    /// Compares against the `-1` sentinel rather than zero: with a negative
    /// `min_gain_to_split`, a found split can legitimately carry a gain in
    /// `(min_gain_to_split, 0]`.
    #[inline]
    pub fn is_split(&self) -> bool {
        self.gain != -1.0
    }
}

/// A per-feature best split, before right-side aggregates and bounded child
/// values are filled in.
#[derive(Debug, Clone)]
pub(super) struct SplitCandidate {
    pub(super) gain: f64,
    pub(super) bin_idx: u8,
    pub(super) missing_go_to_left: bool,
    pub(super) left_cat_bitset: Bitset256,
    pub(super) sum_gradient_left: f64,
    pub(super) sum_hessian_left: f64,
    pub(super) n_samples_left: u32,
}

// ============================================================================
// Splitter
// ============================================================================

/// Splitter configuration and shape errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SplitterError {
    #[error("per-feature array `{name}` has length {got}, expected {expected}")]
    FeatureArrayLen {
        name: &'static str,
        got: usize,
        expected: usize,
    },

    #[error("n_bins_non_missing[{feature_idx}] = {n_bins} does not fit below the missing values bin {missing_values_bin_idx}")]
    TooManyBins {
        feature_idx: usize,
        n_bins: u32,
        missing_values_bin_idx: u8,
    },

    #[error("feature {feature_idx} must have at least one non-missing bin")]
    NoBins { feature_idx: usize },

    #[error("feature {feature_idx} is categorical and cannot carry a monotonic constraint")]
    MonotonicCategorical { feature_idx: usize },
}

/// Finds the best split of a node and partitions its samples.
///
/// Owns the partition array (initialized to `0..n_samples`) and two scratch
/// buffers of the same length, reused by every [`split_indices`] call for
/// the lifetime of one tree.
///
/// [`split_indices`]: Splitter::split_indices
#[derive(Debug)]
pub struct Splitter<'a> {
    binned: &'a BinnedMatrix,
    n_bins_non_missing: Box<[u32]>,
    missing_values_bin_idx: u8,
    has_missing_values: Box<[bool]>,
    is_categorical: Box<[bool]>,
    monotonic_cst: Box<[MonotonicConstraint]>,
    params: SplitterParams,
    partition: Vec<u32>,
    left_indices_buffer: Vec<u32>,
    right_indices_buffer: Vec<u32>,
}

impl<'a> Splitter<'a> {
    /// Create a splitter over a binned matrix.
    ///
    /// All per-feature arrays must have one entry per feature of `binned`;
    /// every feature's real bins must fit below `missing_values_bin_idx`;
    /// categorical features cannot carry monotonic constraints.
    pub fn new(
        binned: &'a BinnedMatrix,
        n_bins_non_missing: Vec<u32>,
        missing_values_bin_idx: u8,
        has_missing_values: Vec<bool>,
        is_categorical: Vec<bool>,
        monotonic_cst: Vec<MonotonicConstraint>,
        params: SplitterParams,
    ) -> Result<Self, SplitterError> {
        let n_features = binned.n_features();
        let check_len = |name: &'static str, got: usize| {
            if got == n_features {
                Ok(())
            } else {
                Err(SplitterError::FeatureArrayLen {
                    name,
                    got,
                    expected: n_features,
                })
            }
        };
        check_len("n_bins_non_missing", n_bins_non_missing.len())?;
        check_len("has_missing_values", has_missing_values.len())?;
        check_len("is_categorical", is_categorical.len())?;
        check_len("monotonic_cst", monotonic_cst.len())?;

        for (feature_idx, &n_bins) in n_bins_non_missing.iter().enumerate() {
            if n_bins == 0 {
                return Err(SplitterError::NoBins { feature_idx });
            }
            if n_bins > missing_values_bin_idx as u32 {
                return Err(SplitterError::TooManyBins {
                    feature_idx,
                    n_bins,
                    missing_values_bin_idx,
                });
            }
            if is_categorical[feature_idx] && monotonic_cst[feature_idx].is_constrained() {
                return Err(SplitterError::MonotonicCategorical { feature_idx });
            }
        }

        let n_samples = binned.n_samples();
        Ok(Self {
            binned,
            n_bins_non_missing: n_bins_non_missing.into_boxed_slice(),
            missing_values_bin_idx,
            has_missing_values: has_missing_values.into_boxed_slice(),
            is_categorical: is_categorical.into_boxed_slice(),
            monotonic_cst: monotonic_cst.into_boxed_slice(),
            params,
            partition: (0..n_samples as u32).collect(),
            left_indices_buffer: vec![0; n_samples],
            right_indices_buffer: vec![0; n_samples],
        })
    }

    /// The sample index partition.
    ///
    /// Starts as `0..n_samples`; after each [`split_indices`] call the
    /// node's sub-range holds `[left | right]`.
    ///
    /// [`split_indices`]: Splitter::split_indices
    #[inline]
    pub fn partition(&self) -> &[u32] {
        &self.partition
    }

    /// The splitter's parameters.
    #[inline]
    pub fn params(&self) -> &SplitterParams {
        &self.params
    }

    /// Find the best split of a node.
    ///
    /// `histograms` must cover all features with `missing_values_bin_idx + 1`
    /// bins each; `sum_gradients`/`sum_hessians` are the node's totals and
    /// `value` its bounded value. `lower_bound`/`upper_bound` carry the
    /// monotonic-constraint bounds inherited from ancestors (infinite when
    /// unconstrained).
    ///
    /// Returns [`SplitInfo::no_split`] when no candidate clears the
    /// minimum-samples, minimum-hessian, and minimum-gain requirements.
    #[allow(clippy::too_many_arguments)]
    pub fn find_node_split(
        &self,
        n_samples: u32,
        histograms: &NodeHistograms,
        sum_gradients: f64,
        sum_hessians: f64,
        value: f64,
        lower_bound: f64,
        upper_bound: f64,
    ) -> SplitInfo {
        debug_assert!(lower_bound <= upper_bound);
        debug_assert_eq!(histograms.n_features(), self.binned.n_features());
        debug_assert_eq!(
            histograms.n_bins(),
            self.missing_values_bin_idx as usize + 1
        );

        let loss_current_node = loss_from_value(value, sum_gradients);

        let candidates: Vec<Option<SplitCandidate>> = (0..self.binned.n_features())
            .into_par_iter()
            .map(|feature_idx| {
                let histogram = histograms.feature(feature_idx);
                if self.is_categorical[feature_idx] {
                    self.find_best_split_category(
                        feature_idx,
                        histogram,
                        n_samples,
                        sum_gradients,
                        sum_hessians,
                        loss_current_node,
                        lower_bound,
                        upper_bound,
                    )
                } else {
                    let best = self.find_best_bin_left_to_right(
                        feature_idx,
                        histogram,
                        n_samples,
                        sum_gradients,
                        sum_hessians,
                        loss_current_node,
                        lower_bound,
                        upper_bound,
                    );
                    if self.has_missing_values[feature_idx] {
                        self.find_best_bin_right_to_left(
                            feature_idx,
                            histogram,
                            n_samples,
                            sum_gradients,
                            sum_hessians,
                            loss_current_node,
                            lower_bound,
                            upper_bound,
                            best,
                        )
                    } else {
                        best
                    }
                }
            })
            .collect();

        // Strict `>` keeps the first maximum, so ties break toward the
        // lowest feature index.
        let mut best: Option<(usize, SplitCandidate)> = None;
        for (feature_idx, candidate) in candidates.into_iter().enumerate() {
            if let Some(candidate) = candidate {
                let replace = match &best {
                    Some((_, current)) => candidate.gain > current.gain,
                    None => true,
                };
                if replace {
                    best = Some((feature_idx, candidate));
                }
            }
        }

        match best {
            Some((feature_idx, candidate)) => {
                let sum_gradient_right = sum_gradients - candidate.sum_gradient_left;
                let sum_hessian_right = sum_hessians - candidate.sum_hessian_left;
                let n_samples_right = n_samples - candidate.n_samples_left;
                let value_left = compute_node_value(
                    candidate.sum_gradient_left,
                    candidate.sum_hessian_left,
                    lower_bound,
                    upper_bound,
                    self.params.l2_regularization,
                );
                let value_right = compute_node_value(
                    sum_gradient_right,
                    sum_hessian_right,
                    lower_bound,
                    upper_bound,
                    self.params.l2_regularization,
                );
                log::trace!(
                    "best split: feature {} gain {:.6} ({} | {} samples)",
                    feature_idx,
                    candidate.gain,
                    candidate.n_samples_left,
                    n_samples_right
                );
                SplitInfo {
                    gain: candidate.gain,
                    feature_idx,
                    bin_idx: candidate.bin_idx,
                    is_categorical: self.is_categorical[feature_idx],
                    missing_go_to_left: candidate.missing_go_to_left,
                    left_cat_bitset: candidate.left_cat_bitset,
                    sum_gradient_left: candidate.sum_gradient_left,
                    sum_gradient_right,
                    sum_hessian_left: candidate.sum_hessian_left,
                    sum_hessian_right,
                    n_samples_left: candidate.n_samples_left,
                    n_samples_right,
                    value_left,
                    value_right,
                }
            }
            None => SplitInfo::no_split(),
        }
    }

    /// Hessian sum of one histogram entry, synthesized from the count when
    /// hessians are constant.
    #[inline]
    pub(super) fn entry_hessian(&self, entry: &crate::histogram::HistogramEntry) -> f64 {
        if self.params.hessians_are_constant {
            f64::from(entry.count)
        } else {
            entry.sum_hessians
        }
    }
}
