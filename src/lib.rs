//! histree: the core numeric engine of a histogram-based gradient boosted
//! decision tree learner.
//!
//! This crate covers the two subsystems that dominate GBDT training cost:
//!
//! 1. **Binning** ([`binning`]): mapping raw continuous and categorical
//!    feature values to small integer bin codes stored in a column-major
//!    matrix, with a reserved bin for missing values.
//! 2. **Splitting** ([`splitting`]): evaluating every candidate split at a
//!    tree node from per-feature histograms (numeric scans, ratio-ordered
//!    categorical scans, monotonic constraints) and partitioning the node's
//!    sample indices between the two children with a two-phase parallel
//!    rewrite.
//!
//! Per-node gradient histograms ([`histogram`]) sit between the two: the
//! tree grower builds them from the binned matrix and hands them to the
//! split search read-only.
//!
//! Threshold discovery, the tree grower, and the boosting loop are the
//! caller's concern; this crate is the kernel they drive one node at a time.

pub mod binning;
pub mod histogram;
pub mod parallel;
pub mod splitting;

pub use binning::{map_to_bins, BinThresholds, BinnedMatrix, BinningError};
pub use histogram::{HistogramBuilder, HistogramEntry, NodeHistograms};
pub use parallel::sum_parallel;
pub use splitting::{
    compute_node_value, loss_from_value, Bitset256, MonotonicConstraint, SplitInfo, Splitter,
    SplitterError, SplitterParams,
};
