//! Mapping raw feature values to integer bin codes.
//!
//! Binning happens once per training run: every continuous value is replaced
//! by the index of the threshold interval it falls into, and every
//! categorical value by the rank of its category among the categories seen
//! at fit time. One bin index (always the last one) is reserved for missing
//! values; for categorical features it also absorbs categories that were
//! never seen when the thresholds were built.
//!
//! The output lives in a [`BinnedMatrix`], a column-major `u8` matrix: the
//! split kernels traverse one feature at a time and rely on unit-stride
//! access along samples.

mod mapper;
mod thresholds;

pub use mapper::{map_to_bins, BinnedMatrix};
pub use thresholds::{BinThresholds, BinningError};
