//! Node value and split gain kernel.

// ============================================================================
// MonotonicConstraint
// ============================================================================

/// Monotonic constraint on a feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MonotonicConstraint {
    /// No constraint (default).
    #[default]
    None,
    /// Predictions must be non-decreasing in the feature.
    Increasing,
    /// Predictions must be non-increasing in the feature.
    Decreasing,
}

impl MonotonicConstraint {
    /// Create from the conventional integer encoding.
    ///
    /// - `0`: no constraint
    /// - `1`: non-decreasing
    /// - `-1`: non-increasing
    pub fn from_int(value: i32) -> Self {
        match value {
            1 => Self::Increasing,
            -1 => Self::Decreasing,
            _ => Self::None,
        }
    }

    /// Convert to the integer encoding.
    pub fn to_int(self) -> i32 {
        match self {
            Self::None => 0,
            Self::Increasing => 1,
            Self::Decreasing => -1,
        }
    }

    /// Whether this constraint is active.
    #[inline]
    pub fn is_constrained(self) -> bool {
        !matches!(self, Self::None)
    }
}

// ============================================================================
// Value / loss / gain
// ============================================================================

/// Compute the bounded value of a node.
///
/// The raw Newton step is `-G / (H + lambda)`; the `1e-15` keeps a
/// zero-hessian node with zero regularization from dividing by zero. The
/// result is clamped to `[lower_bound, upper_bound]`, which is how
/// monotonic constraints propagate from ancestors.
#[inline]
pub fn compute_node_value(
    sum_gradient: f64,
    sum_hessian: f64,
    lower_bound: f64,
    upper_bound: f64,
    l2_regularization: f64,
) -> f64 {
    let value = -sum_gradient / (sum_hessian + l2_regularization + 1e-15);
    value.clamp(lower_bound, upper_bound)
}

/// Loss of a node given its (possibly clamped) value.
///
/// This is the part of the loss that depends on the value; constant terms
/// cancel in gain computations.
#[inline]
pub fn loss_from_value(value: f64, sum_gradient: f64) -> f64 {
    sum_gradient * value
}

/// Gain of splitting a node into the given left/right aggregates.
///
/// Child values are computed bounded; if they violate `monotonic_cst` the
/// split is inadmissible and negative infinity is returned. The veto is
/// deliberately not `-1.0`: that value is the public "no split" sentinel,
/// and a finite veto could be accepted by a scan running with a
/// `min_gain_to_split` below it.
#[allow(clippy::too_many_arguments)]
#[inline]
pub(crate) fn split_gain(
    sum_gradient_left: f64,
    sum_hessian_left: f64,
    sum_gradient_right: f64,
    sum_hessian_right: f64,
    loss_current_node: f64,
    monotonic_cst: MonotonicConstraint,
    lower_bound: f64,
    upper_bound: f64,
    l2_regularization: f64,
) -> f64 {
    let value_left = compute_node_value(
        sum_gradient_left,
        sum_hessian_left,
        lower_bound,
        upper_bound,
        l2_regularization,
    );
    let value_right = compute_node_value(
        sum_gradient_right,
        sum_hessian_right,
        lower_bound,
        upper_bound,
        l2_regularization,
    );

    match monotonic_cst {
        MonotonicConstraint::Increasing if value_left > value_right => {
            return f64::NEG_INFINITY
        }
        MonotonicConstraint::Decreasing if value_left < value_right => {
            return f64::NEG_INFINITY
        }
        _ => {}
    }

    loss_current_node
        - loss_from_value(value_left, sum_gradient_left)
        - loss_from_value(value_right, sum_gradient_right)
}

// ============================================================================
// Tests
// ============================================================================
