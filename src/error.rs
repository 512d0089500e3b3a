use thiserror::Error;

/// Unified error type for `cakeeat` operations.
#[derive(Debug, Error)]
pub enum CakeError {
    /// Raised when the grid cannot hold a monotone sequence of stock levels.
    #[error("grid size must be at least 2, found {grid_size}")]
    InvalidGridSize { grid_size: usize },

    /// Raised when the initial stock is non-positive or not finite.
    #[error("initial stock must be positive and finite, found {stock}")]
    NonPositiveStock { stock: f64 },

    /// Raised when the discount factor falls outside the open interval (0, 1).
    #[error("discount factor must lie strictly between 0 and 1, found {discount}")]
    InvalidDiscount { discount: f64 },

    /// Raised when the convergence tolerance could never be met.
    #[error("tolerance must be positive and finite, found {tolerance}")]
    NonPositiveTolerance { tolerance: f64 },

    /// Raised when the stock level substituted for zero is not a usable `ln` argument.
    #[error("grid epsilon must be positive and finite, found {epsilon}")]
    InvalidEpsilon { epsilon: f64 },

    /// Raised when vectors or tables have incompatible dimensions.
    #[error("dimension mismatch in {context}: expected {expected} but found {found}")]
    DimensionMismatch {
        /// Human-readable context describing the operation.
        context: &'static str,
        /// The required dimension, usually the grid size.
        expected: usize,
        /// The dimension that was actually supplied.
        found: usize,
    },

    /// Raised when the best feasible payoff of a state is not a finite number.
    #[error("maximum payoff for state {state} is not finite ({value})")]
    NonFiniteValue { state: usize, value: f64 },

    /// Raised when value iteration exhausts its iteration cap.
    #[error("value iteration did not converge after {iterations} iterations; last gap {gap}")]
    DidNotConverge {
        /// Number of iterations performed before termination.
        iterations: usize,
        /// L1 distance between the last two value estimates.
        gap: f64,
    },

    /// Raised when a caller requested cancellation between iterations.
    #[error("value iteration cancelled after {iterations} iterations; last gap {gap}")]
    Cancelled { iterations: usize, gap: f64 },

    /// Raised when a dedicated worker pool could not be created.
    #[error("failed to build worker pool: {message}")]
    ThreadPool { message: String },
}

impl CakeError {
    /// Helper to format a [`DimensionMismatch`](CakeError::DimensionMismatch) error.
    pub fn dimension_mismatch(context: &'static str, expected: usize, found: usize) -> Self {
        Self::DimensionMismatch {
            context,
            expected,
            found,
        }
    }

    /// Returns `true` for errors raised while validating inputs, before any iteration ran.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::InvalidGridSize { .. }
                | Self::NonPositiveStock { .. }
                | Self::InvalidDiscount { .. }
                | Self::NonPositiveTolerance { .. }
                | Self::InvalidEpsilon { .. }
        )
    }
}

/// Type alias for results returned by this crate.
pub type Result<T> = std::result::Result<T, CakeError>;
