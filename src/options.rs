//! Problem parameters and solver knobs for cake-eating value iteration.

use serde::{Deserialize, Serialize};

use crate::error::{CakeError, Result};
use crate::grid::{validate_extent, DEFAULT_EPSILON};

/// The four scalars that define a cake-eating problem.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CakeParameters {
    /// Initial endowment `k0`; the largest point on the state grid.
    pub initial_stock: f64,
    /// Discount factor `beta`, strictly inside (0, 1).
    pub discount: f64,
    /// Number of grid points `N`.
    pub grid_size: usize,
    /// Convergence threshold on the L1 gap between successive value estimates.
    pub tolerance: f64,
}

impl Default for CakeParameters {
    fn default() -> Self {
        Self {
            initial_stock: 1.0,
            discount: 0.9,
            grid_size: 100,
            tolerance: 1e-4,
        }
    }
}

impl CakeParameters {
    /// Creates parameters from the four problem scalars without validating them.
    pub fn new(initial_stock: f64, discount: f64, grid_size: usize, tolerance: f64) -> Self {
        Self {
            initial_stock,
            discount,
            grid_size,
            tolerance,
        }
    }

    /// Checks every scalar and reports the first invalid one.
    pub fn validate(&self) -> Result<()> {
        validate_extent(self.initial_stock, self.grid_size)?;
        validate_discount(self.discount)?;
        validate_tolerance(self.tolerance)
    }
}

/// Rejects discount factors that break the contraction (`beta >= 1`) or make no economic sense.
pub fn validate_discount(discount: f64) -> Result<()> {
    if discount > 0.0 && discount < 1.0 {
        Ok(())
    } else {
        Err(CakeError::InvalidDiscount { discount })
    }
}

/// Rejects tolerances that the convergence loop could never satisfy.
pub fn validate_tolerance(tolerance: f64) -> Result<()> {
    if tolerance > 0.0 && tolerance.is_finite() {
        Ok(())
    } else {
        Err(CakeError::NonPositiveTolerance { tolerance })
    }
}

/// Controls the convergence loop and the grid construction.
#[derive(Clone, Debug, PartialEq)]
pub struct SolverOptions {
    /// Maximum number of Bellman iterations before reporting non-convergence.
    pub max_iterations: usize,
    /// Stock level substituted for the zero grid point so that `ln` stays finite.
    pub epsilon: f64,
    /// Worker count for a dedicated thread pool; `None` runs on rayon's global pool.
    pub threads: Option<usize>,
}

impl Default for SolverOptions {
    fn default() -> Self {
        Self {
            max_iterations: 100_000,
            epsilon: DEFAULT_EPSILON,
            threads: None,
        }
    }
}

impl SolverOptions {
    /// Set the iteration cap. At least one iteration is always allowed.
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations.max(1);
        self
    }

    /// Override the stock level used in place of zero at grid index 0.
    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = epsilon;
        self
    }

    /// Run iterations inside a dedicated pool with `threads` workers.
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = Some(threads.max(1));
        self
    }
}
