//! Discretized stock levels and the consumption lookup derived from their uniform spacing.

use nalgebra::DVector;
use serde::Serialize;

use crate::error::{CakeError, Result};

/// Stock level that replaces the zero grid point so that utility never sees `ln(0)`.
pub const DEFAULT_EPSILON: f64 = 6.3829e-4;

/// Uniformly spaced stock levels from (almost) zero up to the initial endowment.
///
/// `levels[i] = i * increment` for `i >= 1` and `levels[0] = epsilon`. Because the
/// spacing is uniform, `levels[i] - levels[j] == levels[i - j]` for `i > j`, so the
/// consumption of moving from state `i` to state `j` is read straight off the grid.
/// Levels increase strictly from index 1 on; on fine grids `epsilon` may exceed `levels[1]`.
#[derive(Clone, Debug, Serialize)]
pub struct StateGrid {
    levels: DVector<f64>,
    increment: f64,
    epsilon: f64,
}

impl StateGrid {
    /// Builds a grid of `grid_size` points up to `initial_stock` with the default epsilon.
    pub fn new(initial_stock: f64, grid_size: usize) -> Result<Self> {
        StateGridBuilder::new(initial_stock, grid_size).build()
    }

    /// Number of grid points.
    pub fn len(&self) -> usize {
        self.levels.len()
    }

    /// Always `false`; a valid grid holds at least two points.
    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Spacing between consecutive grid points.
    pub fn increment(&self) -> f64 {
        self.increment
    }

    /// Stock level used at index 0.
    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    /// Largest stock level, equal to the initial endowment.
    pub fn initial_stock(&self) -> f64 {
        self.levels[self.levels.len() - 1]
    }

    /// Returns a read-only view of the stock levels.
    pub fn levels(&self) -> &DVector<f64> {
        &self.levels
    }

    /// Stock level at grid index `index`.
    pub fn level(&self, index: usize) -> f64 {
        self.levels[index]
    }

    /// Consumption when moving from `state` to `next`, or `None` if the move would grow the stock.
    pub fn consumption(&self, state: usize, next: usize) -> Option<f64> {
        if next <= state {
            Some(self.levels[state - next])
        } else {
            None
        }
    }
}

/// Checks that `grid_size` points can span `(0, initial_stock]` monotonically.
pub(crate) fn validate_extent(initial_stock: f64, grid_size: usize) -> Result<()> {
    if grid_size < 2 {
        return Err(CakeError::InvalidGridSize { grid_size });
    }
    if !(initial_stock > 0.0 && initial_stock.is_finite()) {
        return Err(CakeError::NonPositiveStock {
            stock: initial_stock,
        });
    }
    Ok(())
}

/// Builder that validates the endowment, size and epsilon before constructing a [`StateGrid`].
#[derive(Debug)]
pub struct StateGridBuilder {
    initial_stock: f64,
    grid_size: usize,
    epsilon: f64,
}

impl StateGridBuilder {
    /// Start building a grid of `grid_size` points ending at `initial_stock`.
    pub fn new(initial_stock: f64, grid_size: usize) -> Self {
        Self {
            initial_stock,
            grid_size,
            epsilon: DEFAULT_EPSILON,
        }
    }

    /// Sets the stock level substituted for zero at index 0.
    pub fn epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = epsilon;
        self
    }

    /// Finalizes construction after validating all inputs.
    pub fn build(self) -> Result<StateGrid> {
        validate_extent(self.initial_stock, self.grid_size)?;
        if !(self.epsilon > 0.0 && self.epsilon.is_finite()) {
            return Err(CakeError::InvalidEpsilon {
                epsilon: self.epsilon,
            });
        }

        let increment = self.initial_stock / (self.grid_size - 1) as f64;

        // Pin the endpoint so rounding in the product never shifts k0.
        let mut levels = DVector::from_fn(self.grid_size, |i, _| i as f64 * increment);
        levels[self.grid_size - 1] = self.initial_stock;
        levels[0] = self.epsilon;

        Ok(StateGrid {
            levels,
            increment,
            epsilon: self.epsilon,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn builds_uniform_grid_with_epsilon_at_zero() {
        let grid = StateGrid::new(1.0, 5).unwrap();
        assert_eq!(grid.len(), 5);
        assert_relative_eq!(grid.increment(), 0.25);
        assert_eq!(grid.level(0), DEFAULT_EPSILON);
        assert_relative_eq!(grid.level(1), 0.25);
        assert_relative_eq!(grid.level(3), 0.75);
        assert_eq!(grid.initial_stock(), 1.0);
    }

    #[test]
    fn consumption_reuses_grid_spacing() {
        let grid = StateGrid::new(2.0, 9).unwrap();
        for state in 1..grid.len() {
            for next in 1..state {
                let direct = grid.level(state) - grid.level(next);
                assert_relative_eq!(grid.consumption(state, next).unwrap(), direct, epsilon = 1e-12);
            }
            assert_eq!(grid.consumption(state, state), Some(grid.epsilon()));
        }
        assert_eq!(grid.consumption(2, 3), None);
    }

    #[test]
    fn builder_rejects_invalid_inputs() {
        assert!(matches!(
            StateGrid::new(1.0, 1),
            Err(CakeError::InvalidGridSize { grid_size: 1 })
        ));
        assert!(matches!(
            StateGrid::new(-1.0, 4),
            Err(CakeError::NonPositiveStock { .. })
        ));
        assert!(matches!(
            StateGrid::new(f64::NAN, 4),
            Err(CakeError::NonPositiveStock { .. })
        ));
        for epsilon in [0.0, -1e-3, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                StateGridBuilder::new(1.0, 3).epsilon(epsilon).build(),
                Err(CakeError::InvalidEpsilon { .. })
            ));
        }
    }

    #[test]
    fn accepts_increment_below_epsilon() {
        let grid = StateGrid::new(1.0, 4000).unwrap();
        assert!(grid.increment() < DEFAULT_EPSILON);
        assert_eq!(grid.level(0), DEFAULT_EPSILON);
        assert!(grid.level(1) < grid.level(0));
        for pair in grid.levels().as_slice()[1..].windows(2) {
            assert!(pair[0] < pair[1]);
        }
        assert_eq!(grid.initial_stock(), 1.0);
    }
}
