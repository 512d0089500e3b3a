//! Static log-utility table over all (state, next state) pairs.

use nalgebra::DMatrix;

use crate::grid::StateGrid;

/// Payoff assigned to transitions that would grow the stock. Loses every comparison
/// against a finite payoff and survives the addition of any finite continuation value.
pub const INFEASIBLE: f64 = f64::NEG_INFINITY;

/// `U[i][j] = ln(consumption(i, j))` for `j <= i`, [`INFEASIBLE`] otherwise.
///
/// Storage is column-major with one column per current state, so the candidates
/// of state `i` form the contiguous slice returned by [`UtilityTable::state_slice`].
#[derive(Clone, Debug)]
pub struct UtilityTable {
    table: DMatrix<f64>,
}

impl UtilityTable {
    /// Evaluates log utility for every feasible transition on `grid`.
    pub fn from_grid(grid: &StateGrid) -> Self {
        let n = grid.len();
        let table = DMatrix::from_fn(n, n, |next, state| match grid.consumption(state, next) {
            Some(consumption) => consumption.ln(),
            None => INFEASIBLE,
        });
        Self { table }
    }

    /// Number of states covered by the table.
    pub fn size(&self) -> usize {
        self.table.ncols()
    }

    /// Utility of moving from `state` to `next`.
    pub fn get(&self, state: usize, next: usize) -> f64 {
        self.table[(next, state)]
    }

    /// Utilities of every candidate next state for `state`, indexed by next state.
    pub fn state_slice(&self, state: usize) -> &[f64] {
        let n = self.size();
        &self.table.as_slice()[state * n..(state + 1) * n]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn feasible_entries_hold_log_consumption() {
        let grid = StateGrid::new(1.0, 5).unwrap();
        let utility = UtilityTable::from_grid(&grid);

        assert_relative_eq!(utility.get(4, 0), 1.0_f64.ln());
        assert_relative_eq!(utility.get(3, 1), 0.5_f64.ln());
        assert_relative_eq!(utility.get(2, 2), grid.epsilon().ln());
        assert!(utility.get(0, 0).is_finite());
    }

    #[test]
    fn infeasible_entries_use_negative_infinity() {
        let grid = StateGrid::new(1.0, 4).unwrap();
        let utility = UtilityTable::from_grid(&grid);

        for state in 0..4 {
            for next in 0..4 {
                let value = utility.get(state, next);
                assert!(!value.is_nan());
                if next > state {
                    assert_eq!(value, INFEASIBLE);
                } else {
                    assert!(value.is_finite());
                }
            }
        }
        assert_eq!(
            utility.state_slice(1),
            &[utility.get(1, 0), utility.get(1, 1), INFEASIBLE, INFEASIBLE]
        );
    }
}
