//! High-level cake-eating problem: validated setup, solve, and the resulting policy.

use std::sync::atomic::AtomicBool;

use log::info;
use nalgebra::DVector;
use serde::Serialize;

use crate::error::{CakeError, Result};
use crate::grid::{StateGrid, StateGridBuilder};
use crate::options::{CakeParameters, SolverOptions};
use crate::solving::{ConvergenceSummary, ValueIteration};
use crate::utility::UtilityTable;

/// A validated cake-eating problem with its grid and utility table precomputed.
#[derive(Clone, Debug)]
pub struct CakeProblem {
    params: CakeParameters,
    grid: StateGrid,
    utility: UtilityTable,
}

impl CakeProblem {
    /// Validates `params` and builds the grid and utility table once.
    pub fn new(params: CakeParameters, options: &SolverOptions) -> Result<Self> {
        params.validate()?;
        let grid = StateGridBuilder::new(params.initial_stock, params.grid_size)
            .epsilon(options.epsilon)
            .build()?;
        let utility = UtilityTable::from_grid(&grid);
        info!(
            "built cake-eating problem: {} states up to k0 = {}, beta = {}",
            grid.len(),
            params.initial_stock,
            params.discount
        );
        Ok(Self {
            params,
            grid,
            utility,
        })
    }

    /// Accessor for the problem parameters.
    pub fn params(&self) -> &CakeParameters {
        &self.params
    }

    /// Accessor for the state grid.
    pub fn grid(&self) -> &StateGrid {
        &self.grid
    }

    /// Accessor for the precomputed utility table.
    pub fn utility(&self) -> &UtilityTable {
        &self.utility
    }

    /// Runs value iteration to convergence.
    pub fn solve(&self, options: &SolverOptions) -> Result<Solution> {
        self.run(options, None)
    }

    /// Runs value iteration, aborting between iterations once `cancel` is set.
    pub fn solve_with_cancel(&self, options: &SolverOptions, cancel: &AtomicBool) -> Result<Solution> {
        self.run(options, Some(cancel))
    }

    fn run(&self, options: &SolverOptions, cancel: Option<&AtomicBool>) -> Result<Solution> {
        let iterate = || -> Result<Solution> {
            let mut iteration =
                ValueIteration::new(&self.utility, self.params.discount, self.params.tolerance)?;
            let summary = iteration.run(options.max_iterations, cancel)?;
            let (values, policy) = iteration.into_parts();
            Ok(Solution {
                grid: self.grid.clone(),
                values,
                policy,
                summary,
            })
        };

        match options.threads {
            Some(threads) => {
                let pool = rayon::ThreadPoolBuilder::new()
                    .num_threads(threads)
                    .build()
                    .map_err(|err| CakeError::ThreadPool {
                        message: err.to_string(),
                    })?;
                pool.install(iterate)
            }
            None => iterate(),
        }
    }
}

/// Converged value function and optimal depletion policy.
#[derive(Clone, Debug, Serialize)]
pub struct Solution {
    /// Grid the solution is defined on.
    pub grid: StateGrid,
    /// Converged value of each stock level.
    pub values: DVector<f64>,
    /// Grid index of the optimal next stock for each current stock.
    pub policy: Vec<usize>,
    /// Diagnostics from the convergence loop.
    pub summary: ConvergenceSummary,
}

impl Solution {
    /// Stock level carried into the next period from each state.
    pub fn next_stocks(&self) -> DVector<f64> {
        DVector::from_iterator(
            self.policy.len(),
            self.policy.iter().map(|&next| self.grid.level(next)),
        )
    }

    /// Amount consumed in each state under the optimal policy.
    pub fn consumption(&self) -> DVector<f64> {
        DVector::from_iterator(
            self.policy.len(),
            self.policy
                .iter()
                .enumerate()
                .map(|(state, &next)| self.grid.level(state - next)),
        )
    }

    /// Share of the current stock consumed in `state`.
    pub fn consumption_fraction(&self, state: usize) -> f64 {
        self.grid.level(state - self.policy[state]) / self.grid.level(state)
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn two_state_problem_depletes_immediately() {
        let params = CakeParameters::new(1.0, 0.9, 2, 1e-4);
        let options = SolverOptions::default();
        let problem = CakeProblem::new(params, &options).unwrap();

        let solution = problem.solve(&options).unwrap();
        assert_eq!(solution.policy, vec![0, 0]);
        assert_eq!(solution.next_stocks()[1], problem.grid().epsilon());
        assert_relative_eq!(solution.consumption()[1], 1.0);
    }

    #[test]
    fn configuration_errors_surface_before_solving() {
        let options = SolverOptions::default();
        let result = CakeProblem::new(CakeParameters::new(1.0, 1.2, 10, 1e-4), &options);
        let err = result.unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn dedicated_pool_matches_global_pool() {
        let params = CakeParameters::new(1.0, 0.9, 20, 1e-4);
        let options = SolverOptions::default();
        let problem = CakeProblem::new(params, &options).unwrap();

        let global = problem.solve(&options).unwrap();
        let pooled = problem.solve(&options.clone().with_threads(2)).unwrap();
        assert_eq!(global.policy, pooled.policy);
        assert_eq!(global.values, pooled.values);
    }
}
