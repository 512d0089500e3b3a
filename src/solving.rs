//! Convergence controller driving the Bellman operator to its fixed point.

use std::sync::atomic::{AtomicBool, Ordering};

use log::{debug, info, warn};
use nalgebra::DVector;
use serde::Serialize;

use crate::bellman::{apply_bellman, PayoffMatrix};
use crate::error::{CakeError, Result};
use crate::maximize::maximize_rows;
use crate::options::{validate_discount, validate_tolerance};
use crate::utility::UtilityTable;

/// Phase of the value iteration state machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum IterationState {
    /// The last gap still exceeds the tolerance.
    Iterating,
    /// The last gap is within the tolerance; values and policy are final.
    Converged,
}

/// Diagnostics returned alongside the converged value function.
#[derive(Clone, Debug, Serialize)]
pub struct ConvergenceSummary {
    /// Number of Bellman iterations performed.
    pub iterations: usize,
    /// L1 distance between the last two value estimates.
    pub gap: f64,
    /// Gap observed after each iteration, in order.
    pub gap_history: Vec<f64>,
}

/// L1 distance `sum_i |old[i] - new[i]|` between two value estimates.
pub fn l1_gap(old: &DVector<f64>, new: &DVector<f64>) -> f64 {
    old.iter().zip(new.iter()).map(|(a, b)| (a - b).abs()).sum()
}

/// Owns the iteration state: current value estimate, policy, and payoff scratch space.
#[derive(Debug)]
pub struct ValueIteration<'a> {
    utility: &'a UtilityTable,
    discount: f64,
    tolerance: f64,
    values: DVector<f64>,
    policy: Vec<usize>,
    payoff: PayoffMatrix,
    gap: f64,
    gap_history: Vec<f64>,
    state: IterationState,
}

impl<'a> ValueIteration<'a> {
    /// Starts from the zero value function with a gap that forces at least one iteration.
    pub fn new(utility: &'a UtilityTable, discount: f64, tolerance: f64) -> Result<Self> {
        validate_discount(discount)?;
        validate_tolerance(tolerance)?;

        let n = utility.size();
        Ok(Self {
            utility,
            discount,
            tolerance,
            values: DVector::zeros(n),
            policy: vec![0; n],
            payoff: PayoffMatrix::new(n),
            gap: tolerance + 1.0,
            gap_history: Vec::new(),
            state: IterationState::Iterating,
        })
    }

    /// Current value estimate.
    pub fn values(&self) -> &DVector<f64> {
        &self.values
    }

    /// Policy produced by the latest iteration.
    pub fn policy(&self) -> &[usize] {
        &self.policy
    }

    /// Gap produced by the latest iteration.
    pub fn gap(&self) -> f64 {
        self.gap
    }

    /// Number of completed iterations.
    pub fn iterations(&self) -> usize {
        self.gap_history.len()
    }

    /// Current phase of the state machine.
    pub fn state(&self) -> IterationState {
        self.state
    }

    /// Applies the Bellman operator once and replaces the value estimate and policy.
    ///
    /// Does nothing once converged.
    pub fn step(&mut self) -> Result<IterationState> {
        if self.state == IterationState::Converged {
            return Ok(self.state);
        }

        apply_bellman(self.utility, self.discount, &self.values, &mut self.payoff)?;
        let maxima = maximize_rows(&self.payoff)?;

        self.gap = l1_gap(&self.values, &maxima.values);
        self.values = maxima.values;
        self.policy = maxima.policy;
        self.gap_history.push(self.gap);

        if self.gap <= self.tolerance {
            self.state = IterationState::Converged;
        }
        Ok(self.state)
    }

    /// Iterates until convergence, the iteration cap, or cancellation.
    ///
    /// `cancel` is polled between iterations only.
    pub fn run(
        &mut self,
        max_iterations: usize,
        cancel: Option<&AtomicBool>,
    ) -> Result<ConvergenceSummary> {
        while self.state == IterationState::Iterating {
            if self.iterations() >= max_iterations {
                warn!(
                    "value iteration hit the cap of {} iterations with gap {:e}",
                    max_iterations, self.gap
                );
                return Err(CakeError::DidNotConverge {
                    iterations: self.iterations(),
                    gap: self.gap,
                });
            }
            if cancel.is_some_and(|flag| flag.load(Ordering::Relaxed)) {
                warn!("value iteration cancelled after {} iterations", self.iterations());
                return Err(CakeError::Cancelled {
                    iterations: self.iterations(),
                    gap: self.gap,
                });
            }

            self.step()?;
            debug!("iteration {}: gap {:e}", self.iterations(), self.gap);
        }

        info!(
            "value iteration converged after {} iterations (gap {:e})",
            self.iterations(),
            self.gap
        );
        Ok(self.summary())
    }

    /// Diagnostics for the iterations performed so far.
    pub fn summary(&self) -> ConvergenceSummary {
        ConvergenceSummary {
            iterations: self.iterations(),
            gap: self.gap,
            gap_history: self.gap_history.clone(),
        }
    }

    /// Consumes the controller, returning the value estimate and policy.
    pub fn into_parts(self) -> (DVector<f64>, Vec<usize>) {
        (self.values, self.policy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::StateGrid;
    use approx::assert_relative_eq;

    fn utility(size: usize) -> UtilityTable {
        UtilityTable::from_grid(&StateGrid::new(1.0, size).unwrap())
    }

    #[test]
    fn first_step_returns_log_of_full_consumption() {
        let table = utility(3);
        let mut iteration = ValueIteration::new(&table, 0.9, 1e-4).unwrap();
        assert_eq!(iteration.state(), IterationState::Iterating);

        iteration.step().unwrap();
        // With V = 0 every state eats its whole stock.
        assert_eq!(iteration.policy(), &[0, 0, 0]);
        assert_relative_eq!(iteration.values()[2], 0.0, epsilon = 1e-12);
        assert_relative_eq!(iteration.gap(), l1_gap(&DVector::zeros(3), iteration.values()));
    }

    #[test]
    fn rejects_invalid_discount_and_tolerance() {
        let table = utility(3);
        assert!(matches!(
            ValueIteration::new(&table, 1.0, 1e-4),
            Err(CakeError::InvalidDiscount { .. })
        ));
        assert!(matches!(
            ValueIteration::new(&table, 0.9, -1.0),
            Err(CakeError::NonPositiveTolerance { .. })
        ));
    }

    #[test]
    fn cap_turns_slow_convergence_into_error() {
        let table = utility(5);
        let mut iteration = ValueIteration::new(&table, 0.99, 1e-12).unwrap();
        match iteration.run(10, None) {
            Err(CakeError::DidNotConverge { iterations, gap }) => {
                assert_eq!(iterations, 10);
                assert!(gap > 1e-12);
            }
            other => panic!("expected non-convergence, got {other:?}"),
        }
    }

    #[test]
    fn cancellation_is_checked_before_each_iteration() {
        let table = utility(4);
        let flag = AtomicBool::new(true);
        let mut iteration = ValueIteration::new(&table, 0.9, 1e-4).unwrap();
        let result = iteration.run(100, Some(&flag));
        assert!(matches!(result, Err(CakeError::Cancelled { iterations: 0, .. })));
    }

    #[test]
    fn converged_controller_stops_stepping() {
        let table = utility(4);
        let mut iteration = ValueIteration::new(&table, 0.5, 1e-6).unwrap();
        let summary = iteration.run(10_000, None).unwrap();
        assert_eq!(iteration.state(), IterationState::Converged);
        assert!(summary.gap <= 1e-6);
        assert_eq!(summary.gap_history.len(), summary.iterations);

        let values = iteration.values().clone();
        assert_eq!(iteration.step().unwrap(), IterationState::Converged);
        assert_eq!(iteration.values(), &values);
        assert_eq!(iteration.iterations(), summary.iterations);
    }
}
