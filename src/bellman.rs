//! Bellman operator: immediate utility plus discounted continuation for every transition.

use nalgebra::{DMatrix, DVector};
use rayon::prelude::*;

use crate::error::{CakeError, Result};
use crate::utility::{UtilityTable, INFEASIBLE};

/// Scratch table `P[i][j] = U[i][j] + beta * V[j]`, reused across iterations.
///
/// Shares the layout of [`UtilityTable`]: one contiguous column per current state.
/// Entries with `j > i` are set to [`INFEASIBLE`] once at construction and never
/// written again.
#[derive(Clone, Debug)]
pub struct PayoffMatrix {
    payoffs: DMatrix<f64>,
}

impl PayoffMatrix {
    /// Allocates a payoff table for `size` states with every entry infeasible.
    pub fn new(size: usize) -> Self {
        Self {
            payoffs: DMatrix::from_element(size, size, INFEASIBLE),
        }
    }

    /// Number of states covered by the table.
    pub fn size(&self) -> usize {
        self.payoffs.ncols()
    }

    /// Payoff of moving from `state` to `next`.
    pub fn get(&self, state: usize, next: usize) -> f64 {
        self.payoffs[(next, state)]
    }

    /// Parallel iterator over `(state, candidates)` pairs.
    pub fn par_states(&self) -> impl IndexedParallelIterator<Item = (usize, &[f64])> {
        let n = self.size();
        self.payoffs.as_slice().par_chunks(n).enumerate()
    }
}

/// Discounted continuation `D[j] = beta * V[j]`, a column-only quantity shared by all states.
pub fn discounted_continuation(discount: f64, values: &DVector<f64>) -> DVector<f64> {
    values * discount
}

/// Fills `payoff` with `U[i][j] + beta * V[j]` for every feasible pair.
///
/// Each task owns the column of exactly one current state `i` and writes only its
/// first `i + 1` entries; infeasible entries keep their sentinel.
pub fn apply_bellman(
    utility: &UtilityTable,
    discount: f64,
    values: &DVector<f64>,
    payoff: &mut PayoffMatrix,
) -> Result<()> {
    let n = utility.size();
    if values.len() != n {
        return Err(CakeError::dimension_mismatch("value vector length", n, values.len()));
    }
    if payoff.size() != n {
        return Err(CakeError::dimension_mismatch("payoff table size", n, payoff.size()));
    }

    let continuation = discounted_continuation(discount, values);
    let continuation = continuation.as_slice();

    payoff
        .payoffs
        .as_mut_slice()
        .par_chunks_mut(n)
        .enumerate()
        .for_each(|(state, out)| {
            let utilities = utility.state_slice(state);
            let feasible = state + 1;
            for ((slot, u), d) in out[..feasible]
                .iter_mut()
                .zip(&utilities[..feasible])
                .zip(&continuation[..feasible])
            {
                *slot = u + d;
            }
        });

    Ok(())
}
