//! Row-wise maximization of the payoff table: next value estimate and policy.

use nalgebra::DVector;
use rayon::prelude::*;

use crate::bellman::PayoffMatrix;
use crate::error::{CakeError, Result};

/// Best payoff and the next state attaining it, for every current state.
#[derive(Clone, Debug)]
pub struct RowMaxima {
    /// `values[i] = max_{j <= i} P[i][j]`.
    pub values: DVector<f64>,
    /// `policy[i]` is the lowest next-state index attaining `values[i]`; always `<= i`.
    pub policy: Vec<usize>,
}

/// Scans the feasible candidates `0..=state` left to right and keeps the first maximum.
///
/// Seeded from `next = 0`, which is feasible for every state, so no default payoff is
/// ever reported. A NaN or infinite maximum is a numerical failure, not a valid value.
fn best_candidate(state: usize, candidates: &[f64]) -> Result<(f64, usize)> {
    let feasible = &candidates[..=state];
    let mut best = feasible[0];
    let mut best_index = 0usize;
    for (next, &payoff) in feasible.iter().enumerate().skip(1) {
        // Strict comparison keeps the lowest index on ties.
        if payoff > best {
            best = payoff;
            best_index = next;
        }
    }
    if !best.is_finite() {
        return Err(CakeError::NonFiniteValue { state, value: best });
    }
    Ok((best, best_index))
}

/// Computes the maximum and argmax of every state's feasible payoffs in parallel.
///
/// The task for state `i` reads only column `i` of `payoff` and writes only
/// `values[i]` and `policy[i]`; the end of the parallel call is the phase barrier.
pub fn maximize_rows(payoff: &PayoffMatrix) -> Result<RowMaxima> {
    let n = payoff.size();
    let mut values = DVector::<f64>::zeros(n);
    let mut policy = vec![0usize; n];

    values
        .as_mut_slice()
        .par_iter_mut()
        .zip(policy.par_iter_mut())
        .zip(payoff.par_states())
        .try_for_each(|((value, choice), (state, candidates))| {
            let (best, best_index) = best_candidate(state, candidates)?;
            *value = best;
            *choice = best_index;
            Ok::<(), CakeError>(())
        })?;

    Ok(RowMaxima { values, policy })
}
