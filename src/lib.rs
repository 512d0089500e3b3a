//! Parallel value function iteration for the deterministic cake-eating problem.
//!
//! An agent owns a non-replenishing stock `k0` and chooses each period how much
//! of it to keep. The value function solves
//!
//! ```text
//! V(k) = max_{k' <= k} ln(k - k') + beta * V(k')
//! ```
//!
//! on a uniform grid of stock levels. This crate provides
//!
//! - the discretized state space and its consumption lookup (`grid` module),
//! - the static log-utility table (`utility` module),
//! - the Bellman operator producing the payoff table (`bellman` module),
//! - the parallel row-wise maximization yielding values and policy (`maximize` module), and
//! - the convergence controller driving them to a fixed point (`solving` module).
//!
//! Every N×N phase is split across rayon workers by current state; each worker
//! writes only its own state's slots, so no locking is needed.
//!
//! # Quick start
//!
//! ```no_run
//! use cakeeat::{CakeParameters, CakeProblem, SolverOptions};
//!
//! let params = CakeParameters::new(1.0, 0.9, 100, 1e-4);
//! let options = SolverOptions::default();
//!
//! let problem = CakeProblem::new(params, &options).expect("valid parameters");
//! let solution = problem.solve(&options).expect("converged");
//! for (state, next) in solution.next_stocks().iter().enumerate() {
//!     println!("{:.4} -> {:.4}", problem.grid().level(state), next);
//! }
//! ```

pub mod bellman;
pub mod error;
pub mod grid;
pub mod maximize;
pub mod options;
pub mod problem;
pub mod solving;
pub mod utility;

pub use error::{CakeError, Result};
pub use grid::{StateGrid, StateGridBuilder};
pub use options::{CakeParameters, SolverOptions};
pub use problem::{CakeProblem, Solution};
pub use solving::{ConvergenceSummary, IterationState, ValueIteration};
