//! Terminal value solver: how much capital a plan needs at retirement and
//! what monthly contribution gets it there
//!
//! The three terminal policies differ only in the capital formula:
//! - **Finite-horizon depletion**: PV of an ordinary annuity paying the target
//!   income until the limiting age
//! - **Legacy preserving**: perpetuity capital plus the bequest amount
//! - **Perpetuity**: income funded from returns alone, forever
//!
//! # Example
//!
//! ```rust,ignore
//! use wealth_projection::terminal::TerminalValueSolver;
//!
//! let solution = TerminalValueSolver::default().solve_at_start(&inputs)?;
//! println!("Need {:.2}, save {:.2}/month", solution.required_capital, solution.required_contribution);
//! ```

mod discount;
mod solver;

pub use discount::{AnnuityMath, PaymentTiming};
pub use solver::{SolverInput, TerminalSolution, TerminalValueSolver};
