//! Bounds on numeric variables from a conjunction of linear inequalities,
//! by Fourier–Motzkin elimination.

pub mod linear;
pub mod tracker;

pub use linear::{LinearCombination, LinearInequality};
pub use tracker::{bound, bounds, Bound, RangeError, RangeTracker};
