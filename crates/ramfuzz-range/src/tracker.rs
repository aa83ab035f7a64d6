use serde::{Deserialize, Serialize};

use crate::linear::{LinearCombination, LinearInequality};

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum RangeError {
    #[error("constraints on variable {var} are infeasible: [{lo}, {hi}]")]
    Infeasible { var: usize, lo: f64, hi: f64 },
    #[error("fixing variable {var} to {value} violates a constraint")]
    Violated { var: usize, value: f64 },
}

/// Which side of a variable an isolated inequality bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Bound {
    Upper,
    Lower,
}

/// Isolates `var` in `ineq`, which must carry a non-zero multiplier for it.
///
/// `4x - 2y + 100 >= 0` for `y` gives `y <= 2x + 50`: the returned
/// combination `2x + 50` with [`Bound::Upper`].
pub fn bound(ineq: &LinearInequality, var: usize) -> (LinearCombination, Bound) {
    let mut rest = ineq.lhs.clone();
    let m = rest.multipliers.remove(&var).unwrap_or(0.0);
    // m*var + rest >= 0  <=>  var ?? -rest/m
    let side = if m > 0.0 { Bound::Lower } else { Bound::Upper };
    (-(rest / m), side)
}

/// One elimination step: an equivalent system without `var`.
fn fomo_step(var: usize, ineqs: &[LinearInequality]) -> Vec<LinearInequality> {
    let mut upper = Vec::new();
    let mut lower = Vec::new();
    let mut combination = Vec::new();
    for ineq in ineqs {
        match ineq.lhs.multipliers.get(&var) {
            Some(m) if *m != 0.0 => {
                let (b, side) = bound(ineq, var);
                match side {
                    Bound::Lower => lower.push(b),
                    Bound::Upper => upper.push(b),
                }
            }
            Some(_) => {
                let mut passed = ineq.clone();
                passed.lhs.multipliers.remove(&var);
                combination.push(passed);
            }
            None => combination.push(ineq.clone()),
        }
    }
    for ub in &upper {
        for lb in &lower {
            // ub >= lb
            combination.push(LinearInequality::new(ub.clone() - lb.clone()));
        }
    }
    combination
}

/// Tightest `[lo, hi]` on `var` implied by `ineqs`. Unconstrained sides are
/// `f64::MIN` and `f64::MAX`.
pub fn bounds(var: usize, ineqs: &[LinearInequality]) -> (f64, f64) {
    let mut lo = f64::MIN;
    let mut hi = f64::MAX;
    if ineqs.is_empty() {
        return (lo, hi);
    }
    let other = ineqs
        .iter()
        .flat_map(|i| i.lhs.variables())
        .find(|v| *v != var);
    if let Some(other) = other {
        return bounds(var, &fomo_step(other, ineqs));
    }
    for ineq in ineqs {
        if let Some(&m) = ineq.lhs.multipliers.get(&var) {
            // m*x + offset >= 0  <=>  x ?? -offset/m
            if m > 0.0 {
                lo = lo.max(-ineq.lhs.offset / m);
            } else if m < 0.0 {
                hi = hi.min(-ineq.lhs.offset / m);
            }
        }
    }
    (lo, hi)
}

/// Accumulated constraints over value ids, narrowed as values get fixed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RangeTracker {
    ineqs: Vec<LinearInequality>,
}

impl RangeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, ineq: LinearInequality) {
        self.ineqs.push(ineq);
    }

    /// Constrains `lo <= var <= hi`.
    pub fn narrow(&mut self, var: usize, lo: f64, hi: f64) {
        self.add(LinearInequality::at_least(LinearCombination::term(var, 1.0), lo));
        self.add(LinearInequality::at_least(LinearCombination::term(var, -1.0), -hi));
    }

    pub fn inequalities(&self) -> &[LinearInequality] {
        &self.ineqs
    }

    pub fn is_empty(&self) -> bool {
        self.ineqs.is_empty()
    }

    /// Bounds on `var`, failing when they cross.
    pub fn bounds(&self, var: usize) -> Result<(f64, f64), RangeError> {
        let (lo, hi) = bounds(var, &self.ineqs);
        if lo > hi {
            return Err(RangeError::Infeasible { var, lo, hi });
        }
        Ok((lo, hi))
    }

    /// Substitutes a sampled value everywhere. Inequalities left without
    /// variables are checked and dropped.
    pub fn fix(&mut self, var: usize, value: f64) -> Result<(), RangeError> {
        for ineq in &mut self.ineqs {
            ineq.substitute(var, value);
        }
        if self.ineqs.iter().any(|i| i.is_constant() && !i.holds()) {
            return Err(RangeError::Violated { var, value });
        }
        self.ineqs.retain(|i| !i.is_constant());
        Ok(())
    }
}
