use std::collections::BTreeMap;
use std::ops::{Add, Div, Neg, Sub};

use serde::{Deserialize, Serialize};

/// `Σ multipliers[v] * v + offset`. Variables are identified by number.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LinearCombination {
    pub multipliers: BTreeMap<usize, f64>,
    pub offset: f64,
}

impl LinearCombination {
    pub fn constant(offset: f64) -> Self {
        Self {
            multipliers: BTreeMap::new(),
            offset,
        }
    }

    /// `m * var`.
    pub fn term(var: usize, m: f64) -> Self {
        Self {
            multipliers: BTreeMap::from([(var, m)]),
            offset: 0.0,
        }
    }

    pub fn with_term(mut self, var: usize, m: f64) -> Self {
        *self.multipliers.entry(var).or_insert(0.0) += m;
        self
    }

    pub fn mentions(&self, var: usize) -> bool {
        self.multipliers.contains_key(&var)
    }

    /// Variables with a multiplier entry, zero or not.
    pub fn variables(&self) -> impl Iterator<Item = usize> + '_ {
        self.multipliers.keys().copied()
    }

    fn prune(mut self) -> Self {
        self.multipliers.retain(|_, m| *m != 0.0);
        self
    }
}

impl Add for LinearCombination {
    type Output = LinearCombination;

    fn add(mut self, rhs: LinearCombination) -> LinearCombination {
        self.offset += rhs.offset;
        for (var, m) in rhs.multipliers {
            *self.multipliers.entry(var).or_insert(0.0) += m;
        }
        self.prune()
    }
}

impl Sub for LinearCombination {
    type Output = LinearCombination;

    fn sub(mut self, rhs: LinearCombination) -> LinearCombination {
        self.offset -= rhs.offset;
        for (var, m) in rhs.multipliers {
            *self.multipliers.entry(var).or_insert(0.0) -= m;
        }
        self.prune()
    }
}

impl Neg for LinearCombination {
    type Output = LinearCombination;

    fn neg(self) -> LinearCombination {
        LinearCombination::default() - self
    }
}

impl Div<f64> for LinearCombination {
    type Output = LinearCombination;

    fn div(self, fac: f64) -> LinearCombination {
        LinearCombination {
            multipliers: self
                .multipliers
                .into_iter()
                .map(|(var, m)| (var, m / fac))
                .collect(),
            offset: self.offset / fac,
        }
    }
}

/// `lhs >= 0`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LinearInequality {
    pub lhs: LinearCombination,
}

impl LinearInequality {
    pub fn new(lhs: LinearCombination) -> Self {
        Self { lhs }
    }

    /// `lhs >= lb`.
    pub fn at_least(lhs: LinearCombination, lb: f64) -> Self {
        let mut lhs = lhs;
        lhs.offset -= lb;
        Self { lhs }
    }

    /// Folds `var = value` into the offset, removing `var`'s term.
    pub fn substitute(&mut self, var: usize, value: f64) {
        if let Some(m) = self.lhs.multipliers.remove(&var) {
            self.lhs.offset += m * value;
        }
    }

    /// True iff no variable has a non-zero multiplier.
    pub fn is_constant(&self) -> bool {
        self.lhs.multipliers.values().all(|m| *m == 0.0)
    }

    /// For a constant inequality, whether it holds.
    pub fn holds(&self) -> bool {
        self.lhs.offset >= 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_substitute() {
        let mut li = LinearInequality::at_least(
            LinearCombination::term(1, 1.0).with_term(2, 2.0),
            3.0,
        );
        li.substitute(1, 3.0);
        assert_eq!(
            li,
            LinearInequality::at_least(LinearCombination::term(2, 2.0), 0.0)
        );
    }

    #[test]
    fn test_substitute_absent_variable_is_noop() {
        let mut li = LinearInequality::at_least(LinearCombination::term(2, 1.0), 5.0);
        let before = li.clone();
        li.substitute(7, 100.0);
        assert_eq!(li, before);
    }

    #[test]
    fn test_arithmetic_drops_cancelled_terms() {
        let a = LinearCombination::term(1, 2.0).with_term(2, 1.0);
        let b = LinearCombination::term(1, 2.0);
        let diff = a - b;
        assert!(!diff.mentions(1));
        assert_eq!(diff.multipliers.get(&2), Some(&1.0));
    }

    #[test]
    fn test_division_scales_offset() {
        let c = LinearCombination::term(3, 4.0) + LinearCombination::constant(-8.0);
        let half = c / 2.0;
        assert_eq!(half.multipliers.get(&3), Some(&2.0));
        assert_eq!(half.offset, -4.0);
    }
}
