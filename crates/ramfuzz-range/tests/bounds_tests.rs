use ramfuzz_range::{bound, bounds, Bound, LinearCombination, LinearInequality, RangeError, RangeTracker};

fn x(id: usize, m: f64) -> LinearCombination {
    LinearCombination::term(id, m)
}

fn ge(lhs: LinearCombination, lb: f64) -> LinearInequality {
    LinearInequality::at_least(lhs, lb)
}

#[test]
fn test_bounds_empty() {
    assert_eq!(bounds(1234, &[]), (f64::MIN, f64::MAX));
}

#[test]
fn test_bounds_single() {
    assert_eq!(bounds(1, &[ge(x(1, 3.0), 6.0)]), (2.0, f64::MAX));
}

#[test]
fn test_bounds_unconstrained() {
    let li = ge(x(1, 1.0).with_term(2, 1.0), 0.0);
    assert_eq!(bounds(1, &[li.clone()]), (f64::MIN, f64::MAX));
    assert_eq!(bounds(2, &[li]), (f64::MIN, f64::MAX));
}

#[test]
fn test_bounds_upper_and_lower() {
    let ineqs = [ge(x(1, 1.0), 1000.0), ge(x(1, -1.0), -2000.0)];
    assert_eq!(bounds(1, &ineqs), (1000.0, 2000.0));
}

#[test]
fn test_bounds_chain() {
    let ineqs = [ge(x(2, 1.0), 123.0), ge(x(1, 1.0).with_term(2, -1.0), 2.0)];
    assert_eq!(bounds(1, &ineqs), (125.0, f64::MAX));
}

#[test]
fn test_bounds_zero_multiplier() {
    let ineqs = [
        ge(x(1, 0.0).with_term(2, 1.0), 123.0),
        ge(x(1, 1.0).with_term(2, -1.0), 0.0),
    ];
    assert_eq!(bounds(2, &ineqs), (123.0, f64::MAX));
}

#[test]
fn test_bound_sides() {
    // 4x - 2y + 100 >= 0  <=>  y <= 2x + 50
    let ineq = LinearInequality::new(x(1, 4.0).with_term(2, -2.0) + LinearCombination::constant(100.0));
    let (rhs, side) = bound(&ineq, 2);
    assert_eq!(side, Bound::Upper);
    assert_eq!(rhs.multipliers.get(&1), Some(&2.0));
    assert_eq!(rhs.offset, 50.0);

    let (rhs, side) = bound(&ineq, 1);
    assert_eq!(side, Bound::Lower);
    assert_eq!(rhs.multipliers.get(&2), Some(&0.5));
    assert_eq!(rhs.offset, -25.0);
}

#[test]
fn test_tracker_fix_propagates() {
    let mut tracker = RangeTracker::new();
    tracker.narrow(1, 0.0, 10.0);
    tracker.add(ge(x(2, 1.0).with_term(1, -1.0), 0.0)); // x2 >= x1
    assert_eq!(tracker.bounds(2), Ok((0.0, f64::MAX)));

    tracker.fix(1, 7.0).unwrap();
    assert_eq!(tracker.bounds(2), Ok((7.0, f64::MAX)));
    assert_eq!(tracker.inequalities().len(), 1);
}

#[test]
fn test_tracker_infeasible() {
    let mut tracker = RangeTracker::new();
    tracker.narrow(3, 10.0, 5.0);
    assert!(matches!(tracker.bounds(3), Err(RangeError::Infeasible { var: 3, .. })));
}

#[test]
fn test_tracker_fix_violation() {
    let mut tracker = RangeTracker::new();
    tracker.narrow(1, 0.0, 10.0);
    let result = tracker.fix(1, 11.0);
    assert_eq!(result, Err(RangeError::Violated { var: 1, value: 11.0 }));
}
