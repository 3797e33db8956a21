//! Linear expressions over decision variables.
use super::Variable;
use indexmap::IndexMap;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};

/// A linear expression: a weighted sum of variables plus a constant.
///
/// Terms with the same variable are merged, as the solver rejects repeated entries in a row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinearExpr {
    terms: IndexMap<Variable, f64>,
    constant: f64,
}

impl LinearExpr {
    /// Create an empty expression, equal to zero
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an expression with no variables
    pub fn constant(value: f64) -> Self {
        Self {
            terms: IndexMap::new(),
            constant: value,
        }
    }

    /// Add `coeff × var` to the expression
    pub fn add_term(&mut self, var: Variable, coeff: f64) {
        *self.terms.entry(var).or_insert(0.0) += coeff;
    }

    /// Add a constant to the expression
    pub fn add_constant(&mut self, value: f64) {
        self.constant += value;
    }

    /// Add `factor × other` to the expression
    pub fn add_expr(&mut self, other: &LinearExpr, factor: f64) {
        for (var, coeff) in &other.terms {
            self.add_term(*var, coeff * factor);
        }
        self.constant += other.constant * factor;
    }

    /// A copy of the expression multiplied by `factor`
    pub fn scaled(&self, factor: f64) -> Self {
        let mut expr = Self::new();
        expr.add_expr(self, factor);
        expr
    }

    /// Iterate over the variable terms of the expression
    pub fn terms(&self) -> impl Iterator<Item = (Variable, f64)> + '_ {
        self.terms.iter().map(|(var, coeff)| (*var, *coeff))
    }

    /// The constant part of the expression
    pub fn constant_value(&self) -> f64 {
        self.constant
    }

    /// Whether the expression has no variable terms
    pub fn is_constant(&self) -> bool {
        self.terms.is_empty()
    }

    /// Evaluate the expression for the given variable values
    pub fn evaluate(&self, values: &[f64]) -> f64 {
        self.terms
            .iter()
            .map(|(var, coeff)| coeff * values[var.index()])
            .sum::<f64>()
            + self.constant
    }
}

impl From<Variable> for LinearExpr {
    fn from(var: Variable) -> Self {
        let mut expr = Self::new();
        expr.add_term(var, 1.0);
        expr
    }
}

impl FromIterator<(Variable, f64)> for LinearExpr {
    fn from_iter<I: IntoIterator<Item = (Variable, f64)>>(iter: I) -> Self {
        let mut expr = Self::new();
        for (var, coeff) in iter {
            expr.add_term(var, coeff);
        }
        expr
    }
}

impl AddAssign<&LinearExpr> for LinearExpr {
    fn add_assign(&mut self, rhs: &LinearExpr) {
        self.add_expr(rhs, 1.0);
    }
}

impl AddAssign for LinearExpr {
    fn add_assign(&mut self, rhs: LinearExpr) {
        self.add_expr(&rhs, 1.0);
    }
}

impl SubAssign<&LinearExpr> for LinearExpr {
    fn sub_assign(&mut self, rhs: &LinearExpr) {
        self.add_expr(rhs, -1.0);
    }
}

impl SubAssign for LinearExpr {
    fn sub_assign(&mut self, rhs: LinearExpr) {
        self.add_expr(&rhs, -1.0);
    }
}

impl Add for LinearExpr {
    type Output = LinearExpr;

    fn add(mut self, rhs: LinearExpr) -> LinearExpr {
        self += rhs;
        self
    }
}

impl Sub for LinearExpr {
    type Output = LinearExpr;

    fn sub(mut self, rhs: LinearExpr) -> LinearExpr {
        self -= rhs;
        self
    }
}

impl Mul<f64> for LinearExpr {
    type Output = LinearExpr;

    fn mul(self, rhs: f64) -> LinearExpr {
        self.scaled(rhs)
    }
}

impl Mul<f64> for Variable {
    type Output = LinearExpr;

    fn mul(self, rhs: f64) -> LinearExpr {
        std::iter::once((self, rhs)).collect()
    }
}

impl Neg for LinearExpr {
    type Output = LinearExpr;

    fn neg(self) -> LinearExpr {
        self.scaled(-1.0)
    }
}

impl Sum for LinearExpr {
    fn sum<I: Iterator<Item = LinearExpr>>(iter: I) -> Self {
        iter.fold(LinearExpr::new(), |acc, expr| acc + expr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::assert_approx_eq;

    #[test]
    fn test_like_terms_are_merged() {
        let x = Variable(0);
        let y = Variable(1);
        let mut expr = x * 2.0;
        expr.add_term(y, 1.0);
        expr.add_term(x, 3.0);

        assert_eq!(expr.terms().collect::<Vec<_>>(), [(x, 5.0), (y, 1.0)]);
    }

    #[test]
    fn test_arithmetic() {
        let x = Variable(0);
        let y = Variable(1);
        let expr = (x * 2.0 + LinearExpr::constant(1.0)) - y * 0.5;
        let expr = -(expr * 2.0);

        assert_eq!(expr.terms().collect::<Vec<_>>(), [(x, -4.0), (y, 1.0)]);
        assert_approx_eq!(f64, expr.constant_value(), -2.0);
        assert_approx_eq!(f64, expr.evaluate(&[1.0, 3.0]), -4.0 + 3.0 - 2.0);
    }

    #[test]
    fn test_sum() {
        let total: LinearExpr = (0..3).map(|i| LinearExpr::from(Variable(i))).sum();
        assert_eq!(total.terms().count(), 3);
        assert!(!total.is_constant());
        assert!(LinearExpr::constant(4.0).is_constant());
    }
}
