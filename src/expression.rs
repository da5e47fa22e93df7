//! Linear expressions over [Variable]s, built with the usual operators:
//! `2. * x + y - 3.`.

use std::fmt::{Debug, Formatter};
use std::ops::{Add, AddAssign, Div, Mul, MulAssign, Neg, Sub, SubAssign};

use fnv::FnvHashMap as HashMap;

use crate::affine_expression_trait::IntoAffineExpression;
use crate::constraint;
use crate::solvers::VariableValues;
use crate::variable::{FormatWithVars, Variable};
use crate::Constraint;

/// A linear expression without a constant component
pub struct LinearExpression {
    pub(crate) coefficients: HashMap<Variable, f64>,
}

impl IntoAffineExpression for LinearExpression {
    type Iter = std::collections::hash_map::IntoIter<Variable, f64>;

    #[inline]
    fn linear_coefficients(self) -> Self::Iter {
        self.coefficients.into_iter()
    }
}

/// Return type for `&'a LinearExpression::linear_coefficients`
#[doc(hidden)]
pub struct CopiedCoefficients<'a>(std::collections::hash_map::Iter<'a, Variable, f64>);

impl Iterator for CopiedCoefficients<'_> {
    type Item = (Variable, f64);

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.0.next().map(|(&var, &c)| (var, c))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.0.size_hint()
    }
}

impl<'a> IntoAffineExpression for &'a LinearExpression {
    type Iter = CopiedCoefficients<'a>;

    #[inline]
    fn linear_coefficients(self) -> Self::Iter {
        CopiedCoefficients(self.coefficients.iter())
    }
}

impl FormatWithVars for LinearExpression {
    fn format_with<FUN>(&self, f: &mut Formatter<'_>, mut variable_format: FUN) -> std::fmt::Result
    where
        FUN: FnMut(&mut Formatter<'_>, Variable) -> std::fmt::Result,
    {
        let mut first = true;
        for (&var, &coeff) in &self.coefficients {
            if coeff != 0f64 {
                if first {
                    first = false;
                } else {
                    write!(f, " + ")?;
                }
                if (coeff - 1.).abs() > f64::EPSILON {
                    write!(f, "{} ", coeff)?;
                }
                variable_format(f, var)?;
            }
        }
        if first {
            write!(f, "0")?;
        }
        Ok(())
    }
}

impl Clone for LinearExpression {
    fn clone(&self) -> Self {
        LinearExpression {
            coefficients: self.coefficients.clone(),
        }
    }
}

impl Debug for LinearExpression {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LinearExpression")
            .field("coefficients", &self.coefficients)
            .finish()
    }
}

/// Represents an affine expression, such as `2x + 3` or `x + y + z`
pub struct Expression {
    pub(crate) linear: LinearExpression,
    pub(crate) constant: f64,
}

impl IntoAffineExpression for Expression {
    type Iter = <LinearExpression as IntoAffineExpression>::Iter;

    #[inline]
    fn linear_coefficients(self) -> Self::Iter {
        self.linear.linear_coefficients()
    }

    #[inline]
    fn constant(&self) -> f64 {
        self.constant
    }
}

/// This implementation copies all the variables and coefficients from the
/// referenced Expression into the created iterator
impl<'a> IntoAffineExpression for &'a Expression {
    type Iter = <&'a LinearExpression as IntoAffineExpression>::Iter;

    #[inline]
    fn linear_coefficients(self) -> Self::Iter {
        (&self.linear).linear_coefficients()
    }

    #[inline]
    fn constant(&self) -> f64 {
        self.constant
    }
}

impl PartialEq for Expression {
    fn eq(&self, other: &Self) -> bool {
        self.constant == other.constant && self.linear.coefficients == other.linear.coefficients
    }
}

impl Clone for Expression {
    fn clone(&self) -> Self {
        Expression {
            linear: self.linear.clone(),
            constant: self.constant,
        }
    }
}

impl Debug for Expression {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        self.format_debug(f)
    }
}

impl Default for Expression {
    fn default() -> Self {
        Expression::from(0.)
    }
}

impl Expression {
    /// Create an expression that has the value 0, but has memory allocated
    /// for `capacity` coefficients.
    pub fn with_capacity(capacity: usize) -> Self {
        Expression {
            linear: LinearExpression {
                coefficients: HashMap::with_capacity_and_hasher(capacity, Default::default()),
            },
            constant: 0.0,
        }
    }

    /// Create a concrete expression struct from anything that has linear
    /// coefficients and a constant
    ///
    /// ```
    /// # use almo::Expression;
    /// Expression::from_other_affine(0.); // A constant expression
    /// ```
    pub fn from_other_affine<E: IntoAffineExpression>(source: E) -> Self {
        source.into_expression()
    }

    /// Creates a constraint indicating that this expression
    /// is lesser than or equal to the right hand side
    pub fn leq<RHS>(self, rhs: RHS) -> Constraint
    where
        Expression: Sub<RHS, Output = Expression>,
    {
        constraint::leq(self, rhs)
    }

    /// Creates a constraint indicating that this expression
    /// is greater than or equal to the right hand side
    pub fn geq<RHS: Sub<Expression, Output = Expression>>(self, rhs: RHS) -> Constraint {
        constraint::geq(self, rhs)
    }

    /// Creates a constraint indicating that this expression
    /// is equal to the right hand side
    pub fn eq<RHS>(self, rhs: RHS) -> Constraint
    where
        Expression: Sub<RHS, Output = Expression>,
    {
        constraint::eq(self, rhs)
    }

    /// Performs self = self + (a * b)
    #[inline]
    pub fn add_mul<N: Into<f64>, E: IntoAffineExpression>(&mut self, a: N, b: E) {
        let factor = a.into();
        let constant = b.constant();
        for (var, value) in b.linear_coefficients().into_iter() {
            *self.linear.coefficients.entry(var).or_default() += factor * value
        }
        self.constant += factor * constant;
    }

    /// The coefficient of `var` in this expression, or 0 if it is absent.
    pub fn coefficient(&self, var: Variable) -> f64 {
        self.linear.coefficients.get(&var).copied().unwrap_or(0.)
    }

    /// True when the expression contains no nonzero variable term.
    pub(crate) fn is_constant(&self) -> bool {
        self.linear.coefficients.values().all(|&c| c == 0.)
    }

    /// True when every coefficient and the constant are finite numbers.
    pub(crate) fn is_finite(&self) -> bool {
        self.constant.is_finite() && self.linear.coefficients.values().all(|c| c.is_finite())
    }

    /// Variable terms sorted by the variables' creation order, for
    /// deterministic rendering.
    pub(crate) fn sorted_terms(&self) -> Vec<(Variable, f64)> {
        let mut terms: Vec<(Variable, f64)> = self
            .linear
            .coefficients
            .iter()
            .map(|(&var, &coeff)| (var, coeff))
            .collect();
        terms.sort_by_key(|(var, _)| var.index());
        terms
    }

    /// See [IntoAffineExpression::eval_with]
    pub fn eval_with<S: VariableValues>(&self, values: &S) -> f64 {
        IntoAffineExpression::eval_with(self, values)
    }
}

#[inline]
pub(crate) fn add_mul<LHS: Into<Expression>, RHS: IntoAffineExpression>(
    lhs: LHS,
    rhs: RHS,
    factor: f64,
) -> Expression {
    let mut result = lhs.into();
    result.add_mul(factor, rhs);
    result
}

impl FormatWithVars for Expression {
    fn format_with<FUN>(&self, f: &mut Formatter<'_>, variable_format: FUN) -> std::fmt::Result
    where
        FUN: FnMut(&mut Formatter<'_>, Variable) -> std::fmt::Result,
    {
        self.linear.format_with(f, variable_format)?;
        if self.constant != 0. {
            write!(f, " + {}", self.constant)?;
        }
        Ok(())
    }
}

impl<RHS: IntoAffineExpression> Add<RHS> for Expression {
    type Output = Expression;

    #[inline]
    fn add(mut self, rhs: RHS) -> Self::Output {
        self.add_mul(1., rhs);
        self
    }
}

impl<RHS: IntoAffineExpression> Sub<RHS> for Expression {
    type Output = Expression;

    #[inline]
    fn sub(mut self, rhs: RHS) -> Self::Output {
        self.add_mul(-1., rhs);
        self
    }
}

impl<RHS: IntoAffineExpression> AddAssign<RHS> for Expression {
    #[inline]
    fn add_assign(&mut self, rhs: RHS) {
        self.add_mul(1, rhs);
    }
}

impl<RHS: IntoAffineExpression> SubAssign<RHS> for Expression {
    #[inline]
    fn sub_assign(&mut self, rhs: RHS) {
        self.add_mul(-1., rhs)
    }
}

impl Neg for Expression {
    type Output = Self;

    #[inline]
    fn neg(mut self) -> Self::Output {
        self *= -1;
        self
    }
}

impl<N: Into<f64>> Mul<N> for Expression {
    type Output = Expression;

    #[inline]
    fn mul(mut self, rhs: N) -> Self::Output {
        self *= rhs;
        self
    }
}

impl<N: Into<f64>> Div<N> for Expression {
    type Output = Expression;

    #[inline]
    fn div(mut self, rhs: N) -> Self::Output {
        self *= 1. / rhs.into();
        self
    }
}

impl<N: Into<f64>> MulAssign<N> for Expression {
    #[inline]
    fn mul_assign(&mut self, rhs: N) {
        let factor = rhs.into();
        for value in self.linear.coefficients.values_mut() {
            *value *= factor
        }
        self.constant *= factor
    }
}

impl<E: IntoAffineExpression> Add<E> for Variable {
    type Output = Expression;

    fn add(self, rhs: E) -> Self::Output {
        add_mul(self, rhs, 1.)
    }
}

impl<E: IntoAffineExpression> Sub<E> for Variable {
    type Output = Expression;

    fn sub(self, rhs: E) -> Self::Output {
        add_mul(self, rhs, -1.)
    }
}

// `number op variable` and `number op expression` need concrete impls:
// a blanket one would conflict with the standard library's.
macro_rules! impl_ops_for_num {
    ($($num:ty),*) => {$(
        impl Add<Variable> for $num {
            type Output = Expression;
            fn add(self, rhs: Variable) -> Self::Output {
                add_mul(Expression::from_other_affine(self), rhs, 1.)
            }
        }

        impl Sub<Variable> for $num {
            type Output = Expression;
            fn sub(self, rhs: Variable) -> Self::Output {
                add_mul(Expression::from_other_affine(self), rhs, -1.)
            }
        }

        impl Add<Expression> for $num {
            type Output = Expression;
            fn add(self, rhs: Expression) -> Self::Output {
                rhs + self
            }
        }

        impl Sub<Expression> for $num {
            type Output = Expression;
            fn sub(self, rhs: Expression) -> Self::Output {
                add_mul(Expression::from_other_affine(self), rhs, -1.)
            }
        }

        impl Mul<Expression> for $num {
            type Output = Expression;
            fn mul(self, mut rhs: Expression) -> Self::Output {
                rhs *= self;
                rhs
            }
        }
    )*};
}

impl_ops_for_num!(f64, i32);

macro_rules! impl_conv {
    ( $( $typename:ident ),* ) => {$(
        impl From<$typename> for Expression {
            fn from(x: $typename) -> Expression { Expression::from_other_affine(x) }
        }
    )*}
}
impl_conv!(f64, f32, i32, Variable);

impl<E: IntoAffineExpression> std::iter::Sum<E> for Expression {
    fn sum<I: Iterator<Item = E>>(iter: I) -> Self {
        let (capacity, _) = iter.size_hint();
        let mut res = Expression::with_capacity(capacity);
        for i in iter {
            res.add_assign(i)
        }
        res
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use crate::variable::Variable;
    use crate::Expression;

    fn vars(n: usize) -> Vec<Variable> {
        (0..n).map(Variable::at).collect()
    }

    #[test]
    fn expression_manipulation() {
        let v = vars(2);
        assert_eq!((3. - v[0]) - v[1], (-1.) * v[0] + (-1.) * v[1] + 3.)
    }

    #[allow(clippy::float_cmp)]
    #[test]
    fn eval() {
        let v = vars(2);
        let mut values = HashMap::new();
        values.insert(v[0], 100.);
        values.insert(v[1], -1.);
        assert_eq!((v[0] + 3. * (v[1] + 3.)).eval_with(&values), 106.)
    }

    #[allow(clippy::float_cmp)]
    #[test]
    fn sum_and_coefficients() {
        let v = vars(3);
        let total: Expression = v.iter().map(|&var| 2. * var).sum();
        assert_eq!(total.coefficient(v[1]), 2.);
        assert_eq!(total.coefficient(Variable::at(17)), 0.);
        assert!(!total.is_constant());
        assert!((total - 2. * v[0] - 2. * v[1] - 2. * v[2]).is_constant());
    }
}
