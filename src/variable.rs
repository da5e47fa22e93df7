//! A [Variable] is the base element used to create an [Expression].
//! The goal of the solver is to find optimal values for all variables in a
//! problem.
//!
//! Variables are declared on a [`ModelBuilder`](crate::ModelBuilder) as named
//! *families* indexed by one or more index sets; each index tuple expands to
//! one scalar variable. A [VariableDefinition] sets the domain and bounds
//! shared by every scalar of a family.

use std::collections::Bound;
use std::fmt::{Debug, Formatter};
use std::ops::{Div, Mul, Neg, RangeBounds};

use crate::affine_expression_trait::IntoAffineExpression;
use crate::expression::{Expression, LinearExpression};

/// A scalar decision variable inside a model.
///
/// ## Warning
/// `Eq` is implemented on this type, but `v1 == v2` is true only if the two
/// handles point at the same scalar of the same model, not if the variables
/// have the same definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Variable {
    /// A variable is nothing more than an index into the scalar table of the
    /// model it belongs to. That's why it can be `Copy`.
    /// All the actual information (family name, index tuple, domain, bounds)
    /// is stored in the [`ModelDescription`](crate::ModelDescription).
    index: usize,
}

impl Variable {
    /// Only the builder and the model may mint handles.
    pub(crate) fn at(index: usize) -> Self {
        Self { index }
    }

    pub(crate) fn index(self) -> usize {
        self.index
    }
}

impl IntoAffineExpression for Variable {
    type Iter = std::iter::Once<(Self, f64)>;

    #[inline]
    fn linear_coefficients(self) -> Self::Iter {
        std::iter::once((self, 1.))
    }
}

impl<'a> IntoAffineExpression for &'a Variable {
    type Iter = std::iter::Once<(Variable, f64)>;

    #[inline]
    fn linear_coefficients(self) -> Self::Iter {
        (*self).linear_coefficients()
    }
}

/// An element that can be displayed if you give a variable display function
pub trait FormatWithVars {
    /// Write the element to the formatter. See [std::fmt::Display]
    fn format_with<FUN>(&self, f: &mut Formatter<'_>, variable_format: FUN) -> std::fmt::Result
    where
        FUN: FnMut(&mut Formatter<'_>, Variable) -> std::fmt::Result;

    /// Write the elements, naming the variables v0, v1, ... vn
    fn format_debug(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        self.format_with(f, |f, var| write!(f, "v{}", var.index()))
    }
}

/// The kind of values a variable may take.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Domain {
    /// Any real value within the bounds
    Continuous,
    /// Integer values within the bounds
    Integer,
    /// 0 or 1. Declaring a binary family forces its bounds to `[0, 1]`.
    Binary,
}

/// Defines the domain and bounds shared by the scalar variables of a family.
///
/// The default is a continuous, non-negative variable with no upper bound.
#[derive(Clone, PartialEq, Debug)]
pub struct VariableDefinition {
    pub(crate) min: f64,
    pub(crate) max: f64,
    pub(crate) domain: Domain,
}

impl VariableDefinition {
    /// Creates a continuous variable bounded to `[0, +inf)`
    pub fn new() -> Self {
        VariableDefinition {
            min: 0.,
            max: f64::INFINITY,
            domain: Domain::Continuous,
        }
    }

    /// Set the lower and/or higher bounds of the variable
    ///
    /// ## Examples
    /// ```
    /// # use almo::variable;
    /// assert_eq!(
    ///     variable().bounds(1..2),
    ///     variable().min(1).max(2)
    /// );
    ///
    /// assert_eq!(
    ///     variable().bounds(1..),
    ///     variable().min(1)
    /// );
    /// ```
    pub fn bounds<N: Into<f64> + Copy, B: RangeBounds<N>>(self, bounds: B) -> Self {
        self.min(match bounds.start_bound() {
            Bound::Included(&x) => x.into(),
            Bound::Excluded(&x) => x.into(),
            Bound::Unbounded => f64::NEG_INFINITY,
        })
        .max(match bounds.end_bound() {
            Bound::Included(&x) => x.into(),
            Bound::Excluded(&x) => x.into(),
            Bound::Unbounded => f64::INFINITY,
        })
    }

    /// Set the lower bound of the variable
    pub fn min<N: Into<f64>>(mut self, min: N) -> Self {
        self.min = min.into();
        self
    }

    /// Set the higher bound of the variable
    pub fn max<N: Into<f64>>(mut self, max: N) -> Self {
        self.max = max.into();
        self
    }

    /// Set both the lower and higher bounds of the variable
    pub fn clamp<N1: Into<f64>, N2: Into<f64>>(self, min: N1, max: N2) -> Self {
        self.min(min).max(max)
    }

    /// Remove the default lower bound of 0, making the variable free.
    pub fn free(self) -> Self {
        self.min(f64::NEG_INFINITY)
    }

    /// Restrict the variable to integer values
    pub fn integer(mut self) -> Self {
        self.domain = Domain::Integer;
        self
    }

    /// Restrict the variable to 0 or 1
    pub fn binary(mut self) -> Self {
        self.domain = Domain::Binary;
        self
    }

    /// The domain this definition declares.
    pub fn domain(&self) -> Domain {
        self.domain
    }

    pub(crate) fn is_integer(&self) -> bool {
        matches!(self.domain, Domain::Integer | Domain::Binary)
    }

    /// Binary variables are always `[0, 1]`, whatever bounds were supplied.
    pub(crate) fn normalized(mut self) -> Self {
        if self.domain == Domain::Binary {
            self.min = 0.;
            self.max = 1.;
        }
        self
    }
}

/// Creates a continuous variable definition bounded to `[0, +inf)`
impl Default for VariableDefinition {
    fn default() -> Self {
        VariableDefinition::new()
    }
}

/// Returns a continuous variable definition bounded to `[0, +inf)`.
/// Chain [VariableDefinition] methods to change the domain or the bounds:
/// `variable().integer().clamp(0, 10)`.
pub fn variable() -> VariableDefinition {
    VariableDefinition::default()
}

impl<N: Into<f64>> Mul<N> for Variable {
    type Output = Expression;

    fn mul(self, rhs: N) -> Self::Output {
        let mut coefficients = fnv::FnvHashMap::with_capacity_and_hasher(1, Default::default());
        coefficients.insert(self, rhs.into());
        Expression {
            linear: LinearExpression { coefficients },
            constant: 0.0,
        }
    }
}

impl Mul<Variable> for f64 {
    type Output = Expression;

    fn mul(self, rhs: Variable) -> Self::Output {
        rhs.mul(self)
    }
}

impl Mul<Variable> for i32 {
    type Output = Expression;

    fn mul(self, rhs: Variable) -> Self::Output {
        rhs.mul(f64::from(self))
    }
}

impl Div<f64> for Variable {
    type Output = Expression;
    fn div(self, rhs: f64) -> Self::Output {
        self * (1. / rhs)
    }
}

impl Div<i32> for Variable {
    type Output = Expression;
    fn div(self, rhs: i32) -> Self::Output {
        self * (1. / f64::from(rhs))
    }
}

impl Neg for Variable {
    type Output = Expression;

    fn neg(self) -> Self::Output {
        -Expression::from(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binary_definitions_clamp_their_bounds() {
        let def = variable().binary().clamp(-3, 12).normalized();
        assert_eq!((def.min, def.max), (0., 1.));
        assert!(def.is_integer());
    }

    #[test]
    fn default_definition_is_non_negative_continuous() {
        let def = variable();
        assert_eq!(def.min, 0.);
        assert_eq!(def.max, f64::INFINITY);
        assert_eq!(def.domain(), Domain::Continuous);
    }
}
