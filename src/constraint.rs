//! Constraints define the (in)equalities that must hold in the solution.

use core::fmt::{Debug, Formatter};
use std::ops::{Shl, Shr, Sub};

use crate::expression::Expression;
use crate::variable::{FormatWithVars, Variable};

/// A constraint represents a single (in)equality that must hold in the
/// solution.
#[derive(Clone)]
pub struct Constraint {
    /// The expression that is constrained to be null or negative
    pub(crate) expression: Expression,
    /// if is_equality, represents expression == 0, otherwise, expression <= 0
    pub(crate) is_equality: bool,
}

impl Constraint {
    fn new(expression: Expression, is_equality: bool) -> Constraint {
        Constraint {
            expression,
            is_equality,
        }
    }

    /// The normalized left-hand side: the constraint states that this
    /// expression is equal to zero (equality) or at most zero (inequality).
    pub fn expression(&self) -> &Expression {
        &self.expression
    }

    /// Whether this is an equality constraint.
    pub fn is_equality(&self) -> bool {
        self.is_equality
    }
}

impl FormatWithVars for Constraint {
    fn format_with<FUN>(&self, f: &mut Formatter<'_>, variable_format: FUN) -> std::fmt::Result
    where
        FUN: FnMut(&mut Formatter<'_>, Variable) -> std::fmt::Result,
    {
        self.expression.linear.format_with(f, variable_format)?;
        write!(f, " {} ", if self.is_equality { "=" } else { "<=" })?;
        write!(f, "{}", -self.expression.constant)
    }
}

impl Debug for Constraint {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        self.format_debug(f)
    }
}

/// equals
pub fn eq<B, A: Sub<B, Output = Expression>>(a: A, b: B) -> Constraint {
    Constraint::new(a - b, true)
}

/// less than or equal
pub fn leq<B, A: Sub<B, Output = Expression>>(a: A, b: B) -> Constraint {
    Constraint::new(a - b, false)
}

/// greater than or equal
pub fn geq<A, B: Sub<A, Output = Expression>>(a: A, b: B) -> Constraint {
    leq(b, a)
}

macro_rules! impl_shifts {
    ($($t:ty)*) => {$(
        impl<RHS> Shl<RHS> for $t where Self: Sub<RHS, Output=Expression> {
            type Output = Constraint;

            fn shl(self, rhs: RHS) -> Self::Output {
                leq(self, rhs)
            }
        }

        impl<RHS: Sub<Self, Output=Expression>> Shr<RHS> for $t {
            type Output = Constraint;

            fn shr(self, rhs: RHS) -> Self::Output {
                geq(self, rhs)
            }
        }
    )*}
}

impl_shifts!(Expression Variable);

/// This macro allows defining constraints using `a + b <= c + d`
/// instead of `(a + b).leq(c + d)` or `a + b << c + d`
///
/// # Example
///
/// ```
/// use almo::{constraint, variable, ModelBuilder};
/// let mut builder = ModelBuilder::new();
/// builder.add_set("A", [1, 2]).unwrap();
/// builder.add_variables("x", &["A"], variable().max(10)).unwrap();
/// builder.minimise(|m| Ok(m.var("x", &[1.into()])? + m.var("x", &[2.into()])?)).unwrap();
/// builder.add_constraint("spread", &[], |m, _| {
///     let first = m.var("x", &[1.into()])?;
///     let second = m.var("x", &[2.into()])?;
///     Ok(constraint!(first + 3 <= second * 2).into())
/// }).unwrap();
/// ```
#[macro_export]
macro_rules! constraint {
    ([$($left:tt)*] <= $($right:tt)*) => {
        $crate::constraint::leq($($left)*, $($right)*)
    };
    ([$($left:tt)*] >= $($right:tt)*) => {
        $crate::constraint::geq($($left)*, $($right)*)
    };
    ([$($left:tt)*] == $($right:tt)*) => {
        $crate::constraint::eq($($left)*, $($right)*)
    };
    // Stop condition: all tokens have been processed
    ([$($left:tt)*]) => {
        $($left)*
    };
    // The next token is not a special one
    ([$($left:tt)*] $next:tt $($right:tt)*) => {
        $crate::constraint!([$($left)* $next] $($right)*)
    };
    // Initial rule: start the recursive calls
    ($($all:tt)*) => {
        $crate::constraint!([] $($all)*)
    };
}

/// What a constraint rule produced for one index tuple.
///
/// Boundary tuples (for instance the first time period, which has no
/// predecessor) can opt out of generating a constraint by returning
/// [`RuleOutcome::Skip`]; this is an ordinary, first-class outcome, not an
/// error, and no constraint instance is recorded for that tuple.
pub enum RuleOutcome {
    /// Enforce this constraint for the current index tuple
    Constraint(Constraint),
    /// Generate no constraint for the current index tuple
    Skip,
}

impl From<Constraint> for RuleOutcome {
    fn from(constraint: Constraint) -> Self {
        RuleOutcome::Constraint(constraint)
    }
}

impl Debug for RuleOutcome {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            RuleOutcome::Constraint(c) => write!(f, "Constraint({:?})", c),
            RuleOutcome::Skip => write!(f, "Skip"),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::variable::Variable;

    #[test]
    fn test_leq() {
        let v0 = Variable::at(0);
        let v1 = Variable::at(1);
        let f = format!("{:?}", (3. - v0) >> v1);
        assert!(["v0 + v1 <= 3", "v1 + v0 <= 3"].contains(&&*f), "{}", f)
    }

    #[test]
    fn test_macro() {
        let v0 = Variable::at(0);
        let v1 = Variable::at(1);
        let c = constraint!(v0 + 2. * v1 == 3.);
        assert!(c.is_equality());
        let f = format!("{:?}", c);
        assert!(["v0 + 2 v1 = 3", "2 v1 + v0 = 3"].contains(&&*f), "{}", f)
    }
}
