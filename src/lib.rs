//! Algebraic modeling of linear and mixed-integer programs over named index
//! sets, solved through pluggable backends.
//!
//! A [ModelBuilder] accumulates index sets, dense parameters, variable
//! families, one objective and indexed constraint rules, then freezes them
//! into an immutable [ModelDescription]. A [Solver] backend (the external
//! [GlpkSolver]/[CbcSolver] executables, or the in-process
//! [MicrolpSolver](solvers::microlp::MicrolpSolver)) turns it into a
//! [SolveResult], and [project] maps solved values back onto the original
//! index tuples for reporting.
//!
//! ```rust
//! use almo::{constraint, project, variable, Key, ModelBuilder, SolutionStatus};
//! use almo::solvers::microlp::MicrolpSolver;
//!
//! let mut builder = ModelBuilder::new();
//! builder.add_set("A", [1, 2, 3])?;
//! builder.add_parameter("cost", &["A"], |index| match index[0] {
//!     Key::Int(1) => Some(2.),
//!     Key::Int(2) => Some(3.),
//!     Key::Int(3) => Some(1.),
//!     _ => None,
//! })?;
//! builder.add_variables("x", &["A"], variable())?;
//! builder.minimise(|m| m.sum(&["A"], |m, a| Ok(m.param("cost", a)? * m.var("x", a)?)))?;
//! builder.add_constraint("demand", &[], |m, _| {
//!     let total = m.sum(&["A"], |m, a| Ok(m.var("x", a)?.into()))?;
//!     Ok(constraint!(total >= 10.).into())
//! })?;
//! let model = builder.build()?;
//!
//! let result = model.solve_with(&MicrolpSolver::new())?;
//! assert_eq!(result.status(), SolutionStatus::Optimal);
//! assert!((result.objective_value().unwrap() - 10.).abs() < 1e-6);
//! // All the weight goes on the cheapest unit cost, key 3:
//! for (index, value) in &project(&result, "x")? {
//!     let expected = if index[0] == Key::Int(3) { 10. } else { 0. };
//!     assert!((value - expected).abs() < 1e-6);
//! }
//! # Ok::<_, Box<dyn std::error::Error>>(())
//! ```
//!
//! The pipeline is strictly one-directional: build, then solve, then read.
//! Models are immutable once built and results are immutable once returned;
//! solving the same model twice produces two independent results.

pub use crate::affine_expression_trait::IntoAffineExpression;
pub use crate::builder::{ModelBuilder, ModelView};
pub use crate::constraint::{Constraint, RuleOutcome};
pub use crate::error::{BuildError, ProjectError};
pub use crate::expression::Expression;
pub use crate::index_set::{IndexSet, Key};
pub use crate::model::ModelDescription;
pub use crate::projector::{project, Projection, ProjectionIter};
#[cfg(feature = "microlp")]
pub use crate::solvers::microlp::MicrolpSolver;
pub use crate::solvers::{
    cbc::CbcSolver, glpk::GlpkSolver, ObjectiveDirection, SolutionStatus, SolveError,
    SolveOptions, SolveResult, Solver, VariableValues,
};
pub use crate::variable::{variable, Domain, Variable, VariableDefinition};

mod affine_expression_trait;
mod builder;
pub mod constraint;
mod error;
mod expression;
mod index_set;
mod model;
mod param;
mod projector;
pub mod solvers;
mod variable;
