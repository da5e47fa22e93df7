//! Solver backends and the types they share.
//!
//! A backend implements [Solver]: it receives an immutable
//! [ModelDescription], talks to an engine (an external executable for
//! [`glpk`]/[`cbc`], an in-process library for [`microlp`]) and maps the
//! outcome back onto the model's variable names and index tuples.
//!
//! Infeasible, unbounded and engine-failure outcomes are *statuses* on the
//! returned [SolveResult], not errors: a [SolveError] only means the
//! environment prevented the solve from happening at all.

pub mod cbc;
pub mod glpk;
pub(crate) mod lp_format;
#[cfg(feature = "microlp")]
pub mod microlp;
pub(crate) mod process;

use std::collections::HashMap;
use std::time::Duration;

use thiserror::Error;

use crate::error::ProjectError;
use crate::expression::Expression;
use crate::index_set::Key;
use crate::model::ModelDescription;
use crate::projector::{self, Projection};
use crate::variable::Variable;

/// Whether to search for the variable values that give the highest
/// or the lowest value of the objective function.
#[derive(Debug, Eq, PartialEq, Clone, Copy)]
pub enum ObjectiveDirection {
    /// Maximize the objective
    Maximisation,
    /// Minimize the objective
    Minimisation,
}

/// How a solve terminated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SolutionStatus {
    /// A proven optimal solution was found
    Optimal,
    /// The engine stopped early (typically on its time limit) with a usable
    /// feasible solution that is not proven optimal
    Feasible,
    /// No solution satisfies all the constraints
    Infeasible,
    /// The objective can be improved without bound
    Unbounded,
    /// The engine failed or produced an unreadable answer
    Error,
}

impl SolutionStatus {
    /// True for the two statuses that carry an objective value and
    /// variable values.
    pub fn has_solution(self) -> bool {
        matches!(self, SolutionStatus::Optimal | SolutionStatus::Feasible)
    }
}

/// The environment prevented a solve from running to a verdict.
///
/// These are not solve outcomes: an infeasible or unbounded model is a
/// successful solve with the corresponding [SolutionStatus]. No retry is
/// attempted; retrying is the caller's decision.
#[derive(Debug, Error)]
pub enum SolveError {
    /// The solver executable could not be started at all.
    #[error("solver executable `{command}` could not be started: {source}")]
    Unavailable {
        /// The command that was invoked
        command: String,
        /// What the operating system reported
        #[source]
        source: std::io::Error,
    },

    /// The solver process overran the time limit and had to be killed
    /// before it reported anything usable.
    #[error("the solver ran past the time limit of {0:?} and was stopped")]
    Timeout(Duration),

    /// An i/o failure while preparing for or cleaning up after the solver.
    #[error("i/o failure around the solver invocation: {0}")]
    Io(#[from] std::io::Error),
}

/// Options that apply to a single solve invocation.
#[derive(Debug, Clone, Default)]
pub struct SolveOptions {
    /// Give the engine at most this long. Engines that stop themselves in
    /// time and report a feasible incumbent yield a [SolutionStatus::Feasible]
    /// result; a process that must be killed yields [SolveError::Timeout].
    pub time_limit: Option<Duration>,
}

impl SolveOptions {
    /// Options with a time limit and everything else at its default.
    pub fn with_time_limit(time_limit: Duration) -> Self {
        SolveOptions {
            time_limit: Some(time_limit),
        }
    }
}

/// A solver backend.
///
/// `solve` blocks until the engine terminates or the time limit elapses.
/// Backends share no mutable state: concurrent solves are safe because each
/// call works on an immutable model and produces a fresh result.
pub trait Solver {
    /// Short name of the backend, for logs and error messages.
    fn name(&self) -> &'static str;

    /// Solve `model` and map the outcome back onto its variables.
    fn solve(
        &self,
        model: &ModelDescription,
        options: &SolveOptions,
    ) -> Result<SolveResult, SolveError>;
}

impl ModelDescription {
    /// Solve this model with default [SolveOptions].
    pub fn solve_with<S: Solver>(&self, solver: &S) -> Result<SolveResult, SolveError> {
        solver.solve(self, &SolveOptions::default())
    }
}

/// Anything that can report a value for each variable: a [SolveResult]'s
/// value table, or a plain `HashMap` in tests.
pub trait VariableValues {
    /// The value of `variable`
    fn value(&self, variable: Variable) -> f64;
}

impl<N: Into<f64> + Clone> VariableValues for HashMap<Variable, N> {
    fn value(&self, variable: Variable) -> f64 {
        self[&variable].clone().into()
    }
}

pub(crate) struct DenseValues<'a>(pub &'a [f64]);

impl VariableValues for DenseValues<'_> {
    fn value(&self, variable: Variable) -> f64 {
        self.0[variable.index()]
    }
}

/// The immutable outcome of one solve invocation.
///
/// The objective value and the variable values exist only when
/// [`status`](SolveResult::status) is Optimal or Feasible; every accessor
/// returns `Option`s that are `None` otherwise, so a terminal
/// infeasible/unbounded/error outcome cannot be misread as numbers.
#[derive(Clone)]
pub struct SolveResult {
    model: ModelDescription,
    status: SolutionStatus,
    objective: Option<f64>,
    values: Option<Vec<f64>>,
    duals: Option<Vec<f64>>,
    message: Option<String>,
}

impl SolveResult {
    /// A result carrying a solution. The objective value is recomputed from
    /// the model's own objective expression so it never depends on how a
    /// particular engine rounds or signs its report.
    pub(crate) fn with_values(
        model: ModelDescription,
        status: SolutionStatus,
        values: Vec<f64>,
        duals: Option<Vec<f64>>,
    ) -> Self {
        debug_assert!(status.has_solution());
        debug_assert_eq!(values.len(), model.num_variables());
        let objective = model.objective().eval_with(&DenseValues(&values));
        SolveResult {
            model,
            status,
            objective: Some(objective),
            values: Some(values),
            duals,
            message: None,
        }
    }

    /// A terminal result without a solution.
    pub(crate) fn without_values(
        model: ModelDescription,
        status: SolutionStatus,
        message: Option<String>,
    ) -> Self {
        debug_assert!(!status.has_solution());
        SolveResult {
            model,
            status,
            objective: None,
            values: None,
            duals: None,
            message,
        }
    }

    /// How the solve terminated.
    pub fn status(&self) -> SolutionStatus {
        self.status
    }

    /// The objective value, when a solution exists.
    pub fn objective_value(&self) -> Option<f64> {
        self.objective
    }

    /// The solved value of one scalar of a variable family.
    pub fn value(&self, family: &str, index: &[Key]) -> Option<f64> {
        let variable = self.model.variable(family, index)?;
        self.variable_value(variable)
    }

    /// The solved value behind a variable handle.
    pub fn variable_value(&self, variable: Variable) -> Option<f64> {
        self.values.as_ref()?.get(variable.index()).copied()
    }

    /// Evaluate an arbitrary expression against the solved values, when a
    /// solution exists.
    pub fn eval(&self, expression: &Expression) -> Option<f64> {
        let values = self.values.as_deref()?;
        Some(expression.eval_with(&DenseValues(values)))
    }

    /// The dual value (shadow price) of a constraint instance, when the
    /// engine reported duals. Only pure-LP solves have them.
    pub fn dual(&self, label: &str) -> Option<f64> {
        let duals = self.duals.as_deref()?;
        let position = self
            .model
            .constraint_labels()
            .position(|candidate| candidate == label)?;
        duals.get(position).copied()
    }

    /// Whether the backend reported dual values for this solve.
    pub fn has_duals(&self) -> bool {
        self.duals.is_some()
    }

    /// A diagnostic message from the engine, for [SolutionStatus::Error]
    /// outcomes.
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// The model this result was produced from.
    pub fn model(&self) -> &ModelDescription {
        &self.model
    }

    /// Project the values of one variable family onto its index tuples.
    /// See [crate::project].
    pub fn project(&self, family: &str) -> Result<Projection<'_>, ProjectError> {
        projector::project(self, family)
    }

    pub(crate) fn raw_values(&self) -> Option<&[f64]> {
        self.values.as_deref()
    }
}
