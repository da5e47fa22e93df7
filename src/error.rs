//! Errors raised while assembling a model or projecting results.
//!
//! Solve *outcomes* (infeasible, unbounded, solver failure) are not errors:
//! they are terminal [`SolutionStatus`](crate::SolutionStatus) values carried
//! by a [`SolveResult`](crate::SolveResult). Only environment and usage
//! problems surface through these types.

use crate::index_set::Key;
use crate::solvers::SolutionStatus;
use thiserror::Error;

/// A problem detected while declaring model entities or freezing the model.
///
/// All of these are fail-fast: no partially built model is ever returned.
#[derive(Debug, Error)]
pub enum BuildError {
    /// Sets, parameters, variable families and constraints share one
    /// namespace; a name can only be declared once.
    #[error("the name `{0}` is already declared in this model")]
    DuplicateName(String),

    /// An index set must contain at least one key.
    #[error("index set `{0}` contains no keys")]
    EmptySet(String),

    /// Keys within a set must be unique.
    #[error("index set `{set}` contains the key `{key}` more than once")]
    DuplicateKey {
        /// Name of the offending set
        set: String,
        /// The repeated key
        key: Key,
    },

    /// A parameter must provide a finite value for every tuple in the
    /// Cartesian product of its index sets.
    #[error("parameter `{name}` has no usable value for index ({index})")]
    MissingValue {
        /// Name of the parameter
        name: String,
        /// The index tuple that had no finite value
        index: String,
    },

    /// A model has exactly one objective.
    #[error("an objective has already been set for this model")]
    ObjectiveAlreadySet,

    /// `build()` refuses to freeze a model without an objective.
    #[error("no objective was set before the model was built")]
    NoObjective,

    /// A rule referenced a symbol that was never declared.
    #[error("reference to undeclared symbol `{0}`")]
    UnresolvedReference(String),

    /// A declared symbol was indexed with a tuple outside its domain.
    #[error("`{name}` is not indexed by ({index})")]
    UnknownIndex {
        /// The symbol being indexed
        name: String,
        /// The unknown index tuple
        index: String,
    },

    /// A variable family whose lower bound exceeds its upper bound.
    #[error("variable family `{name}`: lower bound {min} exceeds upper bound {max}")]
    InvalidBounds {
        /// Name of the family
        name: String,
        /// Normalized lower bound
        min: f64,
        /// Normalized upper bound
        max: f64,
    },

    /// A constraint rule produced an (in)equality with no variable terms.
    /// The solver encoding cannot express it, and silently dropping it would
    /// hide a modeling mistake.
    #[error("constraint `{0}` contains no variable terms")]
    ConstantConstraint(String),

    /// A rule produced an expression with a NaN or infinite coefficient.
    #[error("non-finite coefficient in {0}")]
    NonFiniteCoefficient(String),
}

/// A problem detected while projecting solved values back onto index tuples.
#[derive(Debug, Error)]
pub enum ProjectError {
    /// The requested variable family was never declared in the model the
    /// result came from.
    #[error("variable family `{0}` was never declared in this model")]
    UnknownVariable(String),

    /// The solve terminated without producing variable values.
    #[error("the solve ended with status {0:?} and produced no variable values")]
    NoSolution(SolutionStatus),
}
