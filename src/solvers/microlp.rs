//! A solver backend that uses [microlp](https://docs.rs/microlp), a pure
//! Rust solver, so models can be solved without any external binary.
//!
//! Integer and binary variables are handled by adding Gomory cuts to the
//! relaxed solution; `microlp` can panic on models it cannot cut its way
//! through, which is caught and reported as a solver-error status.

use std::panic::catch_unwind;

use tracing::warn;

use crate::model::ModelDescription;
use crate::solvers::{
    ObjectiveDirection, SolutionStatus, SolveError, SolveOptions, SolveResult, Solver,
};

/// The in-process [microlp](https://docs.rs/microlp) backend.
#[derive(Debug, Clone, Copy, Default)]
pub struct MicrolpSolver;

impl MicrolpSolver {
    /// An in-process solver; nothing to configure.
    pub fn new() -> Self {
        MicrolpSolver
    }
}

impl Solver for MicrolpSolver {
    fn name(&self) -> &'static str {
        "microlp"
    }

    fn solve(
        &self,
        model: &ModelDescription,
        options: &SolveOptions,
    ) -> Result<SolveResult, SolveError> {
        if options.time_limit.is_some() {
            warn!("microlp has no time limit support; solving to completion");
        }
        let mut problem = microlp::Problem::new(match model.direction() {
            ObjectiveDirection::Maximisation => microlp::OptimizationDirection::Maximize,
            ObjectiveDirection::Minimisation => microlp::OptimizationDirection::Minimize,
        });
        let objective = model.objective();
        let mut integers: Vec<microlp::Variable> = vec![];
        let variables: Vec<microlp::Variable> = model
            .scalar_variables()
            .map(|(var, def)| {
                let coeff = objective.coefficient(var);
                let engine_var = problem.add_var(coeff, (def.min, def.max));
                if def.is_integer() {
                    integers.push(engine_var);
                }
                engine_var
            })
            .collect();
        for labeled in model.constraints() {
            let expression = labeled.constraint.expression();
            let mut linear = microlp::LinearExpr::empty();
            for (var, coefficient) in expression.sorted_terms() {
                linear.add(variables[var.index()], coefficient);
            }
            let op = if labeled.constraint.is_equality() {
                microlp::ComparisonOp::Eq
            } else {
                microlp::ComparisonOp::Le
            };
            problem.add_constraint(linear, op, -expression.constant);
        }

        let mut solution = match problem.solve() {
            Ok(solution) => solution,
            Err(error) => return Ok(engine_outcome(model, error)),
        };
        for int_var in integers {
            match catch_unwind(|| solution.add_gomory_cut(int_var)) {
                Ok(Ok(cut)) => solution = cut,
                Ok(Err(error)) => return Ok(engine_outcome(model, error)),
                Err(_) => {
                    return Ok(SolveResult::without_values(
                        model.clone(),
                        SolutionStatus::Error,
                        Some("microlp panicked while cutting an integer variable".to_string()),
                    ))
                }
            }
        }
        let values: Vec<f64> = variables.iter().map(|&var| solution[var]).collect();
        Ok(SolveResult::with_values(
            model.clone(),
            SolutionStatus::Optimal,
            values,
            None,
        ))
    }
}

/// Infeasible and unbounded are error values for the engine, but terminal
/// statuses for us.
fn engine_outcome(model: &ModelDescription, error: microlp::Error) -> SolveResult {
    match error {
        microlp::Error::Infeasible => {
            SolveResult::without_values(model.clone(), SolutionStatus::Infeasible, None)
        }
        microlp::Error::Unbounded => {
            SolveResult::without_values(model.clone(), SolutionStatus::Unbounded, None)
        }
        microlp::Error::InternalError(message) => {
            SolveResult::without_values(model.clone(), SolutionStatus::Error, Some(message))
        }
    }
}

#[cfg(test)]
mod tests {
    use float_eq::assert_float_eq;

    use super::*;
    use crate::{constraint, variable, ModelBuilder};

    #[test]
    fn can_solve_easy() {
        let mut builder = ModelBuilder::new();
        builder.add_variables("x", &[], variable().clamp(0, 2)).unwrap();
        builder.add_variables("y", &[], variable().clamp(1, 3)).unwrap();
        builder
            .maximise(|m| Ok(m.var("x", &[])? + m.var("y", &[])?))
            .unwrap();
        builder
            .add_constraint("cap", &[], |m, _| {
                let x = m.var("x", &[])?;
                let y = m.var("y", &[])?;
                Ok(constraint!(2. * x + y <= 4.).into())
            })
            .unwrap();
        let model = builder.build().unwrap();

        let result = model.solve_with(&MicrolpSolver::new()).unwrap();
        assert_eq!(result.status(), SolutionStatus::Optimal);
        assert_float_eq!(result.value("x", &[]).unwrap(), 0.5, abs <= 1e-8);
        assert_float_eq!(result.value("y", &[]).unwrap(), 3., abs <= 1e-8);
    }

    #[test]
    fn contradictory_constraints_are_infeasible_not_errors() {
        let mut builder = ModelBuilder::new();
        builder.add_variables("x", &[], variable()).unwrap();
        builder.minimise(|m| Ok(m.var("x", &[])?.into())).unwrap();
        builder
            .add_constraint("floor", &[], |m, _| {
                let x = m.var("x", &[])?;
                Ok(constraint!(x >= 10.).into())
            })
            .unwrap();
        builder
            .add_constraint("ceiling", &[], |m, _| {
                let x = m.var("x", &[])?;
                Ok(constraint!(x <= 1.).into())
            })
            .unwrap();
        let model = builder.build().unwrap();

        let result = model.solve_with(&MicrolpSolver::new()).unwrap();
        assert_eq!(result.status(), SolutionStatus::Infeasible);
        assert_eq!(result.objective_value(), None);
        assert_eq!(result.value("x", &[]), None);
    }

    #[test]
    fn missing_upper_bounds_make_maximisation_unbounded() {
        let mut builder = ModelBuilder::new();
        builder.add_variables("x", &[], variable()).unwrap();
        builder.maximise(|m| Ok(m.var("x", &[])?.into())).unwrap();
        builder
            .add_constraint("floor", &[], |m, _| {
                let x = m.var("x", &[])?;
                Ok(constraint!(x >= 1.).into())
            })
            .unwrap();
        let model = builder.build().unwrap();

        let result = model.solve_with(&MicrolpSolver::new()).unwrap();
        assert_eq!(result.status(), SolutionStatus::Unbounded);
        assert_eq!(result.objective_value(), None);
    }
}
