//! Solves models by driving the COIN-OR `cbc` executable.
//!
//! Same shape as the [glpk](crate::solvers::glpk) adapter: CPLEX-LP file in,
//! solution file out, one scoped working directory per solve. Only the
//! command line grammar and the report format differ.

use std::path::PathBuf;
use std::process::{Command, Stdio};

use tracing::{debug, warn};

use crate::model::ModelDescription;
use crate::solvers::process::{run_solver, ScopedWorkdir};
use crate::solvers::{
    lp_format, SolutionStatus, SolveError, SolveOptions, SolveResult, Solver,
};

/// The COIN-OR branch-and-cut backend, talking to the `cbc` executable.
#[derive(Debug, Clone)]
pub struct CbcSolver {
    command: PathBuf,
}

impl CbcSolver {
    /// A solver expecting `cbc` on the `PATH`.
    pub fn new() -> Self {
        CbcSolver {
            command: PathBuf::from("cbc"),
        }
    }

    /// Use a specific executable instead of `cbc` from the `PATH`.
    pub fn with_command(command: impl Into<PathBuf>) -> Self {
        CbcSolver {
            command: command.into(),
        }
    }

    /// Whether the executable can be started at all.
    pub fn available(&self) -> bool {
        Command::new(&self.command)
            .arg("quit")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|status| status.success())
            .unwrap_or(false)
    }
}

impl Default for CbcSolver {
    fn default() -> Self {
        CbcSolver::new()
    }
}

impl Solver for CbcSolver {
    fn name(&self) -> &'static str {
        "cbc"
    }

    fn solve(
        &self,
        model: &ModelDescription,
        options: &SolveOptions,
    ) -> Result<SolveResult, SolveError> {
        let workdir = ScopedWorkdir::create("almo-cbc")?;
        let lp_path = workdir.file("model.lp");
        std::fs::write(&lp_path, lp_format::write_lp(model))?;
        let solution_path = workdir.file("solution.txt");

        let mut command = Command::new(&self.command);
        command.arg(&lp_path);
        if let Some(limit) = options.time_limit {
            command
                .arg("sec")
                .arg(limit.as_secs().max(1).to_string());
        }
        // `printingOptions all` makes cbc list zero-valued columns too;
        // missing columns still default to 0 on our side.
        command
            .args(["printingOptions", "all", "solve", "solu"])
            .arg(&solution_path);
        let run = run_solver(command, workdir.path(), options.time_limit)?;

        let solution = match std::fs::read_to_string(&solution_path) {
            Ok(solution) => solution,
            Err(_) => {
                warn!(code = ?run.status.code(), "cbc wrote no solution file");
                return Ok(SolveResult::without_values(
                    model.clone(),
                    SolutionStatus::Error,
                    Some(run.stderr.lines().take(5).collect::<Vec<_>>().join("\n")),
                ));
            }
        };
        Ok(parse_solution(model, &solution, options.time_limit.is_some()))
    }
}

/// The first line of a cbc solution file carries the verdict, e.g.
/// `Optimal - objective value 10.00000000` or
/// `Stopped on time limit - objective value 12.00000000`.
fn parse_solution(model: &ModelDescription, solution: &str, timed: bool) -> SolveResult {
    let verdict = solution.lines().next().unwrap_or("").trim();
    debug!(verdict, "parsed cbc verdict");
    let lowered = verdict.to_ascii_lowercase();

    let status = if lowered.starts_with("optimal") {
        SolutionStatus::Optimal
    } else if lowered.contains("infeasible") {
        SolutionStatus::Infeasible
    } else if lowered.contains("unbounded") {
        SolutionStatus::Unbounded
    } else if lowered.starts_with("stopped") && timed {
        // cbc stopped on its own limit and wrote its best incumbent
        SolutionStatus::Feasible
    } else {
        SolutionStatus::Error
    };

    if !status.has_solution() {
        let message =
            (status == SolutionStatus::Error).then(|| format!("cbc reported `{}`", verdict));
        return SolveResult::without_values(model.clone(), status, message);
    }

    let mut values = vec![0.0; model.num_variables()];
    for line in solution.lines().skip(1) {
        // infeasible runs prefix violated rows with `**`
        let line = line.trim_start().trim_start_matches("**").trim_start();
        let mut tokens = line.split_whitespace();
        let Some(sequence) = tokens.next() else { continue };
        if sequence.parse::<usize>().is_err() {
            continue;
        }
        let Some(name) = tokens.next() else { continue };
        let Some(index) = lp_format::parse_column_name(name) else {
            continue;
        };
        let Some(value) = tokens.next().and_then(|token| token.parse::<f64>().ok()) else {
            continue;
        };
        if index < values.len() {
            values[index] = value;
        }
    }
    SolveResult::with_values(model.clone(), status, values, None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{constraint, variable, ModelBuilder};

    fn two_variable_model() -> ModelDescription {
        let mut builder = ModelBuilder::new();
        builder.add_set("A", [1, 2]).unwrap();
        builder.add_variables("x", &["A"], variable()).unwrap();
        builder
            .minimise(|m| {
                let first = m.var("x", &[1.into()])?;
                let second = m.var("x", &[2.into()])?;
                Ok(2. * first + 3. * second)
            })
            .unwrap();
        builder
            .add_constraint("demand", &[], |m, _| {
                let first = m.var("x", &[1.into()])?;
                let second = m.var("x", &[2.into()])?;
                Ok(constraint!(first + second >= 4.).into())
            })
            .unwrap();
        builder.build().unwrap()
    }

    #[test]
    fn parses_an_optimal_solution_file() {
        let model = two_variable_model();
        let solution = "\
Optimal - objective value 8.00000000
      0 v0                             4                       2
      1 v1                             0                       3
";
        let result = parse_solution(&model, solution, false);
        assert_eq!(result.status(), SolutionStatus::Optimal);
        assert_eq!(result.objective_value(), Some(8.));
        assert_eq!(result.value("x", &[1.into()]), Some(4.));
        assert_eq!(result.value("x", &[2.into()]), Some(0.));
    }

    #[test]
    fn missing_columns_default_to_zero() {
        let model = two_variable_model();
        let solution = "\
Optimal - objective value 8.00000000
      0 v0                             4                       2
";
        let result = parse_solution(&model, solution, false);
        assert_eq!(result.value("x", &[2.into()]), Some(0.));
    }

    #[test]
    fn maps_infeasible_and_unbounded_verdicts() {
        let model = two_variable_model();
        let infeasible = parse_solution(
            &model,
            "Infeasible - objective value 4.00000000\n** 0 v0 4 0\n",
            false,
        );
        assert_eq!(infeasible.status(), SolutionStatus::Infeasible);
        assert_eq!(infeasible.objective_value(), None);

        let unbounded = parse_solution(&model, "Unbounded\n", false);
        assert_eq!(unbounded.status(), SolutionStatus::Unbounded);
    }

    #[test]
    fn stopping_on_the_time_limit_keeps_the_incumbent() {
        let model = two_variable_model();
        let solution = "\
Stopped on time limit - objective value 9.00000000
      0 v0                             3                       0
      1 v1                             1                       0
";
        let result = parse_solution(&model, solution, true);
        assert_eq!(result.status(), SolutionStatus::Feasible);
        assert_eq!(result.objective_value(), Some(9.));

        let untimed = parse_solution(&model, solution, false);
        assert_eq!(untimed.status(), SolutionStatus::Error);
    }
}
