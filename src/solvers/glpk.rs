//! Solves models by driving the GLPK `glpsol` executable.
//!
//! The model is written as a CPLEX-LP file into a scoped working directory,
//! `glpsol` is invoked on it, and its plain-text solution report is parsed
//! back. Nothing is linked: the engine is a plain subprocess behind the
//! [Solver] contract, and any binary speaking the same formats can be
//! substituted with [`GlpkSolver::with_command`].

use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::time::Duration;

use tracing::{debug, warn};

use crate::model::ModelDescription;
use crate::solvers::process::{run_solver, ScopedWorkdir};
use crate::solvers::{
    lp_format, SolutionStatus, SolveError, SolveOptions, SolveResult, Solver,
};

/// The GLPK backend, talking to the `glpsol` executable.
#[derive(Debug, Clone)]
pub struct GlpkSolver {
    command: PathBuf,
}

impl GlpkSolver {
    /// A solver expecting `glpsol` on the `PATH`.
    pub fn new() -> Self {
        GlpkSolver {
            command: PathBuf::from("glpsol"),
        }
    }

    /// Use a specific executable instead of `glpsol` from the `PATH`.
    pub fn with_command(command: impl Into<PathBuf>) -> Self {
        GlpkSolver {
            command: command.into(),
        }
    }

    /// Whether the executable can be started at all.
    pub fn available(&self) -> bool {
        Command::new(&self.command)
            .arg("--version")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|status| status.success())
            .unwrap_or(false)
    }
}

impl Default for GlpkSolver {
    fn default() -> Self {
        GlpkSolver::new()
    }
}

impl Solver for GlpkSolver {
    fn name(&self) -> &'static str {
        "glpk"
    }

    fn solve(
        &self,
        model: &ModelDescription,
        options: &SolveOptions,
    ) -> Result<SolveResult, SolveError> {
        let workdir = ScopedWorkdir::create("almo-glpk")?;
        let lp_path = workdir.file("model.lp");
        std::fs::write(&lp_path, lp_format::write_lp(model))?;
        let report_path = workdir.file("solution.txt");

        let mut command = Command::new(&self.command);
        command
            .arg("--lp")
            .arg(&lp_path)
            .arg("-o")
            .arg(&report_path);
        if let Some(limit) = options.time_limit {
            command
                .arg("--tmlim")
                .arg(limit.as_secs().max(1).to_string());
        }
        let run = run_solver(command, workdir.path(), options.time_limit)?;

        let report = match std::fs::read_to_string(&report_path) {
            Ok(report) => report,
            Err(_) => {
                warn!(code = ?run.status.code(), "glpsol wrote no solution report");
                let status = classify_log(&run.stdout);
                let message = (status == SolutionStatus::Error)
                    .then(|| first_lines(&run.stderr, &run.stdout));
                return Ok(SolveResult::without_values(model.clone(), status, message));
            }
        };
        parse_report(model, &report, options.time_limit)
    }
}

/// The verdicts glpsol writes on the `Status:` line of its report.
/// LP solves report OPTIMAL / FEASIBLE / INFEASIBLE (INTERMEDIATE|FINAL) /
/// UNBOUNDED / UNDEFINED; MIP solves report INTEGER OPTIMAL / INTEGER
/// NON-OPTIMAL / INTEGER EMPTY / INTEGER UNDEFINED.
fn classify_status(status_line: &str) -> Option<SolutionStatus> {
    if status_line.contains("NON-OPTIMAL") {
        Some(SolutionStatus::Feasible)
    } else if status_line.contains("OPTIMAL") {
        Some(SolutionStatus::Optimal)
    } else if status_line.contains("EMPTY") || status_line.contains("(FINAL)") {
        Some(SolutionStatus::Infeasible)
    } else if status_line.contains("UNBOUNDED") {
        Some(SolutionStatus::Unbounded)
    } else if status_line == "FEASIBLE" {
        Some(SolutionStatus::Feasible)
    } else {
        // UNDEFINED / INFEASIBLE (INTERMEDIATE): stopped without a verdict
        None
    }
}

/// Fallback classification from the terminal log when no report exists.
fn classify_log(stdout: &str) -> SolutionStatus {
    if stdout.contains("NO PRIMAL FEASIBLE") || stdout.contains("HAS NO FEASIBLE") {
        SolutionStatus::Infeasible
    } else if stdout.contains("UNBOUNDED") {
        SolutionStatus::Unbounded
    } else {
        SolutionStatus::Error
    }
}

fn parse_report(
    model: &ModelDescription,
    report: &str,
    time_limit: Option<Duration>,
) -> Result<SolveResult, SolveError> {
    let status_line = report
        .lines()
        .find_map(|line| line.trim_start().strip_prefix("Status:"))
        .map(str::trim)
        .unwrap_or("");
    debug!(status = status_line, "parsed glpsol verdict");

    let status = match classify_status(status_line) {
        Some(status) => status,
        None => {
            // The engine stopped on its own limit without a usable answer.
            if let Some(limit) = time_limit {
                return Err(SolveError::Timeout(limit));
            }
            return Ok(SolveResult::without_values(
                model.clone(),
                SolutionStatus::Error,
                Some(format!("glpsol reported status `{}`", status_line)),
            ));
        }
    };

    if !status.has_solution() {
        return Ok(SolveResult::without_values(model.clone(), status, None));
    }

    let Some(values) = parse_columns(report, model.num_variables()) else {
        return Ok(SolveResult::without_values(
            model.clone(),
            SolutionStatus::Error,
            Some("glpsol report had no readable column section".to_string()),
        ));
    };
    // Marginals only exist (and only mean shadow prices) for pure LP solves.
    let duals = if model.has_integer_variables() {
        None
    } else {
        parse_duals(report, model.num_constraints())
    };
    Ok(SolveResult::with_values(model.clone(), status, values, duals))
}

/// Reads the `Column name` table. Tokenizing is reliable here because the
/// activity is the first numeric token after the machine-generated name:
/// the status markers (`B`, `NL`, `NU`, `NF`, `NS`, `*`) never parse as
/// numbers.
fn parse_columns(report: &str, columns: usize) -> Option<Vec<f64>> {
    let mut lines = report.lines();
    (&mut lines).find(|line| line.contains("Column name"))?;
    let mut values = vec![0.0; columns];
    for line in lines {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            break;
        }
        if trimmed.starts_with('-') {
            continue;
        }
        let mut tokens = trimmed.split_whitespace();
        let Some(sequence) = tokens.next() else { break };
        if sequence.parse::<usize>().is_err() {
            break;
        }
        let Some(name) = tokens.next() else { break };
        let Some(index) = lp_format::parse_column_name(name) else {
            continue;
        };
        let Some(activity) = tokens.find_map(|token| token.parse::<f64>().ok()) else {
            continue;
        };
        if index < columns {
            values[index] = activity;
        }
    }
    Some(values)
}

/// Reads the `Marginal` column of the `Row name` table. The report is
/// fixed-width (the marginal cell spans bytes 65..78); a blank cell is a
/// basic row whose dual is zero, and tiny duals print as `< eps`.
fn parse_duals(report: &str, rows: usize) -> Option<Vec<f64>> {
    let mut lines = report.lines();
    (&mut lines).find(|line| line.contains("Row name"))?;
    let mut duals = vec![0.0; rows];
    for line in lines {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            break;
        }
        if trimmed.starts_with('-') {
            continue;
        }
        let name = line.get(7..19).map(str::trim).unwrap_or("");
        let Some(row) = name.strip_prefix('c').and_then(|r| r.parse::<usize>().ok()) else {
            continue;
        };
        let cell = line.get(65..).unwrap_or("").trim();
        let dual = if cell.is_empty() || cell == "< eps" {
            0.0
        } else {
            match cell.parse::<f64>() {
                Ok(value) => value,
                Err(_) => return None,
            }
        };
        if row < rows {
            duals[row] = dual;
        }
    }
    Some(duals)
}

fn first_lines(stderr: &str, stdout: &str) -> String {
    let source = if stderr.trim().is_empty() {
        stdout
    } else {
        stderr
    };
    source.lines().take(5).collect::<Vec<_>>().join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{constraint, variable, ModelBuilder};

    /// Sets {1,2,3}, costs {2,3,1}, minimize total cost, total quantity >= 10.
    fn allocation_model() -> ModelDescription {
        let mut builder = ModelBuilder::new();
        builder.add_set("A", [1, 2, 3]).unwrap();
        builder
            .add_parameter("cost", &["A"], |index| match index[0].as_int() {
                Some(1) => Some(2.),
                Some(2) => Some(3.),
                Some(3) => Some(1.),
                _ => None,
            })
            .unwrap();
        builder.add_variables("x", &["A"], variable()).unwrap();
        builder
            .minimise(|m| m.sum(&["A"], |m, a| Ok(m.param("cost", a)? * m.var("x", a)?)))
            .unwrap();
        builder
            .add_constraint("demand", &[], |m, _| {
                let total = m.sum(&["A"], |m, a| Ok(m.var("x", a)?.into()))?;
                Ok(constraint!(total >= 10.).into())
            })
            .unwrap();
        builder.build().unwrap()
    }

    fn table_line(no: usize, name: &str, st: &str, cells: [&str; 4]) -> String {
        format!(
            "{:>6} {:<12} {:<2} {:>13} {:>13} {:>13} {:>13}",
            no, name, st, cells[0], cells[1], cells[2], cells[3]
        )
    }

    fn optimal_lp_report() -> String {
        let mut report = String::new();
        report.push_str("Problem:    \nRows:       1\nColumns:    3\nNon-zeros:  3\n");
        report.push_str("Status:     OPTIMAL\n");
        report.push_str("Objective:  obj = 10 (MINimum)\n\n");
        report.push_str(
            "   No.   Row name   St   Activity     Lower bound   Upper bound    Marginal\n",
        );
        report.push_str(
            "------ ------------ -- ------------- ------------- ------------- -------------\n",
        );
        report.push_str(&table_line(1, "c0", "NL", ["-10", "", "-10", "1"]));
        report.push('\n');
        report.push('\n');
        report.push_str(
            "   No. Column name  St   Activity     Lower bound   Upper bound    Marginal\n",
        );
        report.push_str(
            "------ ------------ -- ------------- ------------- ------------- -------------\n",
        );
        report.push_str(&table_line(1, "v0", "NL", ["0", "0", "", "1"]));
        report.push('\n');
        report.push_str(&table_line(2, "v1", "NL", ["0", "0", "", "2"]));
        report.push('\n');
        report.push_str(&table_line(3, "v2", "B", ["10", "0", "", ""]));
        report.push('\n');
        report.push('\n');
        report.push_str("End of output\n");
        report
    }

    #[test]
    fn parses_an_optimal_lp_report() {
        let model = allocation_model();
        let result = parse_report(&model, &optimal_lp_report(), None).unwrap();
        assert_eq!(result.status(), SolutionStatus::Optimal);
        assert_eq!(result.objective_value(), Some(10.));
        assert_eq!(result.value("x", &[3.into()]), Some(10.));
        assert_eq!(result.value("x", &[1.into()]), Some(0.));
        assert_eq!(result.dual("demand"), Some(1.));
    }

    #[test]
    fn parses_a_mip_style_report() {
        let mut report = String::new();
        report.push_str("Status:     INTEGER OPTIMAL\n\n");
        report.push_str(
            "   No.   Row name        Activity     Lower bound   Upper bound\n",
        );
        report.push_str("------ ------------    ------------- ------------- -------------\n");
        report.push_str("     1 c0                        -10           -10              \n\n");
        report.push_str(
            "   No. Column name       Activity     Lower bound   Upper bound\n",
        );
        report.push_str("------ ------------    ------------- ------------- -------------\n");
        report.push_str("     1 v0           *             10             0              \n");
        report.push_str("     2 v1           *              0             0              \n");
        report.push_str("     3 v2           *              0             0              \n");

        let model = allocation_model();
        let result = parse_report(&model, &report, None).unwrap();
        assert_eq!(result.status(), SolutionStatus::Optimal);
        assert_eq!(result.value("x", &[1.into()]), Some(10.));
        assert_eq!(result.objective_value(), Some(20.));
    }

    #[test]
    fn maps_terminal_verdicts_to_statuses() {
        let model = allocation_model();
        for (line, expected) in [
            ("Status:     INFEASIBLE (FINAL)", SolutionStatus::Infeasible),
            ("Status:     INTEGER EMPTY", SolutionStatus::Infeasible),
            ("Status:     UNBOUNDED", SolutionStatus::Unbounded),
        ] {
            let result = parse_report(&model, line, None).unwrap();
            assert_eq!(result.status(), expected);
            assert_eq!(result.objective_value(), None);
            assert!(result.project("x").is_err());
        }
    }

    #[test]
    fn undefined_verdicts_become_timeouts_when_a_limit_was_set() {
        let model = allocation_model();
        let report = "Status:     INTEGER UNDEFINED\n";
        assert!(matches!(
            parse_report(&model, report, Some(Duration::from_secs(1))),
            Err(SolveError::Timeout(_))
        ));
        let untimed = parse_report(&model, report, None).unwrap();
        assert_eq!(untimed.status(), SolutionStatus::Error);
        assert!(untimed.message().unwrap().contains("INTEGER UNDEFINED"));
    }
}
