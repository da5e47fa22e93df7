//! Renders a [ModelDescription] in the CPLEX-LP text format understood by
//! `glpsol`, `cbc` and most other command line solvers.
//!
//! Column and row names are machine-generated (`v0`, `v1`, ... and `c0`,
//! `c1`, ...): they cannot collide, never need escaping, and map back to the
//! model through their index alone. The original family names and index
//! tuples never reach the engine.

use std::fmt::Write;

use crate::model::ModelDescription;
use crate::solvers::ObjectiveDirection;
use crate::variable::Domain;

pub(crate) fn column_name(index: usize) -> String {
    format!("v{}", index)
}

pub(crate) fn row_name(index: usize) -> String {
    format!("c{}", index)
}

/// Inverse of [column_name].
pub(crate) fn parse_column_name(name: &str) -> Option<usize> {
    name.strip_prefix('v')?.parse().ok()
}

/// Render the whole model. The objective constant is deliberately left out:
/// adapters recompute the objective from the returned variable values, so
/// the engine's own objective report is never load-bearing.
pub(crate) fn write_lp(model: &ModelDescription) -> String {
    let mut out = String::new();
    out.push_str(match model.direction() {
        ObjectiveDirection::Minimisation => "Minimize\n",
        ObjectiveDirection::Maximisation => "Maximize\n",
    });
    out.push_str(" obj:");
    let objective_terms = write_terms(&mut out, model.objective().sorted_terms());
    if !objective_terms && model.num_variables() > 0 {
        // A constant objective still needs one syntactic term.
        let _ = write!(out, " 0 {}", column_name(0));
    }
    out.push('\n');

    out.push_str("Subject To\n");
    for (row, labeled) in model.constraints().iter().enumerate() {
        let expression = labeled.constraint.expression();
        let _ = write!(out, " {}:", row_name(row));
        write_terms(&mut out, expression.sorted_terms());
        let operator = if labeled.constraint.is_equality() {
            "="
        } else {
            "<="
        };
        // `-0.0` would render as "-0"
        let rhs = match -expression.constant {
            value if value == 0. => 0.,
            value => value,
        };
        let _ = writeln!(out, " {} {}", operator, rhs);
    }

    let mut bounds = String::new();
    for (variable, definition) in model.scalar_variables() {
        if definition.domain() == Domain::Binary {
            continue;
        }
        let name = column_name(variable.index());
        let lower_finite = definition.min.is_finite();
        let upper_finite = definition.max.is_finite();
        let _ = match (lower_finite, upper_finite) {
            (false, false) => writeln!(bounds, " {} free", name),
            (false, true) => writeln!(bounds, " -inf <= {} <= {}", name, definition.max),
            (true, false) => writeln!(bounds, " {} >= {}", name, definition.min),
            (true, true) if definition.min == definition.max => {
                writeln!(bounds, " {} = {}", name, definition.min)
            }
            (true, true) => {
                writeln!(bounds, " {} <= {} <= {}", definition.min, name, definition.max)
            }
        };
    }
    if !bounds.is_empty() {
        out.push_str("Bounds\n");
        out.push_str(&bounds);
    }

    let mut generals = String::new();
    let mut binaries = String::new();
    for (variable, definition) in model.scalar_variables() {
        match definition.domain() {
            Domain::Continuous => {}
            Domain::Integer => {
                let _ = writeln!(generals, " {}", column_name(variable.index()));
            }
            Domain::Binary => {
                let _ = writeln!(binaries, " {}", column_name(variable.index()));
            }
        }
    }
    if !generals.is_empty() {
        out.push_str("Generals\n");
        out.push_str(&generals);
    }
    if !binaries.is_empty() {
        out.push_str("Binaries\n");
        out.push_str(&binaries);
    }

    out.push_str("End\n");
    out
}

/// Write ` {:+} v{i}` terms, skipping zero coefficients. Returns whether
/// anything was written.
fn write_terms(out: &mut String, terms: Vec<(crate::Variable, f64)>) -> bool {
    let mut written = false;
    for (variable, coefficient) in terms {
        if coefficient != 0. {
            let _ = write!(out, " {:+} {}", coefficient, column_name(variable.index()));
            written = true;
        }
    }
    written
}
