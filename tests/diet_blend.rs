//! A feed blending model: pick the cheapest mix of feeds that reaches a
//! total weight while keeping the protein share up and the fiber share down.

#![cfg(feature = "microlp")]

use almo::solvers::microlp::MicrolpSolver;
use almo::{constraint, variable, Key, ModelBuilder, SolutionStatus};
use float_eq::assert_float_eq;

const COST: [f64; 2] = [2., 3.];
const PROTEIN: [f64; 2] = [0.1, 0.4];
const FIBER: [f64; 2] = [0.02, 0.04];

fn column(index: &[Key], values: &[f64; 2]) -> Option<f64> {
    let feed = index[0].as_int()?;
    values.get(feed as usize - 1).copied()
}

#[test]
fn blends_the_two_feeds_at_the_protein_boundary() {
    let mut builder = ModelBuilder::new();
    builder.add_set("F", [1, 2]).unwrap();
    builder
        .add_parameter("cost", &["F"], |i| column(i, &COST))
        .unwrap();
    builder
        .add_parameter("protein", &["F"], |i| column(i, &PROTEIN))
        .unwrap();
    builder
        .add_parameter("fiber", &["F"], |i| column(i, &FIBER))
        .unwrap();
    builder.add_variables("x", &["F"], variable()).unwrap();
    builder
        .minimise(|m| m.sum(&["F"], |m, f| Ok(m.param("cost", f)? * m.var("x", f)?)))
        .unwrap();
    builder
        .add_constraint("total_weight", &[], |m, _| {
            let total = m.sum(&["F"], |m, f| Ok(m.var("x", f)?.into()))?;
            Ok(constraint!(total >= 800.).into())
        })
        .unwrap();
    builder
        .add_constraint("protein_share", &[], |m, _| {
            let protein = m.sum(&["F"], |m, f| Ok(m.param("protein", f)? * m.var("x", f)?))?;
            let total = m.sum(&["F"], |m, f| Ok(m.var("x", f)?.into()))?;
            Ok(constraint!(protein >= 0.3 * total).into())
        })
        .unwrap();
    builder
        .add_constraint("fiber_share", &[], |m, _| {
            let fiber = m.sum(&["F"], |m, f| Ok(m.param("fiber", f)? * m.var("x", f)?))?;
            let total = m.sum(&["F"], |m, f| Ok(m.var("x", f)?.into()))?;
            Ok(constraint!(fiber <= 0.05 * total).into())
        })
        .unwrap();
    let model = builder.build().unwrap();

    let result = model.solve_with(&MicrolpSolver::new()).unwrap();
    assert_eq!(result.status(), SolutionStatus::Optimal);

    // The protein requirement pins feed 2 at twice feed 1; the weight
    // requirement then fixes the mix at (800/3, 1600/3).
    assert_float_eq!(result.objective_value().unwrap(), 6400. / 3., abs <= 1e-6);
    assert_float_eq!(result.value("x", &[1.into()]).unwrap(), 800. / 3., abs <= 1e-6);
    assert_float_eq!(result.value("x", &[2.into()]).unwrap(), 1600. / 3., abs <= 1e-6);

    // The fiber ceiling is slack at this mix.
    let fiber = model.constraint("fiber_share").unwrap();
    assert!(result.eval(fiber.expression()).unwrap() < -1e-6);
}
