//! A small multi-period production plan. The ramping rule skips the first
//! period, which has no predecessor; the skip must simply produce fewer
//! constraint instances, never an error.

#![cfg(feature = "microlp")]

use almo::solvers::microlp::MicrolpSolver;
use almo::{constraint, variable, Key, ModelBuilder, RuleOutcome, SolutionStatus};
use float_eq::assert_float_eq;

#[test]
fn ramping_only_binds_periods_with_a_predecessor() {
    let mut builder = ModelBuilder::new();
    builder.add_set("T", [1, 2, 3]).unwrap();
    builder
        .add_parameter("cost", &["T"], |index| {
            index[0].as_int().map(|t| t as f64)
        })
        .unwrap();
    builder
        .add_variables("make", &["T"], variable().max(6.))
        .unwrap();
    builder
        .minimise(|m| m.sum(&["T"], |m, t| Ok(m.param("cost", t)? * m.var("make", t)?)))
        .unwrap();
    builder
        .add_constraint("demand", &[], |m, _| {
            let total = m.sum(&["T"], |m, t| Ok(m.var("make", t)?.into()))?;
            Ok(constraint!(total >= 12.).into())
        })
        .unwrap();
    builder
        .add_constraint("ramp", &["T"], |m, t| {
            let period = t[0].as_int().unwrap();
            if period == 1 {
                // no predecessor period
                return Ok(RuleOutcome::Skip);
            }
            let current = m.var("make", t)?;
            let previous = m.var("make", &[Key::from(period - 1)])?;
            Ok(constraint!(current <= previous + 2.).into())
        })
        .unwrap();
    let model = builder.build().unwrap();

    let labels: Vec<&str> = model.constraint_labels().collect();
    assert_eq!(labels, ["demand", "ramp[2]", "ramp[3]"]);

    let result = model.solve_with(&MicrolpSolver::new()).unwrap();
    assert_eq!(result.status(), SolutionStatus::Optimal);

    // Cheap early periods run at capacity; period 3 stays idle.
    assert_float_eq!(result.objective_value().unwrap(), 18., abs <= 1e-6);
    assert_float_eq!(result.value("make", &[1.into()]).unwrap(), 6., abs <= 1e-6);
    assert_float_eq!(result.value("make", &[2.into()]).unwrap(), 6., abs <= 1e-6);
    assert_float_eq!(result.value("make", &[3.into()]).unwrap(), 0., abs <= 1e-6);
}
