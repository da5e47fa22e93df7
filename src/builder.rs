//! Assembles index sets, parameters, variables, an objective and constraint
//! rules into an immutable [ModelDescription].
//!
//! Objective and constraint rules are *stored* when declared and *run* when
//! [`ModelBuilder::build`] freezes the model, one instance per tuple of the
//! rule's index sets. A rule resolves the symbols it needs through the
//! [ModelView] it receives, so referencing an undeclared name surfaces as a
//! [`BuildError::UnresolvedReference`] from `build()`, never as a partially
//! built model.

use fnv::FnvHashMap;
use tracing::debug;

use crate::constraint::RuleOutcome;
use crate::error::BuildError;
use crate::expression::Expression;
use crate::index_set::{cartesian, format_tuple, IndexSet, Key};
use crate::model::{LabeledConstraint, ModelDescription, VariableFamily};
use crate::param::ParameterTable;
use crate::solvers::ObjectiveDirection;
use crate::variable::{Variable, VariableDefinition};

type ObjectiveRule = Box<dyn Fn(&ModelView) -> Result<Expression, BuildError>>;
type ConstraintRule = Box<dyn Fn(&ModelView, &[Key]) -> Result<RuleOutcome, BuildError>>;

/// What a declared name refers to.
#[derive(Debug, Clone, Copy)]
enum Entity {
    Set(usize),
    Parameter(usize),
    Variables(usize),
    Constraint,
}

struct ConstraintDecl {
    name: String,
    over: Vec<usize>,
    rule: ConstraintRule,
}

/// Accumulates the parts of an optimization model, then freezes them with
/// [`build`](ModelBuilder::build).
///
/// Sets, parameters, variable families and constraints share a single
/// namespace; declaring the same name twice is an error. See the crate-level
/// documentation for a complete example.
#[derive(Default)]
pub struct ModelBuilder {
    names: FnvHashMap<String, Entity>,
    sets: Vec<IndexSet>,
    params: Vec<ParameterTable>,
    families: Vec<VariableFamily>,
    scalar_count: usize,
    objective: Option<(ObjectiveDirection, ObjectiveRule)>,
    constraints: Vec<ConstraintDecl>,
}

impl ModelBuilder {
    /// Create an empty model builder.
    pub fn new() -> Self {
        ModelBuilder::default()
    }

    /// Declare an ordered index set under `name`.
    ///
    /// Fails with [`BuildError::DuplicateName`] if the name is taken, with
    /// [`BuildError::EmptySet`] if `keys` yields nothing, and with
    /// [`BuildError::DuplicateKey`] if a key repeats.
    pub fn add_set<K, I>(&mut self, name: &str, keys: I) -> Result<(), BuildError>
    where
        K: Into<Key>,
        I: IntoIterator<Item = K>,
    {
        self.check_name_free(name)?;
        let set = IndexSet::new(name, keys.into_iter().map(Into::into).collect())?;
        let id = self.sets.len();
        self.sets.push(set);
        self.names.insert(name.to_string(), Entity::Set(id));
        Ok(())
    }

    /// Declare a parameter under `name`, dense over the Cartesian product of
    /// the index sets named in `over`.
    ///
    /// `values` is called once per index tuple, immediately; a tuple for
    /// which it returns `None` or a non-finite number fails the declaration
    /// with [`BuildError::MissingValue`] before any solve is attempted.
    pub fn add_parameter<F>(&mut self, name: &str, over: &[&str], values: F) -> Result<(), BuildError>
    where
        F: Fn(&[Key]) -> Option<f64>,
    {
        self.check_name_free(name)?;
        let set_ids = self.resolve_sets(over)?;
        let sets = self.set_refs(&set_ids);
        let mut table = Vec::with_capacity(sets.iter().map(|s| s.len()).product());
        for tuple in cartesian(&sets) {
            match values(&tuple) {
                Some(value) if value.is_finite() => table.push(value),
                _ => {
                    return Err(BuildError::MissingValue {
                        name: name.to_string(),
                        index: format_tuple(&tuple),
                    })
                }
            }
        }
        let id = self.params.len();
        self.params.push(ParameterTable::new(name, set_ids, table));
        self.names.insert(name.to_string(), Entity::Parameter(id));
        Ok(())
    }

    /// Declare a family of decision variables under `name`, one scalar per
    /// tuple of the Cartesian product of the index sets named in `over` (a
    /// single scalar when `over` is empty).
    ///
    /// All scalars share the `definition`'s domain and bounds; a binary
    /// definition is clamped to `[0, 1]` whatever bounds were supplied.
    pub fn add_variables(
        &mut self,
        name: &str,
        over: &[&str],
        definition: VariableDefinition,
    ) -> Result<(), BuildError> {
        self.check_name_free(name)?;
        let set_ids = self.resolve_sets(over)?;
        let definition = definition.normalized();
        if definition.min > definition.max {
            return Err(BuildError::InvalidBounds {
                name: name.to_string(),
                min: definition.min,
                max: definition.max,
            });
        }
        let len = set_ids.iter().map(|&i| self.sets[i].len()).product();
        let id = self.families.len();
        self.families.push(VariableFamily {
            name: name.to_string(),
            sets: set_ids,
            definition,
            first: self.scalar_count,
            len,
        });
        self.scalar_count += len;
        self.names.insert(name.to_string(), Entity::Variables(id));
        Ok(())
    }

    /// Set the objective. A model has exactly one: a second call fails with
    /// [`BuildError::ObjectiveAlreadySet`].
    ///
    /// The rule runs when the model is built.
    pub fn set_objective<F>(&mut self, direction: ObjectiveDirection, rule: F) -> Result<(), BuildError>
    where
        F: Fn(&ModelView) -> Result<Expression, BuildError> + 'static,
    {
        if self.objective.is_some() {
            return Err(BuildError::ObjectiveAlreadySet);
        }
        self.objective = Some((direction, Box::new(rule)));
        Ok(())
    }

    /// Shortcut for a minimization [objective](ModelBuilder::set_objective).
    pub fn minimise<F>(&mut self, rule: F) -> Result<(), BuildError>
    where
        F: Fn(&ModelView) -> Result<Expression, BuildError> + 'static,
    {
        self.set_objective(ObjectiveDirection::Minimisation, rule)
    }

    /// Shortcut for a maximization [objective](ModelBuilder::set_objective).
    pub fn maximise<F>(&mut self, rule: F) -> Result<(), BuildError>
    where
        F: Fn(&ModelView) -> Result<Expression, BuildError> + 'static,
    {
        self.set_objective(ObjectiveDirection::Maximisation, rule)
    }

    /// Declare a constraint rule under `name`, instantiated once per tuple
    /// of the Cartesian product of the index sets named in `over` (a single
    /// instance when `over` is empty).
    ///
    /// The rule runs when the model is built. It may return
    /// [`RuleOutcome::Skip`] for boundary tuples that must not generate a
    /// constraint.
    pub fn add_constraint<F>(&mut self, name: &str, over: &[&str], rule: F) -> Result<(), BuildError>
    where
        F: Fn(&ModelView, &[Key]) -> Result<RuleOutcome, BuildError> + 'static,
    {
        self.check_name_free(name)?;
        let set_ids = self.resolve_sets(over)?;
        self.names.insert(name.to_string(), Entity::Constraint);
        self.constraints.push(ConstraintDecl {
            name: name.to_string(),
            over: set_ids,
            rule: Box::new(rule),
        });
        Ok(())
    }

    /// Run every stored rule and freeze the model.
    ///
    /// Validation is all-or-nothing: the first unresolved symbol, foreign
    /// variable, non-finite coefficient or degenerate constraint aborts the
    /// build and no model is returned.
    pub fn build(self) -> Result<ModelDescription, BuildError> {
        let ModelBuilder {
            names,
            sets,
            params,
            families,
            scalar_count,
            objective,
            constraints,
        } = self;
        let (direction, objective_rule) = objective.ok_or(BuildError::NoObjective)?;
        let view = ModelView {
            names: &names,
            sets: &sets,
            params: &params,
            families: &families,
        };

        let objective_expr = objective_rule(&view)?;
        check_expression(&objective_expr, scalar_count, "the objective")?;

        let mut labeled = Vec::new();
        for decl in &constraints {
            let over: Vec<&IndexSet> = decl.over.iter().map(|&i| &sets[i]).collect();
            for tuple in cartesian(&over) {
                let outcome = (decl.rule)(&view, &tuple)?;
                let constraint = match outcome {
                    RuleOutcome::Skip => continue,
                    RuleOutcome::Constraint(constraint) => constraint,
                };
                let label = if tuple.is_empty() {
                    decl.name.clone()
                } else {
                    format!("{}[{}]", decl.name, format_tuple(&tuple))
                };
                if constraint.expression.is_constant() {
                    return Err(BuildError::ConstantConstraint(label));
                }
                check_expression(&constraint.expression, scalar_count, &label)?;
                labeled.push(LabeledConstraint { label, constraint });
            }
        }

        debug!(
            sets = sets.len(),
            parameters = params.len(),
            variables = scalar_count,
            constraints = labeled.len(),
            "froze model"
        );
        Ok(ModelDescription::new(
            sets,
            params,
            families,
            scalar_count,
            direction,
            objective_expr,
            labeled,
        ))
    }

    fn check_name_free(&self, name: &str) -> Result<(), BuildError> {
        if self.names.contains_key(name) {
            return Err(BuildError::DuplicateName(name.to_string()));
        }
        Ok(())
    }

    fn resolve_sets(&self, over: &[&str]) -> Result<Vec<usize>, BuildError> {
        over.iter()
            .map(|&name| match self.names.get(name) {
                Some(Entity::Set(id)) => Ok(*id),
                _ => Err(BuildError::UnresolvedReference(name.to_string())),
            })
            .collect()
    }

    fn set_refs(&self, ids: &[usize]) -> Vec<&IndexSet> {
        ids.iter().map(|&i| &self.sets[i]).collect()
    }
}

/// Every expression handed back by a rule may only use variables of this
/// model; a handle smuggled in from another model is rejected.
fn check_expression(expr: &Expression, scalar_count: usize, context: &str) -> Result<(), BuildError> {
    if !expr.is_finite() {
        return Err(BuildError::NonFiniteCoefficient(context.to_string()));
    }
    for (var, _) in expr.sorted_terms() {
        if var.index() >= scalar_count {
            return Err(BuildError::UnresolvedReference(format!(
                "variable #{} used in {} belongs to another model",
                var.index(),
                context
            )));
        }
    }
    Ok(())
}

/// Read-only resolver handed to objective and constraint rules while the
/// model is being built.
pub struct ModelView<'a> {
    names: &'a FnvHashMap<String, Entity>,
    sets: &'a [IndexSet],
    params: &'a [ParameterTable],
    families: &'a [VariableFamily],
}

impl<'a> ModelView<'a> {
    /// The index set declared under `name`.
    pub fn set(&self, name: &str) -> Result<&'a IndexSet, BuildError> {
        match self.names.get(name) {
            Some(Entity::Set(id)) => Ok(&self.sets[*id]),
            _ => Err(BuildError::UnresolvedReference(name.to_string())),
        }
    }

    /// The value of parameter `name` at `index`.
    pub fn param(&self, name: &str, index: &[Key]) -> Result<f64, BuildError> {
        match self.names.get(name) {
            Some(Entity::Parameter(id)) => {
                let param = &self.params[*id];
                let rank = self
                    .rank(param.sets(), index)
                    .ok_or_else(|| BuildError::UnknownIndex {
                        name: name.to_string(),
                        index: format_tuple(index),
                    })?;
                Ok(param.value_at(rank))
            }
            _ => Err(BuildError::UnresolvedReference(name.to_string())),
        }
    }

    /// The scalar variable of family `name` at `index`.
    pub fn var(&self, name: &str, index: &[Key]) -> Result<Variable, BuildError> {
        match self.names.get(name) {
            Some(Entity::Variables(id)) => {
                let family = &self.families[*id];
                let rank = self
                    .rank(&family.sets, index)
                    .ok_or_else(|| BuildError::UnknownIndex {
                        name: name.to_string(),
                        index: format_tuple(index),
                    })?;
                Ok(Variable::at(family.first + rank))
            }
            _ => Err(BuildError::UnresolvedReference(name.to_string())),
        }
    }

    /// Sum `term` over the Cartesian product of the index sets named in
    /// `over`, the way `sum(c[i] * x[i] for i in A)` reads in algebra:
    ///
    /// `m.sum(&["A"], |m, a| Ok(m.param("c", a)? * m.var("x", a)?))`
    pub fn sum<F>(&self, over: &[&str], mut term: F) -> Result<Expression, BuildError>
    where
        F: FnMut(&Self, &[Key]) -> Result<Expression, BuildError>,
    {
        let sets: Vec<&IndexSet> = over
            .iter()
            .map(|&name| self.set(name))
            .collect::<Result<_, _>>()?;
        let mut total = Expression::with_capacity(sets.iter().map(|s| s.len()).product());
        for tuple in cartesian(&sets) {
            total += term(self, &tuple)?;
        }
        Ok(total)
    }

    fn rank(&self, set_ids: &[usize], index: &[Key]) -> Option<usize> {
        if set_ids.len() != index.len() {
            return None;
        }
        let mut rank = 0;
        for (&set_id, key) in set_ids.iter().zip(index) {
            let set = &self.sets[set_id];
            rank = rank * set.len() + set.position(key)?;
        }
        Some(rank)
    }
}
