//! The frozen output of a [`ModelBuilder`](crate::ModelBuilder).

use fnv::FnvHashMap;

use crate::constraint::Constraint;
use crate::expression::Expression;
use crate::index_set::{cartesian, CartesianTuples, IndexSet, Key};
use crate::param::ParameterTable;
use crate::solvers::ObjectiveDirection;
use crate::variable::{Variable, VariableDefinition};

/// A family of scalar variables sharing one name, one definition and one
/// list of index sets. Scalars are laid out contiguously in odometer order.
#[derive(Debug, Clone)]
pub(crate) struct VariableFamily {
    pub(crate) name: String,
    /// Ids of the index sets in the model's set table
    pub(crate) sets: Vec<usize>,
    /// Normalized definition shared by every scalar of the family
    pub(crate) definition: VariableDefinition,
    /// Index of the first scalar of the family
    pub(crate) first: usize,
    /// Number of scalars: the product of the set sizes
    pub(crate) len: usize,
}

/// One constraint instance, labeled `name` or `name[key,...]`.
#[derive(Debug, Clone)]
pub(crate) struct LabeledConstraint {
    pub(crate) label: String,
    pub(crate) constraint: Constraint,
}

/// An immutable description of a complete optimization problem: index sets,
/// parameters, variables, constraints and one objective.
///
/// Once built, a model is never mutated. Solving it produces a fresh
/// [`SolveResult`](crate::SolveResult) each time; re-solving never touches a
/// previous result.
#[derive(Clone)]
pub struct ModelDescription {
    sets: Vec<IndexSet>,
    set_index: FnvHashMap<String, usize>,
    params: Vec<ParameterTable>,
    param_index: FnvHashMap<String, usize>,
    families: Vec<VariableFamily>,
    family_index: FnvHashMap<String, usize>,
    scalar_count: usize,
    direction: ObjectiveDirection,
    objective: Expression,
    constraints: Vec<LabeledConstraint>,
}

impl ModelDescription {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        sets: Vec<IndexSet>,
        params: Vec<ParameterTable>,
        families: Vec<VariableFamily>,
        scalar_count: usize,
        direction: ObjectiveDirection,
        objective: Expression,
        constraints: Vec<LabeledConstraint>,
    ) -> Self {
        let set_index = sets
            .iter()
            .enumerate()
            .map(|(i, s)| (s.name().to_string(), i))
            .collect();
        let param_index = params
            .iter()
            .enumerate()
            .map(|(i, p)| (p.name().to_string(), i))
            .collect();
        let family_index = families
            .iter()
            .enumerate()
            .map(|(i, f)| (f.name.clone(), i))
            .collect();
        ModelDescription {
            sets,
            set_index,
            params,
            param_index,
            families,
            family_index,
            scalar_count,
            direction,
            objective,
            constraints,
        }
    }

    /// Number of scalar variables in the model.
    pub fn num_variables(&self) -> usize {
        self.scalar_count
    }

    /// Number of constraint instances (after skips).
    pub fn num_constraints(&self) -> usize {
        self.constraints.len()
    }

    /// Whether the objective is minimized or maximized.
    pub fn direction(&self) -> ObjectiveDirection {
        self.direction
    }

    /// The objective expression.
    pub fn objective(&self) -> &Expression {
        &self.objective
    }

    /// The index set declared under `name`, if any.
    pub fn set(&self, name: &str) -> Option<&IndexSet> {
        self.set_index.get(name).map(|&i| &self.sets[i])
    }

    /// The value of parameter `name` at `index`, if both exist.
    pub fn parameter(&self, name: &str, index: &[Key]) -> Option<f64> {
        let param = &self.params[*self.param_index.get(name)?];
        let rank = self.rank(param.sets(), index)?;
        Some(param.value_at(rank))
    }

    /// The scalar variable of family `name` at `index`, if both exist.
    pub fn variable(&self, name: &str, index: &[Key]) -> Option<Variable> {
        let family = self.family(name)?;
        let rank = self.rank(&family.sets, index)?;
        Some(Variable::at(family.first + rank))
    }

    /// The family name and index tuple behind a scalar variable handle.
    pub fn variable_identity(&self, variable: Variable) -> (&str, Vec<Key>) {
        let family = self.family_of(variable);
        let mut rank = variable.index() - family.first;
        let mut tuple = vec![Key::Int(0); family.sets.len()];
        for (slot, &set_id) in tuple.iter_mut().zip(&family.sets).rev() {
            let set = &self.sets[set_id];
            *slot = set.keys()[rank % set.len()].clone();
            rank /= set.len();
        }
        (&family.name, tuple)
    }

    /// Labels of all constraint instances, in declaration order.
    pub fn constraint_labels(&self) -> impl Iterator<Item = &str> {
        self.constraints.iter().map(|c| c.label.as_str())
    }

    /// The constraint instance labeled `label`, if any.
    pub fn constraint(&self, label: &str) -> Option<&Constraint> {
        self.constraints
            .iter()
            .find(|c| c.label == label)
            .map(|c| &c.constraint)
    }

    pub(crate) fn constraints(&self) -> &[LabeledConstraint] {
        &self.constraints
    }

    pub(crate) fn family(&self, name: &str) -> Option<&VariableFamily> {
        self.family_index.get(name).map(|&i| &self.families[i])
    }

    pub(crate) fn family_tuples(&self, family: &VariableFamily) -> CartesianTuples<'_> {
        let sets: Vec<&IndexSet> = family.sets.iter().map(|&i| &self.sets[i]).collect();
        cartesian(&sets)
    }

    /// Whether any variable is restricted to integer values.
    pub(crate) fn has_integer_variables(&self) -> bool {
        self.families.iter().any(|f| f.definition.is_integer())
    }

    /// All scalar variables with their shared definitions, in index order.
    pub(crate) fn scalar_variables(
        &self,
    ) -> impl Iterator<Item = (Variable, &VariableDefinition)> + '_ {
        self.families
            .iter()
            .flat_map(|f| (0..f.len).map(move |i| (Variable::at(f.first + i), &f.definition)))
    }

    fn family_of(&self, variable: Variable) -> &VariableFamily {
        let position = self
            .families
            .partition_point(|f| f.first + f.len <= variable.index());
        &self.families[position]
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

#[cfg(test)]
mod tests {
    use crate::{variable, Key, ModelBuilder, ObjectiveDirection};

    #[test]
    fn variable_identity_round_trips() {
        let mut builder = ModelBuilder::new();
        builder.add_set("A", [1, 2]).unwrap();
        builder.add_set("B", ["u", "v", "w"]).unwrap();
        builder.add_variables("x", &["A", "B"], variable()).unwrap();
        builder.add_variables("y", &[], variable()).unwrap();
        builder
            .set_objective(ObjectiveDirection::Minimisation, |m| {
                Ok(m.var("y", &[])?.into())
            })
            .unwrap();
        let model = builder.build().unwrap();

        assert_eq!(model.num_variables(), 7);
        for (first, second) in [(1, "u"), (1, "w"), (2, "v")] {
            let index = [Key::from(first), Key::from(second)];
            let var = model.variable("x", &index).unwrap();
            let (name, tuple) = model.variable_identity(var);
            assert_eq!(name, "x");
            assert_eq!(tuple, index);
        }
        let scalar = model.variable("y", &[]).unwrap();
        assert_eq!(model.variable_identity(scalar), ("y", vec![]));
        assert!(model.variable("x", &[Key::from(3), Key::from("u")]).is_none());
    }
}
