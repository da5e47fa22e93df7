//! Named, ordered collections of keys, used to enumerate parameters,
//! variables and constraint instances.

use std::fmt::{Display, Formatter};

use fnv::FnvHashMap;

use crate::error::BuildError;

/// A single key inside an [`IndexSet`]: an integer or a textual label.
///
/// ```
/// use almo::Key;
/// assert_eq!(Key::from(3).to_string(), "3");
/// assert_eq!(Key::from("north"), Key::Label("north".to_string()));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Key {
    /// An integer key, e.g. a time period or a node id
    Int(i64),
    /// A textual key, e.g. a product name coming from a data sheet
    Label(String),
}

impl Key {
    /// The integer behind this key, if it is an integer key.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Key::Int(value) => Some(*value),
            Key::Label(_) => None,
        }
    }

    /// The label behind this key, if it is a textual key.
    pub fn as_label(&self) -> Option<&str> {
        match self {
            Key::Int(_) => None,
            Key::Label(label) => Some(label),
        }
    }
}

impl From<i64> for Key {
    fn from(value: i64) -> Self {
        Key::Int(value)
    }
}

impl From<i32> for Key {
    fn from(value: i32) -> Self {
        Key::Int(i64::from(value))
    }
}

impl From<&str> for Key {
    fn from(value: &str) -> Self {
        Key::Label(value.to_string())
    }
}

impl From<String> for Key {
    fn from(value: String) -> Self {
        Key::Label(value)
    }
}

impl Display for Key {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Key::Int(value) => write!(f, "{}", value),
            Key::Label(label) => write!(f, "{}", label),
        }
    }
}

/// Renders an index tuple the way it appears in labels and error messages.
pub(crate) fn format_tuple(tuple: &[Key]) -> String {
    tuple
        .iter()
        .map(Key::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

/// A named, ordered sequence of unique keys.
///
/// Sets are immutable once attached to a builder: every parameter, variable
/// family and indexed constraint enumerates its instances by walking the
/// Cartesian product of the sets it was declared over, in declaration order.
#[derive(Debug, Clone)]
pub struct IndexSet {
    name: String,
    keys: Vec<Key>,
    positions: FnvHashMap<Key, usize>,
}

impl IndexSet {
    pub(crate) fn new(name: &str, keys: Vec<Key>) -> Result<Self, BuildError> {
        if keys.is_empty() {
            return Err(BuildError::EmptySet(name.to_string()));
        }
        let mut positions = FnvHashMap::default();
        for (position, key) in keys.iter().enumerate() {
            if positions.insert(key.clone(), position).is_some() {
                return Err(BuildError::DuplicateKey {
                    set: name.to_string(),
                    key: key.clone(),
                });
            }
        }
        Ok(IndexSet {
            name: name.to_string(),
            keys,
            positions,
        })
    }

    /// The name this set was declared under.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The keys, in declaration order.
    pub fn keys(&self) -> &[Key] {
        &self.keys
    }

    /// Number of keys in the set. Never zero.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Always false: empty sets are rejected at declaration time.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Position of `key` within the declaration order.
    pub fn position(&self, key: &Key) -> Option<usize> {
        self.positions.get(key).copied()
    }

    /// Whether `key` belongs to this set.
    pub fn contains(&self, key: &Key) -> bool {
        self.positions.contains_key(key)
    }
}

/// Iterates the Cartesian product of `sets` in odometer order: the last set
/// varies fastest. An empty list of sets yields exactly one empty tuple,
/// which is how scalar (unindexed) entities get their single instance.
pub(crate) fn cartesian<'a>(sets: &[&'a IndexSet]) -> CartesianTuples<'a> {
    CartesianTuples {
        sets: sets.to_vec(),
        next: Some(vec![0; sets.len()]),
    }
}

#[derive(Clone)]
pub(crate) struct CartesianTuples<'a> {
    sets: Vec<&'a IndexSet>,
    next: Option<Vec<usize>>,
}

impl<'a> Iterator for CartesianTuples<'a> {
    type Item = Vec<Key>;

    fn next(&mut self) -> Option<Self::Item> {
        let positions = self.next.as_mut()?;
        let tuple = positions
            .iter()
            .zip(&self.sets)
            .map(|(&position, set)| set.keys()[position].clone())
            .collect();
        let mut carried = true;
        for (position, set) in positions.iter_mut().zip(&self.sets).rev() {
            *position += 1;
            if *position < set.len() {
                carried = false;
                break;
            }
            *position = 0;
        }
        if carried {
            self.next = None;
        }
        Some(tuple)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(name: &str, keys: &[i64]) -> IndexSet {
        IndexSet::new(name, keys.iter().map(|&k| Key::from(k)).collect()).unwrap()
    }

    #[test]
    fn keys_keep_declaration_order() {
        let periods = set("T", &[3, 1, 2]);
        assert_eq!(periods.position(&Key::from(3)), Some(0));
        assert_eq!(periods.position(&Key::from(2)), Some(2));
        assert_eq!(periods.position(&Key::from(7)), None);
    }

    #[test]
    fn empty_and_duplicate_keys_are_rejected() {
        assert!(matches!(
            IndexSet::new("T", vec![]),
            Err(BuildError::EmptySet(name)) if name == "T"
        ));
        assert!(matches!(
            IndexSet::new("T", vec![Key::from(1), Key::from(1)]),
            Err(BuildError::DuplicateKey { .. })
        ));
    }

    #[test]
    fn cartesian_runs_in_odometer_order() {
        let a = set("A", &[1, 2]);
        let b = set("B", &[10, 20, 30]);
        let tuples: Vec<Vec<Key>> = cartesian(&[&a, &b]).collect();
        assert_eq!(tuples.len(), 6);
        assert_eq!(tuples[0], vec![Key::from(1), Key::from(10)]);
        assert_eq!(tuples[1], vec![Key::from(1), Key::from(20)]);
        assert_eq!(tuples[3], vec![Key::from(2), Key::from(10)]);
        assert_eq!(tuples[5], vec![Key::from(2), Key::from(30)]);
    }

    #[test]
    fn cartesian_of_nothing_is_a_single_empty_tuple() {
        let tuples: Vec<Vec<Key>> = cartesian(&[]).collect();
        assert_eq!(tuples, vec![Vec::<Key>::new()]);
    }
}
