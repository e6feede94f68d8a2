//! Ground atoms and predicate states.
//!
//! A [`State`] is a canonical, sorted set of [`Atom`]s. Equality and hashing
//! are structural, so two states holding the same atoms are interchangeable
//! wherever a state is used as a key.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A predicate applied to constant arguments, e.g. `(on cup table)`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Atom {
    /// Predicate name.
    pub predicate: String,

    /// Constant arguments, in order.
    #[serde(default)]
    pub args: Vec<String>,
}

impl Atom {
    /// Create a new atom.
    pub fn new<I, S>(predicate: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            predicate: predicate.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Create an atom without arguments.
    pub fn nullary(predicate: impl Into<String>) -> Self {
        Self {
            predicate: predicate.into(),
            args: Vec::new(),
        }
    }

    /// Get the argument at `index`.
    pub fn arg(&self, index: usize) -> Option<&str> {
        self.args.get(index).map(String::as_str)
    }

    /// Check whether this atom uses the given predicate.
    pub fn is(&self, predicate: &str) -> bool {
        self.predicate == predicate
    }
}

impl fmt::Display for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}", self.predicate)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        write!(f, ")")
    }
}

/// Build an [`Atom`] from a predicate and arguments.
///
/// ```
/// use lgp_core::atom;
/// let a = atom!("on", "cup", "table");
/// assert_eq!(a.to_string(), "(on cup table)");
/// ```
#[macro_export]
macro_rules! atom {
    ($predicate:expr $(, $arg:expr)* $(,)?) => {{
        let args: ::std::vec::Vec<::std::string::String> =
            ::std::vec![$(::std::string::String::from($arg)),*];
        $crate::Atom::new($predicate, args)
    }};
}

/// An immutable set of atoms describing everything currently true.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct State {
    atoms: BTreeSet<Atom>,
}

impl State {
    /// Create an empty state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if the state holds an atom.
    pub fn contains(&self, atom: &Atom) -> bool {
        self.atoms.contains(atom)
    }

    /// Number of atoms.
    pub fn len(&self) -> usize {
        self.atoms.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }

    /// Iterate over atoms in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = &Atom> {
        self.atoms.iter()
    }

    /// Iterate over atoms using `predicate`.
    pub fn with_predicate<'a>(&'a self, predicate: &'a str) -> impl Iterator<Item = &'a Atom> + 'a {
        self.atoms.iter().filter(move |a| a.is(predicate))
    }

    /// True iff every `positive` atom holds and no `negative` atom holds.
    pub fn applicable(&self, positive: &State, negative: &State) -> bool {
        positive.atoms.is_subset(&self.atoms) && negative.atoms.is_disjoint(&self.atoms)
    }

    /// Returns `(self - del) ∪ add`.
    pub fn apply(&self, add: &State, del: &State) -> State {
        let atoms = self
            .atoms
            .difference(&del.atoms)
            .chain(add.atoms.iter())
            .cloned()
            .collect();
        State { atoms }
    }

    /// Returns a copy of this state that also holds `atom`.
    pub fn with(&self, atom: Atom) -> State {
        let mut atoms = self.atoms.clone();
        atoms.insert(atom);
        State { atoms }
    }

    /// Returns a copy of this state without `atom`.
    pub fn without(&self, atom: &Atom) -> State {
        let mut atoms = self.atoms.clone();
        atoms.remove(atom);
        State { atoms }
    }

    /// Union of two states.
    pub fn union(&self, other: &State) -> State {
        State {
            atoms: self.atoms.union(&other.atoms).cloned().collect(),
        }
    }

    /// Atoms of `self` missing from `other`.
    pub fn difference(&self, other: &State) -> State {
        State {
            atoms: self.atoms.difference(&other.atoms).cloned().collect(),
        }
    }
}

impl FromIterator<Atom> for State {
    fn from_iter<T: IntoIterator<Item = Atom>>(iter: T) -> Self {
        State {
            atoms: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a State {
    type Item = &'a Atom;
    type IntoIter = std::collections::btree_set::Iter<'a, Atom>;

    fn into_iter(self) -> Self::IntoIter {
        self.atoms.iter()
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, atom) in self.atoms.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{}", atom)?;
        }
        write!(f, "}}")
    }
}
